//! The main loop side of the input core.
//!
//! [`Controller`] owns every table the core works on: the 64 configuration
//! records, the 128 value slots and the per bank display buffers. Once per
//! main loop pass it is handed a [`ScanSnapshot`] and a [`MidiOut`].

use crate::address::{
    Bank, BankedEncoderId, PhysicalEncoder, VirtualEncoderId, BANKED_ENCODERS, NUM_BANKS,
    PHYSICAL_ENCODERS, VIRTUAL_ENCODERS,
};
use crate::bitfield::Bitfield;
use crate::classifier::{
    scale, Classifier, Motion, Outcome, RotaryState, DETENT_CENTER, DETENT_INDICATOR,
};
use crate::config::{factory_defaults, ConfigStore, EncoderConfig, Settings, SwitchAction};
use crate::error::Error;
use crate::midi::{self, MidiOut};
use crate::packed::ConfigPatch;
use crate::scan::ScanSnapshot;
use crate::velocity::VelocityEstimator;

/// Number of shift pages.
pub const SHIFT_PAGES: usize = 2;

/// Note number of the first switch of the first shift page.
pub const SHIFT_OFFSET: u8 = 44;

/// One value per physical encoder per bank.
pub type BankBuffer = [[u8; PHYSICAL_ENCODERS]; NUM_BANKS];

pub struct Controller {
    pub(crate) configs: [EncoderConfig; BANKED_ENCODERS],
    pub(crate) raw: [i16; VIRTUAL_ENCODERS],

    pub(crate) indicator: BankBuffer,
    pub(crate) color: BankBuffer,
    pub(crate) switch_state: BankBuffer,
    pub(crate) encoder_animation: BankBuffer,
    pub(crate) switch_animation: BankBuffer,

    /// Shift toggle state per bank.
    pub(crate) toggle: [Bitfield; NUM_BANKS],
    /// Colors set remotely, not touched by local switch presses.
    pub(crate) color_override: [Bitfield; NUM_BANKS],

    pub(crate) shift_page: [Bitfield; SHIFT_PAGES],
    pub(crate) shift_page_override: [Bitfield; SHIFT_PAGES],

    pub(crate) rotary: [RotaryState; PHYSICAL_ENCODERS],

    /// Stable switch state of the last pass.
    pub(crate) switches: u16,
    /// Encoders being turned as of the last pass.
    pub(crate) active: u16,

    pub(crate) bank: Bank,
    pub(crate) settings: Settings,
    pub(crate) velocity: VelocityEstimator,
}

impl Controller {
    /// Controller with factory configuration.
    pub fn new(settings: Settings) -> Self {
        Self::with_configs(factory_defaults(), settings)
    }

    pub fn with_configs(configs: [EncoderConfig; BANKED_ENCODERS], settings: Settings) -> Self {
        let mut c = Controller {
            configs,
            raw: [0; VIRTUAL_ENCODERS],
            indicator: [[0; PHYSICAL_ENCODERS]; NUM_BANKS],
            color: [[0; PHYSICAL_ENCODERS]; NUM_BANKS],
            switch_state: [[0; PHYSICAL_ENCODERS]; NUM_BANKS],
            encoder_animation: [[0; PHYSICAL_ENCODERS]; NUM_BANKS],
            switch_animation: [[0; PHYSICAL_ENCODERS]; NUM_BANKS],
            toggle: [Bitfield::default(); NUM_BANKS],
            color_override: [Bitfield::default(); NUM_BANKS],
            shift_page: [Bitfield::default(); SHIFT_PAGES],
            shift_page_override: [Bitfield::default(); SHIFT_PAGES],
            rotary: [RotaryState::default(); PHYSICAL_ENCODERS],
            switches: 0,
            active: 0,
            bank: Bank::default(),
            velocity: VelocityEstimator::new(settings.velocity),
            settings,
        };

        for id in BankedEncoderId::all() {
            let cfg = c.configs[id.index()];
            let start = if cfg.has_detent { DETENT_CENTER } else { 0 };

            c.raw[id.virtual_id(false).index()] = start;
            c.raw[id.virtual_id(true).index()] = start;

            let (b, e) = (id.bank().index(), id.encoder().index());
            c.indicator[b][e] = scale(start);
            c.color[b][e] = cfg.inactive_color;
        }

        c
    }

    /// Load all 64 records from `store`.
    pub fn load_from_store<S: ConfigStore>(
        store: &mut S,
        settings: Settings,
    ) -> Result<Self, Error<S::Error>> {
        let mut configs = factory_defaults();

        for id in BankedEncoderId::all() {
            let cfg = store.load(id.bank(), id.encoder()).map_err(|e| {
                log::warn!("Failed to load config for {}", id.index());
                e
            })?;
            configs[id.index()] = cfg.masked();
        }

        Ok(Self::with_configs(configs, settings))
    }

    /// Write one record through to `store` and, when that succeeds, into the
    /// live table.
    pub fn save_config<S: ConfigStore>(
        &mut self,
        store: &mut S,
        bank: Bank,
        encoder: PhysicalEncoder,
        config: EncoderConfig,
    ) -> Result<(), Error<S::Error>> {
        let config = config.masked();

        store.save(bank, encoder, &config).map_err(|e| {
            log::warn!("Failed to save config for bank {} encoder {}", bank.index(), encoder.index());
            e
        })?;

        let id = BankedEncoderId::new(bank, encoder);
        self.configs[id.index()] = config;

        // The shift sense may have changed with the switch action.
        let visible = self.virtual_id(bank, encoder);
        self.indicator[bank.index()][encoder.index()] = scale(self.raw[visible.index()]);

        Ok(())
    }

    /// Partial update of one record from a configuration transfer.
    pub fn apply_patch<S: ConfigStore>(
        &mut self,
        store: &mut S,
        bank: Bank,
        encoder: PhysicalEncoder,
        patch: &ConfigPatch,
    ) -> Result<EncoderConfig, Error<S::Error>> {
        let id = BankedEncoderId::new(bank, encoder);
        let config = patch.apply(&self.configs[id.index()]);

        self.save_config(store, bank, encoder, config)?;

        Ok(config)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.velocity = VelocityEstimator::new(settings.velocity);
        self.settings = settings;
    }

    /// One pass of input processing: rotaries, then switches, per encoder.
    pub fn process<M: MidiOut>(&mut self, snap: &ScanSnapshot, out: &mut M) {
        self.switches = snap.switches.state;
        self.active = snap.active;

        for enc in PhysicalEncoder::all() {
            self.process_rotary(enc, snap, out);

            if snap.switches.changed(enc.bit()) {
                self.process_switch(enc, &snap.switches, out);
            }
        }
    }

    fn process_rotary<M: MidiOut>(&mut self, enc: PhysicalEncoder, snap: &ScanSnapshot, out: &mut M) {
        let steps = snap.steps(enc);
        if steps == 0 {
            return;
        }

        let bank = self.bank;
        let id = BankedEncoderId::new(bank, enc);
        let cfg = self.configs[id.index()];
        let shifted = self.is_shifted(bank, enc);
        let vid = id.virtual_id(shifted);

        let motion = Motion {
            steps,
            idle_cycles: snap.idle_cycles(enc),
            fine: cfg.switch_action == SwitchAction::FineAdjust && snap.switches.is_held(enc.bit()),
        };

        let classifier = Classifier::new(&self.settings, &self.velocity);
        let outcome = classifier.classify(
            &mut self.rotary[enc.index()],
            &cfg,
            &mut self.raw[vid.index()],
            motion,
        );

        let indicator = &mut self.indicator[bank.index()][enc.index()];

        match outcome {
            Outcome::None => {}
            Outcome::Pinned => *indicator = DETENT_INDICATOR,
            Outcome::Absolute(value) => {
                let sk = (self.settings.super_knob_start, self.settings.super_knob_end);
                midi::send_encoder(out, &cfg, value, shifted, sk);
                *indicator = value;
            }
            Outcome::Relative(value) => midi::send_relative(out, &cfg, value, shifted),
        }
    }

    /// Whether the control shows its shifted value slot.
    ///
    /// Shift hold follows the live switch, shift toggle the bank's toggle bit.
    pub fn is_shifted(&self, bank: Bank, encoder: PhysicalEncoder) -> bool {
        let cfg = &self.configs[BankedEncoderId::new(bank, encoder).index()];

        match cfg.switch_action {
            SwitchAction::ShiftHold => self.switches & encoder.bit() != 0,
            SwitchAction::ShiftToggle => self.toggle[bank.index()].is(encoder.index() as u8),
            _ => false,
        }
    }

    /// The value slot currently on display for a control.
    pub fn virtual_id(&self, bank: Bank, encoder: PhysicalEncoder) -> VirtualEncoderId {
        BankedEncoderId::new(bank, encoder).virtual_id(self.is_shifted(bank, encoder))
    }

    pub fn current_bank(&self) -> Bank {
        self.bank
    }

    /// Switch the live bank.
    ///
    /// Values of the old bank are first copied to identically mapped
    /// controls in the other banks, then the indicators of both banks are
    /// rebuilt from their visible values.
    pub fn change_bank(&mut self, new_bank: Bank) {
        let old = self.bank;
        log::debug!("Change bank {} -> {}", old.index(), new_bank.index());

        self.transfer_values(old);

        for enc in PhysicalEncoder::all() {
            let old_vid = self.virtual_id(old, enc);
            let new_vid = self.virtual_id(new_bank, enc);

            self.indicator[old.index()][enc.index()] = scale(self.raw[old_vid.index()]);
            self.indicator[new_bank.index()][enc.index()] = scale(self.raw[new_vid.index()]);
        }

        self.bank = new_bank;
    }

    /// [`change_bank`](Self::change_bank) from an unchecked index.
    pub fn change_bank_index(&mut self, n: u8) -> Result<(), Error> {
        let bank = Bank::try_from(n)?;
        self.change_bank(bank);
        Ok(())
    }

    /// Rebuild the display state of the current bank.
    pub fn refresh(&mut self) {
        self.change_bank(self.bank);
    }

    fn transfer_values(&mut self, from: Bank) {
        for enc in PhysicalEncoder::all() {
            let this = BankedEncoderId::new(from, enc);
            let this_cfg = self.configs[this.index()];

            for that_bank in Bank::all().filter(|b| *b != from) {
                for that_enc in PhysicalEncoder::all() {
                    let that = BankedEncoderId::new(that_bank, that_enc);
                    let that_cfg = self.configs[that.index()];

                    if !this_cfg.maps_match(&that_cfg) {
                        continue;
                    }

                    log::trace!("Transfer value {} -> {}", this.index(), that.index());

                    let that_shifted = self.is_shifted(that_bank, that_enc);

                    for shifted in [false, true] {
                        let same_channel = if shifted {
                            this_cfg.shift_channel == that_cfg.shift_channel
                        } else {
                            this_cfg.encoder_channel == that_cfg.encoder_channel
                        };

                        if !same_channel {
                            continue;
                        }

                        let value = self.raw[this.virtual_id(shifted).index()];
                        self.raw[that.virtual_id(shifted).index()] = value;

                        if shifted == that_shifted {
                            self.indicator[that_bank.index()][that_enc.index()] = scale(value);
                        }
                    }
                }
            }
        }
    }

    /// Shift page mode: rotaries are ignored and every switch edge sends a
    /// note on the system channel.
    pub fn process_shift_page<M: MidiOut>(&mut self, page: u8, snap: &ScanSnapshot, out: &mut M) {
        let page = (page as usize) % SHIFT_PAGES;
        let channel = self.settings.system_channel;

        self.switches = snap.switches.state;

        for enc in PhysicalEncoder::all() {
            let bit = enc.bit();
            let i = enc.index() as u8;
            let number = SHIFT_OFFSET + (page * PHYSICAL_ENCODERS) as u8 + i;

            let on = if snap.switches.is_down(bit) {
                true
            } else if snap.switches.is_up(bit) {
                false
            } else {
                continue;
            };

            out.send_note(channel, number, on, if on { 127 } else { 0 });

            if !self.shift_page_override[page].is(i) {
                self.shift_page[page].set(i, on);
            }
        }
    }

    /// Lit switches of a shift page, one bit per encoder.
    pub fn shift_page_state(&self, page: u8) -> u16 {
        *self.shift_page[(page as usize) % SHIFT_PAGES]
    }

    pub fn indicator(&self, bank: Bank, encoder: PhysicalEncoder) -> u8 {
        self.indicator[bank.index()][encoder.index()]
    }

    pub fn color(&self, bank: Bank, encoder: PhysicalEncoder) -> u8 {
        self.color[bank.index()][encoder.index()]
    }

    pub fn encoder_animation(&self, bank: Bank, encoder: PhysicalEncoder) -> u8 {
        self.encoder_animation[bank.index()][encoder.index()]
    }

    pub fn switch_animation(&self, bank: Bank, encoder: PhysicalEncoder) -> u8 {
        self.switch_animation[bank.index()][encoder.index()]
    }

    /// Stored on/off value of a switch, 0 or 127.
    pub fn switch_state(&self, bank: Bank, encoder: PhysicalEncoder) -> u8 {
        self.switch_state[bank.index()][encoder.index()]
    }

    pub fn raw_value(&self, id: VirtualEncoderId) -> i16 {
        self.raw[id.index()]
    }

    pub fn config(&self, id: BankedEncoderId) -> &EncoderConfig {
        &self.configs[id.index()]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{EncoderMidiType, Movement};
    use crate::debounce::SwitchEdges;
    use crate::midi::cc;
    use crate::midi::test::Recorder;

    const E0: PhysicalEncoder = PhysicalEncoder::new_const(0);
    const E3: PhysicalEncoder = PhysicalEncoder::new_const(3);
    const B0: Bank = Bank::new_const(0);
    const B1: Bank = Bank::new_const(1);

    fn turn(enc: PhysicalEncoder, steps: i8) -> ScanSnapshot {
        let mut s = ScanSnapshot::default();
        s.steps[enc.index()] = steps;
        s.idle_cycles[enc.index()] = 20;
        s.active = enc.bit();
        s
    }

    #[derive(Default)]
    struct MemStore {
        records: Vec<(u8, EncoderConfig)>,
        fail: bool,
    }

    impl ConfigStore for MemStore {
        type Error = &'static str;

        fn load(&mut self, bank: Bank, encoder: PhysicalEncoder) -> Result<EncoderConfig, Self::Error> {
            if self.fail {
                return Err("read");
            }
            let id = BankedEncoderId::new(bank, encoder);
            let mut cfg = EncoderConfig::factory(id);
            if id.index() % 2 == 1 {
                cfg.has_detent = true;
            }
            Ok(cfg)
        }

        fn save(
            &mut self,
            bank: Bank,
            encoder: PhysicalEncoder,
            config: &EncoderConfig,
        ) -> Result<(), Self::Error> {
            if self.fail {
                return Err("write");
            }
            let id = BankedEncoderId::new(bank, encoder);
            self.records.push((id.index() as u8, *config));
            Ok(())
        }
    }

    #[test]
    fn initial_state() {
        let c = Controller::new(Settings::default());
        assert_eq!(c.current_bank(), B0);
        assert_eq!(c.indicator(B0, E0), 0);
        assert_eq!(c.color(B1, E0), 63);
        assert_eq!(c.switch_state(B0, E0), 0);
    }

    #[test]
    fn load_from_store_centers_detents() {
        let mut store = MemStore::default();
        let c = Controller::load_from_store(&mut store, Settings::default()).unwrap();
        let id = BankedEncoderId::new(B0, PhysicalEncoder::new_const(1));
        assert_eq!(c.raw_value(id.virtual_id(false)), DETENT_CENTER);
        assert_eq!(c.raw_value(id.virtual_id(true)), DETENT_CENTER);
        assert_eq!(c.indicator(B0, PhysicalEncoder::new_const(1)), 63);
        assert_eq!(c.raw_value(BankedEncoderId::new(B0, E0).virtual_id(false)), 0);
    }

    #[test]
    fn load_failure_is_store_error() {
        let mut store = MemStore {
            fail: true,
            ..Default::default()
        };
        let r = Controller::load_from_store(&mut store, Settings::default());
        assert!(matches!(r, Err(Error::Store("read"))));
    }

    #[test]
    fn save_and_patch() {
        let mut store = MemStore::default();
        let mut c = Controller::new(Settings::default());

        let patch = ConfigPatch::from_pairs([(17, 99), (18, 0)]);
        let cfg = c.apply_patch(&mut store, B1, E3, &patch).unwrap();
        assert_eq!(cfg.encoder_number, 99);
        assert_eq!(cfg.encoder_type, EncoderMidiType::Note);
        assert_eq!(c.config(BankedEncoderId::new(B1, E3)), &cfg);
        assert_eq!(store.records, vec![(19, cfg)]);

        store.fail = true;
        let mut other = cfg;
        other.encoder_number = 1;
        assert_eq!(
            c.save_config(&mut store, B1, E3, other),
            Err(Error::Store("write"))
        );
        // Live table untouched on failure.
        assert_eq!(c.config(BankedEncoderId::new(B1, E3)).encoder_number, 99);
    }

    #[test]
    fn turning_sends_and_shows() {
        let mut c = Controller::new(Settings::default());
        let mut out = Recorder::default();

        // Leave the bottom deadzone first.
        c.process(&turn(E3, 3), &mut out);
        assert_eq!(out.take(), vec![cc(0, 3, 1)]);
        c.process(&turn(E3, 2), &mut out);
        assert_eq!(out.take(), vec![cc(0, 3, 3)]);
        assert_eq!(c.indicator(B0, E3), 3);
    }

    #[test]
    fn emulation_movement() {
        let mut configs = factory_defaults();
        configs[0].movement = Movement::Emulation;
        let mut c = Controller::with_configs(configs, Settings::default());
        c.raw[0] = 1000;
        let mut out = Recorder::default();
        c.process(&turn(E0, 1), &mut out);
        assert_eq!(c.raw[0], 1178);
        assert_eq!(out.take(), vec![cc(0, 0, 12)]);
    }

    #[test]
    fn note_encoder_sends_on_and_off() {
        let mut configs = factory_defaults();
        configs[0].encoder_type = EncoderMidiType::Note;
        let mut c = Controller::with_configs(configs, Settings::default());
        let mut out = Recorder::default();

        c.raw[0] = 4000;
        c.process(&turn(E0, 1), &mut out);
        assert_eq!(c.indicator(B0, E0), 41);

        c.raw[0] = 100;
        c.process(&turn(E0, -1), &mut out);
        assert_eq!(c.raw[0], 0);

        assert_eq!(
            out.take(),
            vec![midi::note(0, 0, true, 127), midi::note(0, 0, false, 0)]
        );
    }

    #[test]
    fn bank_change_rebuilds_indicators() {
        let mut c = Controller::new(Settings::default());
        c.raw[BankedEncoderId::new(B1, E0).index()] = 5000;
        c.change_bank(B1);
        assert_eq!(c.current_bank(), B1);
        assert_eq!(c.indicator(B1, E0), 50);

        assert_eq!(c.change_bank_index(4), Err(Error::InvalidBank(4)));
        assert_eq!(c.current_bank(), B1);
    }

    #[test]
    fn refresh_keeps_bank() {
        let mut c = Controller::new(Settings::default());
        c.change_bank(B1);
        c.raw[BankedEncoderId::new(B1, E0).index()] = 1200;
        c.refresh();
        assert_eq!(c.current_bank(), B1);
        assert_eq!(c.indicator(B1, E0), 12);
    }

    #[test]
    fn shift_toggle_selects_other_slot() {
        let mut configs = factory_defaults();
        configs[0].switch_action = SwitchAction::ShiftToggle;
        let mut c = Controller::with_configs(configs, Settings::default());
        let mut out = Recorder::default();

        let press = ScanSnapshot {
            switches: SwitchEdges {
                state: 1,
                down: 1,
                up: 0,
            },
            ..Default::default()
        };
        c.process(&press, &mut out);
        assert!(c.is_shifted(B0, E0));
        assert_eq!(c.virtual_id(B0, E0).index(), 64);
        assert_eq!(out.take(), vec![cc(1, 0, 127)]);

        // Turning now moves the shifted slot on the shift channel.
        c.raw[64] = 1000;
        c.process(&turn(E0, 1), &mut out);
        assert_eq!(out.take(), vec![cc(4, 0, 11)]);
        assert_eq!(c.raw[0], 0);
    }

    #[test]
    fn shift_page_notes() {
        let mut c = Controller::new(Settings::default());
        let mut out = Recorder::default();

        let mut snap = turn(E3, 5);
        snap.switches = SwitchEdges {
            state: E3.bit(),
            down: E3.bit(),
            up: 0,
        };
        c.process_shift_page(1, &snap, &mut out);
        assert_eq!(out.take(), vec![midi::note(3, 44 + 16 + 3, true, 127)]);
        assert_eq!(c.shift_page_state(1), E3.bit());

        snap.switches = SwitchEdges {
            state: 0,
            down: 0,
            up: E3.bit(),
        };
        c.process_shift_page(1, &snap, &mut out);
        assert_eq!(out.take(), vec![midi::note(3, 63, false, 0)]);
        assert_eq!(c.shift_page_state(1), 0);
        // Rotaries were ignored.
        assert_eq!(c.raw[3], 0);
    }
}

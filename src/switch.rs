//! Switch actions.
//!
//! Handled on the debounced down/up edges of each knob's push switch. The
//! toggle and hold pairs differ only in when the stored state changes, so
//! both go through the same helpers for display and output.

use crate::address::{Bank, BankedEncoderId, PhysicalEncoder, NUM_BANKS};
use crate::classifier::{scale, DETENT_CENTER};
use crate::config::{EncoderMidiType, SwitchAction};
use crate::controller::Controller;
use crate::debounce::SwitchEdges;
use crate::midi::{self, MidiOut};

/// Stored switch state when on.
pub const SWITCH_ON: u8 = 127;

impl Controller {
    pub(crate) fn process_switch<M: MidiOut>(
        &mut self,
        enc: PhysicalEncoder,
        edges: &SwitchEdges,
        out: &mut M,
    ) {
        let bank = self.bank;
        let id = BankedEncoderId::new(bank, enc);
        let cfg = self.configs[id.index()];
        let bit = enc.bit();
        let down = edges.is_down(bit);

        match cfg.switch_action {
            SwitchAction::CcToggle | SwitchAction::NoteToggle => {
                if down {
                    let on = self.switch_state(bank, enc) == 0;
                    self.set_switch_state(bank, enc, on);
                    self.send_switch_value(id, on_value(on), on, out);
                }
            }

            SwitchAction::CcHold | SwitchAction::NoteHold => {
                self.set_switch_state(bank, enc, down);
                self.send_switch_value(id, on_value(down), down, out);
            }

            // Only changes rotary sensitivity while held.
            SwitchAction::FineAdjust => {}

            SwitchAction::ResetValue => {
                // Relative controls have no absolute value to announce.
                if down {
                    let value = self.reset_value(bank, enc);
                    let sk = (self.settings.super_knob_start, self.settings.super_knob_end);
                    midi::send_encoder(out, &cfg, value, false, sk);
                }
                self.send_switch_value(id, on_value(down), down, out);
            }

            SwitchAction::ShiftHold => {
                // The live switch state already selects the slot.
                self.show_shift(bank, enc, down);
                out.send_cc(cfg.switch_channel, cfg.switch_number, on_value(down));
            }

            SwitchAction::ShiftToggle => {
                if down {
                    self.toggle[bank.index()].toggle(enc.index() as u8);
                    let shifted = self.is_shifted(bank, enc);
                    self.show_shift(bank, enc, shifted);
                    out.send_cc(cfg.switch_channel, cfg.switch_number, on_value(shifted));
                }
            }
        }
    }

    /// Store a switch state and show it, unless the color is held remotely.
    fn set_switch_state(&mut self, bank: Bank, enc: PhysicalEncoder, on: bool) {
        self.switch_state[bank.index()][enc.index()] = on_value(on);
        self.show_active(bank, enc, on);
    }

    fn show_active(&mut self, bank: Bank, enc: PhysicalEncoder, on: bool) {
        if self.color_override[bank.index()].is(enc.index() as u8) {
            return;
        }

        let cfg = &self.configs[BankedEncoderId::new(bank, enc).index()];
        let color = if on { cfg.active_color } else { cfg.inactive_color };

        self.color[bank.index()][enc.index()] = color;
    }

    fn show_shift(&mut self, bank: Bank, enc: PhysicalEncoder, shifted: bool) {
        self.show_active(bank, enc, shifted);

        let visible = self.virtual_id(bank, enc);
        self.indicator[bank.index()][enc.index()] = scale(self.raw[visible.index()]);
    }

    /// Put the visible value back at its start and show it.
    fn reset_value(&mut self, bank: Bank, enc: PhysicalEncoder) -> u8 {
        let id = BankedEncoderId::new(bank, enc);
        let cfg = &self.configs[id.index()];
        let start = if cfg.has_detent { DETENT_CENTER } else { 0 };

        let visible = self.virtual_id(bank, enc);
        self.raw[visible.index()] = start;
        self.rotary[enc.index()].hold = 0;

        let value = scale(start);
        self.indicator[bank.index()][enc.index()] = value;

        value
    }

    /// Send a switch value through the mapping of `id`.
    ///
    /// A CC style switch pressed on the system channel with a number below
    /// the bank count is a bank shortcut and also changes bank.
    fn send_switch_value<M: MidiOut>(&mut self, id: BankedEncoderId, value: u8, on: bool, out: &mut M) {
        let cfg = self.configs[id.index()];

        let sent = if on && cfg.encoder_type == EncoderMidiType::CcSwitchVelocity {
            scale(self.raw[id.virtual_id(false).index()])
        } else {
            value
        };

        midi::send_switch(out, &cfg, sent, on);

        let shortcut = !cfg.switch_action.is_note()
            && value != 0
            && cfg.switch_channel == self.settings.system_channel
            && (cfg.switch_number as usize) < NUM_BANKS;

        if shortcut {
            let (bank, enc) = (id.bank(), id.encoder());

            // Otherwise the switch would stay lit in the bank we leave.
            self.switch_state[bank.index()][enc.index()] = 0;
            self.show_active(bank, enc, false);

            self.change_bank(Bank::from_masked(cfg.switch_number));
        }
    }
}

fn on_value(on: bool) -> u8 {
    if on {
        SWITCH_ON
    } else {
        0
    }
}

#[cfg(test)]
mod test {
    use crate::address::{Bank, BankedEncoderId, PhysicalEncoder};
    use crate::classifier::DETENT_CENTER;
    use crate::config::{factory_defaults, EncoderMidiType, Settings, SwitchAction};
    use crate::controller::Controller;
    use crate::debounce::SwitchEdges;
    use crate::midi::test::Recorder;
    use crate::midi::{cc, note};
    use crate::scan::ScanSnapshot;

    const E2: PhysicalEncoder = PhysicalEncoder::new_const(2);
    const B0: Bank = Bank::new_const(0);

    fn press(enc: PhysicalEncoder) -> ScanSnapshot {
        ScanSnapshot {
            switches: SwitchEdges {
                state: enc.bit(),
                down: enc.bit(),
                up: 0,
            },
            ..Default::default()
        }
    }

    fn release(enc: PhysicalEncoder) -> ScanSnapshot {
        ScanSnapshot {
            switches: SwitchEdges {
                state: 0,
                down: 0,
                up: enc.bit(),
            },
            ..Default::default()
        }
    }

    fn with_action(action: SwitchAction) -> Controller {
        let mut configs = factory_defaults();
        configs[2].switch_action = action;
        Controller::with_configs(configs, Settings::default())
    }

    #[test]
    fn cc_hold() {
        let mut c = with_action(SwitchAction::CcHold);
        let mut out = Recorder::default();

        c.process(&press(E2), &mut out);
        assert_eq!(out.take(), vec![cc(1, 2, 127)]);
        assert_eq!(c.switch_state(B0, E2), 127);
        assert_eq!(c.color(B0, E2), 25);

        c.process(&release(E2), &mut out);
        assert_eq!(out.take(), vec![cc(1, 2, 0)]);
        assert_eq!(c.switch_state(B0, E2), 0);
        assert_eq!(c.color(B0, E2), 113);
    }

    #[test]
    fn note_toggle() {
        let mut c = with_action(SwitchAction::NoteToggle);
        let mut out = Recorder::default();

        c.process(&press(E2), &mut out);
        c.process(&release(E2), &mut out);
        assert_eq!(out.take(), vec![note(1, 2, true, 127)]);
        assert_eq!(c.switch_state(B0, E2), 127);

        c.process(&press(E2), &mut out);
        assert_eq!(out.take(), vec![note(1, 2, false, 0)]);
        assert_eq!(c.switch_state(B0, E2), 0);
        assert_eq!(c.color(B0, E2), 113);
    }

    #[test]
    fn override_keeps_remote_color() {
        let mut c = with_action(SwitchAction::CcToggle);
        c.color_override[0].set(2, true);
        c.color[0][2] = 9;
        let mut out = Recorder::default();

        c.process(&press(E2), &mut out);
        assert_eq!(out.take(), vec![cc(1, 2, 127)]);
        assert_eq!(c.color(B0, E2), 9);
    }

    #[test]
    fn fine_adjust_is_silent() {
        let mut c = with_action(SwitchAction::FineAdjust);
        let mut out = Recorder::default();
        c.process(&press(E2), &mut out);
        c.process(&release(E2), &mut out);
        assert!(out.0.is_empty());
    }

    #[test]
    fn reset_value() {
        let mut configs = factory_defaults();
        configs[2].switch_action = SwitchAction::ResetValue;
        configs[2].has_detent = true;
        let mut c = Controller::with_configs(configs, Settings::default());
        c.raw[2] = 9000;
        let mut out = Recorder::default();

        c.process(&press(E2), &mut out);
        assert_eq!(out.take(), vec![cc(0, 2, 63), cc(1, 2, 127)]);
        assert_eq!(c.raw[2], DETENT_CENTER);
        assert_eq!(c.indicator(B0, E2), 63);

        c.process(&release(E2), &mut out);
        assert_eq!(out.take(), vec![cc(1, 2, 0)]);
    }

    #[test]
    fn reset_relative_only_sends_switch() {
        let mut configs = factory_defaults();
        configs[2].switch_action = SwitchAction::ResetValue;
        configs[2].encoder_type = EncoderMidiType::Relative;
        let mut c = Controller::with_configs(configs, Settings::default());
        c.raw[2] = 5000;
        let mut out = Recorder::default();

        c.process(&press(E2), &mut out);
        assert_eq!(out.take(), vec![cc(1, 2, 127)]);
        assert_eq!(c.raw[2], 0);
    }

    #[test]
    fn shift_hold_follows_switch() {
        let mut c = with_action(SwitchAction::ShiftHold);
        c.raw[64 + 2] = 4000;
        let mut out = Recorder::default();

        c.process(&press(E2), &mut out);
        assert!(c.is_shifted(B0, E2));
        assert_eq!(c.indicator(B0, E2), 40);
        assert_eq!(c.color(B0, E2), 25);
        assert_eq!(out.take(), vec![cc(1, 2, 127)]);

        c.process(&release(E2), &mut out);
        assert!(!c.is_shifted(B0, E2));
        assert_eq!(c.indicator(B0, E2), 0);
        assert_eq!(c.color(B0, E2), 113);
        assert_eq!(out.take(), vec![cc(1, 2, 0)]);
    }

    #[test]
    fn switch_velocity_sends_rotary_value() {
        let mut configs = factory_defaults();
        configs[2].encoder_type = EncoderMidiType::CcSwitchVelocity;
        let mut c = Controller::with_configs(configs, Settings::default());
        c.raw[2] = 4400;
        let mut out = Recorder::default();

        c.process(&press(E2), &mut out);
        c.process(&release(E2), &mut out);
        assert_eq!(out.take(), vec![cc(1, 2, 44), cc(1, 2, 0)]);
    }

    #[test]
    fn bank_shortcut() {
        let mut configs = factory_defaults();
        configs[2].switch_channel = 3;
        configs[2].switch_number = 2;
        let mut c = Controller::with_configs(configs, Settings::default());
        let mut out = Recorder::default();

        c.process(&press(E2), &mut out);
        assert_eq!(out.take(), vec![cc(3, 2, 127)]);
        assert_eq!(c.current_bank(), Bank::new_const(2));
        assert_eq!(c.switch_state(B0, E2), 0);
        assert_eq!(c.color(B0, E2), 113);

        // Release goes out through the new bank's mapping, no bank change.
        c.process(&release(E2), &mut out);
        let id = BankedEncoderId::new(Bank::new_const(2), E2);
        assert_eq!(out.take(), vec![cc(1, id.index() as u8, 0)]);
        assert_eq!(c.current_bank(), Bank::new_const(2));
    }
}

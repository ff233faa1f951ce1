//! End to end runs through scanner, controller and feedback.

use crate::address::{Bank, BankedEncoderId, PhysicalEncoder};
use crate::classifier::{scale, DETENT_CENTER, RAW_MAX};
use crate::config::{factory_defaults, EncoderMidiType, Settings};
use crate::controller::Controller;
use crate::feedback::InboundKind;
use crate::input::RawSample;
use crate::midi::test::Recorder;
use crate::midi::cc;
use crate::scan::{ScanSnapshot, SharedScanner};

const E0: PhysicalEncoder = PhysicalEncoder::new_const(0);
const E3: PhysicalEncoder = PhysicalEncoder::new_const(3);
const E5: PhysicalEncoder = PhysicalEncoder::new_const(5);
const B0: Bank = Bank::new_const(0);
const B1: Bank = Bank::new_const(1);

fn turn(enc: PhysicalEncoder, steps: i8) -> ScanSnapshot {
    let mut s = ScanSnapshot::default();
    s.steps[enc.index()] = steps;
    s.idle_cycles[enc.index()] = 20 * steps.unsigned_abs() as u16;
    s.active = enc.bit();
    s
}

#[test]
fn leaving_bottom_of_travel() {
    let settings = Settings {
        dead_zone_size: 0,
        ..Default::default()
    };
    let mut c = Controller::new(settings);
    let mut out = Recorder::default();

    for _ in 0..3 {
        c.process(&turn(E0, 1), &mut out);
    }

    assert_eq!(c.raw_value(BankedEncoderId::new(B0, E0).virtual_id(false)), 300);
    assert_eq!(out.take(), vec![cc(0, 0, 1), cc(0, 0, 2), cc(0, 0, 3)]);
    assert_eq!(c.indicator(B0, E0), 3);
}

#[test]
fn detent_exit() {
    let mut configs = factory_defaults();
    configs[0].has_detent = true;
    let mut c = Controller::with_configs(configs, Settings::default());
    let mut out = Recorder::default();

    c.process(&turn(E0, 4), &mut out);
    assert!(out.0.is_empty());
    assert_eq!(c.indicator(B0, E0), 63);

    c.process(&turn(E0, 5), &mut out);
    assert_eq!(out.take(), vec![cc(0, 0, 65)]);
    assert_eq!(c.raw[0], 6450);

    // Leaving the detent left no pending hold behind.
    c.process(&turn(E0, 1), &mut out);
    assert_eq!(out.take(), vec![cc(0, 0, 66)]);
}

#[test]
fn super_knob() {
    let mut configs = factory_defaults();
    configs[0].super_knob = true;
    let mut c = Controller::with_configs(configs, Settings::default());
    let mut out = Recorder::default();

    c.raw[0] = 9900;
    c.process(&turn(E0, 1), &mut out);
    assert_eq!(out.take(), vec![cc(0, 0, 100), cc(0, 64, 73)]);

    c.raw[0] = 4900;
    c.process(&turn(E0, 1), &mut out);
    assert_eq!(out.take(), vec![cc(0, 0, 50), cc(0, 64, 0)]);
}

#[test]
fn value_follows_mapping_across_banks() {
    let mut configs = factory_defaults();
    for i in [0, 16 + 5] {
        configs[i].encoder_channel = 1;
        configs[i].encoder_number = 10;
        configs[i].encoder_type = EncoderMidiType::Cc;
    }
    // Keep bank 0 encoder 10 off number 10 so only encoder 0 matches.
    configs[10].encoder_number = 99;
    let mut c = Controller::with_configs(configs, Settings::default());
    let mut out = Recorder::default();

    c.raw[0] = 3900;
    c.process(&turn(E0, 1), &mut out);
    assert_eq!(out.take(), vec![cc(1, 10, 40)]);

    // Shifted side and a control mapped only in bank 0.
    c.raw[64] = 2500;
    c.raw[3] = 7700;

    c.change_bank(B1);
    let that = BankedEncoderId::new(B1, E5);
    assert_eq!(c.raw_value(that.virtual_id(false)), 4000);
    assert_eq!(c.raw_value(that.virtual_id(true)), 2500);
    assert_eq!(c.indicator(B1, E5), 40);

    let unmapped = BankedEncoderId::new(B1, E3);
    assert_eq!(c.raw_value(unmapped.virtual_id(false)), 0);
    assert_eq!(c.raw_value(unmapped.virtual_id(true)), 0);
    assert_eq!(c.indicator(B1, E3), 0);
    assert_eq!(c.raw[3], 7700);

    // Turning the other physical knob carries on from there.
    c.process(&turn(E5, 1), &mut out);
    assert_eq!(out.take(), vec![cc(1, 10, 41)]);
}

#[test]
fn feedback_is_never_echoed() {
    let mut c = Controller::new(Settings::default());
    let mut out = Recorder::default();

    c.on_inbound(0, InboundKind::Cc, 0, 90);
    c.on_inbound(1, InboundKind::Cc, 0, 127);
    c.on_inbound(3, InboundKind::Cc, 1, 127);

    c.process(&ScanSnapshot::default(), &mut out);
    assert!(out.0.is_empty());
    assert_eq!(c.current_bank(), B1);
    // Bank 0 values survived the bank change.
    assert_eq!(c.raw[0], 9000);
    assert_eq!(c.indicator(B0, E0), 90);
}

#[test]
fn values_stay_in_range() {
    let mut configs = factory_defaults();
    configs[0].has_detent = true;
    let mut c = Controller::with_configs(configs, Settings::default());
    let mut out = Recorder::default();

    let moves = [127, 127, -128, 3, -1, 50, 127, 127, -9, -128, -128, 1];
    for _ in 0..4 {
        for m in moves {
            c.process(&turn(E0, m), &mut out);
            let raw = c.raw[0];
            assert!((0..=RAW_MAX).contains(&raw));
            assert!(c.indicator(B0, E0) <= 127);
        }
    }

    for msg in out.take() {
        if let midi_types::MidiMessage::ControlChange(_, _, v) = msg {
            assert!(u8::from(v) <= 127);
        }
    }
    assert_eq!(scale(DETENT_CENTER), 63);
}

#[test]
fn scanner_to_midi() {
    let scanner = SharedScanner::new();
    let mut c = Controller::new(Settings::default());
    let mut out = Recorder::default();

    let sample = |a: u16, b: u16| RawSample {
        channel_a: a,
        channel_b: b,
        switches: 0,
    };

    for _ in 0..10 {
        scanner.scan(sample(0, 0));
    }
    // One clockwise cycle of encoder 0.
    for (a, b) in [(1, 0), (1, 1), (0, 1), (0, 0)] {
        scanner.scan(sample(a, b));
    }

    let snap = scanner.take();
    assert_eq!(snap.steps(E0), 4);
    assert!(snap.is_active(E0));

    c.process(&snap, &mut out);
    assert_eq!(out.take(), vec![cc(0, 0, 1)]);
}

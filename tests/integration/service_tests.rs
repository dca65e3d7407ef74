//! Integration tests for the command surface and tick pipeline of
//! `SignalService` against the mock board.

use embassy_sync::channel::Channel;

use lineside::app::channels::{COMMAND_CHANNEL, COMMAND_DEPTH, CommandChannel};
use lineside::app::commands::SignalCommand;
use lineside::app::events::SignalEvent;
use lineside::{Bank, Color, Error, LampId, SignalConfig, SignalService};

use crate::mock_hw::{MockBoard, RecordingSink, ready_service, run_until};

/// Six lamps on one head, pins (2,3), (4,5), ... (12,13).
fn six_lamp_head(svc: &mut SignalService, board: &mut MockBoard) {
    for l in 0..6u8 {
        svc.register(0, 0, l, 2 + 2 * l, 3 + 2 * l, Color::RED, board)
            .expect("register");
    }
}

// ── Registration ──────────────────────────────────────────────

#[test]
fn registration_drains_both_pins() {
    let mut sink = RecordingSink::new();
    let mut svc = ready_service(false, &mut sink);
    let mut board = MockBoard::new();

    let id = svc.register(0, 0, 0, 2, 3, Color::RED, &mut board);
    assert!(id.is_some());
    assert_eq!(board.pins.writes(), 7);
    assert_eq!(board.pins.delayed_us(), 2000);
    assert_eq!(board.pins.driven_high().count() + board.pins.driven_low().count(), 0);
    assert_eq!(board.pins.peak_paths(), 0);
}

#[test]
fn bad_registrations_touch_nothing() {
    let mut sink = RecordingSink::new();
    let mut board = MockBoard::new();

    let mut cold = SignalService::new(SignalConfig::default());
    assert!(cold.register(0, 0, 0, 2, 3, Color::RED, &mut board).is_none());

    let mut svc = ready_service(false, &mut sink);
    assert!(svc.register(0, 0, 0, 2, 2, Color::RED, &mut board).is_none());
    assert!(svc.register(0, 0, 0, 2, 70, Color::RED, &mut board).is_none());
    assert!(svc.register(0, 0, 0, 2, 3, Color::DARK, &mut board).is_none());
    assert_eq!(board.pins.writes(), 0);
    assert_eq!(svc.lamps_at(0, 0, None).count(), 0);
}

#[test]
fn arena_fills_up() {
    let mut sink = RecordingSink::new();
    let mut svc = ready_service(false, &mut sink);
    let mut board = MockBoard::new();

    let mut accepted = 0;
    for n in 0..70u8 {
        if svc.register(1, n / 8, n % 8, 2, 3, Color::GREEN, &mut board).is_some() {
            accepted += 1;
        }
    }
    // one slot belongs to the dark sentinel
    assert_eq!(accepted, 63);
}

// ── Events ────────────────────────────────────────────────────

#[test]
fn quiet_service_emits_nothing() {
    let mut sink = RecordingSink::new();
    let mut svc = ready_service(false, &mut sink);
    let mut board = MockBoard::new();
    svc.register(0, 0, 0, 2, 3, Color::RED, &mut board).unwrap();
    svc.set_lamp(0, 0, 0, true, true);

    for _ in 0..20_000 {
        svc.update(&mut board, &mut sink).unwrap();
    }
    assert!(sink.events.is_empty());
}

#[test]
fn reporting_service_announces_ready_and_divisions() {
    let mut sink = RecordingSink::new();
    let mut svc = ready_service(true, &mut sink);
    let mut board = MockBoard::new();

    match sink.events.first() {
        Some(SignalEvent::Ready(t)) => {
            assert_eq!(t.cycle_time_us, 2500);
            assert_eq!(t.pulse_us, 2494);
            assert_eq!(t.cycles_per_division, 40);
            assert_eq!(t.half_interval_us, 500_000);
        }
        other => panic!("expected Ready first, got {other:?}"),
    }

    // a second setup is a no-op
    svc.setup(&mut sink);
    assert_eq!(sink.events.len(), 1);

    run_until(&mut svc, &mut board, &mut sink, 50_000, |s, _| s.division() == 2).unwrap();
    let divisions: Vec<u8> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            SignalEvent::DivisionChanged { division, .. } => Some(*division),
            _ => None,
        })
        .collect();
    assert_eq!(divisions, [1, 2]);
}

#[test]
fn update_before_setup_does_nothing() {
    let mut sink = RecordingSink::new();
    let mut svc = SignalService::new(SignalConfig {
        report_events: true,
        ..SignalConfig::default()
    });
    let mut board = MockBoard::new();
    svc.update(&mut board, &mut sink).unwrap();
    assert!(sink.events.is_empty());
    assert_eq!(board.pins.writes(), 0);
}

#[test]
fn current_lamp_falls_back_to_sentinel_when_all_dark() {
    let mut sink = RecordingSink::new();
    let mut svc = ready_service(false, &mut sink);
    let mut board = MockBoard::new();
    six_lamp_head(&mut svc, &mut board);

    svc.set_lamp(0, 0, 2, true, false);
    for _ in 0..3000 {
        svc.update(&mut board, &mut sink).unwrap();
    }
    let lamp = svc.lamps_at(0, 0, Some(2)).next().map(|(id, _)| id);
    assert_eq!(Some(svc.current_lamp()), lamp);

    svc.clear_head(0, 0);
    for _ in 0..20_000 {
        svc.update(&mut board, &mut sink).unwrap();
    }
    assert_eq!(svc.lit_count(), 0);
    assert_eq!(svc.current_lamp(), LampId::SENTINEL);
    assert!(board.lit().is_none());
}

// ── Adaptive timing ───────────────────────────────────────────

#[test]
fn lamp_count_jump_resizes_cycle() {
    let mut sink = RecordingSink::new();
    let mut svc = ready_service(true, &mut sink);
    let mut board = MockBoard::new();
    six_lamp_head(&mut svc, &mut board);

    svc.set_lamp(0, 0, 0, true, false);
    for _ in 0..500 {
        svc.update(&mut board, &mut sink).unwrap();
    }
    for l in 1..6 {
        svc.set_lamp(0, 0, l, true, false);
    }
    svc.update(&mut board, &mut sink).unwrap();

    let (cycle, pulse, lit) = sink.cycle_adjustments().last().expect("no cycle event");
    assert_eq!(lit, 6);
    // pulse + overhead is target / 6 whatever the measured overhead
    assert_eq!(cycle, 2496);
    assert!((366..=410).contains(&pulse), "pulse {pulse}");
    assert_eq!(svc.division(), 0);
    assert_eq!(svc.timing().cycles_per_division, 40);
}

#[test]
fn crowded_cycle_stretches_past_target() {
    let mut sink = RecordingSink::new();
    let mut svc = ready_service(false, &mut sink);
    let mut board = MockBoard::new();
    six_lamp_head(&mut svc, &mut board);

    svc.set_cycle_time(600);
    assert_eq!(svc.timing().cycle_time_us, 600);

    svc.set_head_color(0, 0, Color::RED, false);
    svc.update(&mut board, &mut sink).unwrap();

    let t = svc.timing();
    assert_eq!(t.target_cycle_us, 600);
    assert_eq!(t.pulse_us, 200);
    assert!(t.cycle_time_us > 600);
    assert_eq!(t.cycle_time_us % 6, 0);
}

// ── Command queue ─────────────────────────────────────────────

#[test]
fn drain_commands_applies_queue_in_order() {
    let mut sink = RecordingSink::new();
    let mut svc = ready_service(false, &mut sink);
    let mut board = MockBoard::new();
    let id = svc.register(2, 1, 0, 2, 3, Color::GREEN, &mut board).unwrap();

    let channel = &COMMAND_CHANNEL;
    channel
        .try_send(SignalCommand::SetLamp {
            mast: 2,
            head: 1,
            lamp: 0,
            lit: true,
            flashing: true,
        })
        .unwrap();
    channel.try_send(SignalCommand::SetFlashRate(30)).unwrap();
    channel.try_send(SignalCommand::SetCycleTime(50)).unwrap();

    assert_eq!(svc.drain_commands(channel), 3);
    assert_eq!(svc.drain_commands(channel), 0);

    let flags = svc.lamp(id).unwrap().flags;
    assert!(flags.lit && flags.flashing && flags.starting);
    assert_eq!(svc.timing().flash_rate_fpm, 30);
    // out-of-range cycle time was consumed but ignored
    assert_eq!(svc.timing().target_cycle_us, 2500);
}

#[test]
fn full_queue_rejects_at_sender() {
    let channel: CommandChannel = Channel::new();
    for _ in 0..COMMAND_DEPTH {
        channel.try_send(SignalCommand::SetFlashRate(60)).unwrap();
    }
    assert!(channel.try_send(SignalCommand::SetFlashRate(60)).is_err());
}

#[test]
fn timing_commands_are_range_checked() {
    let mut sink = RecordingSink::new();
    let mut svc = ready_service(false, &mut sink);

    svc.handle_command(SignalCommand::SetCycleTime(399));
    svc.handle_command(SignalCommand::SetCycleTime(20_001));
    svc.handle_command(SignalCommand::SetFlashRate(0));
    svc.handle_command(SignalCommand::SetFlashRate(201));
    let t = svc.timing();
    assert_eq!((t.target_cycle_us, t.flash_rate_fpm), (2500, 60));

    svc.handle_command(SignalCommand::SetCycleTime(20_000));
    svc.handle_command(SignalCommand::SetFlashRate(200));
    let t = svc.timing();
    assert_eq!((t.target_cycle_us, t.flash_rate_fpm), (20_000, 200));
    assert_eq!(t.half_interval_us, 150_000);
}

// ── Safety ────────────────────────────────────────────────────

#[test]
fn bank_fault_latches_and_stops_driving() {
    let mut sink = RecordingSink::new();
    let mut svc = ready_service(false, &mut sink);
    let mut board = MockBoard::new();
    svc.register(0, 0, 0, 2, 3, Color::RED, &mut board).unwrap();
    svc.register(0, 0, 1, 4, 5, Color::GREEN, &mut board).unwrap();
    svc.set_lamp(0, 0, 0, true, false);
    svc.set_lamp(0, 0, 1, true, false);

    run_until(&mut svc, &mut board, &mut sink, 100_000, |_, b| {
        b.pins.pin(2).is_some_and(|p| p.is_high())
    })
    .expect("anode 2 never driven");

    // the board stops acknowledging pin 2, so its release is never counted
    board.pulled = Some(2);
    let mut outcome = Ok(());
    for _ in 0..10_000 {
        outcome = svc.update(&mut board, &mut sink);
        if outcome.is_err() {
            break;
        }
    }

    let Err(Error::Safety(fault)) = outcome else {
        panic!("expected a safety fault, got {outcome:?}");
    };
    assert_eq!(fault.bank, Bank::Anode);
    assert_eq!(fault.pin, 4);
    assert_eq!(fault.active, 2);
    assert_eq!(svc.fault(), Some(fault));
    // reported even though event reporting is off
    assert_eq!(sink.faults(), 1);

    let writes = board.pins.writes();
    for _ in 0..100 {
        assert_eq!(svc.update(&mut board, &mut sink), Err(Error::Safety(fault)));
    }
    assert_eq!(board.pins.writes(), writes);
    assert_eq!(sink.faults(), 1);
}

// ── Configuration ─────────────────────────────────────────────

#[test]
fn json_config_drives_the_service() {
    let config = SignalConfig::from_json(r#"{"cycle_time_us": 5000, "flash_rate_fpm": 30}"#).unwrap();
    let mut sink = RecordingSink::new();
    let mut svc = SignalService::new(config);
    svc.setup(&mut sink);
    assert_eq!(svc.config().flash_rate_fpm, 30);
    let t = svc.timing();
    assert_eq!(t.cycle_time_us, 5000);
    // 60e6 / (30 x 5000) = 400 cycles per flash
    assert_eq!(t.cycles_per_division, 40);
    assert_eq!(t.half_interval_us, 1_000_000);
}

#[test]
fn invalid_json_config_is_rejected() {
    assert!(SignalConfig::from_json(r#"{"min_pulse_us": 0}"#).is_err());
    assert!(SignalConfig::from_json("not json").is_err());
}

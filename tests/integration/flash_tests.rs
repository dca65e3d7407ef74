//! Whole-interval behavior of the ramp: start holds, steady lamps,
//! alternating pairs, color swaps, ramped shutdown and the microsecond
//! counter wrap.

use std::collections::BTreeSet;

use lineside::app::events::SignalEvent;
use lineside::{Color, LampId, PinId, SignalService};

use crate::mock_hw::{MockBoard, RecordingSink, ready_service, run_until};

const LIMIT: usize = 200_000;

fn settled(svc: &SignalService, id: LampId) -> bool {
    svc.lamp(id).is_some_and(|l| l.flags.lit && !l.flags.starting && !l.flags.hold)
}

/// Run one complete flash interval, from one division-0 restart to the
/// next, and report per division whether `pins` were ever conducting.
fn divisions_lit(
    svc: &mut SignalService,
    board: &mut MockBoard,
    sink: &mut RecordingSink,
    pins: &[(PinId, PinId)],
) -> Vec<[bool; 10]> {
    // align to the start of an interval
    let mut prev = svc.division();
    run_until(svc, board, sink, LIMIT, |s, _| {
        let restarted = prev != 0 && s.division() == 0;
        prev = s.division();
        restarted
    })
    .expect("no interval start");

    let mut seen = vec![[false; 10]; pins.len()];
    let mut prev = svc.division();
    run_until(svc, board, sink, LIMIT, |s, b| {
        let div = s.division();
        if prev != 0 && div == 0 {
            return true;
        }
        prev = div;
        if let Some(live) = b.lit() {
            for (i, p) in pins.iter().enumerate() {
                if *p == live {
                    seen[i][div as usize] = true;
                }
            }
        }
        false
    })
    .expect("interval never ended");
    seen
}

#[test]
fn start_is_held_until_release_then_lamp_stays_on() {
    let mut sink = RecordingSink::new();
    let mut svc = ready_service(false, &mut sink);
    let mut board = MockBoard::new();
    let id = svc.register(0, 0, 0, 2, 3, Color::RED, &mut board).unwrap();
    svc.set_lamp(0, 0, 0, true, false);

    // dark through the first interval: held, then released at division 9
    let mut released = false;
    run_until(&mut svc, &mut board, &mut sink, LIMIT, |s, b| {
        if s.division() == 9 {
            released = true;
        }
        if !released {
            assert!(b.lit().is_none(), "held lamp energized");
            assert!(s.lamp(id).unwrap().flags.hold);
        }
        settled(s, id)
    })
    .expect("lamp never settled");
    assert!(released);

    let seen = divisions_lit(&mut svc, &mut board, &mut sink, &[(2, 3)]);
    assert_eq!(seen[0], [true; 10]);
}

#[test]
fn start_ramp_rises_through_duty_steps() {
    let mut sink = RecordingSink::new();
    let mut svc = ready_service(false, &mut sink);
    let mut board = MockBoard::new();
    let id = svc.register(0, 0, 0, 2, 3, Color::RED, &mut board).unwrap();
    svc.set_lamp(0, 0, 0, true, false);
    run_until(&mut svc, &mut board, &mut sink, LIMIT, |s, _| s.division() == 9).unwrap();

    // passes on which the lamp was energized, per division 0..3
    let mut on: [BTreeSet<u32>; 3] = Default::default();
    let mut last_pass = svc.pass_count();
    run_until(&mut svc, &mut board, &mut sink, LIMIT, |s, b| {
        let (div, pass) = (s.division(), s.pass_count());
        // skip the tick that closed a pass, it decided on the previous count
        let mid_pass = pass == last_pass;
        last_pass = pass;
        if div == 3 {
            return true;
        }
        if mid_pass && div < 3 && b.lit().is_some() {
            on[div as usize].insert(pass);
        }
        false
    })
    .expect("ramp never reached division 3");

    // 40 passes per division at 1/6, 1/4 and 1/2 duty
    assert_eq!(on.map(|p| p.len()), [7, 10, 20]);
    assert!(!svc.lamp(id).unwrap().flags.starting);
}

#[test]
fn alternating_pair_shares_the_interval() {
    let mut sink = RecordingSink::new();
    let mut svc = ready_service(false, &mut sink);
    let mut board = MockBoard::new();
    let a = svc.register(0, 0, 0, 2, 3, Color::RED, &mut board).unwrap();
    let b = svc.register(0, 0, 1, 4, 5, Color::RED, &mut board).unwrap();
    svc.set_alternate(0, 0, 0, false);
    svc.set_alternate(0, 0, 1, true);

    run_until(&mut svc, &mut board, &mut sink, LIMIT, |s, _| settled(s, a) && settled(s, b))
        .expect("pair never settled");

    let seen = divisions_lit(&mut svc, &mut board, &mut sink, &[(2, 3), (4, 5)]);
    let (normal, alternate) = (seen[0], seen[1]);

    // full brightness on one side means dark on the other
    assert!(normal[4] && !alternate[4], "division 4: {normal:?} / {alternate:?}");
    assert!(alternate[9] && !normal[9], "division 9: {normal:?} / {alternate:?}");
    assert!(normal[3] && normal[5]);
    assert!(alternate[0] && alternate[8]);
}

#[test]
fn hard_switched_pair_never_overlaps() {
    let mut sink = RecordingSink::new();
    let mut svc = ready_service(false, &mut sink);
    let mut board = MockBoard::new();
    let a = svc.register(0, 0, 0, 2, 3, Color::RED, &mut board).unwrap();
    let b = svc.register(0, 0, 1, 4, 5, Color::RED, &mut board).unwrap();
    svc.set_ramp(0, 0, 0, false);
    svc.set_ramp(0, 0, 1, false);
    svc.set_alternate(0, 0, 0, false);
    svc.set_alternate(0, 0, 1, true);

    run_until(&mut svc, &mut board, &mut sink, LIMIT, |s, _| settled(s, a) && settled(s, b))
        .expect("pair never settled");

    let seen = divisions_lit(&mut svc, &mut board, &mut sink, &[(2, 3), (4, 5)]);
    let (normal, alternate) = (seen[0], seen[1]);
    assert_eq!(normal, [false, true, true, true, true, true, false, false, false, false]);
    assert_eq!(alternate, [true, false, false, false, false, false, true, true, true, true]);
}

#[test]
fn composite_color_swap_stops_before_starting() {
    let mut sink = RecordingSink::new();
    let mut svc = ready_service(false, &mut sink);
    let mut board = MockBoard::new();
    let green = svc.register(1, 0, 0, 2, 3, Color::GREEN, &mut board).unwrap();
    let green_yellow = svc.register(1, 0, 1, 4, 5, Color::GREEN_YELLOW, &mut board).unwrap();
    let red_yellow = svc.register(1, 0, 2, 6, 7, Color::RED_YELLOW, &mut board).unwrap();

    svc.set_head_color(1, 0, Color::GREEN, false);
    run_until(&mut svc, &mut board, &mut sink, LIMIT, |s, _| {
        settled(s, green) && settled(s, green_yellow)
    })
    .expect("green never settled");
    assert!(!svc.lamp(red_yellow).unwrap().flags.lit);

    // swap at the top of an interval
    let mut prev = svc.division();
    run_until(&mut svc, &mut board, &mut sink, LIMIT, |s, _| {
        let restarted = prev != 0 && s.division() == 0;
        prev = s.division();
        restarted
    })
    .unwrap();
    svc.set_head_color(1, 0, Color::YELLOW, false);

    let gy = svc.lamp(green_yellow).unwrap().flags;
    assert!(gy.stopping && gy.starting && gy.hold);
    let ry = svc.lamp(red_yellow).unwrap().flags;
    assert!(ry.starting && ry.hold && !ry.stopping);

    // the new lamp stays held until the old one has stopped
    run_until(&mut svc, &mut board, &mut sink, LIMIT, |s, b| {
        let done = !s.lamp(green).unwrap().flags.lit;
        if !done {
            assert_ne!(b.lit(), Some((6, 7)), "started before the stop finished");
        }
        done
    })
    .expect("green never stopped");
    assert_eq!(svc.division(), 9);
    let gy = svc.lamp(green_yellow).unwrap().flags;
    assert!(gy.lit && gy.starting && !gy.stopping && !gy.hold);
    let ry = svc.lamp(red_yellow).unwrap().flags;
    assert!(ry.starting && !ry.hold);

    run_until(&mut svc, &mut board, &mut sink, LIMIT, |s, b| {
        assert_ne!(b.lit(), Some((2, 3)), "stopped lamp energized");
        settled(s, green_yellow) && settled(s, red_yellow)
    })
    .expect("yellow never settled");
    assert_eq!(svc.division(), 3);
    assert_eq!(svc.lit_count(), 2);
}

#[test]
fn ramped_stop_goes_dark_and_frees_pins() {
    let mut sink = RecordingSink::new();
    let mut svc = ready_service(true, &mut sink);
    let mut board = MockBoard::new();
    let id = svc.register(3, 0, 0, 6, 7, Color::YELLOW, &mut board).unwrap();
    svc.set_lamp(3, 0, 0, true, false);
    run_until(&mut svc, &mut board, &mut sink, LIMIT, |s, _| settled(s, id)).unwrap();

    svc.clear_head(3, 0);
    let f = svc.lamp(id).unwrap().flags;
    assert!(f.lit && f.stopping && f.hold);

    sink.events.clear();
    run_until(&mut svc, &mut board, &mut sink, LIMIT, |s, _| s.lit_count() == 0)
        .expect("lamp never went dark");
    assert!(sink.events.contains(&SignalEvent::LampDark { count: 1 }));
    assert_eq!(svc.division(), 9);

    for _ in 0..1000 {
        svc.update(&mut board, &mut sink).unwrap();
    }
    assert_eq!(board.pins.driven_high().count(), 0);
    assert_eq!(board.pins.driven_low().count(), 0);
    assert!(svc.lamp(id).unwrap().flags.ramp);
}

#[test]
fn keeps_multiplexing_across_clock_wrap() {
    let mut sink = RecordingSink::new();
    let mut svc = ready_service(false, &mut sink);
    let mut board = MockBoard::starting_at(u32::MAX - 200_000);
    let id = svc.register(0, 1, 0, 8, 9, Color::GREEN, &mut board).unwrap();
    svc.set_lamp(0, 1, 0, true, false);

    run_until(&mut svc, &mut board, &mut sink, LIMIT, |s, _| settled(s, id)).unwrap();
    assert!(board.now() < u32::MAX / 2, "clock did not wrap");

    let seen = divisions_lit(&mut svc, &mut board, &mut sink, &[(8, 9)]);
    assert_eq!(seen[0], [true; 10]);
}

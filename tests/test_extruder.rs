// End-to-end checks of extruder pressure advance smoothing.

use klippy_smoothing::extruder::{extruder_add_move, ExtruderStepper};
use klippy_smoothing::itersolve::StepperKinematics;
use klippy_smoothing::scurve::SCurve;
use klippy_smoothing::trapq::{Coord, Move, TrapAccelDecel, TrapQ};

fn direct_move(print_time: f64, move_t: f64, start_e: f64, pa: f64, s: SCurve) -> Move {
    Move {
        print_time,
        move_t,
        start_pos: Coord::new(start_e, 0.0, 0.0),
        axes_r: Coord::new(1.0, pa, 0.0),
        s,
    }
}

#[test]
fn cruise_has_no_smoothing_distortion() {
    // Steady cruise at 50mm/s with pressure advance: the smoothed
    // trajectory is the nominal one shifted by the constant advance
    // pa * v, and the smoothed velocity equals the nominal velocity.
    let (v, pa) = (50.0, 0.05);
    let mut tq = TrapQ::new();
    tq.add_move(direct_move(0.0, 1.0, 0.0, pa, SCurve::trapezoid(v, 0.0, 0.0)));
    let mut es = ExtruderStepper::new();
    es.set_smooth_time(0.08);
    for &t in &[0.1, 0.33, 0.5, 0.9] {
        let pos = es.calc_position(&tq, 1, t);
        assert!(
            (pos - (v * t + pa * v)).abs() < 1e-9,
            "t={}: {}",
            t,
            pos
        );
    }
}

#[test]
fn accel_boost_approximates_pa_times_velocity() {
    // Accelerate 0 -> 100mm/s over 0.02s with the window exactly
    // covering the move at its midpoint: the smoothed position exceeds
    // nominal by the triangular-window average of pa * v(t), which for a
    // linear velocity ramp is pa * v(t) itself, plus the window's
    // second-moment correction on the quadratic nominal position.
    let accel = 5000.0;
    let pa = 0.04;
    let hst = 0.01;
    let mut tq = TrapQ::new();
    tq.add_move(direct_move(0.0, 0.02, 0.0, pa, SCurve::trapezoid(0.0, accel, 0.0)));
    let mut es = ExtruderStepper::new();
    es.set_smooth_time(2.0 * hst);

    let t = 0.01;
    let nominal = 0.5 * accel * t * t;
    let v_nom = accel * t;
    let pos = es.calc_position(&tq, 1, t);
    let excess = pos - nominal;
    let second_moment = accel * hst * hst / 12.0;
    assert!(
        (excess - (pa * v_nom + second_moment)).abs() < 1e-9,
        "excess {}",
        excess
    );
    // The dominant term is the advance itself
    assert!(excess > pa * v_nom * 0.95);
}

#[test]
fn trapezoid_profile_matches_simpson_reference() {
    // Full accel/cruise walk with zero pressure advance: the queue walk
    // must agree with brute-force quadrature of the triangular window
    // average at a segment boundary.
    let mut tq = TrapQ::new();
    extruder_add_move(
        &mut tq,
        0.0,
        0.0,
        1.0,
        0.0,
        &TrapAccelDecel {
            accel_t: 0.05,
            total_accel_t: 0.05,
            uncomp_accel_t: 0.05,
            cruise_t: 0.05,
            start_accel_v: 0.0,
            cruise_v: 100.0,
            effective_accel: 2000.0,
            ..TrapAccelDecel::default()
        },
    );
    let hst = 0.02;
    let mut es = ExtruderStepper::new();
    es.set_smooth_time(2.0 * hst);

    let t = 0.05;
    let p = |x: f64| {
        if x < 0.05 {
            1000.0 * x * x
        } else {
            2.5 + 100.0 * (x - 0.05)
        }
    };
    let n = 1_000_000;
    let h = 2.0 * hst / n as f64;
    let mut acc = 0.0;
    for i in 0..=n {
        let x = t - hst + i as f64 * h;
        let k = if i == 0 || i == n {
            1.0
        } else if i % 2 == 1 {
            4.0
        } else {
            2.0
        };
        acc += k * p(x) * (hst - (t - x).abs());
    }
    let reference = acc * h / 3.0 / (hst * hst);

    let (accel_idx, _) = tq.locate(0.04).unwrap();
    let (cruise_idx, _) = tq.locate(0.06).unwrap();
    let from_accel = es.calc_position(&tq, accel_idx, t);
    let from_cruise = es.calc_position(&tq, cruise_idx, 0.0);
    assert!(
        (from_accel - reference).abs() < 1e-7,
        "{} vs {}",
        from_accel,
        reference
    );
    assert!((from_accel - from_cruise).abs() < 1e-9);
}

#[test]
fn smoothing_is_continuous_across_pa_moves() {
    // Accel into cruise with pressure advance enabled: the pa term jumps
    // in acceleration but the smoothed position stays continuous.
    let pa = 0.05;
    let mut tq = TrapQ::new();
    extruder_add_move(
        &mut tq,
        0.0,
        0.0,
        1.0,
        pa,
        &TrapAccelDecel {
            accel_t: 0.05,
            total_accel_t: 0.05,
            uncomp_accel_t: 0.05,
            cruise_t: 0.05,
            start_accel_v: 0.0,
            cruise_v: 100.0,
            effective_accel: 2000.0,
            ..TrapAccelDecel::default()
        },
    );
    let mut es = ExtruderStepper::new();
    es.set_smooth_time(0.02);
    let (accel_idx, _) = tq.locate(0.04).unwrap();
    let (cruise_idx, _) = tq.locate(0.06).unwrap();
    let left = es.calc_position(&tq, accel_idx, 0.05);
    let right = es.calc_position(&tq, cruise_idx, 0.0);
    assert!((left - right).abs() < 1e-9, "{} vs {}", left, right);

    // No query discontinuity stepping over the boundary either; the
    // smoothed trajectory moves at most ~200mm/s here
    let before = es.calc_position(&tq, accel_idx, 0.05 - 1e-6);
    let after = es.calc_position(&tq, cruise_idx, 1e-6);
    assert!((after - before).abs() < 200.0 * 2e-6);
}

#[test]
fn window_margins_follow_smooth_time() {
    let mut es = ExtruderStepper::new();
    assert_eq!(es.step_generation_window(), 0.0);
    es.set_smooth_time(0.04);
    assert!((es.gen_steps_pre_active() - 0.02).abs() < 1e-15);
    assert!((es.gen_steps_post_active() - 0.02).abs() < 1e-15);
    es.set_smooth_time(0.0);
    assert_eq!(es.step_generation_window(), 0.0);
}

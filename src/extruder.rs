// Extruder stepper position with pressure advance smoothing
//
// This file may be distributed under the terms of the GNU GPLv3 license.

use crate::itersolve::StepperKinematics;
use crate::trapq::{Coord, Move, TrapAccelDecel, TrapQ};

// Without pressure advance, the extruder stepper position is the nominal
// position:
//     extruder_position(t) = nominal_position(t)
// When pressure advance is enabled, additional filament is pushed into
// the extruder during acceleration (and retracted during deceleration):
//     pa_position(t) = nominal_position(t)
//                      + pressure_advance * nominal_velocity(t)
// which is then averaged over the smooth time:
//     smooth_position(t) = (
//         definitive_integral(pa_position(x) * (hst - abs(t-x)) * dx,
//                             from=t-hst, to=t+hst) / hst**2)
// with hst = smooth_time/2.

// Definitive integral of pa_position over part of a move
fn extruder_integrate(m: &Move, start: f64, end: f64) -> f64 {
    let pressure_advance = m.axes_r.y;
    let base = m.start_pos.x * (end - start);
    base + m.s.integrate(start, end) + pressure_advance * m.s.diff(start, end)
}

// Definitive integral of t * pa_position over part of a move
fn extruder_integrate_time(m: &Move, start: f64, end: f64) -> f64 {
    let pressure_advance = m.axes_r.y;
    let base = 0.5 * m.start_pos.x * (end * end - start * start);
    base + m.s.integrate_t(start, end) + pressure_advance * m.s.deriv_t_integrate(start, end)
}

// One leg of the triangular window on one move
fn pa_move_integrate(m: &Move, mut start: f64, mut end: f64, time_offset: f64) -> f64 {
    if start < 0.0 {
        start = 0.0;
    }
    if end > m.move_t {
        end = m.move_t;
    }
    let iext = extruder_integrate(m, start, end);
    let wgt_ext = extruder_integrate_time(m, start, end);
    wgt_ext - time_offset * iext
}

// Triangular-window integral of pa_position over a range of moves
fn pa_range_integrate(tq: &TrapQ, idx: usize, move_time: f64, hst: f64) -> f64 {
    // Integrate both window legs over the current move
    let m = tq.get(idx);
    let mut start = move_time - hst;
    let mut end = move_time + hst;
    let mut res = pa_move_integrate(m, start, move_time, start);
    res -= pa_move_integrate(m, move_time, end, end);
    // Integrate over previous moves
    let mut pidx = idx;
    while start < 0.0 && pidx > 0 {
        pidx -= 1;
        let prev = tq.get(pidx);
        start += prev.move_t;
        res += pa_move_integrate(prev, start, prev.move_t, start);
    }
    // Integrate over future moves
    let last = tq.num_moves() + 1;
    let mut nidx = idx;
    let mut m = m;
    while end > m.move_t && nidx < last {
        end -= m.move_t;
        nidx += 1;
        m = tq.get(nidx);
        res -= pa_move_integrate(m, 0.0, end, end);
    }
    res
}

/// Extruder stepper kinematics: a scalar axis whose smoothed position is
/// the pressure-advance augmented position averaged over a triangular
/// window of half-width `half_smooth_time`.
#[derive(Debug, Default)]
pub struct ExtruderStepper {
    half_smooth_time: f64,
    inv_half_smooth_time2: f64,
}

impl ExtruderStepper {
    pub fn new() -> ExtruderStepper {
        ExtruderStepper::default()
    }

    /// Set the smoothing window.  A zero smooth time disables pressure
    /// advance smoothing entirely.
    pub fn set_smooth_time(&mut self, smooth_time: f64) {
        let hst = 0.5 * smooth_time;
        self.half_smooth_time = hst;
        if hst == 0.0 {
            self.inv_half_smooth_time2 = 0.0;
            return;
        }
        self.inv_half_smooth_time2 = 1.0 / (hst * hst);
        log::debug!("extruder: smooth_time={:.6}", smooth_time);
    }
}

impl StepperKinematics for ExtruderStepper {
    fn calc_position(&mut self, tq: &TrapQ, move_idx: usize, move_time: f64) -> f64 {
        let hst = self.half_smooth_time;
        let m = tq.get(move_idx);
        if hst == 0.0 {
            // Pressure advance not enabled
            return m.start_pos.x + m.get_distance(move_time);
        }
        let area = pa_range_integrate(tq, move_idx, move_time, hst);
        area * self.inv_half_smooth_time2
    }

    fn gen_steps_pre_active(&self) -> f64 {
        self.half_smooth_time
    }

    fn gen_steps_post_active(&self) -> f64 {
        self.half_smooth_time
    }
}

/// Queue an extruder move.  The toolhead timing may include acceleration
/// compensation, which the extruder must not follow; `print_time` and the
/// accel/decel description are rewritten to the uncompensated timings.
/// Velocities are scaled by `extrude_r` (extrusion per mm of toolhead
/// travel) and the pressure-advance factor rides in `axes_r.y`.
pub fn extruder_add_move(
    tq: &mut TrapQ,
    print_time: f64,
    start_e_pos: f64,
    extrude_r: f64,
    pressure_advance: f64,
    accel_decel: &TrapAccelDecel,
) {
    // Acceleration compensation shortens moves at the start of an
    // acceleration group and lengthens them for deceleration; shift
    // print_time to track the uncompensated group start.
    let mut print_time = print_time;
    if accel_decel.total_accel_t > 0.0 {
        print_time += accel_decel.uncomp_accel_offset_t - accel_decel.accel_offset_t;
    } else if accel_decel.total_decel_t > 0.0 {
        print_time += accel_decel.uncomp_decel_offset_t - accel_decel.decel_offset_t;
    }

    let mut ad = *accel_decel;
    ad.accel_comp = 0.0;
    ad.accel_t = ad.uncomp_accel_t;
    ad.accel_offset_t = ad.uncomp_accel_offset_t;
    ad.decel_t = ad.uncomp_decel_t;
    ad.decel_offset_t = ad.uncomp_decel_offset_t;

    ad.start_accel_v *= extrude_r;
    ad.cruise_v *= extrude_r;
    ad.effective_accel *= extrude_r;
    ad.effective_decel *= extrude_r;

    // x is the extruder movement, y carries the pressure advance factor
    tq.append(
        print_time,
        Coord::new(start_e_pos, 0.0, 0.0),
        Coord::new(1.0, pressure_advance, 0.0),
        &ad,
    );
}

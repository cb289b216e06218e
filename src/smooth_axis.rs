// Kinematic filter to smooth out cartesian XY movements
//
// This file may be distributed under the terms of the GNU GPLv3 license.

use crate::integrate::{Smoother, SmootherType};
use crate::itersolve::{AxisFlags, Kinematics, StepperKinematics};
use crate::trapq::{Axis, Move, TrapQ};
use crate::KinError;

const DUMMY_T: f64 = 500.0;

// Definitive integral of the weighted axis position on part of a move
fn move_integrate(
    m: &Move,
    axis: Axis,
    mut start: f64,
    mut end: f64,
    time_offset: f64,
    sm: &Smoother,
) -> f64 {
    if start < 0.0 {
        start = 0.0;
    }
    if end > m.move_t {
        end = m.move_t;
    }
    let axis_r = m.axes_r.axis(axis);
    let start_pos = m.start_pos.axis(axis);
    let s = m.s.copy_scaled(axis_r);
    sm.integrate_weighted_scurve(start_pos, &s, start, end, time_offset)
}

// Definitive integral of the weighted axis position over a range of moves
fn range_integrate(tq: &TrapQ, idx: usize, axis: Axis, move_time: f64, sm: &Smoother) -> f64 {
    // Integrate over the current move
    let m = tq.get(idx);
    let mut start = move_time - sm.hst;
    let mut end = move_time + sm.hst;
    let mut offset = -move_time;
    let mut res = move_integrate(m, axis, start, end, offset, sm);
    // Integrate over previous moves
    let mut pidx = idx;
    while start < 0.0 && pidx > 0 {
        pidx -= 1;
        let prev = tq.get(pidx);
        start += prev.move_t;
        offset -= prev.move_t;
        res += move_integrate(prev, axis, start, prev.move_t, offset, sm);
    }
    // Integrate over future moves
    let last = tq.num_moves() + 1;
    let mut nidx = idx;
    let mut m = tq.get(nidx);
    let mut offset = -move_time;
    while end > m.move_t && nidx < last {
        end -= m.move_t;
        offset += m.move_t;
        nidx += 1;
        m = tq.get(nidx);
        res += move_integrate(m, axis, 0.0, end, offset, sm);
    }
    res
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Dispatch {
    X,
    Y,
    Xy,
}

/// Positional smoothing filter wrapped around a cartesian stepper's
/// kinematics.  X and Y carry independent kernels; the wrapped
/// kinematics sees either the raw move (axis unsmoothed) or a scratch
/// move whose `start_pos` holds the smoothed coordinates.
pub struct SmoothAxis {
    orig_sk: Option<Box<dyn Kinematics>>,
    dispatch: Dispatch,
    x_smoother: Option<Smoother>,
    y_smoother: Option<Smoother>,
    m: Move,
    pre_active: f64,
    post_active: f64,
}

impl Default for SmoothAxis {
    fn default() -> Self {
        Self::new()
    }
}

impl SmoothAxis {
    pub fn new() -> SmoothAxis {
        SmoothAxis {
            orig_sk: None,
            dispatch: Dispatch::Xy,
            x_smoother: None,
            y_smoother: None,
            m: Move {
                move_t: 2.0 * DUMMY_T,
                ..Move::default()
            },
            pre_active: 0.0,
            post_active: 0.0,
        }
    }

    /// Wrap the given forward kinematics.  Fails if it consumes neither
    /// X nor Y; the previously configured kinematics stays in effect.
    pub fn set_sk(&mut self, orig_sk: Box<dyn Kinematics>) -> Result<(), KinError> {
        let af = orig_sk.active_flags() & (AxisFlags::X | AxisFlags::Y);
        self.dispatch = if af == AxisFlags::X | AxisFlags::Y {
            Dispatch::Xy
        } else if af == AxisFlags::X {
            Dispatch::X
        } else if af == AxisFlags::Y {
            Dispatch::Y
        } else {
            log::warn!("smooth_axis: kinematics uses neither x nor y");
            return Err(KinError::NoSmoothableAxis);
        };
        self.orig_sk = Some(orig_sk);
        self.note_generation_time();
        Ok(())
    }

    /// Reconfigure the per-axis kernels.  A zero target frequency
    /// disables smoothing for that axis.  Callers must not issue
    /// position queries concurrently with reconfiguration.
    pub fn set_params(
        &mut self,
        typ: SmootherType,
        target_freq_x: f64,
        target_freq_y: f64,
        damping_ratio_x: f64,
        damping_ratio_y: f64,
    ) {
        self.x_smoother =
            (target_freq_x > 0.0).then(|| Smoother::new(typ, target_freq_x, damping_ratio_x));
        self.y_smoother =
            (target_freq_y > 0.0).then(|| Smoother::new(typ, target_freq_y, damping_ratio_y));
        self.note_generation_time();
        log::debug!(
            "smooth_axis: type={} freq_x={:.3} freq_y={:.3} window={:.6}",
            typ.name(),
            target_freq_x,
            target_freq_y,
            self.pre_active
        );
    }

    /// Half-width of the smoothing window for the given parameters; the
    /// look-ahead/look-behind the planner must keep available.
    pub fn half_smooth_time(typ: SmootherType, target_freq: f64, damping_ratio: f64) -> f64 {
        if target_freq <= 0.0 {
            return 0.0;
        }
        Smoother::new(typ, target_freq, damping_ratio).hst
    }

    fn note_generation_time(&mut self) {
        let af = self
            .orig_sk
            .as_ref()
            .map(|sk| sk.active_flags())
            .unwrap_or_default();
        let mut hst: f64 = 0.0;
        if af.contains(AxisFlags::X) {
            if let Some(sm) = &self.x_smoother {
                hst = sm.hst;
            }
        }
        if af.contains(AxisFlags::Y) {
            if let Some(sm) = &self.y_smoother {
                hst = hst.max(sm.hst);
            }
        }
        self.pre_active = hst;
        self.post_active = hst;
    }
}

impl StepperKinematics for SmoothAxis {
    fn calc_position(&mut self, tq: &TrapQ, move_idx: usize, move_time: f64) -> f64 {
        let Some(orig_sk) = self.orig_sk.as_deref() else {
            return 0.0;
        };
        let m = tq.get(move_idx);
        match self.dispatch {
            Dispatch::X => match &self.x_smoother {
                Some(sm) => {
                    self.m.start_pos.x = range_integrate(tq, move_idx, Axis::X, move_time, sm);
                    orig_sk.calc_position(&self.m, DUMMY_T)
                }
                None => orig_sk.calc_position(m, move_time),
            },
            Dispatch::Y => match &self.y_smoother {
                Some(sm) => {
                    self.m.start_pos.y = range_integrate(tq, move_idx, Axis::Y, move_time, sm);
                    orig_sk.calc_position(&self.m, DUMMY_T)
                }
                None => orig_sk.calc_position(m, move_time),
            },
            Dispatch::Xy => {
                if self.x_smoother.is_none() && self.y_smoother.is_none() {
                    return orig_sk.calc_position(m, move_time);
                }
                self.m.start_pos = m.get_coord(move_time);
                if let Some(sm) = &self.x_smoother {
                    self.m.start_pos.x = range_integrate(tq, move_idx, Axis::X, move_time, sm);
                }
                if let Some(sm) = &self.y_smoother {
                    self.m.start_pos.y = range_integrate(tq, move_idx, Axis::Y, move_time, sm);
                }
                orig_sk.calc_position(&self.m, DUMMY_T)
            }
        }
    }

    fn gen_steps_pre_active(&self) -> f64 {
        self.pre_active
    }

    fn gen_steps_post_active(&self) -> f64 {
        self.post_active
    }
}

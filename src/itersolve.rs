// Stepper kinematics seam used by step generation
//
// This file may be distributed under the terms of the GNU GPLv3 license.

use bitflags::bitflags;

use crate::trapq::{Axis, Move, TrapQ};

bitflags! {
    /// Axes a kinematics consumes when computing a stepper position.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AxisFlags: u32 {
        const X = 1 << 0;
        const Y = 1 << 1;
        const Z = 1 << 2;
    }
}

impl AxisFlags {
    pub fn of(axis: Axis) -> AxisFlags {
        match axis {
            Axis::X => AxisFlags::X,
            Axis::Y => AxisFlags::Y,
            Axis::Z => AxisFlags::Z,
        }
    }
}

/// Forward kinematics over a single move: stepper position as a function
/// of the move and a move-local time.  Implementations must be pure; the
/// step solver calls this millions of times per print.
pub trait Kinematics {
    fn active_flags(&self) -> AxisFlags;
    fn calc_position(&self, m: &Move, move_time: f64) -> f64;
}

/// Identity axis mapping for a cartesian stepper.
#[derive(Debug, Copy, Clone)]
pub struct CartKinematics {
    axis: Axis,
}

impl CartKinematics {
    pub fn new(axis: Axis) -> CartKinematics {
        CartKinematics { axis }
    }
}

impl Kinematics for CartKinematics {
    fn active_flags(&self) -> AxisFlags {
        AxisFlags::of(self.axis)
    }

    fn calc_position(&self, m: &Move, move_time: f64) -> f64 {
        m.start_pos.axis(self.axis) + m.axes_r.axis(self.axis) * m.get_distance(move_time)
    }
}

/// Queue-level position query the step-pulse solver iterates against.
/// `move_idx` addresses a real move inside `tq`; the solver guarantees
/// every move touched by the smoothing window is queued and that queries
/// arrive in non-decreasing time order.
pub trait StepperKinematics {
    fn calc_position(&mut self, tq: &TrapQ, move_idx: usize, move_time: f64) -> f64;

    /// How long before a move becomes active step generation must start.
    fn gen_steps_pre_active(&self) -> f64 {
        0.0
    }

    /// How long after a move ends step generation must continue.
    fn gen_steps_post_active(&self) -> f64 {
        0.0
    }

    fn step_generation_window(&self) -> f64 {
        self.gen_steps_pre_active().max(self.gen_steps_post_active())
    }
}

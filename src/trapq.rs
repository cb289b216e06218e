// Trapezoidal velocity movement queue
//
// This file may be distributed under the terms of the GNU GPLv3 license.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::scurve::SCurve;

const NEVER_TIME: f64 = 9_999_999_999_999_999.9;
const MAX_NULL_MOVE: f64 = 1.0;
// Sentinel moves must outlast any smoothing window, but their duration
// also enters the convolution walk's local-time arithmetic, so it has to
// stay small enough that window offsets survive the addition in double
// precision.
const SENTINEL_T: f64 = 1.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Coord { x, y, z }
    }

    pub fn axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn axis_mut(&mut self, axis: Axis) -> &mut f64 {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
        }
    }
}

/// One segment of the planner's output: scalar progress `s` over local
/// time `[0, move_t]`, projected onto the axes through `axes_r`.  For
/// extruder moves `axes_r.y` carries the pressure-advance factor instead
/// of a direction ratio.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Move {
    pub print_time: f64,
    pub move_t: f64,
    pub start_pos: Coord,
    pub axes_r: Coord,
    pub s: SCurve,
}

impl Move {
    /// Distance traveled along the move at the given local time.  Times
    /// outside the move clamp to its boundary positions.
    pub fn get_distance(&self, move_time: f64) -> f64 {
        self.s.eval(move_time.max(0.0).min(self.move_t))
    }

    pub fn get_coord(&self, move_time: f64) -> Coord {
        let dist = self.get_distance(move_time);
        Coord {
            x: self.start_pos.x + self.axes_r.x * dist,
            y: self.start_pos.y + self.axes_r.y * dist,
            z: self.start_pos.z + self.axes_r.z * dist,
        }
    }

    fn is_null(&self) -> bool {
        self.s.is_null()
    }
}

/// Acceleration/deceleration description of one planner move, carrying
/// both the compensated timings (what the toolhead executes) and the
/// uncompensated ones (what the extruder must follow).
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct TrapAccelDecel {
    pub accel_t: f64,
    pub accel_offset_t: f64,
    pub total_accel_t: f64,
    pub uncomp_accel_t: f64,
    pub uncomp_accel_offset_t: f64,
    pub cruise_t: f64,
    pub decel_t: f64,
    pub decel_offset_t: f64,
    pub total_decel_t: f64,
    pub uncomp_decel_t: f64,
    pub uncomp_decel_offset_t: f64,
    pub start_accel_v: f64,
    pub cruise_v: f64,
    pub effective_accel: f64,
    pub effective_decel: f64,
    pub accel_comp: f64,
}

/// Flattened view of a queued move for history extraction.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PullMove {
    pub print_time: f64,
    pub move_t: f64,
    pub start_v: f64,
    pub accel: f64,
    pub start_pos: Coord,
    pub axes_r: Coord,
}

/// The trapezoid move queue.  Moves are stored in insertion order between
/// two stationary sentinel moves that outlast any smoothing window and
/// whose positions pin the queue's boundary coordinates, so a window
/// reaching past either end of the queue sees a constant-position
/// extension.  Neighbour access for the convolution walk is O(1) by
/// index.
#[derive(Debug, Clone)]
pub struct TrapQ {
    moves: VecDeque<Move>,
    history: VecDeque<Move>,
}

impl Default for TrapQ {
    fn default() -> Self {
        Self::new()
    }
}

impl TrapQ {
    pub fn new() -> Self {
        let mut moves = VecDeque::new();
        moves.push_back(Move {
            print_time: -SENTINEL_T,
            move_t: SENTINEL_T,
            ..Move::default()
        });
        moves.push_back(Move {
            print_time: NEVER_TIME,
            move_t: SENTINEL_T,
            ..Move::default()
        });
        TrapQ {
            moves,
            history: VecDeque::new(),
        }
    }

    /// Moves currently queued, excluding the sentinels.
    pub fn num_moves(&self) -> usize {
        self.moves.len() - 2
    }

    /// Access a move by queue index.  Index 0 and `num_moves() + 1` are
    /// the sentinels; real moves start at index 1.
    pub fn get(&self, idx: usize) -> &Move {
        &self.moves[idx]
    }

    /// Queue index and move-local time of the move covering the given
    /// print time.
    pub fn locate(&self, print_time: f64) -> Option<(usize, f64)> {
        for idx in 1..self.moves.len() - 1 {
            let m = &self.moves[idx];
            if print_time >= m.print_time && print_time < m.print_time + m.move_t {
                return Some((idx, print_time - m.print_time));
            }
        }
        None
    }

    /// Add a fully prepared move.  Gaps against the previously queued
    /// move are filled with a stationary null move so the queue stays
    /// contiguous in time.
    pub fn add_move(&mut self, m: Move) {
        let tail_idx = self.moves.len() - 1;
        let prev_idx = tail_idx - 1;
        let prev = self.moves[prev_idx];
        let prev_end = prev.print_time + prev.move_t;
        if prev_end < m.print_time {
            let null_print_time = if prev_idx == 0 && m.print_time > MAX_NULL_MOVE {
                m.print_time - MAX_NULL_MOVE
            } else {
                prev_end
            };
            let null_move = Move {
                print_time: null_print_time,
                move_t: m.print_time - null_print_time,
                start_pos: m.start_pos,
                ..Move::default()
            };
            if null_move.move_t > 0.0 {
                let at = self.moves.len() - 1;
                self.moves.insert(at, null_move);
            }
        }
        if prev_idx == 0 {
            // First queued move pins the head sentinel's position
            self.moves[0].start_pos = m.start_pos;
        }
        let end_time = m.print_time + m.move_t;
        let end_pos = m.get_coord(m.move_t);
        let at = self.moves.len() - 1;
        self.moves.insert(at, m);
        let tail_idx = self.moves.len() - 1;
        let tail = &mut self.moves[tail_idx];
        tail.print_time = end_time;
        tail.move_t = SENTINEL_T;
        tail.start_pos = end_pos;
    }

    /// Expand an accel/cruise/decel description into queued moves.
    pub fn append(
        &mut self,
        print_time: f64,
        start_pos: Coord,
        axes_r: Coord,
        accel_decel: &TrapAccelDecel,
    ) {
        let mut print_time = print_time;
        let mut start_pos = start_pos;
        if accel_decel.accel_t > 0.0 {
            let m = Move {
                print_time,
                move_t: accel_decel.accel_t,
                start_pos,
                axes_r,
                s: SCurve::trapezoid(
                    accel_decel.start_accel_v,
                    accel_decel.effective_accel,
                    accel_decel.accel_offset_t,
                ),
            };
            print_time += m.move_t;
            start_pos = m.get_coord(m.move_t);
            self.add_move(m);
        }
        if accel_decel.cruise_t > 0.0 {
            let m = Move {
                print_time,
                move_t: accel_decel.cruise_t,
                start_pos,
                axes_r,
                s: SCurve::trapezoid(accel_decel.cruise_v, 0.0, 0.0),
            };
            print_time += m.move_t;
            start_pos = m.get_coord(m.move_t);
            self.add_move(m);
        }
        if accel_decel.decel_t > 0.0 {
            let m = Move {
                print_time,
                move_t: accel_decel.decel_t,
                start_pos,
                axes_r,
                s: SCurve::trapezoid(
                    accel_decel.cruise_v,
                    -accel_decel.effective_decel,
                    accel_decel.decel_offset_t,
                ),
            };
            self.add_move(m);
        }
    }

    /// Expire moves fully processed before `print_time` into the history,
    /// and drop history entries older than `clear_history_time` (the most
    /// recent entry is always retained).
    pub fn finalize_moves(&mut self, print_time: f64, clear_history_time: f64) {
        while self.moves.len() > 2 {
            let m = self.moves[1];
            if m.print_time + m.move_t > print_time {
                break;
            }
            self.moves.remove(1);
            if !m.is_null() {
                self.history.push_front(m);
            }
        }
        // Keep the head sentinel pinned to the position entering the
        // remaining queue
        self.moves[0].start_pos = if self.moves.len() > 2 {
            self.moves[1].start_pos
        } else {
            self.moves[self.moves.len() - 1].start_pos
        };
        while self.history.len() > 1 {
            let last = self.history[self.history.len() - 1];
            if last.print_time + last.move_t > clear_history_time {
                break;
            }
            self.history.pop_back();
        }
    }

    /// Note a position change: flush all queued moves, truncate history
    /// at the given time and record a zero-duration marker there.
    pub fn set_position(&mut self, print_time: f64, pos: Coord) {
        self.finalize_moves(NEVER_TIME, 0.0);
        while let Some(first) = self.history.front_mut() {
            if first.print_time < print_time {
                if first.print_time + first.move_t > print_time {
                    first.move_t = print_time - first.print_time;
                }
                break;
            }
            self.history.pop_front();
        }
        self.history.push_front(Move {
            print_time,
            start_pos: pos,
            ..Move::default()
        });
        for m in self.moves.iter_mut() {
            m.start_pos = pos;
        }
    }

    /// Return historical moves overlapping `[start_time, end_time)`,
    /// newest first, at most `max` entries.
    pub fn extract_old(&self, max: usize, start_time: f64, end_time: f64) -> Vec<PullMove> {
        let mut result = Vec::new();
        for m in self.history.iter() {
            if result.len() >= max || start_time >= m.print_time + m.move_t {
                break;
            }
            if end_time <= m.print_time {
                continue;
            }
            result.push(PullMove {
                print_time: m.print_time,
                move_t: m.move_t,
                start_v: m.s.c1,
                accel: 2.0 * m.s.c2,
                start_pos: m.start_pos,
                axes_r: m.axes_r,
            });
        }
        result
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

//! `SimIo`: a scripted `MotionIo` implementation driving the planner core
//! from canned spindle/DIO/rotary responses instead of real hardware.

use std::cell::Cell;

use serde::{Deserialize, Serialize};
use tp::MotionIo;

/// One scripted spindle/rotary response, keyed by tick index. Applied in
/// order as the harness advances; the last entry at or before the current
/// tick remains in effect until superseded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoScript {
    pub tick: u64,
    pub feed_scale: Option<f64>,
    pub spindle_revs: Option<f64>,
    pub spindle_speed_in: Option<f64>,
    pub spindle_atspeed: Option<bool>,
    pub rotary_unlocked: Option<bool>,
}

/// A `MotionIo` implementation driven by a sorted list of `IoScript` entries
/// plus live feedback loops (spindle direction/speed, DIO/AIO, index-enable,
/// rotary-unlock) that respond to the planner's own writes the way real
/// hardware would: an index pulse arms and then clears itself, a rotary
/// unlock request takes effect on the following tick.
pub struct SimIo {
    tick: u64,
    script: Vec<IoScript>,
    script_pos: usize,

    feed_scale: f64,
    spindle_speed: f64,
    spindle_direction: i8,
    spindle_revs: f64,
    spindle_speed_in: f64,
    spindle_atspeed: bool,
    // A real index channel reads true exactly once (the captured pulse)
    // after being armed, then clears itself; model that with interior
    // mutability since the capability trait reads it through `&self`.
    index_enable: Cell<bool>,
    rotary_unlocked: bool,

    pub dio_edges: Vec<(u64, u8, bool)>,
    pub aio_edges: Vec<(u64, u8, f64)>,
}

impl SimIo {
    pub fn new(mut script: Vec<IoScript>) -> Self {
        script.sort_by_key(|s| s.tick);
        SimIo {
            tick: 0,
            script,
            script_pos: 0,
            feed_scale: 1.0,
            spindle_speed: 0.0,
            spindle_direction: 1,
            spindle_revs: 0.0,
            spindle_speed_in: 0.0,
            spindle_atspeed: true,
            index_enable: Cell::new(false),
            rotary_unlocked: true,
            dio_edges: Vec::new(),
            aio_edges: Vec::new(),
        }
    }

    /// Advances the script cursor to the current tick and bumps the tick
    /// counter for the *next* call. Call once per `run_cycle`.
    pub fn advance(&mut self) {
        while let Some(entry) = self.script.get(self.script_pos) {
            if entry.tick > self.tick {
                break;
            }
            if let Some(v) = entry.feed_scale {
                self.feed_scale = v;
            }
            if let Some(v) = entry.spindle_revs {
                self.spindle_revs = v;
            }
            if let Some(v) = entry.spindle_speed_in {
                self.spindle_speed_in = v;
            }
            if let Some(v) = entry.spindle_atspeed {
                self.spindle_atspeed = v;
            }
            if let Some(v) = entry.rotary_unlocked {
                self.rotary_unlocked = v;
            }
            self.script_pos += 1;
        }
        self.tick += 1;
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }
}

impl MotionIo for SimIo {
    fn net_feed_scale(&self) -> f64 {
        self.feed_scale
    }

    fn spindle_speed(&self) -> f64 {
        self.spindle_speed
    }

    fn set_spindle_speed(&mut self, speed: f64) {
        self.spindle_speed = speed;
    }

    fn spindle_direction(&self) -> i8 {
        self.spindle_direction
    }

    fn set_spindle_direction(&mut self, direction: i8) {
        self.spindle_direction = direction;
    }

    fn spindle_revs(&self) -> f64 {
        self.spindle_revs
    }

    fn spindle_speed_in(&self) -> f64 {
        self.spindle_speed_in
    }

    fn spindle_is_atspeed(&self) -> bool {
        self.spindle_atspeed
    }

    fn spindle_index_enable(&self) -> bool {
        let armed = self.index_enable.get();
        if armed {
            self.index_enable.set(false);
        }
        armed
    }

    fn set_spindle_index_enable(&mut self, armed: bool) {
        self.index_enable.set(armed);
    }

    fn dio_write(&mut self, index: u8, on: bool) {
        self.dio_edges.push((self.tick, index, on));
    }

    fn aio_write(&mut self, index: u8, value: f64) {
        self.aio_edges.push((self.tick, index, value));
    }

    fn rotary_unlock(&mut self, _axis: u8, on: bool) {
        self.rotary_unlocked = on;
    }

    fn rotary_is_unlocked(&self, _axis: u8) -> bool {
        self.rotary_unlocked
    }

    fn joint_acc_limit(&self, _axis: u8) -> f64 {
        1_000.0
    }

    fn joint_vel_limit(&self, _axis: u8) -> f64 {
        1_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_pulse_reads_true_once_then_self_clears() {
        let mut io = SimIo::new(Vec::new());
        assert!(!io.spindle_index_enable());
        io.set_spindle_index_enable(true);
        assert!(io.spindle_index_enable(), "first read after arming should observe the pulse");
        assert!(!io.spindle_index_enable(), "line should self-clear after being captured once");
    }

    #[test]
    fn scripted_spindle_revs_apply_at_their_tick() {
        let mut io = SimIo::new(vec![
            IoScript {
                tick: 2,
                feed_scale: None,
                spindle_revs: Some(5.0),
                spindle_speed_in: None,
                spindle_atspeed: None,
                rotary_unlocked: None,
            },
        ]);
        io.advance(); // tick 0 -> 1
        assert_eq!(io.spindle_revs(), 0.0);
        io.advance(); // tick 1 -> 2
        assert_eq!(io.spindle_revs(), 0.0);
        io.advance(); // tick 2 -> 3, applies the tick==2 entry
        assert_eq!(io.spindle_revs(), 5.0);
    }
}

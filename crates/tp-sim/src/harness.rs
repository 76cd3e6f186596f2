//! Drives a `tp::Planner` through a `SimIo`-backed tick loop, recording a
//! serializable per-cycle status trace for comparison against a golden
//! trace or manual inspection.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tp::{ControlResult, Planner};
use tracing::{debug, instrument};

use crate::capability::SimIo;

/// One tick's worth of observable planner status, recorded by `SimHarness`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceEntry {
    pub tick: u64,
    pub result: String,
    pub pos: (f64, f64, f64),
    pub vel: f64,
    pub exec_id: u32,
    pub is_done: bool,
}

fn result_label(r: ControlResult) -> String {
    match r {
        ControlResult::Ok => "ok".to_string(),
        ControlResult::Fail(e) => format!("fail({e})"),
        ControlResult::NoAction => "no_action".to_string(),
        ControlResult::Waiting => "waiting".to_string(),
        ControlResult::Stopped => "stopped".to_string(),
        ControlResult::Slowing => "slowing".to_string(),
    }
}

/// Ticks a `Planner<CAP>` against a `SimIo`, recording one `TraceEntry` per
/// cycle. Generalizes `SimHost`'s record/dump pattern from wire-protocol
/// trace capture to planner-status trace capture.
pub struct SimHarness<const CAP: usize> {
    planner: Planner<CAP>,
    io: SimIo,
    trace: Vec<TraceEntry>,
}

impl<const CAP: usize> SimHarness<CAP> {
    pub fn new(planner: Planner<CAP>, io: SimIo) -> Self {
        SimHarness { planner, io, trace: Vec::new() }
    }

    pub fn planner(&mut self) -> &mut Planner<CAP> {
        &mut self.planner
    }

    pub fn io(&self) -> &SimIo {
        &self.io
    }

    /// Advances one servo tick and appends its status to the trace.
    #[instrument(skip(self))]
    pub fn tick(&mut self) -> ControlResult {
        self.io.advance();
        let result = self.planner.run_cycle(&mut self.io);
        let pos = self.planner.get_pos();
        let entry = TraceEntry {
            tick: self.io.tick(),
            result: result_label(result),
            pos: (pos.xyz.x, pos.xyz.y, pos.xyz.z),
            vel: self.planner.reported_vel(),
            exec_id: self.planner.get_exec_id(),
            is_done: self.planner.is_done(),
        };
        debug!(?entry, "tick recorded");
        self.trace.push(entry);
        result
    }

    /// Ticks until the queue drains to idle or `max_ticks` is exhausted.
    pub fn run_to_idle(&mut self, max_ticks: u64) -> bool {
        for _ in 0..max_ticks {
            self.tick();
            if self.planner.is_done() {
                return true;
            }
        }
        false
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    /// Dumps the recorded trace as pretty JSON.
    pub fn dump_trace(&self, path: &Path) -> Result<()> {
        let mut file = File::create(path)
            .with_context(|| format!("creating trace file {}", path.display()))?;
        let json = serde_json::to_string_pretty(&self.trace)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::IoScript;
    use posemath::{Cartesian, Pose9};
    use tp::TermCond;

    #[test]
    fn harness_drains_a_single_line_to_idle() {
        let mut p: Planner<8> = Planner::new();
        p.set_pos(Pose9::ZERO);
        p.set_cycle_time(0.001);
        p.set_amax(100.0);
        p.set_vmax(50.0, 100.0);
        p.set_term_cond(TermCond::Stop, 0.0);
        let end = Pose9::new(Cartesian::new(10.0, 0.0, 0.0), Cartesian::ZERO, Cartesian::ZERO);
        p.add_line(end, 50.0, 100.0, 100.0, 0, false, None);

        let mut harness = SimHarness::new(p, SimIo::new(Vec::new()));
        assert!(harness.run_to_idle(20_000));
        assert!(!harness.trace().is_empty());
        assert!((harness.planner().get_pos().xyz.x - 10.0).abs() < 1e-3);
    }

    #[test]
    fn harness_applies_scripted_spindle_revs() {
        let mut p: Planner<4> = Planner::new();
        p.set_pos(Pose9::ZERO);
        p.set_cycle_time(0.001);
        p.set_amax(100.0);
        p.set_vmax(50.0, 100.0);

        let script = vec![IoScript {
            tick: 0,
            feed_scale: None,
            spindle_revs: Some(3.0),
            spindle_speed_in: None,
            spindle_atspeed: None,
            rotary_unlocked: None,
        }];
        let mut harness = SimHarness::new(p, SimIo::new(script));
        harness.tick();
        harness.tick();
        // The script entry applies from the tick it names onward; two ticks
        // in, the scripted value must already be in effect.
        assert_eq!(harness.trace().len(), 2);
    }
}

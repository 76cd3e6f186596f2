//! JSON scenario file format: a sequence of `add_*`/`set_*` calls plus a
//! scripted `MotionIo` response table, for offline/manual replay via the
//! `scenario_runner` binary and for scenario-style integration tests.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use posemath::{CartCircle, Cartesian, Pose9};
use tp::{ControlResult, Planner, SyncMode, TermCond};

use crate::capability::{IoScript, SimIo};
use crate::harness::SimHarness;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("reading scenario file {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("parsing scenario JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("writing trace file: {0}")]
    Write(#[source] std::io::Error),
    #[error("planner rejected a scenario step: {0:?}")]
    PlannerRejected(String),
}

/// Scenario-file mirror of `tp::TermCond`, serializable independently of
/// the core (`no_std`) crate's own type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum TermCondCfg {
    Stop,
    Parabolic,
    Tangent,
}

impl From<TermCondCfg> for TermCond {
    fn from(c: TermCondCfg) -> Self {
        match c {
            TermCondCfg::Stop => TermCond::Stop,
            TermCondCfg::Parabolic => TermCond::Parabolic,
            TermCondCfg::Tangent => TermCond::Tangent,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum SyncModeCfg {
    None,
    Velocity,
    Position,
}

impl From<SyncModeCfg> for SyncMode {
    fn from(m: SyncModeCfg) -> Self {
        match m {
            SyncModeCfg::None => SyncMode::None,
            SyncModeCfg::Velocity => SyncMode::Velocity,
            SyncModeCfg::Position => SyncMode::Position,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pose9Cfg {
    pub xyz: (f64, f64, f64),
    pub uvw: (f64, f64, f64),
    pub abc: (f64, f64, f64),
}

impl From<&Pose9Cfg> for Pose9 {
    fn from(p: &Pose9Cfg) -> Self {
        Pose9::new(
            Cartesian::new(p.xyz.0, p.xyz.1, p.xyz.2),
            Cartesian::new(p.uvw.0, p.uvw.1, p.uvw.2),
            Cartesian::new(p.abc.0, p.abc.1, p.abc.2),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum MoveCmd {
    Line {
        end: Pose9Cfg,
        reqvel: f64,
        maxvel: f64,
        accel: f64,
        #[serde(default)]
        enables: u8,
        #[serde(default)]
        atspeed: bool,
        #[serde(default)]
        indexrotary: Option<u8>,
    },
    Circle {
        center: (f64, f64, f64),
        normal: (f64, f64, f64),
        radius_vec: (f64, f64, f64),
        angle: f64,
        #[serde(default)]
        rise: f64,
        #[serde(default)]
        end_uvw: (f64, f64, f64),
        #[serde(default)]
        end_abc: (f64, f64, f64),
        reqvel: f64,
        maxvel: f64,
        accel: f64,
        #[serde(default)]
        enables: u8,
    },
    RigidTap {
        end: Pose9Cfg,
        reqvel: f64,
        maxvel: f64,
        accel: f64,
        #[serde(default)]
        enables: u8,
    },
}

/// A full scenario: planner defaults, an ordered list of moves, and a
/// scripted I/O response table, deserialized from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub start_pos: Option<Pose9Cfg>,
    pub cycle_time: f64,
    pub amax: f64,
    pub vmax: f64,
    pub ini_maxvel: f64,
    #[serde(default = "default_vlimit")]
    pub vlimit: f64,
    pub term_cond: TermCondCfg,
    #[serde(default)]
    pub tolerance: f64,
    #[serde(default)]
    pub spindle_sync: Option<(f64, SyncModeCfg)>,
    pub moves: Vec<MoveCmd>,
    #[serde(default)]
    pub io_script: Vec<IoScript>,
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
}

fn default_vlimit() -> f64 {
    f64::INFINITY
}

fn default_max_ticks() -> u64 {
    200_000
}

impl Scenario {
    pub fn load(path: &std::path::Path) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| SimError::Read { path: path.display().to_string(), source })?;
        let scenario: Scenario = serde_json::from_str(&text)?;
        Ok(scenario)
    }

    /// Builds a `Planner<CAP>` configured per this scenario and appends
    /// every move in order, then returns a `SimHarness` ready to tick.
    pub fn build<const CAP: usize>(&self) -> Result<SimHarness<CAP>, SimError> {
        let mut p: Planner<CAP> = Planner::new();
        if let Some(start) = &self.start_pos {
            p.set_pos(Pose9::from(start));
        }
        p.set_cycle_time(self.cycle_time);
        p.set_amax(self.amax);
        p.set_vmax(self.vmax, self.ini_maxvel);
        p.set_vlimit(self.vlimit);
        p.set_term_cond(self.term_cond.into(), self.tolerance);
        if let Some((uu_per_rev, mode)) = self.spindle_sync {
            p.set_spindle_sync(uu_per_rev, mode.into());
        }

        for mv in &self.moves {
            let result = match mv {
                MoveCmd::Line { end, reqvel, maxvel, accel, enables, atspeed, indexrotary } => p
                    .add_line(
                        Pose9::from(end),
                        *reqvel,
                        *maxvel,
                        *accel,
                        *enables,
                        *atspeed,
                        *indexrotary,
                    ),
                MoveCmd::Circle {
                    center,
                    normal,
                    radius_vec,
                    angle,
                    rise,
                    end_uvw,
                    end_abc,
                    reqvel,
                    maxvel,
                    accel,
                    enables,
                } => {
                    let circle = CartCircle::new(
                        Cartesian::new(center.0, center.1, center.2),
                        Cartesian::new(normal.0, normal.1, normal.2),
                        Cartesian::new(radius_vec.0, radius_vec.1, radius_vec.2),
                        *angle,
                        *rise,
                    );
                    p.add_circle(
                        circle,
                        Cartesian::new(end_uvw.0, end_uvw.1, end_uvw.2),
                        Cartesian::new(end_abc.0, end_abc.1, end_abc.2),
                        *reqvel,
                        *maxvel,
                        *accel,
                        *enables,
                    )
                }
                MoveCmd::RigidTap { end, reqvel, maxvel, accel, enables } => {
                    p.add_rigid_tap(Pose9::from(end), *reqvel, *maxvel, *accel, *enables)
                }
            };
            if let ControlResult::Fail(e) = result {
                return Err(SimError::PlannerRejected(format!("{e}")));
            }
        }

        let io = SimIo::new(self.io_script.clone());
        Ok(SimHarness::new(p, io))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_pose() -> Pose9Cfg {
        Pose9Cfg { xyz: (0.0, 0.0, 0.0), uvw: (0.0, 0.0, 0.0), abc: (0.0, 0.0, 0.0) }
    }

    #[test]
    fn scenario_json_round_trips_and_drains_to_idle() {
        let scenario = Scenario {
            start_pos: Some(zero_pose()),
            cycle_time: 0.001,
            amax: 100.0,
            vmax: 50.0,
            ini_maxvel: 100.0,
            vlimit: f64::INFINITY,
            term_cond: TermCondCfg::Stop,
            tolerance: 0.0,
            spindle_sync: None,
            moves: vec![MoveCmd::Line {
                end: Pose9Cfg { xyz: (10.0, 0.0, 0.0), uvw: (0.0, 0.0, 0.0), abc: (0.0, 0.0, 0.0) },
                reqvel: 50.0,
                maxvel: 100.0,
                accel: 100.0,
                enables: 0,
                atspeed: false,
                indexrotary: None,
            }],
            io_script: Vec::new(),
            max_ticks: 20_000,
        };

        let json = serde_json::to_string(&scenario).expect("serializes");
        let reloaded: Scenario = serde_json::from_str(&json).expect("deserializes");

        let mut harness: SimHarness<8> = reloaded.build().expect("scenario should be accepted");
        assert!(harness.run_to_idle(reloaded.max_ticks));
        assert!((harness.planner().get_pos().xyz.x - 10.0).abs() < 1e-3);
    }

    #[test]
    fn invalid_move_is_reported_not_panicked() {
        let scenario = Scenario {
            start_pos: Some(zero_pose()),
            cycle_time: 0.001,
            amax: 100.0,
            vmax: 50.0,
            ini_maxvel: 100.0,
            vlimit: f64::INFINITY,
            term_cond: TermCondCfg::Stop,
            tolerance: 0.0,
            spindle_sync: None,
            moves: vec![MoveCmd::Line {
                end: zero_pose(),
                reqvel: 50.0,
                maxvel: 100.0,
                accel: -1.0,
                enables: 0,
                atspeed: false,
                indexrotary: None,
            }],
            io_script: Vec::new(),
            max_ticks: 100,
        };

        let result: Result<SimHarness<8>, SimError> = scenario.build();
        assert!(matches!(result, Err(SimError::PlannerRejected(_))));
    }
}

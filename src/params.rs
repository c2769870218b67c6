//! Run-wide simulation parameters.

use crate::util::non_negative;
use crate::ConfigError;
use serde::{Deserialize, Serialize};

/// Immutable parameters of a simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// The number of ticks to run for.
    pub steps: usize,
    /// The seed of the random source.
    pub seed: u64,
    /// The time step used to integrate vehicle positions each tick, in s.
    pub dt: f64,
    /// Signal timing constants.
    pub timing: SignalTiming,
    /// Vehicle kinematic constants.
    pub kinematics: Kinematics,
    /// Road geometry constants.
    pub geometry: Geometry,
    /// The conflict zone used by vehicles yielding to a priority street.
    pub yield_window: YieldWindow,
}

/// Which timing policy the signal controllers run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Each group holds green for its configured `green` duration.
    Fixed,
    /// Green is extended or cut based on queue pressure, within `[min_green, max_green]`.
    Adaptive,
}

/// Signal timing constants shared by every controlled intersection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalTiming {
    pub policy: Policy,
    /// Yellow duration in ticks.
    pub yellow: u32,
    /// All-red clearance duration in ticks.
    pub all_red: u32,
    /// The queue advantage the active group needs to keep its green.
    pub theta: u32,
}

/// Vehicle kinematic constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Kinematics {
    /// Free-flow speed in m/s.
    pub free_speed: f64,
    /// Minimum headway distance in m.
    pub headway: f64,
    /// A vehicle stops when the gap to its leader falls below `headway * headway_factor`.
    pub headway_factor: f64,
    /// A vehicle closer than this to its goal has completed its route, in m.
    pub completion_radius: f64,
    /// A vehicle closer than this to its stop line must obey its right-of-way rule, in m.
    pub decision_radius: f64,
    /// Per-component tolerance for two headings to be considered equal.
    pub heading_tolerance: f64,
}

/// Road geometry constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    /// Lane width in m.
    pub lane_width: f64,
    /// Radius of an intersection in m.
    pub intersection_radius: f64,
    /// Lane keeping is suspended within `intersection_radius + intersection_buffer`
    /// of any intersection centre.
    pub intersection_buffer: f64,
}

/// The conflict zone on a priority street, relative to the junction centre.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YieldWindow {
    /// How far before the centre an oncoming vehicle conflicts, in m.
    pub ahead: f64,
    /// How far past the centre a vehicle still occupies the junction, in m.
    pub behind: f64,
    /// Maximum lateral offset from the street's centre line, in m.
    pub lateral: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            steps: 300,
            seed: 42,
            dt: 0.2,
            timing: Default::default(),
            kinematics: Default::default(),
            geometry: Default::default(),
            yield_window: Default::default(),
        }
    }
}

impl Default for SignalTiming {
    fn default() -> Self {
        Self {
            policy: Policy::Adaptive,
            yellow: 3,
            all_red: 1,
            theta: 3,
        }
    }
}

impl Default for Kinematics {
    fn default() -> Self {
        Self {
            free_speed: 30.0,
            headway: 8.0,
            headway_factor: 1.5,
            completion_radius: 8.0,
            decision_radius: 15.0,
            heading_tolerance: 0.1,
        }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            lane_width: 12.0,
            intersection_radius: 25.0,
            intersection_buffer: 5.0,
        }
    }
}

impl Default for YieldWindow {
    fn default() -> Self {
        Self {
            ahead: 15.0,
            behind: 5.0,
            lateral: 6.0,
        }
    }
}

impl Parameters {
    /// Checks that every distance, speed and duration is finite and non-negative, and
    /// that a vehicle cannot step over its goal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let k = &self.kinematics;
        let g = &self.geometry;
        let y = &self.yield_window;
        for (name, value) in [
            ("dt", self.dt),
            ("kinematics.free_speed", k.free_speed),
            ("kinematics.headway", k.headway),
            ("kinematics.headway_factor", k.headway_factor),
            ("kinematics.completion_radius", k.completion_radius),
            ("kinematics.decision_radius", k.decision_radius),
            ("kinematics.heading_tolerance", k.heading_tolerance),
            ("geometry.lane_width", g.lane_width),
            ("geometry.intersection_radius", g.intersection_radius),
            ("geometry.intersection_buffer", g.intersection_buffer),
            ("yield_window.ahead", y.ahead),
            ("yield_window.behind", y.behind),
            ("yield_window.lateral", y.lateral),
        ] {
            non_negative(name, value)?;
        }
        let stride = k.free_speed * self.dt;
        if stride >= 2.0 * k.completion_radius {
            return Err(ConfigError::StepOvershoots {
                stride,
                completion_radius: k.completion_radius,
            });
        }
        Ok(())
    }

    /// The distance below which a vehicle stops behind its leader.
    pub fn safety_gap(&self) -> f64 {
        self.kinematics.headway * self.kinematics.headway_factor
    }

    /// The radius around an intersection centre in which lane keeping is suspended.
    pub fn lane_keeping_exclusion(&self) -> f64 {
        self.geometry.intersection_radius + self.geometry.intersection_buffer
    }
}

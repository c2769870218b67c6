use crate::params::Policy;
use crate::SegmentId;
use log::debug;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

/// The signal controller of a single intersection.
///
/// Cycles through the green, yellow and all-red sub-states of each signal group in turn.
#[derive(Clone, Debug)]
pub struct SignalController {
    /// The timing plan.
    plan: SignalPlan,
    /// The index of the group which currently holds the right-of-way.
    phase: usize,
    /// The current sub-state of the active group.
    sub: SubState,
    /// The number of ticks spent in the current sub-state.
    elapsed: u32,
}

/// The timing plan of a signal controller.
#[derive(Clone, Debug)]
pub struct SignalPlan {
    /// The competing groups, served in order.
    pub groups: Vec<SignalGroup>,
    /// The duration of the yellow sub-state in ticks.
    pub yellow: u32,
    /// The duration of the all-red sub-state in ticks.
    pub all_red: u32,
    /// The policy used to time green sub-states.
    pub policy: Policy,
    /// The queue advantage needed to extend an adaptive green.
    pub theta: u32,
}

/// A set of approaches which are given green together.
#[derive(Clone, Debug)]
pub struct SignalGroup {
    /// The controlled approaches.
    pub segments: SmallVec<[SegmentId; 4]>,
    /// The green duration under the fixed policy, in ticks.
    pub green: u32,
    /// The minimum green duration under the adaptive policy, in ticks.
    pub min_green: u32,
    /// The maximum green duration under the adaptive policy, in ticks.
    pub max_green: u32,
}

/// The fine-grained stage within a phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubState {
    Green,
    Yellow,
    AllRed,
}

/// The state of a traffic light as seen by an approach.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightState {
    #[serde(rename = "R")]
    Red,
    #[serde(rename = "Y")]
    Yellow,
    #[serde(rename = "G")]
    Green,
}

impl SignalController {
    /// Creates a controller with the first group at the start of its green.
    pub fn new(plan: SignalPlan) -> Self {
        Self {
            plan,
            phase: 0,
            sub: SubState::Green,
            elapsed: 0,
        }
    }

    /// The index of the group which currently holds the right-of-way.
    pub fn phase(&self) -> usize {
        self.phase
    }

    /// The sub-state of the active group.
    pub fn sub_state(&self) -> SubState {
        self.sub
    }

    /// The number of ticks spent in the current sub-state.
    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    /// The timing plan.
    pub fn plan(&self) -> &SignalPlan {
        &self.plan
    }

    /// Gets the light shown to every approach controlled by this signal.
    /// Approaches outside the active group are always red.
    pub fn lights(&self) -> impl Iterator<Item = (SegmentId, LightState)> + '_ {
        let active = match self.sub {
            SubState::Green => LightState::Green,
            SubState::Yellow => LightState::Yellow,
            SubState::AllRed => LightState::Red,
        };
        self.plan.groups.iter().enumerate().flat_map(move |(idx, group)| {
            let state = if idx == self.phase {
                active
            } else {
                LightState::Red
            };
            group.segments.iter().map(move |id| (*id, state))
        })
    }

    /// Advances the controller by one tick.
    ///
    /// # Parameters
    /// * `queues` - The number of stopped vehicles on each approach;
    ///   only consulted during an adaptive green.
    pub fn step(&mut self, queues: &HashMap<SegmentId, usize>) {
        match (self.sub, self.plan.policy) {
            (SubState::Green, Policy::Adaptive) => self.step_adaptive(queues),
            _ => self.step_fixed(),
        }
    }

    /// Holds the current sub-state for its configured duration.
    fn step_fixed(&mut self) {
        self.elapsed += 1;
        if self.elapsed >= self.duration(self.sub) {
            self.advance();
        }
    }

    /// Extends or ends the current green based on queue pressure.
    fn step_adaptive(&mut self, queues: &HashMap<SegmentId, usize>) {
        let group = &self.plan.groups[self.phase];
        if self.elapsed < group.min_green {
            self.elapsed += 1;
        } else if self.elapsed >= group.max_green {
            self.advance();
        } else {
            let (active, other) = self.queue_split(queues);
            if active >= other + self.plan.theta as usize {
                self.elapsed += 1;
            } else {
                self.advance();
            }
        }
    }

    /// Sums the queues of the active group and of all other groups.
    fn queue_split(&self, queues: &HashMap<SegmentId, usize>) -> (usize, usize) {
        let mut active = 0;
        let mut other = 0;
        for (idx, group) in self.plan.groups.iter().enumerate() {
            let total: usize = group
                .segments
                .iter()
                .map(|id| queues.get(id).copied().unwrap_or(0))
                .sum();
            if idx == self.phase {
                active += total;
            } else {
                other += total;
            }
        }
        (active, other)
    }

    /// The configured duration of a sub-state for the active group.
    fn duration(&self, sub: SubState) -> u32 {
        match sub {
            SubState::Green => self.plan.groups[self.phase].green,
            SubState::Yellow => self.plan.yellow,
            SubState::AllRed => self.plan.all_red,
        }
    }

    /// Moves to the next sub-state, skipping clearance sub-states with no duration.
    fn advance(&mut self) {
        self.elapsed = 0;
        self.sub = match self.sub {
            SubState::Green => SubState::Yellow,
            SubState::Yellow => SubState::AllRed,
            SubState::AllRed => {
                self.phase = (self.phase + 1) % self.plan.groups.len();
                SubState::Green
            }
        };
        debug!("signal phase {} entered {:?}", self.phase, self.sub);
        if self.sub != SubState::Green && self.duration(self.sub) == 0 {
            self.advance();
        }
    }
}

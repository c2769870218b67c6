use self::following::nearest_ahead;
use self::right_of_way::must_stop;
use crate::light::LightState;
use crate::math::{Point2d, Vector2d};
use crate::network::{Manoeuvre, Movement, Network, Segment};
use crate::params::Parameters;
use crate::{IntersectionId, SegmentId, SimError, VehicleId};
use cgmath::prelude::*;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

mod following;
mod right_of_way;

/// A simulated vehicle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID.
    id: VehicleId,
    /// The public identifier, derived from the spawn origin and tick.
    name: String,
    /// The spawn sequence number, used to order snapshots.
    seq: usize,
    /// The tick on which the vehicle was spawned.
    spawn_tick: usize,
    /// The approach the vehicle spawned on. Never changes.
    origin: SegmentId,
    /// The segment the vehicle currently belongs to. Reassigned once, when turning.
    segment: SegmentId,
    /// The turn decision, drawn at spawn.
    turn: Turn,
    /// The turn geometry, if the vehicle's movement has one.
    manoeuvre: Option<Manoeuvre>,
    /// Reaching this point completes the vehicle's route.
    goal: Point2d,
    /// The point at which the right-of-way rule is evaluated.
    stop_line: Option<Point2d>,
    /// The world space coordinates of the vehicle.
    position: Point2d,
    /// A unit vector aligned with the vehicle's heading.
    heading: Vector2d,
    /// The speed chosen during the last step, in m/s.
    speed: f64,
    /// Whether the turn has been executed.
    turned: bool,
    /// The motion state.
    state: MotionState,
    /// The number of ticks spent stopped.
    wait: usize,
}

/// A turn decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Turn {
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
    #[serde(rename = "S")]
    Straight,
}

/// The motion state of a vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionState {
    #[serde(rename = "approach")]
    Approaching,
    #[serde(rename = "stop")]
    Stopped,
    #[serde(rename = "go")]
    Moving,
    #[serde(rename = "done")]
    Completed,
}

/// Everything needed to place a new vehicle in the network.
pub(crate) struct Spawn<'a> {
    pub name: String,
    pub seq: usize,
    pub tick: usize,
    pub origin: SegmentId,
    pub segment: &'a Segment,
    pub spawn: Point2d,
    pub movement: &'a Movement,
}

/// The state of another vehicle at the beginning of the tick.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Neighbour {
    pub id: VehicleId,
    pub segment: SegmentId,
    pub position: Point2d,
    pub heading: Vector2d,
}

/// The world a vehicle observes while stepping.
pub(crate) struct StepContext<'a> {
    pub params: &'a Parameters,
    pub network: &'a Network,
    /// The light shown to each signal-controlled segment.
    pub lights: &'a HashMap<SegmentId, LightState>,
    /// Every vehicle as it was at the beginning of the tick.
    pub world: &'a [Neighbour],
}

impl Vehicle {
    /// Creates a new vehicle at the spawn point of its approach.
    pub(crate) fn new(id: VehicleId, spawn: Spawn) -> Self {
        Self {
            id,
            name: spawn.name,
            seq: spawn.seq,
            spawn_tick: spawn.tick,
            origin: spawn.origin,
            segment: spawn.origin,
            turn: spawn.movement.turn,
            manoeuvre: spawn.movement.manoeuvre,
            goal: spawn.movement.goal,
            stop_line: spawn.segment.stop_line(),
            position: spawn.spawn,
            heading: spawn.segment.lane().dir,
            speed: 0.0,
            turned: false,
            state: MotionState::Approaching,
            wait: 0,
        }
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The public identifier of the vehicle.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The spawn sequence number.
    pub fn seq(&self) -> usize {
        self.seq
    }

    /// The tick on which the vehicle was spawned.
    pub fn spawn_tick(&self) -> usize {
        self.spawn_tick
    }

    /// The approach the vehicle spawned on.
    pub fn origin(&self) -> SegmentId {
        self.origin
    }

    /// The segment the vehicle currently belongs to.
    pub fn segment(&self) -> SegmentId {
        self.segment
    }

    /// The turn decision.
    pub fn turn(&self) -> Turn {
        self.turn
    }

    /// The intersection at which the vehicle turns, if it turns.
    pub fn target_intersection(&self) -> Option<IntersectionId> {
        self.manoeuvre.map(|m| m.intersection)
    }

    /// The coordinates in world space of the vehicle.
    pub fn position(&self) -> Point2d {
        self.position
    }

    /// A unit vector in world space aligned with the vehicle's heading.
    pub fn heading(&self) -> Vector2d {
        self.heading
    }

    /// The goal which completes the vehicle's route.
    pub fn goal(&self) -> Point2d {
        self.goal
    }

    /// The speed chosen during the last step, in m/s.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Whether the vehicle has executed its turn.
    pub fn has_turned(&self) -> bool {
        self.turned
    }

    /// The motion state.
    pub fn state(&self) -> MotionState {
        self.state
    }

    /// Whether the vehicle has completed its route.
    pub fn is_completed(&self) -> bool {
        self.state == MotionState::Completed
    }

    /// The number of ticks the vehicle has spent stopped.
    pub fn wait(&self) -> usize {
        self.wait
    }

    /// The vehicle as seen by other vehicles.
    pub(crate) fn as_neighbour(&self) -> Neighbour {
        Neighbour {
            id: self.id,
            segment: self.segment,
            position: self.position,
            heading: self.heading,
        }
    }

    /// Advances the vehicle by one tick.
    ///
    /// A completed vehicle is left untouched and reported as an error.
    pub(crate) fn step(&mut self, ctx: &StepContext) -> Result<(), SimError> {
        let kin = &ctx.params.kinematics;

        if self.is_completed() {
            return Err(SimError::SteppedCompleted(self.name.clone()));
        }
        if self.position.distance(self.goal) < kin.completion_radius {
            self.state = MotionState::Completed;
            self.speed = 0.0;
            debug!("{} completed after waiting {} ticks", self.name, self.wait);
            return Ok(());
        }

        let near = self
            .stop_line
            .map_or(false, |line| self.position.distance(line) < kin.decision_radius);
        if near && must_stop(self, ctx) {
            self.state = MotionState::Stopped;
            self.speed = 0.0;
            self.wait += 1;
            return Ok(());
        }

        self.state = MotionState::Moving;
        self.speed = kin.free_speed;
        let lane = *ctx.network.segment(self.segment).lane();
        if let Some(leader) = nearest_ahead(self, &lane, ctx) {
            if self.position.distance(leader.position) < ctx.params.safety_gap() {
                self.speed = 0.0;
            }
        }

        self.execute_turn(ctx.network);
        self.keep_lane(ctx);
        self.position += self.heading * (self.speed * ctx.params.dt);
        Ok(())
    }

    /// Commits to the turn geometry once inside the trigger radius.
    fn execute_turn(&mut self, network: &Network) {
        if self.turned {
            return;
        }
        let Some(manoeuvre) = self.manoeuvre else {
            return;
        };
        let centre = network.intersection(manoeuvre.intersection).centre();
        if self.position.distance(centre) >= manoeuvre.trigger_radius {
            return;
        }

        let exit = network.segment(manoeuvre.exit);
        self.heading = exit.lane().dir;
        self.position = exit.lane().snap(self.position);
        self.segment = manoeuvre.exit;
        // A stop line the vehicle has already passed no longer applies
        self.stop_line = exit
            .stop_line()
            .filter(|line| self.heading.dot(*line - self.position) > 0.0);
        self.turned = true;
        debug!("{} turned {:?} onto {}", self.name, self.turn, exit.name());
    }

    /// Snaps the vehicle onto its lane's centre line, unless it is inside an intersection.
    fn keep_lane(&mut self, ctx: &StepContext) {
        let exclusion = ctx.params.lane_keeping_exclusion();
        let inside = ctx
            .network
            .iter_intersections()
            .any(|(_, i)| self.position.distance(i.centre()) < exclusion);
        if !inside {
            self.position = ctx.network.segment(self.segment).lane().snap(self.position);
        }
    }
}

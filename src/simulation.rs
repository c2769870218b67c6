use crate::config::Config;
use crate::light::{LightState, SignalController, SignalPlan};
use crate::metrics::{Metrics, Summary};
use crate::network::Network;
use crate::params::Parameters;
use crate::snapshot::{Snapshot, VehicleRecord};
use crate::spawn::ArrivalProcess;
use crate::vehicle::{MotionState, Neighbour, Spawn, StepContext, Vehicle};
use crate::{ConfigError, IntersectionId, SegmentId, SimError, VehicleId, VehicleSet};
use itertools::Itertools;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use slotmap::SecondaryMap;
use std::collections::HashMap;

/// A traffic simulation.
pub struct Simulation {
    /// The run-wide parameters.
    params: Parameters,
    /// The road network.
    network: Network,
    /// The signal controller of each signalled intersection.
    controllers: SecondaryMap<IntersectionId, SignalController>,
    /// The arrival process of each approach.
    arrivals: Vec<ArrivalProcess>,
    /// The vehicles being simulated.
    vehicles: VehicleSet,
    /// The single random source of the run.
    rng: StdRng,
    /// The index of the next tick.
    tick: usize,
    /// The next sequence number.
    seq: usize,
    /// Running statistics.
    metrics: Metrics,
    /// The snapshot of every completed tick.
    snapshots: Vec<Snapshot>,
}

impl Simulation {
    /// Validates a configuration and creates a simulation from it.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let network = config.compile()?;
        Self::from_parts(config.params.clone(), network)
    }

    /// Creates a simulation over an already compiled network.
    ///
    /// The signal timing in `params` replaces whatever timing the network was
    /// compiled with; only the signal groups are taken from the network.
    pub fn from_parts(params: Parameters, network: Network) -> Result<Self, ConfigError> {
        params.validate()?;

        let timing = &params.timing;
        let mut controllers = SecondaryMap::new();
        for (id, intersection) in network.iter_intersections() {
            if let Some(plan) = intersection.signal() {
                let plan = SignalPlan {
                    yellow: timing.yellow,
                    all_red: timing.all_red,
                    policy: timing.policy,
                    theta: timing.theta,
                    ..plan.clone()
                };
                controllers.insert(id, SignalController::new(plan));
            }
        }
        let arrivals = network
            .iter_approaches()
            .map(|(id, segment, arrival)| ArrivalProcess::new(id, segment.name(), arrival))
            .collect::<Result<_, _>>()?;

        Ok(Self {
            rng: StdRng::seed_from_u64(params.seed),
            metrics: Metrics::new(&network),
            params,
            network,
            controllers,
            arrivals,
            vehicles: VehicleSet::default(),
            tick: 0,
            seq: 0,
            snapshots: vec![],
        })
    }

    /// Places a vehicle at the spawn point of an approach, as if it arrived this tick.
    ///
    /// # Parameters
    /// * `origin` - The name of the approach
    /// * `movement` - The index of the movement in the approach's movement table
    pub fn add_vehicle(&mut self, origin: &str, movement: usize) -> Result<VehicleId, ConfigError> {
        let id = self
            .network
            .segment_id(origin)
            .ok_or_else(|| ConfigError::UnknownSegment(origin.to_owned()))?;
        self.spawn(id, movement)
            .ok_or_else(|| ConfigError::UnknownMovement {
                segment: origin.to_owned(),
                movement,
            })
    }

    /// Runs the configured number of ticks.
    pub fn run(&mut self) -> Result<(), SimError> {
        info!(
            "running {} ticks over {} approaches, seed {}",
            self.params.steps,
            self.arrivals.len(),
            self.params.seed
        );
        for _ in 0..self.params.steps {
            self.step()?;
        }
        info!(
            "finished after {} ticks: {} vehicles completed, {} still live",
            self.tick,
            self.metrics.completed(),
            self.vehicles.len()
        );
        Ok(())
    }

    /// Advances the simulation by one tick.
    ///
    /// Vehicles step against the world as it was at the start of the tick; vehicles
    /// spawned during the tick are invisible to it. Completed vehicles are evicted
    /// after the tick's snapshot is taken.
    ///
    /// On error nothing has been changed and the tick can be retried.
    pub fn step(&mut self) -> Result<(), SimError> {
        if let Some(vehicle) = self.vehicles.values().find(|v| v.is_completed()) {
            return Err(SimError::SteppedCompleted(vehicle.name().to_owned()));
        }

        self.spawn_arrivals();

        let queues = self.count_queues();
        for (_, controller) in &mut self.controllers {
            controller.step(&queues);
        }
        let lights = self.lights();

        let tick = self.tick;
        let world: Vec<Neighbour> = self
            .vehicles
            .values()
            .filter(|v| v.spawn_tick() < tick)
            .map(Vehicle::as_neighbour)
            .collect();
        let ctx = StepContext {
            params: &self.params,
            network: &self.network,
            lights: &lights,
            world: &world,
        };
        for vehicle in self.vehicles.values_mut() {
            vehicle.step(&ctx)?;
            if vehicle.is_completed() {
                self.metrics.record_completion(vehicle.wait());
            }
        }

        let queues = self.count_queues();
        self.metrics.record_queues(&queues);
        let snapshot = self.snapshot(&lights);
        self.snapshots.push(snapshot);

        self.vehicles.retain(|_, v| !v.is_completed());
        self.tick += 1;
        Ok(())
    }

    /// Gets the index of the next tick.
    pub fn tick(&self) -> usize {
        self.tick
    }

    /// The run-wide parameters.
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// The road network.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Returns an iterator over all the vehicles in the simulation.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Gets a reference to the vehicle with the given ID, if it is still live.
    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(vehicle_id)
    }

    /// Gets the signal controller of the named intersection.
    pub fn controller(&self, intersection: &str) -> Option<&SignalController> {
        let id = self.network.intersection_id(intersection)?;
        self.controllers.get(id)
    }

    /// Gets the light currently shown to each signal-controlled segment.
    pub fn lights(&self) -> HashMap<SegmentId, LightState> {
        self.controllers
            .values()
            .flat_map(|controller| controller.lights())
            .collect()
    }

    /// The snapshot of every completed tick, in order.
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Takes ownership of the snapshot log, leaving it empty.
    pub fn take_snapshots(&mut self) -> Vec<Snapshot> {
        std::mem::take(&mut self.snapshots)
    }

    /// Summarises the run so far.
    pub fn summary(&self) -> Summary {
        self.metrics.summary(self.tick, &self.network)
    }

    /// Spawns the vehicles arriving this tick on every approach.
    fn spawn_arrivals(&mut self) {
        for idx in 0..self.arrivals.len() {
            let count = self.arrivals[idx].sample_count(&mut self.rng);
            for _ in 0..count {
                let movement = self.arrivals[idx].sample_movement(&mut self.rng);
                self.spawn(self.arrivals[idx].origin(), movement);
            }
        }
    }

    /// Spawns a vehicle on an approach, or returns `None` if the approach has no such movement.
    fn spawn(&mut self, origin: SegmentId, movement: usize) -> Option<VehicleId> {
        let segment = self.network.segment(origin);
        let arrival = segment.arrival()?;
        let movement = arrival.movements.get(movement)?;

        let n = self.metrics.record_spawn(origin);
        let seq = self.seq;
        self.seq += 1;
        let spawn = Spawn {
            name: format!("{}_{}_{}", segment.name(), self.tick, n),
            seq,
            tick: self.tick,
            origin,
            segment,
            spawn: arrival.spawn,
            movement,
        };
        let id = self.vehicles.insert_with_key(|id| Vehicle::new(id, spawn));
        debug!(
            "spawned {} turning {:?}",
            self.vehicles[id].name(),
            movement.turn
        );
        Some(id)
    }

    /// Counts the stopped vehicles on each segment.
    fn count_queues(&self) -> HashMap<SegmentId, usize> {
        self.vehicles
            .values()
            .filter(|v| v.state() == MotionState::Stopped)
            .map(|v| v.segment())
            .counts()
    }

    /// Records the observable state at the end of the tick.
    fn snapshot(&self, lights: &HashMap<SegmentId, LightState>) -> Snapshot {
        let lights = self
            .network
            .iter_segments()
            .filter(|(_, s)| s.stop_line().is_some())
            .map(|(id, s)| {
                let state = lights.get(&id).copied().unwrap_or(LightState::Green);
                (s.name().to_owned(), state)
            })
            .collect();
        let vehicles = self
            .vehicles
            .values()
            .filter(|v| !v.is_completed())
            .sorted_by_key(|v| v.seq())
            .map(|v| VehicleRecord::new(v, &self.network))
            .collect();
        Snapshot {
            tick: self.tick,
            lights,
            vehicles,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::light::SubState;
    use crate::params::Policy;

    fn quiet_tee() -> Config {
        let mut config = Config::three_tee();
        for segment in &mut config.network.segments {
            if let Some(arrival) = &mut segment.arrival {
                arrival.rate = 0.0;
            }
        }
        config
    }

    #[test]
    fn spawned_vehicles_are_named_by_origin_and_tick() {
        let mut sim = Simulation::new(&quiet_tee()).unwrap();
        let a = sim.add_vehicle("main_E", 0).unwrap();
        let b = sim.add_vehicle("main_E", 1).unwrap();
        assert_eq!(sim.get_vehicle(a).unwrap().name(), "main_E_0_1");
        assert_eq!(sim.get_vehicle(b).unwrap().name(), "main_E_0_2");
        assert_eq!(sim.summary().spawn_counts["main_E"], 2);
    }

    #[test]
    fn rejects_unknown_movement() {
        let mut sim = Simulation::new(&quiet_tee()).unwrap();
        assert!(matches!(
            sim.add_vehicle("main_E", 9),
            Err(ConfigError::UnknownMovement { movement: 9, .. })
        ));
        assert!(matches!(
            sim.add_vehicle("north_out", 0),
            Err(ConfigError::UnknownMovement { .. })
        ));
        assert!(matches!(
            sim.add_vehicle("nowhere", 0),
            Err(ConfigError::UnknownSegment(_))
        ));
    }

    #[test]
    fn snapshot_covers_stop_lines() {
        let mut sim = Simulation::new(&quiet_tee()).unwrap();
        sim.step().unwrap();
        let snapshot = &sim.snapshots()[0];
        assert_eq!(snapshot.tick, 0);
        assert_eq!(snapshot.lights.len(), 5);
        assert_eq!(snapshot.lights["main_E"], LightState::Green);
        assert_eq!(snapshot.lights["south_right"], LightState::Red);
        // Yield-controlled approaches are never signalled
        assert_eq!(snapshot.lights["north_center"], LightState::Green);
    }

    #[test]
    fn red_light_stops_vehicle_at_stop_line() {
        let mut config = quiet_tee();
        config.params.timing.policy = Policy::Fixed;
        let mut sim = Simulation::new(&config).unwrap();
        let id = sim.add_vehicle("south_right", 0).unwrap();
        // The side street stays red for the first 25 ticks and the vehicle
        // reaches its decision radius on tick 18
        for _ in 0..20 {
            sim.step().unwrap();
        }
        let vehicle = sim.get_vehicle(id).unwrap();
        assert_eq!(vehicle.state(), MotionState::Stopped);
        assert_eq!(vehicle.wait(), 2);
        assert!(!vehicle.has_turned());
        assert_eq!(sim.summary().max_queues["south_right"], 1);

        let controller = sim.controller("south_right").unwrap();
        assert_eq!(controller.phase(), 0);
        assert_eq!(controller.sub_state(), SubState::Green);
    }

    #[test]
    fn timing_comes_from_params() {
        let config = quiet_tee();
        let network = config.compile().unwrap();
        let mut params = config.params.clone();
        params.timing.policy = Policy::Fixed;
        params.timing.yellow = 5;
        let sim = Simulation::from_parts(params, network).unwrap();
        let plan = sim.controller("south_right").unwrap().plan();
        assert_eq!(plan.policy, Policy::Fixed);
        assert_eq!(plan.yellow, 5);
        assert_eq!(plan.groups.len(), 2);
    }

    #[test]
    fn failed_step_changes_nothing() {
        let mut sim = Simulation::new(&quiet_tee()).unwrap();
        let id = sim.add_vehicle("main_W", 0).unwrap();
        sim.add_vehicle("main_E", 0).unwrap();

        // Drive one vehicle to its goal behind the simulation's back
        let lights = HashMap::new();
        let ctx = StepContext {
            params: &sim.params,
            network: &sim.network,
            lights: &lights,
            world: &[],
        };
        let vehicle = &mut sim.vehicles[id];
        while !vehicle.is_completed() {
            vehicle.step(&ctx).unwrap();
        }

        let positions: Vec<_> = sim.iter_vehicles().map(|v| v.position()).collect();
        let elapsed = sim.controller("south_right").unwrap().elapsed();
        assert_eq!(
            sim.step(),
            Err(SimError::SteppedCompleted("main_W_0_1".into()))
        );
        assert_eq!(sim.tick(), 0);
        assert!(sim.snapshots().is_empty());
        assert_eq!(sim.controller("south_right").unwrap().elapsed(), elapsed);
        let after: Vec<_> = sim.iter_vehicles().map(|v| v.position()).collect();
        assert_eq!(after, positions);
    }

    #[test]
    fn completed_vehicles_are_evicted() {
        let mut sim = Simulation::new(&quiet_tee()).unwrap();
        sim.add_vehicle("main_W", 0).unwrap();
        for _ in 0..60 {
            sim.step().unwrap();
        }
        assert_eq!(sim.iter_vehicles().count(), 0);
        let summary = sim.summary();
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.total_ticks, 60);
    }
}

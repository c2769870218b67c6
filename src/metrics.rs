//! Running statistics of a simulation run.

use crate::network::Network;
use crate::SegmentId;
use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;
use std::collections::{BTreeMap, HashMap};

/// Statistics reported at the end of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(rename = "total_timesteps")]
    pub total_ticks: usize,
    /// The number of vehicles which completed their route.
    #[serde(rename = "total_cars_processed")]
    pub completed: usize,
    /// The mean number of ticks a completed vehicle spent stopped.
    #[serde(rename = "average_delay")]
    pub mean_wait: f64,
    /// The longest queue of stopped vehicles observed on each approach.
    pub max_queues: BTreeMap<String, usize>,
    /// The number of vehicles spawned on each approach.
    pub spawn_counts: BTreeMap<String, usize>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Metrics {
    completed: usize,
    total_wait: usize,
    max_queues: SecondaryMap<SegmentId, usize>,
    spawn_counts: SecondaryMap<SegmentId, usize>,
}

impl Metrics {
    /// Creates empty metrics covering every approach of the network.
    pub fn new(network: &Network) -> Self {
        let mut metrics = Self::default();
        for (id, _, _) in network.iter_approaches() {
            metrics.max_queues.insert(id, 0);
            metrics.spawn_counts.insert(id, 0);
        }
        metrics
    }

    /// Counts a spawn and returns the approach's spawn count so far.
    pub fn record_spawn(&mut self, origin: SegmentId) -> usize {
        match self.spawn_counts.get_mut(origin) {
            Some(count) => {
                *count += 1;
                *count
            }
            None => {
                self.spawn_counts.insert(origin, 1);
                1
            }
        }
    }

    /// Raises the running maximum of each approach's queue.
    pub fn record_queues(&mut self, queues: &HashMap<SegmentId, usize>) {
        for (id, max) in &mut self.max_queues {
            let len = queues.get(&id).copied().unwrap_or(0);
            *max = (*max).max(len);
        }
    }

    pub fn record_completion(&mut self, wait: usize) {
        self.completed += 1;
        self.total_wait += wait;
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn summary(&self, total_ticks: usize, network: &Network) -> Summary {
        let by_name = |map: &SecondaryMap<SegmentId, usize>| -> BTreeMap<String, usize> {
            map.iter()
                .map(|(id, n)| (network.segment(id).name().to_owned(), *n))
                .collect()
        };
        Summary {
            total_ticks,
            completed: self.completed,
            mean_wait: if self.completed == 0 {
                0.0
            } else {
                self.total_wait as f64 / self.completed as f64
            },
            max_queues: by_name(&self.max_queues),
            spawn_counts: by_name(&self.spawn_counts),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::params::Parameters;
    use crate::presets::{three_tee, ThreeTeeLayout};
    use assert_approx_eq::assert_approx_eq;

    fn network() -> Network {
        let params = Parameters::default();
        let desc = three_tee(&ThreeTeeLayout::default(), &params.geometry);
        Network::compile(&desc, &params).unwrap()
    }

    #[test]
    fn empty_run() {
        let network = network();
        let summary = Metrics::new(&network).summary(10, &network);
        assert_eq!(summary.completed, 0);
        assert_eq!(summary.mean_wait, 0.0);
        assert_eq!(summary.max_queues.len(), 5);
        assert!(summary.spawn_counts.values().all(|n| *n == 0));
    }

    #[test]
    fn running_statistics() {
        let network = network();
        let main_e = network.segment_id("main_E").unwrap();
        let mut metrics = Metrics::new(&network);

        assert_eq!(metrics.record_spawn(main_e), 1);
        assert_eq!(metrics.record_spawn(main_e), 2);
        metrics.record_queues(&[(main_e, 4)].into_iter().collect());
        metrics.record_queues(&[(main_e, 1)].into_iter().collect());
        metrics.record_completion(3);
        metrics.record_completion(6);

        let summary = metrics.summary(2, &network);
        assert_eq!(summary.spawn_counts["main_E"], 2);
        assert_eq!(summary.max_queues["main_E"], 4);
        assert_eq!(summary.max_queues["main_W"], 0);
        assert_approx_eq!(summary.mean_wait, 4.5);
    }
}

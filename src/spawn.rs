//! The stochastic arrival process of each approach.

use crate::network::Arrival;
use crate::{ConfigError, SegmentId};
use rand::distributions::WeightedIndex;
use rand::Rng;
use rand_distr::{Distribution, Poisson};

/// Draws arrivals and route choices for one approach.
#[derive(Clone, Debug)]
pub(crate) struct ArrivalProcess {
    /// The approach vehicles spawn on.
    origin: SegmentId,
    /// The arrival count distribution, or `None` if the rate is zero.
    count: Option<Poisson<f64>>,
    /// The categorical distribution over the approach's movements.
    movement: WeightedIndex<f64>,
}

impl ArrivalProcess {
    /// Creates the arrival process of an approach.
    pub fn new(origin: SegmentId, name: &str, arrival: &Arrival) -> Result<Self, ConfigError> {
        let invalid_rate = || ConfigError::InvalidValue {
            name: format!("{}.rate", name),
            value: arrival.rate,
        };
        let count = if arrival.rate > 0.0 {
            Some(Poisson::new(arrival.rate).map_err(|_| invalid_rate())?)
        } else {
            None
        };
        let movement = WeightedIndex::new(arrival.movements.iter().map(|m| m.probability))
            .map_err(|_| ConfigError::BadDistribution {
                segment: name.to_owned(),
                sum: arrival.movements.iter().map(|m| m.probability).sum(),
            })?;
        Ok(Self {
            origin,
            count,
            movement,
        })
    }

    /// The approach vehicles spawn on.
    pub fn origin(&self) -> SegmentId {
        self.origin
    }

    /// Draws the number of vehicles arriving this tick.
    pub fn sample_count<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.count.as_ref().map_or(0, |d| d.sample(rng) as usize)
    }

    /// Draws the index of a movement.
    pub fn sample_movement<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.movement.sample(rng)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::Point2d;
    use crate::network::Movement;
    use crate::vehicle::Turn;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use slotmap::SlotMap;

    fn arrival(rate: f64, shares: &[f64]) -> Arrival {
        Arrival {
            rate,
            spawn: Point2d::new(0.0, 0.0),
            movements: shares
                .iter()
                .map(|p| Movement {
                    turn: Turn::Straight,
                    probability: *p,
                    goal: Point2d::new(100.0, 0.0),
                    manoeuvre: None,
                })
                .collect(),
        }
    }

    fn origin() -> SegmentId {
        SlotMap::<SegmentId, ()>::with_key().insert(())
    }

    #[test]
    fn zero_rate_never_spawns() {
        let process = ArrivalProcess::new(origin(), "a", &arrival(0.0, &[1.0])).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        assert!((0..1000).all(|_| process.sample_count(&mut rng) == 0));
    }

    #[test]
    fn poisson_mean_matches_rate() {
        let process = ArrivalProcess::new(origin(), "a", &arrival(0.5, &[1.0])).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let n = 20_000;
        let total: usize = (0..n).map(|_| process.sample_count(&mut rng)).sum();
        let mean = total as f64 / n as f64;
        assert!((mean - 0.5).abs() < 0.05, "mean {} far from 0.5", mean);
    }

    #[test]
    fn zero_share_movement_is_never_chosen() {
        let process = ArrivalProcess::new(origin(), "a", &arrival(0.1, &[0.0, 1.0])).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        assert!((0..1000).all(|_| process.sample_movement(&mut rng) == 1));
    }
}

use super::{Neighbour, StepContext, Vehicle};
use crate::math::approx_eq;
use crate::network::Lane;
use cgmath::prelude::*;

/// Finds the nearest vehicle ahead in the same lane and travelling the same way.
///
/// # Parameters
/// * `vehicle` - The following vehicle
/// * `lane` - The following vehicle's current lane
/// * `ctx` - The beginning-of-tick world
pub(crate) fn nearest_ahead<'a>(
    vehicle: &Vehicle,
    lane: &Lane,
    ctx: &StepContext<'a>,
) -> Option<&'a Neighbour> {
    let half_width = 0.5 * ctx.params.geometry.lane_width;
    let tolerance = ctx.params.kinematics.heading_tolerance;
    let world: &'a [Neighbour] = ctx.world;

    world
        .iter()
        .filter(|other| other.id != vehicle.id)
        .filter(|other| approx_eq(other.heading, vehicle.heading, tolerance))
        .filter(|other| lane.lateral_offset(other.position).abs() < half_width)
        .map(|other| (vehicle.heading.dot(other.position - vehicle.position), other))
        .filter(|(ahead, _)| *ahead > 0.0)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, other)| other)
}

use super::{StepContext, Vehicle};
use crate::light::LightState;
use crate::math::{project_local, rot90, Point2d};
use crate::network::Control;
use crate::util::Interval;
use crate::SegmentId;

/// Determines whether the vehicle's right-of-way rule requires it to stop,
/// assuming it is near its stop line.
pub(crate) fn must_stop(vehicle: &Vehicle, ctx: &StepContext) -> bool {
    match ctx.network.segment(vehicle.segment).control() {
        Control::Free => false,
        Control::Signal(_) => ctx
            .lights
            .get(&vehicle.segment)
            .map_or(false, |state| *state != LightState::Green),
        Control::Yield {
            intersection,
            priority,
        } => {
            let centre = ctx.network.intersection(*intersection).centre();
            conflict_ahead(vehicle, centre, priority, ctx)
        }
    }
}

/// Checks whether a vehicle on a priority segment occupies, or is about to occupy,
/// the junction centred at `centre`.
///
/// This is a bounded-distance heuristic, not a time-to-conflict estimate.
fn conflict_ahead(
    vehicle: &Vehicle,
    centre: Point2d,
    priority: &[SegmentId],
    ctx: &StepContext,
) -> bool {
    let window = &ctx.params.yield_window;
    let along = Interval::new(-window.behind, window.ahead);

    ctx.world
        .iter()
        .filter(|other| other.id != vehicle.id && priority.contains(&other.segment))
        .any(|other| {
            // x: lateral offset from the street's centre line, y: distance left to the centre
            let local = project_local(centre, other.position, rot90(other.heading), other.heading);
            along.contains(local.y) && local.x.abs() <= window.lateral
        })
}

//! The static road network: intersections, lanes and the per-origin movement tables.

use crate::light::{SignalGroup, SignalPlan};
use crate::math::{rot90, snap_to_line, Point2d, Vector2d};
use crate::params::Parameters;
use crate::util::non_negative;
use crate::vehicle::Turn;
use crate::{ConfigError, IntersectionId, SegmentId};
use cgmath::prelude::*;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

/// The tolerance allowed when checking that turn probabilities sum to one.
const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// A serialisable description of a road network.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkDesc {
    pub intersections: Vec<IntersectionDesc>,
    pub segments: Vec<SegmentDesc>,
}

/// Describes an intersection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntersectionDesc {
    pub name: String,
    pub centre: Point2d,
    /// The competing signal groups, or `None` if the intersection is uncontrolled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<Vec<GroupDesc>>,
}

/// Describes a signal group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupDesc {
    /// The names of the controlled segments.
    pub segments: Vec<String>,
    pub green: u32,
    pub min_green: u32,
    pub max_green: u32,
}

/// Describes a directed lane of road.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentDesc {
    pub name: String,
    /// Any point on the lane's centre line.
    pub lane_point: Point2d,
    /// The direction of travel.
    pub direction: Vector2d,
    /// The point at which vehicles evaluate their right-of-way rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_line: Option<Point2d>,
    /// Set if vehicles on this segment must yield to a priority street.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yield_to: Option<YieldDesc>,
    /// Set if vehicles enter the network on this segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival: Option<ArrivalDesc>,
}

/// Describes a yield rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct YieldDesc {
    pub intersection: String,
    /// The segments which have priority over this one.
    pub priority: Vec<String>,
}

/// Describes the arrival process of an approach.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArrivalDesc {
    /// Mean arrivals per tick.
    pub rate: f64,
    pub spawn: Point2d,
    pub movements: Vec<MovementDesc>,
}

/// Describes one route choice of an approach.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovementDesc {
    pub turn: Turn,
    pub probability: f64,
    pub goal: Point2d,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manoeuvre: Option<ManoeuvreDesc>,
}

/// Describes where and onto which segment a vehicle turns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManoeuvreDesc {
    pub intersection: String,
    pub trigger_radius: f64,
    pub exit: String,
}

/// A validated road network.
#[derive(Clone, Debug)]
pub struct Network {
    intersections: SlotMap<IntersectionId, Intersection>,
    segments: SlotMap<SegmentId, Segment>,
}

/// An intersection.
#[derive(Clone, Debug)]
pub struct Intersection {
    name: String,
    centre: Point2d,
    signal: Option<SignalPlan>,
}

/// A directed lane of road.
#[derive(Clone, Debug)]
pub struct Segment {
    name: String,
    lane: Lane,
    stop_line: Option<Point2d>,
    control: Control,
    arrival: Option<Arrival>,
}

/// The centre line of a lane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lane {
    /// A point on the centre line.
    pub point: Point2d,
    /// The unit direction of travel.
    pub dir: Vector2d,
}

/// The right-of-way rule of a segment.
#[derive(Clone, Debug, PartialEq)]
pub enum Control {
    /// Never stops.
    Free,
    /// Obeys the signal of the given intersection.
    Signal(IntersectionId),
    /// Yields to vehicles on the priority segments crossing the given intersection.
    Yield {
        intersection: IntersectionId,
        priority: SmallVec<[SegmentId; 4]>,
    },
}

/// The arrival process of an approach.
#[derive(Clone, Debug)]
pub struct Arrival {
    /// Mean arrivals per tick.
    pub rate: f64,
    pub spawn: Point2d,
    pub movements: Vec<Movement>,
}

/// One route choice of an approach.
#[derive(Clone, Copy, Debug)]
pub struct Movement {
    pub turn: Turn,
    pub probability: f64,
    pub goal: Point2d,
    pub manoeuvre: Option<Manoeuvre>,
}

/// Where and onto which segment a vehicle turns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Manoeuvre {
    pub intersection: IntersectionId,
    pub trigger_radius: f64,
    pub exit: SegmentId,
}

impl Lane {
    /// Moves a point onto the centre line, preserving its longitudinal position.
    pub fn snap(&self, point: Point2d) -> Point2d {
        snap_to_line(point, self.point, self.dir)
    }

    /// Gets the signed lateral offset of a point from the centre line.
    pub fn lateral_offset(&self, point: Point2d) -> f64 {
        (point - self.point).dot(rot90(self.dir))
    }
}

impl Intersection {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn centre(&self) -> Point2d {
        self.centre
    }

    /// The signal plan, if the intersection is signal-controlled.
    pub fn signal(&self) -> Option<&SignalPlan> {
        self.signal.as_ref()
    }
}

impl Segment {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lane(&self) -> &Lane {
        &self.lane
    }

    pub fn stop_line(&self) -> Option<Point2d> {
        self.stop_line
    }

    pub fn control(&self) -> &Control {
        &self.control
    }

    /// The arrival process, if vehicles enter the network on this segment.
    pub fn arrival(&self) -> Option<&Arrival> {
        self.arrival.as_ref()
    }
}

impl Network {
    /// Validates a network description and resolves its names.
    pub fn compile(desc: &NetworkDesc, params: &Parameters) -> Result<Self, ConfigError> {
        check_unique(desc.intersections.iter().map(|i| &i.name))?;
        check_unique(desc.segments.iter().map(|s| &s.name))?;

        let mut intersections = SlotMap::with_key();
        let mut intersection_ids = HashMap::new();
        for i in &desc.intersections {
            let id = intersections.insert(Intersection {
                name: i.name.clone(),
                centre: i.centre,
                signal: None,
            });
            intersection_ids.insert(i.name.as_str(), id);
        }

        let mut segments = SlotMap::with_key();
        let mut segment_ids = HashMap::new();
        for s in &desc.segments {
            let length = s.direction.magnitude();
            if !length.is_finite() || length == 0.0 {
                return Err(ConfigError::ZeroDirection(s.name.clone()));
            }
            let id = segments.insert(Segment {
                name: s.name.clone(),
                lane: Lane {
                    point: s.lane_point,
                    dir: s.direction / length,
                },
                stop_line: s.stop_line,
                control: Control::Free,
                arrival: None,
            });
            segment_ids.insert(s.name.as_str(), id);
        }

        let find_intersection = |name: &str| {
            intersection_ids
                .get(name)
                .copied()
                .ok_or_else(|| ConfigError::UnknownIntersection(name.to_owned()))
        };
        let find_segment = |name: &str| {
            segment_ids
                .get(name)
                .copied()
                .ok_or_else(|| ConfigError::UnknownSegment(name.to_owned()))
        };

        // Signal plans
        let mut signalled = HashSet::new();
        for i in &desc.intersections {
            let Some(groups) = &i.signal else {
                continue;
            };
            let id = find_intersection(&i.name)?;
            let invalid = |reason: &str| ConfigError::InvalidSignal {
                intersection: i.name.clone(),
                reason: reason.to_owned(),
            };
            if groups.len() < 2 {
                return Err(invalid("at least two signal groups are required"));
            }
            let mut plan_groups = Vec::with_capacity(groups.len());
            for group in groups {
                if group.segments.is_empty() {
                    return Err(invalid("a signal group controls no segments"));
                }
                if group.green == 0 || group.max_green == 0 {
                    return Err(invalid("green durations must be positive"));
                }
                if group.min_green > group.max_green {
                    return Err(invalid("min_green exceeds max_green"));
                }
                let mut members = SmallVec::new();
                for name in &group.segments {
                    let segment_id = find_segment(name)?;
                    if segments[segment_id].stop_line.is_none() {
                        return Err(ConfigError::MissingStopLine(name.clone()));
                    }
                    if !signalled.insert(segment_id) {
                        return Err(invalid(&format!("`{}` is in more than one group", name)));
                    }
                    segments[segment_id].control = Control::Signal(id);
                    members.push(segment_id);
                }
                plan_groups.push(SignalGroup {
                    segments: members,
                    green: group.green,
                    min_green: group.min_green,
                    max_green: group.max_green,
                });
            }
            intersections[id].signal = Some(SignalPlan {
                groups: plan_groups,
                yellow: params.timing.yellow,
                all_red: params.timing.all_red,
                policy: params.timing.policy,
                theta: params.timing.theta,
            });
        }

        for s in &desc.segments {
            let id = find_segment(&s.name)?;

            // Yield rules
            if let Some(yield_to) = &s.yield_to {
                if signalled.contains(&id) {
                    return Err(ConfigError::InvalidSignal {
                        intersection: yield_to.intersection.clone(),
                        reason: format!("`{}` cannot both yield and obey a signal", s.name),
                    });
                }
                if s.stop_line.is_none() {
                    return Err(ConfigError::MissingStopLine(s.name.clone()));
                }
                segments[id].control = Control::Yield {
                    intersection: find_intersection(&yield_to.intersection)?,
                    priority: yield_to
                        .priority
                        .iter()
                        .map(|name| find_segment(name))
                        .collect::<Result<_, _>>()?,
                };
            }

            // Arrivals and movement tables
            if let Some(arrival) = &s.arrival {
                non_negative(&format!("{}.rate", s.name), arrival.rate)?;
                if arrival.movements.is_empty() {
                    return Err(ConfigError::NoMovements(s.name.clone()));
                }
                let mut sum = 0.0;
                let mut movements = Vec::with_capacity(arrival.movements.len());
                for (idx, m) in arrival.movements.iter().enumerate() {
                    sum += non_negative(&format!("{}.probability", s.name), m.probability)?;
                    if m.goal.distance(arrival.spawn) <= params.kinematics.completion_radius {
                        return Err(ConfigError::DegenerateRoute {
                            segment: s.name.clone(),
                            movement: idx,
                        });
                    }
                    let manoeuvre = match &m.manoeuvre {
                        Some(man) => Some(Manoeuvre {
                            intersection: find_intersection(&man.intersection)?,
                            trigger_radius: non_negative(
                                &format!("{}.trigger_radius", s.name),
                                man.trigger_radius,
                            )?,
                            exit: find_segment(&man.exit)?,
                        }),
                        None => None,
                    };
                    movements.push(Movement {
                        turn: m.turn,
                        probability: m.probability,
                        goal: m.goal,
                        manoeuvre,
                    });
                }
                if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
                    return Err(ConfigError::BadDistribution {
                        segment: s.name.clone(),
                        sum,
                    });
                }
                segments[id].arrival = Some(Arrival {
                    rate: arrival.rate,
                    spawn: arrival.spawn,
                    movements,
                });
            }
        }

        Ok(Self {
            intersections,
            segments,
        })
    }

    /// Gets the intersection with the given ID.
    pub fn intersection(&self, id: IntersectionId) -> &Intersection {
        &self.intersections[id]
    }

    /// Gets the segment with the given ID.
    pub fn segment(&self, id: SegmentId) -> &Segment {
        &self.segments[id]
    }

    /// Looks up a segment by name.
    pub fn segment_id(&self, name: &str) -> Option<SegmentId> {
        self.segments
            .iter()
            .find(|(_, s)| s.name == name)
            .map(|(id, _)| id)
    }

    /// Looks up an intersection by name.
    pub fn intersection_id(&self, name: &str) -> Option<IntersectionId> {
        self.intersections
            .iter()
            .find(|(_, i)| i.name == name)
            .map(|(id, _)| id)
    }

    /// Returns an iterator over the intersections, in declaration order.
    pub fn iter_intersections(&self) -> impl Iterator<Item = (IntersectionId, &Intersection)> {
        self.intersections.iter()
    }

    /// Returns an iterator over the segments, in declaration order.
    pub fn iter_segments(&self) -> impl Iterator<Item = (SegmentId, &Segment)> {
        self.segments.iter()
    }

    /// Returns an iterator over the segments on which vehicles enter the network.
    pub fn iter_approaches(&self) -> impl Iterator<Item = (SegmentId, &Segment, &Arrival)> {
        self.segments
            .iter()
            .filter_map(|(id, s)| s.arrival.as_ref().map(|a| (id, s, a)))
    }
}

/// Fails if any name occurs more than once.
fn check_unique<'a>(names: impl Iterator<Item = &'a String>) -> Result<(), ConfigError> {
    match names.duplicates().next() {
        Some(name) => Err(ConfigError::DuplicateName(name.clone())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::presets::{three_tee, ThreeTeeLayout};
    use assert_approx_eq::assert_approx_eq;

    fn reference() -> NetworkDesc {
        three_tee(&ThreeTeeLayout::default(), &Parameters::default().geometry)
    }

    #[test]
    fn compiles_reference_network() {
        let network = Network::compile(&reference(), &Parameters::default()).unwrap();
        assert_eq!(network.iter_approaches().count(), 5);
        let south_right = network.intersection_id("south_right").unwrap();
        let plan = network.intersection(south_right).signal().unwrap();
        assert_eq!(plan.groups.len(), 2);
        assert_eq!(plan.groups[0].segments.len(), 2);

        let main_e = network.segment_id("main_E").unwrap();
        assert_eq!(network.segment(main_e).control(), &Control::Signal(south_right));
        let north = network.segment_id("north_center").unwrap();
        assert!(matches!(network.segment(north).control(), Control::Yield { .. }));
    }

    #[test]
    fn rejects_bad_distribution() {
        let mut desc = reference();
        let arrival = desc.segments[0].arrival.as_mut().unwrap();
        arrival.movements[0].probability = 0.7;
        let err = Network::compile(&desc, &Parameters::default()).unwrap_err();
        assert!(matches!(err, ConfigError::BadDistribution { .. }));
    }

    #[test]
    fn rejects_negative_rate() {
        let mut desc = reference();
        desc.segments[0].arrival.as_mut().unwrap().rate = -0.1;
        let err = Network::compile(&desc, &Parameters::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn rejects_goal_at_spawn() {
        let mut desc = reference();
        let arrival = desc.segments[0].arrival.as_mut().unwrap();
        arrival.movements[0].goal = arrival.spawn;
        let err = Network::compile(&desc, &Parameters::default()).unwrap_err();
        assert!(matches!(err, ConfigError::DegenerateRoute { movement: 0, .. }));
    }

    #[test]
    fn rejects_unknown_exit() {
        let mut desc = reference();
        let manoeuvre = desc
            .segments
            .iter_mut()
            .flat_map(|s| s.arrival.iter_mut())
            .flat_map(|a| a.movements.iter_mut())
            .find_map(|m| m.manoeuvre.as_mut())
            .unwrap();
        manoeuvre.exit = "nowhere".into();
        let err = Network::compile(&desc, &Parameters::default()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSegment(ref name) if name == "nowhere"));
    }

    #[test]
    fn rejects_duplicate_segment() {
        let mut desc = reference();
        let copy = desc.segments[0].clone();
        desc.segments.push(copy);
        let err = Network::compile(&desc, &Parameters::default()).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateName(_)));
    }

    #[test]
    fn rejects_single_group_signal() {
        let mut desc = reference();
        let signal = desc
            .intersections
            .iter_mut()
            .find_map(|i| i.signal.as_mut())
            .unwrap();
        signal.truncate(1);
        let err = Network::compile(&desc, &Parameters::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSignal { .. }));
    }

    #[test]
    fn rejects_controlled_segment_without_stop_line() {
        for name in ["south_right", "north_center"] {
            let mut desc = reference();
            let segment = desc.segments.iter_mut().find(|s| s.name == name).unwrap();
            segment.stop_line = None;
            let err = Network::compile(&desc, &Parameters::default()).unwrap_err();
            assert!(matches!(err, ConfigError::MissingStopLine(ref n) if n == name));
        }
    }

    #[test]
    fn lane_snap_and_offset() {
        let lane = Lane {
            point: Point2d::new(-120.0, -3.0),
            dir: Vector2d::new(1.0, 0.0),
        };
        let p = lane.snap(Point2d::new(10.0, 4.0));
        assert_approx_eq!(p.x, 10.0);
        assert_approx_eq!(p.y, -3.0);
        assert_approx_eq!(lane.lateral_offset(Point2d::new(0.0, 0.0)), 3.0);
    }
}

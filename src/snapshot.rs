//! Per-tick records handed to exporters.

use crate::light::LightState;
use crate::math::{Point2d, Vector2d};
use crate::network::Network;
use crate::vehicle::{MotionState, Turn, Vehicle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The observable state of the simulation at the end of a tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The 0-based index of the tick which produced this snapshot.
    #[serde(rename = "timestep")]
    pub tick: usize,
    /// The light shown to every segment with a stop line, by segment name.
    #[serde(rename = "traffic_lights")]
    pub lights: BTreeMap<String, LightState>,
    /// Every live vehicle, in spawn order.
    #[serde(rename = "cars")]
    pub vehicles: Vec<VehicleRecord>,
}

/// The public attributes of a vehicle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub id: String,
    /// The segment the vehicle currently belongs to.
    pub origin: String,
    /// The approach the vehicle spawned on.
    pub original_origin: String,
    pub position: Point2d,
    #[serde(rename = "direction")]
    pub heading: Vector2d,
    pub state: MotionState,
    pub turn: Turn,
    pub turned: bool,
    pub target_intersection: Option<String>,
    #[serde(rename = "wait_time")]
    pub wait: usize,
}

impl VehicleRecord {
    pub(crate) fn new(vehicle: &Vehicle, network: &Network) -> Self {
        Self {
            id: vehicle.name().to_owned(),
            origin: network.segment(vehicle.segment()).name().to_owned(),
            original_origin: network.segment(vehicle.origin()).name().to_owned(),
            position: vehicle.position(),
            heading: vehicle.heading(),
            state: vehicle.state(),
            turn: vehicle.turn(),
            turned: vehicle.has_turned(),
            target_intersection: vehicle
                .target_intersection()
                .map(|id| network.intersection(id).name().to_owned()),
            wait: vehicle.wait(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wire_format() {
        let snapshot = Snapshot {
            tick: 3,
            lights: [("main_E".to_string(), LightState::Yellow)].into_iter().collect(),
            vehicles: vec![VehicleRecord {
                id: "main_E_1_1".into(),
                origin: "north_out".into(),
                original_origin: "main_E".into(),
                position: Point2d::new(3.0, 10.0),
                heading: Vector2d::new(0.0, 1.0),
                state: MotionState::Moving,
                turn: Turn::Right,
                turned: true,
                target_intersection: Some("north".into()),
                wait: 2,
            }],
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["timestep"], 3);
        assert_eq!(json["traffic_lights"]["main_E"], "Y");
        let car = &json["cars"][0];
        assert_eq!(car["id"], "main_E_1_1");
        assert_eq!(car["state"], "go");
        assert_eq!(car["turn"], "R");
        assert_eq!(car["direction"]["y"], 1.0);
        assert_eq!(car["position"]["x"], 3.0);
        assert_eq!(car["wait_time"], 2);
    }
}

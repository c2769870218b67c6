pub use cgmath;
pub use config::Config;
pub use error::{ConfigError, ExportError, SimError};
pub use light::{LightState, SignalController, SignalGroup, SignalPlan, SubState};
pub use metrics::Summary;
pub use network::{
    Arrival, ArrivalDesc, Control, GroupDesc, Intersection, IntersectionDesc, Lane, Manoeuvre,
    ManoeuvreDesc, Movement, MovementDesc, Network, NetworkDesc, Segment, SegmentDesc, YieldDesc,
};
pub use params::{Geometry, Kinematics, Parameters, Policy, SignalTiming, YieldWindow};
pub use simulation::Simulation;
pub use slotmap::{Key, KeyData};
pub use snapshot::{Snapshot, VehicleRecord};
use slotmap::{new_key_type, SlotMap};
pub use util::Interval;
pub use vehicle::{MotionState, Turn, Vehicle};

mod config;
mod error;
pub mod export;
mod light;
pub mod math;
mod metrics;
mod network;
mod params;
pub mod presets;
mod simulation;
mod snapshot;
mod spawn;
mod util;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
    /// Unique ID of a road segment.
    pub struct SegmentId;
    /// Unique ID of an intersection.
    pub struct IntersectionId;
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;

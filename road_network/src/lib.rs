//! A road network built from splines drawn by the user. Each spline's length is split between
//! roads and junctions. Roads carry lanes in lane sections, junctions carry connections, and each
//! connection owns a short connecting road with lane links tying incoming lanes to outgoing ones.
//!
//! Everything lives in one `RoadNetwork`, and entities refer to each other by id. Every edit goes
//! through a method on `RoadNetwork` that either applies completely and describes what changed in
//! an `EditEffects`, or fails and leaves the network untouched.

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod config;
pub mod connectivity;
mod edits;
mod error;
mod make;
mod network;
mod objects;
mod query;

pub use crate::config::{DrivingSide, NetworkConfig};
pub use crate::edits::{ChangeEvent, EditEffects};
pub use crate::error::{edit_error, EditError};
pub use crate::make::intersections::{
    find_all_intersections, find_intersections, find_intersections_3d, IntersectionHit,
};
pub use crate::make::junctions::RoadJunctionState;
pub use crate::network::{NetworkSummary, RoadNetwork};
pub use crate::objects::elevation::ElevationProfile;
pub use crate::objects::junction::{Connection, ConnectionID, Junction, JunctionID, LaneLink};
pub use crate::objects::lane::{Lane, LaneSection, LaneSide, LaneType, RoadMark, RoadMarkType};
pub use crate::objects::road::{ContactPoint, Road, RoadEnd, RoadID, RoadLink};
pub use crate::objects::spline::{SegmentRef, Spline, SplineID};

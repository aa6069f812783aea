//! The algorithms behind the edit operators. Everything here works on a `RoadNetwork` in the
//! middle of a transaction, so it may leave things half-done on failure; the transaction undoes
//! it.

pub mod connections;
pub mod divide;
pub mod intersections;
pub mod junctions;
pub mod segment_map;

//! Small helpers shared by the other crates: logging setup and JSON I/O.

#[macro_use]
extern crate log;

mod io;
pub mod logger;

pub use crate::io::{deserialize_btreemap, read_json, serialize_btreemap, to_json, write_json};

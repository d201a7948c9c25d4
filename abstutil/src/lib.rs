//! Small utilities shared by every crate in the workspace: a tag map, a counter, JSON IO,
//! a hierarchical timer, and logging setup.

#[macro_use]
extern crate log;

mod collections;
mod io;
pub mod logger;
mod tags;
mod time;
mod utils;

pub use crate::collections::Counter;
pub use crate::io::{
    deserialize_btreemap, read_json, serialize_btreemap, to_json, write_json,
};
pub use crate::tags::Tags;
pub use crate::time::Timer;
pub use crate::utils::{plain_list_names, prettyprint_usize};

const PROGRESS_FREQUENCY_SECONDS: f64 = 0.2;


pub mod timestamp;
pub mod types;

pub use timestamp::{TIMESTAMP_FORMAT, TIMESTAMP_PREFIX};
pub use types::*;

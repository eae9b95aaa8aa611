pub mod snapshot;

pub use snapshot::{read_json, write_json};

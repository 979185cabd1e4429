pub mod loader;
pub mod map;
pub mod schema;

pub use loader::{load_definitions, DataError};
pub use map::{parse_map, populate_world, MapParse, ProducerBindings};

pub mod config;
pub mod errors;
pub mod schema;
pub mod util;

pub use config::DynamoConfig;
pub use schema::{InfoValue, Movie, MovieKey};
pub use util::{BatchWriteReport, DynamoUtil};

// Extensions:
pub mod ext {
    pub mod partiql;
    pub mod sample_data;
}

pub mod anomaly;
pub mod cli;
pub mod config;
pub mod delay;
pub mod error;
pub mod filter;
pub mod flow;
pub mod model;
pub mod output;
pub mod queries;
pub mod schema;
pub mod store;
pub mod topology;

pub use anomaly::DataAnomaly;
pub use cli::{Cli, Commands};
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use model::Dataset;
pub use queries::{QueryId, QueryOutput, QueryParams};
pub use store::{Snapshot, Store};

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod migrator;
pub mod resolver;
pub mod stats;

pub use cache::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use gateway::*;
pub use migrator::*;
pub use resolver::*;
pub use stats::*;

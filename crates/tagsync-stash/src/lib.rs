pub mod catalog;
pub mod error;
pub mod graphql;
pub mod markers;
pub mod stashapp;
pub mod stashbox;

pub use catalog::*;
pub use error::*;
pub use graphql::*;
pub use markers::*;
pub use stashapp::*;
pub use stashbox::*;

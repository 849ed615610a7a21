pub mod builder;
pub mod error;
pub mod transcoder;

pub use builder::*;
pub use error::*;
pub use transcoder::*;

pub mod marker;
pub mod record;
pub mod tag;

pub use marker::*;
pub use record::*;
pub use tag::*;

use serde::{Deserialize, Deserializer};

/// Case-insensitive name comparison used everywhere tag names and aliases meet.
pub fn same_name(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Both taxonomies send `null` for an empty description.
pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

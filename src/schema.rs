use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

pub mod movie;
pub mod movie_key;
pub mod parsing;

pub const ATTR_YEAR: &str = "year";
pub const ATTR_TITLE: &str = "title";
pub const ATTR_INFO: &str = "info";

// Record stored in the movies table. The primary key is (year, title).
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Movie {
    pub title: String,
    pub year: i64,
    #[serde(default, deserialize_with = "null_as_empty_info")]
    pub info: HashMap<String, InfoValue>,
}

// Items written with a nil info map carry `info: NULL` instead of omitting it.
fn null_as_empty_info<'de, D>(deserializer: D) -> Result<HashMap<String, InfoValue>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HashMap<String, InfoValue>>::deserialize(deserializer)?.unwrap_or_default())
}

// Composite primary key: 'year' is the partition key, 'title' the sort key.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct MovieKey {
    pub year: i64,
    pub title: String,
}

/// Free-form value stored under a movie's `info` map.
///
/// Mirrors the schemaless item model of the store while keeping values
/// typed. Integers and floats stay distinct through a round trip: floats
/// are always written with a fractional part (`3.0`, not `3`).
///
/// Whole numbers outside the `i64` range don't fit `Integer` and are read
/// back as `Float`, losing precision past 2^53. A stored `NULL` (also what a
/// non-finite float is written as) reads back as `Null`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum InfoValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<InfoValue>),
    Map(HashMap<String, InfoValue>),
}

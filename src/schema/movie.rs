use std::{collections::HashMap, fmt};

use fractic_server_error::ServerError;

use crate::errors::DynamoInvalidKey;

use super::{InfoValue, Movie, MovieKey};

pub const INFO_RATING: &str = "rating";
pub const INFO_PLOT: &str = "plot";

impl Movie {
    pub fn new(title: impl Into<String>, year: i64, info: HashMap<String, InfoValue>) -> Self {
        Self {
            title: title.into(),
            year,
            info,
        }
    }

    /// Composite key of this record. Fails if the title is empty, since such
    /// an item can't be addressed in the table.
    pub fn key(&self) -> Result<MovieKey, ServerError> {
        if self.title.is_empty() {
            return Err(DynamoInvalidKey::new("movie title is empty"));
        }
        Ok(MovieKey {
            year: self.year,
            title: self.title.clone(),
        })
    }

    pub fn rating(&self) -> Option<&InfoValue> {
        self.info.get(INFO_RATING)
    }

    pub fn plot(&self) -> Option<&InfoValue> {
        self.info.get(INFO_PLOT)
    }
}

impl fmt::Display for InfoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfoValue::Null => write!(f, "<nil>"),
            InfoValue::Bool(b) => write!(f, "{b}"),
            InfoValue::Integer(i) => write!(f, "{i}"),
            InfoValue::Float(x) => write!(f, "{x}"),
            InfoValue::String(s) => write!(f, "{s}"),
            InfoValue::List(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            InfoValue::Map(map) => {
                // Sorted, so output doesn't depend on hash order.
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                write!(f, "map[")?;
                for (i, (key, value)) in entries.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{key}:{value}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl fmt::Display for Movie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let or_nil = |value: Option<&InfoValue>| match value {
            Some(value) => value.to_string(),
            None => "<nil>".to_string(),
        };
        writeln!(f, "{}", self.title)?;
        writeln!(f, "\tReleased: {}", self.year)?;
        writeln!(f, "\tRating: {}", or_nil(self.rating()))?;
        writeln!(f, "\tPlot: {}", or_nil(self.plot()))
    }
}

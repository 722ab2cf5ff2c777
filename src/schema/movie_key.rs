use std::fmt;

use aws_sdk_dynamodb::types::AttributeValue;
use fractic_core::collection;
use fractic_server_error::ServerError;

use crate::{errors::DynamoInvalidKey, util::DynamoMap};

use super::{MovieKey, ATTR_TITLE, ATTR_YEAR};

impl MovieKey {
    pub fn new(year: i64, title: impl Into<String>) -> Result<Self, ServerError> {
        let title = title.into();
        if title.is_empty() {
            return Err(DynamoInvalidKey::new("movie title is empty"));
        }
        Ok(Self { year, title })
    }

    pub fn to_dynamo_map(&self) -> DynamoMap {
        collection! {
            ATTR_YEAR.to_string() => AttributeValue::N(self.year.to_string()),
            ATTR_TITLE.to_string() => AttributeValue::S(self.title.clone()),
        }
    }
}

impl fmt::Display for MovieKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}|{}", self.year, self.title)
    }
}

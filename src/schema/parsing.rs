use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use fractic_server_error::ServerError;
use serde::{de::DeserializeOwned, Serialize};

use crate::{errors::DynamoItemParsingError, util::DynamoMap};

// Converting between DynamoMap and serializable records.
// --------------------------------------------------

pub fn build_dynamo_map<T: Serialize>(object: &T) -> Result<DynamoMap, ServerError> {
    // Record -> Serde value.
    let json_value = serde_json::to_value(object)
        .map_err(|e| DynamoItemParsingError::new(&format!("failed to serialize object: {e}")))?;

    // Serde value -> DynamoMap.
    match serde_value_to_attribute_value(json_value)? {
        AttributeValue::M(map) => Ok(map),
        unsupported => Err(DynamoItemParsingError::new(&format!(
            "can't build DynamoMap from non-object value: {:?}",
            unsupported
        ))),
    }
}

pub fn parse_dynamo_map<T: DeserializeOwned>(map: &DynamoMap) -> Result<T, ServerError> {
    // DynamoMap -> Serde value.
    let mut serde_map: serde_json::Map<String, serde_json::Value> = serde_json::Map::new();
    for (key, value) in map.iter() {
        serde_map.insert(key.clone(), attribute_value_to_serde_value(value.clone())?);
    }

    // Serde value -> record.
    serde_json::from_value(serde_json::Value::Object(serde_map)).map_err(|e| {
        DynamoItemParsingError::new(&format!("failed to convert from Serde value: {e}"))
    })
}

/// Marshals a single value, e.g. a positional statement parameter.
pub fn build_attribute_value<T: Serialize + ?Sized>(
    value: &T,
) -> Result<AttributeValue, ServerError> {
    let json_value = serde_json::to_value(value)
        .map_err(|e| DynamoItemParsingError::new(&format!("failed to serialize value: {e}")))?;
    serde_value_to_attribute_value(json_value)
}

// Inner recursive functions.
// --------------------------------------------------

fn serde_value_to_attribute_value(value: serde_json::Value) -> Result<AttributeValue, ServerError> {
    match value {
        serde_json::Value::Null => Ok(AttributeValue::Null(true)),
        serde_json::Value::Bool(b) => Ok(AttributeValue::Bool(b)),
        serde_json::Value::String(s) => Ok(AttributeValue::S(s)),
        serde_json::Value::Number(n) => Ok(AttributeValue::N(n.to_string())),
        serde_json::Value::Object(map) => {
            let mut attribute_map: HashMap<String, AttributeValue> = HashMap::new();
            for (key, value) in map.into_iter() {
                attribute_map.insert(key, serde_value_to_attribute_value(value)?);
            }
            Ok(AttributeValue::M(attribute_map)) // DynamoDB M type is for Map
        }
        serde_json::Value::Array(array) => {
            let mut attribute_array: Vec<AttributeValue> = Vec::new();
            for value in array.into_iter() {
                attribute_array.push(serde_value_to_attribute_value(value)?);
            }
            Ok(AttributeValue::L(attribute_array)) // DynamoDB L type is for List
        }
    }
}

fn attribute_value_to_serde_value(value: AttributeValue) -> Result<serde_json::Value, ServerError> {
    match value {
        AttributeValue::Null(_) => Ok(serde_json::Value::Null),
        AttributeValue::Bool(b) => Ok(serde_json::Value::Bool(b)),
        AttributeValue::S(s) => Ok(serde_json::Value::String(s)),
        AttributeValue::N(n) => Ok(serde_json::Value::Number(n.parse().map_err(|e| {
            DynamoItemParsingError::new(&format!("failed to parse number '{n}': {e}"))
        })?)),
        AttributeValue::M(map) => {
            let mut serde_map: serde_json::Map<String, serde_json::Value> = serde_json::Map::new();
            for (key, value) in map.into_iter() {
                serde_map.insert(key, attribute_value_to_serde_value(value)?);
            }
            Ok(serde_json::Value::Object(serde_map))
        }
        AttributeValue::L(array) => {
            let mut serde_array: Vec<serde_json::Value> = Vec::new();
            for value in array.into_iter() {
                serde_array.push(attribute_value_to_serde_value(value)?);
            }
            Ok(serde_json::Value::Array(serde_array))
        }
        unsupported => Err(DynamoItemParsingError::new(&format!(
            "unsupported AttributeValue type: {:?}",
            unsupported
        ))),
    }
}

// Tests.
// --------------------------------------------------

//! Response normalization.
//!
//! # Design
//! A server may answer with the domain data directly or wrapped in an
//! envelope `{"data": ...}`; `unwrap_envelope` makes both look the same. What
//! the data becomes afterwards is decided by a `ResponseShape`, chosen when
//! the client is built, so the record and collection types are known at
//! compile time:
//!
//! - `Generic` keeps JSON objects as `Record` maps.
//! - `Typed<R>` deserializes every record into `R`.
//! - `TypedCollection<R, C>` additionally deserializes whole arrays into `C`.

use std::marker::PhantomData;
use std::ops::Deref;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Name of the envelope field holding the domain data.
pub const ENVELOPE_FIELD: &str = "data";

/// Returns the envelope's `data` field if it holds a truthy value, else
/// `value` untouched.
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get(ENVELOPE_FIELD).is_some_and(is_truthy) => {
            map.remove(ENVELOPE_FIELD).unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// `null`, `false`, zero and `""` are falsy; arrays and objects never are.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Turns unwrapped payloads into the caller's record and collection types.
pub trait ResponseShape: Send + Sync {
    type Record: Send;
    type Collection: Send;

    fn record(&self, value: Value) -> Result<Self::Record, ApiError>;

    fn collection(&self, items: Vec<Value>) -> Result<Self::Collection, ApiError>;
}

/// A JSON object with its keys kept in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl Deref for Record {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<Value> for Record {
    type Error = ApiError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Record(map)),
            other => Err(ApiError::Deserialization(format!(
                "expected a JSON object, found {}",
                kind(&other)
            ))),
        }
    }
}

/// Default shape: `Record` and `Vec<Record>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Generic;

impl ResponseShape for Generic {
    type Record = Record;
    type Collection = Vec<Record>;

    fn record(&self, value: Value) -> Result<Record, ApiError> {
        Record::try_from(value)
    }

    fn collection(&self, items: Vec<Value>) -> Result<Vec<Record>, ApiError> {
        items.into_iter().map(Record::try_from).collect()
    }
}

/// Deserializes each record into `R`; collections are `Vec<R>`.
pub struct Typed<R>(PhantomData<fn() -> R>);

impl<R> Typed<R> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<R> Default for Typed<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: DeserializeOwned + Send> ResponseShape for Typed<R> {
    type Record = R;
    type Collection = Vec<R>;

    fn record(&self, value: Value) -> Result<R, ApiError> {
        from_value(value)
    }

    fn collection(&self, items: Vec<Value>) -> Result<Vec<R>, ApiError> {
        items.into_iter().map(from_value).collect()
    }
}

/// Deserializes records into `R` and whole arrays directly into `C`.
pub struct TypedCollection<R, C>(PhantomData<fn() -> (R, C)>);

impl<R, C> TypedCollection<R, C> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<R, C> Default for TypedCollection<R, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, C> ResponseShape for TypedCollection<R, C>
where
    R: DeserializeOwned + Send,
    C: DeserializeOwned + Send,
{
    type Record = R;
    type Collection = C;

    fn record(&self, value: Value) -> Result<R, ApiError> {
        from_value(value)
    }

    fn collection(&self, items: Vec<Value>) -> Result<C, ApiError> {
        from_value(Value::Array(items))
    }
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Deserialization(e.to_string()))
}

pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Backend-specific address of a stored blob.
///
/// Opaque to everything except the backend that produced it. It is always a
/// JSON object so it can be persisted verbatim next to the file record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(Map<String, Value>);

/// A typed locator could not be converted to or from its JSON form.
#[derive(Debug, thiserror::Error)]
pub enum LocatorError {
    #[error("locator must be a JSON object")]
    NotAnObject,

    #[error("locator does not match the expected shape: {0}")]
    Shape(#[from] serde_json::Error),
}

impl Locator {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build from a backend's typed locator.
    pub fn from_typed<T: Serialize>(value: &T) -> Result<Self, LocatorError> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(LocatorError::NotAnObject),
        }
    }

    /// Read back a backend's typed locator.
    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T, LocatorError> {
        Ok(serde_json::from_value(Value::Object(self.0.clone()))?)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl TryFrom<Value> for Locator {
    type Error = LocatorError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(LocatorError::NotAnObject),
        }
    }
}

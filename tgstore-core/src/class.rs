use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of storage backend.
///
/// The wire names are the historical ones (`bot` / `user`) so rows written
/// by older deployments keep deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BackendClass {
    /// Bot-style accounts: high volume, size-limited uploads.
    #[serde(rename = "bot")]
    Primary,
    /// User-style accounts: no declared upload ceiling.
    #[serde(rename = "user")]
    Secondary,
}

impl BackendClass {
    /// Order in which classes are tried, for uploads and for locator probing.
    pub const UPLOAD_ORDER: [BackendClass; 2] = [BackendClass::Primary, BackendClass::Secondary];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendClass::Primary => "bot",
            BackendClass::Secondary => "user",
        }
    }
}

impl fmt::Display for BackendClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored backend name is not a known class.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown backend class: {0}")]
pub struct UnknownBackendClass(pub String);

impl FromStr for BackendClass {
    type Err = UnknownBackendClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bot" => Ok(BackendClass::Primary),
            "user" => Ok(BackendClass::Secondary),
            other => Err(UnknownBackendClass(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip() {
        for class in BackendClass::UPLOAD_ORDER {
            assert_eq!(class.as_str().parse::<BackendClass>(), Ok(class));
            assert_eq!(
                serde_json::to_value(class).unwrap(),
                serde_json::Value::String(class.to_string())
            );
        }
    }

    #[test]
    fn primary_is_tried_first() {
        assert_eq!(BackendClass::UPLOAD_ORDER[0], BackendClass::Primary);
        assert!("telethon".parse::<BackendClass>().is_err());
    }
}

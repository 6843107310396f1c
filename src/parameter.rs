//! Typed component parameters.
//!
//! A parameter declares its type once; every later assignment is checked
//! against that type and rejected if the text does not parse. Values are
//! kept in typed form and rendered back to canonical text for the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::GraphError;

/// The declared type of a parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    /// Free-form text
    String,
    /// Unsigned integer
    UInt,
    /// `true` or `false`
    Boolean,
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterType::String => f.write_str("STRING"),
            ParameterType::UInt => f.write_str("UINT"),
            ParameterType::Boolean => f.write_str("BOOLEAN"),
        }
    }
}

/// A parameter value that already matches its declared type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Boolean(bool),
    UInt(u64),
    String(String),
}

impl ParameterValue {
    /// Parses `text` as a value of type `ty`.
    ///
    /// Returns `None` when the text cannot be coerced. Booleans accept
    /// `true`/`false` in any letter case; unsigned integers reject signs,
    /// whitespace and anything that does not fit in `u64`.
    pub fn parse(ty: ParameterType, text: &str) -> Option<Self> {
        match ty {
            ParameterType::String => Some(ParameterValue::String(text.to_string())),
            ParameterType::UInt => {
                if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                text.parse().ok().map(ParameterValue::UInt)
            }
            ParameterType::Boolean => match text.to_ascii_lowercase().as_str() {
                "true" => Some(ParameterValue::Boolean(true)),
                "false" => Some(ParameterValue::Boolean(false)),
                _ => None,
            },
        }
    }

    /// Returns the type this value satisfies.
    pub fn parameter_type(&self) -> ParameterType {
        match self {
            ParameterValue::Boolean(_) => ParameterType::Boolean,
            ParameterValue::UInt(_) => ParameterType::UInt,
            ParameterValue::String(_) => ParameterType::String,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Boolean(v) => write!(f, "{}", v),
            ParameterValue::UInt(v) => write!(f, "{}", v),
            ParameterValue::String(v) => f.write_str(v),
        }
    }
}

/// A named, typed parameter of a component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Parameter {
    /// Parameter name, unique within its component
    pub name: String,
    #[serde(rename = "type")]
    ty: ParameterType,
    value: ParameterValue,
}

impl Parameter {
    /// Creates a parameter, checking the default value against `ty`.
    pub fn new(
        name: impl Into<String>,
        ty: ParameterType,
        default: impl AsRef<str>,
    ) -> Result<Self, GraphError> {
        let name = name.into();
        let value = coerce(&name, ty, default.as_ref())?;
        Ok(Self { name, ty, value })
    }

    /// Creates a `STRING` parameter. Never fails.
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ParameterType::String,
            value: ParameterValue::String(value.into()),
        }
    }

    /// Creates a `UINT` parameter.
    pub fn uint(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            ty: ParameterType::UInt,
            value: ParameterValue::UInt(value),
        }
    }

    /// Creates a `BOOLEAN` parameter.
    pub fn boolean(name: impl Into<String>, value: bool) -> Self {
        Self {
            name: name.into(),
            ty: ParameterType::Boolean,
            value: ParameterValue::Boolean(value),
        }
    }

    /// Assigns a new value from text.
    ///
    /// Fails with [`GraphError::TypeMismatch`] and keeps the previous value
    /// if `text` does not parse as the declared type.
    pub fn set(&mut self, text: impl AsRef<str>) -> Result<(), GraphError> {
        self.value = coerce(&self.name, self.ty, text.as_ref())?;
        Ok(())
    }

    /// Returns the declared type.
    pub fn parameter_type(&self) -> ParameterType {
        self.ty
    }

    /// Returns the typed value.
    pub fn value(&self) -> &ParameterValue {
        &self.value
    }

    /// Returns the canonical text form handed to the engine.
    pub fn text(&self) -> String {
        self.value.to_string()
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self.value {
            ParameterValue::UInt(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            ParameterValue::Boolean(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            ParameterValue::String(v) => Some(v),
            _ => None,
        }
    }
}

fn coerce(name: &str, ty: ParameterType, text: &str) -> Result<ParameterValue, GraphError> {
    ParameterValue::parse(ty, text).ok_or_else(|| GraphError::TypeMismatch {
        name: name.to_string(),
        expected: ty,
        value: text.to_string(),
    })
}

//! The ordered bag of answers collected before a run

use crate::error::ConfigError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Names of the options the engine itself reads
pub mod keys {
    pub const PROJECT_TYPE: &str = "projectType";
    pub const PROJECT_NAME: &str = "projectName";
    pub const PROJECT_DIR: &str = "projectDir";
    pub const REQUIRE_DB: &str = "requireDb";
    pub const CORE_DB_OBJECT: &str = "coreDbObject";
    pub const RUN_TERRAFORM: &str = "runTerraform";
}

/// A single typed answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    String(String),
}

impl ConfigValue {
    fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Bool(_) => "boolean",
            ConfigValue::String(_) => "string",
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

/// Answers keyed by option name, kept in the order they were given
///
/// The model is filled in before the engine runs and only read afterwards.
/// It serializes as a map in insertion order, which makes it usable directly
/// as the render context for templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigModel {
    entries: Vec<(String, ConfigValue)>,
}

impl ConfigModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an answer, replacing an existing one in place
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder-style [`ConfigModel::set`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// String answer, `None` when missing or not a string
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(ConfigValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Boolean answer; a missing answer reads as `false`
    pub fn get_bool(&self, key: &str) -> bool {
        matches!(self.get(key), Some(ConfigValue::Bool(true)))
    }

    /// Boolean answer that rejects a value of the wrong type
    pub fn try_bool(&self, key: &str) -> Result<bool, ConfigError> {
        match self.get(key) {
            None => Ok(false),
            Some(ConfigValue::Bool(b)) => Ok(*b),
            Some(_) => Err(ConfigError::WrongType {
                key: key.to_string(),
                expected: "boolean",
            }),
        }
    }

    /// Non-empty string answer or an error naming the option
    pub fn require_string(&self, key: &'static str) -> Result<&str, ConfigError> {
        match self.get(key) {
            None => Err(ConfigError::Missing(key)),
            Some(ConfigValue::String(s)) if s.trim().is_empty() => Err(ConfigError::Missing(key)),
            Some(ConfigValue::String(s)) => Ok(s.as_str()),
            Some(_) => Err(ConfigError::WrongType {
                key: key.to_string(),
                expected: "string",
            }),
        }
    }

    /// Option names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy every answer from `other` over this model
    pub fn merge(&mut self, other: ConfigModel) {
        for (key, value) in other.entries {
            self.set(key, value);
        }
    }

    /// Parse an answers file (a flat YAML mapping of strings and booleans)
    ///
    /// Numbers are accepted and kept as strings so that values such as a
    /// port or a version survive unchanged into the templates.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let mapping: serde_yaml::Mapping =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let mut model = ConfigModel::new();
        for (key, value) in mapping {
            let key = match key {
                serde_yaml::Value::String(s) => s,
                other => {
                    return Err(ConfigError::Parse(format!(
                        "option names must be strings, found {:?}",
                        other
                    )))
                }
            };
            let value = match value {
                serde_yaml::Value::Bool(b) => ConfigValue::Bool(b),
                serde_yaml::Value::String(s) => ConfigValue::String(s),
                serde_yaml::Value::Number(n) => ConfigValue::String(n.to_string()),
                _ => {
                    return Err(ConfigError::WrongType {
                        key,
                        expected: "string or boolean",
                    })
                }
            };
            model.set(key, value);
        }
        Ok(model)
    }

    /// Describe the type of an answer, for diagnostics
    pub fn type_of(&self, key: &str) -> Option<&'static str> {
        self.get(key).map(ConfigValue::type_name)
    }
}

impl Serialize for ConfigModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

//! Binding raw parameters to typed connector configuration
//!
//! Callers hand over a flat map of primitive values (typically strings coming
//! from a form or a YAML file). [`bind`] turns that map into the connector's
//! typed configuration, using the type's JSON schema to find required fields
//! and to coerce textual numbers and booleans.
//!
//! Binding problems are reported as [`VerificationError`]s, never as faults:
//! - absent or blank required field -> `MISSING_PARAMETER` (one per field)
//! - value that does not fit the field type -> `ILLEGAL_PARAMETER`

use super::result::VerificationError;
use schemars::schema::{InstanceType, ObjectValidation, Schema, SchemaObject, SingleOrVec};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;
use validator::Validate;

/// Trait for typed connector configuration
pub trait ConnectorConfig: DeserializeOwned + Validate + JsonSchema + Send + Sync {}

// Blanket implementation
impl<T> ConnectorConfig for T where T: DeserializeOwned + Validate + JsonSchema + Send + Sync {}

/// Raw request parameters, ordered by key
pub type Parameters = BTreeMap<String, ParameterValue>;

/// A primitive parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ParameterValue {
    /// True for strings that are empty or whitespace
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::String(s) if s.trim().is_empty())
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Integer(i) => Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::String(s) => Value::String(s.clone()),
        }
    }

    /// Convert to JSON, coercing between text and the field's schema types
    fn coerce(&self, types: &[InstanceType]) -> Value {
        if types.is_empty() {
            return self.to_json();
        }
        match self {
            Self::String(s) if !types.contains(&InstanceType::String) => {
                let text = s.trim();
                if types.contains(&InstanceType::Integer) {
                    if let Ok(i) = text.parse::<i64>() {
                        return Value::from(i);
                    }
                }
                if types.contains(&InstanceType::Number) {
                    if let Some(n) = text
                        .parse::<f64>()
                        .ok()
                        .and_then(serde_json::Number::from_f64)
                    {
                        return Value::Number(n);
                    }
                }
                if types.contains(&InstanceType::Boolean) {
                    if let Ok(b) = text.to_ascii_lowercase().parse::<bool>() {
                        return Value::Bool(b);
                    }
                }
                self.to_json()
            }
            Self::Bool(_) | Self::Integer(_) | Self::Float(_)
                if types.contains(&InstanceType::String)
                    && !types.contains(&InstanceType::Integer)
                    && !types.contains(&InstanceType::Number)
                    && !types.contains(&InstanceType::Boolean) =>
            {
                Value::String(self.to_string())
            }
            _ => self.to_json(),
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for ParameterValue {
    fn from(value: i32) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u16> for ParameterValue {
    fn from(value: u16) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Bind raw parameters to the typed configuration `C`.
///
/// Performs no I/O and no `validator` checks; structural validation belongs
/// to the PARAMETERS probe.
pub fn bind<C: ConnectorConfig>(parameters: &Parameters) -> Result<C, Vec<VerificationError>> {
    let root = schemars::schema_for!(C);
    let object = root.schema.object.as_deref();

    let missing: Vec<VerificationError> = object
        .map(|o| {
            o.required
                .iter()
                .filter(|field| parameters.get(*field).map_or(true, ParameterValue::is_blank))
                .map(VerificationError::missing_parameter)
                .collect()
        })
        .unwrap_or_default();
    if !missing.is_empty() {
        debug!(count = missing.len(), "required parameters missing");
        return Err(missing);
    }

    let map: serde_json::Map<String, Value> = parameters
        .iter()
        .map(|(key, value)| (key.clone(), value.coerce(&property_types(object, key))))
        .collect();

    serde_json::from_value::<C>(Value::Object(map)).map_err(|e| {
        debug!(error = %e, "parameters do not fit the configuration type");
        vec![VerificationError::new(
            super::result::StandardCode::IllegalParameter,
            format!("Invalid configuration: {}", e),
        )]
    })
}

/// Map `validator` failures to `ILLEGAL_PARAMETER` errors, one per field,
/// ordered by parameter name.
pub fn validation_errors<C: Validate>(config: &C) -> Vec<VerificationError> {
    let Err(errors) = config.validate() else {
        return Vec::new();
    };

    let mut by_field: BTreeMap<String, String> = BTreeMap::new();
    for (field, field_errors) in errors.field_errors() {
        let parameter = camel_case(&field.to_string());
        let message = field_errors
            .first()
            .map(|e| match &e.message {
                Some(msg) => msg.to_string(),
                None => format!("Invalid value for parameter '{}' ({})", parameter, e.code),
            })
            .unwrap_or_else(|| format!("Invalid value for parameter '{}'", parameter));
        by_field.insert(parameter, message);
    }

    by_field
        .into_iter()
        .map(|(parameter, message)| VerificationError::illegal_parameter(parameter, message))
        .collect()
}

fn property_types(object: Option<&ObjectValidation>, key: &str) -> Vec<InstanceType> {
    let Some(Schema::Object(SchemaObject {
        instance_type: Some(types),
        ..
    })) = object.and_then(|o| o.properties.get(key))
    else {
        return Vec::new();
    };
    match types {
        SingleOrVec::Single(t) => vec![t.as_ref().clone()],
        SingleOrVec::Vec(ts) => ts.clone(),
    }
}

/// `stream_name` -> `streamName`; already camel-cased names pass through
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::result::{detail_keys, StandardCode};
    use crate::types::Credential;

    #[derive(Debug, Deserialize, Validate, JsonSchema)]
    #[serde(rename_all = "camelCase")]
    struct SampleConfig {
        #[validate(length(min = 3))]
        host_name: String,
        #[serde(default = "default_port")]
        #[validate(range(min = 1))]
        port: u16,
        password: Credential,
        #[serde(default)]
        tls: bool,
        table: Option<String>,
    }

    fn default_port() -> u16 {
        5432
    }

    fn params(pairs: &[(&str, ParameterValue)]) -> Parameters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_bind_minimal() {
        let config: SampleConfig = bind(&params(&[
            ("hostName", "db.local".into()),
            ("password", "secret".into()),
        ]))
        .unwrap();
        assert_eq!(config.host_name, "db.local");
        assert_eq!(config.port, 5432);
        assert!(!config.tls);
        assert!(config.table.is_none());
    }

    #[test]
    fn test_bind_coerces_text() {
        let config: SampleConfig = bind(&params(&[
            ("hostName", "db.local".into()),
            ("password", 1234.into()),
            ("port", "6543".into()),
            ("tls", "TRUE".into()),
        ]))
        .unwrap();
        assert_eq!(config.port, 6543);
        assert!(config.tls);
        assert_eq!(config.password.expose(), "1234");
    }

    #[test]
    fn test_bind_reports_each_missing_field() {
        let errors = bind::<SampleConfig>(&params(&[("password", " ".into())])).unwrap_err();
        let missing: Vec<_> = errors
            .iter()
            .map(|e| e.detail(detail_keys::PARAMETER).unwrap().to_string())
            .collect();
        assert_eq!(missing, vec!["hostName", "password"]);
        assert!(errors
            .iter()
            .all(|e| e.code() == StandardCode::MissingParameter));
    }

    #[test]
    fn test_bind_wrong_type_is_illegal() {
        let errors = bind::<SampleConfig>(&params(&[
            ("hostName", "db.local".into()),
            ("password", "secret".into()),
            ("port", "not-a-port".into()),
        ]))
        .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), StandardCode::IllegalParameter);
    }

    #[test]
    fn test_bind_ignores_unknown_keys() {
        let config: SampleConfig = bind(&params(&[
            ("hostName", "db.local".into()),
            ("password", "secret".into()),
            ("somethingElse", true.into()),
        ]))
        .unwrap();
        assert_eq!(config.host_name, "db.local");
    }

    #[test]
    fn test_validation_errors_use_parameter_names() {
        let config: SampleConfig = bind(&params(&[
            ("hostName", "db".into()),
            ("password", "secret".into()),
            ("port", 0.into()),
        ]))
        .unwrap();
        let errors = validation_errors(&config);
        let fields: Vec<_> = errors
            .iter()
            .map(|e| e.detail(detail_keys::PARAMETER).unwrap())
            .collect();
        assert_eq!(fields, vec!["hostName", "port"]);
        assert!(errors
            .iter()
            .all(|e| e.code() == StandardCode::IllegalParameter));
    }

    #[test]
    fn test_parameter_value_untagged() {
        let parsed: Parameters =
            serde_yaml::from_str("port: 9092\nname: orders\nratio: 0.5\nenabled: true").unwrap();
        assert_eq!(parsed["port"], ParameterValue::Integer(9092));
        assert_eq!(parsed["name"], ParameterValue::String("orders".into()));
        assert_eq!(parsed["ratio"], ParameterValue::Float(0.5));
        assert_eq!(parsed["enabled"], ParameterValue::Bool(true));
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("stream_name"), "streamName");
        assert_eq!(camel_case("streamName"), "streamName");
        assert_eq!(camel_case("region"), "region");
    }
}

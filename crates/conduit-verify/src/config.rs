//! Configuration types for conduit-verify
//!
//! Two YAML documents are understood:
//! - [`VerifierSettings`] - process-wide knobs (connectivity timeout)
//! - [`RequestFile`] - one verification request (connector, scopes, parameters)
//!
//! Both support `${VAR}` and `${VAR:-default}` environment expansion so that
//! credentials can stay out of the files themselves.

use crate::error::{Result, VerifyError};
use crate::traits::binder::Parameters;
use crate::traits::registry::VerificationRequest;
use crate::traits::result::Scope;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

/// Pre-compiled regex for environment variable expansion
/// Pattern: ${VAR} or ${VAR:-default}
static ENV_VAR_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("env var regex pattern is invalid - this is a bug")
});

/// Upper bound accepted for the connectivity timeout (10 minutes)
pub(crate) const MAX_CONNECTIVITY_TIMEOUT_MS: u64 = 600_000;

/// Settings shared by every verification call
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VerifierSettings {
    /// Bound for CONNECTIVITY probes without a connector-specific timeout
    #[serde(default = "default_connectivity_timeout_ms")]
    pub connectivity_timeout_ms: u64,
}

fn default_connectivity_timeout_ms() -> u64 {
    30_000
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            connectivity_timeout_ms: default_connectivity_timeout_ms(),
        }
    }
}

impl VerifierSettings {
    /// Load settings from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let settings: Self = load_yaml(path.as_ref())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn connectivity_timeout(&self) -> Duration {
        Duration::from_millis(self.connectivity_timeout_ms)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.connectivity_timeout_ms == 0 {
            return Err(VerifyError::config(
                "connectivity_timeout_ms must be greater than zero",
            ));
        }
        if self.connectivity_timeout_ms > MAX_CONNECTIVITY_TIMEOUT_MS {
            return Err(VerifyError::config(format!(
                "connectivity_timeout_ms must not exceed {}",
                MAX_CONNECTIVITY_TIMEOUT_MS
            )));
        }
        Ok(())
    }
}

/// A verification request stored as YAML
///
/// ```yaml
/// connector: aws-kinesis
/// scopes: [PARAMETERS, CONNECTIVITY]
/// parameters:
///   accessKey: ${AWS_ACCESS_KEY_ID}
///   secretKey: ${AWS_SECRET_ACCESS_KEY}
///   region: ${AWS_REGION:-us-east-1}
///   streamName: orders
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RequestFile {
    /// Connector type identifier
    pub connector: String,

    /// Requested scopes; empty means all
    #[serde(default)]
    pub scopes: Vec<Scope>,

    /// Raw connector parameters
    #[serde(default)]
    pub parameters: Parameters,
}

impl RequestFile {
    /// Load a request from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let request: Self = load_yaml(path.as_ref())?;
        request.validate()?;
        Ok(request)
    }

    /// Parse a request from YAML text, expanding environment variables
    pub fn from_yaml(content: &str) -> Result<Self> {
        let request: Self = serde_yaml::from_str(&expand_env_vars(content))?;
        request.validate()?;
        Ok(request)
    }

    /// Validate request
    pub fn validate(&self) -> Result<()> {
        if self.connector.trim().is_empty() {
            return Err(VerifyError::config("'connector' must not be empty"));
        }
        Ok(())
    }

    pub fn into_request(self) -> VerificationRequest {
        VerificationRequest::new(self.connector)
            .scopes(self.scopes)
            .parameters(self.parameters)
    }
}

fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        VerifyError::config(format!("Failed to read {}: {}", path.display(), e))
    })?;
    Ok(serde_yaml::from_str(&expand_env_vars(&content))?)
}

/// Expand environment variables in the format ${VAR} or ${VAR:-default}
pub fn expand_env_vars(content: &str) -> String {
    ENV_VAR_REGEX
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default = caps.get(2).map(|m| m.as_str());

            std::env::var(var_name).unwrap_or_else(|_| default.unwrap_or("").to_string())
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::binder::ParameterValue;
    use std::io::Write;

    #[test]
    fn test_env_var_expansion() {
        std::env::set_var("CONDUIT_TEST_VAR", "hello");
        let expanded = expand_env_vars("value: ${CONDUIT_TEST_VAR}");
        assert_eq!(expanded, "value: hello");
    }

    #[test]
    fn test_env_var_with_default() {
        std::env::remove_var("CONDUIT_MISSING_VAR");
        let expanded = expand_env_vars("value: ${CONDUIT_MISSING_VAR:-default_value}");
        assert_eq!(expanded, "value: default_value");
        assert_eq!(expand_env_vars("value: ${CONDUIT_MISSING_VAR}"), "value: ");
    }

    #[test]
    fn test_settings_defaults() {
        let settings: VerifierSettings = serde_yaml::from_str("{}").unwrap();
        assert_eq!(settings, VerifierSettings::default());
        assert_eq!(settings.connectivity_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_settings_validation() {
        let zero = VerifierSettings {
            connectivity_timeout_ms: 0,
        };
        assert!(zero.validate().is_err());
        let huge = VerifierSettings {
            connectivity_timeout_ms: MAX_CONNECTIVITY_TIMEOUT_MS + 1,
        };
        assert!(huge.validate().is_err());
        assert!(VerifierSettings::default().validate().is_ok());
    }

    #[test]
    fn test_settings_from_file() {
        let path = std::env::temp_dir().join(format!(
            "conduit-verify-settings-{}.yaml",
            uuid::Uuid::new_v4()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "connectivity_timeout_ms: ${{CONDUIT_TEST_TIMEOUT:-5000}}").unwrap();
        drop(file);

        let settings = VerifierSettings::from_file(&path).unwrap();
        assert_eq!(settings.connectivity_timeout_ms, 5000);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = VerifierSettings::from_file("/nonexistent/conduit.yaml").unwrap_err();
        assert!(matches!(err, VerifyError::Config(_)));
    }

    #[test]
    fn test_parse_request() {
        std::env::set_var("CONDUIT_TEST_SECRET", "s3cr3t");
        let yaml = r#"
connector: aws-kinesis
scopes: [CONNECTIVITY]
parameters:
  accessKey: AKIAEXAMPLE
  secretKey: ${CONDUIT_TEST_SECRET}
  region: us-east-1
  streamName: orders
"#;
        let request = RequestFile::from_yaml(yaml).unwrap();
        assert_eq!(request.connector, "aws-kinesis");
        assert_eq!(request.scopes, vec![Scope::Connectivity]);
        assert_eq!(
            request.parameters["secretKey"],
            ParameterValue::String("s3cr3t".into())
        );

        let request = request.into_request();
        assert_eq!(request.connector_type, "aws-kinesis");
        assert!(request.scopes.contains(&Scope::Connectivity));
        assert_eq!(request.scopes.len(), 1);
    }

    #[test]
    fn test_request_requires_connector() {
        assert!(RequestFile::from_yaml("connector: ' '").is_err());
        assert!(RequestFile::from_yaml("parameters: {}").is_err());
    }
}

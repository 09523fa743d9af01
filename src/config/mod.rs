//! Configuration for temporary credential resolution.
//!
//! A [`TempCredentialsConfig`] names the account whose master credentials
//! are used, the optional role and MFA device, and the lifetimes requested
//! from STS. It is immutable once built.

use crate::error::ConfigurationError;
use crate::mfa::{MfaPrompt, TerminalPrompt};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default `GetSessionToken` lifetime.
pub const DEFAULT_SESSION_DURATION: Duration = Duration::from_secs(4 * 3600);
/// Shortest session STS will issue.
pub const MIN_SESSION_DURATION: Duration = Duration::from_secs(15 * 60);
/// Longest session STS will issue.
pub const MAX_SESSION_DURATION: Duration = Duration::from_secs(36 * 3600);

/// Default `AssumeRole` lifetime.
pub const DEFAULT_ASSUME_ROLE_DURATION: Duration = Duration::from_secs(15 * 60);
/// Shortest role session STS will issue.
pub const MIN_ASSUME_ROLE_DURATION: Duration = Duration::from_secs(15 * 60);
/// Longest role session STS will issue.
pub const MAX_ASSUME_ROLE_DURATION: Duration = Duration::from_secs(12 * 3600);

/// Default region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Profile used by `from_env` when `AWS_PROFILE` is unset.
pub const DEFAULT_CREDENTIALS_NAME: &str = "default";

/// Configuration for [`TempCredentialsProvider`](crate::TempCredentialsProvider).
#[derive(Clone)]
pub struct TempCredentialsConfig {
    credentials_name: String,
    role_arn: Option<String>,
    external_id: Option<String>,
    role_session_name: Option<String>,
    mfa_serial: Option<String>,
    mfa_token: Option<String>,
    mfa_prompt: Arc<dyn MfaPrompt>,
    no_session: bool,
    session_duration: Duration,
    assume_role_duration: Duration,
    region: String,
}

impl TempCredentialsConfig {
    /// Create a builder for the account identity `credentials_name`.
    ///
    /// # Example
    ///
    /// ```
    /// use aws_tempcreds::TempCredentialsConfig;
    ///
    /// let config = TempCredentialsConfig::builder("prod")
    ///     .role_arn("arn:aws:iam::123456789012:role/admin")
    ///     .mfa_serial("arn:aws:iam::123456789012:mfa/alice")
    ///     .build()
    ///     .unwrap();
    /// assert!(config.has_role());
    /// ```
    pub fn builder(credentials_name: impl Into<String>) -> TempCredentialsConfigBuilder {
        TempCredentialsConfigBuilder::new(credentials_name)
    }

    /// Load configuration from `AWS_*` environment variables.
    ///
    /// Reads `AWS_PROFILE`, `AWS_REGION` (or `AWS_DEFAULT_REGION`),
    /// `AWS_ROLE_ARN`, `AWS_ROLE_SESSION_NAME`, `AWS_EXTERNAL_ID`,
    /// `AWS_MFA_SERIAL`, `AWS_MFA_TOKEN`, `AWS_NO_SESSION`,
    /// `AWS_SESSION_TTL` and `AWS_ASSUME_ROLE_TTL`. Empty values count as
    /// unset.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials_name =
            lookup("AWS_PROFILE").unwrap_or_else(|| DEFAULT_CREDENTIALS_NAME.to_string());
        let mut builder = Self::builder(credentials_name);

        if let Some(region) = lookup("AWS_REGION").or_else(|| lookup("AWS_DEFAULT_REGION")) {
            builder = builder.region(region);
        }
        if let Some(role_arn) = lookup("AWS_ROLE_ARN") {
            builder = builder.role_arn(role_arn);
        }
        if let Some(name) = lookup("AWS_ROLE_SESSION_NAME") {
            builder = builder.role_session_name(name);
        }
        if let Some(external_id) = lookup("AWS_EXTERNAL_ID") {
            builder = builder.external_id(external_id);
        }
        if let Some(serial) = lookup("AWS_MFA_SERIAL") {
            builder = builder.mfa_serial(serial);
        }
        if let Some(token) = lookup("AWS_MFA_TOKEN") {
            builder = builder.mfa_token(token);
        }
        if let Some(flag) = lookup("AWS_NO_SESSION") {
            builder = builder.no_session(parse_bool("AWS_NO_SESSION", &flag)?);
        }
        if let Some(ttl) = lookup("AWS_SESSION_TTL") {
            builder = builder.session_duration(parse_duration("AWS_SESSION_TTL", &ttl)?);
        }
        if let Some(ttl) = lookup("AWS_ASSUME_ROLE_TTL") {
            builder = builder.assume_role_duration(parse_duration("AWS_ASSUME_ROLE_TTL", &ttl)?);
        }

        builder.build()
    }

    /// Check field constraints and combinations.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.credentials_name.is_empty() {
            return Err(ConfigurationError::MissingField {
                field: "credentials_name".to_string(),
            });
        }
        if self.region.is_empty() {
            return Err(ConfigurationError::MissingField {
                field: "region".to_string(),
            });
        }

        check_duration(
            "session_duration",
            self.session_duration,
            MIN_SESSION_DURATION,
            MAX_SESSION_DURATION,
        )?;
        check_duration(
            "assume_role_duration",
            self.assume_role_duration,
            MIN_ASSUME_ROLE_DURATION,
            MAX_ASSUME_ROLE_DURATION,
        )?;

        if self.mfa_token.is_some() && self.mfa_serial.is_none() {
            return Err(invalid("mfa_token", "an MFA token requires mfa_serial"));
        }
        if self.role_arn.is_none() {
            if self.external_id.is_some() {
                return Err(invalid("external_id", "an external ID requires role_arn"));
            }
            if self.role_session_name.is_some() {
                return Err(invalid(
                    "role_session_name",
                    "a role session name requires role_arn",
                ));
            }
        }
        if let Some(name) = &self.role_session_name {
            validate_role_session_name(name)?;
        }

        Ok(())
    }

    /// Account identity whose master credentials are used.
    pub fn credentials_name(&self) -> &str {
        &self.credentials_name
    }

    /// Role to assume, if any.
    pub fn role_arn(&self) -> Option<&str> {
        self.role_arn.as_deref()
    }

    /// Returns true if a non-empty role was configured.
    pub fn has_role(&self) -> bool {
        self.role_arn.as_deref().map_or(false, |role| !role.is_empty())
    }

    /// External ID for the role's trust policy.
    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    /// Explicit role session name.
    pub fn role_session_name(&self) -> Option<&str> {
        self.role_session_name.as_deref()
    }

    /// MFA device serial.
    pub fn mfa_serial(&self) -> Option<&str> {
        self.mfa_serial.as_deref()
    }

    /// Pre-supplied MFA code.
    pub fn mfa_token(&self) -> Option<&str> {
        self.mfa_token.as_deref()
    }

    /// Prompt used when no literal MFA code is configured.
    pub fn mfa_prompt(&self) -> &dyn MfaPrompt {
        self.mfa_prompt.as_ref()
    }

    /// Skip the session step and use master credentials directly.
    pub fn no_session(&self) -> bool {
        self.no_session
    }

    /// Requested `GetSessionToken` lifetime.
    pub fn session_duration(&self) -> Duration {
        self.session_duration
    }

    /// Requested `AssumeRole` lifetime.
    pub fn assume_role_duration(&self) -> Duration {
        self.assume_role_duration
    }

    /// STS region.
    pub fn region(&self) -> &str {
        &self.region
    }
}

impl fmt::Debug for TempCredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TempCredentialsConfig")
            .field("credentials_name", &self.credentials_name)
            .field("role_arn", &self.role_arn)
            .field("external_id", &self.external_id)
            .field("role_session_name", &self.role_session_name)
            .field("mfa_serial", &self.mfa_serial)
            .field("mfa_token", &self.mfa_token.as_ref().map(|_| "[REDACTED]"))
            .field("no_session", &self.no_session)
            .field("session_duration", &self.session_duration)
            .field("assume_role_duration", &self.assume_role_duration)
            .field("region", &self.region)
            .finish()
    }
}

/// Builder for [`TempCredentialsConfig`].
pub struct TempCredentialsConfigBuilder {
    credentials_name: String,
    role_arn: Option<String>,
    external_id: Option<String>,
    role_session_name: Option<String>,
    mfa_serial: Option<String>,
    mfa_token: Option<String>,
    mfa_prompt: Option<Arc<dyn MfaPrompt>>,
    no_session: bool,
    session_duration: Option<Duration>,
    assume_role_duration: Option<Duration>,
    region: Option<String>,
}

impl TempCredentialsConfigBuilder {
    fn new(credentials_name: impl Into<String>) -> Self {
        Self {
            credentials_name: credentials_name.into(),
            role_arn: None,
            external_id: None,
            role_session_name: None,
            mfa_serial: None,
            mfa_token: None,
            mfa_prompt: None,
            no_session: false,
            session_duration: None,
            assume_role_duration: None,
            region: None,
        }
    }

    /// Role to assume. An empty string means no role.
    pub fn role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.role_arn = non_empty(role_arn.into());
        self
    }

    /// External ID for the role's trust policy.
    pub fn external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = non_empty(external_id.into());
        self
    }

    /// Explicit role session name.
    pub fn role_session_name(mut self, name: impl Into<String>) -> Self {
        self.role_session_name = non_empty(name.into());
        self
    }

    /// MFA device serial.
    pub fn mfa_serial(mut self, serial: impl Into<String>) -> Self {
        self.mfa_serial = non_empty(serial.into());
        self
    }

    /// Literal MFA code; the prompt is not used when set.
    pub fn mfa_token(mut self, token: impl Into<String>) -> Self {
        self.mfa_token = non_empty(token.into());
        self
    }

    /// Prompt for MFA codes. Defaults to [`TerminalPrompt`].
    pub fn mfa_prompt(mut self, prompt: Arc<dyn MfaPrompt>) -> Self {
        self.mfa_prompt = Some(prompt);
        self
    }

    /// Use master credentials directly instead of a session.
    pub fn no_session(mut self, no_session: bool) -> Self {
        self.no_session = no_session;
        self
    }

    /// `GetSessionToken` lifetime.
    pub fn session_duration(mut self, duration: Duration) -> Self {
        self.session_duration = Some(duration);
        self
    }

    /// `AssumeRole` lifetime.
    pub fn assume_role_duration(mut self, duration: Duration) -> Self {
        self.assume_role_duration = Some(duration);
        self
    }

    /// STS region.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<TempCredentialsConfig, ConfigurationError> {
        let config = TempCredentialsConfig {
            credentials_name: self.credentials_name,
            role_arn: self.role_arn,
            external_id: self.external_id,
            role_session_name: self.role_session_name,
            mfa_serial: self.mfa_serial,
            mfa_token: self.mfa_token,
            mfa_prompt: self.mfa_prompt.unwrap_or_else(|| Arc::new(TerminalPrompt)),
            no_session: self.no_session,
            session_duration: self.session_duration.unwrap_or(DEFAULT_SESSION_DURATION),
            assume_role_duration: self
                .assume_role_duration
                .unwrap_or(DEFAULT_ASSUME_ROLE_DURATION),
            region: self.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
        };
        config.validate()?;
        Ok(config)
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn invalid(field: &str, message: &str) -> ConfigurationError {
    ConfigurationError::Invalid {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn check_duration(
    field: &str,
    value: Duration,
    min: Duration,
    max: Duration,
) -> Result<(), ConfigurationError> {
    if value < min || value > max {
        return Err(ConfigurationError::InvalidDuration {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn validate_role_session_name(name: &str) -> Result<(), ConfigurationError> {
    let len = name.chars().count();
    if !(2..=64).contains(&len) {
        return Err(invalid(
            "role_session_name",
            "must be between 2 and 64 characters",
        ));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || "_+=,.@-".contains(c);
    if !name.chars().all(allowed) {
        return Err(invalid(
            "role_session_name",
            "may only contain alphanumerics and _+=,.@-",
        ));
    }
    Ok(())
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigurationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        _ => Err(invalid(field, &format!("invalid boolean '{}'", value))),
    }
}

/// Parse a humanized duration such as `4h`, `90m`, `1h30m` or `3600`.
///
/// A bare number is seconds.
pub fn parse_duration(field: &str, value: &str) -> Result<Duration, ConfigurationError> {
    let value = value.trim();
    let bad = || invalid(field, &format!("invalid duration '{}'", value));

    if value.is_empty() {
        return Err(bad());
    }
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = 0u64;
    let mut digits = String::new();
    for c in value.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let multiplier = match c {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            'd' => 86_400,
            _ => return Err(bad()),
        };
        let amount: u64 = digits.parse().map_err(|_| bad())?;
        total = amount
            .checked_mul(multiplier)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(bad)?;
        digits.clear();
    }
    if !digits.is_empty() {
        return Err(bad());
    }

    Ok(Duration::from_secs(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_builder_defaults() {
        let config = TempCredentialsConfig::builder("prod").build().unwrap();
        assert_eq!(config.credentials_name(), "prod");
        assert_eq!(config.session_duration(), DEFAULT_SESSION_DURATION);
        assert_eq!(config.assume_role_duration(), DEFAULT_ASSUME_ROLE_DURATION);
        assert_eq!(config.region(), "us-east-1");
        assert!(!config.has_role());
        assert!(!config.no_session());
    }

    #[test]
    fn test_empty_optionals_normalized() {
        let config = TempCredentialsConfig::builder("prod")
            .mfa_serial("")
            .mfa_token("")
            .external_id("")
            .role_session_name("")
            .build()
            .unwrap();
        assert!(config.mfa_serial().is_none());
        assert!(config.mfa_token().is_none());
        assert!(config.external_id().is_none());
        assert!(config.role_session_name().is_none());
    }

    #[test]
    fn test_empty_role_means_no_role() {
        let config = TempCredentialsConfig::builder("prod")
            .role_arn("")
            .build()
            .unwrap();
        assert!(!config.has_role());
        assert!(config.role_arn().is_none());
    }

    #[test]
    fn test_missing_credentials_name() {
        let err = TempCredentialsConfig::builder("").build().unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingField { field } if field == "credentials_name"));
    }

    #[test]
    fn test_session_duration_bounds() {
        let err = TempCredentialsConfig::builder("prod")
            .session_duration(Duration::from_secs(60))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidDuration { .. }));

        let err = TempCredentialsConfig::builder("prod")
            .assume_role_duration(Duration::from_secs(13 * 3600))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidDuration { field, .. } if field == "assume_role_duration"));

        assert!(TempCredentialsConfig::builder("prod")
            .session_duration(MAX_SESSION_DURATION)
            .build()
            .is_ok());
    }

    #[test]
    fn test_token_requires_serial() {
        let err = TempCredentialsConfig::builder("prod")
            .mfa_token("123456")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::Invalid { field, .. } if field == "mfa_token"));
    }

    #[test]
    fn test_role_options_require_role() {
        assert!(TempCredentialsConfig::builder("prod")
            .external_id("ext")
            .build()
            .is_err());
        assert!(TempCredentialsConfig::builder("prod")
            .role_session_name("ops")
            .build()
            .is_err());
    }

    #[test]
    fn test_role_session_name_charset() {
        let build = |name: &str| {
            TempCredentialsConfig::builder("prod")
                .role_arn("arn:aws:iam::123456789012:role/admin")
                .role_session_name(name)
                .build()
        };
        assert!(build("alice@example.com").is_ok());
        assert!(build("a").is_err());
        assert!(build("has space").is_err());
        assert!(build(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("ttl", "3600").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("ttl", "4h").unwrap(), Duration::from_secs(14_400));
        assert_eq!(parse_duration("ttl", "90m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("ttl", "1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("ttl", "3600s").unwrap(), Duration::from_secs(3600));
        assert!(parse_duration("ttl", "").is_err());
        assert!(parse_duration("ttl", "h").is_err());
        assert!(parse_duration("ttl", "10").is_ok());
        assert!(parse_duration("ttl", "10x").is_err());
        assert!(parse_duration("ttl", "1h30").is_err());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("AWS_PROFILE", "prod"),
            ("AWS_DEFAULT_REGION", "eu-central-1"),
            ("AWS_ROLE_ARN", "arn:aws:iam::123456789012:role/admin"),
            ("AWS_MFA_SERIAL", "arn:aws:iam::123456789012:mfa/alice"),
            ("AWS_SESSION_TTL", "8h"),
            ("AWS_ASSUME_ROLE_TTL", "1h"),
        ]
        .into_iter()
        .collect();

        let config =
            TempCredentialsConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
                .unwrap();
        assert_eq!(config.credentials_name(), "prod");
        assert_eq!(config.region(), "eu-central-1");
        assert_eq!(config.role_arn(), Some("arn:aws:iam::123456789012:role/admin"));
        assert_eq!(config.mfa_serial(), Some("arn:aws:iam::123456789012:mfa/alice"));
        assert_eq!(config.session_duration(), Duration::from_secs(8 * 3600));
        assert_eq!(config.assume_role_duration(), Duration::from_secs(3600));
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = TempCredentialsConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.credentials_name(), DEFAULT_CREDENTIALS_NAME);
        assert_eq!(config.region(), DEFAULT_REGION);
    }

    #[test]
    fn test_from_lookup_non_interactive() {
        let vars: HashMap<&str, &str> = [
            ("AWS_PROFILE", "prod"),
            ("AWS_ROLE_ARN", "arn:aws:iam::123456789012:role/admin"),
            ("AWS_EXTERNAL_ID", "ext-123"),
            ("AWS_MFA_SERIAL", "arn:aws:iam::123456789012:mfa/alice"),
            ("AWS_MFA_TOKEN", "123456"),
            ("AWS_NO_SESSION", "true"),
        ]
        .into_iter()
        .collect();

        let config =
            TempCredentialsConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
                .unwrap();
        assert_eq!(config.external_id(), Some("ext-123"));
        assert_eq!(config.mfa_token(), Some("123456"));
        assert!(config.no_session());
    }

    #[test]
    fn test_from_lookup_empty_role() {
        let config = TempCredentialsConfig::from_lookup(|name| {
            (name == "AWS_ROLE_ARN").then(String::new)
        })
        .unwrap();
        assert!(!config.has_role());
    }

    #[test]
    fn test_from_lookup_bad_no_session() {
        let err = TempCredentialsConfig::from_lookup(|name| {
            (name == "AWS_NO_SESSION").then(|| "maybe".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::Invalid { field, .. } if field == "AWS_NO_SESSION"));
    }

    #[test]
    fn test_from_lookup_bad_ttl() {
        let err = TempCredentialsConfig::from_lookup(|name| {
            (name == "AWS_SESSION_TTL").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::Invalid { field, .. } if field == "AWS_SESSION_TTL"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = TempCredentialsConfig::builder("prod")
            .mfa_serial("serial")
            .mfa_token("123456")
            .build()
            .unwrap();
        assert!(!format!("{:?}", config).contains("123456"));
    }
}

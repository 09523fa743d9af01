//! XML parsing for STS Query API responses.

use crate::error::StsError;
use crate::role::AssumedRoleCredential;
use crate::session::SessionToken;
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Fields of an STS `ErrorResponse` document.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct ErrorDocument {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

#[derive(Default)]
struct CredentialFields {
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    session_token: Option<String>,
    expiration: Option<String>,
    assumed_role_arn: Option<String>,
}

fn invalid(message: impl Into<String>) -> StsError {
    StsError::InvalidResponse {
        message: message.into(),
    }
}

fn parse_credential_fields(xml: &str) -> Result<CredentialFields, StsError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut fields = CredentialFields::default();
    let mut in_credentials = false;
    let mut in_assumed_role_user = false;
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "Credentials" => in_credentials = true,
                    "AssumedRoleUser" => in_assumed_role_user = true,
                    _ => {}
                }
                current_element = name;
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| invalid(e.to_string()))?
                    .to_string();

                if in_credentials {
                    match current_element.as_str() {
                        "AccessKeyId" => fields.access_key_id = Some(text),
                        "SecretAccessKey" => fields.secret_access_key = Some(text),
                        "SessionToken" => fields.session_token = Some(text),
                        "Expiration" => fields.expiration = Some(text),
                        _ => {}
                    }
                } else if in_assumed_role_user && current_element == "Arn" {
                    fields.assumed_role_arn = Some(text);
                }
            }
            Ok(Event::End(e)) => {
                match e.name().as_ref() {
                    b"Credentials" => in_credentials = false,
                    b"AssumedRoleUser" => in_assumed_role_user = false,
                    _ => {}
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(invalid(e.to_string())),
            _ => {}
        }
    }

    Ok(fields)
}

fn required(value: Option<String>, element: &str) -> Result<String, StsError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| invalid(format!("missing Credentials/{} element", element)))
}

fn parse_expiration(value: Option<String>) -> Result<DateTime<Utc>, StsError> {
    let raw = required(value, "Expiration")?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| invalid(format!("invalid Expiration '{}': {}", raw, e)))
}

/// Parse a `GetSessionTokenResponse`.
pub(crate) fn parse_get_session_token(xml: &str) -> Result<SessionToken, StsError> {
    let fields = parse_credential_fields(xml)?;
    Ok(SessionToken::new(
        required(fields.access_key_id, "AccessKeyId")?,
        required(fields.secret_access_key, "SecretAccessKey")?,
        required(fields.session_token, "SessionToken")?,
        parse_expiration(fields.expiration)?,
    ))
}

/// Parse an `AssumeRoleResponse`.
pub(crate) fn parse_assume_role(xml: &str) -> Result<AssumedRoleCredential, StsError> {
    let fields = parse_credential_fields(xml)?;
    Ok(AssumedRoleCredential::new(
        required(fields.access_key_id, "AccessKeyId")?,
        required(fields.secret_access_key, "SecretAccessKey")?,
        required(fields.session_token, "SessionToken")?,
        parse_expiration(fields.expiration)?,
        fields.assumed_role_arn,
    ))
}

/// Parse an `ErrorResponse`. Returns `None` if the body has no `Code`.
pub(crate) fn parse_error_response(xml: &str) -> Option<ErrorDocument> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut doc = ErrorDocument::default();
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current_element = String::from_utf8_lossy(e.name().as_ref()).to_string();
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                match current_element.as_str() {
                    "Code" => doc.code = text,
                    "Message" => doc.message = text,
                    "RequestId" => doc.request_id = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current_element.clear(),
            Ok(Event::Eof) => break,
            Err(_) => return None,
            _ => {}
        }
    }

    if doc.code.is_empty() {
        None
    } else {
        Some(doc)
    }
}

//! AWS Signature Version 4 for STS Query API requests.
//!
//! The signing process:
//! 1. Build the canonical request from method, path, query, headers and
//!    payload hash
//! 2. Build the string to sign from the timestamp, credential scope and the
//!    canonical request hash
//! 3. Derive the signing key from the secret key, date, region and service
//! 4. Add the `Authorization` header
//!
//! Reference: https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html

use crate::credentials::AwsCredentials;
use crate::error::StsError;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

/// AWS Signature V4 algorithm identifier.
pub const AWS_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Service name used in the credential scope for STS.
pub const STS_SERVICE: &str = "sts";

const URI_PATH_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

const QUERY_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Calculate SHA-256 hash of data and return as hex string.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Derive the signing key:
/// `kSigning = HMAC(HMAC(HMAC(HMAC("AWS4" + secret, date), region), service), "aws4_request")`.
pub fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_secret = format!("AWS4{}", secret_key);
    let k_date = hmac_sha256(k_secret.as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// `YYYYMMDD'T'HHMMSS'Z'`
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// `YYYYMMDD`
pub fn format_date_stamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%d").to_string()
}

/// `{date}/{region}/{service}/aws4_request`
pub fn build_credential_scope(date_stamp: &str, region: &str, service: &str) -> String {
    format!("{}/{}/{}/aws4_request", date_stamp, region, service)
}

fn uri_encode(input: &str, encode_slash: bool) -> String {
    if encode_slash {
        utf8_percent_encode(input, QUERY_SET).to_string()
    } else {
        utf8_percent_encode(input, URI_PATH_SET).to_string()
    }
}

fn canonical_query_string(query_params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = query_params
        .iter()
        .map(|(key, value)| (uri_encode(key, true), uri_encode(value, true)))
        .collect();
    encoded.sort();

    encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn should_sign_header(name: &str) -> bool {
    name == "host" || name == "content-type" || name.starts_with("x-amz-")
}

/// Returns (canonical headers, signed headers).
fn canonical_headers(headers: &HeaderMap) -> (String, String) {
    let mut header_map: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (name, value) in headers {
        let name_lower = name.as_str().to_lowercase();
        if !should_sign_header(&name_lower) {
            continue;
        }

        let trimmed = value
            .to_str()
            .unwrap_or("")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        header_map.entry(name_lower).or_default().push(trimmed);
    }

    let canonical = header_map
        .iter()
        .map(|(name, values)| format!("{}:{}\n", name, values.join(",")))
        .collect::<String>();

    let signed = header_map.keys().map(|s| s.as_str()).collect::<Vec<_>>().join(";");

    (canonical, signed)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, StsError> {
    value.parse().map_err(|_| StsError::Signing {
        message: format!("Failed to parse {} header", name),
    })
}

/// Sign a request in place.
///
/// `headers` must already contain `host`; `x-amz-date`, the security token
/// (for temporary credentials) and `authorization` are added.
pub fn sign_request(
    method: &str,
    path: &str,
    query_params: &[(String, String)],
    headers: &mut HeaderMap,
    payload: &[u8],
    credentials: &AwsCredentials,
    region: &str,
    timestamp: &DateTime<Utc>,
) -> Result<(), StsError> {
    if credentials.access_key_id().is_empty() || credentials.secret_access_key().is_empty() {
        return Err(StsError::Signing {
            message: "Access key ID and secret access key are required".to_string(),
        });
    }
    if !headers.contains_key(http::header::HOST) {
        return Err(StsError::Signing {
            message: "Missing required header: host".to_string(),
        });
    }

    let date_stamp = format_date_stamp(timestamp);
    let amz_date = format_datetime(timestamp);
    let payload_hash = sha256_hex(payload);

    headers.insert(
        HeaderName::from_static("x-amz-date"),
        header_value("x-amz-date", &amz_date)?,
    );
    if let Some(token) = credentials.session_token() {
        headers.insert(
            HeaderName::from_static("x-amz-security-token"),
            header_value("x-amz-security-token", token)?,
        );
    }

    let (canonical_headers_str, signed_headers) = canonical_headers(headers);
    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method.to_uppercase(),
        uri_encode(path, false),
        canonical_query_string(query_params),
        canonical_headers_str,
        signed_headers,
        payload_hash
    );

    let credential_scope = build_credential_scope(&date_stamp, region, STS_SERVICE);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        AWS_ALGORITHM,
        amz_date,
        credential_scope,
        sha256_hex(canonical_request.as_bytes())
    );

    let signing_key = derive_signing_key(
        credentials.secret_access_key(),
        &date_stamp,
        region,
        STS_SERVICE,
    );
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

    let authorization = format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        AWS_ALGORITHM,
        credentials.access_key_id(),
        credential_scope,
        signed_headers,
        signature
    );
    headers.insert(
        http::header::AUTHORIZATION,
        header_value("authorization", &authorization)?,
    );

    Ok(())
}

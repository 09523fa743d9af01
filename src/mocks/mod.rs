//! Mock implementations for testing.
//!
//! This module provides in-memory stand-ins for every collaborator of the
//! resolver. Each one counts its calls so tests can assert on network and
//! prompt usage.

mod master;
mod prompt;
mod session;
mod sts;

pub use master::MockMasterCredentials;
pub use prompt::MockPrompt;
pub use session::MockSessionCache;
pub use sts::{MockStsClient, StsCall};

use crate::session::SessionToken;
use chrono::{Duration, Utc};

/// Test fixtures for resolver scenarios.
pub struct TestFixtures;

impl TestFixtures {
    /// Account identity used throughout the tests.
    pub const ACCOUNT: &'static str = "prod";

    /// A virtual MFA device serial.
    pub const MFA_SERIAL: &'static str = "arn:aws:iam::123456789012:mfa/alice";

    /// A role ARN.
    pub const ROLE_ARN: &'static str = "arn:aws:iam::123456789012:role/admin";

    /// A session token expiring `ttl` from now.
    pub fn session_token(access_key_id: &str, ttl: Duration) -> SessionToken {
        SessionToken::new(
            access_key_id,
            "cachedSecretAccessKey",
            "cachedSessionToken",
            Utc::now() + ttl,
        )
    }
}

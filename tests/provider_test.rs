//! Integration tests for TempCredentialsProvider.

use aws_tempcreds::mocks::{
    MockMasterCredentials, MockPrompt, MockSessionCache, MockStsClient, StsCall, TestFixtures,
};
use aws_tempcreds::{
    CacheError, CredentialsError, CredentialsProvider, ErrorKind,
    MfaPromptError, ResolutionPath, SessionKey, StsError, TempCredentialsConfig,
    TempCredentialsConfigBuilder, TempCredentialsProvider, TempCredsError,
};
use chrono::{Duration, Utc};
use rstest::rstest;
use std::sync::Arc;

struct Harness {
    provider: TempCredentialsProvider,
    master: Arc<MockMasterCredentials>,
    sessions: Arc<MockSessionCache>,
    sts: Arc<MockStsClient>,
    prompt: Arc<MockPrompt>,
}

fn harness(configure: impl FnOnce(TempCredentialsConfigBuilder) -> TempCredentialsConfigBuilder) -> Harness {
    harness_with_prompt(MockPrompt::answering("123456"), configure)
}

fn harness_with_prompt(
    prompt: MockPrompt,
    configure: impl FnOnce(TempCredentialsConfigBuilder) -> TempCredentialsConfigBuilder,
) -> Harness {
    let prompt = Arc::new(prompt);
    let config = configure(
        TempCredentialsConfig::builder(TestFixtures::ACCOUNT).mfa_prompt(prompt.clone()),
    )
    .build()
    .unwrap();

    let master = Arc::new(MockMasterCredentials::new());
    let sessions = Arc::new(MockSessionCache::new());
    let sts = Arc::new(MockStsClient::new());
    let provider =
        TempCredentialsProvider::new(config, master.clone(), sessions.clone(), sts.clone())
            .unwrap();

    Harness {
        provider,
        master,
        sessions,
        sts,
        prompt,
    }
}

fn mfa_key() -> SessionKey {
    SessionKey::new(TestFixtures::ACCOUNT, TestFixtures::MFA_SERIAL)
}

fn plain_key() -> SessionKey {
    SessionKey::new(TestFixtures::ACCOUNT, "")
}

#[rstest]
#[case(true, false, ResolutionPath::MasterOnly, 0, 0)]
#[case(true, true, ResolutionPath::RoleFromMaster, 0, 1)]
#[case(false, false, ResolutionPath::SessionOnly, 1, 0)]
#[case(false, true, ResolutionPath::SessionThenRole, 1, 1)]
#[tokio::test]
async fn test_resolution_paths(
    #[case] no_session: bool,
    #[case] has_role: bool,
    #[case] expected_path: ResolutionPath,
    #[case] expected_sessions: usize,
    #[case] expected_roles: usize,
) {
    let h = harness(|b| {
        let b = b.no_session(no_session);
        if has_role {
            b.role_arn(TestFixtures::ROLE_ARN)
        } else {
            b
        }
    });
    assert_eq!(h.provider.path(), expected_path);

    let creds = h.provider.retrieve().await.unwrap();

    assert_eq!(h.sts.get_session_token_calls(), expected_sessions);
    assert_eq!(h.sts.assume_role_calls(), expected_roles);
    assert_eq!(h.sessions.store_count(), expected_sessions);
    assert_eq!(h.prompt.calls(), 0);

    match expected_path {
        ResolutionPath::MasterOnly => {
            assert_eq!(creds.access_key_id(), MockMasterCredentials::ACCESS_KEY_ID);
            assert!(creds.session_token().is_none());
            assert!(h.provider.is_expired());
        }
        ResolutionPath::SessionOnly => {
            assert!(creds.access_key_id().starts_with("ASIASESSION"));
            assert!(!h.provider.is_expired());
        }
        _ => {
            assert!(creds.access_key_id().starts_with("ASIAROLE"));
            assert!(!h.provider.is_expired());
        }
    }
}

#[tokio::test]
async fn test_cached_session_with_role() {
    let h = harness(|b| {
        b.role_arn(TestFixtures::ROLE_ARN)
            .mfa_serial(TestFixtures::MFA_SERIAL)
    });
    h.sessions.insert(
        mfa_key(),
        TestFixtures::session_token("ASIACACHED", Duration::hours(2)),
    );

    let creds = h.provider.retrieve().await.unwrap();

    assert!(creds.access_key_id().starts_with("ASIAROLE"));
    assert_eq!(h.sts.get_session_token_calls(), 0);
    assert_eq!(h.sts.assume_role_calls(), 1);
    assert_eq!(h.prompt.calls(), 0);
    assert_eq!(h.master.get_count(), 0);
    assert_eq!(h.sts.last_assume_role_base().as_deref(), Some("ASIACACHED"));

    let request = h.sts.last_assume_role().unwrap();
    assert_eq!(request.duration, std::time::Duration::from_secs(15 * 60));
    assert!(request.mfa.is_none());
    assert!(!request.role_session_name.is_empty());
}

#[tokio::test]
async fn test_cache_hit_is_trusted_even_near_expiry() {
    let h = harness(|b| b);
    h.sessions.insert(
        plain_key(),
        TestFixtures::session_token("ASIAALMOST", Duration::minutes(1)),
    );

    let creds = h.provider.retrieve().await.unwrap();

    assert_eq!(creds.access_key_id(), "ASIAALMOST");
    assert_eq!(h.sts.total_calls(), 0);
    // Inside the expiration window already.
    assert!(h.provider.is_expired());
}

#[tokio::test]
async fn test_force_refresh_bypasses_cache() {
    let h = harness(|b| b);
    h.sessions.insert(
        plain_key(),
        TestFixtures::session_token("ASIACACHED", Duration::hours(2)),
    );

    h.provider.force_refresh().await;
    assert_eq!(h.master.invalidate_count(), 1);

    let creds = h.provider.retrieve().await.unwrap();
    assert_eq!(creds.access_key_id(), "ASIASESSION1");
    assert_eq!(h.sts.get_session_token_calls(), 1);
    assert_eq!(h.sessions.retrieve_count(), 0);
    assert_eq!(
        h.sessions.get(&plain_key()).unwrap().access_key_id(),
        "ASIASESSION1"
    );

    // The flag is cleared: the next call is served from the cache.
    let creds = h.provider.retrieve().await.unwrap();
    assert_eq!(creds.access_key_id(), "ASIASESSION1");
    assert_eq!(h.sts.get_session_token_calls(), 1);
    assert_eq!(h.sessions.retrieve_count(), 1);
}

#[tokio::test]
async fn test_force_refresh_invalidates_once_per_call() {
    let h = harness(|b| b.no_session(true));
    h.provider.force_refresh().await;
    h.provider.force_refresh().await;
    assert_eq!(h.master.invalidate_count(), 2);
}

#[tokio::test]
async fn test_literal_mfa_token_skips_prompt() {
    let h = harness(|b| b.mfa_serial(TestFixtures::MFA_SERIAL).mfa_token("123456"));

    h.provider.retrieve().await.unwrap();

    assert_eq!(h.prompt.calls(), 0);
    let mfa = h.sts.last_get_session_token().unwrap().mfa.unwrap();
    assert_eq!(mfa.serial, TestFixtures::MFA_SERIAL);
    assert_eq!(mfa.code, "123456");
}

#[tokio::test]
async fn test_literal_mfa_token_skips_prompt_for_role_from_master() {
    let h = harness(|b| {
        b.no_session(true)
            .role_arn(TestFixtures::ROLE_ARN)
            .mfa_serial(TestFixtures::MFA_SERIAL)
            .mfa_token("246810")
    });

    h.provider.retrieve().await.unwrap();

    assert_eq!(h.prompt.calls(), 0);
    assert_eq!(h.sts.get_session_token_calls(), 0);
    let mfa = h.sts.last_assume_role().unwrap().mfa.unwrap();
    assert_eq!(mfa.serial, TestFixtures::MFA_SERIAL);
    assert_eq!(mfa.code, "246810");
}

#[tokio::test]
async fn test_literal_mfa_token_skips_prompt_for_session_then_role() {
    let h = harness(|b| {
        b.role_arn(TestFixtures::ROLE_ARN)
            .mfa_serial(TestFixtures::MFA_SERIAL)
            .mfa_token("246810")
    });

    h.provider.retrieve().await.unwrap();

    assert_eq!(h.prompt.calls(), 0);
    let mfa = h.sts.last_get_session_token().unwrap().mfa.unwrap();
    assert_eq!(mfa.serial, TestFixtures::MFA_SERIAL);
    assert_eq!(mfa.code, "246810");
    assert!(h.sts.last_assume_role().unwrap().mfa.is_none());
}

#[tokio::test]
async fn test_session_miss_prompts_once() {
    let h = harness(|b| b.mfa_serial(TestFixtures::MFA_SERIAL));

    h.provider.retrieve().await.unwrap();

    assert_eq!(h.prompt.calls(), 1);
    assert_eq!(
        h.prompt.last_message().as_deref(),
        Some("Enter token for arn:aws:iam::123456789012:mfa/alice: ")
    );
    assert!(h.sessions.get(&mfa_key()).is_some());
    assert!(h.sessions.get(&plain_key()).is_none());
}

#[tokio::test]
async fn test_role_from_master_presents_mfa() {
    let h = harness(|b| {
        b.no_session(true)
            .role_arn(TestFixtures::ROLE_ARN)
            .mfa_serial(TestFixtures::MFA_SERIAL)
    });

    h.provider.retrieve().await.unwrap();

    assert_eq!(h.prompt.calls(), 1);
    assert_eq!(h.sts.get_session_token_calls(), 0);
    assert_eq!(h.sts.assume_role_calls(), 1);
    assert_eq!(h.sessions.store_count(), 0);
    assert_eq!(
        h.sts.last_assume_role_base().as_deref(),
        Some(MockMasterCredentials::ACCESS_KEY_ID)
    );
    let mfa = h.sts.last_assume_role().unwrap().mfa.unwrap();
    assert_eq!(mfa.code, "123456");
}

#[tokio::test]
async fn test_expiry_window() {
    let h = harness(|b| b);
    let reported = Utc::now() + Duration::hours(1);
    h.sts.set_session_expiration(reported);

    h.provider.retrieve().await.unwrap();

    assert_eq!(
        h.provider.expiration(),
        Some(reported - Duration::minutes(5))
    );
    assert!(!h.provider.is_expired());
}

#[tokio::test]
async fn test_expiry_inside_window_reports_expired() {
    let h = harness(|b| b);
    h.sts
        .set_session_expiration(Utc::now() + Duration::minutes(4));

    h.provider.retrieve().await.unwrap();
    assert!(h.provider.is_expired());
}

#[tokio::test]
async fn test_explicit_role_session_name() {
    let h = harness(|b| {
        b.role_arn(TestFixtures::ROLE_ARN)
            .role_session_name("deploy-bot")
            .external_id("ext-123")
    });

    h.provider.retrieve().await.unwrap();

    let request = h.sts.last_assume_role().unwrap();
    assert_eq!(request.role_session_name, "deploy-bot");
    assert_eq!(request.external_id.as_deref(), Some("ext-123"));
}

#[tokio::test]
async fn test_empty_role_returns_session() {
    let h = harness(|b| b.role_arn(""));
    assert_eq!(h.provider.path(), ResolutionPath::SessionOnly);

    let creds = h.provider.retrieve().await.unwrap();

    assert_eq!(creds.access_key_id(), "ASIASESSION1");
    assert_eq!(h.sts.get_session_token_calls(), 1);
    assert_eq!(h.sts.assume_role_calls(), 0);
    assert_eq!(
        h.sessions.get(&plain_key()).unwrap().access_key_id(),
        "ASIASESSION1"
    );
}

#[tokio::test]
async fn test_store_failure_surfaces_and_keeps_flag() {
    let h = harness(|b| b);
    h.sessions.set_fail_store(true);
    h.provider.force_refresh().await;

    let err = h.provider.retrieve().await.unwrap_err();
    assert!(matches!(err, TempCredsError::Cache(CacheError::Backend { .. })));
    assert_eq!(err.kind(), ErrorKind::CacheError);
    assert!(h.provider.is_expired());

    // Still forced: the cache is not consulted on the next attempt.
    h.sessions.set_fail_store(false);
    h.provider.retrieve().await.unwrap();
    assert_eq!(h.sessions.retrieve_count(), 0);
    assert_eq!(h.sts.get_session_token_calls(), 2);
}

#[tokio::test]
async fn test_read_failure_is_a_miss() {
    let h = harness(|b| b);
    h.sessions.set_fail_retrieve(true);

    let creds = h.provider.retrieve().await.unwrap();

    assert_eq!(creds.access_key_id(), "ASIASESSION1");
    assert_eq!(h.sessions.retrieve_count(), 1);
    assert_eq!(h.sts.get_session_token_calls(), 1);
    assert_eq!(h.sessions.store_count(), 1);
}

#[tokio::test]
async fn test_prompt_failure_leaves_cache_untouched() {
    let h = harness_with_prompt(MockPrompt::cancelling(), |b| {
        b.mfa_serial(TestFixtures::MFA_SERIAL)
    });

    let err = h.provider.retrieve().await.unwrap_err();

    assert!(matches!(
        err,
        TempCredsError::MfaPrompt(MfaPromptError::Cancelled)
    ));
    assert_eq!(err.kind(), ErrorKind::MfaPromptFailed);
    assert!(err.is_retryable());
    assert_eq!(h.sts.total_calls(), 0);
    assert_eq!(h.sessions.store_count(), 0);
    assert!(h.provider.expiration().is_none());
}

#[tokio::test]
async fn test_elevate_failure_is_propagated() {
    let h = harness(|b| b.role_arn(TestFixtures::ROLE_ARN));
    h.sts.fail_next_session(StsError::Service {
        status: 403,
        code: "AccessDenied".to_string(),
        message: "MultiFactorAuthentication failed".to_string(),
        request_id: None,
    });

    let err = h.provider.retrieve().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NetworkError);
    assert!(!err.is_retryable());
    assert_eq!(h.sessions.store_count(), 0);
    assert_eq!(h.sts.assume_role_calls(), 0);
    assert!(h.provider.expiration().is_none());
}

#[tokio::test]
async fn test_assume_role_failure_keeps_stored_session() {
    let h = harness(|b| b.role_arn(TestFixtures::ROLE_ARN));
    h.sts.fail_next_assume_role(StsError::Transport {
        message: "connection reset".to_string(),
        timeout: false,
    });

    let err = h.provider.retrieve().await.unwrap_err();
    assert!(err.is_retryable());
    assert!(h.sessions.get(&plain_key()).is_some());

    // Retrying reuses the stored session.
    h.provider.retrieve().await.unwrap();
    assert_eq!(h.sts.get_session_token_calls(), 1);
    assert_eq!(h.sts.assume_role_calls(), 2);
}

#[tokio::test]
async fn test_master_failure_is_propagated() {
    let h = harness(|b| b);
    h.master.fail_next(CredentialsError::NotFound);

    let err = h.provider.retrieve().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CredentialsError);
    assert_eq!(h.sts.total_calls(), 0);
}

#[tokio::test]
async fn test_session_signed_with_master() {
    let h = harness(|b| b.session_duration(std::time::Duration::from_secs(3600)));

    h.provider.retrieve().await.unwrap();

    match &h.sts.calls()[0] {
        StsCall::GetSessionToken {
            base_access_key_id,
            request,
        } => {
            assert_eq!(base_access_key_id, MockMasterCredentials::ACCESS_KEY_ID);
            assert_eq!(request.duration, std::time::Duration::from_secs(3600));
            assert!(request.mfa.is_none());
        }
        other => panic!("unexpected call {:?}", other),
    }
}

#[tokio::test]
async fn test_usable_as_credentials_provider() {
    let h = harness(|b| b);
    let provider: &dyn CredentialsProvider = &h.provider;

    assert!(provider.is_expired());
    let creds = provider.credentials().await.unwrap();
    assert!(creds.is_temporary());
    assert!(!provider.is_expired());
    assert_eq!(provider.name(), "temporary");
}

#[test]
fn test_invalid_config_rejected_by_builder() {
    let result = TempCredentialsConfig::builder(TestFixtures::ACCOUNT)
        .mfa_token("123456")
        .build();
    assert!(result.is_err());
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use shellforge_core::{AppError, AppResult};
use shellforge_domain::{
    ActionCooldownRecord, AttemptRecord, CooldownPolicy, LimitScope, RateLimitEvent,
    RateLimitPolicy,
};

use crate::event_recorder::{
    GeoLocation, GeoLookup, RateLimitEventRecorder, RateLimitEventRepository,
};

use super::{AttemptLedger, CooldownGate, RateLimitService, RateLimitStore, RequestContext};

#[derive(Default)]
struct TestStore {
    attempts: Mutex<HashMap<String, AttemptRecord>>,
    cooldowns: Mutex<HashMap<String, ActionCooldownRecord>>,
    fail_reads: bool,
    fail_writes: bool,
}

impl TestStore {
    fn attempts_for(&self, key: &str) -> Option<AttemptRecord> {
        self.attempts
            .lock()
            .ok()
            .and_then(|attempts| attempts.get(key).cloned())
    }
}

#[async_trait]
impl RateLimitStore for TestStore {
    async fn load_attempts(&self, key: &str) -> AppResult<Option<AttemptRecord>> {
        if self.fail_reads {
            return Err(AppError::Internal("simulated read failure".to_owned()));
        }
        Ok(self.attempts_for(key))
    }

    async fn save_attempts(&self, key: &str, record: &AttemptRecord) -> AppResult<()> {
        if self.fail_writes {
            return Err(AppError::Internal("simulated write failure".to_owned()));
        }
        self.attempts
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock store state: {error}")))?
            .insert(key.to_owned(), record.clone());
        Ok(())
    }

    async fn delete_attempts(&self, key: &str) -> AppResult<()> {
        self.attempts
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock store state: {error}")))?
            .remove(key);
        Ok(())
    }

    async fn load_cooldown(&self, resource: &str) -> AppResult<Option<ActionCooldownRecord>> {
        if self.fail_reads {
            return Err(AppError::Internal("simulated read failure".to_owned()));
        }
        Ok(self
            .cooldowns
            .lock()
            .ok()
            .and_then(|cooldowns| cooldowns.get(resource).cloned()))
    }

    async fn save_cooldown(&self, resource: &str, record: &ActionCooldownRecord) -> AppResult<()> {
        if self.fail_writes {
            return Err(AppError::Internal("simulated write failure".to_owned()));
        }
        self.cooldowns
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock store state: {error}")))?
            .insert(resource.to_owned(), record.clone());
        Ok(())
    }

    async fn cleanup_expired(&self, _before: DateTime<Utc>) -> AppResult<u64> {
        Ok(0)
    }
}

#[derive(Default)]
struct TestEventRepo {
    events: Mutex<Vec<RateLimitEvent>>,
}

impl TestEventRepo {
    fn snapshot(&self) -> Vec<RateLimitEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RateLimitEventRepository for TestEventRepo {
    async fn append_event(&self, event: RateLimitEvent) -> AppResult<()> {
        self.events
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock repo state: {error}")))?
            .push(event);
        Ok(())
    }

    async fn list_active(&self) -> AppResult<Vec<RateLimitEvent>> {
        Ok(Vec::new())
    }

    async fn list_history(&self, _limit: i64) -> AppResult<Vec<RateLimitEvent>> {
        Ok(Vec::new())
    }

    async fn list_for_user(&self, _user_id: &str) -> AppResult<Vec<RateLimitEvent>> {
        Ok(Vec::new())
    }
}

struct NoGeoLookup;

#[async_trait]
impl GeoLookup for NoGeoLookup {
    async fn locate(&self, _ip_address: &str) -> AppResult<GeoLocation> {
        Ok(GeoLocation::default())
    }
}

fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0)
        .single()
        .unwrap_or_default()
}

fn auth_policy(max_attempts: i32) -> RateLimitPolicy {
    RateLimitPolicy::new("auth", LimitScope::User, max_attempts, 15, 15)
        .unwrap_or_else(|_| unreachable!("static test policy is valid"))
}

fn like_policy() -> CooldownPolicy {
    CooldownPolicy::new("like-button", LimitScope::Device, 1)
        .unwrap_or_else(|_| unreachable!("static test policy is valid"))
}

fn browser_context() -> RequestContext {
    RequestContext {
        ip_address: Some("203.0.113.7".to_owned()),
        user_agent: Some("Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0".to_owned()),
        accept: Some("text/html".to_owned()),
        accept_language: Some("en-US".to_owned()),
        screen_resolution: Some("2560x1440".to_owned()),
        time_zone: Some("Europe/Berlin".to_owned()),
        runtime: crate::RuntimeSignals {
            plugins_count: Some(3),
            languages_count: Some(2),
            hardware_concurrency: Some(8),
            ..Default::default()
        },
        session_duration_ms: Some(45_000),
    }
}

const LOCKOUT_MS: i64 = 15 * 60 * 1000;

#[tokio::test]
async fn five_checks_allowed_then_sixth_locks_with_lockout_wait() {
    let store = Arc::new(TestStore::default());
    let ledger = AttemptLedger::new(auth_policy(5), store.clone());

    for attempt in 1..=5 {
        let decision = ledger.check_at("auth:alice", at(attempt)).await;
        assert!(decision.allowed, "attempt {attempt} should be allowed");
        assert_eq!(decision.attempt_count, attempt as i32);
        assert_eq!(decision.wait_time_ms, 0);
    }

    let denied = ledger.check_at("auth:alice", at(6)).await;
    assert!(!denied.allowed);
    assert_eq!(denied.wait_time_ms, LOCKOUT_MS);
    assert_eq!(denied.attempt_count, 5);
    assert!(denied.locked_until.is_some());
    // Attempts one second apart average to a 1000ms gap.
    assert_eq!(denied.time_between_attempts_ms, Some(1000));
}

#[tokio::test]
async fn checks_while_locked_deny_without_counting() {
    let store = Arc::new(TestStore::default());
    let ledger = AttemptLedger::new(auth_policy(2), store.clone());

    for second in [0, 1, 2] {
        let _ = ledger.check_at("auth:bob", at(second)).await;
    }

    let denied_again = ledger.check_at("auth:bob", at(60)).await;
    assert!(!denied_again.allowed);
    assert_eq!(denied_again.attempt_count, 2);
    // Lock was set at t=2s; 58 seconds later the remaining wait has shrunk.
    assert_eq!(denied_again.wait_time_ms, LOCKOUT_MS - 58 * 1000);

    let stored = store.attempts_for("auth:bob");
    assert!(stored.is_some_and(|record| record.attempts == 2));
}

#[tokio::test]
async fn expired_lock_reopens_and_counts_first_attempt() {
    let store = Arc::new(TestStore::default());
    let ledger = AttemptLedger::new(auth_policy(2), store.clone());

    for second in [0, 1, 2] {
        let _ = ledger.check_at("auth:carol", at(second)).await;
    }

    let after_lockout = at(2 + 15 * 60 + 1);
    let decision = ledger.check_at("auth:carol", after_lockout).await;

    assert!(decision.allowed);
    assert_eq!(decision.attempt_count, 1);
    assert_eq!(decision.window_started_at, after_lockout);
    let stored = store.attempts_for("auth:carol");
    assert!(stored.is_some_and(|record| record.attempts == 1 && record.locked_until.is_none()));
}

#[tokio::test]
async fn reset_unlocks_immediately() {
    let store = Arc::new(TestStore::default());
    let ledger = AttemptLedger::new(auth_policy(1), store.clone());

    let _ = ledger.check_at("auth:dave", at(0)).await;
    let denied = ledger.check_at("auth:dave", at(1)).await;
    assert!(!denied.allowed);

    assert!(ledger.reset("auth:dave").await.is_ok());

    let decision = ledger.check_at("auth:dave", at(2)).await;
    assert!(decision.allowed);
    assert_eq!(decision.attempt_count, 1);
}

#[tokio::test]
async fn stale_window_resets_attempt_count() {
    // alice: 3 attempts inside a minute, then a 20 minute pause with a
    // 15 minute window resets the count to one.
    let store = Arc::new(TestStore::default());
    let ledger = AttemptLedger::new(auth_policy(5), store.clone());

    for second in [0, 30, 60] {
        let decision = ledger.check_at("auth:alice", at(second)).await;
        assert!(decision.allowed);
    }
    let stored = store.attempts_for("auth:alice");
    assert!(stored.is_some_and(|record| record.attempts == 3));

    let after_pause = at(60 + 20 * 60);
    let decision = ledger.check_at("auth:alice", after_pause).await;
    assert!(decision.allowed);
    assert_eq!(decision.attempt_count, 1);
    assert_eq!(decision.window_started_at, after_pause);
}

#[tokio::test]
async fn store_read_failure_fails_open() {
    let store = Arc::new(TestStore {
        fail_reads: true,
        ..Default::default()
    });
    let ledger = AttemptLedger::new(auth_policy(1), store);

    let decision = ledger.check_at("auth:erin", at(0)).await;
    assert!(decision.allowed);
    assert_eq!(decision.attempt_count, 1);
}

#[tokio::test]
async fn store_write_failure_keeps_verdict() {
    let store = Arc::new(TestStore {
        fail_writes: true,
        ..Default::default()
    });
    let ledger = AttemptLedger::new(auth_policy(1), store);

    let decision = ledger.check_at("auth:frank", at(0)).await;
    assert!(decision.allowed);
}

#[tokio::test]
async fn cooldown_gate_allows_once_then_denies_same_identifier() {
    let store = Arc::new(TestStore::default());
    let gate = CooldownGate::new(like_policy(), store);

    let first = gate.check_at("snippet-42", "fp-1", at(0)).await;
    assert!(first.allowed);
    assert!(first.previous_action_at.is_none());

    let second = gate.check_at("snippet-42", "fp-1", at(3600)).await;
    assert!(!second.allowed);
    assert_eq!(second.wait_time_ms, 23 * 60 * 60 * 1000);
    assert_eq!(second.previous_action_at, Some(at(0)));
}

#[tokio::test]
async fn cooldown_gate_treats_new_identifier_as_fresh_caller() {
    let store = Arc::new(TestStore::default());
    let gate = CooldownGate::new(like_policy(), store);

    let _ = gate.check_at("snippet-42", "fp-1", at(0)).await;

    // Different fingerprint overwrites the record (documented tradeoff).
    let other = gate.check_at("snippet-42", "fp-2", at(10)).await;
    assert!(other.allowed);

    let repeat = gate.check_at("snippet-42", "fp-2", at(20)).await;
    assert!(!repeat.allowed);
}

#[tokio::test]
async fn cooldown_gate_reopens_after_cooldown_elapses() {
    let store = Arc::new(TestStore::default());
    let gate = CooldownGate::new(like_policy(), store);

    let _ = gate.check_at("snippet-7", "fp-1", at(0)).await;
    let after_cooldown = gate.check_at("snippet-7", "fp-1", at(86_400)).await;
    assert!(after_cooldown.allowed);
    assert_eq!(after_cooldown.previous_action_at, Some(at(0)));
}

fn facade(max_attempts: i32, repo: Arc<TestEventRepo>) -> RateLimitService {
    let store = Arc::new(TestStore::default());
    let recorder = RateLimitEventRecorder::new(repo, Arc::new(NoGeoLookup));
    RateLimitService::new(
        AttemptLedger::new(auth_policy(max_attempts), store.clone()),
        CooldownGate::new(like_policy(), store),
        recorder,
    )
}

#[tokio::test]
async fn denied_login_records_event_and_classifies_denial() {
    let repo = Arc::new(TestEventRepo::default());
    let service = facade(1, repo.clone());
    let context = browser_context();

    let first = service
        .check_login_attempt("alice", Some("alice@example.com"), &context)
        .await;
    assert!(first.allowed);
    assert!(repo.snapshot().is_empty(), "allows must not log events");

    let second = service
        .check_login_attempt("alice", Some("alice@example.com"), &context)
        .await;
    assert!(!second.allowed);

    let denial = second.denial.as_ref();
    assert!(denial.is_some_and(|denial| denial.http_status == 429));
    assert!(denial.is_some_and(|denial| denial.category == "auth"));

    let events = repo.snapshot();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "login");
    assert_eq!(events[0].identifier, "auth:alice");
    assert_eq!(events[0].user_email.as_deref(), Some("alice@example.com"));
    assert!(events[0].is_still_locked);
}

#[tokio::test]
async fn denied_action_records_event_keyed_by_fingerprint() {
    let repo = Arc::new(TestEventRepo::default());
    let service = facade(5, repo.clone());
    let context = browser_context();

    let first = service
        .check_action_limit("snippet-42", None, None, &context)
        .await;
    assert!(first.allowed);

    let second = service
        .check_action_limit("snippet-42", None, None, &context)
        .await;
    assert!(!second.allowed);
    assert!(second.wait_time_ms > 0);
    assert!(
        second
            .denial
            .is_some_and(|denial| denial.category == "like-button")
    );

    let events = repo.snapshot();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "action");
    assert_eq!(events[0].target_resource.as_deref(), Some("snippet-42"));
    // The identifier is the fingerprint digest, not a user key.
    assert_eq!(events[0].identifier.len(), 64);
}

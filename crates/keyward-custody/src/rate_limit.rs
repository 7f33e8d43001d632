// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted brute-force rate limiter with exponential backoff.
//!
//! Tracks consecutive failed verifications in an [`AttemptStore`] row and
//! derives a lockout window from the counter. The stored row is the sole
//! source of truth; lockout windows are recomputed from it on every read.
//!
//! Failure policy is asymmetric on purpose: status reads degrade gracefully
//! when the store is unreadable (a synthesized state with no remaining
//! attempts), while the mutating [`RateLimiter::record_failure`] path fails
//! outright rather than silently permitting unlimited retries.

use std::sync::Arc;

use keyward_core::{AttemptStore, KeywardError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Failed attempts tolerated before the first lockout.
pub const MAX_ATTEMPTS: u32 = 5;

/// Upper bound on a single lockout window: 24 hours.
pub const MAX_LOCKOUT_MS: i64 = 24 * 60 * 60 * 1000;

/// Inactivity after which the counter is forgiven entirely: 24 hours.
pub const COOLDOWN_MS: i64 = 24 * 60 * 60 * 1000;

/// Store row key used when no per-credential key is configured.
pub const DEFAULT_ATTEMPTS_KEY: &str = "master_password_attempts";

const MINUTE_MS: i64 = 60 * 1000;

/// Persisted per-credential limiter state.
///
/// `lockout_until`, when set, was computed as `now + backoff(failures)` at
/// the moment of the last recorded failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitState {
    pub consecutive_failures: u32,
    pub lockout_until: Option<i64>,
    pub last_attempt_time: Option<i64>,
}

/// Snapshot answer to "may an attempt proceed right now".
///
/// Instantaneously stale; callers re-query before acting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub is_locked: bool,
    pub lockout_remaining_ms: i64,
    pub remaining_attempts: u32,
}

/// Brute-force rate limiter over a persisted attempt counter.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn AttemptStore>,
    key: String,
}

impl RateLimiter {
    /// Bind the limiter to its attempt store under the default credential key.
    pub fn new(store: Arc<dyn AttemptStore>) -> Self {
        Self::with_key(store, DEFAULT_ATTEMPTS_KEY)
    }

    /// Bind the limiter under an explicit per-credential key.
    pub fn with_key(store: Arc<dyn AttemptStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Lockout duration derived from the failure counter.
    ///
    /// Zero below [`MAX_ATTEMPTS`]; from the threshold on, `2^(n-4)` minutes
    /// (2, 4, 8, ... for attempts 5, 6, 7, ...), saturating at 24 hours.
    pub fn backoff_duration_ms(consecutive_failures: u32) -> i64 {
        if consecutive_failures < MAX_ATTEMPTS {
            return 0;
        }
        let exponent = consecutive_failures - (MAX_ATTEMPTS - 1);
        // 2^11 minutes already exceeds the cap; short-circuit before the
        // shift can overflow.
        if exponent >= 11 {
            return MAX_LOCKOUT_MS;
        }
        ((1i64 << exponent) * MINUTE_MS).min(MAX_LOCKOUT_MS)
    }

    /// Read the persisted state, or the default state if none exists.
    ///
    /// If the read itself fails, synthesizes a one-failure state whose
    /// lockout expired immediately: the caller is not hard-locked, but no
    /// remaining-attempts signal is offered while storage is uncertain.
    pub async fn state(&self) -> RateLimitState {
        match self.fetch_state().await {
            Ok(Some(state)) => state,
            Ok(None) => RateLimitState::default(),
            Err(e) => {
                warn!(error = %e, "attempt store unreadable -- synthesizing denial state");
                let now = now_ms();
                RateLimitState {
                    consecutive_failures: 1,
                    lockout_until: Some(now + Self::backoff_duration_ms(1)),
                    last_attempt_time: Some(now),
                }
            }
        }
    }

    /// Current lockout status and remaining attempts.
    ///
    /// A cooldown fresh start observed here is also persisted, so later
    /// reads agree; a failed persist is logged and the fresh status is still
    /// reported, since `record_failure` re-derives the cooldown from
    /// `last_attempt_time` deterministically.
    pub async fn status(&self) -> RateLimitStatus {
        let now = now_ms();
        let state = self.state().await;
        if grants_fresh_start(&state, now) {
            if let Err(e) = self.reset().await {
                warn!(error = %e, "cooldown reset could not be persisted");
            }
        }
        status_of(&state, now)
    }

    /// Remaining attempts only, without any storage write.
    pub async fn remaining_attempts(&self) -> u32 {
        let now = now_ms();
        status_of(&self.state().await, now).remaining_attempts
    }

    /// Record one failed verification. Must be called after every failure.
    ///
    /// Denies (errors) if the attempt store cannot be read or written.
    pub async fn record_failure(&self) -> Result<(), KeywardError> {
        let mut state = match self.fetch_state().await {
            Ok(state) => state.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "attempt store unreadable while recording failure");
                return Err(KeywardError::RateLimiterUnavailable);
            }
        };

        let now = now_ms();
        if grants_fresh_start(&state, now) {
            state.consecutive_failures = 0;
            state.lockout_until = None;
        } else if let Some(until) = state.lockout_until
            && until <= now
        {
            // Expired lockout is cleared; the counter is preserved.
            state.lockout_until = None;
        }

        state.consecutive_failures += 1;
        state.last_attempt_time = Some(now);
        let backoff = Self::backoff_duration_ms(state.consecutive_failures);
        state.lockout_until = (backoff > 0).then_some(now + backoff);

        debug!(
            consecutive_failures = state.consecutive_failures,
            locked = state.lockout_until.is_some(),
            "failed attempt recorded"
        );

        self.persist(&state).await.map_err(|e| {
            warn!(error = %e, "attempt store unwritable -- denying access");
            KeywardError::RecordAttemptFailed
        })
    }

    /// Unconditionally persist the default state.
    pub async fn reset(&self) -> Result<(), KeywardError> {
        self.persist(&RateLimitState::default()).await
    }

    async fn fetch_state(&self) -> Result<Option<RateLimitState>, KeywardError> {
        match self.store.get(&self.key).await? {
            None => Ok(None),
            Some(row) => serde_json::from_str(&row)
                .map(Some)
                .map_err(|e| KeywardError::Storage {
                    source: Box::new(e),
                }),
        }
    }

    async fn persist(&self, state: &RateLimitState) -> Result<(), KeywardError> {
        let row = serde_json::to_string(state).map_err(|e| KeywardError::Storage {
            source: Box::new(e),
        })?;
        self.store.add(&self.key, &row).await
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").field("key", &self.key).finish()
    }
}

/// 24 hours of inactivity since the last attempt forgives everything, even
/// mid-lockout. A credential that was never attempted gets no fresh start.
fn grants_fresh_start(state: &RateLimitState, now: i64) -> bool {
    state
        .last_attempt_time
        .is_some_and(|last| now - last >= COOLDOWN_MS)
}

fn status_of(state: &RateLimitState, now: i64) -> RateLimitStatus {
    if grants_fresh_start(state, now) {
        return RateLimitStatus {
            is_locked: false,
            lockout_remaining_ms: 0,
            remaining_attempts: MAX_ATTEMPTS,
        };
    }
    if let Some(until) = state.lockout_until {
        if until <= now {
            // Expired lockout unlocks, but the spent attempts stay spent
            // until reset or cooldown.
            return RateLimitStatus {
                is_locked: false,
                lockout_remaining_ms: 0,
                remaining_attempts: 0,
            };
        }
        return RateLimitStatus {
            is_locked: true,
            lockout_remaining_ms: until - now,
            remaining_attempts: 0,
        };
    }
    RateLimitStatus {
        is_locked: false,
        lockout_remaining_ms: 0,
        remaining_attempts: MAX_ATTEMPTS.saturating_sub(state.consecutive_failures),
    }
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MemoryStore {
        rows: Mutex<HashMap<String, String>>,
    }

    impl MemoryStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                rows: Mutex::new(HashMap::new()),
            })
        }

        fn seed(&self, state: &RateLimitState) {
            self.rows.lock().unwrap().insert(
                DEFAULT_ATTEMPTS_KEY.to_string(),
                serde_json::to_string(state).unwrap(),
            );
        }

        fn stored(&self) -> Option<RateLimitState> {
            self.rows
                .lock()
                .unwrap()
                .get(DEFAULT_ATTEMPTS_KEY)
                .map(|row| serde_json::from_str(row).unwrap())
        }
    }

    #[async_trait]
    impl AttemptStore for MemoryStore {
        async fn get(&self, key: &str) -> Result<Option<String>, KeywardError> {
            Ok(self.rows.lock().unwrap().get(key).cloned())
        }

        async fn add(&self, key: &str, value: &str) -> Result<(), KeywardError> {
            self.rows
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    /// Store whose reads always fail.
    struct FailingReadStore;

    #[async_trait]
    impl AttemptStore for FailingReadStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, KeywardError> {
            Err(KeywardError::Storage {
                source: "simulated read failure".into(),
            })
        }

        async fn add(&self, _key: &str, _value: &str) -> Result<(), KeywardError> {
            Ok(())
        }
    }

    /// Store whose writes always fail.
    struct FailingWriteStore;

    #[async_trait]
    impl AttemptStore for FailingWriteStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, KeywardError> {
            Ok(None)
        }

        async fn add(&self, _key: &str, _value: &str) -> Result<(), KeywardError> {
            Err(KeywardError::Storage {
                source: "simulated write failure".into(),
            })
        }
    }

    #[test]
    fn backoff_is_zero_below_threshold() {
        for n in 0..MAX_ATTEMPTS {
            assert_eq!(RateLimiter::backoff_duration_ms(n), 0, "n = {n}");
        }
    }

    #[test]
    fn backoff_doubles_from_threshold() {
        assert_eq!(RateLimiter::backoff_duration_ms(5), 2 * MINUTE_MS);
        assert_eq!(RateLimiter::backoff_duration_ms(6), 4 * MINUTE_MS);
        assert_eq!(RateLimiter::backoff_duration_ms(7), 8 * MINUTE_MS);
        assert_eq!(RateLimiter::backoff_duration_ms(8), 16 * MINUTE_MS);
        assert_eq!(RateLimiter::backoff_duration_ms(9), 32 * MINUTE_MS);
    }

    #[test]
    fn backoff_saturates_at_24_hours() {
        // 2^10 minutes is still under the cap; 2^11 is over it.
        assert_eq!(RateLimiter::backoff_duration_ms(14), 1024 * MINUTE_MS);
        assert_eq!(RateLimiter::backoff_duration_ms(15), MAX_LOCKOUT_MS);
        assert_eq!(RateLimiter::backoff_duration_ms(100), MAX_LOCKOUT_MS);
        assert_eq!(RateLimiter::backoff_duration_ms(u32::MAX), MAX_LOCKOUT_MS);
    }

    mod backoff_props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn backoff_never_exceeds_cap(n in 0u32..10_000) {
                let ms = RateLimiter::backoff_duration_ms(n);
                prop_assert!(ms >= 0);
                prop_assert!(ms <= MAX_LOCKOUT_MS);
            }

            #[test]
            fn backoff_is_monotone(n in 0u32..1_000) {
                prop_assert!(
                    RateLimiter::backoff_duration_ms(n)
                        <= RateLimiter::backoff_duration_ms(n + 1)
                );
            }
        }
    }

    #[tokio::test]
    async fn fresh_credential_reports_all_attempts() {
        let limiter = RateLimiter::new(MemoryStore::new());
        let status = limiter.status().await;

        assert_eq!(
            status,
            RateLimitStatus {
                is_locked: false,
                lockout_remaining_ms: 0,
                remaining_attempts: MAX_ATTEMPTS,
            }
        );
    }

    #[tokio::test]
    async fn four_failures_leave_one_attempt() {
        let store = MemoryStore::new();
        let limiter = RateLimiter::new(store.clone());

        for _ in 0..4 {
            limiter.record_failure().await.unwrap();
        }

        let status = limiter.status().await;
        assert!(!status.is_locked);
        assert_eq!(status.remaining_attempts, 1);
        assert_eq!(store.stored().unwrap().consecutive_failures, 4);
    }

    #[tokio::test]
    async fn fifth_failure_locks_for_two_minutes() {
        let store = MemoryStore::new();
        let limiter = RateLimiter::new(store.clone());

        for _ in 0..5 {
            limiter.record_failure().await.unwrap();
        }

        let state = store.stored().unwrap();
        assert_eq!(state.consecutive_failures, 5);
        // Both stamps come from the same clock read.
        assert_eq!(
            state.lockout_until.unwrap() - state.last_attempt_time.unwrap(),
            2 * MINUTE_MS
        );

        let status = limiter.status().await;
        assert!(status.is_locked);
        assert_eq!(status.remaining_attempts, 0);
        assert!(status.lockout_remaining_ms > 0);
        assert!(status.lockout_remaining_ms <= 2 * MINUTE_MS);
    }

    #[tokio::test]
    async fn expired_lockout_unlocks_without_restoring_attempts() {
        let store = MemoryStore::new();
        let now = now_ms();
        store.seed(&RateLimitState {
            consecutive_failures: 5,
            lockout_until: Some(now - 1_000),
            last_attempt_time: Some(now - 3 * MINUTE_MS),
        });
        let limiter = RateLimiter::new(store.clone());

        let status = limiter.status().await;
        assert_eq!(
            status,
            RateLimitStatus {
                is_locked: false,
                lockout_remaining_ms: 0,
                remaining_attempts: 0,
            }
        );
        // No fresh start applied; the counter stays.
        assert_eq!(store.stored().unwrap().consecutive_failures, 5);
    }

    #[tokio::test]
    async fn failure_after_expired_lockout_keeps_escalating() {
        let store = MemoryStore::new();
        let now = now_ms();
        store.seed(&RateLimitState {
            consecutive_failures: 5,
            lockout_until: Some(now - 1_000),
            last_attempt_time: Some(now - 3 * MINUTE_MS),
        });
        let limiter = RateLimiter::new(store.clone());

        limiter.record_failure().await.unwrap();

        let state = store.stored().unwrap();
        assert_eq!(state.consecutive_failures, 6);
        assert_eq!(
            state.lockout_until.unwrap() - state.last_attempt_time.unwrap(),
            4 * MINUTE_MS
        );
    }

    #[tokio::test]
    async fn cooldown_grants_fresh_start_even_mid_lockout() {
        let store = MemoryStore::new();
        let now = now_ms();
        store.seed(&RateLimitState {
            consecutive_failures: 9,
            lockout_until: Some(now + 10 * MINUTE_MS),
            last_attempt_time: Some(now - COOLDOWN_MS - 1),
        });
        let limiter = RateLimiter::new(store.clone());

        let status = limiter.status().await;
        assert_eq!(
            status,
            RateLimitStatus {
                is_locked: false,
                lockout_remaining_ms: 0,
                remaining_attempts: MAX_ATTEMPTS,
            }
        );
        // status() persisted the reset.
        assert_eq!(store.stored().unwrap(), RateLimitState::default());
    }

    #[tokio::test]
    async fn remaining_attempts_applies_cooldown_without_writing() {
        let store = MemoryStore::new();
        let now = now_ms();
        let seeded = RateLimitState {
            consecutive_failures: 9,
            lockout_until: Some(now + 10 * MINUTE_MS),
            last_attempt_time: Some(now - COOLDOWN_MS - 1),
        };
        store.seed(&seeded);
        let limiter = RateLimiter::new(store.clone());

        assert_eq!(limiter.remaining_attempts().await, MAX_ATTEMPTS);
        // Unlike status(), no write happened.
        assert_eq!(store.stored().unwrap(), seeded);
    }

    #[tokio::test]
    async fn failure_after_cooldown_restarts_the_counter() {
        let store = MemoryStore::new();
        let now = now_ms();
        store.seed(&RateLimitState {
            consecutive_failures: 9,
            lockout_until: Some(now + 10 * MINUTE_MS),
            last_attempt_time: Some(now - COOLDOWN_MS - 1),
        });
        let limiter = RateLimiter::new(store.clone());

        limiter.record_failure().await.unwrap();

        let state = store.stored().unwrap();
        assert_eq!(state.consecutive_failures, 1);
        assert_eq!(state.lockout_until, None);
    }

    #[tokio::test]
    async fn never_attempted_gets_no_fresh_start_treatment() {
        let store = MemoryStore::new();
        store.seed(&RateLimitState {
            consecutive_failures: 3,
            lockout_until: None,
            last_attempt_time: None,
        });
        let limiter = RateLimiter::new(store.clone());

        // Without a last-attempt stamp the counter stands as written.
        assert_eq!(limiter.remaining_attempts().await, 2);
    }

    #[tokio::test]
    async fn reset_is_idempotent() {
        let store = MemoryStore::new();
        let limiter = RateLimiter::new(store.clone());

        for _ in 0..7 {
            limiter.record_failure().await.unwrap();
        }
        limiter.reset().await.unwrap();
        assert_eq!(store.stored().unwrap(), RateLimitState::default());

        limiter.reset().await.unwrap();
        assert_eq!(store.stored().unwrap(), RateLimitState::default());
        assert_eq!(limiter.remaining_attempts().await, MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn unreadable_store_denies_remaining_attempts_but_not_locked() {
        let limiter = RateLimiter::new(Arc::new(FailingReadStore));

        let status = limiter.status().await;
        assert_eq!(
            status,
            RateLimitStatus {
                is_locked: false,
                lockout_remaining_ms: 0,
                remaining_attempts: 0,
            }
        );
    }

    #[tokio::test]
    async fn unreadable_store_fails_record_failure_closed() {
        let limiter = RateLimiter::new(Arc::new(FailingReadStore));

        let err = limiter.record_failure().await.unwrap_err();
        assert!(matches!(err, KeywardError::RateLimiterUnavailable));
    }

    #[tokio::test]
    async fn unwritable_store_denies_the_attempt() {
        let limiter = RateLimiter::new(Arc::new(FailingWriteStore));

        let err = limiter.record_failure().await.unwrap_err();
        assert!(matches!(err, KeywardError::RecordAttemptFailed));
    }

    #[tokio::test]
    async fn corrupt_row_counts_as_read_failure() {
        let store = MemoryStore::new();
        store
            .rows
            .lock()
            .unwrap()
            .insert(DEFAULT_ATTEMPTS_KEY.to_string(), "not json".to_string());
        let limiter = RateLimiter::new(store);

        assert_eq!(limiter.status().await.remaining_attempts, 0);
        assert!(matches!(
            limiter.record_failure().await.unwrap_err(),
            KeywardError::RateLimiterUnavailable
        ));
    }

    #[tokio::test]
    async fn runaway_counter_is_capped_at_24_hours() {
        let store = MemoryStore::new();
        let now = now_ms();
        store.seed(&RateLimitState {
            consecutive_failures: 100,
            lockout_until: Some(now - 1_000),
            last_attempt_time: Some(now - 2_000),
        });
        let limiter = RateLimiter::new(store.clone());

        limiter.record_failure().await.unwrap();

        let state = store.stored().unwrap();
        assert_eq!(state.consecutive_failures, 101);
        assert_eq!(
            state.lockout_until.unwrap() - state.last_attempt_time.unwrap(),
            MAX_LOCKOUT_MS
        );
    }

    #[tokio::test]
    async fn per_credential_keys_are_independent() {
        let store = MemoryStore::new();
        let primary = RateLimiter::new(store.clone());
        let secondary = RateLimiter::with_key(store.clone(), "profile_2_attempts");

        primary.record_failure().await.unwrap();
        primary.record_failure().await.unwrap();

        assert_eq!(primary.remaining_attempts().await, 3);
        assert_eq!(secondary.remaining_attempts().await, MAX_ATTEMPTS);
    }
}

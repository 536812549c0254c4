//! Login lockout accounting.
//!
//! Each account has at most one failure counter. The first failure opens a
//! window of `lock_duration`; further failures inside that window bump the
//! count without moving the window. Once the count reaches
//! `max_login_tries` the account is locked until the window closes, no matter
//! how many more attempts are made.
//!
//! ```rust,ignore
//! use bastion_core::services::LoginLockoutService;
//! use bastion_core::{LockoutConfig, SystemClock};
//!
//! let service = LoginLockoutService::new(repository, LockoutConfig::default(), Arc::new(SystemClock));
//!
//! if service.status(&account_id).await?.is_locked {
//!     // reject without checking the secret
//! }
//!
//! let status = service.record_failure(&account_id).await?;
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    AccountId, Clock, Error,
    repositories::FailureCounterRepository,
    storage::{FailureCounter, LockoutConfig, LockoutStatus, failure_counter_key},
};

/// Service for tracking failed logins and deciding lockout.
///
/// Safe to share across tasks; the only shared state is the counter store,
/// whose increment is atomic.
pub struct LoginLockoutService<C: FailureCounterRepository> {
    repository: Arc<C>,
    config: LockoutConfig,
    clock: Arc<dyn Clock>,
}

impl<C: FailureCounterRepository> LoginLockoutService<C> {
    pub fn new(repository: Arc<C>, config: LockoutConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &LockoutConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Current lockout status of an account.
    ///
    /// An expired counter reads as no failures at all. Always unlocked when
    /// the policy is disabled.
    pub async fn status(&self, account_id: &AccountId) -> Result<LockoutStatus, Error> {
        if !self.config.enabled {
            return Ok(LockoutStatus::unlocked(account_id));
        }

        let counter = self
            .repository
            .get(&failure_counter_key(account_id))
            .await?;

        Ok(self.compute_status(account_id, counter.as_ref(), self.clock.now()))
    }

    pub async fn is_locked(&self, account_id: &AccountId) -> Result<bool, Error> {
        Ok(self.status(account_id).await?.is_locked)
    }

    /// Count one failed attempt and return the resulting status.
    ///
    /// A no-op returning an unlocked status when the policy is disabled.
    pub async fn record_failure(&self, account_id: &AccountId) -> Result<LockoutStatus, Error> {
        if !self.config.enabled {
            return Ok(LockoutStatus::unlocked(account_id));
        }

        let now = self.clock.now();
        let counter = self
            .repository
            .increment(
                &failure_counter_key(account_id),
                now,
                self.config.lock_duration,
            )
            .await?;

        tracing::debug!(
            account_id = %account_id,
            failed_attempts = counter.count,
            expires_at = %counter.expires_at,
            "Recorded failed login"
        );

        Ok(self.compute_status(account_id, Some(&counter), now))
    }

    /// Forget all failures of an account after a successful login.
    pub async fn record_success(&self, account_id: &AccountId) -> Result<(), Error> {
        if !self.config.enabled {
            return Ok(());
        }

        self.repository
            .clear(&failure_counter_key(account_id))
            .await?;
        Ok(())
    }

    /// Clear the counter of an account regardless of its state.
    ///
    /// Returns `true` if the account was locked beforehand.
    pub async fn unlock(&self, account_id: &AccountId) -> Result<bool, Error> {
        if !self.config.enabled {
            return Ok(false);
        }

        let was_locked = self.is_locked(account_id).await?;
        self.repository
            .clear(&failure_counter_key(account_id))
            .await?;
        Ok(was_locked)
    }

    /// Start the background task that purges expired counters.
    ///
    /// Runs every `cleanup_interval` until `shutdown` changes. A zero interval
    /// logs an error and the task ends immediately.
    pub fn start_cleanup_task(
        &self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let clock = Arc::clone(&self.clock);
        let period = self.config.cleanup_interval;

        tokio::spawn(async move {
            if period.is_zero() {
                tracing::error!("Login failure cleanup not started: cleanup_interval is zero");
                return;
            }
            let mut interval_timer = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        match repository.purge_expired(clock.now()).await {
                            Ok(count) if count > 0 => {
                                tracing::info!(
                                    count = count,
                                    "Purged expired login failure counters"
                                );
                            }
                            Err(e) => {
                                tracing::warn!(
                                    error = %e,
                                    "Failed to purge expired login failure counters"
                                );
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down login lockout cleanup task");
                        break;
                    }
                }
            }
        })
    }

    fn compute_status(
        &self,
        account_id: &AccountId,
        counter: Option<&FailureCounter>,
        now: DateTime<Utc>,
    ) -> LockoutStatus {
        let Some(counter) = counter.filter(|c| c.is_active(now)) else {
            return LockoutStatus::unlocked(account_id);
        };

        let is_locked = counter.count >= self.config.max_login_tries;
        LockoutStatus {
            account_id: account_id.clone(),
            failed_attempts: counter.count,
            is_locked,
            locked_until: is_locked.then_some(counter.expires_at),
        }
    }
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote writes with linear-backoff retry.
//!
//! A [`RetryableMutation`] wraps one write executor. Each [`submit`] spawns
//! a background task that runs the executor and, on failure, retries after
//! `min(attempt * base_delay, max_delay)`. A newer submission supersedes an
//! older one: the older task stops retrying and never writes after the newer
//! value. Writes from one mutation never run concurrently.
//!
//! [`submit`]: RetryableMutation::submit

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use cs_remote::RemoteError;

use crate::config::RetryConfig;

/// Future returned by a write executor.
pub type WriteFuture = Pin<Box<dyn Future<Output = Result<(), RemoteError>> + Send>>;

/// Performs one remote write for a value.
pub type WriteExecutor<T> = Arc<dyn Fn(T) -> WriteFuture + Send + Sync>;

type SuccessHook<T> = Arc<dyn Fn(&T) + Send + Sync>;
type ErrorHook<T> = Arc<dyn Fn(&T, &RemoteError) + Send + Sync>;

/// When and how often failed writes are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Total attempts including the first. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// A policy that gives up after the first failure.
    pub fn disabled() -> Self {
        RetryPolicy { enabled: false, ..RetryPolicy::from(&RetryConfig::default()) }
    }

    /// Delay after the `failures`-th consecutive failure: `min(failures * base, max)`.
    /// With a 5s base, two failures put the attempts at 0s, 5s and 15s.
    pub fn delay_for(&self, failures: u32) -> Duration {
        self.base_delay.saturating_mul(failures).min(self.max_delay)
    }

    fn exhausted(&self, attempts: u32) -> bool {
        !self.enabled || self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy {
            enabled: config.enabled,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            max_attempts: config.max_attempts,
        }
    }
}

/// Observable progress of a mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationState {
    /// A write is queued, in flight or waiting to retry.
    pub pending: bool,
    /// Most recent failure message.
    pub last_error: Option<String>,
    /// Consecutive failures of the current value.
    pub retry_count: u32,
}

struct MutationInner<T> {
    name: String,
    executor: WriteExecutor<T>,
    policy: RetryPolicy,
    on_success: Option<SuccessHook<T>>,
    on_error: Option<ErrorHook<T>>,
    state: Mutex<MutationState>,
    generation: AtomicU64,
    attempts: AtomicU64,
    write_lock: tokio::sync::Mutex<()>,
    cancel: Mutex<CancellationToken>,
}

/// A retrying remote write. Clones share state.
pub struct RetryableMutation<T> {
    inner: Arc<MutationInner<T>>,
}

impl<T> Clone for RetryableMutation<T> {
    fn clone(&self) -> Self {
        RetryableMutation { inner: Arc::clone(&self.inner) }
    }
}

pub struct MutationBuilder<T> {
    name: String,
    executor: WriteExecutor<T>,
    policy: RetryPolicy,
    on_success: Option<SuccessHook<T>>,
    on_error: Option<ErrorHook<T>>,
}

impl<T: Clone + Send + Sync + 'static> MutationBuilder<T> {
    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Called once when a write lands.
    pub fn on_success(mut self, hook: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(hook));
        self
    }

    /// Called once when the policy gives up on a value.
    pub fn on_error(mut self, hook: impl Fn(&T, &RemoteError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> RetryableMutation<T> {
        RetryableMutation {
            inner: Arc::new(MutationInner {
                name: self.name,
                executor: self.executor,
                policy: self.policy,
                on_success: self.on_success,
                on_error: self.on_error,
                state: Mutex::new(MutationState::default()),
                generation: AtomicU64::new(0),
                attempts: AtomicU64::new(0),
                write_lock: tokio::sync::Mutex::new(()),
                cancel: Mutex::new(CancellationToken::new()),
            }),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> RetryableMutation<T> {
    pub fn builder(name: impl Into<String>, executor: WriteExecutor<T>) -> MutationBuilder<T> {
        MutationBuilder {
            name: name.into(),
            executor,
            policy: RetryPolicy::from(&RetryConfig::default()),
            on_success: None,
            on_error: None,
        }
    }

    /// Wraps an async closure as an executor.
    pub fn executor<F, Fut>(f: F) -> WriteExecutor<T>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), RemoteError>> + Send + 'static,
    {
        Arc::new(move |value| Box::pin(f(value)) as WriteFuture)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Queues a write of `value`, superseding any earlier value still
    /// pending. Must be called within a tokio runtime.
    pub fn submit(&self, value: T) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.inner.lock_state();
            state.pending = true;
            state.last_error = None;
            state.retry_count = 0;
        }
        let cancel = self.inner.cancel.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run(value, generation, cancel).await });
    }

    /// Stops all pending writes and retries. Later submissions run normally.
    pub fn cancel_pending(&self) {
        let previous = {
            let mut cancel = self.inner.cancel.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *cancel, CancellationToken::new())
        };
        previous.cancel();
        self.inner.lock_state().pending = false;
    }

    pub fn state(&self) -> MutationState {
        self.inner.lock_state().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lock_state().pending
    }

    /// Executor invocations so far, across all values.
    pub fn attempts(&self) -> u64 {
        self.inner.attempts.load(Ordering::SeqCst)
    }
}

impl<T: Clone + Send + Sync + 'static> MutationInner<T> {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, MutationState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    async fn run(self: Arc<Self>, value: T, generation: u64, cancel: CancellationToken) {
        let mut failures = 0u32;

        loop {
            if cancel.is_cancelled() {
                debug!(mutation = %self.name, "write cancelled");
                return;
            }

            let result = {
                let _guard = self.write_lock.lock().await;
                if !self.is_current(generation) {
                    debug!(mutation = %self.name, "write superseded");
                    return;
                }
                if cancel.is_cancelled() {
                    return;
                }
                self.attempts.fetch_add(1, Ordering::SeqCst);
                (self.executor)(value.clone()).await
            };

            match result {
                Ok(()) => {
                    if self.is_current(generation) {
                        *self.lock_state() = MutationState::default();
                    }
                    if let Some(hook) = &self.on_success {
                        hook(&value);
                    }
                    return;
                }
                Err(err) => {
                    failures = failures.saturating_add(1);
                    if !self.is_current(generation) {
                        return;
                    }
                    {
                        let mut state = self.lock_state();
                        state.last_error = Some(err.to_string());
                        state.retry_count = failures;
                    }

                    if self.policy.exhausted(failures) {
                        self.lock_state().pending = false;
                        error!(mutation = %self.name, attempts = failures, error = %err, "write failed");
                        if let Some(hook) = &self.on_error {
                            hook(&value, &err);
                        }
                        return;
                    }

                    let delay = self.policy.delay_for(failures);
                    warn!(
                        mutation = %self.name,
                        attempt = failures,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "write failed, retrying"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            debug!(mutation = %self.name, "retry cancelled");
                            return;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    if !self.is_current(generation) {
                        debug!(mutation = %self.name, "retry superseded");
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "mutation_tests.rs"]
mod tests;

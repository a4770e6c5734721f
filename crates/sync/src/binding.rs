// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Throttled bindings from observable fields to remote writes.
//!
//! A [`ThrottledReactiveBinding`] subscribes to an [`Observable`] and feeds
//! change notifications into a watch channel. A background task waits for
//! the first change, holds the throttle window open, then submits the value
//! current at the end of the window. Any number of edits inside one window
//! produce one write of the latest value.
//!
//! Scalar bindings write the field value itself. Subtree bindings run a
//! transform over the observed value once per write, so per-write
//! bookkeeping (such as a change counter) happens exactly once per write.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use cs_core::{Disposer, Observable};

use crate::mutation::RetryableMutation;

type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Where a binding reads its payload from.
trait BindingSource<T>: Send + Sync {
    fn watch(&self, notify: Box<dyn Fn() + Send + Sync>) -> Disposer;
    fn snapshot(&self) -> T;
}

struct ScalarSource<T> {
    observable: Observable<T>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> BindingSource<T> for ScalarSource<T> {
    fn watch(&self, notify: Box<dyn Fn() + Send + Sync>) -> Disposer {
        self.observable.subscribe(move |_| notify())
    }

    fn snapshot(&self) -> T {
        self.observable.get()
    }
}

struct SubtreeSource<S, T> {
    observable: Observable<S>,
    transform: Arc<dyn Fn(&S) -> T + Send + Sync>,
}

impl<S, T> BindingSource<T> for SubtreeSource<S, T>
where
    S: Clone + PartialEq + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    fn watch(&self, notify: Box<dyn Fn() + Send + Sync>) -> Disposer {
        self.observable.subscribe(move |_| notify())
    }

    fn snapshot(&self) -> T {
        let value = self.observable.get();
        (self.transform)(&value)
    }
}

/// Optional knobs for a binding.
pub struct BindingOptions<T> {
    pub throttle: Duration,
    /// Writes are skipped when this returns false.
    pub should_mutate: Option<Predicate<T>>,
    /// Submitted alongside the primary write with the same value.
    pub additional_mutation: Option<RetryableMutation<T>>,
    /// Log each write at info level.
    pub debug_save: bool,
}

impl<T> BindingOptions<T> {
    pub fn new(throttle: Duration) -> Self {
        BindingOptions { throttle, should_mutate: None, additional_mutation: None, debug_save: false }
    }

    pub fn should_mutate(mut self, pred: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.should_mutate = Some(Arc::new(pred));
        self
    }

    pub fn additional_mutation(mut self, mutation: RetryableMutation<T>) -> Self {
        self.additional_mutation = Some(mutation);
        self
    }

    pub fn debug_save(mut self, enabled: bool) -> Self {
        self.debug_save = enabled;
        self
    }
}

/// Object-safe control surface shared by every binding.
pub trait Binding: Send + Sync {
    fn name(&self) -> &str;
    fn set_enabled(&self, enabled: bool);
    fn is_enabled(&self) -> bool;
}

struct ActiveBinding {
    subscription: Disposer,
    cancel: CancellationToken,
}

/// Writes changes of an observed field to the remote store, at most once
/// per throttle window.
pub struct ThrottledReactiveBinding<T> {
    name: String,
    source: Arc<dyn BindingSource<T>>,
    mutation: RetryableMutation<T>,
    options: BindingOptions<T>,
    active: Mutex<Option<ActiveBinding>>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ThrottledReactiveBinding<T> {
    /// Binds a single observable field. Starts disabled.
    pub fn scalar(
        name: impl Into<String>,
        observable: Observable<T>,
        mutation: RetryableMutation<T>,
        options: BindingOptions<T>,
    ) -> Self {
        Self::with_source(name.into(), Arc::new(ScalarSource { observable }), mutation, options)
    }
}

impl<T: Clone + Send + Sync + 'static> ThrottledReactiveBinding<T> {
    /// Binds an observable subtree; `transform` builds the payload at write
    /// time. Starts disabled.
    pub fn subtree<S>(
        name: impl Into<String>,
        observable: Observable<S>,
        transform: impl Fn(&S) -> T + Send + Sync + 'static,
        mutation: RetryableMutation<T>,
        options: BindingOptions<T>,
    ) -> Self
    where
        S: Clone + PartialEq + Send + Sync + 'static,
    {
        let source = SubtreeSource { observable, transform: Arc::new(transform) };
        Self::with_source(name.into(), Arc::new(source), mutation, options)
    }

    fn with_source(
        name: String,
        source: Arc<dyn BindingSource<T>>,
        mutation: RetryableMutation<T>,
        options: BindingOptions<T>,
    ) -> Self {
        ThrottledReactiveBinding { name, source, mutation, options, active: Mutex::new(None) }
    }

    pub fn mutation(&self) -> &RetryableMutation<T> {
        &self.mutation
    }

    /// Subscribes and starts the throttle task. Idempotent.
    pub fn enable(&self) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if active.is_some() {
            return;
        }

        let (tx, rx) = watch::channel(0u64);
        let subscription = self.source.watch(Box::new(move || {
            tx.send_modify(|n| *n = n.wrapping_add(1));
        }));
        let cancel = CancellationToken::new();

        let writer = ThrottleWriter {
            name: self.name.clone(),
            source: Arc::clone(&self.source),
            mutation: self.mutation.clone(),
            additional: self.options.additional_mutation.clone(),
            should_mutate: self.options.should_mutate.clone(),
            debug_save: self.options.debug_save,
        };
        tokio::spawn(writer.run(rx, self.options.throttle, cancel.clone()));

        debug!(binding = %self.name, "binding enabled");
        *active = Some(ActiveBinding { subscription, cancel });
    }

    /// Unsubscribes and cancels pending writes. Idempotent.
    pub fn disable(&self) {
        let previous = self.active.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(active) = previous {
            active.cancel.cancel();
            active.subscription.dispose();
            self.mutation.cancel_pending();
            if let Some(additional) = &self.options.additional_mutation {
                additional.cancel_pending();
            }
            debug!(binding = %self.name, "binding disabled");
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Binding for ThrottledReactiveBinding<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_enabled(&self, enabled: bool) {
        if enabled {
            self.enable();
        } else {
            self.disable();
        }
    }

    fn is_enabled(&self) -> bool {
        self.active.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}

impl<T> Drop for ThrottledReactiveBinding<T> {
    fn drop(&mut self) {
        let active = self.active.get_mut().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(active) = active {
            active.cancel.cancel();
        }
    }
}

struct ThrottleWriter<T> {
    name: String,
    source: Arc<dyn BindingSource<T>>,
    mutation: RetryableMutation<T>,
    additional: Option<RetryableMutation<T>>,
    should_mutate: Option<Predicate<T>>,
    debug_save: bool,
}

impl<T: Clone + Send + Sync + 'static> ThrottleWriter<T> {
    async fn run(self, mut changes: watch::Receiver<u64>, window: Duration, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                changed = changes.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(window) => {}
            }
            changes.borrow_and_update();

            let payload = self.source.snapshot();
            if let Some(pred) = &self.should_mutate {
                if !pred(&payload) {
                    debug!(binding = %self.name, "write skipped");
                    continue;
                }
            }
            if self.debug_save {
                info!(binding = %self.name, "saving");
            }
            if let Some(additional) = &self.additional {
                additional.submit(payload.clone());
            }
            self.mutation.submit(payload);
        }
    }
}

#[cfg(test)]
#[path = "binding_tests.rs"]
mod tests;

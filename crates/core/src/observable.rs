// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Observable value cells.
//!
//! An [`Observable`] holds a value and notifies subscribers when a write
//! changes it. Writes that leave the value equal are silent, which is what
//! keeps remote echoes of a local edit from re-triggering writes.
//!
//! Subscribers run synchronously on the writing thread, after the value lock
//! is released. A subscriber may read or write the same cell.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    value: Mutex<T>,
    observers: Mutex<Vec<(u64, Observer<T>)>>,
    next_id: AtomicU64,
}

/// Shared handle to an observable value. Clones share the same cell.
pub struct Observable<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Observable { inner: Arc::clone(&self.inner) }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.inner.value.lock().unwrap_or_else(|e| e.into_inner());
        f.debug_tuple("Observable").field(&*value).finish()
    }
}

impl<T: Default + Clone + PartialEq + Send + 'static> Default for Observable<T> {
    fn default() -> Self {
        Observable::new(T::default())
    }
}

impl<T: Clone + PartialEq + Send + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Observable {
            inner: Arc::new(Inner {
                value: Mutex::new(value),
                observers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Returns a copy of the current value.
    pub fn get(&self) -> T {
        self.inner.value.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Reads the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.inner.value.lock().unwrap_or_else(|e| e.into_inner());
        f(&value)
    }

    /// Replaces the value. Returns true and notifies subscribers only if the
    /// new value differs from the old one.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.inner.value.lock().unwrap_or_else(|e| e.into_inner());
            if *current == value {
                return false;
            }
            *current = value.clone();
        }
        self.notify(&value);
        true
    }

    /// Mutates the value in place, notifying if the result differs.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let changed = {
            let mut current = self.inner.value.lock().unwrap_or_else(|e| e.into_inner());
            let mut next = current.clone();
            f(&mut next);
            if *current == next {
                None
            } else {
                *current = next.clone();
                Some(next)
            }
        };
        match changed {
            Some(value) => {
                self.notify(&value);
                true
            }
            None => false,
        }
    }

    /// Registers a change callback. The subscription lasts until the
    /// returned [`Disposer`] is disposed or dropped.
    pub fn subscribe(&self, observer: impl Fn(&T) + Send + Sync + 'static) -> Disposer {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner
            .observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(observer)));

        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        Disposer::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .observers
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .retain(|(observer_id, _)| *observer_id != id);
            }
        })
    }

    /// Number of live subscriptions.
    pub fn observer_count(&self) -> usize {
        self.inner.observers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn notify(&self, value: &T) {
        let observers: Vec<Observer<T>> = self
            .inner
            .observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(value);
        }
    }
}

/// Cancels a subscription when disposed or dropped.
#[must_use = "dropping a Disposer cancels its subscription"]
pub struct Disposer {
    dispose: Option<Box<dyn FnOnce() + Send>>,
}

impl Disposer {
    pub fn new(dispose: impl FnOnce() + Send + 'static) -> Self {
        Disposer { dispose: Some(Box::new(dispose)) }
    }

    /// A disposer with nothing to cancel.
    pub fn noop() -> Self {
        Disposer { dispose: None }
    }

    pub fn dispose(mut self) {
        self.run();
    }

    pub fn is_active(&self) -> bool {
        self.dispose.is_some()
    }

    fn run(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer").field("active", &self.is_active()).finish()
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        self.run();
    }
}

#[cfg(test)]
#[path = "observable_tests.rs"]
mod tests;

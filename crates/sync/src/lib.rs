// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! cosync: Document and group sync for collaborative classroom workspaces
//!
//! This crate keeps the local document, group and commentary stores in step
//! with a hierarchical remote store. Listeners mirror remote state into the
//! local stores; throttled bindings push local edits back out with retry.
//! A per-document monitor mode keeps the two directions from feeding each
//! other.

pub mod binding;
pub mod config;
pub mod context;
pub mod error;
pub mod facade;
pub mod listeners;
pub mod logging;
pub mod membership;
pub mod monitor;
pub mod mutation;
pub mod opener;
pub mod orchestrator;
pub mod presence;
pub mod resolver;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use binding::{Binding, BindingOptions, ThrottledReactiveBinding};
pub use config::{GroupsConfig, RetryConfig, SyncConfig};
pub use context::SyncContext;
pub use error::{Error, Result};
pub use facade::DocumentSyncFacade;
pub use listeners::Listener;
pub use membership::GroupMembership;
pub use monitor::{ContentPayload, DocumentMonitorRegistry};
pub use mutation::{MutationState, RetryPolicy, RetryableMutation};
pub use opener::{DocumentOpener, OpenRequest};
pub use orchestrator::ListenerOrchestrator;
pub use presence::Presence;
pub use resolver::{resolve, CorrectionScheduler, GroupConsistencyResolver, Resolution};
pub use session::SyncSession;

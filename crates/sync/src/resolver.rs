// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Group membership repair.
//!
//! [`resolve`] is a pure function over a groups snapshot. It trims
//! oversubscribed groups and detects users listed in more than one group.
//! [`GroupConsistencyResolver`] applies the resolved view locally and, when
//! the snapshot was inconsistent, schedules the corrective writes after a
//! short delay. A newer snapshot cancels a correction that has not run yet.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use cs_core::{parse_groups, Group, GroupUserState};

use crate::context::SyncContext;
use crate::membership::GroupMembership;

/// Outcome of resolving one groups snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Groups with every correction applied.
    pub groups: Vec<Group>,
    /// `(group_id, uid)` entries to delete.
    pub removals: Vec<(String, String)>,
    /// Users listed in more than one group.
    pub multi_group_users: BTreeSet<String>,
    /// Set when the current user is in several groups: the one to keep.
    pub keep_group: Option<String>,
}

impl Resolution {
    pub fn needs_correction(&self) -> bool {
        !self.removals.is_empty() || self.keep_group.is_some()
    }
}

/// Resolves a groups snapshot.
///
/// Groups over `max_size` first lose their `Removed` users, then their
/// newest users by `connected_timestamp` until `max_size` remain. Equal
/// timestamps keep snapshot order. When the current user is in several
/// groups the latest group id is kept if it is one of them, otherwise the
/// most recently joined. Other users in several groups stay only in the
/// group they joined most recently.
pub fn resolve(
    groups: Vec<Group>,
    current_uid: &str,
    latest_group_id: Option<&str>,
    max_size: usize,
) -> Resolution {
    let mut memberships: BTreeMap<&str, Vec<&Group>> = BTreeMap::new();
    for group in &groups {
        for user in &group.users {
            memberships.entry(user.id.as_str()).or_default().push(group);
        }
    }
    let multi_group_users: BTreeSet<String> = memberships
        .iter()
        .filter(|(_, groups)| groups.len() > 1)
        .map(|(uid, _)| uid.to_string())
        .collect();

    let keep_group = memberships
        .get(current_uid)
        .filter(|mine| mine.len() > 1)
        .and_then(|mine| choose_group(mine, current_uid, latest_group_id));

    // Only the current user's extra memberships are written back; everyone
    // else is placed in one group locally and repairs their own record.
    let mut kept: BTreeMap<String, String> = memberships
        .iter()
        .filter(|(uid, groups)| groups.len() > 1 && **uid != current_uid)
        .filter_map(|(uid, groups)| choose_group(groups, uid, None).map(|id| (uid.to_string(), id)))
        .collect();
    if let Some(keep) = &keep_group {
        kept.insert(current_uid.to_string(), keep.clone());
    }

    let mut removals = Vec::new();
    let mut resolved = Vec::with_capacity(groups.len());
    for mut group in groups {
        if group.users.len() > max_size {
            trim_group(&mut group, max_size, &mut removals);
        }
        group.users.retain(|user| kept.get(&user.id).is_none_or(|keep| *keep == group.id));
        resolved.push(group);
    }

    Resolution { groups: resolved, removals, multi_group_users, keep_group }
}

fn choose_group(groups: &[&Group], uid: &str, latest_group_id: Option<&str>) -> Option<String> {
    if let Some(latest) = latest_group_id {
        if groups.iter().any(|group| group.id == latest) {
            return Some(latest.to_string());
        }
    }
    groups
        .iter()
        .filter_map(|group| group.user(uid).map(|user| (user.connected_timestamp, group.id.clone())))
        .max_by_key(|(ts, _)| *ts)
        .map(|(_, id)| id)
}

fn trim_group(group: &mut Group, max_size: usize, removals: &mut Vec<(String, String)>) {
    let (stale, mut active): (Vec<_>, Vec<_>) =
        group.users.drain(..).partition(|user| user.state == GroupUserState::Removed);
    removals.extend(stale.into_iter().map(|user| (group.id.clone(), user.id)));

    if active.len() > max_size {
        active.sort_by_key(|user| user.connected_timestamp);
        for user in active.split_off(max_size) {
            removals.push((group.id.clone(), user.id));
        }
    }
    group.users = active;
}

/// Runs a correction after a delay unless a newer one replaces it.
pub struct CorrectionScheduler {
    delay: Duration,
    pending: Mutex<Option<CancellationToken>>,
}

impl CorrectionScheduler {
    pub fn new(delay: Duration) -> Self {
        CorrectionScheduler { delay, pending: Mutex::new(None) }
    }

    /// Schedules `correction`, cancelling any correction not yet started.
    pub fn schedule<F>(&self, correction: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        if let Some(previous) = self.lock().replace(token.clone()) {
            previous.cancel();
        }
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("group correction superseded");
                }
                _ = tokio::time::sleep(delay) => correction.await,
            }
        });
    }

    pub fn cancel(&self) {
        if let Some(token) = self.lock().take() {
            token.cancel();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for CorrectionScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Applies groups snapshots to the local store and repairs violations.
pub struct GroupConsistencyResolver {
    ctx: SyncContext,
    membership: Arc<GroupMembership>,
    scheduler: CorrectionScheduler,
}

impl GroupConsistencyResolver {
    pub fn new(ctx: SyncContext, membership: Arc<GroupMembership>) -> Self {
        let scheduler = CorrectionScheduler::new(ctx.config.correction_delay());
        GroupConsistencyResolver { ctx, membership, scheduler }
    }

    /// Resolves a raw groups snapshot, publishes the resolved groups and
    /// schedules any corrective writes.
    pub fn handle_snapshot(&self, snapshot: Option<&Value>) -> Resolution {
        let latest = self.ctx.stores.latest_group_id.get();
        let resolution = resolve(
            parse_groups(snapshot),
            self.ctx.uid(),
            latest.as_deref(),
            self.ctx.config.groups.max_group_size,
        );
        self.ctx.stores.groups.set_groups(resolution.groups.clone());

        if !resolution.needs_correction() {
            self.scheduler.cancel();
            return resolution;
        }

        for uid in &resolution.multi_group_users {
            debug!(uid = %uid, "user listed in several groups");
        }
        info!(
            removals = resolution.removals.len(),
            keep_group = ?resolution.keep_group,
            "scheduling group correction"
        );
        let membership = Arc::clone(&self.membership);
        let removals = resolution.removals.clone();
        let keep = resolution.keep_group.clone();
        self.scheduler.schedule(async move {
            if let Err(e) = membership.remove_users(&removals).await {
                warn!(error = %e, "failed to remove group users");
            }
            if let Some(keep) = keep {
                match membership.leave_other_groups(&keep).await {
                    Ok(left) => info!(keep = %keep, left, "left extra groups"),
                    Err(e) => warn!(keep = %keep, error = %e, "failed to leave extra groups"),
                }
            }
        });
        resolution
    }

    /// Drops any correction that has not run yet.
    pub fn cancel_pending(&self) {
        self.scheduler.cancel();
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;

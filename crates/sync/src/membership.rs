// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Joining and leaving groups.

use serde_json::{Map, Value};
use tracing::{debug, info};

use cs_core::records::{GroupRecord, GroupUserRecord, RecordSelf, RECORD_VERSION};
use cs_core::{escape_key, parse_groups};
use cs_remote::server_timestamp;

use crate::context::SyncContext;
use crate::error::Result;
use crate::presence::Presence;

/// Writes the current user's group membership and keeps presence armed on
/// the joined group.
pub struct GroupMembership {
    ctx: SyncContext,
    presence: Presence,
}

impl GroupMembership {
    pub fn new(ctx: SyncContext) -> Self {
        let presence = Presence::new(ctx.clone());
        GroupMembership { ctx, presence }
    }

    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    /// Adds the current user to `group_id`, creating the group if needed.
    ///
    /// The user is added even if the group is full; oversubscription is
    /// repaired by the consistency resolver.
    pub async fn join_group(&self, group_id: &str) -> Result<()> {
        let store = &self.ctx.store;
        let paths = &self.ctx.paths;
        let uid = self.ctx.uid().to_string();
        let identity = RecordSelf {
            class_hash: Some(self.ctx.user().class_hash.clone()),
            offering_id: Some(self.ctx.user().offering_id.clone()),
            group_id: Some(group_id.to_string()),
            ..RecordSelf::default()
        };

        // Recorded first so a resolver seeing both groups keeps this one.
        store.set(&paths.latest_group_id(&uid), Value::String(group_id.to_string())).await?;
        self.ctx.stores.latest_group_id.set(Some(group_id.to_string()));

        let group_path = paths.group(group_id);
        if store.get(&group_path).await?.is_none() {
            let record = GroupRecord {
                version: RECORD_VERSION.to_string(),
                self_: identity.clone(),
                ..GroupRecord::default()
            };
            store.set(&group_path, serde_json::to_value(&record)?).await?;
            debug!(group = %group_id, "created group");
        }

        let record = GroupUserRecord {
            version: RECORD_VERSION.to_string(),
            self_: RecordSelf { uid: Some(uid.clone()), ..identity },
            ..GroupUserRecord::default()
        };
        let mut value = serde_json::to_value(&record)?;
        if let Value::Object(fields) = &mut value {
            fields.insert("connectedTimestamp".into(), server_timestamp());
        }
        store.set(&paths.group_user(group_id, &uid), value).await?;

        self.presence.arm(group_id).await?;
        info!(group = %group_id, uid = %uid, "joined group");
        Ok(())
    }

    /// Removes the current user from every group and clears the latest
    /// group id.
    pub async fn leave_group(&self) -> Result<()> {
        self.presence.disarm().await?;
        let removed = self.leave_groups_except(None).await?;
        let uid = self.ctx.uid().to_string();
        self.ctx.store.set(&self.ctx.paths.latest_group_id(&uid), Value::Null).await?;
        self.ctx.stores.latest_group_id.set(None);
        info!(uid = %uid, groups = removed, "left group");
        Ok(())
    }

    /// Removes the current user from every group other than `keep`.
    pub async fn leave_other_groups(&self, keep: &str) -> Result<usize> {
        self.leave_groups_except(Some(keep)).await
    }

    /// Deletes the given `(group_id, uid)` entries in one update.
    pub async fn remove_users(&self, entries: &[(String, String)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut fields = Map::new();
        for (group_id, uid) in entries {
            fields.insert(format!("{}/users/{}", escape_key(group_id), escape_key(uid)), Value::Null);
        }
        self.ctx.store.update(&self.ctx.paths.groups(), fields).await?;
        Ok(())
    }

    async fn leave_groups_except(&self, keep: Option<&str>) -> Result<usize> {
        let uid = self.ctx.uid().to_string();
        let snapshot = self.ctx.store.get(&self.ctx.paths.groups()).await?;
        let entries: Vec<(String, String)> = parse_groups(snapshot.as_ref())
            .into_iter()
            .filter(|group| group.contains(&uid) && Some(group.id.as_str()) != keep)
            .map(|group| (group.id, uid.clone()))
            .collect();
        self.remove_users(&entries).await?;
        Ok(entries.len())
    }
}

#[cfg(test)]
#[path = "membership_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Group membership model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::records::GroupRecord;

/// Membership state of a user within a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupUserState {
    #[default]
    Active,
    Removed,
}

/// A user's membership record in one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupUser {
    pub id: String,
    pub connected_timestamp: i64,
    pub disconnected_timestamp: Option<i64>,
    pub state: GroupUserState,
}

impl GroupUser {
    pub fn new(id: impl Into<String>, connected_timestamp: i64) -> Self {
        GroupUser {
            id: id.into(),
            connected_timestamp,
            disconnected_timestamp: None,
            state: GroupUserState::Active,
        }
    }

    pub fn removed(mut self) -> Self {
        self.state = GroupUserState::Removed;
        self
    }

    pub fn is_active(&self) -> bool {
        self.state == GroupUserState::Active
    }

    /// Connected unless a disconnect was stamped after the last connect.
    pub fn is_connected(&self) -> bool {
        match self.disconnected_timestamp {
            Some(disconnected) => self.connected_timestamp > disconnected,
            None => true,
        }
    }
}

/// A small set of students working together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    pub id: String,
    pub users: Vec<GroupUser>,
}

impl Group {
    pub fn new(id: impl Into<String>, users: Vec<GroupUser>) -> Self {
        Group { id: id.into(), users }
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.users.iter().any(|u| u.id == uid)
    }

    pub fn user(&self, uid: &str) -> Option<&GroupUser> {
        self.users.iter().find(|u| u.id == uid)
    }

    pub fn active_users(&self) -> impl Iterator<Item = &GroupUser> {
        self.users.iter().filter(|u| u.is_active())
    }

    pub fn user_ids(&self) -> Vec<String> {
        self.users.iter().map(|u| u.id.clone()).collect()
    }

    fn from_record(id: &str, record: GroupRecord) -> Self {
        let users = record
            .users
            .into_iter()
            .map(|(uid, user)| GroupUser {
                id: uid,
                connected_timestamp: user.connected_timestamp,
                disconnected_timestamp: user.disconnected_timestamp,
                state: user.state.unwrap_or_default(),
            })
            .collect();
        Group { id: id.to_string(), users }
    }
}

/// Parses the `groups` subtree of an offering, in key order.
///
/// Malformed group entries are skipped.
pub fn parse_groups(value: Option<&Value>) -> Vec<Group> {
    let Some(Value::Object(map)) = value else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(id, raw)| {
            serde_json::from_value::<GroupRecord>(raw.clone())
                .ok()
                .map(|record| Group::from_record(id, record))
        })
        .collect()
}

#[cfg(test)]
#[path = "group_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The signed-in user.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserKind {
    #[default]
    Student,
    Teacher,
}

/// Identity and class context of the current user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: UserKind,
    pub portal: String,
    pub class_hash: String,
    pub offering_id: String,
}

impl User {
    pub fn student(
        id: impl Into<String>,
        class_hash: impl Into<String>,
        offering_id: impl Into<String>,
    ) -> Self {
        User {
            id: id.into(),
            name: String::new(),
            kind: UserKind::Student,
            portal: "localhost".to_string(),
            class_hash: class_hash.into(),
            offering_id: offering_id.into(),
        }
    }

    pub fn teacher(
        id: impl Into<String>,
        class_hash: impl Into<String>,
        offering_id: impl Into<String>,
    ) -> Self {
        User { kind: UserKind::Teacher, ..User::student(id, class_hash, offering_id) }
    }

    pub fn is_teacher(&self) -> bool {
        self.kind == UserKind::Teacher
    }
}

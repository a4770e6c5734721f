// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Online/offline tracking for the current user's group membership.
//!
//! While armed, the store holds an on-disconnect write that stamps
//! `disconnectedTimestamp` on the user's group record, and every reconnect
//! rewrites `connectedTimestamp` and re-arms that write.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Map;
use tracing::{debug, warn};

use cs_remote::{server_timestamp, EventKind, ListenerId, RemoteEvent, RemoteStore, CONNECTED_PATH};

use crate::context::SyncContext;
use crate::error::Result;

struct Armed {
    group_id: String,
    listener: ListenerId,
}

pub struct Presence {
    ctx: SyncContext,
    armed: Mutex<Option<Armed>>,
}

impl Presence {
    pub fn new(ctx: SyncContext) -> Self {
        Presence { ctx, armed: Mutex::new(None) }
    }

    /// Group whose membership record is currently tracked.
    pub fn group_id(&self) -> Option<String> {
        self.lock().as_ref().map(|armed| armed.group_id.clone())
    }

    pub fn is_armed(&self) -> bool {
        self.lock().is_some()
    }

    /// Tracks presence on `group_id`, replacing any earlier group.
    pub async fn arm(&self, group_id: &str) -> Result<()> {
        self.disarm().await?;

        let user_path = self.ctx.paths.group_user(group_id, self.ctx.uid());
        arm_disconnect(self.ctx.store.as_ref(), &user_path).await?;

        let was_connected = Arc::new(AtomicBool::new(self.ctx.store.is_connected()));
        let store = Arc::clone(&self.ctx.store);
        let path = user_path.clone();
        let listener = self.ctx.store.on(
            CONNECTED_PATH,
            EventKind::Value,
            Arc::new(move |event: &RemoteEvent| {
                let connected = event.value.as_ref().and_then(|v| v.as_bool()).unwrap_or(false);
                let previous = was_connected.swap(connected, Ordering::SeqCst);
                if connected && !previous {
                    reconnect(Arc::clone(&store), path.clone());
                }
            }),
        );

        debug!(group = %group_id, "presence armed");
        *self.lock() = Some(Armed { group_id: group_id.to_string(), listener });
        Ok(())
    }

    /// Stops tracking and cancels the pending disconnect write.
    pub async fn disarm(&self) -> Result<()> {
        let armed = self.lock().take();
        let Some(armed) = armed else {
            return Ok(());
        };
        self.ctx.store.off(armed.listener);
        let user_path = self.ctx.paths.group_user(&armed.group_id, self.ctx.uid());
        self.ctx.store.cancel_on_disconnect(&format!("{user_path}/disconnectedTimestamp")).await?;
        debug!(group = %armed.group_id, "presence disarmed");
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Armed>> {
        self.armed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Presence {
    fn drop(&mut self) {
        if let Some(armed) = self.armed.get_mut().unwrap_or_else(|e| e.into_inner()).take() {
            self.ctx.store.off(armed.listener);
        }
    }
}

async fn arm_disconnect(store: &dyn RemoteStore, user_path: &str) -> Result<()> {
    store.on_disconnect_set(&format!("{user_path}/disconnectedTimestamp"), server_timestamp()).await?;
    Ok(())
}

fn reconnect(store: Arc<dyn RemoteStore>, user_path: String) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        warn!(path = %user_path, "reconnected outside a runtime, presence not refreshed");
        return;
    };
    handle.spawn(async move {
        let mut fields = Map::new();
        fields.insert("connectedTimestamp".into(), server_timestamp());
        let result = async {
            store.update(&user_path, fields).await?;
            arm_disconnect(store.as_ref(), &user_path).await
        }
        .await;
        match result {
            Ok(()) => debug!(path = %user_path, "presence refreshed"),
            Err(e) => warn!(path = %user_path, error = %e, "failed to refresh presence"),
        }
    });
}

#[cfg(test)]
#[path = "presence_tests.rs"]
mod tests;

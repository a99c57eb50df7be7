//! Application state: the stored tables that persist across interactions.
//!
//! One upload per table kind lives for the session; every interaction reads
//! a snapshot and recomputes forward. Replacement and clearing swap the
//! whole table under a write lock, so a reader never observes a
//! half-replaced table. No ambient globals - the state object is owned by
//! the server and passed into each handler.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::table::{AgentEvalRecord, MemberRecord};

/// Shared, cheaply clonable handle to the stored tables.
#[derive(Clone, Default)]
pub struct AppState {
    members: Arc<RwLock<Option<Arc<Vec<MemberRecord>>>>>,
    agent_evals: Arc<RwLock<Option<Arc<Vec<AgentEvalRecord>>>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored member table atomically.
    pub async fn set_members(&self, records: Vec<MemberRecord>) {
        *self.members.write().await = Some(Arc::new(records));
    }

    /// Snapshot of the stored member table, if one was uploaded.
    pub async fn members(&self) -> Option<Arc<Vec<MemberRecord>>> {
        self.members.read().await.clone()
    }

    /// Discard the stored member table.
    pub async fn clear_members(&self) {
        *self.members.write().await = None;
    }

    /// Replace the stored agent-evaluation table atomically.
    pub async fn set_agent_evals(&self, records: Vec<AgentEvalRecord>) {
        *self.agent_evals.write().await = Some(Arc::new(records));
    }

    /// Snapshot of the stored agent-evaluation table, if one was uploaded.
    pub async fn agent_evals(&self) -> Option<Arc<Vec<AgentEvalRecord>>> {
        self.agent_evals.read().await.clone()
    }

    /// Discard the stored agent-evaluation table.
    pub async fn clear_agent_evals(&self) {
        *self.agent_evals.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_replaces_table() {
        let state = AppState::new();
        assert!(state.members().await.is_none());

        state.set_members(vec![]).await;
        assert!(state.members().await.is_some());

        let record = MemberRecord {
            member_status: "Active".into(),
            gender: "Female".into(),
            clinic_name: "North".into(),
            dob: None,
            created_date: None,
            activation_date: None,
            age: Some(30),
        };
        state.set_members(vec![record]).await;
        assert_eq!(state.members().await.unwrap().len(), 1);

        state.clear_members().await;
        assert!(state.members().await.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_survives_replacement() {
        let state = AppState::new();
        state.set_agent_evals(vec![]).await;
        let snapshot = state.agent_evals().await.unwrap();
        state.clear_agent_evals().await;
        // The old snapshot is still intact for an in-flight reader.
        assert_eq!(snapshot.len(), 0);
    }
}

//! In-memory reference backend for the storage ports.
//!
//! Used by the integration tests and by POC embeddings that have no
//! database behind them; production deployments implement the ports
//! against their own persistence.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::ports::{
    AuditSink, GeometryStore, LockStore, Result, RuleStore, SuggestionStore,
};
use crate::records::{EvaluationLock, LockKind, SourceGeometryRecord, ZoningRule};
use crate::suggestion::OverlaySuggestion;

#[derive(Default)]
pub struct InMemoryGeometryStore {
    records: Arc<RwLock<Vec<SourceGeometryRecord>>>,
}

impl InMemoryGeometryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, record: SourceGeometryRecord) {
        self.records.write().await.push(record);
    }
}

#[async_trait]
impl GeometryStore for InMemoryGeometryStore {
    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<SourceGeometryRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryRuleStore {
    rules: Arc<RwLock<Vec<ZoningRule>>>,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, rule: ZoningRule) {
        self.rules.write().await.push(rule);
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn rules_for_zone(&self, zone_code: &str) -> Result<Vec<ZoningRule>> {
        Ok(self
            .rules
            .read()
            .await
            .iter()
            .filter(|r| {
                r.is_published
                    && r.review_status == "approved"
                    && r.zone_code() == Some(zone_code)
            })
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemorySuggestionStore {
    rows: Arc<RwLock<Vec<OverlaySuggestion>>>,
}

impl InMemorySuggestionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all stored rows, for assertions.
    pub async fn all(&self) -> Vec<OverlaySuggestion> {
        self.rows.read().await.clone()
    }

    pub async fn set_status(
        &self,
        source_geometry_id: Uuid,
        code: &str,
        status: crate::suggestion::SuggestionStatus,
    ) {
        let mut rows = self.rows.write().await;
        if let Some(row) = rows
            .iter_mut()
            .find(|r| r.source_geometry_id == source_geometry_id && r.code == code)
        {
            row.status = status;
        }
    }
}

#[async_trait]
impl SuggestionStore for InMemorySuggestionStore {
    async fn list_for_geometry(
        &self,
        project_id: Uuid,
        source_geometry_id: Uuid,
    ) -> Result<Vec<OverlaySuggestion>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|r| r.project_id == project_id && r.source_geometry_id == source_geometry_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, suggestion: &OverlaySuggestion) -> Result<()> {
        self.rows.write().await.push(suggestion.clone());
        Ok(())
    }

    async fn update(&self, suggestion: &OverlaySuggestion) -> Result<()> {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|r| {
            r.project_id == suggestion.project_id
                && r.source_geometry_id == suggestion.source_geometry_id
                && r.code == suggestion.code
        }) {
            Some(row) => {
                *row = suggestion.clone();
                Ok(())
            }
            None => Err(crate::error::OverlayError::NotFound(format!(
                "suggestion {} for geometry {}",
                suggestion.code, suggestion.source_geometry_id
            ))),
        }
    }
}

#[derive(Default)]
pub struct InMemoryLockStore {
    locks: Arc<RwLock<HashMap<(Uuid, LockKind), EvaluationLock>>>,
}

impl InMemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, source_geometry_id: Uuid, kind: LockKind) -> Option<EvaluationLock> {
        self.locks
            .read()
            .await
            .get(&(source_geometry_id, kind))
            .cloned()
    }
}

#[async_trait]
impl LockStore for InMemoryLockStore {
    async fn acquire(
        &self,
        source_geometry_id: Uuid,
        kind: LockKind,
    ) -> Result<EvaluationLock> {
        let lock = EvaluationLock {
            source_geometry_id,
            kind,
            is_active: true,
            acquired_at: Utc::now(),
            released_at: None,
        };
        self.locks
            .write()
            .await
            .insert((source_geometry_id, kind), lock.clone());
        Ok(lock)
    }

    async fn release(&self, source_geometry_id: Uuid, kind: LockKind) -> Result<()> {
        if let Some(lock) = self.locks.write().await.get_mut(&(source_geometry_id, kind)) {
            lock.is_active = false;
            lock.released_at = Some(Utc::now());
        }
        Ok(())
    }
}

/// One recorded audit event.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub project_id: Uuid,
    pub event_type: String,
    pub baseline_seconds: Option<f64>,
    pub actual_seconds: Option<f64>,
    pub context: Value,
}

#[derive(Default)]
pub struct InMemoryAuditSink {
    events: Arc<RwLock<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn append_event(
        &self,
        project_id: Uuid,
        event_type: &str,
        baseline_seconds: Option<f64>,
        actual_seconds: Option<f64>,
        context: &Value,
    ) -> Result<()> {
        self.events.write().await.push(AuditEvent {
            project_id,
            event_type: event_type.to_string(),
            baseline_seconds,
            actual_seconds,
            context: context.clone(),
        });
        Ok(())
    }
}

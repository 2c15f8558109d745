use std::sync::Arc;

use async_trait::async_trait;

use super::{RequestHandler, Service};
use crate::repositories::snapshot::SnapshotRepository;
use crate::settings;

pub enum SnapshotRequest {
    Persist,
}

#[derive(Clone)]
pub struct SnapshotRequestHandler {
    repository: Arc<SnapshotRepository>,
    enabled: bool,
}

impl SnapshotRequestHandler {
    pub fn new(snapshot: settings::Snapshot, db_path: String) -> Self {
        let repository = Arc::new(SnapshotRepository::new(
            snapshot.url,
            snapshot.auth_token,
            db_path,
        ));

        SnapshotRequestHandler {
            repository,
            enabled: snapshot.enabled,
        }
    }

    // Best effort only: a failed upload is logged and dropped, it must never
    // reach the request that triggered it.
    async fn persist_snapshot(&self) {
        if !self.enabled {
            log::debug!("Snapshot sync disabled, skipping persist.");
            return;
        }

        match self.repository.persist().await {
            Ok(()) => log::info!("Persisted database snapshot."),
            Err(e) => log::warn!("Could not persist snapshot: {}", e),
        }
    }
}

#[async_trait]
impl RequestHandler<SnapshotRequest> for SnapshotRequestHandler {
    async fn handle_request(&self, request: SnapshotRequest) {
        match request {
            SnapshotRequest::Persist => self.persist_snapshot().await,
        }
    }
}

pub struct SnapshotService;

impl SnapshotService {
    pub fn new() -> Self {
        SnapshotService {}
    }
}

#[async_trait]
impl Service<SnapshotRequest, SnapshotRequestHandler> for SnapshotService {}

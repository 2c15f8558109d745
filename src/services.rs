use async_trait::async_trait;
use sqlx::SqlitePool;
use tokio::sync::mpsc;

use crate::settings::Settings;

mod http;
mod leads;
mod snapshot;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Already registered: {0}")]
    Duplicate(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Communication error: {0} - {1}")]
    Communication(String, String),
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

pub async fn start_services(
    pool: SqlitePool,
    settings: Settings,
    listen: String,
) -> Result<(), anyhow::Error> {
    let (lead_tx, mut lead_rx) = mpsc::channel(512);
    let (snapshot_tx, mut snapshot_rx) = mpsc::channel(512);

    let mut lead_service = leads::LeadService::new();
    let mut snapshot_service = snapshot::SnapshotService::new();

    println!("[*] Starting snapshot service.");
    let snapshot_settings = settings.snapshot.clone();
    let db_path = settings.sqlite.path.clone();
    tokio::spawn(async move {
        snapshot_service
            .run(
                snapshot::SnapshotRequestHandler::new(snapshot_settings, db_path),
                &mut snapshot_rx,
            )
            .await;
    });

    println!("[*] Starting lead service.");
    let lead_pool_clone = pool.clone();
    let lead_snapshot_tx = snapshot_tx.clone();
    let link_base = settings.referral.link_base.clone();
    tokio::spawn(async move {
        lead_service
            .run(
                leads::LeadRequestHandler::new(lead_pool_clone, link_base, lead_snapshot_tx),
                &mut lead_rx,
            )
            .await;
    });

    println!("[*] Starting HTTP server.");
    http::start_http_server(listen, lead_tx.clone()).await?;

    Ok(())
}

use anyhow::bail;
use reqwest;

pub struct SnapshotRepository {
    url: String,
    auth_token: String,
    db_path: String,
    client: reqwest::Client,
}

impl SnapshotRepository {
    pub fn new(url: String, auth_token: String, db_path: String) -> Self {
        Self {
            url,
            auth_token,
            db_path,
            client: reqwest::Client::new(),
        }
    }

    pub async fn persist(&self) -> Result<(), anyhow::Error> {
        let snapshot = tokio::fs::read(&self.db_path).await?;

        let response = self
            .client
            .put(format!("{}/snapshots/latest", self.url))
            .bearer_auth(&self.auth_token)
            .body(snapshot)
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("Snapshot upload rejected: {}.", response.status());
        }

        Ok(())
    }

    // Returns false when the remote has no snapshot yet; the caller starts
    // from an empty database in that case.
    pub async fn restore(&self) -> Result<bool, anyhow::Error> {
        let response = self
            .client
            .get(format!("{}/snapshots/latest", self.url))
            .bearer_auth(&self.auth_token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            bail!("Snapshot download failed: {}.", response.status());
        }

        let snapshot = response.bytes().await?;
        tokio::fs::write(&self.db_path, &snapshot).await?;

        Ok(true)
    }
}

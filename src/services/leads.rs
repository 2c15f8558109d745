use async_trait::async_trait;
use sqlx::SqlitePool;
use tokio::sync::{mpsc, oneshot};

use super::snapshot::SnapshotRequest;
use super::{RequestHandler, Service, ServiceError};
use crate::models::leads::{Dataset, LeadLookup, LeadPage, NewLead, RegisteredLead};
use crate::repositories::leads::{LeadRepository, LedgerError};

pub enum LeadRequest {
    Register {
        new_lead: NewLead,
        response: oneshot::Sender<Result<RegisteredLead, ServiceError>>,
    },
    CreditReferral {
        referral_code: String,
        response: oneshot::Sender<Result<u64, ServiceError>>,
    },
    Lookup {
        email: String,
        ip_address: String,
        response: oneshot::Sender<Result<LeadLookup, ServiceError>>,
    },
    AffiliateLink {
        email: String,
        ip_address: String,
        response: oneshot::Sender<Result<String, ServiceError>>,
    },
    ListPage {
        dataset: Dataset,
        page: u32,
        per_page: u32,
        response: oneshot::Sender<Result<LeadPage, ServiceError>>,
    },
}

impl From<LedgerError> for ServiceError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::Validation(reason) => ServiceError::Validation(reason),
            LedgerError::Duplicate { email, ip_address } => {
                ServiceError::Duplicate(format!("{} at {}", email, ip_address))
            }
            LedgerError::NotFound => {
                ServiceError::NotFound("no lead matches that email and IP address".to_string())
            }
            LedgerError::Storage(e) => ServiceError::Database(e.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct LeadRequestHandler {
    repository: LeadRepository,
    snapshot_channel: mpsc::Sender<SnapshotRequest>,
}

impl LeadRequestHandler {
    pub fn new(
        sql_conn: SqlitePool,
        link_base: String,
        snapshot_channel: mpsc::Sender<SnapshotRequest>,
    ) -> Self {
        let repository = LeadRepository::new(sql_conn, link_base);

        LeadRequestHandler {
            repository,
            snapshot_channel,
        }
    }

    async fn register(&self, new_lead: NewLead) -> Result<RegisteredLead, ServiceError> {
        let registered = self.repository.insert_lead(&new_lead).await?;
        self.notify_snapshot();

        Ok(registered)
    }

    async fn credit_referral(&self, referral_code: &str) -> Result<u64, ServiceError> {
        let credited = self.repository.credit_referral(referral_code).await?;
        if credited == 0 {
            log::warn!("Referral code matched no lead: {}", referral_code);
        }
        self.notify_snapshot();

        Ok(credited)
    }

    async fn lookup(&self, email: &str, ip_address: &str) -> Result<LeadLookup, ServiceError> {
        Ok(self.repository.find_lead(email, ip_address).await?)
    }

    async fn affiliate_link(&self, email: &str, ip_address: &str) -> Result<String, ServiceError> {
        Ok(self.repository.affiliate_link(email, ip_address).await?)
    }

    async fn list_page(
        &self,
        dataset: Dataset,
        page: u32,
        per_page: u32,
    ) -> Result<LeadPage, ServiceError> {
        Ok(self.repository.list_page(dataset, page, per_page).await?)
    }

    // Fire and forget: snapshot failures are the snapshot service's problem,
    // never the caller's.
    fn notify_snapshot(&self) {
        let snapshot_channel = self.snapshot_channel.clone();

        tokio::spawn(async move {
            let _ = snapshot_channel.send(SnapshotRequest::Persist).await;
        });
    }
}

#[async_trait]
impl RequestHandler<LeadRequest> for LeadRequestHandler {
    async fn handle_request(&self, request: LeadRequest) {
        match request {
            LeadRequest::Register { new_lead, response } => {
                let result = self.register(new_lead).await;
                let _ = response.send(result);
            }
            LeadRequest::CreditReferral {
                referral_code,
                response,
            } => {
                let result = self.credit_referral(&referral_code).await;
                let _ = response.send(result);
            }
            LeadRequest::Lookup {
                email,
                ip_address,
                response,
            } => {
                let result = self.lookup(&email, &ip_address).await;
                let _ = response.send(result);
            }
            LeadRequest::AffiliateLink {
                email,
                ip_address,
                response,
            } => {
                let result = self.affiliate_link(&email, &ip_address).await;
                let _ = response.send(result);
            }
            LeadRequest::ListPage {
                dataset,
                page,
                per_page,
                response,
            } => {
                let result = self.list_page(dataset, page, per_page).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct LeadService;

impl LeadService {
    pub fn new() -> Self {
        LeadService {}
    }
}

#[async_trait]
impl Service<LeadRequest, LeadRequestHandler> for LeadService {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::leads::init_schema;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_handler() -> (LeadRequestHandler, mpsc::Receiver<SnapshotRequest>) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        init_schema(&pool).await.expect("schema");

        let (snapshot_tx, snapshot_rx) = mpsc::channel(8);
        let handler = LeadRequestHandler::new(
            pool,
            "https://leadledger.test/signup".to_string(),
            snapshot_tx,
        );

        (handler, snapshot_rx)
    }

    fn new_lead(email: &str, ip_address: &str) -> NewLead {
        NewLead {
            email: email.to_string(),
            ip_address: ip_address.to_string(),
            name: "Test Lead".to_string(),
            phone: "+1-555-0100".to_string(),
            question: "Where do I sign?".to_string(),
            referral_code: None,
        }
    }

    #[tokio::test]
    async fn register_responds_and_requests_a_snapshot() {
        let (handler, mut snapshot_rx) = test_handler().await;
        let (response_tx, response_rx) = oneshot::channel();

        handler
            .handle_request(LeadRequest::Register {
                new_lead: new_lead("a@example.com", "1.2.3.4"),
                response: response_tx,
            })
            .await;

        let registered = response_rx.await.unwrap().unwrap();
        assert_eq!(registered.lead.email, "a@example.com");
        assert!(!registered.referral_applied);
        assert!(matches!(
            snapshot_rx.recv().await,
            Some(SnapshotRequest::Persist)
        ));
    }

    #[tokio::test]
    async fn duplicate_registration_surfaces_as_duplicate() {
        let (handler, mut snapshot_rx) = test_handler().await;

        let (first_tx, first_rx) = oneshot::channel();
        handler
            .handle_request(LeadRequest::Register {
                new_lead: new_lead("a@example.com", "1.2.3.4"),
                response: first_tx,
            })
            .await;
        first_rx.await.unwrap().unwrap();
        let _ = snapshot_rx.recv().await;

        let (second_tx, second_rx) = oneshot::channel();
        handler
            .handle_request(LeadRequest::Register {
                new_lead: new_lead("a@example.com", "1.2.3.4"),
                response: second_tx,
            })
            .await;

        let result = second_rx.await.unwrap();
        assert!(matches!(result, Err(ServiceError::Duplicate(_))));
        assert!(snapshot_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn credit_reports_the_matched_count() {
        let (handler, _snapshot_rx) = test_handler().await;

        let (register_tx, register_rx) = oneshot::channel();
        handler
            .handle_request(LeadRequest::Register {
                new_lead: new_lead("a@example.com", "1.2.3.4"),
                response: register_tx,
            })
            .await;
        register_rx.await.unwrap().unwrap();

        let (credit_tx, credit_rx) = oneshot::channel();
        handler
            .handle_request(LeadRequest::CreditReferral {
                referral_code: "1234".to_string(),
                response: credit_tx,
            })
            .await;
        assert_eq!(credit_rx.await.unwrap().unwrap(), 1);

        let (miss_tx, miss_rx) = oneshot::channel();
        handler
            .handle_request(LeadRequest::CreditReferral {
                referral_code: "00000000".to_string(),
                response: miss_tx,
            })
            .await;
        assert_eq!(miss_rx.await.unwrap().unwrap(), 0);
    }

    #[tokio::test]
    async fn affiliate_link_round_trips_through_the_handler() {
        let (handler, _snapshot_rx) = test_handler().await;

        let (register_tx, register_rx) = oneshot::channel();
        handler
            .handle_request(LeadRequest::Register {
                new_lead: new_lead("a@example.com", "192.168.0.1"),
                response: register_tx,
            })
            .await;
        register_rx.await.unwrap().unwrap();

        let (link_tx, link_rx) = oneshot::channel();
        handler
            .handle_request(LeadRequest::AffiliateLink {
                email: "a@example.com".to_string(),
                ip_address: "192.168.0.1".to_string(),
                response: link_tx,
            })
            .await;
        assert_eq!(
            link_rx.await.unwrap().unwrap(),
            "https://leadledger.test/signup?ref=19216801"
        );

        let (missing_tx, missing_rx) = oneshot::channel();
        handler
            .handle_request(LeadRequest::AffiliateLink {
                email: "b@example.com".to_string(),
                ip_address: "192.168.0.1".to_string(),
                response: missing_tx,
            })
            .await;
        assert!(matches!(
            missing_rx.await.unwrap(),
            Err(ServiceError::NotFound(_))
        ));
    }
}

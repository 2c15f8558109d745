use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tower_http::trace::TraceLayer;

use super::leads::LeadRequest;
use super::ServiceError;
use crate::models::leads::NewLead;

mod leads;

#[derive(Clone)]
struct AppState {
    lead_channel: mpsc::Sender<LeadRequest>,
}

fn error_response(error: ServiceError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match error {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::Duplicate(_) => StatusCode::CONFLICT,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(json!({"error": error.to_string()})))
}

fn channel_error(details: String) -> (StatusCode, Json<serde_json::Value>) {
    error_response(ServiceError::Communication("http".to_string(), details))
}

async fn register(State(state): State<AppState>, Json(req): Json<NewLead>) -> impl IntoResponse {
    let (lead_tx, lead_rx) = oneshot::channel();

    let send_result = state
        .lead_channel
        .send(LeadRequest::Register {
            new_lead: req,
            response: lead_tx,
        })
        .await;
    if let Err(e) = send_result {
        return channel_error(e.to_string());
    }

    match lead_rx.await {
        Ok(Ok(registered)) => (
            StatusCode::CREATED,
            Json(json!({
                "status": "ok",
                "lead_id": registered.lead.id,
                "referral_applied": registered.referral_applied
            })),
        ),
        Ok(Err(service_error)) => error_response(service_error),
        Err(e) => channel_error(e.to_string()),
    }
}

#[derive(Deserialize)]
struct TrackReferral {
    referral_code: String,
}

async fn track_referral(
    State(state): State<AppState>,
    Json(req): Json<TrackReferral>,
) -> impl IntoResponse {
    let (credit_tx, credit_rx) = oneshot::channel();

    let send_result = state
        .lead_channel
        .send(LeadRequest::CreditReferral {
            referral_code: req.referral_code,
            response: credit_tx,
        })
        .await;
    if let Err(e) = send_result {
        return channel_error(e.to_string());
    }

    match credit_rx.await {
        Ok(Ok(credited)) => (
            StatusCode::OK,
            Json(json!({"status": "ok", "credited": credited})),
        ),
        Ok(Err(service_error)) => error_response(service_error),
        Err(e) => channel_error(e.to_string()),
    }
}

pub async fn start_http_server(
    listen: String,
    lead_channel: mpsc::Sender<LeadRequest>,
) -> Result<(), anyhow::Error> {
    let app_state = AppState { lead_channel };

    let app = Router::new()
        .route("/register", post(register))
        .route("/track-referral", post(track_referral))
        .route("/leads/lookup", get(leads::get_lookup))
        .route("/leads/affiliate-link", get(leads::get_affiliate_link))
        .route("/data", get(leads::get_data))
        .route("/health", get(|| async { "OK" }))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    println!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

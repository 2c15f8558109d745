use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;

use super::{channel_error, error_response, AppState};
use crate::models::leads::Dataset;
use crate::services::leads::LeadRequest;

#[derive(Deserialize)]
pub struct IdentityQuery {
    email: String,
    ip_address: String,
}

pub async fn get_lookup(
    State(state): State<AppState>,
    Query(query): Query<IdentityQuery>,
) -> impl IntoResponse {
    let (lookup_tx, lookup_rx) = oneshot::channel();

    let send_result = state
        .lead_channel
        .send(LeadRequest::Lookup {
            email: query.email,
            ip_address: query.ip_address,
            response: lookup_tx,
        })
        .await;
    if let Err(e) = send_result {
        return channel_error(e.to_string());
    }

    match lookup_rx.await {
        Ok(Ok(lookup)) => (StatusCode::OK, Json(json!(lookup))),
        Ok(Err(service_error)) => error_response(service_error),
        Err(e) => channel_error(e.to_string()),
    }
}

pub async fn get_affiliate_link(
    State(state): State<AppState>,
    Query(query): Query<IdentityQuery>,
) -> impl IntoResponse {
    let (link_tx, link_rx) = oneshot::channel();

    let send_result = state
        .lead_channel
        .send(LeadRequest::AffiliateLink {
            email: query.email,
            ip_address: query.ip_address,
            response: link_tx,
        })
        .await;
    if let Err(e) = send_result {
        return channel_error(e.to_string());
    }

    match link_rx.await {
        Ok(Ok(link)) => (StatusCode::OK, Json(json!({"link": link}))),
        Ok(Err(service_error)) => error_response(service_error),
        Err(e) => channel_error(e.to_string()),
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    page: Option<u32>,
    per_page: Option<u32>,
    dataset: Option<Dataset>,
}

pub async fn get_data(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let (page_tx, page_rx) = oneshot::channel();

    let send_result = state
        .lead_channel
        .send(LeadRequest::ListPage {
            dataset: query.dataset.unwrap_or_default(),
            page: query.page.unwrap_or(1),
            per_page: query.per_page.unwrap_or(10),
            response: page_tx,
        })
        .await;
    if let Err(e) = send_result {
        return channel_error(e.to_string());
    }

    match page_rx.await {
        Ok(Ok(page)) => (
            StatusCode::OK,
            Json(json!({
                "page": page.page,
                "data": page.data,
                "total": page.total,
                "has_more": page.has_more
            })),
        ),
        Ok(Err(service_error)) => error_response(service_error),
        Err(e) => channel_error(e.to_string()),
    }
}

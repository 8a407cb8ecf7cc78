use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::domain::{DocumentView, Item};
use super::gateway::{create_pz_document, following_sequence, InventoryGateway};
use super::numbering::sort_by_number;
use crate::error::AppError;
use crate::store::LiveSequence;

#[derive(Debug, Clone, Deserialize)]
pub struct ContractorRequest {
    pub name: String,
    #[serde(default)]
    pub symbol: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocumentRequest {
    pub contractor_uid: String,
    #[serde(default)]
    pub items: Vec<Item>,
    /// Creation date; defaults to today.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentRequest {
    #[serde(default)]
    pub contractor_uid: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<Item>>,
}

/// Router builder exposing the inventory gateway over JSON.
pub fn inventory_router<G>(gateway: Arc<G>) -> Router
where
    G: InventoryGateway + ?Sized + 'static,
{
    Router::new()
        .route(
            "/api/v1/contractors",
            get(list_contractors::<G>).post(create_contractor::<G>),
        )
        .route(
            "/api/v1/contractors/:uid",
            get(contractor_handler::<G>).put(update_contractor_handler::<G>),
        )
        .route("/api/v1/items", get(list_items::<G>).post(create_item::<G>))
        .route(
            "/api/v1/documents",
            get(list_documents::<G>).post(create_document::<G>),
        )
        .route(
            "/api/v1/documents/:uid",
            get(document_handler::<G>)
                .patch(update_document_handler::<G>)
                .delete(delete_document_handler::<G>),
        )
        .route("/api/v1/pz-numbers/next", get(next_number_handler::<G>))
        .with_state(gateway)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({ "error": message.into() });
    (status, Json(payload)).into_response()
}

async fn first_emission<T: Send + 'static>(sequence: LiveSequence<T>) -> Result<T, Response> {
    sequence
        .first()
        .await
        .map_err(|err| error_response(StatusCode::SERVICE_UNAVAILABLE, err.to_string()))
}

pub(crate) async fn list_contractors<G>(State(gateway): State<Arc<G>>) -> Response
where
    G: InventoryGateway + ?Sized + 'static,
{
    match first_emission(gateway.fetch_contractors().await).await {
        Ok(contractors) => (StatusCode::OK, Json(contractors)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn create_contractor<G>(
    State(gateway): State<Arc<G>>,
    Json(request): Json<ContractorRequest>,
) -> Response
where
    G: InventoryGateway + ?Sized + 'static,
{
    let name = request.name.trim();
    if name.is_empty() {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "contractor name is required");
    }

    gateway.add_contractor(name, request.symbol.trim()).await;
    (StatusCode::ACCEPTED, Json(json!({ "status": "accepted" }))).into_response()
}

pub(crate) async fn contractor_handler<G>(
    State(gateway): State<Arc<G>>,
    Path(uid): Path<String>,
) -> Response
where
    G: InventoryGateway + ?Sized + 'static,
{
    match first_emission(gateway.fetch_contractor(&uid).await).await {
        Ok(Some(contractor)) => (StatusCode::OK, Json(contractor)).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("contractor {uid} not found")),
        Err(response) => response,
    }
}

pub(crate) async fn update_contractor_handler<G>(
    State(gateway): State<Arc<G>>,
    Path(uid): Path<String>,
    Json(request): Json<ContractorRequest>,
) -> Response
where
    G: InventoryGateway + ?Sized + 'static,
{
    match gateway
        .update_contractor(&uid, &request.name, &request.symbol)
        .await
    {
        Ok(()) => (StatusCode::OK, Json(json!({ "uid": uid }))).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn list_items<G>(State(gateway): State<Arc<G>>) -> Response
where
    G: InventoryGateway + ?Sized + 'static,
{
    match first_emission(gateway.fetch_items().await).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn create_item<G>(
    State(gateway): State<Arc<G>>,
    Json(item): Json<Item>,
) -> Response
where
    G: InventoryGateway + ?Sized + 'static,
{
    if item.name.trim().is_empty() {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "item name is required");
    }

    gateway.add_item(item).await;
    (StatusCode::ACCEPTED, Json(json!({ "status": "accepted" }))).into_response()
}

pub(crate) async fn list_documents<G>(State(gateway): State<Arc<G>>) -> Response
where
    G: InventoryGateway + ?Sized + 'static,
{
    match first_emission(gateway.fetch_documents().await).await {
        Ok(mut documents) => {
            sort_by_number(&mut documents);
            let views: Vec<DocumentView> = documents.into_iter().map(DocumentView::from).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(response) => response,
    }
}

pub(crate) async fn create_document<G>(
    State(gateway): State<Arc<G>>,
    Json(request): Json<NewDocumentRequest>,
) -> Response
where
    G: InventoryGateway + ?Sized + 'static,
{
    let NewDocumentRequest {
        contractor_uid,
        items,
        date,
    } = request;
    if contractor_uid.trim().is_empty() {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "contractorUid is required");
    }

    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let uid = Uuid::new_v4().to_string();
    match create_pz_document(gateway.as_ref(), uid, &contractor_uid, &items, date).await {
        Ok(document) => (StatusCode::CREATED, Json(DocumentView::from(document))).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn document_handler<G>(
    State(gateway): State<Arc<G>>,
    Path(uid): Path<String>,
) -> Response
where
    G: InventoryGateway + ?Sized + 'static,
{
    match first_emission(gateway.fetch_document(&uid).await).await {
        Ok(Some(document)) => (StatusCode::OK, Json(DocumentView::from(document))).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("document {uid} not found")),
        Err(response) => response,
    }
}

pub(crate) async fn update_document_handler<G>(
    State(gateway): State<Arc<G>>,
    Path(uid): Path<String>,
    Json(request): Json<UpdateDocumentRequest>,
) -> Response
where
    G: InventoryGateway + ?Sized + 'static,
{
    gateway
        .update_document(&uid, request.contractor_uid.as_deref(), request.items)
        .await;
    (StatusCode::ACCEPTED, Json(json!({ "uid": uid }))).into_response()
}

pub(crate) async fn delete_document_handler<G>(
    State(gateway): State<Arc<G>>,
    Path(uid): Path<String>,
) -> Response
where
    G: InventoryGateway + ?Sized + 'static,
{
    gateway.delete_document(&uid).await;
    StatusCode::NO_CONTENT.into_response()
}

pub(crate) async fn next_number_handler<G>(State(gateway): State<Arc<G>>) -> Response
where
    G: InventoryGateway + ?Sized + 'static,
{
    let last = gateway.next_pz_number().await;
    match following_sequence(last) {
        Ok(next) => (StatusCode::OK, Json(json!({ "last": last, "next": next }))).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

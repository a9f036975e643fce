use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::api::AppState;
use crate::error::AgentResult;
use crate::model::{PrinterCatalog, PrinterDefinition, PrinterStatus};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDefaultRequest {
    pub printer_id: String,
}

/// GET /api/printers
pub async fn list(State(service): State<AppState>) -> Json<PrinterCatalog> {
    Json(service.list_printers().await)
}

/// POST /api/printers
pub async fn create(
    State(service): State<AppState>,
    Json(printer): Json<PrinterDefinition>,
) -> AgentResult<(StatusCode, Json<PrinterCatalog>)> {
    let catalog = service.add_printer(printer).await?;
    Ok((StatusCode::CREATED, Json(catalog)))
}

/// PUT /api/printers/default
pub async fn set_default(
    State(service): State<AppState>,
    Json(request): Json<SetDefaultRequest>,
) -> AgentResult<Json<PrinterCatalog>> {
    let catalog = service.set_default_printer(&request.printer_id).await?;
    Ok(Json(catalog))
}

/// DELETE /api/printers/{id}
pub async fn delete(
    State(service): State<AppState>,
    Path(id): Path<String>,
) -> AgentResult<Json<PrinterCatalog>> {
    let catalog = service.delete_printer(&id).await?;
    Ok(Json(catalog))
}

/// GET /api/printers/{id}/status
pub async fn status(
    State(service): State<AppState>,
    Path(id): Path<String>,
) -> AgentResult<Json<PrinterStatus>> {
    Ok(Json(service.check_status(&id).await?))
}

use axum::{Json, extract::State};

use crate::api::AppState;
use crate::error::AgentResult;
use crate::model::{BillRequest, CategoryOutcome, ImageRequest, PrintOutcome, ReceiptRequest};

/// POST /api/print/receipt
pub async fn receipt(
    State(service): State<AppState>,
    Json(request): Json<ReceiptRequest>,
) -> AgentResult<Json<PrintOutcome>> {
    Ok(Json(service.print_receipt(request).await?))
}

/// POST /api/print/image
pub async fn image(
    State(service): State<AppState>,
    Json(request): Json<ImageRequest>,
) -> AgentResult<Json<PrintOutcome>> {
    Ok(Json(service.print_image(request).await?))
}

/// POST /api/print/bill
///
/// Always 200; per-category failures are in the body.
pub async fn bill(
    State(service): State<AppState>,
    Json(request): Json<BillRequest>,
) -> Json<Vec<CategoryOutcome>> {
    Json(service.print_bill_by_category(request).await)
}

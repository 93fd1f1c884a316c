use axum::{
    extract::{Path, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info};

use crate::product::{format_product, FormattedProduct};
use crate::{iso_now, AppState};

pub const SERVER_NAME: &str = "Kaspi Product API";

#[derive(Debug, Serialize)]
pub struct ProductEnvelope {
    pub success: bool,
    pub data: FormattedProduct,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct StatusEnvelope {
    pub status: &'static str,
    pub server: &'static str,
    pub uptime: f64,
    pub timestamp: String,
}

pub async fn get_product(State(state): State<AppState>, Path(product_id): Path<String>) -> Response {
    match state.source.fetch(&product_id).await {
        Ok(payload) => {
            let data = format_product(&payload);
            info!(product_id = %product_id, name = %data.name, "product fetched");
            Json(ProductEnvelope { success: true, data, timestamp: iso_now() }).into_response()
        }
        Err(e) => {
            error!(product_id = %product_id, error = %e, "error fetching product");
            if state.status_passthrough {
                (e.passthrough_status(), e).into_response()
            } else {
                e.into_response()
            }
        }
    }
}

pub async fn status(State(state): State<AppState>) -> Json<StatusEnvelope> {
    Json(StatusEnvelope {
        status: "active",
        server: SERVER_NAME,
        uptime: state.started_at.elapsed().as_secs_f64(),
        timestamp: iso_now(),
    })
}

pub async fn not_found(method: Method, uri: Uri) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("Cannot {} {}", method, uri.path()))
}

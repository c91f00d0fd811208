use actix_multipart::Multipart;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use tracing::info;

use crate::error::ApiError;
use crate::models::{HealthResponse, PredictRequest, PredictionResponse, StatusResponse};
use crate::state::{AppContext, ModelState};

pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(StatusResponse {
        status: "ok",
        message: "API is running",
    })
}

pub async fn health(ctx: web::Data<AppContext>) -> HttpResponse {
    let body = match &ctx.model {
        ModelState::Loaded(_) => HealthResponse::Ready {
            status: "ok",
            model_loaded: true,
        },
        ModelState::Unavailable { reason } => HealthResponse::Degraded {
            status: "error",
            detail: ApiError::ModelUnavailable(reason.clone()).to_string(),
        },
    };
    HttpResponse::Ok().json(body)
}

pub async fn predict(
    ctx: web::Data<AppContext>,
    req: web::Json<PredictRequest>,
) -> Result<HttpResponse, ApiError> {
    let record = req.into_inner().data;
    let prediction = web::block(move || ctx.predict_record(&record))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(PredictionResponse { prediction }))
}

pub async fn predict_batch(
    ctx: web::Data<AppContext>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let limit = ctx.config.max_upload_size;
    let bad_upload = |e: actix_multipart::MultipartError| {
        ApiError::InvalidBody(format!("Invalid multipart upload: {}", e))
    };

    // The form field is called "file"; fall back to whatever came first.
    let mut upload: Option<Vec<u8>> = None;
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(bad_upload)?;
        let is_file = field.content_disposition().get_name() == Some("file");

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(bad_upload)?;
            if data.len() + chunk.len() > limit {
                return Err(ApiError::PayloadTooLarge { limit });
            }
            data.extend_from_slice(&chunk);
        }

        if is_file {
            upload = Some(data);
            break;
        }
        upload.get_or_insert(data);
    }
    let data = upload.ok_or_else(|| ApiError::InvalidBody("No file uploaded".to_string()))?;
    info!(bytes = data.len(), "Batch upload received");

    let csv = web::block(move || ctx.predict_csv(&data))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename("predictions.csv".to_string())],
        })
        .body(csv))
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({ "detail": "Not Found" }))
}

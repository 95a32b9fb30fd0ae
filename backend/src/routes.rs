use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use log::error;
use serde_json::Value;
use shared::{ErrorEnvelope, HealthResponse, PredictEnvelope};

use crate::config::AppConfig;
use crate::error::PredictError;
use crate::predictor::{LocalClassifier, PredictionService, RemoteClassifier};
use crate::upload::read_upload;

pub const SERVICE_NAME: &str = "fruits-recognition-app";
const UNEXPECTED_MESSAGE: &str = "Unexpected server error while processing the prediction.";

pub fn configure_routes<R, L>(cfg: &mut web::ServiceConfig)
where
    R: RemoteClassifier + 'static,
    L: LocalClassifier,
{
    cfg.service(web::resource("/api/health").route(web::get().to(health::<R, L>)))
        .service(web::resource("/api/predict").route(web::post().to(predict::<R, L>)))
        // older frontends post here
        .service(web::resource("/submit").route(web::post().to(predict::<R, L>)));
}

async fn health<R, L>(service: web::Data<PredictionService<R, L>>) -> HttpResponse
where
    R: RemoteClassifier + 'static,
    L: LocalClassifier,
{
    HttpResponse::Ok().json(HealthResponse {
        success: true,
        service: SERVICE_NAME.to_string(),
        deepstack_base_url: service.remote().base_url().to_string(),
        model_name: service.remote().model_name().to_string(),
        local_onnx_fallback_enabled: service.fallback_enabled(),
    })
}

async fn predict<R, L>(
    service: web::Data<PredictionService<R, L>>,
    config: web::Data<AppConfig>,
    payload: Multipart,
) -> HttpResponse
where
    R: RemoteClassifier + 'static,
    L: LocalClassifier,
{
    let result = match read_upload(payload, config.max_upload_bytes()).await {
        Ok(upload) => service.predict(upload).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(outcome) => HttpResponse::Ok().json(PredictEnvelope {
            success: true,
            fallback: outcome.fallback,
            warning: outcome.warning,
            data: outcome.data,
        }),
        Err(e) => error_response(e),
    }
}

fn error_response(err: PredictError) -> HttpResponse {
    match err {
        PredictError::Validation(e) => {
            let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_REQUEST);
            HttpResponse::build(status).json(ErrorEnvelope {
                success: false,
                error: e.to_string(),
                status_code: None,
                details: None,
            })
        }
        PredictError::Classifier(e) => {
            let status = StatusCode::from_u16(e.status_code).unwrap_or(StatusCode::BAD_GATEWAY);
            HttpResponse::build(status).json(ErrorEnvelope {
                success: false,
                error: e.message,
                status_code: Some(e.status_code),
                details: Some(Value::Object(e.details)),
            })
        }
        PredictError::Unexpected(cause) => {
            error!("Unexpected prediction error: {}", cause);
            HttpResponse::InternalServerError().json(ErrorEnvelope {
                success: false,
                error: UNEXPECTED_MESSAGE.to_string(),
                status_code: None,
                details: Some(Value::String(cause)),
            })
        }
    }
}

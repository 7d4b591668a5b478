//! HTTP routes

use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::config::ServiceConfig;
use crate::service::InferenceService;
use crate::types::{ErrorResponse, PredictRequest};
use crate::ServiceError;

/// A service error carried through warp's rejection path
#[derive(Debug)]
pub struct ServiceRejection(pub ServiceError);

impl warp::reject::Reject for ServiceRejection {}

/// `GET /health`, `POST /coach/predict` and `GET /metrics` with CORS
pub fn routes(
    service: Arc<InferenceService>,
    config: &ServiceConfig,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_service(service.clone()))
        .map(|service: Arc<InferenceService>| warp::reply::json(&service.health()));

    let predict = warp::path!("coach" / "predict")
        .and(warp::post())
        .and(warp::body::content_length_limit(config.max_body_bytes))
        .and(warp::body::json())
        .and(with_service(service.clone()))
        .and_then(handle_predict);

    let metrics = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_service(service.clone()))
        .map(|service: Arc<InferenceService>| {
            warp::reply::with_header(
                service.render_metrics(),
                "Content-Type",
                "text/plain; version=0.0.4",
            )
        });

    let recover_service = service;
    health
        .or(predict)
        .or(metrics)
        .recover(move |err: Rejection| handle_rejection(err, recover_service.clone()))
        .with(cors(config))
}

fn with_service(
    service: Arc<InferenceService>,
) -> impl Filter<Extract = (Arc<InferenceService>,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

fn cors(config: &ServiceConfig) -> warp::cors::Builder {
    let builder = warp::cors()
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["content-type", "authorization"]);

    if config.allows_any_origin() {
        builder.allow_any_origin()
    } else {
        builder.allow_origins(config.cors_origins.iter().map(String::as_str))
    }
}

async fn handle_predict(
    request: PredictRequest,
    service: Arc<InferenceService>,
) -> Result<impl Reply, Rejection> {
    service
        .predict(&request)
        .map(|response| warp::reply::json(&response))
        .map_err(|err| warp::reject::custom(ServiceRejection(err)))
}

async fn handle_rejection(
    err: Rejection,
    service: Arc<InferenceService>,
) -> Result<impl Reply, Infallible> {
    let (status, error, message) = if let Some(ServiceRejection(inner)) =
        err.find::<ServiceRejection>()
    {
        if inner.is_client_error() {
            (StatusCode::BAD_REQUEST, "invalid_input", inner.to_string())
        } else {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                inner.to_string(),
            )
        }
    } else if let Some(body_err) = err.find::<warp::filters::body::BodyDeserializeError>() {
        service.metrics().record_client_error();
        (StatusCode::BAD_REQUEST, "invalid_input", body_err.to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        service.metrics().record_client_error();
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "invalid_input",
            "request body too large".to_string(),
        )
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        service.metrics().record_client_error();
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "invalid_input",
            "expected application/json".to_string(),
        )
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        service.metrics().record_client_error();
        (
            StatusCode::LENGTH_REQUIRED,
            "invalid_input",
            "content-length required".to_string(),
        )
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not_found", "no such route".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            "method not allowed".to_string(),
        )
    } else {
        debug!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "internal server error".to_string(),
        )
    };

    let body = ErrorResponse {
        error: error.to_string(),
        message,
    };
    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}

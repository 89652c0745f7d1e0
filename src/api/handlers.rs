use crate::api::responses::{
    AdvisoryResponse, CalibrationResponse, ErrorCode, ErrorResponse, HealthSuccessResponse,
    ObjectsResponse,
};
use crate::state::{AppState, HealthStatus};
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::error;

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
const NO_DATA_MESSAGE: &str = "No frame has been processed yet";

#[derive(Debug)]
enum TimestampError {
    Format(time::error::Format),
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampError::Format(err) => write!(f, "timestamp format error: {err}"),
        }
    }
}

pub enum ApiResponse<T> {
    Success { status: StatusCode, body: T },
    Error { status: StatusCode, body: ErrorResponse },
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self {
            ApiResponse::Success { status, body } => (status, Json(body)).into_response(),
            ApiResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

/// Advisory stream served by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    AllDetections,
    CenterDetections,
    MinimalNavigation,
    MaximalNavigation,
}

impl Stream {
    fn path(self) -> &'static str {
        match self {
            Stream::AllDetections => "/api/detections",
            Stream::CenterDetections => "/api/detections/center",
            Stream::MinimalNavigation => "/api/navigation/minimal",
            Stream::MaximalNavigation => "/api/navigation/maximal",
        }
    }

    fn read(self, state: &AppState) -> Vec<String> {
        match self {
            Stream::AllDetections => state.all_detection_sentences(),
            Stream::CenterDetections => state.center_detection_sentences(),
            Stream::MinimalNavigation => state.minimal_nav_directions(),
            Stream::MaximalNavigation => state.maximal_nav_directions(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub name: Option<String>,
}

pub async fn get_detections(
    State(state): State<Arc<RwLock<AppState>>>,
) -> impl IntoResponse {
    build_advisory_response(state, Stream::AllDetections)
}

pub async fn get_center_detections(
    State(state): State<Arc<RwLock<AppState>>>,
) -> impl IntoResponse {
    build_advisory_response(state, Stream::CenterDetections)
}

pub async fn get_minimal_navigation(
    State(state): State<Arc<RwLock<AppState>>>,
) -> impl IntoResponse {
    build_advisory_response(state, Stream::MinimalNavigation)
}

pub async fn get_maximal_navigation(
    State(state): State<Arc<RwLock<AppState>>>,
) -> impl IntoResponse {
    build_advisory_response(state, Stream::MaximalNavigation)
}

pub async fn search_detections(
    State(state): State<Arc<RwLock<AppState>>>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    build_search_response(state, params.name.as_deref().unwrap_or(""), SystemTime::now())
}

pub async fn get_objects(State(state): State<Arc<RwLock<AppState>>>) -> impl IntoResponse {
    build_objects_response(state)
}

pub async fn get_calibration(State(state): State<Arc<RwLock<AppState>>>) -> impl IntoResponse {
    build_calibration_response(state, SystemTime::now())
}

pub async fn get_health(State(state): State<Arc<RwLock<AppState>>>) -> impl IntoResponse {
    build_health_response(state, SystemTime::now())
}

fn build_advisory_response(
    state: Arc<RwLock<AppState>>,
    stream: Stream,
) -> ApiResponse<AdvisoryResponse> {
    let guard = match state.read() {
        Ok(guard) => guard,
        Err(_) => {
            return internal_error(stream.path(), "state lock poisoned while reading advisories");
        }
    };
    let Some((frame_index, timestamp)) = guard.latest().map(|r| (r.frame_index, r.timestamp))
    else {
        drop(guard);
        return no_data_response(stream.path(), SystemTime::now());
    };
    let messages = stream.read(&guard);
    drop(guard);

    advisory_success(stream.path(), messages, frame_index, timestamp)
}

fn build_search_response(
    state: Arc<RwLock<AppState>>,
    name: &str,
    now: SystemTime,
) -> ApiResponse<AdvisoryResponse> {
    const PATH: &str = "/api/detections/search";

    let name = name.trim();
    if name.is_empty() {
        return match format_timestamp(now) {
            Ok(formatted) => ApiResponse::Error {
                status: StatusCode::BAD_REQUEST,
                body: ErrorResponse {
                    error_code: ErrorCode::InvalidQuery,
                    error_message: "Query parameter 'name' must not be empty".to_string(),
                    timestamp: formatted,
                },
            },
            Err(_) => internal_error(PATH, "timestamp formatting failure"),
        };
    }

    let guard = match state.read() {
        Ok(guard) => guard,
        Err(_) => {
            return internal_error(PATH, "state lock poisoned while searching detections");
        }
    };
    let Some((frame_index, timestamp)) = guard.latest().map(|r| (r.frame_index, r.timestamp))
    else {
        drop(guard);
        return no_data_response(PATH, now);
    };
    let messages = guard.find_detections_by_class_name(name);
    drop(guard);

    advisory_success(PATH, messages, frame_index, timestamp)
}

fn advisory_success(
    path: &str,
    messages: Vec<String>,
    frame_index: u64,
    timestamp: SystemTime,
) -> ApiResponse<AdvisoryResponse> {
    match format_timestamp(timestamp) {
        Ok(formatted) => ApiResponse::Success {
            status: StatusCode::OK,
            body: AdvisoryResponse {
                messages,
                frame_index,
                timestamp: formatted,
            },
        },
        Err(_) => internal_error(path, "timestamp formatting failure"),
    }
}

fn build_objects_response(state: Arc<RwLock<AppState>>) -> ApiResponse<ObjectsResponse> {
    const PATH: &str = "/api/objects";

    let guard = match state.read() {
        Ok(guard) => guard,
        Err(_) => {
            return internal_error(PATH, "state lock poisoned while reading objects");
        }
    };
    let report = guard.latest().cloned();
    drop(guard);

    let Some(report) = report else {
        return no_data_response(PATH, SystemTime::now());
    };

    match format_timestamp(report.timestamp) {
        Ok(formatted) => ApiResponse::Success {
            status: StatusCode::OK,
            body: ObjectsResponse {
                objects: report.objects,
                image_width: report.image_width,
                image_height: report.image_height,
                frame_index: report.frame_index,
                timestamp: formatted,
            },
        },
        Err(_) => internal_error(PATH, "timestamp formatting failure"),
    }
}

fn build_calibration_response(
    state: Arc<RwLock<AppState>>,
    now: SystemTime,
) -> ApiResponse<CalibrationResponse> {
    const PATH: &str = "/api/calibration";

    let guard = match state.read() {
        Ok(guard) => guard,
        Err(_) => {
            return internal_error(PATH, "state lock poisoned while reading calibration");
        }
    };
    let calibrated = guard.calibration().is_calibrated();
    let focal_length_px = guard.focal_length_pixels();
    drop(guard);

    match format_timestamp(now) {
        Ok(formatted) => ApiResponse::Success {
            status: StatusCode::OK,
            body: CalibrationResponse {
                calibrated,
                focal_length_px,
                timestamp: formatted,
            },
        },
        Err(_) => internal_error(PATH, "timestamp formatting failure"),
    }
}

fn build_health_response(
    state: Arc<RwLock<AppState>>,
    now: SystemTime,
) -> ApiResponse<HealthSuccessResponse> {
    const PATH: &str = "/api/health";

    let guard = match state.read() {
        Ok(guard) => guard,
        Err(_) => {
            return internal_error(PATH, "state lock poisoned while reading health");
        }
    };
    let status = guard.health();
    let fps = guard.fps();
    drop(guard);

    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => {
            return internal_error(PATH, "timestamp formatting failure");
        }
    };

    let status_code = match status {
        HealthStatus::Ko => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Ok | HealthStatus::Degraded => StatusCode::OK,
    };

    ApiResponse::Success {
        status: status_code,
        body: HealthSuccessResponse {
            status,
            fps,
            timestamp,
        },
    }
}

fn no_data_response<T>(path: &str, now: SystemTime) -> ApiResponse<T> {
    match format_timestamp(now) {
        Ok(formatted) => ApiResponse::Error {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: ErrorResponse {
                error_code: ErrorCode::NoData,
                error_message: NO_DATA_MESSAGE.to_string(),
                timestamp: formatted,
            },
        },
        Err(_) => internal_error(path, "timestamp formatting failure"),
    }
}

fn internal_error<T>(path: &str, message: &str) -> ApiResponse<T> {
    error!(path, message, "Internal error while handling request");
    let formatted = format_timestamp(SystemTime::now()).unwrap_or_else(|err| {
        error!(error = %err, "Failed to format internal error timestamp");
        OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    });

    ApiResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorResponse {
            error_code: ErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: formatted,
        },
    }
}

fn format_timestamp(timestamp: SystemTime) -> Result<String, TimestampError> {
    let datetime = OffsetDateTime::from(timestamp);
    datetime.format(&Rfc3339).map_err(TimestampError::Format)
}

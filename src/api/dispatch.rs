// src/api/dispatch.rs
use crate::dispatcher::Dispatcher;
use crate::models::{Channel, DispatchFailure, DispatchReport};
use crate::sender::build_sender;
use crate::server::ServerState;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::Serialize;
use rocket::{get, post, serde::json::Json, State};
use tracing::error;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    pub success: bool,
    pub sent: i64,
    pub failed: i64,
    pub daily_limit: i64,
    pub sent_today: i64,
    pub remaining: i64,
    pub errors: Vec<DispatchFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchResponse {
    fn from_report(report: DispatchReport) -> Self {
        let message = if report.limit_reached {
            Some("límite diario alcanzado".to_string())
        } else {
            None
        };

        Self {
            success: true,
            sent: report.sent,
            failed: report.failed,
            daily_limit: report.daily_limit,
            sent_today: report.sent_today,
            remaining: report.remaining,
            errors: report.errors,
            message,
            error: None,
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            sent: 0,
            failed: 0,
            daily_limit: 0,
            sent_today: 0,
            remaining: 0,
            errors: Vec::new(),
            message: None,
            error: Some(message),
        }
    }
}

#[post("/dispatch/<channel>")]
pub async fn run_channel_dispatch(
    state: &State<ServerState>,
    channel: String,
) -> status::Custom<Json<DispatchResponse>> {
    let channel = match Channel::parse(&channel) {
        Some(channel) => channel,
        None => {
            return status::Custom(
                Status::BadRequest,
                Json(DispatchResponse::error(format!(
                    "unknown channel '{}'",
                    channel
                ))),
            )
        }
    };

    // Missing provider credentials are a caller-side config problem,
    // not a server fault.
    let sender = match build_sender(channel) {
        Ok(sender) => sender,
        Err(e) => {
            return status::Custom(Status::BadRequest, Json(DispatchResponse::error(e.to_string())))
        }
    };

    let dispatcher = Dispatcher::new(state.db_pool.clone(), sender, state.config.dispatch.clone());

    match dispatcher.run().await {
        Ok(report) => status::Custom(Status::Ok, Json(DispatchResponse::from_report(report))),
        Err(e) => {
            error!("🔥 Dispatch run for {} aborted: {}", channel, e);
            status::Custom(
                Status::InternalServerError,
                Json(DispatchResponse::error(e.to_string())),
            )
        }
    }
}

#[get("/dispatch/<_channel>")]
pub async fn run_channel_dispatch_get(_channel: String) -> Status {
    Status::MethodNotAllowed
}

// src/api/queue.rs
use crate::models::{Channel, Tier};
use crate::queue::generate_queue;
use crate::server::ServerState;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::{Deserialize, Serialize};
use rocket::{get, post, serde::json::Json, State};
use std::collections::HashMap;
use tracing::error;

#[derive(Deserialize, Default)]
pub struct GenerateQueueRequest {
    pub limit: Option<i64>,
    pub tier: Option<String>,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contacts_added: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier_distribution: Option<HashMap<String, i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerateResponse {
    fn error(message: String) -> Self {
        Self {
            success: false,
            contacts_added: None,
            tier_distribution: None,
            message: None,
            error: Some(message),
        }
    }
}

#[post("/queue/<channel>/generate", data = "<body>")]
pub async fn generate_channel_queue(
    state: &State<ServerState>,
    channel: String,
    body: Result<Json<GenerateQueueRequest>, rocket::serde::json::Error<'_>>,
) -> status::Custom<Json<GenerateResponse>> {
    let channel = match Channel::parse(&channel) {
        Some(channel) => channel,
        None => {
            return status::Custom(
                Status::BadRequest,
                Json(GenerateResponse::error(format!(
                    "unknown channel '{}'",
                    channel
                ))),
            )
        }
    };

    let request = match body {
        Ok(json) => json.into_inner(),
        Err(e) => {
            return status::Custom(
                Status::BadRequest,
                Json(GenerateResponse::error(format!(
                    "invalid request body: {}",
                    e
                ))),
            )
        }
    };

    let tier = match request.tier.as_deref() {
        Some(label) => match Tier::parse(label) {
            Some(tier) => Some(tier),
            None => {
                return status::Custom(
                    Status::BadRequest,
                    Json(GenerateResponse::error(format!("unknown tier '{}'", label))),
                )
            }
        },
        None => None,
    };

    let limit = request.limit.unwrap_or(state.config.queue.default_limit);

    match generate_queue(&state.db_pool, channel, limit, tier, &state.config.queue).await {
        Ok(summary) => {
            let message = format!(
                "{} contactos agregados a la cola de {}",
                summary.contacts_added, channel
            );
            status::Custom(
                Status::Ok,
                Json(GenerateResponse {
                    success: true,
                    contacts_added: Some(summary.contacts_added),
                    tier_distribution: Some(summary.tier_distribution),
                    message: Some(message),
                    error: None,
                }),
            )
        }
        Err(e) => {
            error!("🔥 Queue generation for {} failed: {}", channel, e);
            status::Custom(
                Status::InternalServerError,
                Json(GenerateResponse::error(e.to_string())),
            )
        }
    }
}

// The trigger is POST-only. Browsers and schedulers probing with GET
// get a 405 instead of a confusing 404.
#[get("/queue/<_channel>/generate")]
pub async fn generate_channel_queue_get(_channel: String) -> Status {
    Status::MethodNotAllowed
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::database::test_support;
    use crate::server::build_rocket;
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;

    async fn client() -> (tempfile::TempDir, Client) {
        let (dir, pool) = test_support::test_pool().await;
        let client = Client::tracked(build_rocket(Config::default(), pool))
            .await
            .unwrap();
        (dir, client)
    }

    #[tokio::test]
    async fn unknown_channel_is_rejected_with_400() {
        let (_dir, client) = client().await;

        let response = client
            .post("/api/queue/telegram/generate")
            .header(ContentType::JSON)
            .body("{}")
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadRequest);
        let body: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("telegram"));
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_with_400() {
        let (_dir, client) = client().await;

        let response = client
            .post("/api/queue/email/generate")
            .header(ContentType::JSON)
            .body("{not json")
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadRequest);
        let body: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(body["success"], false);
        assert!(body.get("contacts_added").is_none());
    }

    #[tokio::test]
    async fn get_on_the_trigger_answers_405() {
        let (_dir, client) = client().await;

        let response = client.get("/api/queue/email/generate").dispatch().await;
        assert_eq!(response.status(), Status::MethodNotAllowed);
    }

    #[tokio::test]
    async fn generation_on_an_empty_database_reports_zero() {
        let (_dir, client) = client().await;

        let response = client
            .post("/api/queue/email/generate")
            .header(ContentType::JSON)
            .body(r#"{"limit": 5}"#)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let body: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["contacts_added"], 0);
        assert!(body["message"].as_str().unwrap().contains("contactos"));
        assert!(body.get("error").is_none());
    }
}

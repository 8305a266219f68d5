// src/api/stats.rs
use crate::database::{get_database_stats, recent_history, DatabaseStats};
use crate::models::Channel;
use crate::quota::QuotaTracker;
use crate::server::ServerState;
use rocket::{get, serde::json::Json, State};
use serde::Serialize;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Serialize)]
pub struct StatsOverview {
    pub contacts: DatabaseStats,
    pub quota: Vec<ChannelQuota>,
}

#[derive(Serialize)]
pub struct ChannelQuota {
    pub channel: String,
    pub daily_limit: i64,
    pub sent_today: i64,
    pub remaining: i64,
}

#[derive(Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub contact_id: i64,
    pub channel: String,
    pub status: String,
    pub sent_at: String,
    pub message_id: Option<String>,
    pub details: Option<String>,
}

#[get("/stats")]
pub async fn get_stats(state: &State<ServerState>) -> Json<ApiResponse<StatsOverview>> {
    let contacts = match get_database_stats(&state.db_pool).await {
        Ok(stats) => stats,
        Err(e) => return Json(ApiResponse::error(e.to_string())),
    };

    let tracker = QuotaTracker::new(state.db_pool.clone());
    let now = chrono::Utc::now();

    let mut quota = Vec::new();
    for channel in Channel::ALL {
        match tracker.status(channel, now).await {
            Ok(status) => quota.push(ChannelQuota {
                channel: channel.to_string(),
                daily_limit: status.daily_limit,
                sent_today: status.sent_today,
                remaining: status.remaining,
            }),
            Err(e) => return Json(ApiResponse::error(e.to_string())),
        }
    }

    Json(ApiResponse::success(StatsOverview { contacts, quota }))
}

#[get("/history?<limit>")]
pub async fn get_history(
    state: &State<ServerState>,
    limit: Option<i64>,
) -> Json<ApiResponse<Vec<HistoryEntry>>> {
    // A negative LIMIT would make SQLite return the whole table.
    let limit = limit.unwrap_or(50).clamp(1, 1000);

    match recent_history(&state.db_pool, limit).await {
        Ok(records) => {
            let entries = records
                .into_iter()
                .map(|record| HistoryEntry {
                    id: record.id,
                    contact_id: record.contact_id,
                    channel: record.channel.to_string(),
                    status: record.status,
                    sent_at: record.sent_at.to_rfc3339(),
                    message_id: record.message_id,
                    details: record.details,
                })
                .collect();
            Json(ApiResponse::success(entries))
        }
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::database::{test_support, upsert_contact, ContactImport, DbPool};
    use crate::models::Tier;
    use crate::server::build_rocket;
    use chrono::Utc;
    use rocket::http::Status;
    use rocket::local::asynchronous::Client;
    use rusqlite::params;

    async fn client() -> (tempfile::TempDir, DbPool, Client) {
        let (dir, pool) = test_support::test_pool().await;
        let client = Client::tracked(build_rocket(Config::default(), pool.clone()))
            .await
            .unwrap();
        (dir, pool, client)
    }

    #[tokio::test]
    async fn negative_history_limit_is_clamped() {
        let (_dir, pool, client) = client().await;

        upsert_contact(
            &pool,
            &ContactImport {
                company_name: "Ferretería Lima".to_string(),
                contact_name: None,
                email: Some("lima@ferre.mx".to_string()),
                phone: None,
                tier: Tier::B,
            },
        )
        .await
        .unwrap();
        let contact_id = test_support::contact_id_by_company(&pool, "Ferretería Lima").await;

        let conn = pool.get().await.unwrap();
        let now = Utc::now().to_rfc3339();
        for _ in 0..3 {
            conn.execute(
                "INSERT INTO dispatch_history (contact_id, channel, status, sent_at)
                 VALUES (?1, 'email', 'sent', ?2)",
                params![contact_id, now],
            )
            .unwrap();
        }
        drop(conn);

        let response = client.get("/api/history?limit=-1").dispatch().await;

        assert_eq!(response.status(), Status::Ok);
        let body: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }
}

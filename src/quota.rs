use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;

use crate::database::DbPool;
use crate::models::Channel;

// Snapshot of a channel's daily quota. `remaining` can go negative
// when the limit was lowered after sends already happened.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QuotaStatus {
    pub daily_limit: i64,
    pub sent_today: i64,
    pub remaining: i64,
}

impl QuotaStatus {
    // Largest batch a dispatch run may attempt right now.
    pub fn batch_capacity(&self) -> i64 {
        self.remaining.max(0)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining <= 0
    }
}

// Computes the remaining quota from automation_config and the day's
// dispatch_history rows. Nothing is cached, every run re-reads both.
#[derive(Clone)]
pub struct QuotaTracker {
    db_pool: DbPool,
}

impl QuotaTracker {
    pub fn new(db_pool: DbPool) -> Self {
        Self { db_pool }
    }

    // Quota for `channel` on the UTC day containing `now`.
    pub async fn status(
        &self,
        channel: Channel,
        now: DateTime<Utc>,
    ) -> Result<QuotaStatus, Box<dyn std::error::Error + Send + Sync>> {
        let conn = self.db_pool.get().await?;

        let daily_limit = self.fetch_daily_limit(&conn, channel)?;
        let sent_today = self.count_sent_today(&conn, channel, now)?;

        Ok(QuotaStatus {
            daily_limit,
            sent_today,
            remaining: daily_limit - sent_today,
        })
    }

    fn fetch_daily_limit(
        &self,
        conn: &rusqlite::Connection,
        channel: Channel,
    ) -> Result<i64, Box<dyn std::error::Error + Send + Sync>> {
        match conn.query_row(
            "SELECT daily_limit FROM automation_config WHERE channel = ?1",
            [channel.as_str()],
            |row| row.get(0),
        ) {
            Ok(limit) => Ok(limit),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(channel.default_daily_limit()),
            Err(e) => Err(Box::new(e)),
        }
    }

    fn count_sent_today(
        &self,
        conn: &rusqlite::Connection,
        channel: Channel,
        now: DateTime<Utc>,
    ) -> Result<i64, Box<dyn std::error::Error + Send + Sync>> {
        let day_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .to_rfc3339();
        let day_end = now
            .date_naive()
            .and_hms_opt(23, 59, 59)
            .unwrap()
            .and_utc()
            .to_rfc3339();

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM dispatch_history
             WHERE channel = ?1 AND status = 'sent' AND sent_at >= ?2 AND sent_at <= ?3",
            params![channel.as_str(), day_start, day_end],
            |row| row.get(0),
        )?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{self, test_support, upsert_contact, ContactImport};
    use crate::models::Tier;
    use chrono::Duration;

    // History rows must point at a real contact row.
    async fn fixture_contact(pool: &DbPool) -> i64 {
        upsert_contact(
            pool,
            &ContactImport {
                company_name: "Vivero Central".to_string(),
                contact_name: None,
                email: Some("vivero@central.mx".to_string()),
                phone: Some("+5215511223344".to_string()),
                tier: Tier::A,
            },
        )
        .await
        .unwrap();
        test_support::contact_id_by_company(pool, "Vivero Central").await
    }

    async fn insert_history(
        pool: &DbPool,
        contact_id: i64,
        channel: &str,
        status: &str,
        sent_at: DateTime<Utc>,
    ) {
        let conn = pool.get().await.unwrap();
        conn.execute(
            "INSERT INTO dispatch_history (contact_id, channel, status, sent_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![contact_id, channel, status, sent_at.to_rfc3339()],
        )
        .unwrap();
    }

    #[tokio::test]
    async fn falls_back_to_channel_defaults_without_config_row() {
        let (_dir, pool) = test_support::test_pool().await;
        let tracker = QuotaTracker::new(pool);
        let now = Utc::now();

        let email = tracker.status(Channel::Email, now).await.unwrap();
        assert_eq!(email.daily_limit, 100);
        assert_eq!(email.sent_today, 0);
        assert_eq!(email.remaining, 100);

        let whatsapp = tracker.status(Channel::Whatsapp, now).await.unwrap();
        assert_eq!(whatsapp.daily_limit, 20);
        assert_eq!(whatsapp.remaining, 20);
    }

    #[tokio::test]
    async fn counts_only_same_day_same_channel_sent_rows() {
        let (_dir, pool) = test_support::test_pool().await;
        let now = Utc::now();

        database::set_daily_limit(&pool, Channel::Email, 5)
            .await
            .unwrap();

        let contact_id = fixture_contact(&pool).await;
        insert_history(&pool, contact_id, "email", "sent", now).await;
        insert_history(&pool, contact_id, "email", "sent", now).await;
        // None of these may count against today's email quota.
        insert_history(&pool, contact_id, "email", "sent", now - Duration::days(1)).await;
        insert_history(&pool, contact_id, "whatsapp", "sent", now).await;
        insert_history(&pool, contact_id, "email", "failed", now).await;

        let tracker = QuotaTracker::new(pool);
        let status = tracker.status(Channel::Email, now).await.unwrap();

        assert_eq!(status.daily_limit, 5);
        assert_eq!(status.sent_today, 2);
        assert_eq!(status.remaining, 3);
        assert!(!status.is_exhausted());
    }

    #[tokio::test]
    async fn lowered_limit_reports_negative_remaining_but_zero_capacity() {
        let (_dir, pool) = test_support::test_pool().await;
        let now = Utc::now();

        database::set_daily_limit(&pool, Channel::Whatsapp, 2)
            .await
            .unwrap();
        let contact_id = fixture_contact(&pool).await;
        for _ in 0..3 {
            insert_history(&pool, contact_id, "whatsapp", "sent", now).await;
        }

        let tracker = QuotaTracker::new(pool);
        let status = tracker.status(Channel::Whatsapp, now).await.unwrap();

        assert_eq!(status.remaining, -1);
        assert_eq!(status.batch_capacity(), 0);
        assert!(status.is_exhausted());
    }

    #[tokio::test]
    async fn day_window_is_utc_midnight_to_midnight() {
        let (_dir, pool) = test_support::test_pool().await;
        let now = Utc::now();
        let day_start = now.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();

        let contact_id = fixture_contact(&pool).await;
        insert_history(&pool, contact_id, "email", "sent", day_start).await;
        insert_history(&pool, contact_id, "email", "sent", day_start - Duration::seconds(1)).await;

        let tracker = QuotaTracker::new(pool);
        let status = tracker.status(Channel::Email, now).await.unwrap();

        assert_eq!(status.sent_today, 1);
    }
}

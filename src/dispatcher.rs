use chrono::Utc;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::database::{contact_from_row, parse_timestamp, DbPool, CONTACT_COLUMNS};
use crate::models::{
    Channel, Contact, DispatchFailure, DispatchReport, PendingDispatch, QueueItem, QueueStatus,
};
use crate::quota::QuotaTracker;
use crate::sender::{MessageSender, OutboundMessage, ProviderReceipt};
use crate::templates;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatchSettings {
    // Pause between consecutive sends, in milliseconds.
    pub send_delay_ms: u64,
    // Random extra pause added on top, up to this many milliseconds.
    pub delay_jitter_ms: u64,
    // Whether failed attempts also get the pause. Failures return
    // instantly from the provider, so by default they do not.
    pub delay_after_failure: bool,
    // Upper bound for a single provider call.
    pub send_timeout_secs: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            send_delay_ms: 100,
            delay_jitter_ms: 50,
            delay_after_failure: false,
            send_timeout_secs: 30,
        }
    }
}

// Errors that abort a whole dispatch run before any send happens.
// Per-item provider failures never abort, they end up in the report.
#[derive(Debug)]
pub enum RunError {
    QuotaCheck(Box<dyn std::error::Error + Send + Sync>),
    Selection(Box<dyn std::error::Error + Send + Sync>),
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RunError::QuotaCheck(e) => write!(f, "quota check failed: {}", e),
            RunError::Selection(e) => write!(f, "queue selection failed: {}", e),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::QuotaCheck(e) | RunError::Selection(e) => Some(e.as_ref()),
        }
    }
}

// Sends the pending queue of one channel, best priority first, never
// past the daily quota. Items are claimed one at a time so concurrent
// runs cannot double-send.
pub struct Dispatcher {
    db_pool: DbPool,
    sender: Box<dyn MessageSender>,
    settings: DispatchSettings,
    quota: QuotaTracker,
}

fn contact_ref(contact: &Contact, channel: Channel) -> String {
    contact
        .channel_address(channel)
        .unwrap_or(&contact.company_name)
        .to_string()
}

impl Dispatcher {
    pub fn new(db_pool: DbPool, sender: Box<dyn MessageSender>, settings: DispatchSettings) -> Self {
        let quota = QuotaTracker::new(db_pool.clone());
        Self {
            db_pool,
            sender,
            settings,
            quota,
        }
    }

    pub async fn run(&self) -> std::result::Result<DispatchReport, RunError> {
        let run_id = Uuid::new_v4();
        let channel = self.sender.channel();
        let now = Utc::now();

        let quota = self
            .quota
            .status(channel, now)
            .await
            .map_err(RunError::QuotaCheck)?;

        info!(
            "🚀 Dispatch run {} for {}: {}/{} sent today, {} available",
            run_id,
            channel,
            quota.sent_today,
            quota.daily_limit,
            quota.batch_capacity()
        );

        let mut report = DispatchReport {
            run_id,
            channel,
            daily_limit: quota.daily_limit,
            sent_today: quota.sent_today,
            sent: 0,
            failed: 0,
            remaining: quota.batch_capacity(),
            limit_reached: quota.is_exhausted(),
            errors: Vec::new(),
        };

        if quota.is_exhausted() {
            info!("🛑 Daily limit reached for {}, nothing sent", channel);
            return Ok(report);
        }

        let batch = self
            .fetch_pending(channel, quota.batch_capacity())
            .await
            .map_err(RunError::Selection)?;

        if batch.is_empty() {
            info!("📭 No pending queue items for {}", channel);
            return Ok(report);
        }

        info!("📤 Dispatching {} queued item(s) for {}", batch.len(), channel);

        let total = batch.len();
        for (i, pending) in batch.iter().enumerate() {
            match self.claim(pending.item.id).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!("⏭️ Item {} no longer pending, skipping", pending.item.id);
                    continue;
                }
                Err(e) => {
                    warn!("⚠️ Could not claim item {}: {}", pending.item.id, e);
                    report.failed += 1;
                    report.errors.push(DispatchFailure {
                        queue_id: pending.item.id,
                        contact: contact_ref(&pending.contact, channel),
                        error: format!("claim failed: {}", e),
                    });
                    continue;
                }
            }

            let succeeded = match templates::render_message(channel, &pending.contact) {
                Some(message) => match self.attempt_send(&message).await {
                    Ok(receipt) => {
                        report.sent += 1;
                        debug!(
                            "✅ Sent to {} (queue item {}, provider id {})",
                            message.to, pending.item.id, receipt.id
                        );
                        if let Err(e) = self.record_success(pending, channel, &message, &receipt).await
                        {
                            // The provider already accepted the message,
                            // so it still counts as sent.
                            error!(
                                "🔥 Bookkeeping failed for item {} after send: {}",
                                pending.item.id, e
                            );
                            report.errors.push(DispatchFailure {
                                queue_id: pending.item.id,
                                contact: contact_ref(&pending.contact, channel),
                                error: format!("sent but bookkeeping failed: {}", e),
                            });
                        }
                        true
                    }
                    Err(message_error) => {
                        report.failed += 1;
                        warn!(
                            "❌ Send failed for {} (item {}): {}",
                            contact_ref(&pending.contact, channel),
                            pending.item.id,
                            message_error
                        );
                        if let Err(e) = self.record_failure(pending.item.id, &message_error).await {
                            error!("🔥 Could not mark item {} failed: {}", pending.item.id, e);
                        }
                        report.errors.push(DispatchFailure {
                            queue_id: pending.item.id,
                            contact: contact_ref(&pending.contact, channel),
                            error: message_error,
                        });
                        false
                    }
                },
                None => {
                    let message_error = format!("contact has no {} address", channel);
                    report.failed += 1;
                    if let Err(e) = self.record_failure(pending.item.id, &message_error).await {
                        error!("🔥 Could not mark item {} failed: {}", pending.item.id, e);
                    }
                    report.errors.push(DispatchFailure {
                        queue_id: pending.item.id,
                        contact: contact_ref(&pending.contact, channel),
                        error: message_error,
                    });
                    false
                }
            };

            let last = i == total - 1;
            if !last && (succeeded || self.settings.delay_after_failure) {
                tokio::time::sleep(std::time::Duration::from_millis(self.pause_duration())).await;
            }
        }

        report.remaining = quota.batch_capacity() - report.sent;

        info!(
            "🏁 Run {} finished: {} sent, {} failed, {} remaining today",
            run_id, report.sent, report.failed, report.remaining
        );

        Ok(report)
    }

    async fn attempt_send(
        &self,
        message: &OutboundMessage,
    ) -> std::result::Result<ProviderReceipt, String> {
        let timeout = std::time::Duration::from_secs(self.settings.send_timeout_secs);

        match tokio::time::timeout(timeout, self.sender.send(message)).await {
            Ok(Ok(receipt)) => Ok(receipt),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "send timed out after {}s",
                self.settings.send_timeout_secs
            )),
        }
    }

    async fn fetch_pending(
        &self,
        channel: Channel,
        limit: i64,
    ) -> Result<Vec<PendingDispatch>, Box<dyn std::error::Error + Send + Sync>> {
        let conn = self.db_pool.get().await?;

        let sql = format!(
            "SELECT q.id, q.contact_id, q.channel, q.status, q.priority, q.created_at,
                    q.sent_at, q.message_id, q.error_message, {}
             FROM dispatch_queue q
             JOIN contacts c ON c.id = q.contact_id
             WHERE q.channel = ?1 AND q.status = 'pending'
             ORDER BY q.priority DESC, q.created_at ASC, q.id ASC
             LIMIT ?2",
            CONTACT_COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![channel.as_str(), limit], |row| {
            let channel_label: String = row.get(2)?;
            let channel = Channel::parse(&channel_label).ok_or_else(|| {
                rusqlite::Error::InvalidColumnType(2, channel_label.clone(), rusqlite::types::Type::Text)
            })?;
            let status_label: String = row.get(3)?;
            let status = QueueStatus::parse(&status_label).ok_or_else(|| {
                rusqlite::Error::InvalidColumnType(3, status_label.clone(), rusqlite::types::Type::Text)
            })?;
            let created_at_str: String = row.get(5)?;
            let sent_at = match row.get::<_, Option<String>>(6)? {
                Some(s) if !s.is_empty() => Some(parse_timestamp(6, s)?),
                _ => None,
            };

            Ok(PendingDispatch {
                item: QueueItem {
                    id: row.get(0)?,
                    contact_id: row.get(1)?,
                    channel,
                    status,
                    priority: row.get(4)?,
                    created_at: parse_timestamp(5, created_at_str)?,
                    sent_at,
                    message_id: row.get(7)?,
                    error_message: row.get(8)?,
                },
                contact: contact_from_row(row, 9)?,
            })
        })?;

        let mut batch = Vec::new();
        for row in rows {
            batch.push(row?);
        }

        Ok(batch)
    }

    // Flips the row from pending to sending. Returns false when some
    // other run got there first.
    async fn claim(&self, queue_id: i64) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let conn = self.db_pool.get().await?;

        let updated = conn.execute(
            "UPDATE dispatch_queue SET status = 'sending' WHERE id = ?1 AND status = 'pending'",
            [queue_id],
        )?;

        Ok(updated == 1)
    }

    // The three success writes commit together: history row, queue row,
    // contact row.
    async fn record_success(
        &self,
        pending: &PendingDispatch,
        channel: Channel,
        message: &OutboundMessage,
        receipt: &ProviderReceipt,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut conn = self.db_pool.get().await?;
        let now = Utc::now().to_rfc3339();

        let details = match channel {
            Channel::Email => serde_json::json!({
                "subject": message.subject,
                "tier": pending.contact.tier.as_str(),
            }),
            Channel::Whatsapp => serde_json::json!({
                "tier": pending.contact.tier.as_str(),
            }),
        }
        .to_string();

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO dispatch_history (contact_id, channel, status, sent_at, message_id, details)
             VALUES (?1, ?2, 'sent', ?3, ?4, ?5)",
            params![pending.contact.id, channel.as_str(), now, receipt.id, details],
        )?;
        tx.execute(
            "UPDATE dispatch_queue SET status = 'sent', sent_at = ?1, message_id = ?2 WHERE id = ?3",
            params![now, receipt.id, pending.item.id],
        )?;
        match channel {
            Channel::Email => tx.execute(
                "UPDATE contacts
                 SET email_status = 'sent', last_email_sent = ?1, last_contacted = ?1, last_updated = ?1
                 WHERE id = ?2",
                params![now, pending.contact.id],
            )?,
            Channel::Whatsapp => tx.execute(
                "UPDATE contacts
                 SET whatsapp_status = 'sent', last_whatsapp_sent = ?1, last_contacted = ?1, last_updated = ?1
                 WHERE id = ?2",
                params![now, pending.contact.id],
            )?,
        };
        tx.commit()?;

        Ok(())
    }

    // Failures only touch the queue row. No history is written and no
    // quota is consumed.
    async fn record_failure(
        &self,
        queue_id: i64,
        error: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let conn = self.db_pool.get().await?;

        conn.execute(
            "UPDATE dispatch_queue SET status = 'failed', error_message = ?1 WHERE id = ?2",
            params![error, queue_id],
        )?;

        Ok(())
    }

    fn pause_duration(&self) -> u64 {
        // Jitter keeps the sending pattern from looking scripted.
        self.settings.send_delay_ms + fastrand::u64(0..=self.settings.delay_jitter_ms)
    }
}

use chrono::{Duration, Utc};
use regex::Regex;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::database::{contact_from_row, DbPool, CONTACT_COLUMNS};
use crate::models::{Channel, Contact, GenerationSummary, Tier};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueuePolicy {
    // Contacts already marked sent become eligible again after this
    // many days without contact on the channel.
    pub cooldown_days: i64,
    // Batch size used when a generation request does not name one.
    pub default_limit: i64,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            cooldown_days: 30,
            default_limit: 100,
        }
    }
}

// Fills dispatch_queue for one channel with up to `limit` eligible
// contacts, best tiers first. A contact is eligible when it has a
// usable address, no open queue row on the channel, and was not
// contacted there inside the cooldown window.
pub async fn generate_queue(
    pool: &DbPool,
    channel: Channel,
    limit: i64,
    tier: Option<Tier>,
    policy: &QueuePolicy,
) -> Result<GenerationSummary, Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get().await?;
    let now = Utc::now();
    let cooldown_cutoff = (now - Duration::days(policy.cooldown_days)).to_rfc3339();

    // Cooldowns key on the channel's own sent marker. last_contacted
    // tracks activity across both channels and plays no part here.
    let (address_column, status_column, last_sent_column) = match channel {
        Channel::Email => ("email", "email_status", "last_email_sent"),
        Channel::Whatsapp => ("phone", "whatsapp_status", "last_whatsapp_sent"),
    };

    let mut sql = format!(
        "SELECT {columns} FROM contacts c
         WHERE c.{addr} IS NOT NULL AND c.{addr} != ''
           AND NOT EXISTS (
               SELECT 1 FROM dispatch_queue q
               WHERE q.contact_id = c.id AND q.channel = ?1
                 AND q.status IN ('pending', 'sending')
           )
           AND (COALESCE(c.{status}, '') != 'sent' OR COALESCE(c.{last_sent}, '') < ?2)",
        columns = CONTACT_COLUMNS,
        addr = address_column,
        status = status_column,
        last_sent = last_sent_column,
    );

    if channel == Channel::Email {
        sql.push_str(" AND c.email NOT LIKE '%noreply%' AND c.email NOT LIKE '%no-reply%'");
    }
    // Tier labels come from the enum, never from user input.
    if let Some(t) = tier {
        sql.push_str(&format!(" AND c.tier = '{}'", t.as_str()));
    }
    sql.push_str(&format!(
        " ORDER BY CASE c.tier WHEN 'AAA' THEN 0 WHEN 'AA' THEN 1 WHEN 'A' THEN 2 ELSE 3 END,
           COALESCE(c.{}, '') ASC, c.id ASC",
        last_sent_column
    ));

    let candidates: Vec<Contact> = {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![channel.as_str(), cooldown_cutoff], |row| {
            contact_from_row(row, 0)
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        out
    };

    debug!(
        "Found {} candidate contact(s) for {} queue generation",
        candidates.len(),
        channel
    );

    let email_re = Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")?;
    let phone_re = Regex::new(r"^\+?[0-9]{7,15}$")?;

    let mut contacts_added = 0i64;
    let mut tier_distribution: HashMap<String, i64> = HashMap::new();
    let created_at = now.to_rfc3339();

    let tx = conn.transaction()?;
    for contact in &candidates {
        if contacts_added >= limit {
            break;
        }

        let address = match contact.channel_address(channel) {
            Some(a) => a,
            None => continue,
        };

        let valid = match channel {
            Channel::Email => email_re.is_match(address.trim()),
            Channel::Whatsapp => {
                let digits: String = address
                    .chars()
                    .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
                    .collect();
                phone_re.is_match(&digits)
            }
        };
        if !valid {
            debug!(
                "⏭️ Skipping {} ({}): not a usable {} address",
                contact.company_name, address, channel
            );
            continue;
        }

        tx.execute(
            "INSERT INTO dispatch_queue (contact_id, channel, status, priority, created_at)
             VALUES (?1, ?2, 'pending', ?3, ?4)",
            params![
                contact.id,
                channel.as_str(),
                contact.tier.priority(),
                created_at
            ],
        )?;

        contacts_added += 1;
        *tier_distribution
            .entry(contact.tier.as_str().to_string())
            .or_insert(0) += 1;
    }
    tx.commit()?;

    info!("✓ Queued {} contact(s) for {} dispatch", contacts_added, channel);

    Ok(GenerationSummary {
        contacts_added,
        tier_distribution,
    })
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{config::Config, database::DbPool};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

// Business tier assigned during contact import. Higher tiers are
// contacted first and get the premium message variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "AAA")]
    Aaa,
    #[serde(rename = "AA")]
    Aa,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B")]
    B,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Aaa, Tier::Aa, Tier::A, Tier::B];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Aaa => "AAA",
            Tier::Aa => "AA",
            Tier::A => "A",
            Tier::B => "B",
        }
    }

    pub fn parse(value: &str) -> Option<Tier> {
        match value.trim().to_uppercase().as_str() {
            "AAA" => Some(Tier::Aaa),
            "AA" => Some(Tier::Aa),
            "A" => Some(Tier::A),
            "B" => Some(Tier::B),
            _ => None,
        }
    }

    // Queue priority derived from the tier. The dispatcher drains the
    // queue in descending priority order.
    pub fn priority(&self) -> i64 {
        match self {
            Tier::Aaa => 100,
            Tier::Aa => 75,
            Tier::A => 50,
            Tier::B => 25,
        }
    }

    // AAA and AA businesses get the premium copy variant.
    pub fn is_premium(&self) -> bool {
        matches!(self, Tier::Aaa | Tier::Aa)
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Outbound channel. Each channel has its own queue rows, its own
// daily quota and its own provider client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "whatsapp")]
    Whatsapp,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Email, Channel::Whatsapp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Whatsapp => "whatsapp",
        }
    }

    pub fn parse(value: &str) -> Option<Channel> {
        match value.trim().to_lowercase().as_str() {
            "email" => Some(Channel::Email),
            "whatsapp" => Some(Channel::Whatsapp),
            _ => None,
        }
    }

    // Fallback quota used when automation_config has no row for the
    // channel.
    pub fn default_daily_limit(&self) -> i64 {
        match self {
            Channel::Email => 100,
            Channel::Whatsapp => 20,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Lifecycle of a dispatch_queue row: pending -> sending -> sent | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "sending")]
    Sending,
    #[serde(rename = "sent")]
    Sent,
    #[serde(rename = "failed")]
    Failed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Sending => "sending",
            QueueStatus::Sent => "sent",
            QueueStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<QueueStatus> {
        match value {
            "pending" => Some(QueueStatus::Pending),
            "sending" => Some(QueueStatus::Sending),
            "sent" => Some(QueueStatus::Sent),
            "failed" => Some(QueueStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// A business contact imported from the directory. The per-channel
// status columns stay free text because imports write them too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub company_name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tier: Tier,
    pub email_status: Option<String>,
    pub whatsapp_status: Option<String>,
    pub last_email_sent: Option<DateTime<Utc>>,
    pub last_contacted: Option<DateTime<Utc>>,
}

impl Contact {
    // Address used for the given channel, if the contact has one.
    pub fn channel_address(&self, channel: Channel) -> Option<&str> {
        let value = match channel {
            Channel::Email => self.email.as_deref(),
            Channel::Whatsapp => self.phone.as_deref(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    pub fn display_name(&self) -> &str {
        self.contact_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.company_name)
    }
}

// One row of dispatch_queue.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub id: i64,
    pub contact_id: i64,
    pub channel: Channel,
    pub status: QueueStatus,
    pub priority: i64,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub message_id: Option<String>,
    pub error_message: Option<String>,
}

// Queue row joined with its contact, as handed to the dispatcher.
#[derive(Debug, Clone)]
pub struct PendingDispatch {
    pub item: QueueItem,
    pub contact: Contact,
}

// One row of dispatch_history. History is append-only and feeds the
// daily quota count.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub id: i64,
    pub contact_id: i64,
    pub channel: Channel,
    pub status: String,
    pub sent_at: DateTime<Utc>,
    pub message_id: Option<String>,
    pub details: Option<String>,
}

// Result of a queue generation run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationSummary {
    pub contacts_added: i64,
    pub tier_distribution: HashMap<String, i64>,
}

// One failed item inside a dispatch run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchFailure {
    pub queue_id: i64,
    pub contact: String,
    pub error: String,
}

// Outcome of a whole dispatch run. `sent_today` is the count before
// the run started, `remaining` the quota left after it finished.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub run_id: Uuid,
    pub channel: Channel,
    pub daily_limit: i64,
    pub sent_today: i64,
    pub sent: i64,
    pub failed: i64,
    pub remaining: i64,
    pub limit_reached: bool,
    pub errors: Vec<DispatchFailure>,
}

pub struct ConsoleApp {
    pub config: Config,
    pub db_pool: DbPool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_priorities_are_strictly_ordered() {
        let priorities: Vec<i64> = Tier::ALL.iter().map(|t| t.priority()).collect();
        assert_eq!(priorities, vec![100, 75, 50, 25]);
        for pair in priorities.windows(2) {
            assert!(pair[0] > pair[1]);
        }
    }

    #[test]
    fn tier_parse_round_trips_labels() {
        for tier in Tier::ALL {
            assert_eq!(Tier::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(Tier::parse("aa"), Some(Tier::Aa));
        assert_eq!(Tier::parse("platinum"), None);
    }

    #[test]
    fn channel_defaults_match_product_quotas() {
        assert_eq!(Channel::Email.default_daily_limit(), 100);
        assert_eq!(Channel::Whatsapp.default_daily_limit(), 20);
        assert_eq!(Channel::parse("WhatsApp"), Some(Channel::Whatsapp));
        assert_eq!(Channel::parse("sms"), None);
    }

    #[test]
    fn contact_address_ignores_blank_values() {
        let contact = Contact {
            id: 1,
            company_name: "Tacos El Norte".to_string(),
            contact_name: Some("   ".to_string()),
            email: Some("".to_string()),
            phone: Some("+5215512345678".to_string()),
            tier: Tier::A,
            email_status: None,
            whatsapp_status: None,
            last_email_sent: None,
            last_contacted: None,
        };
        assert_eq!(contact.channel_address(Channel::Email), None);
        assert_eq!(
            contact.channel_address(Channel::Whatsapp),
            Some("+5215512345678")
        );
        assert_eq!(contact.display_name(), "Tacos El Norte");
    }
}

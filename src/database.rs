use chrono::{DateTime, Utc};
use mobc::{Manager, Pool};
use rusqlite::{params, Connection, Result as SqliteResult};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, error, info};

use crate::models::{Channel, Contact, HistoryRecord, Tier};

fn log_rusqlite_error(context: &str, err: &rusqlite::Error) {
    error!("🔥 SQLite error in {}: {:?}", context, err);

    if let rusqlite::Error::ExecuteReturnedResults = err {
        error!("💥 execute() was called on a statement that returns rows, use query_row()/query_map() instead");
    }
}

pub struct SqliteManager {
    db_path: String,
}

impl SqliteManager {
    pub fn new(db_path: String) -> Self {
        debug!("🔧 Creating SqliteManager for path: {}", db_path);
        Self { db_path }
    }
}

#[async_trait::async_trait]
impl Manager for SqliteManager {
    type Connection = Connection;
    type Error = rusqlite::Error;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        debug!("🔌 Opening database: {}", self.db_path);

        let conn = match Connection::open(&self.db_path) {
            Ok(c) => c,
            Err(e) => {
                log_rusqlite_error("Connection::open", &e);
                return Err(e);
            }
        };

        // Some PRAGMA statements return a result row, execute() rejects those.
        let exec_pragma = |conn: &Connection, pragma: &str| -> Result<(), rusqlite::Error> {
            match conn.execute(pragma, []) {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::ExecuteReturnedResults) => {
                    conn.query_row(pragma, [], |_| Ok(()))
                }
                Err(e) => {
                    debug!("❌ {} failed: {}", pragma, e);
                    Err(e)
                }
            }
        };

        exec_pragma(&conn, "PRAGMA journal_mode=WAL")?;
        exec_pragma(&conn, "PRAGMA synchronous=NORMAL")?;
        exec_pragma(&conn, "PRAGMA cache_size=1000000")?;
        exec_pragma(&conn, "PRAGMA temp_store=memory")?;
        exec_pragma(&conn, "PRAGMA busy_timeout=5000")?;

        if let Err(e) = init_database(&conn) {
            log_rusqlite_error("init_database", &e);
            return Err(e);
        }

        Ok(conn)
    }

    async fn check(&self, conn: Self::Connection) -> Result<Self::Connection, Self::Error> {
        match conn.query_row("SELECT 1", [], |_| Ok(())) {
            Ok(_) => Ok(conn),
            Err(e) => {
                log_rusqlite_error("connection check", &e);
                Err(e)
            }
        }
    }
}

fn init_database(conn: &Connection) -> SqliteResult<()> {
    create_contacts_table(conn)?;
    create_dispatch_queue_table(conn)?;
    create_dispatch_history_table(conn)?;
    create_automation_config_table(conn)?;
    create_indexes(conn)?;
    Ok(())
}

pub type DbPool = Pool<SqliteManager>;

pub async fn create_db_pool(
    db_path: &str,
) -> Result<DbPool, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let manager = SqliteManager::new(db_path.to_string());
    let pool = Pool::builder().max_open(10).max_idle(5).build(manager);

    info!("✓ SQLite connection pool created: {}", db_path);
    Ok(pool)
}

fn create_contacts_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS contacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_name TEXT NOT NULL,
            contact_name TEXT,
            email TEXT UNIQUE,
            phone TEXT,
            tier TEXT NOT NULL DEFAULT 'B',
            email_status TEXT DEFAULT 'pending',
            whatsapp_status TEXT DEFAULT 'pending',
            last_email_sent TEXT,
            last_whatsapp_sent TEXT,
            last_contacted TEXT,
            created_at TEXT NOT NULL,
            last_updated TEXT NOT NULL
        )
        "#,
        [],
    )?;
    Ok(())
}

fn create_dispatch_queue_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS dispatch_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            contact_id INTEGER NOT NULL,
            channel TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            priority INTEGER NOT NULL DEFAULT 25,
            created_at TEXT NOT NULL,
            sent_at TEXT,
            message_id TEXT,
            error_message TEXT,
            FOREIGN KEY (contact_id) REFERENCES contacts (id)
        )
        "#,
        [],
    )?;
    Ok(())
}

fn create_dispatch_history_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS dispatch_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            contact_id INTEGER NOT NULL,
            channel TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'sent',
            sent_at TEXT NOT NULL,
            message_id TEXT,
            details TEXT,
            FOREIGN KEY (contact_id) REFERENCES contacts (id)
        )
        "#,
        [],
    )?;
    Ok(())
}

fn create_automation_config_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS automation_config (
            channel TEXT PRIMARY KEY,
            daily_limit INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        [],
    )?;
    Ok(())
}

fn create_indexes(conn: &Connection) -> SqliteResult<()> {
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_contacts_tier ON contacts(tier)",
        "CREATE INDEX IF NOT EXISTS idx_contacts_email_status ON contacts(email_status)",
        "CREATE INDEX IF NOT EXISTS idx_contacts_whatsapp_status ON contacts(whatsapp_status)",
        "CREATE INDEX IF NOT EXISTS idx_queue_channel_status ON dispatch_queue(channel, status)",
        "CREATE INDEX IF NOT EXISTS idx_queue_priority ON dispatch_queue(priority DESC, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_queue_contact ON dispatch_queue(contact_id)",
        "CREATE INDEX IF NOT EXISTS idx_history_channel_sent ON dispatch_history(channel, sent_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_history_contact ON dispatch_history(contact_id)",
    ];

    for (i, index_sql) in indexes.iter().enumerate() {
        if let Err(e) = conn.execute(index_sql, []) {
            log_rusqlite_error(&format!("create index {}", i + 1), &e);
            return Err(e);
        }
    }

    Ok(())
}

// Column list shared by every query that hydrates a `Contact`.
// Keep in sync with `contact_from_row`.
pub(crate) const CONTACT_COLUMNS: &str = "c.id, c.company_name, c.contact_name, c.email, c.phone, \
     c.tier, c.email_status, c.whatsapp_status, c.last_email_sent, c.last_contacted";

pub(crate) fn parse_timestamp(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| rusqlite::Error::InvalidColumnType(idx, value, rusqlite::types::Type::Text))
}

// Maps a row produced with `CONTACT_COLUMNS` starting at column `base`.
pub(crate) fn contact_from_row(row: &rusqlite::Row, base: usize) -> rusqlite::Result<Contact> {
    let get_optional_string = |idx: usize| -> Option<String> {
        match row.get::<_, Option<String>>(idx) {
            Ok(Some(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    };

    let tier_label: String = row.get(base + 5)?;
    let tier = Tier::parse(&tier_label).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(base + 5, tier_label.clone(), rusqlite::types::Type::Text)
    })?;

    let last_email_sent = match get_optional_string(base + 8) {
        Some(s) => Some(parse_timestamp(base + 8, s)?),
        None => None,
    };
    let last_contacted = match get_optional_string(base + 9) {
        Some(s) => Some(parse_timestamp(base + 9, s)?),
        None => None,
    };

    Ok(Contact {
        id: row.get(base)?,
        company_name: row.get(base + 1)?,
        contact_name: get_optional_string(base + 2),
        email: get_optional_string(base + 3),
        phone: get_optional_string(base + 4),
        tier,
        email_status: get_optional_string(base + 6),
        whatsapp_status: get_optional_string(base + 7),
        last_email_sent,
        last_contacted,
    })
}

// Contact as delivered by the directory import.
#[derive(Debug, Clone)]
pub struct ContactImport {
    pub company_name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tier: Tier,
}

pub async fn upsert_contact(
    pool: &DbPool,
    contact: &ContactImport,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    debug!("💾 upsert_contact() - {}", contact.company_name);

    let conn = pool.get().await?;
    let now = Utc::now().to_rfc3339();

    let contact_name = contact.contact_name.as_deref().unwrap_or("");
    let email = contact.email.as_deref().unwrap_or("");
    let phone = contact.phone.as_deref().unwrap_or("");

    match conn.execute(
        r#"
        INSERT INTO contacts (
            company_name, contact_name, email, phone, tier, created_at, last_updated
        ) VALUES (?1, ?2, NULLIF(?3, ''), NULLIF(?4, ''), ?5, ?6, ?7)
        ON CONFLICT (email) DO UPDATE SET
            company_name = excluded.company_name,
            contact_name = COALESCE(NULLIF(excluded.contact_name, ''), contact_name),
            phone = COALESCE(excluded.phone, phone),
            tier = excluded.tier,
            last_updated = excluded.last_updated
        "#,
        params![
            contact.company_name,
            contact_name,
            email,
            phone,
            contact.tier.as_str(),
            now,
            now,
        ],
    ) {
        Ok(_) => Ok(()),
        Err(e) => {
            log_rusqlite_error("upsert_contact", &e);
            Err(Box::new(e))
        }
    }
}

pub async fn set_daily_limit(
    pool: &DbPool,
    channel: Channel,
    daily_limit: i64,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;

    conn.execute(
        r#"
        INSERT INTO automation_config (channel, daily_limit, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (channel) DO UPDATE SET
            daily_limit = excluded.daily_limit,
            updated_at = excluded.updated_at
        "#,
        params![channel.as_str(), daily_limit, Utc::now().to_rfc3339()],
    )?;

    info!("✓ Daily limit for {} set to {}", channel, daily_limit);
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct DatabaseStats {
    pub total_contacts: i64,
    pub contacts_with_email: i64,
    pub contacts_with_phone: i64,
    pub queue: Vec<QueueChannelStats>,
    pub history_records: i64,
}

#[derive(Debug, Serialize)]
pub struct QueueChannelStats {
    pub channel: String,
    pub pending: i64,
    pub sending: i64,
    pub sent: i64,
    pub failed: i64,
}

pub async fn get_database_stats(
    pool: &DbPool,
) -> Result<DatabaseStats, Box<dyn std::error::Error + Send + Sync>> {
    let conn = match pool.get().await {
        Ok(c) => c,
        Err(e) => {
            error!("💥 Failed to get connection from pool: {}", e);
            return Err(Box::new(e));
        }
    };

    let count = |query: &str| -> Result<i64, rusqlite::Error> {
        conn.query_row(query, [], |row| row.get(0))
    };

    let total_contacts = count("SELECT COUNT(*) FROM contacts")?;
    let contacts_with_email =
        count("SELECT COUNT(*) FROM contacts WHERE email IS NOT NULL AND email != ''")?;
    let contacts_with_phone =
        count("SELECT COUNT(*) FROM contacts WHERE phone IS NOT NULL AND phone != ''")?;
    let history_records = count("SELECT COUNT(*) FROM dispatch_history")?;

    let mut queue = Vec::new();
    for channel in Channel::ALL {
        let mut stats = QueueChannelStats {
            channel: channel.as_str().to_string(),
            pending: 0,
            sending: 0,
            sent: 0,
            failed: 0,
        };

        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM dispatch_queue WHERE channel = ?1 GROUP BY status",
        )?;
        let rows = stmt.query_map([channel.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (status, n) = row?;
            match status.as_str() {
                "pending" => stats.pending = n,
                "sending" => stats.sending = n,
                "sent" => stats.sent = n,
                "failed" => stats.failed = n,
                other => debug!("unknown queue status in stats: {}", other),
            }
        }

        queue.push(stats);
    }

    Ok(DatabaseStats {
        total_contacts,
        contacts_with_email,
        contacts_with_phone,
        queue,
        history_records,
    })
}

pub async fn recent_history(
    pool: &DbPool,
    limit: i64,
) -> Result<Vec<HistoryRecord>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;

    let mut stmt = conn.prepare(
        "SELECT id, contact_id, channel, status, sent_at, message_id, details
         FROM dispatch_history ORDER BY sent_at DESC, id DESC LIMIT ?1",
    )?;

    let record_iter = stmt.query_map([limit], |row| {
        let channel_label: String = row.get(2)?;
        let channel = Channel::parse(&channel_label).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(2, channel_label.clone(), rusqlite::types::Type::Text)
        })?;
        let sent_at_str: String = row.get(4)?;

        Ok(HistoryRecord {
            id: row.get(0)?,
            contact_id: row.get(1)?,
            channel,
            status: row.get(3)?,
            sent_at: parse_timestamp(4, sent_at_str)?,
            message_id: row.get(5)?,
            details: row.get(6)?,
        })
    })?;

    let mut records = Vec::new();
    for record in record_iter {
        records.push(record?);
    }

    Ok(records)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    // Pool over a throwaway database file. The TempDir must stay alive
    // for the duration of the test.
    pub(crate) async fn test_pool() -> (tempfile::TempDir, DbPool) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outreach.db");
        let pool = create_db_pool(path.to_str().unwrap()).await.unwrap();
        (dir, pool)
    }

    pub(crate) async fn contact_id_by_company(pool: &DbPool, company: &str) -> i64 {
        let conn = pool.get().await.unwrap();
        conn.query_row(
            "SELECT id FROM contacts WHERE company_name = ?1",
            [company],
            |row| row.get(0),
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_is_created_on_first_connect() {
        let (_dir, pool) = test_support::test_pool().await;
        let conn = pool.get().await.unwrap();

        for table in [
            "contacts",
            "dispatch_queue",
            "dispatch_history",
            "automation_config",
        ] {
            let found: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(found, 1, "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn upsert_contact_updates_existing_email() {
        let (_dir, pool) = test_support::test_pool().await;

        let first = ContactImport {
            company_name: "Cafetería Luna".to_string(),
            contact_name: None,
            email: Some("hola@cafeluna.mx".to_string()),
            phone: None,
            tier: Tier::B,
        };
        upsert_contact(&pool, &first).await.unwrap();

        let second = ContactImport {
            company_name: "Cafetería Luna".to_string(),
            contact_name: Some("Lucía".to_string()),
            email: Some("hola@cafeluna.mx".to_string()),
            phone: Some("+5215511112222".to_string()),
            tier: Tier::Aa,
        };
        upsert_contact(&pool, &second).await.unwrap();

        let conn = pool.get().await.unwrap();
        let (total, tier, phone): (i64, String, Option<String>) = conn
            .query_row(
                "SELECT COUNT(*), MAX(tier), MAX(phone) FROM contacts WHERE email = 'hola@cafeluna.mx'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();

        assert_eq!(total, 1);
        assert_eq!(tier, "AA");
        assert_eq!(phone.as_deref(), Some("+5215511112222"));
    }

    #[tokio::test]
    async fn daily_limit_round_trips_through_config_table() {
        let (_dir, pool) = test_support::test_pool().await;

        set_daily_limit(&pool, Channel::Email, 40).await.unwrap();
        set_daily_limit(&pool, Channel::Email, 55).await.unwrap();

        let conn = pool.get().await.unwrap();
        let stored: i64 = conn
            .query_row(
                "SELECT daily_limit FROM automation_config WHERE channel = 'email'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored, 55);
    }

    #[tokio::test]
    async fn stats_count_queue_rows_per_channel() {
        let (_dir, pool) = test_support::test_pool().await;

        let contact = ContactImport {
            company_name: "Ferretería Paz".to_string(),
            contact_name: None,
            email: Some("ventas@fepaz.mx".to_string()),
            phone: None,
            tier: Tier::A,
        };
        upsert_contact(&pool, &contact).await.unwrap();
        let contact_id = test_support::contact_id_by_company(&pool, "Ferretería Paz").await;

        let conn = pool.get().await.unwrap();
        let now = Utc::now().to_rfc3339();
        for status in ["pending", "pending", "failed"] {
            conn.execute(
                "INSERT INTO dispatch_queue (contact_id, channel, status, priority, created_at)
                 VALUES (?1, 'email', ?2, 50, ?3)",
                params![contact_id, status, now],
            )
            .unwrap();
        }
        drop(conn);

        let stats = get_database_stats(&pool).await.unwrap();
        assert_eq!(stats.total_contacts, 1);
        assert_eq!(stats.contacts_with_email, 1);

        let email_queue = stats.queue.iter().find(|q| q.channel == "email").unwrap();
        assert_eq!(email_queue.pending, 2);
        assert_eq!(email_queue.failed, 1);
        assert_eq!(email_queue.sent, 0);
    }
}

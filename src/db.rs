//! # Contact Storage Module
//!
//! Per-group contact table with click counters. The menu controller only sees the
//! [`ContactStore`] trait; [`PgContactStore`] is the PostgreSQL implementation.
//!
//! Writes that can race (the upsert on add and the click increment) are single
//! statements so the database applies them atomically.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::{debug, info, warn};

pub type GroupId = i64;

/// A contact entry as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Contact {
    pub id: i32,
    pub service: String,
    pub phone: String,
    pub click_count: i32,
    pub group_id: GroupId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `(service, phone)` as listed to users
pub type ContactEntry = (String, String);

/// `(service, phone, click_count)` as listed in ranked or admin views
pub type RankedEntry = (String, String, i64);

/// Storage contract used by the menu controller
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// All contacts of a group ordered case-insensitively by service
    async fn list_contacts(&self, group_id: GroupId) -> Result<Vec<ContactEntry>>;

    /// Same ordering as `list_contacts`, with click counts
    async fn list_contacts_with_clicks(&self, group_id: GroupId) -> Result<Vec<RankedEntry>>;

    async fn get_contact(&self, service: &str, group_id: GroupId) -> Result<Option<Contact>>;

    /// Insert, or replace the phone if the service already exists in the group
    async fn upsert_contact(&self, service: &str, phone: &str, group_id: GroupId) -> Result<bool>;

    /// Returns `false` when no such contact existed
    async fn delete_contact(&self, service: &str, group_id: GroupId) -> Result<bool>;

    /// Returns `false` when no such contact existed
    async fn increment_click_count(&self, service: &str, group_id: GroupId) -> Result<bool>;

    /// Most clicked contacts first, only those clicked at least once
    async fn top_contacts(&self, limit: i64, group_id: GroupId) -> Result<Vec<RankedEntry>>;

    async fn count_contacts(&self, group_id: GroupId) -> Result<i64>;
}

/// Connect to PostgreSQL with a bounded pool
pub async fn connect(database_url: &str, min_connections: u32, max_connections: u32) -> Result<PgPool> {
    info!(min_connections, max_connections, "Connecting to PostgreSQL");

    PgPoolOptions::new()
        .min_connections(min_connections)
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS contacts (
            id SERIAL PRIMARY KEY,
            service TEXT NOT NULL,
            phone TEXT NOT NULL,
            click_count INTEGER NOT NULL DEFAULT 0 CHECK (click_count >= 0),
            group_id BIGINT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (service, group_id)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create contacts table")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_contacts_group_clicks
         ON contacts (group_id, click_count DESC)",
    )
    .execute(pool)
    .await
    .context("Failed to create click count index")?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts")
        .fetch_one(pool)
        .await
        .context("Failed to count contacts")?;

    info!(total_contacts = total, "Database schema initialized successfully");
    Ok(())
}

/// PostgreSQL-backed contact store
#[derive(Debug, Clone)]
pub struct PgContactStore {
    pool: PgPool,
}

impl PgContactStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ContactStore for PgContactStore {
    async fn list_contacts(&self, group_id: GroupId) -> Result<Vec<ContactEntry>> {
        let rows: Vec<ContactEntry> = sqlx::query_as(
            "SELECT service, phone FROM contacts
             WHERE group_id = $1
             ORDER BY LOWER(service)",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list contacts")?;

        debug!(group_id, count = rows.len(), "Listed contacts");
        Ok(rows)
    }

    async fn list_contacts_with_clicks(&self, group_id: GroupId) -> Result<Vec<RankedEntry>> {
        let rows: Vec<RankedEntry> = sqlx::query_as(
            "SELECT service, phone, click_count::BIGINT FROM contacts
             WHERE group_id = $1
             ORDER BY LOWER(service)",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list contacts with clicks")?;

        Ok(rows)
    }

    async fn get_contact(&self, service: &str, group_id: GroupId) -> Result<Option<Contact>> {
        sqlx::query_as::<_, Contact>(
            "SELECT id, service, phone, click_count, group_id, created_at, updated_at
             FROM contacts
             WHERE service = $1 AND group_id = $2",
        )
        .bind(service)
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to read contact")
    }

    async fn upsert_contact(&self, service: &str, phone: &str, group_id: GroupId) -> Result<bool> {
        // xmax is 0 only for freshly inserted rows
        let inserted: bool = sqlx::query_scalar(
            "INSERT INTO contacts (service, phone, group_id)
             VALUES ($1, $2, $3)
             ON CONFLICT (service, group_id)
             DO UPDATE SET phone = EXCLUDED.phone, updated_at = NOW()
             RETURNING (xmax = 0)",
        )
        .bind(service)
        .bind(phone)
        .bind(group_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to upsert contact")?;

        if inserted {
            info!(service, group_id, "Contact added");
        } else {
            info!(service, group_id, "Contact updated");
        }
        Ok(true)
    }

    async fn delete_contact(&self, service: &str, group_id: GroupId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contacts WHERE service = $1 AND group_id = $2")
            .bind(service)
            .bind(group_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete contact")?;

        if result.rows_affected() > 0 {
            info!(service, group_id, "Contact deleted");
            Ok(true)
        } else {
            warn!(service, group_id, "No contact to delete");
            Ok(false)
        }
    }

    async fn increment_click_count(&self, service: &str, group_id: GroupId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE contacts SET click_count = click_count + 1
             WHERE service = $1 AND group_id = $2",
        )
        .bind(service)
        .bind(group_id)
        .execute(&self.pool)
        .await
        .context("Failed to increment click count")?;

        if result.rows_affected() == 0 {
            warn!(service, group_id, "Click on unknown contact");
        }
        Ok(result.rows_affected() > 0)
    }

    async fn top_contacts(&self, limit: i64, group_id: GroupId) -> Result<Vec<RankedEntry>> {
        sqlx::query_as(
            "SELECT service, phone, click_count::BIGINT FROM contacts
             WHERE group_id = $1 AND click_count > 0
             ORDER BY click_count DESC
             LIMIT $2",
        )
        .bind(group_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load top contacts")
    }

    async fn count_contacts(&self, group_id: GroupId) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE group_id = $1")
            .bind(group_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count contacts")
    }
}

//! SQLite-backed destination store

use super::DataDestination;
use crate::schema::{FieldType, Schema};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Initialize database connection and create the node metadata table
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Use sqlite options to create database if it doesn't exist
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL lets the external tool insert rows while the bridge reads and
    // writes node metadata on the same file
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_data_nodes_table(&pool).await?;

    Ok(pool)
}

async fn create_data_nodes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS data_nodes (
            name TEXT PRIMARY KEY,
            use_double_buffering INTEGER NOT NULL DEFAULT 0,
            read_dataset_idx INTEGER NOT NULL DEFAULT 0 CHECK (read_dataset_idx IN (0, 1)),
            schema TEXT,
            last_source_marker TEXT,
            updated_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// A destination node persisted in SQLite
///
/// Metadata lives in the `data_nodes` table; imported rows live in paired
/// dataset tables `<name>_d0` / `<name>_d1`. Which of the pair is visible
/// to readers is tracked by `read_dataset_idx`.
pub struct SqliteDataNode {
    pool: SqlitePool,
    db_path: PathBuf,
    name: String,
    use_double_buffering: bool,
    read_dataset_idx: i64,
    schema: Option<Schema>,
    last_source_marker: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl SqliteDataNode {
    /// Load the named node, creating its metadata row on first use
    pub async fn open(
        pool: SqlitePool,
        db_path: impl Into<PathBuf>,
        name: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let db_path = db_path.into();

        sqlx::query("INSERT OR IGNORE INTO data_nodes (name) VALUES (?)")
            .bind(&name)
            .execute(&pool)
            .await?;

        let row: (i64, i64, Option<String>, Option<String>, Option<DateTime<Utc>>) =
            sqlx::query_as(
                r#"
                SELECT use_double_buffering, read_dataset_idx, schema, last_source_marker, updated_at
                FROM data_nodes WHERE name = ?
                "#,
            )
            .bind(&name)
            .fetch_one(&pool)
            .await?;

        let schema = match row.2 {
            Some(json) => Some(serde_json::from_str(&json).map_err(|e| {
                Error::Internal(format!("corrupt schema for node {}: {}", name, e))
            })?),
            None => None,
        };

        Ok(Self {
            pool,
            db_path,
            name,
            use_double_buffering: row.0 != 0,
            read_dataset_idx: row.1,
            schema,
            last_source_marker: row.3,
            updated_at: row.4,
        })
    }

    /// Connection pool, exposed so callers can run verification queries
    /// against the dataset tables
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn dataset_name(&self, idx: i64) -> String {
        format!("{}_d{}", self.name, idx)
    }

    fn write_dataset_idx(&self) -> i64 {
        if self.use_double_buffering {
            1 - self.read_dataset_idx
        } else {
            self.read_dataset_idx
        }
    }

    /// Count of rows currently visible to readers
    pub async fn read_row_count(&self) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&self.read_dataset()));
        Ok(sqlx::query_scalar(&sql).fetch_one(&self.pool).await?)
    }
}

impl DataDestination for SqliteDataNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn storage_location(&self) -> &Path {
        &self.db_path
    }

    fn write_dataset(&self) -> String {
        self.dataset_name(self.write_dataset_idx())
    }

    fn read_dataset(&self) -> String {
        self.dataset_name(self.read_dataset_idx)
    }

    fn use_double_buffering(&self) -> bool {
        self.use_double_buffering
    }

    fn set_double_buffering(&mut self, enabled: bool) {
        self.use_double_buffering = enabled;
    }

    fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    fn set_schema(&mut self, schema: Schema) {
        self.schema = Some(schema);
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(at);
    }

    fn last_source_marker(&self) -> Option<&str> {
        self.last_source_marker.as_deref()
    }

    fn set_last_source_marker(&mut self, marker: String) {
        self.last_source_marker = Some(marker);
    }

    async fn recreate_write_dataset(&self) -> Result<()> {
        let schema = self.schema.as_ref().ok_or_else(|| {
            Error::Internal(format!(
                "cannot create dataset for node {} without a schema",
                self.name
            ))
        })?;

        let table = quote_ident(&self.write_dataset());

        let drop_sql = format!("DROP TABLE IF EXISTS {}", table);
        sqlx::query(&drop_sql).execute(&self.pool).await?;

        // _id numbers rows in insertion order, starting at 1
        let mut columns = vec!["_id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
        for field in &schema.fields {
            columns.push(format!(
                "{} {}",
                quote_ident(&field.name),
                sqlite_column_type(&field.field_type)
            ));
        }
        let create_sql = format!("CREATE TABLE {} ({})", table, columns.join(", "));
        sqlx::query(&create_sql).execute(&self.pool).await?;

        debug!(node = %self.name, table = %self.write_dataset(), "recreated write dataset");
        Ok(())
    }

    fn promote_write_dataset(&mut self) {
        if self.use_double_buffering {
            self.read_dataset_idx = 1 - self.read_dataset_idx;
        }
    }

    async fn persist(&self) -> Result<()> {
        let schema_json = match &self.schema {
            Some(schema) => Some(serde_json::to_string(schema).map_err(|e| {
                Error::Internal(format!(
                    "cannot serialize schema for node {}: {}",
                    self.name, e
                ))
            })?),
            None => None,
        };

        sqlx::query(
            r#"
            UPDATE data_nodes
            SET use_double_buffering = ?, read_dataset_idx = ?, schema = ?,
                last_source_marker = ?, updated_at = ?
            WHERE name = ?
            "#,
        )
        .bind(self.use_double_buffering as i64)
        .bind(self.read_dataset_idx)
        .bind(schema_json)
        .bind(&self.last_source_marker)
        .bind(self.updated_at)
        .bind(&self.name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sqlite_column_type(field_type: &FieldType) -> &'static str {
    match field_type {
        FieldType::Boolean | FieldType::Integer => "INTEGER",
        FieldType::Double => "REAL",
        FieldType::String | FieldType::Datetime | FieldType::Json | FieldType::Other(_) => "TEXT",
    }
}

//! SQLite-backed persistence gateway.
//!
//! Owns the complaints table, the append-only update history, the
//! notification log, admin users, and the media blob store.
//! Location: /var/lib/shikayat/complaints.db (overridable via config).

use crate::types::{
    Complaint, ComplaintFilters, ComplaintStats, ComplaintUpdate, IssueType, Severity, Status,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Admin account row, as stored.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
}

/// Complaint store backed by SQLite.
pub struct ComplaintStore {
    conn: Arc<Mutex<Connection>>,
}

impl ComplaintStore {
    /// Open or create the store at a specific path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {:?}", path))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("/var/lib/shikayat/complaints.db")
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS complaints (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tracking_id TEXT NOT NULL UNIQUE,
                issue_type TEXT NOT NULL,
                severity TEXT NOT NULL,
                department TEXT NOT NULL,
                description TEXT NOT NULL,
                district TEXT NOT NULL,
                location TEXT NOT NULL,
                latitude REAL,
                longitude REAL,
                status TEXT NOT NULL,
                email TEXT,
                phone TEXT,
                image_ref TEXT,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS complaint_updates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tracking_id TEXT NOT NULL,
                old_status TEXT NOT NULL,
                new_status TEXT NOT NULL,
                note TEXT NOT NULL,
                updated_by TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS notifications_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tracking_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                recipient TEXT NOT NULL,
                message TEXT NOT NULL,
                status TEXT NOT NULL,
                sent_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS admin_users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                full_name TEXT NOT NULL DEFAULT '',
                role TEXT NOT NULL DEFAULT 'admin',
                is_active INTEGER NOT NULL DEFAULT 1,
                last_login TEXT
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS media (
                ref TEXT PRIMARY KEY,
                content_type TEXT NOT NULL,
                bytes BLOB NOT NULL,
                stored_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_complaints_district ON complaints(district)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_complaints_status ON complaints(status)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_updates_tracking ON complaint_updates(tracking_id)",
            [],
        )?;

        Ok(())
    }

    // ==================== COMPLAINTS ====================

    /// Insert a new complaint. Returns false when the tracking id already
    /// exists, so the caller can mint a fresh one and retry.
    pub fn create_complaint(&self, complaint: &Complaint) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let result = conn.execute(
            r#"
            INSERT INTO complaints
                (tracking_id, issue_type, severity, department, description,
                 district, location, latitude, longitude, status, email,
                 phone, image_ref, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                complaint.tracking_id,
                complaint.issue_type.as_str(),
                complaint.severity.as_str(),
                complaint.department,
                complaint.description,
                complaint.district,
                complaint.location,
                complaint.latitude,
                complaint.longitude,
                complaint.status.as_str(),
                complaint.email,
                complaint.phone,
                complaint.image_ref,
                complaint.created_at,
            ],
        );

        match result {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(e).context("Failed to insert complaint"),
        }
    }

    /// Get a complaint by tracking id.
    pub fn get(&self, tracking_id: &str) -> Result<Option<Complaint>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT tracking_id, issue_type, severity, department, description,
                    district, location, latitude, longitude, status, email,
                    phone, image_ref, created_at
             FROM complaints WHERE tracking_id = ?1",
            params![tracking_id],
            complaint_from_row,
        )
        .optional()
        .context("Failed to fetch complaint")
    }

    /// List complaints, newest first, with optional filters.
    pub fn list(&self, filters: &ComplaintFilters) -> Result<Vec<Complaint>> {
        let mut sql = String::from(
            "SELECT tracking_id, issue_type, severity, department, description,
                    district, location, latitude, longitude, status, email,
                    phone, image_ref, created_at
             FROM complaints",
        );
        let mut clauses: Vec<&str> = Vec::new();
        let mut binds: Vec<String> = Vec::new();

        if let Some(district) = &filters.district {
            clauses.push("district = ?");
            binds.push(district.clone());
        }
        if let Some(status) = filters.status {
            clauses.push("status = ?");
            binds.push(status.as_str().to_string());
        }
        if let Some(severity) = filters.severity {
            clauses.push("severity = ?");
            binds.push(severity.as_str().to_string());
        }
        if let Some(issue_type) = filters.issue_type {
            clauses.push("issue_type = ?");
            binds.push(issue_type.as_str().to_string());
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC");

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(binds.iter()), complaint_from_row)?;
        let mut complaints = Vec::new();
        for row in rows {
            complaints.push(row?);
        }
        Ok(complaints)
    }

    /// Optimistic status update: writes only when the stored status still
    /// matches what the caller read. Returns false on a stale read.
    pub fn update_status_checked(
        &self,
        tracking_id: &str,
        expected: Status,
        new_status: Status,
    ) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE complaints SET status = ?1 WHERE tracking_id = ?2 AND status = ?3",
            params![new_status.as_str(), tracking_id, expected.as_str()],
        )?;
        Ok(changed == 1)
    }

    // ==================== UPDATE HISTORY ====================

    /// Append an immutable audit row. Rows are never mutated or deleted.
    pub fn append_update(&self, update: &ComplaintUpdate) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO complaint_updates
                (tracking_id, old_status, new_status, note, updated_by, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                update.tracking_id,
                update.old_status.as_str(),
                update.new_status.as_str(),
                update.note,
                update.updated_by,
                update.updated_at,
            ],
        )
        .context("Failed to append complaint update")?;
        Ok(())
    }

    /// Full history for one complaint, oldest first.
    pub fn history(&self, tracking_id: &str) -> Result<Vec<ComplaintUpdate>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT tracking_id, old_status, new_status, note, updated_by, updated_at
             FROM complaint_updates WHERE tracking_id = ?1
             ORDER BY updated_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![tracking_id], |row| {
            Ok(ComplaintUpdate {
                tracking_id: row.get(0)?,
                old_status: parse_status(row.get::<_, String>(1)?, 1)?,
                new_status: parse_status(row.get::<_, String>(2)?, 2)?,
                note: row.get(3)?,
                updated_by: row.get(4)?,
                updated_at: row.get(5)?,
            })
        })?;
        let mut updates = Vec::new();
        for row in rows {
            updates.push(row?);
        }
        Ok(updates)
    }

    // ==================== NOTIFICATIONS ====================

    pub fn log_notification(
        &self,
        tracking_id: &str,
        kind: &str,
        recipient: &str,
        message: &str,
        status: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO notifications_log (tracking_id, kind, recipient, message, status, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![tracking_id, kind, recipient, message, status, Utc::now()],
        )
        .context("Failed to log notification")?;
        Ok(())
    }

    // ==================== ANALYTICS ====================

    pub fn stats(&self) -> Result<ComplaintStats> {
        let complaints = self.list(&ComplaintFilters::default())?;
        let mut stats = ComplaintStats {
            total: complaints.len(),
            ..Default::default()
        };
        for c in &complaints {
            *stats.by_status.entry(c.status.as_str().to_string()).or_insert(0) += 1;
            *stats.by_district.entry(c.district.clone()).or_insert(0) += 1;
            *stats
                .by_severity
                .entry(c.severity.as_str().to_string())
                .or_insert(0) += 1;
            *stats
                .by_type
                .entry(c.issue_type.as_str().to_string())
                .or_insert(0) += 1;
        }
        Ok(stats)
    }

    // ==================== MEDIA BLOBS ====================

    /// Store media bytes, returning an opaque reference.
    pub fn store_media(&self, bytes: &[u8], content_type: &str) -> Result<String> {
        let media_ref = uuid::Uuid::new_v4().to_string();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO media (ref, content_type, bytes, stored_at) VALUES (?1, ?2, ?3, ?4)",
            params![media_ref, content_type, bytes, Utc::now()],
        )
        .context("Failed to store media")?;
        Ok(media_ref)
    }

    pub fn media(&self, media_ref: &str) -> Result<Option<(Vec<u8>, String)>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT bytes, content_type FROM media WHERE ref = ?1",
            params![media_ref],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .context("Failed to fetch media")
    }

    // ==================== ADMIN USERS ====================

    pub fn find_admin(&self, username: &str) -> Result<Option<AdminUser>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, username, password_hash, full_name, role, is_active
             FROM admin_users WHERE username = ?1",
            params![username],
            |row| {
                Ok(AdminUser {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    password_hash: row.get(2)?,
                    full_name: row.get(3)?,
                    role: row.get(4)?,
                    is_active: row.get::<_, i64>(5)? != 0,
                })
            },
        )
        .optional()
        .context("Failed to fetch admin user")
    }

    pub fn insert_admin(
        &self,
        username: &str,
        password_hash: &str,
        full_name: &str,
        role: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO admin_users (username, password_hash, full_name, role) VALUES (?1, ?2, ?3, ?4)",
            params![username, password_hash, full_name, role],
        )
        .context("Failed to insert admin user")?;
        Ok(())
    }

    pub fn touch_last_login(&self, admin_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE admin_users SET last_login = ?1 WHERE id = ?2",
            params![Utc::now(), admin_id],
        )?;
        Ok(())
    }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn parse_status(raw: String, col: usize) -> rusqlite::Result<Status> {
    Status::parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            col,
            rusqlite::types::Type::Text,
            format!("unknown status '{}'", raw).into(),
        )
    })
}

fn complaint_from_row(row: &Row<'_>) -> rusqlite::Result<Complaint> {
    let issue_raw: String = row.get(1)?;
    let severity_raw: String = row.get(2)?;
    Ok(Complaint {
        tracking_id: row.get(0)?,
        issue_type: IssueType::parse(&issue_raw).unwrap_or(IssueType::Other),
        severity: Severity::parse(&severity_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("unknown severity '{}'", severity_raw).into(),
            )
        })?,
        department: row.get(3)?,
        description: row.get(4)?,
        district: row.get(5)?,
        location: row.get(6)?,
        latitude: row.get(7)?,
        longitude: row.get(8)?,
        status: parse_status(row.get::<_, String>(9)?, 9)?,
        email: row.get(10)?,
        phone: row.get(11)?,
        image_ref: row.get(12)?,
        created_at: row.get::<_, DateTime<Utc>>(13)?,
    })
}

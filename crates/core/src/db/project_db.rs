use std::collections::BTreeSet;
use std::path::Path;

use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use thiserror::Error;

use crate::db::{ApplicationSummary, DetectionRunRecord, DetectionRunStatus, StoredFlag};
use crate::graph::{
    CallEdge, CallGraph, FlagKind, FlagRecord, FlaggingSink, GraphError, GraphSnapshot,
    ObjectFilter, ObjectSource,
};
use crate::model::{DetectionCategory, NameField, ObjectId, ObjectRecord};

/// Minimum schema version we know how to handle.
///
/// `0` means "no schema yet" (fresh DB).
const MIN_SUPPORTED_SCHEMA_VERSION: i32 = 0;

/// Latest schema version this crate knows about.
pub const CURRENT_SCHEMA_VERSION: i32 = 4;

/// Ids bound per `IN (...)` query; stays well below SQLite's parameter limit.
const ID_CHUNK: usize = 500;

/// Error type for project database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The database was created with a newer schema version than we support.
    #[error(
        "Unsupported schema version {found}; supported range is {min_supported}..={max_supported}"
    )]
    UnsupportedSchemaVersion { found: i32, min_supported: i32, max_supported: i32 },
}

/// Convenience result type for DB operations.
pub type DbResult<T> = Result<T, DbError>;

/// Rows written by [`ProjectDb::import_snapshot`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImportSummary {
    pub objects: usize,
    pub edges: usize,
}

/// SQLite-backed project database.
///
/// Stores imported objects and call edges per application, the flags written
/// by detection, and a history of detection runs. It also serves as the
/// object source, call graph and flagging sink of CLI projects.
#[derive(Debug)]
pub struct ProjectDb {
    conn: Connection,
}

impl ProjectDb {
    /// Open (or create) a project database at the given path and ensure the schema exists.
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Fresh in-memory database with the current schema.
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Expose a reference to the underlying connection for advanced callers.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn schema_version(&self) -> DbResult<i32> {
        current_schema_version(&self.conn)
    }

    /// Insert or update one object; re-importing keeps its original position.
    pub fn upsert_object(&self, application: &str, record: &ObjectRecord) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO objects
                (object_id, application, name, full_name, level, internal_type, external)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(object_id) DO UPDATE SET
                application   = excluded.application,
                name          = excluded.name,
                full_name     = excluded.full_name,
                level         = excluded.level,
                internal_type = excluded.internal_type,
                external      = excluded.external
            "#,
            params![
                id_to_sql(record.id),
                application,
                record.name,
                record.full_name,
                record.level,
                record.internal_type,
                record.external
            ],
        )?;
        Ok(())
    }

    /// Insert a call edge; duplicates are ignored.
    pub fn insert_edge(&self, edge: &CallEdge) -> DbResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO call_edges (source, target) VALUES (?1, ?2)",
            params![id_to_sql(edge.source), id_to_sql(edge.target)],
        )?;
        Ok(())
    }

    /// Write a whole snapshot in one transaction.
    pub fn import_snapshot(&self, snapshot: &GraphSnapshot) -> DbResult<ImportSummary> {
        let tx = self.conn.unchecked_transaction()?;
        for record in &snapshot.objects {
            self.upsert_object(&snapshot.application, record)?;
        }
        for edge in &snapshot.edges {
            self.insert_edge(edge)?;
        }
        tx.commit()?;
        Ok(ImportSummary { objects: snapshot.objects.len(), edges: snapshot.edges.len() })
    }

    /// All objects of an application, in import order.
    pub fn list_objects(&self, application: &str) -> DbResult<Vec<ObjectRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT object_id, name, full_name, level, internal_type, external
            FROM objects
            WHERE application = ?1
            ORDER BY row_id
            "#,
        )?;
        let rows = stmt.query_map(params![application], map_object)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn get_object(&self, id: ObjectId) -> DbResult<Option<ObjectRecord>> {
        let record = self
            .conn
            .query_row(
                r#"
                SELECT object_id, name, full_name, level, internal_type, external
                FROM objects
                WHERE object_id = ?1
                "#,
                params![id_to_sql(id)],
                map_object,
            )
            .optional()?;
        Ok(record)
    }

    /// Applications with their object and outgoing-edge totals, by name.
    pub fn list_applications(&self) -> DbResult<Vec<ApplicationSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT o.application,
                   COUNT(*),
                   SUM(o.external),
                   (SELECT COUNT(*) FROM call_edges e
                    JOIN objects s ON s.object_id = e.source
                    WHERE s.application = o.application)
            FROM objects o
            GROUP BY o.application
            ORDER BY o.application
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ApplicationSummary {
                name: row.get(0)?,
                objects: row.get(1)?,
                external: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                edges: row.get(3)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Persist a flag and return its row id.
    ///
    /// An object holds at most one flag per kind; flagging it again replaces
    /// the values in place and keeps the original row id.
    pub fn insert_flag(&self, flag: &FlagRecord) -> DbResult<i64> {
        let id = self.conn.query_row(
            r#"
            INSERT INTO flags (object_id, kind, taxonomy, core_name, category, flagged_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(object_id, kind) DO UPDATE SET
                taxonomy   = excluded.taxonomy,
                core_name  = excluded.core_name,
                category   = excluded.category,
                flagged_at = excluded.flagged_at
            RETURNING id
            "#,
            params![
                id_to_sql(flag.object_id),
                flag.kind.as_str(),
                flag.taxonomy,
                flag.core_name,
                flag.category.map(|c| c.label()),
                Utc::now().to_rfc3339()
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Flags, optionally restricted to one application's objects (ordered by id).
    pub fn list_flags(&self, application: Option<&str>) -> DbResult<Vec<StoredFlag>> {
        fn map_flag(row: &Row<'_>) -> rusqlite::Result<StoredFlag> {
            let kind: String = row.get(1)?;
            let category: Option<String> = row.get(4)?;
            Ok(StoredFlag {
                flag: FlagRecord {
                    object_id: id_from_sql(row.get(0)?),
                    kind: FlagKind::parse(&kind).unwrap_or(FlagKind::External),
                    taxonomy: row.get(2)?,
                    core_name: row.get(3)?,
                    category: category.as_deref().and_then(DetectionCategory::from_label),
                },
                flagged_at: row.get(5)?,
            })
        }

        let mut stmt = if application.is_some() {
            self.conn.prepare(
                r#"
                SELECT f.object_id, f.kind, f.taxonomy, f.core_name, f.category, f.flagged_at
                FROM flags f
                JOIN objects o ON o.object_id = f.object_id
                WHERE o.application = ?1
                ORDER BY f.id
                "#,
            )?
        } else {
            self.conn.prepare(
                r#"
                SELECT object_id, kind, taxonomy, core_name, category, flagged_at
                FROM flags
                ORDER BY id
                "#,
            )?
        };

        let rows = if let Some(app) = application {
            stmt.query_map(params![app], map_flag)?
        } else {
            stmt.query_map([], map_flag)?
        };

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Insert a detection run record and return its row id.
    pub fn insert_detection_run(&self, record: &DetectionRunRecord) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO detection_runs
                (application, language, inventory_hash, status, core_full_name, core_name,
                 variation, depth, flagged, skipped, started_at, finished_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                record.application,
                record.language,
                record.inventory_hash,
                record.status.as_str(),
                record.core_full_name,
                record.core_name,
                record.variation,
                record.depth,
                record.flagged,
                record.skipped,
                record.started_at,
                record.finished_at
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// List detection runs, optionally filtered by application.
    pub fn list_detection_runs(
        &self,
        application: Option<&str>,
    ) -> DbResult<Vec<DetectionRunRecord>> {
        fn map_run(row: &Row<'_>) -> rusqlite::Result<DetectionRunRecord> {
            let status: String = row.get(3)?;
            Ok(DetectionRunRecord {
                application: row.get(0)?,
                language: row.get(1)?,
                inventory_hash: row.get(2)?,
                status: DetectionRunStatus::from_db_str(&status),
                core_full_name: row.get(4)?,
                core_name: row.get(5)?,
                variation: row.get(6)?,
                depth: row.get(7)?,
                flagged: row.get(8)?,
                skipped: row.get(9)?,
                started_at: row.get(10)?,
                finished_at: row.get(11)?,
            })
        }

        let mut stmt = if application.is_some() {
            self.conn.prepare(
                r#"
                SELECT application, language, inventory_hash, status, core_full_name, core_name,
                       variation, depth, flagged, skipped, started_at, finished_at
                FROM detection_runs
                WHERE application = ?1
                ORDER BY id
                "#,
            )?
        } else {
            self.conn.prepare(
                r#"
                SELECT application, language, inventory_hash, status, core_full_name, core_name,
                       variation, depth, flagged, skipped, started_at, finished_at
                FROM detection_runs
                ORDER BY id
                "#,
            )?
        };

        let rows = if let Some(app) = application {
            stmt.query_map(params![app], map_run)?
        } else {
            stmt.query_map([], map_run)?
        };

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// One-hop neighbours of `ids`, excluding `ids` themselves, sorted.
    fn one_hop(&self, ids: &[ObjectId], outgoing: bool) -> DbResult<Vec<ObjectId>> {
        let (from, to) = if outgoing { ("source", "target") } else { ("target", "source") };
        let queried: BTreeSet<ObjectId> = ids.iter().copied().collect();
        let mut found = BTreeSet::new();

        for chunk in ids.chunks(ID_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql =
                format!("SELECT DISTINCT {to} FROM call_edges WHERE {from} IN ({placeholders})");
            let mut stmt = self.conn.prepare(&sql)?;
            let params = params_from_iter(chunk.iter().map(|id| id_to_sql(*id)));
            let rows = stmt.query_map(params, |row| row.get::<_, i64>(0))?;
            for row in rows {
                let id = id_from_sql(row?);
                if !queried.contains(&id) {
                    found.insert(id);
                }
            }
        }
        Ok(found.into_iter().collect())
    }
}

impl ObjectSource for ProjectDb {
    fn list_eligible_objects(
        &self,
        application: &str,
        filter: &ObjectFilter,
    ) -> Result<Vec<ObjectRecord>, GraphError> {
        let objects = self.list_objects(application)?;
        Ok(objects.into_iter().filter(|o| !o.external && filter.matches(o)).collect())
    }

    fn list_external_with_prefix(
        &self,
        application: &str,
        prefix: &str,
        field: NameField,
    ) -> Result<Vec<ObjectRecord>, GraphError> {
        // substr keeps the match case-sensitive, unlike LIKE.
        let column = field.column();
        let sql = format!(
            r#"
            SELECT object_id, name, full_name, level, internal_type, external
            FROM objects
            WHERE application = ?1
              AND external = 1
              AND {column} IS NOT NULL
              AND length({column}) > length(?2)
              AND substr({column}, 1, length(?2)) = ?2
            ORDER BY row_id
            "#
        );
        let mut stmt = self.conn.prepare(&sql).map_err(DbError::from)?;
        let rows = stmt.query_map(params![application, prefix], map_object).map_err(DbError::from)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(DbError::from)?);
        }
        Ok(out)
    }
}

impl CallGraph for ProjectDb {
    fn neighbors_out(&self, ids: &[ObjectId]) -> Result<Vec<ObjectId>, GraphError> {
        Ok(self.one_hop(ids, true)?)
    }

    fn neighbors_in(&self, ids: &[ObjectId]) -> Result<Vec<ObjectId>, GraphError> {
        Ok(self.one_hop(ids, false)?)
    }
}

impl FlaggingSink for ProjectDb {
    fn flag_as_core(
        &self,
        id: ObjectId,
        taxonomy: &str,
        core_name: &str,
    ) -> Result<(), GraphError> {
        self.insert_flag(&FlagRecord::core(id, taxonomy, core_name))?;
        Ok(())
    }

    fn flag_external(&self, id: ObjectId, category: DetectionCategory) -> Result<(), GraphError> {
        self.insert_flag(&FlagRecord::external(id, category))?;
        Ok(())
    }
}

fn map_object(row: &Row<'_>) -> rusqlite::Result<ObjectRecord> {
    Ok(ObjectRecord {
        id: id_from_sql(row.get(0)?),
        name: row.get(1)?,
        full_name: row.get(2)?,
        level: row.get(3)?,
        internal_type: row.get(4)?,
        external: row.get(5)?,
    })
}

// SQLite integers are signed; ids round-trip through their bit pattern.
fn id_to_sql(id: ObjectId) -> i64 {
    id.0 as i64
}

fn id_from_sql(value: i64) -> ObjectId {
    ObjectId(value as u64)
}

/// Apply schema migrations to bring the database to the latest version.
///
/// We use `PRAGMA user_version` as the schema version indicator.
///
/// Version map:
/// - 0: no schema
/// - 1: objects and call_edges
/// - 2: flags
/// - 3: detection_runs
/// - 4: one flag per (object_id, kind)
fn apply_migrations(conn: &Connection) -> DbResult<()> {
    let current_version = current_schema_version(conn)?;

    if current_version > CURRENT_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            found: current_version,
            min_supported: MIN_SUPPORTED_SCHEMA_VERSION,
            max_supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if current_version < 1 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS objects (
                row_id        INTEGER PRIMARY KEY AUTOINCREMENT,
                object_id     INTEGER NOT NULL UNIQUE,
                application   TEXT NOT NULL,
                name          TEXT,
                full_name     TEXT,
                level         TEXT,
                internal_type TEXT,
                external      INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_objects_application ON objects (application, external);

            CREATE TABLE IF NOT EXISTS call_edges (
                source INTEGER NOT NULL,
                target INTEGER NOT NULL,
                PRIMARY KEY (source, target)
            );
            CREATE INDEX IF NOT EXISTS idx_call_edges_target ON call_edges (target);

            PRAGMA user_version = 1;
            COMMIT;
            "#,
        )?;
    }

    if current_version < 2 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS flags (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                object_id  INTEGER NOT NULL,
                kind       TEXT NOT NULL,
                taxonomy   TEXT,
                core_name  TEXT,
                category   TEXT,
                flagged_at TEXT NOT NULL
            );

            PRAGMA user_version = 2;
            COMMIT;
            "#,
        )?;
    }

    if current_version < 3 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS detection_runs (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                application    TEXT NOT NULL,
                language       TEXT NOT NULL,
                inventory_hash TEXT,
                status         TEXT NOT NULL,
                core_full_name TEXT,
                core_name      TEXT,
                variation      REAL,
                depth          INTEGER,
                flagged        INTEGER NOT NULL DEFAULT 0,
                skipped        INTEGER NOT NULL DEFAULT 0,
                started_at     TEXT NOT NULL,
                finished_at    TEXT NOT NULL
            );

            PRAGMA user_version = 3;
            COMMIT;
            "#,
        )?;
    }

    if current_version < 4 {
        conn.execute_batch(
            r#"
            BEGIN;
            DELETE FROM flags
            WHERE id NOT IN (SELECT MAX(id) FROM flags GROUP BY object_id, kind);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_flags_object_kind ON flags (object_id, kind);

            PRAGMA user_version = 4;
            COMMIT;
            "#,
        )?;
    }

    Ok(())
}

/// Read the SQLite schema version from `PRAGMA user_version`.
fn current_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(version)
}

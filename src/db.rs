use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::gateway::Gateway;
use crate::model::{
    DrawingMetadata, Equipment, GoldenJoint, Instrument, PageSet, PageText, ParseStatus, PipeLine,
    TestPackage, Upload,
};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS projects (
            id         INTEGER PRIMARY KEY,
            name       TEXT UNIQUE NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS uploads (
            id            INTEGER PRIMARY KEY,
            project_id    INTEGER NOT NULL REFERENCES projects(id),
            filename      TEXT NOT NULL,
            storage_path  TEXT NOT NULL,
            total_pages   INTEGER,
            parse_status  TEXT NOT NULL DEFAULT 'pending'
                          CHECK(parse_status IN ('pending','processing','completed','failed')),
            progress      INTEGER NOT NULL DEFAULT 0 CHECK(progress BETWEEN 0 AND 100),
            error_message TEXT,
            started_at    TEXT,
            finished_at   TEXT,
            uploaded_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_uploads_project ON uploads(project_id);

        CREATE TABLE IF NOT EXISTS page_texts (
            id           INTEGER PRIMARY KEY,
            upload_id    INTEGER NOT NULL REFERENCES uploads(id),
            page_number  INTEGER NOT NULL CHECK(page_number >= 1),
            raw_text     TEXT NOT NULL,
            has_text     BOOLEAN NOT NULL,
            extracted_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(upload_id, page_number)
        );

        CREATE TABLE IF NOT EXISTS units (
            id         INTEGER PRIMARY KEY,
            project_id INTEGER NOT NULL REFERENCES projects(id),
            code       TEXT NOT NULL,
            name       TEXT,
            UNIQUE(project_id, code)
        );

        CREATE TABLE IF NOT EXISTS drawings (
            id         INTEGER PRIMARY KEY,
            project_id INTEGER NOT NULL REFERENCES projects(id),
            unit_id    INTEGER REFERENCES units(id),
            drawing_no TEXT NOT NULL,
            title      TEXT,
            revision   TEXT,
            rev_date   TEXT,
            page_start INTEGER NOT NULL,
            page_end   INTEGER NOT NULL,
            UNIQUE(project_id, drawing_no)
        );

        CREATE TABLE IF NOT EXISTS pipe_lines (
            id           INTEGER PRIMARY KEY,
            project_id   INTEGER NOT NULL REFERENCES projects(id),
            unit_id      INTEGER REFERENCES units(id),
            line_number  TEXT NOT NULL,
            nominal_size TEXT NOT NULL,
            service_code TEXT NOT NULL,
            spec_class   TEXT,
            source_pages TEXT NOT NULL,
            status       TEXT NOT NULL DEFAULT 'extracted'
                         CHECK(status IN ('extracted','verified','modified')),
            created_at   TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(project_id, line_number)
        );

        CREATE TABLE IF NOT EXISTS equipment (
            id           INTEGER PRIMARY KEY,
            project_id   INTEGER NOT NULL REFERENCES projects(id),
            unit_id      INTEGER REFERENCES units(id),
            tag_no       TEXT NOT NULL,
            equip_type   TEXT NOT NULL,
            source_pages TEXT NOT NULL,
            created_at   TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(project_id, tag_no)
        );

        CREATE TABLE IF NOT EXISTS instruments (
            id            INTEGER PRIMARY KEY,
            project_id    INTEGER NOT NULL REFERENCES projects(id),
            unit_id       INTEGER REFERENCES units(id),
            tag_no        TEXT NOT NULL,
            function_type TEXT NOT NULL,
            source_pages  TEXT NOT NULL,
            created_at    TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(project_id, tag_no)
        );

        CREATE TABLE IF NOT EXISTS test_packages (
            id            INTEGER PRIMARY KEY,
            project_id    INTEGER NOT NULL REFERENCES projects(id),
            package_no    TEXT NOT NULL,
            system_code   TEXT,
            test_pressure TEXT,
            test_medium   TEXT NOT NULL CHECK(test_medium IN ('H','V','P','S')),
            source_page   INTEGER NOT NULL,
            status        TEXT NOT NULL DEFAULT 'draft'
                          CHECK(status IN ('draft','ready','in_progress','completed','approved')),
            created_at    TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(project_id, package_no)
        );

        CREATE TABLE IF NOT EXISTS golden_joints (
            id              INTEGER PRIMARY KEY,
            project_id      INTEGER NOT NULL REFERENCES projects(id),
            upload_id       INTEGER NOT NULL REFERENCES uploads(id),
            test_package_id INTEGER REFERENCES test_packages(id),
            source_page     INTEGER NOT NULL,
            related_lines   TEXT NOT NULL,
            status          TEXT NOT NULL DEFAULT 'identified'
                            CHECK(status IN ('identified','welding','nde','pwht','approved')),
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(project_id, upload_id, source_page)
        );
        ",
    )?;
    Ok(())
}

// ── Projects & uploads ──

pub fn ensure_project(conn: &Connection, name: &str) -> Result<i64> {
    let id = conn.query_row(
        "INSERT INTO projects (name) VALUES (?1)
         ON CONFLICT(name) DO UPDATE SET name = excluded.name
         RETURNING id",
        params![name],
        |r| r.get(0),
    )?;
    Ok(id)
}

pub fn find_project(conn: &Connection, name: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row("SELECT id FROM projects WHERE name = ?1", params![name], |r| r.get(0))
        .optional()?;
    Ok(id)
}

pub fn insert_upload(
    conn: &Connection,
    project_id: i64,
    filename: &str,
    storage_path: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO uploads (project_id, filename, storage_path) VALUES (?1, ?2, ?3)",
        params![project_id, filename, storage_path],
    )?;
    Ok(conn.last_insert_rowid())
}

// ── Stats ──

pub struct ProjectStats {
    pub uploads: usize,
    pub pages: usize,
    pub units: usize,
    pub drawings: usize,
    pub lines: usize,
    pub equipment: usize,
    pub instruments: usize,
    pub packages: usize,
    pub golden_joints: usize,
}

pub fn get_stats(conn: &Connection, project_id: i64) -> Result<ProjectStats> {
    let count = |sql: &str| -> Result<usize> {
        Ok(conn.query_row(sql, params![project_id], |r| r.get(0))?)
    };
    Ok(ProjectStats {
        uploads: count("SELECT COUNT(*) FROM uploads WHERE project_id = ?1")?,
        pages: count(
            "SELECT COUNT(*) FROM page_texts pt
             JOIN uploads u ON u.id = pt.upload_id
             WHERE u.project_id = ?1",
        )?,
        units: count("SELECT COUNT(*) FROM units WHERE project_id = ?1")?,
        drawings: count("SELECT COUNT(*) FROM drawings WHERE project_id = ?1")?,
        lines: count("SELECT COUNT(*) FROM pipe_lines WHERE project_id = ?1")?,
        equipment: count("SELECT COUNT(*) FROM equipment WHERE project_id = ?1")?,
        instruments: count("SELECT COUNT(*) FROM instruments WHERE project_id = ?1")?,
        packages: count("SELECT COUNT(*) FROM test_packages WHERE project_id = ?1")?,
        golden_joints: count("SELECT COUNT(*) FROM golden_joints WHERE project_id = ?1")?,
    })
}

// ── Gateway ──

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        SqliteStore { conn }
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Insert each record, or union its pages into the stored row.
    fn merge_pages<T: PageMerged>(&self, project_id: i64, batch: &[T]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut select = tx.prepare(&format!(
                "SELECT id, source_pages FROM {} WHERE project_id = ?1 AND {} = ?2",
                T::TABLE,
                T::KEY_COL
            ))?;
            let mut update = tx.prepare(&format!(
                "UPDATE {} SET source_pages = ?2, unit_id = COALESCE(unit_id, ?3) WHERE id = ?1",
                T::TABLE
            ))?;

            for record in batch {
                let existing: Option<(i64, String)> = select
                    .query_row(params![project_id, record.key()], |r| {
                        Ok((r.get(0)?, r.get(1)?))
                    })
                    .optional()?;
                match existing {
                    Some((id, stored)) => {
                        let mut merged: PageSet = serde_json::from_str(&stored).with_context(
                            || format!("Bad source_pages in {} row {}", T::TABLE, id),
                        )?;
                        merged.extend(record.pages().iter().copied());
                        update.execute(params![id, pages_json(&merged)?, record.unit_id()])?;
                    }
                    None => {
                        let mut fields = vec![
                            ("project_id", SqlValue::from(project_id)),
                            (T::KEY_COL, SqlValue::from(record.key().to_string())),
                            ("source_pages", SqlValue::from(pages_json(record.pages())?)),
                            ("unit_id", SqlValue::from(record.unit_id())),
                        ];
                        fields.extend(record.insert_only());
                        let cols: Vec<&str> = fields.iter().map(|(c, _)| *c).collect();
                        let marks: Vec<String> =
                            (1..=fields.len()).map(|i| format!("?{}", i)).collect();
                        let sql = format!(
                            "INSERT INTO {} ({}) VALUES ({})",
                            T::TABLE,
                            cols.join(", "),
                            marks.join(", ")
                        );
                        tx.prepare_cached(&sql)?
                            .execute(params_from_iter(fields.into_iter().map(|(_, v)| v)))?;
                    }
                }
            }
        }
        tx.commit()?;
        Ok(batch.len())
    }
}

/// Rows keyed by (project, key) whose source pages are unioned on conflict.
/// The unit is only filled when the row has none; everything else is set on
/// insert only.
trait PageMerged {
    const TABLE: &'static str;
    const KEY_COL: &'static str;

    fn key(&self) -> &str;
    fn pages(&self) -> &PageSet;
    fn unit_id(&self) -> Option<i64>;
    fn insert_only(&self) -> Vec<(&'static str, SqlValue)>;
}

impl PageMerged for PipeLine {
    const TABLE: &'static str = "pipe_lines";
    const KEY_COL: &'static str = "line_number";

    fn key(&self) -> &str {
        &self.line_number
    }
    fn pages(&self) -> &PageSet {
        &self.source_pages
    }
    fn unit_id(&self) -> Option<i64> {
        self.unit_id
    }
    // A reviewed status is never touched again.
    fn insert_only(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("nominal_size", SqlValue::from(self.nominal_size.clone())),
            ("service_code", SqlValue::from(self.service_code.clone())),
            ("spec_class", SqlValue::from(self.spec_class.clone())),
            ("status", SqlValue::from(self.status.as_str().to_string())),
        ]
    }
}

impl PageMerged for Equipment {
    const TABLE: &'static str = "equipment";
    const KEY_COL: &'static str = "tag_no";

    fn key(&self) -> &str {
        &self.tag_no
    }
    fn pages(&self) -> &PageSet {
        &self.source_pages
    }
    fn unit_id(&self) -> Option<i64> {
        self.unit_id
    }
    fn insert_only(&self) -> Vec<(&'static str, SqlValue)> {
        vec![("equip_type", SqlValue::from(self.equip_type.clone()))]
    }
}

impl PageMerged for Instrument {
    const TABLE: &'static str = "instruments";
    const KEY_COL: &'static str = "tag_no";

    fn key(&self) -> &str {
        &self.tag_no
    }
    fn pages(&self) -> &PageSet {
        &self.source_pages
    }
    fn unit_id(&self) -> Option<i64> {
        self.unit_id
    }
    fn insert_only(&self) -> Vec<(&'static str, SqlValue)> {
        vec![("function_type", SqlValue::from(self.function_type.clone()))]
    }
}

fn pages_json(pages: &PageSet) -> Result<String> {
    Ok(serde_json::to_string(pages)?)
}

impl Gateway for SqliteStore {
    fn load_upload(&self, upload_id: i64) -> Result<Option<Upload>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, project_id, filename, storage_path, parse_status, progress,
                        error_message, total_pages, started_at, finished_at
                 FROM uploads WHERE id = ?1",
                params![upload_id],
                |r| {
                    let upload = Upload {
                        id: r.get(0)?,
                        project_id: r.get(1)?,
                        filename: r.get(2)?,
                        storage_path: r.get(3)?,
                        status: ParseStatus::Pending,
                        progress: r.get(5)?,
                        error_message: r.get(6)?,
                        total_pages: r.get(7)?,
                        started_at: r.get(8)?,
                        finished_at: r.get(9)?,
                    };
                    Ok((upload, r.get::<_, String>(4)?))
                },
            )
            .optional()?;

        let Some((mut upload, status)) = row else {
            return Ok(None);
        };
        upload.status = status.parse()?;
        Ok(Some(upload))
    }

    fn begin_run(&self, upload_id: i64) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE uploads
             SET parse_status = 'processing', progress = 0, error_message = NULL,
                 started_at = ?2, finished_at = NULL
             WHERE id = ?1 AND parse_status != 'processing'",
            params![upload_id, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(changed == 1)
    }

    fn update_progress(
        &self,
        upload_id: i64,
        progress: u8,
        status: Option<ParseStatus>,
        error_message: Option<&str>,
    ) -> Result<()> {
        let finished = matches!(status, Some(ParseStatus::Completed | ParseStatus::Failed))
            .then(|| chrono::Utc::now().to_rfc3339());
        self.conn.execute(
            "UPDATE uploads
             SET progress = ?2,
                 parse_status = COALESCE(?3, parse_status),
                 error_message = COALESCE(?4, error_message),
                 finished_at = COALESCE(?5, finished_at)
             WHERE id = ?1",
            params![
                upload_id,
                progress.min(100),
                status.map(|s| s.as_str()),
                error_message,
                finished
            ],
        )?;
        Ok(())
    }

    fn set_total_pages(&self, upload_id: i64, total_pages: u32) -> Result<()> {
        self.conn.execute(
            "UPDATE uploads SET total_pages = ?2 WHERE id = ?1",
            params![upload_id, total_pages],
        )?;
        Ok(())
    }

    fn save_page_texts(&self, upload_id: i64, pages: &[PageText]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO page_texts (upload_id, page_number, raw_text, has_text)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for p in pages {
                stmt.execute(params![upload_id, p.page_number, p.raw_text, p.has_text()])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn upsert_unit(&self, project_id: i64, code: &str) -> Result<i64> {
        let id = self.conn.query_row(
            "INSERT INTO units (project_id, code) VALUES (?1, ?2)
             ON CONFLICT(project_id, code) DO UPDATE SET code = excluded.code
             RETURNING id",
            params![project_id, code],
            |r| r.get(0),
        )?;
        Ok(id)
    }

    fn save_drawings(
        &self,
        project_id: i64,
        batch: &[(DrawingMetadata, Option<i64>)],
    ) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO drawings
                 (project_id, unit_id, drawing_no, title, revision, rev_date, page_start, page_end)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(project_id, drawing_no) DO UPDATE SET
                    unit_id    = COALESCE(drawings.unit_id, excluded.unit_id),
                    title      = COALESCE(drawings.title, excluded.title),
                    revision   = COALESCE(drawings.revision, excluded.revision),
                    rev_date   = COALESCE(drawings.rev_date, excluded.rev_date),
                    page_start = MIN(drawings.page_start, excluded.page_start),
                    page_end   = MAX(drawings.page_end, excluded.page_end)",
            )?;
            for (d, unit_id) in batch {
                stmt.execute(params![
                    project_id,
                    unit_id,
                    d.drawing_no,
                    d.title,
                    d.revision,
                    d.rev_date,
                    d.page_start,
                    d.page_end,
                ])?;
            }
        }
        tx.commit()?;
        Ok(batch.len())
    }

    fn save_lines(&self, project_id: i64, batch: &[PipeLine]) -> Result<usize> {
        self.merge_pages(project_id, batch)
    }

    fn save_equipment(&self, project_id: i64, batch: &[Equipment]) -> Result<usize> {
        self.merge_pages(project_id, batch)
    }

    fn save_instruments(&self, project_id: i64, batch: &[Instrument]) -> Result<usize> {
        self.merge_pages(project_id, batch)
    }

    fn save_packages(&self, project_id: i64, batch: &[TestPackage]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO test_packages
                 (project_id, package_no, system_code, test_pressure, test_medium, source_page, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(project_id, package_no) DO NOTHING",
            )?;
            for p in batch {
                stmt.execute(params![
                    project_id,
                    p.package_no,
                    p.system_code,
                    p.test_pressure,
                    p.test_medium.as_str(),
                    p.source_page,
                    p.status.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(batch.len())
    }

    fn save_golden_joints(
        &self,
        project_id: i64,
        upload_id: i64,
        batch: &[GoldenJoint],
    ) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO golden_joints
                 (project_id, upload_id, test_package_id, source_page, related_lines, status)
                 VALUES (?1, ?2,
                         (SELECT id FROM test_packages WHERE project_id = ?1 AND package_no = ?3),
                         ?4, ?5, ?6)
                 ON CONFLICT(project_id, upload_id, source_page) DO NOTHING",
            )?;
            for gj in batch {
                stmt.execute(params![
                    project_id,
                    upload_id,
                    gj.package_no,
                    gj.source_page,
                    serde_json::to_string(&gj.related_lines)?,
                    gj.status.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(batch.len())
    }
}

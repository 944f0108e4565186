//! DuckDB storage for unified projects.

use std::path::Path;

use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use duckdb::{Connection, params};
use legislink_core::Project;
use tracing::{debug, info};

use crate::rows::{DocumentRow, PartyVoteRow, StageRow};
use crate::{ProjectStore, RunSummary, StoreError, UpsertOutcome};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS projects (
    government_id VARCHAR PRIMARY KEY,
    cross_reference VARCHAR,
    print_key VARCHAR,
    term BIGINT,
    publication_key VARCHAR,
    title VARCHAR NOT NULL,
    description VARCHAR,
    initiator VARCHAR,
    document_type VARCHAR,
    creation_date VARCHAR,
    last_modified VARCHAR,
    government_status VARCHAR,
    government_url VARCHAR,
    parliament_url VARCHAR,
    link_method VARCHAR,
    phase VARCHAR NOT NULL,
    passed BOOLEAN,
    closure_date VARCHAR,
    signature_date VARCHAR,
    publication_date VARCHAR,
    entry_into_force VARCHAR,
    publication_status VARCHAR,
    in_force VARCHAR,
    publication_url VARCHAR,
    voting VARCHAR,
    committees VARCHAR,
    rapporteurs VARCHAR,
    senate_position VARCHAR,
    tribunal_cases VARCHAR,
    updated_at VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS stages (
    government_id VARCHAR NOT NULL,
    stage_key VARCHAR NOT NULL,
    ordinal BIGINT NOT NULL,
    origin VARCHAR NOT NULL,
    name VARCHAR NOT NULL,
    stage_type VARCHAR,
    stage_date VARCHAR,
    is_active BOOLEAN NOT NULL,
    decision VARCHAR,
    committee_code VARCHAR,
    print_number VARCHAR,
    catalog_id VARCHAR,
    url VARCHAR,
    rapporteur_id VARCHAR,
    rapporteur_name VARCHAR,
    proposal VARCHAR,
    voting VARCHAR,
    PRIMARY KEY (government_id, stage_key)
);
CREATE TABLE IF NOT EXISTS party_votes (
    government_id VARCHAR NOT NULL,
    party VARCHAR NOT NULL,
    votes_yes BIGINT NOT NULL,
    votes_no BIGINT NOT NULL,
    votes_abstain BIGINT NOT NULL,
    votes_absent BIGINT NOT NULL,
    PRIMARY KEY (government_id, party)
);
CREATE TABLE IF NOT EXISTS documents (
    government_id VARCHAR NOT NULL,
    url VARCHAR NOT NULL,
    stage_number BIGINT,
    filename VARCHAR NOT NULL,
    doc_type VARCHAR,
    PRIMARY KEY (government_id, url)
);
CREATE SEQUENCE IF NOT EXISTS sync_log_seq START 1;
CREATE TABLE IF NOT EXISTS sync_log (
    id BIGINT PRIMARY KEY DEFAULT nextval('sync_log_seq'),
    started_at VARCHAR NOT NULL,
    finished_at VARCHAR,
    status VARCHAR NOT NULL,
    scraped BIGINT,
    linked BIGINT,
    inserted BIGINT,
    updated BIGINT,
    error VARCHAR
);
";

/// DuckDB store for unified projects and their child collections.
///
/// Nested values without a child table (committees, rapporteurs, senate
/// position, tribunal cases, stage votings) are stored as JSON text.
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
/// Use [`open`](Self::open) for in-memory and [`open_persistent`](Self::open_persistent)
/// for file-backed storage that survives across process restarts.
pub struct DuckStore {
    conn: Connection,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    // ── Counts ──

    pub fn project_count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT count(*) FROM projects", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn stage_count(&self, government_id: &str) -> Result<usize, StoreError> {
        self.count_for("stages", government_id)
    }

    pub fn party_vote_count(&self, government_id: &str) -> Result<usize, StoreError> {
        self.count_for("party_votes", government_id)
    }

    pub fn document_count(&self, government_id: &str) -> Result<usize, StoreError> {
        self.count_for("documents", government_id)
    }

    fn count_for(&self, table: &str, government_id: &str) -> Result<usize, StoreError> {
        let sql = format!("SELECT count(*) FROM {table} WHERE government_id = ?");
        let n: i64 = self
            .conn
            .query_row(&sql, [government_id], |row| row.get(0))?;
        Ok(n as usize)
    }

    // ── Reads ──

    /// The stored project row as an Arrow batch.
    pub fn project_batch(&self, government_id: &str) -> Result<RecordBatch, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT * EXCLUDE (voting, committees, rapporteurs, senate_position, tribunal_cases) FROM projects WHERE government_id = ?")?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([government_id])?.collect();
        let batch = batches.into_iter().next().ok_or(StoreError::NoResults)?;
        if batch.num_rows() == 0 {
            return Err(StoreError::NoResults);
        }
        Ok(batch)
    }

    /// The project's merged timeline, in timeline order.
    pub fn stage_batches(&self, government_id: &str) -> Result<Vec<RecordBatch>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT ordinal, origin, stage_date, name, decision, committee_code,
                    rapporteur_name, proposal
             FROM stages WHERE government_id = ? ORDER BY ordinal",
        )?;
        Ok(stmt.query_arrow([government_id])?.collect())
    }

    pub fn phase_of(&self, government_id: &str) -> Result<Option<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT phase FROM projects WHERE government_id = ?")?;
        let mut rows = stmt.query([government_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    // ── Escape hatch ──

    /// Execute arbitrary SQL and return Arrow RecordBatches.
    pub fn query_arrow(&self, sql: &str) -> Result<Vec<RecordBatch>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        Ok(batches)
    }

    // ── Writes ──

    fn write_project(&self, project: &Project, now: &str) -> Result<(), StoreError> {
        let voting = json_opt(project.voting.as_ref())?;
        let committees = serde_json::to_string(&project.committees)?;
        let rapporteurs = serde_json::to_string(&project.rapporteurs)?;
        let senate_position = json_opt(project.senate_position.as_ref())?;
        let tribunal_cases = serde_json::to_string(&project.tribunal_cases)?;
        let term = project.term.map(i64::from);
        let link_method = project.link_method.map(|m| m.as_str());
        let publication = project.publication.as_ref();
        let entry_into_force = publication.and_then(|p| p.entry_into_force.as_deref());
        let publication_status = publication.and_then(|p| p.status.as_deref());
        let in_force = publication.and_then(|p| p.in_force.as_deref());

        self.conn.execute(
            "INSERT OR REPLACE INTO projects VALUES
             (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
              ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                project.government_id,
                project.cross_reference,
                project.print_key,
                term,
                project.publication_key,
                project.title,
                project.description,
                project.initiator,
                project.document_type,
                project.creation_date,
                project.last_modified,
                project.government_status,
                project.government_url,
                project.parliament_url,
                link_method,
                project.phase().as_str(),
                project.passed,
                project.closure_date,
                project.signature_date,
                project.publication_date(),
                entry_into_force,
                publication_status,
                in_force,
                project.publication_url,
                voting,
                committees,
                rapporteurs,
                senate_position,
                tribunal_cases,
                now,
            ],
        )?;
        Ok(())
    }

    /// Replaces every child row of the project, so rows whose keys
    /// disappeared since the last upsert do not linger.
    fn write_children(&self, project: &Project) -> Result<(), StoreError> {
        let id = project.government_id.as_str();
        let stages = StageRow::from_project(project)?;
        for table in ["stages", "party_votes", "documents"] {
            self.conn.execute(
                &format!("DELETE FROM {table} WHERE government_id = ?"),
                [id],
            )?;
        }
        for row in stages {
            self.conn.execute(
                "INSERT INTO stages VALUES
                 (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    id,
                    row.key,
                    row.ordinal,
                    row.origin,
                    row.name,
                    row.stage_type,
                    row.date,
                    row.is_active,
                    row.decision,
                    row.committee_code,
                    row.print_number,
                    row.catalog_id,
                    row.url,
                    row.rapporteur_id,
                    row.rapporteur_name,
                    row.proposal,
                    row.voting_json,
                ],
            )?;
        }
        for row in PartyVoteRow::from_project(project) {
            self.conn.execute(
                "INSERT INTO party_votes VALUES (?, ?, ?, ?, ?, ?)",
                params![id, row.party, row.yes, row.no, row.abstain, row.absent],
            )?;
        }
        for row in DocumentRow::from_project(project) {
            self.conn.execute(
                "INSERT INTO documents VALUES (?, ?, ?, ?, ?)",
                params![id, row.url, row.stage_number, row.filename, row.doc_type],
            )?;
        }
        Ok(())
    }
}

fn json_opt<T: serde::Serialize>(value: Option<&T>) -> Result<Option<String>, StoreError> {
    Ok(value.map(serde_json::to_string).transpose()?)
}

impl ProjectStore for DuckStore {
    fn upsert_project(&mut self, project: &Project) -> Result<UpsertOutcome, StoreError> {
        let existed = self.count_for("projects", &project.government_id)? > 0;
        let now = Utc::now().to_rfc3339();
        self.write_project(project, &now)?;
        self.write_children(project)?;
        debug!(government_id = %project.government_id, existed, "upserted project");
        Ok(if existed {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        })
    }

    fn last_synced(&self, government_id: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT updated_at FROM projects WHERE government_id = ?")?;
        let mut rows = stmt.query([government_id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let raw: String = row.get(0)?;
        let at = DateTime::parse_from_rfc3339(&raw)
            .map_err(|e| StoreError::Other(format!("bad updated_at {raw:?}: {e}")))?;
        Ok(Some(at.with_timezone(&Utc)))
    }

    fn start_run(&mut self) -> Result<i64, StoreError> {
        let id: i64 = self.conn.query_row(
            "INSERT INTO sync_log (started_at, status) VALUES (?, 'running') RETURNING id",
            [Utc::now().to_rfc3339()],
            |row| row.get(0),
        )?;
        info!(run_id = id, "sync run started");
        Ok(id)
    }

    fn finish_run(&mut self, run_id: i64, summary: &RunSummary) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE sync_log SET finished_at = ?, status = 'finished',
             scraped = ?, linked = ?, inserted = ?, updated = ? WHERE id = ?",
            params![
                Utc::now().to_rfc3339(),
                summary.scraped as i64,
                summary.linked as i64,
                summary.inserted as i64,
                summary.updated as i64,
                run_id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::UnknownRun(run_id));
        }
        Ok(())
    }

    fn fail_run(&mut self, run_id: i64, message: &str) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE sync_log SET finished_at = ?, status = 'failed', error = ? WHERE id = ?",
            params![Utc::now().to_rfc3339(), message, run_id],
        )?;
        if changed == 0 {
            return Err(StoreError::UnknownRun(run_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legislink_core::{
        Document, LinkMethod, Origin, PartyVote, PhaseResolver, Publication, Rapporteur, Stage,
        VoteOutcome, Voting,
    };

    fn project(id: &str) -> Project {
        let mut g = Stage::new(Origin::Government, "Konsultacje").with_date("01-03-2024");
        g.stage_number = Some(1);
        g.catalog_id = Some("k1".into());
        g.documents = vec![Document {
            filename: "projekt.pdf".into(),
            url: "https://rcl.example/1.pdf".into(),
            doc_type: None,
        }];
        let mut p = Stage::new(Origin::Parliamentary, "I czytanie").with_date("2024-04-01");
        p.rapporteur = Some(Rapporteur {
            id: "412".into(),
            name: "Anna Nowak".into(),
        });
        p.proposal = Some("uchwalić bez poprawek".into());
        let mut project = Project {
            government_id: id.into(),
            title: "Projekt ustawy o ochronie zwierząt".into(),
            description: Some("opis".into()),
            last_modified: Some("2024-05-12".into()),
            government_url: Some(format!("https://legislacja.rcl.gov.pl/projekt/{id}")),
            parliament_url: Some(
                "https://www.sejm.gov.pl/sejm10.nsf/PrzebiegProc.xsp?nr=1604".into(),
            ),
            cross_reference: Some("RM-0610-136-25".into()),
            print_key: Some("1604".into()),
            term: Some(10),
            link_method: Some(LinkMethod::ExactVerified),
            stages: vec![g, p],
            voting: Some(Voting {
                date: "2024-05-10".into(),
                yes: 240,
                no: 200,
                abstain: 0,
                total: 440,
                result: VoteOutcome::Passed,
                sitting: Some(12),
                voting_number: Some(4),
                pdf_url: None,
                by_party: vec![
                    PartyVote {
                        party: "KO".into(),
                        yes: 150,
                        ..Default::default()
                    },
                    PartyVote {
                        party: "PiS".into(),
                        no: 190,
                        ..Default::default()
                    },
                ],
            }),
            ..Default::default()
        };
        project.refresh_phase(&PhaseResolver::default());
        project
    }

    fn text(store: &DuckStore, sql: &str) -> Option<String> {
        store.conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn open_in_memory_creates_schema() {
        let store = DuckStore::open().unwrap();
        assert_eq!(store.project_count().unwrap(), 0);
    }

    #[test]
    fn upsert_insert_then_update() {
        let mut store = DuckStore::open().unwrap();
        let p = project("12387250");
        assert_eq!(store.upsert_project(&p).unwrap(), UpsertOutcome::Inserted);
        assert_eq!(store.upsert_project(&p).unwrap(), UpsertOutcome::Updated);
        assert_eq!(store.project_count().unwrap(), 1);
        assert_eq!(store.stage_count("12387250").unwrap(), 2);
        assert_eq!(store.party_vote_count("12387250").unwrap(), 2);
        assert_eq!(store.document_count("12387250").unwrap(), 1);
        assert_eq!(store.phase_of("12387250").unwrap().as_deref(), Some("sejm"));
    }

    #[test]
    fn upsert_persists_descriptive_fields() {
        let mut store = DuckStore::open().unwrap();
        let mut p = project("1");
        p.publication = Some(Publication {
            publication_date: Some("2024-06-01".into()),
            entry_into_force: Some("2024-06-15".into()),
            status: Some("obowiązujący".into()),
            in_force: Some("IN_FORCE".into()),
            publication_url: None,
        });
        store.upsert_project(&p).unwrap();

        let row = |col: &str| text(&store, &format!("SELECT {col} FROM projects"));
        assert_eq!(row("description").as_deref(), Some("opis"));
        assert_eq!(row("last_modified").as_deref(), Some("2024-05-12"));
        assert_eq!(
            row("government_url").as_deref(),
            Some("https://legislacja.rcl.gov.pl/projekt/1")
        );
        assert!(row("parliament_url").is_some());
        assert_eq!(row("entry_into_force").as_deref(), Some("2024-06-15"));
        assert_eq!(row("publication_status").as_deref(), Some("obowiązujący"));
        assert_eq!(row("in_force").as_deref(), Some("IN_FORCE"));

        let stage = |col: &str, key: &str| {
            text(
                &store,
                &format!("SELECT {col} FROM stages WHERE stage_key = '{key}'"),
            )
        };
        assert_eq!(stage("catalog_id", "government:1").as_deref(), Some("k1"));
        assert_eq!(stage("rapporteur_id", "parliamentary:1").as_deref(), Some("412"));
        assert_eq!(
            stage("rapporteur_name", "parliamentary:1").as_deref(),
            Some("Anna Nowak")
        );
        assert_eq!(
            stage("proposal", "parliamentary:1").as_deref(),
            Some("uchwalić bez poprawek")
        );
    }

    #[test]
    fn upsert_drops_stale_children() {
        let mut store = DuckStore::open().unwrap();
        store.upsert_project(&project("1")).unwrap();
        store.upsert_project(&project("2")).unwrap();
        assert_eq!(store.party_vote_count("1").unwrap(), 2);

        let mut p = project("1");
        p.voting = None;
        p.stages.truncate(1);
        store.upsert_project(&p).unwrap();
        assert_eq!(store.party_vote_count("1").unwrap(), 0);
        assert_eq!(store.stage_count("1").unwrap(), 1);
        assert_eq!(store.party_vote_count("2").unwrap(), 2);
    }

    #[test]
    fn project_batch_and_stage_batches() {
        let mut store = DuckStore::open().unwrap();
        store.upsert_project(&project("1")).unwrap();
        let batch = store.project_batch("1").unwrap();
        assert_eq!(batch.num_rows(), 1);
        let stages = store.stage_batches("1").unwrap();
        let rows: usize = stages.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 2);
        assert!(matches!(
            store.project_batch("missing"),
            Err(StoreError::NoResults)
        ));
    }

    #[test]
    fn last_synced_roundtrip() {
        let mut store = DuckStore::open().unwrap();
        assert!(store.last_synced("1").unwrap().is_none());
        let before = Utc::now() - chrono::Duration::seconds(5);
        store.upsert_project(&project("1")).unwrap();
        let at = store.last_synced("1").unwrap().unwrap();
        assert!(at >= before);
    }

    #[test]
    fn run_log_lifecycle() {
        let mut store = DuckStore::open().unwrap();
        let a = store.start_run().unwrap();
        let b = store.start_run().unwrap();
        assert_ne!(a, b);
        store
            .finish_run(
                a,
                &RunSummary {
                    scraped: 2,
                    linked: 1,
                    inserted: 2,
                    updated: 0,
                },
            )
            .unwrap();
        store.fail_run(b, "listing unavailable").unwrap();
        let batches = store
            .query_arrow("SELECT status FROM sync_log ORDER BY id")
            .unwrap();
        assert_eq!(batches[0].num_rows(), 2);
        assert!(matches!(
            store.fail_run(999, "x"),
            Err(StoreError::UnknownRun(999))
        ));
    }

    #[test]
    fn persistent_reopen_keeps_projects() {
        let tmp = tempfile::TempDir::new().unwrap();
        let db_path = tmp.path().join("legislink.duckdb");
        {
            let mut store = DuckStore::open_persistent(&db_path).unwrap();
            store.upsert_project(&project("1")).unwrap();
        }
        assert!(db_path.exists());
        let mut store = DuckStore::open_persistent(&db_path).unwrap();
        assert_eq!(store.project_count().unwrap(), 1);
        assert_eq!(store.upsert_project(&project("1")).unwrap(), UpsertOutcome::Updated);
    }
}

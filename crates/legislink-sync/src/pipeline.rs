//! One sync run: fetch, link, unify, persist.
//!
//! Records are processed sequentially and in listing order. Only two
//! failures abort a run: the government listing fetch and a persistence
//! error. Both mark the run-log entry failed.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use legislink_core::{LinkResult, Phase, SourceRecord, extract_cross_reference};
use legislink_store::{ProjectStore, RunSummary, UpsertOutcome};
use tracing::{debug, info, warn};

use crate::{GovernmentSource, Linker, SyncError, Unifier};

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Process at most this many records from the listing.
    pub limit: Option<usize>,
    /// When false every record is unified as unlinked.
    pub link: bool,
    /// Skip records upserted within this many hours.
    pub skip_recent_hours: Option<u32>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            limit: None,
            link: true,
            skip_recent_hours: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub run_id: i64,
    pub summary: RunSummary,
    /// Records left out because they were synced recently.
    pub skipped: usize,
    pub by_phase: BTreeMap<Phase, usize>,
}

pub struct Pipeline {
    source: Arc<dyn GovernmentSource>,
    linker: Linker,
    unifier: Unifier,
}

impl Pipeline {
    pub fn new(source: Arc<dyn GovernmentSource>, linker: Linker, unifier: Unifier) -> Self {
        Self {
            source,
            linker,
            unifier,
        }
    }

    pub fn linker(&self) -> &Linker {
        &self.linker
    }

    pub async fn run(
        &mut self,
        store: &mut dyn ProjectStore,
        options: &RunOptions,
    ) -> Result<SyncReport, SyncError> {
        let run_id = store.start_run().map_err(SyncError::RunLog)?;
        info!(run_id, "sync run started");

        let mut records = match self.source.fetch_records().await {
            Ok(records) => records,
            Err(e) => {
                let err = SyncError::Source(e);
                mark_failed(store, run_id, &err);
                return Err(err);
            }
        };
        if let Some(limit) = options.limit {
            records.truncate(limit);
        }
        let mut skipped = 0;
        if let Some(hours) = options.skip_recent_hours {
            let before = records.len();
            records.retain(|r| !recently_synced(&*store, &r.id, hours));
            skipped = before - records.len();
            if skipped > 0 {
                info!(skipped, hours, "skipping recently synced projects");
            }
        }
        let scraped = records.len();

        let links = if options.link {
            self.linker.begin_run();
            self.linker.link_all(records).await
        } else {
            records.into_iter().map(unlinked).collect()
        };
        let linked = links.iter().filter(|l| l.is_linked()).count();
        info!(records = links.len(), linked, "linking finished");

        let projects = self.unifier.unify_all(&links).await;

        let mut summary = RunSummary {
            scraped,
            linked,
            ..Default::default()
        };
        let mut by_phase: BTreeMap<Phase, usize> = BTreeMap::new();
        for (processed, project) in projects.iter().enumerate() {
            match store.upsert_project(project) {
                Ok(UpsertOutcome::Inserted) => summary.inserted += 1,
                Ok(UpsertOutcome::Updated) => summary.updated += 1,
                Err(source) => {
                    let err = SyncError::Store {
                        government_id: project.government_id.clone(),
                        processed,
                        source,
                    };
                    mark_failed(store, run_id, &err);
                    return Err(err);
                }
            }
            *by_phase.entry(project.phase()).or_default() += 1;
            debug!(id = %project.government_id, phase = %project.phase(), "persisted");
        }

        store
            .finish_run(run_id, &summary)
            .map_err(SyncError::RunLog)?;
        info!(
            run_id,
            scraped = summary.scraped,
            linked = summary.linked,
            inserted = summary.inserted,
            updated = summary.updated,
            skipped,
            "sync run finished"
        );
        Ok(SyncReport {
            run_id,
            summary,
            skipped,
            by_phase,
        })
    }
}

fn unlinked(record: SourceRecord) -> LinkResult {
    let key = record
        .parliament_url
        .as_deref()
        .and_then(extract_cross_reference);
    LinkResult::unlinked(key, record)
}

fn recently_synced(store: &dyn ProjectStore, government_id: &str, hours: u32) -> bool {
    match store.last_synced(government_id) {
        Ok(Some(at)) => Utc::now().signed_duration_since(at) < TimeDelta::hours(i64::from(hours)),
        Ok(None) => false,
        Err(e) => {
            warn!(id = government_id, error = %e, "cannot read last sync time");
            false
        }
    }
}

fn mark_failed(store: &mut dyn ProjectStore, run_id: i64, err: &SyncError) {
    warn!(run_id, error = %err, "sync run failed");
    if let Err(e) = store.fail_run(run_id, &err.to_string()) {
        warn!(run_id, error = %e, "cannot mark sync run failed");
    }
}

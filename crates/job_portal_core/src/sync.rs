//! crates/job_portal_core/src/sync.rs
//!
//! The sync engine keeps the local job cache in step with the external job source.
//!
//! Refreshes are lazy: a request that finds the cache older than the
//! time-to-live triggers one, and `force` skips the check. Reconciliation is
//! planned by a pure function and then written through the database port.
//! Jobs that applications point at are never deleted.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{Job, JobPosting};
use crate::ports::{DatabaseService, JobSourceService, PortError, PortResult};
use crate::seed::sample_postings;

/// Default minimum interval between non-forced refreshes (15 minutes).
pub const DEFAULT_SYNC_TTL_SECS: i64 = 900;

/// Description given to retained jobs the source no longer describes.
pub const RETAINED_DESCRIPTION: &str =
    "This job listing is no longer available. The application was preserved for your records.";
pub const UNKNOWN_FIELD: &str = "Unknown";

//=========================================================================================
// Sync State
//=========================================================================================

/// Process-wide sync bookkeeping. Starts as "never synced", is only mutated by
/// [`SyncEngine`], and needs no teardown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncState {
    last_synced_at: Option<DateTime<Utc>>,
}

impl SyncState {
    pub fn never() -> Self {
        Self::default()
    }

    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.last_synced_at
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match self.last_synced_at {
            Some(last) => now - last < ttl,
            None => false,
        }
    }
}

//=========================================================================================
// Results
//=========================================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
    /// Jobs missing from the source but kept because applications reference them.
    pub retained: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The cache was fresh; nothing was fetched.
    CacheHit,
    Refreshed(ReconcileSummary),
    /// The source could not be used. The cache was left as it was, or seeded
    /// with sample postings if it was empty.
    Degraded { reason: String, seeded: bool },
}

#[derive(Debug, Clone)]
pub struct SyncResult {
    pub outcome: SyncOutcome,
    pub jobs: Vec<Job>,
}

impl SyncResult {
    /// True when callers should signal that cached or sample data is shown.
    pub fn is_degraded(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Degraded { .. })
    }
}

//=========================================================================================
// Reconciliation Planning
//=========================================================================================

#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    pub upserts: Vec<Job>,
    pub deletions: Vec<Uuid>,
    /// Retained jobs whose descriptive fields were filled with placeholders.
    pub backfills: Vec<Job>,
    pub summary: ReconcileSummary,
}

fn backfill(job: &Job) -> Option<Job> {
    let mut patched = job.clone();
    let mut changed = false;
    for field in [&mut patched.title, &mut patched.role, &mut patched.location] {
        if field.trim().is_empty() {
            *field = UNKNOWN_FIELD.to_string();
            changed = true;
        }
    }
    if patched.description.trim().is_empty() {
        patched.description = RETAINED_DESCRIPTION.to_string();
        changed = true;
    }
    changed.then_some(patched)
}

/// Works out how to bring `local` in line with `remote`.
///
/// Postings are matched by external id; when the source repeats an id, the
/// last occurrence wins. Local jobs absent from `remote` are deleted unless
/// their external id is in `with_applications`.
pub fn plan_reconciliation(
    local: &[Job],
    with_applications: &HashSet<String>,
    remote: Vec<JobPosting>,
    now: DateTime<Utc>,
) -> ReconcilePlan {
    let existing: HashMap<&str, Uuid> = local
        .iter()
        .map(|job| (job.external_id.as_str(), job.id))
        .collect();

    let mut latest: HashMap<String, JobPosting> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for posting in remote {
        if !latest.contains_key(&posting.external_id) {
            order.push(posting.external_id.clone());
        }
        latest.insert(posting.external_id.clone(), posting);
    }

    let mut plan = ReconcilePlan::default();
    for external_id in &order {
        let Some(posting) = latest.remove(external_id) else {
            continue;
        };
        let id = match existing.get(external_id.as_str()) {
            Some(id) => {
                plan.summary.updated += 1;
                *id
            }
            None => {
                plan.summary.inserted += 1;
                Uuid::new_v4()
            }
        };
        plan.upserts.push(posting.into_job(id, now));
    }

    let seen: HashSet<&str> = order.iter().map(String::as_str).collect();
    for job in local.iter().filter(|job| !seen.contains(job.external_id.as_str())) {
        if with_applications.contains(&job.external_id) {
            plan.summary.retained += 1;
            if let Some(patched) = backfill(job) {
                plan.backfills.push(patched);
            }
        } else {
            plan.summary.removed += 1;
            plan.deletions.push(job.id);
        }
    }

    plan
}

//=========================================================================================
// The Engine
//=========================================================================================

pub struct SyncEngine {
    db: Arc<dyn DatabaseService>,
    source: Arc<dyn JobSourceService>,
    ttl: Duration,
    fetch_timeout: std::time::Duration,
    // Held for the whole refresh so concurrent callers wait and then hit the cache.
    refresh: Mutex<()>,
    // Published after each successful reconcile; readers never wait on a refresh.
    state: watch::Sender<SyncState>,
}

impl SyncEngine {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        source: Arc<dyn JobSourceService>,
        ttl: Duration,
        fetch_timeout: std::time::Duration,
    ) -> Self {
        Self {
            db,
            source,
            ttl,
            fetch_timeout,
            refresh: Mutex::new(()),
            state: watch::channel(SyncState::never()).0,
        }
    }

    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.state.borrow().last_synced_at()
    }

    /// Refreshes the cache if it is stale (or `force` is set) and returns its contents.
    ///
    /// Source failures are absorbed into [`SyncOutcome::Degraded`]; only local
    /// store failures are returned as errors.
    pub async fn sync(&self, force: bool) -> PortResult<SyncResult> {
        self.sync_at(force, Utc::now()).await
    }

    pub async fn sync_at(&self, force: bool, now: DateTime<Utc>) -> PortResult<SyncResult> {
        let _refresh = self.refresh.lock().await;
        let state = *self.state.borrow();

        if !force && state.is_fresh(now, self.ttl) {
            let jobs = self.db.list_jobs().await?;
            return Ok(SyncResult {
                outcome: SyncOutcome::CacheHit,
                jobs,
            });
        }

        let fetched = match tokio::time::timeout(self.fetch_timeout, self.source.fetch_jobs()).await
        {
            Ok(result) => result,
            Err(_) => Err(PortError::RemoteUnavailable(format!(
                "timed out after {:?}",
                self.fetch_timeout
            ))),
        };

        match fetched {
            Ok(postings) => {
                info!("Fetched {} jobs from the job source", postings.len());
                let summary = self.reconcile(postings, now).await?;
                self.state.send_replace(SyncState {
                    last_synced_at: Some(now),
                });
                info!(
                    inserted = summary.inserted,
                    updated = summary.updated,
                    removed = summary.removed,
                    retained = summary.retained,
                    "Job cache refreshed"
                );
                Ok(SyncResult {
                    outcome: SyncOutcome::Refreshed(summary),
                    jobs: self.db.list_jobs().await?,
                })
            }
            Err(e) => {
                error!("Failed to fetch jobs from the job source: {}", e);
                let mut jobs = self.db.list_jobs().await?;
                let seeded = jobs.is_empty();
                if seeded {
                    warn!("Job cache is empty, seeding it with sample postings");
                    self.reconcile(sample_postings(now), now).await?;
                    jobs = self.db.list_jobs().await?;
                }
                Ok(SyncResult {
                    outcome: SyncOutcome::Degraded {
                        reason: e.to_string(),
                        seeded,
                    },
                    jobs,
                })
            }
        }
    }

    async fn reconcile(
        &self,
        postings: Vec<JobPosting>,
        now: DateTime<Utc>,
    ) -> PortResult<ReconcileSummary> {
        let local = self.db.list_jobs().await?;
        let with_applications = self.db.external_ids_with_applications().await?;
        let plan = plan_reconciliation(&local, &with_applications, postings, now);

        for job in plan.upserts.iter().chain(plan.backfills.iter()) {
            self.db.upsert_job(job).await?;
        }
        // Re-check right before deleting so an application filed mid-sync keeps its job.
        let with_applications = self.db.external_ids_with_applications().await?;
        let mut summary = plan.summary;
        for job in local.iter().filter(|job| plan.deletions.contains(&job.id)) {
            if with_applications.contains(&job.external_id) {
                summary.removed -= 1;
                summary.retained += 1;
                continue;
            }
            self.db.delete_job(job.id).await?;
        }
        Ok(summary)
    }
}

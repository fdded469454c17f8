// ── Garden state coordinator ──
//
// Owns the session and the snapshot store. Runs refresh cycles on a fixed
// interval or on demand, allows at most one cycle in flight, routes
// commands, and publishes every new revision to subscribers.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use strum::Display;
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use risegarden_api::Session;

use crate::command::{Command, CommandResult, LightCommand};
use crate::config::CoordinatorConfig;
use crate::error::CoreError;
use crate::model::{Garden, GardenId, Snapshot};
use crate::store::{FetchedGarden, SnapshotStore};
use crate::stream::SnapshotStream;

/// A recurring failure is logged at `warn` on its first occurrence and
/// then once every this many cycles.
const LOG_EVERY_N_FAILURES: u32 = 10;

// ── Observable state ─────────────────────────────────────────────

/// Whether a refresh cycle is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CycleState {
    Idle,
    Refreshing,
}

/// Health of the data source as of the last completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Availability {
    /// No cycle has completed yet.
    Unknown,
    /// Every garden was fetched.
    Available,
    /// Some gardens failed; their last known state is being served.
    Degraded,
    /// The listing or every garden failed; retried on the next poll.
    Unavailable,
    /// Credentials were rejected; polling has stopped.
    AuthFailed,
}

/// How a completed cycle went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CycleStatus {
    Success,
    PartialFailure,
}

/// One garden that could not be fetched during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GardenFailure {
    pub garden: GardenId,
    pub name: Option<String>,
    pub error: CoreError,
}

/// Result of a cycle that published (or had nothing to publish).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub status: CycleStatus,
    /// Revision after the cycle.
    pub revision: u64,
    pub fetched: usize,
    pub failures: Vec<GardenFailure>,
}

/// Shared by every caller that joined the same cycle.
pub type CycleResult = Result<RefreshOutcome, CoreError>;

type CycleSlot = Option<watch::Receiver<Option<CycleResult>>>;

/// Everything the network phase of a cycle produced.
struct CycleFetch {
    listed: BTreeSet<GardenId>,
    fetched: Vec<FetchedGarden>,
    failures: Vec<GardenFailure>,
}

// ── Coordinator ──────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Created idle: call
/// [`start()`](Self::start) for the initial refresh and the periodic loop,
/// or drive it with [`refresh()`](Self::refresh) alone.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: CoordinatorConfig,
    session: Arc<Session>,
    store: SnapshotStore,
    cycle_state: watch::Sender<CycleState>,
    availability: watch::Sender<Availability>,
    /// Single-flight guard: `Some` while a cycle runs. Joiners clone the
    /// receiver and wait for the leader's result.
    in_flight: Mutex<CycleSlot>,
    last_failures: Mutex<Vec<GardenFailure>>,
    failure_log: Mutex<FailureLog>,
    cancel: CancellationToken,
    task_handles: AsyncMutex<Vec<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Coordinator {
    /// Build a coordinator and its session. Does not touch the network.
    pub fn new(config: CoordinatorConfig) -> Result<Self, CoreError> {
        let session = Session::new(&config.session_config(), config.credentials.clone())?;
        Ok(Self::with_session(config, Arc::new(session)))
    }

    /// Build around an existing session.
    pub fn with_session(config: CoordinatorConfig, session: Arc<Session>) -> Self {
        let (cycle_state, _) = watch::channel(CycleState::Idle);
        let (availability, _) = watch::channel(Availability::Unknown);

        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                session,
                store: SnapshotStore::new(),
                cycle_state,
                availability,
                in_flight: Mutex::new(None),
                last_failures: Mutex::new(Vec::new()),
                failure_log: Mutex::new(FailureLog::default()),
                cancel: CancellationToken::new(),
                task_handles: AsyncMutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.inner.session
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.inner.store
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Run the initial refresh and spawn the periodic loop.
    ///
    /// The loop is not started when the initial refresh fails
    /// authentication. A transient initial failure is returned but the
    /// loop still starts, so the next poll can recover.
    pub async fn start(&self) -> Result<RefreshOutcome, CoreError> {
        let initial = self.refresh().await;
        if matches!(&initial, Err(e) if e.is_auth()) {
            return initial;
        }

        let period = self.inner.config.refresh_interval;
        if !period.is_zero() {
            let mut handles = self.inner.task_handles.lock().await;
            if handles.is_empty() {
                let coordinator = self.clone();
                let cancel = self.inner.cancel.clone();
                handles.push(tokio::spawn(refresh_task(coordinator, period, cancel)));
                info!(interval_secs = period.as_secs(), "periodic refresh started");
            }
        }

        initial
    }

    /// Stop the loop, abandon any in-flight cycle and forget the token.
    ///
    /// An abandoned cycle publishes nothing. Further refreshes fail with
    /// [`CoreError::ShutDown`].
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.inner.session.close().await;
        self.inner.cycle_state.send_replace(CycleState::Idle);
        debug!("coordinator shut down");
    }

    /// One-shot: refresh once, run `f`, shut down.
    ///
    /// For CLI commands that need a single consistent view and no
    /// periodic loop.
    pub async fn oneshot<F, Fut, T>(config: CoordinatorConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Coordinator) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.refresh_interval = Duration::ZERO;

        let coordinator = Coordinator::new(cfg)?;
        let result = match coordinator.refresh().await {
            Ok(_) => f(coordinator.clone()).await,
            Err(e) => Err(e),
        };
        coordinator.shutdown().await;
        result
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Run a refresh cycle, or join the one already in flight, and return
    /// its result. Every concurrent caller gets the same result.
    pub async fn refresh(&self) -> CycleResult {
        let mut rx = self.begin_refresh()?;
        match rx.wait_for(Option::is_some).await {
            Ok(done) => (*done).clone().unwrap_or(Err(CoreError::ShutDown)),
            Err(_) => Err(CoreError::ShutDown),
        }
    }

    /// Start a cycle without waiting for it. Joins the in-flight cycle if
    /// there is one.
    pub fn request_refresh(&self) {
        if let Err(e) = self.begin_refresh() {
            debug!(error = %e, "refresh request ignored");
        }
    }

    fn begin_refresh(&self) -> Result<watch::Receiver<Option<CycleResult>>, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ShutDown);
        }

        let mut slot = lock(&self.inner.in_flight);
        if let Some(rx) = slot.as_ref() {
            debug!("refresh already in flight, joining it");
            return Ok(rx.clone());
        }

        let (tx, rx) = watch::channel(None);
        *slot = Some(rx.clone());
        drop(slot);

        let coordinator = self.clone();
        let mut lease = CycleLease::new(Arc::clone(&self.inner), tx);
        tokio::spawn(async move {
            let inner = &coordinator.inner;
            inner.cycle_state.send_replace(CycleState::Refreshing);

            let fetch = tokio::select! {
                biased;
                () = inner.cancel.cancelled() => None,
                fetch = coordinator.fetch_cycle() => Some(fetch),
            };

            let result = match fetch {
                Some(fetch) => coordinator.complete_cycle(fetch),
                None => {
                    debug!("shutdown during refresh, discarding partial results");
                    Err(CoreError::ShutDown)
                }
            };
            lease.finish(result);
        });

        Ok(rx)
    }

    /// Network phase: token, listing, then every garden's detail
    /// concurrently. Touches no shared state.
    async fn fetch_cycle(&self) -> Result<CycleFetch, CoreError> {
        let session = &self.inner.session;
        let summaries = session.list_gardens().await?;
        let listed = summaries.iter().map(|s| GardenId(s.id)).collect();

        let details = join_all(summaries.into_iter().map(|summary| async move {
            let detail = session.garden_detail(summary.id).await;
            (summary, detail)
        }))
        .await;

        let mut fetched = Vec::with_capacity(details.len());
        let mut failures = Vec::new();
        for (summary, detail) in details {
            match detail {
                Ok(detail) => fetched.push(FetchedGarden { summary, detail }),
                Err(e) => {
                    let error = CoreError::from(e);
                    if error.is_auth() {
                        return Err(error);
                    }
                    failures.push(GardenFailure {
                        garden: GardenId(summary.id),
                        name: summary.name,
                        error,
                    });
                }
            }
        }

        Ok(CycleFetch {
            listed,
            fetched,
            failures,
        })
    }

    /// Merge phase: the only place the garden mapping is mutated.
    fn complete_cycle(&self, fetch: Result<CycleFetch, CoreError>) -> CycleResult {
        let result = match fetch {
            Ok(fetch) => self.merge(fetch),
            Err(e) => {
                lock(&self.inner.last_failures).clear();
                Err(e)
            }
        };

        let availability = match &result {
            Ok(outcome) if outcome.failures.is_empty() => Availability::Available,
            Ok(_) => Availability::Degraded,
            Err(e) if e.is_auth() => Availability::AuthFailed,
            Err(_) => Availability::Unavailable,
        };
        self.inner.availability.send_replace(availability);
        self.log_cycle(&result);

        result
    }

    fn merge(&self, fetch: CycleFetch) -> CycleResult {
        let CycleFetch {
            listed,
            fetched,
            failures,
        } = fetch;

        // A cycle where every garden failed is reported once, by log_cycle.
        if !fetched.is_empty() {
            self.log_gardens(&fetched, &failures);
        }
        lock(&self.inner.last_failures).clone_from(&failures);

        if listed.is_empty() {
            let revision = match self.inner.store.apply_empty_listing(Utc::now()) {
                Some(revision) => {
                    info!(revision, "listing is empty, known gardens marked offline");
                    revision
                }
                None => {
                    debug!("account has no gardens");
                    self.inner.store.revision()
                }
            };
            return Ok(RefreshOutcome {
                status: CycleStatus::Success,
                revision,
                fetched: 0,
                failures,
            });
        }

        let Some(revision) = self
            .inner
            .store
            .apply_refresh(&listed, &fetched, Utc::now())
        else {
            let first = failures
                .first()
                .map(|f| f.error.to_string())
                .unwrap_or_default();
            return Err(CoreError::RefreshFailed {
                message: format!("all {} gardens failed ({first})", failures.len()),
            });
        };

        let status = if failures.is_empty() {
            CycleStatus::Success
        } else {
            CycleStatus::PartialFailure
        };

        Ok(RefreshOutcome {
            status,
            revision,
            fetched: fetched.len(),
            failures,
        })
    }

    // ── Failure reporting ────────────────────────────────────────

    fn log_gardens(&self, fetched: &[FetchedGarden], failures: &[GardenFailure]) {
        let mut log = lock(&self.inner.failure_log);

        for item in fetched {
            let missed = log.garden_succeeded(item.id());
            if missed > 0 {
                info!(garden_id = %item.id(), failed_cycles = missed, "garden reachable again");
            }
        }

        for failure in failures {
            if log.garden_failed(failure.garden) {
                warn!(
                    garden_id = %failure.garden,
                    error = %failure.error,
                    "garden fetch failed, keeping last known state"
                );
            } else {
                debug!(garden_id = %failure.garden, error = %failure.error, "garden fetch failed again");
            }
        }
    }

    fn log_cycle(&self, result: &CycleResult) {
        let mut log = lock(&self.inner.failure_log);

        match result {
            Ok(outcome) => {
                let failed_cycles = log.cycle_succeeded();
                if failed_cycles > 0 {
                    info!(failed_cycles, revision = outcome.revision, "garden refresh recovered");
                } else {
                    debug!(
                        revision = outcome.revision,
                        fetched = outcome.fetched,
                        status = %outcome.status,
                        "refresh complete"
                    );
                }
            }
            Err(e) if e.is_auth() => {
                warn!(error = %e, "authentication failed, polling stops until credentials are updated");
            }
            Err(e) => {
                if log.cycle_failed() {
                    warn!(error = %e, consecutive = log.consecutive, "garden refresh failed");
                } else {
                    debug!(error = %e, consecutive = log.consecutive, "garden refresh failed again");
                }
            }
        }
    }

    // ── Command execution ────────────────────────────────────────

    /// Execute a command. Commands never wait for a refresh cycle;
    /// successful writes schedule one.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        match cmd {
            Command::SetLight { garden, light } => {
                self.set_light(garden, light).await?;
                Ok(CommandResult::Ok)
            }
            Command::SetPump { garden, on } => {
                self.set_pump(garden, on).await?;
                Ok(CommandResult::Ok)
            }
            Command::Refresh => {
                let outcome = self.refresh().await?;
                Ok(CommandResult::Refreshed {
                    revision: outcome.revision,
                })
            }
        }
    }

    pub async fn set_light(&self, garden: GardenId, light: LightCommand) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ShutDown);
        }
        self.inner
            .session
            .set_light(garden.get(), light.on, i32::from(light.level))
            .await?;
        info!(garden_id = %garden, on = light.on, level = light.level, "light command sent");
        self.request_refresh();
        Ok(())
    }

    pub async fn set_pump(&self, garden: GardenId, on: bool) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ShutDown);
        }
        self.inner.session.set_pump(garden.get(), on).await?;
        info!(garden_id = %garden, on, "pump command sent");
        self.request_refresh();
        Ok(())
    }

    // ── State observation ────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.store.current()
    }

    pub fn garden(&self, id: GardenId) -> Option<Arc<Garden>> {
        self.inner.store.garden(id)
    }

    /// Subscribe to new revisions.
    pub fn subscribe(&self) -> SnapshotStream {
        self.inner.store.subscribe()
    }

    pub fn cycle_state(&self) -> watch::Receiver<CycleState> {
        self.inner.cycle_state.subscribe()
    }

    pub fn availability(&self) -> watch::Receiver<Availability> {
        self.inner.availability.subscribe()
    }

    /// Per-garden failures of the last completed cycle.
    pub fn last_failures(&self) -> Vec<GardenFailure> {
        lock(&self.inner.last_failures).clone()
    }
}

// ── Cycle lease ──────────────────────────────────────────────────

/// Held by the task leading a cycle. Dropping it, on completion or on
/// unwind, frees the single-flight slot and wakes every joiner.
struct CycleLease {
    inner: Arc<CoordinatorInner>,
    tx: watch::Sender<Option<CycleResult>>,
    result: Option<CycleResult>,
}

impl CycleLease {
    fn new(inner: Arc<CoordinatorInner>, tx: watch::Sender<Option<CycleResult>>) -> Self {
        Self {
            inner,
            tx,
            result: None,
        }
    }

    fn finish(&mut self, result: CycleResult) {
        self.result = Some(result);
    }
}

impl Drop for CycleLease {
    fn drop(&mut self) {
        let result = self.result.take().unwrap_or_else(|| {
            warn!("refresh cycle aborted before completing");
            Err(CoreError::Internal("refresh cycle aborted".into()))
        });

        // Slot cleared before joiners wake.
        self.inner.cycle_state.send_replace(CycleState::Idle);
        *lock(&self.inner.in_flight) = None;
        self.tx.send_replace(Some(result));
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodically refresh until cancelled or until credentials are rejected.
async fn refresh_task(coordinator: Coordinator, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = coordinator.refresh().await {
                    if e.is_auth() {
                        info!("periodic refresh stopped");
                        break;
                    }
                }
            }
        }
    }
}

// ── Log throttling ───────────────────────────────────────────────

/// Consecutive-failure counters, per cycle and per garden.
#[derive(Debug, Default)]
struct FailureLog {
    consecutive: u32,
    gardens: HashMap<GardenId, u32>,
}

impl FailureLog {
    fn should_warn(count: u32) -> bool {
        count == 1 || count % LOG_EVERY_N_FAILURES == 0
    }

    /// Record a failed cycle; `true` if it deserves a warning.
    fn cycle_failed(&mut self) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        Self::should_warn(self.consecutive)
    }

    /// Reset the cycle counter, returning how many cycles had failed.
    fn cycle_succeeded(&mut self) -> u32 {
        std::mem::take(&mut self.consecutive)
    }

    fn garden_failed(&mut self, id: GardenId) -> bool {
        let count = self.gardens.entry(id).or_default();
        *count = count.saturating_add(1);
        Self::should_warn(*count)
    }

    fn garden_succeeded(&mut self, id: GardenId) -> u32 {
        self.gardens.remove(&id).unwrap_or(0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use risegarden_api::Credentials;
    use secrecy::SecretString;

    fn offline_coordinator() -> Coordinator {
        let credentials = Credentials::new("grower@example.com", SecretString::from("hunter2"));
        Coordinator::new(CoordinatorConfig::new(credentials)).unwrap()
    }

    #[tokio::test]
    async fn panicking_cycle_releases_the_slot() {
        let coordinator = offline_coordinator();
        let (tx, mut rx) = watch::channel(None);
        *lock(&coordinator.inner.in_flight) = Some(rx.clone());
        coordinator.inner.cycle_state.send_replace(CycleState::Refreshing);

        let lease = CycleLease::new(Arc::clone(&coordinator.inner), tx);
        let task = tokio::spawn(async move {
            let _lease = lease;
            panic!("cycle blew up");
        });
        assert!(task.await.unwrap_err().is_panic());

        let result = rx.wait_for(Option::is_some).await.unwrap().clone();
        assert!(matches!(result, Some(Err(CoreError::Internal(_)))), "got {result:?}");
        assert!(lock(&coordinator.inner.in_flight).is_none());
        assert_eq!(*coordinator.inner.cycle_state.borrow(), CycleState::Idle);
    }

    #[tokio::test]
    async fn finished_lease_publishes_its_result() {
        let coordinator = offline_coordinator();
        let (tx, mut rx) = watch::channel(None);
        *lock(&coordinator.inner.in_flight) = Some(rx.clone());

        let mut lease = CycleLease::new(Arc::clone(&coordinator.inner), tx);
        lease.finish(Err(CoreError::ShutDown));
        drop(lease);

        let result = rx.wait_for(Option::is_some).await.unwrap().clone();
        assert_eq!(result, Some(Err(CoreError::ShutDown)));
        assert!(lock(&coordinator.inner.in_flight).is_none());
    }

    #[test]
    fn total_failure_is_counted_once_per_cycle() {
        let coordinator = offline_coordinator();
        let failures = [1, 2]
            .map(|id| GardenFailure {
                garden: GardenId(id),
                name: None,
                error: CoreError::Timeout {
                    message: "detail".into(),
                },
            })
            .to_vec();
        let fetch = CycleFetch {
            listed: [GardenId(1), GardenId(2)].into_iter().collect(),
            fetched: Vec::new(),
            failures,
        };

        let result = coordinator.complete_cycle(Ok(fetch));

        assert!(matches!(result, Err(CoreError::RefreshFailed { .. })), "got {result:?}");
        let log = lock(&coordinator.inner.failure_log);
        assert_eq!(log.consecutive, 1);
        assert!(log.gardens.is_empty());
        drop(log);
        assert_eq!(coordinator.last_failures().len(), 2);
    }

    #[test]
    fn recurring_failures_warn_first_and_every_tenth() {
        let mut log = FailureLog::default();
        let mut warned = Vec::new();
        for _ in 0..25 {
            if log.cycle_failed() {
                warned.push(log.consecutive);
            }
        }
        assert_eq!(warned, vec![1, 10, 20]);

        assert_eq!(log.cycle_succeeded(), 25);
        assert!(log.cycle_failed());
    }

    #[test]
    fn garden_counters_are_independent() {
        let mut log = FailureLog::default();
        assert!(log.garden_failed(GardenId(1)));
        assert!(!log.garden_failed(GardenId(1)));
        assert!(log.garden_failed(GardenId(2)));

        assert_eq!(log.garden_succeeded(GardenId(1)), 2);
        assert_eq!(log.garden_succeeded(GardenId(1)), 0);
        assert!(log.garden_failed(GardenId(1)));
    }
}

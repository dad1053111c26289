//! History session simulator
//!
//! Drives random analyst actions and undo/redo requests through a
//! [`HistorySession`] over an [`InMemoryAuthority`], and checks after every
//! step that:
//! - No partition holds an id twice
//! - Reconciling the last payload again changes nothing
//! - Every cached partition matches the authority's query for its window
//! - Only observed windows hold a partition
//! - The cached history log matches the authority's log
//! - A rejected request leaves the cache untouched

use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use seis_cache::{PartitionSet, PartitionedEntity};
use seis_history::HistoryLog;
use seis_model::{
    CacheEntity, ChangeScope, DataPayload, EntityCollection, EntityKind, EntityRef, Event, EventId,
    HistoryEntryId, QcMask, SignalDetection, TimeRange, UserActionDescription,
};
use seis_session::{
    AuthorityError, EntitySnapshot, HistoryAuthority, HistoryRequest, HistorySession,
    InMemoryAuthority, Mutation, SessionConfig, SessionError,
};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use tracing::{debug, info};

/// Interval the simulated analyst works in; every generated time falls inside it
pub const SIM_INTERVAL: TimeRange = TimeRange::new(0.0, 3_600.0);

/// Intervals the analyst moves between
///
/// Padded by the default offsets, every window still covers [`SIM_INTERVAL`].
pub const SIM_INTERVALS: [TimeRange; 3] = [
    SIM_INTERVAL,
    TimeRange::new(600.0, 3_000.0),
    TimeRange::new(900.0, 2_700.0),
];

const ANALYST: &str = "sim-analyst";

/// Simulator configuration
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Operations to run
    pub steps: u64,
    /// Events seeded into the authority
    pub events: usize,
    /// Stop at the first violation
    pub stop_on_first_violation: bool,
    /// Probability that a history request is rejected by the authority
    pub rejection_rate: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            steps: 1_000,
            events: 4,
            stop_on_first_violation: false,
            rejection_rate: 0.05,
        }
    }
}

/// One simulated operation
#[derive(Debug, Clone)]
pub enum SimulatedOperation {
    /// Analyst action recorded by the authority
    Record {
        /// Action performed
        action: UserActionDescription,
        /// Entity writes
        mutations: Vec<Mutation>,
    },
    /// Open an event for refinement
    OpenEvent(EventId),
    /// Move the session to another interval
    SetInterval(TimeRange),
    /// Global undo
    Undo(usize),
    /// Global redo
    Redo(usize),
    /// Global undo through an entry
    UndoById(HistoryEntryId),
    /// Global redo through an entry
    RedoById(HistoryEntryId),
    /// Undo within the open event
    UndoEvent(usize),
    /// Redo within the open event
    RedoEvent(usize),
    /// Undo the open event's changes through an entry
    UndoEventById(HistoryEntryId),
    /// Redo the open event's changes through an entry
    RedoEventById(HistoryEntryId),
}

impl SimulatedOperation {
    /// Whether the operation goes through the undo/redo interface
    #[must_use]
    pub fn is_history_request(&self) -> bool {
        !matches!(self, Self::Record { .. } | Self::OpenEvent(_) | Self::SetInterval(_))
    }
}

impl Display for SimulatedOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record { action, mutations } => {
                write!(f, "record {} ({} changes)", action, mutations.len())
            }
            Self::OpenEvent(id) => write!(f, "open {id}"),
            Self::SetInterval(interval) => write!(f, "interval {interval}"),
            Self::Undo(n) => write!(f, "undo x{n}"),
            Self::Redo(n) => write!(f, "redo x{n}"),
            Self::UndoById(id) => write!(f, "undo through {id}"),
            Self::RedoById(id) => write!(f, "redo through {id}"),
            Self::UndoEvent(n) => write!(f, "event undo x{n}"),
            Self::RedoEvent(n) => write!(f, "event redo x{n}"),
            Self::UndoEventById(id) => write!(f, "event undo through {id}"),
            Self::RedoEventById(id) => write!(f, "event redo through {id}"),
        }
    }
}

/// A violation detected during simulation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Violation {
    /// Session could not be set up
    Setup {
        /// Failure
        error: String,
    },
    /// An operation failed that should have succeeded
    UnexpectedError {
        /// Step index
        step: u64,
        /// Operation
        operation: String,
        /// Failure
        error: String,
    },
    /// A partition holds an id twice
    DuplicateId {
        /// Step index
        step: u64,
        /// Entity kind
        kind: EntityKind,
        /// Duplicated id
        id: String,
    },
    /// Reconciling the last payload again changed the cache
    NotIdempotent {
        /// Step index
        step: u64,
        /// Operation that produced the payload
        operation: String,
    },
    /// Cached partition differs from the authority
    CacheDiverged {
        /// Step index
        step: u64,
        /// Entity kind
        kind: EntityKind,
        /// Partition window
        window: TimeRange,
    },
    /// A kind is unobserved, or a partition outlives its observed window
    OrphanPartition {
        /// Step index
        step: u64,
        /// Entity kind
        kind: EntityKind,
    },
    /// Cached history log differs from the authority
    HistoryDiverged {
        /// Step index
        step: u64,
    },
    /// A rejected request changed the cache or was not reported
    RejectionLeaked {
        /// Step index
        step: u64,
        /// Operation
        operation: String,
    },
}

/// Statistics for simulation
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulatorStats {
    /// Operations run
    pub steps: u64,
    /// Actions recorded
    pub records: u64,
    /// Undo requests issued
    pub undos: u64,
    /// Redo requests issued
    pub redos: u64,
    /// Requests issued in event scope
    pub event_scoped: u64,
    /// Requests rejected on purpose
    pub rejected: u64,
    /// Interval changes
    pub interval_changes: u64,
    /// Entries in the final log
    pub final_entries: usize,
}

/// Final report from simulator
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorReport {
    /// Configuration used
    pub config: SimulatorConfig,
    /// Counters
    pub stats: SimulatorStats,
    /// Violations found
    pub violations: Vec<Violation>,
}

impl SimulatorReport {
    /// Check if simulation passed all checks
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== History Session Simulator Report ===\n\n");
        report.push_str(&format!("Seed: {}\n", self.config.seed));
        report.push_str(&format!("Steps: {}\n", self.stats.steps));
        report.push_str(&format!("Actions Recorded: {}\n", self.stats.records));
        report.push_str(&format!("Undo Requests: {}\n", self.stats.undos));
        report.push_str(&format!("Redo Requests: {}\n", self.stats.redos));
        report.push_str(&format!("Event-Scoped Requests: {}\n", self.stats.event_scoped));
        report.push_str(&format!("Simulated Rejections: {}\n", self.stats.rejected));
        report.push_str(&format!("Interval Changes: {}\n", self.stats.interval_changes));
        report.push_str(&format!("Final Log Entries: {}\n", self.stats.final_entries));
        report.push_str(&format!("Violations: {}\n", self.violations.len()));

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                report.push_str(&format!("{}. {:?}\n", i + 1, v));
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));

        report
    }

    /// Generate JSON report
    pub fn generate_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Authority wrapper that remembers the last undo/redo payload
struct RecordingAuthority {
    inner: Arc<InMemoryAuthority>,
    last: Mutex<Option<DataPayload>>,
}

impl RecordingAuthority {
    fn take_last(&self) -> Option<DataPayload> {
        self.last.lock().take()
    }
}

#[async_trait::async_trait]
impl HistoryAuthority for RecordingAuthority {
    async fn apply_history(&self, request: &HistoryRequest) -> Result<DataPayload, AuthorityError> {
        let payload = self.inner.apply_history(request).await?;
        *self.last.lock() = Some(payload.clone());
        Ok(payload)
    }

    async fn history(&self) -> Result<Vec<seis_model::HistoryEntry>, AuthorityError> {
        self.inner.history().await
    }

    async fn query(&self, kind: EntityKind, window: TimeRange) -> Result<EntityCollection, AuthorityError> {
        self.inner.query(kind, window).await
    }
}

struct Simulation {
    rng: StdRng,
    authority: Arc<InMemoryAuthority>,
    recorder: Arc<RecordingAuthority>,
    session: HistorySession,
    next_id: u64,
}

/// Run the history session simulator
pub async fn run_simulator(config: SimulatorConfig) -> SimulatorReport {
    let mut stats = SimulatorStats::default();
    let mut violations = Vec::new();

    let mut sim = match Simulation::setup(&config).await {
        Ok(sim) => sim,
        Err(err) => {
            violations.push(Violation::Setup {
                error: err.to_string(),
            });
            return SimulatorReport {
                config,
                stats,
                violations,
            };
        }
    };

    for step in 0..config.steps {
        let operation = sim.generate_operation();
        let label = operation.to_string();
        debug!("step {}: {}", step, label);
        stats.steps += 1;
        count(&operation, &mut stats);

        let before = violations.len();
        if operation.is_history_request() && sim.rng.random_bool(config.rejection_rate) {
            stats.rejected += 1;
            sim.check_rejection(step, operation, &mut violations).await;
        } else {
            match sim.execute(operation).await {
                Ok(payload) => sim.check_invariants(step, &label, payload.as_ref(), &mut violations),
                Err(err) => violations.push(Violation::UnexpectedError {
                    step,
                    operation: label,
                    error: err.to_string(),
                }),
            }
        }

        if config.stop_on_first_violation && violations.len() > before {
            break;
        }
    }

    stats.final_entries = sim.authority.history_log().len();
    info!(
        "simulation finished: {} steps, {} violations",
        stats.steps,
        violations.len()
    );

    SimulatorReport {
        config,
        stats,
        violations,
    }
}

fn count(operation: &SimulatedOperation, stats: &mut SimulatorStats) {
    use SimulatedOperation as Op;
    match operation {
        Op::Record { .. } => stats.records += 1,
        Op::OpenEvent(_) => {}
        Op::SetInterval(_) => stats.interval_changes += 1,
        Op::Undo(_) | Op::UndoById(_) => stats.undos += 1,
        Op::Redo(_) | Op::RedoById(_) => stats.redos += 1,
        Op::UndoEvent(_) | Op::UndoEventById(_) => {
            stats.undos += 1;
            stats.event_scoped += 1;
        }
        Op::RedoEvent(_) | Op::RedoEventById(_) => {
            stats.redos += 1;
            stats.event_scoped += 1;
        }
    }
}

impl Simulation {
    async fn setup(config: &SimulatorConfig) -> Result<Self, SessionError> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let authority = Arc::new(InMemoryAuthority::new());
        authority.seed((0..config.events).map(|i| {
            EntitySnapshot::from(Event::new(format!("E{i}"), rng.random_range(0.0..3_600.0)))
        }));

        let recorder = Arc::new(RecordingAuthority {
            inner: Arc::clone(&authority),
            last: Mutex::new(None),
        });
        let session = HistorySession::new(recorder.clone(), SessionConfig::new(), SIM_INTERVAL);
        session.observe_all().await?;
        session.refresh_history().await?;

        Ok(Self {
            rng,
            authority,
            recorder,
            session,
            next_id: 0,
        })
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn random_time(&mut self) -> f64 {
        self.rng.random_range(0.0..3_600.0)
    }

    fn pick<T: Clone>(&mut self, items: &[T]) -> Option<T> {
        if items.is_empty() {
            None
        } else {
            Some(items[self.rng.random_range(0..items.len())].clone())
        }
    }

    fn authoritative<T>(&self) -> Vec<T>
    where
        T: PartitionedEntity,
        Vec<T>: TryFrom<EntityCollection>,
    {
        let window = self.session.window_for(T::KIND);
        Vec::try_from(self.authority.collection(T::KIND, window)).unwrap_or_default()
    }

    fn random_event_scope(&mut self, events: &[Event]) -> ChangeScope {
        match self.pick(events) {
            Some(e) if self.rng.random_bool(0.8) => ChangeScope::Event(e.id),
            _ => ChangeScope::Global,
        }
    }

    fn generate_operation(&mut self) -> SimulatedOperation {
        let roll = self.rng.random_range(0..100);
        match roll {
            0..=36 => self.generate_record(),
            37..=39 => self.generate_interval(),
            40..=44 => self.generate_open(),
            45..=59 => SimulatedOperation::Undo(self.rng.random_range(1..=3)),
            60..=69 => SimulatedOperation::Redo(self.rng.random_range(1..=3)),
            70..=74 => self.generate_by_id(false, false),
            75..=79 => self.generate_by_id(true, false),
            _ => self.generate_event_request(),
        }
    }

    fn generate_interval(&mut self) -> SimulatedOperation {
        let current = self.session.view().interval;
        let others: Vec<TimeRange> = SIM_INTERVALS.into_iter().filter(|i| *i != current).collect();
        match self.pick(&others) {
            Some(interval) => SimulatedOperation::SetInterval(interval),
            None => self.generate_record(),
        }
    }

    fn generate_open(&mut self) -> SimulatedOperation {
        let events: Vec<Event> = self.authoritative();
        match self.pick(&events) {
            Some(e) => SimulatedOperation::OpenEvent(e.id),
            None => self.generate_record(),
        }
    }

    fn generate_record(&mut self) -> SimulatedOperation {
        let events: Vec<Event> = self.authoritative();
        let detections: Vec<SignalDetection> = self.authoritative();
        let masks: Vec<QcMask> = self.authoritative();

        let generated = match self.rng.random_range(0..6) {
            1 => self.pick(&detections).map(|mut sd| {
                let scope = self.random_event_scope(&events);
                sd.arrival_time = self.random_time();
                sd.revision += 1;
                (UserActionDescription::RetimeDetection, vec![Mutation::upsert(scope, sd)])
            }),
            2 => self.pick(&events).map(|mut event| {
                event.origin_time = self.random_time();
                event.revision += 1;
                let scope = ChangeScope::Event(event.id.clone());
                (UserActionDescription::LocateEvent, vec![Mutation::upsert(scope, event)])
            }),
            3 => {
                let id = self.fresh_id("Q");
                let start = self.rng.random_range(0.0..3_000.0);
                let end = start + self.rng.random_range(1.0..600.0);
                let mask = QcMask::new(id, "SIM.AS01.SHZ", start, end);
                Some((UserActionDescription::CreateQcMask, vec![Mutation::upsert(ChangeScope::Global, mask)]))
            }
            4 => self.pick(&masks).map(|mask| {
                let entity = EntityRef::new(EntityKind::QcMask, mask.id.as_str());
                (UserActionDescription::RejectQcMask, vec![Mutation::delete(ChangeScope::Global, entity)])
            }),
            5 => {
                let mutations: Vec<Mutation> = (0..2)
                    .filter_map(|_| {
                        let event = self.pick(&events)?;
                        let sd = self.pick(&detections)?.associated_to(event.id.clone());
                        Some(Mutation::upsert(ChangeScope::Event(event.id), sd))
                    })
                    .collect();
                (!mutations.is_empty()).then_some((UserActionDescription::AssociateMultiple, mutations))
            }
            _ => None,
        };

        let (action, mutations) = match generated {
            Some(generated) => generated,
            None => {
                let scope = self.random_event_scope(&events);
                let id = self.fresh_id("S");
                let sd = SignalDetection::new(id, "SIM", self.random_time());
                (UserActionDescription::CreateDetection, vec![Mutation::upsert(scope, sd)])
            }
        };

        SimulatedOperation::Record { action, mutations }
    }

    fn generate_by_id(&mut self, redo: bool, event_scoped: bool) -> SimulatedOperation {
        let Some(log) = self.session.history() else {
            return self.generate_record();
        };
        // global actions need a fully applied (or not fully applied) target;
        // event actions only need one of the event's changes in the right state
        let candidates: Vec<HistoryEntryId> = match (event_scoped, self.session.open_event_id()) {
            (true, Some(id)) => log
                .event_history(&id)
                .entries()
                .iter()
                .filter(|e| e.changes.iter().any(|c| c.active != redo))
                .map(|e| e.id.clone())
                .collect(),
            _ => log
                .entries()
                .iter()
                .filter(|e| e.applied != redo)
                .map(|e| e.id.clone())
                .collect(),
        };
        let Some(id) = self.pick(&candidates) else {
            return self.generate_record();
        };

        match (redo, event_scoped) {
            (false, false) => SimulatedOperation::UndoById(id),
            (true, false) => SimulatedOperation::RedoById(id),
            (false, true) => SimulatedOperation::UndoEventById(id),
            (true, true) => SimulatedOperation::RedoEventById(id),
        }
    }

    fn generate_event_request(&mut self) -> SimulatedOperation {
        if self.session.open_event_id().is_none() {
            return self.generate_open();
        }
        match self.rng.random_range(0..4) {
            0 => SimulatedOperation::UndoEvent(self.rng.random_range(1..=3)),
            1 => SimulatedOperation::RedoEvent(self.rng.random_range(1..=3)),
            2 => self.generate_by_id(false, true),
            _ => self.generate_by_id(true, true),
        }
    }

    async fn execute(&self, operation: SimulatedOperation) -> Result<Option<DataPayload>, SessionError> {
        use SimulatedOperation as Op;
        let session = &self.session;

        match operation {
            Op::Record { action, mutations } => {
                let payload = self.authority.record(action, mutations)?;
                session.apply_payload(&payload);
                return Ok(Some(payload));
            }
            Op::OpenEvent(id) => {
                let payload = self.authority.open_event(&id, ANALYST)?;
                session.apply_payload(&payload);
                session.set_open_event(Some(id));
                return Ok(Some(payload));
            }
            Op::SetInterval(interval) => {
                session.change_interval(interval).await?;
                return Ok(None);
            }
            Op::Undo(n) => session.undo(n).await?,
            Op::Redo(n) => session.redo(n).await?,
            Op::UndoById(id) => session.undo_by_id(&id).await?,
            Op::RedoById(id) => session.redo_by_id(&id).await?,
            Op::UndoEvent(n) => session.undo_event_history(n).await?,
            Op::RedoEvent(n) => session.redo_event_history(n).await?,
            Op::UndoEventById(id) => session.undo_event_history_by_id(&id).await?,
            Op::RedoEventById(id) => session.redo_event_history_by_id(&id).await?,
        };

        Ok(self.recorder.take_last())
    }

    async fn check_rejection(&mut self, step: u64, operation: SimulatedOperation, violations: &mut Vec<Violation>) {
        let label = operation.to_string();
        let snapshot = self.session.partitions();
        self.authority.reject_next("simulated conflict");

        let rejected = matches!(
            self.execute(operation).await,
            Err(SessionError::Authority(AuthorityError::Rejected(_)))
        );
        if !rejected || self.session.partitions() != snapshot || self.session.history_action_in_progress() != 0 {
            violations.push(Violation::RejectionLeaked { step, operation: label });
        }
    }

    fn check_invariants(
        &self,
        step: u64,
        label: &str,
        payload: Option<&DataPayload>,
        violations: &mut Vec<Violation>,
    ) {
        let partitions = self.session.partitions();
        check_unique::<Event>(step, &partitions, violations);
        check_unique::<SignalDetection>(step, &partitions, violations);
        check_unique::<QcMask>(step, &partitions, violations);

        if let Some(payload) = payload {
            self.session.apply_payload(payload);
            if self.session.partitions() != partitions {
                violations.push(Violation::NotIdempotent {
                    step,
                    operation: label.to_string(),
                });
            }
        }

        let view = self.session.view();
        for kind in EntityKind::ALL {
            let windows = match kind {
                EntityKind::Event => cached_windows::<Event>(&partitions),
                EntityKind::SignalDetection => cached_windows::<SignalDetection>(&partitions),
                EntityKind::QcMask => cached_windows::<QcMask>(&partitions),
            };
            let observed = view.observed.get(&kind).copied();
            if observed.is_none() || windows.iter().any(|w| Some(*w) != observed) {
                violations.push(Violation::OrphanPartition { step, kind });
            }

            for window in windows {
                let cached = partitions.collection(kind, window).map(sorted);
                let truth = sorted(self.authority.collection(kind, window));
                if cached.as_ref() != Some(&truth) {
                    violations.push(Violation::CacheDiverged { step, kind, window });
                }
            }
        }

        let cached_log = partitions.history().map(HistoryLog::entries);
        if cached_log != Some(self.authority.history_log().entries()) {
            violations.push(Violation::HistoryDiverged { step });
        }
    }
}

fn check_unique<T: PartitionedEntity>(step: u64, partitions: &PartitionSet, violations: &mut Vec<Violation>) {
    for partition in partitions.partitions_of::<T>() {
        let mut seen = HashSet::new();
        for id in partition.ids() {
            if !seen.insert(id) {
                violations.push(Violation::DuplicateId {
                    step,
                    kind: T::KIND,
                    id: id.to_string(),
                });
            }
        }
    }
}

fn cached_windows<T: PartitionedEntity>(partitions: &PartitionSet) -> Vec<TimeRange> {
    partitions.partitions_of::<T>().map(|p| p.window()).collect()
}

fn sorted(collection: EntityCollection) -> EntityCollection {
    fn by_id<T: CacheEntity>(mut items: Vec<T>) -> Vec<T> {
        items.sort_by(|a, b| a.id().cmp(b.id()));
        items
    }
    match collection {
        EntityCollection::Events(v) => EntityCollection::Events(by_id(v)),
        EntityCollection::SignalDetections(v) => EntityCollection::SignalDetections(by_id(v)),
        EntityCollection::QcMasks(v) => EntityCollection::QcMasks(by_id(v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_labels() {
        assert_eq!(SimulatedOperation::Undo(2).to_string(), "undo x2");
        assert_eq!(
            SimulatedOperation::RedoEventById(HistoryEntryId::from("H1")).to_string(),
            "event redo through H1"
        );
        assert!(!SimulatedOperation::OpenEvent(EventId::from("E1")).is_history_request());
        assert!(!SimulatedOperation::SetInterval(SIM_INTERVALS[1]).is_history_request());
    }

    #[test]
    fn report_text_shows_result() {
        let report = SimulatorReport {
            config: SimulatorConfig::default(),
            stats: SimulatorStats::default(),
            violations: vec![Violation::HistoryDiverged { step: 3 }],
        };
        assert!(!report.passed());
        assert!(report.generate_text().contains("=== Result: FAIL ==="));
        assert!(report.generate_json().unwrap().contains("historyDiverged"));
    }

    #[tokio::test]
    async fn short_run_passes() {
        let report = run_simulator(SimulatorConfig {
            steps: 200,
            ..SimulatorConfig::default()
        })
        .await;
        assert!(report.passed(), "{}", report.generate_text());
        assert_eq!(report.stats.steps, 200);
    }
}

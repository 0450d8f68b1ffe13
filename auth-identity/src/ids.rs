//! Human-readable business identifiers
//!
//! Every principal and clinical record carries a display identifier that is
//! decoupled from its storage key, e.g. `OPID-20240105-0042` printed on a
//! patient's visit slip. This module produces candidates and allocates free
//! ones:
//!
//! | Kind    | Format                              |
//! |---------|-------------------------------------|
//! | Patient | `OPID-{YYYYMMDD}-{NNNN}`            |
//! | Doctor  | `DOC-{YYYYMMDD}-{NNNN}`             |
//! | Visit   | `VISIT-{epoch millis}-{NNN}`        |
//! | Report  | `REPORT-{epoch millis}-{NNN}`       |
//! | Query   | `QUERY-{epoch millis}-{NNN}`        |
//!
//! Time and randomness are injected through [`Clock`] and [`RandomSource`] so
//! tests can pin both and force collisions deterministically.
//!
//! [`IdentifierAllocator::allocate`] is a check-then-use loop and is **not**
//! atomic: two concurrent callers can be handed the same candidate. The unique
//! index in the backing store is the authoritative guard; the allocator only
//! avoids wasted inserts.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Entity kinds that carry a business identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Patient,
    Doctor,
    Visit,
    Report,
    Query,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheme {
    /// `PREFIX-YYYYMMDD-NNNN`
    Dated,
    /// `PREFIX-<epoch millis>-NNN`
    Timestamped,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Patient,
        EntityKind::Doctor,
        EntityKind::Visit,
        EntityKind::Report,
        EntityKind::Query,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::Patient => "OPID",
            EntityKind::Doctor => "DOC",
            EntityKind::Visit => "VISIT",
            EntityKind::Report => "REPORT",
            EntityKind::Query => "QUERY",
        }
    }

    fn scheme(self) -> Scheme {
        match self {
            EntityKind::Patient | EntityKind::Doctor => Scheme::Dated,
            EntityKind::Visit | EntityKind::Report | EntityKind::Query => Scheme::Timestamped,
        }
    }

    /// Exclusive upper bound of the random suffix
    fn suffix_range(self) -> u32 {
        match self.scheme() {
            Scheme::Dated => 10_000,
            Scheme::Timestamped => 1_000,
        }
    }

    fn suffix_width(self) -> usize {
        match self.scheme() {
            Scheme::Dated => 4,
            Scheme::Timestamped => 3,
        }
    }

    /// Check whether `candidate` has this kind's shape
    pub fn matches(self, candidate: &str) -> bool {
        let Some(rest) = candidate
            .strip_prefix(self.prefix())
            .and_then(|rest| rest.strip_prefix('-'))
        else {
            return false;
        };
        let Some((middle, suffix)) = rest.rsplit_once('-') else {
            return false;
        };

        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        let middle_ok = match self.scheme() {
            Scheme::Dated => middle.len() == 8 && all_digits(middle),
            Scheme::Timestamped => all_digits(middle),
        };

        middle_ok && suffix.len() == self.suffix_width() && all_digits(suffix)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Patient => "patient",
            EntityKind::Doctor => "doctor",
            EntityKind::Visit => "visit",
            EntityKind::Report => "report",
            EntityKind::Query => "query",
        };
        f.write_str(name)
    }
}

// =============================================================================
// TIME AND RANDOMNESS
// =============================================================================

/// Source of the current instant
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Source of the random identifier suffix
pub trait RandomSource: Send + Sync + fmt::Debug {
    /// A value in `0..upper`
    fn next_below(&self, upper: u32) -> u32;
}

/// Thread-local CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_below(&self, upper: u32) -> u32 {
        rand::thread_rng().gen_range(0..upper.max(1))
    }
}

/// Replays a fixed sequence, cycling when exhausted
#[derive(Debug)]
pub struct SequenceRandom {
    values: Vec<u32>,
    cursor: AtomicUsize,
}

impl SequenceRandom {
    pub fn new(values: impl Into<Vec<u32>>) -> Self {
        Self {
            values: values.into(),
            cursor: AtomicUsize::new(0),
        }
    }
}

impl RandomSource for SequenceRandom {
    fn next_below(&self, upper: u32) -> u32 {
        if self.values.is_empty() {
            return 0;
        }
        let index = self.cursor.fetch_add(1, Ordering::SeqCst) % self.values.len();
        self.values.get(index).copied().unwrap_or(0) % upper.max(1)
    }
}

/// Produce a candidate identifier. Does not check uniqueness.
pub fn generate_candidate(kind: EntityKind, clock: &dyn Clock, random: &dyn RandomSource) -> String {
    let now = clock.now();
    let suffix = random.next_below(kind.suffix_range());

    match kind.scheme() {
        Scheme::Dated => format!("{}-{}-{:04}", kind.prefix(), now.format("%Y%m%d"), suffix),
        Scheme::Timestamped => {
            format!("{}-{}-{:03}", kind.prefix(), now.timestamp_millis(), suffix)
        }
    }
}

// =============================================================================
// UNIQUENESS ENFORCEMENT
// =============================================================================

/// Read-only existence check against persisted records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentifierLookup: Send + Sync {
    async fn identifier_exists(&self, kind: EntityKind, candidate: &str) -> Result<bool, StoreError>;
}

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("Identifier lookup failed: {0}")]
    Lookup(#[from] StoreError),

    #[error("No free {kind} identifier after {attempts} attempts")]
    Exhausted { kind: EntityKind, attempts: u32 },
}

/// Issues identifiers that are free at the time of the check
#[derive(Debug, Clone)]
pub struct IdentifierAllocator {
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    max_attempts: Option<u32>,
}

impl IdentifierAllocator {
    pub fn new(clock: Arc<dyn Clock>, random: Arc<dyn RandomSource>) -> Self {
        Self {
            clock,
            random,
            max_attempts: None,
        }
    }

    /// Wall clock and thread RNG, unbounded retries
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(ThreadRandom))
    }

    /// Cap the retry loop. `None` retries forever.
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn candidate(&self, kind: EntityKind) -> String {
        generate_candidate(kind, self.clock.as_ref(), self.random.as_ref())
    }

    /// Generate candidates until one is not found by `lookup`
    pub async fn allocate<L>(&self, kind: EntityKind, lookup: &L) -> Result<String, AllocationError>
    where
        L: IdentifierLookup + ?Sized,
    {
        let mut attempts: u32 = 0;
        loop {
            if let Some(max) = self.max_attempts {
                if attempts >= max {
                    tracing::error!(kind = %kind, attempts, "Identifier space exhausted");
                    return Err(AllocationError::Exhausted { kind, attempts });
                }
            }
            attempts = attempts.saturating_add(1);

            let candidate = self.candidate(kind);
            if !lookup.identifier_exists(kind, &candidate).await? {
                return Ok(candidate);
            }

            tracing::debug!(
                kind = %kind,
                candidate = %candidate,
                attempt = attempts,
                "Identifier already in use, retrying"
            );
        }
    }
}

//! Append-only ledger store.
//!
//! `append` is the only mutator the trait exposes. There is no update and
//! no delete; corrections are new entries. Appends from concurrent
//! settlements are independent and commutative, so the balance for a
//! reference is the same regardless of append order and no cross-entry
//! locking exists beyond the atomicity of a single insert.
//!
//! Appending an id the store already holds is not an error: the entry was
//! recorded by an earlier attempt, and the store reports
//! [`AppendOutcome::AlreadyRecorded`] so retried commands stay idempotent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use stayforge_core::{EngineError, EntryType, LedgerEntry, LedgerEntryId, ReferenceId};
use tokio::sync::RwLock;

/// Filter for paginated ledger reads
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LedgerFilter {
    /// Restrict to one entry type
    pub entry_type: Option<EntryType>,
    /// Entries created at or after this instant
    pub from: Option<DateTime<Utc>>,
    /// Entries created strictly before this instant
    pub to: Option<DateTime<Utc>>,
    /// Page size (defaults to 100)
    pub limit: Option<u32>,
    /// Entries to skip
    pub offset: Option<u32>,
}

impl LedgerFilter {
    /// Default page size when the filter does not set one
    pub const DEFAULT_LIMIT: u32 = 100;

    fn matches(&self, entry: &LedgerEntry) -> bool {
        if let Some(entry_type) = self.entry_type {
            if entry.entry_type != entry_type {
                return false;
            }
        }
        if let Some(from) = self.from {
            if entry.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if entry.created_at >= to {
                return false;
            }
        }
        true
    }
}

/// Result of appending one entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The entry was written
    Recorded,
    /// An entry with this id already exists; the fact was written by an
    /// earlier attempt and nothing changed
    AlreadyRecorded,
}

/// Durable append-only store for ledger entries
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Appends one entry. An id the store already holds yields
    /// [`AppendOutcome::AlreadyRecorded`] and leaves the ledger unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::LedgerWriteRejected`] for a zero amount,
    /// [`EngineError::Storage`] on backend failure.
    async fn append(&self, entry: LedgerEntry) -> Result<AppendOutcome, EngineError>;

    /// Net balance for a reference: sum(CREDIT) - sum(DEBIT), in minor
    /// units. Negative when debits exceed credits.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] on backend failure.
    async fn balance_for(&self, reference_id: ReferenceId) -> Result<i64, EngineError>;

    /// All entries for a reference, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] on backend failure.
    async fn entries_for(&self, reference_id: ReferenceId) -> Result<Vec<LedgerEntry>, EngineError>;

    /// Filtered, paginated read across all references, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] on backend failure.
    async fn entries(&self, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>, EngineError>;
}

/// Rejects malformed entries before they reach any backend
pub(crate) fn validate(entry: &LedgerEntry) -> Result<(), EngineError> {
    if entry.amount.is_zero() {
        return Err(EngineError::LedgerWriteRejected {
            reason: "amount must be positive".to_string(),
        });
    }
    Ok(())
}

/// Signed minor-unit value of one entry
pub(crate) fn signed_amount(entry: &LedgerEntry) -> i64 {
    let amount = i64::try_from(entry.amount.minor()).unwrap_or(i64::MAX);
    match entry.entry_type {
        EntryType::Credit => amount,
        EntryType::Debit => -amount,
    }
}

/// In-memory ledger for tests and single-node default wiring
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<LedgerEntry>,
    ids: HashSet<LedgerEntryId>,
}

impl InMemoryLedgerStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn append(&self, entry: LedgerEntry) -> Result<AppendOutcome, EngineError> {
        validate(&entry)?;
        let mut inner = self.inner.write().await;
        if !inner.ids.insert(entry.id) {
            return Ok(AppendOutcome::AlreadyRecorded);
        }
        inner.entries.push(entry);
        Ok(AppendOutcome::Recorded)
    }

    async fn balance_for(&self, reference_id: ReferenceId) -> Result<i64, EngineError> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.reference_id == reference_id)
            .map(signed_amount)
            .sum())
    }

    async fn entries_for(&self, reference_id: ReferenceId) -> Result<Vec<LedgerEntry>, EngineError> {
        let inner = self.inner.read().await;
        let mut entries: Vec<LedgerEntry> = inner
            .entries
            .iter()
            .filter(|e| e.reference_id == reference_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }

    async fn entries(&self, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>, EngineError> {
        let inner = self.inner.read().await;
        let mut entries: Vec<LedgerEntry> = inner
            .entries
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.created_at);

        let offset = filter.offset.unwrap_or(0) as usize;
        let limit = filter.limit.unwrap_or(LedgerFilter::DEFAULT_LIMIT) as usize;
        Ok(entries.into_iter().skip(offset).take(limit).collect())
    }
}

//! Postgres-backed booking archive and ledger.
//!
//! Bookings are stored as a JSONB payload plus the columns the read paths
//! filter on. Ledger rows are plain columns; the table carries no UPDATE
//! or DELETE path in this codebase and the schema backs that with a
//! positive-amount check constraint.

use crate::ledger::{self, AppendOutcome, LedgerFilter, LedgerStore};
use crate::store::BookingRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use stayforge_core::{
    Booking, BookingId, EngineError, EntryType, LedgerEntry, LedgerEntryId, Money, ReferenceId,
    UnitId,
};
use uuid::Uuid;

fn storage_err(e: &sqlx::Error) -> EngineError {
    EngineError::Storage(e.to_string())
}

/// Connects a pool with sane defaults for the engine
///
/// # Errors
///
/// Returns [`EngineError::Storage`] when the connection fails.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, EngineError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| storage_err(&e))
}

// ============================================================================
// Bookings
// ============================================================================

/// Booking archive on Postgres
#[derive(Clone, Debug)]
pub struct PostgresBookingRepository {
    pool: PgPool,
}

impl PostgresBookingRepository {
    /// Creates a repository over an existing pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_booking(row: &sqlx::postgres::PgRow) -> Result<Booking, EngineError> {
        let payload: serde_json::Value = row
            .try_get("payload")
            .map_err(|e| storage_err(&e))?;
        serde_json::from_value(payload).map_err(|e| EngineError::Storage(e.to_string()))
    }
}

#[async_trait]
impl BookingRepository for PostgresBookingRepository {
    async fn save(&self, booking: &Booking) -> Result<(), EngineError> {
        let payload = serde_json::to_value(booking)
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        sqlx::query(
            r"
            INSERT INTO bookings (id, unit_id, status, start_at, end_at, cancelled_at, created_at, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                start_at = EXCLUDED.start_at,
                end_at = EXCLUDED.end_at,
                cancelled_at = EXCLUDED.cancelled_at,
                payload = EXCLUDED.payload
            ",
        )
        .bind(booking.id.as_uuid())
        .bind(booking.unit_id.as_uuid())
        .bind(booking.status.as_str())
        .bind(booking.interval.start())
        .bind(booking.interval.end())
        .bind(booking.cancelled_at)
        .bind(booking.created_at)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_err(&e))?;
        Ok(())
    }

    async fn get(&self, id: BookingId) -> Result<Option<Booking>, EngineError> {
        let row = sqlx::query(r"SELECT payload FROM bookings WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_err(&e))?;
        row.as_ref().map(Self::row_to_booking).transpose()
    }

    async fn for_unit(&self, unit_id: UnitId) -> Result<Vec<Booking>, EngineError> {
        let rows = sqlx::query(
            r"SELECT payload FROM bookings WHERE unit_id = $1 ORDER BY created_at DESC",
        )
        .bind(unit_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_err(&e))?;
        rows.iter().map(Self::row_to_booking).collect()
    }

    async fn checked_in(&self) -> Result<Vec<Booking>, EngineError> {
        let rows = sqlx::query(
            r"SELECT payload FROM bookings WHERE status = 'CHECKED_IN' ORDER BY start_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_err(&e))?;
        rows.iter().map(Self::row_to_booking).collect()
    }

    async fn cancelled_in(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>, EngineError> {
        let rows = sqlx::query(
            r"
            SELECT payload FROM bookings
            WHERE status = 'CANCELLED' AND cancelled_at >= $1 AND cancelled_at < $2
            ORDER BY cancelled_at ASC
            ",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_err(&e))?;
        rows.iter().map(Self::row_to_booking).collect()
    }
}

// ============================================================================
// Ledger
// ============================================================================

/// Append-only ledger on Postgres
#[derive(Clone, Debug)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    /// Creates a store over an existing pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_entry(row: &sqlx::postgres::PgRow) -> Result<LedgerEntry, EngineError> {
        let id: Uuid = row.try_get("id").map_err(|e| storage_err(&e))?;
        let entry_type: String = row.try_get("entry_type").map_err(|e| storage_err(&e))?;
        let amount: i64 = row.try_get("amount").map_err(|e| storage_err(&e))?;
        let currency: String = row.try_get("currency").map_err(|e| storage_err(&e))?;
        let reference_id: Uuid = row.try_get("reference_id").map_err(|e| storage_err(&e))?;
        let description: String = row.try_get("description").map_err(|e| storage_err(&e))?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(|e| storage_err(&e))?;
        let metadata: serde_json::Value = row.try_get("metadata").map_err(|e| storage_err(&e))?;

        let entry_type = match entry_type.as_str() {
            "CREDIT" => EntryType::Credit,
            "DEBIT" => EntryType::Debit,
            other => {
                return Err(EngineError::Storage(format!(
                    "invalid entry type in ledger row: {other}"
                )));
            }
        };
        let amount = u64::try_from(amount)
            .map_err(|_| EngineError::Storage("negative amount in ledger row".to_string()))?;
        let metadata = serde_json::from_value(metadata)
            .map_err(|e| EngineError::Storage(e.to_string()))?;

        Ok(LedgerEntry {
            id: LedgerEntryId::from_uuid(id),
            entry_type,
            amount: Money::from_minor(amount),
            currency,
            reference_id: ReferenceId::from_uuid(reference_id),
            description,
            created_at,
            metadata,
        })
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn append(&self, entry: LedgerEntry) -> Result<AppendOutcome, EngineError> {
        ledger::validate(&entry)?;
        let amount = i64::try_from(entry.amount.minor()).map_err(|_| {
            EngineError::LedgerWriteRejected {
                reason: "amount exceeds ledger range".to_string(),
            }
        })?;
        let metadata = serde_json::to_value(&entry.metadata)
            .map_err(|e| EngineError::Storage(e.to_string()))?;

        // DO NOTHING on an existing id: the row was written by an earlier
        // attempt and must stay untouched
        let result = sqlx::query(
            r"
            INSERT INTO ledger_entries (id, entry_type, amount, currency, reference_id, description, created_at, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            ",
        )
        .bind(entry.id.as_uuid())
        .bind(entry.entry_type.as_str())
        .bind(amount)
        .bind(&entry.currency)
        .bind(entry.reference_id.as_uuid())
        .bind(&entry.description)
        .bind(entry.created_at)
        .bind(metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_err(&e))?;

        if result.rows_affected() == 0 {
            Ok(AppendOutcome::AlreadyRecorded)
        } else {
            Ok(AppendOutcome::Recorded)
        }
    }

    async fn balance_for(&self, reference_id: ReferenceId) -> Result<i64, EngineError> {
        let (balance,): (i64,) = sqlx::query_as(
            r"
            SELECT COALESCE(SUM(CASE WHEN entry_type = 'CREDIT' THEN amount ELSE -amount END), 0)
            FROM ledger_entries
            WHERE reference_id = $1
            ",
        )
        .bind(reference_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage_err(&e))?;
        Ok(balance)
    }

    async fn entries_for(&self, reference_id: ReferenceId) -> Result<Vec<LedgerEntry>, EngineError> {
        let rows = sqlx::query(
            r"
            SELECT id, entry_type, amount, currency, reference_id, description, created_at, metadata
            FROM ledger_entries
            WHERE reference_id = $1
            ORDER BY created_at ASC
            ",
        )
        .bind(reference_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_err(&e))?;
        rows.iter().map(Self::row_to_entry).collect()
    }

    async fn entries(&self, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>, EngineError> {
        let limit = i64::from(filter.limit.unwrap_or(LedgerFilter::DEFAULT_LIMIT));
        let offset = i64::from(filter.offset.unwrap_or(0));
        let rows = sqlx::query(
            r"
            SELECT id, entry_type, amount, currency, reference_id, description, created_at, metadata
            FROM ledger_entries
            WHERE ($1::text IS NULL OR entry_type = $1)
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at < $3)
            ORDER BY created_at ASC
            LIMIT $4 OFFSET $5
            ",
        )
        .bind(filter.entry_type.map(|t| t.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_err(&e))?;
        rows.iter().map(Self::row_to_entry).collect()
    }
}

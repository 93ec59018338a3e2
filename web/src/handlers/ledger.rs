//! Ledger and reconciliation endpoints.
//!
//! The ledger surface is read-only over HTTP; entries are appended by
//! the engine alone. Reconciliation accepts the invoice snapshot in the
//! request because billing lives in an adjacent system.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stayforge_core::{EntryType, Interval, Invoice, LedgerEntry, ReferenceId};
use stayforge_engine::{LedgerFilter, ReconciliationReport};
use uuid::Uuid;

/// Query parameters for the paginated ledger read
#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    /// Restrict to CREDIT or DEBIT
    pub entry_type: Option<EntryType>,
    /// Entries created at or after this instant
    pub start: Option<DateTime<Utc>>,
    /// Entries created strictly before this instant
    pub end: Option<DateTime<Utc>>,
    /// Page size
    pub limit: Option<u32>,
    /// Entries to skip
    pub offset: Option<u32>,
}

/// Paginated, filtered ledger read
pub async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<Vec<LedgerEntry>>, ApiError> {
    let filter = LedgerFilter {
        entry_type: query.entry_type,
        from: query.start,
        to: query.end,
        limit: query.limit,
        offset: query.offset,
    };
    let entries = state.engine.ledger_entries(&filter).await?;
    Ok(Json(entries))
}

/// Net balance for a reference
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// The booking or invoice the balance belongs to
    pub reference_id: Uuid,
    /// sum(CREDIT) - sum(DEBIT) in minor units
    pub balance_minor: i64,
}

/// Balance for a booking or invoice reference
pub async fn balance_for(
    State(state): State<AppState>,
    Path(reference_id): Path<Uuid>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state
        .engine
        .balance_for(ReferenceId::from_uuid(reference_id))
        .await?;
    Ok(Json(BalanceResponse {
        reference_id,
        balance_minor: balance,
    }))
}

/// Request to reconcile a window
#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    /// Window start (inclusive)
    pub start: DateTime<Utc>,
    /// Window end (exclusive)
    pub end: DateTime<Utc>,
    /// Invoice snapshot from the billing system
    #[serde(default)]
    pub invoices: Vec<Invoice>,
}

/// Advisory reconciliation over a window
pub async fn reconcile(
    State(state): State<AppState>,
    Json(request): Json<ReconcileRequest>,
) -> Result<Json<ReconciliationReport>, ApiError> {
    let window = Interval::new(request.start, request.end)?;
    let report = state.engine.reconcile(window, &request.invoices).await?;
    Ok(Json(report))
}

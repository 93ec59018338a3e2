//! Imperative shell around the booking state machine.
//!
//! [`BookingEngine`] owns the per-unit critical sections. Every command
//! runs availability + pricing + persistence under one per-unit mutex, so
//! two concurrent requests against the same unit serialize and the second
//! one re-observes the first one's writes. Lock acquisition is bounded;
//! a request that cannot enter the critical section in time fails with
//! [`EngineError::LockTimeout`] instead of queueing indefinitely.
//!
//! Side-effect ordering on the money path: decide, append ledger entries,
//! apply, persist, publish state. A settlement whose ledger append fails
//! leaves the booking un-transitioned. Entry ids are derived from the
//! booking and the entry kind, so a command retried after a persistence
//! failure re-emits the same id and the store reports the entry as
//! already recorded instead of double-charging.

use crate::availability::{self, AvailabilityCheck, Granularity, OccupancySlot};
use crate::ledger::{AppendOutcome, LedgerFilter, LedgerStore};
use crate::lifecycle::{
    BookingCommand, BookingEvent, BookingReducer, LifecycleEnvironment, ScheduleState,
};
use crate::metrics::{
    BOOKINGS_TOTAL, LEDGER_ENTRIES_TOTAL, LOCK_TIMEOUTS_TOTAL, REVENUE_MINOR_UNITS_TOTAL,
};
use crate::reconcile::{self, ReconciliationReport};
use crate::store::BookingRepository;
use crate::walkin::{self, ActiveBookingView};
use metrics::counter;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use stayforge_core::{
    Booking, BookingId, EngineError, EntryType, GuestContact, Interval, Invoice, LedgerEntry,
    LedgerEntryId, ReferenceId, RentableUnit, UnitId,
};
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;

const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(5);

/// The booking engine service
pub struct BookingEngine {
    schedules: RwLock<HashMap<UnitId, Arc<Mutex<ScheduleState>>>>,
    units: RwLock<HashMap<UnitId, RentableUnit>>,
    repository: Arc<dyn BookingRepository>,
    ledger: Arc<dyn LedgerStore>,
    env: LifecycleEnvironment,
    reducer: BookingReducer,
    lock_wait: Duration,
}

impl BookingEngine {
    /// Creates an engine over the given stores
    #[must_use]
    pub fn new(
        repository: Arc<dyn BookingRepository>,
        ledger: Arc<dyn LedgerStore>,
        env: LifecycleEnvironment,
    ) -> Self {
        Self {
            schedules: RwLock::new(HashMap::new()),
            units: RwLock::new(HashMap::new()),
            repository,
            ledger,
            env,
            reducer: BookingReducer::new(),
            lock_wait: DEFAULT_LOCK_WAIT,
        }
    }

    /// Overrides the bounded per-unit lock wait
    #[must_use]
    pub const fn with_lock_wait(mut self, lock_wait: Duration) -> Self {
        self.lock_wait = lock_wait;
        self
    }

    /// Registers a unit or updates its catalog snapshot.
    ///
    /// Existing bookings on the unit are kept.
    pub async fn upsert_unit(&self, unit: RentableUnit) {
        let mut units = self.units.write().await;
        let mut schedules = self.schedules.write().await;
        units.insert(unit.id, unit.clone());
        if let Some(schedule) = schedules.get(&unit.id) {
            let mut state = schedule.lock().await;
            state.unit = unit;
        } else {
            schedules.insert(unit.id, Arc::new(Mutex::new(ScheduleState::new(unit))));
        }
    }

    /// Catalog snapshot for a unit
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnitNotFound`] for an unknown id.
    pub async fn unit(&self, unit_id: UnitId) -> Result<RentableUnit, EngineError> {
        let units = self.units.read().await;
        units
            .get(&unit_id)
            .cloned()
            .ok_or(EngineError::UnitNotFound(unit_id))
    }

    /// All registered units
    pub async fn units(&self) -> Vec<RentableUnit> {
        let units = self.units.read().await;
        let mut all: Vec<RentableUnit> = units.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Creates a booking request.
    ///
    /// # Errors
    ///
    /// Surfaces the full decision taxonomy: `UnitNotFound`,
    /// `InvalidInterval`, `BelowMinimumDuration`, `CapacityExceeded`,
    /// `SlotUnavailable`, `LockTimeout`, and storage errors.
    pub async fn create_booking(
        &self,
        unit_id: UnitId,
        interval: Interval,
        quantity: u32,
        guest: GuestContact,
    ) -> Result<Booking, EngineError> {
        let booking_id = BookingId::new();
        self.handle(
            unit_id,
            BookingCommand::Create {
                booking_id,
                interval,
                quantity,
                guest,
            },
        )
        .await?;
        self.require_booking(booking_id).await
    }

    /// Confirms a pending booking; idempotent on an already-confirmed one.
    ///
    /// # Errors
    ///
    /// Returns `BookingNotFound`, `SlotNoLongerAvailable` when the slot
    /// was lost to a race, or `InvalidStateTransition` from a terminal
    /// state.
    pub async fn confirm(&self, booking_id: BookingId) -> Result<Booking, EngineError> {
        let unit_id = self.unit_of(booking_id).await?;
        self.handle(unit_id, BookingCommand::Confirm { booking_id })
            .await?;
        self.require_booking(booking_id).await
    }

    /// Cancels a pending or confirmed booking, issuing any policy refund.
    ///
    /// # Errors
    ///
    /// Returns `BookingNotFound` or `InvalidStateTransition`.
    pub async fn cancel(
        &self,
        booking_id: BookingId,
        reason: String,
    ) -> Result<Booking, EngineError> {
        let unit_id = self.unit_of(booking_id).await?;
        self.handle(unit_id, BookingCommand::Cancel { booking_id, reason })
            .await?;
        self.require_booking(booking_id).await
    }

    /// Checks the guest in.
    ///
    /// # Errors
    ///
    /// Returns `BookingNotFound` or `InvalidStateTransition`.
    pub async fn check_in(&self, booking_id: BookingId) -> Result<Booking, EngineError> {
        let unit_id = self.unit_of(booking_id).await?;
        self.handle(unit_id, BookingCommand::CheckIn { booking_id })
            .await?;
        self.require_booking(booking_id).await
    }

    /// Checks the guest out and settles the stay.
    ///
    /// # Errors
    ///
    /// Returns `BookingNotFound`, `InvalidStateTransition`, or
    /// `LedgerWriteRejected` when the settlement entry is refused (the
    /// booking then stays checked in).
    pub async fn check_out(&self, booking_id: BookingId) -> Result<Booking, EngineError> {
        let unit_id = self.unit_of(booking_id).await?;
        self.handle(unit_id, BookingCommand::CheckOut { booking_id })
            .await?;
        self.require_booking(booking_id).await
    }

    /// Marks a confirmed booking as a no-show once the grace deadline has
    /// passed.
    ///
    /// # Errors
    ///
    /// Returns `BookingNotFound` or `InvalidStateTransition` (also used
    /// when the grace period is still running).
    pub async fn mark_no_show(&self, booking_id: BookingId) -> Result<Booking, EngineError> {
        let unit_id = self.unit_of(booking_id).await?;
        self.handle(unit_id, BookingCommand::MarkNoShow { booking_id })
            .await?;
        self.require_booking(booking_id).await
    }

    /// Walk-in: creates a session directly in `CHECKED_IN`.
    ///
    /// # Errors
    ///
    /// Returns `UnitNotFound`, `CapacityExceeded`, `InvalidInterval` for a
    /// zero-hour estimate, `SlotUnavailable`, or `LockTimeout`.
    pub async fn quick_check_in(
        &self,
        unit_id: UnitId,
        guest: GuestContact,
        guests: u32,
        estimated_duration_hours: u32,
        notes: Option<String>,
    ) -> Result<Booking, EngineError> {
        let booking_id = BookingId::new();
        self.handle(
            unit_id,
            BookingCommand::QuickCheckIn {
                booking_id,
                guest,
                guests,
                estimated_duration_hours,
                notes,
            },
        )
        .await?;
        self.require_booking(booking_id).await
    }

    /// Extends a walk-in session's planning estimate.
    ///
    /// # Errors
    ///
    /// Returns `BookingNotFound`, `InvalidExtension`, or
    /// `InvalidStateTransition` when the session is not checked in.
    pub async fn extend(
        &self,
        booking_id: BookingId,
        additional_hours: u32,
    ) -> Result<Booking, EngineError> {
        let unit_id = self.unit_of(booking_id).await?;
        self.handle(
            unit_id,
            BookingCommand::Extend {
                booking_id,
                additional_hours,
            },
        )
        .await?;
        self.require_booking(booking_id).await
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Availability check with alternative-interval suggestions.
    ///
    /// Reads the booking archive, not the per-unit critical section: the
    /// answer is advisory and may trail an in-flight command, and the
    /// reducer re-validates under the lock before admitting anything.
    ///
    /// # Errors
    ///
    /// Returns `UnitNotFound`, `CapacityExceeded` for a malformed
    /// quantity, or storage errors.
    pub async fn check_availability(
        &self,
        unit_id: UnitId,
        interval: Interval,
        quantity: u32,
    ) -> Result<AvailabilityCheck, EngineError> {
        let unit = self.unit(unit_id).await?;
        let bookings = self.repository.for_unit(unit_id).await?;
        availability::check_availability(&unit, &bookings, interval, quantity)
    }

    /// Occupancy aggregation for calendar rendering.
    ///
    /// Reads the booking archive; calendar rendering tolerates a slightly
    /// stale answer and must never block behind the write path.
    ///
    /// # Errors
    ///
    /// Returns `UnitNotFound` or storage errors.
    pub async fn occupancy(
        &self,
        unit_id: UnitId,
        interval: Interval,
        granularity: Granularity,
    ) -> Result<Vec<OccupancySlot>, EngineError> {
        self.unit(unit_id).await?;
        let bookings = self.repository.for_unit(unit_id).await?;
        Ok(availability::aggregate_occupancy(
            &bookings, interval, granularity,
        ))
    }

    /// Fetches one booking from the archive.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] on backend failure.
    pub async fn get_booking(&self, booking_id: BookingId) -> Result<Option<Booking>, EngineError> {
        self.repository.get(booking_id).await
    }

    /// All bookings on a unit, newest first.
    ///
    /// # Errors
    ///
    /// Returns `UnitNotFound` or storage errors.
    pub async fn bookings_for_unit(&self, unit_id: UnitId) -> Result<Vec<Booking>, EngineError> {
        self.unit(unit_id).await?;
        self.repository.for_unit(unit_id).await
    }

    /// Live view over every checked-in session, recomputed per read.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] on backend failure.
    pub async fn list_active(&self) -> Result<Vec<ActiveBookingView>, EngineError> {
        let now = self.env.clock.now();
        let checked_in = self.repository.checked_in().await?;
        let units = self.units.read().await;

        let mut views = Vec::with_capacity(checked_in.len());
        for booking in &checked_in {
            if let Some(unit) = units.get(&booking.unit_id) {
                if let Some(view) = walkin::active_view(unit, booking, &self.env.policies, now) {
                    views.push(view);
                }
            }
        }
        views.sort_by_key(|v| v.checked_in_at);
        Ok(views)
    }

    /// Filtered, paginated ledger read.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] on backend failure.
    pub async fn ledger_entries(
        &self,
        filter: &LedgerFilter,
    ) -> Result<Vec<LedgerEntry>, EngineError> {
        self.ledger.entries(filter).await
    }

    /// Net ledger balance for a booking or invoice reference.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] on backend failure.
    pub async fn balance_for(&self, reference_id: ReferenceId) -> Result<i64, EngineError> {
        self.ledger.balance_for(reference_id).await
    }

    /// Advisory reconciliation over a window.
    ///
    /// Invoices come from the caller (billing is an adjacent system);
    /// expected refunds come from the booking archive.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] on backend failure.
    pub async fn reconcile(
        &self,
        window: Interval,
        invoices: &[Invoice],
    ) -> Result<ReconciliationReport, EngineError> {
        let cancelled = self
            .repository
            .cancelled_in(window.start(), window.end())
            .await?;
        let entries = self
            .ledger
            .entries(&LedgerFilter {
                entry_type: None,
                from: Some(window.start()),
                to: Some(window.end()),
                limit: Some(u32::MAX),
                offset: None,
            })
            .await?;
        let expected = reconcile::expectations(window, invoices, &cancelled);
        let report = reconcile::reconcile(window, &expected, &entries);
        if !report.is_clean() {
            tracing::warn!(
                discrepancies = report.discrepancies.len(),
                window_start = %report.window_start,
                window_end = %report.window_end,
                "reconciliation found discrepancies"
            );
        }
        Ok(report)
    }

    // ========================================================================
    // Core command path
    // ========================================================================

    /// Runs one command through the per-unit critical section.
    ///
    /// # Errors
    ///
    /// Any decision error, `LockTimeout`, ledger rejection, or storage
    /// failure.
    pub async fn handle(
        &self,
        unit_id: UnitId,
        command: BookingCommand,
    ) -> Result<Vec<BookingEvent>, EngineError> {
        let schedule = self.schedule(unit_id).await?;
        let mut state = self.acquire(unit_id, &schedule).await?;

        let events = self.reducer.decide(&state, command, &self.env)?;

        // Money first: a rejected append aborts before any state change.
        // An already-recorded id means a prior attempt got this far before
        // persistence failed; the retry continues without re-charging.
        for entry in self.ledger_entries_for(&state, &events) {
            let entry_id = entry.id;
            let entry_type = entry.entry_type;
            let amount = entry.amount.minor();
            match self.ledger.append(entry).await? {
                AppendOutcome::Recorded => {
                    counter!(LEDGER_ENTRIES_TOTAL, "entry_type" => entry_type.as_str())
                        .increment(1);
                    if entry_type == EntryType::Credit {
                        counter!(REVENUE_MINOR_UNITS_TOTAL).increment(amount);
                    }
                }
                AppendOutcome::AlreadyRecorded => {
                    tracing::info!(
                        entry_id = %entry_id,
                        unit_id = %unit_id,
                        "ledger entry recorded by an earlier attempt"
                    );
                }
            }
        }

        let mut next = state.clone();
        for event in &events {
            self.reducer.apply(&mut next, event);
        }
        for event in &events {
            let booking_id = Self::event_booking_id(event);
            if let Some(booking) = next.get(&booking_id) {
                self.repository.save(booking).await?;
                counter!(BOOKINGS_TOTAL, "status" => booking.status.as_str()).increment(1);
                tracing::info!(
                    booking_id = %booking_id,
                    unit_id = %unit_id,
                    status = booking.status.as_str(),
                    "booking transition"
                );
            }
        }
        *state = next;

        Ok(events.into_vec())
    }

    async fn schedule(&self, unit_id: UnitId) -> Result<Arc<Mutex<ScheduleState>>, EngineError> {
        let schedules = self.schedules.read().await;
        schedules
            .get(&unit_id)
            .cloned()
            .ok_or(EngineError::UnitNotFound(unit_id))
    }

    async fn acquire<'a>(
        &self,
        unit_id: UnitId,
        schedule: &'a Mutex<ScheduleState>,
    ) -> Result<tokio::sync::MutexGuard<'a, ScheduleState>, EngineError> {
        match timeout(self.lock_wait, schedule.lock()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                counter!(LOCK_TIMEOUTS_TOTAL).increment(1);
                tracing::warn!(unit_id = %unit_id, "per-unit lock wait exceeded");
                Err(EngineError::LockTimeout { unit_id })
            }
        }
    }

    async fn unit_of(&self, booking_id: BookingId) -> Result<UnitId, EngineError> {
        let booking = self
            .repository
            .get(booking_id)
            .await?
            .ok_or(EngineError::BookingNotFound(booking_id))?;
        Ok(booking.unit_id)
    }

    async fn require_booking(&self, booking_id: BookingId) -> Result<Booking, EngineError> {
        self.repository
            .get(booking_id)
            .await?
            .ok_or(EngineError::BookingNotFound(booking_id))
    }

    /// Ledger entries implied by a batch of decided events.
    ///
    /// `state` is the pre-apply schedule, so a `Confirmed` event still
    /// sees the pending booking's quote. Deposits are captured only when
    /// the policy marks them due at confirmation; otherwise they remain a
    /// quoted amount with no financial record.
    ///
    /// Each entry's id is derived from the booking and the entry kind.
    /// A booking reaches each money-moving transition at most once, so
    /// the same fact always maps to the same id across retries.
    fn ledger_entries_for(&self, state: &ScheduleState, events: &[BookingEvent]) -> Vec<LedgerEntry> {
        let currency = state.unit.currency.clone();
        let deposit_due_now = self.env.policies.deposit.due_now;
        let mut entries = Vec::new();

        for event in events {
            match event {
                BookingEvent::Created { booking } => {
                    // Instant-booking units capture the deposit at creation
                    if deposit_due_now
                        && booking.status == stayforge_core::BookingStatus::Confirmed
                        && !booking.is_walk_in
                        && !booking.quote.deposit.is_zero()
                    {
                        entries.push(Self::deposit_entry(booking, &currency, booking.created_at));
                    }
                }
                BookingEvent::Confirmed { booking_id, at } => {
                    if let Some(booking) = state.get(booking_id) {
                        if deposit_due_now
                            && !booking.is_walk_in
                            && !booking.quote.deposit.is_zero()
                        {
                            entries.push(Self::deposit_entry(booking, &currency, *at));
                        }
                    }
                }
                BookingEvent::Cancelled {
                    booking_id,
                    refund: Some(refund),
                    at,
                    ..
                } => {
                    let reference = ReferenceId::from(*booking_id);
                    let mut entry = LedgerEntry::new(
                        EntryType::Debit,
                        *refund,
                        currency.clone(),
                        reference,
                        "cancellation refund".to_string(),
                        *at,
                    );
                    entry.id = LedgerEntryId::derived(reference, "refund");
                    entry
                        .metadata
                        .insert("kind".to_string(), "refund".to_string());
                    entries.push(entry);
                }
                BookingEvent::CheckedOut {
                    booking_id,
                    at,
                    settled,
                    ..
                } => {
                    if !settled.total.is_zero() {
                        let reference = ReferenceId::from(*booking_id);
                        let mut entry = LedgerEntry::new(
                            EntryType::Credit,
                            settled.total,
                            currency.clone(),
                            reference,
                            "stay settlement".to_string(),
                            *at,
                        );
                        entry.id = LedgerEntryId::derived(reference, "settlement");
                        entry
                            .metadata
                            .insert("kind".to_string(), "settlement".to_string());
                        entries.push(entry);
                    }
                }
                _ => {}
            }
        }
        entries
    }

    fn deposit_entry(
        booking: &Booking,
        currency: &str,
        at: chrono::DateTime<chrono::Utc>,
    ) -> LedgerEntry {
        let reference = ReferenceId::from(booking.id);
        let mut entry = LedgerEntry::new(
            EntryType::Credit,
            booking.quote.deposit,
            currency.to_string(),
            reference,
            "deposit captured".to_string(),
            at,
        );
        entry.id = LedgerEntryId::derived(reference, "deposit");
        entry
            .metadata
            .insert("kind".to_string(), "deposit".to_string());
        entry
    }

    fn event_booking_id(event: &BookingEvent) -> BookingId {
        match event {
            BookingEvent::Created { booking } => booking.id,
            BookingEvent::Confirmed { booking_id, .. }
            | BookingEvent::Cancelled { booking_id, .. }
            | BookingEvent::CheckedIn { booking_id, .. }
            | BookingEvent::CheckedOut { booking_id, .. }
            | BookingEvent::NoShowMarked { booking_id, .. }
            | BookingEvent::Extended { booking_id, .. } => *booking_id,
        }
    }
}

//! Durable booking archive.
//!
//! The archive is a write-through copy of the in-memory schedules: the
//! service persists every booking it mutates, and read paths that do not
//! need admission-control freshness (lookups, dashboards, reconciliation)
//! go through here instead of the per-unit critical section.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use stayforge_core::{Booking, BookingId, BookingStatus, EngineError, UnitId};
use tokio::sync::RwLock;

/// Storage for booking records
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Inserts or replaces a booking by id.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] on backend failure.
    async fn save(&self, booking: &Booking) -> Result<(), EngineError>;

    /// Fetches one booking.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] on backend failure.
    async fn get(&self, id: BookingId) -> Result<Option<Booking>, EngineError>;

    /// All bookings on a unit, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] on backend failure.
    async fn for_unit(&self, unit_id: UnitId) -> Result<Vec<Booking>, EngineError>;

    /// All bookings currently in `CHECKED_IN`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] on backend failure.
    async fn checked_in(&self) -> Result<Vec<Booking>, EngineError>;

    /// Bookings cancelled inside `[from, to)`, for reconciliation.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] on backend failure.
    async fn cancelled_in(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>, EngineError>;
}

/// In-memory archive for tests and single-node default wiring
#[derive(Debug, Default)]
pub struct InMemoryBookingRepository {
    bookings: RwLock<HashMap<BookingId, Booking>>,
}

impl InMemoryBookingRepository {
    /// Creates an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn save(&self, booking: &Booking) -> Result<(), EngineError> {
        let mut bookings = self.bookings.write().await;
        bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get(&self, id: BookingId) -> Result<Option<Booking>, EngineError> {
        let bookings = self.bookings.read().await;
        Ok(bookings.get(&id).cloned())
    }

    async fn for_unit(&self, unit_id: UnitId) -> Result<Vec<Booking>, EngineError> {
        let bookings = self.bookings.read().await;
        let mut found: Vec<Booking> = bookings
            .values()
            .filter(|b| b.unit_id == unit_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn checked_in(&self) -> Result<Vec<Booking>, EngineError> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .filter(|b| b.status == BookingStatus::CheckedIn)
            .cloned()
            .collect())
    }

    async fn cancelled_in(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>, EngineError> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .filter(|b| {
                b.status == BookingStatus::Cancelled
                    && b.cancelled_at.is_some_and(|at| at >= from && at < to)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use stayforge_core::Interval;
    use stayforge_testing::fixtures;

    fn iv(day: u32) -> Interval {
        let start = Utc.with_ymd_and_hms(2025, 6, day, 10, 0, 0).unwrap();
        Interval::new(start, start + Duration::hours(2)).unwrap()
    }

    #[tokio::test]
    async fn save_is_upsert() {
        let repo = InMemoryBookingRepository::new();
        let unit = fixtures::hour_unit();
        let mut booking = fixtures::booking(&unit, iv(1));
        repo.save(&booking).await.unwrap();

        booking.status = BookingStatus::Confirmed;
        repo.save(&booking).await.unwrap();

        let stored = repo.get(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
        assert_eq!(repo.for_unit(unit.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_in_filters_by_window() {
        let repo = InMemoryBookingRepository::new();
        let unit = fixtures::hour_unit();

        let mut inside = fixtures::booking(&unit, iv(1));
        inside.status = BookingStatus::Cancelled;
        inside.cancelled_at = Some(Utc.with_ymd_and_hms(2025, 6, 5, 0, 0, 0).unwrap());
        repo.save(&inside).await.unwrap();

        let mut outside = fixtures::booking(&unit, iv(2));
        outside.status = BookingStatus::Cancelled;
        outside.cancelled_at = Some(Utc.with_ymd_and_hms(2025, 7, 5, 0, 0, 0).unwrap());
        repo.save(&outside).await.unwrap();

        let from = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap();
        let cancelled = repo.cancelled_in(from, to).await.unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].id, inside.id);
    }
}

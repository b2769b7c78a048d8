//! In-process store implementing every repository trait.
//!
//! Backs the unit and router test suites. Seat accounting is serialized
//! per train with an owned `tokio::sync::Mutex` guard, the in-memory counterpart of the
//! `FOR UPDATE` row lock used by [`crate::PgStore`].

use async_trait::async_trait;
use chrono::Utc;
use rail_core::models::{
    Booking, BookingDetails, BookingId, NewUser, Train, TrainId, TrainPatch, TrainSpec, User,
    UserId,
};
use rail_core::pii::Masked;
use rail_core::repository::{
    BookingRepository, SeatLedger, TrainLock, TrainRepository, UserRepository,
};
use rail_core::{CoreError, CoreResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OwnedMutexGuard;

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    trains: BTreeMap<TrainId, Train>,
    bookings: BTreeMap<BookingId, Booking>,
    user_seq: i64,
    train_seq: i64,
    booking_seq: i64,
}

impl Tables {
    fn booked_seats(&self, train_id: TrainId) -> i64 {
        self.bookings
            .values()
            .filter(|b| b.train_id == train_id)
            .map(|b| i64::from(b.seats_booked))
            .sum()
    }
}

#[derive(Default)]
struct Inner {
    tables: Mutex<Tables>,
    train_locks: Mutex<HashMap<TrainId, Arc<tokio::sync::Mutex<()>>>>,
}

impl Inner {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn locks(&self) -> MutexGuard<'_, HashMap<TrainId, Arc<tokio::sync::Mutex<()>>>> {
        self.train_locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn acquire(&self, id: TrainId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks();
            locks.entry(id).or_default().clone()
        };
        lock.lock_owned().await
    }

    fn forget_lock(&self, id: TrainId) {
        self.locks().remove(&id);
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_username(&self, username: &str) -> CoreResult<Option<User>> {
        let tables = self.inner.tables();
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> CoreResult<User> {
        let mut tables = self.inner.tables();
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(CoreError::DuplicateUser);
        }

        tables.user_seq += 1;
        let user = User {
            id: tables.user_seq,
            username: user.username,
            password_hash: Masked(user.password_hash),
            role: user.role,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn list_users(&self) -> CoreResult<Vec<User>> {
        Ok(self.inner.tables().users.values().cloned().collect())
    }

    async fn purge_users(&self) -> CoreResult<()> {
        let mut tables = self.inner.tables();
        tables.users.clear();
        tables.bookings.clear();
        Ok(())
    }
}

#[async_trait]
impl TrainRepository for MemoryStore {
    async fn insert_train(&self, train: TrainSpec) -> CoreResult<Train> {
        let mut tables = self.inner.tables();
        tables.train_seq += 1;
        let train = Train {
            id: tables.train_seq,
            train_name: train.train_name,
            source_station: train.source_station,
            destination_station: train.destination_station,
            total_seats: train.total_seats,
        };
        tables.trains.insert(train.id, train.clone());
        Ok(train)
    }

    async fn get_train(&self, id: TrainId) -> CoreResult<Option<Train>> {
        Ok(self.inner.tables().trains.get(&id).cloned())
    }

    async fn find_trains(&self, source: &str, destination: &str) -> CoreResult<Vec<Train>> {
        let tables = self.inner.tables();
        Ok(tables
            .trains
            .values()
            .filter(|t| t.source_station == source && t.destination_station == destination)
            .cloned()
            .collect())
    }

    async fn delete_train(&self, id: TrainId) -> CoreResult<bool> {
        if !self.inner.tables().trains.contains_key(&id) {
            return Ok(false);
        }
        // Wait out any booking in flight on this train
        let _guard = self.inner.acquire(id).await;

        let removed = {
            let mut tables = self.inner.tables();
            let removed = tables.trains.remove(&id).is_some();
            tables.bookings.retain(|_, b| b.train_id != id);
            removed
        };

        // Ids are never reused; lockers still queued on the old mutex find the train gone
        self.inner.forget_lock(id);
        Ok(removed)
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn booked_seats(&self, train_id: TrainId) -> CoreResult<i64> {
        Ok(self.inner.tables().booked_seats(train_id))
    }

    async fn booking_details(&self, id: BookingId) -> CoreResult<Option<BookingDetails>> {
        let tables = self.inner.tables();
        let Some(booking) = tables.bookings.get(&id) else {
            return Ok(None);
        };
        let (Some(user), Some(train)) = (
            tables.users.get(&booking.user_id),
            tables.trains.get(&booking.train_id),
        ) else {
            return Ok(None);
        };

        Ok(Some(BookingDetails {
            id: booking.id,
            user_id: user.id,
            username: user.username.clone(),
            train_id: train.id,
            train_name: train.train_name.clone(),
            source_station: train.source_station.clone(),
            destination_station: train.destination_station.clone(),
            seats_booked: booking.seats_booked,
            booking_time: booking.booking_time,
        }))
    }
}

#[async_trait]
impl SeatLedger for MemoryStore {
    async fn lock_train(&self, id: TrainId) -> CoreResult<Option<Box<dyn TrainLock>>> {
        // Absent trains never get a lock entry
        if !self.inner.tables().trains.contains_key(&id) {
            return Ok(None);
        }
        let guard = self.inner.acquire(id).await;

        // Checked after acquiring, a delete may have won the race
        let Some(train) = self.inner.tables().trains.get(&id).cloned() else {
            self.inner.forget_lock(id);
            return Ok(None);
        };

        Ok(Some(Box::new(MemoryTrainLock {
            _guard: guard,
            inner: self.inner.clone(),
            train,
            staged_bookings: Vec::new(),
            train_changed: false,
        }) as Box<dyn TrainLock>))
    }
}

struct MemoryTrainLock {
    _guard: OwnedMutexGuard<()>,
    inner: Arc<Inner>,
    train: Train,
    staged_bookings: Vec<Booking>,
    train_changed: bool,
}

#[async_trait]
impl TrainLock for MemoryTrainLock {
    fn train(&self) -> &Train {
        &self.train
    }

    async fn booked_seats(&mut self) -> CoreResult<i64> {
        // Suspension point, like a database round-trip
        tokio::task::yield_now().await;
        let staged: i64 = self.staged_bookings.iter().map(|b| i64::from(b.seats_booked)).sum();
        Ok(self.inner.tables().booked_seats(self.train.id) + staged)
    }

    async fn insert_booking(&mut self, user_id: UserId, seats: i32) -> CoreResult<Booking> {
        let mut tables = self.inner.tables();
        if !tables.users.contains_key(&user_id) {
            return Err(CoreError::not_found("User not found"));
        }

        tables.booking_seq += 1;
        let booking = Booking {
            id: tables.booking_seq,
            user_id,
            train_id: self.train.id,
            seats_booked: seats,
            booking_time: Utc::now(),
        };
        drop(tables);

        self.staged_bookings.push(booking.clone());
        Ok(booking)
    }

    async fn update_train(&mut self, patch: &TrainPatch) -> CoreResult<Train> {
        patch.apply(&mut self.train);
        self.train_changed = true;
        Ok(self.train.clone())
    }

    async fn commit(self: Box<Self>) -> CoreResult<()> {
        let this = *self;
        let mut tables = this.inner.tables();

        // Users can be purged without taking train locks
        if this.staged_bookings.iter().any(|b| !tables.users.contains_key(&b.user_id)) {
            return Err(CoreError::not_found("User not found"));
        }
        if this.train_changed {
            tables.trains.insert(this.train.id, this.train.clone());
        }
        for booking in this.staged_bookings {
            tables.bookings.insert(booking.id, booking);
        }
        Ok(())
    }
}

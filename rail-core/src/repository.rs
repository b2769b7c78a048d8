use async_trait::async_trait;

use crate::models::{
    Booking, BookingDetails, BookingId, NewUser, Train, TrainId, TrainPatch, TrainSpec, User,
    UserId,
};
use crate::CoreResult;

/// Credential store.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> CoreResult<Option<User>>;

    /// Fails with `DuplicateUser` when the username is taken.
    async fn insert_user(&self, user: NewUser) -> CoreResult<User>;

    async fn list_users(&self) -> CoreResult<Vec<User>>;

    /// Removes every user; their bookings go with them.
    async fn purge_users(&self) -> CoreResult<()>;
}

/// Inventory store.
#[async_trait]
pub trait TrainRepository: Send + Sync {
    async fn insert_train(&self, train: TrainSpec) -> CoreResult<Train>;

    async fn get_train(&self, id: TrainId) -> CoreResult<Option<Train>>;

    async fn find_trains(&self, source: &str, destination: &str) -> CoreResult<Vec<Train>>;

    /// Returns `false` when no train had that id.
    async fn delete_train(&self, id: TrainId) -> CoreResult<bool>;
}

/// Read side of the booking ledger.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Sum of `seats_booked` for the train; zero when it has no bookings.
    async fn booked_seats(&self, train_id: TrainId) -> CoreResult<i64>;

    async fn booking_details(&self, id: BookingId) -> CoreResult<Option<BookingDetails>>;
}

/// Write side of the booking ledger. Every change to a train's seat accounting goes
/// through a [`TrainLock`], which serializes work per train id.
#[async_trait]
pub trait SeatLedger: Send + Sync {
    /// Acquires exclusive access to one train, waiting for any holder to finish.
    /// `None` when the train does not exist.
    async fn lock_train(&self, id: TrainId) -> CoreResult<Option<Box<dyn TrainLock>>>;
}

/// Unit of work scoped to a single train. Dropping it without `commit` discards
/// every staged write and releases the lock.
#[async_trait]
pub trait TrainLock: Send {
    fn train(&self) -> &Train;

    async fn booked_seats(&mut self) -> CoreResult<i64>;

    async fn insert_booking(&mut self, user_id: UserId, seats: i32) -> CoreResult<Booking>;

    async fn update_train(&mut self, patch: &TrainPatch) -> CoreResult<Train>;

    async fn commit(self: Box<Self>) -> CoreResult<()>;
}

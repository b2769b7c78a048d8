use std::sync::Arc;

use crate::models::TrainId;
use crate::repository::{BookingRepository, TrainRepository};
use crate::{CoreError, CoreResult};

/// Seats still bookable given a capacity and the seats already committed.
/// Negative only if the ledger was over-committed before this check ran.
pub fn remaining_seats(total_seats: i32, booked: i64) -> i64 {
    i64::from(total_seats) - booked
}

/// Derives remaining capacity from the inventory and the booking ledger.
#[derive(Clone)]
pub struct AvailabilityCalculator {
    trains: Arc<dyn TrainRepository>,
    bookings: Arc<dyn BookingRepository>,
}

impl AvailabilityCalculator {
    pub fn new(trains: Arc<dyn TrainRepository>, bookings: Arc<dyn BookingRepository>) -> Self {
        Self { trains, bookings }
    }

    pub async fn available(&self, train_id: TrainId) -> CoreResult<i64> {
        let train = self
            .trains
            .get_train(train_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Train not found"))?;

        let booked = self.bookings.booked_seats(train_id).await?;

        Ok(remaining_seats(train.total_seats, booked))
    }
}

use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::availability::remaining_seats;
use crate::models::{Booking, TrainId, UserId};
use crate::repository::SeatLedger;
use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingRequest {
    pub user_id: Option<UserId>,
    pub train_id: Option<TrainId>,
    pub seats_booked: Option<i32>,
}

impl BookingRequest {
    fn validate(&self) -> CoreResult<(UserId, TrainId, i32)> {
        match (self.user_id, self.train_id, self.seats_booked) {
            (Some(user_id), Some(train_id), Some(seats)) => {
                if seats <= 0 {
                    return Err(CoreError::validation("seats_booked must be a positive integer"));
                }
                Ok((user_id, train_id, seats))
            }
            _ => Err(CoreError::validation(
                "User ID, Train ID, and Seats Booked are required",
            )),
        }
    }
}

/// Commits bookings so that no train is ever sold beyond its capacity.
///
/// The capacity check and the insert happen inside one [`crate::repository::TrainLock`],
/// so two requests for the same train cannot both pass the check on a stale total.
#[derive(Clone)]
pub struct BookingCoordinator {
    ledger: Arc<dyn SeatLedger>,
}

impl BookingCoordinator {
    pub fn new(ledger: Arc<dyn SeatLedger>) -> Self {
        Self { ledger }
    }

    pub async fn book(&self, request: &BookingRequest) -> CoreResult<Booking> {
        let (user_id, train_id, seats) = request.validate()?;

        let mut lock = self
            .ledger
            .lock_train(train_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Train not found"))?;

        let booked = lock.booked_seats().await?;
        let available = remaining_seats(lock.train().total_seats, booked);

        if i64::from(seats) > available {
            return Err(CoreError::InsufficientCapacity {
                requested: seats,
                available: available.max(0),
            });
        }

        let booking = lock.insert_booking(user_id, seats).await?;
        lock.commit().await?;

        info!(
            booking_id = booking.id,
            train_id, user_id, seats, "Booking committed"
        );
        Ok(booking)
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rail_core::models::{Booking, BookingDetails, BookingId, Train, TrainId, TrainPatch, UserId};
use rail_core::repository::{BookingRepository, SeatLedger, TrainLock};
use rail_core::{CoreError, CoreResult};
use sqlx::{Postgres, Transaction};

use crate::database::{is_foreign_key_violation, store_error, PgStore};
use crate::train_repo::TrainRow;

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: i64,
    user_id: i64,
    train_id: i64,
    seats_booked: i32,
    booking_time: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: row.id,
            user_id: row.user_id,
            train_id: row.train_id,
            seats_booked: row.seats_booked,
            booking_time: row.booking_time,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BookingDetailsRow {
    id: i64,
    user_id: i64,
    username: String,
    train_id: i64,
    train_name: String,
    source_station: String,
    destination_station: String,
    seats_booked: i32,
    booking_time: DateTime<Utc>,
}

impl From<BookingDetailsRow> for BookingDetails {
    fn from(row: BookingDetailsRow) -> Self {
        BookingDetails {
            id: row.id,
            user_id: row.user_id,
            username: row.username,
            train_id: row.train_id,
            train_name: row.train_name,
            source_station: row.source_station,
            destination_station: row.destination_station,
            seats_booked: row.seats_booked,
            booking_time: row.booking_time,
        }
    }
}

const BOOKED_SEATS_SQL: &str =
    "SELECT COALESCE(SUM(seats_booked), 0)::BIGINT FROM bookings WHERE train_id = $1";

#[async_trait]
impl BookingRepository for PgStore {
    async fn booked_seats(&self, train_id: TrainId) -> CoreResult<i64> {
        sqlx::query_scalar::<_, i64>(BOOKED_SEATS_SQL)
            .bind(train_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_error("Failed to sum booked seats", e))
    }

    async fn booking_details(&self, id: BookingId) -> CoreResult<Option<BookingDetails>> {
        let row = sqlx::query_as::<_, BookingDetailsRow>(
            r#"
            SELECT b.id, b.user_id, u.username, b.train_id, t.train_name,
                   t.source_station, t.destination_station, b.seats_booked, b.booking_time
            FROM bookings b
            JOIN users u ON b.user_id = u.id
            JOIN train t ON b.train_id = t.id
            WHERE b.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to fetch booking", e))?;

        Ok(row.map(BookingDetails::from))
    }
}

#[async_trait]
impl SeatLedger for PgStore {
    /// Opens a transaction and takes the train's row lock with `SELECT ... FOR UPDATE`.
    /// Concurrent lockers of the same train block here until the holder commits or rolls back.
    async fn lock_train(&self, id: TrainId) -> CoreResult<Option<Box<dyn TrainLock>>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error("Failed to begin transaction", e))?;

        let row = sqlx::query_as::<_, TrainRow>(
            r#"
            SELECT id, train_name, source_station, destination_station, total_seats
            FROM train
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| store_error("Failed to lock train", e))?;

        Ok(row.map(|row| {
            Box::new(PgTrainLock {
                tx,
                train: row.into(),
            }) as Box<dyn TrainLock>
        }))
    }
}

/// Row-locked transaction on one train. Dropping it rolls back.
pub struct PgTrainLock {
    tx: Transaction<'static, Postgres>,
    train: Train,
}

#[async_trait]
impl TrainLock for PgTrainLock {
    fn train(&self) -> &Train {
        &self.train
    }

    async fn booked_seats(&mut self) -> CoreResult<i64> {
        sqlx::query_scalar::<_, i64>(BOOKED_SEATS_SQL)
            .bind(self.train.id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| store_error("Failed to sum booked seats", e))
    }

    async fn insert_booking(&mut self, user_id: UserId, seats: i32) -> CoreResult<Booking> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            INSERT INTO bookings (user_id, train_id, seats_booked)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, train_id, seats_booked, booking_time
            "#,
        )
        .bind(user_id)
        .bind(self.train.id)
        .bind(seats)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                CoreError::not_found("User not found")
            } else {
                store_error("Failed to insert booking", e)
            }
        })?;

        Ok(row.into())
    }

    async fn update_train(&mut self, patch: &TrainPatch) -> CoreResult<Train> {
        let row = sqlx::query_as::<_, TrainRow>(
            r#"
            UPDATE train SET
                train_name = COALESCE($1, train_name),
                source_station = COALESCE($2, source_station),
                destination_station = COALESCE($3, destination_station),
                total_seats = COALESCE($4, total_seats)
            WHERE id = $5
            RETURNING id, train_name, source_station, destination_station, total_seats
            "#,
        )
        .bind(patch.train_name.as_deref())
        .bind(patch.source_station.as_deref())
        .bind(patch.destination_station.as_deref())
        .bind(patch.total_seats)
        .bind(self.train.id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| store_error("Failed to update train", e))?;

        self.train = row.into();
        Ok(self.train.clone())
    }

    async fn commit(self: Box<Self>) -> CoreResult<()> {
        let this = *self;
        this.tx
            .commit()
            .await
            .map_err(|e| store_error("Failed to commit transaction", e))
    }
}

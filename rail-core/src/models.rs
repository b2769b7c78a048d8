use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Role;
use crate::pii::Masked;
use crate::{CoreError, CoreResult};

pub type UserId = i64;
pub type TrainId = i64;
pub type BookingId = i64;

/// Widest username or station/train name the store's `VARCHAR(50)` columns accept.
pub const MAX_NAME_LEN: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: Masked<String>,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Train {
    pub id: TrainId,
    pub train_name: String,
    pub source_station: String,
    pub destination_station: String,
    pub total_seats: i32,
}

/// A train as submitted by an administrator, before an id exists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTrain {
    pub train_name: Option<String>,
    pub source_station: Option<String>,
    pub destination_station: Option<String>,
    pub total_seats: Option<i32>,
}

/// Validated form of [`NewTrain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainSpec {
    pub train_name: String,
    pub source_station: String,
    pub destination_station: String,
    pub total_seats: i32,
}

impl NewTrain {
    pub fn validate(self) -> CoreResult<TrainSpec> {
        let missing = || CoreError::validation("All fields are required");

        let train_name = non_blank(self.train_name).ok_or_else(missing)?;
        let source_station = non_blank(self.source_station).ok_or_else(missing)?;
        let destination_station = non_blank(self.destination_station).ok_or_else(missing)?;
        let total_seats = self.total_seats.ok_or_else(missing)?;
        check_length("train_name", &train_name)?;
        check_length("source_station", &source_station)?;
        check_length("destination_station", &destination_station)?;
        check_capacity(total_seats)?;

        Ok(TrainSpec {
            train_name,
            source_station,
            destination_station,
            total_seats,
        })
    }
}

/// Partial update of a train; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TrainPatch {
    pub train_name: Option<String>,
    pub source_station: Option<String>,
    pub destination_station: Option<String>,
    pub total_seats: Option<i32>,
}

impl TrainPatch {
    pub fn is_empty(&self) -> bool {
        self.train_name.is_none()
            && self.source_station.is_none()
            && self.destination_station.is_none()
            && self.total_seats.is_none()
    }

    pub fn validate(self) -> CoreResult<TrainPatch> {
        if self.is_empty() {
            return Err(CoreError::validation("At least one field is required to update"));
        }

        let patch = TrainPatch {
            train_name: check_text("train_name", self.train_name)?,
            source_station: check_text("source_station", self.source_station)?,
            destination_station: check_text("destination_station", self.destination_station)?,
            total_seats: self.total_seats,
        };
        if let Some(seats) = patch.total_seats {
            check_capacity(seats)?;
        }
        Ok(patch)
    }

    pub fn apply(&self, train: &mut Train) {
        if let Some(name) = &self.train_name {
            train.train_name = name.clone();
        }
        if let Some(source) = &self.source_station {
            train.source_station = source.clone();
        }
        if let Some(destination) = &self.destination_station {
            train.destination_station = destination.clone();
        }
        if let Some(seats) = self.total_seats {
            train.total_seats = seats;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub train_id: TrainId,
    pub seats_booked: i32,
    pub booking_time: DateTime<Utc>,
}

/// Booking joined with the names of its user and train.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDetails {
    pub id: BookingId,
    pub user_id: UserId,
    pub username: String,
    pub train_id: TrainId,
    pub train_name: String,
    pub source_station: String,
    pub destination_station: String,
    pub seats_booked: i32,
    pub booking_time: DateTime<Utc>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_text(field: &str, value: Option<String>) -> CoreResult<Option<String>> {
    match value {
        None => Ok(None),
        Some(v) => match non_blank(Some(v)) {
            Some(v) => {
                check_length(field, &v)?;
                Ok(Some(v))
            }
            None => Err(CoreError::validation(format!("{} must not be empty", field))),
        },
    }
}

pub(crate) fn check_length(field: &str, value: &str) -> CoreResult<()> {
    if value.chars().count() > MAX_NAME_LEN {
        return Err(CoreError::validation(format!(
            "{} must be at most {} characters",
            field, MAX_NAME_LEN
        )));
    }
    Ok(())
}

fn check_capacity(total_seats: i32) -> CoreResult<()> {
    if total_seats <= 0 {
        return Err(CoreError::validation("total_seats must be a positive integer"));
    }
    Ok(())
}

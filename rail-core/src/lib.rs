pub mod accounts;
pub mod availability;
pub mod booking;
pub mod catalog;
pub mod identity;
pub mod models;
pub mod pii;
pub mod repository;

pub use accounts::AccountService;
pub use availability::AvailabilityCalculator;
pub use booking::BookingCoordinator;
pub use catalog::TrainCatalog;
pub use identity::{Argon2Hasher, CredentialHasher, Identity, Role};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Username already exists")]
    DuplicateUser,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Not enough seats available: requested {requested}, available {available}")]
    InsufficientCapacity { requested: i32, available: i64 },
    #[error("Store error: {0}")]
    StoreError(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

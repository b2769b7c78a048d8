use std::sync::Arc;
use rail_core::repository::{BookingRepository, SeatLedger, TrainRepository, UserRepository};
use rail_core::{
    AccountService, AvailabilityCalculator, BookingCoordinator, CredentialHasher, Role,
    TrainCatalog,
};

use crate::token::TokenService;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
    pub default_role: Role,
}

#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub catalog: TrainCatalog,
    pub availability: AvailabilityCalculator,
    pub coordinator: BookingCoordinator,
    pub users: Arc<dyn UserRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    /// Wires every service to one store. Both `PgStore` and `MemoryStore` qualify.
    pub fn new<S>(store: S, hasher: Arc<dyn CredentialHasher>, auth: &AuthConfig) -> Self
    where
        S: UserRepository + TrainRepository + BookingRepository + SeatLedger + 'static,
    {
        let store = Arc::new(store);
        let users: Arc<dyn UserRepository> = store.clone();
        let trains: Arc<dyn TrainRepository> = store.clone();
        let bookings: Arc<dyn BookingRepository> = store.clone();
        let ledger: Arc<dyn SeatLedger> = store;

        Self {
            accounts: AccountService::new(users.clone(), hasher, auth.default_role),
            catalog: TrainCatalog::new(trains.clone(), ledger.clone()),
            availability: AvailabilityCalculator::new(trains, bookings.clone()),
            coordinator: BookingCoordinator::new(ledger),
            users,
            bookings,
            tokens: Arc::new(TokenService::new(&auth.secret, auth.expiration)),
        }
    }
}

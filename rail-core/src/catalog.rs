use std::sync::Arc;
use tracing::info;

use crate::models::{NewTrain, Train, TrainId, TrainPatch};
use crate::repository::{SeatLedger, TrainRepository};
use crate::{CoreError, CoreResult};

/// Administrative train inventory operations.
#[derive(Clone)]
pub struct TrainCatalog {
    trains: Arc<dyn TrainRepository>,
    ledger: Arc<dyn SeatLedger>,
}

impl TrainCatalog {
    pub fn new(trains: Arc<dyn TrainRepository>, ledger: Arc<dyn SeatLedger>) -> Self {
        Self { trains, ledger }
    }

    pub async fn create(&self, train: NewTrain) -> CoreResult<Train> {
        let spec = train.validate()?;
        let train = self.trains.insert_train(spec).await?;
        info!(train_id = train.id, name = %train.train_name, "Train added");
        Ok(train)
    }

    /// Applies a partial update. Capacity changes are checked against the seats already
    /// booked while holding the train's lock, so an edit can never leave a train
    /// over-committed.
    pub async fn update(&self, id: TrainId, patch: TrainPatch) -> CoreResult<Train> {
        let patch = patch.validate()?;

        let mut lock = self
            .ledger
            .lock_train(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Train not found"))?;

        if let Some(new_total) = patch.total_seats {
            let booked = lock.booked_seats().await?;
            if i64::from(new_total) < booked {
                return Err(CoreError::validation(format!(
                    "total_seats cannot be lower than the {} seats already booked",
                    booked
                )));
            }
        }

        let train = lock.update_train(&patch).await?;
        lock.commit().await?;

        info!(train_id = id, "Train details updated");
        Ok(train)
    }

    pub async fn delete(&self, id: TrainId) -> CoreResult<()> {
        if !self.trains.delete_train(id).await? {
            return Err(CoreError::not_found("Train not found"));
        }
        info!(train_id = id, "Train removed");
        Ok(())
    }

    pub async fn search(
        &self,
        source: Option<&str>,
        destination: Option<&str>,
    ) -> CoreResult<Vec<Train>> {
        let source = source.map(str::trim).filter(|s| !s.is_empty());
        let destination = destination.map(str::trim).filter(|d| !d.is_empty());
        let (source, destination) = match (source, destination) {
            (Some(s), Some(d)) => (s, d),
            _ => {
                return Err(CoreError::validation(
                    "Source and destination stations are required",
                ))
            }
        };

        let trains = self.trains.find_trains(source, destination).await?;
        if trains.is_empty() {
            return Err(CoreError::not_found("No trains found"));
        }
        Ok(trains)
    }
}

use async_trait::async_trait;
use rail_core::models::{Train, TrainId, TrainSpec};
use rail_core::repository::TrainRepository;
use rail_core::CoreResult;

use crate::database::{store_error, PgStore};

#[derive(sqlx::FromRow)]
pub(crate) struct TrainRow {
    id: i64,
    train_name: String,
    source_station: String,
    destination_station: String,
    total_seats: i32,
}

impl From<TrainRow> for Train {
    fn from(row: TrainRow) -> Self {
        Train {
            id: row.id,
            train_name: row.train_name,
            source_station: row.source_station,
            destination_station: row.destination_station,
            total_seats: row.total_seats,
        }
    }
}

#[async_trait]
impl TrainRepository for PgStore {
    async fn insert_train(&self, train: TrainSpec) -> CoreResult<Train> {
        let row = sqlx::query_as::<_, TrainRow>(
            r#"
            INSERT INTO train (train_name, source_station, destination_station, total_seats)
            VALUES ($1, $2, $3, $4)
            RETURNING id, train_name, source_station, destination_station, total_seats
            "#,
        )
        .bind(&train.train_name)
        .bind(&train.source_station)
        .bind(&train.destination_station)
        .bind(train.total_seats)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error("Failed to insert train", e))?;

        Ok(row.into())
    }

    async fn get_train(&self, id: TrainId) -> CoreResult<Option<Train>> {
        let row = sqlx::query_as::<_, TrainRow>(
            r#"
            SELECT id, train_name, source_station, destination_station, total_seats
            FROM train
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to fetch train", e))?;

        Ok(row.map(Train::from))
    }

    async fn find_trains(&self, source: &str, destination: &str) -> CoreResult<Vec<Train>> {
        let rows = sqlx::query_as::<_, TrainRow>(
            r#"
            SELECT id, train_name, source_station, destination_station, total_seats
            FROM train
            WHERE source_station = $1 AND destination_station = $2
            ORDER BY id
            "#,
        )
        .bind(source)
        .bind(destination)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to search trains", e))?;

        Ok(rows.into_iter().map(Train::from).collect())
    }

    async fn delete_train(&self, id: TrainId) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM train WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("Failed to delete train", e))?;

        Ok(result.rows_affected() > 0)
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        car::{Car, CarFilter, CarInput, SizeFilter},
        trip::{Trip, TripInput},
    },
};

use super::CarStore;

const CAR_COLUMNS: &str = "SELECT id, size, doors, fuel, transmission FROM cars";
const TRIP_COLUMNS: &str = "SELECT id, car_id, start_at, end_at, description FROM trips";

#[derive(Clone)]
pub struct SqlCarStore {
    db: DbPool,
}

impl SqlCarStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Appends the listing conditions, each one only when the filter sets it.
    fn push_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &CarFilter) {
        query.push(" WHERE 1 = 1");
        match filter.size {
            Some(SizeFilter::Is(size)) => {
                query.push(" AND size = ").push_bind(size);
            }
            Some(SizeFilter::Unknown) => {
                query.push(" AND 1 = 0");
            }
            None => {}
        }
        if let Some(doors) = filter.doors {
            query.push(" AND doors >= ").push_bind(doors);
        }
    }

    async fn load_trips(conn: &mut SqliteConnection, car_id: i64) -> Result<Vec<Trip>, AppError> {
        let trips = sqlx::query_as::<_, Trip>(&format!("{TRIP_COLUMNS} WHERE car_id = ? ORDER BY id"))
            .bind(car_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(trips)
    }

    async fn load_car(conn: &mut SqliteConnection, id: i64) -> Result<Car, AppError> {
        let mut car = sqlx::query_as::<_, Car>(&format!("{CAR_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(AppError::NotFound(id))?;
        car.trips = Self::load_trips(conn, id).await?;
        Ok(car)
    }
}

#[async_trait]
impl CarStore for SqlCarStore {
    async fn list_cars(&self, filter: CarFilter) -> Result<Vec<Car>, AppError> {
        let mut cars_query = QueryBuilder::<Sqlite>::new(CAR_COLUMNS);
        Self::push_filter(&mut cars_query, &filter);
        cars_query.push(" ORDER BY id");

        let mut trips_query = QueryBuilder::<Sqlite>::new(TRIP_COLUMNS);
        trips_query.push(" WHERE car_id IN (SELECT id FROM cars");
        Self::push_filter(&mut trips_query, &filter);
        trips_query.push(") ORDER BY car_id, id");

        let mut conn = self.db.acquire().await?;
        let cars = cars_query
            .build_query_as::<Car>()
            .fetch_all(&mut *conn)
            .await?;
        if cars.is_empty() {
            return Ok(cars);
        }

        let trips = trips_query
            .build_query_as::<Trip>()
            .fetch_all(&mut *conn)
            .await?;
        let mut by_car: HashMap<i64, Vec<Trip>> = HashMap::new();
        for trip in trips {
            by_car.entry(trip.car_id).or_default().push(trip);
        }

        Ok(cars
            .into_iter()
            .map(|mut car| {
                car.trips = by_car.remove(&car.id).unwrap_or_default();
                car
            })
            .collect())
    }

    async fn get_car(&self, id: i64) -> Result<Car, AppError> {
        let mut conn = self.db.acquire().await?;
        Self::load_car(&mut conn, id).await
    }

    async fn create_car(&self, input: CarInput) -> Result<Car, AppError> {
        let mut tx = self.db.begin().await?;
        let id = sqlx::query(
            "INSERT INTO cars (size, doors, fuel, transmission) VALUES (?, ?, ?, ?)",
        )
        .bind(input.size)
        .bind(input.doors)
        .bind(input.fuel)
        .bind(input.transmission)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        tx.commit().await?;

        debug!(car_id = id, "car inserted");
        Ok(Car::new(id, input))
    }

    async fn replace_car(&self, id: i64, input: CarInput) -> Result<Car, AppError> {
        let mut tx = self.db.begin().await?;
        let updated = sqlx::query(
            "UPDATE cars SET size = ?, doors = ?, fuel = ?, transmission = ? WHERE id = ?",
        )
        .bind(input.size)
        .bind(input.doors)
        .bind(input.fuel)
        .bind(input.transmission)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(AppError::NotFound(id));
        }
        let car = Self::load_car(&mut tx, id).await?;
        tx.commit().await?;
        Ok(car)
    }

    async fn delete_car(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;
        let deleted = sqlx::query("DELETE FROM cars WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(AppError::NotFound(id));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn add_trip(&self, car_id: i64, input: TripInput) -> Result<Trip, AppError> {
        if let Err(invalid) = input.check_range() {
            // Read-only: a missing car is still reported first.
            let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM cars WHERE id = ?")
                .bind(car_id)
                .fetch_optional(&self.db)
                .await?;
            return Err(match exists {
                Some(_) => invalid.into(),
                None => AppError::NotFound(car_id),
            });
        }

        // The insert must be the first statement: a deferred transaction that
        // read first cannot wait for the write lock.
        let mut tx = self.db.begin().await?;
        let next_id: Option<i64> = sqlx::query_scalar(
            "INSERT INTO trips (car_id, id, start_at, end_at, description) \
             SELECT cars.id, \
                    (SELECT COALESCE(MAX(trips.id), 0) + 1 FROM trips WHERE trips.car_id = cars.id), \
                    ?, ?, ? \
             FROM cars WHERE cars.id = ? \
             RETURNING id",
        )
        .bind(input.start)
        .bind(input.end)
        .bind(&input.description)
        .bind(car_id)
        .fetch_optional(&mut *tx)
        .await?;
        let next_id = next_id.ok_or(AppError::NotFound(car_id))?;
        tx.commit().await?;

        let trip = input.into_trip(car_id, next_id)?;
        debug!(car_id, trip_id = trip.id, "trip inserted");
        Ok(trip)
    }
}

pub mod sql;
pub mod storage;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        car::{Car, CarFilter, CarInput},
        trip::{Trip, TripInput},
    },
};

/// Persistent home of cars and their trips.
///
/// Every method is one unit of work: either it completes and its changes are
/// durable, or it fails and nothing was written.
#[async_trait]
pub trait CarStore: Send + Sync {
    async fn list_cars(&self, filter: CarFilter) -> Result<Vec<Car>, AppError>;

    async fn get_car(&self, id: i64) -> Result<Car, AppError>;

    async fn create_car(&self, input: CarInput) -> Result<Car, AppError>;

    async fn replace_car(&self, id: i64, input: CarInput) -> Result<Car, AppError>;

    /// Removes the car together with its trips.
    async fn delete_car(&self, id: i64) -> Result<(), AppError>;

    /// Fails with `NotFound` before looking at the time range.
    async fn add_trip(&self, car_id: i64, input: TripInput) -> Result<Trip, AppError>;
}

pub type SharedStore = Arc<dyn CarStore>;

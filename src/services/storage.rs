use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{fs, sync::Mutex};
use tracing::debug;

use crate::{
    error::AppError,
    models::{
        car::{Car, CarFilter, CarInput},
        trip::{Trip, TripInput},
    },
};

use super::CarStore;

/// On-disk layout of the flat-file backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CarFile {
    #[serde(default = "first_id")]
    next_id: i64,
    #[serde(default)]
    cars: Vec<Car>,
}

fn first_id() -> i64 {
    1
}

impl CarFile {
    fn car_mut(&mut self, id: i64) -> Result<&mut Car, AppError> {
        self.cars
            .iter_mut()
            .find(|car| car.id == id)
            .ok_or(AppError::NotFound(id))
    }
}

/// Keeps the whole fleet in one JSON document.
///
/// Writers hold `lock` across load, mutate and save, and the file is only
/// replaced once a mutation succeeded.
#[derive(Clone)]
pub struct FileCarStore {
    path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl FileCarStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path: Arc::new(path),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn ensure_structure(&self) -> Result<(), AppError> {
        if let Some(parent) = self.path().parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        if !fs::try_exists(self.path()).await? {
            self.save(&CarFile {
                next_id: first_id(),
                cars: Vec::new(),
            })
            .await?;
        }
        Ok(())
    }

    async fn load(&self) -> Result<CarFile, AppError> {
        if !fs::try_exists(self.path()).await? {
            return Ok(CarFile {
                next_id: first_id(),
                cars: Vec::new(),
            });
        }
        let raw = fs::read(self.path()).await?;
        if raw.is_empty() {
            return Ok(CarFile {
                next_id: first_id(),
                cars: Vec::new(),
            });
        }
        let mut data: CarFile =
            serde_json::from_slice(&raw).map_err(|err| AppError::Other(err.into()))?;
        // Files edited by hand may lag behind the highest id in use.
        let highest = data.cars.iter().map(|car| car.id).max().unwrap_or(0);
        data.next_id = data.next_id.max(highest + 1);
        Ok(data)
    }

    async fn save(&self, data: &CarFile) -> Result<(), AppError> {
        let bytes = serde_json::to_vec_pretty(data).map_err(|err| AppError::Other(err.into()))?;
        let tmp = self.path().with_extension("json.tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, self.path()).await?;
        Ok(())
    }
}

#[async_trait]
impl CarStore for FileCarStore {
    async fn list_cars(&self, filter: CarFilter) -> Result<Vec<Car>, AppError> {
        let _guard = self.lock.lock().await;
        let data = self.load().await?;
        Ok(data
            .cars
            .into_iter()
            .filter(|car| filter.matches(car))
            .collect())
    }

    async fn get_car(&self, id: i64) -> Result<Car, AppError> {
        let _guard = self.lock.lock().await;
        self.load()
            .await?
            .cars
            .into_iter()
            .find(|car| car.id == id)
            .ok_or(AppError::NotFound(id))
    }

    async fn create_car(&self, input: CarInput) -> Result<Car, AppError> {
        let _guard = self.lock.lock().await;
        let mut data = self.load().await?;
        let car = Car::new(data.next_id, input);
        data.next_id += 1;
        data.cars.push(car.clone());
        self.save(&data).await?;
        debug!(car_id = car.id, path = %self.path().display(), "car appended");
        Ok(car)
    }

    async fn replace_car(&self, id: i64, input: CarInput) -> Result<Car, AppError> {
        let _guard = self.lock.lock().await;
        let mut data = self.load().await?;
        let car = data.car_mut(id)?;
        car.replace_with(input);
        let car = car.clone();
        self.save(&data).await?;
        Ok(car)
    }

    async fn delete_car(&self, id: i64) -> Result<(), AppError> {
        let _guard = self.lock.lock().await;
        let mut data = self.load().await?;
        let before = data.cars.len();
        data.cars.retain(|car| car.id != id);
        if data.cars.len() == before {
            return Err(AppError::NotFound(id));
        }
        self.save(&data).await?;
        Ok(())
    }

    async fn add_trip(&self, car_id: i64, input: TripInput) -> Result<Trip, AppError> {
        let _guard = self.lock.lock().await;
        let mut data = self.load().await?;
        let car = data.car_mut(car_id)?;
        let trip = input.into_trip(car_id, car.next_trip_id())?;
        car.trips.push(trip.clone());
        self.save(&data).await?;
        Ok(trip)
    }
}

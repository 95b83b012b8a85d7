use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::info;
use validator::Validate;

use crate::{
    error::AppError,
    extract::{AppJson, AppPath, AppQuery},
    models::{
        car::{Car, CarFilter, CarInput},
        trip::{Trip, TripInput},
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cars", get(list_cars).post(create_car))
        .route("/api/cars/", get(list_cars).post(create_car))
        .route(
            "/api/cars/:id",
            get(car_by_id).put(replace_car).delete(remove_car),
        )
        .route("/api/cars/:car_id/trips", post(add_trip))
}

async fn list_cars(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<CarFilter>,
) -> Result<Json<Vec<Car>>, AppError> {
    let cars = state.store.list_cars(filter).await?;
    Ok(Json(cars))
}

async fn car_by_id(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Car>, AppError> {
    Ok(Json(state.store.get_car(id).await?))
}

async fn create_car(
    State(state): State<AppState>,
    AppJson(input): AppJson<CarInput>,
) -> Result<Json<Car>, AppError> {
    input.validate()?;
    let car = state.store.create_car(input).await?;
    info!(car_id = car.id, size = %car.size, "car created");
    Ok(Json(car))
}

async fn replace_car(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(input): AppJson<CarInput>,
) -> Result<Json<Car>, AppError> {
    input.validate()?;
    let car = state.store.replace_car(id, input).await?;
    info!(car_id = id, "car replaced");
    Ok(Json(car))
}

async fn remove_car(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    state.store.delete_car(id).await?;
    info!(car_id = id, "car deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn add_trip(
    State(state): State<AppState>,
    AppPath(car_id): AppPath<i64>,
    AppJson(input): AppJson<TripInput>,
) -> Result<Json<Trip>, AppError> {
    let trip = state.store.add_trip(car_id, input).await?;
    info!(car_id, trip_id = trip.id, "trip recorded");
    Ok(Json(trip))
}

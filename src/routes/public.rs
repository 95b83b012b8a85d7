use axum::{routing::get, Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{error::AppError, extract::AppQuery, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(welcome))
        .route("/date", get(date))
}

#[derive(Deserialize)]
struct WelcomeQuery {
    name: Option<String>,
}

async fn welcome(AppQuery(query): AppQuery<WelcomeQuery>) -> Result<Json<Value>, AppError> {
    let name = query
        .name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "guest".into());
    Ok(Json(json!({
        "message": format!("Welcome, {name} to the Car Sharing Service!")
    })))
}

async fn date() -> Json<Value> {
    Json(json!({ "date": Utc::now() }))
}

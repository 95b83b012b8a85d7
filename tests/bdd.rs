use std::{fmt, net::SocketAddr};

use anyhow::Context;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use carsharing::{
    config::{AppConfig, StorageBackend},
    db::{init_pool, run_migrations},
    routes::create_router,
    services::{sql::SqlCarStore, storage::FileCarStore},
    state::AppState,
};
use cucumber::{given, then, when, World as _};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

#[derive(Debug, cucumber::World, Default)]
struct AppWorld {
    state: Option<TestState>,
    last_status: Option<StatusCode>,
    last_body: Value,
}

impl AppWorld {
    fn router(&self) -> Router {
        self.state
            .as_ref()
            .expect("state must be initialised first")
            .router
            .clone()
    }

    async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .router()
            .oneshot(request.body(body).expect("request"))
            .await
            .expect("router is infallible");

        self.last_status = Some(response.status());
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        self.last_body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
    }
}

struct TestState {
    router: Router,
    _root: TempDir,
}

impl fmt::Debug for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestState").finish()
    }
}

impl TestState {
    async fn new(backend: StorageBackend) -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for bdd world")?;
        let db_path = root.path().join("bdd.sqlite");

        let config = AppConfig {
            database_url: format!("sqlite://{}", db_path.to_string_lossy()),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            storage_backend: backend,
            cars_file: root.path().join("cars.json"),
        };

        let app = match backend {
            StorageBackend::Sqlite => {
                let db = init_pool(&config.database_url).await?;
                run_migrations(&db).await?;
                AppState::new(config, SqlCarStore::new(db))
            }
            StorageBackend::File => {
                let store = FileCarStore::new(config.cars_file.clone());
                store.ensure_structure().await?;
                AppState::new(config, store)
            }
        };

        Ok(Self {
            router: create_router(app),
            _root: root,
        })
    }
}

fn car_body(size: &str, doors: u32, fuel: &str, transmission: &str) -> Value {
    json!({
        "size": size,
        "doors": doors,
        "fuel": fuel,
        "transmission": transmission,
    })
}

#[given(regex = r#"^a fresh "(sqlite|file)" application$"#)]
async fn given_fresh_state(world: &mut AppWorld, backend: String) {
    let backend: StorageBackend = backend.parse().expect("backend name");
    world.state = Some(TestState::new(backend).await.expect("state"));
    world.last_status = None;
    world.last_body = Value::Null;
}

#[when(
    regex = r#"^I create a "([a-z]+)" car with (\d+) doors?, "([a-z]+)" fuel and "([a-z]+)" transmission$"#
)]
async fn when_create_car(
    world: &mut AppWorld,
    size: String,
    doors: u32,
    fuel: String,
    transmission: String,
) {
    let body = car_body(&size, doors, &fuel, &transmission);
    world.send(Method::POST, "/api/cars/", Some(body)).await;
}

#[when(
    regex = r#"^I replace car (\d+) with a "([a-z]+)" car with (\d+) doors?, "([a-z]+)" fuel and "([a-z]+)" transmission$"#
)]
async fn when_replace_car(
    world: &mut AppWorld,
    id: i64,
    size: String,
    doors: u32,
    fuel: String,
    transmission: String,
) {
    let mut body = car_body(&size, doors, &fuel, &transmission);
    // Clients echo the id back; it must not move the car.
    body["id"] = json!(id + 100);
    world
        .send(Method::PUT, &format!("/api/cars/{id}"), Some(body))
        .await;
}

#[when(regex = r"^I request car (\d+)$")]
async fn when_request_car(world: &mut AppWorld, id: i64) {
    world.send(Method::GET, &format!("/api/cars/{id}"), None).await;
}

#[when(regex = r#"^I request the path "([^"]+)"$"#)]
async fn when_request_path(world: &mut AppWorld, path: String) {
    world.send(Method::GET, &path, None).await;
}

#[when(regex = r#"^I post the raw body "(.*)" to "([^"]+)"$"#)]
async fn when_post_raw(world: &mut AppWorld, body: String, path: String) {
    let body: Value = serde_json::from_str(&body.replace("\\\"", "\"")).expect("json body");
    world.send(Method::POST, &path, Some(body)).await;
}

#[when(regex = r"^I delete car (\d+)$")]
async fn when_delete_car(world: &mut AppWorld, id: i64) {
    world
        .send(Method::DELETE, &format!("/api/cars/{id}"), None)
        .await;
}

#[when(regex = r"^I list all cars$")]
async fn when_list_all(world: &mut AppWorld) {
    world.send(Method::GET, "/api/cars", None).await;
}

#[when(regex = r#"^I list cars with query "([^"]*)"$"#)]
async fn when_list_filtered(world: &mut AppWorld, query: String) {
    world
        .send(Method::GET, &format!("/api/cars?{query}"), None)
        .await;
}

#[when(regex = r#"^I add a trip to car (\d+) from "([^"]+)" to "([^"]+)" described as "([^"]*)"$"#)]
async fn when_add_trip(
    world: &mut AppWorld,
    car_id: i64,
    start: String,
    end: String,
    description: String,
) {
    let body = json!({ "start": start, "end": end, "description": description });
    world
        .send(Method::POST, &format!("/api/cars/{car_id}/trips"), Some(body))
        .await;
}

#[when(regex = r#"^I open the welcome page as "([^"]+)"$"#)]
async fn when_welcome(world: &mut AppWorld, name: String) {
    world.send(Method::GET, &format!("/?name={name}"), None).await;
}

#[then(regex = r"^the response status is (\d+)$")]
async fn then_status(world: &mut AppWorld, status: u16) {
    assert_eq!(
        world.last_status,
        Some(StatusCode::from_u16(status).expect("status code")),
        "body: {}",
        world.last_body
    );
}

#[then(regex = r#"^the response detail is "([^"]*)"$"#)]
async fn then_detail(world: &mut AppWorld, detail: String) {
    assert_eq!(world.last_body["detail"], json!(detail));
}

#[then(regex = r"^the response carries a detail$")]
async fn then_has_detail(world: &mut AppWorld) {
    let detail = world.last_body["detail"].as_str().unwrap_or_default();
    assert!(!detail.is_empty(), "body: {}", world.last_body);
}

#[then(regex = r#"^the response message is "([^"]*)"$"#)]
async fn then_message(world: &mut AppWorld, message: String) {
    assert_eq!(world.last_body["message"], json!(message));
}

#[then(regex = r#"^the response car has id (\d+), size "([a-z]+)" and (\d+) doors?$"#)]
async fn then_car_has(world: &mut AppWorld, id: i64, size: String, doors: u32) {
    let car = &world.last_body;
    assert_eq!(car["id"], json!(id), "car: {car}");
    assert_eq!(car["size"], json!(size), "car: {car}");
    assert_eq!(car["doors"], json!(doors), "car: {car}");
}

#[then(regex = r#"^the response car has "([a-z]+)" fuel and "([a-z]+)" transmission$"#)]
async fn then_car_drivetrain(world: &mut AppWorld, fuel: String, transmission: String) {
    let car = &world.last_body;
    assert_eq!(car["fuel"], json!(fuel), "car: {car}");
    assert_eq!(car["transmission"], json!(transmission), "car: {car}");
}

#[then(regex = r#"^the listing has ids "([\d,]*)"$"#)]
async fn then_listing_ids(world: &mut AppWorld, expected: String) {
    let expected: Vec<i64> = expected
        .split(',')
        .filter(|part| !part.is_empty())
        .map(|part| part.parse().expect("id"))
        .collect();
    let actual: Vec<i64> = world
        .last_body
        .as_array()
        .expect("listing must be an array")
        .iter()
        .map(|car| car["id"].as_i64().expect("car id"))
        .collect();
    assert_eq!(actual, expected);
}

#[then(regex = r"^the response trip has id (\d+)$")]
async fn then_trip_id(world: &mut AppWorld, id: i64) {
    assert_eq!(world.last_body["id"], json!(id), "trip: {}", world.last_body);
}

#[then(regex = r"^car (\d+) has (\d+) trips?$")]
async fn then_car_trip_count(world: &mut AppWorld, id: i64, count: usize) {
    world.send(Method::GET, &format!("/api/cars/{id}"), None).await;
    let trips = world.last_body["trips"]
        .as_array()
        .expect("car must carry its trips");
    assert_eq!(trips.len(), count);
}

#[tokio::main]
async fn main() {
    AppWorld::cucumber()
        .fail_on_skipped()
        .with_default_cli()
        .run_and_exit("tests/features")
        .await;
}

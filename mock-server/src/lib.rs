use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const AUTH_TOKEN_HEADER: &str = "tb-auth-token";
pub const APP_SECRET_HEADER: &str = "tb-app-secret";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub address: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub attendees: u32,
    pub owner: Owner,
}

#[derive(Deserialize)]
pub struct EventInput {
    pub name: String,
    pub address: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credentials {
    pub id: String,
    pub token: String,
}

#[derive(Deserialize)]
pub struct RegionQuery {
    pub lat: f64,
    pub lng: f64,
    pub lat_span: f64,
    pub lng_span: f64,
}

impl RegionQuery {
    pub fn contains(&self, event: &Event) -> bool {
        let half_lat = self.lat_span / 2.0;
        let half_lng = self.lng_span / 2.0;
        (self.lat - half_lat..=self.lat + half_lat).contains(&event.lat)
            && (self.lng - half_lng..=self.lng + half_lng).contains(&event.lon)
    }
}

#[derive(Debug, Default)]
pub struct Store {
    /// token -> user id
    pub users: HashMap<String, String>,
    pub events: HashMap<String, Event>,
    /// (event id, user id)
    pub attendances: HashSet<(String, String)>,
    next_event_id: u64,
}

#[derive(Clone, Default)]
pub struct AppState {
    pub store: Arc<RwLock<Store>>,
    /// When set, `POST /users` requires a matching `tb-app-secret` header.
    pub app_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn with_app_secret(secret: &str) -> Self {
        Self {
            app_secret: Some(Arc::from(secret)),
            ..Self::default()
        }
    }
}

type Failure = (StatusCode, Json<Value>);

fn failure(status: StatusCode, message: &str) -> Failure {
    (status, Json(json!({ "message": message })))
}

pub fn app() -> Router {
    app_with_state(AppState::default())
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/users", post(create_user))
        .route("/events", get(list_events).post(create_event))
        .route("/events/{id}", get(get_event).put(update_event))
        .route("/events/{id}/attendances", post(create_attendance))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, AppState::default()).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

fn authenticate(headers: &HeaderMap, store: &Store) -> Result<String, Failure> {
    headers
        .get(AUTH_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|token| store.users.get(token))
        .cloned()
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Unauthorized"))
}

fn validate(input: &EventInput) -> Result<(), Failure> {
    if input.name.is_empty() {
        return Err(failure(StatusCode::UNPROCESSABLE_ENTITY, "Name can't be blank"));
    }
    if input.ended_at < input.started_at {
        return Err(failure(StatusCode::UNPROCESSABLE_ENTITY, "Ended at can't precede started at"));
    }
    Ok(())
}

async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Credentials>), StatusCode> {
    if let Some(secret) = &state.app_secret {
        let presented = headers.get(APP_SECRET_HEADER).and_then(|v| v.to_str().ok());
        if presented != Some(&**secret) {
            tracing::warn!("rejected user creation with bad app secret");
            return Err(StatusCode::NOT_FOUND);
        }
    }
    let credentials = Credentials {
        id: Uuid::new_v4().to_string(),
        token: Uuid::new_v4().to_string(),
    };
    state
        .store
        .write()
        .await
        .users
        .insert(credentials.token.clone(), credentials.id.clone());
    tracing::info!(user_id = %credentials.id, "created user");
    Ok((StatusCode::CREATED, Json(credentials)))
}

async fn create_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<EventInput>,
) -> Result<(StatusCode, Json<Event>), Failure> {
    let mut store = state.store.write().await;
    let owner = authenticate(&headers, &store)?;
    validate(&input)?;
    store.next_event_id += 1;
    let event = Event {
        id: store.next_event_id.to_string(),
        name: input.name,
        address: input.address,
        started_at: input.started_at,
        ended_at: input.ended_at,
        lat: input.lat,
        lon: input.lon,
        attendees: 0,
        owner: Owner { id: owner },
    };
    store.events.insert(event.id.clone(), event.clone());
    tracing::info!(event_id = %event.id, "created event");
    Ok((StatusCode::CREATED, Json(event)))
}

/// Events inside the query rectangle, ordered by id. An empty result is a
/// message object rather than `[]`.
async fn list_events(State(state): State<AppState>, Query(region): Query<RegionQuery>) -> Json<Value> {
    let store = state.store.read().await;
    let mut events: Vec<&Event> = store.events.values().filter(|e| region.contains(e)).collect();
    if events.is_empty() {
        return Json(json!({ "message": "No Events Found" }));
    }
    events.sort_by_key(|e| e.id.parse::<u64>().unwrap_or(u64::MAX));
    Json(json!(events))
}

async fn get_event(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Event>, StatusCode> {
    let store = state.store.read().await;
    store.events.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<EventInput>,
) -> Result<Json<Event>, Failure> {
    let mut store = state.store.write().await;
    let user = authenticate(&headers, &store)?;
    validate(&input)?;
    let event = store
        .events
        .get_mut(&id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Event not found"))?;
    if event.owner.id != user {
        return Err(failure(StatusCode::FORBIDDEN, "Only the owner can change an event"));
    }
    event.name = input.name;
    event.address = input.address;
    event.started_at = input.started_at;
    event.ended_at = input.ended_at;
    event.lat = input.lat;
    event.lon = input.lon;
    Ok(Json(event.clone()))
}

async fn create_attendance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Value>), Failure> {
    let mut store = state.store.write().await;
    let user = authenticate(&headers, &store)?;
    if !store.events.contains_key(&id) {
        return Err(failure(StatusCode::NOT_FOUND, "Event not found"));
    }
    if !store.attendances.insert((id.clone(), user.clone())) {
        return Err(failure(StatusCode::UNPROCESSABLE_ENTITY, "Can only RSVP once per event"));
    }
    if let Some(event) = store.events.get_mut(&id) {
        event.attendees += 1;
    }
    tracing::info!(event_id = %id, user_id = %user, "created attendance");
    Ok((StatusCode::CREATED, Json(json!({ "event_id": id, "user_id": user }))))
}

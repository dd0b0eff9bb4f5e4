use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, app_with_state, AppState, Credentials, Event, APP_SECRET_HEADER, AUTH_TOKEN_HEADER};
use tower::ServiceExt;

const EVENT_BODY: &str = r#"{"name":"Picnic","address":"Dolores Park","started_at":"2024-06-01T12:00:00Z","ended_at":"2024-06-01T15:00:00Z","lat":37.76,"lon":-122.43}"#;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<String> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(AUTH_TOKEN_HEADER, token);
    }
    builder.body(body.to_string()).unwrap()
}

async fn send(app: &Router, req: Request<String>) -> axum::response::Response {
    app.clone().oneshot(req).await.unwrap()
}

async fn new_user(app: &Router) -> Credentials {
    let resp = send(app, request("POST", "/users", None, "")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await
}

async fn new_event(app: &Router, token: &str) -> Event {
    let resp = send(app, request("POST", "/events", Some(token), EVENT_BODY)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await
}

// --- users ---

#[tokio::test]
async fn create_user_returns_id_and_token() {
    let app = app();
    let creds = new_user(&app).await;
    assert!(!creds.id.is_empty());
    assert!(!creds.token.is_empty());
    assert_ne!(creds.id, creds.token);
}

#[tokio::test]
async fn create_user_checks_app_secret() {
    let app = app_with_state(AppState::with_app_secret("sesame"));

    let resp = send(&app, request("POST", "/users", None, "")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = Request::builder()
        .method("POST")
        .uri("/users")
        .header(APP_SECRET_HEADER, "sesame")
        .body(String::new())
        .unwrap();
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
}

// --- events ---

#[tokio::test]
async fn create_event_requires_token() {
    let app = app();
    let resp = send(&app, request("POST", "/events", None, EVENT_BODY)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = send(&app, request("POST", "/events", Some("unknown"), EVENT_BODY)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_event_assigns_id_and_owner() {
    let app = app();
    let creds = new_user(&app).await;
    let event = new_event(&app, &creds.token).await;
    assert_eq!(event.id, "1");
    assert_eq!(event.owner.id, creds.id);
    assert_eq!(event.attendees, 0);
    assert_eq!(event.name, "Picnic");
}

#[tokio::test]
async fn create_event_malformed_json_returns_422() {
    let app = app();
    let creds = new_user(&app).await;
    let resp = send(&app, request("POST", "/events", Some(&creds.token), r#"{"name":"x"}"#)).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn get_event_not_found() {
    let app = app();
    let resp = send(&app, request("GET", "/events/404", None, "")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_events_filters_by_region() {
    let app = app();
    let creds = new_user(&app).await;
    let created = new_event(&app, &creds.token).await;

    let resp = send(&app, request("GET", "/events?lat=37.76&lng=-122.43&lat_span=0.1&lng_span=0.1", None, "")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let events: Vec<Event> = body_json(resp).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, created.id);

    let resp = send(&app, request("GET", "/events?lat=40&lng=-73&lat_span=0.1&lng_span=0.1", None, "")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body, serde_json::json!({ "message": "No Events Found" }));
}

#[tokio::test]
async fn list_events_requires_region_params() {
    let app = app();
    let resp = send(&app, request("GET", "/events?lat=1", None, "")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_event_only_by_owner() {
    let app = app();
    let owner = new_user(&app).await;
    let other = new_user(&app).await;
    let event = new_event(&app, &owner.token).await;
    let uri = format!("/events/{}", event.id);
    let renamed = EVENT_BODY.replace("Picnic", "Barbecue");

    let resp = send(&app, request("PUT", &uri, Some(&other.token), &renamed)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = send(&app, request("PUT", &uri, Some(&owner.token), &renamed)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Event = body_json(resp).await;
    assert_eq!(updated.name, "Barbecue");
    assert_eq!(updated.id, event.id);

    let resp = send(&app, request("PUT", "/events/999", Some(&owner.token), &renamed)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- attendances ---

#[tokio::test]
async fn attendance_only_once_per_user() {
    let app = app();
    let owner = new_user(&app).await;
    let guest = new_user(&app).await;
    let event = new_event(&app, &owner.token).await;
    let uri = format!("/events/{}/attendances", event.id);

    let resp = send(&app, request("POST", &uri, Some(&guest.token), "")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = send(&app, request("POST", &uri, Some(&guest.token), "")).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let resp = send(&app, request("POST", &uri, Some(&owner.token), "")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(&app, request("GET", &format!("/events/{}", event.id), None, "")).await;
    let fetched: Event = body_json(resp).await;
    assert_eq!(fetched.attendees, 2);
}

#[tokio::test]
async fn attendance_for_missing_event_returns_404() {
    let app = app();
    let guest = new_user(&app).await;
    let resp = send(&app, request("POST", "/events/77/attendances", Some(&guest.token), "")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

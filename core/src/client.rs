//! Stateless HTTP request builder and response parser for the events API.
//!
//! # Design
//! `EventClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! Session handling, ordering and I/O belong to `ServiceClient`; this type is
//! deterministic and needs no network to test.

use serde_json::Value;

use crate::codec;
use crate::error::ClientError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, APP_SECRET_HEADER, AUTH_TOKEN_HEADER};
use crate::region::Region;
use crate::types::{Event, User};

/// Synchronous, stateless client for the events API.
#[derive(Debug, Clone)]
pub struct EventClient {
    base_url: String,
}

impl EventClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /users`. The app secret, when configured, authorizes user creation.
    pub fn build_create_user(&self, app_secret: Option<&str>) -> HttpRequest {
        let mut headers = json_headers(false);
        if let Some(secret) = app_secret {
            headers.push((APP_SECRET_HEADER.to_string(), secret.to_string()));
        }
        HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}/users", self.base_url),
            headers,
            body: None,
        }
    }

    /// `POST /events`. Any id already on `event` is left out of the body.
    pub fn build_create_event(&self, event: &Event, token: &str) -> Result<HttpRequest, ClientError> {
        let body = body_string(&codec::encode_new_event(event)?)?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}/events", self.base_url),
            headers: authorized_headers(token, true),
            body: Some(body),
        })
    }

    pub fn build_change_event(&self, event: &Event, token: &str) -> Result<HttpRequest, ClientError> {
        let id = confirmed_id(event)?;
        let body = body_string(&codec::encode_event(event)?)?;
        Ok(HttpRequest {
            method: HttpMethod::Put,
            path: format!("{}/events/{id}", self.base_url),
            headers: authorized_headers(token, true),
            body: Some(body),
        })
    }

    /// `GET /events?lat=&lng=&lat_span=&lng_span=`. Sent without credentials.
    pub fn build_fetch_events(&self, region: &Region) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: format!("{}/events?{}", self.base_url, region.query_string()),
            headers: json_headers(false),
            body: None,
        }
    }

    pub fn build_get_event(&self, event_id: &str) -> Result<HttpRequest, ClientError> {
        if event_id.is_empty() {
            return Err(ClientError::MissingEventId);
        }
        Ok(HttpRequest {
            method: HttpMethod::Get,
            path: format!("{}/events/{event_id}", self.base_url),
            headers: json_headers(false),
            body: None,
        })
    }

    pub fn build_create_attendance(&self, event: &Event, token: &str) -> Result<HttpRequest, ClientError> {
        let id = confirmed_id(event)?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}/events/{id}/attendances", self.base_url),
            headers: authorized_headers(token, false),
            body: None,
        })
    }

    /// Returns the new user and its session token.
    pub fn parse_create_user(&self, response: HttpResponse) -> Result<(User, String), ClientError> {
        let json = success_json(&response)?;
        codec::decode_credentials(&json)
    }

    /// `owner` is the session user, attached when the server answers with
    /// the id only.
    pub fn parse_create_event(
        &self,
        response: HttpResponse,
        submitted: &Event,
        owner: Option<User>,
    ) -> Result<Event, ClientError> {
        let json = success_json(&response)?;
        codec::decode_saved_event(&json, submitted, owner)
    }

    pub fn parse_change_event(&self, response: HttpResponse, submitted: &Event) -> Result<Event, ClientError> {
        let json = success_json(&response)?;
        codec::decode_saved_event(&json, submitted, None)
    }

    /// An empty result may come back as `{"message": "..."}` instead of `[]`.
    pub fn parse_fetch_events(&self, response: HttpResponse) -> Result<Vec<Event>, ClientError> {
        let json = success_json(&response)?;
        if is_empty_result_message(&json) {
            return Ok(Vec::new());
        }
        codec::decode_events(&json)
    }

    pub fn parse_get_event(&self, response: HttpResponse) -> Result<Event, ClientError> {
        let json = success_json(&response)?;
        codec::decode_event(&json)
    }

    /// Any 2xx counts as success; the body is not inspected.
    pub fn parse_create_attendance(&self, response: HttpResponse) -> Result<(), ClientError> {
        check_status(&response)
    }
}

fn json_headers(with_body: bool) -> Vec<(String, String)> {
    let mut headers = vec![("accept".to_string(), "application/json".to_string())];
    if with_body {
        headers.push(("content-type".to_string(), "application/json".to_string()));
    }
    headers
}

fn authorized_headers(token: &str, with_body: bool) -> Vec<(String, String)> {
    let mut headers = json_headers(with_body);
    headers.push((AUTH_TOKEN_HEADER.to_string(), token.to_string()));
    headers
}

fn confirmed_id(event: &Event) -> Result<&str, ClientError> {
    if event.is_confirmed() {
        Ok(&event.event_id)
    } else {
        Err(ClientError::MissingEventId)
    }
}

fn body_string(json: &Value) -> Result<String, ClientError> {
    serde_json::to_string(json).map_err(|e| ClientError::Encode(e.to_string()))
}

fn is_empty_result_message(json: &Value) -> bool {
    json.as_object()
        .is_some_and(|obj| obj.len() == 1 && obj.get("message").is_some_and(Value::is_string))
}

/// Map non-2xx status codes to `ClientError::Server`.
fn check_status(response: &HttpResponse) -> Result<(), ClientError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ClientError::Server {
        status: response.status,
        body: response.body.clone(),
    })
}

fn success_json(response: &HttpResponse) -> Result<Value, ClientError> {
    check_status(response)?;
    serde_json::from_str(&response.body).map_err(|e| ClientError::Decode(e.to_string()))
}

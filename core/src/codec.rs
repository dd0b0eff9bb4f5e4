//! JSON ⇄ domain entity conversion.
//!
//! # Design
//! Wire shapes are private serde structs; every optional field's default is
//! declared on the field itself:
//!
//! | field       | absent means        | `null` means |
//! |-------------|---------------------|--------------|
//! | `id`        | `""` (unconfirmed)  | error        |
//! | `attendees` | `0`                 | `0`          |
//! | `lat`/`lon` | `0.0`               | `0.0`        |
//! | `owner`     | no owner            | no owner     |
//!
//! `name`, `address`, `started_at` and `ended_at` are required. A decoded
//! event must also satisfy the `Event` invariants, otherwise the body counts
//! as unusable data. Batches are all-or-nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ClientError;
use crate::types::{Coordinate, Event, User};

#[derive(Deserialize)]
struct UserWire {
    id: String,
}

#[derive(Deserialize)]
struct CredentialsWire {
    id: String,
    #[serde(alias = "auth_token")]
    token: String,
}

#[derive(Deserialize)]
struct IdWire {
    id: String,
}

#[derive(Deserialize)]
struct EventWire {
    #[serde(default)]
    id: String,
    name: String,
    address: String,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    #[serde(default)]
    owner: Option<UserWire>,
    #[serde(default, deserialize_with = "null_as_default")]
    attendees: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    lat: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    lon: f64,
}

/// `null` reads like an absent key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Serialize)]
struct EventBody<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    id: &'a str,
    name: &'a str,
    address: &'a str,
    started_at: &'a DateTime<Utc>,
    ended_at: &'a DateTime<Utc>,
    lat: f64,
    lon: f64,
}

pub fn decode_user(json: &Value) -> Result<User, ClientError> {
    let wire = UserWire::deserialize(json)?;
    Ok(User::new(wire.id))
}

/// Decode the `POST /users` body into the new user and its session token.
pub fn decode_credentials(json: &Value) -> Result<(User, String), ClientError> {
    let wire = CredentialsWire::deserialize(json)?;
    Ok((User::new(wire.id), wire.token))
}

pub fn decode_event(json: &Value) -> Result<Event, ClientError> {
    let wire = EventWire::deserialize(json)?;
    let event = Event {
        event_id: wire.id,
        name: wire.name,
        address: wire.address,
        start_date: wire.started_at,
        end_date: wire.ended_at,
        owner: wire.owner.map(|owner| User::new(owner.id)),
        attendee_count: wire.attendees,
        coordinate: Coordinate::new(wire.lat, wire.lon),
    };
    event.validate().map_err(|err| ClientError::Decode(err.to_string()))?;
    Ok(event)
}

/// Decode a JSON array of events. One bad element fails the whole batch.
pub fn decode_events(json: &Value) -> Result<Vec<Event>, ClientError> {
    let items = json
        .as_array()
        .ok_or_else(|| ClientError::Decode("expected a JSON array of events".to_string()))?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            decode_event(item).map_err(|err| ClientError::Decode(format!("event {index}: {err}")))
        })
        .collect()
}

/// Decode the body of a create or update response.
///
/// A full event body is decoded as such. An id-only body (`{"id": ...}`)
/// yields `submitted` with the assigned id, owned by `owner` unless it
/// already had one.
pub fn decode_saved_event(json: &Value, submitted: &Event, owner: Option<User>) -> Result<Event, ClientError> {
    let IdWire { id } = IdWire::deserialize(json)?;
    if json.get("name").is_some() {
        return decode_event(json);
    }
    let mut event = submitted.clone();
    event.event_id = id;
    if event.owner.is_none() {
        event.owner = owner;
    }
    Ok(event)
}

/// Encode the fields sent on update. The id is omitted while empty; the
/// owner and attendee count are always left to the server.
pub fn encode_event(event: &Event) -> Result<Value, ClientError> {
    to_body(event, &event.event_id)
}

/// Encode the body of `POST /events`. Never carries an id; the server assigns one.
pub fn encode_new_event(event: &Event) -> Result<Value, ClientError> {
    to_body(event, "")
}

fn to_body(event: &Event, id: &str) -> Result<Value, ClientError> {
    let body = EventBody {
        id,
        name: &event.name,
        address: &event.address,
        started_at: &event.start_date,
        ended_at: &event.end_date,
        lat: event.coordinate.latitude,
        lon: event.coordinate.longitude,
    };
    serde_json::to_value(body).map_err(|e| ClientError::Encode(e.to_string()))
}

//! Domain entities for the events API.
//!
//! # Design
//! These are the typed values callers work with; they carry no serde
//! attributes. The JSON shape lives in `codec`, so wire naming and defaulting
//! rules stay in one place and the domain types stay free of them.

use chrono::{DateTime, Utc};

use crate::error::ClientError;
use crate::session::SessionStore;

/// A server-assigned user. Identity is the user id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
    pub user_id: String,
}

impl User {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into() }
    }

    /// True if this user is the one the session was bootstrapped as.
    pub fn is_current_user(&self, session: &SessionStore) -> bool {
        session.user_id().as_deref() == Some(self.user_id.as_str())
    }
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Finite, latitude within ±90 and longitude within ±180.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// An event as known to the client.
///
/// An empty `event_id` means the event has not been created on the server
/// yet. Once confirmed, an event is only replaced wholesale by the result of
/// an update call.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_id: String,
    pub name: String,
    pub address: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Assigned by the server from the creating session.
    pub owner: Option<User>,
    pub attendee_count: u32,
    pub coordinate: Coordinate,
}

impl Event {
    /// Build an unconfirmed event, checking the date order and coordinate.
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        coordinate: Coordinate,
    ) -> Result<Self, ClientError> {
        let event = Self {
            event_id: String::new(),
            name: name.into(),
            address: address.into(),
            start_date,
            end_date,
            owner: None,
            attendee_count: 0,
            coordinate,
        };
        event.validate()?;
        Ok(event)
    }

    pub fn is_confirmed(&self) -> bool {
        !self.event_id.is_empty()
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.end_date < self.start_date {
            return Err(ClientError::InvalidEvent(format!(
                "end {} precedes start {}",
                self.end_date.to_rfc3339(),
                self.start_date.to_rfc3339()
            )));
        }
        if !self.coordinate.is_valid() {
            return Err(ClientError::InvalidEvent(format!(
                "coordinate ({}, {}) out of range",
                self.coordinate.latitude, self.coordinate.longitude
            )));
        }
        Ok(())
    }
}

//! Client-side service layer for the events backend.
//!
//! # Overview
//! Bootstraps an anonymous session, creates and updates events, records
//! attendance and fetches the events inside a geographic region.
//!
//! # Design
//! - `EventClient` is stateless: `build_*` produces an `HttpRequest`,
//!   `parse_*` consumes an `HttpResponse`. No I/O.
//! - `ServiceClient` owns the orchestration: it executes requests through a
//!   `Transport`, bootstraps the session exactly once under concurrency and
//!   guards every authenticated call.
//! - `codec` is the single place where wire JSON meets the domain types.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod http;
pub mod region;
pub mod service;
pub mod session;
pub mod transport;
pub mod types;

pub use client::EventClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use region::{BoundingBox, Region, Span};
pub use service::ServiceClient;
pub use session::{Session, SessionStore};
pub use transport::{ReqwestTransport, Transport};
pub use types::{Coordinate, Event, User};

//! Async service client: session bootstrap plus the event operations.
//!
//! # Design
//! `ServiceClient` pairs the stateless `EventClient` with a `Transport` and
//! the shared `SessionStore`. Each public operation is an `async fn` whose
//! `Result` is the completion signal.
//!
//! Authenticated operations go through `authorize`, which returns the session
//! token and bootstraps first when there is none. Bootstrap is single-flight:
//! the first caller becomes the leader and issues `POST /users`; callers that
//! arrive while it is pending subscribe to a `watch` channel and receive the
//! leader's outcome instead of issuing their own request. The session is
//! written before the pending state is cleared and before the outcome is
//! published, so every caller told "logged in" can read the token.
//!
//! Session lifecycle: logged out → provisioning (a leader is in flight) →
//! logged in. A failed bootstrap returns to logged out; the next caller may
//! try again. Nothing here retries on its own.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::client::EventClient;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::{HttpRequest, HttpResponse};
use crate::region::Region;
use crate::session::SessionStore;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{Event, User};

type BootstrapOutcome = Result<(), ClientError>;

enum BootstrapState {
    Idle,
    Pending(watch::Receiver<Option<BootstrapOutcome>>),
}

enum BootstrapRole {
    AlreadyLoggedIn,
    Leader(watch::Sender<Option<BootstrapOutcome>>),
    Follower(watch::Receiver<Option<BootstrapOutcome>>),
}

/// Clears the pending bootstrap when the leader finishes or is dropped, so a
/// cancelled leader never wedges later callers.
struct ClearPending<'a> {
    state: &'a Mutex<BootstrapState>,
}

impl Drop for ClearPending<'_> {
    fn drop(&mut self) {
        *lock(self.state) = BootstrapState::Idle;
    }
}

fn lock(state: &Mutex<BootstrapState>) -> MutexGuard<'_, BootstrapState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Client for the events backend. Construct once and share it (by reference
/// or `Arc`) between callers.
pub struct ServiceClient<T> {
    api: EventClient,
    transport: T,
    session: Arc<SessionStore>,
    app_secret: Option<String>,
    bootstrap: Mutex<BootstrapState>,
}

impl ServiceClient<ReqwestTransport> {
    /// A client talking HTTP through `reqwest`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(config, transport))
    }
}

impl<T: Transport> ServiceClient<T> {
    /// Builds its own session store: persisted to `config.session_path()`
    /// when set, in memory otherwise.
    pub fn new(config: &ClientConfig, transport: T) -> Self {
        let session = match config.session_path() {
            Some(path) => SessionStore::persistent(path),
            None => SessionStore::new(),
        };
        Self::with_session(config, transport, Arc::new(session))
    }

    pub fn with_session(config: &ClientConfig, transport: T, session: Arc<SessionStore>) -> Self {
        Self {
            api: EventClient::new(&config.base_url),
            transport,
            session,
            app_secret: config.app_secret.clone(),
            bootstrap: Mutex::new(BootstrapState::Idle),
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Establish the anonymous session. A no-op when already logged in;
    /// joins the in-flight bootstrap when one is pending.
    ///
    /// Transport failures come back as `Network`; a rejected or unusable
    /// response as `Auth`.
    pub async fn bootstrap_session(&self) -> Result<(), ClientError> {
        match self.join_or_lead() {
            BootstrapRole::AlreadyLoggedIn => Ok(()),
            BootstrapRole::Follower(mut rx) => {
                tracing::debug!("waiting for in-flight session bootstrap");
                let outcome = rx.wait_for(Option::is_some).await.map(|value| (*value).clone());
                match outcome {
                    Ok(Some(outcome)) => outcome,
                    _ => Err(ClientError::Network("session bootstrap was abandoned".to_string()).into_auth()),
                }
            }
            BootstrapRole::Leader(tx) => {
                let pending = ClearPending { state: &self.bootstrap };
                let outcome = self.create_user().await;
                drop(pending);
                tx.send_replace(Some(outcome.clone()));
                outcome
            }
        }
    }

    /// Create `event` on the server. Returns the event with its assigned id
    /// and owner. An event that already has an id goes through `change_event`.
    pub async fn create_event(&self, event: &Event) -> Result<Event, ClientError> {
        if event.is_confirmed() {
            return Err(ClientError::InvalidEvent("event already created".to_string()));
        }
        event.validate()?;
        let token = self.authorize().await?;
        let request = self.api.build_create_event(event, &token)?;
        let response = self.send(request).await?;
        let owner = self.session.user_id().map(User::new);
        self.api.parse_create_event(response, event, owner)
    }

    /// Update a confirmed event. The returned event replaces the caller's copy.
    pub async fn change_event(&self, event: &Event) -> Result<Event, ClientError> {
        if !event.is_confirmed() {
            return Err(ClientError::MissingEventId);
        }
        event.validate()?;
        let token = self.authorize().await?;
        let request = self.api.build_change_event(event, &token)?;
        let response = self.send(request).await?;
        self.api.parse_change_event(response, event)
    }

    /// Events inside `region`. Needs no session.
    pub async fn fetch_events_in_region(&self, region: &Region) -> Result<Vec<Event>, ClientError> {
        let request = self.api.build_fetch_events(region);
        let response = self.send(request).await?;
        self.api.parse_fetch_events(response)
    }

    /// A single event by id. Needs no session.
    pub async fn fetch_event(&self, event_id: &str) -> Result<Event, ClientError> {
        let request = self.api.build_get_event(event_id)?;
        let response = self.send(request).await?;
        self.api.parse_get_event(response)
    }

    /// Record that the session user attends `event`.
    pub async fn create_attendance(&self, event: &Event) -> Result<(), ClientError> {
        if !event.is_confirmed() {
            return Err(ClientError::MissingEventId);
        }
        let token = self.authorize().await?;
        let request = self.api.build_create_attendance(event, &token)?;
        let response = self.send(request).await?;
        self.api.parse_create_attendance(response)
    }

    /// Guard for authenticated operations: the current token, bootstrapping
    /// first if needed. Any bootstrap failure is reported as `Auth`.
    async fn authorize(&self) -> Result<String, ClientError> {
        if let Some(token) = self.session.logged_in_token() {
            return Ok(token);
        }
        self.bootstrap_session().await.map_err(ClientError::into_auth)?;
        self.session
            .logged_in_token()
            .ok_or_else(|| ClientError::Decode("session incomplete after bootstrap".to_string()).into_auth())
    }

    fn join_or_lead(&self) -> BootstrapRole {
        let mut state = lock(&self.bootstrap);
        if let BootstrapState::Pending(rx) = &*state {
            return BootstrapRole::Follower(rx.clone());
        }
        if self.session.is_logged_in() {
            return BootstrapRole::AlreadyLoggedIn;
        }
        let (tx, rx) = watch::channel(None);
        *state = BootstrapState::Pending(rx);
        BootstrapRole::Leader(tx)
    }

    async fn create_user(&self) -> BootstrapOutcome {
        let request = self.api.build_create_user(self.app_secret.as_deref());
        let response = self.send(request).await?;
        let (user, token) = self.api.parse_create_user(response).map_err(|err| {
            tracing::warn!("session bootstrap rejected: {err}");
            err.into_auth()
        })?;
        if user.user_id.is_empty() || token.is_empty() {
            tracing::warn!("session bootstrap returned empty credentials");
            return Err(ClientError::Decode("empty user id or token".to_string()).into_auth());
        }
        self.session.set_credentials(user.user_id.as_str(), token);
        tracing::info!(user_id = %user.user_id, "session established");
        Ok(())
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let method = request.method.as_str();
        let path = request.path.clone();
        tracing::debug!(method, %path, "sending request");
        let result = self.transport.execute(request).await;
        match &result {
            Ok(response) => tracing::debug!(method, %path, status = response.status, "received response"),
            Err(err) => tracing::debug!(method, %path, "request failed: {err}"),
        }
        result
    }
}

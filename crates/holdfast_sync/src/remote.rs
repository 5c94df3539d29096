//! Remote transport abstraction.
//!
//! The engine drains the journal against a [`Remote`]. The shipped
//! implementation, [`RestRemote`], maps each change onto the backing
//! service's REST contract; the HTTP client itself is abstracted via a
//! trait so different libraries (reqwest, ureq, a platform fetch) can be
//! plugged in. [`MockRemote`] records calls for tests.

use crate::error::{SyncError, SyncResult};
use holdfast_store::{ChangeAction, PendingChange};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::Duration;

/// HTTP method for a remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// Create an entity.
    Post,
    /// Update an entity.
    Patch,
    /// Delete an entity.
    Delete,
}

impl HttpMethod {
    /// Returns the method name on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// One outbound HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// The HTTP method.
    pub method: HttpMethod,
    /// The full request URL.
    pub url: String,
    /// The request body, if any.
    pub body: Option<Vec<u8>>,
}

/// The response to an [`HttpRequest`].
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: u16,
    /// The response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns true for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns a short lossy-UTF-8 excerpt of the body for error messages.
    pub fn body_excerpt(&self) -> String {
        const MAX: usize = 200;
        String::from_utf8_lossy(&self.body).chars().take(MAX).collect()
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual transport. The client owns
/// its own request timeout; a timed-out call surfaces as an `Err`, which
/// the engine treats as a per-item failure.
pub trait HttpClient: Send + Sync {
    /// Sends a request and returns the response.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, String>;
}

/// What the drain engine replays the journal against.
pub trait Remote: Send + Sync {
    /// Applies one journal entry to the remote service.
    ///
    /// # Errors
    ///
    /// Returns an error if the call could not be delivered or the service
    /// answered with a non-success status.
    fn apply(&self, change: &PendingChange) -> SyncResult<()>;
}

/// REST mapping onto the backing service's create/update/delete contract.
///
/// | action | verb   | path                    | body    |
/// |--------|--------|-------------------------|---------|
/// | create | POST   | `/{route}/{entity_id}`  | payload |
/// | update | PATCH  | `/{route}/{entity_id}`  | payload |
/// | delete | DELETE | `/{route}/{entity_id}`  | -       |
///
/// Known entity types map to their plural routes; anything else falls back
/// to `/{entity_type}/{entity_id}`. Success is any 2xx status.
pub struct RestRemote<C: HttpClient> {
    base_url: String,
    client: C,
}

impl<C: HttpClient> RestRemote<C> {
    /// Creates a REST remote rooted at `base_url` (e.g. `"https://api.example.com/api"`).
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn route_for(entity_type: &str) -> &str {
        match entity_type {
            "presentation" => "presentations",
            "slide" => "slides",
            "block" => "blocks",
            other => other,
        }
    }

    fn request_for(&self, change: &PendingChange) -> HttpRequest {
        let method = match change.action {
            ChangeAction::Create => HttpMethod::Post,
            ChangeAction::Update => HttpMethod::Patch,
            ChangeAction::Delete => HttpMethod::Delete,
        };
        let body = match change.action {
            ChangeAction::Delete => None,
            _ => change.payload.clone(),
        };
        HttpRequest {
            method,
            url: format!(
                "{}/{}/{}",
                self.base_url,
                Self::route_for(&change.entity_type),
                change.entity_id
            ),
            body,
        }
    }
}

impl<C: HttpClient> Remote for RestRemote<C> {
    fn apply(&self, change: &PendingChange) -> SyncResult<()> {
        let request = self.request_for(change);
        let route = request.url.clone();

        let response = self.client.send(&request).map_err(SyncError::Transport)?;
        if !response.is_success() {
            return Err(SyncError::Rejected {
                route,
                status: response.status,
                detail: response.body_excerpt(),
            });
        }
        Ok(())
    }
}

/// A mock remote for testing.
///
/// Records every applied change in call order. Individual entities can be
/// scripted to fail, and an artificial latency can be added to hold a
/// drain pass in flight.
#[derive(Default)]
pub struct MockRemote {
    applied: Mutex<Vec<PendingChange>>,
    failing: Mutex<HashSet<String>>,
    latency: Option<Duration>,
}

impl MockRemote {
    /// Creates a mock remote that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock remote that sleeps in every call.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Makes every call for `entity_id` answer with a 500.
    pub fn fail_entity(&self, entity_id: impl Into<String>) {
        self.failing.lock().insert(entity_id.into());
    }

    /// Clears a scripted failure.
    pub fn recover_entity(&self, entity_id: &str) {
        self.failing.lock().remove(entity_id);
    }

    /// Returns every change applied so far, in call order.
    pub fn applied(&self) -> Vec<PendingChange> {
        self.applied.lock().clone()
    }

    /// Returns the number of calls made, including failed ones.
    pub fn call_count(&self) -> usize {
        self.applied.lock().len()
    }
}

impl Remote for MockRemote {
    fn apply(&self, change: &PendingChange) -> SyncResult<()> {
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        self.applied.lock().push(change.clone());
        if self.failing.lock().contains(&change.entity_id) {
            return Err(SyncError::Rejected {
                route: format!("/{}/{}", change.entity_type, change.entity_id),
                status: 500,
                detail: "scripted failure".into(),
            });
        }
        Ok(())
    }
}

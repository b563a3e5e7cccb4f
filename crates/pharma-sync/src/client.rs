//! # Remote Client
//!
//! Thin HTTP client for the spreadsheet endpoint.
//!
//! ```text
//! try_fetch / try_post      → SyncResult    (explicit actions, outbox replay)
//! fetch_collection / post_action → Option  (everyday reads and writes)
//! ```
//!
//! The `Option` forms never fail: an unconfigured endpoint, a transport
//! error, a non-2xx status, an unreadable body and `ok: false` all come back
//! as `None`, logged at `warn` (unconfigured is not logged at all). There is
//! no retry here; failed writes are the outbox's business.

use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::RemoteSettings;
use crate::error::{SyncError, SyncResult};
use crate::protocol::{Envelope, ReadAction, WriteRequest, WriteResponse};

#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    settings: RemoteSettings,
}

impl RemoteClient {
    pub fn new(settings: RemoteSettings) -> SyncResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(RemoteClient { http, settings })
    }

    pub fn settings(&self) -> &RemoteSettings {
        &self.settings
    }

    /// Whether an endpoint URL is one we will talk to.
    pub fn is_configured(&self, endpoint: &str) -> bool {
        self.settings.accepts(endpoint)
    }

    /// `GET <endpoint>?action=<name>`, returning the envelope's `data`.
    pub async fn try_fetch(&self, endpoint: &str, action: ReadAction) -> SyncResult<Value> {
        if !self.is_configured(endpoint) {
            return Err(SyncError::NotConfigured);
        }

        let mut url = Url::parse(endpoint)?;
        url.query_pairs_mut().append_pair("action", action.as_str());

        debug!(%action, "Fetching from endpoint");
        let envelope: Envelope = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(open(envelope)?.data)
    }

    /// `POST <endpoint>` with the request as a JSON body.
    pub async fn try_post(&self, endpoint: &str, request: &WriteRequest) -> SyncResult<WriteResponse> {
        if !self.is_configured(endpoint) {
            return Err(SyncError::NotConfigured);
        }

        let url = Url::parse(endpoint)?;

        debug!(action = request.action(), id = ?request.entity_id(), "Posting to endpoint");
        let envelope: Envelope = self
            .http
            .post(url)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let envelope = open(envelope)?;
        Ok(WriteResponse { id: envelope.id })
    }

    /// Reads a collection, or `None` when the endpoint cannot provide it.
    pub async fn fetch_collection(&self, endpoint: &str, action: ReadAction) -> Option<Value> {
        if !self.is_configured(endpoint) {
            return None;
        }
        match self.try_fetch(endpoint, action).await {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(%action, error = %e, "Remote read failed, using local cache");
                None
            }
        }
    }

    /// Sends a write, or `None` when it did not go through.
    pub async fn post_action(&self, endpoint: &str, request: &WriteRequest) -> Option<WriteResponse> {
        if !self.is_configured(endpoint) {
            return None;
        }
        match self.try_post(endpoint, request).await {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(action = request.action(), error = %e, "Remote write failed");
                None
            }
        }
    }
}

/// Turns `ok: false` into an error.
fn open(envelope: Envelope) -> SyncResult<Envelope> {
    if envelope.ok {
        Ok(envelope)
    } else {
        Err(SyncError::RemoteRejected(
            envelope
                .error
                .unwrap_or_else(|| "endpoint reported failure".to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> RemoteClient {
        RemoteClient::new(RemoteSettings::default()).unwrap()
    }

    #[tokio::test]
    async fn test_unconfigured_endpoint_is_silent() {
        let client = client();
        assert!(client.fetch_collection("", ReadAction::GetMedicines).await.is_none());

        let request = WriteRequest::DeleteMedicine { id: "m1".into() };
        assert!(client.post_action("http://localhost/exec", &request).await.is_none());
        assert!(matches!(
            client.try_post("", &request).await,
            Err(SyncError::NotConfigured)
        ));
    }

    #[test]
    fn test_open_envelope() {
        let ok = Envelope {
            ok: true,
            ..Default::default()
        };
        assert!(open(ok).is_ok());

        let rejected = Envelope {
            ok: false,
            error: Some("Sheet not found".into()),
            ..Default::default()
        };
        match open(rejected) {
            Err(SyncError::RemoteRejected(msg)) => assert_eq!(msg, "Sheet not found"),
            other => panic!("expected rejection, got {:?}", other),
        }
    }
}

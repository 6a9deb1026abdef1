// src/services/bluesky.rs

//! Bluesky posting client.
//!
//! Speaks the two XRPC calls the watcher needs: `createSession` for login and
//! `createRecord` to publish a feed post. The [`PostClient`] trait is the seam
//! the publishing pipeline is written against, so tests can substitute a fake.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::BlueskyConfig;
use crate::utils::http::create_client;

const USER_AGENT: &str = concat!("linewatch/", env!("CARGO_PKG_VERSION"));

const CREATE_SESSION: &str = "/xrpc/com.atproto.server.createSession";
const CREATE_RECORD: &str = "/xrpc/com.atproto.repo.createRecord";
const POST_COLLECTION: &str = "app.bsky.feed.post";

/// The posting operations consumed by the pipeline.
#[async_trait]
pub trait PostClient: Send + Sync {
    /// Establish an authenticated session.
    async fn login(&mut self, identifier: &str, password: &str) -> Result<()>;

    /// Publish one post with the given text.
    async fn send_post(&self, text: &str) -> Result<()>;
}

/// Authenticated session returned by `createSession`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_jwt: String,
    pub did: String,
    pub handle: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct CreateRecordRequest<'a> {
    repo: &'a str,
    collection: &'a str,
    record: PostRecordBody<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostRecordBody<'a> {
    #[serde(rename = "$type")]
    record_type: &'a str,
    text: &'a str,
    created_at: String,
}

/// XRPC client for one Bluesky account.
pub struct BlueskyClient {
    client: Client,
    service: String,
    session: Option<Session>,
}

impl BlueskyClient {
    /// Create a client for the configured service endpoint.
    pub fn new(config: &BlueskyConfig) -> Result<Self> {
        Ok(Self {
            client: create_client(USER_AGENT, config.timeout_secs)?,
            service: config.service.trim_end_matches('/').to_string(),
            session: None,
        })
    }

    /// The current session, if logged in.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.service, path)
    }

    async fn post_json<T: Serialize>(
        &self,
        path: &str,
        payload: &T,
        jwt: Option<&str>,
    ) -> Result<reqwest::Response> {
        let body = serde_json::to_string(payload)?;
        let mut request = self
            .client
            .post(self.endpoint(path))
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(jwt) = jwt {
            request = request.bearer_auth(jwt);
        }
        Ok(request.send().await?)
    }
}

#[async_trait]
impl PostClient for BlueskyClient {
    async fn login(&mut self, identifier: &str, password: &str) -> Result<()> {
        let request = LoginRequest { identifier, password };
        let response = self.post_json(CREATE_SESSION, &request, None).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::auth(format!("login failed ({status}): {body}")));
        }

        let body = response.text().await?;
        let session: Session = serde_json::from_str(&body)
            .map_err(|e| AppError::auth(format!("malformed session response: {e}")))?;
        log::info!("Logged in to {} as {}", self.service, session.handle);
        self.session = Some(session);
        Ok(())
    }

    async fn send_post(&self, text: &str) -> Result<()> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| AppError::auth("send_post called without a session"))?;

        let request = CreateRecordRequest {
            repo: &session.did,
            collection: POST_COLLECTION,
            record: PostRecordBody {
                record_type: POST_COLLECTION,
                text,
                created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        };
        let response = self
            .post_json(CREATE_RECORD, &request, Some(&session.access_jwt))
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::publish(format!("post failed ({status}): {body}")));
        }
        Ok(())
    }
}

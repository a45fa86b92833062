pub mod conv;
pub mod endpoints;
pub mod paginate;
pub mod store;
pub mod timestamp;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use crate::models::game::{GameRecord, PlayedGame, SubscriptionGame, UserInfo};
use endpoints::{Endpoints, PURCHASED_TOTAL_COUNT};

/// The backend returned data we couldn't make sense of. Never retried.
#[derive(Debug, Error, PartialEq)]
#[error("Unexpected response from PSN: {context}")]
pub struct MalformedResponse {
    pub context: String,
}

impl MalformedResponse {
    pub fn new(context: impl Into<String>) -> Self {
        MalformedResponse { context: context.into() }
    }
}

impl From<serde_json::Error> for MalformedResponse {
    fn from(e: serde_json::Error) -> Self {
        MalformedResponse::new(e.to_string())
    }
}

impl From<timestamp::FormatError> for MalformedResponse {
    fn from(e: timestamp::FormatError) -> Self {
        MalformedResponse::new(e.to_string())
    }
}

pub type ParseResult<T> = std::result::Result<T, MalformedResponse>;

#[derive(Debug, Error)]
pub enum PsnError {
    #[error(transparent)]
    MalformedResponse(#[from] MalformedResponse),
    #[error("No usable PSN session; a fresh login is required")]
    InvalidCredentials,
    #[error("PSN responded with HTTP {status} for {url}")]
    Backend { status: u16, url: String },
    #[error("An http error occurred contacting PSN: {0}")]
    Http(#[from] Box<ureq::Error>),
    #[error("An IO error occurred contacting PSN: {0}")]
    Io(#[from] std::io::Error),
    #[error("A background request did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, PsnError>;

/// Body of a successful response
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Decode the body as json rather than handing back raw text
    pub get_json: bool,
    /// Don't log failures; used where an empty or failed response is expected
    pub silent: bool,
}

impl Request {
    pub fn json(url: impl Into<String>) -> Request {
        Request { url: url.into(), headers: vec![], get_json: true, silent: false }
    }

    pub fn text(url: impl Into<String>) -> Request {
        Request { get_json: false, ..Request::json(url) }
    }

    pub fn header(mut self, name: &str, value: &str) -> Request {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn silent(mut self) -> Request {
        self.silent = true;
        self
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Ok(None) means the backend had nothing to say (empty body or json null); that isn't an error.
    async fn get(&self, request: Request) -> Result<Option<Payload>>;

    /// Visit the sign-in url so that the backend mints fresh session cookies from the stored ones.
    async fn refresh_cookies(&self, url: &str) -> Result<()>;
}

pub(crate) fn expect_json(payload: Option<Payload>) -> ParseResult<Value> {
    match payload {
        Some(Payload::Json(v)) => Ok(v),
        Some(Payload::Text(_)) => Err(MalformedResponse::new("expected json, got text")),
        None => Err(MalformedResponse::new("empty response")),
    }
}

pub struct PsnClient<T> {
    transport: T,
    endpoints: Endpoints,
}

impl<T: HttpTransport> PsnClient<T> {
    pub fn new(transport: T, endpoints: Endpoints) -> PsnClient<T> {
        PsnClient { transport, endpoints }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    async fn fetch_data<R, P>(&self, request: Request, parser: P) -> Result<R>
    where
        P: FnOnce(Option<Payload>) -> ParseResult<R>,
    {
        let response = self.transport.get(request).await?;
        parser(response).map_err(|e| {
            error!("Cannot parse data: {}", e);
            e.into()
        })
    }

    pub async fn refresh_cookies(&self) -> Result<()> {
        self.transport.refresh_cookies(&self.endpoints.refresh_url).await
    }

    pub async fn get_own_user_info(&self) -> Result<UserInfo> {
        self.fetch_data(self.endpoints.profile_request(), |payload| {
            let response = expect_json(payload)?;
            debug!("user profile data: {}", response);
            conv::parse_user_info(&response)
        })
        .await
    }

    pub async fn get_subscription_status(&self) -> Result<bool> {
        self.fetch_data(self.endpoints.profile_request(), |payload| {
            conv::parse_subscription_status(&expect_json(payload)?)
        })
        .await
    }

    pub async fn get_subscription_games(&self) -> Result<Vec<SubscriptionGame>> {
        self.fetch_data(self.endpoints.subscriptions_request(), |payload| match payload {
            Some(Payload::Text(html)) => store::parse_subscription_games(&html),
            Some(Payload::Json(_)) => Err(MalformedResponse::new("expected markup, got json")),
            None => Err(MalformedResponse::new("empty subscriptions page")),
        })
        .await
    }

    pub async fn get_purchased_games(&self) -> Result<Vec<GameRecord>> {
        paginate::fetch_paginated(
            &self.transport,
            conv::parse_purchased_games,
            |start, size| self.endpoints.purchased_request(start, size),
            PURCHASED_TOTAL_COUNT,
            self.endpoints.page_size,
        )
        .await
    }

    pub async fn get_played_games(&self) -> Result<Vec<PlayedGame>> {
        self.fetch_data(self.endpoints.played_request(), |payload| {
            conv::parse_played_games(&expect_json(payload)?)
        })
        .await
    }
}


use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};
use ureq::{Agent, AgentBuilder, Response};

use crate::psn::{HttpTransport, MalformedResponse, Payload, PsnError, Request, Result};

pub type Cookies = BTreeMap<String, String>;

type CookieListener = Box<dyn Fn(&Cookies) + Send + Sync>;

const MAX_REDIRECTS: usize = 10;
const TIMEOUT: Duration = Duration::from_secs(30);

/// Session cookies shared between the transport (the only writer) and anyone who wants to know
/// when they change, e.g. to persist them.
#[derive(Default)]
pub struct CookieJar {
    cookies: RwLock<Cookies>,
    listeners: RwLock<Vec<CookieListener>>,
    /// Held from applying an update until every listener has seen it, so listeners observe
    /// updates one at a time and in the order they were applied
    notifying: Mutex<()>,
}

impl CookieJar {
    pub fn new() -> CookieJar {
        CookieJar::default()
    }

    /// Listeners run synchronously on the updating thread and must not subscribe or update from
    /// inside the callback.
    pub fn subscribe(&self, listener: impl Fn(&Cookies) + Send + Sync + 'static) {
        self.listeners.write().push(Box::new(listener));
    }

    /// An empty value removes the cookie.
    pub fn update(&self, cookies: impl IntoIterator<Item = (String, String)>) {
        let _ordered = self.notifying.lock();

        let snapshot = {
            let mut current = self.cookies.write();
            for (name, value) in cookies {
                if value.is_empty() {
                    current.remove(&name);
                } else {
                    current.insert(name, value);
                }
            }
            current.clone()
        };

        for listener in self.listeners.read().iter() {
            listener(&snapshot);
        }
    }

    pub fn snapshot(&self) -> Cookies {
        self.cookies.read().clone()
    }

    /// Forget the session without telling listeners
    pub fn clear(&self) {
        self.cookies.write().clear();
    }

    fn header(&self) -> Option<String> {
        let cookies = self.cookies.read();
        if cookies.is_empty() {
            return None;
        }

        Some(
            cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ")
        )
    }
}

/// Name and value from a Set-Cookie header. A cookie the server is deleting (`Max-Age` of zero
/// or less, or an `Expires` in the past) comes back with an empty value; other attributes are
/// ignored.
fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut max_age = None;
    let mut expires = None;
    for (attribute, attr_value) in parts.filter_map(|attr| attr.split_once('=')) {
        let attr_value = attr_value.trim();
        match attribute.trim().to_ascii_lowercase().as_str() {
            "max-age" => max_age = attr_value.parse::<i64>().ok(),
            "expires" => expires = DateTime::parse_from_rfc2822(attr_value).ok(),
            _ => {}
        }
    }

    // Max-Age wins over Expires when both are present
    let deleted = match (max_age, expires) {
        (Some(age), _) => age <= 0,
        (None, Some(at)) => at.with_timezone(&Utc) < Utc::now(),
        (None, None) => false,
    };

    let value = if deleted { String::new() } else { value.trim().to_string() };
    Some((name.to_string(), value))
}

fn resolve_location(current: &str, location: &str) -> String {
    if location.starts_with("http://") || location.starts_with("https://") {
        return location.to_string();
    }

    let origin_end = current
        .find("://")
        .and_then(|scheme| current[scheme + 3..].find('/').map(|path| scheme + 3 + path))
        .unwrap_or(current.len());

    if location.starts_with('/') {
        format!("{}{}", &current[..origin_end], location)
    } else {
        let base = current.rfind('/').filter(|&i| i >= origin_end).unwrap_or(origin_end);
        format!("{}/{}", &current[..base], location)
    }
}

fn status_error(code: u16, url: &str) -> PsnError {
    match code {
        401 | 403 => PsnError::InvalidCredentials,
        _ => PsnError::Backend { status: code, url: url.to_string() },
    }
}

/// Blocking http client for the PSN web api. Calls are moved onto tokio's blocking pool so the
/// async side can fan requests out.
pub struct UreqTransport {
    agent: Agent,
    no_redirects: Agent,
    cookies: Arc<CookieJar>,
}

impl UreqTransport {
    pub fn new(cookies: Arc<CookieJar>) -> UreqTransport {
        UreqTransport {
            agent: AgentBuilder::new().timeout(TIMEOUT).build(),
            no_redirects: AgentBuilder::new().timeout(TIMEOUT).redirects(0).build(),
            cookies,
        }
    }

    fn store_cookies(cookies: &CookieJar, response: &Response) {
        let updated: Vec<(String, String)> = response
            .all("set-cookie")
            .into_iter()
            .filter_map(parse_set_cookie)
            .collect();

        if !updated.is_empty() {
            debug!(count = updated.len(), "Cookies updated");
            cookies.update(updated);
        }
    }

    fn call(agent: &Agent, cookies: &CookieJar, request: &Request) -> Result<Option<Payload>> {
        let mut req = agent.get(&request.url);
        for (name, value) in &request.headers {
            req = req.set(name, value);
        }
        if let Some(header) = cookies.header() {
            req = req.set("Cookie", &header);
        }

        let response = match req.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => return Err(status_error(code, &request.url)),
            Err(e) => return Err(PsnError::Http(Box::new(e))),
        };
        UreqTransport::store_cookies(cookies, &response);

        let body = response.into_string()?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        if !request.get_json {
            return Ok(Some(Payload::Text(body)));
        }

        match serde_json::from_str::<serde_json::Value>(&body).map_err(MalformedResponse::from)? {
            serde_json::Value::Null => Ok(None),
            json => Ok(Some(Payload::Json(json))),
        }
    }

    fn follow_sign_in(agent: &Agent, cookies: &CookieJar, url: &str) -> Result<()> {
        let mut url = url.to_string();

        for _ in 0..MAX_REDIRECTS {
            let mut req = agent.get(&url);
            if let Some(header) = cookies.header() {
                req = req.set("Cookie", &header);
            }

            let response = match req.call() {
                Ok(response) => response,
                Err(ureq::Error::Status(code, _)) => return Err(status_error(code, &url)),
                Err(e) => return Err(PsnError::Http(Box::new(e))),
            };
            UreqTransport::store_cookies(cookies, &response);

            match response.header("location") {
                Some(location) if (300..400).contains(&response.status()) => {
                    url = resolve_location(&url, location);
                }
                _ => return Ok(()),
            }
        }

        warn!("Gave up refreshing cookies after {} redirects", MAX_REDIRECTS);
        Ok(())
    }
}

#[async_trait]
impl HttpTransport for UreqTransport {
    async fn get(&self, request: Request) -> Result<Option<Payload>> {
        let agent = self.agent.clone();
        let cookies = self.cookies.clone();
        let silent = request.silent;
        let url = request.url.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            UreqTransport::call(&agent, &cookies, &request)
        }).await?;

        if let Err(e) = &outcome {
            if !silent {
                warn!(url = %url, "Request to PSN failed: {}", e);
            }
        }

        outcome
    }

    async fn refresh_cookies(&self, url: &str) -> Result<()> {
        let agent = self.no_redirects.clone();
        let cookies = self.cookies.clone();
        let url = url.to_string();

        tokio::task::spawn_blocking(move || {
            UreqTransport::follow_sign_in(&agent, &cookies, &url)
        }).await?
    }
}

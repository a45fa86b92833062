use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, warn};

use crate::credentials::StoredCredentials;
use crate::plugin::{GameTimeContext, Plugin};
use crate::psn::PsnError;

/// One line of input from the host
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct HostRequest {
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct HostError {
    pub code: String,
    pub message: String,
}

impl HostError {
    fn new(code: &str, message: impl Into<String>) -> HostError {
        HostError { code: code.to_string(), message: message.into() }
    }
}

impl From<PsnError> for HostError {
    fn from(e: PsnError) -> Self {
        let code = match &e {
            PsnError::InvalidCredentials => "invalid_credentials",
            PsnError::MalformedResponse(_) => "malformed_response",
            _ => "backend_error",
        };
        HostError::new(code, e.to_string())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct HostResponse {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<HostError>,
}

#[derive(Deserialize)]
struct AuthenticateParams {
    #[serde(default)]
    stored_credentials: Option<StoredCredentials>,
}

#[derive(Deserialize)]
struct SubscriptionGamesParams {
    subscription_name: String,
}

#[derive(Deserialize)]
struct GameTimesParams {
    #[serde(default)]
    game_ids: Vec<String>,
}

#[derive(Deserialize)]
struct GameTimeParams {
    game_id: String,
}

fn params<P: for<'de> Deserialize<'de>>(raw: Value) -> Result<P, HostError> {
    // Methods without params accept a missing object
    let raw = if raw.is_null() { Value::Object(Default::default()) } else { raw };
    serde_json::from_value(raw).map_err(|e| HostError::new("invalid_request", e.to_string()))
}

fn to_result<T: Serialize>(outcome: Result<T, PsnError>) -> Result<Value, HostError> {
    let value = outcome?;
    serde_json::to_value(value).map_err(|e| HostError::new("backend_error", e.to_string()))
}

/// Serves one plugin to a host over a line based json channel. Game time lookups use the
/// context from the most recent `prepare_game_times_context`.
pub struct HostSession<P> {
    plugin: P,
    game_times: GameTimeContext,
    finished: bool,
}

impl<P: Plugin> HostSession<P> {
    pub fn new(plugin: P) -> HostSession<P> {
        HostSession { plugin, game_times: GameTimeContext::new(), finished: false }
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    async fn dispatch(&mut self, method: &str, raw: Value) -> Result<Value, HostError> {
        match method {
            "authenticate" => {
                let p: AuthenticateParams = params(raw)?;
                to_result(self.plugin.authenticate(p.stored_credentials).await)
            }
            "pass_login_credentials" => to_result(self.plugin.pass_login_credentials().await),
            "get_subscriptions" => to_result(self.plugin.get_subscriptions().await),
            "get_subscription_games" => {
                let p: SubscriptionGamesParams = params(raw)?;
                to_result(self.plugin.get_subscription_games(&p.subscription_name).await)
            }
            "prepare_game_times_context" => {
                let p: GameTimesParams = params(raw)?;
                self.game_times = self.plugin.prepare_game_times_context(&p.game_ids).await?;
                Ok(Value::Null)
            }
            "get_game_time" => {
                let p: GameTimeParams = params(raw)?;
                to_result(self.plugin.get_game_time(&p.game_id, &self.game_times).await)
            }
            "get_owned_games" => to_result(self.plugin.get_owned_games().await),
            "shutdown" => {
                self.plugin.shutdown().await;
                self.finished = true;
                Ok(Value::Null)
            }
            other => Err(HostError::new("invalid_request", format!("unknown method {}", other))),
        }
    }

    pub async fn handle(&mut self, request: HostRequest) -> HostResponse {
        debug!(method = %request.method, "Host request");

        match self.dispatch(&request.method, request.params).await {
            Ok(result) => HostResponse { id: request.id, result: Some(result), error: None },
            Err(e) => {
                warn!(method = %request.method, code = %e.code, "Request failed: {}", e.message);
                HostResponse { id: request.id, result: None, error: Some(e) }
            }
        }
    }

    /// Answer requests until the host asks us to shut down or closes the channel.
    pub async fn serve<R, W>(&mut self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while !self.finished {
            let Some(line) = lines.next_line().await? else { break };
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<HostRequest>(&line) {
                Ok(request) => self.handle(request).await,
                Err(e) => {
                    error!("Unreadable host request: {}", e);
                    HostResponse {
                        id: Value::Null,
                        result: None,
                        error: Some(HostError::new("invalid_request", e.to_string())),
                    }
                }
            };

            let mut out = serde_json::to_vec(&response)?;
            out.push(b'\n');
            writer.write_all(&out).await?;
            writer.flush().await?;
        }

        Ok(())
    }
}

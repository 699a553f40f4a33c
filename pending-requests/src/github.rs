//! GitHub repository loading for the demo binary
//!
//! `LOAD_REPOS` actions for one user, a transport fetching the repo list, and
//! the `githubRepos` slice reducer that tracks each user's load.

use async_trait::async_trait;
use pending_requests::lifecycle::{RequestActions, RequestTransport};
use pending_requests::Action;
use reqwest::header::USER_AGENT;
use serde_json::{json, Map, Value};
use std::fmt;
use std::time::Duration;

pub const REPOS_SLICE: &str = "githubRepos";

const LOAD_REPOS: &str = "LOAD_REPOS";

pub fn repos_url(api_base: &str, user_id: &str) -> String {
    format!("{}/users/{}/repos", api_base, user_id)
}

// =====================================================
// Transport
// =====================================================

#[derive(Debug)]
pub enum FetchError {
    /// The server answered with a non-2xx status
    Status { status: u16, reason: String },
    /// The request could not be sent or the response not received
    Transport(reqwest::Error),
    /// The body was not valid JSON
    Decode(reqwest::Error),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Status { status, reason } => write!(f, "{} {}", status, reason),
            FetchError::Transport(e) => write!(f, "Request failed: {}", e),
            FetchError::Decode(e) => write!(f, "Invalid response body: {}", e),
        }
    }
}

impl std::error::Error for FetchError {}

pub struct GithubClient {
    http: reqwest::Client,
    /// Artificial delay after each fetch so the pending state stays visible
    delay: Duration,
}

impl GithubClient {
    pub fn new(delay: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            delay,
        }
    }
}

#[async_trait]
impl RequestTransport for GithubClient {
    type Response = Value;
    type Error = FetchError;

    async fn perform(&self, url: &str) -> Result<Value, FetchError> {
        log::info!("[GITHUB] GET {}", url);

        let response = self
            .http
            .get(url)
            .header(USER_AGENT, "pending-requests-demo")
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response.json::<Value>().await.map_err(FetchError::Decode)?;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(body)
    }
}

// =====================================================
// Actions
// =====================================================

pub struct LoadRepos {
    user_id: String,
}

impl LoadRepos {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

impl RequestActions for LoadRepos {
    type Response = Value;
    type Error = FetchError;

    fn begin(&self) -> Action {
        Action::new(LOAD_REPOS).with_field("payload", json!({ "userId": self.user_id }))
    }

    fn success(&self, response: Value) -> Action {
        Action::new(LOAD_REPOS).with_field(
            "payload",
            json!({ "userId": self.user_id, "response": response }),
        )
    }

    fn failure(&self, error: FetchError) -> Action {
        Action::new(LOAD_REPOS)
            .with_field("error", json!(error.to_string()))
            .with_field("payload", json!({ "userId": self.user_id }))
    }
}

// =====================================================
// Slice
// =====================================================

/// `githubRepos[userId] = { loading, error, resp }`
pub fn repos_reducer(state: &Value, action: &Action) -> Value {
    if action.kind != LOAD_REPOS {
        return state.clone();
    }

    let payload = action.field("payload");
    let Some(user_id) = payload.and_then(|p| p.get("userId")).and_then(Value::as_str) else {
        return state.clone();
    };

    let done = action.is_request_done();
    let error = action.field("error").filter(|_| done).cloned();
    let resp = if done && error.is_none() {
        payload.and_then(|p| p.get("response")).cloned()
    } else {
        None
    };

    let mut repos = state.as_object().cloned().unwrap_or_default();
    repos.insert(
        user_id.to_string(),
        json!({ "loading": !done, "error": error, "resp": resp }),
    );
    Value::Object(repos)
}

/// Per user: `"Loading..."`, the error, or the list of repo names
pub fn format_repos(repos: &Value) -> Value {
    let mut out = Map::new();

    if let Some(users) = repos.as_object() {
        for (user, entry) in users {
            let formatted = if entry["loading"].as_bool().unwrap_or(false) {
                json!("Loading...")
            } else if !entry["error"].is_null() {
                entry["error"].clone()
            } else if let Some(resp) = entry["resp"].as_array() {
                Value::Array(
                    resp.iter()
                        .map(|repo| repo.get("name").cloned().unwrap_or_else(|| repo.clone()))
                        .collect(),
                )
            } else {
                Value::Null
            };
            out.insert(user.clone(), formatted);
        }
    }

    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pending_requests::RequestTag;

    fn tagged(action: Action, done: bool) -> Action {
        let url = repos_url("https://api.github.com", "idolize");
        action.with_request_tag(RequestTag { url, done })
    }

    #[test]
    fn test_repos_url() {
        assert_eq!(
            repos_url("https://api.github.com", "idolize"),
            "https://api.github.com/users/idolize/repos"
        );
    }

    #[test]
    fn test_load_repos_actions() {
        let actions = LoadRepos::new("idolize");

        assert_eq!(
            serde_json::to_value(actions.begin()).unwrap(),
            json!({ "type": "LOAD_REPOS", "payload": { "userId": "idolize" } })
        );

        let failure = actions.failure(FetchError::Status {
            status: 404,
            reason: "Not Found".to_string(),
        });
        assert_eq!(failure.field("error"), Some(&json!("404 Not Found")));
    }

    #[test]
    fn test_repos_reducer_lifecycle() {
        let actions = LoadRepos::new("idolize");

        let loading = repos_reducer(&Value::Null, &tagged(actions.begin(), false));
        assert_eq!(loading["idolize"]["loading"], json!(true));
        assert_eq!(format_repos(&loading), json!({ "idolize": "Loading..." }));

        let loaded = repos_reducer(
            &loading,
            &tagged(actions.success(json!([{ "name": "redux-pending" }, "bare"])), true),
        );
        assert_eq!(loaded["idolize"]["loading"], json!(false));
        assert_eq!(format_repos(&loaded), json!({ "idolize": ["redux-pending", "bare"] }));
    }

    #[test]
    fn test_repos_reducer_failure() {
        let actions = LoadRepos::new("idolize");
        let failure = actions.failure(FetchError::Status {
            status: 500,
            reason: "Internal Server Error".to_string(),
        });

        let failed = repos_reducer(&Value::Null, &tagged(failure, true));
        assert_eq!(failed["idolize"]["resp"], Value::Null);
        assert_eq!(
            format_repos(&failed),
            json!({ "idolize": "500 Internal Server Error" })
        );
    }

    #[test]
    fn test_repos_reducer_ignores_other_actions() {
        let state = json!({ "idolize": { "loading": true, "error": null, "resp": null } });
        assert_eq!(repos_reducer(&state, &Action::new("OTHER")), state);
        assert_eq!(repos_reducer(&state, &Action::new(LOAD_REPOS)), state);
    }
}

//! Pending Requests demo: fires several loads of the same GitHub repo list per
//! user in one tick and shows that only one request per URL goes out.
//!
//! Configuration comes from the environment (or `.env`); see `config.rs`.

mod github;

use github::{GithubClient, LoadRepos, REPOS_SLICE};
use pending_requests::config::Config;
use pending_requests::lifecycle::spawn_transport_request;
use pending_requests::middleware::builtin::{LoggingStage, RequestGate};
use pending_requests::store::{AppState, CombinedReducer, Store};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();

    let reducer = CombinedReducer::new().with_slice(REPOS_SLICE, github::repos_reducer);
    let store = Arc::new(Store::new(AppState::default(), reducer));

    store.pipeline().register(Arc::new(RequestGate::new()));
    store
        .pipeline()
        .register(Arc::new(LoggingStage::with_level(config.dispatch_log_level)));
    for stage_config in config.stage_overrides.iter().cloned() {
        store.pipeline().configure(stage_config);
    }
    log::info!("Registered {} pipeline stages", store.pipeline().stage_count());

    let client = Arc::new(GithubClient::new(Duration::from_millis(config.request_delay_ms)));

    let mut handles = Vec::new();
    for user_id in &config.demo_users {
        let url = github::repos_url(&config.github_api_base, user_id);
        let actions = Arc::new(LoadRepos::new(user_id));

        for attempt in 1..=config.demo_attempts {
            match spawn_transport_request(url.clone(), actions.clone(), client.clone(), store.clone()) {
                Some(handle) => handles.push(handle),
                None => log::info!(
                    "Load {} for {} suppressed: request already in flight",
                    attempt,
                    user_id
                ),
            }
        }
    }

    {
        let state = store.get_state();
        log::info!(
            "Pending requests: {}",
            serde_json::to_string(&state.requests).unwrap_or_default()
        );
        log::info!(
            "Repos: {}",
            github::format_repos(state.slice(REPOS_SLICE).unwrap_or(&Value::Null))
        );
    }

    log::info!("Waiting for {} request(s)", handles.len());
    for handle in handles {
        if let Err(e) = handle.await {
            log::error!("Request task failed: {}", e);
        }
    }

    let state = store.snapshot();
    let summary = json!({
        "requests": state.requests,
        "repos": github::format_repos(state.slice(REPOS_SLICE).unwrap_or(&Value::Null)),
        "stages": store.pipeline().get_all_stats(),
    });

    match serde_json::to_string_pretty(&summary) {
        Ok(output) => println!("{}", output),
        Err(e) => log::error!("Failed to render summary: {}", e),
    }
}

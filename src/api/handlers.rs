//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::{
    services::{Notification, Tab},
    state::{AppState, HostEvent, TabId},
};
use super::{
    commands::{Command, CommandResponse},
    responses::{HealthResponse, OpenTabRequest, StatusResponse, TabRemovedResponse},
};

fn respond(result: Result<Option<CommandResponse>, String>) -> Result<Response, StatusCode> {
    match result {
        Ok(Some(response)) => Ok(Json(response).into_response()),
        Ok(None) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(e) => {
            error!("Failed to apply event: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /command - Run a timer command
pub async fn command_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<Value>,
) -> Result<Response, StatusCode> {
    let command = match Command::from_request(request) {
        Ok(Some(command)) => command,
        Ok(None) => {
            debug!("Ignoring request without a known action");
            return Ok(StatusCode::NO_CONTENT.into_response());
        }
        Err(e) => {
            warn!("Rejected command: {}", e);
            return Ok(Json(CommandResponse::rejected(e)).into_response());
        }
    };

    respond(state.dispatch(HostEvent::Command(command)))
}

/// Handle POST /tabs - Open a tab in the host
pub async fn open_tab_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OpenTabRequest>,
) -> Result<Json<Tab>, StatusCode> {
    if request.url.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    state.tabs.open(&request.url, request.title).map(Json).map_err(|e| {
        error!("Failed to open tab: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Handle GET /tabs - List open tabs
pub async fn list_tabs_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Tab>>, StatusCode> {
    state.tabs.list().map(Json).map_err(|e| {
        error!("Failed to list tabs: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Handle DELETE /tabs/:tab_id - The user closed a tab
pub async fn remove_tab_handler(
    State(state): State<Arc<AppState>>,
    Path(tab_id): Path<u32>,
) -> Result<Json<TabRemovedResponse>, StatusCode> {
    let tab_id = TabId(tab_id);
    let removed = match state.tabs.remove(tab_id) {
        Ok(tab) => tab.is_some(),
        Err(e) => {
            error!("Failed to remove tab {}: {}", tab_id, e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };
    info!("Tab {} removed by host", tab_id);

    // The timer is cleared even for tabs this host never opened
    if let Err(e) = state.dispatch(HostEvent::TabRemoved(tab_id)) {
        error!("Failed to clear timer for tab {}: {}", tab_id, e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    Ok(Json(TabRemovedResponse { tab_id, removed }))
}

/// Handle GET /notifications - Recent notifications
pub async fn notifications_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Notification>> {
    Json(state.notifier.recent())
}

/// Handle POST /notifications/:notification_id/buttons/:button_index
pub async fn notification_button_handler(
    State(state): State<Arc<AppState>>,
    Path((notification_id, button_index)): Path<(String, usize)>,
) -> Result<Response, StatusCode> {
    debug!("Button {} clicked on {}", button_index, notification_id);
    respond(state.dispatch(HostEvent::NotificationButton {
        notification_id,
        button_index,
    }))
}

/// Handle GET /status - Return current service status
pub async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, StatusCode> {
    let tracked_timers = match state.timer_count() {
        Ok(count) => count,
        Err(e) => {
            error!("Failed to read timer registry: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let open_tabs = match state.tabs.list() {
        Ok(tabs) => tabs.len(),
        Err(e) => {
            error!("Failed to list tabs: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    Ok(Json(StatusResponse {
        tracked_timers,
        pending_wake_ups: state.scheduler.list_pending(),
        open_tabs,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request},
        Router,
    };
    use clap::Parser;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::{api::create_router, config::Config, services::test_support::FakeScheduler};
    use super::*;

    fn app() -> (Router, Arc<AppState>) {
        let config = Config::try_parse_from(["fade-that"]).unwrap();
        let state = Arc::new(AppState::new(&config, Arc::new(FakeScheduler::default())));
        (create_router(Arc::clone(&state)), state)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn command_round_trip() {
        let (app, _) = app();

        let (status, tab) = send(
            &app,
            Method::POST,
            "/tabs",
            Some(json!({"url": "https://example.com", "title": "Example"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let tab_id = tab["id"].as_u64().unwrap();

        let (_, started) = send(
            &app,
            Method::POST,
            "/command",
            Some(json!({"action": "startTimer", "tabId": tab_id, "duration": 120})),
        )
        .await;
        assert_eq!(started, json!({"success": true}));

        let (_, status_list) = send(
            &app,
            Method::POST,
            "/command",
            Some(json!({"action": "getTimerStatus"})),
        )
        .await;
        assert_eq!(status_list["tabsWithTimers"][0]["tabTitle"], "Example");

        let (_, service) = send(&app, Method::GET, "/status", None).await;
        assert_eq!(service["trackedTimers"], 1);
        assert_eq!(service["pendingWakeUps"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_action_gets_no_content() {
        let (app, _) = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/command",
            Some(json!({"action": "reloadExtension"})),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn malformed_command_is_rejected_in_body() {
        let (app, _) = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/command",
            Some(json!({"action": "extendTimer", "tabId": "seven", "additionalTime": 60})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn removing_tab_clears_timer() {
        let (app, state) = app();
        send(
            &app,
            Method::POST,
            "/command",
            Some(json!({"action": "startTimer", "tabId": 12, "duration": 60})),
        )
        .await;

        let (status, body) = send(&app, Method::DELETE, "/tabs/12", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"tabId": 12, "removed": false}));
        assert_eq!(state.timer_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn notification_buttons_relay_commands() {
        let (app, state) = app();
        send(
            &app,
            Method::POST,
            "/command",
            Some(json!({"action": "startTimer", "tabId": 3, "duration": 200})),
        )
        .await;

        let (_, notifications) = send(&app, Method::GET, "/notifications", None).await;
        let created_id = notifications[0]["id"].as_str().unwrap().to_string();
        assert_eq!(notifications[0]["title"], "Timer Started");

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/notifications/{}/buttons/0", created_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/notifications/{}/buttons/1", created_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));
        assert_eq!(state.timer_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _) = app();
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}

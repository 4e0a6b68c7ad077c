use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex, Notify};
use tokio::time::{sleep, Duration};
use tower_http::cors::CorsLayer;

use crate::dispatch::{ChannelSink, Dispatcher, HapticCommand};
use crate::engine::HapticEngine;
use crate::error::ConfigError;
use crate::health::TelemetryHealth;
use crate::reaction::LogEntry;
use crate::status::LiveStatus;
use crate::types::Setpoint;
use crate::zones::{Zone, ZoneSet};

const COMMAND_BUFFER: usize = 256;

/// The engine and its dispatcher, updated under one lock so commands leave
/// in the order the engine produced them.
pub struct Station {
    pub engine: HapticEngine,
    pub dispatcher: Dispatcher<ChannelSink>,
}

#[derive(Clone)]
pub struct AppState {
    station: Arc<Mutex<Station>>,
    commands: broadcast::Sender<String>,
    deadline_changed: Arc<Notify>,
    pub health: TelemetryHealth,
    output_dir: PathBuf,
    started: Instant,
}

impl AppState {
    pub fn new(engine: HapticEngine, health: TelemetryHealth, output_dir: PathBuf) -> Self {
        let (commands, _) = broadcast::channel(COMMAND_BUFFER);
        let dispatcher = Dispatcher::new(ChannelSink::new(commands.clone()));
        Self {
            station: Arc::new(Mutex::new(Station { engine, dispatcher })),
            commands,
            deadline_changed: Arc::new(Notify::new()),
            health,
            output_dir,
            started: Instant::now(),
        }
    }

    /// Outbound command JSON, as seen by a bridge socket
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.commands.subscribe()
    }

    /// Run one inbound telemetry frame through the engine and send what it
    /// produced.
    pub async fn ingest(&self, text: &str) -> Vec<HapticCommand> {
        let mut station = self.station.lock().await;
        let accepted_before = station.engine.stats().samples_accepted;
        let commands = station.engine.process_json(text, Utc::now());
        if station.engine.stats().samples_accepted > accepted_before {
            self.health.update();
        }
        station.dispatcher.dispatch_all(&commands);
        drop(station);

        self.deadline_changed.notify_one();
        commands
    }

    pub async fn status(&self) -> LiveStatus {
        let station = self.station.lock().await;
        let mut status = LiveStatus::capture(
            &station.engine,
            &self.health.report(),
            self.started.elapsed().as_secs(),
        );
        status.commands_sent = station.dispatcher.sent_count();
        status.commands_failed = station.dispatcher.failed_count();
        status
    }

    async fn apply<F>(&self, change: F) -> Result<Vec<HapticCommand>, ConfigError>
    where
        F: FnOnce(&mut HapticEngine) -> Result<Vec<HapticCommand>, ConfigError>,
    {
        let mut station = self.station.lock().await;
        let commands = change(&mut station.engine)?;
        station.dispatcher.dispatch_all(&commands);
        drop(station);

        self.deadline_changed.notify_one();
        Ok(commands)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/scenario", post(scenario_handler))
        .route("/setpoint", post(setpoint_handler))
        .route("/zones", post(zones_handler))
        .route("/session/start", post(session_start_handler))
        .route("/session/stop", post(session_stop_handler))
        .route("/log", get(log_handler))
        .route("/log.csv", get(log_csv_handler))
        .route("/status", get(status_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the station until the listener fails
pub async fn start_server(state: AppState, port: u16) -> anyhow::Result<()> {
    tokio::spawn(decay_timer_task(state.clone()));
    tokio::spawn(status_writer_task(state.clone()));

    let app = router(state);
    let addr = format!("0.0.0.0:{}", port);
    log::info!("[SERVER] Station listening at http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Fires vibration decay. Sleeps until the engine's next deadline and is
/// woken early whenever that deadline may have moved.
pub async fn decay_timer_task(state: AppState) {
    loop {
        let deadline = state.station.lock().await.engine.next_deadline();
        match deadline {
            Some(deadline) => {
                let wait = (deadline - Utc::now()).to_std().unwrap_or_default();
                tokio::select! {
                    _ = sleep(wait) => {
                        let mut station = state.station.lock().await;
                        let commands = station.engine.fire_due(Utc::now());
                        station.dispatcher.dispatch_all(&commands);
                    }
                    _ = state.deadline_changed.notified() => {}
                }
            }
            None => state.deadline_changed.notified().await,
        }
    }
}

async fn status_writer_task(state: AppState) {
    let path = state.output_dir.join("live_status.json");
    loop {
        sleep(Duration::from_secs(2)).await;
        if !state.output_dir.exists() {
            continue;
        }
        if let Err(e) = state.status().await.save(&path) {
            log::warn!("[SERVER] Could not save {}: {}", path.display(), e);
        }
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    log::info!("[SERVER] Bridge connected");
    let (mut sender, mut receiver) = socket.split();
    let mut commands = state.subscribe();

    let mut send_task = tokio::spawn(async move {
        loop {
            match commands.recv().await {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("[SERVER] Bridge lagging, {} commands dropped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => {
                    recv_state.ingest(&text).await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    log::info!("[SERVER] Bridge disconnected");
}

#[derive(Deserialize)]
struct ScenarioRequest {
    scenario: String,
}

#[derive(Deserialize)]
struct ZonesRequest {
    zones: Vec<Zone>,
}

#[derive(Serialize)]
struct CommandsResponse {
    scenario: String,
    commands: Vec<HapticCommand>,
}

fn config_error(e: ConfigError) -> Response {
    let status = match e {
        ConfigError::UnknownScenario(_) => StatusCode::NOT_FOUND,
        ConfigError::TooManyBoundaries { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

async fn scenario_handler(
    State(state): State<AppState>,
    Json(request): Json<ScenarioRequest>,
) -> Response {
    match state
        .apply(|engine| engine.switch_scenario(&request.scenario))
        .await
    {
        Ok(commands) => Json(CommandsResponse {
            scenario: request.scenario,
            commands,
        })
        .into_response(),
        Err(e) => config_error(e),
    }
}

async fn zones_handler(State(state): State<AppState>, Json(request): Json<ZonesRequest>) -> Response {
    let mut scenario = String::new();
    let result = state
        .apply(|engine| {
            scenario = engine.scenario().to_string();
            engine.reload_zones(ZoneSet::new(scenario.clone(), request.zones))
        })
        .await;
    match result {
        Ok(commands) => Json(CommandsResponse { scenario, commands }).into_response(),
        Err(e) => config_error(e),
    }
}

async fn setpoint_handler(
    State(state): State<AppState>,
    Json(setpoint): Json<Setpoint>,
) -> StatusCode {
    if !setpoint.thrust.is_finite() || !setpoint.angle.is_finite() {
        return StatusCode::UNPROCESSABLE_ENTITY;
    }
    state.station.lock().await.engine.set_setpoint(setpoint);
    StatusCode::NO_CONTENT
}

async fn session_start_handler(State(state): State<AppState>) -> StatusCode {
    state.station.lock().await.engine.start_session(Utc::now());
    log::info!("[SERVER] Session started");
    StatusCode::NO_CONTENT
}

async fn session_stop_handler(State(state): State<AppState>) -> Response {
    let export = state.station.lock().await.engine.end_session(Utc::now());
    let entries = export.entries.len();

    let dir = state.output_dir.clone();
    let written = tokio::task::spawn_blocking(move || export.write_to_dir(&dir)).await;
    match written {
        Ok(Ok(path)) => {
            log::info!("[SERVER] Session exported to {} ({} entries)", path.display(), entries);
            Json(json!({ "path": path, "entries": entries })).into_response()
        }
        Ok(Err(e)) => {
            log::error!("[SERVER] Session export failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn log_handler(State(state): State<AppState>) -> Json<Vec<LogEntry>> {
    Json(state.station.lock().await.engine.log().to_vec())
}

async fn log_csv_handler(State(state): State<AppState>) -> impl IntoResponse {
    let csv = state
        .station
        .lock()
        .await
        .engine
        .session_snapshot(Utc::now())
        .to_csv();
    ([(header::CONTENT_TYPE, "text/csv")], csv)
}

async fn status_handler(State(state): State<AppState>) -> Json<LiveStatus> {
    Json(state.status().await)
}

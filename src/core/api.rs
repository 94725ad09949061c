//! HTTP API for the LED controller
//!
//! Endpoints:
//! - POST /signal - Apply `{"step": 2..7, "state": "IDLE"|"CURRENT"|"COMPLETED"}`
//! - POST /reset - Clear every latch and state
//! - GET /health - Displayed state (current step, completed latches)

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::core::config::ControllerConfig;
use crate::core::controller::{LedController, LedOutput, MonotonicClock};
use crate::types::{Ack, ErrorBody, HealthReport, ProtocolError, SignalRequest};

/// Controller shared by request handlers and the render loop
pub struct ControllerState {
    controller: Mutex<LedController<Box<dyn LedOutput + Send>>>,
    clock: MonotonicClock,
}

impl ControllerState {
    /// Wrap a panel in a fresh controller
    pub fn new(output: impl LedOutput + Send + 'static) -> Arc<Self> {
        let output: Box<dyn LedOutput + Send> = Box::new(output);
        Arc::new(Self {
            controller: Mutex::new(LedController::new(output)),
            clock: MonotonicClock::new(),
        })
    }

    /// Current health view
    pub async fn health(&self) -> HealthReport {
        let uptime_ms = self.clock.now_ms();
        self.controller.lock().await.health(uptime_ms)
    }

    /// One render pass
    pub async fn tick(&self) {
        let now_ms = self.clock.now_ms();
        self.controller.lock().await.tick(now_ms);
    }
}

impl IntoResponse for ProtocolError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(ErrorBody::from(&self))).into_response()
    }
}

/// Create the API router
pub fn create_router(state: Arc<ControllerState>) -> Router {
    Router::new()
        .route("/signal", post(signal))
        .route("/reset", post(reset))
        .route("/health", get(health))
        .with_state(state)
}

/// Apply one step state
async fn signal(
    State(state): State<Arc<ControllerState>>,
    body: Bytes,
) -> Result<Json<Ack>, ProtocolError> {
    let request = SignalRequest::parse(&body).map_err(|err| {
        warn!(error = %err, "rejected signal");
        err
    })?;

    let now_ms = state.clock.now_ms();
    state
        .controller
        .lock()
        .await
        .apply(request.step, request.state, now_ms);

    Ok(Json(Ack::ok()))
}

/// Clear all latches
async fn reset(State(state): State<Arc<ControllerState>>) -> Json<Ack> {
    state.controller.lock().await.reset();
    Json(Ack::ok())
}

/// Health check endpoint
async fn health(State(state): State<Arc<ControllerState>>) -> Json<HealthReport> {
    Json(state.health().await)
}

/// Drive blink rendering every `tick` until the task is aborted
pub fn spawn_render_loop(state: Arc<ControllerState>, tick: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            state.tick().await;
        }
    })
}

/// Run the LED controller server
pub async fn run_controller(
    config: &ControllerConfig,
    output: impl LedOutput + Send + 'static,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = ControllerState::new(output);
    let render = spawn_render_loop(state.clone(), Duration::from_millis(config.tick_ms));
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    info!(addr = %config.addr, tick_ms = config.tick_ms, "LED controller listening");
    println!("  POST /signal  - Apply step state");
    println!("  POST /reset   - Clear all latches");
    println!("  GET  /health  - Displayed state");

    let served = axum::serve(listener, router).await;
    render.abort();
    served?;
    Ok(())
}

//! Core modules for DeltaWash

pub mod config;
pub mod evidence;
pub mod interpreter;
pub mod controller;
pub mod api;
pub mod transport;
pub mod replay;
pub mod status;

pub use config::{load_config, AppConfig, ConfigError, ControllerConfig, FeedbackConfig, InterpreterConfig, OrientationPolicy, StepThreshold};
pub use evidence::{Accumulator, Credit, DropoutWindow, PendingEvidence};
pub use interpreter::SessionInterpreter;
pub use controller::{blink_level, Applied, LedController, LedOutput, MemoryLeds, MonotonicClock, TracingLeds};
pub use api::{create_router, run_controller, spawn_render_loop, ControllerState};
pub use transport::{FeedbackTransport, LedClient, TransportError, TransportStats};
pub use replay::{load_samples, parse_samples, replay, ReplayError, ReplaySummary};
pub use status::StatusBoard;

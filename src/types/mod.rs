//! Core types for DeltaWash

mod step;
mod state;
mod sample;
mod reason;
mod event;
mod status;
mod wire;

pub use step::{StepId, Orientation};
pub use state::StepState;
pub use sample::SignalSample;
pub use reason::ReasonCode;
pub use event::StepEvent;
pub use status::StepStatus;
pub use wire::{SignalRequest, Ack, ErrorBody, HealthReport, ProtocolError};

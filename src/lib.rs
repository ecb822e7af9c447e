//! Gesture-triggered emergency dispatch core.
//!
//! Accelerometer samples are classified into gestures, debounced, matched
//! against the user's stored bindings and, after a cancellable countdown,
//! turned into a phone call to the bound emergency number.

pub mod actions;
pub mod bindings;
pub mod config;
pub mod dispatch;
pub mod gesture;
pub mod platform;
pub mod runtime;

pub use config::{active_config, DispatchConfig};
pub use dispatch::{DispatchEngine, EngineOutput};
pub use gesture::{GestureLabel, MotionSample};
pub use runtime::{run_dispatch_session, DispatchInbox, DispatchInput, DispatchService};

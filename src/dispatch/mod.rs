pub mod countdown;
pub mod debounce;
pub mod double_shake;
pub mod engine;
pub mod trace;
pub mod types;

pub use countdown::{CountdownOutcome, CountdownState, EscalationCountdown};
pub use debounce::{DebounceGate, GateDecision};
pub use double_shake::{DoubleTriggerWindow, WindowOutcome};
pub use engine::{DispatchEngine, EngineOutput};
pub use trace::DispatchTrace;
pub use types::{
    ActionBuffer, CancelReason, DebounceState, DispatchAction, EngineStateId, RejectReason,
};

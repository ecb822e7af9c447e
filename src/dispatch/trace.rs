use crate::gesture::GestureLabel;

use super::types::{EngineStateId, RejectReason};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DispatchTrace {
    pub now_ms: u64,
    pub state_id: EngineStateId,
    pub gesture: GestureLabel,
    pub reject_reason: RejectReason,
    pub awaiting_second_shake: bool,
    pub countdown_remaining_ms: Option<u64>,
}

use crate::{config::DebounceConfig, gesture::GestureLabel};

use super::types::RejectReason;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GateDecision {
    /// Shake during an active countdown, far enough from the previous cancel.
    Cancel,
    /// Non-shake gesture allowed to look up its binding.
    Trigger,
    /// Shake with no countdown running; arming is up to the double-shake window.
    ToShakeWindow,
    Suppressed(RejectReason),
}

#[derive(Clone, Copy, Debug)]
pub struct DebounceGate {
    config: DebounceConfig,
    last_shake_cancel_ms: Option<u64>,
    last_non_shake_trigger_ms: Option<u64>,
}

impl DebounceGate {
    pub const fn new(config: DebounceConfig) -> Self {
        Self {
            config,
            last_shake_cancel_ms: None,
            last_non_shake_trigger_ms: None,
        }
    }

    pub fn evaluate(
        &mut self,
        gesture: GestureLabel,
        now_ms: u64,
        countdown_active: bool,
    ) -> GateDecision {
        match gesture {
            GestureLabel::None => GateDecision::Suppressed(RejectReason::NoGesture),
            GestureLabel::Shake if countdown_active => {
                let limit_ms = self.config.shake_cancel_ms;
                if elapsed_exceeds(self.last_shake_cancel_ms, now_ms, limit_ms) {
                    self.last_shake_cancel_ms = Some(now_ms);
                    GateDecision::Cancel
                } else {
                    GateDecision::Suppressed(RejectReason::CancelDebounced)
                }
            }
            GestureLabel::Shake => GateDecision::ToShakeWindow,
            _ if countdown_active => GateDecision::Suppressed(RejectReason::CountdownActive),
            _ => {
                if elapsed_exceeds(
                    self.last_non_shake_trigger_ms,
                    now_ms,
                    self.config.swipe_trigger_ms,
                ) {
                    self.last_non_shake_trigger_ms = Some(now_ms);
                    GateDecision::Trigger
                } else {
                    GateDecision::Suppressed(RejectReason::SwipeDebounced)
                }
            }
        }
    }

    /// The shakes that armed a countdown must not immediately cancel it.
    pub fn note_countdown_started(&mut self, now_ms: u64) {
        self.last_shake_cancel_ms = Some(now_ms);
    }

    pub fn reset(&mut self) {
        self.last_shake_cancel_ms = None;
        self.last_non_shake_trigger_ms = None;
    }

    pub fn last_shake_cancel_ms(&self) -> Option<u64> {
        self.last_shake_cancel_ms
    }

    pub fn last_non_shake_trigger_ms(&self) -> Option<u64> {
        self.last_non_shake_trigger_ms
    }
}

fn elapsed_exceeds(last_ms: Option<u64>, now_ms: u64, limit_ms: u64) -> bool {
    last_ms.is_none_or(|last| now_ms.saturating_sub(last) > limit_ms)
}

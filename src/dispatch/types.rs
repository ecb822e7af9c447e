use heapless::Vec;

use crate::{bindings::ActionName, gesture::GestureLabel};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CancelReason {
    CancelShake,
    UserRequest,
    SessionEnded,
}

impl CancelReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::CancelShake => "cancel_shake",
            Self::UserRequest => "user_request",
            Self::SessionEnded => "session_ended",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DispatchAction {
    CountdownStarted {
        gesture: GestureLabel,
        action: ActionName,
        duration_ms: u64,
    },
    CountdownTick {
        action: ActionName,
        remaining_secs: u64,
    },
    CountdownCancelled {
        action: ActionName,
        reason: CancelReason,
    },
    Execute {
        gesture: GestureLabel,
        action: ActionName,
    },
}

impl DispatchAction {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::CountdownStarted { .. } => "countdown_started",
            Self::CountdownTick { .. } => "countdown_tick",
            Self::CountdownCancelled { .. } => "countdown_cancelled",
            Self::Execute { .. } => "execute",
        }
    }
}

const ACTION_SLOTS: usize = 4;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ActionBuffer {
    slots: Vec<DispatchAction, ACTION_SLOTS>,
}

impl ActionBuffer {
    pub const MAX: usize = ACTION_SLOTS;

    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn push(&mut self, action: DispatchAction) {
        if self.slots.push(action).is_err() {
            log::warn!("dispatch: action_buffer_full");
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DispatchAction> {
        self.slots.iter()
    }

    pub fn executed_action(&self) -> Option<&str> {
        self.iter().find_map(|action| match action {
            DispatchAction::Execute { action, .. } => Some(action.as_str()),
            _ => None,
        })
    }

    pub fn started_countdown(&self) -> bool {
        self.iter()
            .any(|action| matches!(action, DispatchAction::CountdownStarted { .. }))
    }

    pub fn cancelled_countdown(&self) -> bool {
        self.iter()
            .any(|action| matches!(action, DispatchAction::CountdownCancelled { .. }))
    }
}

impl IntoIterator for ActionBuffer {
    type Item = DispatchAction;
    type IntoIter = <Vec<DispatchAction, ACTION_SLOTS> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.into_iter()
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(u8)]
pub enum RejectReason {
    #[default]
    None = 0,
    NoGesture = 1,
    ShakeDisabled = 2,
    AwaitingSecondShake = 3,
    SwipeDebounced = 4,
    CancelDebounced = 5,
    CountdownActive = 6,
    NoBinding = 7,
    SessionInactive = 8,
    ShakeWindowCleared = 9,
}

impl RejectReason {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::NoGesture => "no_gesture",
            Self::ShakeDisabled => "shake_disabled",
            Self::AwaitingSecondShake => "awaiting_second_shake",
            Self::SwipeDebounced => "swipe_debounced",
            Self::CancelDebounced => "cancel_debounced",
            Self::CountdownActive => "countdown_active",
            Self::NoBinding => "no_binding",
            Self::SessionInactive => "session_inactive",
            Self::ShakeWindowCleared => "shake_window_cleared",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(u8)]
pub enum EngineStateId {
    #[default]
    Inactive = 0,
    Listening = 1,
    ShakeArmed = 2,
    CountingDown = 3,
}

impl EngineStateId {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Timestamps the gate and the double-shake window keep between samples.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DebounceState {
    pub last_shake_cancel_ms: Option<u64>,
    pub last_non_shake_trigger_ms: Option<u64>,
    pub first_shake_timestamp_ms: Option<u64>,
    pub awaiting_second_shake: bool,
}

use std::sync::Arc;

use crate::{
    bindings::{find_binding, GestureBinding},
    config::{active_config, DispatchConfig},
    gesture::{classify_with, GestureLabel, MotionSample},
};

use super::{
    countdown::{CountdownOutcome, CountdownState, EscalationCountdown},
    debounce::{DebounceGate, GateDecision},
    double_shake::{DoubleTriggerWindow, WindowOutcome},
    trace::DispatchTrace,
    types::{
        ActionBuffer, CancelReason, DebounceState, DispatchAction, EngineStateId, RejectReason,
    },
};

#[derive(Clone, Debug, Default)]
pub struct EngineOutput {
    pub actions: ActionBuffer,
    pub trace: DispatchTrace,
}

/// Single owner of all detection state for one logged-in session.
///
/// Every input (sample, timer expiry, user cancel, teardown) is handled to
/// completion before the next one; pending timers are exposed through
/// [`DispatchEngine::next_deadline_ms`] and delivered with
/// [`DispatchEngine::poll`]. Timers that are already due are also delivered at
/// the start of every other input so the ordering stays consistent.
pub struct DispatchEngine {
    config: &'static DispatchConfig,
    gate: DebounceGate,
    window: DoubleTriggerWindow,
    countdown: EscalationCountdown,
    bindings: Arc<[GestureBinding]>,
    shake_enabled: bool,
    session_active: bool,
    last_trace: DispatchTrace,
}

impl Default for DispatchEngine {
    fn default() -> Self {
        Self::new(active_config())
    }
}

impl DispatchEngine {
    pub fn new(config: &'static DispatchConfig) -> Self {
        Self {
            config,
            gate: DebounceGate::new(config.debounce),
            window: DoubleTriggerWindow::new(config.double_shake),
            countdown: EscalationCountdown::new(config.countdown),
            bindings: Arc::from(Vec::new()),
            shake_enabled: true,
            session_active: false,
            last_trace: DispatchTrace::default(),
        }
    }

    pub fn config(&self) -> &'static DispatchConfig {
        self.config
    }

    pub fn set_bindings(&mut self, bindings: Arc<[GestureBinding]>) {
        self.bindings = bindings;
    }

    pub fn bindings(&self) -> Arc<[GestureBinding]> {
        Arc::clone(&self.bindings)
    }

    pub fn set_shake_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.window.disarm();
        }
        self.shake_enabled = enabled;
    }

    pub fn begin_session(&mut self) {
        if self.session_active {
            return;
        }
        self.gate.reset();
        self.window.disarm();
        self.session_active = true;
        log::info!("dispatch: session_started");
    }

    /// Teardown: any in-flight countdown is discarded, never executed.
    pub fn end_session(&mut self, now_ms: u64) -> EngineOutput {
        let mut actions = ActionBuffer::new();
        if self.session_active {
            self.cancel_countdown(CancelReason::SessionEnded, &mut actions);
            self.window.disarm();
            self.gate.reset();
            self.session_active = false;
            log::info!("dispatch: session_ended");
        }
        self.record(now_ms, GestureLabel::None, RejectReason::SessionInactive);
        self.finish(actions)
    }

    pub fn is_session_active(&self) -> bool {
        self.session_active
    }

    pub fn on_sample(&mut self, sample: MotionSample) -> EngineOutput {
        let now_ms = sample.timestamp_ms;
        let mut actions = ActionBuffer::new();
        if !self.session_active {
            self.record(now_ms, GestureLabel::None, RejectReason::SessionInactive);
            return self.finish(actions);
        }

        self.advance_timers(now_ms, &mut actions);
        let gesture = classify_with(&sample, &self.config.classifier);
        let reason = self.route(gesture, now_ms, &mut actions);
        self.record(now_ms, gesture, reason);
        self.finish(actions)
    }

    /// Delivers timer expiries due at `now_ms`.
    pub fn poll(&mut self, now_ms: u64) -> EngineOutput {
        let mut actions = ActionBuffer::new();
        if self.session_active {
            self.advance_timers(now_ms, &mut actions);
        }
        self.record(now_ms, GestureLabel::None, RejectReason::None);
        self.finish(actions)
    }

    /// Explicit cancel from the countdown prompt.
    pub fn cancel(&mut self, now_ms: u64) -> EngineOutput {
        let mut actions = ActionBuffer::new();
        if self.session_active {
            self.advance_timers(now_ms, &mut actions);
            self.cancel_countdown(CancelReason::UserRequest, &mut actions);
        }
        self.record(now_ms, GestureLabel::None, RejectReason::None);
        self.finish(actions)
    }

    /// Starts the countdown for `gesture`'s binding directly, bypassing debouncing.
    pub fn start_countdown(&mut self, gesture: GestureLabel, now_ms: u64) -> EngineOutput {
        let mut actions = ActionBuffer::new();
        let reason = if self.session_active {
            self.advance_timers(now_ms, &mut actions);
            self.try_start(gesture, now_ms, &mut actions)
        } else {
            RejectReason::SessionInactive
        };
        self.record(now_ms, gesture, reason);
        self.finish(actions)
    }

    pub fn next_deadline_ms(&self) -> Option<u64> {
        if !self.session_active {
            return None;
        }
        match (self.window.deadline_ms(), self.countdown.deadline_ms()) {
            (Some(window), Some(countdown)) => Some(window.min(countdown)),
            (window, countdown) => window.or(countdown),
        }
    }

    pub fn countdown_state(&self) -> CountdownState {
        self.countdown.state()
    }

    pub fn debounce_state(&self) -> DebounceState {
        DebounceState {
            last_shake_cancel_ms: self.gate.last_shake_cancel_ms(),
            last_non_shake_trigger_ms: self.gate.last_non_shake_trigger_ms(),
            first_shake_timestamp_ms: self.window.first_shake_ms(),
            awaiting_second_shake: self.window.is_awaiting_second_shake(),
        }
    }

    pub fn last_trace(&self) -> DispatchTrace {
        self.last_trace
    }

    fn route(
        &mut self,
        gesture: GestureLabel,
        now_ms: u64,
        actions: &mut ActionBuffer,
    ) -> RejectReason {
        // Disabling shake triggers keeps shake-to-cancel working.
        if gesture.is_shake() && !self.shake_enabled && !self.countdown.is_active() {
            return RejectReason::ShakeDisabled;
        }
        // A swipe against a pending first shake only clears it.
        if gesture.is_swipe() && self.window.disarm() {
            log::debug!("dispatch: shake_window_cleared by={gesture}");
            return RejectReason::ShakeWindowCleared;
        }

        let countdown_active = self.countdown.is_active();
        match self.gate.evaluate(gesture, now_ms, countdown_active) {
            GateDecision::Suppressed(reason) => reason,
            GateDecision::Cancel => {
                self.cancel_countdown(CancelReason::CancelShake, actions);
                RejectReason::None
            }
            GateDecision::ToShakeWindow => match self.window.on_shake(now_ms) {
                WindowOutcome::Armed => {
                    log::debug!("dispatch: shake_armed at_ms={now_ms}");
                    RejectReason::AwaitingSecondShake
                }
                WindowOutcome::Triggered => self.try_start(GestureLabel::Shake, now_ms, actions),
            },
            GateDecision::Trigger => self.try_start(gesture, now_ms, actions),
        }
    }

    fn try_start(
        &mut self,
        gesture: GestureLabel,
        now_ms: u64,
        actions: &mut ActionBuffer,
    ) -> RejectReason {
        let Some(binding) = find_binding(&self.bindings, gesture).cloned() else {
            log::debug!("dispatch: no_binding gesture={gesture}");
            return RejectReason::NoBinding;
        };

        match self.countdown.start(binding.clone(), now_ms) {
            CountdownOutcome::Started { duration_ms } => {
                self.gate.note_countdown_started(now_ms);
                self.window.disarm();
                log::info!(
                    "dispatch: countdown_started gesture={gesture} action={:?} ms={duration_ms}",
                    binding.action
                );
                actions.push(DispatchAction::CountdownStarted {
                    gesture,
                    action: binding.action,
                    duration_ms,
                });
                RejectReason::None
            }
            _ => RejectReason::CountdownActive,
        }
    }

    fn advance_timers(&mut self, now_ms: u64, actions: &mut ActionBuffer) {
        if self.window.expire(now_ms) {
            log::debug!("dispatch: shake_window_expired at_ms={now_ms}");
        }

        let armed_action = self
            .countdown
            .armed_binding()
            .map(|binding| binding.action.clone());
        match self.countdown.tick(now_ms) {
            CountdownOutcome::Tick { remaining_secs } => {
                if let Some(action) = armed_action {
                    actions.push(DispatchAction::CountdownTick {
                        action,
                        remaining_secs,
                    });
                }
            }
            CountdownOutcome::Expired(binding) => {
                self.window.disarm();
                log::info!(
                    "dispatch: countdown_expired gesture={} action={:?}",
                    binding.gesture,
                    binding.action
                );
                actions.push(DispatchAction::Execute {
                    gesture: binding.gesture,
                    action: binding.action,
                });
            }
            _ => {}
        }
    }

    fn cancel_countdown(&mut self, reason: CancelReason, actions: &mut ActionBuffer) {
        if let CountdownOutcome::Cancelled(binding) = self.countdown.cancel() {
            self.window.disarm();
            log::info!(
                "dispatch: countdown_cancelled action={:?} reason={}",
                binding.action,
                reason.label()
            );
            actions.push(DispatchAction::CountdownCancelled {
                action: binding.action,
                reason,
            });
        }
    }

    fn state_id(&self) -> EngineStateId {
        if !self.session_active {
            EngineStateId::Inactive
        } else if self.countdown.is_active() {
            EngineStateId::CountingDown
        } else if self.window.is_awaiting_second_shake() {
            EngineStateId::ShakeArmed
        } else {
            EngineStateId::Listening
        }
    }

    fn record(&mut self, now_ms: u64, gesture: GestureLabel, reject_reason: RejectReason) {
        self.last_trace = DispatchTrace {
            now_ms,
            state_id: self.state_id(),
            gesture,
            reject_reason,
            awaiting_second_shake: self.window.is_awaiting_second_shake(),
            countdown_remaining_ms: self.countdown.remaining_ms(now_ms),
        };
    }

    fn finish(&self, actions: ActionBuffer) -> EngineOutput {
        EngineOutput {
            actions,
            trace: self.last_trace,
        }
    }
}

use statig::{blocking::IntoStateMachineExt as _, prelude::*};

use crate::{bindings::GestureBinding, config::CountdownConfig, gesture::GestureLabel};

#[derive(Clone, Debug)]
enum CountdownEvent {
    Start {
        now_ms: u64,
        binding: GestureBinding,
    },
    Tick {
        now_ms: u64,
    },
    Cancel,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum CountdownOutcome {
    #[default]
    Unchanged,
    Started {
        duration_ms: u64,
    },
    AlreadyActive,
    Tick {
        remaining_secs: u64,
    },
    Expired(GestureBinding),
    Cancelled(GestureBinding),
}

#[derive(Default)]
struct DispatchContext {
    outcome: CountdownOutcome,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CountdownState {
    pub active: bool,
    pub armed_gesture: Option<GestureLabel>,
    pub start_timestamp_ms: Option<u64>,
    pub duration_ms: u64,
}

pub struct EscalationCountdown {
    machine: statig::blocking::StateMachine<CountdownHsm>,
}

impl EscalationCountdown {
    pub fn new(config: CountdownConfig) -> Self {
        Self {
            machine: CountdownHsm::new(config).state_machine(),
        }
    }

    /// No-op while a countdown is already running.
    pub fn start(&mut self, binding: GestureBinding, now_ms: u64) -> CountdownOutcome {
        self.dispatch(CountdownEvent::Start { now_ms, binding })
    }

    pub fn tick(&mut self, now_ms: u64) -> CountdownOutcome {
        self.dispatch(CountdownEvent::Tick { now_ms })
    }

    /// Idempotent; returns `Unchanged` when nothing was running.
    pub fn cancel(&mut self) -> CountdownOutcome {
        self.dispatch(CountdownEvent::Cancel)
    }

    pub fn is_active(&self) -> bool {
        self.machine.inner().started_at_ms.is_some()
    }

    pub fn state(&self) -> CountdownState {
        let hsm = self.machine.inner();
        CountdownState {
            active: hsm.started_at_ms.is_some(),
            armed_gesture: hsm.armed.as_ref().map(|binding| binding.gesture),
            start_timestamp_ms: hsm.started_at_ms,
            duration_ms: hsm.config.duration_ms,
        }
    }

    pub fn armed_binding(&self) -> Option<&GestureBinding> {
        self.machine.inner().armed.as_ref()
    }

    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        let hsm = self.machine.inner();
        let elapsed_ms = now_ms.saturating_sub(hsm.started_at_ms?);
        Some(hsm.config.duration_ms.saturating_sub(elapsed_ms))
    }

    /// Next display tick, or the expiry itself once the last tick was announced.
    pub fn deadline_ms(&self) -> Option<u64> {
        let hsm = self.machine.inner();
        let started = hsm.started_at_ms?;
        let pending_ticks = hsm.announced_secs.saturating_sub(1);
        let pending_ms = pending_ticks.saturating_mul(hsm.config.tick_ms);
        let offset = hsm.config.duration_ms.saturating_sub(pending_ms);
        Some(started.saturating_add(offset))
    }

    fn dispatch(&mut self, event: CountdownEvent) -> CountdownOutcome {
        let mut context = DispatchContext::default();
        self.machine.handle_with_context(&event, &mut context);
        context.outcome
    }
}

struct CountdownHsm {
    config: CountdownConfig,
    armed: Option<GestureBinding>,
    started_at_ms: Option<u64>,
    announced_secs: u64,
}

impl CountdownHsm {
    fn new(config: CountdownConfig) -> Self {
        Self {
            config,
            armed: None,
            started_at_ms: None,
            announced_secs: 0,
        }
    }

    fn remaining_secs(&self, remaining_ms: u64) -> u64 {
        remaining_ms.div_ceil(self.config.tick_ms.max(1))
    }

    fn arm(&mut self, now_ms: u64, binding: GestureBinding) {
        self.armed = Some(binding);
        self.started_at_ms = Some(now_ms);
        self.announced_secs = self.remaining_secs(self.config.duration_ms);
    }

    fn disarm(&mut self) -> Option<GestureBinding> {
        self.started_at_ms = None;
        self.announced_secs = 0;
        self.armed.take()
    }
}

#[state_machine(initial = "State::idle()")]
impl CountdownHsm {
    #[state]
    fn idle(&mut self, context: &mut DispatchContext, event: &CountdownEvent) -> Outcome<State> {
        match event {
            CountdownEvent::Start { now_ms, binding } => {
                self.arm(*now_ms, binding.clone());
                context.outcome = CountdownOutcome::Started {
                    duration_ms: self.config.duration_ms,
                };
                Transition(State::counting_down())
            }
            CountdownEvent::Tick { .. } | CountdownEvent::Cancel => Handled,
        }
    }

    #[state]
    fn counting_down(
        &mut self,
        context: &mut DispatchContext,
        event: &CountdownEvent,
    ) -> Outcome<State> {
        match event {
            CountdownEvent::Start { .. } => {
                context.outcome = CountdownOutcome::AlreadyActive;
                Handled
            }
            CountdownEvent::Tick { now_ms } => {
                let Some(started) = self.started_at_ms else {
                    self.disarm();
                    return Transition(State::idle());
                };

                let elapsed = now_ms.saturating_sub(started);
                if elapsed >= self.config.duration_ms {
                    if let Some(binding) = self.disarm() {
                        context.outcome = CountdownOutcome::Expired(binding);
                    }
                    return Transition(State::idle());
                }

                let remaining_secs = self.remaining_secs(self.config.duration_ms - elapsed);
                if remaining_secs < self.announced_secs {
                    self.announced_secs = remaining_secs;
                    context.outcome = CountdownOutcome::Tick { remaining_secs };
                }
                Handled
            }
            CountdownEvent::Cancel => {
                if let Some(binding) = self.disarm() {
                    context.outcome = CountdownOutcome::Cancelled(binding);
                }
                Transition(State::idle())
            }
        }
    }
}

use crate::config::DoubleShakeConfig;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WindowOutcome {
    /// First shake seen; waiting for the second one.
    Armed,
    /// Second shake arrived inside the window.
    Triggered,
}

/// A lone shake only arms; two shakes within `window_ms` trigger.
#[derive(Clone, Copy, Debug)]
pub struct DoubleTriggerWindow {
    window_ms: u64,
    first_shake_ms: Option<u64>,
}

impl DoubleTriggerWindow {
    pub const fn new(config: DoubleShakeConfig) -> Self {
        Self {
            window_ms: config.window_ms,
            first_shake_ms: None,
        }
    }

    pub fn on_shake(&mut self, now_ms: u64) -> WindowOutcome {
        // A stale first shake whose expiry has not been delivered yet still counts as expired.
        self.expire(now_ms);
        match self.first_shake_ms {
            None => {
                self.first_shake_ms = Some(now_ms);
                WindowOutcome::Armed
            }
            Some(_) => {
                self.first_shake_ms = None;
                WindowOutcome::Triggered
            }
        }
    }

    /// Drops a pending first shake. Returns whether one was pending.
    pub fn disarm(&mut self) -> bool {
        self.first_shake_ms.take().is_some()
    }

    /// Expiry timer callback. Returns whether a pending first shake expired.
    pub fn expire(&mut self, now_ms: u64) -> bool {
        match self.deadline_ms() {
            Some(deadline) if now_ms >= deadline => {
                self.first_shake_ms = None;
                true
            }
            _ => false,
        }
    }

    pub fn deadline_ms(&self) -> Option<u64> {
        self.first_shake_ms
            .map(|first| first.saturating_add(self.window_ms))
    }

    pub fn is_awaiting_second_shake(&self) -> bool {
        self.first_shake_ms.is_some()
    }

    pub fn first_shake_ms(&self) -> Option<u64> {
        self.first_shake_ms
    }
}

use core::fmt;

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use embassy_time::{with_timeout, Duration, Instant};

use crate::{
    gesture::MotionSample,
    platform::{MotionReading, MotionSensorOps, SensorSubscription, UserAlert},
};

use super::service::DispatchService;

const INBOX_DEPTH: usize = 16;

#[derive(Clone, Debug, PartialEq)]
pub enum DispatchInput {
    Sample(MotionSample),
    UserCancel,
    BindingsChanged,
    Logout,
}

/// Serialized queue feeding a running dispatch session.
pub struct DispatchInbox {
    channel: Channel<CriticalSectionRawMutex, DispatchInput, INBOX_DEPTH>,
}

impl Default for DispatchInbox {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchInbox {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Non-blocking; a full inbox drops the input.
    pub fn try_push(&self, input: DispatchInput) -> bool {
        match self.channel.try_send(input) {
            Ok(()) => true,
            Err(_) => {
                log::warn!("session: inbox_full");
                false
            }
        }
    }

    pub async fn push(&self, input: DispatchInput) {
        self.channel.send(input).await;
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    async fn receive(&self) -> DispatchInput {
        self.channel.receive().await
    }

    fn try_receive(&self) -> Option<DispatchInput> {
        self.channel.try_receive().ok()
    }

    fn clear(&self) {
        self.channel.clear();
    }
}

/// Millisecond clock anchored at session start.
#[derive(Clone, Copy, Debug)]
pub struct SessionClock {
    epoch: Instant,
}

impl SessionClock {
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionError {
    SensorUnavailable(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SensorUnavailable(msg) => write!(f, "motion sensor unavailable: {msg}"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Runs one logged-in session until `Logout` arrives.
///
/// The sensor listener only stamps readings and queues them; the engine runs
/// here, one input at a time, waking early for its next timer deadline.
/// Queued inputs are drained before a due timer is polled.
pub async fn run_dispatch_session<S: MotionSensorOps>(
    inbox: &'static DispatchInbox,
    sensor: &mut S,
    service: &mut DispatchService,
    user_id: Option<String>,
) -> Result<(), SessionError> {
    let clock = SessionClock::start();
    let interval_ms = service.config().sampling.interval_ms;
    let listener = Box::new(move |reading: MotionReading| {
        let sample = MotionSample::new(reading.x, reading.y, reading.z, clock.now_ms());
        inbox.try_push(DispatchInput::Sample(sample));
    });

    let subscription = match sensor.subscribe(interval_ms, listener) {
        Ok(subscription) => subscription,
        Err(err) => {
            log::error!("session: sensor_subscribe_failed err={err:#}");
            service.alert(UserAlert::SensorUnavailable);
            return Err(SessionError::SensorUnavailable(format!("{err:#}")));
        }
    };

    service.start(user_id, clock.now_ms());
    log::info!("session: started interval_ms={interval_ms}");

    loop {
        let queued = inbox.try_receive();
        let input = match (queued, service.next_deadline_ms()) {
            (Some(input), _) => Some(input),
            (None, Some(deadline_ms)) => {
                let wait_ms = deadline_ms.saturating_sub(clock.now_ms());
                if wait_ms == 0 {
                    None
                } else {
                    with_timeout(Duration::from_millis(wait_ms), inbox.receive())
                        .await
                        .ok()
                }
            }
            (None, None) => Some(inbox.receive().await),
        };

        let now_ms = clock.now_ms();
        match input {
            None => {
                service.poll(now_ms);
            }
            Some(DispatchInput::Sample(sample)) => {
                service.handle_sample(sample);
            }
            Some(DispatchInput::UserCancel) => {
                service.user_cancel(now_ms);
            }
            Some(DispatchInput::BindingsChanged) => {
                service.bindings_changed(now_ms);
            }
            Some(DispatchInput::Logout) => break,
        }
    }

    subscription.remove();
    service.shutdown(clock.now_ms());
    inbox.clear();
    log::info!("session: stopped");
    Ok(())
}

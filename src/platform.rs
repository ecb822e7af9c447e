//! Device capabilities the dispatch core is wired to at construction time.

use anyhow::Result;

/// Raw accelerometer reading as delivered by the sensor callback.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotionReading {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

pub type MotionListener = Box<dyn FnMut(MotionReading) + Send>;

pub trait SensorSubscription {
    fn remove(self);
}

pub trait MotionSensorOps {
    type Subscription: SensorSubscription;

    fn subscribe(
        &mut self,
        interval_ms: u64,
        listener: MotionListener,
    ) -> Result<Self::Subscription>;
}

pub trait KeyValueOps {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

pub trait DialerOps {
    fn can_open(&self, uri: &str) -> bool;
    fn open(&mut self, uri: &str) -> Result<()>;
}

pub trait HapticsOps {
    fn vibrate_pattern(&mut self, pattern_ms: &[u64]);
    fn vibrate(&mut self, duration_ms: u64);
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
}

pub trait LocationOps {
    fn current_location(&mut self) -> Result<Location>;
}

/// User-facing notices raised by the dispatch core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserAlert {
    CountdownStarted { action: String, seconds: u64 },
    CountdownTick { action: String, remaining_secs: u64 },
    CountdownCancelled { action: String },
    UnknownAction { action: String },
    DialManually { action: String, number: String },
    SensorUnavailable,
}

pub trait AlertOps {
    fn alert(&mut self, alert: UserAlert);
}

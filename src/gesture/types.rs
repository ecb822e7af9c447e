use core::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotionSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub timestamp_ms: u64,
}

impl MotionSample {
    pub const fn new(x: f32, y: f32, z: f32, timestamp_ms: u64) -> Self {
        Self {
            x,
            y,
            z,
            timestamp_ms,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum GestureLabel {
    #[default]
    None = 0,
    Shake = 1,
    SwipeUp = 2,
    SwipeDown = 3,
    SwipeLeft = 4,
    SwipeRight = 5,
}

impl GestureLabel {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }

    pub const fn is_shake(self) -> bool {
        matches!(self, Self::Shake)
    }

    pub const fn is_swipe(self) -> bool {
        matches!(
            self,
            Self::SwipeUp | Self::SwipeDown | Self::SwipeLeft | Self::SwipeRight
        )
    }

    /// Stable snake_case label used in traces and replay output.
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Shake => "shake",
            Self::SwipeUp => "swipe_up",
            Self::SwipeDown => "swipe_down",
            Self::SwipeLeft => "swipe_left",
            Self::SwipeRight => "swipe_right",
        }
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseGestureError(pub String);

impl fmt::Display for ParseGestureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown gesture `{}`", self.0)
    }
}

impl std::error::Error for ParseGestureError {}

impl FromStr for GestureLabel {
    type Err = ParseGestureError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "none" => Ok(Self::None),
            "shake" => Ok(Self::Shake),
            "swipeup" => Ok(Self::SwipeUp),
            "swipedown" => Ok(Self::SwipeDown),
            "swipeleft" => Ok(Self::SwipeLeft),
            "swiperight" => Ok(Self::SwipeRight),
            _ => Err(ParseGestureError(raw.to_string())),
        }
    }
}

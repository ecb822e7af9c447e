use crate::config::{active_config, ClassifierConfig};

use super::types::{GestureLabel, MotionSample};

pub fn magnitude(sample: &MotionSample) -> f32 {
    (sample.x * sample.x + sample.y * sample.y + sample.z * sample.z).sqrt()
}

pub fn classify(sample: &MotionSample) -> GestureLabel {
    classify_with(sample, &active_config().classifier)
}

/// Shake wins over every swipe; swipes are tested up, down, left, right.
pub fn classify_with(sample: &MotionSample, config: &ClassifierConfig) -> GestureLabel {
    if magnitude(sample) > config.shake_threshold {
        return GestureLabel::Shake;
    }

    let swipe = config.swipe_threshold;
    if sample.y < -swipe {
        GestureLabel::SwipeUp
    } else if sample.y > swipe {
        GestureLabel::SwipeDown
    } else if sample.x < -swipe {
        GestureLabel::SwipeLeft
    } else if swipe_right(sample.x, config) {
        GestureLabel::SwipeRight
    } else {
        GestureLabel::None
    }
}

fn swipe_right(x: f32, config: &ClassifierConfig) -> bool {
    if config.swipe_right_legacy_compare {
        x > -config.swipe_threshold
    } else {
        x > config.swipe_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(x: f32, y: f32, z: f32) -> MotionSample {
        MotionSample::new(x, y, z, 0)
    }

    fn legacy() -> ClassifierConfig {
        ClassifierConfig {
            swipe_right_legacy_compare: true,
            ..active_config().classifier
        }
    }

    #[test]
    fn shake_takes_priority_over_swipes() {
        let strong = sample(3.0, 3.0, 3.0);
        assert!(magnitude(&strong) > 5.0);
        assert_eq!(classify(&strong), GestureLabel::Shake);
        assert_eq!(classify(&sample(0.0, -2.6, 0.0)), GestureLabel::Shake);
    }

    #[test]
    fn swipe_thresholds_map_to_directions() {
        assert_eq!(classify(&sample(0.0, -0.9, 0.0)), GestureLabel::SwipeUp);
        assert_eq!(classify(&sample(0.0, 0.9, 0.0)), GestureLabel::SwipeDown);
        assert_eq!(classify(&sample(-0.9, 0.0, 0.0)), GestureLabel::SwipeLeft);
        assert_eq!(classify(&sample(0.9, 0.0, 0.0)), GestureLabel::SwipeRight);
    }

    #[test]
    fn resting_device_is_none() {
        assert_eq!(classify(&sample(0.0, 0.0, 1.0)), GestureLabel::None);
        assert_eq!(classify(&sample(0.8, -0.8, 1.0)), GestureLabel::None);
    }

    #[test]
    fn vertical_axis_is_checked_before_horizontal() {
        assert_eq!(classify(&sample(-1.2, 1.0, 0.0)), GestureLabel::SwipeDown);
    }

    #[test]
    fn legacy_compare_reports_right_for_neutral_tilt() {
        let config = legacy();
        assert_eq!(
            classify_with(&sample(0.0, 0.0, 1.0), &config),
            GestureLabel::SwipeRight
        );
        assert_eq!(
            classify_with(&sample(-0.9, 0.0, 0.0), &config),
            GestureLabel::SwipeLeft
        );
    }
}

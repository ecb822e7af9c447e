#[derive(Clone, Copy, Debug)]
pub struct SamplingConfig {
    pub interval_ms: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct ClassifierConfig {
    pub shake_threshold: f32,
    pub swipe_threshold: f32,
    /// Reproduces the historical `x > -swipe_threshold` SwipeRight test.
    pub swipe_right_legacy_compare: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct DebounceConfig {
    pub shake_cancel_ms: u64,
    pub swipe_trigger_ms: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct DoubleShakeConfig {
    pub window_ms: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct CountdownConfig {
    pub duration_ms: u64,
    pub tick_ms: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct BindingsConfig {
    pub refresh_ms: u64,
    pub storage_key: &'static str,
    pub shake_enabled_key: &'static str,
}

#[derive(Clone, Copy, Debug)]
pub struct HapticsConfig {
    pub countdown_start_pattern_ms: &'static [u64],
    pub cancel_pulse_ms: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct IncidentsConfig {
    pub enabled: bool,
    pub status: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionRoute {
    pub name: &'static str,
    pub number: &'static str,
    pub incident_type: &'static str,
}

#[derive(Clone, Copy, Debug)]
pub struct DispatchConfig {
    pub sampling: SamplingConfig,
    pub classifier: ClassifierConfig,
    pub debounce: DebounceConfig,
    pub double_shake: DoubleShakeConfig,
    pub countdown: CountdownConfig,
    pub bindings: BindingsConfig,
    pub haptics: HapticsConfig,
    pub incidents: IncidentsConfig,
    pub actions: &'static [ActionRoute],
}

include!(concat!(env!("OUT_DIR"), "/dispatch_config.rs"));

pub fn active_config() -> &'static DispatchConfig {
    &DISPATCH_CONFIG
}

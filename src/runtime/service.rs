use crate::{
    actions::ActionExecutor,
    bindings::BindingStore,
    config::DispatchConfig,
    dispatch::{CancelReason, DispatchAction, DispatchEngine, EngineOutput},
    gesture::MotionSample,
    platform::{AlertOps, HapticsOps, UserAlert},
};

/// Owns the engine and every capability its decisions reach.
///
/// All methods take the session clock in milliseconds and run one input to
/// completion, including the haptic, alert and dial side effects.
pub struct DispatchService {
    config: &'static DispatchConfig,
    engine: DispatchEngine,
    store: BindingStore,
    executor: ActionExecutor,
    haptics: Box<dyn HapticsOps>,
    alerts: Box<dyn AlertOps>,
    refresh_at_ms: Option<u64>,
}

impl DispatchService {
    pub fn new(
        config: &'static DispatchConfig,
        store: BindingStore,
        executor: ActionExecutor,
        haptics: Box<dyn HapticsOps>,
        alerts: Box<dyn AlertOps>,
    ) -> Self {
        Self {
            config,
            engine: DispatchEngine::new(config),
            store,
            executor,
            haptics,
            alerts,
            refresh_at_ms: None,
        }
    }

    pub fn config(&self) -> &'static DispatchConfig {
        self.config
    }

    pub fn engine(&self) -> &DispatchEngine {
        &self.engine
    }

    pub fn store(&self) -> &BindingStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut BindingStore {
        &mut self.store
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_session_active()
    }

    pub fn start(&mut self, user_id: Option<String>, now_ms: u64) {
        self.executor.set_user_id(user_id);
        self.refresh_bindings(now_ms);
        self.engine.begin_session();
    }

    pub fn handle_sample(&mut self, sample: MotionSample) -> EngineOutput {
        let output = self.engine.on_sample(sample);
        self.apply(&output);
        output
    }

    /// Delivers due timers and the periodic binding refresh.
    pub fn poll(&mut self, now_ms: u64) -> EngineOutput {
        if self.refresh_at_ms.is_some_and(|at| now_ms >= at) {
            self.refresh_bindings(now_ms);
        }
        let output = self.engine.poll(now_ms);
        self.apply(&output);
        output
    }

    pub fn user_cancel(&mut self, now_ms: u64) -> EngineOutput {
        let output = self.engine.cancel(now_ms);
        self.apply(&output);
        output
    }

    pub fn bindings_changed(&mut self, now_ms: u64) -> EngineOutput {
        self.refresh_bindings(now_ms);
        self.poll(now_ms)
    }

    pub fn next_deadline_ms(&self) -> Option<u64> {
        match (self.engine.next_deadline_ms(), self.refresh_at_ms) {
            (Some(engine), Some(refresh)) => Some(engine.min(refresh)),
            (engine, refresh) => engine.or(refresh),
        }
    }

    pub fn shutdown(&mut self, now_ms: u64) -> EngineOutput {
        self.refresh_at_ms = None;
        self.executor.set_user_id(None);
        let output = self.engine.end_session(now_ms);
        self.apply(&output);
        output
    }

    pub fn alert(&mut self, alert: UserAlert) {
        self.alerts.alert(alert);
    }

    fn refresh_bindings(&mut self, now_ms: u64) {
        let snapshot = self.store.reload();
        self.engine.set_bindings(snapshot);
        self.engine.set_shake_enabled(self.store.shake_enabled());
        self.refresh_at_ms = Some(now_ms.saturating_add(self.config.bindings.refresh_ms));
    }

    fn apply(&mut self, output: &EngineOutput) {
        for action in output.actions.iter() {
            match action {
                DispatchAction::CountdownStarted {
                    action,
                    duration_ms,
                    ..
                } => {
                    self.haptics
                        .vibrate_pattern(self.config.haptics.countdown_start_pattern_ms);
                    self.alerts.alert(UserAlert::CountdownStarted {
                        action: action.clone(),
                        seconds: duration_ms.div_ceil(self.config.countdown.tick_ms.max(1)),
                    });
                }
                DispatchAction::CountdownTick {
                    action,
                    remaining_secs,
                } => self.alerts.alert(UserAlert::CountdownTick {
                    action: action.clone(),
                    remaining_secs: *remaining_secs,
                }),
                // Teardown is silent.
                DispatchAction::CountdownCancelled {
                    reason: CancelReason::SessionEnded,
                    ..
                } => {}
                DispatchAction::CountdownCancelled { action, .. } => {
                    self.haptics.vibrate(self.config.haptics.cancel_pulse_ms);
                    self.alerts.alert(UserAlert::CountdownCancelled {
                        action: action.clone(),
                    });
                }
                DispatchAction::Execute { action, .. } => {
                    if let Err(err) = self.executor.run(action) {
                        log::warn!("service: action_failed err={err}");
                        self.alerts.alert(err.to_alert());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use anyhow::Result;

    use super::*;
    use crate::{bindings::MemoryStore, config::active_config, platform::DialerOps};

    #[derive(Clone, Default)]
    struct Recorder {
        dialed: Rc<RefCell<Vec<String>>>,
        alerts: Rc<RefCell<Vec<UserAlert>>>,
        buzzes: Rc<RefCell<Vec<Vec<u64>>>>,
    }

    impl DialerOps for Recorder {
        fn can_open(&self, _uri: &str) -> bool {
            true
        }

        fn open(&mut self, uri: &str) -> Result<()> {
            self.dialed.borrow_mut().push(uri.to_string());
            Ok(())
        }
    }

    impl AlertOps for Recorder {
        fn alert(&mut self, alert: UserAlert) {
            self.alerts.borrow_mut().push(alert);
        }
    }

    impl HapticsOps for Recorder {
        fn vibrate_pattern(&mut self, pattern_ms: &[u64]) {
            self.buzzes.borrow_mut().push(pattern_ms.to_vec());
        }

        fn vibrate(&mut self, duration_ms: u64) {
            self.buzzes.borrow_mut().push(vec![duration_ms]);
        }
    }

    fn service(recorder: &Recorder, kv: MemoryStore) -> DispatchService {
        let config = active_config();
        DispatchService::new(
            config,
            BindingStore::new(Box::new(kv), &config.bindings),
            ActionExecutor::new(config, Box::new(recorder.clone())),
            Box::new(recorder.clone()),
            Box::new(recorder.clone()),
        )
    }

    fn shake(now_ms: u64) -> MotionSample {
        MotionSample::new(3.0, 3.0, 3.0, now_ms)
    }

    #[test]
    fn double_shake_dials_bound_number_after_countdown() {
        let recorder = Recorder::default();
        let kv = MemoryStore::new().with_entry(
            "gestures",
            r#"[{"gesture":"Shake","action":"Call Police (911)"}]"#,
        );
        let mut service = service(&recorder, kv);
        service.start(Some("user-1".to_string()), 0);

        let _ = service.handle_sample(shake(1_000));
        let _ = service.handle_sample(shake(1_200));
        assert_eq!(recorder.buzzes.borrow()[0], vec![0, 500, 200, 500]);
        assert_eq!(
            recorder.alerts.borrow()[0],
            UserAlert::CountdownStarted {
                action: "Call Police (911)".to_string(),
                seconds: 3,
            }
        );

        for now_ms in [2_200, 3_200, 4_200, 5_200] {
            let _ = service.poll(now_ms);
        }
        assert_eq!(*recorder.dialed.borrow(), vec!["tel:911".to_string()]);
        assert_eq!(recorder.alerts.borrow().len(), 3);
    }

    #[test]
    fn user_cancel_buzzes_and_prevents_dial() {
        let recorder = Recorder::default();
        let kv = MemoryStore::new().with_entry(
            "gestures",
            r#"[{"gesture":"Shake","action":"Call Police (911)"}]"#,
        );
        let mut service = service(&recorder, kv);
        service.start(None, 0);

        let _ = service.handle_sample(shake(0));
        let _ = service.handle_sample(shake(100));
        let _ = service.user_cancel(900);
        let _ = service.poll(5_000);

        assert!(recorder.dialed.borrow().is_empty());
        assert_eq!(recorder.buzzes.borrow().last(), Some(&vec![150]));
        assert!(recorder.alerts.borrow().contains(&UserAlert::CountdownCancelled {
            action: "Call Police (911)".to_string()
        }));
    }

    #[test]
    fn unknown_bound_action_alerts_after_expiry() {
        let recorder = Recorder::default();
        let kv = MemoryStore::new().with_entry(
            "gestures",
            r#"[{"gesture":"Swipe Down","action":"Call Mom"}]"#,
        );
        let mut service = service(&recorder, kv);
        service.start(None, 0);

        let _ = service.handle_sample(MotionSample::new(0.0, 0.9, 0.0, 0));
        let _ = service.poll(3_000);

        assert!(recorder.dialed.borrow().is_empty());
        assert_eq!(
            recorder.alerts.borrow().last(),
            Some(&UserAlert::UnknownAction {
                action: "Call Mom".to_string()
            })
        );
        assert!(!service.engine().countdown_state().active);
    }

    #[test]
    fn periodic_refresh_picks_up_new_bindings() {
        let recorder = Recorder::default();
        let mut service = service(&recorder, MemoryStore::new());
        service.start(None, 0);
        assert!(service.engine().bindings().is_empty());
        assert_eq!(service.next_deadline_ms(), Some(5_000));

        service
            .store_mut()
            .save(&[crate::bindings::GestureBinding::new(
                crate::gesture::GestureLabel::SwipeUp,
                "Call Ambulance (143)",
            )])
            .expect("save");
        let _ = service.poll(4_999);
        assert_eq!(service.next_deadline_ms(), Some(5_000));
        let _ = service.poll(5_000);

        assert_eq!(service.engine().bindings().len(), 1);
        assert_eq!(service.next_deadline_ms(), Some(10_000));
    }

    #[test]
    fn shutdown_is_silent_and_stops_refresh() {
        let recorder = Recorder::default();
        let kv = MemoryStore::new().with_entry(
            "gestures",
            r#"[{"gesture":"Shake","action":"Call Police (911)"}]"#,
        );
        let mut service = service(&recorder, kv);
        service.start(None, 0);
        let _ = service.handle_sample(shake(0));
        let _ = service.handle_sample(shake(100));
        let alerts_before = recorder.alerts.borrow().len();

        let _ = service.shutdown(1_000);
        let _ = service.poll(4_000);

        assert!(!service.is_running());
        assert_eq!(service.next_deadline_ms(), None);
        assert_eq!(recorder.alerts.borrow().len(), alerts_before);
        assert!(recorder.dialed.borrow().is_empty());
    }

    #[test]
    fn disabled_shake_flag_applies_on_start() {
        let recorder = Recorder::default();
        let kv = MemoryStore::new()
            .with_entry(
                "gestures",
                r#"[{"gesture":"Shake","action":"Call Police (911)"}]"#,
            )
            .with_entry("shakeEnabled", "false");
        let mut service = service(&recorder, kv);
        service.start(None, 0);

        let _ = service.handle_sample(shake(0));
        let output = service.handle_sample(shake(100));
        assert!(output.actions.is_empty());
        assert!(recorder.buzzes.borrow().is_empty());
    }
}

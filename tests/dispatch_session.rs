use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use anyhow::{bail, Result};
use embassy_futures::{block_on, join::join};
use embassy_time::Timer;
use fernandino::{
    actions::ActionExecutor,
    bindings::{BindingStore, GestureBinding, MemoryStore},
    config::{active_config, CountdownConfig, DispatchConfig},
    gesture::GestureLabel,
    platform::{
        AlertOps, DialerOps, HapticsOps, KeyValueOps, MotionListener, MotionReading,
        MotionSensorOps, SensorSubscription, UserAlert,
    },
    run_dispatch_session,
    runtime::SessionError,
    DispatchInbox, DispatchInput, DispatchService,
};

#[derive(Clone, Default)]
struct FakeSensor {
    listener: Rc<RefCell<Option<MotionListener>>>,
    removed: Rc<Cell<bool>>,
    fail: bool,
}

impl FakeSensor {
    fn emit(&self, x: f32, y: f32, z: f32) {
        if let Some(listener) = self.listener.borrow_mut().as_mut() {
            listener(MotionReading { x, y, z });
        }
    }

    fn shake(&self) {
        self.emit(3.0, 3.0, 3.0);
    }
}

struct FakeSubscription {
    listener: Rc<RefCell<Option<MotionListener>>>,
    removed: Rc<Cell<bool>>,
}

impl SensorSubscription for FakeSubscription {
    fn remove(self) {
        self.listener.borrow_mut().take();
        self.removed.set(true);
    }
}

impl MotionSensorOps for FakeSensor {
    type Subscription = FakeSubscription;

    fn subscribe(
        &mut self,
        _interval_ms: u64,
        listener: MotionListener,
    ) -> Result<Self::Subscription> {
        if self.fail {
            bail!("accelerometer not available");
        }
        *self.listener.borrow_mut() = Some(listener);
        Ok(FakeSubscription {
            listener: Rc::clone(&self.listener),
            removed: Rc::clone(&self.removed),
        })
    }
}

#[derive(Clone, Default)]
struct Phone {
    dialed: Rc<RefCell<Vec<String>>>,
    alerts: Rc<RefCell<Vec<UserAlert>>>,
}

impl DialerOps for Phone {
    fn can_open(&self, uri: &str) -> bool {
        uri.starts_with("tel:")
    }

    fn open(&mut self, uri: &str) -> Result<()> {
        self.dialed.borrow_mut().push(uri.to_string());
        Ok(())
    }
}

impl AlertOps for Phone {
    fn alert(&mut self, alert: UserAlert) {
        self.alerts.borrow_mut().push(alert);
    }
}

impl HapticsOps for Phone {
    fn vibrate_pattern(&mut self, _pattern_ms: &[u64]) {}

    fn vibrate(&mut self, _duration_ms: u64) {}
}

#[derive(Clone, Default)]
struct SharedKv(Rc<RefCell<MemoryStore>>);

impl KeyValueOps for SharedKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.0.borrow().get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.0.borrow_mut().set(key, value)
    }
}

const AMBULANCE_ON_SWIPE_UP: &str = r#"[{"gesture":"Swipe Up","action":"Call Ambulance (143)"}]"#;

fn config_with(duration_ms: u64, tick_ms: u64) -> &'static DispatchConfig {
    Box::leak(Box::new(DispatchConfig {
        countdown: CountdownConfig {
            duration_ms,
            tick_ms,
        },
        ..*active_config()
    }))
}

fn fast_config() -> &'static DispatchConfig {
    config_with(300, 100)
}

fn inbox() -> &'static DispatchInbox {
    Box::leak(Box::new(DispatchInbox::new()))
}

fn service(config: &'static DispatchConfig, phone: &Phone, kv: SharedKv) -> DispatchService {
    DispatchService::new(
        config,
        BindingStore::new(Box::new(kv), &config.bindings),
        ActionExecutor::new(config, Box::new(phone.clone())),
        Box::new(phone.clone()),
        Box::new(phone.clone()),
    )
}

fn kv_with(raw: &str) -> SharedKv {
    SharedKv(Rc::new(RefCell::new(MemoryStore::new().with_entry("gestures", raw))))
}

#[test]
fn double_shake_session_dials_once() {
    let phone = Phone::default();
    let sensor = FakeSensor::default();
    let inbox = inbox();
    let mut service = service(
        fast_config(),
        &phone,
        kv_with(r#"[{"gesture":"Shake","action":"Call Police (911)"}]"#),
    );
    let mut session_sensor = sensor.clone();

    let (result, ()) = block_on(join(
        run_dispatch_session(inbox, &mut session_sensor, &mut service, Some("u-1".into())),
        async {
            sensor.shake();
            sensor.shake();
            Timer::after_millis(700).await;
            inbox.push(DispatchInput::Logout).await;
        },
    ));

    assert_eq!(result, Ok(()));
    assert_eq!(*phone.dialed.borrow(), vec!["tel:911".to_string()]);
    assert!(sensor.removed.get());
    assert!(!service.is_running());
}

#[test]
fn logout_during_countdown_never_dials() {
    let phone = Phone::default();
    let sensor = FakeSensor::default();
    let inbox = inbox();
    let mut service = service(
        active_config(),
        &phone,
        kv_with(r#"[{"gesture":"Shake","action":"Call Police (911)"}]"#),
    );
    let mut session_sensor = sensor.clone();

    let (result, ()) = block_on(join(
        run_dispatch_session(inbox, &mut session_sensor, &mut service, None),
        async {
            sensor.shake();
            sensor.shake();
            Timer::after_millis(50).await;
            inbox.push(DispatchInput::Logout).await;
        },
    ));

    assert_eq!(result, Ok(()));
    assert!(phone.alerts.borrow().iter().any(|alert| matches!(
        alert,
        UserAlert::CountdownStarted { .. }
    )));
    assert!(phone.dialed.borrow().is_empty());
    assert!(!service.engine().countdown_state().active);
    assert!(inbox.is_empty());

    // Readings after teardown go nowhere.
    sensor.shake();
    assert!(inbox.is_empty());
}

#[test]
fn user_cancel_from_prompt_stops_countdown() {
    let phone = Phone::default();
    let sensor = FakeSensor::default();
    let inbox = inbox();
    let mut service = service(
        fast_config(),
        &phone,
        kv_with(AMBULANCE_ON_SWIPE_UP),
    );
    let mut session_sensor = sensor.clone();

    let (result, ()) = block_on(join(
        run_dispatch_session(inbox, &mut session_sensor, &mut service, None),
        async {
            sensor.emit(0.0, -0.9, 0.0);
            Timer::after_millis(20).await;
            inbox.push(DispatchInput::UserCancel).await;
            Timer::after_millis(500).await;
            inbox.push(DispatchInput::Logout).await;
        },
    ));

    assert_eq!(result, Ok(()));
    assert!(phone.dialed.borrow().is_empty());
    assert!(phone.alerts.borrow().contains(&UserAlert::CountdownCancelled {
        action: "Call Ambulance (143)".to_string()
    }));
}

#[test]
fn queued_cancel_shake_beats_overdue_expiry() {
    let phone = Phone::default();
    let sensor = FakeSensor::default();
    let inbox = inbox();
    let mut service = service(
        config_with(1_000, 1_000),
        &phone,
        kv_with(AMBULANCE_ON_SWIPE_UP),
    );
    let mut session_sensor = sensor.clone();

    let (result, ()) = block_on(join(
        run_dispatch_session(inbox, &mut session_sensor, &mut service, None),
        async {
            sensor.emit(0.0, -0.9, 0.0);
            Timer::after_millis(700).await;
            // Both readings are stamped before expiry but only reach the
            // session once the deadline has passed.
            sensor.emit(0.0, 0.0, 1.0);
            sensor.shake();
            std::thread::sleep(std::time::Duration::from_millis(600));
            Timer::after_millis(50).await;
            inbox.push(DispatchInput::Logout).await;
        },
    ));

    assert_eq!(result, Ok(()));
    assert!(phone.dialed.borrow().is_empty());
    assert!(phone.alerts.borrow().contains(&UserAlert::CountdownCancelled {
        action: "Call Ambulance (143)".to_string()
    }));
}

#[test]
fn bindings_changed_applies_without_waiting_for_refresh() {
    let phone = Phone::default();
    let sensor = FakeSensor::default();
    let inbox = inbox();
    let kv = kv_with("[]");
    let mut writer = BindingStore::new(Box::new(kv.clone()), &active_config().bindings);
    let mut service = service(fast_config(), &phone, kv);
    let mut session_sensor = sensor.clone();

    let (result, ()) = block_on(join(
        run_dispatch_session(inbox, &mut session_sensor, &mut service, None),
        async {
            writer
                .save(&[GestureBinding::new(
                    GestureLabel::SwipeDown,
                    "Call Fire Station (160)",
                )])
                .expect("save");
            inbox.push(DispatchInput::BindingsChanged).await;
            Timer::after_millis(20).await;
            sensor.emit(0.0, 0.9, 0.0);
            Timer::after_millis(600).await;
            inbox.push(DispatchInput::Logout).await;
        },
    ));

    assert_eq!(result, Ok(()));
    assert_eq!(*phone.dialed.borrow(), vec!["tel:160".to_string()]);
}

#[test]
fn missing_sensor_fails_session_start() {
    let phone = Phone::default();
    let mut sensor = FakeSensor {
        fail: true,
        ..FakeSensor::default()
    };
    let mut service = service(active_config(), &phone, kv_with("[]"));

    let result = block_on(run_dispatch_session(inbox(), &mut sensor, &mut service, None));

    assert!(matches!(result, Err(SessionError::SensorUnavailable(_))));
    assert_eq!(*phone.alerts.borrow(), vec![UserAlert::SensorUnavailable]);
    assert!(!service.is_running());
}

#[test]
fn full_inbox_drops_input() {
    let inbox = DispatchInbox::new();
    for _ in 0..16 {
        assert!(inbox.try_push(DispatchInput::UserCancel));
    }
    assert!(!inbox.try_push(DispatchInput::UserCancel));
    assert_eq!(inbox.len(), 16);
}

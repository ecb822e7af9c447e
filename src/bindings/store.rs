use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{config::BindingsConfig, gesture::GestureLabel, platform::KeyValueOps};

pub type ActionName = String;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct GestureBinding {
    pub gesture: GestureLabel,
    pub action: ActionName,
}

impl GestureBinding {
    pub fn new(gesture: GestureLabel, action: impl Into<ActionName>) -> Self {
        Self {
            gesture,
            action: action.into(),
        }
    }
}

#[derive(Deserialize)]
struct StoredBinding {
    gesture: String,
    action: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StoreError {
    Unavailable(String),
    Malformed(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
            Self::Malformed(msg) => write!(f, "malformed bindings: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Entries with an unknown gesture, `None`, or an empty action are skipped.
pub fn decode_bindings(raw: &str) -> Result<Vec<GestureBinding>, StoreError> {
    let stored: Vec<StoredBinding> =
        serde_json::from_str(raw).map_err(|e| StoreError::Malformed(e.to_string()))?;

    let mut bindings = Vec::with_capacity(stored.len());
    for entry in stored {
        let gesture = match entry.gesture.parse::<GestureLabel>() {
            Ok(GestureLabel::None) | Err(_) => {
                log::warn!("bindings: skip_entry gesture={:?}", entry.gesture);
                continue;
            }
            Ok(gesture) => gesture,
        };
        if entry.action.trim().is_empty() {
            log::warn!("bindings: skip_entry empty_action gesture={gesture}");
            continue;
        }
        bindings.push(GestureBinding::new(gesture, entry.action));
    }
    Ok(bindings)
}

pub fn encode_bindings(bindings: &[GestureBinding]) -> Result<String, StoreError> {
    serde_json::to_string(bindings).map_err(|e| StoreError::Malformed(e.to_string()))
}

/// In-memory view of the persisted gesture bindings.
///
/// The detection path only ever sees a whole `Arc<[GestureBinding]>`; a reload
/// swaps the reference instead of editing the list in place.
pub struct BindingStore {
    kv: Box<dyn KeyValueOps>,
    storage_key: &'static str,
    shake_enabled_key: &'static str,
    snapshot: Arc<[GestureBinding]>,
    shake_enabled: bool,
    last_error: Option<StoreError>,
}

impl BindingStore {
    pub fn new(kv: Box<dyn KeyValueOps>, config: &BindingsConfig) -> Self {
        Self {
            kv,
            storage_key: config.storage_key,
            shake_enabled_key: config.shake_enabled_key,
            snapshot: Arc::from(Vec::new()),
            shake_enabled: true,
            last_error: None,
        }
    }

    /// Reads the bindings straight from storage. Failures yield an empty list.
    pub fn load(&mut self) -> Vec<GestureBinding> {
        match self.try_load() {
            Ok(bindings) => {
                self.last_error = None;
                bindings
            }
            Err(err) => {
                self.note_error(err);
                Vec::new()
            }
        }
    }

    pub fn reload(&mut self) -> Arc<[GestureBinding]> {
        let bindings = self.load();
        self.shake_enabled = self.read_shake_enabled();
        self.snapshot = Arc::from(bindings);
        log::debug!(
            "bindings: reloaded count={} shake_enabled={}",
            self.snapshot.len(),
            self.shake_enabled
        );
        self.snapshot()
    }

    pub fn save(&mut self, bindings: &[GestureBinding]) -> Result<(), StoreError> {
        let encoded = encode_bindings(bindings)?;
        self.kv
            .set(self.storage_key, &encoded)
            .map_err(|e| StoreError::Unavailable(format!("{e:#}")))?;
        self.snapshot = Arc::from(bindings.to_vec());
        Ok(())
    }

    pub fn set_shake_enabled(&mut self, enabled: bool) -> Result<(), StoreError> {
        let value = if enabled { "true" } else { "false" };
        self.kv
            .set(self.shake_enabled_key, value)
            .map_err(|e| StoreError::Unavailable(format!("{e:#}")))?;
        self.shake_enabled = enabled;
        Ok(())
    }

    pub fn snapshot(&self) -> Arc<[GestureBinding]> {
        Arc::clone(&self.snapshot)
    }

    pub fn shake_enabled(&self) -> bool {
        self.shake_enabled
    }

    pub fn last_error(&self) -> Option<&StoreError> {
        self.last_error.as_ref()
    }

    fn try_load(&self) -> Result<Vec<GestureBinding>, StoreError> {
        let raw = self
            .kv
            .get(self.storage_key)
            .map_err(|e| StoreError::Unavailable(format!("{e:#}")))?;
        match raw {
            None => Ok(Vec::new()),
            Some(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Some(raw) => decode_bindings(&raw),
        }
    }

    fn read_shake_enabled(&mut self) -> bool {
        match self.kv.get(self.shake_enabled_key) {
            Ok(Some(raw)) => !matches!(raw.trim(), "false" | "0"),
            Ok(None) => true,
            Err(err) => {
                log::debug!("bindings: shake_flag_read_failed err={err:#}");
                self.shake_enabled
            }
        }
    }

    // Polling runs every few seconds; repeat failures stay at debug level.
    fn note_error(&mut self, err: StoreError) {
        if self.last_error.as_ref() == Some(&err) {
            log::debug!("bindings: load_failed_again err={err}");
        } else {
            log::warn!("bindings: load_failed err={err}");
        }
        self.last_error = Some(err);
    }
}

/// First binding whose gesture matches wins.
pub fn find_binding(bindings: &[GestureBinding], gesture: GestureLabel) -> Option<&GestureBinding> {
    bindings.iter().find(|binding| binding.gesture == gesture)
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::{bindings::kv::MemoryStore, config::active_config};

    struct BrokenStore;

    impl KeyValueOps for BrokenStore {
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Err(anyhow!("disk unavailable"))
        }

        fn set(&mut self, _key: &str, _value: &str) -> anyhow::Result<()> {
            Err(anyhow!("disk unavailable"))
        }
    }

    fn store_with(raw: &str) -> BindingStore {
        let kv = MemoryStore::new().with_entry("gestures", raw);
        BindingStore::new(Box::new(kv), &active_config().bindings)
    }

    #[test]
    fn decodes_stored_list_and_skips_invalid_entries() {
        let raw = r#"[
            {"gesture":"Shake","action":"Call Police (911)"},
            {"gesture":"Swipe Up","action":"Call Ambulance (143)"},
            {"gesture":"None","action":"Call Fire Station (160)"},
            {"gesture":"Wave","action":"Call Fire Station (160)"},
            {"gesture":"SwipeLeft","action":"  "}
        ]"#;
        let bindings = decode_bindings(raw).expect("decode");
        assert_eq!(
            bindings,
            vec![
                GestureBinding::new(GestureLabel::Shake, "Call Police (911)"),
                GestureBinding::new(GestureLabel::SwipeUp, "Call Ambulance (143)"),
            ]
        );
    }

    #[test]
    fn malformed_json_loads_as_empty_and_records_error() {
        let mut store = store_with("{\"gesture\":");
        assert!(store.load().is_empty());
        assert!(matches!(store.last_error(), Some(StoreError::Malformed(_))));
    }

    #[test]
    fn unavailable_storage_loads_as_empty() {
        let mut store = BindingStore::new(Box::new(BrokenStore), &active_config().bindings);
        assert!(store.reload().is_empty());
        assert!(matches!(store.last_error(), Some(StoreError::Unavailable(_))));
        assert!(store.shake_enabled());
    }

    #[test]
    fn reload_replaces_snapshot_without_touching_held_copies() {
        let mut store = store_with(r#"[{"gesture":"Shake","action":"Call Police (911)"}]"#);
        let held = store.reload();
        assert_eq!(held.len(), 1);

        store
            .save(&[GestureBinding::new(GestureLabel::SwipeDown, "Call Fire Station (160)")])
            .expect("save");
        let fresh = store.reload();

        assert_eq!(held[0].gesture, GestureLabel::Shake);
        assert_eq!(fresh[0].gesture, GestureLabel::SwipeDown);
        assert!(store.last_error().is_none());
    }

    #[test]
    fn first_match_wins() {
        let bindings = [
            GestureBinding::new(GestureLabel::Shake, "Call Police (911)"),
            GestureBinding::new(GestureLabel::Shake, "Call Ambulance (143)"),
        ];
        let found = find_binding(&bindings, GestureLabel::Shake).expect("binding");
        assert_eq!(found.action, "Call Police (911)");
        assert!(find_binding(&bindings, GestureLabel::SwipeUp).is_none());
    }

    #[test]
    fn shake_flag_defaults_on_and_follows_storage() {
        let mut store = store_with("[]");
        store.reload();
        assert!(store.shake_enabled());

        store.set_shake_enabled(false).expect("set flag");
        store.reload();
        assert!(!store.shake_enabled());
    }
}

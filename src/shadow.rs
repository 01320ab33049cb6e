//! Device shadow (digital twin) store.
//!
//! One shadow per device name, holding the device's last-known attribute and
//! telemetry points plus its connectivity state. The store serializes all
//! mutation behind one async `RwLock`; the guarded sections never await, so
//! the lock is held only for the map operation itself.
//!
//! Offline detection is debounced: transient disconnects do not flip the
//! online flag. Only when the disconnect count reaches the configured
//! threshold inside a rolling window does the device go offline.

use crate::errors::ShadowError;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Which point map of a shadow an update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointClass {
    Attributes,
    Telemetry,
}

impl PointClass {
    /// The classify string used by the product template repository.
    pub fn as_str(&self) -> &'static str {
        match self {
            PointClass::Attributes => "attributes",
            PointClass::Telemetry => "telemetry",
        }
    }
}

/// A single named value on a shadow, replaced wholesale on update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DevicePoint {
    pub name: String,
    pub title: String,
    pub value: Value,
    pub unit: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Per-device twin record.
#[derive(Debug, Clone)]
pub struct DeviceShadow {
    pub name: String,
    pub product_name: String,
    pub attributes: HashMap<String, DevicePoint>,
    pub telemetry: HashMap<String, DevicePoint>,
    pub online: bool,
    pub updated_at: DateTime<Utc>,
    disconnect_count: u32,
    first_disconnect_at: Option<DateTime<Utc>>,
}

impl DeviceShadow {
    /// A shadow is created in response to a connect, so it starts online.
    pub fn new(name: impl Into<String>, product_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            product_name: product_name.into(),
            attributes: HashMap::new(),
            telemetry: HashMap::new(),
            online: true,
            updated_at: Utc::now(),
            disconnect_count: 0,
            first_disconnect_at: None,
        }
    }

    pub fn disconnect_count(&self) -> u32 {
        self.disconnect_count
    }

    fn points_mut(&mut self, class: PointClass) -> &mut HashMap<String, DevicePoint> {
        match class {
            PointClass::Attributes => &mut self.attributes,
            PointClass::Telemetry => &mut self.telemetry,
        }
    }
}

/// Shared store of device shadows with debounced offline transitions.
pub struct ShadowStore {
    devices: RwLock<HashMap<String, DeviceShadow>>,
    offline_threshold: u32,
    offline_window: Duration,
}

impl Default for ShadowStore {
    fn default() -> Self {
        Self::new(3, 60)
    }
}

impl ShadowStore {
    pub fn new(offline_threshold: u32, offline_window_seconds: i64) -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            offline_threshold: offline_threshold.max(1),
            offline_window: Duration::seconds(offline_window_seconds),
        }
    }

    /// Snapshot of a device's shadow.
    pub async fn get(&self, name: &str) -> Result<DeviceShadow, ShadowError> {
        let devices = self.devices.read().await;
        devices
            .get(name)
            .cloned()
            .ok_or_else(|| ShadowError::DeviceNotFound {
                name: name.to_string(),
            })
    }

    /// Insert a shadow if the device has none yet. An existing shadow's
    /// accumulated state is never overwritten.
    pub async fn add_device(&self, shadow: DeviceShadow) {
        let mut devices = self.devices.write().await;
        devices.entry(shadow.name.clone()).or_insert(shadow);
    }

    /// Administrative removal.
    pub async fn remove_device(&self, name: &str) {
        let mut devices = self.devices.write().await;
        devices.remove(name);
    }

    pub async fn contains(&self, name: &str) -> bool {
        let devices = self.devices.read().await;
        devices.contains_key(name)
    }

    /// Replace one point in the selected map.
    pub async fn set_point(
        &self,
        name: &str,
        class: PointClass,
        point: DevicePoint,
    ) -> Result<(), ShadowError> {
        let mut devices = self.devices.write().await;
        let shadow = devices
            .get_mut(name)
            .ok_or_else(|| ShadowError::DeviceNotFound {
                name: name.to_string(),
            })?;
        shadow.updated_at = point.updated_at;
        shadow.points_mut(class).insert(point.name.clone(), point);
        Ok(())
    }

    /// Mark a device online and reset its debounce state.
    pub async fn set_online(&self, name: &str) -> Result<(), ShadowError> {
        let mut devices = self.devices.write().await;
        let shadow = devices
            .get_mut(name)
            .ok_or_else(|| ShadowError::DeviceNotFound {
                name: name.to_string(),
            })?;
        shadow.online = true;
        shadow.disconnect_count = 0;
        shadow.first_disconnect_at = None;
        shadow.updated_at = Utc::now();
        Ok(())
    }

    /// Record a disconnect. Returns `true` when the debounce threshold was
    /// reached and the device transitioned offline.
    pub async fn set_offline(&self, name: &str) -> Result<bool, ShadowError> {
        self.set_offline_at(name, Utc::now()).await
    }

    /// Debounce logic with an explicit clock, so the rolling window is
    /// testable without sleeping.
    pub(crate) async fn set_offline_at(
        &self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, ShadowError> {
        let mut devices = self.devices.write().await;
        let shadow = devices
            .get_mut(name)
            .ok_or_else(|| ShadowError::DeviceNotFound {
                name: name.to_string(),
            })?;

        match shadow.first_disconnect_at {
            Some(first) if now - first <= self.offline_window => {
                shadow.disconnect_count += 1;
            }
            _ => {
                // Window elapsed (or first disconnect): restart the count.
                shadow.first_disconnect_at = Some(now);
                shadow.disconnect_count = 1;
            }
        }
        shadow.updated_at = now;

        if shadow.disconnect_count >= self.offline_threshold {
            shadow.online = false;
            shadow.disconnect_count = 0;
            shadow.first_disconnect_at = None;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(name: &str, value: Value) -> DevicePoint {
        DevicePoint {
            name: name.to_string(),
            title: name.to_string(),
            value,
            unit: None,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_add_device_is_idempotent() {
        let store = ShadowStore::default();
        store.add_device(DeviceShadow::new("d1", "thermostat")).await;
        store
            .set_point("d1", PointClass::Telemetry, point("temp", json!(20)))
            .await
            .unwrap();

        // Second add must not clobber the accumulated point.
        store.add_device(DeviceShadow::new("d1", "thermostat")).await;

        let shadow = store.get("d1").await.unwrap();
        assert_eq!(shadow.telemetry.get("temp").unwrap().value, json!(20));
    }

    #[tokio::test]
    async fn test_set_point_unknown_device_fails() {
        let store = ShadowStore::default();
        let result = store
            .set_point("ghost", PointClass::Attributes, point("fw", json!("1.0")))
            .await;
        assert!(matches!(result, Err(ShadowError::DeviceNotFound { .. })));
    }

    #[tokio::test]
    async fn test_point_replacement_is_wholesale() {
        let store = ShadowStore::default();
        store.add_device(DeviceShadow::new("d1", "thermostat")).await;

        store
            .set_point("d1", PointClass::Telemetry, point("temp", json!(20)))
            .await
            .unwrap();
        store
            .set_point("d1", PointClass::Telemetry, point("temp", json!(25)))
            .await
            .unwrap();

        let shadow = store.get("d1").await.unwrap();
        assert_eq!(shadow.telemetry.len(), 1);
        assert_eq!(shadow.telemetry.get("temp").unwrap().value, json!(25));
    }

    #[tokio::test]
    async fn test_debounce_two_disconnects_stay_online() {
        let store = ShadowStore::new(3, 60);
        store.add_device(DeviceShadow::new("d1", "p")).await;

        let now = Utc::now();
        assert!(!store.set_offline_at("d1", now).await.unwrap());
        assert!(!store
            .set_offline_at("d1", now + Duration::seconds(10))
            .await
            .unwrap());

        let shadow = store.get("d1").await.unwrap();
        assert!(shadow.online);
        assert_eq!(shadow.disconnect_count(), 2);
    }

    #[tokio::test]
    async fn test_debounce_third_disconnect_in_window_goes_offline() {
        let store = ShadowStore::new(3, 60);
        store.add_device(DeviceShadow::new("d1", "p")).await;

        let now = Utc::now();
        store.set_offline_at("d1", now).await.unwrap();
        store
            .set_offline_at("d1", now + Duration::seconds(5))
            .await
            .unwrap();
        let flipped = store
            .set_offline_at("d1", now + Duration::seconds(10))
            .await
            .unwrap();

        assert!(flipped);
        let shadow = store.get("d1").await.unwrap();
        assert!(!shadow.online);
        assert_eq!(shadow.disconnect_count(), 0);
    }

    #[tokio::test]
    async fn test_debounce_window_elapse_restarts_count() {
        let store = ShadowStore::new(3, 60);
        store.add_device(DeviceShadow::new("d1", "p")).await;

        let now = Utc::now();
        store.set_offline_at("d1", now).await.unwrap();
        store
            .set_offline_at("d1", now + Duration::seconds(30))
            .await
            .unwrap();
        // Outside the window of the first disconnect: count restarts at 1.
        let flipped = store
            .set_offline_at("d1", now + Duration::seconds(90))
            .await
            .unwrap();

        assert!(!flipped);
        let shadow = store.get("d1").await.unwrap();
        assert!(shadow.online);
        assert_eq!(shadow.disconnect_count(), 1);
    }

    #[tokio::test]
    async fn test_set_online_resets_debounce_state() {
        let store = ShadowStore::new(3, 60);
        store.add_device(DeviceShadow::new("d1", "p")).await;

        let now = Utc::now();
        store.set_offline_at("d1", now).await.unwrap();
        store
            .set_offline_at("d1", now + Duration::seconds(1))
            .await
            .unwrap();
        store.set_online("d1").await.unwrap();

        let shadow = store.get("d1").await.unwrap();
        assert!(shadow.online);
        assert_eq!(shadow.disconnect_count(), 0);

        // A fresh disconnect sequence starts from scratch.
        assert!(!store
            .set_offline_at("d1", now + Duration::seconds(2))
            .await
            .unwrap());
    }
}

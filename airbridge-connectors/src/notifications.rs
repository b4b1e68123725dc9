//! Push-notification intake shared by the notification server and MQTT.
//!
//! The host's notification collaborator receives `{characteristic, value}`
//! payloads addressed by accessory id and hands them to the registry, which
//! checks the shared secret and routes to the accessory's sink. Values are
//! whatever the sensor pushed, so numbers and numeric strings are both
//! carried as-is and coerced at application time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use thiserror::Error;

use crate::NotificationSink;

/// Value carried by a push update.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NotificationValue {
    /// Numeric payload.
    Number(f64),
    /// Textual payload, possibly numeric.
    Text(String),
}

impl NotificationValue {
    /// Numeric view of the value, if it has one. Text is trimmed and parsed
    /// the same way bulk-document fields are, and non-finite values (the
    /// literal `nan` a failing sensor publishes) have no numeric view.
    pub fn as_f32(&self) -> Option<f32> {
        let number = match self {
            NotificationValue::Number(number) => Some(*number as f32),
            NotificationValue::Text(text) => text.trim().parse().ok(),
        };
        number.filter(|number| number.is_finite())
    }

    /// Integral view for ordinal-carrying payloads; fractional or
    /// out-of-range numbers have no ordinal.
    pub fn as_ordinal(&self) -> Option<u8> {
        let number = self.as_f32()?;
        if number.fract() == 0.0 && (0.0..=255.0).contains(&number) {
            Some(number as u8)
        } else {
            None
        }
    }
}

/// One `{characteristic, value}` push update.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NotificationPayload {
    /// Host protocol name of the target characteristic, e.g. `PM10Density`.
    pub characteristic: String,
    /// Raw delivered value.
    pub value: NotificationValue,
}

/// Routing and credential failures on delivery.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NotificationError {
    /// No accessory is registered under the id.
    #[error("no accessory registered for id '{0}'")]
    UnknownAccessory(String),

    /// The delivered password did not match the registration.
    #[error("notification password mismatch for id '{0}'")]
    PasswordMismatch(String),

    /// An accessory is already registered under the id.
    #[error("accessory id '{0}' is already registered")]
    DuplicateId(String),
}

struct Registration {
    password: Option<String>,
    sink: Arc<dyn NotificationSink>,
}

/// Routes pushed payloads to registered accessories.
///
/// The registry does not listen on the network; whatever does parses the
/// payloads and calls [`deliver`](NotificationRegistry::deliver).
#[derive(Default)]
pub struct NotificationRegistry {
    registrations: Mutex<HashMap<String, Registration>>,
}

impl NotificationRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an accessory's sink under an id, optionally guarded by a
    /// password.
    pub fn register(
        &self,
        id: impl Into<String>,
        password: Option<String>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<(), NotificationError> {
        let id = id.into();
        let mut registrations = self.registrations.lock().unwrap();
        if registrations.contains_key(&id) {
            return Err(NotificationError::DuplicateId(id));
        }
        log::info!("notifications: registered handler for '{id}'");
        registrations.insert(id, Registration { password, sink });
        Ok(())
    }

    /// Deliver one payload to the accessory registered under `id`.
    pub async fn deliver(
        &self,
        id: &str,
        password: Option<&str>,
        payload: NotificationPayload,
    ) -> Result<(), NotificationError> {
        let sink = {
            let registrations = self.registrations.lock().unwrap();
            let registration = registrations
                .get(id)
                .ok_or_else(|| NotificationError::UnknownAccessory(id.to_string()))?;
            if registration.password.as_deref() != password {
                return Err(NotificationError::PasswordMismatch(id.to_string()));
            }
            Arc::clone(&registration.sink)
        };
        sink.notify(payload).await;
        Ok(())
    }
}

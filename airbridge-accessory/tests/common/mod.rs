//! Shared test doubles for the accessory integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use airbridge_accessory::CharacteristicStore;
use airbridge_connectors::http::{Fetch, FetchError, FetchResponse};
use airbridge_core::{AccessoryConfig, Characteristic, CharacteristicValue};
use async_trait::async_trait;

/// Scripted fetcher: pops canned responses in order and counts calls.
pub struct MockFetch {
    responses: Mutex<VecDeque<Result<FetchResponse, FetchError>>>,
    calls: Arc<AtomicUsize>,
}

impl MockFetch {
    pub fn new(responses: Vec<Result<FetchResponse, FetchError>>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = Self {
            responses: Mutex::new(responses.into()),
            calls: Arc::clone(&calls),
        };
        (fetch, calls)
    }

    pub fn ok(body: &str) -> Result<FetchResponse, FetchError> {
        Ok(FetchResponse { status: 200, body: body.to_string() })
    }

    pub fn status(status: u16, body: &str) -> Result<FetchResponse, FetchError> {
        Ok(FetchResponse { status, body: body.to_string() })
    }
}

#[async_trait]
impl Fetch for MockFetch {
    async fn fetch(&self) -> Result<FetchResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Transport("script exhausted".to_string())))
    }
}

/// Store capturing every pushed update in order.
#[derive(Default)]
pub struct RecordingStore {
    updates: Mutex<Vec<(Characteristic, CharacteristicValue)>>,
}

impl RecordingStore {
    pub fn updates(&self) -> Vec<(Characteristic, CharacteristicValue)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn last_for(&self, characteristic: Characteristic) -> Option<CharacteristicValue> {
        self.updates()
            .into_iter()
            .rev()
            .find(|(c, _)| *c == characteristic)
            .map(|(_, value)| value)
    }
}

impl CharacteristicStore for RecordingStore {
    fn update(&self, characteristic: Characteristic, value: CharacteristicValue) {
        self.updates.lock().unwrap().push((characteristic, value));
    }
}

/// Minimal valid configuration with the given cache TTL.
pub fn config(status_cache: i64) -> AccessoryConfig {
    AccessoryConfig::from_json(&format!(
        r#"{{"name": "aq test", "getUrl": "http://sensor.local/status", "statusCache": {status_cache}}}"#
    ))
    .unwrap()
}

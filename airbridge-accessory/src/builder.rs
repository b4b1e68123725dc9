//! Wires configuration, transports, and the accessory task together.

use std::sync::Arc;

use airbridge_connectors::http::{Fetch, HttpFetcher};
use airbridge_connectors::mqtt::MqttSubscriber;
use airbridge_connectors::notifications::NotificationRegistry;
use airbridge_core::config::AccessoryConfig;
use airbridge_core::errors::ConfigError;
use airbridge_core::time::{SystemClock, TimeSource};
use airbridge_core::{AccessoryState, Classifier, StalenessCache};

use crate::host::CharacteristicStore;
use crate::service::{self, AccessoryHandle, TaskConfig};

/// Assembles a running accessory from parsed configuration.
///
/// URL problems are fatal and the accessory is not built. An invalid `mqtt`
/// section is logged and MQTT stays off; the accessory still answers HTTP
/// queries.
pub struct AccessoryBuilder {
    config: AccessoryConfig,
    store: Arc<dyn CharacteristicStore>,
    registry: Option<Arc<NotificationRegistry>>,
    fetcher: Option<Box<dyn Fetch>>,
    clock: Box<dyn TimeSource>,
}

impl AccessoryBuilder {
    /// Builder over a parsed configuration and the host's store.
    pub fn new(config: AccessoryConfig, store: Arc<dyn CharacteristicStore>) -> Self {
        Self {
            config,
            store,
            registry: None,
            fetcher: None,
            clock: Box::new(SystemClock),
        }
    }

    /// Register for push notifications in this registry when the
    /// configuration carries a `notificationID`.
    pub fn with_registry(mut self, registry: Arc<NotificationRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replace the HTTP fetcher. Tests inject scripted fetchers here; the
    /// configured `getUrl` is still validated either way.
    pub fn with_fetcher(mut self, fetcher: Box<dyn Fetch>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Replace the clock driving cache staleness.
    pub fn with_clock(mut self, clock: Box<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate the configuration and spawn the accessory task.
    pub async fn spawn(self) -> Result<AccessoryHandle, ConfigError> {
        let Self { config, store, registry, fetcher, clock } = self;

        let url = config.url_settings()?;
        let thresholds = config.threshold_set()?;
        let poll_period = config.poll_period()?;
        let fetcher = match fetcher {
            Some(fetcher) => fetcher,
            None => Box::new(HttpFetcher::new(url)),
        };

        let name: Arc<str> = Arc::from(config.name.as_str());
        let handle = service::spawn_task(TaskConfig {
            name: Arc::clone(&name),
            debug: config.debug,
            state: AccessoryState::new(StalenessCache::new(config.cache_ttl())),
            classifier: Classifier::new(thresholds),
            fetcher,
            store,
            clock,
            poll_period,
        });

        if let Some(result) = config.mqtt_settings() {
            match result {
                Ok(settings) => {
                    MqttSubscriber::new(settings).spawn(Arc::new(handle.clone()));
                }
                Err(error) => {
                    log::error!("{name}: invalid mqtt configuration: {error}; mqtt stays off");
                }
            }
        }

        if let Some(id) = &config.notification_id {
            match &registry {
                Some(registry) => {
                    if let Err(error) = registry.register(
                        id.clone(),
                        config.notification_password.clone(),
                        Arc::new(handle.clone()),
                    ) {
                        log::error!("{name}: notification registration failed: {error}");
                    }
                }
                None => {
                    log::warn!("{name}: notificationID configured but no registry provided");
                }
            }
        }

        Ok(handle)
    }
}

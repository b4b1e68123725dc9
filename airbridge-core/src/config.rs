//! Accessory configuration: serde shape and semantic validation.
//!
//! The configuration document keeps its historical key names (`getUrl`,
//! `statusCache`, `pullInterval`, `notificationID`, ...), so existing
//! deployments translate one-to-one. Deserializing accepts the shape; the
//! `*_settings` methods enforce the semantic rules and produce the
//! strongly-typed values the transports consume.
//!
//! A missing or invalid `getUrl` is fatal to the accessory. An invalid
//! `mqtt` section is not: callers are expected to log it and run without
//! MQTT.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::cache::CacheTtl;
use crate::errors::ConfigError;
use crate::readings::{Characteristic, Pollutant};
use crate::thresholds::{ThresholdSet, ThresholdTable, LEVEL_COUNT};

/// Request timeout when the URL object does not name one.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 20_000;

/// Broker port when the MQTT section does not name one.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Keep-alive when the MQTT section does not name one.
pub const DEFAULT_MQTT_KEEPALIVE_SECS: u64 = 60;

/// Raw accessory configuration as found in the host's config document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryConfig {
    /// Accessory display name.
    pub name: String,

    /// Gates the per-query diagnostics the accessory logs.
    #[serde(default)]
    pub debug: bool,

    /// Endpoint serving bulk sensor documents. Required.
    #[serde(default)]
    pub get_url: Option<UrlProperty>,

    /// Result-cache TTL in milliseconds. Zero refreshes on every query,
    /// negative caches the first result forever.
    #[serde(default)]
    pub status_cache: i64,

    /// Poll period in milliseconds; absent disables polling.
    #[serde(default)]
    pub pull_interval: Option<u64>,

    /// Optional MQTT intake.
    #[serde(default)]
    pub mqtt: Option<MqttProperty>,

    /// Identifier for push-notification registration.
    #[serde(default, rename = "notificationID")]
    pub notification_id: Option<String>,

    /// Shared secret checked on notification delivery.
    #[serde(default)]
    pub notification_password: Option<String>,

    /// Optional breakpoint overrides.
    #[serde(default)]
    pub thresholds: Option<ThresholdsProperty>,
}

impl AccessoryConfig {
    /// Parse a configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validated URL settings. `getUrl` is required; without it the
    /// accessory cannot answer queries and must not be built.
    pub fn url_settings(&self) -> Result<UrlSettings, ConfigError> {
        match &self.get_url {
            Some(property) => property.validate(),
            None => Err(ConfigError::MissingUrl),
        }
    }

    /// Cache policy from `statusCache`.
    pub fn cache_ttl(&self) -> CacheTtl {
        CacheTtl::from_config_millis(self.status_cache)
    }

    /// Poll period from `pullInterval`; an explicit zero is rejected rather
    /// than busy-looping.
    pub fn poll_period(&self) -> Result<Option<Duration>, ConfigError> {
        match self.pull_interval {
            None => Ok(None),
            Some(0) => Err(ConfigError::InvalidPollInterval),
            Some(millis) => Ok(Some(Duration::from_millis(millis))),
        }
    }

    /// Threshold tables with any configured overrides applied.
    pub fn threshold_set(&self) -> Result<ThresholdSet, ConfigError> {
        let mut set = ThresholdSet::default();
        if let Some(overrides) = &self.thresholds {
            if let Some(breakpoints) = overrides.pm10 {
                set.set_table(Pollutant::Pm10, ThresholdTable::new(Pollutant::Pm10, breakpoints)?);
            }
            if let Some(breakpoints) = overrides.pm25 {
                set.set_table(Pollutant::Pm25, ThresholdTable::new(Pollutant::Pm25, breakpoints)?);
            }
        }
        Ok(set)
    }

    /// Validated MQTT settings, when an `mqtt` section is present at all.
    pub fn mqtt_settings(&self) -> Option<Result<MqttSettings, ConfigError>> {
        self.mqtt.as_ref().map(|property| property.validate(&self.name))
    }
}

/// `getUrl` accepts either a bare URL string or a detailed request object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UrlProperty {
    /// Plain URL; GET with default timeout.
    Simple(String),
    /// URL plus method, body, auth, headers, and timeout.
    Detailed(UrlObject),
}

impl UrlProperty {
    fn validate(&self) -> Result<UrlSettings, ConfigError> {
        match self {
            UrlProperty::Simple(url) => Ok(UrlSettings {
                url: checked_url(url)?,
                method: HttpMethod::Get,
                body: None,
                auth: None,
                headers: Vec::new(),
                timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            }),
            UrlProperty::Detailed(object) => {
                let method = match &object.method {
                    None => HttpMethod::Get,
                    Some(name) => HttpMethod::parse(name)
                        .ok_or_else(|| ConfigError::InvalidMethod { method: name.clone() })?,
                };
                let mut headers: Vec<(String, String)> =
                    object.headers.clone().unwrap_or_default().into_iter().collect();
                headers.sort();
                Ok(UrlSettings {
                    url: checked_url(&object.url)?,
                    method,
                    body: object.body.clone(),
                    auth: object.auth.clone(),
                    headers,
                    timeout: Duration::from_millis(
                        object.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
                    ),
                })
            }
        }
    }
}

/// Detailed form of `getUrl`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlObject {
    /// Endpoint URL.
    pub url: String,

    /// HTTP method; GET when absent.
    #[serde(default)]
    pub method: Option<String>,

    /// Request body to send with each fetch.
    #[serde(default)]
    pub body: Option<String>,

    /// Basic-auth credentials.
    #[serde(default)]
    pub auth: Option<CredentialsProperty>,

    /// Extra headers added to every request.
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,

    /// Request timeout in milliseconds.
    #[serde(default)]
    pub request_timeout: Option<u64>,
}

/// Username and password pair, shared by HTTP basic auth and MQTT.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CredentialsProperty {
    /// Account name.
    pub username: String,
    /// Account secret.
    pub password: String,
}

/// HTTP methods the fetcher speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// `GET`, the default.
    Get,
    /// `POST`.
    Post,
    /// `PUT`.
    Put,
    /// `DELETE`.
    Delete,
}

impl HttpMethod {
    /// Wire name of the method.
    pub const fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "DELETE" => Some(HttpMethod::Delete),
            _ => None,
        }
    }
}

/// Checked settings for the HTTP fetcher.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlSettings {
    /// Endpoint URL, verified to be http(s).
    pub url: String,
    /// Method for every fetch.
    pub method: HttpMethod,
    /// Body sent with every fetch, if any.
    pub body: Option<String>,
    /// Basic-auth credentials, if any.
    pub auth: Option<CredentialsProperty>,
    /// Extra headers, sorted by name.
    pub headers: Vec<(String, String)>,
    /// Per-request timeout.
    pub timeout: Duration,
}

fn checked_url(url: &str) -> Result<String, ConfigError> {
    let url = url.trim();
    let host = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"));
    match host {
        Some(host) if !host.is_empty() => Ok(url.to_string()),
        _ => Err(ConfigError::InvalidUrl { url: url.to_string() }),
    }
}

/// Raw `mqtt` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MqttProperty {
    /// Broker hostname or address.
    pub host: String,

    /// Broker port; 1883 when absent.
    #[serde(default)]
    pub port: Option<u16>,

    /// Broker protocol; plain `mqtt` is the only supported value.
    #[serde(default)]
    pub protocol: Option<String>,

    /// Broker credentials.
    #[serde(default)]
    pub credentials: Option<CredentialsProperty>,

    /// Client id; derived from the accessory name when absent.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Keep-alive in seconds.
    #[serde(default)]
    pub keepalive: Option<u64>,

    /// Topic subscriptions feeding characteristics.
    #[serde(default)]
    pub subscriptions: Vec<MqttSubscriptionProperty>,
}

impl MqttProperty {
    fn validate(&self, accessory_name: &str) -> Result<MqttSettings, ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MqttHostMissing);
        }
        match self.protocol.as_deref() {
            None | Some("mqtt") => {}
            Some(other) => {
                return Err(ConfigError::UnsupportedMqttProtocol { protocol: other.to_string() })
            }
        }

        let mut subscriptions = Vec::with_capacity(self.subscriptions.len());
        for subscription in &self.subscriptions {
            if subscription.topic.trim().is_empty() {
                return Err(ConfigError::MqttTopicMissing);
            }
            let characteristic = Characteristic::from_name(&subscription.characteristic)
                .ok_or_else(|| ConfigError::UnknownCharacteristic {
                    name: subscription.characteristic.clone(),
                })?;
            let qos = subscription.qos.unwrap_or(0);
            if qos > 2 {
                return Err(ConfigError::InvalidQos { qos });
            }
            subscriptions.push(MqttSubscription {
                topic: subscription.topic.clone(),
                characteristic,
                qos,
            });
        }

        Ok(MqttSettings {
            host: self.host.clone(),
            port: self.port.unwrap_or(DEFAULT_MQTT_PORT),
            client_id: self
                .client_id
                .clone()
                .unwrap_or_else(|| default_client_id(accessory_name)),
            credentials: self.credentials.clone(),
            keep_alive: Duration::from_secs(self.keepalive.unwrap_or(DEFAULT_MQTT_KEEPALIVE_SECS)),
            subscriptions,
        })
    }
}

/// One raw topic subscription.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MqttSubscriptionProperty {
    /// Topic filter to subscribe; wildcards are allowed.
    pub topic: String,

    /// Characteristic receiving the payloads, by host protocol name.
    pub characteristic: String,

    /// QoS 0..=2; 0 when absent.
    #[serde(default)]
    pub qos: Option<u8>,
}

/// Checked settings for the MQTT subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct MqttSettings {
    /// Broker hostname or address.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Client id presented to the broker.
    pub client_id: String,
    /// Broker credentials, if any.
    pub credentials: Option<CredentialsProperty>,
    /// Keep-alive interval.
    pub keep_alive: Duration,
    /// Validated topic subscriptions.
    pub subscriptions: Vec<MqttSubscription>,
}

/// One validated topic subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct MqttSubscription {
    /// Topic filter to subscribe.
    pub topic: String,
    /// Characteristic receiving the payloads.
    pub characteristic: Characteristic,
    /// QoS level, 0..=2.
    pub qos: u8,
}

/// Raw `thresholds` section: five ascending breakpoints per pollutant.
#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdsProperty {
    /// PM10 breakpoints in µg/m³.
    #[serde(default)]
    pub pm10: Option<[f32; LEVEL_COUNT]>,
    /// PM2.5 breakpoints in µg/m³.
    #[serde(default)]
    pub pm25: Option<[f32; LEVEL_COUNT]>,
}

fn default_client_id(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    format!("airbridge-{slug}")
}

//! Error types shared across the bridge.
//!
//! Configuration problems are fatal to accessory construction; document
//! problems fail a single fetch and leave the staleness cache unmarked so
//! the next query retries.

use thiserror::Error;

/// Problems that abort accessory construction.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration document is not valid JSON or has the wrong shape.
    #[error("malformed configuration: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The `getUrl` property is required.
    #[error("property 'getUrl' is required")]
    MissingUrl,

    /// The configured URL is not an http(s) endpoint.
    #[error("invalid url '{url}': expected http:// or https://")]
    InvalidUrl {
        /// The offending URL as configured.
        url: String,
    },

    /// The URL object names an HTTP method the fetcher does not speak.
    #[error("invalid http method '{method}'")]
    InvalidMethod {
        /// The offending method as configured.
        method: String,
    },

    /// `pullInterval` must be a positive number of milliseconds.
    #[error("'pullInterval' must be greater than zero")]
    InvalidPollInterval,

    /// A threshold override broke the breakpoint-table invariant.
    #[error("invalid thresholds for {pollutant}: {reason}")]
    InvalidThresholds {
        /// Document key of the pollutant whose table was rejected.
        pollutant: &'static str,
        /// What the table violated.
        reason: &'static str,
    },

    /// The MQTT section has no broker host.
    #[error("mqtt property 'host' is required")]
    MqttHostMissing,

    /// An MQTT subscription has no topic.
    #[error("mqtt subscription 'topic' is required")]
    MqttTopicMissing,

    /// Only plain `mqtt` is supported as the broker protocol.
    #[error("unsupported mqtt protocol '{protocol}'")]
    UnsupportedMqttProtocol {
        /// The offending protocol as configured.
        protocol: String,
    },

    /// An MQTT subscription names a characteristic this accessory does not
    /// expose.
    #[error("unknown characteristic '{name}' in mqtt subscription")]
    UnknownCharacteristic {
        /// The offending characteristic name.
        name: String,
    },

    /// MQTT QoS out of range.
    #[error("invalid mqtt qos {qos}: expected 0, 1 or 2")]
    InvalidQos {
        /// The offending QoS as configured.
        qos: u8,
    },
}

/// Problems with a fetched bulk sensor document.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The body is not valid JSON at all.
    #[error("sensor document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The body parsed, but to something other than a JSON object.
    #[error("sensor document is not a JSON object")]
    NotAnObject,
}

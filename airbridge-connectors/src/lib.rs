//! Transport adapters for airbridge
//!
//! ## Overview
//!
//! Three ways readings reach an accessory:
//!
//! - [`http`]: pull. A [`http::Fetch`] implementation executes the
//!   configured request and hands back the raw response; the accessory task
//!   decides when to call it.
//! - [`mqtt`]: push. A background subscriber forwards numeric payloads from
//!   broker topics.
//! - [`notifications`]: push. A registry routes `{characteristic, value}`
//!   payloads delivered by the host's notification collaborator.
//!
//! Both push transports converge on [`NotificationSink`], so the accessory
//! ingests MQTT publishes and HTTP notifications through one code path.

pub mod http;
pub mod mqtt;
pub mod notifications;

pub use http::{Fetch, FetchError, FetchResponse, HttpFetcher};
pub use mqtt::MqttSubscriber;
pub use notifications::{
    NotificationError, NotificationPayload, NotificationRegistry, NotificationValue,
};

use async_trait::async_trait;

/// Receiver for push updates regardless of transport.
///
/// The accessory's handle implements this; the MQTT subscriber and the
/// notification registry only ever see the trait.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one `{characteristic, value}` update.
    async fn notify(&self, payload: notifications::NotificationPayload);
}

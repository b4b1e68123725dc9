//! MQTT intake: subscribes configured topics and forwards numeric payloads.
//!
//! The subscriber owns a rumqttc client and event loop. Incoming publishes
//! are matched against the configured topic filters, parsed, and handed to
//! the accessory's notification sink tagged with the subscription's
//! characteristic, so MQTT and push notifications share one ingestion path.
//! Topic subscriptions are issued whenever the broker acknowledges a
//! connection, so a broker restart re-arms them.
//!
//! Payloads may be a bare number (`42.5`), a JSON number, or a JSON object
//! with a `value` field. Anything else is logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use airbridge_core::config::{MqttSettings, MqttSubscription};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, Publish, QoS};
use tokio::task::JoinHandle;

use crate::notifications::{NotificationPayload, NotificationValue};
use crate::NotificationSink;

/// Delay before polling the event loop again after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Background MQTT subscriber bound to one accessory.
pub struct MqttSubscriber {
    settings: MqttSettings,
}

impl MqttSubscriber {
    /// Subscriber over validated settings.
    pub fn new(settings: MqttSettings) -> Self {
        Self { settings }
    }

    /// Spawn the forwarding task.
    ///
    /// The task reconnects forever; it only ends when the runtime shuts
    /// down or the handle is aborted.
    pub fn spawn(self, sink: Arc<dyn NotificationSink>) -> JoinHandle<()> {
        let mut options =
            MqttOptions::new(self.settings.client_id.clone(), self.settings.host.clone(), self.settings.port);
        options.set_keep_alive(self.settings.keep_alive);
        if let Some(credentials) = &self.settings.credentials {
            options.set_credentials(credentials.username.clone(), credentials.password.clone());
        }

        log::info!(
            "mqtt: connecting {}:{} with {} topic(s)",
            self.settings.host,
            self.settings.port,
            self.settings.subscriptions.len()
        );
        let (client, eventloop) = AsyncClient::new(options, 64);
        tokio::spawn(run_eventloop(client, eventloop, self.settings.subscriptions, sink))
    }
}

/// The slice of the client the event handler needs. Subscribe requests are
/// observable through it without a live broker.
#[async_trait]
trait TopicClient: Send + Sync {
    async fn subscribe(&self, topic: String, qos: QoS) -> Result<(), rumqttc::ClientError>;
}

#[async_trait]
impl TopicClient for AsyncClient {
    async fn subscribe(&self, topic: String, qos: QoS) -> Result<(), rumqttc::ClientError> {
        AsyncClient::subscribe(self, topic, qos).await
    }
}

async fn run_eventloop(
    client: AsyncClient,
    mut eventloop: EventLoop,
    subscriptions: Vec<MqttSubscription>,
    sink: Arc<dyn NotificationSink>,
) {
    loop {
        match eventloop.poll().await {
            Ok(event) => handle_event(&event, &client, &subscriptions, sink.as_ref()).await,
            Err(error) => {
                log::warn!(
                    "mqtt connection error: {error}; retrying in {}s",
                    RECONNECT_DELAY.as_secs()
                );
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

/// React to one broker event. Subscriptions are issued on every connection
/// acknowledgement; the broker opens a clean session per connect and keeps
/// nothing across a restart.
async fn handle_event(
    event: &Event,
    client: &dyn TopicClient,
    subscriptions: &[MqttSubscription],
    sink: &dyn NotificationSink,
) {
    match event {
        Event::Incoming(Packet::ConnAck(_)) => {
            log::info!("mqtt: connected, subscribing {} topic(s)", subscriptions.len());
            for subscription in subscriptions {
                let qos = qos_level(subscription.qos);
                if let Err(error) = client.subscribe(subscription.topic.clone(), qos).await {
                    log::warn!("mqtt: subscribing '{}' failed: {error}", subscription.topic);
                }
            }
        }
        Event::Incoming(Packet::Publish(publish)) => {
            handle_publish(publish, subscriptions, sink).await;
        }
        _ => {}
    }
}

async fn handle_publish(
    publish: &Publish,
    subscriptions: &[MqttSubscription],
    sink: &dyn NotificationSink,
) {
    let subscription = match subscriptions
        .iter()
        .find(|s| rumqttc::mqttbytes::matches(&publish.topic, &s.topic))
    {
        Some(subscription) => subscription,
        None => {
            log::debug!("mqtt: ignoring publish on unconfigured topic '{}'", publish.topic);
            return;
        }
    };

    let value = match parse_payload(&publish.payload) {
        Some(value) => value,
        None => {
            log::warn!("mqtt: unparseable payload on '{}', dropping", publish.topic);
            return;
        }
    };

    sink.notify(NotificationPayload {
        characteristic: subscription.characteristic.name().to_string(),
        value,
    })
    .await;
}

fn qos_level(qos: u8) -> QoS {
    match qos {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}

fn parse_payload(payload: &[u8]) -> Option<NotificationValue> {
    let text = std::str::from_utf8(payload).ok()?.trim();
    if let Ok(number) = text.parse::<f64>() {
        if number.is_finite() {
            return Some(NotificationValue::Number(number));
        }
        // "nan" and "inf" parse as floats but carry no reading.
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Object(mut fields)) => match fields.remove("value") {
            Some(serde_json::Value::Number(number)) => {
                number.as_f64().map(NotificationValue::Number)
            }
            Some(serde_json::Value::String(text)) => Some(NotificationValue::Text(text)),
            _ => None,
        },
        _ => None,
    }
}

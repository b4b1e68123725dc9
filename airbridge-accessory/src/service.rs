//! The accessory task: single owner of all mutable accessory state.
//!
//! ## Overview
//!
//! Host queries, push updates, and poll ticks all arrive as messages on one
//! inbox, so no two mutations of the same accessory can ever race. Fetches
//! run inline in the task: a query arriving while a fetch is in flight
//! queues behind it and is answered afterwards, against the then-current
//! cache state.
//!
//! The poll timer re-arms after every fetch a query triggered, so an
//! accessory that is being queried does not also get polled at full rate.

use std::sync::Arc;
use std::time::Duration;

use airbridge_connectors::http::{Fetch, FetchError};
use airbridge_connectors::notifications::NotificationPayload;
use airbridge_connectors::NotificationSink;
use airbridge_core::errors::DocumentError;
use airbridge_core::time::TimeSource;
use airbridge_core::{
    AccessoryState, AirQualityLevel, Characteristic, CharacteristicValue, Classifier,
    SensorDocument,
};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Interval, MissedTickBehavior};

use crate::host::CharacteristicStore;

/// Inbox capacity. Queries and pushes are small and sporadic; backpressure
/// past this point just slows the producer down.
const INBOX_CAPACITY: usize = 16;

/// Failure answering a single host query.
///
/// The host renders these as "no response" for the queried characteristic.
/// Nothing is retried behind the host's back; the next query simply fetches
/// again because the cache was never marked fresh.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The fetch failed at the transport level.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The endpoint answered with a non-success status.
    #[error("sensor endpoint returned http status {0}")]
    Status(u16),

    /// The endpoint answered with something other than a sensor document.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// The accessory task is gone.
    #[error("accessory task stopped")]
    Closed,
}

enum Request {
    Get {
        characteristic: Characteristic,
        reply: oneshot::Sender<Result<CharacteristicValue, QueryError>>,
    },
    Notify(NotificationPayload),
}

/// Cloneable handle to a running accessory task.
///
/// The host keeps one to answer characteristic reads; the push transports
/// each keep one as their [`NotificationSink`].
#[derive(Clone, Debug)]
pub struct AccessoryHandle {
    name: Arc<str>,
    inbox: mpsc::Sender<Request>,
}

impl AccessoryHandle {
    /// Accessory display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Answer a host read of one characteristic, serving the cache or
    /// fetching per the staleness policy.
    pub async fn get(&self, characteristic: Characteristic) -> Result<CharacteristicValue, QueryError> {
        let (reply, response) = oneshot::channel();
        self.inbox
            .send(Request::Get { characteristic, reply })
            .await
            .map_err(|_| QueryError::Closed)?;
        response.await.map_err(|_| QueryError::Closed)?
    }

    /// Host identify request. There is nothing to blink on a bridged
    /// sensor, so this only logs.
    pub fn identify(&self) {
        log::info!("{}: identify requested", self.name);
    }
}

#[async_trait]
impl NotificationSink for AccessoryHandle {
    async fn notify(&self, payload: NotificationPayload) {
        if self.inbox.send(Request::Notify(payload)).await.is_err() {
            log::warn!("{}: dropping push update, accessory task stopped", self.name);
        }
    }
}

pub(crate) struct TaskConfig {
    pub name: Arc<str>,
    pub debug: bool,
    pub state: AccessoryState,
    pub classifier: Classifier,
    pub fetcher: Box<dyn Fetch>,
    pub store: Arc<dyn CharacteristicStore>,
    pub clock: Box<dyn TimeSource>,
    pub poll_period: Option<Duration>,
}

pub(crate) fn spawn_task(config: TaskConfig) -> AccessoryHandle {
    let (inbox_tx, inbox_rx) = mpsc::channel(INBOX_CAPACITY);
    let handle = AccessoryHandle { name: Arc::clone(&config.name), inbox: inbox_tx };
    let task = AccessoryTask {
        name: config.name,
        debug: config.debug,
        state: config.state,
        classifier: config.classifier,
        fetcher: config.fetcher,
        store: config.store,
        clock: config.clock,
        poll_period: config.poll_period,
        inbox: inbox_rx,
    };
    tokio::spawn(task.run());
    handle
}

struct AccessoryTask {
    name: Arc<str>,
    debug: bool,
    state: AccessoryState,
    classifier: Classifier,
    fetcher: Box<dyn Fetch>,
    store: Arc<dyn CharacteristicStore>,
    clock: Box<dyn TimeSource>,
    poll_period: Option<Duration>,
    inbox: mpsc::Receiver<Request>,
}

impl AccessoryTask {
    async fn run(mut self) {
        let mut poll = self.poll_period.map(|period| {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            tokio::select! {
                request = self.inbox.recv() => match request {
                    Some(Request::Get { characteristic, reply }) => {
                        let (result, fetched) = self.answer_query(characteristic).await;
                        if fetched {
                            if let Some(interval) = poll.as_mut() {
                                interval.reset();
                            }
                        }
                        // A closed reply just means the host gave up waiting.
                        let _ = reply.send(result);
                    }
                    Some(Request::Notify(payload)) => self.apply_push(payload),
                    None => {
                        log::debug!("{}: all handles dropped, stopping", self.name);
                        break;
                    }
                },
                _ = next_tick(&mut poll) => {
                    self.poll_refresh().await;
                    if let Some(interval) = poll.as_mut() {
                        interval.reset();
                    }
                }
            }
        }
    }

    /// Answer one host read. The second element reports whether a fetch was
    /// attempted, so the caller can re-arm the poll timer.
    async fn answer_query(
        &mut self,
        characteristic: Characteristic,
    ) -> (Result<CharacteristicValue, QueryError>, bool) {
        let now = self.clock.now();
        if !self.state.cache().should_refresh(now) {
            let value = self.state.value_of(characteristic);
            if self.debug {
                log::debug!(
                    "{}: serving cached {} = {:?}{}",
                    self.name,
                    characteristic.name(),
                    value,
                    if self.state.cache().is_infinite() { " (cached forever)" } else { "" },
                );
            }
            return (Ok(value), false);
        }

        match self.refresh().await {
            Ok(()) => (Ok(self.state.value_of(characteristic)), true),
            Err(error) => {
                log::warn!("{}: query for {} failed: {}", self.name, characteristic.name(), error);
                (Err(error), true)
            }
        }
    }

    /// Fetch and ingest one bulk document. The cache is marked fresh only
    /// when the whole chain (transport, status, document) succeeded.
    async fn refresh(&mut self) -> Result<(), QueryError> {
        let response = self.fetcher.fetch().await?;
        if !response.is_success() {
            return Err(QueryError::Status(response.status));
        }
        let document = SensorDocument::parse(&response.body)?;
        self.state.apply_document(&document, &self.classifier);
        let now = self.clock.now();
        self.state.cache_mut().mark_refreshed(now);

        if self.debug {
            for (pollutant, reading) in self.state.readings().iter() {
                match reading {
                    Some(value) => log::debug!(
                        "{}: {} {} {}",
                        self.name,
                        pollutant.key(),
                        value,
                        pollutant.unit()
                    ),
                    None => log::debug!("{}: {} has no reading", self.name, pollutant.key()),
                }
            }
            log::debug!("{}: level {}", self.name, self.state.level().name());
        }
        Ok(())
    }

    /// Scheduled poll: refresh when stale, then push current values so the
    /// host sees changes without asking. A failed poll pushes nothing and
    /// waits for the next tick.
    async fn poll_refresh(&mut self) {
        let now = self.clock.now();
        if self.state.cache().should_refresh(now) {
            if let Err(error) = self.refresh().await {
                log::warn!("{}: scheduled poll failed: {}", self.name, error);
                return;
            }
        }
        self.push_all();
    }

    fn push_all(&self) {
        for characteristic in Characteristic::ALL {
            self.store.update(characteristic, self.state.value_of(characteristic));
        }
    }

    /// Partial update pushed over MQTT or the notification route. Unknown
    /// characteristic names are ignored; they belong to services this
    /// accessory never registered.
    fn apply_push(&mut self, payload: NotificationPayload) {
        let characteristic = match Characteristic::from_name(&payload.characteristic) {
            Some(characteristic) => characteristic,
            None => {
                log::info!(
                    "{}: ignoring push update for unknown characteristic '{}'",
                    self.name,
                    payload.characteristic
                );
                return;
            }
        };

        if self.debug {
            log::debug!(
                "{}: push update {} = {:?}",
                self.name,
                characteristic.name(),
                payload.value
            );
        }

        match characteristic.pollutant() {
            Some(pollutant) => {
                let value = payload.value.as_f32();
                if value.is_none() {
                    log::warn!(
                        "{}: non-numeric value {:?} for {}, clearing the reading",
                        self.name,
                        payload.value,
                        characteristic.name()
                    );
                }
                self.state.apply_update(pollutant, value, &self.classifier);
                self.store.update(characteristic, self.state.value_of(characteristic));
                self.store.update(
                    Characteristic::AirQuality,
                    self.state.value_of(Characteristic::AirQuality),
                );
            }
            None => match payload.value.as_ordinal().and_then(AirQualityLevel::from_ordinal) {
                Some(level) => {
                    self.state.set_level(level);
                    self.store
                        .update(Characteristic::AirQuality, CharacteristicValue::Level(level));
                }
                None => log::warn!(
                    "{}: ignoring push update with invalid air-quality level {:?}",
                    self.name,
                    payload.value
                ),
            },
        }
    }
}

async fn next_tick(poll: &mut Option<Interval>) {
    match poll {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

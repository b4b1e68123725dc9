//! Accessory service for airbridge
//!
//! ## Overview
//!
//! Ties the pieces together into one running accessory per configuration
//! entry. A host runtime integrates by:
//!
//! 1. Parsing an [`AccessoryConfig`](airbridge_core::AccessoryConfig)
//! 2. Implementing [`CharacteristicStore`] over its own characteristic state
//! 3. Building with [`AccessoryBuilder`] inside a tokio runtime
//! 4. Answering characteristic reads through the returned [`AccessoryHandle`]
//!    and feeding pushed payloads through a shared
//!    [`NotificationRegistry`](airbridge_connectors::NotificationRegistry)
//!
//! The accessory task owns all mutable state; everything else talks to it
//! through messages.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod builder;
pub mod host;
pub mod service;

pub use builder::AccessoryBuilder;
pub use host::{AccessoryInformation, CharacteristicStore};
pub use service::{AccessoryHandle, QueryError};

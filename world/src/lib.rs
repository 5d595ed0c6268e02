//! Entity registry and ownership on top of sync trees.
//!
//! [`GameState`] owns every [`SyncEntity`], hands out script handles and
//! object ids, applies inbound clone packets from owners and builds the
//! per-client outbound updates. Ownership follows clients: when one drops,
//! its entities are reassigned, kept or deleted according to their
//! [`EntityOrphanMode`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use engine::ClientSlot;
//! use nodes::EntityKind;
//! use world::{Client, GameState, WorldConfig};
//!
//! let state = GameState::new(WorldConfig::for_testing());
//! let owner = Arc::new(Client::new(1, ClientSlot::new(0).unwrap(), "owner"));
//! let car = state
//!     .create_entity(EntityKind::Automobile, 12, Some(&owner))
//!     .unwrap();
//!
//! let handle = state.make_script_handle(&car).unwrap();
//! assert!(state.get_entity(handle).is_some());
//!
//! state.delete_entity(&car, false);
//! assert!(state.get_entity(handle).is_none());
//! ```

mod client;
mod clone;
mod config;
mod entity;
mod error;
mod handles;
mod ids;
mod observer;
mod ownership;
mod state;

pub use client::Client;
pub use clone::{CloneOutcome, ClonePayload, CloneUpdate};
pub use config::{WorldConfig, DEFAULT_SCRIPT_HANDLE_CAPACITY};
pub use entity::{make_entity_handle, EntityOrphanMode, SyncEntity, MAX_OBJECT_ID};
pub use error::{WorldError, WorldResult};
pub use handles::{ScriptHandlePool, SCRIPT_HANDLE_BASE};
pub use ids::ObjectIdAllocator;
pub use observer::{GameStateObserver, NoopObserver};
pub use ownership::DropSummary;
pub use state::{GameState, SERVER_PLAYER_ID};

//! # turf-client: Async Client for Turf Booking
//!
//! Everything between the presentation layer and the remote booking store:
//! reads through a shared cache, mutations with invalidation, and the access
//! gate for the admin area.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Presentation Layer                              │
//! │        slot list · booking form · receipt · admin views                 │
//! └──────────────┬──────────────────────────────────────┬───────────────────┘
//!                │ reads / mutations (ViewScope)        │ access flows
//!                ▼                                      ▼
//! ┌─────────────────────────────┐        ┌─────────────────────────────────┐
//! │        TurfClient           │◄───────│          AccessGate             │
//! │  QueryCache · timeouts      │        │  AccessState (watch channel)    │
//! │  invalidation on success    │        │  claim · reset · owners         │
//! └──────────────┬──────────────┘        └─────────────────────────────────┘
//!                │ BookingBackend (per identity, via Connector)
//!                ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │          Remote booking store (or MemoryStore in tests)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`client`] - `TurfClient`, event emitter, builder
//! - [`access`] - Access gate and ownership flows
//! - [`cache`] - Read-through query cache
//! - [`remote`] - Booking store contract
//! - [`identity`] - Identity session seam
//! - [`scope`] - View scopes for cancelling mutation effects
//! - [`memory`] - In-memory reference store
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Client error types
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use turf_client::{ClientConfig, LocalIdentity, MemoryStore, TurfClient, ViewScope};
//! use turf_core::{DateKey, Principal};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let store = MemoryStore::new();
//! let identity = Arc::new(LocalIdentity::signed_in(Principal::new("asha")));
//!
//! let mut config = ClientConfig::default();
//! config.booking.allow_past_dates = true;
//! let client = TurfClient::new(config, identity, Arc::new(store));
//!
//! let date = DateKey::from_raw(20240603);
//! let scope = ViewScope::new();
//! client.book(&scope, date, 19, "Asha", "9876543210", "Football").await.unwrap();
//!
//! let hours = client.check_availability(date).await.unwrap();
//! assert!(!hours.contains(&19));
//! # });
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod memory;
pub mod remote;
pub mod scope;

// =============================================================================
// Re-exports
// =============================================================================

pub use access::AccessGate;
pub use cache::QueryCache;
pub use client::{ClientEventEmitter, NoOpEmitter, TurfClient, TurfClientBuilder};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, ConflictReason, DenialReason, Operation};
pub use identity::{IdentitySession, LocalIdentity};
pub use memory::MemoryStore;
pub use remote::{BookingBackend, Connector, RemoteError};
pub use scope::ViewScope;

//! Stockview Core - Core types, layout decoding, and occupancy classification
//!
//! This crate provides the foundational types for the Stockview system:
//! - Location records and the validation step that turns raw layout rows into them
//! - Occupancy snapshots and the color/opacity classifier
//! - Product descriptors for the inspection dialog
//! - JSON-RPC envelopes for the ERP endpoints
//! - Session context resolution (action context first, persisted store second)
//! - Viewer configuration

pub mod config;
pub mod error;
pub mod location;
pub mod occupancy;
pub mod product;
pub mod rpc;
pub mod session;

pub use config::{ConfigError, Rgb, ViewerConfig};
pub use error::DataFetchError;
pub use location::{decode_layout, Layout, LocationId, LocationRecord, RecordError};
pub use occupancy::{classify, BinAppearance, OccupancyRules, OccupancyState, OccupancyTier};
pub use product::ProductDescriptor;
pub use session::{ActionContext, KeyValueStore, SessionContext};

//! Notion tracking database: REST client, property builders, tracker.
mod client;
pub mod properties;
mod tracker;

pub use client::{Fields, NotionClient, RecordHandle, TrackingDb};
pub use tracker::Tracker;

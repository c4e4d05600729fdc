//! Core types and shared utilities for RoastBot.
//!
//! This crate provides:
//! - Content vocabulary shared by every endpoint (roast/compliment, reactions, share platforms)
//! - A reusable retry-with-backoff policy
//! - The analytics repository trait and its in-memory implementation
//! - Prometheus metrics helpers
//! - Shared error types

pub mod analytics;
mod content;
mod error;
pub mod metrics;
pub mod retry;

pub use analytics::{AnalyticsStore, InMemoryAnalytics};
pub use content::{ContentType, Reaction, SharePlatform};
pub use error::{Error, Result};
pub use retry::RetryPolicy;

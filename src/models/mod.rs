// src/models/mod.rs

//! Domain models for the feed relay.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod item;
mod payload;
mod report;

// Re-export all public types
pub use config::{
    ApnsProvider, BarkProvider, ChannelsConfig, Config, GatewayConfig, HttpConfig, KeywordRules,
    ProvidersConfig, TelegramProvider, ThreadsConfig,
};
#[cfg(test)]
pub(crate) use item::sample_item;
pub use item::{BODY_LIMIT, CandidateItem, FeedKind};
pub use payload::{
    Alert, ApplePayload, Aps, BarkPayload, Level, PushPayload, PushRequest, TelegramMessage,
    TelegramPayload,
};
pub use report::{RunReport, RunResult};

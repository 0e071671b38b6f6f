//! Service layer for the feed relay.
//!
//! This module contains the business logic for:
//! - Channel listing collection (`ChannelCollector`)
//! - Forum thread collection (`ThreadCollector`)
//! - Record extraction from pages (`extract`)
//! - Gateway submission (`Dispatcher`)

mod channels;
mod dispatcher;
pub mod extract;
mod threads;

pub use channels::{ChannelBatch, ChannelCollector};
pub use dispatcher::{Dispatcher, FeedStyle};
pub use extract::{ChannelPageParser, ThreadRecord};
pub use threads::ThreadCollector;

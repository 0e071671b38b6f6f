//! Feed pipelines.
//!
//! - `run_channel_feed`: offset-walk a channel, push one batch, move the cursor
//! - `run_thread_feed`: walk thread pages, push and flag each new thread
//! - `Pipeline`: run every configured feed and collect a report

mod channels;
mod filter;
mod runner;
mod threads;

pub use channels::run_channel_feed;
pub use filter::DeliveryFilter;
pub use runner::{FeedContext, Pipeline};
pub use threads::run_thread_feed;

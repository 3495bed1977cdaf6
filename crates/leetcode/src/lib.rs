pub mod activity;
pub mod api;
pub mod badges;
pub mod cache;
pub mod contest;
pub mod controller;
pub mod models;
pub mod render;
pub mod retry;

#[cfg(test)]
mod testing;

pub use api::Endpoints;
pub use cache::{Cache, CacheBackend, Clock, FileBackend, MemoryBackend, SystemClock};
pub use contest::ContestStatus;
pub use controller::{DataSource, StatsController, WidgetState};
pub use models::{BadgeSet, ProfileStats, StatsSnapshot};
pub use render::render_markdown;
pub use retry::{fetch_with_retry, RetryPolicy};

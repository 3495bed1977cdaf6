pub mod config;
pub mod error;
pub mod http;

pub use config::Config;
pub use error::{FetchError, WidgetError, WidgetResult};
pub use http::{HttpFetcher, ReqwestFetcher};

pub mod config;
pub mod coords;
pub mod entity;
pub mod error;
pub mod event;
pub mod event_store;
pub mod explorer;
pub mod http_cache;
pub mod http_client;
pub mod matches;
pub mod open_data;
pub mod pass_network;
pub mod progressive;
pub mod report_export;
pub mod source;
pub mod spatial;
pub mod success_rate;
pub mod summary;
pub mod synthetic;
pub mod tactical;
pub mod xg_timeline;

pub use config::AnalyticsConfig;
pub use error::{Aggregate, AnalyticsError, Unavailable};
pub use event::{Event, EventFilter, EventKind};

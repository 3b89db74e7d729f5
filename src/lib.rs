pub mod config;
pub mod data_source;
pub mod db;
pub mod manager;
pub mod models;
pub mod sources;
pub mod utils;

pub use config::AppConfig;
pub use manager::{EventManager, SearchRequest, SourceKind};
pub use models::{Event, EventId, EventOrigin};
pub use sources::{EventSource, SourceError};

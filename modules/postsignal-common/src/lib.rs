pub mod config;
pub mod error;
pub mod site;
pub mod types;

pub use config::{Config, ScrapeSettings};
pub use error::ScrapeError;
pub use site::SiteProfile;
pub use types::*;

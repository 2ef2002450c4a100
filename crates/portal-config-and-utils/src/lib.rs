//! Configuration, paths, and logging setup shared by the HR portal crates.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, RouteTable, DEFAULT_ADMIN_ROLE, DEFAULT_API_URL, DEFAULT_LOG_LEVEL};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;

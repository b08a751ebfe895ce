pub mod config;
pub mod error_handler;
pub mod logging;

pub use config::{DeployConfig, TokenConfig, load_dotenv, parse_supply, validate_url};
pub use error_handler::{DeployError, ErrorCategory};

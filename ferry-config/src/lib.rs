// Configuration for Ferry: environment variables, .env files and TOML/JSON files

pub mod app;
pub mod backend;
pub mod env;
pub mod error;
pub mod loader;
pub mod validation;

pub use app::{
    AppConfig, DEFAULT_LOG_DIR, DEFAULT_PROGRESS_ADDR, DEFAULT_PROGRESS_PATH,
    DEFAULT_SWEEP_INTERVAL,
};
pub use backend::backend_from_env;
pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat, load_dotenv};
pub use validation::{ConfigValidator, Validate};

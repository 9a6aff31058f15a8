pub mod loader;
pub mod schema;

pub use loader::{
    discover, load_for, load_from_path, load_from_str, ConfigError, ConfigSource, CONFIG_FILE_NAME,
};
pub use schema::{DisplayConfig, EditConfig, EngineConfig, ValidationError, ValidationIssue};

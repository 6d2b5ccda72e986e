//! Layered settings pipeline.
//!
//! Consolidates configuration from three sources, key by key:
//! 1. **Defaults** - compiled into the schema
//! 2. **Dot-env file** - `./.env`, or the file named by `APP_ENV_FILE`
//! 3. **Environment** - `APP_*` variables
//!
//! Higher sources win on collision. The merged map is validated against the
//! declared schema into an immutable [`Settings`]; every invalid field is
//! reported at once.
//!
//! ## Environment Variables
//! One per schema field, `APP_` + the field key (`APP_REPORT_DIR`,
//! `APP_MAX_ROWS`, ...). `APP_ENV_FILE` selects an alternate dot-env file.

mod manager;
mod merge;
mod schema;
mod source;
mod types;
mod validate;

pub use manager::{ConfigurationManager, InitOptions};
pub use merge::{merge, merge_over, merge_with_origins};
pub use schema::{FieldKind, FieldSpec, SCHEMA};
pub use source::{
    ConfigSource, DEFAULT_DOTENV_FILE, DEFAULT_ENV_PREFIX, ENV_FILE_KEY, RawConfigMap,
    SourceLoad, SourceLoader, parse_dotenv,
};
pub use types::{Environment, LogLevel, Secret, Settings};
pub use validate::validate;

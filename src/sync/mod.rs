pub mod command;
pub mod engine;
pub mod exit_status;
pub mod lock;
pub mod logging;
pub mod probe;
pub mod process;
pub mod profile;
pub mod result_error;
pub mod sync_config;
pub mod validate;
pub mod version;

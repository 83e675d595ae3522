pub mod file_utils;
pub mod log_utils;

pub use file_utils::{sanitize_filename, save_report};
pub use log_utils::project_log;

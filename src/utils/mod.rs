pub mod logging;
pub mod text;

pub use logging::RunLog;
pub use text::{clean_text, collapse_whitespace, sanitize_filename, truncate_text};

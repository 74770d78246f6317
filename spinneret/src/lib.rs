// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{default_plugins, expand_db_path, load_plugins_file, parse_plugin_spec};

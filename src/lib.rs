pub mod cms;
pub mod config;
pub mod error;
pub mod forms;
pub mod loader;
pub mod map;
pub mod orchestrator;
pub mod record;
pub mod render;
pub mod section;
pub mod store;

pub use error::{Error, Result};

/// Arguments shared by the render and watch commands.
#[derive(Debug, Clone)]
pub struct CommandArgs {
    pub base_url: Option<String>,
    pub out_dir: Option<String>,
    pub config_path: Option<String>,
    /// Bypass cache reads and fetch fresh data unconditionally.
    pub force: bool,
}

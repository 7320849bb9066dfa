use std::env;

pub const STORE_DIR: &str = "/var/lib/cask/store";
pub const LOG_DIR: &str = "/var/log/cask";
pub const STATE_DIR: &str = "/var/lib/cask/var";

pub struct Config {
    pub store_dir: String,
    pub log_dir: String,
    pub state_dir: String,
    /// When false the missing planner never probes substituters.
    pub use_substitutes: bool,
    /// Affects only user-visible messages.
    pub read_only_mode: bool,
}

impl Config {
    pub fn new() -> Self {
        let store_dir = env::var("CASK_STORE_DIR").unwrap_or(STORE_DIR.to_string());
        let log_dir = env::var("CASK_LOG_DIR").unwrap_or(LOG_DIR.to_string());
        let state_dir = env::var("CASK_STATE_DIR").unwrap_or(STATE_DIR.to_string());
        let use_substitutes = env_flag("CASK_USE_SUBSTITUTES", true);
        let read_only_mode = env_flag("CASK_READONLY", false);
        Self {
            store_dir,
            log_dir,
            state_dir,
            use_substitutes,
            read_only_mode,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => !matches!(v.as_str(), "0" | "false" | "no"),
        Err(_) => default,
    }
}

//! Desktop app settings: defaults, overridden by `wiregram.toml` in the
//! working directory, overridden by environment variables.

use std::{collections::HashMap, fs};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            log_filter: "info".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("wiregram.toml") {
        apply_file_config(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("WIREGRAM_SERVER_URL") {
        settings.server_url = v;
    }
    if let Ok(v) = std::env::var("WIREGRAM_LOG_FILTER") {
        settings.log_filter = v;
    }

    settings
}

fn apply_file_config(settings: &mut Settings, raw: &str) {
    if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
        if let Some(v) = file_cfg.get("server_url") {
            settings.server_url = v.clone();
        }
        if let Some(v) = file_cfg.get("log_filter") {
            settings.log_filter = v.clone();
        }
    }
}

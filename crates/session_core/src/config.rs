use std::{collections::HashMap, fs, time::Duration};

/// Runtime tunables for the session worker.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Pause after a confirmed browser launch so the browser can take the
    /// foreground before the next command (typically a DisplayText) runs.
    pub browser_settle: Duration,
    /// Tone duration used when a PlayTone command specifies none.
    pub tone_default: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            browser_settle: Duration::from_secs(10),
            tone_default: Duration::from_secs(2),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("toolkit.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, u64>>(&raw) {
            if let Some(v) = file_cfg.get("browser_settle_secs") {
                settings.browser_settle = Duration::from_secs(*v);
            }
            if let Some(v) = file_cfg.get("tone_default_ms") {
                settings.tone_default = Duration::from_millis(*v);
            }
        }
    }

    if let Ok(v) = std::env::var("STK__BROWSER_SETTLE_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.browser_settle = Duration::from_secs(parsed);
        }
    }
    if let Ok(v) = std::env::var("STK__TONE_DEFAULT_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.tone_default = Duration::from_millis(parsed);
        }
    }

    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_timing() {
        let settings = Settings::default();
        assert_eq!(settings.browser_settle, Duration::from_secs(10));
        assert_eq!(settings.tone_default, Duration::from_secs(2));
    }

    #[test]
    fn env_override_wins() {
        std::env::set_var("STK__BROWSER_SETTLE_SECS", "3");
        let settings = load_settings();
        std::env::remove_var("STK__BROWSER_SETTLE_SECS");
        assert_eq!(settings.browser_settle, Duration::from_secs(3));
    }
}

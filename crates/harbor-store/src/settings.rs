use serde::{Deserialize, Serialize};

/// Tuning switches for the store engine.
///
/// Both caches default to enabled; disabling them changes performance, never
/// behavior.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Cache constructed store wrappers, keyed by scope + type + name.
    #[serde(default = "enabled")]
    pub instance_cache: bool,
    /// Cache deserialized file contents, keyed by absolute path.
    #[serde(default = "enabled")]
    pub content_cache: bool,
}

fn enabled() -> bool {
    true
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            instance_cache: true,
            content_cache: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_enabled() {
        let settings = StoreSettings::default();
        assert!(settings.instance_cache);
        assert!(settings.content_cache);
    }

    #[test]
    fn missing_fields_default_to_enabled() {
        let settings: StoreSettings = serde_json::from_str("{}").unwrap();
        assert!(settings.instance_cache);
        assert!(settings.content_cache);

        let settings: StoreSettings =
            serde_json::from_str(r#"{"content_cache": false}"#).unwrap();
        assert!(settings.instance_cache);
        assert!(!settings.content_cache);
    }
}

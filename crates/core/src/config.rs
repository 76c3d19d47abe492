use serde::{Deserialize, Serialize};

/// How accessibility (and other rule) violations are handled at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Collect every violation and abort startup with one aggregate error.
    #[default]
    Strict,
    /// Log a warning per violation and continue startup.
    Lenient,
}

/// Application-level configuration knobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WakuConfiguration {
    pub validation: ValidationPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_strict() {
        assert_eq!(WakuConfiguration::default().validation, ValidationPolicy::Strict);
    }

    #[test]
    fn deserializes_from_json() {
        let config: WakuConfiguration =
            serde_json::from_str(r#"{ "validation": "lenient" }"#).unwrap();
        assert_eq!(config.validation, ValidationPolicy::Lenient);

        let config: WakuConfiguration = serde_json::from_str("{}").unwrap();
        assert_eq!(config.validation, ValidationPolicy::Strict);
    }
}

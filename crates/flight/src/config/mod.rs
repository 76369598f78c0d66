use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Development => write!(f, "development"),
            Mode::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "development" | "dev" => Ok(Mode::Development),
            "production" | "prod" => Ok(Mode::Production),
            _ => Err(ConfigError::InvalidMode(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Rows a stream consumer may leave unread before the renderer pauses writing.
    pub high_water_mark: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { high_water_mark: 16 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightConfig {
    pub mode: Mode,
    #[serde(default)]
    pub strict_checks: bool,
    #[serde(default)]
    pub stream: StreamConfig,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self::new(Mode::default())
    }
}

impl FlightConfig {
    pub fn new(mode: Mode) -> Self {
        Self { mode, strict_checks: mode == Mode::Development, stream: StreamConfig::default() }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from variables supplied by `lookup`, starting from the mode's defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup("FLIGHT_MODE") {
            Some(mode_str) => Self::new(mode_str.parse()?),
            None => Self::default(),
        };

        if let Some(strict_str) = lookup("FLIGHT_STRICT_CHECKS") {
            config.strict_checks = strict_str.to_lowercase() == "true"
                || strict_str == "1"
                || strict_str.to_lowercase() == "yes";
        }

        if let Some(high_water_mark_str) = lookup("FLIGHT_HIGH_WATER_MARK") {
            config.stream.high_water_mark = high_water_mark_str
                .parse()
                .map_err(|_| ConfigError::InvalidConfig("FLIGHT_HIGH_WATER_MARK".to_string()))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::FileRead)?;

        let config: Self = toml::from_str(&contents).map_err(ConfigError::TomlParse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self).map_err(ConfigError::TomlSerialize)?;

        std::fs::write(path, contents).map_err(ConfigError::FileWrite)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stream.high_water_mark == 0 {
            return Err(ConfigError::InvalidConfig("stream.high_water_mark".to_string()));
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.mode == Mode::Development
    }

    pub fn is_production(&self) -> bool {
        self.mode == Mode::Production
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid mode: {0}")]
    InvalidMode(String),

    #[error("Invalid config value for {0}")]
    InvalidConfig(String),

    #[error("Failed to read config file: {0}")]
    FileRead(std::io::Error),

    #[error("Failed to write config file: {0}")]
    FileWrite(std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(toml::de::Error),

    #[error("Failed to serialize TOML: {0}")]
    TomlSerialize(toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: FxHashMap<String, String> =
            vars.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = FlightConfig::default();
        assert_eq!(config.mode, Mode::Development);
        assert!(config.strict_checks);
        assert_eq!(config.stream.high_water_mark, 16);
    }

    #[test]
    fn test_config_new_with_mode() {
        let config = FlightConfig::new(Mode::Production);
        assert!(config.is_production());
        assert!(!config.strict_checks);
    }

    #[test]
    fn test_mode_display_and_parse() {
        assert_eq!(Mode::Development.to_string(), "development");
        assert_eq!(Mode::Production.to_string(), "production");
        assert_eq!("PROD".parse::<Mode>().unwrap(), Mode::Production);
        assert!(matches!("staging".parse::<Mode>(), Err(ConfigError::InvalidMode(_))));
    }

    #[test]
    fn test_from_lookup_reads_variables() {
        let config = FlightConfig::from_lookup(lookup(&[
            ("FLIGHT_MODE", "production"),
            ("FLIGHT_STRICT_CHECKS", "yes"),
            ("FLIGHT_HIGH_WATER_MARK", "4"),
        ]))
        .unwrap();

        assert!(config.is_production());
        assert!(config.strict_checks);
        assert_eq!(config.stream.high_water_mark, 4);
    }

    #[test]
    fn test_from_lookup_without_variables_uses_defaults() {
        let config = FlightConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, FlightConfig::default());
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let result = FlightConfig::from_lookup(lookup(&[("FLIGHT_HIGH_WATER_MARK", "lots")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidConfig(name)) if name == "FLIGHT_HIGH_WATER_MARK"
        ));

        let result = FlightConfig::from_lookup(lookup(&[("FLIGHT_HIGH_WATER_MARK", "0")]));
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flight.toml");

        let mut config = FlightConfig::new(Mode::Production);
        config.stream.high_water_mark = 32;
        config.save_to_file(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("mode = \"production\""));

        let loaded = FlightConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_from_file_fills_missing_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flight.toml");
        std::fs::write(&path, "mode = \"development\"\n").unwrap();

        let config = FlightConfig::from_file(&path).unwrap();
        assert!(!config.strict_checks);
        assert_eq!(config.stream, StreamConfig::default());
    }

    #[test]
    fn test_from_file_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = FlightConfig::from_file(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::FileRead(_))));

        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "mode = [").unwrap();
        assert!(matches!(FlightConfig::from_file(&path), Err(ConfigError::TomlParse(_))));
    }
}

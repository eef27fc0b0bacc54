/// Configuration source information for debugging
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value loaded from environment variable
    EnvVar(String),
    /// Default value used
    Default(String),
    /// Value passed on the command line
    CommandLine(String),
}

impl ConfigSource {
    /// Check if source is environment variable
    pub fn is_env_var(&self) -> bool {
        matches!(self, ConfigSource::EnvVar(_))
    }

    /// Check if source is default value
    pub fn is_default(&self) -> bool {
        matches!(self, ConfigSource::Default(_))
    }

    /// Check if source is a command-line flag
    pub fn is_command_line(&self) -> bool {
        matches!(self, ConfigSource::CommandLine(_))
    }

    /// Get source description
    pub fn description(&self) -> String {
        match self {
            ConfigSource::EnvVar(var) => format!("Environment variable: {}", var),
            ConfigSource::Default(value) => format!("Default value: {}", value),
            ConfigSource::CommandLine(flag) => format!("Command-line flag: {}", flag),
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_descriptions() {
        let source = ConfigSource::EnvVar("DRIVER_URL".to_string());
        assert!(source.is_env_var());
        assert_eq!(source.to_string(), "Environment variable: DRIVER_URL");

        let source = ConfigSource::CommandLine("--path".to_string());
        assert!(source.is_command_line());
        assert!(!source.is_default());
        assert_eq!(source.description(), "Command-line flag: --path");
    }
}

use std::path::PathBuf;

/// Settings of the HTTP adapter, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub log_file: PathBuf,
    pub sentry_dsn: Option<String>,
    /// Run plan groups and length candidates on the rayon pool.
    pub parallel: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            log_file: PathBuf::from("development.log"),
            sentry_dsn: None,
            parallel: false,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset or empty keys keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(port) = get("PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| format!("invalid PORT '{port}'"))?;
        }
        if let Some(path) = get("LOG_FILE") {
            config.log_file = PathBuf::from(path);
        }
        config.sentry_dsn = get("SENTRY_DSN");
        if let Some(flag) = get("OPTIMIZER_PARALLEL") {
            config.parallel = match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(format!("invalid OPTIMIZER_PARALLEL '{flag}'")),
            };
        }
        Ok(config)
    }

    pub fn addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.addr(), "0.0.0.0:3001");
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("LOG_FILE", "/var/log/optimizer.log"),
            ("SENTRY_DSN", "https://key@sentry.example.com/1"),
            ("OPTIMIZER_PARALLEL", "true"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_file, PathBuf::from("/var/log/optimizer.log"));
        assert_eq!(
            config.sentry_dsn.as_deref(),
            Some("https://key@sentry.example.com/1")
        );
        assert!(config.parallel);
    }

    #[test]
    fn test_empty_dsn_is_unset() {
        let config = ServerConfig::from_lookup(lookup(&[("SENTRY_DSN", "  ")])).unwrap();
        assert_eq!(config.sentry_dsn, None);
    }

    #[test]
    fn test_bad_values() {
        assert!(ServerConfig::from_lookup(lookup(&[("PORT", "http")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("OPTIMIZER_PARALLEL", "maybe")])).is_err());
    }
}

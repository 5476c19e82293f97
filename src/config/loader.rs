//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{MalformedRecordPolicy, RailposConfig};
use super::secret_string;
use crate::domain::errors::RailposError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Loads configuration from a single TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into RailposConfig
/// 4. Applies environment variable overrides (RAILPOS_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`RailposError::Configuration`] if the file is missing or
/// unreadable, a referenced environment variable is unset, a required key is
/// absent, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use railpos::config::loader::load_config;
///
/// let config = load_config("railpos.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<RailposConfig> {
    load_config_with_secrets(path, None::<&Path>)
}

/// Loads settings and an optional secrets file
///
/// Tables in the secrets file are merged over the settings file key by key,
/// so `[elasticsearch] password = "..."` can live apart from the rest of the
/// `[elasticsearch]` section.
pub fn load_config_with_secrets(
    settings_path: impl AsRef<Path>,
    secrets_path: Option<impl AsRef<Path>>,
) -> Result<RailposConfig> {
    let mut table = read_toml_table(settings_path.as_ref())?;

    if let Some(secrets_path) = secrets_path {
        let secrets = read_toml_table(secrets_path.as_ref())?;
        merge_tables(&mut table, secrets);
        tracing::debug!(
            secrets_path = %secrets_path.as_ref().display(),
            "Merged secrets file into configuration"
        );
    }

    let mut config: RailposConfig = toml::Value::Table(table).try_into()?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        RailposError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

fn read_toml_table(path: &Path) -> Result<toml::Table> {
    if !path.exists() {
        return Err(RailposError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        RailposError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    contents.parse::<toml::Table>().map_err(|e| {
        RailposError::Configuration(format!(
            "Failed to parse TOML in {}: {}",
            path.display(),
            e
        ))
    })
}

/// Deep-merges `overlay` into `base`; scalars and arrays in `overlay` win.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| RailposError::Other(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        // Comment lines keep their placeholders
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(RailposError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using RAILPOS_* prefix
///
/// Environment variables follow the pattern: RAILPOS_<SECTION>_<KEY>
/// For example: RAILPOS_FEED_URL, RAILPOS_ELASTICSEARCH_INDEX_NAME
fn apply_env_overrides(config: &mut RailposConfig) -> Result<()> {
    if let Ok(val) = std::env::var("RAILPOS_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Service overrides
    if let Ok(val) = std::env::var("RAILPOS_SERVICE_VERSION") {
        config.service.version = val;
    }
    if let Ok(val) = std::env::var("RAILPOS_SERVICE_ENVIRONMENT") {
        config.service.environment = val;
    }

    // Feed overrides
    if let Ok(val) = std::env::var("RAILPOS_FEED_URL") {
        config.feed.url = val;
    }
    if let Ok(val) = std::env::var("RAILPOS_FEED_API_KEY") {
        config.feed.api_key = secret_string(val);
    }

    // Elasticsearch overrides
    if let Ok(val) = std::env::var("RAILPOS_ELASTICSEARCH_URL") {
        config.elasticsearch.url = val;
    }
    if let Ok(val) = std::env::var("RAILPOS_ELASTICSEARCH_USERNAME") {
        config.elasticsearch.username = val;
    }
    if let Ok(val) = std::env::var("RAILPOS_ELASTICSEARCH_PASSWORD") {
        config.elasticsearch.password = secret_string(val);
    }
    if let Ok(val) = std::env::var("RAILPOS_ELASTICSEARCH_INDEX_NAME") {
        config.elasticsearch.index_name = val;
    }
    if let Ok(val) = std::env::var("RAILPOS_ELASTICSEARCH_BULK_CHUNK_SIZE") {
        config.elasticsearch.bulk_chunk_size =
            parse_override("RAILPOS_ELASTICSEARCH_BULK_CHUNK_SIZE", &val)?;
    }

    // APM overrides
    if let Ok(val) = std::env::var("RAILPOS_APM_ENABLED") {
        config.apm.enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("RAILPOS_APM_SERVER_URL") {
        config.apm.server_url = Some(val);
    }
    if let Ok(val) = std::env::var("RAILPOS_APM_SECRET_TOKEN") {
        config.apm.secret_token = Some(secret_string(val));
    }

    if let Ok(val) = std::env::var("RAILPOS_KIBANA_URL") {
        config.kibana.url = Some(val);
    }

    // Pipeline overrides
    if let Ok(val) = std::env::var("RAILPOS_PIPELINE_SLEEP_DURATION_SECONDS") {
        config.pipeline.sleep_duration_seconds =
            parse_override("RAILPOS_PIPELINE_SLEEP_DURATION_SECONDS", &val)?;
    }
    if let Ok(val) = std::env::var("RAILPOS_PIPELINE_MALFORMED_RECORDS") {
        config.pipeline.malformed_records =
            MalformedRecordPolicy::from_str(&val).map_err(RailposError::Configuration)?;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("RAILPOS_LOGGING_JSON") {
        config.logging.json = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("RAILPOS_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("RAILPOS_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

fn parse_override<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| RailposError::Configuration(format!("{name} has an invalid value: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SETTINGS: &str = r#"
[service]
name = "wmata-rail-position"
version = "1.0.0"
environment = "production"

[feed]
url = "https://api.wmata.com/gtfs/rail-gtfsrt-vehiclepositions.pb"

[elasticsearch]
url = "https://es.example.com:9200"
index_name = "wmata-rail-position"

[apm]
server_url = "https://apm.example.com"

[pipeline]
sleep_duration_seconds = 10
"#;

    const SECRETS: &str = r#"
[feed]
api_key = "feed-key"

[elasticsearch]
username = "elastic"
password = "changeme"

[apm]
secret_token = "apm-token"
"#;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("RAILPOS_TEST_SUBST_VAR", "test_value");
        let input = "password = \"${RAILPOS_TEST_SUBST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "password = \"test_value\"\n");
        std::env::remove_var("RAILPOS_TEST_SUBST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("RAILPOS_TEST_MISSING_VAR");
        let input = "password = \"${RAILPOS_TEST_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("RAILPOS_TEST_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        let input = "# password = \"${RAILPOS_TEST_COMMENTED_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("${RAILPOS_TEST_COMMENTED_VAR}"));
    }

    #[test]
    fn test_merge_tables_is_deep() {
        let mut base: toml::Table = SETTINGS.parse().unwrap();
        let overlay: toml::Table = SECRETS.parse().unwrap();
        merge_tables(&mut base, overlay);

        let es = base["elasticsearch"].as_table().unwrap();
        assert_eq!(es["index_name"].as_str(), Some("wmata-rail-position"));
        assert_eq!(es["password"].as_str(), Some("changeme"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(matches!(result, Err(RailposError::Configuration(_))));
    }

    #[test]
    fn test_load_config_with_secrets_file() {
        let settings = write_temp(SETTINGS);
        let secrets = write_temp(SECRETS);

        let config = load_config_with_secrets(settings.path(), Some(secrets.path())).unwrap();

        assert_eq!(config.service.name, "wmata-rail-position");
        assert_eq!(config.elasticsearch.username, "elastic");
        assert_eq!(config.elasticsearch.bulk_chunk_size, 500);
        assert_eq!(config.pipeline.malformed_records, MalformedRecordPolicy::Skip);
    }

    #[test]
    fn test_load_config_without_secrets_fails() {
        let settings = write_temp(SETTINGS);

        let err = load_config(settings.path()).unwrap_err();
        assert!(matches!(err, RailposError::Configuration(_)));
        assert!(err.to_string().contains("api_key"));
    }
}

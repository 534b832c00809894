//! Configuration file loader for npm-packager
//!
//! This module provides configuration loading, validation, and merging capabilities.

use super::config::*;
use crate::core::error::PublishError;
use regex::Regex;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Configuration file name
pub const CONFIG_FILENAME: &str = ".npm-packager.yaml";

/// Environment variable pattern (${VAR_NAME})
const ENV_VAR_PATTERN: &str = r"\$\{([A-Z_][A-Z0-9_]*)\}";

/// Configuration load options
#[derive(Debug, Clone, Default)]
pub struct ConfigLoadOptions {
    /// Project path to load config from
    pub project_path: PathBuf,

    /// Config file given on the command line; must exist
    pub explicit_path: Option<PathBuf>,

    /// Environment variables
    pub env: HashMap<String, String>,
}

/// Configuration validation result
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationResult {
    /// Is configuration valid?
    pub valid: bool,

    /// Validation errors
    pub errors: Vec<ConfigValidationError>,

    /// Validation warnings
    pub warnings: Vec<ConfigValidationWarning>,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Field path (e.g., "graph.url")
    pub field: String,

    /// Error message
    pub message: String,
}

/// Configuration validation warning
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationWarning {
    /// Field path
    pub field: String,

    /// Warning message
    pub message: String,

    /// Suggestion
    pub suggestion: Option<String>,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. Environment variables
    /// 2. Explicit config file (--config)
    /// 3. Project config (./.npm-packager.yaml)
    /// 4. Global config (~/.npm-packager.yaml)
    /// 5. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<PackagerConfig, PublishError> {
        let mut configs: Vec<PackagerConfig> = vec![PackagerConfig::default()];

        if let Some(global_config) = Self::load_global_config(&options.env).await? {
            configs.push(global_config);
        }

        if let Some(project_config) =
            Self::load_config_file(&options.project_path.join(CONFIG_FILENAME)).await?
        {
            configs.push(project_config);
        }

        if let Some(ref explicit_path) = options.explicit_path {
            let explicit = Self::load_config_file(explicit_path).await?.ok_or_else(|| {
                PublishError::ConfigError(format!(
                    "Config file not found: {}",
                    explicit_path.display()
                ))
            })?;
            configs.push(explicit);
        }

        if let Some(env_config) = Self::load_env_config(&options.env) {
            configs.push(env_config);
        }

        let merged_config = Self::merge_configs(configs);

        Self::expand_env_vars(merged_config, &options.env)
    }

    /// Load global configuration from ~/.npm-packager.yaml
    async fn load_global_config(
        env: &HashMap<String, String>,
    ) -> Result<Option<PackagerConfig>, PublishError> {
        let home_dir = match env.get("HOME").cloned().or_else(|| env::var("HOME").ok()) {
            Some(home) => home,
            None => return Ok(None),
        };

        Self::load_config_file(&PathBuf::from(home_dir).join(CONFIG_FILENAME)).await
    }

    /// Load configuration from YAML file
    async fn load_config_file(file_path: &Path) -> Result<Option<PackagerConfig>, PublishError> {
        if !file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(file_path).await.map_err(|e| {
            PublishError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        let config: PackagerConfig = serde_yaml::from_str(&content).map_err(|e| {
            PublishError::ConfigError(format!("Failed to parse YAML config: {}", e))
        })?;

        log::debug!("Loaded configuration from {}", file_path.display());
        Ok(Some(config))
    }

    /// Load configuration from environment variables
    fn load_env_config(env: &HashMap<String, String>) -> Option<PackagerConfig> {
        let mut config = PackagerConfig::default();
        let mut has_changes = false;

        if let Some(url) = env.get("NPM_PACKAGER_REGISTRY_URL") {
            config.registry.url = Some(url.clone());
            has_changes = true;
        }

        if let Some(url) = env.get("NPM_PACKAGER_GRAPH_URL") {
            config.graph.url = Some(url.clone());
            has_changes = true;
        }

        if let Some(secret) = env.get("NPM_PACKAGER_GRAPH_SECRET") {
            config.graph.secret = Some(secret.clone());
            has_changes = true;
        }

        if let Some(root) = env.get("NPM_PACKAGER_TEMP_ROOT") {
            config.workspace.temp_root = Some(PathBuf::from(root));
            has_changes = true;
        }

        if has_changes { Some(config) } else { None }
    }

    /// Merge multiple configurations with priority
    fn merge_configs(configs: Vec<PackagerConfig>) -> PackagerConfig {
        let mut result = PackagerConfig::default();

        for config in configs {
            Self::merge_into(&mut result, config);
        }

        result
    }

    /// Merge source config into target, field by field
    fn merge_into(target: &mut PackagerConfig, source: PackagerConfig) {
        fn take<T>(target: &mut Option<T>, source: Option<T>) {
            if source.is_some() {
                *target = source;
            }
        }

        take(&mut target.registry.url, source.registry.url);
        take(&mut target.registry.access, source.registry.access);
        take(
            &mut target.registry.command_timeout_secs,
            source.registry.command_timeout_secs,
        );

        take(&mut target.workspace.temp_root, source.workspace.temp_root);

        take(&mut target.graph.url, source.graph.url);
        take(&mut target.graph.secret, source.graph.secret);
        take(
            &mut target.graph.types.package_version,
            source.graph.types.package_version,
        );
        take(&mut target.graph.types.token, source.graph.types.token);
        take(
            &mut target.graph.types.contain_tree,
            source.graph.types.contain_tree,
        );

        take(&mut target.exporter.command, source.exporter.command);
        take(&mut target.exporter.args, source.exporter.args);
    }

    /// Expand ${VAR} references in string settings
    fn expand_env_vars(
        mut config: PackagerConfig,
        env: &HashMap<String, String>,
    ) -> Result<PackagerConfig, PublishError> {
        let env_var_regex = Regex::new(ENV_VAR_PATTERN)
            .map_err(|e| PublishError::ConfigError(format!("invalid variable pattern: {}", e)))?;

        let expand = |value: &mut Option<String>| {
            if let Some(s) = value.as_mut() {
                *s = Self::expand_string(&env_var_regex, s, env);
            }
        };

        expand(&mut config.registry.url);
        expand(&mut config.graph.url);
        expand(&mut config.graph.secret);
        expand(&mut config.exporter.command);

        if let Some(args) = config.exporter.args.as_mut() {
            for arg in args.iter_mut() {
                *arg = Self::expand_string(&env_var_regex, arg, env);
            }
        }

        Ok(config)
    }

    /// Expand environment variables in a single string
    ///
    /// Unknown variables are left in place.
    fn expand_string(env_var_regex: &Regex, input: &str, env: &HashMap<String, String>) -> String {
        let mut result = input.to_string();
        for cap in env_var_regex.captures_iter(input) {
            let var_name = &cap[1];

            if let Some(value) = env.get(var_name) {
                result = result.replace(&format!("${{{}}}", var_name), value);
            } else {
                log::warn!("Environment variable {} not found", var_name);
            }
        }

        result
    }

    /// Validate configuration for the publish command
    pub fn validate(config: &PackagerConfig) -> ConfigValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if config.graph.url.is_none() {
            errors.push(ConfigValidationError {
                field: "graph.url".to_string(),
                message: "GraphQL endpoint is required".to_string(),
            });
        }

        if let Err(e) = config.graph.types.resolve() {
            errors.push(ConfigValidationError {
                field: "graph.types".to_string(),
                message: e.to_string(),
            });
        }

        match config.exporter.command.as_deref() {
            None | Some("") => errors.push(ConfigValidationError {
                field: "exporter.command".to_string(),
                message: "exporter command is required".to_string(),
            }),
            Some(_) => {}
        }

        if config.graph.secret.is_none() {
            warnings.push(ConfigValidationWarning {
                field: "graph.secret".to_string(),
                message: "No admin secret configured".to_string(),
                suggestion: Some("Set NPM_PACKAGER_GRAPH_SECRET".to_string()),
            });
        }

        if !config.registry_url().starts_with("https://") {
            warnings.push(ConfigValidationWarning {
                field: "registry.url".to_string(),
                message: format!("Registry URL is not HTTPS: {}", config.registry_url()),
                suggestion: None,
            });
        }

        ConfigValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Format validation result as human-readable text
    pub fn format_validation_result(result: &ConfigValidationResult) -> String {
        let mut lines = Vec::new();

        for error in &result.errors {
            lines.push(format!("❌ {}: {}", error.field, error.message));
        }
        for warning in &result.warnings {
            let mut line = format!("⚠️  {}: {}", warning.field, warning.message);
            if let Some(ref suggestion) = warning.suggestion {
                line.push_str(&format!(" ({})", suggestion));
            }
            lines.push(line);
        }

        lines.join("\n")
    }
}

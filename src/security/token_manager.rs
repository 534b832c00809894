//! Secure token handling for registry authentication
//!
//! Tokens are kept in `secrecy::SecretString` and only exposed when handed to
//! the registry CLI. Anything that is logged goes through the masking helpers.

use crate::core::error::{PublishError, Result};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};

/// Name of the workspace-local npm user config holding the credentials
pub const NPMRC_FILENAME: &str = ".npmrc";

/// Credentials passed explicitly to every registry call
#[derive(Clone)]
pub struct RegistryCredentials {
    registry_url: String,
    token: SecretString,
    userconfig: PathBuf,
}

impl std::fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("registry_url", &self.registry_url)
            .field("token", &SecureTokenManager::mask_token(self.token.expose_secret()))
            .field("userconfig", &self.userconfig)
            .finish()
    }
}

impl RegistryCredentials {
    /// Credentials scoped to a workspace; the npm user config lives at its root
    pub fn for_workspace(registry_url: &str, token: SecretString, workspace: &Path) -> Self {
        Self {
            registry_url: registry_url.to_string(),
            token,
            userconfig: workspace.join(NPMRC_FILENAME),
        }
    }

    pub fn registry_url(&self) -> &str {
        &self.registry_url
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }

    pub fn userconfig(&self) -> &Path {
        &self.userconfig
    }

    /// npm config key for the token, e.g. `//registry.npmjs.org/:_authToken`
    pub fn auth_key(&self) -> String {
        let without_scheme = self
            .registry_url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.registry_url);
        let host_path = without_scheme.trim_end_matches('/');

        format!("//{}/:_authToken", host_path)
    }

    /// Replace the token in arbitrary text with its masked form
    pub fn mask(&self, text: &str) -> String {
        SecureTokenManager::mask_secret_in_string(text, &self.token)
    }
}

/// Token selection and masking helpers
pub struct SecureTokenManager;

impl SecureTokenManager {
    /// Pick the registry token among those found for the actor
    ///
    /// Exactly one is expected. None is fatal; with several, the first wins.
    pub fn select_token(tokens: Vec<SecretString>) -> Result<SecretString> {
        let count = tokens.len();
        let token = tokens.into_iter().next().ok_or(PublishError::TokenMissing)?;

        if count > 1 {
            log::warn!("{} registry tokens found, using the first one", count);
        }

        Ok(token)
    }

    /// Masks a token for safe logging
    ///
    /// Shows only the first 3 and last 3 characters for identification purposes.
    /// Tokens shorter than 10 characters are fully masked as "****".
    ///
    /// # Examples
    ///
    /// ```
    /// use npm_packager::security::SecureTokenManager;
    ///
    /// assert_eq!(SecureTokenManager::mask_token("abcdef123456"), "abc...456");
    /// assert_eq!(SecureTokenManager::mask_token("short"), "****");
    /// ```
    pub fn mask_token(token: &str) -> String {
        if token.chars().count() < 10 {
            return "****".to_string();
        }

        let prefix: String = token.chars().take(3).collect();
        let suffix: String = token
            .chars()
            .rev()
            .take(3)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("{}...{}", prefix, suffix)
    }

    /// Masks every occurrence of the secret in a string
    pub fn mask_secret_in_string(text: &str, secret: &SecretString) -> String {
        let secret = secret.expose_secret();
        if secret.is_empty() {
            return text.to_string();
        }

        match Regex::new(&regex::escape(secret)) {
            Ok(regex) => regex
                .replace_all(text, Self::mask_token(secret).as_str())
                .to_string(),
            Err(_) => text.to_string(),
        }
    }
}

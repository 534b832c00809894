//! Error handling for package publishing
//!
//! Every fault aborts the publish run. Nothing here is retried automatically,
//! so the variants are grouped by [`FaultKind`] rather than by recoverability.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, PublishError>;

/// Coarse classification of a publish fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Auth,
    Validation,
    DependencyInstall,
    Manifest,
    Export,
    Publish,
    Io,
    DataStore,
    Config,
    Internal,
}

/// Main error type for package publishing operations
#[derive(Error, Debug)]
pub enum PublishError {
    // Auth errors
    #[error("npmトークンが見つかりません。publishリンクを挿入したユーザーがTokenを含んでいる必要があります")]
    TokenMissing,

    #[error("npm認証に失敗しました: {message}")]
    AuthenticationFailed { message: String },

    // Validation errors
    #[error("パッケージ名が空です (link {link_id})")]
    PackageNameMissing { link_id: i64 },

    #[error("パッケージ名が一致しません: 指定 '{declared}', 実際 '{actual}'")]
    PackageNameMismatch { declared: String, actual: String },

    #[error("パッケージ {package_id} にバージョンが設定されていません")]
    VersionMissing { package_id: i64 },

    #[error("無効なバージョン番号です '{version}': {message}")]
    InvalidVersion { version: String, message: String },

    // Dependency errors
    #[error("依存関係のインストールに失敗しました {spec}: {cause}")]
    DependencyInstallFailed { spec: String, cause: String },

    // Manifest errors
    #[error("package.jsonを処理できません {path}: {message}")]
    ManifestError { path: PathBuf, message: String },

    // Export errors
    #[error("パッケージのエクスポートに失敗しました: {}", format_export_errors(.errors))]
    ExportFailed { errors: Vec<serde_json::Value> },

    #[error("エクスポーターの実行に失敗しました: {message}")]
    ExporterUnavailable { message: String },

    // Publishing errors
    #[error("公開処理に失敗しました: {message}")]
    PublishFailed { message: String },

    // Infrastructure errors
    #[error("ファイル操作に失敗しました {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("データストアエラー: {message}")]
    DataStore { message: String },

    #[error("設定エラー: {0}")]
    ConfigError(String),

    #[error("内部エラー: {message}")]
    Internal { message: String },
}

fn format_export_errors(errors: &[serde_json::Value]) -> String {
    errors
        .iter()
        .map(|e| match e {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

impl PublishError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn manifest(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ManifestError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn data_store(message: impl Into<String>) -> Self {
        Self::DataStore {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Fault class of this error
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::TokenMissing | Self::AuthenticationFailed { .. } => FaultKind::Auth,
            Self::PackageNameMissing { .. }
            | Self::PackageNameMismatch { .. }
            | Self::VersionMissing { .. }
            | Self::InvalidVersion { .. } => FaultKind::Validation,
            Self::DependencyInstallFailed { .. } => FaultKind::DependencyInstall,
            Self::ManifestError { .. } => FaultKind::Manifest,
            Self::ExportFailed { .. } | Self::ExporterUnavailable { .. } => FaultKind::Export,
            Self::PublishFailed { .. } => FaultKind::Publish,
            Self::Io { .. } => FaultKind::Io,
            Self::DataStore { .. } => FaultKind::DataStore,
            Self::ConfigError(_) => FaultKind::Config,
            Self::Internal { .. } => FaultKind::Internal,
        }
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::TokenMissing => vec![
                "publishリンクを挿入したユーザーにTokenリンクを含めてください",
                "Tokenの型IDが設定と一致しているか確認してください",
            ],
            Self::AuthenticationFailed { .. } => vec![
                "トークンの有効期限を確認してください",
                "レジストリURLが正しいか確認してください",
                "npmがインストールされているか確認してください",
            ],
            Self::PackageNameMissing { .. } | Self::PackageNameMismatch { .. } => {
                vec!["publishリンクの参照先がパッケージ名と一致しているか確認してください"]
            }
            Self::VersionMissing { .. } => {
                vec!["パッケージにPackageVersionリンクを追加してください"]
            }
            Self::InvalidVersion { .. } => {
                vec!["SemVer形式（例: 1.0.0）で指定してください"]
            }
            Self::DependencyInstallFailed { .. } => vec![
                "依存パッケージがレジストリに公開されているか確認してください",
                "ネットワーク接続を確認してください",
            ],
            Self::ManifestError { .. } => {
                vec!["インストールされたパッケージのpackage.jsonを確認してください"]
            }
            Self::ExportFailed { .. } => vec!["エクスポートエラーを確認してください"],
            Self::ExporterUnavailable { .. } => {
                vec!["exporter.commandの設定を確認してください"]
            }
            Self::PublishFailed { .. } => vec![
                "エラーメッセージを確認してください",
                "レジストリのステータスを確認してください",
                "データストアのバージョンがレジストリと一致しているか確認してください",
            ],
            Self::Io { .. } => vec!["一時ディレクトリの権限と空き容量を確認してください"],
            Self::DataStore { .. } => vec![
                "graph.urlとgraph.secretの設定を確認してください",
                "データストアが起動しているか確認してください",
            ],
            Self::ConfigError(_) => vec![".npm-packager.yamlを確認してください"],
            Self::Internal { .. } => vec!["不具合として報告してください"],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::TokenMissing => "TOKEN_MISSING",
            Self::AuthenticationFailed { .. } => "AUTHENTICATION_FAILED",
            Self::PackageNameMissing { .. } => "PACKAGE_NAME_MISSING",
            Self::PackageNameMismatch { .. } => "PACKAGE_NAME_MISMATCH",
            Self::VersionMissing { .. } => "VERSION_MISSING",
            Self::InvalidVersion { .. } => "INVALID_VERSION",
            Self::DependencyInstallFailed { .. } => "DEPENDENCY_INSTALL_FAILED",
            Self::ManifestError { .. } => "MANIFEST_ERROR",
            Self::ExportFailed { .. } => "EXPORT_FAILED",
            Self::ExporterUnavailable { .. } => "EXPORTER_UNAVAILABLE",
            Self::PublishFailed { .. } => "PUBLISH_FAILED",
            Self::Io { .. } => "IO_ERROR",
            Self::DataStore { .. } => "DATA_STORE_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_missing_error() {
        let error = PublishError::TokenMissing;

        assert_eq!(error.kind(), FaultKind::Auth);
        assert_eq!(error.code(), "TOKEN_MISSING");
        assert!(error.suggested_actions().len() >= 2);
    }

    #[test]
    fn test_name_mismatch_is_validation_fault() {
        let error = PublishError::PackageNameMismatch {
            declared: "acme-widget".to_string(),
            actual: "acme-gadget".to_string(),
        };

        assert_eq!(error.kind(), FaultKind::Validation);
        let display = error.to_string();
        assert!(display.contains("acme-widget"));
        assert!(display.contains("acme-gadget"));
    }

    #[test]
    fn test_missing_version_is_validation_fault() {
        let error = PublishError::VersionMissing { package_id: 42 };

        assert_eq!(error.kind(), FaultKind::Validation);
        assert_eq!(error.code(), "VERSION_MISSING");
        assert!(error.to_string().contains("42"));
    }

    #[test]
    fn test_export_failed_lists_errors() {
        let error = PublishError::ExportFailed {
            errors: vec![
                serde_json::json!("dependency cycle"),
                serde_json::json!({"link": 7}),
            ],
        };

        assert_eq!(error.kind(), FaultKind::Export);
        let display = error.to_string();
        assert!(display.contains("dependency cycle"));
        assert!(display.contains(r#"{"link":7}"#));
    }

    #[test]
    fn test_io_error_keeps_source() {
        let error = PublishError::io(
            "/tmp/missing",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );

        assert_eq!(error.kind(), FaultKind::Io);
        assert!(std::error::Error::source(&error).is_some());
        assert!(error.to_string().contains("/tmp/missing"));
    }

    #[test]
    fn test_publish_failed_error_with_message() {
        let error = PublishError::PublishFailed {
            message: "E403 forbidden".to_string(),
        };

        assert_eq!(error.kind(), FaultKind::Publish);
        assert_eq!(error.code(), "PUBLISH_FAILED");
        assert!(error.to_string().contains("E403 forbidden"));
    }

    #[test]
    fn test_dependency_install_failed() {
        let error = PublishError::DependencyInstallFailed {
            spec: "left-pad@~1.3.0".to_string(),
            cause: "E404".to_string(),
        };

        assert_eq!(error.kind(), FaultKind::DependencyInstall);
        assert!(error.to_string().contains("left-pad@~1.3.0"));
    }
}

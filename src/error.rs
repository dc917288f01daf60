/// Centralized error types for repo-wiki using thiserror
///
/// Errors that affect a single unit of work (one source file, one page) are
/// reported and the unit is dropped. Errors that affect the structural
/// backbone of a run abort it and surface to the caller.
use thiserror::Error;

/// Main error type for the wiki pipeline
#[derive(Error, Debug)]
pub enum WikiError {
    #[error("The generative model returned an empty response")]
    EmptyModelResponse,

    #[error("No <wiki_structure> block found in model output. Snippet: {snippet}")]
    StructureBlockNotFound { snippet: String },

    #[error("Structure markup could not be recovered: {0}")]
    UnrecoverableMarkup(String),

    #[error("Failed to read source '{path}': {reason}")]
    SourceRead { path: String, reason: String },

    #[error("Failed to generate page '{title}': {reason}")]
    PageGeneration { title: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors related to the retrieval index
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to open index at '{path}': {reason}")]
    OpenFailed { path: String, reason: String },

    #[error("Failed to embed chunks: {0}")]
    EmbeddingFailed(String),

    #[error("Failed to store chunks: {0}")]
    StoreFailed(String),

    #[error("Failed to search index: {0}")]
    SearchFailed(String),

    #[error("No index has been built at '{0}'")]
    NotBuilt(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors related to input validation
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid repository URL: {0}")]
    InvalidRepositoryUrl(String),

    #[error("Unsupported language code: {0}")]
    UnsupportedLanguage(String),

    #[error("Empty {0}")]
    Empty(String),
}

/// Errors related to repository acquisition
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to clone '{url}': {reason}")]
    CloneFailed { url: String, reason: String },

    #[error("Failed to read repository snapshot: {0}")]
    SnapshotFailed(String),
}

/// Errors related to cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to load cache from '{path}': {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("Failed to save cache to '{path}': {reason}")]
    SaveFailed { path: String, reason: String },

    #[error("Failed to parse cache file '{path}': {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("Failed to create cache directory: {0}")]
    DirectoryCreationFailed(String),
}

// Conversion from anyhow::Error to WikiError
impl From<anyhow::Error> for WikiError {
    fn from(err: anyhow::Error) -> Self {
        WikiError::Other(format!("{:#}", err))
    }
}

impl WikiError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        WikiError::Other(msg.into())
    }

    /// Whether this error aborts the whole run rather than a single unit of work
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            WikiError::SourceRead { .. } | WikiError::PageGeneration { .. }
        )
    }

    /// Check if this is a user error (bad input or configuration) vs system error
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            WikiError::Validation(_) | WikiError::Config(ConfigError::InvalidValue { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WikiError::Validation(ValidationError::InvalidRepositoryUrl("nope".to_string()));
        assert_eq!(
            err.to_string(),
            "Validation error: Invalid repository URL: nope"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: WikiError = io_err.into();
        assert!(matches!(err, WikiError::Io(_)));
    }

    #[test]
    fn test_error_from_anyhow() {
        let anyhow_err = anyhow::anyhow!("test error");
        let err: WikiError = anyhow_err.into();
        assert!(matches!(err, WikiError::Other(_)));
    }

    #[test]
    fn test_unit_errors_are_not_fatal() {
        let page = WikiError::PageGeneration {
            title: "Overview".to_string(),
            reason: "empty".to_string(),
        };
        let source = WikiError::SourceRead {
            path: "a.bin".to_string(),
            reason: "invalid utf-8".to_string(),
        };
        assert!(!page.is_fatal());
        assert!(!source.is_fatal());
    }

    #[test]
    fn test_backbone_errors_are_fatal() {
        assert!(WikiError::EmptyModelResponse.is_fatal());
        assert!(
            WikiError::StructureBlockNotFound {
                snippet: String::new()
            }
            .is_fatal()
        );
        assert!(WikiError::UnrecoverableMarkup("bad".to_string()).is_fatal());
    }

    #[test]
    fn test_is_user_error() {
        let user_err = WikiError::Validation(ValidationError::Empty("question".to_string()));
        assert!(user_err.is_user_error());

        let system_err = WikiError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "test"));
        assert!(!system_err.is_user_error());
    }

    #[test]
    fn test_cache_error_load_failed() {
        let err = CacheError::LoadFailed {
            path: "/tmp/cache.json".to_string(),
            reason: "permission denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to load cache from '/tmp/cache.json': permission denied"
        );
    }

    #[test]
    fn test_error_chain() {
        let index_err = IndexError::SearchFailed("table missing".to_string());
        let err: WikiError = index_err.into();
        assert!(matches!(err, WikiError::Index(_)));
        assert_eq!(
            err.to_string(),
            "Index error: Failed to search index: table missing"
        );
    }
}

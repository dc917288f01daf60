/// Centralized platform-specific path computation
///
/// Index data, the wiki cache and the config file each live under the
/// platform's conventional directory (XDG on Linux), in a `repo-wiki` folder.
use std::path::PathBuf;

const APP_DIR: &str = "repo-wiki";

/// Platform-agnostic path utilities
pub struct PlatformPaths;

impl PlatformPaths {
    /// Local data directory (`$XDG_DATA_HOME`, `~/Library/Application Support`, `%LOCALAPPDATA%`)
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Cache directory (`$XDG_CACHE_HOME`, `~/Library/Caches`, `%LOCALAPPDATA%`)
    pub fn cache_dir() -> PathBuf {
        dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Config directory (`$XDG_CONFIG_HOME`, `~/Library/Application Support`, `%APPDATA%`)
    pub fn config_dir() -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Returns: {data_dir}/repo-wiki
    pub fn project_data_dir() -> PathBuf {
        Self::data_dir().join(APP_DIR)
    }

    /// Returns: {cache_dir}/repo-wiki
    pub fn project_cache_dir() -> PathBuf {
        Self::cache_dir().join(APP_DIR)
    }

    /// Returns: {config_dir}/repo-wiki
    pub fn project_config_dir() -> PathBuf {
        Self::config_dir().join(APP_DIR)
    }

    /// Root under which per-repository retrieval indexes are created
    ///
    /// Returns: {data_dir}/repo-wiki/indexes
    pub fn default_index_root() -> PathBuf {
        Self::project_data_dir().join("indexes")
    }

    /// Directory holding one wiki cache file per (repository, model) pair
    ///
    /// Returns: {cache_dir}/repo-wiki/wiki_cache
    pub fn default_wiki_cache_dir() -> PathBuf {
        Self::project_cache_dir().join("wiki_cache")
    }

    /// Returns: {config_dir}/repo-wiki/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::project_config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_dirs_not_empty() {
        assert!(!PlatformPaths::data_dir().as_os_str().is_empty());
        assert!(!PlatformPaths::cache_dir().as_os_str().is_empty());
        assert!(!PlatformPaths::config_dir().as_os_str().is_empty());
    }

    #[test]
    fn test_project_paths_contain_project_name() {
        for dir in [
            PlatformPaths::project_data_dir(),
            PlatformPaths::project_cache_dir(),
            PlatformPaths::project_config_dir(),
        ] {
            assert!(dir.to_string_lossy().contains("repo-wiki"));
        }
    }

    #[test]
    fn test_project_dirs_are_subdirectories() {
        assert!(PlatformPaths::project_data_dir().starts_with(PlatformPaths::data_dir()));
        assert!(PlatformPaths::project_cache_dir().starts_with(PlatformPaths::cache_dir()));
    }

    #[test]
    fn test_specific_file_paths() {
        assert!(PlatformPaths::default_index_root().ends_with("indexes"));
        assert!(PlatformPaths::default_wiki_cache_dir().ends_with("wiki_cache"));
        assert!(PlatformPaths::default_config_path().ends_with("config.toml"));
    }
}

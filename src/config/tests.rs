use super::*;
use tempfile::NamedTempFile;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.llm.backend, "ollama");
    assert_eq!(config.embedding.model_name, "all-MiniLM-L6-v2");
    assert_eq!(config.indexing.chunk_size, 512);
    assert_eq!(config.indexing.chunk_overlap, 50);
    assert_eq!(config.generation.structure_max_tokens, 4096);
    assert_eq!(config.generation.structure_max_iterations, 5);
    assert_eq!(config.generation.continuation_window, 500);
    assert_eq!(config.generation.page_concurrency, 1);
    assert_eq!(config.retrieval.top_k, 5);
}

#[test]
fn test_default_extensions_cover_source_and_docs() {
    let config = Config::default();
    for ext in ["py", "ts", "go", "md", "yml", "rs"] {
        assert!(
            config.indexing.extensions.iter().any(|e| e == ext),
            "missing extension {}",
            ext
        );
    }
}

#[test]
fn test_config_validation_success() {
    let config = Config::default();
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validation_unknown_backend() {
    let mut config = Config::default();
    config.llm.backend = "carrier-pigeon".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_overlap_not_smaller_than_chunk() {
    let mut config = Config::default();
    config.indexing.chunk_overlap = config.indexing.chunk_size;
    let err = config.validate().unwrap_err();
    assert!(err.is_user_error());
    assert!(err.to_string().contains("chunk_overlap"));
}

#[test]
fn test_config_validation_zero_values() {
    let mut config = Config::default();
    config.generation.structure_max_iterations = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.generation.page_concurrency = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.retrieval.top_k = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_save_and_load() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path();

    let mut config = Config::default();
    config.llm.model_id = "llama3:8b".to_string();
    config.generation.page_concurrency = 4;

    config.save(path).unwrap();

    let loaded = Config::from_file(path).unwrap();
    assert_eq!(loaded.llm.model_id, "llama3:8b");
    assert_eq!(loaded.generation.page_concurrency, 4);
    assert_eq!(loaded.indexing.chunk_size, config.indexing.chunk_size);
}

#[test]
fn test_config_from_nonexistent_file() {
    let result = Config::from_file(Path::new("/nonexistent/config.toml"));
    assert!(matches!(
        result,
        Err(WikiError::Config(ConfigError::FileNotFound(_)))
    ));
}

#[test]
fn test_config_partial_file_uses_defaults() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(
        temp_file.path(),
        "[llm]\nmodel_id = \"gpt-4o-mini\"\nbackend = \"openai\"\n",
    )
    .unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(config.llm.model_id, "gpt-4o-mini");
    assert_eq!(config.llm.backend, "openai");
    assert_eq!(config.llm.timeout_secs, 600);
    assert_eq!(config.retrieval.top_k, 5);
}

#[test]
fn test_config_invalid_toml() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), "[llm\nmodel_id = ").unwrap();

    let result = Config::from_file(temp_file.path());
    assert!(matches!(
        result,
        Err(WikiError::Config(ConfigError::ParseFailed(_)))
    ));
}

#[test]
fn test_config_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).unwrap();
    assert!(toml_str.contains("[llm]"));
    assert!(toml_str.contains("[indexing]"));
    assert!(toml_str.contains("[generation]"));
    assert!(toml_str.contains("[retrieval]"));
}

#[test]
fn test_env_overrides() {
    unsafe {
        std::env::set_var("REPO_WIKI_MODEL", "env-model");
        std::env::set_var("REPO_WIKI_PAGE_CONCURRENCY", "3");
        std::env::set_var("REPO_WIKI_CACHE_DIR", "/tmp/repo-wiki-env-cache");
    }

    let mut config = Config::default();
    config.apply_env_overrides();

    assert_eq!(config.llm.model_id, "env-model");
    assert_eq!(config.generation.page_concurrency, 3);
    assert_eq!(
        config.cache.cache_dir,
        PathBuf::from("/tmp/repo-wiki-env-cache")
    );

    // Unparseable numbers leave the current value alone
    unsafe {
        std::env::set_var("REPO_WIKI_PAGE_CONCURRENCY", "many");
    }
    let mut config = Config::default();
    config.apply_env_overrides();
    assert_eq!(config.generation.page_concurrency, 1);

    unsafe {
        std::env::remove_var("REPO_WIKI_MODEL");
        std::env::remove_var("REPO_WIKI_PAGE_CONCURRENCY");
        std::env::remove_var("REPO_WIKI_CACHE_DIR");
    }
}

use super::*;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.repository.branch, "main");
    assert_eq!(config.archive.base_url, "https://github.com");
    assert_eq!(config.embedding.base_url, "https://api.openai.com/v1");
    assert_eq!(config.embedding.model, "text-embedding-3-small");
    assert_eq!(config.embedding.batch_size, 5);
    assert_eq!(config.embedding.max_input_chars, 25_000);
    assert_eq!(config.embedding.batch_delay_ms, 10);
    assert_eq!(config.retrieval.top_k, 3);
}

#[test]
fn config_validation() {
    let config = Config::default();
    assert!(config.validate().is_ok());

    let mut invalid_config = config.clone();
    invalid_config.embedding.base_url = "ftp://example.com".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.archive.base_url = "not a url".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.batch_size = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.max_input_chars = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.retrieval.top_k = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidTopK(0))
    ));
}

#[test]
fn repository_validation() {
    assert!(RepoConfig::default().validate().is_err());

    let repo = RepoConfig::new("Azure", "bicep", "main", "docs");
    assert!(repo.validate().is_ok());

    let repo = RepoConfig::new("Azure", "bicep", " ", "docs");
    assert!(matches!(
        repo.validate(),
        Err(ConfigError::MissingRepository("branch"))
    ));
}

#[test]
fn setter_validation() {
    let mut repo = RepoConfig::default();
    assert!(repo.set_owner("Azure".to_string()).is_ok());
    assert!(repo.set_repo("bicep".to_string()).is_ok());
    assert!(repo.set_branch("release/1.0".to_string()).is_ok());
    assert!(repo.set_owner(String::new()).is_err());
    assert!(repo.set_branch("   ".to_string()).is_err());

    repo.set_root_path("/docs/reference/".to_string());
    assert_eq!(repo.root_path, "docs/reference");

    let mut embedding = EmbeddingConfig::default();
    assert!(embedding.set_model("text-embedding-3-large".to_string()).is_ok());
    assert!(embedding.set_batch_size(16).is_ok());
    assert!(embedding.set_base_url("http://localhost:8080/v1".to_string()).is_ok());
    assert!(embedding.set_model("  ".to_string()).is_err());
    assert!(embedding.set_batch_size(0).is_err());
    assert!(embedding.set_batch_size(2049).is_err());
    assert!(embedding.set_base_url("localhost".to_string()).is_err());

    let mut retrieval = RetrievalConfig::default();
    assert!(retrieval.set_top_k(5).is_ok());
    assert!(retrieval.set_top_k(0).is_err());
    assert_eq!(retrieval.top_k, 5);
}

#[test]
fn configured_api_key_takes_precedence() {
    let embedding = EmbeddingConfig {
        api_key: Some("sk-configured".to_string()),
        ..EmbeddingConfig::default()
    };
    assert_eq!(
        embedding.resolve_api_key().expect("api key is configured"),
        "sk-configured"
    );
}

#[test]
fn snapshot_path_defaults_under_base_dir() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Default::default()
    };
    assert_eq!(
        config.snapshot_path(),
        temp_dir.path().join("cache").join("embeddings-cache.json")
    );

    let explicit = temp_dir.path().join("elsewhere.json");
    let config = Config {
        retrieval: RetrievalConfig {
            snapshot_path: Some(explicit.clone()),
            ..RetrievalConfig::default()
        },
        ..config
    };
    assert_eq!(config.snapshot_path(), explicit);
}

#[test]
fn load_missing_config_returns_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = Config::load(temp_dir.path()).expect("missing config falls back to defaults");
    assert_eq!(config.base_dir, temp_dir.path());
    assert_eq!(config.embedding, EmbeddingConfig::default());
    assert_eq!(config.retrieval, RetrievalConfig::default());
}

#[test]
fn toml_serialization() {
    let mut config = Config::default();
    config.repository = RepoConfig::new("Azure", "bicep", "main", "docs");
    config.embedding.api_key = Some("sk-test".to_string());

    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let mut parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    parsed_config.base_dir = config.base_dir.clone();

    assert_eq!(config, parsed_config);
}

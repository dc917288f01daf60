use super::*;

#[test]
fn test_language_codes_round_trip_through_from_str() {
    for lang in WikiLanguage::ALL {
        assert_eq!(lang.code().parse::<WikiLanguage>().unwrap(), lang);
    }
}

#[test]
fn test_language_from_str_is_case_insensitive() {
    assert_eq!(
        "PT-BR".parse::<WikiLanguage>().unwrap(),
        WikiLanguage::BrazilianPortuguese
    );
    assert_eq!(" ja ".parse::<WikiLanguage>().unwrap(), WikiLanguage::Japanese);
}

#[test]
fn test_language_unknown_code() {
    let err = "klingon".parse::<WikiLanguage>().unwrap_err();
    assert!(matches!(err, ValidationError::UnsupportedLanguage(code) if code == "klingon"));
}

#[test]
fn test_language_display_names() {
    assert_eq!(WikiLanguage::English.display_name(), "English");
    assert_eq!(WikiLanguage::Japanese.display_name(), "Japanese (日本語)");
    assert_eq!(
        WikiLanguage::TraditionalChinese.display_name(),
        "Traditional Chinese (繁體中文)"
    );
}

#[test]
fn test_language_default_and_serde() {
    assert_eq!(WikiLanguage::default(), WikiLanguage::English);
    let json = serde_json::to_string(&WikiLanguage::TraditionalChinese).unwrap();
    assert_eq!(json, "\"zh-tw\"");
    let back: WikiLanguage = serde_json::from_str("\"kr\"").unwrap();
    assert_eq!(back, WikiLanguage::Korean);
}

#[test]
fn test_repo_ref_parse_https() {
    let repo = RepoRef::parse("https://github.com/tokio-rs/tokio").unwrap();
    assert_eq!(repo.owner, "tokio-rs");
    assert_eq!(repo.name, "tokio");
    assert_eq!(repo.slug(), "tokio-rs/tokio");
}

#[test]
fn test_repo_ref_parse_strips_trailing_slash_and_git_suffix() {
    let a = RepoRef::parse("https://github.com/serde-rs/serde/").unwrap();
    let b = RepoRef::parse("https://github.com/serde-rs/serde.git").unwrap();
    let c = RepoRef::parse("https://github.com/serde-rs/serde.git/").unwrap();
    assert_eq!(a.name, "serde");
    assert_eq!(b, a);
    assert_eq!(c, a);
}

#[test]
fn test_repo_ref_parse_bare_slug() {
    let repo = RepoRef::parse("owner/name").unwrap();
    assert_eq!(repo.owner, "owner");
    assert_eq!(repo.name, "name");
}

#[test]
fn test_repo_ref_parse_rejects_single_segment() {
    assert!(RepoRef::parse("justaname").is_err());
    assert!(RepoRef::parse("").is_err());
    assert!(RepoRef::parse("https://github.com").is_err());
}

#[test]
fn test_retrieval_state_has_context() {
    let empty = RetrievalState::default();
    assert!(!empty.has_context());

    let filled = RetrievalState {
        question: "what?".to_string(),
        context: "a\n\n---\n\nb".to_string(),
    };
    assert!(filled.has_context());
}

#[test]
fn test_generate_request_defaults() {
    let req: GenerateRequest =
        serde_json::from_str(r#"{"repo_url": "https://github.com/a/b"}"#).unwrap();
    assert_eq!(req.language, WikiLanguage::English);
    assert!(!req.comprehensive);
}

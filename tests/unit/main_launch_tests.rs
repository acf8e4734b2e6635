use super::*;

#[test]
fn defaults_use_local_store_and_bundled_theme_path() {
    let options = LaunchOptions::try_parse_from(["caseforge"]).expect("parses");
    assert!(!options.offline);
    assert_eq!(options.sync_url, None);
    assert_eq!(options.theme, PathBuf::from("theme.toml"));
}

#[test]
fn offline_flag_is_recognized() {
    let options = LaunchOptions::try_parse_from(["caseforge", "--offline"]).expect("parses");
    assert!(options.offline);
}

#[test]
fn sync_url_takes_a_value() {
    let options =
        LaunchOptions::try_parse_from(["caseforge", "--sync-url", "https://sync.example.com"])
            .expect("parses");
    assert_eq!(
        options.sync_url.as_deref(),
        Some("https://sync.example.com")
    );
}

#[test]
fn theme_path_is_overridable() {
    let options =
        LaunchOptions::try_parse_from(["caseforge", "--theme", "/etc/caseforge/dark.toml"])
            .expect("parses");
    assert_eq!(options.theme, PathBuf::from("/etc/caseforge/dark.toml"));
}

#[test]
fn unknown_flags_are_rejected() {
    assert!(LaunchOptions::try_parse_from(["caseforge", "--bogus"]).is_err());
}

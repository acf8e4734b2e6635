use super::*;

#[test]
fn provider_cycle_visits_all_three() {
    assert_eq!(Provider::Gemini.next(), Provider::OpenAi);
    assert_eq!(Provider::OpenAi.next(), Provider::Custom);
    assert_eq!(Provider::Custom.next(), Provider::Gemini);
}

#[test]
fn provider_labels_are_stable() {
    assert_eq!(Provider::Gemini.label(), "Google Gemini (Default)");
    assert_eq!(Provider::OpenAi.label(), "OpenAI / Compatible");
    assert_eq!(Provider::Custom.label(), "Custom (Ollama/Local)");
}

#[test]
fn api_config_defaults_to_gemini_with_empty_fields() {
    let config = ApiConfig::default();
    assert_eq!(config.provider, Provider::Gemini);
    assert!(config.api_key.is_empty());
    assert!(config.base_url.is_empty());
    assert!(config.model_name.is_empty());
}

#[test]
fn api_config_serde_uses_wire_names() {
    let json = r#"{"provider":"openai","apiKey":"k","baseUrl":"http://x","modelName":"m"}"#;
    let config: ApiConfig = serde_json::from_str(json).expect("parses");
    assert_eq!(config.provider, Provider::OpenAi);
    assert_eq!(config.api_key, "k");

    let out = serde_json::to_string(&config).expect("serializes");
    assert!(out.contains("\"apiKey\""));
    assert!(out.contains("\"baseUrl\""));
    assert!(out.contains("\"modelName\""));
}

#[test]
fn partial_api_config_fills_defaults() {
    let config: ApiConfig = serde_json::from_str(r#"{"provider":"custom"}"#).expect("parses");
    assert_eq!(config.provider, Provider::Custom);
    assert!(config.api_key.is_empty());
}

#[test]
fn chat_completions_url_tolerates_trailing_slash() {
    assert_eq!(
        chat_completions_url("http://localhost:11434/v1"),
        "http://localhost:11434/v1/chat/completions"
    );
    assert_eq!(
        chat_completions_url("http://localhost:11434/v1/"),
        "http://localhost:11434/v1/chat/completions"
    );
    assert_eq!(
        chat_completions_url(""),
        "https://api.openai.com/v1/chat/completions"
    );
}

#[test]
fn gemini_url_uses_default_model_when_unset() {
    let url = gemini_generate_url("", "KEY");
    assert!(url.contains("/models/gemini-2.5-flash-preview-09-2025:generateContent"));
    assert!(url.ends_with("?key=KEY"));

    let url = gemini_generate_url("gemini-pro", "KEY");
    assert!(url.contains("/models/gemini-pro:generateContent"));
}

#[test]
fn openai_model_falls_back_to_default() {
    let mut config = ApiConfig::default();
    assert_eq!(openai_model(&config), "gpt-3.5-turbo");
    config.model_name = "qwen2".to_string();
    assert_eq!(openai_model(&config), "qwen2");
}

#[test]
fn effective_gemini_key_prefers_user_key() {
    let config = ApiConfig {
        api_key: "user-key".to_string(),
        ..ApiConfig::default()
    };
    assert_eq!(effective_gemini_key(&config), "user-key");
}

#[test]
fn openai_without_key_is_a_config_error() {
    let config = ApiConfig {
        provider: Provider::OpenAi,
        ..ApiConfig::default()
    };
    match complete(&config, "prompt") {
        Err(ModelError::Config(detail)) => assert!(detail.contains("API key")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn model_error_display_formats() {
    let err = ModelError::Provider {
        status: 429,
        body: "quota".to_string(),
    };
    assert_eq!(err.to_string(), "Model API error (429): quota");
    assert_eq!(
        ModelError::Transport("timed out".to_string()).to_string(),
        "Request failed: timed out"
    );
}

#[test]
fn adapter_delivers_one_event_per_prompt() {
    let adapter = ModelAdapter::new();
    // Custom provider with an unroutable base URL fails fast with a
    // transport error instead of hanging.
    let config = ApiConfig {
        provider: Provider::Custom,
        base_url: "http://127.0.0.1:9".to_string(),
        ..ApiConfig::default()
    };
    adapter.send_prompt(config, "hi".to_string());

    let mut events = Vec::new();
    for _ in 0..600 {
        events = adapter.drain_events_limited(8);
        if !events.is_empty() {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    }
    assert_eq!(events.len(), 1);
    let ModelEvent::Completed(result) = &events[0];
    assert!(result.is_err());
}

#[test]
fn drain_respects_limit() {
    let adapter = ModelAdapter::new();
    assert!(adapter.drain_events_limited(0).is_empty());
    assert!(adapter.drain_events_limited(4).is_empty());
}

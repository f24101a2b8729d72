use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use staybook_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value) in effective_values(&config) {
        let source = field_source(key, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    lines.join("\n")
}

fn effective_values(config: &AppConfig) -> Vec<(&'static str, String)> {
    vec![
        ("database.url", config.database.url.clone()),
        ("database.max_connections", config.database.max_connections.to_string()),
        ("database.timeout_secs", config.database.timeout_secs.to_string()),
        ("server.bind_address", config.server.bind_address.clone()),
        ("server.port", config.server.port.to_string()),
        ("server.graceful_shutdown_secs", config.server.graceful_shutdown_secs.to_string()),
        ("platform.currency", config.platform.currency.clone()),
        ("platform.commission_rate", config.platform.commission_rate.to_string()),
        ("platform.commission_min_ratio", config.platform.commission_min_ratio.to_string()),
        ("platform.commission_max_ratio", config.platform.commission_max_ratio.to_string()),
        ("platform.amount_tolerance", config.platform.amount_tolerance.to_string()),
        ("gateway.base_url", config.gateway.base_url.clone().unwrap_or_else(|| "<unset>".to_string())),
        ("gateway.api_key", redact_secret(config.gateway.api_key.as_ref())),
        ("gateway.webhook_secret", redact_secret(config.gateway.webhook_secret.as_ref())),
        ("gateway.timeout_secs", config.gateway.timeout_secs.to_string()),
        ("logging.level", config.logging.level.clone()),
        ("logging.format", format!("{:?}", config.logging.format)),
    ]
}

/// `database.max_connections` is read from `STAYBOOK_DATABASE_MAX_CONNECTIONS`.
fn env_key(key_path: &str) -> String {
    format!("STAYBOOK_{}", key_path.replace('.', "_").to_ascii_uppercase())
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("staybook.toml"), PathBuf::from("config/staybook.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let env_key = env_key(key_path);
    if env::var_os(&env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: Option<&SecretString>) -> String {
    match secret {
        Some(_) => "<redacted>".to_string(),
        None => "<unset>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{contains_path, env_key, redact_secret};

    #[test]
    fn env_keys_follow_the_section_prefix() {
        assert_eq!(env_key("platform.commission_rate"), "STAYBOOK_PLATFORM_COMMISSION_RATE");
        assert_eq!(env_key("gateway.webhook_secret"), "STAYBOOK_GATEWAY_WEBHOOK_SECRET");
    }

    #[test]
    fn nested_paths_resolve_against_the_file_document() {
        let doc: toml::Value = "[platform]\ncommission_rate = \"0.12\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "platform.commission_rate"));
        assert!(!contains_path(&doc, "platform.currency"));
        assert!(!contains_path(&doc, "gateway.api_key"));
    }

    #[test]
    fn secrets_never_render() {
        assert_eq!(redact_secret(Some(&"sk_live_123".to_string().into())), "<redacted>");
        assert_eq!(redact_secret(None), "<unset>");
    }
}

use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;
use url::Url;

const DEFAULT_BIND: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8787;
const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;
const DEFAULT_OLLAMA_HOST: &str = "http://127.0.0.1";
const DEFAULT_OLLAMA_PORT: u16 = 11434;
const DEFAULT_MODEL: &str = "llama3:8b";
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Runtime configuration, read once at start-up.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub bind: String,
    pub port: u16,
    pub body_limit: usize,
    pub ollama_host: String,
    pub ollama_port: u16,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            body_limit: DEFAULT_BODY_LIMIT,
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            ollama_port: DEFAULT_OLLAMA_PORT,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Reads settings through `lookup`, falling back to defaults for anything
    /// unset or unparseable.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        Self {
            bind: get_string(&lookup, "JOBCARD_BIND", &defaults.bind),
            port: get_parsed(&lookup, "JOBCARD_PORT", defaults.port),
            body_limit: get_parsed(&lookup, "JOBCARD_BODY_LIMIT", defaults.body_limit),
            ollama_host: get_host(&lookup, "OLLAMA_HOST", &defaults.ollama_host),
            ollama_port: get_parsed(&lookup, "OLLAMA_PORT", defaults.ollama_port),
            model: get_string(&lookup, "OLLAMA_MODEL", &defaults.model),
            temperature: get_parsed(&lookup, "LLM_TEMPERATURE", defaults.temperature),
            timeout: Duration::from_secs(get_parsed(
                &lookup,
                "LLM_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )),
        }
    }

    /// Address the relay listens on.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn get_string<F>(lookup: &F, var: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn get_parsed<F, T>(lookup: &F, var: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display,
{
    match lookup(var) {
        Some(raw) if !raw.trim().is_empty() => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "Invalid value '{}' for {}, using default {}",
                    raw, var, default
                );
                default
            }
        },
        _ => default,
    }
}

// The Ollama client panics on a host it can't parse, so reject those here.
fn get_host<F>(lookup: &F, var: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let host = normalize_host(&get_string(lookup, var, default));
    match Url::parse(&host) {
        Ok(parsed) if parsed.host_str().is_some() => host,
        _ => {
            warn!(
                "Invalid value '{}' for {}, using default {}",
                host, var, default
            );
            default.to_string()
        }
    }
}

// ollama-rs wants a full URL; people tend to export just "localhost".
fn normalize_host(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", host.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings_from(&[]);
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.listen_addr(), "127.0.0.1:8787");
        assert_eq!(settings.ollama_host, "http://127.0.0.1");
        assert_eq!(settings.ollama_port, 11434);
        assert_eq!(settings.model, "llama3:8b");
        assert_eq!(settings.body_limit, 2 * 1024 * 1024);
    }

    #[test]
    fn test_overrides() {
        let settings = settings_from(&[
            ("JOBCARD_PORT", "9000"),
            ("OLLAMA_HOST", "gpu-box"),
            ("OLLAMA_MODEL", "mistral"),
            ("LLM_TEMPERATURE", "0.0"),
            ("LLM_TIMEOUT_SECS", "30"),
        ]);
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.ollama_host, "http://gpu-box");
        assert_eq!(settings.model, "mistral");
        assert_eq!(settings.temperature, 0.0);
        assert_eq!(settings.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let settings = settings_from(&[
            ("JOBCARD_PORT", "not-a-port"),
            ("OLLAMA_PORT", "99999"),
            ("OLLAMA_MODEL", "   "),
        ]);
        assert_eq!(settings.port, 8787);
        assert_eq!(settings.ollama_port, 11434);
        assert_eq!(settings.model, "llama3:8b");
    }

    #[test]
    fn test_invalid_ollama_host_falls_back() {
        for bad in ["bad host", "http://", "https://exa mple.com", "gpu-box:notaport"] {
            let settings = settings_from(&[("OLLAMA_HOST", bad)]);
            assert_eq!(settings.ollama_host, "http://127.0.0.1", "host {:?}", bad);
        }

        let settings = settings_from(&[("OLLAMA_HOST", "http://gpu-box:11434/")]);
        assert_eq!(settings.ollama_host, "http://gpu-box:11434");
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("localhost"), "http://localhost");
        assert_eq!(normalize_host("https://llm.lan/"), "https://llm.lan");
    }
}

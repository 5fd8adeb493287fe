use std::env;

pub const DEFAULT_TMDB_BASE: &str = "https://api.themoviedb.org/3";

/// Optional runtime settings. Nothing here is required to start; the API key
/// is normally typed at the prompt and `api_key` only fills in a blank answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_TMDB_BASE.to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let base_url = non_empty("TMDB_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_TMDB_BASE.to_string());
        Self {
            api_key: non_empty("TMDB_API_KEY"),
            base_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let settings = Settings::from_lookup(lookup(&[]));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let settings = Settings::from_lookup(lookup(&[
            ("TMDB_API_KEY", "  "),
            ("TMDB_BASE_URL", ""),
        ]));
        assert_eq!(settings.api_key, None);
        assert_eq!(settings.base_url, DEFAULT_TMDB_BASE);
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let settings = Settings::from_lookup(lookup(&[
            ("TMDB_API_KEY", "abc123"),
            ("TMDB_BASE_URL", "http://localhost:8080/3/"),
        ]));
        assert_eq!(settings.api_key.as_deref(), Some("abc123"));
        assert_eq!(settings.base_url, "http://localhost:8080/3");
    }
}

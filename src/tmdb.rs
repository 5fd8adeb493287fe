use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::Settings;

#[derive(Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for TmdbClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TmdbClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn search_movie(&self, query: &str) -> Result<Vec<MovieSummary>>;
    async fn movie_details(&self, id: i32) -> Result<MovieDetails>;
    async fn discover(&self, query: &DiscoverQuery) -> Result<Vec<MovieSummary>>;
    async fn recommendations(&self, id: i32) -> Result<Vec<MovieSummary>>;
}

#[derive(Debug, Error)]
pub enum TmdbError {
    #[error("TMDB rejected the API key ({status}): {message}")]
    Unauthorized { status: StatusCode, message: String },
    #[error("TMDB request {path} failed ({status}): {message}")]
    Status {
        path: String,
        status: StatusCode,
        message: String,
    },
}

impl TmdbError {
    fn from_response(path: &str, status: StatusCode, body: &str) -> Self {
        let message = status_message(body);
        if status == StatusCode::UNAUTHORIZED {
            TmdbError::Unauthorized { status, message }
        } else {
            TmdbError::Status {
                path: path.to_string(),
                status,
                message,
            }
        }
    }
}

/// True when any error in the chain is TMDB refusing the API key.
pub fn is_auth_error(err: &anyhow::Error) -> bool {
    err.chain().any(|e| {
        matches!(
            e.downcast_ref::<TmdbError>(),
            Some(TmdbError::Unauthorized { .. })
        )
    })
}

fn status_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        status_message: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.status_message)
        .unwrap_or_else(|| body.trim().to_string())
}

/// An entry of any TMDB movie list (search, discover, recommendations).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MovieSummary {
    pub id: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: f32,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub overview: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
}

impl MovieSummary {
    pub fn year(&self) -> Option<&str> {
        self.release_date.as_deref().and_then(extract_year)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovieDetails {
    pub id: i32,
    pub title: String,
    #[serde(default)]
    pub vote_average: f32,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub credits: Credits,
    #[serde(default)]
    pub keywords: Keywords,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CastMember {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrewMember {
    pub id: i32,
    pub name: String,
    pub job: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Keywords {
    #[serde(default)]
    pub keywords: Vec<Keyword>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Keyword {
    pub id: i32,
    pub name: String,
}

impl MovieDetails {
    pub fn genre_ids(&self) -> Vec<i32> {
        self.genres.iter().map(|g| g.id).collect()
    }

    pub fn director(&self) -> Option<&CrewMember> {
        self.credits
            .crew
            .iter()
            .find(|c| matches!(c.job.as_deref(), Some("Director")))
    }

    pub fn top_cast_ids(&self, max: usize) -> Vec<i32> {
        self.credits.cast.iter().take(max).map(|c| c.id).collect()
    }

    pub fn keyword_ids(&self, max: usize) -> Vec<i32> {
        self.keywords.keywords.iter().take(max).map(|k| k.id).collect()
    }
}

/// Filters for `/discover/movie`. Id lists are comma-joined, which TMDB reads
/// as "all of".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoverQuery {
    pub with_genres: Vec<i32>,
    pub with_crew: Vec<i32>,
    pub with_cast: Vec<i32>,
    pub with_keywords: Vec<i32>,
    pub vote_range: Option<(f32, f32)>,
}

impl DiscoverQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("sort_by", "popularity.desc".to_string()),
            ("language", "en-US".to_string()),
        ];
        let lists = [
            ("with_genres", &self.with_genres),
            ("with_crew", &self.with_crew),
            ("with_cast", &self.with_cast),
            ("with_keywords", &self.with_keywords),
        ];
        for (name, ids) in lists {
            if !ids.is_empty() {
                params.push((name, join_ids(ids)));
            }
        }
        if let Some((low, high)) = self.vote_range {
            params.push(("vote_average.gte", low.to_string()));
            params.push(("vote_average.lte", high.to_string()));
        }
        params
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    results: Vec<MovieSummary>,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let user_agent = format!("cinerec/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    pub fn from_env() -> Result<Self> {
        let settings = Settings::from_env();
        let api_key = settings.api_key.context("TMDB_API_KEY not set")?;
        Self::new(api_key, settings.base_url)
    }

    async fn get_list(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<MovieSummary>> {
        let data: ListResponse = self.get_json(path, params).await?;
        Ok(data.results)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        debug!("GET {} {:?}", path, params);
        // reqwest errors carry the URL, and the URL carries the key.
        let res = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await
            .map_err(|e| e.without_url())
            .with_context(|| format!("request {path} failed"))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| e.without_url())
            .context("reading body failed")?;
        if !status.is_success() {
            return Err(TmdbError::from_response(path, status, &text).into());
        }
        let parsed: T = serde_json::from_str(&text)
            .with_context(|| format!("JSON parse failed for {path}"))?;
        Ok(parsed)
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn search_movie(&self, query: &str) -> Result<Vec<MovieSummary>> {
        let params = [
            ("query", query.to_string()),
            ("language", "en-US".to_string()),
        ];
        self.get_list("/search/movie", &params).await
    }

    async fn movie_details(&self, id: i32) -> Result<MovieDetails> {
        let params = [
            ("append_to_response", "credits,keywords".to_string()),
            ("language", "en-US".to_string()),
        ];
        self.get_json(&format!("/movie/{id}"), &params).await
    }

    async fn discover(&self, query: &DiscoverQuery) -> Result<Vec<MovieSummary>> {
        self.get_list("/discover/movie", &query.params()).await
    }

    async fn recommendations(&self, id: i32) -> Result<Vec<MovieSummary>> {
        let params = [("language", "en-US".to_string())];
        self.get_list(&format!("/movie/{id}/recommendations"), &params)
            .await
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

fn join_ids(ids: &[i32]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn extract_year(date: &str) -> Option<&str> {
    date.split('-').next().filter(|y| !y.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_entries_tolerate_sparse_fields() {
        let value = json!({
            "page": 1,
            "results": [
                {
                    "id": 27205,
                    "title": "Inception",
                    "release_date": "2010-07-15",
                    "vote_average": 8.4,
                    "overview": "Cobb steals secrets.",
                    "genre_ids": [28, 878],
                    "popularity": 95.1
                },
                { "id": 1, "title": "Untitled", "release_date": "", "overview": "" }
            ]
        });
        let data: ListResponse = serde_json::from_value(value).expect("list deserialize");
        assert_eq!(data.results.len(), 2);
        assert_eq!(data.results[0].year(), Some("2010"));
        assert_eq!(data.results[0].genre_ids, vec![28, 878]);
        assert_eq!(data.results[1].release_date, None);
        assert_eq!(data.results[1].overview, None);
        assert_eq!(data.results[1].year(), None);
        assert_eq!(data.results[1].vote_average, 0.0);
    }

    #[test]
    fn details_expose_director_cast_and_keywords() {
        let value = json!({
            "id": 27205,
            "title": "Inception",
            "vote_average": 8.4,
            "genres": [{ "id": 28, "name": "Action" }, { "id": 878, "name": "Science Fiction" }],
            "credits": {
                "cast": [
                    { "id": 6193, "name": "Leonardo DiCaprio" },
                    { "id": 24045, "name": "Joseph Gordon-Levitt" },
                    { "id": 27578, "name": "Elliot Page" },
                    { "id": 2524, "name": "Tom Hardy" }
                ],
                "crew": [
                    { "id": 947, "name": "Hans Zimmer", "job": "Original Music Composer" },
                    { "id": 525, "name": "Christopher Nolan", "job": "Director" }
                ]
            },
            "keywords": { "keywords": [{ "id": 1014, "name": "loss of loved one" }] }
        });
        let details: MovieDetails =
            serde_json::from_value(value).expect("details deserialize");
        assert_eq!(details.genre_ids(), vec![28, 878]);
        assert_eq!(details.director().map(|d| d.id), Some(525));
        assert_eq!(details.top_cast_ids(3), vec![6193, 24045, 27578]);
        assert_eq!(details.keyword_ids(5), vec![1014]);
    }

    #[test]
    fn details_without_appended_sections_still_parse() {
        let details: MovieDetails =
            serde_json::from_value(json!({ "id": 5, "title": "Bare" })).expect("details");
        assert!(details.director().is_none());
        assert!(details.top_cast_ids(3).is_empty());
        assert!(details.keyword_ids(5).is_empty());
    }

    #[test]
    fn discover_params_skip_empty_filters() {
        let query = DiscoverQuery {
            with_genres: vec![28, 878],
            vote_range: Some((7.4, 9.4)),
            ..Default::default()
        };
        let params = query.params();
        assert!(params.contains(&("sort_by", "popularity.desc".to_string())));
        assert!(params.contains(&("with_genres", "28,878".to_string())));
        assert!(params.contains(&("vote_average.gte", "7.4".to_string())));
        assert!(params.contains(&("vote_average.lte", "9.4".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "with_cast" || *k == "with_crew"));
    }

    #[test]
    fn unauthorized_status_maps_to_auth_error() {
        let body = concat!(
            r#"{"status_code":7,"#,
            r#""status_message":"Invalid API key: You must be granted a valid key.","#,
            r#""success":false}"#
        );
        let err: anyhow::Error =
            TmdbError::from_response("/search/movie", StatusCode::UNAUTHORIZED, body).into();
        assert!(is_auth_error(&err));
        assert!(err.to_string().contains("Invalid API key"));

        let err: anyhow::Error =
            TmdbError::from_response("/movie/1", StatusCode::NOT_FOUND, "gone").into();
        assert!(!is_auth_error(&err));
        assert!(err.to_string().contains("/movie/1"));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn auth_error_is_found_behind_context() {
        let err = anyhow::Error::from(TmdbError::Unauthorized {
            status: StatusCode::UNAUTHORIZED,
            message: "nope".to_string(),
        })
        .context("searching for 'Inception'");
        assert!(is_auth_error(&err));
    }

    #[test]
    fn debug_output_hides_api_key() {
        let client = TmdbClient::new("sekret-key-123", "http://localhost:9").expect("client");
        let printed = format!("{client:?}");
        assert!(!printed.contains("sekret-key-123"));
        assert!(printed.contains("<redacted>"));
        assert!(printed.contains("http://localhost:9"));
    }
}

use anyhow::Result;
use chrono::NaiveDate;
use std::cmp::Ordering;
use tracing::debug;

use crate::tmdb::{DiscoverQuery, MovieDetails, MovieSummary, TmdbApi};

pub const DEFAULT_LIMIT: usize = 10;
pub const SHOW_ALL_LIMIT: usize = 5;
const TOP_CAST: usize = 3;
const TOP_KEYWORDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    Genre,
    Director,
    Cast,
    Keywords,
    Rating,
    Similar,
}

/// Local ordering applied after the upstream list comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Upstream,
    NewestFirst,
    ScoreDesc,
}

#[derive(Debug, Clone, Copy)]
pub struct CriterionEntry {
    pub criterion: Criterion,
    pub menu_label: &'static str,
    pub label: &'static str,
    pub order: SortOrder,
}

/// Menu options 1..=6, in menu order.
pub static CRITERIA: [CriterionEntry; 6] = [
    CriterionEntry {
        criterion: Criterion::Genre,
        menu_label: "By Genre",
        label: "Genre",
        order: SortOrder::Upstream,
    },
    CriterionEntry {
        criterion: Criterion::Director,
        menu_label: "By Director",
        label: "Director",
        order: SortOrder::NewestFirst,
    },
    CriterionEntry {
        criterion: Criterion::Cast,
        menu_label: "By Cast",
        label: "Cast",
        order: SortOrder::Upstream,
    },
    CriterionEntry {
        criterion: Criterion::Keywords,
        menu_label: "By Plot Keywords",
        label: "Plot Keywords",
        order: SortOrder::Upstream,
    },
    CriterionEntry {
        criterion: Criterion::Rating,
        menu_label: "By Rating",
        label: "Rating",
        order: SortOrder::ScoreDesc,
    },
    CriterionEntry {
        criterion: Criterion::Similar,
        menu_label: "TMDB Recommendations (Combined)",
        label: "TMDB Algorithm",
        order: SortOrder::Upstream,
    },
];

impl Criterion {
    /// Maps a 1-based menu number to its criterion.
    pub fn from_menu(option: usize) -> Option<Self> {
        let index = option.checked_sub(1)?;
        CRITERIA.get(index).map(|e| e.criterion)
    }

    pub fn entry(self) -> &'static CriterionEntry {
        let index = match self {
            Criterion::Genre => 0,
            Criterion::Director => 1,
            Criterion::Cast => 2,
            Criterion::Keywords => 3,
            Criterion::Rating => 4,
            Criterion::Similar => 5,
        };
        &CRITERIA[index]
    }

    fn needs_details(self) -> bool {
        !matches!(self, Criterion::Similar)
    }
}

/// One block of the "show all" output.
#[derive(Debug)]
pub struct Section {
    pub entry: &'static CriterionEntry,
    pub result: Result<Vec<MovieSummary>>,
}

pub async fn recommend(
    api: &dyn TmdbApi,
    movie_id: i32,
    criterion: Criterion,
    limit: usize,
) -> Result<Vec<MovieSummary>> {
    let details = if criterion.needs_details() {
        Some(api.movie_details(movie_id).await?)
    } else {
        None
    };
    recommend_with(api, movie_id, details.as_ref(), criterion, limit).await
}

/// Runs every criterion in table order. The movie details are fetched once up
/// front; after that each criterion succeeds or fails on its own.
pub async fn recommend_all(
    api: &dyn TmdbApi,
    movie_id: i32,
    limit: usize,
) -> Result<Vec<Section>> {
    let details = api.movie_details(movie_id).await?;
    let mut sections = Vec::with_capacity(CRITERIA.len());
    for entry in CRITERIA.iter() {
        let result = recommend_with(api, movie_id, Some(&details), entry.criterion, limit).await;
        sections.push(Section { entry, result });
    }
    Ok(sections)
}

async fn recommend_with(
    api: &dyn TmdbApi,
    movie_id: i32,
    details: Option<&MovieDetails>,
    criterion: Criterion,
    limit: usize,
) -> Result<Vec<MovieSummary>> {
    let movies = match criterion {
        Criterion::Similar => api.recommendations(movie_id).await?,
        _ => match details.and_then(|d| discover_query(criterion, d)) {
            Some(query) => api.discover(&query).await?,
            None => {
                debug!("No {:?} data for movie {}", criterion, movie_id);
                return Ok(Vec::new());
            }
        },
    };
    Ok(refine(movies, movie_id, criterion.entry().order, limit))
}

/// Builds the discover filter for a criterion, or `None` when the movie lacks
/// the data the criterion keys on.
pub fn discover_query(criterion: Criterion, details: &MovieDetails) -> Option<DiscoverQuery> {
    match criterion {
        Criterion::Genre => {
            let genres = details.genre_ids();
            (!genres.is_empty()).then(|| DiscoverQuery {
                with_genres: genres,
                ..Default::default()
            })
        }
        Criterion::Director => details.director().map(|d| DiscoverQuery {
            with_crew: vec![d.id],
            ..Default::default()
        }),
        Criterion::Cast => {
            let cast = details.top_cast_ids(TOP_CAST);
            (!cast.is_empty()).then(|| DiscoverQuery {
                with_cast: cast,
                ..Default::default()
            })
        }
        Criterion::Keywords => {
            let keywords = details.keyword_ids(TOP_KEYWORDS);
            (!keywords.is_empty()).then(|| DiscoverQuery {
                with_keywords: keywords,
                ..Default::default()
            })
        }
        Criterion::Rating => Some(DiscoverQuery {
            with_genres: details.genre_ids(),
            vote_range: Some(vote_window(details.vote_average)),
            ..Default::default()
        }),
        Criterion::Similar => None,
    }
}

/// Drops the source movie, applies the local order, then truncates.
pub fn refine(
    movies: Vec<MovieSummary>,
    exclude_id: i32,
    order: SortOrder,
    limit: usize,
) -> Vec<MovieSummary> {
    let mut movies: Vec<MovieSummary> = movies
        .into_iter()
        .filter(|m| m.id != exclude_id)
        .collect();
    match order {
        SortOrder::Upstream => {}
        SortOrder::ScoreDesc => movies.sort_by(|a, b| b.vote_average.total_cmp(&a.vote_average)),
        SortOrder::NewestFirst => movies.sort_by(newest_first),
    }
    movies.truncate(limit);
    movies
}

fn vote_window(score: f32) -> (f32, f32) {
    let low = (score - 1.0).max(0.0);
    let high = (score + 1.0).min(10.0);
    (round_tenth(low), round_tenth(high))
}

fn round_tenth(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

fn release_date(movie: &MovieSummary) -> Option<NaiveDate> {
    movie
        .release_date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

// Undated entries go last.
fn newest_first(a: &MovieSummary, b: &MovieSummary) -> Ordering {
    match (release_date(a), release_date(b)) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

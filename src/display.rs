use crate::criteria::CRITERIA;
use crate::tmdb::MovieSummary;

const WIDTH: usize = 80;

pub const KEY_HELP_URL: &str = "https://www.themoviedb.org/settings/api";

pub fn banner() -> String {
    format!(
        "\n{rule}\n{title}\n{rule}\n",
        rule = "=".repeat(WIDTH),
        title = centered("MOVIE RECOMMENDATION SYSTEM")
    )
}

pub fn movie_info(movie: &MovieSummary) -> String {
    let rule = "=".repeat(WIDTH);
    format!(
        "\n{rule}\nTitle: {} ({})\nRating: {}\nOverview: {}\n{rule}",
        title(movie),
        movie.year().unwrap_or("Unknown"),
        score(movie.vote_average),
        movie.overview.as_deref().unwrap_or("No overview available.")
    )
}

pub fn menu(active: Option<&MovieSummary>) -> String {
    let rule = "-".repeat(WIDTH);
    let mut lines = vec![String::new(), rule.clone()];
    if let Some(movie) = active {
        lines.push(format!(
            "Current movie: {} ({})",
            title(movie),
            movie.year().unwrap_or("Unknown")
        ));
    }
    lines.push("How would you like to find similar movies?".to_string());
    lines.push(rule.clone());
    for (i, entry) in CRITERIA.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, entry.menu_label));
    }
    let next = CRITERIA.len() + 1;
    lines.push(format!("{}. Show All (All criteria)", next));
    lines.push(format!("{}. Search for a different movie", next + 1));
    lines.push(format!("{}. Exit", next + 2));
    lines.push(rule);
    lines.join("\n")
}

pub fn all_header() -> String {
    let rule = "#".repeat(WIDTH);
    format!("\n{rule}\n{}\n{rule}", centered("ALL RECOMMENDATIONS"))
}

/// Renders one result block; an empty list becomes a single "none found" line.
pub fn recommendations(movies: &[MovieSummary], label: &str) -> String {
    if movies.is_empty() {
        return format!("\nNo recommendations found based on {label}.");
    }
    let rule = "#".repeat(WIDTH);
    let mut out = format!(
        "\n\n{rule}\nRECOMMENDATIONS BASED ON {}\n{rule}\n",
        label.to_uppercase()
    );
    for (i, movie) in movies.iter().enumerate() {
        out.push_str(&format!(
            "\n{}. {} ({}) - Rating: {}",
            i + 1,
            title(movie),
            movie.year().unwrap_or("Unknown"),
            score(movie.vote_average)
        ));
    }
    out
}

pub fn section_error(label: &str, err: &anyhow::Error) -> String {
    format!("\nCould not load recommendations based on {label}. Error: {err:#}")
}

fn title(movie: &MovieSummary) -> &str {
    if movie.title.is_empty() {
        "Unknown"
    } else {
        &movie.title
    }
}

fn score(vote_average: f32) -> String {
    format!("{vote_average:.1}/10")
}

fn centered(text: &str) -> String {
    format!("{text:^WIDTH$}").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(title: &str, date: Option<&str>, score: f32) -> MovieSummary {
        MovieSummary {
            id: 1,
            title: title.to_string(),
            release_date: date.map(|d| d.to_string()),
            vote_average: score,
            overview: None,
            genre_ids: Vec::new(),
        }
    }

    #[test]
    fn menu_lists_nine_numbered_options() {
        let menu = menu(None);
        assert!(!menu.contains("Current movie"));
        assert!(menu.contains("1. By Genre"));
        assert!(menu.contains("6. TMDB Recommendations (Combined)"));
        assert!(menu.contains("7. Show All (All criteria)"));
        assert!(menu.contains("8. Search for a different movie"));
        assert!(menu.contains("9. Exit"));
    }

    #[test]
    fn menu_names_the_active_movie() {
        let menu = menu(Some(&movie("Inception", Some("2010-07-15"), 8.4)));
        let current = menu.find("Current movie: Inception (2010)").expect("active line");
        let question = menu.find("How would you like").expect("question line");
        assert!(current < question);
    }

    #[test]
    fn recommendations_are_numbered_with_year_and_score() {
        let out = recommendations(
            &[movie("Interstellar", Some("2014-11-05"), 8.4), movie("", None, 0.0)],
            "Director",
        );
        assert!(out.contains("RECOMMENDATIONS BASED ON DIRECTOR"));
        assert!(out.contains("1. Interstellar (2014) - Rating: 8.4/10"));
        assert!(out.contains("2. Unknown (Unknown) - Rating: 0.0/10"));
    }

    #[test]
    fn empty_recommendations_say_so() {
        assert_eq!(
            recommendations(&[], "Plot Keywords"),
            "\nNo recommendations found based on Plot Keywords."
        );
    }

    #[test]
    fn movie_info_falls_back_for_missing_fields() {
        let info = movie_info(&movie("Inception", Some("2010-07-15"), 8.37));
        assert!(info.contains("Title: Inception (2010)"));
        assert!(info.contains("Rating: 8.4/10"));
        assert!(info.contains("Overview: No overview available."));
    }

    #[test]
    fn banner_centers_title() {
        let banner = banner();
        let line = banner.lines().nth(2).expect("title line");
        assert_eq!(line.trim(), "MOVIE RECOMMENDATION SYSTEM");
        assert!(line.starts_with("          "));
    }
}

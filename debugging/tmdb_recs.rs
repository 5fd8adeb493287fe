//! Print the filtered recommendation lists for a TMDB movie id, without the
//! interactive menu.
//! Usage:
//!   cargo run --bin tmdb_recs -- <tmdb_id>              (every criterion)
//!   cargo run --bin tmdb_recs -- <tmdb_id> <criterion>  (criterion 1-6)
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{Context, Result};
use cinerec::criteria::{self, Criterion, DEFAULT_LIMIT, SHOW_ALL_LIMIT};
use cinerec::display;
use cinerec::tmdb::TmdbClient;
use dotenvy::dotenv;
use std::env;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: cargo run --bin tmdb_recs -- <tmdb_id> [criterion 1-6]");
        std::process::exit(1);
    }

    let tmdb_id: i32 = args[1].parse().context("tmdb_id must be an integer")?;
    let criterion = match args.get(2) {
        Some(raw) => {
            let option: usize = raw.parse().context("criterion must be an integer")?;
            Some(
                Criterion::from_menu(option)
                    .ok_or_else(|| anyhow::anyhow!("criterion must be between 1 and 6"))?,
            )
        }
        None => None,
    };

    let client = TmdbClient::from_env()?;

    match criterion {
        Some(criterion) => {
            let movies = criteria::recommend(&client, tmdb_id, criterion, DEFAULT_LIMIT).await?;
            println!("{}", display::recommendations(&movies, criterion.entry().label));
        }
        None => {
            println!("{}", display::all_header());
            for section in criteria::recommend_all(&client, tmdb_id, SHOW_ALL_LIMIT).await? {
                match &section.result {
                    Ok(movies) => println!(
                        "{}",
                        display::recommendations(movies, section.entry.label)
                    ),
                    Err(e) => println!("{}", display::section_error(section.entry.label, e)),
                }
            }
        }
    }

    Ok(())
}

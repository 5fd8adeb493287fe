use anyhow::{anyhow, Context, Result};
use std::io::{BufRead, Write};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::criteria::{self, Criterion, Section, DEFAULT_LIMIT, SHOW_ALL_LIMIT};
use crate::display;
use crate::tmdb::{self, MovieSummary, TmdbApi};

/// Builds an API client for a freshly entered key.
pub type Connector = Box<dyn Fn(String) -> Result<Arc<dyn TmdbApi>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    AwaitingKey,
    AwaitingTitle,
    ShowingMenu,
    Exiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Criterion(Criterion),
    ShowAll,
    NewSearch,
    Exit,
}

impl FromStr for MenuChoice {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let input = s.trim().to_lowercase();
        match input.as_str() {
            "7" => Ok(MenuChoice::ShowAll),
            "8" => Ok(MenuChoice::NewSearch),
            "9" | "q" | "quit" | "exit" => Ok(MenuChoice::Exit),
            other => other
                .parse::<usize>()
                .ok()
                .and_then(Criterion::from_menu)
                .map(MenuChoice::Criterion)
                .ok_or_else(|| anyhow!("unknown menu option '{}'", s.trim())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(MovieSummary),
    NotFound,
}

/// The context every menu handler works against: the API client (which holds
/// the key) and the movie picked by the last successful search.
pub struct Session {
    api: Arc<dyn TmdbApi>,
    active: Option<MovieSummary>,
}

impl Session {
    pub fn new(api: Arc<dyn TmdbApi>) -> Self {
        Self { api, active: None }
    }

    pub fn active(&self) -> Option<&MovieSummary> {
        self.active.as_ref()
    }

    pub fn active_id(&self) -> Option<i32> {
        self.active.as_ref().map(|m| m.id)
    }

    /// Searches for `title` and makes the first match active. A search with no
    /// matches, or one that fails, leaves the active movie untouched.
    pub async fn resolve(&mut self, title: &str) -> Result<Resolution> {
        let results = self
            .api
            .search_movie(title)
            .await
            .with_context(|| format!("searching for '{title}'"))?;
        info!("Search for '{}' returned {} result(s)", title, results.len());
        match results.into_iter().next() {
            Some(movie) => {
                self.active = Some(movie.clone());
                Ok(Resolution::Found(movie))
            }
            None => Ok(Resolution::NotFound),
        }
    }

    pub async fn recommend(&self, criterion: Criterion, limit: usize) -> Result<Vec<MovieSummary>> {
        let id = self.require_active()?;
        criteria::recommend(self.api.as_ref(), id, criterion, limit).await
    }

    pub async fn recommend_all(&self, limit: usize) -> Result<Vec<Section>> {
        let id = self.require_active()?;
        criteria::recommend_all(self.api.as_ref(), id, limit).await
    }

    fn require_active(&self) -> Result<i32> {
        self.active_id()
            .ok_or_else(|| anyhow!("no movie selected; search for a title first"))
    }
}

enum SearchOutcome {
    Found,
    NotFound,
    Failed { auth: bool },
}

/// The interactive loop. Answers are read from `input`; everything the user
/// sees goes to `output`.
pub struct Shell<R, W> {
    input: R,
    output: W,
    connector: Connector,
    default_key: Option<String>,
    session: Option<Session>,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    pub fn new(input: R, output: W, connector: Connector, default_key: Option<String>) -> Self {
        Self {
            input,
            output,
            connector,
            default_key,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub async fn run(&mut self) -> Result<()> {
        self.say(&display::banner())?;
        let mut state = MenuState::AwaitingKey;
        while state != MenuState::Exiting {
            state = self.step(state).await?;
            debug!("Session state -> {:?}", state);
        }
        Ok(())
    }

    async fn step(&mut self, state: MenuState) -> Result<MenuState> {
        match state {
            MenuState::AwaitingKey => self.await_key(),
            MenuState::AwaitingTitle => self.await_title().await,
            MenuState::ShowingMenu => self.show_menu().await,
            MenuState::Exiting => Ok(MenuState::Exiting),
        }
    }

    fn await_key(&mut self) -> Result<MenuState> {
        let Some(answer) =
            self.prompt("Enter your TMDB API key (or press Enter to use default): ")?
        else {
            return Ok(MenuState::Exiting);
        };
        let key = if answer.is_empty() {
            self.default_key.clone()
        } else {
            Some(answer)
        };
        let Some(key) = key else {
            self.say("\nPlease provide a TMDB API key to use this application.")?;
            self.say(&format!(
                "You can get a free API key at: {}",
                display::KEY_HELP_URL
            ))?;
            return Ok(MenuState::Exiting);
        };
        let api = (self.connector)(key)?;
        self.session = Some(Session::new(api));
        Ok(MenuState::AwaitingTitle)
    }

    async fn await_title(&mut self) -> Result<MenuState> {
        let Some(title) = self.prompt("\nEnter a movie title: ")? else {
            return Ok(MenuState::Exiting);
        };
        if title.is_empty() {
            self.say("No movie title provided.")?;
            return Ok(MenuState::AwaitingTitle);
        }
        let next = match self.search(&title).await? {
            SearchOutcome::Found => MenuState::ShowingMenu,
            SearchOutcome::Failed { auth: true } => MenuState::AwaitingKey,
            SearchOutcome::NotFound | SearchOutcome::Failed { auth: false } => {
                MenuState::AwaitingTitle
            }
        };
        Ok(next)
    }

    async fn show_menu(&mut self) -> Result<MenuState> {
        if self.session.is_none() {
            return Ok(MenuState::AwaitingKey);
        }
        let menu = display::menu(self.session.as_ref().and_then(Session::active));
        self.say(&menu)?;
        let Some(answer) = self.prompt("\nEnter your choice (1-9): ")? else {
            return Ok(MenuState::Exiting);
        };
        let choice = match answer.parse::<MenuChoice>() {
            Ok(choice) => choice,
            Err(e) => {
                debug!("{}", e);
                self.say("\nInvalid choice. Please enter a number between 1 and 9.")?;
                return Ok(MenuState::ShowingMenu);
            }
        };
        match choice {
            MenuChoice::Criterion(criterion) => self.show_criterion(criterion).await?,
            MenuChoice::ShowAll => self.show_all().await?,
            MenuChoice::NewSearch => return self.new_search().await,
            MenuChoice::Exit => {
                self.say("\nThank you for using Movie Recommendation System!")?;
                return Ok(MenuState::Exiting);
            }
        }
        Ok(MenuState::ShowingMenu)
    }

    async fn show_criterion(&mut self, criterion: Criterion) -> Result<()> {
        let result = match self.session.as_ref() {
            Some(session) => session.recommend(criterion, DEFAULT_LIMIT).await,
            None => Err(anyhow!("no API key entered")),
        };
        match result {
            Ok(movies) => self.say(&display::recommendations(&movies, criterion.entry().label)),
            Err(e) => self.report(&e),
        }
    }

    async fn show_all(&mut self) -> Result<()> {
        let result = match self.session.as_ref() {
            Some(session) => session.recommend_all(SHOW_ALL_LIMIT).await,
            None => Err(anyhow!("no API key entered")),
        };
        let sections = match result {
            Ok(sections) => sections,
            Err(e) => return self.report(&e),
        };
        self.say(&display::all_header())?;
        for section in sections {
            let label = section.entry.label;
            match &section.result {
                Ok(movies) => self.say(&display::recommendations(movies, label))?,
                Err(e) => {
                    warn!("{} recommendations failed: {:#}", label, e);
                    self.say(&display::section_error(label, e))?;
                }
            }
        }
        Ok(())
    }

    async fn new_search(&mut self) -> Result<MenuState> {
        let Some(title) = self.prompt("\nEnter a new movie title: ")? else {
            return Ok(MenuState::Exiting);
        };
        if title.is_empty() {
            self.say("No movie title provided.")?;
        } else {
            self.search(&title).await?;
        }
        Ok(MenuState::ShowingMenu)
    }

    async fn search(&mut self, title: &str) -> Result<SearchOutcome> {
        self.say(&format!("\nSearching for '{title}'..."))?;
        let result = match self.session.as_mut() {
            Some(session) => session.resolve(title).await,
            None => Err(anyhow!("no API key entered")),
        };
        match result {
            Ok(Resolution::Found(movie)) => {
                self.say(&display::movie_info(&movie))?;
                Ok(SearchOutcome::Found)
            }
            Ok(Resolution::NotFound) => {
                self.say(&format!("No results found for '{title}'."))?;
                Ok(SearchOutcome::NotFound)
            }
            Err(e) => {
                let auth = tmdb::is_auth_error(&e);
                self.report(&e)?;
                Ok(SearchOutcome::Failed { auth })
            }
        }
    }

    fn report(&mut self, err: &anyhow::Error) -> Result<()> {
        warn!("Action failed: {:#}", err);
        if tmdb::is_auth_error(err) {
            self.say(&format!("\nAuthentication error: {err:#}"))
        } else {
            self.say(&format!("\nError: {err:#}"))
        }
    }

    fn prompt(&mut self, message: &str) -> Result<Option<String>> {
        write!(self.output, "{message}").context("writing prompt failed")?;
        self.output.flush().context("flushing output failed")?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("reading input failed")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{text}").context("writing output failed")
    }
}

use crate::error::AppError;
use crate::models::{GameRecord, UserProfile};
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::{Client, Response};
use reqwest::header::ACCEPT;
use std::io::{BufRead, BufReader};

// --- Game source seam ---

/// Everything the pipeline needs from Lichess. Tests substitute a fixture.
pub trait GameSource {
    /// Starts streaming the most recent games of `username`, at most `limit` of them.
    fn fetch_games(
        &self,
        username: &str,
        limit: Option<u32>,
    ) -> Result<GameStream<Box<dyn BufRead>>, AppError>;

    /// Country flag from the public profile of `username`, if one is set.
    fn user_flag(&self, username: &str) -> Result<Option<String>, AppError>;

    /// Total number of games `username` has played.
    fn game_count(&self, username: &str) -> Result<Option<u64>, AppError>;
}

/// Lazy reader over an ndjson games export. Not restartable.
pub struct GameStream<R> {
    reader: R,
    remaining: Option<u32>,
    done: bool,
}

impl<R: BufRead> GameStream<R> {
    pub fn new(reader: R, limit: Option<u32>) -> Self {
        Self {
            reader,
            remaining: limit,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for GameStream<R> {
    type Item = Result<GameRecord, AppError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == Some(0) {
            return None;
        }
        let mut line = Vec::new();
        loop {
            line.clear();
            match self.reader.read_until(b'\n', &mut line) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
            // Lichess sends empty lines as keep-alives on slow exports.
            if !line.trim_ascii().is_empty() {
                break;
            }
        }

        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        let game = serde_json::from_slice(line.trim_ascii());
        if game.is_err() {
            self.done = true;
        }
        Some(game.map_err(AppError::from))
    }
}

// --- API Client ---

pub const DEFAULT_BASE_URL: &str = "https://lichess.org";
pub const BASE_URL_ENV_VAR: &str = "LICHESS_BASE_URL";
const NDJSON: &str = "application/x-ndjson";

pub struct LichessClient {
    client: Client,
    base_url: String,
    api_token: String,
}

impl LichessClient {
    pub fn new(api_token: String) -> Self {
        let base_url =
            std::env::var(BASE_URL_ENV_VAR).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::with_base_url(api_token, base_url)
    }

    pub fn with_base_url(api_token: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_token,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| AppError::Config(format!("invalid base URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Config(format!("invalid base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn games_url(&self, username: &str, limit: Option<u32>) -> Result<Url, AppError> {
        let mut url = self.endpoint(&["api", "games", "user", username])?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(max) = limit {
                query.append_pair("max", &max.to_string());
            }
            query.append_pair("moves", "false");
            query.append_pair("tags", "false");
        }
        Ok(url)
    }

    fn get(&self, url: Url, accept: &str) -> Result<Response, AppError> {
        tracing::debug!(%url, "GET");
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.api_token)
            .header(ACCEPT, accept)
            .send()?;

        if !response.status().is_success() {
            return Err(AppError::Network {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    /// Checks the token against the account endpoint.
    pub fn validate_credentials(&self) -> Result<(), AppError> {
        let url = self.endpoint(&["api", "account"])?;
        self.get(url, "application/json")?;
        Ok(())
    }

    fn user(&self, username: &str) -> Result<Option<UserProfile>, AppError> {
        let url = self.endpoint(&["api", "user", username])?;
        match self.get(url, "application/json") {
            Ok(response) => {
                let body = response.text()?;
                Ok(Some(serde_json::from_str(&body)?))
            }
            // Closed or unknown accounts.
            Err(AppError::Network { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl GameSource for LichessClient {
    fn fetch_games(
        &self,
        username: &str,
        limit: Option<u32>,
    ) -> Result<GameStream<Box<dyn BufRead>>, AppError> {
        let url = self.games_url(username, limit)?;
        let response = self.get(url, NDJSON)?;
        let reader: Box<dyn BufRead> = Box::new(BufReader::new(response));
        Ok(GameStream::new(reader, limit))
    }

    fn user_flag(&self, username: &str) -> Result<Option<String>, AppError> {
        Ok(self
            .user(username)?
            .and_then(|user| user.profile)
            .and_then(|profile| profile.flag))
    }

    fn game_count(&self, username: &str) -> Result<Option<u64>, AppError> {
        Ok(self
            .user(username)?
            .and_then(|user| user.count)
            .map(|count| count.all))
    }
}

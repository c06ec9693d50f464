use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Usage(#[from] clap::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(
        "API token not found. Set OAUTH_2_LICHESS_KEY (or add it to .env), or run `lcc --save-token`."
    )]
    MissingToken,

    #[error("Lichess returned HTTP {status} for {url}")]
    Network { status: u16, url: String },

    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to parse API response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Game {game_id} has no player named '{username}'")]
    Data { game_id: String, username: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

use crate::error::AppError;
use crate::models::{Flag, GameRecord, Player};

/// The player across the board from the queried user in one game.
#[derive(Debug, Clone, PartialEq)]
pub struct Opponent {
    pub name: Option<String>,
    pub flag: Flag,
    pub rating: Option<u32>,
}

impl From<&Player> for Opponent {
    fn from(player: &Player) -> Self {
        Self {
            name: player.name().map(str::to_string),
            flag: player.flag(),
            rating: player.rating,
        }
    }
}

/// Resolves the opponent of `username` in `game`.
///
/// If both sides match (a game against oneself) the user is taken to be white.
pub fn opponent(game: &GameRecord, username: &str) -> Result<Opponent, AppError> {
    let players = &game.players;
    let opponent = if players.white.is_user(username) {
        &players.black
    } else if players.black.is_user(username) {
        &players.white
    } else {
        return Err(AppError::Data {
            game_id: game.id.clone(),
            username: username.to_string(),
        });
    };
    Ok(Opponent::from(opponent))
}

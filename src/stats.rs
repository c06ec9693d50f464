use crate::extract::Opponent;
use crate::models::Flag;
use std::collections::HashMap;

pub type CountryCount = HashMap<Flag, usize>;

/// Running tallies over the opponents seen so far.
#[derive(Default, Debug, Clone)]
pub struct OpponentStats {
    pub countries: CountryCount,
    pub games: usize,
    rated_games: usize,
    rating_mean: f64,
}

impl OpponentStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, opponent: &Opponent) {
        self.add_flag(opponent.flag.clone());
        if let Some(rating) = opponent.rating {
            self.rated_games += 1;
            self.rating_mean += (f64::from(rating) - self.rating_mean) / self.rated_games as f64;
        }
    }

    fn add_flag(&mut self, flag: Flag) {
        *self.countries.entry(flag).or_insert(0) += 1;
        self.games += 1;
    }

    /// Mean rating of opponents that had one, `None` if none did.
    pub fn average_rating(&self) -> Option<f64> {
        (self.rated_games > 0).then_some(self.rating_mean)
    }

    /// Number of distinct countries, not counting the unknown bucket.
    pub fn country_count(&self) -> usize {
        self.countries.keys().filter(|flag| !flag.is_unknown()).count()
    }
}

impl Extend<Flag> for OpponentStats {
    fn extend<I: IntoIterator<Item = Flag>>(&mut self, iter: I) {
        for flag in iter {
            self.add_flag(flag);
        }
    }
}

impl FromIterator<Flag> for OpponentStats {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        let mut stats = Self::new();
        stats.extend(iter);
        stats
    }
}

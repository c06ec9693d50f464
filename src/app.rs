use crate::api_client::GameSource;
use crate::cli::Options;
use crate::error::AppError;
use crate::extract;
use crate::models::Flag;
use crate::stats::OpponentStats;
use std::collections::HashMap;
use std::io::Write;

/// Progress is reported every this many percent of the expected total.
const PROGRESS_STEP: u64 = 5;
/// Without a known total, report every this many games.
const PROGRESS_EVERY: u64 = 10;

/// Progress line on a terminal stream. Hidden progress writes nothing.
pub struct Progress<W> {
    sink: Option<W>,
    total: Option<u64>,
    next_percent: u64,
    dirty: bool,
}

impl<W: Write> Progress<W> {
    pub fn new(sink: W, total: Option<u64>) -> Self {
        Self {
            sink: Some(sink),
            total: total.filter(|t| *t > 0),
            next_percent: PROGRESS_STEP,
            dirty: false,
        }
    }

    pub fn hidden() -> Self {
        Self {
            sink: None,
            total: None,
            next_percent: PROGRESS_STEP,
            dirty: false,
        }
    }

    pub fn start(&mut self, username: &str) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let _ = match self.total {
            Some(total) => writeln!(sink, "Loading up to {total} games of {username}..."),
            None => writeln!(sink, "Loading games of {username}..."),
        };
    }

    pub fn update(&mut self, analysed: u64) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        match self.total {
            Some(total) => {
                let percent = (analysed * 100 / total).min(100);
                if percent < self.next_percent {
                    return;
                }
                while self.next_percent <= percent {
                    self.next_percent += PROGRESS_STEP;
                }
                let _ = write!(sink, "\r{percent}% complete ({analysed} games)");
            }
            None if analysed % PROGRESS_EVERY == 0 => {
                let _ = write!(sink, "\r{analysed} games analysed");
            }
            None => return,
        }
        let _ = sink.flush();
        self.dirty = true;
    }

    pub fn finish(&mut self) {
        if let Some(sink) = self.sink.as_mut()
            && self.dirty
        {
            let _ = writeln!(sink);
            self.dirty = false;
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> Option<W> {
        self.sink
    }
}

/// How many games the progress line should count towards.
pub fn progress_total<S: GameSource + ?Sized>(source: &S, options: &Options) -> Option<u64> {
    if let Some(limit) = options.limit() {
        return Some(u64::from(limit));
    }
    match source.game_count(&options.username) {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!("could not look up game count of {}: {e}", options.username);
            None
        }
    }
}

/// Fetches the games of `options.username` and tallies their opponents.
///
/// Nothing is returned on the first failure, so callers never see a partial tally.
pub fn analyze<S, W>(
    source: &S,
    options: &Options,
    progress: &mut Progress<W>,
) -> Result<OpponentStats, AppError>
where
    S: GameSource + ?Sized,
    W: Write,
{
    progress.start(&options.username);
    let games = source.fetch_games(&options.username, options.limit())?;

    let mut stats = OpponentStats::new();
    let mut profile_flags: HashMap<String, Flag> = HashMap::new();

    for game in games {
        let game = game?;
        let mut opponent = extract::opponent(&game, &options.username)?;

        if options.lookup_flags
            && opponent.flag.is_unknown()
            && let Some(name) = &opponent.name
        {
            opponent.flag = profile_flag(source, &mut profile_flags, name)?;
        }

        stats.record(&opponent);
        progress.update(stats.games as u64);
    }
    progress.finish();

    tracing::debug!(
        games = stats.games,
        profiles = profile_flags.len(),
        "finished analysing {}",
        options.username
    );
    Ok(stats)
}

fn profile_flag<S: GameSource + ?Sized>(
    source: &S,
    cache: &mut HashMap<String, Flag>,
    name: &str,
) -> Result<Flag, AppError> {
    let key = name.to_lowercase();
    if let Some(flag) = cache.get(&key) {
        return Ok(flag.clone());
    }
    tracing::debug!("looking up profile flag of {name}");
    let flag = Flag::from(source.user_flag(name)?);
    cache.insert(key, flag.clone());
    Ok(flag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::GameStream;
    use crate::reports::{self, ReportOptions};
    use std::cell::{Cell, RefCell};
    use std::io::{BufRead, Cursor};

    /// In-memory stand-in for Lichess.
    #[derive(Default)]
    struct Fixture {
        games: Vec<String>,
        profiles: HashMap<String, String>,
        total: Option<u64>,
        requested_limit: Cell<Option<Option<u32>>>,
        profile_lookups: RefCell<Vec<String>>,
    }

    impl Fixture {
        fn with_games(games: Vec<String>) -> Self {
            Self {
                games,
                ..Default::default()
            }
        }
    }

    impl GameSource for Fixture {
        fn fetch_games(
            &self,
            _username: &str,
            limit: Option<u32>,
        ) -> Result<GameStream<Box<dyn BufRead>>, AppError> {
            self.requested_limit.set(Some(limit));
            let body = self.games.join("\n").into_bytes();
            let reader: Box<dyn BufRead> = Box::new(Cursor::new(body));
            Ok(GameStream::new(reader, limit))
        }

        fn user_flag(&self, username: &str) -> Result<Option<String>, AppError> {
            self.profile_lookups.borrow_mut().push(username.to_string());
            Ok(self.profiles.get(username).cloned())
        }

        fn game_count(&self, _username: &str) -> Result<Option<u64>, AppError> {
            self.total.ok_or(AppError::Network {
                status: 429,
                url: "fixture".to_string(),
            })
            .map(Some)
        }
    }

    fn game(id: usize, white: &str, black: &str, black_flag: Option<&str>) -> String {
        let flag = black_flag
            .map(|f| format!(r#","flag":"{f}""#))
            .unwrap_or_default();
        format!(
            r#"{{"id":"g{id}","players":{{"white":{{"user":{{"name":"{white}","id":"{}"}},"rating":1500}},"black":{{"user":{{"name":"{black}","id":"{}"{flag}}},"rating":1700}}}}}}"#,
            white.to_lowercase(),
            black.to_lowercase()
        )
    }

    fn options(username: &str) -> Options {
        Options {
            username: username.to_string(),
            max_games: 50,
            analyze_all: false,
            top_n: None,
            hide_unknown: false,
            quiet: true,
            lookup_flags: false,
        }
    }

    fn run(fixture: &Fixture, opts: &Options) -> Result<OpponentStats, AppError> {
        analyze(fixture, opts, &mut Progress::<Vec<u8>>::hidden())
    }

    #[test]
    fn test_counts_match_games_processed() {
        let flags = [Some("DE"), Some("FR"), None, Some("DE"), Some("US"), None];
        let games = flags
            .iter()
            .enumerate()
            .map(|(i, f)| game(i, "Me", &format!("Opp{i}"), *f))
            .collect();
        let stats = run(&Fixture::with_games(games), &options("me")).unwrap();

        assert_eq!(stats.games, 6);
        assert_eq!(stats.countries.values().sum::<usize>(), 6);
        assert_eq!(stats.countries[&Flag::Unknown], 2);
        assert_eq!(stats.countries[&Flag::Code("DE".into())], 2);
    }

    #[test]
    fn test_max_games_caps_request_and_stream() {
        let games = (0..40).map(|i| game(i, "Me", "Opp", Some("IN"))).collect();
        let fixture = Fixture::with_games(games);
        let mut opts = options("me");
        opts.max_games = 25;

        let stats = run(&fixture, &opts).unwrap();
        assert_eq!(fixture.requested_limit.get(), Some(Some(25)));
        assert_eq!(stats.games, 25);
    }

    #[test]
    fn test_all_fetches_until_exhausted() {
        let games = (0..60).map(|i| game(i, "Opp", "Me", None)).collect();
        let fixture = Fixture::with_games(games);
        let mut opts = options("me");
        opts.analyze_all = true;

        let stats = run(&fixture, &opts).unwrap();
        assert_eq!(fixture.requested_limit.get(), Some(None));
        assert_eq!(stats.games, 60);
    }

    #[test]
    fn test_unmatched_username_fails_without_output() {
        let games = vec![
            game(1, "Me", "Opp", Some("DE")),
            game(2, "Someone", "Else", Some("FR")),
        ];
        let result = run(&Fixture::with_games(games), &options("me"));
        assert!(matches!(result, Err(AppError::Data { ref game_id, .. }) if game_id == "g2"));
    }

    #[test]
    fn test_malformed_game_is_parse_error() {
        let games = vec![game(1, "Me", "Opp", Some("DE")), "{\"id\":".to_string()];
        let result = run(&Fixture::with_games(games), &options("me"));
        assert!(matches!(result, Err(AppError::Parse(_))));
    }

    #[test]
    fn test_profile_lookup_is_cached_per_opponent() {
        let games = vec![
            game(1, "Me", "Bob", None),
            game(2, "Me", "bob", None),
            game(3, "Me", "Carol", Some("NO")),
            game(4, "Me", "Dave", None),
        ];
        let mut fixture = Fixture::with_games(games);
        fixture.profiles.insert("Bob".to_string(), "GB-SCT".to_string());
        let mut opts = options("me");
        opts.lookup_flags = true;

        let stats = run(&fixture, &opts).unwrap();
        assert_eq!(*fixture.profile_lookups.borrow(), vec!["Bob", "Dave"]);
        assert_eq!(stats.countries[&Flag::Code("GB-SCT".into())], 2);
        assert_eq!(stats.countries[&Flag::Code("NO".into())], 1);
        assert_eq!(stats.countries[&Flag::Unknown], 1);
    }

    #[test]
    fn test_pipeline_report() {
        let games = vec![
            game(1, "Me", "A", Some("FR")),
            game(2, "Me", "B", Some("DE")),
            game(3, "Me", "C", None),
            game(4, "Me", "D", Some("DE")),
            game(5, "Me", "E", Some("FR")),
            game(6, "Me", "F", Some("US")),
        ];
        let stats = run(&Fixture::with_games(games), &options("me")).unwrap();

        let mut out = Vec::new();
        let report = ReportOptions {
            top_n: Some(2),
            hide_unknown: true,
            quiet: true,
        };
        reports::render(&mut out, &stats, &report).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "DE: 2\nFR: 2\n");
    }

    #[test]
    fn test_progress_total() {
        let mut fixture = Fixture::default();
        let mut opts = options("me");
        assert_eq!(progress_total(&fixture, &opts), Some(50));

        opts.analyze_all = true;
        assert_eq!(progress_total(&fixture, &opts), None);

        fixture.total = Some(1234);
        assert_eq!(progress_total(&fixture, &opts), Some(1234));
    }

    #[test]
    fn test_progress_steps() {
        let mut progress = Progress::new(Vec::new(), Some(20));
        for analysed in 1..=20 {
            progress.update(analysed);
        }
        progress.finish();
        let text = String::from_utf8(progress.into_inner().unwrap()).unwrap();

        assert_eq!(text.matches('\r').count(), 20);
        assert!(text.contains("\r5% complete (1 games)"));
        assert!(text.ends_with("\r100% complete (20 games)\n"));
    }

    #[test]
    fn test_hidden_progress_writes_nothing() {
        let mut progress = Progress::<Vec<u8>>::hidden();
        progress.start("me");
        progress.update(10);
        progress.finish();
        assert!(progress.into_inner().is_none());
    }
}

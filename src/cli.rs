use crate::help::HELP_CONTENT;
use crate::reports::ReportOptions;
use clap::builder::NonEmptyStringValueParser;
use clap::{Arg, ArgAction, CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;

/// 'Lichess Country Counter' counts the number of games played against each country on Lichess.
#[derive(Parser, Debug)]
#[command(name = "lcc")]
#[command(version, disable_version_flag = true)]
#[command(after_long_help = HELP_CONTENT)]
pub struct Cli {
    /// The Lichess username whose games you'd like to analyse
    #[arg(
        value_parser = NonEmptyStringValueParser::new(),
        required_unless_present = "save_token"
    )]
    pub username: Option<String>,

    /// Maximum number of games to analyse
    #[arg(short = 'm', long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_games: u32,

    /// Analyse all games (overrides --max-games)
    #[arg(short = 'a', long)]
    pub all: bool,

    /// Output only the top N most frequent countries [default: all]
    #[arg(short = 'n', long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub number: Option<u32>,

    /// Leave opponents without a flag out of the table (short form: -hu)
    #[arg(long)]
    pub hide_unknown: bool,

    /// Print only the final table
    #[arg(short, long)]
    pub quiet: bool,

    /// Look up the profile flag of opponents whose games carry none
    #[arg(short, long)]
    pub lookup_flags: bool,

    /// Prompt for a Lichess API token and store it in the config file
    #[arg(long, exclusive = true)]
    pub save_token: bool,
}

/// Settings for one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub username: String,
    pub max_games: u32,
    pub analyze_all: bool,
    pub top_n: Option<usize>,
    pub hide_unknown: bool,
    pub quiet: bool,
    pub lookup_flags: bool,
}

impl Options {
    /// Number of games to request, `None` when every game should be fetched.
    pub fn limit(&self) -> Option<u32> {
        (!self.analyze_all).then_some(self.max_games)
    }

    pub fn report(&self) -> ReportOptions {
        ReportOptions {
            top_n: self.top_n,
            hide_unknown: self.hide_unknown,
            quiet: self.quiet,
        }
    }
}

pub enum Action {
    SaveToken,
    Analyze(Options),
}

impl Cli {
    /// Parses process-style arguments, accepting `-hu` as `--hide-unknown` and `-v` as `--version`.
    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut command = Self::command().arg(
            Arg::new("version")
                .short('v')
                .long("version")
                .help("Print version")
                .action(ArgAction::Version),
        );
        let matches = command.try_get_matches_from_mut(normalize_args(args))?;
        Self::from_arg_matches(&matches)
    }

    pub fn action(self) -> Action {
        match self.username {
            Some(username) if !self.save_token => Action::Analyze(Options {
                username,
                max_games: self.max_games,
                analyze_all: self.all,
                top_n: self.number.map(|n| usize::try_from(n).unwrap_or(usize::MAX)),
                hide_unknown: self.hide_unknown,
                quiet: self.quiet,
                lookup_flags: self.lookup_flags,
            }),
            _ => Action::SaveToken,
        }
    }
}

// clap only supports single-character short flags.
fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut seen_terminator = false;
    args.into_iter()
        .map(|arg| {
            let arg: OsString = arg.into();
            if arg == "--" {
                seen_terminator = true;
            }
            if !seen_terminator && arg == "-hu" {
                OsString::from("--hide-unknown")
            } else {
                arg
            }
        })
        .collect()
}

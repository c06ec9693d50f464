use crate::models::Flag;
use crate::stats::{CountryCount, OpponentStats};
use std::io::{self, Write};

#[derive(Default, Debug, Clone, Copy)]
pub struct ReportOptions {
    pub top_n: Option<usize>,
    pub hide_unknown: bool,
    pub quiet: bool,
}

/// Orders countries by count descending, then code ascending, after filtering and truncation.
pub fn rank(counts: &CountryCount, options: &ReportOptions) -> Vec<(Flag, usize)> {
    let mut rows: Vec<(Flag, usize)> = counts
        .iter()
        .filter(|(flag, _)| !(options.hide_unknown && flag.is_unknown()))
        .map(|(flag, count)| (flag.clone(), *count))
        .collect();

    rows.sort_by(|(flag_a, count_a), (flag_b, count_b)| {
        count_b
            .cmp(count_a)
            .then_with(|| flag_a.as_str().cmp(flag_b.as_str()))
    });

    if let Some(n) = options.top_n {
        rows.truncate(n);
    }
    rows
}

pub fn render(
    out: &mut impl Write,
    stats: &OpponentStats,
    options: &ReportOptions,
) -> io::Result<()> {
    let rows = rank(&stats.countries, options);

    if !options.quiet {
        writeln!(
            out,
            "Analysed {} games against {} countries",
            stats.games,
            stats.country_count()
        )?;
    }

    for (flag, count) in &rows {
        writeln!(out, "{flag}: {count}")?;
    }

    if !options.quiet
        && let Some(avg) = stats.average_rating()
    {
        writeln!(out, "Avg. opponent rating: {avg:.0}")?;
    }
    Ok(())
}

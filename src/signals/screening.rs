//! KDJ screening pass over full histories

use crate::indicators::latest_kdj_j;
use crate::models::candle::Candle;
use crate::models::screen::ScreenEntry;

pub const DEFAULT_KDJ_THRESHOLD: f64 = 30.0;

/// Rank securities whose latest KDJ J is at or below `threshold`.
///
/// The result is sorted by J ascending. Securities without candles are
/// skipped.
pub fn screen_securities<'a, I>(histories: I, threshold: f64) -> Vec<ScreenEntry>
where
    I: IntoIterator<Item = (&'a str, &'a [Candle])>,
{
    let mut entries: Vec<ScreenEntry> = histories
        .into_iter()
        .filter_map(|(identifier, candles)| {
            let kdj_j = latest_kdj_j(candles)?;
            (kdj_j <= threshold).then(|| ScreenEntry {
                identifier: identifier.to_string(),
                kdj_j,
            })
        })
        .collect();

    entries.sort_by(|a, b| a.kdj_j.total_cmp(&b.kdj_j));
    entries
}

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::{PipelineError, Result};

/// Inclusive calendar date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(PipelineError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Iterate every day in the window, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// How a calendar date maps onto a partitioned directory suffix.
///
/// Closed set; data layouts outside these three are not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirConvention {
    /// `YYYY-MM/DD`
    Day,
    /// `YYYY/MM-DD`
    MonthDay,
    /// `YYYY-MM-DD`, single level
    Full,
}

impl FromStr for DirConvention {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "day" => Ok(Self::Day),
            "month-day" => Ok(Self::MonthDay),
            "full" => Ok(Self::Full),
            other => Err(PipelineError::InvalidConvention(other.to_string())),
        }
    }
}

impl DirConvention {
    /// Full directory suffix for one day, e.g. `2023-01/05` under `Day`.
    pub fn format_day(&self, day: NaiveDate) -> String {
        match self {
            Self::Day => format!("{}/{}", day.format("%Y-%m"), day.format("%d")),
            Self::MonthDay => format!("{}/{}", day.format("%Y"), day.format("%m-%d")),
            Self::Full => day.format("%Y-%m-%d").to_string(),
        }
    }

    /// Leaf directory name for one day, the part below the partition level.
    fn format_leaf(&self, day: NaiveDate) -> Option<String> {
        match self {
            Self::Day => Some(day.format("%d").to_string()),
            Self::MonthDay => Some(day.format("%m-%d").to_string()),
            Self::Full => None,
        }
    }

    /// Higher-level partition token for one day: `YYYY-MM` under `Day`,
    /// `YYYY` under `MonthDay`. `Full` has no hierarchy.
    fn partition_token(&self, day: NaiveDate) -> Option<String> {
        match self {
            Self::Day => Some(day.format("%Y-%m").to_string()),
            Self::MonthDay => Some(day.format("%Y").to_string()),
            Self::Full => None,
        }
    }
}

/// Expand a date window into the set of top-level directories to scan.
///
/// One entry per day, `base + suffix`, deduplicated. `base` is used verbatim
/// as a prefix, so it normally ends with `/`.
pub fn expand_top_dirs(
    base: &str,
    window: &DateWindow,
    convention: DirConvention,
) -> BTreeSet<String> {
    window
        .days()
        .map(|day| format!("{}{}", base, convention.format_day(day)))
        .collect()
}

/// Build the set of directories to exclude from traversal.
///
/// Padding covers `[min_date, window.start - 1]` and `[window.end + 1,
/// max_date]`; unset bounds default to exactly one day of padding on each
/// side. A pad day is excluded under a top directory only when its partition
/// token is contained in the directory's trailing segment, so directories
/// belonging to a different month or year are never excluded by accident.
///
/// Entries have the exact form `top_dir/leaf` that traversal produces; the
/// locator matches them whole, never by prefix.
pub fn build_exclusions(
    min_date: Option<NaiveDate>,
    max_date: Option<NaiveDate>,
    window: &DateWindow,
    top_dirs: &BTreeSet<String>,
    convention: DirConvention,
) -> Result<BTreeSet<String>> {
    // `Full` has no leaf level, so there is nothing to exclude.
    if convention == DirConvention::Full {
        return Ok(BTreeSet::new());
    }

    let pad_start = window
        .start
        .pred_opt()
        .ok_or_else(|| PipelineError::Config("date window start has no predecessor".to_string()))?;
    let pad_end = window
        .end
        .succ_opt()
        .ok_or_else(|| PipelineError::Config("date window end has no successor".to_string()))?;
    let min = min_date.unwrap_or(pad_start);
    let max = max_date.unwrap_or(pad_end);

    let mut exclusions = BTreeSet::new();
    for top in top_dirs {
        extend_exclusions(&mut exclusions, top, min, pad_start, convention);
        extend_exclusions(&mut exclusions, top, pad_end, max, convention);
    }
    Ok(exclusions)
}

/// Add exclusion entries for every day in `[from, to]` that belongs to the
/// partition named by `top`'s trailing segment.
fn extend_exclusions(
    exclusions: &mut BTreeSet<String>,
    top: &str,
    from: NaiveDate,
    to: NaiveDate,
    convention: DirConvention,
) {
    let trailing = top
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(top);
    for day in from.iter_days().take_while(|d| *d <= to) {
        let Some(token) = convention.partition_token(day) else {
            return;
        };
        if trailing.contains(&token) {
            if let Some(leaf) = convention.format_leaf(day) {
                exclusions.insert(format!("{}/{}", top.trim_end_matches('/'), leaf));
            }
        }
    }
}

/// Flat variant for layouts without a directory hierarchy: one file name per
/// day, `prefix + formatted + suffix`, in day order.
pub fn date_stamped_filenames(
    prefix: &str,
    suffix: &str,
    window: &DateWindow,
    convention: DirConvention,
) -> Vec<String> {
    window
        .days()
        .map(|day| format!("{}{}{}", prefix, convention.format_day(day), suffix))
        .collect()
}

pub mod chart;

pub use chart::{ChartSlice, ChartThresholds, PALETTE};

use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::PollError;
use crate::models::{PollOption, PollType, Response};

/// Label for a response that carries neither a resolvable option nor a category.
pub const NO_ANSWER: &str = "No Answer";

/// One line of the tabular summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TallyRow {
    pub label: String,
    pub count: u64,
    /// Share of all responses, rounded to one decimal.
    pub percentage: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tally {
    pub poll_type: PollType,
    pub total: u64,
    /// Sorted by label so that colors stay stable across reloads.
    pub rows: Vec<TallyRow>,
    pub chart_eligible: bool,
}

/// Read-side projection of a poll's responses. Recomputed on every fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Summary {
    NoResponses { poll_type: PollType },
    Tallied(Tally),
}

impl Summary {
    pub fn empty(poll_type: PollType) -> Self {
        Summary::NoResponses { poll_type }
    }

    pub fn poll_type(&self) -> PollType {
        match self {
            Summary::NoResponses { poll_type } => *poll_type,
            Summary::Tallied(tally) => tally.poll_type,
        }
    }

    pub fn total(&self) -> u64 {
        match self {
            Summary::NoResponses { .. } => 0,
            Summary::Tallied(tally) => tally.total,
        }
    }

    pub fn tally(&self) -> Option<&Tally> {
        match self {
            Summary::NoResponses { .. } => None,
            Summary::Tallied(tally) => Some(tally),
        }
    }
}

impl Tally {
    pub fn counts(&self) -> BTreeMap<&str, u64> {
        self.rows.iter().map(|row| (row.label.as_str(), row.count)).collect()
    }

    pub fn row(&self, label: &str) -> Option<&TallyRow> {
        self.rows.iter().find(|row| row.label == label)
    }

    /// Pie series, or `None` when there are too many labels to chart.
    pub fn chart(&self) -> Option<Vec<ChartSlice>> {
        if !self.chart_eligible {
            return None;
        }
        Some(
            self.rows
                .iter()
                .map(|row| ChartSlice {
                    label: row.label.clone(),
                    value: row.count,
                    color: row.color,
                })
                .collect(),
        )
    }
}

/// Derives the label a response is counted under.
///
/// Option polls use the text of the selected option from `options`. When the
/// option is not in the snapshot the backend-resolved answer is used, then
/// `Option {id}`. Free-text polls use the response's category tag.
pub fn answer_label(poll_type: PollType, response: &Response, options: &[PollOption]) -> String {
    if poll_type.is_choice() {
        if let Some(option_id) = response.selected_option_id {
            return options
                .iter()
                .find(|option| option.id == option_id)
                .map(|option| option.text.clone())
                .or_else(|| response.answer.clone())
                .unwrap_or_else(|| format!("Option {}", option_id));
        }
    }

    response
        .answer
        .as_deref()
        .filter(|answer| !answer.is_empty())
        .unwrap_or(NO_ANSWER)
        .to_string()
}

pub fn summarize(
    poll_type: PollType,
    responses: &[Response],
    options: &[PollOption],
    thresholds: &ChartThresholds,
) -> Summary {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for response in responses {
        *counts.entry(answer_label(poll_type, response, options)).or_insert(0) += 1;
    }

    let total: u64 = counts.values().sum();
    if total == 0 {
        return Summary::empty(poll_type);
    }

    let rows: Vec<TallyRow> = counts
        .into_iter()
        .enumerate()
        .map(|(index, (label, count))| TallyRow {
            percentage: (count as f64 * 1000.0 / total as f64).round() / 10.0,
            color: chart::color_for(index),
            label,
            count,
        })
        .collect();

    let chart_eligible = thresholds.allows(poll_type, rows.len());
    if !chart_eligible {
        debug!(
            "Chart suppressed: {} distinct labels exceeds {} for {} poll",
            rows.len(),
            thresholds.max_labels(poll_type),
            poll_type
        );
    }

    Summary::Tallied(Tally {
        poll_type,
        total,
        rows,
        chart_eligible,
    })
}

/// Summarizes the outcome of a response fetch. A failed fetch yields the
/// empty summary and hands the error back for the caller to surface.
pub fn summarize_fetched(
    poll_type: PollType,
    fetched: Result<&[Response], &PollError>,
    options: &[PollOption],
    thresholds: &ChartThresholds,
) -> (Summary, Option<PollError>) {
    match fetched {
        Ok(responses) => (summarize(poll_type, responses, options, thresholds), None),
        Err(e) => {
            warn!("Treating responses as empty after fetch failure: {}", e);
            (Summary::empty(poll_type), Some(e.clone()))
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Summary::NoResponses { .. } => f.write_str("No responses yet."),
            Summary::Tallied(tally) => {
                for row in &tally.rows {
                    writeln!(f, "{}: {} ({:.1}%)", row.label, row.count, row.percentage)?;
                }
                write!(f, "\n{} responses.", tally.total)
            }
        }
    }
}

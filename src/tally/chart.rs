use serde::Serialize;

use crate::models::PollType;

/// Pie colors, handed out by label position and wrapping once exhausted.
pub const PALETTE: [&str; 8] = [
    "#007AFF",
    "rgb(30,30,30)",
    "rgb(228, 78, 78)",
    "rgb(209, 209, 209)",
    "rgb(97, 0, 0)",
    "rgb(0, 24, 97)",
    "rgb(36, 14, 198)",
    "rgb(124, 124, 124)",
];

pub fn color_for(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// Largest number of distinct labels a poll may show as a chart, per poll
/// type. Above this only the table is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartThresholds {
    limits: [usize; PollType::ALL.len()],
}

impl Default for ChartThresholds {
    fn default() -> Self {
        Self {
            limits: PollType::ALL.map(|t| t.type_spec().chart_max_labels),
        }
    }
}

impl ChartThresholds {
    pub fn with_limit(mut self, poll_type: PollType, max_labels: usize) -> Self {
        self.limits[poll_type.index()] = max_labels;
        self
    }

    pub fn max_labels(&self, poll_type: PollType) -> usize {
        self.limits[poll_type.index()]
    }

    pub fn allows(&self, poll_type: PollType, distinct_labels: usize) -> bool {
        distinct_labels <= self.max_labels(poll_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSlice {
    pub label: String,
    pub value: u64,
    pub color: &'static str,
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PollError;

/// How a voter answers a poll of a given type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseInput {
    /// Pick one of the poll's options by label.
    Choice,
    /// Type an open-ended answer.
    Text,
}

/// Static description of a poll type: everything call sites need to know
/// lives here instead of being re-derived from string comparisons.
#[derive(Debug)]
pub struct TypeSpec {
    pub key: &'static str,
    pub display_name: &'static str,
    pub vocabulary: &'static [&'static str],
    pub input: ResponseInput,
    pub chart_max_labels: usize,
}

static BINARY: TypeSpec = TypeSpec {
    key: "yes_no",
    display_name: "Yes / No",
    vocabulary: &["Yes", "No"],
    input: ResponseInput::Choice,
    chart_max_labels: 6,
};

static TERNARY: TypeSpec = TypeSpec {
    key: "yes_no_maybe",
    display_name: "Yes / No / Maybe",
    vocabulary: &["Yes", "No", "Maybe"],
    input: ResponseInput::Choice,
    chart_max_labels: 6,
};

static FREE_TEXT: TypeSpec = TypeSpec {
    key: "short_answer",
    display_name: "Short answer",
    vocabulary: &[],
    input: ResponseInput::Text,
    chart_max_labels: 10,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PollType {
    #[serde(rename = "yes_no")]
    Binary,
    #[serde(rename = "yes_no_maybe")]
    Ternary,
    #[serde(rename = "short_answer")]
    FreeText,
}

impl PollType {
    pub const ALL: [PollType; 3] = [PollType::Binary, PollType::Ternary, PollType::FreeText];

    /// Position of this type in [`PollType::ALL`].
    pub fn index(self) -> usize {
        match self {
            PollType::Binary => 0,
            PollType::Ternary => 1,
            PollType::FreeText => 2,
        }
    }

    pub fn type_spec(self) -> &'static TypeSpec {
        match self {
            PollType::Binary => &BINARY,
            PollType::Ternary => &TERNARY,
            PollType::FreeText => &FREE_TEXT,
        }
    }

    pub fn key(self) -> &'static str {
        self.type_spec().key
    }

    pub fn display_name(self) -> &'static str {
        self.type_spec().display_name
    }

    /// Option labels that must exist before the poll can take responses.
    pub fn vocabulary(self) -> &'static [&'static str] {
        self.type_spec().vocabulary
    }

    pub fn input(self) -> ResponseInput {
        self.type_spec().input
    }

    pub fn is_choice(self) -> bool {
        self.input() == ResponseInput::Choice
    }
}

impl fmt::Display for PollType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PollType {
    type Err = PollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        PollType::ALL
            .into_iter()
            .find(|t| t.key() == wanted)
            .ok_or_else(|| PollError::InvalidFormat(format!("Unknown poll type: {}", s)))
    }
}

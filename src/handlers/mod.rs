//! View contexts. The admin and voter views each hold their own copy of
//! what they fetched and only reconcile by fetching again; nothing is
//! shared between them.

mod admin;
mod voter;

pub use admin::AdminView;
pub use voter::{VoterView, VotingControls};

use std::fmt;

use crate::error::PollError;

/// A failure the user should see without the view giving up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub context: String,
    pub error: PollError,
}

impl Notice {
    pub fn new(context: impl Into<String>, error: PollError) -> Self {
        Self {
            context: context.into(),
            error,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.error)
    }
}

//! The single results slot of the admin view.
//!
//! Selecting a poll toggles: the open poll closes, any other poll replaces
//! it. Only one poll's summary ever occupies the slot.

use crate::error::PollError;
use crate::models::{PollId, PollOption};
use crate::presentation::ResponseWindow;
use crate::tally::Summary;

#[derive(Debug, Clone, PartialEq)]
pub struct PanelContent {
    pub poll_id: PollId,
    pub summary: Summary,
    pub responses: ResponseWindow,
    pub options: Vec<PollOption>,
    /// Fetch failure that forced an empty summary.
    pub notice: Option<PollError>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResultsPanel {
    #[default]
    Closed,
    /// Selected, waiting for responses to arrive.
    Loading(PollId),
    Open(PanelContent),
}

/// What the caller has to do after a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Closed,
    Load(PollId),
}

impl ResultsPanel {
    pub fn selected(&self) -> Option<PollId> {
        match self {
            ResultsPanel::Closed => None,
            ResultsPanel::Loading(poll_id) => Some(*poll_id),
            ResultsPanel::Open(content) => Some(content.poll_id),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ResultsPanel::Closed)
    }

    pub fn select(&mut self, poll_id: PollId) -> Selection {
        if self.selected() == Some(poll_id) {
            *self = ResultsPanel::Closed;
            Selection::Closed
        } else {
            *self = ResultsPanel::Loading(poll_id);
            Selection::Load(poll_id)
        }
    }

    /// Installs fetched results. Results for a poll that is no longer the
    /// pending selection are dropped.
    pub fn fill(&mut self, content: PanelContent) -> bool {
        if matches!(self, ResultsPanel::Loading(poll_id) if *poll_id == content.poll_id) {
            *self = ResultsPanel::Open(content);
            true
        } else {
            false
        }
    }

    /// Closes the panel if it refers to `poll_id`.
    pub fn clear_if(&mut self, poll_id: PollId) -> bool {
        if self.selected() == Some(poll_id) {
            *self = ResultsPanel::Closed;
            true
        } else {
            false
        }
    }

    pub fn content(&self) -> Option<&PanelContent> {
        match self {
            ResultsPanel::Open(content) => Some(content),
            _ => None,
        }
    }

    pub fn content_mut(&mut self) -> Option<&mut PanelContent> {
        match self {
            ResultsPanel::Open(content) => Some(content),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PollType;
    use crate::presentation::DEFAULT_PREVIEW;

    fn content(poll_id: PollId) -> PanelContent {
        PanelContent {
            poll_id,
            summary: Summary::empty(PollType::Binary),
            responses: ResponseWindow::new(Vec::new(), DEFAULT_PREVIEW),
            options: Vec::new(),
            notice: None,
        }
    }

    #[test]
    fn selecting_open_poll_closes_panel() {
        let mut panel = ResultsPanel::default();
        assert_eq!(panel.select(1), Selection::Load(1));
        assert!(panel.fill(content(1)));
        assert_eq!(panel.select(1), Selection::Closed);
        assert!(panel.is_closed());
        assert!(panel.content().is_none());
    }

    #[test]
    fn selecting_other_poll_replaces_open_one() {
        let mut panel = ResultsPanel::default();
        panel.select(1);
        panel.fill(content(1));

        assert_eq!(panel.select(2), Selection::Load(2));
        assert!(panel.fill(content(2)));
        assert_eq!(panel.content().map(|c| c.poll_id), Some(2));
    }

    #[test]
    fn reselecting_while_loading_closes() {
        let mut panel = ResultsPanel::default();
        panel.select(1);
        assert_eq!(panel.select(1), Selection::Closed);
        assert!(!panel.fill(content(1)));
        assert!(panel.is_closed());
    }

    #[test]
    fn late_results_for_replaced_selection_are_dropped() {
        let mut panel = ResultsPanel::default();
        panel.select(1);
        panel.select(2);
        assert!(!panel.fill(content(1)));
        assert_eq!(panel, ResultsPanel::Loading(2));
    }

    #[test]
    fn clear_if_only_touches_matching_poll() {
        let mut panel = ResultsPanel::default();
        panel.select(3);
        panel.fill(content(3));

        assert!(!panel.clear_if(4));
        assert_eq!(panel.selected(), Some(3));
        assert!(panel.clear_if(3));
        assert!(panel.is_closed());
    }
}

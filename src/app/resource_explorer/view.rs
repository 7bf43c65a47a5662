//! Per-page result view.
//!
//! Holds the last successful fetch for one resource page together with the
//! committed search term and the derived filtered view. Fetch failures are
//! applied with a fixed policy: a transient failure keeps what the page is
//! showing, an invalidated session clears it.

use super::state::{NetworkTopology, Tagged};
use super::tag_filter::{self, FilterState};
use crate::app::errors::{ConsoleError, ConsoleResult};

/// A fetched result the tag filter can derive a view from
pub trait Filterable: Clone {
    fn filtered(&self, term: &str) -> Self;
    fn is_empty(&self) -> bool;
}

impl<T: Tagged + Clone> Filterable for Vec<T> {
    fn filtered(&self, term: &str) -> Self {
        tag_filter::filter(self, term)
    }

    fn is_empty(&self) -> bool {
        <[T]>::is_empty(self)
    }
}

impl Filterable for NetworkTopology {
    fn filtered(&self, term: &str) -> Self {
        tag_filter::filter_topology(self, term)
    }

    fn is_empty(&self) -> bool {
        NetworkTopology::is_empty(self)
    }
}

/// What [`ResourceView::apply`] did with a result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewUpdate {
    Replaced,
    /// Transient failure, previous result still shown
    Kept(ConsoleError),
    /// Session gone, result dropped
    Cleared(ConsoleError),
}

#[derive(Debug, Clone)]
pub struct ResourceView<T: Filterable> {
    result: Option<T>,
    visible: Option<T>,
    filter: FilterState,
    last_error: Option<ConsoleError>,
}

impl<T: Filterable> Default for ResourceView<T> {
    fn default() -> Self {
        Self {
            result: None,
            visible: None,
            filter: FilterState::new(),
            last_error: None,
        }
    }
}

impl<T: Filterable> ResourceView<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, result: ConsoleResult<T>) -> ViewUpdate {
        match result {
            Ok(value) => {
                self.visible = Some(value.filtered(self.filter.search_term()));
                self.result = Some(value);
                self.last_error = None;
                ViewUpdate::Replaced
            }
            Err(
                e @ (ConsoleError::BackendUnreachable { .. } | ConsoleError::UnknownFetch { .. }),
            ) => {
                self.last_error = Some(e.clone());
                ViewUpdate::Kept(e)
            }
            Err(e) => {
                self.result = None;
                self.visible = None;
                self.last_error = Some(e.clone());
                ViewUpdate::Cleared(e)
            }
        }
    }

    /// Last successful result, unfiltered
    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    /// Result filtered by the committed term
    pub fn visible(&self) -> Option<&T> {
        self.visible.as_ref()
    }

    pub fn last_error(&self) -> Option<&ConsoleError> {
        self.last_error.as_ref()
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// Typing into the search box. The visible view does not change.
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.filter.set_draft(text);
    }

    /// End of input: re-derive the visible view from the full result
    pub fn commit_filter(&mut self) {
        if self.filter.commit() {
            self.refilter();
        }
    }

    pub fn clear_filter(&mut self) {
        self.filter.clear();
        self.refilter();
    }

    fn refilter(&mut self) {
        self.visible = self
            .result
            .as_ref()
            .map(|r| r.filtered(self.filter.search_term()));
    }
}

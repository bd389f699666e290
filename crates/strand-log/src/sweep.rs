//! Page-by-page traversal of a store read
//!
//! A [`Sweep`] drives the pull-based page protocol as an explicit state
//! machine:
//!
//! ```text
//! Fetching --page--> Draining --entries exhausted, next--> Fetching
//!                       |  \--entries exhausted, no next--> Done
//!                       \--visitor returned Stop--> Cancelled
//! ```
//!
//! The only suspension point is `Fetching`. Entries of a page are visited
//! back to back, so nothing else on the same task runs mid-page.

use futures::future::BoxFuture;
use strand_core::{Meta, NextPage, Page, StoreError};
use tracing::trace;

/// Visitor verdict for one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visit {
    #[default]
    Continue,
    Stop,
}

impl From<()> for Visit {
    fn from(_: ()) -> Self {
        Visit::Continue
    }
}

/// `false` stops the sweep; `true` continues
impl From<bool> for Visit {
    fn from(keep_going: bool) -> Self {
        if keep_going {
            Visit::Continue
        } else {
            Visit::Stop
        }
    }
}

/// How a finished sweep ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every page was visited
    Exhausted,
    /// The visitor stopped the sweep
    Cancelled,
}

/// Observable phase of a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Fetching,
    Draining,
    Done,
    Cancelled,
}

enum State<'a, E> {
    Fetching(BoxFuture<'a, Result<Page<E>, StoreError>>),
    Draining {
        entries: std::vec::IntoIter<(E, Meta)>,
        next: Option<NextPage<E>>,
    },
    Done,
    Cancelled,
}

/// Traversal over every page of one read
pub struct Sweep<'a, E> {
    state: State<'a, E>,
    visited: usize,
    pages: usize,
}

impl<'a, E: 'a> Sweep<'a, E> {
    /// Start from the request for the first page
    pub fn new(first: BoxFuture<'a, Result<Page<E>, StoreError>>) -> Self {
        Self {
            state: State::Fetching(first),
            visited: 0,
            pages: 0,
        }
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        match self.state {
            State::Fetching(_) => Phase::Fetching,
            State::Draining { .. } => Phase::Draining,
            State::Done => Phase::Done,
            State::Cancelled => Phase::Cancelled,
        }
    }

    /// Entries handed to the visitor so far
    pub fn visited(&self) -> usize {
        self.visited
    }

    /// Pages received so far
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Run until the data is exhausted or the visitor stops
    ///
    /// A store error aborts the sweep and is returned as is; the sweep is
    /// then left in `Done`.
    pub async fn run<F, R>(&mut self, mut visit: F) -> Result<Outcome, StoreError>
    where
        F: FnMut(&E, &Meta) -> R,
        R: Into<Visit>,
    {
        loop {
            if let Some(outcome) = self.run_page(&mut visit).await? {
                return Ok(outcome);
            }
        }
    }

    /// Visit the entries of one page
    ///
    /// Returns `None` at a page boundary, leaving the sweep in `Fetching`
    /// with the next page not yet read. Returns the outcome once the sweep
    /// has finished.
    pub async fn run_page<F, R>(&mut self, visit: &mut F) -> Result<Option<Outcome>, StoreError>
    where
        F: FnMut(&E, &Meta) -> R,
        R: Into<Visit>,
    {
        loop {
            self.state = match std::mem::replace(&mut self.state, State::Done) {
                State::Fetching(request) => {
                    let page = request.await?;
                    self.pages += 1;
                    trace!(page = self.pages, entries = page.entries.len(), "Received page");
                    State::Draining {
                        entries: page.entries.into_iter(),
                        next: page.next,
                    }
                }
                State::Draining { mut entries, next } => match entries.next() {
                    Some((event, meta)) => {
                        self.visited += 1;
                        match visit(&event, &meta).into() {
                            Visit::Continue => State::Draining { entries, next },
                            Visit::Stop => State::Cancelled,
                        }
                    }
                    None => match next {
                        Some(next) => {
                            self.state = State::Fetching(next.fetch());
                            return Ok(None);
                        }
                        None => State::Done,
                    },
                },
                State::Done => return Ok(Some(Outcome::Exhausted)),
                State::Cancelled => {
                    self.state = State::Cancelled;
                    return Ok(Some(Outcome::Cancelled));
                }
            };
        }
    }
}

//! Pull-based iterator protocol.
//!
//! [`StorageIterator`] is a cursor over items fetched lazily, one page at a
//! time, from a [`PageSource`]. Internally every advance produces a tagged
//! [`Step`]; the boundary method [`StorageIterator::next`] folds that into a
//! `Result` where exhaustion is reported as [`StorageError::IterateDone`].
//!
//! ```text
//!   Ready --(source drained)--> Exhausted   (next() -> IterateDone, forever)
//!     |
//!     +----(source error)-----> Failed      (next() -> InvalidState, forever)
//! ```
//!
//! # Usage
//!
//! ```
//! use anystore_core::iterator::StorageIterator;
//!
//! let mut it = StorageIterator::from_items(vec![1, 2]);
//! assert_eq!(it.next().unwrap(), 1);
//! assert_eq!(it.next().unwrap(), 2);
//! assert!(it.next().unwrap_err().is_iterate_done());
//! assert!(it.next().unwrap_err().is_iterate_done());
//! ```

use std::collections::VecDeque;
use std::fmt;

use tracing::trace;

use crate::error::{Result, StorageError};
use crate::object::{Object, Part};

/// Iterator over objects returned by `list`.
pub type ObjectIterator = StorageIterator<Object>;

/// Iterator over parts returned by `list_multipart`.
pub type PartIterator = StorageIterator<Part>;

/// Outcome of a single advance.
#[derive(Debug)]
pub enum Step<T> {
    /// The next item.
    Item(T),
    /// No more items. Returned on every advance after the last item.
    Exhausted,
    /// Hard failure. The iterator must not be advanced further.
    Failed(StorageError),
}

impl<T> Step<T> {
    /// Whether this step marks normal exhaustion.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

/// One batch of items from a [`PageSource`].
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Items in this page, in iteration order.
    pub items: Vec<T>,
    /// Whether the source has nothing after this page.
    pub done: bool,
}

impl<T> Page<T> {
    /// A page that ends the sequence.
    #[must_use]
    pub fn last(items: Vec<T>) -> Self {
        Self { items, done: true }
    }

    /// A page followed by more pages.
    #[must_use]
    pub fn more(items: Vec<T>) -> Self {
        Self { items, done: false }
    }
}

/// Supplier of pages for a [`StorageIterator`].
pub trait PageSource<T>: Send {
    /// Fetch the next page. Called only while the previous page was not `done`.
    fn next_page(&mut self) -> Result<Page<T>>;
}

impl<T, F> PageSource<T> for F
where
    F: FnMut() -> Result<Page<T>> + Send,
{
    fn next_page(&mut self) -> Result<Page<T>> {
        self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ready,
    Exhausted,
    Failed,
}

/// Sequential cursor over storage items.
///
/// Not meant for concurrent use; every advance takes `&mut self`.
pub struct StorageIterator<T> {
    source: Box<dyn PageSource<T>>,
    buffer: VecDeque<T>,
    source_done: bool,
    state: State,
    yielded: u64,
}

impl<T> fmt::Debug for StorageIterator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageIterator")
            .field("buffered", &self.buffer.len())
            .field("source_done", &self.source_done)
            .field("state", &self.state)
            .field("yielded", &self.yielded)
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> StorageIterator<T> {
    /// Iterate over pages pulled from `source`.
    #[must_use]
    pub fn new(source: impl PageSource<T> + 'static) -> Self {
        Self {
            source: Box::new(source),
            buffer: VecDeque::new(),
            source_done: false,
            state: State::Ready,
            yielded: 0,
        }
    }

    /// Iterate over a fixed list of items.
    #[must_use]
    pub fn from_items(items: Vec<T>) -> Self {
        let mut page = Some(Page::last(items));
        Self::new(move || Ok(page.take().unwrap_or_else(|| Page::last(Vec::new()))))
    }

    /// Iterate over a snapshot, handing it out in pages of `page_size`.
    #[must_use]
    pub fn paged(items: Vec<T>, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let mut rest = items.into_iter();
        Self::new(move || {
            let page: Vec<T> = rest.by_ref().take(page_size).collect();
            Ok(if rest.as_slice().is_empty() {
                Page::last(page)
            } else {
                Page::more(page)
            })
        })
    }

    /// An iterator with no items.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_items(Vec::new())
    }
}

impl<T> StorageIterator<T> {
    /// Advance the cursor, reporting the outcome as a tagged [`Step`].
    pub fn step(&mut self) -> Step<T> {
        match self.state {
            State::Exhausted => return Step::Exhausted,
            State::Failed => {
                return Step::Failed(StorageError::invalid_state(
                    "iterator advanced after a failure",
                ));
            }
            State::Ready => {}
        }

        loop {
            if let Some(item) = self.buffer.pop_front() {
                self.yielded += 1;
                return Step::Item(item);
            }
            if self.source_done {
                trace!(yielded = self.yielded, "iterator exhausted");
                self.state = State::Exhausted;
                return Step::Exhausted;
            }
            match self.source.next_page() {
                Ok(page) => {
                    trace!(items = page.items.len(), done = page.done, "fetched page");
                    self.source_done = page.done;
                    self.buffer.extend(page.items);
                }
                Err(e) => {
                    self.state = State::Failed;
                    return Step::Failed(e);
                }
            }
        }
    }

    /// Return the next item, or [`StorageError::IterateDone`] once exhausted.
    ///
    /// Exhaustion is idempotent. After a hard failure every further call
    /// returns `InvalidState`.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<T> {
        match self.step() {
            Step::Item(item) => Ok(item),
            Step::Exhausted => Err(StorageError::IterateDone),
            Step::Failed(e) => Err(e),
        }
    }

    /// Number of items returned so far.
    #[must_use]
    pub fn yielded(&self) -> u64 {
        self.yielded
    }

    /// Drain the iterator into a vector, stopping at the first failure.
    pub fn collect_all(mut self) -> Result<Vec<T>> {
        let mut out = Vec::new();
        loop {
            match self.step() {
                Step::Item(item) => out.push(item),
                Step::Exhausted => return Ok(out),
                Step::Failed(e) => return Err(e),
            }
        }
    }

    /// Adapt into a standard iterator of results that ends at exhaustion.
    #[must_use]
    pub fn into_results(self) -> Results<T> {
        Results {
            inner: self,
            finished: false,
        }
    }
}

/// Standard iterator adapter returned by [`StorageIterator::into_results`].
///
/// Yields `Ok` items, then at most one `Err`, then `None`.
pub struct Results<T> {
    inner: StorageIterator<T>,
    finished: bool,
}

impl<T> fmt::Debug for Results<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Results")
            .field("inner", &self.inner)
            .field("finished", &self.finished)
            .finish()
    }
}

impl<T> Iterator for Results<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.inner.step() {
            Step::Item(item) => Some(Ok(item)),
            Step::Exhausted => {
                self.finished = true;
                None
            }
            Step::Failed(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

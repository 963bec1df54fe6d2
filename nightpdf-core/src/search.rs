use crate::{Page, TextRun, Transform};

#[derive(Debug, Clone)]
struct IndexedRun {
    page_index: usize,
    folded: String,
    transform: Transform,
    width: f32,
    height: f32,
}

/// Every text run of the document in page order, then run order.
#[derive(Debug, Clone, Default)]
pub struct TextIndex {
    runs: Vec<IndexedRun>,
}

impl TextIndex {
    pub fn build(pages: &[Page]) -> Self {
        let runs = pages
            .iter()
            .enumerate()
            .flat_map(|(page_index, page)| {
                page.text_runs
                    .iter()
                    .map(move |run| IndexedRun::new(page_index, run))
            })
            .collect();
        Self { runs }
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Case-insensitive substring search. An empty query matches nothing.
    pub fn find(&self, query: &str) -> Vec<SearchMatch> {
        if query.is_empty() {
            return Vec::new();
        }
        let needle = query.to_lowercase();
        self.runs
            .iter()
            .filter(|run| run.folded.contains(&needle))
            .map(|run| SearchMatch {
                page_index: run.page_index,
                transform: run.transform,
                width: run.width,
                height: run.height,
            })
            .collect()
    }
}

impl IndexedRun {
    fn new(page_index: usize, run: &TextRun) -> Self {
        Self {
            page_index,
            folded: run.text.to_lowercase(),
            transform: run.transform,
            width: run.width,
            height: run.height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchMatch {
    /// 0-based page index.
    pub page_index: usize,
    pub transform: Transform,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl SearchMatch {
    /// The baseline sits at `(tx, ty)`, so the box extends upward by the run height.
    pub fn highlight_rect(&self, zoom: f32) -> HighlightRect {
        HighlightRect {
            x: self.transform.tx * zoom,
            y: (self.transform.ty - self.height) * zoom,
            width: self.width * zoom,
            height: self.height * zoom,
        }
    }
}

/// Query, ordered results and the match cursor.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    query: String,
    matches: Vec<SearchMatch>,
    current: Option<usize>,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    /// Cursor position, `-1` when nothing is selected.
    pub fn current_index(&self) -> isize {
        self.current.map(|idx| idx as isize).unwrap_or(-1)
    }

    pub fn current_match(&self) -> Option<&SearchMatch> {
        self.current.and_then(|idx| self.matches.get(idx))
    }

    /// Runs a new search. Returns the page to navigate to, if any.
    pub fn search(&mut self, index: &TextIndex, query: &str) -> Option<usize> {
        self.query = query.to_owned();
        self.matches = index.find(query);
        if self.matches.is_empty() {
            self.current = None;
            None
        } else {
            self.current = Some(0);
            self.current_match().map(|m| m.page_index)
        }
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.matches.clear();
        self.current = None;
    }

    pub fn next(&mut self) -> Option<usize> {
        let current = self.current?;
        self.select(current + 1)
    }

    pub fn prev(&mut self) -> Option<usize> {
        let current = self.current?;
        self.select(current.checked_sub(1)?)
    }

    /// Moves the cursor. Out-of-range or unchanged positions are ignored.
    pub fn select(&mut self, position: usize) -> Option<usize> {
        if position >= self.matches.len() || self.current == Some(position) {
            return None;
        }
        self.current = Some(position);
        Some(self.matches[position].page_index)
    }

    /// Matches on one page together with whether each is the selected one.
    pub fn matches_on_page(&self, page_index: usize) -> impl Iterator<Item = (&SearchMatch, bool)> {
        let current = self.current;
        self.matches
            .iter()
            .enumerate()
            .filter(move |(_, m)| m.page_index == page_index)
            .map(move |(idx, m)| (m, Some(idx) == current))
    }

    /// `(position, total)` for a "3/7" style indicator.
    pub fn position(&self) -> Option<(usize, usize)> {
        self.current.map(|idx| (idx + 1, self.matches.len()))
    }
}

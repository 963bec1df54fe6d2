use parking_lot::Mutex;
use tracing::{debug, instrument};

use crate::config::ViewerConfig;
use crate::pan::DragController;
use crate::rail::ThumbnailRail;
use crate::scroll::ScrollAnimation;
use crate::search::{SearchState, TextIndex};
use crate::DocumentSession;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        (0.0..self.width).contains(&x) && (0.0..self.height).contains(&y)
    }
}

/// Vertical stack of page surfaces in scroll space.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    sizes: Vec<(u32, u32)>,
    gap: f32,
}

impl PageLayout {
    pub fn new(sizes: Vec<(u32, u32)>, gap: f32) -> Self {
        Self {
            sizes,
            gap: gap.max(0.0),
        }
    }

    pub fn from_session(session: &DocumentSession, gap: f32) -> Self {
        Self::new(
            session
                .bitmaps()
                .map(|bitmap| (bitmap.width, bitmap.height))
                .collect(),
            gap,
        )
    }

    pub fn page_count(&self) -> usize {
        self.sizes.len()
    }

    pub fn gap(&self) -> f32 {
        self.gap
    }

    /// Displayed size of page `index` (0-based) at `zoom`.
    pub fn page_size(&self, index: usize, zoom: f32) -> Option<(f32, f32)> {
        self.sizes
            .get(index)
            .map(|&(w, h)| (w as f32 * zoom, h as f32 * zoom))
    }

    pub fn page_top(&self, index: usize, zoom: f32) -> Option<f32> {
        if index >= self.sizes.len() {
            return None;
        }
        let above: f32 = self.sizes[..index]
            .iter()
            .map(|&(_, h)| h as f32 * zoom)
            .sum();
        Some(above + self.gap * index as f32)
    }

    pub fn content_size(&self, zoom: f32) -> (f32, f32) {
        let width = self
            .sizes
            .iter()
            .map(|&(w, _)| w as f32 * zoom)
            .fold(0.0, f32::max);
        let height: f32 = self.sizes.iter().map(|&(_, h)| h as f32 * zoom).sum();
        let gaps = self.gap * self.sizes.len().saturating_sub(1) as f32;
        (width, height + gaps)
    }

    /// Share of page `index` that lies inside the vertical window `[top, top + height)`.
    pub fn visible_fraction(&self, index: usize, zoom: f32, top: f32, height: f32) -> f32 {
        let (Some(page_top), Some((_, page_height))) =
            (self.page_top(index, zoom), self.page_size(index, zoom))
        else {
            return 0.0;
        };
        if page_height <= 0.0 {
            return 0.0;
        }
        let overlap = (page_top + page_height).min(top + height) - page_top.max(top);
        (overlap.max(0.0) / page_height).min(1.0)
    }

    /// The page with the largest visible fraction, provided it reaches `threshold`.
    /// Ties go to the earlier page.
    pub fn most_visible(&self, zoom: f32, top: f32, height: f32, threshold: f32) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for index in 0..self.sizes.len() {
            let fraction = self.visible_fraction(index, zoom, top, height);
            if best.map_or(true, |(_, current)| fraction > current) {
                best = Some((index, fraction));
            }
        }
        best.filter(|&(_, fraction)| fraction > 0.0 && fraction >= threshold)
            .map(|(index, _)| index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerState {
    pub zoom: f32,
    /// 1-based; 0 only for an empty document.
    pub current_page: usize,
    pub scroll_x: f32,
    pub scroll_y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    GotoPage { page: usize },
    NextPage,
    PrevPage,
    ZoomIn,
    ZoomOut,
    SetZoom { zoom: f32 },
    Search { query: String },
    SearchNext,
    SearchPrev,
    PointerDown { x: f32, y: f32 },
    PointerMove { x: f32, y: f32 },
    PointerUp,
    PointerLeave,
    Scroll { x: f32, y: f32 },
    Resize { width: f32, height: f32 },
    ThumbnailClicked { page: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// Display surfaces must be rebuilt.
    Recomposite,
    NavigatedTo { page: usize },
    ScrollTo { x: f32, y: f32, smooth: bool },
    CurrentPageChanged { page: usize },
    RailScrolled { offset: usize },
}

/// Interactive state over one processed document.
pub struct Viewer {
    config: ViewerConfig,
    state: ViewerState,
    layout: PageLayout,
    index: TextIndex,
    search: SearchState,
    drag: DragController,
    rail: ThumbnailRail,
    viewport: Viewport,
    animation: Option<ScrollAnimation>,
    events: Mutex<Vec<ViewerEvent>>,
}

impl Viewer {
    pub fn new(
        session: &DocumentSession,
        config: &ViewerConfig,
        viewport: Viewport,
        rail_slots: usize,
    ) -> Self {
        let layout = PageLayout::from_session(session, config.page_gap);
        let page_count = layout.page_count();
        let mut viewer = Self {
            config: config.clone(),
            state: ViewerState {
                zoom: 1.0_f32.clamp(config.min_zoom, config.max_zoom),
                current_page: usize::from(page_count > 0),
                scroll_x: 0.0,
                scroll_y: 0.0,
            },
            layout,
            index: TextIndex::build(session.pages()),
            search: SearchState::new(),
            drag: DragController::new(config.drag_gain),
            rail: ThumbnailRail::new(page_count, rail_slots),
            viewport,
            animation: None,
            events: Mutex::new(Vec::new()),
        };
        viewer.refresh_current_page();
        viewer
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    pub fn rail(&self) -> &ThumbnailRail {
        &self.rail
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn page_count(&self) -> usize {
        self.layout.page_count()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Number of thumbnails the rail can show at once.
    pub fn set_rail_slots(&mut self, slots: usize) {
        let before = self.rail.scroll_offset();
        self.rail.set_visible(slots);
        if self.rail.scroll_offset() != before {
            self.push(ViewerEvent::RailScrolled {
                offset: self.rail.scroll_offset(),
            });
        }
    }

    /// Offset to draw at. Trails `state()` while a smooth scroll is running.
    pub fn display_scroll(&self) -> (f32, f32) {
        match &self.animation {
            Some(animation) => animation.position(),
            None => (self.state.scroll_x, self.state.scroll_y),
        }
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Advances a running smooth scroll by one frame. Returns true when the
    /// displayed offset moved.
    pub fn tick(&mut self) -> bool {
        let Some(animation) = self.animation.as_mut() else {
            return false;
        };
        animation.advance();
        if animation.is_finished() {
            self.animation = None;
        }
        true
    }

    pub fn drain_events(&self) -> Vec<ViewerEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Invalid requests (out-of-range pages, exhausted cursor) are silently ignored.
    #[instrument(skip(self))]
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::GotoPage { page } | Command::ThumbnailClicked { page } => {
                self.goto_page(page);
            }
            Command::NextPage => {
                self.goto_page(self.state.current_page + 1);
            }
            Command::PrevPage => {
                if let Some(page) = self.state.current_page.checked_sub(1) {
                    self.goto_page(page);
                }
            }
            Command::ZoomIn => {
                self.set_zoom(self.state.zoom * self.config.zoom_step);
            }
            Command::ZoomOut => {
                self.set_zoom(self.state.zoom / self.config.zoom_step);
            }
            Command::SetZoom { zoom } => {
                self.set_zoom(zoom);
            }
            Command::Search { query } => {
                let target = self.search.search(&self.index, &query);
                debug!(query = %query, matches = self.search.matches().len(), "search");
                self.push(ViewerEvent::Recomposite);
                if let Some(page_index) = target {
                    self.goto_page(page_index + 1);
                }
            }
            Command::SearchNext => {
                if let Some(page_index) = self.search.next() {
                    self.push(ViewerEvent::Recomposite);
                    self.goto_page(page_index + 1);
                }
            }
            Command::SearchPrev => {
                if let Some(page_index) = self.search.prev() {
                    self.push(ViewerEvent::Recomposite);
                    self.goto_page(page_index + 1);
                }
            }
            Command::PointerDown { x, y } => {
                if self.viewport.contains(x, y) {
                    self.drag
                        .press((x, y), (self.state.scroll_x, self.state.scroll_y));
                }
            }
            Command::PointerMove { x, y } => {
                if let Some((sx, sy)) = self.drag.track((x, y)) {
                    self.scroll_to(sx, sy, false);
                }
            }
            Command::PointerUp | Command::PointerLeave => {
                self.drag.release();
            }
            Command::Scroll { x, y } => {
                self.scroll_to(x, y, false);
            }
            Command::Resize { width, height } => {
                self.viewport = Viewport::new(width, height);
                self.scroll_to(self.state.scroll_x, self.state.scroll_y, false);
                self.refresh_current_page();
            }
        }
    }

    fn push(&self, event: ViewerEvent) {
        self.events.lock().push(event);
    }

    fn goto_page(&mut self, page: usize) {
        if page == 0 || page > self.page_count() {
            return;
        }
        let Some(top) = self.layout.page_top(page - 1, self.state.zoom) else {
            return;
        };
        self.push(ViewerEvent::NavigatedTo { page });
        self.scroll_to(self.state.scroll_x, top, true);
    }

    fn set_zoom(&mut self, zoom: f32) {
        if !zoom.is_finite() || zoom <= 0.0 {
            return;
        }
        let zoom = zoom.clamp(self.config.min_zoom, self.config.max_zoom);
        if (zoom - self.state.zoom).abs() <= f32::EPSILON {
            return;
        }
        let ratio = zoom / self.state.zoom;
        self.state.zoom = zoom;
        self.push(ViewerEvent::Recomposite);
        // Keep the same document position under the viewport origin.
        self.scroll_to(
            self.state.scroll_x * ratio,
            self.state.scroll_y * ratio,
            false,
        );
        self.refresh_current_page();
    }

    fn max_scroll(&self) -> (f32, f32) {
        let (width, height) = self.layout.content_size(self.state.zoom);
        (
            (width - self.viewport.width).max(0.0),
            (height - self.viewport.height).max(0.0),
        )
    }

    fn scroll_to(&mut self, x: f32, y: f32, smooth: bool) {
        let (max_x, max_y) = self.max_scroll();
        let x = x.clamp(0.0, max_x);
        let y = y.clamp(0.0, max_y);
        if smooth || x != self.state.scroll_x || y != self.state.scroll_y {
            let from = self.display_scroll();
            self.animation = (smooth
                && self.config.scroll_animation_frames > 0
                && from != (x, y))
                .then(|| ScrollAnimation::new(from, (x, y), self.config.scroll_animation_frames));
            self.state.scroll_x = x;
            self.state.scroll_y = y;
            self.push(ViewerEvent::ScrollTo { x, y, smooth });
            self.refresh_current_page();
        }
    }

    fn refresh_current_page(&mut self) {
        let Some(index) = self.layout.most_visible(
            self.state.zoom,
            self.state.scroll_y,
            self.viewport.height,
            self.config.visibility_threshold,
        ) else {
            return;
        };
        let page = index + 1;
        if page == self.state.current_page {
            return;
        }
        self.state.current_page = page;
        self.push(ViewerEvent::CurrentPageChanged { page });
        if self.rail.activate(index) {
            self.push(ViewerEvent::RailScrolled {
                offset: self.rail.scroll_offset(),
            });
        }
    }
}

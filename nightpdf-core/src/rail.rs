/// Thumbnail strip state: which thumbnail is active and which slice is on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailRail {
    count: usize,
    active: usize,
    scroll_offset: usize,
    visible: usize,
}

impl ThumbnailRail {
    pub fn new(count: usize, visible: usize) -> Self {
        Self {
            count,
            active: 0,
            scroll_offset: 0,
            visible: visible.max(1),
        }
    }

    /// 0-based index of the highlighted thumbnail.
    pub fn active(&self) -> usize {
        self.active
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn visible_range(&self) -> std::ops::Range<usize> {
        let end = (self.scroll_offset + self.visible).min(self.count);
        self.scroll_offset..end
    }

    pub fn set_visible(&mut self, visible: usize) {
        self.visible = visible.max(1);
        self.ensure_visible();
    }

    /// Highlights `index` and scrolls it into view. Returns true if the offset moved.
    pub fn activate(&mut self, index: usize) -> bool {
        if self.count == 0 {
            return false;
        }
        self.active = index.min(self.count - 1);
        self.ensure_visible()
    }

    // Minimal scroll that brings the active thumbnail on screen.
    fn ensure_visible(&mut self) -> bool {
        let before = self.scroll_offset;
        let max_offset = self.count.saturating_sub(self.visible);
        if self.scroll_offset > max_offset {
            self.scroll_offset = max_offset;
        }
        if self.active < self.scroll_offset {
            self.scroll_offset = self.active;
        } else if self.active >= self.scroll_offset + self.visible {
            self.scroll_offset = self.active + 1 - self.visible;
        }
        self.scroll_offset != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrolls_down_just_enough() {
        let mut rail = ThumbnailRail::new(10, 3);
        assert!(!rail.activate(2));
        assert!(rail.activate(5));
        assert_eq!(rail.scroll_offset(), 3);
        assert_eq!(rail.visible_range(), 3..6);
    }

    #[test]
    fn scrolls_up_to_active() {
        let mut rail = ThumbnailRail::new(10, 3);
        rail.activate(9);
        assert_eq!(rail.scroll_offset(), 7);
        assert!(rail.activate(1));
        assert_eq!(rail.scroll_offset(), 1);
    }

    #[test]
    fn empty_rail_ignores_activation() {
        let mut rail = ThumbnailRail::new(0, 3);
        assert!(!rail.activate(4));
        assert_eq!(rail.visible_range(), 0..0);
    }
}

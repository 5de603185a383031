//! Transcript scroll policy.
//!
//! The view follows the bottom while the user is at (or near) it, so a
//! streaming reply stays visible. Scrolling up past the threshold parks
//! the view; new lines then grow below without yanking the viewport.
//! Scrolling back down within the threshold re-sticks it.

/// How many lines from the bottom still count as "at the bottom".
pub const FOLLOW_THRESHOLD: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct ScrollState {
    offset: usize,
    max_offset: usize,
    follow: bool,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            offset: 0,
            max_offset: 0,
            follow: true,
        }
    }
}

impl ScrollState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines hidden above the viewport.
    #[must_use]
    pub fn offset(&self) -> usize {
        if self.follow { self.max_offset } else { self.offset }
    }

    #[must_use]
    pub fn is_following(&self) -> bool {
        self.follow
    }

    /// Update the scroll range after layout. Called every frame with the
    /// freshly computed maximum; a following view sticks to the new
    /// bottom, a parked view keeps its line.
    pub fn clamp_to(&mut self, max_offset: usize) {
        self.max_offset = max_offset;
        if self.offset > max_offset {
            self.offset = max_offset;
        }
        if self.follow {
            self.offset = max_offset;
        } else if self.near_bottom(self.offset) {
            self.follow = true;
            self.offset = max_offset;
        }
    }

    pub fn scroll_up(&mut self, amount: usize) {
        self.offset = self.offset().saturating_sub(amount);
        self.follow = self.near_bottom(self.offset);
    }

    pub fn scroll_down(&mut self, amount: usize) {
        self.offset = self
            .offset()
            .saturating_add(amount)
            .min(self.max_offset);
        self.follow = self.near_bottom(self.offset);
    }

    pub fn jump_to_bottom(&mut self) {
        self.offset = self.max_offset;
        self.follow = true;
    }

    fn near_bottom(&self, offset: usize) -> bool {
        self.max_offset.saturating_sub(offset) <= FOLLOW_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_view_follows_the_bottom() {
        let mut scroll = ScrollState::new();
        assert!(scroll.is_following());

        scroll.clamp_to(40);
        assert_eq!(scroll.offset(), 40);

        // New content keeps the view pinned.
        scroll.clamp_to(55);
        assert_eq!(scroll.offset(), 55);
    }

    #[test]
    fn scrolling_away_parks_the_view() {
        let mut scroll = ScrollState::new();
        scroll.clamp_to(40);

        scroll.scroll_up(10);
        assert!(!scroll.is_following());
        assert_eq!(scroll.offset(), 30);

        // New lines arrive; the parked view does not move.
        scroll.clamp_to(60);
        assert_eq!(scroll.offset(), 30);
        assert!(!scroll.is_following());
    }

    #[test]
    fn small_nudges_near_the_bottom_keep_following() {
        let mut scroll = ScrollState::new();
        scroll.clamp_to(40);

        scroll.scroll_up(FOLLOW_THRESHOLD);
        assert!(scroll.is_following());

        scroll.clamp_to(50);
        assert_eq!(scroll.offset(), 50);
    }

    #[test]
    fn scrolling_back_down_resticks() {
        let mut scroll = ScrollState::new();
        scroll.clamp_to(40);
        scroll.scroll_up(20);
        assert!(!scroll.is_following());

        scroll.scroll_down(18);
        assert!(scroll.is_following());

        scroll.clamp_to(70);
        assert_eq!(scroll.offset(), 70);
    }

    #[test]
    fn jump_to_bottom_resticks_from_anywhere() {
        let mut scroll = ScrollState::new();
        scroll.clamp_to(100);
        scroll.scroll_up(90);
        assert!(!scroll.is_following());

        scroll.jump_to_bottom();
        assert!(scroll.is_following());
        assert_eq!(scroll.offset(), 100);
    }

    #[test]
    fn shrinking_content_clamps_the_offset() {
        let mut scroll = ScrollState::new();
        scroll.clamp_to(100);
        scroll.scroll_up(50);
        assert_eq!(scroll.offset(), 50);

        // Transcript cleared; the view lands back at the (new) bottom.
        scroll.clamp_to(0);
        assert_eq!(scroll.offset(), 0);
        assert!(scroll.is_following());
    }

    #[test]
    fn scroll_bounds_are_clamped() {
        let mut scroll = ScrollState::new();
        scroll.clamp_to(10);

        scroll.scroll_up(100);
        assert_eq!(scroll.offset(), 0);

        scroll.scroll_down(100);
        assert_eq!(scroll.offset(), 10);
        assert!(scroll.is_following());
    }
}

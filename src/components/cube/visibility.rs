//! Visibility gate
//!
//! Combines viewport intersection of the host container with document-level
//! tab visibility. The loop runs only while both hold; the glue layer maps
//! edge transitions to (idempotent) start/stop calls.

/// Intersection ratio above which the container counts as on-screen
pub const INTERSECTION_THRESHOLD: f64 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibilityGate {
    intersecting: bool,
    page_visible: bool,
}

impl VisibilityGate {
    /// Starts off-screen; the first observer notification establishes the
    /// real state.
    pub fn new() -> Self {
        Self {
            intersecting: false,
            page_visible: true,
        }
    }

    /// Feed an intersection notification; returns the combined visibility.
    pub fn set_intersection_ratio(&mut self, ratio: f64) -> bool {
        self.intersecting = ratio > INTERSECTION_THRESHOLD;
        self.is_visible()
    }

    /// Feed a document visibility change; returns the combined visibility.
    pub fn set_page_visible(&mut self, visible: bool) -> bool {
        self.page_visible = visible;
        self.is_visible()
    }

    /// True only when the container intersects the viewport AND the tab is
    /// not hidden.
    pub fn is_visible(&self) -> bool {
        self.intersecting && self.page_visible
    }
}

impl Default for VisibilityGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_hidden() {
        assert!(!VisibilityGate::new().is_visible());
    }

    #[test]
    fn test_threshold_mapping() {
        let mut gate = VisibilityGate::new();
        assert!(!gate.set_intersection_ratio(0.05));
        assert!(!gate.set_intersection_ratio(0.1));
        assert!(gate.set_intersection_ratio(0.11));
        assert!(gate.set_intersection_ratio(1.0));
        assert!(!gate.set_intersection_ratio(0.0));
    }

    #[test]
    fn test_requires_both_signals() {
        let mut gate = VisibilityGate::new();
        gate.set_intersection_ratio(1.0);
        assert!(gate.is_visible());
        assert!(!gate.set_page_visible(false));
        // Scrolled in but tab hidden: still not visible
        assert!(!gate.set_intersection_ratio(1.0));
        assert!(gate.set_page_visible(true));
    }

    #[test]
    fn test_either_signal_halts() {
        let mut gate = VisibilityGate::new();
        gate.set_page_visible(true);
        gate.set_intersection_ratio(0.9);
        assert!(gate.is_visible());
        assert!(!gate.set_intersection_ratio(0.0));
        gate.set_intersection_ratio(0.9);
        assert!(!gate.set_page_visible(false));
    }
}

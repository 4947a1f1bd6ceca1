//! Zoom-level badge: a colored indicator of the current zoom, re-attached
//! whenever the host rebuilds its DOM after a save.

/// Zoom-bar background for a zoom level: red while too far out to edit
/// comfortably, amber in the transition band, white otherwise.
pub fn zoom_bar_color(zoom: u32) -> &'static str {
    match zoom {
        0..=13 => "#ef9a9a",
        14 | 15 => "#ffe082",
        _ => "#ffffff",
    }
}

#[derive(Debug, Default)]
pub struct ZoomBadge {
    attached: bool,
    level: u32,
    color: &'static str,
}

impl ZoomBadge {
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn color(&self) -> &'static str {
        self.color
    }

    pub fn update(&mut self, zoom: u32) {
        self.attached = true;
        self.level = zoom;
        self.color = zoom_bar_color(zoom);
    }

    /// The host replaces its chrome after action-stack clears; forget the
    /// old attachment and rebuild.
    pub fn reattach(&mut self, zoom: u32) {
        self.attached = false;
        self.update(zoom);
    }
}

//! Keyboard and swipe handling shared by the artist list, gallery and lightbox.

use eframe::egui;

/// Horizontal travel a touch/drag must exceed to count as a swipe.
pub const SWIPE_THRESHOLD_PX: f32 = 40.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Swipe {
    /// Finger moved right: go back one page/image.
    Previous,
    /// Finger moved left: go forward one page/image.
    Next,
}

pub fn classify_swipe(dx: f32) -> Option<Swipe> {
    if dx > SWIPE_THRESHOLD_PX {
        Some(Swipe::Previous)
    } else if dx < -SWIPE_THRESHOLD_PX {
        Some(Swipe::Next)
    } else {
        None
    }
}

/// Accumulates horizontal drag distance between press and release.
#[derive(Default, Debug)]
pub struct SwipeTracker {
    travel: Option<f32>,
}

impl SwipeTracker {
    pub fn begin(&mut self) {
        self.travel = Some(0.0);
    }

    pub fn moved(&mut self, dx: f32) {
        if let Some(t) = self.travel.as_mut() {
            *t += dx;
        }
    }

    pub fn end(&mut self) -> Option<Swipe> {
        self.travel.take().and_then(classify_swipe)
    }

    /// Feed one frame of drag state from an egui response.
    pub fn track(&mut self, resp: &egui::Response) -> Option<Swipe> {
        if resp.drag_started() {
            self.begin();
        }
        if resp.dragged() {
            self.moved(resp.drag_delta().x);
        }
        if resp.drag_released() {
            return self.end();
        }
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    LightboxPrev,
    LightboxNext,
    LightboxClose,
    /// Move the current artist by this many visible rows.
    NavigateArtist(isize),
}

/// Map a key press to an action. While the lightbox is open, only it
/// receives arrow keys.
pub fn map_key(key: egui::Key, lightbox_open: bool) -> Option<KeyAction> {
    use egui::Key;
    if lightbox_open {
        return match key {
            Key::ArrowLeft => Some(KeyAction::LightboxPrev),
            Key::ArrowRight => Some(KeyAction::LightboxNext),
            Key::Escape => Some(KeyAction::LightboxClose),
            _ => None,
        };
    }
    match key {
        Key::ArrowLeft => Some(KeyAction::NavigateArtist(-1)),
        Key::ArrowRight => Some(KeyAction::NavigateArtist(1)),
        Key::ArrowDown => Some(KeyAction::NavigateArtist(-10)),
        Key::ArrowUp => Some(KeyAction::NavigateArtist(10)),
        _ => None,
    }
}

/// Key actions for this frame. Nothing fires while a text field has focus.
pub fn collect_key_actions(ctx: &egui::Context, lightbox_open: bool) -> Vec<KeyAction> {
    if ctx.wants_keyboard_input() {
        return Vec::new();
    }
    ctx.input(|i| {
        i.events
            .iter()
            .filter_map(|ev| match ev {
                egui::Event::Key {
                    key, pressed: true, ..
                } => map_key(*key, lightbox_open),
                _ => None,
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::Key;

    #[test]
    fn swipe_needs_to_pass_threshold() {
        assert_eq!(classify_swipe(40.0), None);
        assert_eq!(classify_swipe(41.0), Some(Swipe::Previous));
        assert_eq!(classify_swipe(-41.0), Some(Swipe::Next));
        assert_eq!(classify_swipe(-12.0), None);
    }

    #[test]
    fn tracker_sums_travel_and_resets() {
        let mut t = SwipeTracker::default();
        t.begin();
        t.moved(-30.0);
        t.moved(-25.0);
        assert_eq!(t.end(), Some(Swipe::Next));
        assert_eq!(t.end(), None);
    }

    #[test]
    fn tracker_ignores_motion_without_press() {
        let mut t = SwipeTracker::default();
        t.moved(200.0);
        assert_eq!(t.end(), None);
    }

    #[test]
    fn arrows_drive_lightbox_when_open() {
        assert_eq!(map_key(Key::ArrowLeft, true), Some(KeyAction::LightboxPrev));
        assert_eq!(map_key(Key::Escape, true), Some(KeyAction::LightboxClose));
        assert_eq!(map_key(Key::ArrowUp, true), None);
    }

    #[test]
    fn arrows_navigate_artists_when_closed() {
        assert_eq!(map_key(Key::ArrowRight, false), Some(KeyAction::NavigateArtist(1)));
        assert_eq!(map_key(Key::ArrowUp, false), Some(KeyAction::NavigateArtist(10)));
        assert_eq!(map_key(Key::ArrowDown, false), Some(KeyAction::NavigateArtist(-10)));
        assert_eq!(map_key(Key::Escape, false), None);
    }
}

use eframe::egui;
use egui::{Color32, RichText, Vec2};
use serde::Deserialize;
use std::fmt;

// ============================================================================
// Status + filter enums
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtistStatus {
    #[default]
    None,
    Custom,
    Done,
}

impl ArtistStatus {
    /// Unknown values read as `None`, matching a missing status file server-side.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "custom" => Self::Custom,
            "done" => Self::Done,
            _ => Self::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Custom => "custom",
            Self::Done => "done",
        }
    }

    pub fn dot_color(self) -> Color32 {
        match self {
            Self::None => Color32::from_rgb(0xE5, 0x39, 0x35),
            Self::Custom => Color32::from_rgb(0x1E, 0x88, 0xE5),
            Self::Done => Color32::from_rgb(0x43, 0xA0, 0x47),
        }
    }
}

impl fmt::Display for ArtistStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Done,
    Custom,
    None,
}

impl StatusFilter {
    /// Filter button cycle: all → done → custom → none → all.
    pub fn next(self) -> Self {
        match self {
            Self::All => Self::Done,
            Self::Done => Self::Custom,
            Self::Custom => Self::None,
            Self::None => Self::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "Show All",
            Self::Done => "Done",
            Self::Custom => "Custom font",
            Self::None => "To-do",
        }
    }

    pub fn matches(self, status: ArtistStatus) -> bool {
        match self {
            Self::All => true,
            Self::Done => status == ArtistStatus::Done,
            Self::Custom => status == ArtistStatus::Custom,
            Self::None => status == ArtistStatus::None,
        }
    }

    fn tint(self) -> Option<Color32> {
        match self {
            Self::All => None,
            Self::Done => Some(ArtistStatus::Done.dot_color()),
            Self::Custom => Some(ArtistStatus::Custom.dot_color()),
            Self::None => Some(ArtistStatus::None.dot_color()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtistItem {
    pub key: String,
    pub name: String,
    pub status: ArtistStatus,
    pub selected: bool,
}

impl ArtistItem {
    pub fn new(key: impl Into<String>, name: impl Into<String>, status: ArtistStatus) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            status,
            selected: false,
        }
    }
}

/// What the sidebar asks the app to do after a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SidebarAction {
    Load { key: String, name: String },
    ToggleStatus(String),
    BulkApplyFanart,
    BulkToggleStatus,
}

// ============================================================================
// ArtistList — visibility, multi-select and navigation
// ============================================================================

#[derive(Default)]
pub struct ArtistList {
    items: Vec<ArtistItem>,
    visible: Vec<bool>,
    query: String,
    status_filter: StatusFilter,
    /// Shift-click anchor (key of the last clicked checkbox).
    anchor: Option<String>,
    scroll_to_current: bool,
}

impl ArtistList {
    pub fn new(items: Vec<ArtistItem>) -> Self {
        let mut list = Self {
            visible: vec![true; items.len()],
            items,
            ..Default::default()
        };
        list.apply_filter();
        list
    }

    pub fn items(&self) -> &[ArtistItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ArtistItem> {
        self.items.iter().find(|a| a.key == key)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn status_filter(&self) -> StatusFilter {
        self.status_filter
    }

    pub fn is_visible(&self, key: &str) -> bool {
        self.position(key).is_some_and(|i| self.visible[i])
    }

    pub fn visible_items(&self) -> impl Iterator<Item = &ArtistItem> {
        self.items
            .iter()
            .zip(self.visible.iter())
            .filter_map(|(item, &vis)| vis.then_some(item))
    }

    pub fn visible_keys(&self) -> Vec<String> {
        self.visible_items().map(|a| a.key.clone()).collect()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.items.iter().position(|a| a.key == key)
    }

    // -- filtering ----------------------------------------------------------

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.apply_filter();
    }

    pub fn set_status_filter(&mut self, filter: StatusFilter) {
        self.status_filter = filter;
        self.apply_filter();
    }

    pub fn cycle_status_filter(&mut self) -> StatusFilter {
        self.set_status_filter(self.status_filter.next());
        self.status_filter
    }

    /// Recompute visibility. Items are never removed, only hidden.
    pub fn apply_filter(&mut self) {
        let q = self.query.to_lowercase();
        let filter = self.status_filter;
        self.visible = self
            .items
            .iter()
            .map(|a| a.name.to_lowercase().contains(&q) && filter.matches(a.status))
            .collect();
    }

    // -- selection ----------------------------------------------------------

    /// Checkbox click. With `shift` and a visible anchor, adds the inclusive
    /// range between anchor and clicked item; otherwise toggles the item.
    pub fn click_select(&mut self, key: &str, shift: bool) {
        let visible: Vec<usize> = (0..self.items.len()).filter(|&i| self.visible[i]).collect();
        let clicked = visible.iter().position(|&i| self.items[i].key == key);
        let anchor = self
            .anchor
            .as_deref()
            .and_then(|a| visible.iter().position(|&i| self.items[i].key == a));

        match (shift, clicked, anchor) {
            (true, Some(c), Some(a)) => {
                let (start, end) = (c.min(a), c.max(a));
                for &i in &visible[start..=end] {
                    self.items[i].selected = true;
                }
            }
            _ => {
                if let Some(i) = self.position(key) {
                    self.items[i].selected = !self.items[i].selected;
                }
            }
        }
        self.anchor = Some(key.to_string());
    }

    /// Select-all checkbox: only touches visible items.
    pub fn select_all_visible(&mut self, checked: bool) {
        for (item, &vis) in self.items.iter_mut().zip(self.visible.iter()) {
            if vis {
                item.selected = checked;
            }
        }
    }

    pub fn all_visible_selected(&self) -> bool {
        let mut any = false;
        for item in self.visible_items() {
            if !item.selected {
                return false;
            }
            any = true;
        }
        any
    }

    pub fn selected_keys(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|a| a.selected)
            .map(|a| a.key.clone())
            .collect()
    }

    pub fn selected_count(&self) -> usize {
        self.items.iter().filter(|a| a.selected).count()
    }

    pub fn bulk_actions_available(&self) -> bool {
        self.selected_count() > 1
    }

    // -- status + navigation -------------------------------------------------

    /// Update one status dot. Visibility is left alone until the next filter pass.
    pub fn set_status(&mut self, key: &str, status: ArtistStatus) -> bool {
        match self.position(key) {
            Some(i) => {
                self.items[i].status = status;
                true
            }
            None => false,
        }
    }

    /// Step `delta` visible rows away from `current`. An absent current
    /// counts as position -1, so +1 lands on the first visible item.
    pub fn navigate(&self, current: Option<&str>, delta: isize) -> Option<&ArtistItem> {
        let visible: Vec<&ArtistItem> = self.visible_items().collect();
        let here = current
            .and_then(|k| visible.iter().position(|a| a.key == k))
            .map_or(-1, |i| i as isize);
        let next = here + delta;
        if next >= 0 && (next as usize) < visible.len() {
            Some(visible[next as usize])
        } else {
            None
        }
    }

    pub fn request_scroll_to_current(&mut self) {
        self.scroll_to_current = true;
    }

    // ====================================================================
    // WIDGET: sidebar
    // ====================================================================

    pub fn show(&mut self, ui: &mut egui::Ui, current: Option<&str>) -> Vec<SidebarAction> {
        let mut actions = Vec::new();

        // -- search + status filter --
        ui.horizontal(|ui| {
            let mut query = self.query.clone();
            let resp = ui.add(
                egui::TextEdit::singleline(&mut query)
                    .hint_text("Search artists")
                    .desired_width(ui.available_width() - 96.0),
            );
            if resp.changed() {
                self.set_query(query);
            }
            let filter = self.status_filter;
            let mut label = RichText::new(filter.label());
            if let Some(c) = filter.tint() {
                label = label.color(c);
            }
            if ui.add(egui::Button::new(label).min_size(Vec2::new(88.0, 0.0))).clicked() {
                self.cycle_status_filter();
            }
        });

        // -- select all + bulk --
        ui.horizontal(|ui| {
            let mut all = self.all_visible_selected();
            if ui.checkbox(&mut all, "Select all").changed() {
                self.select_all_visible(all);
            }
            if self.bulk_actions_available() {
                if ui.button("Apply top fanart").clicked() {
                    actions.push(SidebarAction::BulkApplyFanart);
                }
                if ui.button("Toggle status").clicked() {
                    actions.push(SidebarAction::BulkToggleStatus);
                }
            }
        });
        ui.separator();

        let shift = ui.input(|i| i.modifiers.shift);
        let mut select_click: Option<String> = None;
        let scroll = std::mem::take(&mut self.scroll_to_current);

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for item in self.visible_items() {
                    let is_current = current == Some(item.key.as_str());
                    ui.horizontal(|ui| {
                        let mut checked = item.selected;
                        if ui.checkbox(&mut checked, "").clicked() {
                            select_click = Some(item.key.clone());
                        }

                        let (dot, dot_resp) =
                            ui.allocate_exact_size(Vec2::splat(12.0), egui::Sense::click());
                        ui.painter().circle_filled(dot.center(), 5.0, item.status.dot_color());
                        if dot_resp.on_hover_text(item.status.as_str()).clicked() {
                            actions.push(SidebarAction::ToggleStatus(item.key.clone()));
                        }

                        let resp = ui.selectable_label(is_current, item.name.as_str());
                        if is_current && scroll {
                            resp.scroll_to_me(Some(egui::Align::Center));
                        }
                        if resp.clicked() {
                            actions.push(SidebarAction::Load {
                                key: item.key.clone(),
                                name: item.name.clone(),
                            });
                        }
                    });
                }
            });

        if let Some(key) = select_click {
            self.click_select(&key, shift);
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ArtistList {
        ArtistList::new(vec![
            ArtistItem::new("1", "ABBA", ArtistStatus::None),
            ArtistItem::new("2", "Beirut", ArtistStatus::Custom),
            ArtistItem::new("3", "Cream", ArtistStatus::None),
            ArtistItem::new("4", "Daft Punk", ArtistStatus::Done),
            ArtistItem::new("5", "Eels", ArtistStatus::None),
            ArtistItem::new("6", "Feist", ArtistStatus::None),
        ])
    }

    #[test]
    fn status_parse_defaults_to_none() {
        assert_eq!(ArtistStatus::parse("done"), ArtistStatus::Done);
        assert_eq!(ArtistStatus::parse(" custom\n"), ArtistStatus::Custom);
        assert_eq!(ArtistStatus::parse("garbage"), ArtistStatus::None);
    }

    #[test]
    fn filter_button_cycles_through_all_states() {
        let mut list = sample();
        assert_eq!(list.cycle_status_filter(), StatusFilter::Done);
        assert_eq!(list.cycle_status_filter(), StatusFilter::Custom);
        assert_eq!(list.cycle_status_filter(), StatusFilter::None);
        assert_eq!(list.cycle_status_filter(), StatusFilter::All);
    }

    #[test]
    fn search_is_case_insensitive_and_combines_with_status() {
        let mut list = sample();
        list.set_query("E");
        assert_eq!(list.visible_keys(), vec!["2", "3", "5", "6"]);
        list.set_status_filter(StatusFilter::None);
        assert_eq!(list.visible_keys(), vec!["3", "5", "6"]);
        assert_eq!(list.len(), 6);
    }

    #[test]
    fn marking_done_then_filtering_shows_exactly_those() {
        let mut list = sample();
        list.set_status("1", ArtistStatus::Done);
        list.set_status("5", ArtistStatus::Done);
        list.set_status("4", ArtistStatus::None);
        list.set_status_filter(StatusFilter::Done);
        assert_eq!(list.visible_keys(), vec!["1", "5"]);
    }

    #[test]
    fn shift_click_range_is_order_independent() {
        let mut forward = sample();
        forward.click_select("2", false);
        forward.click_select("5", true);

        let mut backward = sample();
        backward.click_select("5", false);
        backward.click_select("2", true);

        assert_eq!(forward.selected_keys(), vec!["2", "3", "4", "5"]);
        assert_eq!(backward.selected_keys(), forward.selected_keys());
    }

    #[test]
    fn shift_click_range_only_covers_visible_items() {
        let mut list = sample();
        list.set_status_filter(StatusFilter::None);
        list.click_select("1", false);
        list.click_select("6", true);
        assert_eq!(list.selected_keys(), vec!["1", "3", "5", "6"]);
    }

    #[test]
    fn shift_click_without_anchor_toggles() {
        let mut list = sample();
        list.click_select("3", true);
        assert_eq!(list.selected_keys(), vec!["3"]);
        list.click_select("3", false);
        assert!(list.selected_keys().is_empty());
    }

    #[test]
    fn select_all_is_restricted_to_visible() {
        let mut list = sample();
        list.set_query("d");
        list.select_all_visible(true);
        assert_eq!(list.selected_keys(), vec!["4"]);
        assert!(list.all_visible_selected());
        list.set_query("");
        assert!(!list.all_visible_selected());
        list.select_all_visible(false);
        assert_eq!(list.selected_count(), 0);
    }

    #[test]
    fn bulk_actions_need_more_than_one_selection() {
        let mut list = sample();
        list.click_select("1", false);
        assert!(!list.bulk_actions_available());
        list.click_select("2", false);
        assert!(list.bulk_actions_available());
    }

    #[test]
    fn navigate_steps_over_visible_rows() {
        let mut list = sample();
        assert_eq!(list.navigate(None, 1).map(|a| a.key.as_str()), Some("1"));
        assert_eq!(list.navigate(Some("2"), 1).map(|a| a.key.as_str()), Some("3"));
        assert!(list.navigate(Some("2"), 10).is_none());
        assert!(list.navigate(Some("1"), -1).is_none());

        list.set_status_filter(StatusFilter::None);
        assert_eq!(list.navigate(Some("1"), 1).map(|a| a.key.as_str()), Some("3"));
    }
}

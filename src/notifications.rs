// ============================================================================
// NOTIFICATIONS — transient toasts stacked in the bottom-right corner
// ============================================================================

use eframe::egui;
use egui::Color32;
use std::time::{Duration, Instant};

pub const TOAST_DURATION: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

impl ToastKind {
    fn color(&self) -> Color32 {
        match self {
            ToastKind::Success => Color32::from_rgb(46, 160, 67),
            ToastKind::Error => Color32::from_rgb(218, 54, 51),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    created: Instant,
}

impl Toast {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created) >= TOAST_DURATION
    }
}

#[derive(Default)]
pub struct Toasts {
    items: Vec<Toast>,
}

impl Toasts {
    pub fn push_at(&mut self, kind: ToastKind, message: impl Into<String>, now: Instant) {
        let message = message.into();
        match kind {
            ToastKind::Success => crate::log_info!("toast: {}", message),
            ToastKind::Error => crate::log_warn!("toast: {}", message),
        }
        self.items.push(Toast {
            kind,
            message,
            created: now,
        });
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push_at(ToastKind::Success, message, Instant::now());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push_at(ToastKind::Error, message, Instant::now());
    }

    pub fn prune(&mut self, now: Instant) {
        self.items.retain(|t| !t.is_expired(now));
    }

    pub fn items(&self) -> &[Toast] {
        &self.items
    }

    pub fn show(&mut self, ctx: &egui::Context) {
        self.prune(Instant::now());
        if self.items.is_empty() {
            return;
        }
        egui::Area::new("toasts")
            .anchor(egui::Align2::RIGHT_BOTTOM, [-16.0, -16.0])
            .order(egui::Order::Foreground)
            .interactable(false)
            .show(ctx, |ui| {
                for toast in &self.items {
                    egui::Frame::none()
                        .fill(toast.kind.color())
                        .rounding(6.0)
                        .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                        .show(ui, |ui| {
                            ui.label(egui::RichText::new(&toast.message).color(Color32::WHITE));
                        });
                    ui.add_space(6.0);
                }
            });
        // keep ticking until the last toast fades
        ctx.request_repaint_after(Duration::from_millis(250));
    }
}

//! egui bar canvas.

use std::collections::BTreeMap;

use eframe::egui;

use crate::data::bars::{BarGeometry, BarPainter};
use crate::data::render::RenderFrame;

/// Retained bar rectangles in surface coordinates, keyed by display bin.
///
/// Only the diff produced by the render pipeline mutates it; painting reads it every UI
/// frame without recomputing anything.
#[derive(Debug, Default)]
pub struct BarCanvas {
    bars: BTreeMap<usize, egui::Rect>,
}

fn to_rect(g: BarGeometry) -> egui::Rect {
    egui::Rect::from_min_size(
        egui::pos2(g.x as f32, g.y as f32),
        egui::vec2(g.w.max(0.0) as f32, g.h.max(0.0) as f32),
    )
}

impl BarPainter for BarCanvas {
    fn create_bar(&mut self, bin: usize, geometry: BarGeometry) {
        self.bars.insert(bin, to_rect(geometry));
    }

    fn update_bar(&mut self, bin: usize, geometry: BarGeometry) {
        if let Some(rect) = self.bars.get_mut(&bin) {
            *rect = to_rect(geometry);
        }
    }

    fn remove_bar(&mut self, bin: usize) {
        self.bars.remove(&bin);
    }
}

impl BarCanvas {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Draw bars and axes into `rect`, clipped to it.
    pub fn paint(&self, painter: &egui::Painter, rect: egui::Rect, frame: Option<&RenderFrame>) {
        let visuals = painter.ctx().style().visuals.clone();
        let painter = painter.with_clip_rect(rect);
        painter.rect_filled(rect, 0.0, visuals.extreme_bg_color);

        let offset = rect.min.to_vec2();
        let fill = visuals.selection.bg_fill;
        for bar in self.bars.values() {
            painter.rect_filled(bar.translate(offset), 0.0, fill);
        }

        let Some(frame) = frame else {
            return;
        };
        let grid = egui::Stroke::new(1.0, visuals.weak_text_color().gamma_multiply(0.3));
        let font = egui::FontId::monospace(11.0);
        for (value, label) in &frame.y_ticks {
            let y = rect.top() + frame.scales.y.apply(*value) as f32;
            painter.line_segment([egui::pos2(rect.left(), y), egui::pos2(rect.right(), y)], grid);
            if !label.is_empty() {
                painter.text(
                    egui::pos2(rect.left() + 4.0, y),
                    egui::Align2::LEFT_BOTTOM,
                    label,
                    font.clone(),
                    visuals.text_color(),
                );
            }
        }

        // channel labels at both ends of the visible range
        let (first, last) = frame.scales.visible_channels();
        let bottom = rect.bottom() - 2.0;
        painter.text(
            egui::pos2(rect.left() + 4.0, bottom),
            egui::Align2::LEFT_BOTTOM,
            format!("{:.0}", first.max(0.0)),
            font.clone(),
            visuals.weak_text_color(),
        );
        painter.text(
            egui::pos2(rect.right() - 4.0, bottom),
            egui::Align2::RIGHT_BOTTOM,
            format!("{:.0}", last.max(0.0)),
            font,
            visuals.weak_text_color(),
        );
    }
}

//! Overlay rendering.
//!
//! Paints [`DrawInstruction`]s onto a frame: a thick outline in the rule
//! color, a filled label strip above the box and white label text.

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use anyhow::{anyhow, Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::compliance::{Color, DrawInstruction};

const LABEL_HEIGHT: u32 = 25;
const TEXT_INSET_Y: i32 = 4;
/// Label width per character when no font is loaded.
const FALLBACK_CHAR_WIDTH: u32 = 11;

#[derive(Clone, Debug)]
pub struct RenderSettings {
    pub box_thickness: u32,
    pub font_scale: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            box_thickness: 3,
            font_scale: 20.0,
        }
    }
}

pub struct Renderer {
    font: Option<FontArc>,
    settings: RenderSettings,
}

impl Renderer {
    pub fn new(font: Option<FontArc>, settings: RenderSettings) -> Self {
        if font.is_none() {
            log::warn!("no overlay font configured; labels are drawn without text");
        }
        Self { font, settings }
    }

    /// Load a TrueType/OpenType font from disk.
    pub fn load_font(path: &Path) -> Result<FontArc> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read font {}", path.display()))?;
        FontArc::try_from_vec(bytes)
            .map_err(|e| anyhow!("invalid font {}: {}", path.display(), e))
    }

    pub fn draw(&self, canvas: &mut RgbImage, instructions: &[DrawInstruction]) {
        for instruction in instructions {
            self.draw_one(canvas, instruction);
        }
    }

    fn draw_one(&self, canvas: &mut RgbImage, instruction: &DrawInstruction) {
        let bbox = instruction.bbox.clamped(canvas.width(), canvas.height());
        let x1 = bbox.x1.round() as i32;
        let y1 = bbox.y1.round() as i32;
        let width = (bbox.x2.round() as i32 - x1).max(0) as u32;
        let height = (bbox.y2.round() as i32 - y1).max(0) as u32;
        if width == 0 || height == 0 {
            log::debug!("skipping degenerate box for {}", instruction.class_name);
            return;
        }

        let color = rgb(instruction.color);
        for inset in 0..self.settings.box_thickness {
            let shrink = inset * 2;
            if width <= shrink || height <= shrink {
                break;
            }
            let rect = Rect::at(x1 + inset as i32, y1 + inset as i32)
                .of_size(width - shrink, height - shrink);
            draw_hollow_rect_mut(canvas, rect, color);
        }

        let scale = PxScale::from(self.settings.font_scale);
        let text_width = match &self.font {
            Some(font) => text_size(scale, font, &instruction.text).0,
            None => instruction.text.chars().count() as u32 * FALLBACK_CHAR_WIDTH,
        }
        .max(1);
        // Above the box when there is room, otherwise inside its top edge.
        let label_top = if y1 >= LABEL_HEIGHT as i32 {
            y1 - LABEL_HEIGHT as i32
        } else {
            y1
        };
        draw_filled_rect_mut(
            canvas,
            Rect::at(x1, label_top).of_size(text_width, LABEL_HEIGHT),
            color,
        );

        if let Some(font) = &self.font {
            draw_text_mut(
                canvas,
                rgb(Color::White),
                x1,
                label_top + TEXT_INSET_Y,
                scale,
                font,
                &instruction.text,
            );
        }
    }
}

fn rgb(color: Color) -> Rgb<u8> {
    Rgb(color.rgb())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::Verdict;
    use crate::detect::PixelBox;

    fn instruction(bbox: PixelBox, color: Color) -> DrawInstruction {
        DrawInstruction {
            bbox,
            color,
            text: "SAFE: HELMET".to_string(),
            verdict: Verdict::Compliant,
            class_name: "Hardhat".to_string(),
            confidence: 0.9,
        }
    }

    #[test]
    fn draws_outline_and_label_strip() {
        let mut canvas = RgbImage::new(100, 100);
        let renderer = Renderer::new(None, RenderSettings::default());
        renderer.draw(
            &mut canvas,
            &[instruction(PixelBox::new(30.0, 40.0, 70.0, 90.0), Color::Green)],
        );

        let green = Rgb([0u8, 255, 0]);
        // Outline, outer and innermost ring.
        assert_eq!(*canvas.get_pixel(30, 60), green);
        assert_eq!(*canvas.get_pixel(32, 60), green);
        // Interior untouched.
        assert_eq!(*canvas.get_pixel(50, 60), Rgb([0u8, 0, 0]));
        // Label strip above the box.
        assert_eq!(*canvas.get_pixel(31, 20), green);
    }

    #[test]
    fn degenerate_and_offscreen_boxes_are_skipped() {
        let mut canvas = RgbImage::new(10, 10);
        let renderer = Renderer::new(None, RenderSettings::default());
        renderer.draw(
            &mut canvas,
            &[instruction(PixelBox::new(20.0, 20.0, 40.0, 40.0), Color::Red)],
        );
        assert!(canvas.pixels().all(|p| *p == Rgb([0u8, 0, 0])));
    }
}

//! Closing-price line chart rendered to PNG.
//!
//! Layout: title across the top, price ticks and a rotated "Price (JPY)"
//! label on the left, date ticks and a "Date" label along the bottom. Text
//! is rasterized from the bundled DejaVu Sans face so output does not depend
//! on fonts installed on the host.
use super::ChartRenderer;
use crate::error::{Error, Result};
use crate::market::PriceSeries;
use crate::util::write_with_parents;
use ab_glyph::{point, Font, FontRef, GlyphId, PxScale, ScaleFont};
use std::path::Path;

const FONT: &[u8] = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/fonts/DejaVuSans.ttf"));

type Rgb = [u8; 3];

const BACKGROUND: Rgb = [0xff, 0xff, 0xff];
const GRID: Rgb = [0xdd, 0xdd, 0xdd];
const AXIS: Rgb = [0x33, 0x33, 0x33];
const TEXT: Rgb = [0x22, 0x22, 0x22];
const LINE: Rgb = [0xd8, 0x1b, 0x60];
const GRID_DIVISIONS: u32 = 5;
const DATE_TICKS: usize = 5;

const TITLE_PX: f32 = 40.0;
const LABEL_PX: f32 = 28.0;
const TICK_PX: f32 = 22.0;
const X_LABEL: &str = "Date";
const Y_LABEL: &str = "Price (JPY)";

/// Space reserved around the plot area, in pixels.
#[derive(Debug, Clone, Copy)]
struct Margins {
    left: u32,
    right: u32,
    top: u32,
    bottom: u32,
}

pub struct PixmapChart {
    width: u32,
    height: u32,
    margins: Margins,
    line_width: u32,
}

impl Default for PixmapChart {
    // 6x4 inches at 200 dpi
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            margins: Margins {
                left: 150,
                right: 60,
                top: 100,
                bottom: 120,
            },
            line_width: 4,
        }
    }
}

impl PixmapChart {
    #[cfg(test)]
    pub fn with_size(width: u32, height: u32) -> Result<Self> {
        let chart = Self {
            width,
            height,
            ..Self::default()
        };
        let Margins {
            left,
            right,
            top,
            bottom,
        } = chart.margins;
        if width <= left + right || height <= top + bottom {
            return Err(Error::InvalidInput(format!(
                "chart size {width}x{height} leaves no plot area"
            )));
        }
        Ok(chart)
    }

    /// Render into PNG bytes.
    pub fn encode(&self, series: &PriceSeries, title: &str) -> Result<Vec<u8>> {
        let closes = series.closes();
        if closes.is_empty() {
            return Err(Error::NoData {
                ticker: series.ticker().to_string(),
            });
        }
        let font = FontRef::try_from_slice(FONT)
            .map_err(|err| Error::Render(format!("bundled font: {err}")))?;
        let mut canvas = Canvas::new(self.width, self.height, BACKGROUND);
        let (left, top) = (self.margins.left, self.margins.top);
        let right = self.width - self.margins.right;
        let bottom = self.height - self.margins.bottom;

        let (mut lo, mut hi) = closes
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
        if (hi - lo).abs() < f64::EPSILON {
            lo -= 1.0;
            hi += 1.0;
        }
        let decimals: usize = if hi - lo >= 50.0 { 0 } else { 2 };
        for step in 0..=GRID_DIVISIONS {
            let y = top + (bottom - top) * step / GRID_DIVISIONS;
            canvas.line((left, y), (right, y), 1, GRID);
            let value = hi - (hi - lo) * f64::from(step) / f64::from(GRID_DIVISIONS);
            let label = text_mask(&font, &format!("{value:.decimals$}"), TICK_PX);
            let x = i64::from(left) - 12 - i64::from(label.width);
            canvas.blit(&label, x, i64::from(y) - i64::from(label.height / 2), TEXT);
        }

        let plot_w = f64::from(right - left);
        let plot_h = f64::from(bottom - top);
        let last = closes.len().saturating_sub(1).max(1) as f64;
        let points: Vec<(u32, u32)> = closes
            .iter()
            .enumerate()
            .map(|(idx, close)| {
                let x = if closes.len() == 1 {
                    plot_w / 2.0
                } else {
                    plot_w * idx as f64 / last
                };
                let y = plot_h * (hi - close) / (hi - lo);
                (left + x.round() as u32, top + y.round() as u32)
            })
            .collect();

        for idx in tick_indices(points.len()) {
            let x = points[idx].0;
            canvas.line((x, top), (x, bottom), 1, GRID);
            let date = series.bars()[idx].date.format("%m/%d").to_string();
            let label = text_mask(&font, &date, TICK_PX);
            let x = i64::from(x) - i64::from(label.width / 2);
            canvas.blit(&label, x, i64::from(bottom) + 12, TEXT);
        }
        canvas.line((left, bottom), (right, bottom), 2, AXIS);
        canvas.line((left, top), (left, bottom), 2, AXIS);

        if let [only] = points.as_slice() {
            canvas.line(*only, *only, self.line_width * 2, LINE);
        }
        for pair in points.windows(2) {
            canvas.line(pair[0], pair[1], self.line_width, LINE);
        }

        let title = text_mask(&font, title, TITLE_PX);
        let x = (i64::from(self.width) - i64::from(title.width)) / 2;
        let y = (i64::from(top) - i64::from(title.height)) / 2;
        canvas.blit(&title, x, y, TEXT);

        let x_label = text_mask(&font, X_LABEL, LABEL_PX);
        let x = i64::from(left + right) / 2 - i64::from(x_label.width / 2);
        let y = i64::from(self.height) - i64::from(self.margins.bottom / 2) + 8;
        canvas.blit(&x_label, x, y, TEXT);

        let y_label = text_mask(&font, Y_LABEL, LABEL_PX).rotated_ccw();
        let y = i64::from(top + bottom) / 2 - i64::from(y_label.height / 2);
        canvas.blit(&y_label, 16, y, TEXT);

        canvas.into_png()
    }
}

impl ChartRenderer for PixmapChart {
    fn render(&self, series: &PriceSeries, title: &str, output: &Path) -> Result<()> {
        let bytes = self.encode(series, title)?;
        write_with_parents(output, &bytes)
    }
}

/// Evenly spaced bar indices for date ticks, first and last included.
fn tick_indices(len: usize) -> Vec<usize> {
    if len <= 1 {
        return (0..len).collect();
    }
    let ticks = DATE_TICKS.min(len);
    let mut indices: Vec<usize> = (0..ticks)
        .map(|step| (len - 1) * step / (ticks - 1))
        .collect();
    indices.dedup();
    indices
}

/// Coverage values (0.0..=1.0) for a run of text, row-major.
struct Mask {
    width: u32,
    height: u32,
    coverage: Vec<f32>,
}

impl Mask {
    fn rotated_ccw(&self) -> Mask {
        let mut coverage = vec![0.0; self.coverage.len()];
        for y in 0..self.height {
            for x in 0..self.width {
                let rx = y;
                let ry = self.width - 1 - x;
                coverage[(ry * self.height + rx) as usize] =
                    self.coverage[(y * self.width + x) as usize];
            }
        }
        Mask {
            width: self.height,
            height: self.width,
            coverage,
        }
    }
}

fn text_mask(font: &FontRef<'_>, text: &str, px: f32) -> Mask {
    let scaled = font.as_scaled(PxScale::from(px));
    let ascent = scaled.ascent();
    let mut caret = 0.0_f32;
    let mut previous: Option<GlyphId> = None;
    let mut glyphs = Vec::new();
    for ch in text.chars().filter(|ch| !ch.is_control()) {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        glyphs.push(id.with_scale_and_position(scaled.scale(), point(caret, ascent)));
        caret += scaled.h_advance(id);
        previous = Some(id);
    }

    let width = caret.ceil().max(1.0) as u32;
    let height = (ascent - scaled.descent()).ceil().max(1.0) as u32;
    let mut coverage = vec![0.0_f32; (width * height) as usize];
    for glyph in glyphs {
        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, c| {
            let x = bounds.min.x as i64 + i64::from(gx);
            let y = bounds.min.y as i64 + i64::from(gy);
            if x < 0 || y < 0 || x >= i64::from(width) || y >= i64::from(height) {
                return;
            }
            let cell = &mut coverage[(y as u32 * width + x as u32) as usize];
            *cell = (*cell + c).min(1.0);
        });
    }
    Mask {
        width,
        height,
        coverage,
    }
}

struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    fn new(width: u32, height: u32, fill: Rgb) -> Self {
        let pixels = fill.repeat((width * height) as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    fn offset(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        Some(((y as usize) * self.width as usize + x as usize) * 3)
    }

    fn put(&mut self, x: i64, y: i64, color: Rgb) {
        if let Some(offset) = self.offset(x, y) {
            self.pixels[offset..offset + 3].copy_from_slice(&color);
        }
    }

    fn blend(&mut self, x: i64, y: i64, color: Rgb, alpha: f32) {
        let Some(offset) = self.offset(x, y) else {
            return;
        };
        for (channel, target) in self.pixels[offset..offset + 3].iter_mut().zip(color) {
            let mixed = f32::from(*channel) * (1.0 - alpha) + f32::from(target) * alpha;
            *channel = mixed.round().clamp(0.0, 255.0) as u8;
        }
    }

    /// Composite `mask` with its top-left corner at (`x`, `y`).
    fn blit(&mut self, mask: &Mask, x: i64, y: i64, color: Rgb) {
        for my in 0..mask.height {
            for mx in 0..mask.width {
                let alpha = mask.coverage[(my * mask.width + mx) as usize];
                if alpha > 0.0 {
                    self.blend(x + i64::from(mx), y + i64::from(my), color, alpha);
                }
            }
        }
    }

    fn dot(&mut self, x: i64, y: i64, thickness: u32, color: Rgb) {
        let half = i64::from(thickness / 2);
        let span = i64::from(thickness.max(1));
        for dy in 0..span {
            for dx in 0..span {
                self.put(x - half + dx, y - half + dy, color);
            }
        }
    }

    /// Bresenham line stamped with a square brush.
    fn line(&mut self, from: (u32, u32), to: (u32, u32), thickness: u32, color: Rgb) {
        let (mut x, mut y) = (i64::from(from.0), i64::from(from.1));
        let (x1, y1) = (i64::from(to.0), i64::from(to.1));
        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.dot(x, y, thickness, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn into_png(self) -> Result<Vec<u8>> {
        let encode_err = |err: png::EncodingError| Error::Render(format!("png encoding: {err}"));
        let mut out = Vec::new();
        let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().map_err(encode_err)?;
        writer.write_image_data(&self.pixels).map_err(encode_err)?;
        writer.finish().map_err(encode_err)?;
        Ok(out)
    }
}

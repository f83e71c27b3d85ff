use crate::pipeline::color::Color;
use crate::pipeline::scene::{Heatmap, WaveformTrace};

/// Axis-aligned pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn inset(&self, by: u32) -> Rect {
        Rect {
            x: self.x + by,
            y: self.y + by,
            w: self.w.saturating_sub(by * 2),
            h: self.h.saturating_sub(by * 2),
        }
    }
}

/// Largest accepted canvas side, in pixels.
pub const MAX_DIMENSION: u32 = 16384;

/// Reject sizes that are empty or too large to allocate as RGBA8.
pub fn check_size(width: u32, height: u32) -> anyhow::Result<()> {
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        anyhow::bail!(
            "Image size {}x{} is outside 1x1 to {}x{}",
            width,
            height,
            MAX_DIMENSION,
            MAX_DIMENSION
        );
    }
    Ok(())
}

/// Byte length of an RGBA8 frame.
pub fn frame_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

/// RGBA8 frame buffer.
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        let mut pixels = Vec::with_capacity(frame_len(width, height));
        for _ in 0..width as usize * height as usize {
            pixels.extend_from_slice(&background.to_rgba(255));
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    fn put(&mut self, x: i64, y: i64, color: Color) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let idx = ((y as u32 * self.width + x as u32) * 4) as usize;
        self.pixels[idx..idx + 4].copy_from_slice(&color.to_rgba(255));
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let x_end = (rect.x + rect.w).min(self.width);
        let y_end = (rect.y + rect.h).min(self.height);
        for y in rect.y..y_end {
            for x in rect.x..x_end {
                self.put(x as i64, y as i64, color);
            }
        }
    }

    pub fn draw_line(&mut self, from: (i64, i64), to: (i64, i64), color: Color) {
        let (mut x0, mut y0) = from;
        let (x1, y1) = to;
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.put(x0, y0, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    /// Stretch a heatmap over `rect`, nearest-neighbour. With `flip`, row 0
    /// lands at the bottom (low frequencies at the bottom of a spectrogram).
    pub fn blit_heatmap(&mut self, heatmap: &Heatmap, rect: Rect, flip: bool) {
        if heatmap.is_empty() || rect.w == 0 || rect.h == 0 {
            return;
        }
        for py in 0..rect.h {
            let mut row = (py as usize * heatmap.rows) / rect.h as usize;
            if flip {
                row = heatmap.rows - 1 - row;
            }
            for px in 0..rect.w {
                let col = (px as usize * heatmap.cols) / rect.w as usize;
                self.put(
                    (rect.x + px) as i64,
                    (rect.y + py) as i64,
                    heatmap.cell(row, col),
                );
            }
        }
    }

    /// Draw a waveform trace centered vertically in `rect`, scaled to its
    /// own peak, with a zero axis.
    pub fn draw_trace(&mut self, trace: &WaveformTrace, rect: Rect, color: Color, axis: Color) {
        if rect.w < 2 || rect.h < 2 {
            return;
        }
        let mid = rect.y as i64 + rect.h as i64 / 2;
        let left = rect.x as i64;
        let right = left + rect.w as i64 - 1;
        self.draw_line((left, mid), (right, mid), axis);

        let peak = trace.peak();
        if trace.points.is_empty() || peak <= 0.0 {
            return;
        }
        let span = trace.source_len.saturating_sub(1).max(1) as f64;
        let half = (rect.h as f64 / 2.0 - 1.0).max(1.0);

        let to_px = |index: usize, value: f32| {
            let x = left + ((index as f64 / span) * (rect.w as f64 - 1.0)).round() as i64;
            let y = mid - ((value / peak) as f64 * half).round() as i64;
            (x, y)
        };

        let mut prev = to_px(trace.points[0].index, trace.points[0].value);
        self.put(prev.0, prev.1, color);
        for p in &trace.points[1..] {
            let next = to_px(p.index, p.value);
            self.draw_line(prev, next, color);
            prev = next;
        }
    }
}

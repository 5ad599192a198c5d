//! Intensity-to-color mapping with an adjustable display window.

use crate::enums::ColorMode;

use bytemuck::{Pod, Zeroable};

/// One display pixel. `a` ramps with the display window so the
/// over-modes of the compositor have an opacity source.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 0 };

    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Alpha as a blend weight in `[0, 1]`.
    #[inline]
    pub fn alpha(&self) -> f64 {
        self.a as f64 / 255.0
    }
}

/// Precomputed color table over a fixed normalized intensity domain.
///
/// Rasters reaching the compositor are rescaled to the table's domain
/// (0..10000 for target/source, -10000..10000 for subtraction), so the
/// display window always operates in domain units regardless of the raw
/// intensity range of the underlying volume.
#[derive(Debug, Clone)]
pub struct LookupTable {
    min_data: i32,
    max_data: i32,
    min_display: f64,
    max_display: f64,
    mode: ColorMode,
    table: Vec<Color>,
}

impl Default for LookupTable {
    fn default() -> Self {
        let mut lut = Self {
            min_data: 0,
            max_data: 1,
            min_display: 0.0,
            max_display: 1.0,
            mode: ColorMode::Luminance,
            table: Vec::new(),
        };
        lut.update();
        lut
    }
}

impl LookupTable {
    pub fn new(min_data: i32, max_data: i32) -> Self {
        let mut lut = Self {
            min_data,
            max_data,
            min_display: min_data as f64,
            max_display: max_data as f64,
            mode: ColorMode::Luminance,
            table: Vec::new(),
        };
        lut.update();
        lut
    }

    /// Reset the table domain; the display window spans it fully.
    pub fn initialize(&mut self, min_data: i32, max_data: i32) {
        self.min_data = min_data;
        self.max_data = max_data;
        self.min_display = min_data as f64;
        self.max_display = max_data as f64;
        self.update();
    }

    pub fn min_display(&self) -> f64 {
        self.min_display
    }

    pub fn max_display(&self) -> f64 {
        self.max_display
    }

    pub fn set_min_display(&mut self, value: f64) {
        self.min_display = value.clamp(self.min_data as f64, self.max_data as f64);
        self.update();
    }

    pub fn set_max_display(&mut self, value: f64) {
        self.max_display = value.clamp(self.min_data as f64, self.max_data as f64);
        self.update();
    }

    pub fn color_mode(&self) -> ColorMode {
        self.mode
    }

    pub fn set_color_mode(&mut self, mode: ColorMode) {
        self.mode = mode;
        self.update();
    }

    /// Color for a domain intensity, clamped to the table ends.
    #[inline]
    pub fn at(&self, value: f64) -> Color {
        let index = (value.round() as i64 - self.min_data as i64)
            .clamp(0, self.table.len() as i64 - 1) as usize;
        self.table[index]
    }

    fn update(&mut self) {
        let span = (self.max_display - self.min_display).max(1.0);
        let size = (self.max_data - self.min_data + 1).max(1) as usize;
        self.table.clear();
        self.table.reserve(size);
        for i in 0..size {
            let value = self.min_data as f64 + i as f64;
            let ramp = ((value - self.min_display) / span).clamp(0.0, 1.0);
            self.table.push(self.shade(ramp));
        }
    }

    fn shade(&self, ramp: f64) -> Color {
        let level = (ramp * 255.0).round() as u8;
        match self.mode {
            ColorMode::Red => Color::new(level, 0, 0, level),
            ColorMode::Green => Color::new(0, level, 0, level),
            ColorMode::Blue => Color::new(0, 0, level, level),
            ColorMode::Luminance => Color::new(level, level, level, level),
            ColorMode::Rainbow => {
                // Blue (cold) through green to red (hot).
                let (r, g, b) = hsv_to_rgb(240.0 * (1.0 - ramp), 1.0, 1.0);
                Color::new(r, g, b, level)
            }
        }
    }
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (u8, u8, u8) {
    let c = v * s;
    let hp = (h / 60.0).rem_euclid(6.0);
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r, g, b) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    (
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_clamps_below_and_above() {
        let mut lut = LookupTable::new(0, 10000);
        lut.set_min_display(2000.0);
        lut.set_max_display(8000.0);
        assert_eq!(lut.at(0.0), lut.at(2000.0));
        assert_eq!(lut.at(8000.0), lut.at(10000.0));
        assert_eq!(lut.at(0.0).r, 0);
        assert_eq!(lut.at(10000.0).r, 255);
    }

    #[test]
    fn out_of_domain_values_clamp_to_table_ends() {
        let lut = LookupTable::new(0, 10000);
        assert_eq!(lut.at(-500.0), lut.at(0.0));
        assert_eq!(lut.at(20000.0), lut.at(10000.0));
    }

    #[test]
    fn alpha_follows_the_ramp() {
        let lut = LookupTable::new(0, 100);
        assert_eq!(lut.at(0.0).a, 0);
        assert_eq!(lut.at(100.0).a, 255);
        assert_eq!(lut.at(50.0).a, 128);
    }

    #[test]
    fn color_modes_fill_their_channel() {
        let mut lut = LookupTable::new(0, 100);
        lut.set_color_mode(ColorMode::Red);
        let c = lut.at(100.0);
        assert_eq!((c.r, c.g, c.b), (255, 0, 0));
        lut.set_color_mode(ColorMode::Blue);
        let c = lut.at(100.0);
        assert_eq!((c.r, c.g, c.b), (0, 0, 255));
    }
}

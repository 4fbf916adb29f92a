use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `RRGGBB`, with or without a leading `#`.
    pub fn parse_hex(value: &str) -> Option<Self> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Font {
    pub size: i32,
    pub bold: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

/// Launcher colours that the table borrows for separators and the scrollbar.
#[derive(Debug, Clone, PartialEq)]
pub struct Skin {
    pub background: Color,
    pub button_border: Color,
    pub button_fore_active: Color,
}

impl Default for Skin {
    fn default() -> Self {
        Self {
            background: Color::new(153, 127, 172),
            button_border: Color::new(97, 81, 110),
            button_fore_active: Color::new(189, 168, 206),
        }
    }
}

/// Raw pixel access to a drawing surface while it is locked.
pub trait PixelTarget {
    fn set_pixel(&mut self, x: i32, y: i32, color: Color);
    fn release(&mut self);
}

/// Scoped lock on a surface's pixels. Dropping it releases the surface,
/// whatever path the caller leaves by.
pub struct LockedBits<'a> {
    target: &'a mut dyn PixelTarget,
}

impl<'a> LockedBits<'a> {
    pub fn new(target: &'a mut dyn PixelTarget) -> Self {
        Self { target }
    }

    /// Nearest-neighbour copy of `image` scaled into `dst`.
    pub fn blit(&mut self, image: &FlagImage, dst: Rect) {
        if image.width <= 0 || image.height <= 0 {
            return;
        }
        for dy in 0..dst.height {
            let sy = dy * image.height / dst.height;
            for dx in 0..dst.width {
                let sx = dx * image.width / dst.width;
                if let Some(color) = image.pixel(sx, sy) {
                    self.target.set_pixel(dst.x + dx, dst.y + dy, color);
                }
            }
        }
    }
}

impl Drop for LockedBits<'_> {
    fn drop(&mut self) {
        self.target.release();
        trace!("Released locked bits");
    }
}

/// The 2D backend the table paints through.
pub trait Drawer {
    fn font_height(&self, font: &Font) -> i32;
    fn measure_text(&self, text: &str, font: &Font) -> Size;
    fn clear(&mut self, color: Color, rect: Rect);
    fn draw_clipped_text(&mut self, text: &str, font: &Font, x: i32, y: i32, max_width: i32);
    fn lock_bits(&mut self) -> LockedBits<'_>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlagImage {
    pub width: i32,
    pub height: i32,
    pub pixels: Vec<Color>,
}

impl FlagImage {
    pub fn solid(width: i32, height: i32, color: Color) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; (width.max(0) * height.max(0)) as usize],
        }
    }

    fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }
}

/// Flag codes and the images fetched for them. The two lists are filled
/// independently, so a code may not have its image yet.
#[derive(Debug, Default, Clone)]
pub struct FlagCache {
    codes: Vec<String>,
    images: Vec<FlagImage>,
}

impl FlagCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_code(&mut self, code: impl Into<String>) {
        self.codes.push(code.into());
    }

    pub fn add_image(&mut self, image: FlagImage) {
        self.images.push(image);
    }

    pub fn get(&self, code: &str) -> Option<&FlagImage> {
        let i = self.codes.iter().position(|c| c == code)?;
        self.images.get(i)
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub const CHAR_WIDTH: i32 = 8;

    #[derive(Debug, Clone, PartialEq)]
    pub enum DrawOp {
        Clear(Color, Rect),
        Text { text: String, x: i32, y: i32, max_width: i32 },
    }

    /// Drawer double that keeps every call for inspection.
    #[derive(Debug, Default)]
    pub struct RecordingDrawer {
        pub ops: Vec<DrawOp>,
        pub pixels: Vec<(i32, i32, Color)>,
        pub locks: usize,
        pub releases: usize,
    }

    impl RecordingDrawer {
        pub fn texts(&self) -> Vec<(String, i32, i32)> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    DrawOp::Text { text, x, y, .. } => Some((text.clone(), *x, *y)),
                    _ => None,
                })
                .collect()
        }

        pub fn clears(&self) -> Vec<(Color, Rect)> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    DrawOp::Clear(c, r) => Some((*c, *r)),
                    _ => None,
                })
                .collect()
        }
    }

    impl PixelTarget for RecordingDrawer {
        fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
            self.pixels.push((x, y, color));
        }

        fn release(&mut self) {
            self.releases += 1;
        }
    }

    impl Drawer for RecordingDrawer {
        fn font_height(&self, font: &Font) -> i32 {
            font.size
        }

        fn measure_text(&self, text: &str, font: &Font) -> Size {
            Size {
                width: text.chars().count() as i32 * CHAR_WIDTH,
                height: font.size,
            }
        }

        fn clear(&mut self, color: Color, rect: Rect) {
            self.ops.push(DrawOp::Clear(color, rect));
        }

        fn draw_clipped_text(&mut self, text: &str, _font: &Font, x: i32, y: i32, max_width: i32) {
            self.ops.push(DrawOp::Text {
                text: text.to_string(),
                x,
                y,
                max_width,
            });
        }

        fn lock_bits(&mut self) -> LockedBits<'_> {
            self.locks += 1;
            LockedBits::new(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingDrawer;
    use super::*;

    #[test]
    fn parses_hex_colours() {
        assert_eq!(Color::parse_hex("#997FAC"), Some(Color::new(153, 127, 172)));
        assert_eq!(Color::parse_hex("61516e"), Some(Color::new(97, 81, 110)));
        assert_eq!(Color::parse_hex("12345"), None);
        assert_eq!(Color::parse_hex("zz0000"), None);
    }

    #[test]
    fn flag_lookup_needs_matching_image() {
        let mut flags = FlagCache::new();
        flags.add_code("de");
        flags.add_code("us");
        flags.add_image(FlagImage::solid(16, 11, Color::new(1, 2, 3)));
        assert!(flags.get("de").is_some());
        assert!(flags.get("us").is_none());
        assert!(flags.get("fr").is_none());
    }

    #[test]
    fn locked_bits_release_on_drop() {
        let mut drawer = RecordingDrawer::default();
        {
            let mut bits = drawer.lock_bits();
            bits.blit(&FlagImage::solid(2, 2, Color::new(9, 9, 9)), Rect::new(5, 5, 4, 2));
        }
        assert_eq!(drawer.releases, 1);
        assert_eq!(drawer.pixels.len(), 8);
        assert!(drawer.pixels.iter().all(|&(x, y, _)| (5..9).contains(&x) && (5..7).contains(&y)));
    }
}

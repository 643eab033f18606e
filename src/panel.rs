//! # LED Matrix Panel Interface
//!
//! The scheduler never touches pixels directly. It talks to a [`Panel`], a
//! deliberately tiny text sink modelled on what a HUB75 matrix driver exposes:
//! clear, set cursor, set text color, print, and an RGB → 5-6-5 conversion.
//!
//! Two implementations are provided:
//! - [`GraphicsPanel`]: draws monospace text onto any embedded-graphics
//!   `Rgb565` target (an in-memory [`Framebuffer`], or a desktop window with
//!   the `simulator` feature)
//! - [`ConsolePanel`]: keeps the page as colored text and prints it to the
//!   terminal, for development without hardware

use embedded_graphics::{
    mono_font::{ascii::FONT_5X8, MonoFont, MonoTextStyle},
    pixelcolor::{raw::RawU16, IntoStorage, Rgb565, Rgb888},
    prelude::*,
    text::{Baseline, Text},
};
use std::convert::Infallible;

/// Panel width in pixels (96×48 HUB75 matrix)
pub const PANEL_WIDTH: u32 = 96;
/// Panel height in pixels
pub const PANEL_HEIGHT: u32 = 48;

/// Text sink for one LED matrix panel.
///
/// Text rendering advances the cursor itself: printing moves it right, a `\n`
/// moves it to the start of the next line. Colors are packed 5-6-5 values as
/// produced by [`Panel::color565`].
pub trait Panel {
    /// Fill the panel with black.
    fn clear(&mut self);

    /// Move the draw cursor to pixel (x, y), top-left of the next glyph.
    fn set_cursor(&mut self, x: i32, y: i32);

    /// Set the color for subsequent text.
    fn set_text_color(&mut self, color: u16);

    /// Print text at the cursor. Embedded `\n` start a new line.
    fn print(&mut self, text: &str);

    /// Print text followed by a newline.
    fn println(&mut self, text: &str) {
        self.print(text);
        self.print("\n");
    }

    /// Pack 8-bit RGB into the panel's native 5-6-5 color.
    fn color565(&self, r: u8, g: u8, b: u8) -> u16 {
        Rgb565::from(Rgb888::new(r, g, b)).into_storage()
    }

    /// Push the drawn frame to the physical output, if the panel buffers.
    fn present(&mut self) {}
}

/// A draw target the [`GraphicsPanel`] can render into.
pub trait Surface: DrawTarget<Color = Rgb565> {
    /// Make the current contents visible.
    fn present(&mut self) {}
}

/// Monospace text renderer over an embedded-graphics target.
pub struct GraphicsPanel<D> {
    target: D,
    cursor: Point,
    color: Rgb565,
    font: &'static MonoFont<'static>,
}

impl<D: Surface> GraphicsPanel<D> {
    pub fn new(target: D) -> Self {
        Self {
            target,
            cursor: Point::zero(),
            color: Rgb565::WHITE,
            font: &FONT_5X8,
        }
    }

    /// Borrow the underlying draw target (used by tests to inspect pixels).
    pub fn target(&self) -> &D {
        &self.target
    }

    /// Current cursor position
    pub fn cursor(&self) -> Point {
        self.cursor
    }

    fn line_height(&self) -> i32 {
        self.font.character_size.height as i32
    }
}

impl<D: Surface> Panel for GraphicsPanel<D> {
    fn clear(&mut self) {
        self.target.clear(Rgb565::BLACK).ok();
    }

    fn set_cursor(&mut self, x: i32, y: i32) {
        self.cursor = Point::new(x, y);
    }

    fn set_text_color(&mut self, color: u16) {
        self.color = Rgb565::from(RawU16::new(color));
    }

    fn print(&mut self, text: &str) {
        let style = MonoTextStyle::new(self.font, self.color);

        for (index, segment) in text.split('\n').enumerate() {
            if index > 0 {
                self.cursor = Point::new(0, self.cursor.y + self.line_height());
            }
            if segment.is_empty() {
                continue;
            }

            // Text wrap is off: glyphs past the right edge are clipped
            let origin = self.cursor;
            self.cursor = Text::with_baseline(segment, origin, style, Baseline::Top)
                .draw(&mut self.target)
                .unwrap_or(origin);
        }
    }

    fn present(&mut self) {
        self.target.present();
    }
}

/// In-memory Rgb565 frame, the size of the physical panel by default.
#[derive(Clone, Debug)]
pub struct Framebuffer {
    size: Size,
    pixels: Vec<Rgb565>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Size::new(width, height),
            pixels: vec![Rgb565::BLACK; (width * height) as usize],
        }
    }

    /// Color at a point, `None` outside the frame.
    pub fn pixel(&self, point: Point) -> Option<Rgb565> {
        self.index(point).map(|i| self.pixels[i])
    }

    /// Number of non-black pixels
    pub fn lit_pixels(&self) -> usize {
        self.pixels.iter().filter(|&&c| c != Rgb565::BLACK).count()
    }

    /// Number of pixels of exactly this color
    pub fn count_color(&self, color: Rgb565) -> usize {
        self.pixels.iter().filter(|&&c| c == color).count()
    }

    fn index(&self, point: Point) -> Option<usize> {
        let (w, h) = (self.size.width as i32, self.size.height as i32);
        if (0..w).contains(&point.x) && (0..h).contains(&point.y) {
            Some((point.y * w + point.x) as usize)
        } else {
            None
        }
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new(PANEL_WIDTH, PANEL_HEIGHT)
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for Framebuffer {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let Some(i) = self.index(point) {
                self.pixels[i] = color;
            }
        }
        Ok(())
    }
}

impl Surface for Framebuffer {}

/// One run of same-colored text on a console line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub color: u16,
    pub text: String,
}

/// Text-mode panel for development: keeps the page as colored spans and, when
/// echoing, prints it to stdout on [`Panel::present`].
#[derive(Debug)]
pub struct ConsolePanel {
    lines: Vec<Vec<Span>>,
    row: usize,
    color: u16,
    echo: bool,
}

impl ConsolePanel {
    /// Silent panel; contents are only inspected through [`Self::text`].
    pub fn new() -> Self {
        Self {
            lines: vec![Vec::new()],
            row: 0,
            color: 0xFFFF,
            echo: false,
        }
    }

    /// Panel that prints every presented page to stdout.
    pub fn stdout() -> Self {
        Self {
            echo: true,
            ..Self::new()
        }
    }

    /// Plain text of each line on the panel.
    pub fn text(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|spans| spans.iter().map(|s| s.text.as_str()).collect())
            .collect()
    }

    /// Colored spans of one line.
    pub fn spans(&self, line: usize) -> &[Span] {
        self.lines.get(line).map(Vec::as_slice).unwrap_or(&[])
    }

    fn ensure_row(&mut self) {
        while self.lines.len() <= self.row {
            self.lines.push(Vec::new());
        }
    }

    fn append(&mut self, text: &str) {
        self.ensure_row();
        let color = self.color;
        let line = &mut self.lines[self.row];
        match line.last_mut() {
            Some(span) if span.color == color => span.text.push_str(text),
            _ => line.push(Span {
                color,
                text: text.to_string(),
            }),
        }
    }
}

impl Default for ConsolePanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Panel for ConsolePanel {
    fn clear(&mut self) {
        self.lines = vec![Vec::new()];
        self.row = 0;
    }

    fn set_cursor(&mut self, _x: i32, y: i32) {
        self.row = (y.max(0) / FONT_5X8.character_size.height as i32) as usize;
        self.ensure_row();
    }

    fn set_text_color(&mut self, color: u16) {
        self.color = color;
    }

    fn print(&mut self, text: &str) {
        for (index, segment) in text.split('\n').enumerate() {
            if index > 0 {
                self.row += 1;
                self.ensure_row();
            }
            if !segment.is_empty() {
                self.append(segment);
            }
        }
    }

    fn present(&mut self) {
        if !self.echo {
            return;
        }

        let border = "─".repeat(PANEL_WIDTH as usize / FONT_5X8.character_size.width as usize);
        println!("┌{}┐", border);
        for spans in &self.lines {
            let mut line = String::new();
            for span in spans {
                let rgb = Rgb888::from(Rgb565::from(RawU16::new(span.color)));
                line.push_str(&format!(
                    "\x1b[38;2;{};{};{}m{}",
                    rgb.r(),
                    rgb.g(),
                    rgb.b(),
                    span.text
                ));
            }
            println!("│{}\x1b[0m", line);
        }
        println!("└{}┘", border);
    }
}

/// Desktop window output using the embedded-graphics simulator.
#[cfg(feature = "simulator")]
pub mod simulator {
    use super::Surface;
    use embedded_graphics::{pixelcolor::Rgb565, prelude::*};
    use embedded_graphics_simulator::{
        OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
    };
    use std::convert::Infallible;

    pub struct SimulatorSurface {
        display: SimulatorDisplay<Rgb565>,
        window: Window,
    }

    impl SimulatorSurface {
        pub fn new(width: u32, height: u32) -> Self {
            let output_settings = OutputSettingsBuilder::new().scale(6).build();
            Self {
                display: SimulatorDisplay::new(Size::new(width, height)),
                window: Window::new("Transit Sign", &output_settings),
            }
        }
    }

    impl OriginDimensions for SimulatorSurface {
        fn size(&self) -> Size {
            self.display.size()
        }
    }

    impl DrawTarget for SimulatorSurface {
        type Color = Rgb565;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            self.display.draw_iter(pixels)
        }
    }

    impl Surface for SimulatorSurface {
        fn present(&mut self) {
            self.window.update(&self.display);
            if self.window.events().any(|e| matches!(e, SimulatorEvent::Quit)) {
                std::process::exit(0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_panel_tracks_lines_and_colors() {
        let mut panel = ConsolePanel::new();
        panel.set_text_color(0x1234);
        panel.print("AB");
        panel.set_text_color(0xFFFF);
        panel.print("C\nD");
        panel.println("E");

        assert_eq!(panel.text(), vec!["ABC", "DE", ""]);
        assert_eq!(panel.spans(0).len(), 2);
        assert_eq!(panel.spans(0)[0].color, 0x1234);
    }

    #[test]
    fn test_console_clear_resets_cursor() {
        let mut panel = ConsolePanel::new();
        panel.println("old");
        panel.clear();
        panel.set_cursor(0, 0);
        panel.print("new");
        assert_eq!(panel.text(), vec!["new"]);
    }

    #[test]
    fn test_graphics_panel_draws_text() {
        let mut panel = GraphicsPanel::new(Framebuffer::default());
        let red = panel.color565(255, 0, 0);
        panel.clear();
        panel.set_cursor(0, 0);
        panel.set_text_color(red);
        panel.print("HI");

        assert!(panel.target().count_color(Rgb565::RED) > 0);
        assert_eq!(panel.target().lit_pixels(), panel.target().count_color(Rgb565::RED));
        // Two 5px glyphs advance the cursor along the same line
        assert_eq!(panel.cursor(), Point::new(10, 0));
    }

    #[test]
    fn test_graphics_panel_newline_moves_down_one_line() {
        let mut panel = GraphicsPanel::new(Framebuffer::default());
        panel.print("A\nB");
        assert_eq!(panel.cursor(), Point::new(5, 8));
    }

    #[test]
    fn test_graphics_clear_blanks_frame() {
        let mut panel = GraphicsPanel::new(Framebuffer::default());
        panel.print("XYZ");
        assert!(panel.target().lit_pixels() > 0);
        panel.clear();
        assert_eq!(panel.target().lit_pixels(), 0);
        assert_eq!(panel.target().pixel(Point::new(0, 0)), Some(Rgb565::BLACK));
        assert_eq!(panel.target().pixel(Point::new(96, 0)), None);
    }

    #[test]
    fn test_color565_packs_extremes() {
        let panel = ConsolePanel::new();
        assert_eq!(panel.color565(0, 0, 0), 0x0000);
        assert_eq!(panel.color565(255, 255, 255), 0xFFFF);
        assert_eq!(panel.color565(255, 0, 0), 0xF800);
    }
}

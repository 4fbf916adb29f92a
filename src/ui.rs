use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Constraint, Layout, Position, Rect as Area},
    style::{Color as TermColor, Modifier, Style, Stylize},
    text::Line,
    widgets::Paragraph,
};
use std::ops::RangeInclusive;

use crate::drawer::{Color, Drawer, Font, LockedBits, PixelTarget, Rect, Size};
use crate::model::Model;

/// Pixels covered by one terminal cell.
pub const CELL_WIDTH: i32 = 8;
pub const CELL_HEIGHT: i32 = 16;

pub const BODY_FONT: Font = Font {
    size: 14,
    bold: false,
};
pub const TITLE_FONT: Font = Font {
    size: 16,
    bold: true,
};

const TEXT_COLOR: TermColor = TermColor::Rgb(255, 255, 255);

/// Pixel position a pointer event on cell (`col`, `row`) stands for.
pub fn cell_to_pixel(col: u16, row: u16) -> (i32, i32) {
    (
        col as i32 * CELL_WIDTH + CELL_WIDTH / 2,
        row as i32 * CELL_HEIGHT,
    )
}

pub fn cells_to_pixels(width: u16, height: u16) -> (i32, i32) {
    (width as i32 * CELL_WIDTH, height as i32 * CELL_HEIGHT)
}

fn to_term(color: Color) -> TermColor {
    TermColor::Rgb(color.r, color.g, color.b)
}

/// Row whose sample line `row * CELL_HEIGHT` lies closest to `y`.
fn pixel_row(y: i32) -> i32 {
    (y + CELL_HEIGHT / 2).div_euclid(CELL_HEIGHT)
}

/// Cells `n` with `n * cell` in `[start, start + len)`. A span that misses
/// every sample still covers its nearest cell, so thin bars stay visible.
fn covered_cells(start: i32, len: i32, cell: i32) -> RangeInclusive<i32> {
    let first = start.div_euclid(cell) + i32::from(start.rem_euclid(cell) != 0);
    let last = (start + len - 1).div_euclid(cell);
    if first <= last {
        first..=last
    } else {
        let nearest = (start + len / 2 + cell / 2).div_euclid(cell);
        nearest..=nearest
    }
}

/// Renders the widget's pixel space into a terminal buffer. Every cell is
/// sampled at `(col * CELL_WIDTH + CELL_WIDTH / 2, row * CELL_HEIGHT)`.
pub struct TerminalDrawer<'a> {
    buf: &'a mut Buffer,
    area: Area,
}

impl<'a> TerminalDrawer<'a> {
    pub fn new(buf: &'a mut Buffer, area: Area) -> Self {
        Self { buf, area }
    }

    fn cell_bg(&mut self, col: i32, row: i32, color: Color) {
        if col < 0 || row < 0 || col >= self.area.width as i32 || row >= self.area.height as i32 {
            return;
        }
        let pos = Position::new(self.area.x + col as u16, self.area.y + row as u16);
        if let Some(cell) = self.buf.cell_mut(pos) {
            cell.set_bg(to_term(color));
        }
    }
}

impl Drawer for TerminalDrawer<'_> {
    fn font_height(&self, font: &Font) -> i32 {
        font.size
    }

    fn measure_text(&self, text: &str, font: &Font) -> Size {
        Size {
            width: text.chars().count() as i32 * CELL_WIDTH,
            height: font.size,
        }
    }

    fn clear(&mut self, color: Color, rect: Rect) {
        if rect.width <= 0 || rect.height <= 0 {
            return;
        }
        let cols = covered_cells(rect.x - CELL_WIDTH / 2, rect.width, CELL_WIDTH);
        for row in covered_cells(rect.y, rect.height, CELL_HEIGHT) {
            for col in cols.clone() {
                self.cell_bg(col, row, color);
            }
        }
    }

    fn draw_clipped_text(&mut self, text: &str, font: &Font, x: i32, y: i32, max_width: i32) {
        let col = x.div_euclid(CELL_WIDTH);
        let row = pixel_row(y);
        let max_chars = (max_width / CELL_WIDTH).max(0) as usize;
        if col < 0 || row < 0 || max_chars == 0 {
            return;
        }
        if col >= self.area.width as i32 || row >= self.area.height as i32 {
            return;
        }
        let avail = (self.area.width as i32 - col) as usize;

        let mut style = Style::default().fg(TEXT_COLOR);
        if font.bold {
            style = style.add_modifier(Modifier::BOLD);
        }
        self.buf.set_stringn(
            self.area.x + col as u16,
            self.area.y + row as u16,
            text,
            max_chars.min(avail),
            style,
        );
    }

    fn lock_bits(&mut self) -> LockedBits<'_> {
        LockedBits::new(self)
    }
}

impl PixelTarget for TerminalDrawer<'_> {
    fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if (x - CELL_WIDTH / 2).rem_euclid(CELL_WIDTH) != 0 || y.rem_euclid(CELL_HEIGHT) != 0 {
            return;
        }
        self.cell_bg(
            (x - CELL_WIDTH / 2).div_euclid(CELL_WIDTH),
            y.div_euclid(CELL_HEIGHT),
            color,
        );
    }

    fn release(&mut self) {}
}

#[derive(Debug, Default)]
pub struct TableUI {}

impl TableUI {
    pub fn new() -> Self {
        Self {}
    }

    pub fn draw(&mut self, model: &mut Model, frame: &mut Frame) {
        let [table_area, status_area] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(frame.area());

        let (width, height) = cells_to_pixels(table_area.width, table_area.height);
        let mut drawer = TerminalDrawer::new(frame.buffer_mut(), table_area);
        model.redraw_table(&mut drawer, BODY_FONT, TITLE_FONT, width, height);

        self.draw_status(model, frame, status_area);
    }

    fn draw_status(&self, model: &Model, frame: &mut Frame, area: Area) {
        if let Some(input) = model.filter_input() {
            let prefix = "Filter: ";
            let line = Line::from(vec![prefix.bold(), input.input.as_str().into()]);
            frame.render_widget(Paragraph::new(line), area);

            let x = area.x + (prefix.len() + input.cursor_pos) as u16;
            frame.set_cursor_position(Position::new(x.min(area.right().saturating_sub(1)), area.y));
            return;
        }

        let table = model.table();
        let first = (table.current_index() + 1).min(table.count());
        let mut spans = vec![
            format!(" {}-{} of {} ", first, table.max_visible_index(), table.count()).bold(),
        ];
        if !model.current_filter().is_empty() {
            spans.push(format!("[{}] ", model.current_filter()).yellow());
        }
        if !model.status_message_expired() {
            spans.push(model.status_message().into());
        } else {
            spans.push(
                "<Enter> connect  </> filter  <1-7> sort  <d> default  <y> copy ip  <q> quit"
                    .dark_gray(),
            );
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

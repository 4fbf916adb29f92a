use tracing::trace;

use crate::drawer::{Color, Drawer, FlagCache, Font, Rect};
use crate::entry::TableEntry;
use crate::table::{HEADER_LEFT_PAD, TableWidget};

const FORE_GRID: Color = Color::new(40, 40, 40);
const CLASSIC_TRACK: Color = Color::new(80, 80, 80);
const CLASSIC_THUMB: Color = Color::new(160, 160, 160);

/// Width of the featured/selection strip painted at the start of a row.
const FEATURED_STRIP: i32 = 65;
const FLAG_WIDTH: i32 = 16;
const FLAG_HEIGHT: i32 = 11;
const HEADER_TOP: i32 = 3;
const ROW_GUTTER: i32 = 2;
const BODY_PAD: i32 = 5;

/// Layout results written back by each pass and read by the pointer
/// handlers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewLayout {
    pub entry_height: i32,
    pub header_height: i32,
    pub header_start_y: i32,
    pub header_end_y: i32,
    /// Rows a full page holds.
    pub num_entries: usize,
    /// First order index that did not fit.
    pub max_index: usize,
}

/// Player count ranges that pick a row's background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Population {
    Dead,
    SuperQuiet,
    Quiet,
    Typical,
    Busy,
    Popular,
    SuperPopular,
}

impl Population {
    pub fn of(players: i64) -> Option<Self> {
        match players {
            0 => Some(Population::Dead),
            1..=2 => Some(Population::SuperQuiet),
            3..=4 => Some(Population::Quiet),
            5..=6 => Some(Population::Typical),
            7..=9 => Some(Population::Busy),
            10..=19 => Some(Population::Popular),
            20.. => Some(Population::SuperPopular),
            _ => None,
        }
    }

    pub fn color(self, selected: bool) -> Color {
        match (self, selected) {
            (Population::Dead, true) => Color::new(64, 48, 36),
            (Population::Dead, false) => Color::new(64, 29, 2),
            (Population::SuperQuiet, true) => Color::new(222, 105, 73),
            (Population::SuperQuiet, false) => Color::new(222, 71, 29),
            (Population::Quiet, true) => Color::new(222, 172, 71),
            (Population::Quiet, false) => Color::new(254, 182, 39),
            (Population::Typical, true) => Color::new(130, 255, 132),
            (Population::Typical, false) => Color::new(0, 255, 4),
            (Population::Busy, true) => Color::new(84, 255, 201),
            (Population::Busy, false) => Color::new(0, 255, 174),
            (Population::Popular, true) => Color::new(71, 218, 255),
            (Population::Popular, false) => Color::new(0, 204, 255),
            (Population::SuperPopular, _) => Color::new(168, 238, 255),
        }
    }
}

fn population_color(players: i64, selected: bool) -> Color {
    Population::of(players).map_or(FORE_GRID, |p| p.color(selected))
}

fn featured_color(featured: bool, selected: bool) -> Color {
    match (featured, selected) {
        (false, _) => FORE_GRID,
        (true, true) => Color::new(50, 53, 0),
        (true, false) => Color::new(101, 107, 0),
    }
}

type ColumnText = fn(&TableEntry) -> &str;

fn flag_text(e: &TableEntry) -> &str {
    &e.flag
}
fn name_text(e: &TableEntry) -> &str {
    &e.name
}
fn online_text(e: &TableEntry) -> &str {
    &e.online
}
fn max_text(e: &TableEntry) -> &str {
    &e.max
}
fn uptime_text(e: &TableEntry) -> &str {
    &e.uptime
}
fn ip_text(e: &TableEntry) -> &str {
    &e.ip
}
fn software_text(e: &TableEntry) -> &str {
    &e.software
}

const COLUMNS: [(&str, ColumnText); 7] = [
    ("Flag", flag_text),
    ("Name", name_text),
    ("Online", online_text),
    ("Max Slots", max_text),
    ("Uptime", uptime_text),
    ("IP Address", ip_text),
    ("Software", software_text),
];

/// Draws one cell at `y` and advances `y` past it. Returns the cell's top and
/// height, or `None` (with `y` pushed past `bottom`) when it does not fit.
#[allow(clippy::too_many_arguments)]
fn draw_column_entry<D: Drawer + ?Sized>(
    drawer: &mut D,
    text: &str,
    font: &Font,
    entry_height: i32,
    max_width: i32,
    x: i32,
    y: &mut i32,
    bottom: i32,
) -> Option<(i32, i32)> {
    let mut size = drawer.measure_text(text, font);
    let empty = text.is_empty();
    if empty {
        size.height = entry_height;
    }
    if *y + size.height > bottom {
        *y = bottom + ROW_GUTTER;
        return None;
    }

    let top = *y;
    if !empty {
        drawer.draw_clipped_text(text, font, x, top, max_width);
    }
    *y += size.height + ROW_GUTTER;
    Some((top, size.height))
}

/// Layout and paint pass over a table. Writes row positions and the
/// visible range back into the widget.
pub struct TableView<'a> {
    table: &'a mut TableWidget,
}

impl<'a> TableView<'a> {
    pub fn new(table: &'a mut TableWidget) -> Self {
        Self { table }
    }

    fn bottom(&self) -> i32 {
        self.table.y + self.table.height
    }

    pub fn recalculate_draw_data(&mut self) {
        let table = &mut *self.table;
        for i in 0..table.column_widths.len() {
            let width = table.clamp_width(table.desired_widths[i]);
            table.column_widths[i] = width;
        }
        table.width = table.window.width - table.x;
        for entry in table.entries.iter_mut() {
            entry.reset_layout();
        }

        let layout = &mut table.layout;
        layout.header_start_y = table.y;
        layout.header_end_y = table.y + layout.header_height + BODY_PAD;
        let page = table.y + table.height - (layout.header_end_y + 3);
        layout.num_entries = (page / (layout.entry_height + 3)).max(0) as usize;

        let bottom = table.y + table.height;
        let mut y = table.y + HEADER_TOP + layout.header_height + ROW_GUTTER + BODY_PAD;
        layout.max_index = table.count;
        for i in table.current_index..table.count {
            if y + layout.entry_height > bottom {
                layout.max_index = i;
                break;
            }
            let entry = &mut table.entries[table.order[i]];
            entry.y = y;
            entry.height = layout.entry_height;
            y += layout.entry_height + ROW_GUTTER;
        }
        trace!(
            "Layout: rows {}..{} of {}, page {}",
            table.current_index, layout.max_index, table.count, layout.num_entries
        );
    }

    pub fn redraw_data<D: Drawer + ?Sized>(&mut self, drawer: &mut D, flags: &FlagCache) {
        self.draw_grid(drawer);

        let mut x = self.table.x + HEADER_LEFT_PAD + BODY_PAD;
        for (column, (header, text)) in COLUMNS.iter().enumerate() {
            x += self.draw_column(drawer, header, column, x, *text) + BODY_PAD;
        }

        self.draw_scrollbar(drawer);
        self.draw_flags(drawer, flags);
    }

    fn draw_grid<D: Drawer + ?Sized>(&mut self, drawer: &mut D) {
        let table = &self.table;
        if !table.config.classic_background {
            let y = table.y + table.layout.header_height + BODY_PAD;
            drawer.clear(table.skin.background, Rect::new(table.x, y, table.width, 2));
        }
    }

    /// Paints a header cell and the visible body cells of one column. The
    /// first column also paints each row's background. Returns the width
    /// consumed, gutter included.
    fn draw_column<D: Drawer + ?Sized>(
        &mut self,
        drawer: &mut D,
        header: &str,
        column: usize,
        x: i32,
        text: ColumnText,
    ) -> i32 {
        let bottom = self.bottom();
        let table = &mut *self.table;
        let max_width = table.column_widths[column];
        let separator = column > 0;
        let entry_height = table.layout.entry_height;
        let title_font = table.title_font;
        let font = table.font;

        let mut y = table.y + HEADER_TOP;
        draw_column_entry(drawer, header, &title_font, entry_height, max_width, x, &mut y, bottom);
        table.layout.max_index = table.count;

        y += BODY_PAD;
        for i in table.current_index..table.count {
            let idx = table.order[i];
            if !separator {
                let entry = &table.entries[idx];
                let selected = table.selected == Some(i);
                if selected || entry.featured || entry.online_count >= 0 {
                    let start_y = y - 3;
                    let height = (y + entry_height + 4).min(bottom) - y;
                    if height > 0 {
                        drawer.clear(
                            featured_color(entry.featured, selected),
                            Rect::new(table.x, start_y, FEATURED_STRIP, height),
                        );
                        drawer.clear(
                            population_color(entry.online_count, selected),
                            Rect::new(table.x, start_y, table.width, height),
                        );
                    }
                }
            }

            let placed = draw_column_entry(
                drawer,
                text(&table.entries[idx]),
                &font,
                entry_height,
                max_width,
                x,
                &mut y,
                bottom,
            );
            match placed {
                Some((top, height)) => {
                    let entry = &mut table.entries[idx];
                    entry.y = top;
                    entry.height = height;
                }
                None => {
                    table.layout.max_index = i;
                    break;
                }
            }
        }

        if separator && !table.config.classic_background {
            drawer.clear(table.skin.background, Rect::new(x - 7, table.y, 2, table.height));
        }
        max_width + BODY_PAD
    }

    fn draw_scrollbar<D: Drawer + ?Sized>(&mut self, drawer: &mut D) {
        let table = &self.table;
        let classic = table.config.classic_background;
        let bar_width = table.config.scrollbar_width;
        let x = table.window.width - bar_width;

        let track = if classic { CLASSIC_TRACK } else { table.skin.button_border };
        drawer.clear(track, Rect::new(x, table.y, bar_width, table.height));

        let thumb = if classic { CLASSIC_THUMB } else { table.skin.button_fore_active };
        let (y, height) = table.scrollbar_coords();
        drawer.clear(thumb, Rect::new(x, table.y + y, bar_width, height));
    }

    pub fn draw_flags<D: Drawer + ?Sized>(&mut self, drawer: &mut D, flags: &FlagCache) {
        let table = &self.table;
        let mut bits = drawer.lock_bits();
        if flags.is_empty() {
            return;
        }
        for i in table.current_index..table.layout.max_index.min(table.count) {
            let entry = table.entry_at(i);
            if !entry.is_placed() {
                continue;
            }
            let Some(flag) = flags.get(&entry.flag) else {
                continue;
            };
            let rect = Rect::new(table.x + 2, entry.y + 3, FLAG_WIDTH, FLAG_HEIGHT);
            bits.blit(flag, rect);
        }
    }
}

impl TableWidget {
    pub fn recalculate_draw_data(&mut self) {
        TableView::new(self).recalculate_draw_data();
    }

    pub fn redraw_data<D: Drawer + ?Sized>(&mut self, drawer: &mut D, flags: &FlagCache) {
        TableView::new(self).redraw_data(drawer, flags);
    }

    pub fn redraw<D: Drawer + ?Sized>(&mut self, drawer: &mut D, flags: &FlagCache) {
        self.recalculate_draw_data();
        self.redraw_data(drawer, flags);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TableConfig;
    use crate::drawer::testing::{DrawOp, RecordingDrawer};
    use crate::drawer::{FlagImage, Skin};
    use crate::entry::{ServerRecord, UNPLACED_Y, record};

    fn table(records: Vec<ServerRecord>, height: i32) -> (TableWidget, RecordingDrawer) {
        let mut table = TableWidget::new(TableConfig::default(), Skin::default());
        table.set_window(1200, 400);
        let drawer = RecordingDrawer::default();
        let font = Font { size: 14, bold: false };
        let title = Font { size: 16, bold: true };
        table.set_draw_data(&drawer, font, title, 10, 20);
        table.height = height;
        table.set_entries(records).unwrap();
        (table, drawer)
    }

    fn many(n: usize) -> Vec<ServerRecord> {
        (0..n).map(|i| record(&format!("s{i}"), i as i64, 10)).collect()
    }

    #[test]
    fn population_buckets() {
        assert_eq!(Population::of(0), Some(Population::Dead));
        assert_eq!(Population::of(2), Some(Population::SuperQuiet));
        assert_eq!(Population::of(3), Some(Population::Quiet));
        assert_eq!(Population::of(6), Some(Population::Typical));
        assert_eq!(Population::of(9), Some(Population::Busy));
        assert_eq!(Population::of(19), Some(Population::Popular));
        assert_eq!(Population::of(20), Some(Population::SuperPopular));
        assert_eq!(Population::of(-1), None);
        assert_ne!(Population::Busy.color(true), Population::Busy.color(false));
    }

    #[test]
    fn layout_places_visible_rows_only() {
        let (mut t, _) = table(many(20), 150);
        t.entries[19].y = 999;
        t.entries[19].height = 5;
        t.recalculate_draw_data();

        // Body starts at 20 + 3 + 16 + 2 + 5 and advances 16px per row.
        assert_eq!(t.entry_at(0).y, 46);
        assert_eq!(t.entry_at(1).y, 62);
        assert_eq!(t.max_visible_index(), 7);
        assert_eq!(t.visible_rows(), 7);
        assert!(t.entry_at(6).is_placed());
        assert!(!t.entry_at(7).is_placed());
        assert_eq!(t.entries[19].y, UNPLACED_Y);
        assert_eq!(t.width, 1190);
    }

    #[test]
    fn layout_starts_at_scroll_index() {
        let (mut t, _) = table(many(20), 150);
        t.current_index = 5;
        t.recalculate_draw_data();
        assert!(!t.entry_at(0).is_placed());
        assert_eq!(t.entry_at(5).y, 46);
        assert_eq!(t.max_visible_index(), 12);
    }

    #[test]
    fn all_rows_fit() {
        let (mut t, _) = table(many(3), 300);
        t.recalculate_draw_data();
        assert_eq!(t.max_visible_index(), 3);
    }

    #[test]
    fn desired_widths_are_clamped() {
        let (mut t, _) = table(many(1), 150);
        t.desired_widths[1] = 5000;
        t.desired_widths[2] = 1;
        t.recalculate_draw_data();
        assert_eq!(t.column_widths[1], 1180);
        assert_eq!(t.column_widths[2], 20);
        assert_eq!(t.desired_widths[1], 5000);
    }

    #[test]
    fn redraw_paints_headers_in_order() {
        let (mut t, mut drawer) = table(many(2), 150);
        t.redraw(&mut drawer, &FlagCache::new());

        let headers: Vec<(String, i32)> = drawer
            .texts()
            .into_iter()
            .filter(|(_, _, y)| *y == 23)
            .map(|(text, x, _)| (text, x))
            .collect();
        assert_eq!(headers[0], ("Flag".to_string(), 30));
        assert_eq!(headers[1], ("Name".to_string(), 70));
        assert_eq!(headers[2], ("Online".to_string(), 400));
        assert_eq!(headers.len(), 7);
        assert_eq!(headers[6].0, "Software");
    }

    #[test]
    fn first_column_tints_rows_by_population() {
        let mut busy = record("busy", 12, 0);
        busy.featured = true;
        let (mut t, mut drawer) = table(vec![busy, record("dead", 0, 0)], 150);
        t.recalculate_draw_data();
        t.set_selected(1);
        t.redraw(&mut drawer, &FlagCache::new());

        let clears = drawer.clears();
        let row = |color: Color| clears.iter().any(|(c, r)| *c == color && r.x == 10);
        assert!(row(Color::new(101, 107, 0)));
        assert!(row(Population::Popular.color(false)));
        assert!(row(Population::Dead.color(true)));

        // One strip and one full row per entry, nothing from the other columns.
        let tints = clears.iter().filter(|(_, r)| r.x == 10 && r.y >= 43).count();
        assert_eq!(tints, 4);
    }

    #[test]
    fn empty_cells_still_take_a_row() {
        let mut blank = record("x", 1, 0);
        blank.software = String::new();
        let (mut t, mut drawer) = table(vec![blank, record("y", 1, 0)], 150);
        t.redraw(&mut drawer, &FlagCache::new());
        let software: Vec<_> = drawer
            .texts()
            .into_iter()
            .filter(|(text, _, _)| text == "MCGalaxy")
            .collect();
        assert_eq!(software.len(), 1);
        assert_eq!(software[0].2, 62);
    }

    #[test]
    fn scrollbar_is_drawn_at_window_edge() {
        let (mut t, mut drawer) = table(many(3), 150);
        t.redraw(&mut drawer, &FlagCache::new());
        let skin = Skin::default();
        assert!(drawer.ops.contains(&DrawOp::Clear(
            skin.button_border,
            Rect::new(1190, 20, 10, 150)
        )));
        assert!(drawer.ops.contains(&DrawOp::Clear(
            skin.button_fore_active,
            Rect::new(1190, 20, 10, 150)
        )));
    }

    #[test]
    fn flags_blit_for_known_codes() {
        let mut other = record("b", 0, 0);
        other.flag = "zz".to_string();
        let (mut t, mut drawer) = table(vec![record("a", 0, 0), other], 150);
        let mut flags = FlagCache::new();
        flags.add_code("de");
        flags.add_image(FlagImage::solid(16, 11, Color::new(1, 1, 1)));
        t.redraw(&mut drawer, &flags);

        assert_eq!(drawer.locks, 1);
        assert_eq!(drawer.releases, 1);
        assert_eq!(drawer.pixels.len(), 16 * 11);
        assert!(drawer.pixels.contains(&(12, 49, Color::new(1, 1, 1))));
    }

    #[test]
    fn flag_lock_is_released_without_matches() {
        let (mut t, mut drawer) = table(many(2), 150);
        t.recalculate_draw_data();
        TableView::new(&mut t).draw_flags(&mut drawer, &FlagCache::new());
        assert_eq!(drawer.releases, 1);
        assert!(drawer.pixels.is_empty());
    }
}

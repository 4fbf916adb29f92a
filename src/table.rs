use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace};

use crate::comparers::{Comparer, SortColumn};
use crate::domain::{COLUMN_COUNT, TableConfig, TableError};
use crate::drawer::{Drawer, Font, Skin};
use crate::entry::{ServerRecord, TableEntry, build_entry};
use crate::view::ViewLayout;

/// Marks order slots past `count`. Never dereferenced.
pub const FILTERED_OUT: usize = usize::MAX;

/// Horizontal offset of the first column boundary from the widget's left edge.
pub const HEADER_LEFT_PAD: i32 = 15;
/// Space between the end of one column and the start of the next.
pub const COLUMN_GAP: i32 = 10;
/// Column drags stop once the pointer gets this close to the window's right edge.
const DRAG_EDGE_MARGIN: i32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerState {
    #[default]
    Idle,
    DraggingColumn(usize),
    DraggingScrollbar {
        grab_offset: i32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableEvent {
    NeedRedraw,
    SelectionChanged {
        hash: String,
    },
    Connect {
        servers: Arc<Vec<ServerRecord>>,
        hash: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    pub width: i32,
    pub height: i32,
}

pub struct TableWidget {
    pub(crate) config: TableConfig,
    pub(crate) skin: Skin,
    pub(crate) window: Window,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub(crate) font: Font,
    pub(crate) title_font: Font,
    pub(crate) entries: Vec<TableEntry>,
    pub(crate) order: Vec<usize>,
    pub(crate) count: usize,
    pub(crate) current_index: usize,
    pub(crate) selected: Option<usize>,
    pub(crate) column_widths: [i32; COLUMN_COUNT],
    pub(crate) desired_widths: [i32; COLUMN_COUNT],
    pub(crate) layout: ViewLayout,
    servers: Arc<Vec<ServerRecord>>,
    selected_hash: String,
    filter: String,
    comparers: [Comparer; SortColumn::ALL.len()],
    pointer: PointerState,
    last_press: Option<(usize, Instant)>,
    events: Vec<TableEvent>,
}

impl TableWidget {
    pub fn new(config: TableConfig, skin: Skin) -> Self {
        Self {
            column_widths: config.column_widths,
            desired_widths: config.column_widths,
            config,
            skin,
            window: Window::default(),
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            font: Font { size: 14, bold: false },
            title_font: Font { size: 16, bold: true },
            entries: Vec::new(),
            order: Vec::new(),
            count: 0,
            current_index: 0,
            selected: None,
            layout: ViewLayout::default(),
            servers: Arc::new(Vec::new()),
            selected_hash: String::new(),
            filter: String::new(),
            comparers: SortColumn::ALL.map(Comparer::new),
            pointer: PointerState::Idle,
            last_press: None,
            events: Vec::new(),
        }
    }

    // ------------------------------ Data ---------------------------------- //

    pub fn set_entries(&mut self, servers: Vec<ServerRecord>) -> Result<(), TableError> {
        let entries = servers
            .iter()
            .map(build_entry)
            .collect::<Result<Vec<TableEntry>, TableError>>()?;

        self.order = (0..entries.len()).collect();
        self.count = entries.len();
        self.entries = entries;
        self.servers = Arc::new(servers);
        self.last_press = None;
        self.clamp_scroll();
        let hash = self.selected_hash.clone();
        self.set_selected_hash(&hash);
        debug!("Table holds {} servers", self.count);
        Ok(())
    }

    /// Keeps the entries whose name contains `filter`, ignoring case, in
    /// their current relative order.
    pub fn filter_entries(&mut self, filter: &str) {
        self.filter = filter.to_string();
        let needle = filter.to_lowercase();

        self.count = 0;
        for (idx, entry) in self.entries.iter().enumerate() {
            if entry.name.to_lowercase().contains(&needle) {
                self.order[self.count] = idx;
                self.count += 1;
            }
        }
        self.order[self.count..].fill(FILTERED_OUT);
        trace!("Filter {:?} kept {}/{} servers", filter, self.count, self.entries.len());
    }

    pub fn sort_default(&mut self) {
        self.sort_entries(SortColumn::Default, true);
    }

    /// Sorts all entries with the column's comparer. Unless suppressed, the
    /// comparer is flipped afterwards, so the next sort by the same column
    /// runs the other way, and the selection follows its server.
    pub fn sort_entries(&mut self, column: SortColumn, suppress_redraw: bool) {
        let comparer = self.comparers[column.index()];
        self.entries.sort_by(|a, b| comparer.compare(a, b));
        self.last_press = None;
        debug!("Sorted by {:?}, inverted: {}", column, comparer.invert);

        if !self.filter.is_empty() {
            let filter = self.filter.clone();
            self.filter_entries(&filter);
        }
        if suppress_redraw {
            return;
        }

        self.comparers[column.index()].flip();
        let hash = self.selected_hash.clone();
        self.set_selected_hash(&hash);
        self.events.push(TableEvent::NeedRedraw);
    }

    // ---------------------------- Selection ------------------------------- //

    pub fn set_selected(&mut self, index: usize) {
        if self.count == 0 {
            self.selected = None;
            self.selected_hash.clear();
            return;
        }
        let index = index.min(self.count - 1);

        if index >= self.layout.max_index {
            self.current_index = (index + 1).saturating_sub(self.layout.num_entries.max(1));
        }
        if index < self.current_index {
            self.current_index = index;
        }
        self.selected = Some(index);
        self.clamp_scroll();

        let hash = self.entry_at(index).hash.clone();
        trace!("Selected row {} ({})", index, hash);
        self.selected_hash = hash.clone();
        self.events.push(TableEvent::SelectionChanged { hash });
    }

    /// Selects the visible row holding `hash`. An empty or unknown hash
    /// clears the selection.
    pub fn set_selected_hash(&mut self, hash: &str) {
        self.selected = None;
        if hash.is_empty() {
            self.selected_hash.clear();
            return;
        }
        match (0..self.count).find(|&i| self.entry_at(i).hash == hash) {
            Some(index) => self.set_selected(index),
            None => self.selected_hash.clear(),
        }
    }

    pub fn clamp_scroll(&mut self) {
        let max = self.count.saturating_sub(self.layout.num_entries);
        self.current_index = self.current_index.min(max);
    }

    // ----------------------------- Queries -------------------------------- //

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn get(&self, index: usize) -> Option<&TableEntry> {
        if index >= self.count {
            return None;
        }
        self.entries.get(self.order[index])
    }

    pub(crate) fn entry_at(&self, index: usize) -> &TableEntry {
        &self.entries[self.order[index]]
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_hash(&self) -> &str {
        &self.selected_hash
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn max_visible_index(&self) -> usize {
        self.layout.max_index
    }

    pub fn visible_rows(&self) -> usize {
        self.layout.num_entries
    }

    pub fn pointer_state(&self) -> PointerState {
        self.pointer
    }

    pub fn servers(&self) -> Arc<Vec<ServerRecord>> {
        Arc::clone(&self.servers)
    }

    pub fn take_events(&mut self) -> Vec<TableEvent> {
        std::mem::take(&mut self.events)
    }

    /// Thumb top and height relative to the widget's top edge.
    pub fn scrollbar_coords(&self) -> (i32, i32) {
        if self.count == 0 {
            return (0, 0);
        }
        let unit = self.height as f64 / self.count as f64;
        let y = (self.current_index as f64 * unit).ceil() as i32;
        let rows = self.layout.max_index.saturating_sub(self.current_index);
        let height = (rows as f64 * unit).ceil() as i32;
        (y, (y + height).min(self.height) - y)
    }

    // ----------------------------- Geometry ------------------------------- //

    pub fn set_window(&mut self, width: i32, height: i32) {
        self.window = Window { width, height };
    }

    pub fn set_draw_data<D: Drawer + ?Sized>(
        &mut self,
        drawer: &D,
        font: Font,
        title_font: Font,
        x: i32,
        y: i32,
    ) {
        self.x = x;
        self.y = y;
        self.layout.header_height = drawer.font_height(&title_font);
        self.layout.entry_height = drawer.font_height(&font);
        self.font = font;
        self.title_font = title_font;
    }

    pub(crate) fn clamp_width(&self, width: i32) -> i32 {
        let min = self.config.min_column_width;
        let max = self.window.width - min;
        let mut width = width;
        if width < min {
            width = min;
        }
        if width > max {
            width = max;
        }
        width
    }

    // ----------------------------- Pointer -------------------------------- //

    pub fn handle_press(&mut self, x: i32, y: i32) {
        self.handle_press_at(x, y, Instant::now());
    }

    pub fn handle_press_at(&mut self, x: i32, y: i32, now: Instant) {
        if x >= self.window.width - self.config.scrollbar_width {
            self.last_press = None;
            self.scrollbar_press(y);
        } else if y >= self.layout.header_start_y && y < self.layout.header_end_y {
            self.last_press = None;
            self.header_press(x);
        } else {
            self.body_press(y, now);
        }
    }

    pub fn handle_move(&mut self, x: i32, y: i32, delta_x: i32, _delta_y: i32) {
        match self.pointer {
            PointerState::Idle => {}
            PointerState::DraggingScrollbar { grab_offset } => {
                if self.count == 0 {
                    return;
                }
                let unit = self.height as f64 / self.count as f64;
                let rel = (y - self.y - grab_offset) as f64;
                self.current_index = (rel / unit).max(0.0) as usize;
                self.clamp_scroll();
                self.events.push(TableEvent::NeedRedraw);
            }
            PointerState::DraggingColumn(column) => {
                if x >= self.window.width - DRAG_EDGE_MARGIN {
                    return;
                }
                let width = self.clamp_width(self.column_widths[column] + delta_x);
                self.column_widths[column] = width;
                self.desired_widths[column] = width;
                self.events.push(TableEvent::NeedRedraw);
            }
        }
    }

    pub fn handle_release(&mut self) {
        if self.pointer != PointerState::Idle {
            trace!("Pointer released from {:?}", self.pointer);
        }
        self.pointer = PointerState::Idle;
    }

    fn header_press(&mut self, x: i32) {
        let zone = self.config.column_hit_zone;
        let mut edge = self.x + HEADER_LEFT_PAD;
        for (column, width) in self.column_widths.iter().enumerate() {
            edge += width + COLUMN_GAP;
            if x >= edge - zone && x < edge + zone {
                trace!("Start dragging column {}", column);
                self.pointer = PointerState::DraggingColumn(column);
                return;
            }
        }
        self.try_sort_columns(x);
    }

    fn try_sort_columns(&mut self, x: i32) {
        let mut start = self.x + HEADER_LEFT_PAD;
        for (column, sort) in SortColumn::HEADERS.iter().enumerate() {
            let width = self.column_widths[column];
            let last = column == COLUMN_COUNT - 1;
            if x >= start && (last || x < start + width) {
                self.sort_entries(*sort, false);
                return;
            }
            start += width + COLUMN_GAP;
        }
    }

    fn body_press(&mut self, y: i32, now: Instant) {
        let Some(index) = (0..self.count).find(|&i| {
            let entry = self.entry_at(i);
            y >= entry.y && y < entry.y + entry.height + 2
        }) else {
            return;
        };

        if let Some((last, at)) = self.last_press
            && last == index
            && now.saturating_duration_since(at) < self.config.double_click
        {
            self.connect(index);
            self.last_press = None;
            return;
        }
        self.set_selected(index);
        self.events.push(TableEvent::NeedRedraw);
        self.last_press = Some((index, now));
    }

    fn scrollbar_press(&mut self, y: i32) {
        let y = y - self.y;
        let (thumb_y, thumb_height) = self.scrollbar_coords();
        let page = self.layout.max_index.saturating_sub(self.current_index);

        if y < thumb_y {
            self.current_index = self.current_index.saturating_sub(page);
        } else if y >= thumb_y + thumb_height {
            self.current_index += page;
        } else {
            trace!("Start dragging scrollbar at offset {}", y - thumb_y);
            self.pointer = PointerState::DraggingScrollbar {
                grab_offset: y - thumb_y,
            };
        }
        self.clamp_scroll();
        self.events.push(TableEvent::NeedRedraw);
    }

    fn connect(&mut self, index: usize) {
        let hash = self.entry_at(index).hash.clone();
        debug!("Connect requested for {}", hash);
        self.events.push(TableEvent::Connect {
            servers: self.servers(),
            hash,
        });
    }

    // ---------------------------- Keyboard -------------------------------- //

    pub fn select_next(&mut self) {
        let next = self.selected.map_or(0, |i| i + 1);
        self.set_selected(next);
        self.events.push(TableEvent::NeedRedraw);
    }

    pub fn select_previous(&mut self) {
        let prev = self.selected.map_or(0, |i| i.saturating_sub(1));
        self.set_selected(prev);
        self.events.push(TableEvent::NeedRedraw);
    }

    pub fn select_first(&mut self) {
        self.set_selected(0);
        self.events.push(TableEvent::NeedRedraw);
    }

    pub fn select_last(&mut self) {
        self.set_selected(self.count.saturating_sub(1));
        self.events.push(TableEvent::NeedRedraw);
    }

    /// Scrolls by `rows`, negative values scrolling up.
    pub fn scroll_by(&mut self, rows: i64) {
        let target = self.current_index as i64 + rows;
        self.current_index = target.max(0) as usize;
        self.clamp_scroll();
        self.events.push(TableEvent::NeedRedraw);
    }

    pub fn page_up(&mut self) {
        self.scroll_by(-(self.visible_rows().max(1) as i64));
    }

    pub fn page_down(&mut self) {
        self.scroll_by(self.visible_rows().max(1) as i64);
    }

    pub fn connect_selected(&mut self) {
        if let Some(index) = self.selected
            && index < self.count
        {
            self.connect(index);
        }
    }
}

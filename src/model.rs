use arboard::Clipboard;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use crate::domain::{Message, TableError, ViewerConfig};
use crate::drawer::{Color, Drawer, FlagCache, FlagImage, Font};
use crate::entry::ServerRecord;
use crate::inputter::{InputResult, Inputter};
use crate::table::{TableEvent, TableWidget};

const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// The terminal cannot show the fetched flag images, so each country code
/// gets a solid swatch derived from its letters.
fn flag_swatches(codes: &[String]) -> FlagCache {
    let mut cache = FlagCache::new();
    let mut seen: Vec<&str> = Vec::new();
    for code in codes.iter().map(String::as_str).filter(|c| !c.is_empty()) {
        if seen.contains(&code) {
            continue;
        }
        seen.push(code);
        let mut channels = [96u8; 3];
        for (i, b) in code.to_ascii_lowercase().bytes().enumerate() {
            channels[i % 3] = channels[i % 3].wrapping_add(b.wrapping_mul(37));
        }
        cache.add_code(code);
        cache.add_image(FlagImage::solid(16, 11, Color::new(channels[0], channels[1], channels[2])));
    }
    trace!("Prepared {} flag swatches", seen.len());
    cache
}

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    FILTER,
}

pub struct Model {
    pub status: Status,
    modus: Modus,
    table: TableWidget,
    flags: FlagCache,
    input: Inputter,
    last_input: InputResult,
    clipboard: Option<Clipboard>,
    needs_redraw: bool,
    connect_target: Option<ServerRecord>,
    status_message: String,
    last_status_message_update: Instant,
    status_message_expired: bool,
}

impl Model {
    pub fn init(config: &ViewerConfig, servers: Vec<ServerRecord>) -> Result<Self, TableError> {
        let servers_flags = servers.iter().map(|s| s.flag.clone()).collect::<Vec<_>>();
        let mut table = TableWidget::new(config.table.clone(), config.skin.clone());
        table.set_entries(servers)?;
        table.sort_default();

        let mut model = Self {
            status: Status::READY,
            modus: Modus::TABLE,
            table,
            flags: flag_swatches(&servers_flags),
            input: Inputter::default(),
            last_input: InputResult::default(),
            clipboard: None,
            needs_redraw: true,
            connect_target: None,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
            status_message_expired: false,
        };
        if let Some(filter) = &config.initial_filter {
            model.input.set(filter);
            model.last_input = model.input.get();
            model.apply_filter(filter);
        }
        model.set_status_message(format!("Loaded {} servers", model.table.count()));
        Ok(model)
    }

    // ------------------------- Rendering support -------------------------- //

    /// Lays the table out for a `width` x `height` pixel window and paints it.
    pub fn redraw_table<D: Drawer + ?Sized>(
        &mut self,
        drawer: &mut D,
        font: Font,
        title_font: Font,
        width: i32,
        height: i32,
    ) {
        self.table.set_window(width, height);
        self.table.set_draw_data(drawer, font, title_font, 0, 0);
        self.table.height = height;
        self.table.redraw(drawer, &self.flags);
    }

    /// True once per pending repaint. An expiring status message counts as
    /// one, so the key hints come back without input.
    pub fn take_redraw(&mut self) -> bool {
        if !self.status_message_expired
            && self.last_status_message_update.elapsed() >= STATUS_MESSAGE_TIMEOUT
        {
            self.status_message_expired = true;
            self.needs_redraw = true;
        }
        std::mem::take(&mut self.needs_redraw)
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::FILTER
    }

    pub fn filter_input(&self) -> Option<&InputResult> {
        (self.modus == Modus::FILTER).then_some(&self.last_input)
    }

    pub fn current_filter(&self) -> &str {
        &self.last_input.input
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn status_message_expired(&self) -> bool {
        self.status_message_expired
    }

    pub fn table(&self) -> &TableWidget {
        &self.table
    }

    pub fn connect_target(&self) -> Option<&ServerRecord> {
        self.connect_target.as_ref()
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
        self.status_message_expired = false;
        self.needs_redraw = true;
    }

    // ------------------------------ Update -------------------------------- //

    pub fn update(&mut self, message: Option<Message>) -> Result<(), TableError> {
        if let Some(msg) = message {
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::Press { x, y } => self.table.handle_press(x, y),
                    Message::Move { x, y, dx, dy } => self.table.handle_move(x, y, dx, dy),
                    Message::Release => self.table.handle_release(),
                    Message::Wheel(rows) => self.table.scroll_by(rows as i64),
                    Message::Resize(width, height) => self.resize(width, height),
                    Message::MoveUp => self.table.select_previous(),
                    Message::MoveDown => self.table.select_next(),
                    Message::MovePageUp => self.table.page_up(),
                    Message::MovePageDown => self.table.page_down(),
                    Message::MoveBeginning => self.table.select_first(),
                    Message::MoveEnd => self.table.select_last(),
                    Message::Enter => self.table.connect_selected(),
                    Message::Filter => self.enter_filter_mode(),
                    Message::Sort(column) => self.table.sort_entries(column, false),
                    Message::SortDefault => self.sort_default(),
                    Message::CopyAddress => self.copy_address(),
                    Message::RawKey(_) => (),
                },
                Modus::FILTER => match msg {
                    Message::RawKey(key) => self.raw_input(key),
                    Message::Resize(width, height) => self.resize(width, height),
                    Message::Press { x, y } => self.table.handle_press(x, y),
                    Message::Move { x, y, dx, dy } => self.table.handle_move(x, y, dx, dy),
                    Message::Release => self.table.handle_release(),
                    Message::Wheel(rows) => self.table.scroll_by(rows as i64),
                    _ => (),
                },
            }
            trace!("Pointer state {:?}", self.table.pointer_state());
        }
        self.drain_table_events();
        Ok(())
    }

    fn drain_table_events(&mut self) {
        for event in self.table.take_events() {
            match event {
                TableEvent::NeedRedraw => self.needs_redraw = true,
                TableEvent::SelectionChanged { hash } => {
                    let selected = self.table.selected_index().and_then(|i| self.table.get(i));
                    let message = match selected.filter(|e| e.hash == hash) {
                        Some(entry) => {
                            format!("{} ({}) {} players", entry.name, entry.ip, entry.players)
                        }
                        None => hash,
                    };
                    self.set_status_message(message);
                }
                TableEvent::Connect { servers, hash } => {
                    match servers.iter().find(|s| s.hash == hash) {
                        Some(server) => {
                            info!("Connecting to {} at {}", server.name, server.ip);
                            self.connect_target = Some(server.clone());
                            self.quit();
                        }
                        None => warn!("Connect requested for unknown server {}", hash),
                    }
                }
            }
        }
    }

    fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn resize(&mut self, width: i32, height: i32) {
        trace!("UI was resized to {}x{} px", width, height);
        self.needs_redraw = true;
    }

    fn sort_default(&mut self) {
        self.table.sort_default();
        self.table.recalculate_draw_data();
        let hash = self.table.selected_hash().to_string();
        self.table.set_selected_hash(&hash);
        self.set_status_message("Sorted by players");
    }

    fn apply_filter(&mut self, filter: &str) {
        let hash = self.table.selected_hash().to_string();
        self.table.filter_entries(filter);
        self.table.clamp_scroll();
        self.table.recalculate_draw_data();
        self.table.set_selected_hash(&hash);
        self.needs_redraw = true;
    }

    fn enter_filter_mode(&mut self) {
        trace!("Entering filter mode ...");
        self.modus = Modus::FILTER;
        self.input.resume();
        self.last_input = self.input.get();
        self.needs_redraw = true;
    }

    fn raw_input(&mut self, key: ratatui::crossterm::event::KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.changed {
            let filter = self.last_input.input.clone();
            self.apply_filter(&filter);
        }
        if self.last_input.finished {
            self.modus = Modus::TABLE;
            let shown = self.table.count();
            self.set_status_message(format!("{shown} servers match"));
        }
        self.needs_redraw = true;
    }

    fn copy_address(&mut self) {
        let Some(entry) = self.table.selected_index().and_then(|i| self.table.get(i)) else {
            self.set_status_message("No server selected");
            return;
        };
        let ip = entry.ip.clone();

        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => debug!("Clipboard unavailable: {:?}", e),
            }
        }
        let copied = match self.clipboard.as_mut() {
            Some(clipboard) => clipboard.set_text(ip.clone()).is_ok(),
            None => false,
        };
        if copied {
            self.set_status_message(format!("Copied {ip}"));
        } else {
            self.set_status_message("Could not copy to clipboard");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparers::SortColumn;
    use crate::domain::TableConfig;
    use crate::drawer::Skin;
    use crate::drawer::testing::RecordingDrawer;
    use crate::entry::record;
    use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::path::PathBuf;

    const FONT: Font = Font { size: 14, bold: false };
    const TITLE: Font = Font { size: 16, bold: true };

    fn config(filter: Option<&str>) -> ViewerConfig {
        ViewerConfig {
            path: PathBuf::from("servers.csv"),
            event_poll_time: 10,
            initial_filter: filter.map(str::to_string),
            skin: Skin::default(),
            table: TableConfig::default(),
        }
    }

    fn model(filter: Option<&str>) -> Model {
        let servers = vec![
            record("Quiet", 1, 10),
            record("Busy", 30, 10),
            record("Empty", 0, 10),
        ];
        let mut model = Model::init(&config(filter), servers).unwrap();
        let mut drawer = RecordingDrawer::default();
        model.redraw_table(&mut drawer, FONT, TITLE, 1200, 300);
        model
    }

    fn key(model: &mut Model, code: KeyCode) {
        let ev = KeyEvent::new(code, KeyModifiers::NONE);
        model.update(Some(Message::RawKey(ev))).unwrap();
    }

    #[test]
    fn starts_sorted_by_players() {
        let m = model(None);
        assert_eq!(m.table().get(0).unwrap().name, "Busy");
        assert_eq!(m.table().get(2).unwrap().name, "Empty");
        assert_eq!(m.status_message(), "Loaded 3 servers");
    }

    #[test]
    fn initial_filter_is_applied() {
        let m = model(Some("mp"));
        assert_eq!(m.table().count(), 1);
        assert_eq!(m.current_filter(), "mp");
    }

    #[test]
    fn live_filter_keeps_selection() {
        let mut m = model(None);
        m.update(Some(Message::MoveDown)).unwrap();
        m.update(Some(Message::MoveDown)).unwrap();
        assert_eq!(m.table().selected_hash(), "hash-Quiet");

        m.update(Some(Message::Filter)).unwrap();
        assert!(m.raw_keyevents());
        key(&mut m, KeyCode::Char('u'));
        assert_eq!(m.table().count(), 2);
        assert_eq!(m.table().selected_index(), Some(1));

        key(&mut m, KeyCode::Enter);
        assert!(!m.raw_keyevents());
        assert_eq!(m.status_message(), "2 servers match");
    }

    #[test]
    fn escape_clears_filter() {
        let mut m = model(Some("busy"));
        m.update(Some(Message::Filter)).unwrap();
        key(&mut m, KeyCode::Esc);
        assert_eq!(m.table().count(), 3);
    }

    #[test]
    fn enter_connects_and_quits() {
        let mut m = model(None);
        m.update(Some(Message::MoveDown)).unwrap();
        assert!(m.take_redraw());
        m.update(Some(Message::Enter)).unwrap();
        assert_eq!(m.status, Status::QUITTING);
        assert_eq!(m.connect_target().unwrap().name, "Busy");
    }

    #[test]
    fn selection_updates_status() {
        let mut m = model(None);
        m.update(Some(Message::MoveDown)).unwrap();
        assert_eq!(m.status_message(), "Busy (127.0.0.1) 30/64 players");
    }

    #[test]
    fn header_click_sorts_through_model() {
        let mut m = model(None);
        m.update(Some(Message::Sort(SortColumn::Name))).unwrap();
        assert_eq!(m.table().get(0).unwrap().name, "Quiet");
        m.update(Some(Message::SortDefault)).unwrap();
        assert_eq!(m.table().get(0).unwrap().name, "Busy");
    }

    #[test]
    fn every_flag_code_gets_one_swatch() {
        let codes = ["de", "us", "de", ""].map(str::to_string);
        let cache = flag_swatches(&codes);
        assert!(cache.get("de").is_some());
        assert!(cache.get("us").is_some());
        assert!(cache.get("fr").is_none());
        assert_ne!(cache.get("de"), cache.get("us"));
    }

    #[test]
    fn copy_without_selection_reports() {
        let mut m = model(None);
        m.update(Some(Message::CopyAddress)).unwrap();
        assert_eq!(m.status_message(), "No server selected");
    }
}

use std::time::Duration;
use tracing::trace;

use crate::comparers::SortColumn;
use crate::domain::{Message, TableError};
use crate::model::Model;
use crate::ui::{cell_to_pixel, cells_to_pixels};
use ratatui::crossterm::event::{
    self, Event, KeyCode, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};

const WHEEL_ROWS: i32 = 3;

pub struct Controller {
    event_poll_time: u64,
    last_pointer: Option<(i32, i32)>,
}

impl Controller {
    pub fn new(event_poll_time: u64) -> Self {
        Self {
            event_poll_time,
            last_pointer: None,
        }
    }

    pub fn handle_event(&mut self, model: &Model) -> Result<Option<Message>, TableError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            let ev = event::read()?;
            return Ok(self.map_event(ev, model.raw_keyevents()));
        }
        Ok(None)
    }

    fn map_event(&mut self, ev: Event, raw_keys: bool) -> Option<Message> {
        match ev {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if raw_keys {
                    Some(Message::RawKey(key))
                } else {
                    self.handle_key(key)
                }
            }
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(width, height) => {
                let (w, h) = cells_to_pixels(width, height);
                Some(Message::Resize(w, h))
            }
            _ => None,
        }
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
            KeyCode::PageDown => Some(Message::MovePageDown),
            KeyCode::PageUp => Some(Message::MovePageUp),
            KeyCode::Home | KeyCode::Char('g') => Some(Message::MoveBeginning),
            KeyCode::End | KeyCode::Char('G') => Some(Message::MoveEnd),
            KeyCode::Enter => Some(Message::Enter),
            KeyCode::Char('/') => Some(Message::Filter),
            KeyCode::Char('d') => Some(Message::SortDefault),
            KeyCode::Char('p') => Some(Message::Sort(SortColumn::Players)),
            KeyCode::Char('y') => Some(Message::CopyAddress),
            KeyCode::Char(c @ '1'..='7') => {
                let column = c as usize - '1' as usize;
                Some(Message::Sort(SortColumn::HEADERS[column]))
            }
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> Option<Message> {
        let (x, y) = cell_to_pixel(mouse.column, mouse.row);
        let message = match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => Some(Message::Press { x, y }),
            MouseEventKind::Up(MouseButton::Left) => Some(Message::Release),
            MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => {
                let (last_x, last_y) = self.last_pointer.unwrap_or((x, y));
                if (last_x, last_y) == (x, y) {
                    None
                } else {
                    Some(Message::Move {
                        x,
                        y,
                        dx: x - last_x,
                        dy: y - last_y,
                    })
                }
            }
            MouseEventKind::ScrollDown => Some(Message::Wheel(WHEEL_ROWS)),
            MouseEventKind::ScrollUp => Some(Message::Wheel(-WHEEL_ROWS)),
            _ => None,
        };
        self.last_pointer = Some((x, y));
        message
    }
}

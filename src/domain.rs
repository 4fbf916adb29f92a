use std::io::Error;
use std::path::PathBuf;
use std::time::Duration;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

use crate::comparers::SortColumn;
use crate::drawer::Skin;

pub const COLUMN_COUNT: usize = 7;
pub const DEFAULT_COLUMN_WIDTHS: [i32; COLUMN_COUNT] = [30, 320, 65, 65, 95, 65, 365];

#[derive(Debug)]
pub enum TableError {
    IoError(Error),
    PolarsError(PolarsError),
    // A numeric field of a server record did not parse.
    Parse { field: &'static str, value: String },
    LoadingFailed(String),
    MissingColumn(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
}

impl From<Error> for TableError {
    fn from(err: Error) -> Self {
        TableError::IoError(err)
    }
}

impl From<PolarsError> for TableError {
    fn from(err: PolarsError) -> Self {
        TableError::PolarsError(err)
    }
}

/// Behaviour knobs of the table widget.
///
/// The defaults are the launcher's historic values and should only be
/// changed when a host needs different hit zones or timing.
#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct TableConfig {
    /// Two presses on the same row within this window connect.
    pub double_click: Duration,
    /// Half-width of the grab zone around a column boundary.
    pub column_hit_zone: i32,
    pub min_column_width: i32,
    pub scrollbar_width: i32,
    pub column_widths: [i32; COLUMN_COUNT],
    pub classic_background: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            double_click: Duration::from_secs(1),
            column_hit_zone: 8,
            min_column_width: 20,
            scrollbar_width: 10,
            column_widths: DEFAULT_COLUMN_WIDTHS,
            classic_background: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub path: PathBuf,
    pub event_poll_time: u64,
    pub initial_filter: Option<String>,
    pub skin: Skin,
    pub table: TableConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    Press { x: i32, y: i32 },
    Move { x: i32, y: i32, dx: i32, dy: i32 },
    Release,
    Wheel(i32),
    Resize(i32, i32),
    MoveUp,
    MoveDown,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    Enter,
    Filter,
    Sort(SortColumn),
    SortDefault,
    CopyAddress,
    RawKey(KeyEvent),
}

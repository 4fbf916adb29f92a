use polars::prelude::*;
use rayon::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::domain::TableError;
use crate::entry::ServerRecord;

/// Columns a server list file has to provide, in `ServerRecord` order.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "hash",
    "name",
    "players",
    "max_players",
    "ip",
    "software",
    "uptime",
    "featured",
    "flag",
];

#[derive(Debug, PartialEq)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
pub struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

pub fn load_servers(path: PathBuf) -> Result<Vec<ServerRecord>, TableError> {
    let file_info = get_file_info(path)?;
    debug!("Loading {:?}", file_info);
    let frame = match file_info.file_type {
        FileType::CSV => load_csv(&file_info.path)?,
        FileType::PARQUET => load_parquet(&file_info.path)?,
        FileType::ARROW => load_arrow(&file_info.path)?,
    };

    let start_time = Instant::now();
    let df = frame.collect()?;
    for name in REQUIRED_COLUMNS {
        if df.column(name).is_err() {
            return Err(TableError::MissingColumn(name.to_string()));
        }
    }

    // Every column is converted to text on its own thread.
    let columns = REQUIRED_COLUMNS
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect::<Result<Vec<Vec<String>>, PolarsError>>()?;

    let records = (0..df.height())
        .map(|row| ServerRecord {
            hash: columns[0][row].clone(),
            name: columns[1][row].clone(),
            players: columns[2][row].clone(),
            max_players: columns[3][row].clone(),
            ip: columns[4][row].clone(),
            software: columns[5][row].clone(),
            uptime: columns[6][row].clone(),
            featured: parse_flag(&columns[7][row]),
            flag: columns[8][row].clone(),
        })
        .collect::<Vec<ServerRecord>>();

    info!(
        "Loaded {} servers ({} bytes) in {}ms",
        records.len(),
        file_info.file_size,
        start_time.elapsed().as_millis()
    );
    Ok(records)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

fn load_column(df: &DataFrame, name: &str) -> Result<Vec<String>, PolarsError> {
    let col = df.column(name)?.cast(&DataType::String)?;
    let series = col.str()?;
    Ok(series
        .into_iter()
        .map(|value| value.map(str::to_string).unwrap_or_default())
        .collect())
}

fn detect_file_type(path: &Path) -> Result<FileType, TableError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(TableError::UnknownFileType),
    }
}

fn get_file_info(path: PathBuf) -> Result<FileInfo, TableError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TableError::FileNotFound,
        ErrorKind::PermissionDenied => TableError::PermissionDenied,
        _ => TableError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(TableError::LoadingFailed("Not a file!".into()));
    }

    Ok(FileInfo {
        file_type: detect_file_type(&path)?,
        file_size: metadata.len(),
        path,
    })
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

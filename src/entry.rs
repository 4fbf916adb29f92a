use crate::domain::TableError;

/// Y position given to rows that did not make it into the current layout pass.
pub const UNPLACED_Y: i32 = -10;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;
const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;

/// One server as delivered by the server list service. Counts and uptime
/// arrive as text and are only validated when the table is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerRecord {
    pub hash: String,
    pub name: String,
    pub players: String,
    pub max_players: String,
    pub ip: String,
    pub software: String,
    pub uptime: String,
    pub featured: bool,
    pub flag: String,
}

/// Display-ready row. `y` and `height` belong to the last layout pass only.
#[derive(Debug, Clone)]
pub struct TableEntry {
    pub hash: String,
    pub name: String,
    pub players: String,
    pub online: String,
    pub max: String,
    pub ip: String,
    pub software: String,
    pub uptime: String,
    pub featured: bool,
    pub flag: String,
    pub online_count: i64,
    pub raw_uptime: i64,
    pub y: i32,
    pub height: i32,
}

impl TableEntry {
    pub fn reset_layout(&mut self) {
        self.y = UNPLACED_Y;
        self.height = 0;
    }

    pub fn is_placed(&self) -> bool {
        self.height > 0
    }
}

fn parse_count(field: &'static str, value: &str) -> Result<i64, TableError> {
    value.trim().parse::<i64>().map_err(|_| TableError::Parse {
        field,
        value: value.to_string(),
    })
}

pub fn build_entry(record: &ServerRecord) -> Result<TableEntry, TableError> {
    let online_count = parse_count("players", &record.players)?;
    parse_count("max_players", &record.max_players)?;
    let raw_uptime = parse_count("uptime", &record.uptime)?;

    Ok(TableEntry {
        hash: record.hash.clone(),
        name: record.name.clone(),
        players: format!("{}/{}", record.players, record.max_players),
        online: record.players.clone(),
        max: record.max_players.clone(),
        ip: record.ip.clone(),
        software: record.software.clone(),
        uptime: make_uptime(raw_uptime),
        featured: record.featured,
        flag: record.flag.clone(),
        online_count,
        raw_uptime,
        y: UNPLACED_Y,
        height: 0,
    })
}

/// Formats an uptime with the largest unit that fits, truncating. Days are
/// only used once a server has been up for a full week.
pub fn make_uptime(seconds: i64) -> String {
    if seconds >= SECONDS_PER_WEEK {
        format!("{}d", seconds / SECONDS_PER_DAY)
    } else if seconds >= SECONDS_PER_HOUR {
        format!("{}h", seconds / SECONDS_PER_HOUR)
    } else if seconds >= SECONDS_PER_MINUTE {
        format!("{}m", seconds / SECONDS_PER_MINUTE)
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
pub(crate) fn record(name: &str, players: i64, uptime: i64) -> ServerRecord {
    ServerRecord {
        hash: format!("hash-{name}"),
        name: name.to_string(),
        players: players.to_string(),
        max_players: "64".to_string(),
        ip: "127.0.0.1".to_string(),
        software: "MCGalaxy".to_string(),
        uptime: uptime.to_string(),
        featured: false,
        flag: "de".to_string(),
    }
}

use std::cmp::Ordering;

use crate::entry::TableEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    /// Most players first, longest uptime breaking ties. Never inverted.
    Default,
    Flag,
    Name,
    /// Online count compared as a number.
    Players,
    /// Online count compared as text, the way the header column sorts.
    Online,
    Max,
    Uptime,
    Ip,
    Software,
}

impl SortColumn {
    pub const ALL: [SortColumn; 9] = [
        SortColumn::Default,
        SortColumn::Flag,
        SortColumn::Name,
        SortColumn::Players,
        SortColumn::Online,
        SortColumn::Max,
        SortColumn::Uptime,
        SortColumn::Ip,
        SortColumn::Software,
    ];

    /// Sort triggered by a click on each header cell, left to right.
    pub const HEADERS: [SortColumn; 7] = [
        SortColumn::Flag,
        SortColumn::Name,
        SortColumn::Online,
        SortColumn::Max,
        SortColumn::Uptime,
        SortColumn::Ip,
        SortColumn::Software,
    ];

    pub fn index(self) -> usize {
        match self {
            SortColumn::Default => 0,
            SortColumn::Flag => 1,
            SortColumn::Name => 2,
            SortColumn::Players => 3,
            SortColumn::Online => 4,
            SortColumn::Max => 5,
            SortColumn::Uptime => 6,
            SortColumn::Ip => 7,
            SortColumn::Software => 8,
        }
    }
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

fn cmp_default(a: &TableEntry, b: &TableEntry) -> Ordering {
    b.online_count
        .cmp(&a.online_count)
        .then_with(|| b.raw_uptime.cmp(&a.raw_uptime))
}

/// An ordering over table entries with a direction flag. A fresh comparer
/// starts inverted, so the first sort by a column is descending.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparer {
    pub column: SortColumn,
    pub invert: bool,
}

impl Comparer {
    pub fn new(column: SortColumn) -> Self {
        Self {
            column,
            invert: true,
        }
    }

    pub fn compare(&self, a: &TableEntry, b: &TableEntry) -> Ordering {
        let ord = match self.column {
            SortColumn::Default => return cmp_default(a, b),
            SortColumn::Flag => cmp_ignore_case(&a.flag, &b.flag),
            SortColumn::Name => cmp_ignore_case(&a.name, &b.name),
            SortColumn::Players => a.online_count.cmp(&b.online_count),
            SortColumn::Online => cmp_ignore_case(&a.online, &b.online),
            SortColumn::Max => cmp_ignore_case(&a.max, &b.max),
            SortColumn::Uptime => a.raw_uptime.cmp(&b.raw_uptime),
            SortColumn::Ip => a.ip.cmp(&b.ip),
            SortColumn::Software => cmp_ignore_case(&a.software, &b.software),
        };
        if self.invert { ord.reverse() } else { ord }
    }

    pub fn flip(&mut self) {
        self.invert = !self.invert;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{build_entry, record};

    fn entry(name: &str, players: i64, uptime: i64) -> TableEntry {
        build_entry(&record(name, players, uptime)).unwrap()
    }

    #[test]
    fn default_orders_by_players_then_uptime() {
        let cmp = Comparer::new(SortColumn::Default);
        let busy = entry("a", 10, 5);
        let quiet_old = entry("b", 2, 500);
        let quiet_new = entry("c", 2, 50);
        assert_eq!(cmp.compare(&busy, &quiet_old), Ordering::Less);
        assert_eq!(cmp.compare(&quiet_old, &quiet_new), Ordering::Less);

        let mut flipped = cmp;
        flipped.flip();
        assert_eq!(flipped.compare(&busy, &quiet_old), Ordering::Less);
    }

    #[test]
    fn fresh_comparer_sorts_descending() {
        let cmp = Comparer::new(SortColumn::Name);
        let a = entry("alpha", 0, 0);
        let b = entry("Beta", 0, 0);
        assert_eq!(cmp.compare(&a, &b), Ordering::Greater);

        let mut asc = cmp;
        asc.flip();
        assert_eq!(asc.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn text_columns_ignore_case() {
        let mut cmp = Comparer::new(SortColumn::Software);
        cmp.invert = false;
        let mut a = entry("a", 0, 0);
        let mut b = entry("b", 0, 0);
        a.software = "mcgalaxy".to_string();
        b.software = "MCGalaxy".to_string();
        assert_eq!(cmp.compare(&a, &b), Ordering::Equal);
    }

    #[test]
    fn ip_is_ordinal() {
        let mut cmp = Comparer::new(SortColumn::Ip);
        cmp.invert = false;
        let mut a = entry("a", 0, 0);
        let mut b = entry("b", 0, 0);
        a.ip = "Z".to_string();
        b.ip = "a".to_string();
        assert_eq!(cmp.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn online_text_and_players_number_differ() {
        let nine = entry("a", 9, 0);
        let ten = entry("b", 10, 0);

        let mut text = Comparer::new(SortColumn::Online);
        text.invert = false;
        assert_eq!(text.compare(&nine, &ten), Ordering::Greater);

        let mut number = Comparer::new(SortColumn::Players);
        number.invert = false;
        assert_eq!(number.compare(&nine, &ten), Ordering::Less);
    }

    #[test]
    fn uptime_is_numeric() {
        let mut cmp = Comparer::new(SortColumn::Uptime);
        cmp.invert = false;
        assert_eq!(
            cmp.compare(&entry("a", 0, 90), &entry("b", 0, 600)),
            Ordering::Less
        );
    }
}

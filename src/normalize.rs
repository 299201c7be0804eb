use tracing::{debug, warn};

use crate::dates;
use crate::models::FlagRecord;
use crate::sheet::{RawCell, Row};

const FIELD_COUNT: usize = 10;

/// Logical columns of a flag report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    StudentName,
    House,
    Form,
    YearGroup,
    Category,
    Points,
    Date,
    Reason,
    Teacher,
    Subject,
}

impl Field {
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::StudentName,
        Field::House,
        Field::Form,
        Field::YearGroup,
        Field::Category,
        Field::Points,
        Field::Date,
        Field::Reason,
        Field::Teacher,
        Field::Subject,
    ];

    /// Fields that must all be present for a row to count as a header.
    pub const SENTINELS: [Field; 3] = [Field::StudentName, Field::Date, Field::Category];

    /// Accepted header labels, lower-case, primary label first.
    pub fn labels(self) -> &'static [&'static str] {
        match self {
            Field::StudentName => &["pupil name", "student name", "student"],
            Field::House => &["house"],
            Field::Form => &["form"],
            Field::YearGroup => &["year", "year group"],
            Field::Category => &["category"],
            Field::Points => &["points"],
            Field::Date => &["date"],
            Field::Reason => &["reward description", "reason", "description"],
            Field::Teacher => &["teacher"],
            Field::Subject => &["subject"],
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    fn is_label(self, value: &str) -> bool {
        let value = value.trim().to_lowercase();
        self.labels().contains(&value.as_str())
    }
}

/// Column positions for one header block. `None` means the column is absent
/// from that block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    columns: [Option<usize>; FIELD_COUNT],
}

impl ColumnMap {
    pub fn get(&self, field: Field) -> Option<usize> {
        self.columns[field.index()]
    }

    fn cell<'a>(&self, row: &'a [RawCell], field: Field) -> Option<&'a RawCell> {
        self.get(field).and_then(|i| row.get(i))
    }

    fn text(&self, row: &[RawCell], field: Field) -> String {
        self.cell(row, field)
            .map(|c| c.to_string().trim().to_string())
            .unwrap_or_default()
    }

    fn text_or(&self, row: &[RawCell], field: Field, default: &str) -> String {
        let value = self.text(row, field);
        if value.is_empty() {
            default.to_string()
        } else {
            value
        }
    }
}

fn lowered(row: &[RawCell]) -> Vec<String> {
    row.iter().map(|c| c.to_string().trim().to_lowercase()).collect()
}

fn find_column(cells: &[String], field: Field) -> Option<usize> {
    field
        .labels()
        .iter()
        .find_map(|label| cells.iter().position(|c| c == label))
}

pub fn is_header_row(row: &[RawCell]) -> bool {
    let cells = lowered(row);
    Field::SENTINELS
        .iter()
        .all(|field| find_column(&cells, *field).is_some())
}

/// Maps every field to the first column carrying one of its labels.
pub fn resolve_column_map(header: &[RawCell]) -> ColumnMap {
    let cells = lowered(header);
    let mut columns = [None; FIELD_COUNT];
    for field in Field::ALL {
        columns[field.index()] = find_column(&cells, field);
    }
    ColumnMap { columns }
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub records: Vec<FlagRecord>,
    pub header_blocks: usize,
    pub skipped_rows: usize,
}

struct ScanState {
    columns: Option<ColumnMap>,
    outcome: ScanOutcome,
}

/// Single pass over the sheet. Blank rows and rows before the first header
/// are dropped; each header row replaces the active column map.
pub fn scan_rows(rows: &[Row]) -> ScanOutcome {
    let initial = ScanState {
        columns: None,
        outcome: ScanOutcome::default(),
    };

    let state = rows.iter().fold(initial, |mut state, row| {
        if row.iter().all(RawCell::is_blank) {
            return state;
        }
        if is_header_row(row) {
            state.columns = Some(resolve_column_map(row));
            state.outcome.header_blocks += 1;
            return state;
        }

        match state.columns.as_ref().and_then(|map| build_record(map, row)) {
            Some(record) => state.outcome.records.push(record),
            None => state.outcome.skipped_rows += 1,
        }
        state
    });

    let outcome = state.outcome;
    if outcome.header_blocks == 0 {
        warn!(rows = rows.len(), "no header row found");
    } else {
        debug!(
            header_blocks = outcome.header_blocks,
            records = outcome.records.len(),
            skipped = outcome.skipped_rows,
            "scanned sheet"
        );
    }
    outcome
}

fn build_record(map: &ColumnMap, row: &[RawCell]) -> Option<FlagRecord> {
    let student_name = map.text(row, Field::StudentName);
    let date = map.text(row, Field::Date);

    if student_name.is_empty() || Field::StudentName.is_label(&student_name) {
        return None;
    }
    if date.is_empty() || Field::Date.is_label(&date) {
        return None;
    }

    let points = map
        .text(row, Field::Points)
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .unwrap_or(0.0);

    Some(FlagRecord {
        timestamp: dates::resolve_timestamp(&date),
        student_name,
        date,
        year_group: map.text_or(row, Field::YearGroup, "Unknown"),
        house: map.text_or(row, Field::House, "None"),
        form: map.text_or(row, Field::Form, "N/A"),
        teacher: map.text_or(row, Field::Teacher, "Unknown"),
        reason: map.text(row, Field::Reason),
        category: map.text_or(row, Field::Category, "None"),
        subject: map.text(row, Field::Subject),
        points,
    })
}

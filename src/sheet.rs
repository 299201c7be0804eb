use std::fmt;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use tracing::{debug, info};

/// A single decoded cell. Every variant has a text form, which is all the
/// normalizer reads.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Date(chrono::NaiveDate),
}

impl RawCell {
    pub fn text(value: impl Into<String>) -> Self {
        RawCell::Text(value.into())
    }

    pub fn is_blank(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for RawCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawCell::Empty => Ok(()),
            RawCell::Text(s) => f.write_str(s),
            RawCell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            RawCell::Number(n) => write!(f, "{n}"),
            RawCell::Date(d) => write!(f, "{}", d.format("%d/%m/%Y")),
        }
    }
}

impl From<&str> for RawCell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            RawCell::Empty
        } else {
            RawCell::Text(value.to_string())
        }
    }
}

pub type Row = Vec<RawCell>;

#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("unsupported file type: {0}")]
    UnsupportedExtension(PathBuf),
    #[error("failed to open workbook {path}: {message}")]
    Open { path: PathBuf, message: String },
    #[error("workbook {0} contains no sheets")]
    NoSheets(PathBuf),
    #[error("failed to read csv: {0}")]
    Csv(#[from] csv::Error),
}

enum SheetFormat {
    Csv,
    Workbook,
}

fn detect_format(path: &Path) -> Result<SheetFormat, SheetError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" | "txt" => Ok(SheetFormat::Csv),
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(SheetFormat::Workbook),
        _ => Err(SheetError::UnsupportedExtension(path.to_path_buf())),
    }
}

/// Reads the first sheet of a workbook (or the only sheet of a CSV) as rows.
pub fn load_first_sheet(path: &Path) -> Result<Vec<Row>, SheetError> {
    let rows = match detect_format(path)? {
        SheetFormat::Csv => read_csv(path)?,
        SheetFormat::Workbook => read_workbook(path)?,
    };
    info!(path = %path.display(), rows = rows.len(), "loaded sheet");
    Ok(rows)
}

fn read_csv(path: &Path) -> Result<Vec<Row>, SheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(RawCell::from).collect());
    }
    Ok(rows)
}

fn read_workbook(path: &Path) -> Result<Vec<Row>, SheetError> {
    let open_error = |message: String| SheetError::Open {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| open_error(e.to_string()))?;
    let sheet_names = workbook.sheet_names();
    let first = sheet_names
        .first()
        .cloned()
        .ok_or_else(|| SheetError::NoSheets(path.to_path_buf()))?;

    if sheet_names.len() > 1 {
        debug!(sheet = %first, ignored = sheet_names.len() - 1, "reading first sheet only");
    }

    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| open_error(e.to_string()))?;

    // Leading empty rows and columns are not part of the range.
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Row> = vec![Vec::new(); start_row as usize];

    for row in range.rows() {
        let mut cells = vec![RawCell::Empty; start_col as usize];
        cells.extend(row.iter().map(convert_cell));
        rows.push(cells);
    }

    Ok(rows)
}

fn convert_cell(cell: &Data) -> RawCell {
    match cell {
        Data::Empty => RawCell::Empty,
        Data::String(s) => RawCell::from(s.as_str()),
        Data::Float(n) => RawCell::Number(*n),
        Data::Int(n) => RawCell::Number(*n as f64),
        Data::Bool(b) => RawCell::text(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => RawCell::Text(format!("#{e:?}")),
        // as_datetime honours the workbook's 1904 date system
        Data::DateTime(dt) if dt.is_datetime() => match dt.as_datetime() {
            Some(value) => RawCell::Date(value.date()),
            None => RawCell::Number(dt.as_f64()),
        },
        Data::DateTime(dt) => RawCell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::from(s.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn cells_render_as_sheet_text() {
        assert_eq!(RawCell::Number(3.0).to_string(), "3");
        assert_eq!(RawCell::Number(2.5).to_string(), "2.5");
        assert_eq!(RawCell::Empty.to_string(), "");
        let date = chrono::NaiveDate::from_ymd_opt(2025, 9, 3).unwrap();
        assert_eq!(RawCell::Date(date).to_string(), "03/09/2025");
    }

    #[test]
    fn blank_detection() {
        assert!(RawCell::Empty.is_blank());
        assert!(RawCell::text("  ").is_blank());
        assert!(!RawCell::Number(0.0).is_blank());
    }

    #[test]
    fn reads_ragged_csv_without_header_assumption() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Rewards Report").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "Pupil Name,Date,Category").unwrap();
        writeln!(file, "\"Abbott, Amelia\",03/09/2025,Uniform").unwrap();

        let rows = load_first_sheet(file.path()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec![RawCell::text("Rewards Report")]);
        assert_eq!(rows[2][0], RawCell::text("Abbott, Amelia"));
        assert_eq!(rows[2].len(), 3);
    }

    #[test]
    fn excel_dates_respect_the_1904_system() {
        use calamine::{ExcelDateTime, ExcelDateTimeType};

        let expected = RawCell::Date(chrono::NaiveDate::from_ymd_opt(2025, 9, 3).unwrap());
        let modern = ExcelDateTime::new(45903.0, ExcelDateTimeType::DateTime, false);
        let mac = ExcelDateTime::new(44441.0, ExcelDateTimeType::DateTime, true);
        assert_eq!(convert_cell(&Data::DateTime(modern)), expected);
        assert_eq!(convert_cell(&Data::DateTime(mac)), expected);

        let duration = ExcelDateTime::new(1.5, ExcelDateTimeType::TimeDelta, false);
        assert_eq!(convert_cell(&Data::DateTime(duration)), RawCell::Number(1.5));
    }

    #[test]
    fn rejects_unknown_extensions() {
        let err = load_first_sheet(Path::new("flags.pdf")).unwrap_err();
        assert!(matches!(err, SheetError::UnsupportedExtension(_)));
    }
}

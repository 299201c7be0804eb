use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use crate::dates;
use crate::models::{AnalysisSummary, FlagRecord};

/// Rows sent to the summarization service are capped at this many.
pub const MAX_CONTEXT_ROWS: usize = 1500;
pub const MAX_FOCUS_STUDENTS: usize = 15;

pub const CONTEXT_HEADER: &str = "Date|DayOfWeek|Student|Teacher|YearGroup|Category|Reason";

/// Payload handed to the summarization service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub total_records: usize,
    pub year_groups: Vec<String>,
    pub focus_students: Vec<String>,
    pub header: String,
    pub rows: Vec<String>,
}

impl SummaryRequest {
    pub fn from_records(records: &[FlagRecord]) -> Self {
        Self {
            total_records: records.len(),
            year_groups: distinct_year_groups(records),
            focus_students: most_flagged(records, MAX_FOCUS_STUDENTS),
            header: CONTEXT_HEADER.to_string(),
            rows: records
                .iter()
                .take(MAX_CONTEXT_ROWS)
                .map(context_row)
                .collect(),
        }
    }
}

fn distinct_year_groups(records: &[FlagRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .map(|r| r.year_group.as_str())
        .filter(|y| !y.is_empty() && seen.insert(*y))
        .map(str::to_string)
        .collect()
}

/// Student names by flag count, descending; ties keep first-seen order.
fn most_flagged(records: &[FlagRecord], limit: usize) -> Vec<String> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        let count = counts.entry(record.student_name.as_str()).or_insert(0);
        if *count == 0 {
            order.push(record.student_name.as_str());
        }
        *count += 1;
    }

    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.into_iter().take(limit).map(str::to_string).collect()
}

fn context_row(record: &FlagRecord) -> String {
    let day = if record.timestamp == 0 {
        None
    } else {
        dates::millis_to_date(record.timestamp).map(dates::weekday_name)
    };

    format!(
        "{}|{}|{}|{}|{}|{}|{}",
        record.date,
        day.as_deref().unwrap_or("Unknown"),
        record.student_name,
        record.teacher,
        record.year_group,
        record.category,
        record.reason
    )
}

/// Loads a summarization response previously saved as JSON.
pub async fn load_summary(path: &Path) -> anyhow::Result<AnalysisSummary> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read summary {}", path.display()))?;
    let summary: AnalysisSummary = serde_json::from_str(&text)
        .with_context(|| format!("summary {} is not valid JSON", path.display()))?;

    info!(
        path = %path.display(),
        students = summary.hotspots.students.len(),
        year_groups = summary.year_insights.len(),
        "loaded summary"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn flag(student: &str, date: &str, year: &str) -> FlagRecord {
        FlagRecord {
            student_name: student.to_string(),
            date: date.to_string(),
            timestamp: dates::resolve_timestamp(date),
            year_group: year.to_string(),
            house: "None".to_string(),
            form: "N/A".to_string(),
            teacher: "JIQU".to_string(),
            reason: "no notebook".to_string(),
            category: "Equipment".to_string(),
            subject: String::new(),
            points: 1.0,
        }
    }

    #[test]
    fn request_collects_years_and_frequent_students() {
        let records = vec![
            flag("Abbott, Amelia", "03/09/2025", "Year 7"),
            flag("Abe, Sebastian", "16/09/2025", "Year 8"),
            flag("Abe, Sebastian", "17/09/2025", "Year 8"),
            flag("Cole, Ava", "N/A", ""),
        ];
        let request = SummaryRequest::from_records(&records);

        assert_eq!(request.total_records, 4);
        assert_eq!(request.year_groups, vec!["Year 7", "Year 8"]);
        assert_eq!(
            request.focus_students,
            vec!["Abe, Sebastian", "Abbott, Amelia", "Cole, Ava"]
        );
        assert_eq!(
            request.rows[0],
            "03/09/2025|Wednesday|Abbott, Amelia|JIQU|Year 7|Equipment|no notebook"
        );
        assert!(request.rows[3].starts_with("N/A|Unknown|Cole, Ava"));
    }

    #[test]
    fn request_rows_are_bounded() {
        let records: Vec<FlagRecord> = (0..MAX_CONTEXT_ROWS + 10)
            .map(|_| flag("Abbott, Amelia", "03/09/2025", "Year 7"))
            .collect();
        let request = SummaryRequest::from_records(&records);
        assert_eq!(request.rows.len(), MAX_CONTEXT_ROWS);
        assert_eq!(request.total_records, MAX_CONTEXT_ROWS + 10);
        assert_eq!(request.focus_students.len(), 1);
    }

    #[tokio::test]
    async fn loads_partial_summary_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "aiInsights": "Uniform standards dominate.",
                "hotspots": {{ "students": [
                    {{ "name": "Abbott, Amelia", "count": 3, "mainReason": "Uniform",
                       "summary": "Repeated uniform flags." }}
                ] }},
                "yearInsights": [ {{ "year": "Year 7", "insight": "Settling in." }} ]
            }}"#
        )
        .unwrap();

        let summary = load_summary(file.path()).await.unwrap();
        assert_eq!(summary.ai_insights, "Uniform standards dominate.");
        assert_eq!(summary.hotspots.students[0].main_reason, "Uniform");
        assert_eq!(summary.year_insights[0].year, "Year 7");
        assert!(summary.year_insights[0].alerts.is_empty());
        assert!(summary.temporal_spikes.is_empty());
    }

    #[tokio::test]
    async fn hotspot_without_name_does_not_fail_the_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "hotspots": {{ "students": [
                {{ "count": 2, "summary": "Unattributed." }},
                {{ "name": "Abe, Sebastian", "summary": "Homework support." }}
            ] }} }}"#
        )
        .unwrap();

        let summary = load_summary(file.path()).await.unwrap();
        let students = &summary.hotspots.students;
        assert_eq!(students.len(), 2);
        assert_eq!(students[0].name, "");
        assert_eq!(students[0].count, 2);
        assert_eq!(students[1].count, 0);

        let lookup = crate::aggregate::SummaryLookup::from_hotspots(students);
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup.get("Abe, Sebastian"), Some("Homework support."));
    }

    #[tokio::test]
    async fn rejects_malformed_summary() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(load_summary(file.path()).await.is_err());
    }
}

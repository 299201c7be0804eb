use serde::{Deserialize, Serialize};

/// One behaviour flag as read from the report sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagRecord {
    pub student_name: String,
    /// Date cell text exactly as it appeared in the sheet.
    pub date: String,
    /// Epoch milliseconds, `0` when the date could not be resolved.
    pub timestamp: i64,
    pub year_group: String,
    pub house: String,
    pub form: String,
    pub teacher: String,
    pub reason: String,
    pub category: String,
    pub subject: String,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataPoint {
    pub name: String,
    pub value: usize,
}

impl ChartDataPoint {
    pub fn new(name: impl Into<String>, value: usize) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudentHotspot {
    pub name: String,
    pub count: usize,
    pub main_reason: String,
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YearGroupAnalysis {
    pub year: String,
    pub insight: String,
    pub priority: String,
    pub interventions: Vec<String>,
    pub alerts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hotspots {
    pub students: Vec<StudentHotspot>,
}

/// Narrative returned by the summarization service. Only `hotspots` and
/// `year_insights` feed aggregation; the rest is passed to the report as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub ai_insights: String,
    pub most_common_reason: String,
    pub interventions: Vec<String>,
    pub temporal_spikes: Vec<String>,
    pub year_insights: Vec<YearGroupAnalysis>,
    pub hotspots: Hotspots,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Headline {
    pub total_flags: usize,
    pub top_teacher: String,
    pub busiest_day: String,
    pub core_concern: String,
}

/// Everything the dashboard shows for one filter selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub year: String,
    pub headline: Headline,
    pub teachers: Vec<ChartDataPoint>,
    pub categories: Vec<ChartDataPoint>,
    pub days: Vec<ChartDataPoint>,
    pub weekly: Vec<ChartDataPoint>,
    pub hotspots: Vec<StudentHotspot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_insight: Option<YearGroupAnalysis>,
}

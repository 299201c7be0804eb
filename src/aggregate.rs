use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Weekday};
use tracing::debug;

use crate::dates;
use crate::models::{
    AnalysisSummary, ChartDataPoint, DashboardView, FlagRecord, Headline, StudentHotspot,
};

pub const OVERALL: &str = "Overall";
pub const TEACHER_LIMIT: usize = 8;
pub const CATEGORY_LIMIT: usize = 6;
pub const HOTSPOT_LIMIT: usize = 6;

const WEEK_DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum YearFilter {
    #[default]
    Overall,
    Only(String),
}

impl YearFilter {
    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        if label.is_empty() || label.eq_ignore_ascii_case(OVERALL) {
            YearFilter::Overall
        } else {
            YearFilter::Only(label.to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            YearFilter::Overall => OVERALL,
            YearFilter::Only(year) => year,
        }
    }

    fn matches(&self, record: &FlagRecord) -> bool {
        match self {
            YearFilter::Overall => true,
            YearFilter::Only(year) => record.year_group == *year,
        }
    }
}

/// Inclusive epoch-millisecond window. A `start` of `0` is unset; records whose
/// date could not be resolved only pass an unset start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: i64,
    pub end: Option<i64>,
}

impl TimeRange {
    fn contains(&self, timestamp: i64) -> bool {
        if timestamp == 0 && self.start != 0 {
            return false;
        }
        timestamp >= self.start && self.end.map_or(true, |end| timestamp <= end)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewFilter {
    pub year: YearFilter,
    pub range: TimeRange,
}

pub fn filter_records<'a>(records: &'a [FlagRecord], filter: &ViewFilter) -> Vec<&'a FlagRecord> {
    records
        .iter()
        .filter(|r| filter.year.matches(r) && filter.range.contains(r.timestamp))
        .collect()
}

/// Counts keys keeping first-seen order.
#[derive(Debug, Default)]
struct Tally {
    order: Vec<String>,
    counts: HashMap<String, usize>,
}

impl Tally {
    fn add(&mut self, key: &str) {
        match self.counts.get_mut(key) {
            Some(count) => *count += 1,
            None => {
                self.order.push(key.to_string());
                self.counts.insert(key.to_string(), 1);
            }
        }
    }

    fn into_points(self) -> Vec<ChartDataPoint> {
        let Tally { order, counts } = self;
        order
            .into_iter()
            .map(|key| {
                let value = counts.get(&key).copied().unwrap_or(0);
                ChartDataPoint::new(key, value)
            })
            .collect()
    }

    fn ranked(self) -> Vec<ChartDataPoint> {
        let mut points = self.into_points();
        // stable: ties keep first-seen order
        points.sort_by(|a, b| b.value.cmp(&a.value));
        points
    }
}

/// Most frequent keys, descending by count, at most `n`.
pub fn top_n<'a, I>(keys: I, n: usize) -> Vec<ChartDataPoint>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut tally = Tally::default();
    for key in keys {
        tally.add(key);
    }
    let mut points = tally.ranked();
    points.truncate(n);
    points
}

/// Always seven buckets, Monday first. Undated records (timestamp `0`) fall on
/// the epoch's Thursday, so the buckets always sum to the record count.
pub fn day_histogram(records: &[&FlagRecord]) -> Vec<ChartDataPoint> {
    let mut counts = [0usize; 7];
    for record in records {
        if let Some(date) = dates::millis_to_date(record.timestamp) {
            counts[date.weekday().num_days_from_monday() as usize] += 1;
        }
    }

    WEEK_DAYS
        .iter()
        .zip(counts)
        .map(|(day, count)| ChartDataPoint::new(full_day_name(*day), count))
        .collect()
}

fn full_day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// One point per week (labelled by its Monday) in first-seen order.
pub fn weekly_series(records: &[&FlagRecord]) -> Vec<ChartDataPoint> {
    let mut tally = Tally::default();
    for record in records {
        if let Some(date) = dates::millis_to_date(record.timestamp) {
            tally.add(&dates::week_label(dates::week_start(date)));
        }
    }
    tally.into_points()
}

/// Lower-cases and keeps only `a`-`z`, so "Abbott, Amelia" and
/// "abbott amelia" compare equal.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect()
}

/// Narrative summaries keyed by normalized student name. When two names
/// normalize identically the later entry wins.
#[derive(Debug, Clone, Default)]
pub struct SummaryLookup {
    by_name: HashMap<String, String>,
}

impl SummaryLookup {
    pub fn from_hotspots(students: &[StudentHotspot]) -> Self {
        let mut by_name = HashMap::new();
        for student in students {
            let key = normalize_name(&student.name);
            let summary = student.summary.trim();
            if key.is_empty() || summary.is_empty() {
                continue;
            }
            by_name.insert(key, summary.to_string());
        }
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.by_name.get(&normalize_name(name)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }
}

pub fn fallback_summary(main_reason: &str, teacher_count: usize) -> String {
    let teachers = if teacher_count == 1 {
        "1 teacher".to_string()
    } else {
        format!("{teacher_count} different teachers")
    };
    format!(
        "Demonstrates a pattern of incidents related primarily to {main_reason} across {teachers}. \
         Strategic support should focus on {} engagement.",
        main_reason.to_lowercase()
    )
}

struct StudentTally<'a> {
    name: &'a str,
    count: usize,
    categories: Tally,
    teachers: HashSet<&'a str>,
}

/// Top students by flag count with their dominant category and a summary,
/// taken from `lookup` when available.
pub fn hotspots(records: &[&FlagRecord], lookup: &SummaryLookup) -> Vec<StudentHotspot> {
    let mut order: Vec<StudentTally> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let name = record.student_name.as_str();
        let slot = *index.entry(name).or_insert_with(|| {
            order.push(StudentTally {
                name,
                count: 0,
                categories: Tally::default(),
                teachers: HashSet::new(),
            });
            order.len() - 1
        });

        let student = &mut order[slot];
        student.count += 1;
        student.categories.add(&record.category);
        student.teachers.insert(record.teacher.as_str());
    }

    order.sort_by(|a, b| b.count.cmp(&a.count));
    order.truncate(HOTSPOT_LIMIT);

    order
        .into_iter()
        .map(|student| {
            let teacher_count = student.teachers.len();
            let main_reason = student
                .categories
                .ranked()
                .into_iter()
                .next()
                .map(|p| p.name)
                .unwrap_or_else(|| "Unknown".to_string());
            let summary = match lookup.get(student.name) {
                Some(text) => text.to_string(),
                None => fallback_summary(&main_reason, teacher_count),
            };
            StudentHotspot {
                name: student.name.to_string(),
                count: student.count,
                main_reason,
                summary,
            }
        })
        .collect()
}

/// "Overall" followed by every year group present, sorted.
pub fn year_options(records: &[FlagRecord]) -> Vec<String> {
    let mut years: Vec<String> = records
        .iter()
        .map(|r| r.year_group.clone())
        .filter(|y| !y.is_empty())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    years.sort();

    let mut options = vec![OVERALL.to_string()];
    options.extend(years);
    options
}

fn headline(
    total_flags: usize,
    teachers: &[ChartDataPoint],
    categories: &[ChartDataPoint],
    days: &[ChartDataPoint],
) -> Headline {
    let first_name = |points: &[ChartDataPoint]| {
        points
            .first()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "N/A".to_string())
    };

    let busiest_day = days
        .iter()
        .filter(|d| d.value > 0)
        .fold(None::<&ChartDataPoint>, |best, day| match best {
            Some(current) if current.value >= day.value => Some(current),
            _ => Some(day),
        })
        .map(|d| d.name.clone())
        .unwrap_or_else(|| "N/A".to_string());

    Headline {
        total_flags,
        top_teacher: first_name(teachers),
        busiest_day,
        core_concern: first_name(categories),
    }
}

/// Recomputes the whole dashboard for one filter selection. Pure: `records`
/// and `summary` are only read.
pub fn build_view(
    records: &[FlagRecord],
    filter: &ViewFilter,
    summary: &AnalysisSummary,
) -> DashboardView {
    let filtered = filter_records(records, filter);
    let lookup = SummaryLookup::from_hotspots(&summary.hotspots.students);
    debug!(
        year = filter.year.label(),
        records = filtered.len(),
        summaries = lookup.len(),
        "building dashboard view"
    );

    let teachers = top_n(filtered.iter().map(|r| r.teacher.as_str()), TEACHER_LIMIT);
    let categories = top_n(filtered.iter().map(|r| r.category.as_str()), CATEGORY_LIMIT);
    let days = day_histogram(&filtered);
    let weekly = weekly_series(&filtered);
    let hotspots = hotspots(&filtered, &lookup);

    let year_insight = match &filter.year {
        YearFilter::Overall => None,
        YearFilter::Only(year) => summary
            .year_insights
            .iter()
            .find(|insight| insight.year == *year)
            .cloned(),
    };

    DashboardView {
        year: filter.year.label().to_string(),
        headline: headline(filtered.len(), &teachers, &categories, &days),
        teachers,
        categories,
        days,
        weekly,
        hotspots,
        year_insight,
    }
}

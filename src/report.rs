use std::fmt::Write;

use crate::models::{AnalysisSummary, ChartDataPoint, DashboardView};

fn write_points(output: &mut String, points: &[ChartDataPoint], empty: &str) {
    if points.iter().all(|p| p.value == 0) {
        let _ = writeln!(output, "{empty}");
        return;
    }
    for point in points {
        let _ = writeln!(output, "- {}: {}", point.name, point.value);
    }
}

fn write_list(output: &mut String, items: &[String], empty: &str) {
    if items.is_empty() {
        let _ = writeln!(output, "{empty}");
        return;
    }
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(output, "{}. {}", i + 1, item);
    }
}

pub fn build_report(view: &DashboardView, summary: &AnalysisSummary, range_label: &str) -> String {
    let mut output = String::new();
    let headline = &view.headline;

    let _ = writeln!(output, "# Behaviour Flag Report");
    let _ = writeln!(output, "Generated for {} ({})", view.year, range_label);
    let _ = writeln!(output);
    let _ = writeln!(output, "- Total flags: {}", headline.total_flags);
    let _ = writeln!(output, "- Top issuer: {}", headline.top_teacher);
    let _ = writeln!(output, "- Peak day: {}", headline.busiest_day);
    let _ = writeln!(output, "- Core concern: {}", headline.core_concern);

    // Narrative comes from the summary service; a year view uses its own entry.
    let (insight, priority, interventions, alerts) = match &view.year_insight {
        Some(year) => (
            year.insight.clone(),
            year.priority.clone(),
            year.interventions.clone(),
            year.alerts.clone(),
        ),
        None => {
            let priority = if summary.most_common_reason.is_empty() {
                String::new()
            } else {
                format!(
                    "Drive improvements in {} through consistent framework application.",
                    summary.most_common_reason
                )
            };
            let alerts = summary
                .year_insights
                .iter()
                .filter_map(|y| y.alerts.first().cloned())
                .collect();
            (
                summary.ai_insights.clone(),
                priority,
                summary.interventions.clone(),
                alerts,
            )
        }
    };

    let _ = writeln!(output);
    let _ = writeln!(output, "## {} Strategic Briefing", view.year);
    if insight.is_empty() {
        let _ = writeln!(output, "No briefing available.");
    } else {
        let _ = writeln!(output, "{insight}");
    }
    if !priority.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "Priority: {priority}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommended Interventions");
    write_list(&mut output, &interventions, "No interventions suggested.");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Temporal Spikes");
    write_list(&mut output, &summary.temporal_spikes, "No spikes identified.");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Pattern Alerts");
    write_list(&mut output, &alerts, "No alerts raised.");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Flags Per Week");
    write_points(&mut output, &view.weekly, "No dated flags in this window.");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Breakdown");
    write_points(&mut output, &view.days, "No dated flags in this window.");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Issuers");
    write_points(&mut output, &view.teachers, "No flags recorded for this window.");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Categories");
    write_points(&mut output, &view.categories, "No flags recorded for this window.");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Frequent Flyers");
    if view.hotspots.is_empty() {
        let _ = writeln!(output, "No students flagged in this window.");
    } else {
        for student in &view.hotspots {
            let _ = writeln!(
                output,
                "- {} ({} flags, mainly {}): {}",
                student.name, student.count, student.main_reason, student.summary
            );
        }
    }

    output
}

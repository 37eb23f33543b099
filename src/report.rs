use std::fmt::Write;

use clap::ValueEnum;

use crate::absent;
use crate::aggregate;
use crate::error::Result;
use crate::models::{
    AttendanceRecord, DateFilter, Dimension, GroupKey, Metric, ReportRow, SortOrder, StatusCount,
};
use crate::rank;

/// Which sections the rendered report carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportView {
    /// Per-date rankings with absentee rosters only.
    Ranking,
    /// Status mix plus the per-date rankings.
    Full,
}

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub dimension: Dimension,
    pub metric: Metric,
    pub order: SortOrder,
    pub perfect_first: bool,
    pub date_filter: DateFilter,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            dimension: Dimension::TaughtClass,
            metric: Metric::Present,
            order: SortOrder::Descending,
            perfect_first: false,
            date_filter: DateFilter::Scheduled,
        }
    }
}

/// Join aggregation, ranking, and absentee extraction into the report
/// row set: dates ascending, rows within a date in ranker order.
pub fn assemble(records: &[AttendanceRecord], options: &ReportOptions) -> Result<Vec<ReportRow>> {
    let summaries = aggregate::aggregate(records, options.dimension, options.date_filter)?;
    let ranked = rank::rank(summaries, options.metric, options.order, options.perfect_first);

    Ok(ranked
        .into_iter()
        .map(|summary| {
            let key = GroupKey {
                date: summary.date,
                value: summary.group.clone(),
            };
            let absentees = absent::absentees(records, options.dimension, &key);
            ReportRow {
                date: summary.date,
                group: summary.group,
                total: summary.total,
                present: summary.present,
                rate: summary.rate,
                rank: summary.rank,
                absentees,
            }
        })
        .collect())
}

/// Display form of a rate; 2-decimal precision lives here, at the
/// reporting boundary, not in the data.
pub fn fmt_rate(rate: Option<f64>) -> String {
    match rate {
        Some(rate) => format!("{rate:.2}%"),
        None => "n/a".to_string(),
    }
}

fn fmt_rank(rank: Option<u32>) -> String {
    match rank {
        Some(rank) => format!("#{rank}"),
        None => "#-".to_string(),
    }
}

pub fn build_report(
    view: ReportView,
    rows: &[ReportRow],
    statuses: &[StatusCount],
    options: &ReportOptions,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Attendance Report");
    let _ = writeln!(
        output,
        "Grouped by {}, ranked by {} ({})",
        options.dimension.label(),
        options.metric.label(),
        options.order.label()
    );

    if view == ReportView::Full {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Check-in Status Mix");

        if statuses.is_empty() {
            let _ = writeln!(output, "No check-in records.");
        } else {
            let total: usize = statuses.iter().map(|s| s.count).sum();
            let _ = writeln!(output, "Total records: {total}");
            for status in statuses {
                let _ = writeln!(
                    output,
                    "- {}: {} records ({:.2}%)",
                    status.status, status.count, status.share
                );
            }
        }
    }

    if rows.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "No scheduled sessions in this roster.");
        return output;
    }

    let mut current_date = None;
    for row in rows {
        if current_date != Some(row.date) {
            current_date = Some(row.date);
            let _ = writeln!(output);
            let _ = writeln!(output, "## {}", row.date);
        }

        let _ = writeln!(
            output,
            "- {} {}: {}/{} present ({})",
            fmt_rank(row.rank),
            row.group,
            row.present,
            row.total,
            fmt_rate(row.rate)
        );
        if row.absentees.is_empty() {
            let _ = writeln!(output, "  no absent students");
        } else {
            let _ = writeln!(output, "  absent: {}", row.absentees.join(", "));
        }
    }

    output
}

/// JSON form of the report rows for external presentation layers.
pub fn to_json(rows: &[ReportRow]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn record(name: &str, class: &str, date: NaiveDate, present: bool) -> AttendanceRecord {
        AttendanceRecord {
            student_name: name.to_string(),
            department: String::new(),
            major: String::new(),
            admin_class: String::new(),
            taught_class: class.to_string(),
            course: String::new(),
            teacher: "张老师".to_string(),
            session_date: date,
            status: if present { "已签" } else { "缺勤" }.to_string(),
            present,
        }
    }

    fn roster() -> Vec<AttendanceRecord> {
        vec![
            record("王磊", "软件2101", day(15), true),
            record("李娜", "软件2101", day(15), false),
            record("赵敏", "软件2102", day(15), true),
            record("孙强", "软件2102", day(16), false),
            record("钱伟", "软件2102", day(16), true),
        ]
    }

    #[test]
    fn assemble_joins_rankings_with_absentees() {
        let rows = assemble(&roster(), &ReportOptions::default()).unwrap();
        assert_eq!(rows.len(), 3);

        // 2024-03-15: 软件2102 at 100% ranks first on rate
        let options = ReportOptions {
            metric: Metric::Rate,
            ..ReportOptions::default()
        };
        let rows = assemble(&roster(), &options).unwrap();
        assert_eq!(rows[0].group, "软件2102");
        assert_eq!(rows[0].rank, Some(1));
        assert!(rows[0].absentees.is_empty());
        assert_eq!(rows[1].group, "软件2101");
        assert_eq!(rows[1].absentees, vec!["李娜"]);
    }

    #[test]
    fn dates_appear_in_ascending_order() {
        let rows = assemble(&roster(), &ReportOptions::default()).unwrap();
        let mut dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
        let sorted = {
            let mut d = dates.clone();
            d.sort();
            d
        };
        assert_eq!(dates, sorted);
        dates.dedup();
        assert_eq!(dates, vec![day(15), day(16)]);
    }

    #[test]
    fn assemble_is_idempotent() {
        let records = roster();
        let options = ReportOptions::default();
        let once = assemble(&records, &options).unwrap();
        let twice = assemble(&records, &options).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn report_carries_rankings_and_canned_absent_lines() {
        let records = roster();
        let options = ReportOptions::default();
        let rows = assemble(&records, &options).unwrap();
        let statuses = aggregate::status_mix(&records).unwrap();
        let report = build_report(ReportView::Full, &rows, &statuses, &options);

        assert!(report.contains("# Attendance Report"));
        assert!(report.contains("## Check-in Status Mix"));
        assert!(report.contains("## 2024-03-15"));
        assert!(report.contains("## 2024-03-16"));
        assert!(report.contains("absent: 李娜"));
        assert!(report.contains("no absent students"));
    }

    #[test]
    fn ranking_view_skips_the_status_mix() {
        let records = roster();
        let options = ReportOptions::default();
        let rows = assemble(&records, &options).unwrap();
        let statuses = aggregate::status_mix(&records).unwrap();
        let report = build_report(ReportView::Ranking, &rows, &statuses, &options);

        assert!(!report.contains("Check-in Status Mix"));
        assert!(report.contains("## 2024-03-15"));
    }

    #[test]
    fn rate_formatting_is_two_decimal_at_the_boundary() {
        assert_eq!(fmt_rate(Some(80.0)), "80.00%");
        assert_eq!(fmt_rate(Some(100.0 / 3.0 * 2.0)), "66.67%");
        assert_eq!(fmt_rate(None), "n/a");
    }

    #[test]
    fn json_export_round_trips() {
        let rows = assemble(&roster(), &ReportOptions::default()).unwrap();
        let json = to_json(&rows).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let array = value.as_array().unwrap();
        assert_eq!(array.len(), rows.len());
        assert_eq!(array[0]["date"], "2024-03-15");
        assert!(array[0]["total"].is_u64());
        assert!(array[0]["absentees"].is_array());
    }
}

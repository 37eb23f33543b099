use std::collections::BTreeMap;

use crate::error::{EngineError, Result};
use crate::models::{
    AttendanceRecord, AttendanceSummary, DateFilter, Dimension, GroupKey, StatusCount,
};

/// Group classified records by (session date, dimension value) and count
/// attendance per bucket.
///
/// Returns summaries ordered by date then group value, ranks unset. A
/// group only exists once a record lands in it, so totals are always
/// positive and rates always defined in the output.
pub fn aggregate(
    records: &[AttendanceRecord],
    dimension: Dimension,
    date_filter: DateFilter,
) -> Result<Vec<AttendanceSummary>> {
    let mut groups: BTreeMap<GroupKey, (usize, usize)> = BTreeMap::new();

    for record in records {
        if !date_filter.admits(record.session_date) {
            continue;
        }

        let key = GroupKey {
            date: record.session_date,
            value: record.dimension_value(dimension).to_string(),
        };
        let entry = groups.entry(key).or_insert((0, 0));
        entry.0 += 1;
        if record.present {
            entry.1 += 1;
        }
    }

    if groups.is_empty() {
        return Err(EngineError::EmptyInput);
    }

    Ok(groups
        .into_iter()
        .map(|(key, (total, present))| AttendanceSummary {
            date: key.date,
            group: key.value,
            total,
            present,
            rate: rate(present, total),
            rank: None,
        })
        .collect())
}

fn rate(present: usize, total: usize) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(present as f64 / total as f64 * 100.0)
    }
}

/// Distribution of raw check-in statuses over a record set: counts and
/// percentage shares, most frequent first, ties in first-seen order.
pub fn status_mix(records: &[AttendanceRecord]) -> Result<Vec<StatusCount>> {
    if records.is_empty() {
        return Err(EngineError::EmptyInput);
    }

    let mut counts: Vec<StatusCount> = Vec::new();
    for record in records {
        match counts.iter_mut().find(|c| c.status == record.status) {
            Some(count) => count.count += 1,
            None => counts.push(StatusCount {
                status: record.status.clone(),
                count: 1,
                share: 0.0,
            }),
        }
    }

    let total = records.len();
    for count in &mut counts {
        count.share = count.count as f64 / total as f64 * 100.0;
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sentinel_date;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn record(name: &str, class: &str, date: NaiveDate, present: bool) -> AttendanceRecord {
        AttendanceRecord {
            student_name: name.to_string(),
            department: "信息工程学院".to_string(),
            major: "软件工程".to_string(),
            admin_class: class.to_string(),
            taught_class: class.to_string(),
            course: "数据结构".to_string(),
            teacher: "张老师".to_string(),
            session_date: date,
            status: if present { "已签" } else { "缺勤" }.to_string(),
            present,
        }
    }

    #[test]
    fn counts_and_rate_for_a_single_class() {
        // 8 present + 2 absent on one date
        let mut records = Vec::new();
        for i in 0..8 {
            records.push(record(&format!("s{i}"), "软件2101", day(15), true));
        }
        for i in 8..10 {
            records.push(record(&format!("s{i}"), "软件2101", day(15), false));
        }

        let summaries = aggregate(&records, Dimension::TaughtClass, DateFilter::Scheduled).unwrap();
        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.total, 10);
        assert_eq!(summary.present, 8);
        assert_eq!(summary.rate, Some(80.0));
        assert_eq!(summary.rank, None);
    }

    #[test]
    fn totals_conserve_the_non_sentinel_record_count() {
        let records = vec![
            record("a", "软件2101", day(15), true),
            record("b", "软件2101", day(15), false),
            record("c", "软件2102", day(15), true),
            record("d", "软件2101", day(16), true),
            record("e", "软件2103", sentinel_date(), true),
            record("f", "软件2103", sentinel_date(), false),
        ];

        let summaries = aggregate(&records, Dimension::TaughtClass, DateFilter::Scheduled).unwrap();
        let total: usize = summaries.iter().map(|s| s.total).sum();
        let scheduled = records
            .iter()
            .filter(|r| r.session_date != sentinel_date())
            .count();
        assert_eq!(total, scheduled);
        for summary in &summaries {
            assert!(summary.present <= summary.total);
        }
    }

    #[test]
    fn sentinel_only_groups_never_appear() {
        let records = vec![
            record("a", "软件2101", day(15), true),
            record("b", "软件2103", sentinel_date(), true),
        ];

        let summaries = aggregate(&records, Dimension::TaughtClass, DateFilter::Scheduled).unwrap();
        assert_eq!(summaries.len(), 1);
        assert!(summaries.iter().all(|s| s.group != "软件2103"));
    }

    #[test]
    fn all_filter_keeps_the_sentinel_bucket() {
        let records = vec![
            record("a", "软件2101", day(15), true),
            record("b", "软件2103", sentinel_date(), true),
        ];

        let summaries = aggregate(&records, Dimension::TaughtClass, DateFilter::All).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].date, sentinel_date());
    }

    #[test]
    fn on_filter_selects_a_single_session() {
        let records = vec![
            record("a", "软件2101", day(15), true),
            record("b", "软件2101", day(16), true),
        ];

        let summaries =
            aggregate(&records, Dimension::TaughtClass, DateFilter::On(day(16))).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].date, day(16));
    }

    #[test]
    fn empty_input_is_a_reportable_error() {
        let err = aggregate(&[], Dimension::TaughtClass, DateFilter::Scheduled).unwrap_err();
        assert!(matches!(err, EngineError::EmptyInput));
    }

    #[test]
    fn all_sentinel_input_is_empty_after_filtering() {
        let records = vec![record("a", "软件2101", sentinel_date(), true)];
        let err = aggregate(&records, Dimension::TaughtClass, DateFilter::Scheduled).unwrap_err();
        assert!(matches!(err, EngineError::EmptyInput));
    }

    #[test]
    fn output_is_ordered_by_date_then_group() {
        let records = vec![
            record("a", "软件2102", day(16), true),
            record("b", "软件2101", day(16), true),
            record("c", "软件2102", day(15), true),
        ];

        let summaries = aggregate(&records, Dimension::TaughtClass, DateFilter::Scheduled).unwrap();
        let keys: Vec<(NaiveDate, &str)> =
            summaries.iter().map(|s| (s.date, s.group.as_str())).collect();
        assert_eq!(
            keys,
            vec![
                (day(15), "软件2102"),
                (day(16), "软件2101"),
                (day(16), "软件2102"),
            ]
        );
    }

    #[test]
    fn status_mix_counts_and_shares() {
        let mut records = Vec::new();
        for i in 0..6 {
            records.push(record(&format!("s{i}"), "软件2101", day(15), true));
        }
        records.push(record("s6", "软件2101", day(15), false));
        records.push(record("s7", "软件2101", day(15), false));

        let mix = status_mix(&records).unwrap();
        assert_eq!(mix.len(), 2);
        assert_eq!(mix[0].status, "已签");
        assert_eq!(mix[0].count, 6);
        assert!((mix[0].share - 75.0).abs() < 1e-9);
        assert_eq!(mix[1].status, "缺勤");
        assert_eq!(mix[1].count, 2);
        assert!((mix[1].share - 25.0).abs() < 1e-9);
    }

    #[test]
    fn status_mix_breaks_ties_in_first_seen_order() {
        let records = vec![
            record("a", "软件2101", day(15), false),
            record("b", "软件2101", day(15), true),
        ];

        let mix = status_mix(&records).unwrap();
        assert_eq!(mix[0].status, "缺勤");
        assert_eq!(mix[1].status, "已签");
    }

    #[test]
    fn status_mix_on_empty_input_errors() {
        assert!(matches!(status_mix(&[]), Err(EngineError::EmptyInput)));
    }
}

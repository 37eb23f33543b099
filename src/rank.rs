use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{AttendanceSummary, Metric, SortOrder};

/// Rank summaries by the chosen metric, independently within each date.
///
/// Ties share the minimum rank and the next distinct value skips ahead
/// by the tie-group size (two groups tied at the top both rank 1, the
/// next ranks 3). Summaries with an undefined rate are left unranked and
/// trail their date's ordered entries when ranking by rate.
///
/// `perfect_first` reproduces the teacher-view ordering: groups at
/// exactly 100% rate are hoisted to the front of their date regardless
/// of the primary order. Ranks still follow the primary metric; the flag
/// only changes the returned order.
pub fn rank(
    summaries: Vec<AttendanceSummary>,
    metric: Metric,
    order: SortOrder,
    perfect_first: bool,
) -> Vec<AttendanceSummary> {
    let mut by_date: BTreeMap<NaiveDate, Vec<AttendanceSummary>> = BTreeMap::new();
    for summary in summaries {
        by_date.entry(summary.date).or_default().push(summary);
    }

    let mut out = Vec::new();
    for (_, group) in by_date {
        out.extend(rank_within_date(group, metric, order, perfect_first));
    }
    out
}

fn metric_value(summary: &AttendanceSummary, metric: Metric) -> Option<f64> {
    match metric {
        Metric::Present => Some(summary.present as f64),
        Metric::Rate => summary.rate,
    }
}

fn rank_within_date(
    group: Vec<AttendanceSummary>,
    metric: Metric,
    order: SortOrder,
    perfect_first: bool,
) -> Vec<AttendanceSummary> {
    let (mut ranked, unranked): (Vec<_>, Vec<_>) = group
        .into_iter()
        .partition(|summary| metric_value(summary, metric).is_some());

    ranked.sort_by(|a, b| {
        let ordering = metric_value(a, metric)
            .partial_cmp(&metric_value(b, metric))
            .unwrap_or(Ordering::Equal);
        match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });

    let mut last_value: Option<f64> = None;
    let mut last_rank = 0u32;
    for (i, summary) in ranked.iter_mut().enumerate() {
        let value = metric_value(summary, metric);
        if value != last_value {
            last_rank = i as u32 + 1;
            last_value = value;
        }
        summary.rank = Some(last_rank);
    }

    if perfect_first {
        let (perfect, rest): (Vec<_>, Vec<_>) = ranked
            .into_iter()
            .partition(|summary| summary.rate == Some(100.0));
        ranked = perfect.into_iter().chain(rest).collect();
    }

    ranked.extend(unranked);
    ranked
}

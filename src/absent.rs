use crate::models::{AttendanceRecord, Dimension, GroupKey};

/// Names of the absent members of one (date, dimension value) group, in
/// first-seen order. Duplicate source rows stay duplicated: flagging
/// them is the roster's problem, not this engine's. Always a concrete
/// (possibly empty) vector, never a missing value.
pub fn absentees(
    records: &[AttendanceRecord],
    dimension: Dimension,
    key: &GroupKey,
) -> Vec<String> {
    records
        .iter()
        .filter(|record| {
            record.session_date == key.date
                && record.dimension_value(dimension) == key.value
                && !record.present
        })
        .map(|record| record.student_name.clone())
        .collect()
}

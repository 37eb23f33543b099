use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;

/// Placeholder date substituted for blank session dates in the source
/// roster. Records carrying it are excluded from per-date aggregation
/// unless a caller asks for them explicitly.
pub fn sentinel_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).expect("fixed placeholder date")
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    pub student_name: String,
    pub department: String,
    pub major: String,
    pub admin_class: String,
    pub taught_class: String,
    pub course: String,
    pub teacher: String,
    pub session_date: NaiveDate,
    pub status: String,
    /// Derived outcome, attached by the classifier pass.
    pub present: bool,
}

impl AttendanceRecord {
    pub fn dimension_value(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::TaughtClass => &self.taught_class,
            Dimension::Teacher => &self.teacher,
            Dimension::Department => &self.department,
            Dimension::Major => &self.major,
            Dimension::AdminClass => &self.admin_class,
        }
    }
}

/// Grouping axis for aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Dimension {
    TaughtClass,
    Teacher,
    Department,
    Major,
    AdminClass,
}

impl Dimension {
    pub fn label(self) -> &'static str {
        match self {
            Dimension::TaughtClass => "taught class",
            Dimension::Teacher => "teacher",
            Dimension::Department => "department",
            Dimension::Major => "major",
            Dimension::AdminClass => "administrative class",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Metric {
    Present,
    Rate,
}

impl Metric {
    pub fn label(self) -> &'static str {
        match self {
            Metric::Present => "present count",
            Metric::Rate => "attendance rate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn label(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ascending",
            SortOrder::Descending => "descending",
        }
    }
}

/// Which session dates an aggregation pass admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFilter {
    /// Real session dates only; the sentinel is excluded.
    #[default]
    Scheduled,
    /// Every record, sentinel included.
    All,
    /// A single session date.
    On(NaiveDate),
}

impl DateFilter {
    pub fn admits(self, date: NaiveDate) -> bool {
        match self {
            DateFilter::Scheduled => date != sentinel_date(),
            DateFilter::All => true,
            DateFilter::On(day) => date == day,
        }
    }
}

/// One aggregation bucket: a session date plus a dimension value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub date: NaiveDate,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub date: NaiveDate,
    pub group: String,
    pub total: usize,
    pub present: usize,
    /// Percentage in [0, 100]; `None` when the bucket is empty.
    pub rate: Option<f64>,
    /// 1-based, assigned per date by the ranker.
    pub rank: Option<u32>,
}

/// One assembled report line, the shape handed to presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub date: NaiveDate,
    pub group: String,
    pub total: usize,
    pub present: usize,
    pub rate: Option<f64>,
    pub rank: Option<u32>,
    pub absentees: Vec<String>,
}

/// One raw check-in status value with its share of the record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
    /// Percentage of all counted records.
    pub share: f64,
}

/// Conjunctive equality filters over record fields; unset means "all".
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub department: Option<String>,
    pub major: Option<String>,
    pub admin_class: Option<String>,
    pub taught_class: Option<String>,
    pub course: Option<String>,
    pub teacher: Option<String>,
    pub date: Option<NaiveDate>,
}

impl RecordFilter {
    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        let field = |want: &Option<String>, have: &str| match want {
            Some(value) => value == have,
            None => true,
        };

        field(&self.department, &record.department)
            && field(&self.major, &record.major)
            && field(&self.admin_class, &record.admin_class)
            && field(&self.taught_class, &record.taught_class)
            && field(&self.course, &record.course)
            && field(&self.teacher, &record.teacher)
            && self.date.map_or(true, |day| record.session_date == day)
    }

    pub fn is_empty(&self) -> bool {
        self.department.is_none()
            && self.major.is_none()
            && self.admin_class.is_none()
            && self.taught_class.is_none()
            && self.course.is_none()
            && self.teacher.is_none()
            && self.date.is_none()
    }
}

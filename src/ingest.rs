use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{EngineError, Result};
use crate::models::{sentinel_date, AttendanceRecord};

/// A check-in roster as loaded from disk: one header row plus string
/// cells. The engine never reads files itself; this is the hand-off
/// shape from the ingestion glue.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Expected header spelling for each semantic column role. Source files
/// vary the spelling; callers remap instead of editing the engine.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    pub student_name: String,
    pub department: String,
    pub major: String,
    pub admin_class: String,
    pub taught_class: String,
    pub course: String,
    pub teacher: String,
    pub session_date: String,
    pub status: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            student_name: "姓名".to_string(),
            department: "院系".to_string(),
            major: "专业".to_string(),
            admin_class: "行政班级".to_string(),
            taught_class: "授课班级".to_string(),
            course: "课程".to_string(),
            teacher: "教师".to_string(),
            session_date: "时间".to_string(),
            status: "签到状态".to_string(),
        }
    }
}

/// A row the normalizer refused, with its 1-based data row number.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedRow {
    pub row: usize,
    pub reason: String,
}

#[derive(Debug)]
pub struct Normalized {
    pub records: Vec<AttendanceRecord>,
    pub dropped: Vec<DroppedRow>,
}

pub fn load_table(path: &Path) -> anyhow::Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable { headers, rows })
}

struct ColumnIdx {
    student_name: usize,
    taught_class: usize,
    teacher: usize,
    session_date: usize,
    status: usize,
    department: Option<usize>,
    major: Option<usize>,
    admin_class: Option<usize>,
    course: Option<usize>,
}

fn find_required(headers: &[String], expected: &str, role: &'static str) -> Result<usize> {
    headers
        .iter()
        .position(|header| header.trim() == expected)
        .ok_or_else(|| EngineError::MissingColumn {
            role,
            expected: expected.to_string(),
        })
}

fn find_optional(headers: &[String], expected: &str) -> Option<usize> {
    headers.iter().position(|header| header.trim() == expected)
}

fn resolve_columns(headers: &[String], columns: &ColumnMap) -> Result<ColumnIdx> {
    Ok(ColumnIdx {
        student_name: find_required(headers, &columns.student_name, "student name")?,
        taught_class: find_required(headers, &columns.taught_class, "taught class")?,
        teacher: find_required(headers, &columns.teacher, "teacher")?,
        session_date: find_required(headers, &columns.session_date, "session date")?,
        status: find_required(headers, &columns.status, "check-in status")?,
        department: find_optional(headers, &columns.department),
        major: find_optional(headers, &columns.major),
        admin_class: find_optional(headers, &columns.admin_class),
        course: find_optional(headers, &columns.course),
    })
}

fn parse_session_date(cell: &str) -> Option<NaiveDate> {
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(cell, fmt) {
            return Some(date);
        }
    }
    // excel exports sometimes carry a time component
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(cell, fmt) {
            return Some(datetime.date());
        }
    }
    None
}

/// Turn a raw roster table into canonical attendance records.
///
/// Drop policy: a row missing student name, taught class, teacher, or
/// check-in status is dropped and reported; a blank session date gets
/// the sentinel and the row is kept; department, major, administrative
/// class, and course default to empty strings. One policy for every
/// caller.
pub fn normalize(table: &RawTable, columns: &ColumnMap) -> Result<Normalized> {
    let idx = resolve_columns(&table.headers, columns)?;

    let mut records = Vec::new();
    let mut dropped = Vec::new();

    for (i, row) in table.rows.iter().enumerate() {
        let cell = |position: usize| row.get(position).map_or("", |value| value.trim());
        let optional = |position: Option<usize>| position.map_or("", cell);
        let row_number = i + 1;

        let mut missing = None;
        for (position, header) in [
            (idx.student_name, &columns.student_name),
            (idx.taught_class, &columns.taught_class),
            (idx.teacher, &columns.teacher),
            (idx.status, &columns.status),
        ] {
            if cell(position).is_empty() {
                missing = Some(header.clone());
                break;
            }
        }
        if let Some(header) = missing {
            dropped.push(DroppedRow {
                row: row_number,
                reason: format!("missing {header}"),
            });
            continue;
        }

        let date_cell = cell(idx.session_date);
        let session_date = if date_cell.is_empty() {
            sentinel_date()
        } else {
            match parse_session_date(date_cell) {
                Some(date) => date,
                None => {
                    dropped.push(DroppedRow {
                        row: row_number,
                        reason: format!("unparseable {} {date_cell:?}", columns.session_date),
                    });
                    continue;
                }
            }
        };

        records.push(AttendanceRecord {
            student_name: cell(idx.student_name).to_string(),
            department: optional(idx.department).to_string(),
            major: optional(idx.major).to_string(),
            admin_class: optional(idx.admin_class).to_string(),
            taught_class: cell(idx.taught_class).to_string(),
            course: optional(idx.course).to_string(),
            teacher: cell(idx.teacher).to_string(),
            session_date,
            status: cell(idx.status).to_string(),
            present: false,
        });
    }

    Ok(Normalized { records, dropped })
}

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{ArgGroup, Parser, Subcommand};

mod absent;
mod aggregate;
mod classify;
mod error;
mod ingest;
mod models;
mod rank;
mod report;

use crate::classify::ClassifyPolicy;
use crate::error::EngineError;
use crate::models::{AttendanceRecord, DateFilter, Dimension, Metric, RecordFilter, SortOrder};
use crate::report::{ReportOptions, ReportView};

#[derive(Parser)]
#[command(name = "attendance-stats")]
#[command(about = "Attendance statistics and rankings for check-in rosters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the check-in status distribution of an optionally filtered roster
    Statuses {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        major: Option<String>,
        #[arg(long)]
        admin_class: Option<String>,
        #[arg(long)]
        taught_class: Option<String>,
        #[arg(long)]
        course: Option<String>,
        #[arg(long)]
        teacher: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Rank groups within each session date by attendance
    Rank {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, value_enum, default_value = "taught-class")]
        dimension: Dimension,
        #[arg(long, value_enum, default_value = "present")]
        metric: Metric,
        #[arg(long, value_enum, default_value = "descending")]
        order: SortOrder,
        /// Hoist groups at exactly 100% to the front of each date
        #[arg(long)]
        perfect_first: bool,
        /// Restrict to a single session date
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Statuses counted as present (default: 已签, 教师代签)
        #[arg(long = "present-status")]
        present_statuses: Vec<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate an attendance report (markdown, or JSON with --json)
    #[command(group(
        ArgGroup::new("format")
            .args(["view", "json"])
            .multiple(false)
    ))]
    Report {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, value_enum, default_value = "taught-class")]
        dimension: Dimension,
        #[arg(long, value_enum, default_value = "present")]
        metric: Metric,
        #[arg(long, value_enum, default_value = "descending")]
        order: SortOrder,
        #[arg(long)]
        perfect_first: bool,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long = "present-status")]
        present_statuses: Vec<String>,
        #[arg(long, value_enum, default_value = "full")]
        view: ReportView,
        /// Write the report rows as JSON instead of markdown
        #[arg(long)]
        json: bool,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Statuses {
            csv,
            department,
            major,
            admin_class,
            taught_class,
            course,
            teacher,
            date,
        } => {
            let records = load_records(&csv)?;
            let filter = RecordFilter {
                department,
                major,
                admin_class,
                taught_class,
                course,
                teacher,
                date,
            };

            println!();
            if filter.is_empty() {
                println!("No filters selected.");
            } else {
                println!("Active filters:");
                for condition in describe_filter(&filter) {
                    println!("- {condition}");
                }
            }

            let subset: Vec<AttendanceRecord> = records
                .iter()
                .filter(|record| filter.matches(record))
                .cloned()
                .collect();

            match aggregate::status_mix(&subset) {
                Ok(mix) => {
                    println!();
                    println!("Check-in status mix ({} records):", subset.len());
                    for status in &mix {
                        println!(
                            "- {}: {} records ({:.2}%)",
                            status.status, status.count, status.share
                        );
                    }
                }
                Err(EngineError::EmptyInput) => {
                    println!();
                    println!("No records match these filters.");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Commands::Rank {
            csv,
            dimension,
            metric,
            order,
            perfect_first,
            date,
            present_statuses,
            limit,
        } => {
            let policy = present_policy(present_statuses);
            let records = classify::classify(load_records(&csv)?, &policy);
            let date_filter = date.map_or(DateFilter::Scheduled, DateFilter::On);

            let summaries = match aggregate::aggregate(&records, dimension, date_filter) {
                Ok(summaries) => summaries,
                Err(EngineError::EmptyInput) => {
                    println!("No scheduled attendance records in this roster.");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };
            let ranked = rank::rank(summaries, metric, order, perfect_first);

            println!();
            println!(
                "Rankings by {} per {} ({}):",
                metric.label(),
                dimension.label(),
                order.label()
            );
            let mut current_date = None;
            let mut shown = 0usize;
            for summary in &ranked {
                if current_date != Some(summary.date) {
                    current_date = Some(summary.date);
                    shown = 0;
                    println!();
                    println!("{}:", summary.date);
                }
                if shown >= limit {
                    continue;
                }
                shown += 1;
                println!(
                    "- #{} {}: {}/{} present ({})",
                    summary
                        .rank
                        .map_or_else(|| "-".to_string(), |rank| rank.to_string()),
                    summary.group,
                    summary.present,
                    summary.total,
                    report::fmt_rate(summary.rate)
                );
            }
        }
        Commands::Report {
            csv,
            dimension,
            metric,
            order,
            perfect_first,
            date,
            present_statuses,
            view,
            json,
            out,
        } => {
            let policy = present_policy(present_statuses);
            let records = classify::classify(load_records(&csv)?, &policy);
            let options = ReportOptions {
                dimension,
                metric,
                order,
                perfect_first,
                date_filter: date.map_or(DateFilter::Scheduled, DateFilter::On),
            };

            let rows = match report::assemble(&records, &options) {
                Ok(rows) => rows,
                Err(EngineError::EmptyInput) => {
                    println!("No scheduled attendance records in this roster.");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };

            let output = if json {
                report::to_json(&rows)?
            } else {
                let statuses = aggregate::status_mix(&records)?;
                report::build_report(view, &rows, &statuses, &options)
            };
            std::fs::write(&out, output)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn load_records(csv: &Path) -> anyhow::Result<Vec<AttendanceRecord>> {
    let table = ingest::load_table(csv)
        .with_context(|| format!("failed to read roster {}", csv.display()))?;
    let normalized = ingest::normalize(&table, &ingest::ColumnMap::default())?;

    println!(
        "Loaded {} records from {}.",
        normalized.records.len(),
        csv.display()
    );
    if !normalized.dropped.is_empty() {
        println!("Dropped {} malformed rows:", normalized.dropped.len());
        for drop in &normalized.dropped {
            println!("- row {}: {}", drop.row, drop.reason);
        }
    }

    Ok(normalized.records)
}

fn present_policy(present_statuses: Vec<String>) -> ClassifyPolicy {
    if present_statuses.is_empty() {
        ClassifyPolicy::default()
    } else {
        ClassifyPolicy::new(present_statuses)
    }
}

fn describe_filter(filter: &RecordFilter) -> Vec<String> {
    let mut conditions = Vec::new();
    let labeled = [
        ("department", &filter.department),
        ("major", &filter.major),
        ("administrative class", &filter.admin_class),
        ("taught class", &filter.taught_class),
        ("course", &filter.course),
        ("teacher", &filter.teacher),
    ];
    for (label, value) in labeled {
        if let Some(value) = value {
            conditions.push(format!("{label}: {value}"));
        }
    }
    if let Some(date) = filter.date {
        conditions.push(format!("date: {date}"));
    }
    conditions
}

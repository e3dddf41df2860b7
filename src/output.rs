use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use chrono::NaiveDate;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::OutputFormat;
use crate::form::FieldErrors;

/// Global output settings, fixed once at startup
static FORMAT: AtomicU8 = AtomicU8::new(0);
static QUIET: AtomicBool = AtomicBool::new(false);

pub fn set_format(format: OutputFormat) {
    let raw = match format {
        OutputFormat::Table => 0,
        OutputFormat::Json => 1,
        OutputFormat::Compact => 2,
    };
    FORMAT.store(raw, Ordering::Relaxed);
}

pub fn format() -> OutputFormat {
    match FORMAT.load(Ordering::Relaxed) {
        1 => OutputFormat::Json,
        2 => OutputFormat::Compact,
        _ => OutputFormat::Table,
    }
}

pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Print items as a table, JSON, or one line each
pub fn print_table<T, R, F, C>(items: &[T], to_row: F, to_line: C)
where
    T: Serialize,
    R: Tabled,
    F: Fn(&T) -> R,
    C: Fn(&T) -> String,
{
    match format() {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        OutputFormat::Compact => {
            for item in items {
                println!("{}", to_line(item));
            }
        }
        OutputFormat::Table => {
            if items.is_empty() {
                print_message("No users found.");
                return;
            }
            let rows: Vec<R> = items.iter().map(to_row).collect();
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{table}");
        }
    }
}

/// Print a single item or JSON depending on output mode
pub fn print_item<T: Serialize>(item: &T, display: impl FnOnce(&T)) {
    if matches!(format(), OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(item).unwrap_or_default());
    } else if !is_quiet() {
        display(item);
    }
}

/// Print a message (skipped when quiet, wrapped in an object for JSON)
pub fn print_message(message: &str) {
    if is_quiet() {
        return;
    }
    if matches!(format(), OutputFormat::Json) {
        println!("{}", serde_json::json!({ "message": message }));
    } else {
        println!("{message}");
    }
}

/// Print validation messages, one per field, to stderr
pub fn print_field_errors(errors: &FieldErrors) {
    for (field, message) in errors.iter() {
        eprintln!("  {} {}*", format!("{field}:").bold(), message.red());
    }
}

/// Format a `YYYY-MM-DD` birthday for display, e.g. "10 Dec 1815"
pub fn format_birthday(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%-d %b %Y").to_string())
        .unwrap_or_else(|_| date.to_string())
}

/// Truncate a string with ellipsis
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

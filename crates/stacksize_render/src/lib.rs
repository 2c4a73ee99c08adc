use std::fmt::Write as _;

use serde_json::{Map as JsonMap, Value as JsonValue};
use stacksize_core::core_api::{CategoryReportRow, CommandReply, ItemReportRow, PassReport};

const ITEM_COL_ID: usize = 12;
const ITEM_COL_SHORTNAME: usize = 28;
const ITEM_COL_CATEGORY: usize = 12;
const ITEM_COL_STACK: usize = 15;
const CATEGORY_COL_NAME: usize = 16;
const CATEGORY_COL_COUNT: usize = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonStyle {
    #[default]
    CanonicalV1,
}

pub fn render_reply_json(reply: &CommandReply, style: JsonStyle) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => {
            let mut m = JsonMap::new();
            match reply {
                CommandReply::Done { message, report } => {
                    m.insert("message".to_string(), JsonValue::String(message.clone()));
                    m.insert("report".to_string(), pass_report_to_json(report));
                }
                CommandReply::Items(rows) => {
                    m.insert("items".to_string(), items_to_json(rows));
                }
                CommandReply::Categories(rows) => {
                    m.insert("categories".to_string(), categories_to_json(rows));
                }
            }
            JsonValue::Object(m)
        }
    }
}

pub fn render_items_json(rows: &[ItemReportRow], style: JsonStyle) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => items_to_json(rows),
    }
}

pub fn render_categories_json(rows: &[CategoryReportRow], style: JsonStyle) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => categories_to_json(rows),
    }
}

pub fn render_pass_report_json(report: &PassReport, style: JsonStyle) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => pass_report_to_json(report),
    }
}

/// Plain-text reply as an operator console shows it.
pub fn render_reply_text(reply: &CommandReply) -> String {
    match reply {
        CommandReply::Done { message, report } => {
            format!("{message}\n{}", render_pass_summary(report))
        }
        CommandReply::Items(rows) => render_items_table(rows),
        CommandReply::Categories(rows) => render_categories_table(rows),
    }
}

pub fn render_pass_summary(report: &PassReport) -> String {
    format!(
        "Updated {} items (baseline forced: {}, skipped: {}, degraded: {})",
        format_number_with_commas(report.updated as u64),
        format_number_with_commas(report.forced_baseline as u64),
        format_number_with_commas(report.skipped as u64),
        format_number_with_commas(report.degraded as u64),
    )
}

pub fn render_items_table(rows: &[ItemReportRow]) -> String {
    let mut out = String::new();
    let header = format!(
        "{:<a$}{:<b$}{:<c$}{:>d$}{:>d$}{:>d$}",
        "Unique Id",
        "Shortname",
        "Category",
        "Vanilla Stack",
        "Custom Stack",
        "Effective Stack",
        a = ITEM_COL_ID,
        b = ITEM_COL_SHORTNAME,
        c = ITEM_COL_CATEGORY,
        d = ITEM_COL_STACK
    );
    writeln!(out, "{}", header.trim_end()).expect("writing to String cannot fail");

    if rows.is_empty() {
        writeln!(out, "  none").expect("writing to String cannot fail");
        return out;
    }

    for row in rows {
        let line = format!(
            "{:<a$}{:<b$}{:<c$}{:>d$}{:>d$}{:>d$}",
            row.item_id,
            fit_column(&row.shortname, ITEM_COL_SHORTNAME - 1),
            row.category.as_str(),
            format_number_with_commas(u64::from(row.baseline)),
            format_number_with_commas(u64::from(row.custom)),
            format_number_with_commas(u64::from(row.effective)),
            a = ITEM_COL_ID,
            b = ITEM_COL_SHORTNAME,
            c = ITEM_COL_CATEGORY,
            d = ITEM_COL_STACK
        );
        writeln!(out, "{}", line.trim_end()).expect("writing to String cannot fail");
    }
    out
}

pub fn render_categories_table(rows: &[CategoryReportRow]) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "{:<a$}{:>b$}",
        "Category Name",
        "Items In Category",
        a = CATEGORY_COL_NAME,
        b = CATEGORY_COL_COUNT
    )
    .expect("writing to String cannot fail");
    for row in rows {
        writeln!(
            out,
            "{:<a$}{:>b$}",
            row.category.as_str(),
            format_number_with_commas(row.item_count as u64),
            a = CATEGORY_COL_NAME,
            b = CATEGORY_COL_COUNT
        )
        .expect("writing to String cannot fail");
    }
    out
}

fn items_to_json(rows: &[ItemReportRow]) -> JsonValue {
    JsonValue::Array(
        rows.iter()
            .map(|row| {
                let mut m = JsonMap::new();
                m.insert("item_id".to_string(), JsonValue::from(row.item_id));
                m.insert("shortname".to_string(), JsonValue::String(row.shortname.clone()));
                m.insert(
                    "category".to_string(),
                    JsonValue::String(row.category.as_str().to_string()),
                );
                m.insert("baseline".to_string(), JsonValue::from(row.baseline));
                m.insert("custom".to_string(), JsonValue::from(row.custom));
                m.insert("effective".to_string(), JsonValue::from(row.effective));
                JsonValue::Object(m)
            })
            .collect(),
    )
}

fn categories_to_json(rows: &[CategoryReportRow]) -> JsonValue {
    JsonValue::Array(
        rows.iter()
            .map(|row| {
                let mut m = JsonMap::new();
                m.insert(
                    "category".to_string(),
                    JsonValue::String(row.category.as_str().to_string()),
                );
                m.insert("item_count".to_string(), JsonValue::from(row.item_count));
                JsonValue::Object(m)
            })
            .collect(),
    )
}

fn pass_report_to_json(report: &PassReport) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("updated".to_string(), JsonValue::from(report.updated));
    m.insert(
        "forced_baseline".to_string(),
        JsonValue::from(report.forced_baseline),
    );
    m.insert("skipped".to_string(), JsonValue::from(report.skipped));
    m.insert("degraded".to_string(), JsonValue::from(report.degraded));
    JsonValue::Object(m)
}

fn fit_column(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    if width <= 3 {
        return value.chars().take(width).collect();
    }

    let mut out: String = value.chars().take(width - 3).collect();
    out.push_str("...");
    out
}

fn format_number_with_commas(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i).is_multiple_of(3) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ---------------------------------------------------------------------------
// Report Materializer — dense, zero-filled views over the trend window
// ---------------------------------------------------------------------------
//
// All three views (JSON, CSV, HTML) are produced from one `ReportViews`
// value, so they always share the same filtered rows and the same
// chronological column order.
// ---------------------------------------------------------------------------

use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::PulseError;
use crate::persistence::{PersistenceError, write_atomic};
use crate::types::TrendSnapshot;

pub const JSON_REPORT_NAME: &str = "trend_report.json";
pub const CSV_REPORT_NAME: &str = "trend_report.csv";
pub const HTML_REPORT_NAME: &str = "trend_report.html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
	pub topic: String,
	/// One count per entry of `ReportViews::dates`.
	pub counts: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportViews {
	pub dates: Vec<NaiveDate>,
	pub rows: Vec<ReportRow>,
}

/// The contiguous window `[target - (window_days - 1) ..= target]`.
///
/// Fails rather than returning fewer than `window_days` dates.
pub fn date_window(target_date: NaiveDate, window_days: u32) -> Result<Vec<NaiveDate>, PulseError> {
	let span = window_days
		.checked_sub(1)
		.ok_or_else(|| PulseError::InvalidInput("report window must be at least one day".into()))?;
	let start = target_date
		.checked_sub_days(Days::new(u64::from(span)))
		.ok_or_else(|| {
			PulseError::InvalidInput(format!(
				"a {window_days}-day window ending {target_date} falls outside the calendar range"
			))
		})?;
	Ok(start.iter_days().take(span as usize + 1).collect())
}

/// Build the zero-filled window for every topic and drop all-zero rows.
pub fn render(
	snapshot: &TrendSnapshot,
	target_date: NaiveDate,
	window_days: u32,
) -> Result<ReportViews, PulseError> {
	let dates = date_window(target_date, window_days)?;
	let rows = snapshot
		.iter()
		.map(|(topic, by_date)| ReportRow {
			topic: topic.clone(),
			counts: dates
				.iter()
				.map(|d| by_date.get(d).copied().unwrap_or(0))
				.collect(),
		})
		.filter(|row| row.counts.iter().any(|&c| c > 0))
		.collect();
	Ok(ReportViews { dates, rows })
}

// ---------------------------------------------------------------------------
// Structured view
// ---------------------------------------------------------------------------

struct RowCounts<'a> {
	dates: &'a [NaiveDate],
	counts: &'a [u32],
}

impl Serialize for RowCounts<'_> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(Some(self.dates.len()))?;
		for (date, count) in self.dates.iter().zip(self.counts) {
			map.serialize_entry(date, count)?;
		}
		map.end()
	}
}

/// Serializes as `{topic: {date: count}}` in row and column order.
impl Serialize for ReportViews {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(Some(self.rows.len()))?;
		for row in &self.rows {
			map.serialize_entry(
				&row.topic,
				&RowCounts {
					dates: &self.dates,
					counts: &row.counts,
				},
			)?;
		}
		map.end()
	}
}

// ---------------------------------------------------------------------------
// Tabular and visual views
// ---------------------------------------------------------------------------

fn csv_field(field: &str) -> String {
	if field.contains(&[',', '"', '\n', '\r'][..]) {
		format!("\"{}\"", field.replace('"', "\"\""))
	} else {
		field.to_string()
	}
}

fn html_escape(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#39;"),
			_ => out.push(c),
		}
	}
	out
}

const HTML_STYLE: &str = r#"<style>
body { font-family: "Segoe UI", Roboto, Helvetica, Arial, sans-serif; background-color: #f8f9f8; padding: 40px; color: #2f362f; }
h2 { margin-bottom: 24px; color: #3e4d41; font-weight: 600; }
table { border-collapse: separate; border-spacing: 0; width: 100%; background-color: #ffffff; border-radius: 10px; overflow: hidden; box-shadow: 0 4px 20px rgba(0, 0, 0, 0.06); border: 1px solid #e1e8e1; }
th, td { border-bottom: 1px solid #edf2ed; padding: 14px 18px; text-align: center; font-size: 14px; }
th { background-color: #4a5d4e; color: #ffffff; font-weight: 500; text-transform: uppercase; font-size: 12px; position: sticky; top: 0; }
td:first-child { font-weight: 600; text-align: left; background-color: #fbfcfa; border-right: 1px solid #edf2ed; }
tr:nth-child(even) { background-color: #f1f4f1; }
tr:hover { background-color: #e2e8e2; }
</style>"#;

impl ReportViews {
	pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string_pretty(self)
	}

	/// Header `Topic,<dates>` followed by one line per row.
	pub fn to_csv(&self) -> String {
		let mut out = String::from("Topic");
		for date in &self.dates {
			out.push(',');
			out.push_str(&date.to_string());
		}
		out.push_str("\r\n");
		for row in &self.rows {
			out.push_str(&csv_field(&row.topic));
			for count in &row.counts {
				out.push(',');
				out.push_str(&count.to_string());
			}
			out.push_str("\r\n");
		}
		out
	}

	pub fn to_html(&self) -> String {
		let mut html = String::new();
		html.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Trend Report</title>\n");
		html.push_str(HTML_STYLE);
		html.push_str("\n</head><body>\n");
		html.push_str(&format!("<h2>{}-Day Trend Report</h2>\n", self.dates.len()));
		html.push_str("<table>\n<tr><th>Topic</th>");
		for date in &self.dates {
			html.push_str(&format!("<th>{date}</th>"));
		}
		html.push_str("</tr>\n");
		for row in &self.rows {
			html.push_str(&format!("<tr><td>{}</td>", html_escape(&row.topic)));
			for count in &row.counts {
				html.push_str(&format!("<td>{count}</td>"));
			}
			html.push_str("</tr>\n");
		}
		html.push_str("</table>\n</body></html>\n");
		html
	}
}

/// Paths of the files written by `write_all`.
#[derive(Debug, Clone)]
pub struct ReportPaths {
	pub json: PathBuf,
	pub csv: PathBuf,
	pub html: PathBuf,
}

/// Write the three views into `output_dir`, each replaced atomically.
pub fn write_all(views: &ReportViews, output_dir: &Path) -> Result<ReportPaths, PersistenceError> {
	let paths = ReportPaths {
		json: output_dir.join(JSON_REPORT_NAME),
		csv: output_dir.join(CSV_REPORT_NAME),
		html: output_dir.join(HTML_REPORT_NAME),
	};
	let json = views
		.to_json_pretty()
		.map_err(|e| PersistenceError::Serialization(e.to_string()))?;
	write_atomic(&paths.json, json.as_bytes())?;
	write_atomic(&paths.csv, views.to_csv().as_bytes())?;
	write_atomic(&paths.html, views.to_html().as_bytes())?;
	tracing::info!(
		dir = %output_dir.display(),
		rows = views.rows.len(),
		columns = views.dates.len(),
		"Report written"
	);
	Ok(paths)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

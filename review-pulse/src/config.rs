use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub const DEFAULT_WINDOW_DAYS: u32 = 30;
/// Ten years of daily columns.
pub const MAX_WINDOW_DAYS: u32 = 3660;

/// Library-level settings shared by the driver and the report writers.
#[derive(Debug, Clone)]
pub struct PulseConfig {
	pub state_dir: PathBuf,
	pub output_dir: PathBuf,
	pub window_days: u32,
}

impl Default for PulseConfig {
	fn default() -> Self {
		Self {
			state_dir: PathBuf::from("storage"),
			output_dir: PathBuf::from("output"),
			window_days: DEFAULT_WINDOW_DAYS,
		}
	}
}

#[derive(Parser, Debug)]
#[command(
	name = "review-pulse",
	version,
	about = "Rolling topic trend reports from app-store review batches"
)]
pub struct CliArgs {
	/// Directory holding the persisted stores and seed topics
	#[arg(long, default_value = "storage", env = "REVIEW_PULSE_STATE_DIR")]
	pub state_dir: PathBuf,

	/// Directory the report files are written to
	#[arg(long, default_value = "output", env = "REVIEW_PULSE_OUTPUT_DIR")]
	pub output_dir: PathBuf,

	/// Retention and report window in days
	#[arg(long, default_value_t = DEFAULT_WINDOW_DAYS, env = "REVIEW_PULSE_WINDOW_DAYS",
		value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_WINDOW_DAYS)))]
	pub window_days: u32,

	/// Seed topics file (JSON array of names). Defaults to
	/// `<state-dir>/seed_topics.json`
	#[arg(long, env = "REVIEW_PULSE_SEEDS")]
	pub seeds: Option<PathBuf>,

	/// Log level (trace, debug, info, warn, error)
	#[arg(long, default_value = "info", env = "REVIEW_PULSE_LOG_LEVEL")]
	pub log_level: String,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Aggregate one day's review batch and render the report
	RunDay {
		/// Target date (YYYY-MM-DD)
		#[arg(long)]
		date: String,

		/// Raw review batch: JSON array of {"text", "rating"}
		#[arg(long)]
		reviews: PathBuf,

		/// Candidate topics (JSON array of {"topic", "evidence"}). When
		/// omitted they are discovered from the reviews.
		#[arg(long)]
		candidates: Option<PathBuf>,

		/// Skip writing report files
		#[arg(long)]
		no_report: bool,
	},

	/// Aggregate consecutive days from `<batches-dir>/<YYYY-MM-DD>.json`
	Backfill {
		/// First date (YYYY-MM-DD)
		#[arg(long)]
		start: String,

		/// Number of days, defaults to the window length
		#[arg(long)]
		days: Option<u32>,

		/// Directory containing one review batch file per date
		#[arg(long)]
		batches_dir: PathBuf,
	},

	/// Render the report for a date from committed state
	Report {
		/// Target date (YYYY-MM-DD)
		#[arg(long)]
		date: String,
	},

	/// Drop all committed state (seed topics are kept)
	Reset,
}

impl CliArgs {
	pub fn pulse_config(&self) -> PulseConfig {
		PulseConfig {
			state_dir: self.state_dir.clone(),
			output_dir: self.output_dir.clone(),
			window_days: self.window_days,
		}
	}

	pub fn seed_path(&self) -> PathBuf {
		self.seeds
			.clone()
			.unwrap_or_else(|| self.state_dir.join(crate::persistence::SEED_TOPICS_FILE))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_library_config() {
		let args = CliArgs::parse_from(["review-pulse", "reset"]);
		let config = args.pulse_config();
		let defaults = PulseConfig::default();
		assert_eq!(config.state_dir, defaults.state_dir);
		assert_eq!(config.output_dir, defaults.output_dir);
		assert_eq!(config.window_days, 30);
		assert_eq!(args.seed_path(), PathBuf::from("storage").join("seed_topics.json"));
	}

	#[test]
	fn parses_run_day() {
		let args = CliArgs::parse_from([
			"review-pulse",
			"--window-days",
			"7",
			"run-day",
			"--date",
			"2024-01-01",
			"--reviews",
			"day.json",
		]);
		assert_eq!(args.window_days, 7);
		match args.command {
			Command::RunDay {
				date,
				reviews,
				candidates,
				no_report,
			} => {
				assert_eq!(date, "2024-01-01");
				assert_eq!(reviews, PathBuf::from("day.json"));
				assert!(candidates.is_none());
				assert!(!no_report);
			}
			other => panic!("unexpected command: {other:?}"),
		}
	}

	#[test]
	fn rejects_zero_window() {
		assert!(CliArgs::try_parse_from(["review-pulse", "--window-days", "0", "reset"]).is_err());
	}

	#[test]
	fn caps_window_length() {
		let max = MAX_WINDOW_DAYS.to_string();
		let args = CliArgs::try_parse_from(["review-pulse", "--window-days", max.as_str(), "reset"]).unwrap();
		assert_eq!(args.window_days, MAX_WINDOW_DAYS);

		let over = (MAX_WINDOW_DAYS + 1).to_string();
		assert!(CliArgs::try_parse_from(["review-pulse", "--window-days", over.as_str(), "reset"]).is_err());
		assert!(CliArgs::try_parse_from(["review-pulse", "--window-days", "4294967295", "reset"]).is_err());
	}
}

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use review_pulse::cleaner::clean_reviews;
use review_pulse::config::{CliArgs, Command};
use review_pulse::discovery::TopicDiscovery;
use review_pulse::driver::{AggregationDriver, DayBatch};
use review_pulse::error::{PulseError, parse_date};
use review_pulse::persistence::{load_seed_names, read_document};
use review_pulse::report::{self, ReportViews};
use review_pulse::types::{CandidateTopic, Review};

fn read_batch(path: &Path) -> Result<Option<Vec<Review>>, PulseError> {
	read_document::<Vec<Review>>(path)
		.map_err(|e| PulseError::InvalidInput(format!("{}: {}", path.display(), e)))
}

/// Clean the raw batch and work out its candidate topics.
fn prepare_day(
	raw: &[Review],
	candidates: Option<Vec<CandidateTopic>>,
	discovery: &TopicDiscovery,
) -> (Vec<Review>, Vec<CandidateTopic>) {
	let cleaned = clean_reviews(raw);
	let candidates = candidates.unwrap_or_else(|| discovery.discover(&cleaned));
	tracing::debug!(
		raw = raw.len(),
		cleaned = cleaned.len(),
		candidates = candidates.len(),
		"Prepared review batch"
	);
	(cleaned, candidates)
}

fn write_report(views: &ReportViews, output_dir: &Path) -> Result<()> {
	let paths = report::write_all(views, output_dir).context("failed to write report")?;
	println!("{}", paths.json.display());
	println!("{}", paths.csv.display());
	println!("{}", paths.html.display());
	Ok(())
}

fn main() -> Result<()> {
	let args = CliArgs::parse();

	tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
		)
		.init();

	let config = args.pulse_config();
	let seeds = load_seed_names(&args.seed_path())
		.with_context(|| format!("failed to read seed topics from {}", args.seed_path().display()))?;
	let discovery = TopicDiscovery::new(seeds.clone());
	let driver = AggregationDriver::new(&config).with_seeds(seeds);

	match args.command {
		Command::RunDay {
			date,
			reviews,
			candidates,
			no_report,
		} => {
			let date = parse_date(&date)?;
			let raw = read_batch(&reviews)?
				.ok_or_else(|| PulseError::InvalidInput(format!("{}: file not found", reviews.display())))?;
			let candidates = match candidates {
				Some(path) => Some(
					read_document::<Vec<CandidateTopic>>(&path)
						.map_err(|e| PulseError::InvalidInput(format!("{}: {}", path.display(), e)))?
						.unwrap_or_default(),
				),
				None => None,
			};

			let (cleaned, candidates) = prepare_day(&raw, candidates, &discovery);
			driver
				.run_day(&cleaned, &candidates, date)
				.with_context(|| format!("aggregation failed for {date}"))?;

			if !no_report {
				write_report(&driver.report(date)?, &config.output_dir)?;
			}
		}

		Command::Backfill {
			start,
			days,
			batches_dir,
		} => {
			let start = parse_date(&start)?;
			let days = days.unwrap_or(config.window_days);
			let dates: Vec<NaiveDate> = start.iter_days().take(days as usize).collect();

			let mut batches = Vec::with_capacity(dates.len());
			for date in &dates {
				let path = batches_dir.join(format!("{date}.json"));
				let raw = read_batch(&path)?.unwrap_or_else(|| {
					tracing::warn!(path = %path.display(), "No review batch for date, aggregating an empty day");
					Vec::new()
				});
				let (reviews, candidates) = prepare_day(&raw, None, &discovery);
				batches.push(DayBatch {
					date: *date,
					reviews,
					candidates,
				});
			}

			driver.backfill(batches).context("backfill aborted")?;

			if let Some(last) = dates.last() {
				write_report(&driver.report(*last)?, &config.output_dir)?;
			}
		}

		Command::Report { date } => {
			let date = parse_date(&date)?;
			write_report(&driver.report(date)?, &config.output_dir)?;
		}

		Command::Reset => {
			driver
				.snapshots()
				.reset()
				.with_context(|| format!("failed to reset {}", config.state_dir.display()))?;
			tracing::info!(state_dir = %config.state_dir.display(), "State reset");
		}
	}

	Ok(())
}


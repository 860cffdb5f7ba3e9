//! Terminal surface for the club training dashboard
//!
//! One-shot mode prints a report for a single athlete; without arguments
//! an interactive loop accepts name searches, `:refresh` and `:quit`.

use clap::Parser;
use clubcoach::app::{AppState, SearchOutcome, SearchResult};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

#[derive(Parser, Debug)]
#[command(name = "clubcoach", about = "Running club training dashboard")]
struct Cli {
  /// Print a report for this athlete and exit
  #[arg(long)]
  athlete: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
  dotenvy::dotenv().ok();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .init();

  let cli = Cli::parse();

  let state = match AppState::from_env() {
    Ok(state) => state,
    Err(e) => {
      eprintln!("Startup failed: {}", e);
      return ExitCode::FAILURE;
    }
  };

  println!("Loading club data...");
  match state.refresh().await {
    Ok(count) => println!("Loaded {} training logs.\n", count),
    Err(e) => {
      eprintln!("Could not load club data: {}", e);
      if cli.athlete.is_some() {
        return ExitCode::FAILURE;
      }
    }
  }

  if let Some(name) = cli.athlete {
    return run_search(&state, &name).await;
  }

  run_interactive(&state).await
}

/// ---------------------------------------------------------------------------
/// Interaction
/// ---------------------------------------------------------------------------

async fn run_search(state: &AppState, term: &str) -> ExitCode {
  match state.search(term).await {
    SearchOutcome::Found(result) => {
      print_report(&result);
      ExitCode::SUCCESS
    }
    SearchOutcome::NotFound => {
      eprintln!("No athlete matching '{}' was found.", term);
      ExitCode::FAILURE
    }
  }
}

async fn run_interactive(state: &AppState) -> ExitCode {
  println!("Type an athlete name to search, :refresh to reload, :quit to exit.");

  let stdin = io::stdin();
  loop {
    print!("> ");
    io::stdout().flush().ok();

    let mut line = String::new();
    match stdin.lock().read_line(&mut line) {
      Ok(0) => break,
      Ok(_) => {}
      Err(e) => {
        eprintln!("Input error: {}", e);
        break;
      }
    }

    match line.trim() {
      "" => {}
      ":quit" | ":q" => break,
      ":refresh" => match state.refresh().await {
        Ok(count) => println!("Reloaded {} training logs.", count),
        Err(e) => eprintln!("Refresh failed, keeping current data: {}", e),
      },
      term => {
        println!("Analyzing...");
        run_search(state, term).await;
      }
    }
  }

  ExitCode::SUCCESS
}

/// ---------------------------------------------------------------------------
/// Report Rendering
/// ---------------------------------------------------------------------------

fn print_report(result: &SearchResult) {
  println!("\n=== {}'s Report ===\n", result.name);
  println!("{}\n", result.feedback.narrative);

  for (i, rec) in result.feedback.recommendations.iter().enumerate() {
    println!("  {}. {}", i + 1, rec);
  }

  if let Some(stats) = &result.stats {
    let avg_hr = stats
      .avg_heart_rate
      .map(|hr| format!("{} BPM", hr))
      .unwrap_or_else(|| "-".to_string());
    let avg_intensity = stats
      .avg_intensity
      .map(|i| format!("{:.1}/10", i))
      .unwrap_or_else(|| "-".to_string());

    println!("\n  Avg HR: {}   Avg Intensity: {}   Sessions: {}", avg_hr, avg_intensity, stats.count);
  }

  let heart_rates: Vec<i64> = result
    .logs
    .iter()
    .map(|l| l.heart_rate)
    .filter(|&hr| hr > 0)
    .collect();
  if !heart_rates.is_empty() {
    println!("  HR trend: {}", sparkline(&heart_rates));
  }

  println!("\n  {:<12} {:<14} {:>5}  {:<9}", "Date", "Activity", "BPM", "Status");
  // Most recent session first, like the dashboard table
  for log in result.logs.iter().rev() {
    println!(
      "  {:<12} {:<14} {:>5}  {:<9}",
      log.timestamp,
      log.training_type,
      log.heart_rate,
      log.condition.as_str()
    );
  }
  println!();
}

/// Scale values into eight block-character levels
fn sparkline(values: &[i64]) -> String {
  let min = values.iter().min().copied().unwrap_or(0);
  let max = values.iter().max().copied().unwrap_or(0);
  let span = (max - min).max(1) as f64;

  values
    .iter()
    .map(|&v| {
      let level = ((v - min) as f64 / span * 7.0).round() as usize;
      SPARK_LEVELS[level.min(7)]
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sparkline_scales_to_levels() {
    let line = sparkline(&[120, 140, 160]);
    assert_eq!(line.chars().count(), 3);
    assert_eq!(line.chars().next(), Some('▁'));
    assert_eq!(line.chars().last(), Some('█'));
  }

  #[test]
  fn test_sparkline_flat_series() {
    let line = sparkline(&[150, 150]);
    assert_eq!(line, "▁▁");
  }
}

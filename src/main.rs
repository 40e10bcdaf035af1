use anyhow::{Context, Result};
use chrono::{DateTime, Days, Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use uuid::Uuid;

use readyrs::analytics::analyze_session;
use readyrs::config::AppConfig;
use readyrs::decoupling::{DecouplingAnalyzer, DecouplingStatus};
use readyrs::engine::{DailyEngine, DailyEvaluation};
use readyrs::export::{export_analytics, AnalyticsExport, ExportFormat};
use readyrs::ingest::DirectiveIngestor;
use readyrs::load::{LoadCalculator, StrainFlag};
use readyrs::logging::{init_logging, LogLevel};
use readyrs::mission::MissionPlanner;
use readyrs::models::{BiometricSample, SessionRecord};
use readyrs::provider::{yesterday_net_balance, InMemoryProvider, SessionSeries};
use readyrs::readiness::ReadinessCategory;
use readyrs::store::{JsonFileStore, SnapshotStore};
use readyrs::zones::{HrZone, ZoneAnalyzer};

/// ReadyRS - Daily readiness and training load CLI
///
/// Scores same-day readiness from biometrics and training load, adapts the
/// scheduled workout to it, and analyses session telemetry.
#[derive(Parser)]
#[command(name = "readyrs")]
#[command(version)]
#[command(about = "Daily readiness and training load CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Use this store file instead of the configured one
    #[arg(long, value_name = "FILE", global = true)]
    store: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score today's readiness and prescribe the day's mission
    Readiness {
        /// Day to evaluate (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Morning biometrics as JSON (default: the stored sample for the day)
        #[arg(short, long, value_name = "FILE")]
        biometrics: Option<PathBuf>,

        /// Provider snapshot (JSON) supplying yesterday's energy balance
        #[arg(short, long, value_name = "FILE")]
        provider: Option<PathBuf>,

        /// Compute without saving the score
        #[arg(long)]
        dry_run: bool,

        /// Print the full evaluation as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the acute/chronic load profile
    Load {
        /// Day to evaluate (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Number of recent days of daily load to list
        #[arg(short = 'n', long, default_value = "14")]
        days: u32,
    },

    /// Show the mission for a day at a given readiness score
    Mission {
        /// Day to evaluate (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Readiness score (default: the stored score for the day)
        #[arg(short, long)]
        score: Option<u8>,
    },

    /// Record sessions from a JSON array, or list recorded sessions
    Sessions {
        /// Session records to add (JSON array)
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Aerobic decoupling for a session window
    Decoupling {
        /// Provider snapshot (JSON) with heart rate and power series
        #[arg(short, long, value_name = "FILE")]
        provider: PathBuf,

        /// Session start (RFC 3339)
        #[arg(short, long)]
        start: DateTime<Utc>,

        /// Session length in minutes
        #[arg(short, long)]
        minutes: u32,
    },

    /// Heart rate zone distribution for a session window
    Zones {
        /// Provider snapshot (JSON) with a heart rate series
        #[arg(short, long, value_name = "FILE")]
        provider: PathBuf,

        /// Session start (RFC 3339)
        #[arg(short, long)]
        start: DateTime<Utc>,

        /// Session length in minutes
        #[arg(short, long)]
        minutes: u32,
    },

    /// Import scheduled directives (JSON or CSV)
    Ingest {
        /// Directive batch file
        #[arg(short, long)]
        file: PathBuf,

        /// Validate without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Export a session's telemetry for external analysis
    Export {
        /// Recorded session identifier
        #[arg(long)]
        session: Uuid,

        /// Provider snapshot (JSON) with the session's series
        #[arg(short, long, value_name = "FILE")]
        provider: PathBuf,

        /// Session start (RFC 3339)
        #[arg(short, long)]
        start: DateTime<Utc>,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (json, csv)
        #[arg(short = 'f', long, default_value = "json")]
        format: String,

        /// Include decoupling and zone analysis
        #[arg(long)]
        analytics: bool,
    },

    /// Show or initialise the configuration
    Config {
        /// Write the current configuration to the config file
        #[arg(long)]
        init: bool,

        /// Print the config file path only
        #[arg(long)]
        path: bool,
    },
}

#[derive(Tabled)]
struct DailyLoadRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Sessions")]
    sessions: u16,
    #[tabled(rename = "Load (min×RPE)")]
    load: String,
}

#[derive(Tabled)]
struct SessionRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Discipline")]
    discipline: String,
    #[tabled(rename = "Minutes")]
    minutes: String,
    #[tabled(rename = "RPE")]
    rpe: u8,
    #[tabled(rename = "Load")]
    load: String,
    #[tabled(rename = "Id")]
    id: String,
}

#[derive(Tabled)]
struct ZoneRow {
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Minutes")]
    minutes: String,
    #[tabled(rename = "Share")]
    share: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_config_path);
    // Logging is configured from this file, so a bad file is reported directly
    let mut config = match AppConfig::load_if_present(Some(config_path.as_path())) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}; using defaults", "⚠".yellow(), e);
            AppConfig::default()
        }
    };

    config.logging.level = match cli.verbose {
        0 => config.logging.level,
        1 => LogLevel::Info,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };
    init_logging(&config.logging).context("Failed to initialise logging")?;

    let store_path = cli.store.clone().unwrap_or_else(|| config.store_path());
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Readiness {
            date,
            biometrics,
            provider,
            dry_run,
            json,
        } => {
            let date = date.unwrap_or(today);
            let mut store = open_store(&store_path)?;

            let sample = match biometrics {
                Some(path) => {
                    let mut sample: BiometricSample = read_json(&path)?;
                    sample.date = date;
                    sample
                }
                None => store
                    .samples()
                    .into_iter()
                    .find(|s| s.date == date)
                    .unwrap_or_else(|| BiometricSample::empty(date)),
            };

            let energy = match provider {
                Some(path) => {
                    let provider: InMemoryProvider = read_json(&path)?;
                    yesterday_net_balance(&provider, date)
                }
                None => None,
            };

            let engine = DailyEngine::from_config(&config);
            let evaluation = if dry_run {
                engine.compute(&store, &sample, energy)
            } else {
                engine.evaluate(&mut store, sample, energy)
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&evaluation)?);
            } else {
                print_evaluation(&evaluation);
            }

            if let Some(fault) = &evaluation.persistence_error {
                eprintln!("{} {}", "⚠ Score not saved:".yellow().bold(), fault);
            }
        }

        Commands::Load { date, days } => {
            let date = date.unwrap_or(today);
            let store = open_store(&store_path)?;
            let sessions = store.sessions();

            let calculator = LoadCalculator::with_config(config.load.clone());
            let profile = calculator.calculate_profile(&sessions, date);

            println!("{}", format!("Training load as of {}", date).blue().bold());
            println!("  Acute (7d):   {:.1}", profile.acute_load);
            println!("  Chronic (28d): {:.1}", profile.chronic_load);
            println!(
                "  Strain ratio: {:.2} {}",
                profile.strain_ratio,
                colour_strain(profile.strain_flag)
            );

            let since = date.checked_sub_days(Days::new(u64::from(days))).unwrap_or(NaiveDate::MIN);
            let rows: Vec<DailyLoadRow> = calculator
                .aggregate_daily_load(&sessions)
                .range(since..=date)
                .map(|(day, load)| DailyLoadRow {
                    date: day.to_string(),
                    sessions: load.session_count,
                    load: load.total_load.round_dp(1).to_string(),
                })
                .collect();

            if rows.is_empty() {
                println!("{}", "No sessions in range".dimmed());
            } else {
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
        }

        Commands::Mission { date, score } => {
            let date = date.unwrap_or(today);
            let store = open_store(&store_path)?;

            let score = match score {
                Some(score) => score,
                None => store
                    .samples()
                    .into_iter()
                    .find(|s| s.date == date)
                    .and_then(|s| s.readiness_score)
                    .with_context(|| {
                        format!("No readiness score stored for {}; pass --score or run `readiness`", date)
                    })?,
            };

            let planner = MissionPlanner::with_config(config.mission.clone());
            let directive = store.directive_for(date);
            let mission = planner.prescribe(directive.as_ref(), score);

            println!(
                "{}",
                format!("Mission for {} at readiness {} ({})", date, score, planner.band(score))
                    .cyan()
                    .bold()
            );
            print_mission(
                &mission.title,
                &mission.power_target,
                &mission.fuel_tier.to_string(),
                &mission.coach_notes,
                mission.is_altered,
            );
        }

        Commands::Sessions { file } => {
            let mut store = open_store(&store_path)?;

            if let Some(path) = file {
                let sessions: Vec<SessionRecord> = read_json(&path)?;
                let count = sessions.len();
                store
                    .update("sessions", |snapshot| {
                        for session in sessions {
                            snapshot.add_session(session);
                        }
                    })
                    .context("Failed to save sessions")?;
                println!("{}", format!("✓ Recorded {} sessions", count).green());
            }

            let rows: Vec<SessionRow> = store
                .sessions()
                .iter()
                .map(|s| SessionRow {
                    date: s.date.to_string(),
                    discipline: s.discipline.to_string(),
                    minutes: s.duration_minutes.round_dp(1).to_string(),
                    rpe: s.rpe,
                    load: LoadCalculator::session_load(s).round_dp(1).to_string(),
                    id: s.id.to_string(),
                })
                .collect();

            if rows.is_empty() {
                println!("{}", "No sessions recorded".dimmed());
            } else {
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
        }

        Commands::Decoupling {
            provider,
            start,
            minutes,
        } => {
            let provider: InMemoryProvider = read_json(&provider)?;
            let series = SessionSeries::fetch(&provider, start, minutes);
            let heart_rate = SessionSeries::values(&series.heart_rate);
            let power = SessionSeries::values(&series.power);

            match DecouplingAnalyzer::analyze(&heart_rate, &power) {
                Some(result) => {
                    println!("{}", "Aerobic decoupling".cyan().bold());
                    println!("  First half EF:  {:.3}", result.first_half_ef);
                    println!("  Second half EF: {:.3}", result.second_half_ef);
                    let line = format!("  Decoupling: {:.1}% ({})", result.decoupling_pct, result.status);
                    match result.status {
                        DecouplingStatus::Stable => println!("{}", line.green()),
                        DecouplingStatus::Drift => println!("{}", line.red()),
                    }
                }
                None => println!(
                    "{}",
                    format!(
                        "Not computable: need at least {} heart rate and power samples (got {} / {})",
                        readyrs::decoupling::MIN_SAMPLES,
                        heart_rate.len(),
                        power.len()
                    )
                    .yellow()
                ),
            }
        }

        Commands::Zones {
            provider,
            start,
            minutes,
        } => {
            let provider: InMemoryProvider = read_json(&provider)?;
            let series = SessionSeries::fetch(&provider, start, minutes);
            let distribution = ZoneAnalyzer::analyze_hr_distribution(&series.heart_rate, &config.zones);

            if distribution.is_empty() {
                println!("{}", "No heart rate data in window".yellow());
            } else {
                let rows: Vec<ZoneRow> = [
                    HrZone::Zone1,
                    HrZone::Zone2,
                    HrZone::Zone3,
                    HrZone::Zone4,
                    HrZone::Zone5,
                ]
                .into_iter()
                .filter(|zone| distribution.minutes.contains_key(zone))
                .map(|zone| ZoneRow {
                    zone: zone.to_string(),
                    minutes: distribution.minutes_in(zone).round_dp(1).to_string(),
                    share: format!("{}%", distribution.percent_in(zone).round_dp(0)),
                })
                .collect();

                println!("{}", Table::new(rows).with(Style::rounded()));
                println!("  Total: {} min", distribution.total_minutes.round_dp(1));
            }
        }

        Commands::Ingest { file, dry_run } => {
            let report = DirectiveIngestor::new()
                .ingest_file(&file)
                .with_context(|| format!("Failed to read directives from {}", file.display()))?;

            for fault in &report.faults {
                println!("{} {}", "✗".red(), fault);
            }

            if !dry_run && report.success_count() > 0 {
                let mut store = open_store(&store_path)?;
                let accepted = report.accepted.clone();
                store
                    .update("directive ingestion", |snapshot| snapshot.add_directives(accepted))
                    .context("Failed to save directives")?;
            }

            let summary = format!(
                "{} {} of {} directives{}",
                if report.is_clean() { "✓" } else { "⚠" },
                report.success_count(),
                report.total(),
                if dry_run { " valid (dry run)" } else { " imported" }
            );
            if report.is_clean() {
                println!("{}", summary.green());
            } else {
                println!("{}", summary.yellow());
            }
        }

        Commands::Export {
            session,
            provider,
            start,
            output,
            format,
            analytics,
        } => {
            let format: ExportFormat = format.parse()?;
            let store = open_store(&store_path)?;
            let record = store
                .sessions()
                .into_iter()
                .find(|s| s.id == session)
                .with_context(|| format!("No recorded session {}", session))?;

            let provider: InMemoryProvider = read_json(&provider)?;
            let minutes: u32 = record
                .duration_minutes
                .ceil()
                .try_into()
                .context("Session duration out of range")?;
            let series = SessionSeries::fetch(&provider, start, minutes);
            let analysis = analytics.then(|| analyze_session(&record, &series, &config.zones));

            let export = AnalyticsExport::build(&record, &series, analysis.as_ref());
            export_analytics(&export, format, &output)
                .with_context(|| format!("Failed to export to {}", output.display()))?;

            println!("{}", format!("✓ Exported session {} to {}", session, output.display()).green());
        }

        Commands::Config { init, path } => {
            if path {
                println!("{}", config_path.display());
            } else if init {
                config
                    .save_to_file(&config_path)
                    .context("Failed to write configuration")?;
                println!("{}", format!("✓ Configuration written to {}", config_path.display()).green());
            } else {
                print!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

fn open_store(path: &Path) -> Result<JsonFileStore> {
    JsonFileStore::open(path).with_context(|| format!("Failed to open store {}", path.display()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn colour_strain(flag: StrainFlag) -> ColoredString {
    match flag {
        StrainFlag::High => flag.to_string().red().bold(),
        StrainFlag::Low => flag.to_string().yellow(),
        StrainFlag::Normal => flag.to_string().green(),
    }
}

fn print_evaluation(evaluation: &DailyEvaluation) {
    let readiness = &evaluation.readiness;
    let headline = format!("Readiness {}: {}/100 ({})", evaluation.date, readiness.score, readiness.category);
    let headline = match readiness.category {
        ReadinessCategory::Primed | ReadinessCategory::Ready => headline.green().bold(),
        ReadinessCategory::Moderate => headline.yellow().bold(),
        ReadinessCategory::Fatigued => headline.red().bold(),
    };
    println!("{}", headline);

    println!(
        "  Load: acute {:.1} / chronic {:.1}, ratio {:.2} {}",
        evaluation.load.acute_load,
        evaluation.load.chronic_load,
        evaluation.load.strain_ratio,
        colour_strain(evaluation.load.strain_flag)
    );
    if readiness.load_penalty > 0.0 || readiness.energy_penalty > 0.0 {
        println!(
            "  Penalties: load -{:.0}, energy -{:.0}",
            readiness.load_penalty, readiness.energy_penalty
        );
    }

    let mission = &evaluation.mission;
    print_mission(
        &mission.title,
        &mission.power_target,
        &mission.fuel_tier.to_string(),
        &mission.coach_notes,
        mission.is_altered,
    );
}

fn print_mission(title: &str, power_target: &str, fuel_tier: &str, notes: &str, altered: bool) {
    let title = if altered {
        format!("{} [adjusted]", title).yellow().bold()
    } else {
        title.bold()
    };
    println!("  Mission: {}", title);
    println!("  Target:  {}", power_target);
    println!("  Fuel:    {}", fuel_tier);
    if !notes.is_empty() {
        println!("  Notes:   {}", notes.dimmed());
    }
}

use std::path::PathBuf;

use anyhow::Context;
use chrono::FixedOffset;
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cohort_progress::import::{self, RosterEntry};
use cohort_progress::report::{self, LearnerNames};
use cohort_progress::{
    classify, db, validate, AssessmentRecord, LearnerId, LearnerProgress, PeriodFormat,
    RawAssessment, TemporalAggregator,
};

#[derive(Parser)]
#[command(name = "cohort-progress")]
#[command(about = "Subject trends and risk tiers from assessment records", long_about = None)]
struct Cli {
    /// Assessment CSV (learner_id,subject,score,occurred_at); overrides DATABASE_URL
    #[arg(long, global = true)]
    records: Option<PathBuf>,
    /// Roster CSV (learner_id,name), used with --records
    #[arg(long, global = true)]
    roster: Option<PathBuf>,
    /// Lesson-progress CSV (learner_id,completed), used with --records
    #[arg(long, global = true)]
    lessons: Option<PathBuf>,
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,
    /// Hours east of UTC used to place records in months
    #[arg(long, default_value_t = 0.0, global = true, allow_hyphen_values = true)]
    utc_offset: f64,
    #[arg(long, value_enum, default_value_t = PeriodArg::Month, global = true)]
    period_format: PeriodArg,
    /// Print engine output as JSON instead of markdown
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum PeriodArg {
    Month,
    YearMonth,
}

impl From<PeriodArg> for PeriodFormat {
    fn from(value: PeriodArg) -> Self {
        match value {
            PeriodArg::Month => PeriodFormat::MonthName,
            PeriodArg::YearMonth => PeriodFormat::YearMonth,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Monthly subject trend for one learner
    Progress {
        #[arg(long)]
        learner: String,
    },
    /// Classify every learner on the roster
    Roster {
        /// Label printed in the report header
        #[arg(long)]
        cohort: Option<String>,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Write a markdown report
    Report {
        #[arg(long)]
        cohort: Option<String>,
        /// Also include this learner's monthly trend
        #[arg(long)]
        learner: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

enum Source {
    Csv {
        records: PathBuf,
        roster: Option<PathBuf>,
        lessons: Option<PathBuf>,
    },
    Postgres(PgPool),
}

impl Source {
    async fn connect(cli: &Cli) -> anyhow::Result<Self> {
        if let Some(records) = &cli.records {
            return Ok(Source::Csv {
                records: records.clone(),
                roster: cli.roster.clone(),
                lessons: cli.lessons.clone(),
            });
        }

        let database_url = cli
            .database_url
            .as_deref()
            .context("pass --records or set DATABASE_URL")?;
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("failed to connect to Postgres")?;
        Ok(Source::Postgres(pool))
    }

    async fn raw_records(&self, learner: Option<&str>) -> anyhow::Result<Vec<RawAssessment>> {
        match self {
            Source::Csv { records, .. } => import::load_records(records),
            Source::Postgres(pool) => db::fetch_assessments(pool, learner).await,
        }
    }

    async fn roster(&self) -> anyhow::Result<Vec<RosterEntry>> {
        match self {
            Source::Csv { roster, .. } => {
                let path = roster
                    .as_deref()
                    .context("--roster is required when reading --records")?;
                import::load_roster(path)
            }
            Source::Postgres(pool) => db::fetch_roster(pool).await,
        }
    }

    async fn lessons_completed(&self) -> anyhow::Result<usize> {
        match self {
            Source::Csv { lessons, .. } => match lessons {
                Some(path) => import::load_lessons_completed(path),
                None => Ok(0),
            },
            Source::Postgres(pool) => db::count_completed_lessons(pool).await,
        }
    }

    /// Validated records, skipping (and logging) rows that cannot be used.
    async fn records(&self, learner: Option<&str>) -> anyhow::Result<Vec<AssessmentRecord>> {
        let ingested = validate(self.raw_records(learner).await?);
        if !ingested.rejected.is_empty() {
            warn!(skipped = ingested.rejected.len(), "some assessments were skipped");
        }

        let mut records = ingested.records;
        if let Some(id) = learner {
            records.retain(|record| record.learner_id.as_str() == id);
        }
        Ok(records)
    }
}

fn names_of(roster: &[RosterEntry]) -> LearnerNames {
    roster
        .iter()
        .filter_map(|entry| {
            entry
                .name
                .clone()
                .map(|name| (entry.learner_id.clone(), name))
        })
        .collect()
}

fn build_aggregator(cli: &Cli) -> anyhow::Result<TemporalAggregator> {
    let seconds = (cli.utc_offset * 3600.0).round() as i32;
    let offset = FixedOffset::east_opt(seconds)
        .with_context(|| format!("utc offset {} is out of range", cli.utc_offset))?;
    Ok(TemporalAggregator::new(offset, cli.period_format.into()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let aggregator = build_aggregator(&cli)?;
    let source = Source::connect(&cli).await?;

    match &cli.command {
        Commands::Progress { learner } => {
            let records = source.records(Some(learner.as_str())).await?;
            let progress = LearnerProgress::from_snapshots(aggregator.aggregate(&records));

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&progress)?);
            } else {
                let names = match source.roster().await {
                    Ok(roster) => names_of(&roster),
                    Err(err) => {
                        warn!(error = %err, "roster unavailable, showing learner ids");
                        LearnerNames::new()
                    }
                };
                print!(
                    "{}",
                    report::build_progress_report(
                        &LearnerId::from(learner.as_str()),
                        &names,
                        &progress.snapshots
                    )
                );
            }
        }
        Commands::Roster { cohort, limit } => {
            let roster = source.roster().await?;
            let ids: Vec<LearnerId> = roster.iter().map(|entry| entry.learner_id.clone()).collect();
            let records = source.records(None).await?;
            let classification =
                classify(&ids, &records).with_lessons_completed(source.lessons_completed().await?);

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&classification)?);
            } else {
                print!(
                    "{}",
                    report::build_roster_report(
                        cohort.as_deref(),
                        &classification,
                        &names_of(&roster),
                        *limit
                    )
                );
            }
        }
        Commands::Report {
            cohort,
            learner,
            limit,
            out,
        } => {
            let roster = source.roster().await?;
            let names = names_of(&roster);
            let ids: Vec<LearnerId> = roster.iter().map(|entry| entry.learner_id.clone()).collect();
            let records = source.records(None).await?;
            let classification =
                classify(&ids, &records).with_lessons_completed(source.lessons_completed().await?);

            let mut output =
                report::build_roster_report(cohort.as_deref(), &classification, &names, *limit);

            if let Some(id) = learner {
                let history: Vec<AssessmentRecord> = records
                    .iter()
                    .filter(|record| record.learner_id.as_str() == id)
                    .cloned()
                    .collect();
                output.push('\n');
                output.push_str(&report::build_progress_report(
                    &LearnerId::from(id.as_str()),
                    &names,
                    &aggregator.aggregate(&history),
                ));
            }

            std::fs::write(out, output)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(path = %out.display(), "report written");
        }
    }

    Ok(())
}

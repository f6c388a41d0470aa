// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! jobsearch-agent: candidate tracking, listing scraping and job-level
//! classification from the command line.

use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use jobsearch_agent::categorize::categorize;
use jobsearch_agent::config::AppConfig;
use jobsearch_agent::db::{
    ApplicationStatus, CandidateUpdate, Database, InterviewStatus, JobRef, NewCandidate, NewJob,
};
use jobsearch_agent::pipeline::{
    self, clean_json_file, clean_numeric_csv, extract_features, json_to_csv,
    preprocess_title_listing, read_csv, read_json, relabel_levels, write_csv, write_json,
    ModelArtifacts, TitleRecord, TrainingConfig, WriteMode,
};
use jobsearch_agent::scrape::{
    Aggregator, ApiSource, JobListing, ListingSelectors, MissingFieldPolicy, PagedSource,
    ScrapeSource, Scraper,
};
use jobsearch_agent::{AgentError, Result};

/// Job search agent CLI
#[derive(Parser, Debug)]
#[command(name = "jobsearch-agent")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Track candidates and jobs, scrape listings, classify job levels", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a config file, data directories and the database
    Init {
        /// Directory to initialize (default: current)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Candidate records
    Candidate {
        #[command(subcommand)]
        action: CandidateCommands,
    },

    /// Job records
    Job {
        #[command(subcommand)]
        action: JobCommands,
    },

    /// Candidate watchlists
    Watch {
        #[command(subcommand)]
        action: WatchCommands,
    },

    /// Interview scheduling
    Interview {
        #[command(subcommand)]
        action: InterviewCommands,
    },

    /// Applications, including batch auto-apply
    Apply {
        #[command(subcommand)]
        action: ApplyCommands,
    },

    /// Screening questions, responses and evaluations
    Screen {
        #[command(subcommand)]
        action: ScreenCommands,
    },

    /// Scrape a listing page (or a local HTML file)
    Scrape {
        /// Listing page URL
        #[arg(long, conflicts_with = "file")]
        url: Option<String>,

        /// Local HTML file to parse instead of fetching
        #[arg(long)]
        file: Option<PathBuf>,

        /// Follow `?page=N` up to this many pages
        #[arg(long, requires = "url", conflicts_with = "file")]
        pages: Option<u32>,

        #[command(flatten)]
        selectors: SelectorArgs,

        #[command(flatten)]
        output: ListingOutputArgs,
    },

    /// Scrape every configured source plus any given here
    Aggregate {
        /// Extra paginated board URL (repeatable)
        #[arg(long)]
        paged: Vec<String>,

        /// Extra JSON listing API URL (repeatable)
        #[arg(long)]
        api: Vec<String>,

        #[command(flatten)]
        selectors: SelectorArgs,

        #[command(flatten)]
        output: ListingOutputArgs,
    },

    /// Fetch listings from a JSON API
    ApiFetch {
        url: String,

        #[command(flatten)]
        output: ListingOutputArgs,
    },

    /// Drop noise and duplicates from listing JSON files
    Clean {
        /// Files or glob patterns (default: configured listings file)
        patterns: Vec<String>,

        /// Also write a CSV next to each cleaned file
        #[arg(long)]
        csv: bool,
    },

    /// Select and rename the useful columns of a title listing export
    Preprocess { input: PathBuf, output: PathBuf },

    /// Recompute job levels from grades
    Relabel { input: PathBuf, output: PathBuf },

    /// Write the TF-IDF feature table of a preprocessed title listing
    ExtractFeatures {
        input: PathBuf,
        output: PathBuf,

        /// Vocabulary size (default: model.max_features from config)
        #[arg(long)]
        max_features: Option<usize>,
    },

    /// Keep only the numeric columns of a feature table
    CleanNumeric { input: PathBuf, output: PathBuf },

    /// Categorize job titles by keyword
    Categorize {
        #[arg(required = true)]
        titles: Vec<String>,
    },

    /// Train the job-level classifier on a preprocessed CSV
    Train {
        input: PathBuf,

        /// Where to write the model (default: model.path from config)
        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Score a saved model against a labelled CSV
    Evaluate {
        input: PathBuf,

        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Predict the level of one title
    Predict {
        title: String,

        #[arg(long, default_value = "")]
        classification: String,

        #[arg(long, default_value = "")]
        unit: String,

        #[arg(long, default_value = "")]
        agency: String,

        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbCommands,
    },

    /// Walk through the candidate workflow end to end
    Demo {
        /// Use a throwaway in-memory database
        #[arg(long)]
        in_memory: bool,
    },
}

#[derive(Subcommand, Debug)]
enum CandidateCommands {
    /// Add a candidate
    Add {
        first_name: String,
        last_name: String,
        email: String,

        #[arg(long)]
        phone: Option<String>,

        /// Resume text or path
        #[arg(long)]
        resume: Option<String>,
    },

    /// Show a candidate by id or email
    Get {
        #[arg(required_unless_present = "email")]
        id: Option<i64>,

        #[arg(long, conflicts_with = "id")]
        email: Option<String>,
    },

    /// List all candidates
    List,

    /// Change some fields of a candidate
    Update {
        id: i64,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long, conflicts_with = "clear_phone")]
        phone: Option<String>,

        #[arg(long)]
        clear_phone: bool,

        #[arg(long, conflicts_with = "clear_resume")]
        resume: Option<String>,

        #[arg(long)]
        clear_resume: bool,
    },

    /// Delete a candidate and everything attached to them
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum JobCommands {
    /// Add a job posting
    Add {
        title: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        url: Option<String>,
    },

    /// List all jobs
    List,

    /// Delete a job
    Delete { id: i64 },

    /// Insert scraped listings from a JSON file
    Import {
        /// Listing JSON (default: configured listings file)
        path: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum WatchCommands {
    Add { candidate: i64, job: i64 },
    Remove { candidate: i64, job: i64 },
    List { candidate: i64 },
}

#[derive(Subcommand, Debug)]
enum InterviewCommands {
    /// Schedule an interview
    Schedule {
        candidate: i64,
        job: i64,

        /// RFC 3339 timestamp, e.g. 2025-06-01T14:00:00Z
        #[arg(long)]
        at: DateTime<Utc>,
    },

    /// Change an interview's status
    Status { id: i64, status: InterviewStatus },

    /// List a candidate's interviews
    List { candidate: i64 },
}

#[derive(Subcommand, Debug)]
enum ApplyCommands {
    /// Apply to several jobs in one batch
    Auto {
        candidate: i64,

        /// Job ids, comma separated
        #[arg(long, value_delimiter = ',')]
        jobs: Vec<i64>,

        /// JSON file of job records with optional `id` fields
        #[arg(long)]
        from: Option<PathBuf>,
    },

    /// Apply to a single job
    One { candidate: i64, job: i64 },

    /// Change an application's status
    Status { id: i64, status: ApplicationStatus },

    /// List a candidate's applications
    List { candidate: i64 },
}

#[derive(Subcommand, Debug)]
enum ScreenCommands {
    /// Attach a screening question to a job
    Question { job: i64, text: String },

    /// List a job's questions
    Questions { job: i64 },

    /// Record a candidate's answer
    Respond { candidate: i64, question: i64, text: String },

    /// Score a candidate (0-100)
    Evaluate {
        candidate: i64,
        evaluator: String,
        score: i64,

        #[arg(long)]
        feedback: Option<String>,
    },

    /// List a candidate's evaluations and average score
    Evaluations { candidate: i64 },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    /// Show database statistics
    Stats,

    /// Vacuum database (reclaim space)
    Vacuum,
}

#[derive(Args, Debug, Clone)]
struct SelectorArgs {
    /// Element wrapping one listing
    #[arg(long, default_value = "div.job-listing")]
    container: String,

    #[arg(long, default_value = "h2.job-title")]
    title_selector: String,

    #[arg(long, default_value = "div.job-description")]
    description_selector: String,

    #[arg(long)]
    company_selector: Option<String>,

    #[arg(long)]
    location_selector: Option<String>,

    /// Anchor whose href is the listing URL
    #[arg(long)]
    link_selector: Option<String>,
}

impl From<SelectorArgs> for ListingSelectors {
    fn from(args: SelectorArgs) -> Self {
        let mut selectors = ListingSelectors::new(&args.title_selector, &args.description_selector);
        selectors.container = args.container;
        selectors.company = args.company_selector;
        selectors.location = args.location_selector;
        selectors.link = args.link_selector;
        selectors
    }
}

#[derive(Args, Debug, Clone)]
struct ListingOutputArgs {
    /// Drop listings missing a title or description
    #[arg(long)]
    skip_missing: bool,

    /// Add to the listing files instead of replacing them
    #[arg(long)]
    append: bool,

    /// Also insert the listings into the jobs table
    #[arg(long)]
    import: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if !cli.quiet {
        info!("jobsearch-agent v{}", env!("CARGO_PKG_VERSION"));
    }

    // Load configuration
    let config = AppConfig::load(&cli.config)?;
    let format = cli.format.as_str();

    match cli.command {
        Some(Commands::Init { dir, force }) => run_init(dir, force).await,
        Some(Commands::Candidate { action }) => run_candidate_command(&config, action, format).await,
        Some(Commands::Job { action }) => run_job_command(&config, action, format).await,
        Some(Commands::Watch { action }) => run_watch_command(&config, action, format).await,
        Some(Commands::Interview { action }) => run_interview_command(&config, action, format).await,
        Some(Commands::Apply { action }) => run_apply_command(&config, action, format).await,
        Some(Commands::Screen { action }) => run_screen_command(&config, action, format).await,
        Some(Commands::Scrape { url, file, pages, selectors, output }) => {
            run_scrape(&config, url, file, pages, selectors.into(), output, format).await
        }
        Some(Commands::Aggregate { paged, api, selectors, output }) => {
            run_aggregate(&config, paged, api, selectors.into(), output, format).await
        }
        Some(Commands::ApiFetch { url, output }) => run_api_fetch(&config, url, output, format).await,
        Some(Commands::Clean { patterns, csv }) => run_clean(&config, patterns, csv, format).await,
        Some(Commands::Preprocess { input, output }) => {
            let rows = preprocess_title_listing(&input, &output)?;
            emit(format, &serde_json::json!({ "rows": rows }), |_| {
                println!("Preprocessed {} rows into {}", rows, output.display())
            })
        }
        Some(Commands::Relabel { input, output }) => {
            let (relabelled, unmapped) = relabel_levels(&input, &output)?;
            emit(
                format,
                &serde_json::json!({ "relabelled": relabelled, "unmapped": unmapped }),
                |_| println!("Relabelled {} rows ({} without a known grade)", relabelled, unmapped),
            )
        }
        Some(Commands::ExtractFeatures { input, output, max_features }) => {
            let max_features = max_features.unwrap_or(config.model.max_features);
            let (rows, terms) = extract_features(&input, &output, max_features)?;
            emit(format, &serde_json::json!({ "rows": rows, "terms": terms }), |_| {
                println!("Wrote {} rows with {} term columns to {}", rows, terms, output.display())
            })
        }
        Some(Commands::CleanNumeric { input, output }) => {
            let stats = clean_numeric_csv(&input, &output)?;
            emit(format, &stats, |s| {
                println!("Kept {} of {} rows", s.rows_out, s.rows_in);
                println!("  Numeric columns: {}", s.numeric_columns.join(", "));
                if !s.dropped_columns.is_empty() {
                    println!("  Dropped columns: {}", s.dropped_columns.join(", "));
                }
            })
        }
        Some(Commands::Categorize { titles }) => {
            let levels: Vec<_> = titles
                .iter()
                .map(|t| serde_json::json!({ "title": t, "level": categorize(t) }))
                .collect();
            emit(format, &levels, |_| {
                for title in &titles {
                    println!("{}: {}", title, categorize(title));
                }
            })
        }
        Some(Commands::Train { input, model }) => run_train(&config, input, model, format).await,
        Some(Commands::Evaluate { input, model }) => run_evaluate(&config, input, model, format).await,
        Some(Commands::Predict { title, classification, unit, agency, model }) => {
            let record = TitleRecord {
                job_title: title,
                jurisdictional_classification: classification,
                negotiating_unit: unit,
                agency_description: agency,
                ..Default::default()
            };
            run_predict(&config, record, model, format).await
        }
        Some(Commands::Config { action }) => run_config_command(config, action, &cli.config).await,
        Some(Commands::Db { action }) => run_db_command(&config, action, format).await,
        Some(Commands::Demo { in_memory }) => run_demo(&config, in_memory, format).await,
        None => {
            // Default: walk through the workflow
            run_demo(&config, false, format).await
        }
    }
}

/// Print `value` as JSON, or hand it to `text` for human output
fn emit<T: Serialize>(format: &str, value: &T, text: impl FnOnce(&T)) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}

fn not_found(kind: &str, id: impl std::fmt::Display) -> AgentError {
    AgentError::Validation(format!("{} {} not found", kind, id))
}

fn open_db(config: &AppConfig) -> Result<Database> {
    let db = Database::open(&config.database.path)?;
    info!("Database initialized: {}", config.database.path);
    Ok(db)
}

/// Initialize a new project directory
async fn run_init(dir: Option<PathBuf>, force: bool) -> Result<()> {
    let target = dir.unwrap_or_else(|| PathBuf::from("."));
    let config_path = target.join("config.json");

    if config_path.exists() && !force {
        return Err(AgentError::Config(
            "config.json already exists. Use --force to overwrite".to_string(),
        ));
    }

    let config = AppConfig::default();
    std::fs::create_dir_all(target.join(&config.pipeline.data_dir))?;
    if let Some(models) = Path::new(&config.model.path).parent() {
        std::fs::create_dir_all(target.join(models))?;
    }
    config.save(&config_path)?;
    Database::open(target.join(&config.database.path))?;

    println!("jobsearch-agent initialized in {:?}", target);
    println!("\nCreated:");
    println!("  - config.json");
    println!("  - {}", config.database.path);
    println!("\nNext steps:");
    println!("  1. Add scrape sources to config.json");
    println!("  2. Run: jobsearch-agent aggregate --import");

    Ok(())
}

async fn run_candidate_command(config: &AppConfig, action: CandidateCommands, format: &str) -> Result<()> {
    let db = open_db(config)?;

    match action {
        CandidateCommands::Add { first_name, last_name, email, phone, resume } => {
            let candidate = db.create_candidate(NewCandidate { first_name, last_name, email, phone, resume })?;
            emit(format, &candidate, |c| println!("Created candidate {}: {}", c.id, c.full_name()))
        }
        CandidateCommands::Get { id, email } => {
            let candidate = match (id, email) {
                (_, Some(email)) => db.get_candidate_by_email(&email)?.ok_or_else(|| not_found("Candidate", email))?,
                (Some(id), None) => db.get_candidate(id)?.ok_or_else(|| not_found("Candidate", id))?,
                (None, None) => return Err(AgentError::Validation("Give an id or --email".to_string())),
            };
            emit(format, &candidate, |c| {
                println!("Candidate {}: {}", c.id, c.full_name());
                println!("  Email: {}", c.email);
                println!("  Phone: {}", c.phone.as_deref().unwrap_or("-"));
                println!("  Resume: {}", c.resume.as_deref().unwrap_or("-"));
            })
        }
        CandidateCommands::List => {
            let candidates = db.list_candidates()?;
            emit(format, &candidates, |list| {
                println!("Candidates ({}):", list.len());
                for c in list {
                    println!("  {}: {} <{}>", c.id, c.full_name(), c.email);
                }
            })
        }
        CandidateCommands::Update {
            id,
            first_name,
            last_name,
            email,
            phone,
            clear_phone,
            resume,
            clear_resume,
        } => {
            let update = CandidateUpdate {
                first_name,
                last_name,
                email,
                phone: if clear_phone { Some(None) } else { phone.map(Some) },
                resume: if clear_resume { Some(None) } else { resume.map(Some) },
            };
            if update.is_empty() {
                warn!("Nothing to update for candidate {}", id);
            }
            let candidate = db.update_candidate(id, update)?.ok_or_else(|| not_found("Candidate", id))?;
            emit(format, &candidate, |c| println!("Updated candidate {}: {}", c.id, c.full_name()))
        }
        CandidateCommands::Delete { id } => {
            let candidate = db.delete_candidate(id)?.ok_or_else(|| not_found("Candidate", id))?;
            emit(format, &candidate, |c| println!("Deleted candidate {}: {}", c.id, c.full_name()))
        }
    }
}

async fn run_job_command(config: &AppConfig, action: JobCommands, format: &str) -> Result<()> {
    let db = open_db(config)?;

    match action {
        JobCommands::Add { title, description, location, company, url } => {
            let level = Some(categorize(&title));
            let job = db.create_job(NewJob { title, description, location, company, url, level })?;
            emit(format, &job, |j| println!("Created job {}: {}", j.id, j.title))
        }
        JobCommands::List => {
            let jobs = db.list_jobs()?;
            emit(format, &jobs, |list| {
                println!("Jobs ({}):", list.len());
                for j in list {
                    let level = j.level.map(|l| l.to_string()).unwrap_or_else(|| "-".to_string());
                    println!(
                        "  {}: {} [{}] {}",
                        j.id,
                        j.title,
                        level,
                        j.company.as_deref().unwrap_or("")
                    );
                }
            })
        }
        JobCommands::Delete { id } => {
            let job = db.delete_job(id)?.ok_or_else(|| not_found("Job", id))?;
            emit(format, &job, |j| println!("Deleted job {}: {}", j.id, j.title))
        }
        JobCommands::Import { path } => {
            let path = path.unwrap_or_else(|| config.pipeline.listings_json_path());
            let listings: Vec<JobListing> = read_json(&path)?;
            let jobs = db.import_listings(&listings)?;
            emit(format, &jobs, |list| println!("Imported {} jobs from {}", list.len(), path.display()))
        }
    }
}

async fn run_watch_command(config: &AppConfig, action: WatchCommands, format: &str) -> Result<()> {
    let db = open_db(config)?;

    match action {
        WatchCommands::Add { candidate, job } => {
            let entry = db.add_to_watchlist(candidate, job)?;
            emit(format, &entry, |e| println!("Candidate {} is watching job {}", e.candidate_id, e.job_id))
        }
        WatchCommands::Remove { candidate, job } => {
            let entry = db
                .remove_from_watchlist(candidate, job)?
                .ok_or_else(|| not_found("Watchlist entry", format!("{}/{}", candidate, job)))?;
            emit(format, &entry, |e| println!("Removed job {} from watchlist", e.job_id))
        }
        WatchCommands::List { candidate } => {
            let entries = db.watchlist_for(candidate)?;
            emit(format, &entries, |list| {
                println!("Watchlist for candidate {} ({}):", candidate, list.len());
                for e in list {
                    println!("  job {} since {}", e.job_id, e.added_date.format("%Y-%m-%d %H:%M"));
                }
            })
        }
    }
}

async fn run_interview_command(config: &AppConfig, action: InterviewCommands, format: &str) -> Result<()> {
    let db = open_db(config)?;

    match action {
        InterviewCommands::Schedule { candidate, job, at } => {
            let interview = db.schedule_interview(candidate, job, at, InterviewStatus::Scheduled)?;
            emit(format, &interview, |i| {
                println!("Interview {} on {}", i.id, i.interview_date.format("%Y-%m-%d %H:%M"))
            })
        }
        InterviewCommands::Status { id, status } => {
            let interview = db.update_interview_status(id, status)?.ok_or_else(|| not_found("Interview", id))?;
            emit(format, &interview, |i| println!("Interview {} is now {}", i.id, i.status))
        }
        InterviewCommands::List { candidate } => {
            let interviews = db.interviews_for(candidate)?;
            emit(format, &interviews, |list| {
                println!("Interviews for candidate {} ({}):", candidate, list.len());
                for i in list {
                    println!(
                        "  {}: job {} on {} [{}]",
                        i.id,
                        i.job_id,
                        i.interview_date.format("%Y-%m-%d %H:%M"),
                        i.status
                    );
                }
            })
        }
    }
}

async fn run_apply_command(config: &AppConfig, action: ApplyCommands, format: &str) -> Result<()> {
    let db = open_db(config)?;

    match action {
        ApplyCommands::Auto { candidate, jobs, from } => {
            let mut refs: Vec<JobRef> = jobs.into_iter().map(JobRef::id).collect();
            if let Some(path) = from {
                refs.extend(read_json::<JobRef>(&path)?);
            }
            if refs.is_empty() {
                return Err(AgentError::Validation("Give --jobs or --from".to_string()));
            }

            let report = db.auto_apply(candidate, &refs)?.ok_or_else(|| not_found("Candidate", candidate))?;
            emit(format, &report, |r| {
                println!("Submitted {} applications", r.applications.len());
                for a in &r.applications {
                    println!("  {}: job {} [{}]", a.id, a.job_id, a.status);
                }
                for s in &r.skipped {
                    println!("  skipped #{}: {}", s.index, s.reason);
                }
            })
        }
        ApplyCommands::One { candidate, job } => {
            let application = db.apply(candidate, job)?;
            emit(format, &application, |a| println!("Application {} [{}]", a.id, a.status))
        }
        ApplyCommands::Status { id, status } => {
            let application = db
                .update_application_status(id, status)?
                .ok_or_else(|| not_found("Application", id))?;
            emit(format, &application, |a| println!("Application {} is now {}", a.id, a.status))
        }
        ApplyCommands::List { candidate } => {
            let applications = db.applications_for(candidate)?;
            emit(format, &applications, |list| {
                println!("Applications for candidate {} ({}):", candidate, list.len());
                for a in list {
                    println!(
                        "  {}: job {} on {} [{}]",
                        a.id,
                        a.job_id,
                        a.application_date.format("%Y-%m-%d"),
                        a.status
                    );
                }
            })
        }
    }
}

async fn run_screen_command(config: &AppConfig, action: ScreenCommands, format: &str) -> Result<()> {
    let db = open_db(config)?;

    match action {
        ScreenCommands::Question { job, text } => {
            let question = db.add_screening_question(job, &text)?;
            emit(format, &question, |q| println!("Question {} added to job {}", q.id, q.job_id))
        }
        ScreenCommands::Questions { job } => {
            let questions = db.questions_for_job(job)?;
            emit(format, &questions, |list| {
                for q in list {
                    println!("  {}: {}", q.id, q.question_text);
                }
            })
        }
        ScreenCommands::Respond { candidate, question, text } => {
            let response = db.record_response(candidate, question, &text)?;
            emit(format, &response, |r| println!("Response {} recorded", r.id))
        }
        ScreenCommands::Evaluate { candidate, evaluator, score, feedback } => {
            let evaluation = db.add_evaluation(candidate, &evaluator, score, feedback.as_deref())?;
            emit(format, &evaluation, |e| println!("Evaluation {} recorded ({}/100)", e.id, e.score))
        }
        ScreenCommands::Evaluations { candidate } => {
            let evaluations = db.evaluations_for(candidate)?;
            let average = db.average_score(candidate)?;
            emit(
                format,
                &serde_json::json!({ "evaluations": evaluations, "average": average }),
                |_| {
                    for e in &evaluations {
                        println!(
                            "  {} by {}: {} {}",
                            e.id,
                            e.evaluator_name,
                            e.score,
                            e.feedback.as_deref().unwrap_or("")
                        );
                    }
                    match average {
                        Some(avg) => println!("Average score: {:.1}", avg),
                        None => println!("No evaluations yet"),
                    }
                },
            )
        }
    }
}

fn scraper_for(config: &AppConfig, output: &ListingOutputArgs) -> Result<Scraper> {
    let scraper = Scraper::new(&config.scraper)?;
    Ok(if output.skip_missing {
        scraper.with_policy(MissingFieldPolicy::Skip)
    } else {
        scraper
    })
}

/// Write listings to the configured JSON and CSV files, optionally
/// importing them as jobs, then report them
fn save_listings(config: &AppConfig, listings: &[JobListing], output: &ListingOutputArgs, format: &str) -> Result<()> {
    let mode = if output.append { WriteMode::Append } else { WriteMode::Overwrite };
    let total = write_json(&config.pipeline.listings_json_path(), listings, mode)?;
    write_csv(&config.pipeline.listings_csv_path(), listings, mode)?;

    if output.import {
        let jobs = open_db(config)?.import_listings(listings)?;
        info!("Imported {} jobs", jobs.len());
    }

    emit(format, &listings, |list| {
        for l in list.iter() {
            println!("[{}] {}", l.level, l.title);
        }
        println!("\n{} listings scraped ({} in {})", list.len(), total, config.pipeline.listings_json);
    })
}

async fn run_scrape(
    config: &AppConfig,
    url: Option<String>,
    file: Option<PathBuf>,
    pages: Option<u32>,
    selectors: ListingSelectors,
    output: ListingOutputArgs,
    format: &str,
) -> Result<()> {
    let scraper = scraper_for(config, &output)?;

    let listings = match (url, file, pages) {
        (Some(url), _, Some(pages)) => scraper.scrape_pages(&url, &selectors, pages).await?,
        (Some(url), _, None) => scraper.scrape(&ScrapeSource::url(&url, selectors)).await?,
        (None, Some(file), _) => {
            let markup = std::fs::read_to_string(&file)?;
            scraper.scrape(&ScrapeSource::markup(&markup, selectors)).await?
        }
        (None, None, _) => return Err(AgentError::Validation("Give --url or --file".to_string())),
    };

    if listings.is_empty() {
        warn!("No job listings found");
    }
    save_listings(config, &listings, &output, format)
}

async fn run_aggregate(
    config: &AppConfig,
    paged: Vec<String>,
    api: Vec<String>,
    selectors: ListingSelectors,
    output: ListingOutputArgs,
    format: &str,
) -> Result<()> {
    let scraper = scraper_for(config, &output)?;

    let mut aggregator = Aggregator::from_sources(&config.scraper.sources);
    for url in paged {
        aggregator.register(Box::new(PagedSource {
            url,
            selectors: selectors.clone(),
            max_pages: config.scraper.max_pages,
        }));
    }
    for url in api {
        aggregator.register(Box::new(ApiSource { url }));
    }

    if aggregator.is_empty() {
        return Err(AgentError::Config(
            "No sources: add scraper.sources to the config or pass --paged/--api".to_string(),
        ));
    }

    info!("Aggregating {} sources", aggregator.len());
    let listings = aggregator.collect_all(&scraper).await;
    save_listings(config, &listings, &output, format)
}

async fn run_api_fetch(config: &AppConfig, url: String, output: ListingOutputArgs, format: &str) -> Result<()> {
    let scraper = scraper_for(config, &output)?;
    let records = scraper.fetch_api_listings(&url).await?;
    let listings: Vec<JobListing> = records.into_iter().map(JobListing::from).collect();
    save_listings(config, &listings, &output, format)
}

/// Expand file names and glob patterns, in order
fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let entries = glob::glob(pattern)
            .map_err(|e| AgentError::Validation(format!("Bad pattern '{}': {}", pattern, e)))?;
        for entry in entries {
            match entry {
                Ok(path) => paths.push(path),
                Err(e) => warn!("Skipping unreadable path: {}", e),
            }
        }
    }
    Ok(paths)
}

async fn run_clean(config: &AppConfig, patterns: Vec<String>, csv: bool, format: &str) -> Result<()> {
    let paths = if patterns.is_empty() {
        vec![config.pipeline.listings_json_path()]
    } else {
        expand_patterns(&patterns)?
    };

    if paths.is_empty() {
        warn!("No files matched {:?}", patterns);
    }

    let mut results = Vec::new();
    for path in paths {
        let stats = clean_json_file(&path)?;
        if csv {
            json_to_csv::<JobListing>(&path, &path.with_extension("csv"), WriteMode::Overwrite)?;
        }
        results.push((path.display().to_string(), stats));
    }

    emit(format, &results, |list| {
        for (path, s) in list {
            println!(
                "{}: kept {} of {} ({} noise, {} duplicates)",
                path, s.kept, s.input, s.noise_removed, s.duplicates_removed
            );
        }
    })
}

async fn run_train(config: &AppConfig, input: PathBuf, model: Option<PathBuf>, format: &str) -> Result<()> {
    let records: Vec<TitleRecord> = read_csv(&input)?;
    info!("Loaded {} records from {:?}", records.len(), input);

    let (artifacts, metrics) = pipeline::train(&records, &TrainingConfig::from(&config.model))?;
    let path = model.unwrap_or_else(|| PathBuf::from(&config.model.path));
    artifacts.save(&path)?;

    emit(format, &metrics, |m| {
        println!("Model saved to {}", path.display());
        println!("  Classes: {}", artifacts.classes.join(", "));
        match m {
            Some(m) => {
                println!("  Accuracy:  {:.3}", m.accuracy);
                println!("  Precision: {:.3}", m.precision);
                println!("  Recall:    {:.3}", m.recall);
                println!("  F1:        {:.3}", m.f1);
                println!("  Test rows: {}", m.support);
            }
            None => println!("  No held-out rows; nothing to score"),
        }
    })
}

fn load_model(config: &AppConfig, model: Option<PathBuf>) -> Result<ModelArtifacts> {
    let path = model.unwrap_or_else(|| PathBuf::from(&config.model.path));
    ModelArtifacts::load(&path)
}

async fn run_evaluate(config: &AppConfig, input: PathBuf, model: Option<PathBuf>, format: &str) -> Result<()> {
    let artifacts = load_model(config, model)?;
    let records: Vec<TitleRecord> = read_csv(&input)?;
    let metrics = pipeline::evaluate(&artifacts, &records)?;

    emit(format, &metrics, |m| {
        println!("Accuracy:  {:.3}", m.accuracy);
        println!("Precision: {:.3}", m.precision);
        println!("Recall:    {:.3}", m.recall);
        println!("F1:        {:.3}", m.f1);
        println!("Rows:      {}", m.support);
    })
}

async fn run_predict(config: &AppConfig, record: TitleRecord, model: Option<PathBuf>, format: &str) -> Result<()> {
    let artifacts = load_model(config, model)?;
    let level = pipeline::predict(&artifacts, &record);

    emit(format, &serde_json::json!({ "title": record.job_title, "level": level }), |_| {
        println!("{}: {}", record.job_title, level)
    })
}

/// Run config commands
async fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            let default_config = AppConfig::default();
            default_config.save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Database: {}", config.database.path);
            println!("  Scrape sources: {}", config.scraper.sources.len());
            println!("  Model: {}", config.model.path);
        }
    }

    Ok(())
}

/// Run database commands
async fn run_db_command(config: &AppConfig, action: DbCommands, format: &str) -> Result<()> {
    let db = open_db(config)?;

    match action {
        DbCommands::Stats => {
            let stats = db.get_stats()?;
            emit(format, &stats, |s| {
                println!("Database Statistics:");
                println!("  Candidates: {}", s.candidates);
                println!("  Jobs: {}", s.jobs);
                println!("  Applications: {}", s.applications);
                println!("  Watchlist entries: {}", s.watchlist);
                println!("  Interviews: {}", s.interviews);
                println!("  Screening questions: {}", s.screening_questions);
                println!("  Responses: {}", s.responses);
                println!("  Evaluations: {}", s.evaluations);
            })
        }
        DbCommands::Vacuum => {
            db.vacuum()?;
            println!("Database vacuumed successfully");
            Ok(())
        }
    }
}

/// Add, read, update and delete a candidate, with a watchlist entry, an
/// interview and an auto-apply batch in between
async fn run_demo(config: &AppConfig, in_memory: bool, format: &str) -> Result<()> {
    let db = if in_memory { Database::in_memory()? } else { open_db(config)? };

    // Unique contact details so repeated runs never collide
    let tag = uuid::Uuid::new_v4().simple().to_string();
    let email = format!("jane.doe.{}@example.com", &tag[..8]);

    let candidate = db.create_candidate(NewCandidate {
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        email: email.clone(),
        phone: Some(format!("555-{}", &tag[8..15])),
        resume: Some("Experienced software engineer".to_string()),
    })?;
    info!("Candidate created: {}", candidate.full_name());

    let fetched = db
        .get_candidate_by_email(&email)?
        .ok_or_else(|| not_found("Candidate", &email))?;
    info!("Candidate retrieved: {} <{}>", fetched.full_name(), fetched.email);

    let updated = db
        .update_candidate(
            candidate.id,
            CandidateUpdate {
                phone: Some(Some(format!("555-{}", &tag[15..22]))),
                ..Default::default()
            },
        )?
        .ok_or_else(|| not_found("Candidate", candidate.id))?;
    info!("Candidate phone updated to {}", updated.phone.as_deref().unwrap_or("-"));

    let engineer = db.create_job(NewJob {
        title: "Software Engineer".to_string(),
        description: Some("Develop and maintain software applications.".to_string()),
        location: Some("Remote".to_string()),
        level: Some(categorize("Software Engineer")),
        ..Default::default()
    })?;
    let scientist = db.create_job(NewJob {
        title: "Senior Data Scientist".to_string(),
        description: Some("Analyze and interpret complex data sets.".to_string()),
        location: Some("New York".to_string()),
        level: Some(categorize("Senior Data Scientist")),
        ..Default::default()
    })?;

    let watch = db.add_to_watchlist(candidate.id, engineer.id)?;
    let interview = db.schedule_interview(
        candidate.id,
        engineer.id,
        Utc::now() + Duration::days(7),
        InterviewStatus::Scheduled,
    )?;

    let refs = vec![
        JobRef::id(engineer.id),
        JobRef::id(scientist.id),
        JobRef { id: None, title: Some("Posting without an id".to_string()) },
    ];
    let report = db
        .auto_apply(candidate.id, &refs)?
        .ok_or_else(|| not_found("Candidate", candidate.id))?;

    db.delete_candidate(candidate.id)?;
    let gone = db.get_candidate_by_email(&email)?.is_none();
    info!("Candidate deleted: {}", gone);

    let summary = serde_json::json!({
        "candidate": updated,
        "jobs": [engineer, scientist],
        "watchlist": watch,
        "interview": interview,
        "auto_apply": report,
        "deleted": gone,
    });

    emit(format, &summary, |_| {
        println!("Candidate: {} <{}>", updated.full_name(), updated.email);
        println!("  Phone updated to {}", updated.phone.as_deref().unwrap_or("-"));
        println!("Watching job {}: {}", engineer.id, engineer.title);
        println!(
            "Interview {} on {} [{}]",
            interview.id,
            interview.interview_date.format("%Y-%m-%d %H:%M"),
            interview.status
        );
        println!(
            "Auto-apply: {} submitted, {} skipped",
            report.applications.len(),
            report.skipped.len()
        );
        println!("Candidate deleted: {}", if gone { "yes" } else { "no" });
    })
}

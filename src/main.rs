//! Dream Job Search - client CLI
//!
//! Talks to the Dream Job Search backend: register with a Google account,
//! search the job database, trigger scraping runs, and follow their logs.

use clap::{Parser, Subcommand};
use dreamjob::api::{self, ApiClient, JOBS_PER_PAGE};
use dreamjob::auth::callback::{CallbackHandler, CallbackOutcome};
use dreamjob::auth::flow::{Authorizer, BrowserOpener};
use dreamjob::config::Settings;
use dreamjob::db::Database;
use dreamjob::logs::{open_stream, LogEvent, LogViewer};
use dreamjob::session::SessionStore;
use dreamjob::store::SqliteStore;
use dreamjob::tags::collect_tags;
use std::io::{BufRead, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

/// Dream Job Search - find your dream job from the terminal
#[derive(Parser, Debug)]
#[command(name = "dreamjob")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Enable debug logging (equivalent to RUST_LOG=debug)
    #[arg(short = 'd', long)]
    debug: bool,

    /// Enable verbose (trace-level) logging
    #[arg(short = 'v', long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in to the backend
    Login,
    /// Register a new account and connect a Google account
    Register {
        /// Account email
        #[arg(long)]
        email: String,
        /// Account password (min 6 characters)
        #[arg(long, env = "DREAMJOB_PASSWORD")]
        password: String,
    },
    /// Search stored job postings
    Search {
        /// Keyword to match (repeatable, max 20)
        #[arg(short, long = "keyword", required = true)]
        keywords: Vec<String>,
        /// Optional location filter
        #[arg(short, long)]
        location: Option<String>,
        /// Result page to print
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    /// Trigger a scraping run to expand the job database
    UpdateDb {
        /// Location to scrape (repeatable, max 10)
        #[arg(short, long = "location", required = true)]
        locations: Vec<String>,
        /// Search query to scrape (repeatable, max 15)
        #[arg(short, long = "query", required = true)]
        queries: Vec<String>,
    },
    /// Follow the live backend logs
    Logs,
    /// Forget the stored session
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "trace"
    } else if args.debug {
        "debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();

    let settings = Settings::load()?;
    let db = Database::open()?;
    db.migrate()?;
    let store = SqliteStore::new(&db);
    let http = reqwest::Client::new();

    match args.command {
        Command::Login => {
            let client = ApiClient::new(http, &settings);
            if client.login().await? {
                println!("Signed in.");
            } else {
                println!("Login failed. Please try again.");
            }
        }
        Command::Register { email, password } => {
            if password.len() < 6 {
                anyhow::bail!("Password must be at least 6 characters long");
            }

            let authorizer = Authorizer::new(&settings, &BrowserOpener, &store);
            let (pending, sender) = authorizer.begin_authorization()?;

            println!("A browser window has been opened to connect your Google account.");
            println!("If nothing opened, visit:");
            println!("  {}", pending.request().authorize_url()?);
            println!();
            print!("Paste the full redirect URL here: ");
            std::io::stdout().flush()?;

            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            let redirect = Url::parse(line.trim())?;

            let handler = CallbackHandler::new(http.clone(), &settings.backend_url, &store);
            let callback = handler.handle(&redirect, Some(&sender));
            let (outcome, waited) = tokio::join!(callback, pending.wait());
            if let CallbackOutcome::Failed { error, .. } = outcome {
                anyhow::bail!(error);
            }
            let tokens = waited?;
            println!("Google account connected.");

            let client = ApiClient::new(http, &settings);
            let response = client.register(&email, &password, &tokens).await?;
            match response.access_token {
                Some(access_token) => {
                    SessionStore::new(&store).save(&access_token, response.expires_in)?;
                    println!("Registration successful, you are logged in.");
                }
                None => anyhow::bail!("Registration failed. Please try again."),
            }
        }
        Command::Search {
            keywords,
            location,
            page,
        } => {
            let keywords = collect_tags(&keywords, 20);
            if keywords.is_empty() {
                anyhow::bail!("Please enter at least one keyword");
            }

            let token = SessionStore::new(&store).access_token()?;
            let client = ApiClient::new(http, &settings).with_access_token(token);
            let postings = client
                .search_jobs(keywords.tags(), location.as_deref())
                .await?;

            println!("Found {} jobs", postings.len());
            let total = api::total_pages(postings.len(), JOBS_PER_PAGE);
            for job in api::page(&postings, page, JOBS_PER_PAGE) {
                println!();
                println!("{}  (score: {})", job.job_title, job.score);
                println!("  {} - {}", job.job_company, job.job_location);
                println!("  matched: {}", job.matched_keywords);
                println!("  {}", job.link);
            }
            if total > 1 {
                println!();
                println!("Page {} of {}", page.clamp(1, total), total);
            }
        }
        Command::UpdateDb { locations, queries } => {
            let locations = collect_tags(&locations, 10);
            let queries = collect_tags(&queries, 15);
            if locations.is_empty() || queries.is_empty() {
                anyhow::bail!("Please enter at least one location and one query");
            }

            let token = SessionStore::new(&store).access_token()?;
            let client = ApiClient::new(http, &settings).with_access_token(token);
            let response = client
                .update_database(locations.tags(), queries.tags())
                .await?;

            if response.success {
                println!("Database updated successfully!");
            } else {
                println!("Database update completed but with warnings.");
            }
        }
        Command::Logs => {
            let token = SessionStore::new(&store).access_token()?;
            let mut stream = open_stream(http, &settings, token)?;
            let mut viewer = LogViewer::new();

            println!("Following live logs (ctrl-c to stop)...");
            while let Some(event) = stream.next().await {
                match event {
                    LogEvent::Line(line) => {
                        viewer.push_line(line.clone());
                        println!("{line}");
                    }
                    LogEvent::Error(err) => {
                        // Terminal for this stream; make the stop visible
                        eprintln!("log stream stopped: {err}");
                        anyhow::bail!(err);
                    }
                }
            }
        }
        Command::Logout => {
            SessionStore::new(&store).clear()?;
            println!("Session cleared.");
        }
    }

    Ok(())
}

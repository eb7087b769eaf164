// Fiches - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading and logging initialisation
// 3. Mounting the file browser against the HTTP backend
// 4. Applying filters, paging and printing the listing

use clap::{Parser, Subcommand};
use fiches_sync::app::browser::{BrowserOptions, FileBrowser};
use fiches_sync::app::persistence::FilePersistence;
use fiches_sync::core::model::{AccountTier, ClassLevel, Domain, TimeRange};
use fiches_sync::platform::config::{self, PlatformPaths};
use fiches_sync::platform::http::HttpBackend;
use fiches_sync::ui::listing;
use fiches_sync::util::error::FichesError;
use fiches_sync::util::{self, constants};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Fiches - browse your generated worksheet files.
///
/// Lists, filters and pages through the files stored for a user. Filters
/// are remembered between runs.
#[derive(Parser, Debug)]
#[command(name = "fiches", version, about)]
struct Cli {
    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    /// Base URL of the files API (overrides [api] base_url).
    #[arg(long = "api", global = true)]
    api: Option<String>,

    /// User whose files are listed (overrides [api] user_id).
    #[arg(long = "user", global = true)]
    user: Option<String>,

    /// Account tier: free, standard or premium (overrides [account] tier).
    #[arg(long = "tier", global = true, value_parser = parse_tier)]
    tier: Option<AccountTier>,

    /// Include inactive files.
    #[arg(long = "all-files", global = true)]
    all_files: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List files using the remembered filters.
    List {
        /// Number of pages to load.
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Search with explicit filters; they replace the remembered ones.
    Search(SearchArgs),
    /// List available tags, or suggest tags for a prefix.
    Tags {
        /// Autocomplete buffer.
        prefix: Option<String>,
    },
    /// Reset every filter to its default and list the recent files.
    Clear,
}

#[derive(clap::Args, Debug)]
struct SearchArgs {
    /// Subject domain: math, francais, lecture.
    #[arg(long, value_parser = parse_domain)]
    domain: Option<Domain>,

    /// Class level: CP, CE1, CE2, CM1, CM2.
    #[arg(long, value_parser = parse_level)]
    level: Option<ClassLevel>,

    /// Time range: today, week, month, 3months, unlimited.
    #[arg(long, value_parser = parse_period)]
    period: Option<TimeRange>,

    /// Required tag (repeatable; every tag must match).
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Free-text search on the file name.
    #[arg(long)]
    text: Option<String>,

    /// Number of pages to load.
    #[arg(long, default_value_t = 1)]
    pages: u32,
}

fn parse_domain(value: &str) -> Result<Domain, String> {
    Domain::parse(value).ok_or_else(|| format!("unknown domain '{value}'"))
}

fn parse_level(value: &str) -> Result<ClassLevel, String> {
    ClassLevel::parse(value).ok_or_else(|| format!("unknown class level '{value}'"))
}

fn parse_period(value: &str) -> Result<TimeRange, String> {
    TimeRange::parse(value).ok_or_else(|| format!("unknown period '{value}'"))
}

fn parse_tier(value: &str) -> Result<AccountTier, String> {
    AccountTier::parse(value).ok_or_else(|| format!("unknown tier '{value}'"))
}

fn main() {
    let cli = Cli::parse();

    // Config is read before logging so that [logging] level can apply.
    let paths = PlatformPaths::resolve();
    let (app_config, config_warnings) = config::load_config(&paths.config_dir);

    util::logging::init(cli.debug, app_config.log_level.as_deref());
    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        "Fiches starting"
    );
    for warning in &config_warnings {
        tracing::warn!("{warning}");
    }

    let Some(user_id) = cli.user.clone().or_else(|| app_config.user_id.clone()) else {
        eprintln!("Error: no user given. Pass --user or set [api] user_id in config.toml.");
        std::process::exit(2);
    };
    let base_url = cli.api.clone().unwrap_or_else(|| app_config.base_url.clone());

    let options = BrowserOptions {
        active_only: app_config.active_only && !cli.all_files,
        debounce: app_config.debounce,
        tier: cli.tier.unwrap_or(app_config.tier),
        ..Default::default()
    };

    let backend = Arc::new(HttpBackend::new(&base_url, &user_id, app_config.http_timeout));
    let persistence = FilePersistence::in_dir(&paths.data_dir);
    tracing::debug!(path = %persistence.path().display(), "Filter storage");
    let mut browser = FileBrowser::new(backend, Box::new(persistence), options);

    if let Err(e) = run(&mut browser, cli.command) {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Mount the browser, run one command and print its output.
fn run(browser: &mut FileBrowser, command: Command) -> util::error::Result<()> {
    let wait = Duration::from_secs(constants::CLI_FETCH_WAIT_SECS);
    browser.mount(Instant::now());
    settle_fetches(browser, wait);

    match command {
        Command::List { pages } => {
            load_pages(browser, pages, wait);
            print!("{}", listing::render(browser));
        }
        Command::Search(args) => {
            apply_search_args(browser, &args);
            browser.flush();
            settle_fetches(browser, wait);
            load_pages(browser, args.pages, wait);
            print!("{}", listing::render(browser));
        }
        Command::Tags { prefix } => {
            let tags = match prefix {
                Some(prefix) => {
                    browser.set_tag_input(&prefix);
                    browser.tag_suggestions()
                }
                None => browser.available_tags().to_vec(),
            };
            if tags.is_empty() {
                println!("No tags.");
            }
            for tag in tags {
                println!("{tag}");
            }
        }
        Command::Clear => {
            browser.clear_filters(Instant::now());
            settle_fetches(browser, wait);
            print!("{}", listing::render(browser));
        }
    }

    match browser.error() {
        Some(error) => Err(FichesError::from(error.clone())),
        None => Ok(()),
    }
}

/// Replace every filter dimension with the command-line values.
fn apply_search_args(browser: &mut FileBrowser, args: &SearchArgs) {
    let now = Instant::now();
    browser.set_domain(args.domain, now);
    browser.set_level(args.level, now);
    browser.set_time_range(args.period.unwrap_or_default(), now);
    browser.set_search_text(args.text.as_deref().unwrap_or(""), now);

    let selected: Vec<String> = browser.filters().tags.iter().cloned().collect();
    for tag in selected {
        browser.remove_tag(&tag, now);
    }
    for tag in &args.tags {
        if !browser.add_tag(tag, now) {
            tracing::warn!(tag = %tag, tier = %browser.tier(), "Tag filter not applied");
        }
    }
}

/// Load up to `pages` pages in total, stopping early when nothing is left.
fn load_pages(browser: &mut FileBrowser, pages: u32, wait: Duration) {
    for _ in 1..pages.max(1) {
        if !browser.load_more() {
            break;
        }
        settle_fetches(browser, wait);
        if browser.error().is_some() {
            break;
        }
    }
}

/// Wait for outstanding fetches; a failed search is retried once.
fn settle_fetches(browser: &mut FileBrowser, wait: Duration) {
    browser.wait_for_fetches(wait);
    if browser.error().is_some() && browser.retry() {
        browser.wait_for_fetches(wait);
    }
}

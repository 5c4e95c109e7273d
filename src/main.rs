use clap::{Parser, Subcommand};
use folio::config::{self, SiteConfig, SitePaths};
use folio::orchestrator::Orchestrator;
use folio::scheduler::SchedulerError;
use folio::{output, telemetry};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

fn version_string() -> &'static str {
    let on_tag = env!("FOLIO_ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("FOLIO_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Change-aware static blog builder")]
#[command(long_about = "\
Change-aware static blog builder

Markdown articles with TOML front matter become pages, a home page, a
yearly archive and an Atom feed. Only what changed since the last good
build is rebuilt.

Site structure:

  site/
  ├── config.toml                  # Site config (optional)
  ├── content/
  │   ├── articles/
  │   │   └── 2024-05-01-hello.md  # +++ front matter +++ then Markdown
  │   ├── stylesheets/*.css        # Linked from every page
  │   ├── images/                  # Symlinked to <target>/assets/images
  │   └── javascripts/             # Symlinked under the versioned assets
  └── views/
      ├── _head.html               # Partials spliced into every page
      ├── _header.html
      ├── _footer.html
      ├── article.html             # Optional per-view fragments
      ├── index.html
      └── archive.html

Front matter:

  +++
  title = \"Hello\"
  published_at = 2024-05-01T09:30:00Z
  location = \"Lisbon\"     # optional
  short_id = \"hi\"         # optional, served at /a/hi
  +++

Run 'folio gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Site root holding config.toml, content/ and views/
    #[arg(long, default_value = ".", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, env = "TARGET_DIR", default_value = "public", global = true)]
    target: PathBuf,

    /// Directory for build state (fingerprints, article snapshot)
    #[arg(long, default_value = ".folio", global = true)]
    state_dir: PathBuf,

    /// Drafts mode: robots.txt keeps crawlers away
    #[arg(long, env = "DRAFTS", global = true)]
    drafts: bool,

    /// Parallel build workers (overrides processing.max_processes)
    #[arg(long, env = "CONCURRENCY", global = true)]
    concurrency: Option<usize>,

    /// Debug logging
    #[arg(long, short, env = "VERBOSE", global = true)]
    verbose: bool,

    /// Rebuild everything regardless of what changed
    #[arg(long, global = true)]
    force: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site once
    Build,
    /// Rebuild on an interval, keeping build state in memory
    Loop {
        /// Seconds between builds
        #[arg(long, default_value_t = 2)]
        interval: u64,
    },
    /// Parse every article without writing output
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    telemetry::init(cli.verbose)?;
    Ok(run(&cli)?)
}

fn run(cli: &Cli) -> Result<ExitCode, SchedulerError> {
    let code = match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            ExitCode::SUCCESS
        }
        Command::Build => match open_site(cli)? {
            Some(mut orchestrator) => build_once(&mut orchestrator, cli.force),
            None => ExitCode::FAILURE,
        },
        Command::Loop { interval } => {
            let Some(mut orchestrator) = open_site(cli)? else {
                return Ok(ExitCode::FAILURE);
            };
            let interval = Duration::from_secs(interval.max(1));
            let mut forced = cli.force;
            loop {
                let _ = build_once(&mut orchestrator, forced);
                forced = false;
                std::thread::sleep(interval);
            }
        }
        Command::Check => match open_site(cli)? {
            Some(orchestrator) => match orchestrator.check() {
                Ok(valid) => {
                    output::print_check_output(valid, &cli.source);
                    ExitCode::SUCCESS
                }
                Err(failure) => {
                    output::print_failure(&failure);
                    ExitCode::FAILURE
                }
            },
            None => ExitCode::FAILURE,
        },
    };
    Ok(code)
}

/// Orchestrator for the site at `--source`, or `None` after reporting an
/// unusable config.
fn open_site(cli: &Cli) -> Result<Option<Orchestrator>, SchedulerError> {
    let site_config = match load_site_config(cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("==> Invalid configuration in {}", cli.source.display());
            eprintln!("    {err}");
            return Ok(None);
        }
    };
    let paths = SitePaths::new(&cli.source, &cli.target, &cli.state_dir);
    Orchestrator::new(site_config, paths).map(Some)
}

/// Load `config.toml` and apply command-line overrides.
fn load_site_config(cli: &Cli) -> Result<SiteConfig, config::ConfigError> {
    let mut site_config = config::load_config(&cli.source)?;
    if cli.drafts {
        site_config.drafts = true;
    }
    if let Some(concurrency) = cli.concurrency {
        site_config.processing.max_processes = Some(concurrency);
    }
    Ok(site_config)
}

fn build_once(orchestrator: &mut Orchestrator, forced: bool) -> ExitCode {
    match orchestrator.build(forced) {
        Ok(report) => {
            output::print_build_report(&report, &orchestrator.paths().target_dir);
            ExitCode::SUCCESS
        }
        Err(failure) => {
            output::print_failure(&failure);
            ExitCode::FAILURE
        }
    }
}

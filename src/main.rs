use clap::{Parser, Subcommand};
use sitebake::context::BuildContext;
use sitebake::lastmod::GitHistory;
use sitebake::render::Theme;
use sitebake::{build, config, output};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "sitebake")]
#[command(about = "Static site builder for a personal site")]
#[command(long_about = "\
Static site builder for a personal site

Posts are declared in posts.json and written in markdown or as HTML
fragments. Pages, posts, content-hashed CSS/JS bundles, sitemap.xml and
robots.txt are written to the output directory, which is wiped first.

Site structure:

  site/
  ├── config.toml        # Build config (optional; see gen-config)
  ├── site.json          # Title, author, holiday banner (optional)
  ├── posts.json         # [{\"slug\", \"title\", \"date\", \"content\" | \"template\"}]
  ├── posts/hello.md     # Markdown post bodies
  ├── templates/         # HTML post bodies
  ├── data/              # projects.json, resume.md
  └── static/            # Copied verbatim; bundle sources live here

The base URL comes from SITE_BASE_URL, then base_url in config.toml.
Log verbosity follows RUST_LOG (default: info).

Run 'sitebake gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Site source directory
    #[arg(long, default_value = "site", global = true)]
    source: PathBuf,

    /// Output directory (removed and recreated on build)
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the whole site into the output directory
    Build,
    /// Validate config, posts, bundles and templates without writing
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_context(cli: &Cli) -> Result<BuildContext, config::ConfigError> {
    let base_url_env = std::env::var(config::BASE_URL_ENV).ok();
    let build_date = chrono::Utc::now().date_naive();
    BuildContext::load(&cli.source, &cli.output, base_url_env.as_deref(), build_date)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    match &cli.command {
        Command::Build => {
            let ctx = load_context(&cli)?;
            println!("==> Building {} → {}", cli.source.display(), cli.output.display());
            let history = GitHistory::new(&ctx.source_dir);
            let summary = build::build(&ctx, &Theme, &history)?;
            output::print_build_output(&summary);
        }
        Command::Check => {
            let ctx = load_context(&cli)?;
            println!("==> Checking {}", cli.source.display());
            let summary = build::check(&ctx, &Theme)?;
            output::print_check_output(&summary);
            println!("==> Site is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use tunesync::config::{ConfigOverrides, MatchConfig};
use tunesync::mirror::{mirror_link, mirror_manual, MirrorReport};
use tunesync::models::TrackDescriptor;
use tunesync::normalize::sanitize;
use tunesync::platform::Platform;
use tunesync::scoring::{score, ScoreMode};
use tunesync::session::SessionFixture;

#[derive(Parser)]
#[command(name = "tunesync")]
#[command(about = "Match tracks across YouTube and Spotify and mirror them into playlists")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the sanitized form of a title
    Sanitize { title: String },

    /// Print token-set and token-sort scores for two strings
    Compare { a: String, b: String },

    /// Run the matcher against recorded API responses and print the report
    Match(MatchArgs),

    /// Mirror a link or manual entry into the fixture's playlists
    Mirror(MirrorArgs),
}

#[derive(Args)]
struct FixtureArgs {
    /// Session fixture (JSON) with recorded API responses and playlists
    #[arg(long)]
    fixture: PathBuf,

    /// Matcher config (JSON); missing fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

#[derive(Args)]
struct MatchArgs {
    #[command(flatten)]
    fixture: FixtureArgs,

    /// Platform to search (youtube/spotify, or just y/s)
    #[arg(long)]
    target: Platform,

    /// Shared link to resolve and match
    #[arg(long, conflicts_with = "title")]
    link: Option<String>,

    #[arg(long)]
    title: Option<String>,

    /// Artist name (repeatable)
    #[arg(long, requires = "title")]
    artist: Vec<String>,
}

#[derive(Args)]
struct MirrorArgs {
    #[command(flatten)]
    fixture: FixtureArgs,

    #[arg(long, conflicts_with = "title")]
    link: Option<String>,

    #[arg(long, requires = "artist")]
    title: Option<String>,

    #[arg(long)]
    artist: Option<String>,

    /// Only add to the playlist with this name (manual entries)
    #[arg(long, requires = "title")]
    playlist: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn load_config(args: &FixtureArgs) -> Result<MatchConfig> {
    let config = match args.config.as_deref() {
        Some(path) => MatchConfig::from_json_file(path).context("Failed to load matcher config")?,
        None => MatchConfig::default(),
    };
    Ok(args.overrides.apply(config))
}

fn load_fixture(args: &FixtureArgs) -> Result<SessionFixture> {
    SessionFixture::from_json_file(&args.fixture).context("Failed to load session fixture")
}

fn run_match(args: MatchArgs) -> Result<()> {
    let config = load_config(&args.fixture)?;
    let (session, _) = load_fixture(&args.fixture)?.into_session(config);

    let origin = match (args.link, args.title) {
        (Some(link), _) => session
            .resolve_link(&link)
            .with_context(|| format!("Failed to resolve {}", link))?,
        (None, Some(title)) => {
            // Without an artist the title is treated like a raw video title
            let platform = if args.artist.is_empty() {
                Platform::Youtube
            } else {
                Platform::Spotify
            };
            TrackDescriptor::unresolved(title, Some(args.artist), platform)
        }
        (None, None) => bail!("either --link or --title is required"),
    };

    let report = session
        .explain_match(&origin, args.target)
        .context("Matcher aborted")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn print_report(report: &MirrorReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report);
    }
    Ok(())
}

fn run_mirror(args: MirrorArgs) -> Result<()> {
    let config = load_config(&args.fixture)?;
    let (mut session, playlists) = load_fixture(&args.fixture)?.into_session(config);

    let report = match (&args.link, &args.title, &args.artist) {
        (Some(link), _, _) => mirror_link(&mut session, link, &playlists)?,
        (None, Some(title), Some(artist)) => mirror_manual(
            &mut session,
            title,
            artist,
            &playlists,
            args.playlist.as_deref(),
        )?,
        _ => bail!("either --link or --title with --artist is required"),
    };
    print_report(&report, args.json)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Sanitize { title } => println!("{}", sanitize(&title)),
        Command::Compare { a, b } => {
            println!("set:  {}", score(&a, &b, ScoreMode::Set));
            println!("sort: {}", score(&a, &b, ScoreMode::Sort));
        }
        Command::Match(args) => run_match(args)?,
        Command::Mirror(args) => run_mirror(args)?,
    }
    Ok(())
}

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "marquee", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a festival document as a poster PNG.
    Poster(PosterArgs),
    /// Compose a festival document and print the poster scene as JSON.
    Scene(SceneArgs),
    /// Check that a festival document parses and report its normalized shape.
    Validate(ValidateArgs),
}

#[derive(Parser, Debug)]
struct PosterArgs {
    /// Input festival JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Background theme; unknown values fall back to "city".
    #[arg(long)]
    theme: Option<String>,

    /// Poster start date (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Directory holding the poster fonts.
    #[arg(long, default_value = "assets")]
    assets: PathBuf,
}

#[derive(Parser, Debug)]
struct SceneArgs {
    /// Input festival JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Background theme; unknown values fall back to "city".
    #[arg(long)]
    theme: Option<String>,

    /// Poster start date (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Input festival JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Poster(args) => cmd_poster(args),
        Command::Scene(args) => cmd_scene(args),
        Command::Validate(args) => cmd_validate(args),
    }
}

fn read_festival(path: &Path) -> anyhow::Result<marquee::Festival> {
    let f = File::open(path).with_context(|| format!("open festival '{}'", path.display()))?;
    let r = BufReader::new(f);
    let doc: marquee::FestivalDoc =
        serde_json::from_reader(r).with_context(|| "parse festival JSON")?;
    Ok(marquee::Festival::from_doc(doc))
}

fn resolve_theme(festival: &marquee::Festival, theme: Option<&str>) -> marquee::Theme {
    theme.map(marquee::Theme::parse).unwrap_or(festival.theme)
}

fn resolve_date(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| chrono::Local::now().date_naive())
}

fn cmd_poster(args: PosterArgs) -> anyhow::Result<()> {
    let festival = read_festival(&args.in_path)?;
    let theme = resolve_theme(&festival, args.theme.as_deref());
    let style = marquee::PosterStyle::default();

    let assets = marquee::PosterAssets::prepare(&args.assets, &style)
        .with_context(|| format!("prepare poster assets from '{}'", args.assets.display()))?;

    let png = marquee::render_poster_png(
        &festival,
        theme,
        resolve_date(args.date),
        &style,
        &assets,
    )
    .context("could not generate the poster image")?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_scene(args: SceneArgs) -> anyhow::Result<()> {
    let festival = read_festival(&args.in_path)?;
    let theme = resolve_theme(&festival, args.theme.as_deref());
    let style = marquee::PosterStyle::default();

    let scene = marquee::compose_poster(&festival, theme, resolve_date(args.date), &style);
    serde_json::to_writer_pretty(std::io::stdout().lock(), &scene)
        .with_context(|| "serialize scene JSON")?;
    println!();
    Ok(())
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let festival = read_festival(&args.in_path)?;
    let assigned = festival.artists.iter().filter(|a| a.slot.is_some()).count();
    println!(
        "{}: {} days, {} stages, {} artists ({} assigned), theme {}",
        festival.name,
        festival.days,
        festival.stages.len(),
        festival.artists.len(),
        assigned,
        festival.theme.as_str(),
    );
    Ok(())
}

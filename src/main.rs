use brakescope::analytics::chart::{format_percentage, percentage};
use brakescope::{
    AnalyticsError, AnalyticsSession, ChartKind, Config, CsvFolderIngestor, Event, RenderBundle,
    SortKey, SourceTables,
};
use chrono::Local;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "brakescope")]
#[command(author, version, about = "Select, sort and chart error frequencies from brake-system logs")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// CSV file or folder of CSV exports (optional in GUI mode)
    path: Option<PathBuf>,

    /// Launch GUI folder picker (auto-enabled when double-clicked)
    #[arg(long)]
    gui: bool,

    /// Session config file (default: brakescope.json in the data folder)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only offer errors whose description contains this text (case-insensitive)
    #[arg(short, long, default_value = "")]
    search: String,

    /// Error description to select (repeatable)
    #[arg(long = "select", value_name = "DESCRIPTION")]
    select: Vec<String>,

    /// Select every error passing the search
    #[arg(long)]
    all: bool,

    /// Chart to render
    #[arg(long, value_enum)]
    chart: Option<ChartKind>,

    /// Sort the selected errors by this column
    #[arg(long, value_enum)]
    sort: Option<SortKey>,

    /// Sort descending
    #[arg(long)]
    descending: bool,

    /// Bar chart: categories on the y axis
    #[arg(long)]
    swap_axes: bool,

    /// Bar chart: annotate raw counts instead of percentages
    #[arg(long)]
    raw_values: bool,

    /// Detail column to include (repeatable)
    #[arg(long = "field", value_name = "COLUMN")]
    fields: Vec<String>,

    /// Output report file (.html, .json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for auto-generated reports
    #[arg(long, default_value = "brakescope-reports")]
    report_dir: PathBuf,

    /// Don't auto-generate a report
    #[arg(long)]
    no_report: bool,

    /// Don't prompt to open the report
    #[arg(long)]
    no_open: bool,

    /// Only show metrics
    #[arg(short, long)]
    quiet: bool,

    /// Log filter, e.g. "debug" or "brakescope=trace"
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start interactive web UI
    Serve {
        /// CSV file or folder of CSV exports
        path: PathBuf,

        /// Port to listen on
        #[arg(short, long, default_value = "3001")]
        port: u16,

        /// Don't open a browser
        #[arg(long)]
        no_open: bool,
    },
}

fn main() {
    let args = Args::parse();
    init_logging(&args.log_level);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Args) -> brakescope::Result<()> {
    if let Some(Command::Serve { path, port, no_open }) = args.command {
        let config = Config::discover(args.config.as_deref(), &path)?;
        let tables = ingest(&config, &path, false)?;

        let mut session = AnalyticsSession::with_selection(config.initial_selection());
        if let Err(AnalyticsError::NoDataLoaded) = session.load(tables) {
            eprintln!("\x1b[33mNo data found in the CSV files!\x1b[0m");
        }

        let source = path.canonicalize().unwrap_or(path).display().to_string();
        return brakescope::serve::start(port, session, &source, !no_open);
    }

    // With GUI feature: launch GUI if --gui flag OR no path provided
    #[cfg(feature = "gui")]
    let use_gui = args.gui || args.path.is_none();

    #[cfg(not(feature = "gui"))]
    let use_gui = false;

    let path = match args.path.clone() {
        Some(p) if !args.gui => p,
        _ if use_gui => match pick_path_gui() {
            Some(p) => p,
            None => {
                eprintln!("No file or folder selected.");
                return Ok(());
            }
        },
        Some(p) => p,
        None => {
            eprintln!("Usage: brakescope <PATH>");
            eprintln!("Run 'brakescope --help' for more options.");
            std::process::exit(1);
        }
    };

    let config = Config::discover(args.config.as_deref(), &path)?;

    if !args.quiet {
        eprintln!("\x1b[1mBrakescope - Brake Log Error Analysis\x1b[0m");
        eprintln!("{}", "─".repeat(70));
    }

    let tables = ingest(&config, &path, args.quiet)?;

    let mut selection = config.initial_selection();
    if let Some(kind) = args.chart {
        selection.chart_kind = kind;
    }
    if let Some(key) = args.sort {
        selection.sort_key = key;
    }
    if args.descending {
        selection.sort_ascending = false;
    }
    selection.axes_swapped |= args.swap_axes;
    selection.show_percentage &= !args.raw_values;

    let mut session = AnalyticsSession::with_selection(selection);
    match session.load(tables) {
        Ok(_) => {}
        Err(AnalyticsError::NoDataLoaded) => {
            eprintln!("\x1b[33mNo data found in the CSV files!\x1b[0m");
            return Ok(());
        }
        Err(e) => return Err(e),
    }

    session.handle(Event::Search { term: args.search.clone() });
    if args.all {
        session.handle(Event::SelectAllMatching);
    }
    for description in &args.select {
        session.handle(Event::SelectError { description: description.clone() });
    }
    let bundle = session.handle(Event::SetFields { fields: args.fields.clone() });

    print_bundle(&bundle, args.quiet);

    let report_path = if let Some(ref output) = args.output {
        Some(output.clone())
    } else if !args.no_report {
        std::fs::create_dir_all(&args.report_dir)?;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        Some(args.report_dir.join(format!("brakescope_report_{}.html", timestamp)))
    } else {
        None
    };

    if let Some(ref output_path) = report_path {
        brakescope::report::generate(output_path, &bundle)?;
        if !args.quiet {
            eprintln!("\n\x1b[32mReport saved: {}\x1b[0m", output_path.display());
        }
        if !args.no_open {
            offer_open(output_path, use_gui, args.quiet);
        }
    }

    Ok(())
}

fn ingest(config: &Config, path: &Path, quiet: bool) -> brakescope::Result<SourceTables> {
    let ingestor = CsvFolderIngestor::from_config(config);
    let files = ingestor.find_files(path);

    if files.is_empty() {
        eprintln!("No CSV files found in {}", path.display());
        return Ok(SourceTables::default());
    }
    if !quiet {
        eprintln!("Found {} CSV file(s)\n", files.len());
    }

    let pb = if !quiet && files.len() > 1 {
        let pb = ProgressBar::new(files.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("=>-"));
        }
        Some(pb)
    } else {
        None
    };

    let tables = ingestor.ingest_files(&files, |file| {
        if let Some(ref pb) = pb {
            pb.inc(1);
            pb.set_message(file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default());
        }
    })?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    Ok(tables)
}

fn print_bundle(bundle: &RenderBundle, quiet: bool) {
    if !quiet {
        for source in &bundle.sources {
            if let Some(error) = &source.error {
                eprintln!("  {:<40} \x1b[33mskipped: {}\x1b[0m", source.name, error);
                continue;
            }
            match &source.metadata {
                Some(meta) => eprintln!(
                    "  {:<40} {:>6} rows  {}  depot {}  coach {}",
                    source.name,
                    source.rows,
                    meta.date.format("%d-%m-%Y"),
                    meta.depot,
                    meta.coach
                ),
                None => eprintln!("  {:<40} {:>6} rows", source.name, source.rows),
            }
        }
        eprintln!("\n{} error kind(s) available", bundle.candidates.len());
    }

    let Some(metrics) = &bundle.metrics else {
        if let Some(reason) = bundle.no_data_reason {
            eprintln!("\x1b[33m{}\x1b[0m", reason.message());
        }
        if !quiet {
            eprintln!("\nAvailable errors:");
            for c in &bundle.candidates {
                eprintln!("  {:<40} {:>8}", truncate(&c.description, 40), c.frequency);
            }
        }
        return;
    };

    eprintln!("\n\x1b[1mSummary:\x1b[0m");
    eprintln!("  Total Errors:       {}", metrics.total_display);
    eprintln!("  Most Common Error:  {}", metrics.mode_description);
    eprintln!("  Highest Frequency:  {}", metrics.mode_frequency_display);

    if quiet {
        return;
    }

    eprintln!("\n{}", "─".repeat(70));
    println!("{:<46} {:>10} {:>8}", "DESCRIPTION", "FREQUENCY", "SHARE");
    for r in &bundle.working_view {
        println!(
            "{:<46} {:>10} {:>8}",
            truncate(&r.description, 46),
            r.frequency,
            format_percentage(percentage(r.frequency, metrics.total_count))
        );
    }
    eprintln!(
        "\n\x1b[90m{} chart, sorted by {} ({})\x1b[0m",
        bundle.chart_kind,
        bundle.sort_key,
        if bundle.sort_ascending { "ascending" } else { "descending" }
    );
}

fn offer_open(path: &Path, use_gui: bool, quiet: bool) {
    if use_gui {
        // In GUI mode, auto-open the report (no prompt)
        let _ = open::that(path);
    } else if !quiet {
        eprint!("\nOpen report in browser? [Y/n] ");
        io::stderr().flush().ok();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_ok() {
            let input = input.trim().to_lowercase();
            if input.is_empty() || input == "y" || input == "yes" {
                if let Err(e) = open::that(path) {
                    eprintln!("Failed to open report: {}", e);
                }
            }
        }
    }
}

#[cfg(feature = "gui")]
fn pick_path_gui() -> Option<PathBuf> {
    // First try folder picker
    if let Some(folder) = rfd::FileDialog::new()
        .set_title("Select folder of brake logs (or Cancel for a single file)")
        .pick_folder()
    {
        return Some(folder);
    }

    // If cancelled, offer file picker
    rfd::FileDialog::new()
        .set_title("Select brake log CSV")
        .add_filter("CSV files", &["csv"])
        .pick_file()
}

#[cfg(not(feature = "gui"))]
fn pick_path_gui() -> Option<PathBuf> {
    None
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

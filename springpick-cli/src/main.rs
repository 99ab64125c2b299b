mod config;
mod output;

use clap::Parser;
use springpick_core::persist::format_record;
use springpick_core::{
    load_comparisons, ComparisonGraph, ComparisonRecord, ItemId, NextPair, RankEngine,
    Representation, Session, SessionError,
};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::config::{RankOverrides, SpringpickConfig};

pub fn bail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

#[derive(Parser)]
#[command(name = "springpick", version, about = "Rank items from pairwise outcomes and pick the next pair to compare")]
struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Rank the items in a comparison log
    Rank(RankArgs),
    /// Print the next pair worth comparing
    Next(SessionArgs),
    /// Append one outcome to the log, then show the new ranking and next pair
    Record(RecordArgs),
    /// Compare pairs interactively on stdin until every pair is resolved
    Judge(SessionArgs),
    /// Create a default config file at ~/.config/springpick/config.toml
    Init {
        /// Where to write the config (default: ~/.config/springpick/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Flags shared by every command that reads a log.
#[derive(clap::Args)]
struct CommonArgs {
    /// Comparison log, one `winner>loser` line per outcome
    #[arg(long)]
    comparisons: Option<PathBuf>,

    /// Path to config file (default: ~/.config/springpick/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Regularization strength; 0 pins the last item
    #[arg(long)]
    alpha: Option<f64>,

    /// Anchor value for alpha > 0
    #[arg(long)]
    l0: Option<f64>,

    /// Weight of the win/loss imbalance
    #[arg(long)]
    l1: Option<f64>,

    /// Linear solver: "direct" or "iterative"
    #[arg(long)]
    solver: Option<String>,

    /// Matrix representation: "dense" or "sparse"
    #[arg(long)]
    representation: Option<String>,

    /// Scores closer than this share a tier
    #[arg(long)]
    tie_tolerance: Option<f64>,

    /// Output JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct RankArgs {
    #[command(flatten)]
    common: CommonArgs,
    /// Print one `position)<TAB>items...` line per tier instead of a table
    #[arg(long, conflicts_with = "json")]
    lines: bool,
}

#[derive(clap::Args)]
struct SessionArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// File listing the item universe: JSON array or one integer per line
    #[arg(long)]
    items: Option<PathBuf>,

    /// Inline item ID (repeatable)
    #[arg(long = "item", allow_negative_numbers = true)]
    inline_items: Vec<ItemId>,

    /// Random redraws before falling back to an ordered scan for an unresolved pair
    #[arg(long)]
    max_redraws: Option<usize>,

    /// Seed for pair selection
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(clap::Args)]
struct RecordArgs {
    #[command(flatten)]
    session: SessionArgs,

    #[arg(long, allow_negative_numbers = true)]
    winner: ItemId,

    #[arg(long, allow_negative_numbers = true)]
    loser: ItemId,
}

/// Parse a string as either a JSON array of integers or plain text (one ID per line).
fn parse_items_from_str(content: &str) -> Vec<ItemId> {
    let trimmed = content.trim();
    if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)
            .unwrap_or_else(|e| bail(format!("File looks like JSON but failed to parse: {e}")))
    } else {
        trimmed
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| l.parse::<ItemId>().unwrap_or_else(|_| bail(format!("Invalid item ID \"{l}\""))))
            .collect()
    }
}

/// Item universe from --items and --item, or the items seen in the log.
fn load_items(args: &SessionArgs, graph: &ComparisonGraph) -> Vec<ItemId> {
    let mut items = Vec::new();

    if let Some(ref path) = args.items {
        let content = std::fs::read_to_string(path)
            .unwrap_or_else(|e| bail(format!("Failed to read items file {}: {e}", path.display())));
        items = parse_items_from_str(&content);
    }

    items.extend(args.inline_items.iter().copied());

    if items.is_empty() {
        items = graph.seen_items();
    }

    let mut seen = HashSet::with_capacity(items.len());
    if let Some(dup) = items.iter().find(|&&id| !seen.insert(id)) {
        bail(format!("Item {dup} is listed more than once"));
    }
    items
}

/// Everything resolved from config file + flags.
struct Context {
    cfg: SpringpickConfig,
    overrides: RankOverrides,
    log_path: PathBuf,
}

impl Context {
    fn new(common: &CommonArgs, max_redraws: Option<usize>) -> Self {
        let config_path = common.config.clone().unwrap_or_else(config::config_path);
        let cfg = config::load_config(&config_path);

        let log_path = common.comparisons.clone()
            .or_else(|| cfg.comparisons.clone())
            .unwrap_or_else(|| {
                bail(format!("No comparison log specified. Pass --comparisons or set it in {}", config_path.display()));
            });

        let representation = common.representation.as_deref().map(|name| match name {
            "dense" => Representation::Dense,
            "sparse" => Representation::Sparse,
            other => bail(format!("Unknown representation \"{other}\". Use \"dense\" or \"sparse\".")),
        });

        let overrides = RankOverrides {
            alpha: common.alpha,
            l0: common.l0,
            l1: common.l1,
            solver: common.solver.clone(),
            representation,
            tie_tolerance: common.tie_tolerance,
            max_redraws,
        };

        Context { cfg, overrides, log_path }
    }

    /// A missing log is an empty one.
    fn load_graph(&self) -> ComparisonGraph {
        match File::open(&self.log_path) {
            Ok(file) => load_comparisons(BufReader::new(file))
                .unwrap_or_else(|e| bail(format!("{}: {e}", self.log_path.display()))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => ComparisonGraph::new(),
            Err(e) => bail(format!("Failed to open {}: {e}", self.log_path.display())),
        }
    }

    fn session(&self, args: &SessionArgs) -> Session {
        let graph = self.load_graph();
        let items = load_items(args, &graph);
        let session = Session::with_graph(
            &items,
            graph,
            self.cfg.rank_config(&self.overrides),
            self.cfg.selector_config(&self.overrides),
        )
        .unwrap_or_else(|e| bail(e));

        match args.seed {
            Some(seed) => session.with_seed(seed),
            None => session,
        }
    }
}

fn append_record(path: &Path, record: &ComparisonRecord) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap_or_else(|e| bail(format!("Failed to open {}: {e}", path.display())));
    writeln!(file, "{}", format_record(record))
        .unwrap_or_else(|e| bail(format!("Failed to write {}: {e}", path.display())));
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Rank(args) => run_rank(args),
        Commands::Next(args) => run_next(args),
        Commands::Record(args) => run_record(args),
        Commands::Judge(args) => run_judge(args),
        Commands::Init { config: path } => {
            let path = path.unwrap_or_else(config::config_path);
            config::create_default_config(&path);
            println!("Created config at {}", path.display());
            println!("Edit it to set your default comparison log and ranking parameters.");
        }
    }
}

fn run_rank(args: RankArgs) {
    let ctx = Context::new(&args.common, None);
    let graph = ctx.load_graph();
    if graph.is_empty() {
        bail(format!("No comparisons in {}", ctx.log_path.display()));
    }

    let engine = RankEngine::new(ctx.cfg.rank_config(&ctx.overrides)).unwrap_or_else(|e| bail(e));
    let ranking = engine.rank_graph(&graph).unwrap_or_else(|e| bail(e));

    if args.common.json {
        output::print_json(Some(&ranking), graph.len(), None);
    } else if args.lines {
        print!("{ranking}");
    } else {
        output::print_table(&ranking, graph.len());
    }
}

fn run_next(args: SessionArgs) {
    let ctx = Context::new(&args.common, args.max_redraws);
    let mut session = ctx.session(&args);
    let next = session.next_pair();

    if args.common.json {
        output::print_json(session.current_ranking(), session.graph().len(), Some(next));
    } else {
        output::print_next(next);
    }
}

fn run_record(args: RecordArgs) {
    let ctx = Context::new(&args.session.common, args.session.max_redraws);
    let mut session = ctx.session(&args.session);

    let record = ComparisonRecord::new(args.winner, args.loser);
    match session.record_comparison(record.winner, record.loser) {
        Ok(()) => {}
        // Recorded, just not rankable yet.
        Err(SessionError::Rank(e)) => eprintln!("Warning: {e}"),
        Err(e) => bail(e),
    }
    append_record(&ctx.log_path, &record);

    let next = session.next_pair();
    if args.session.common.json {
        output::print_json(session.current_ranking(), session.graph().len(), Some(next));
        return;
    }
    if let Some(ranking) = session.current_ranking() {
        output::print_table(ranking, session.graph().len());
        println!();
    }
    output::print_next(next);
}

/// Ask which of `a` and `b` wins. `None` on quit or end of input.
fn ask(a: ItemId, b: ItemId, lines: &mut impl Iterator<Item = io::Result<String>>) -> Option<(ItemId, ItemId)> {
    loop {
        print!("[1] {a}  vs  [2] {b}  (q to quit): ");
        let _ = io::stdout().flush();

        let line = lines.next()?.unwrap_or_else(|e| bail(format!("Failed to read from stdin: {e}")));
        match line.trim() {
            "1" => return Some((a, b)),
            "2" => return Some((b, a)),
            "q" | "quit" => return None,
            other => eprintln!("Unrecognized answer \"{other}\". Type 1, 2 or q."),
        }
    }
}

fn run_judge(args: SessionArgs) {
    let ctx = Context::new(&args.common, args.max_redraws);
    let mut session = ctx.session(&args);
    if session.universe().len() < 2 {
        bail("Need at least 2 items to judge. Use --items <file> or --item <id>.");
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut judged = 0usize;

    while let NextPair::Pair(a, b) = session.next_pair() {
        let Some((winner, loser)) = ask(a, b, &mut lines) else {
            break;
        };

        match session.record_comparison(winner, loser) {
            Ok(()) => {}
            Err(SessionError::Rank(e)) => tracing::debug!(error = %e, "No ranking yet"),
            Err(e) => bail(e),
        }
        append_record(&ctx.log_path, &ComparisonRecord::new(winner, loser));
        judged += 1;
    }

    eprintln!("Recorded {judged} comparisons to {}", ctx.log_path.display());

    if args.common.json {
        let next = session.next_pair();
        output::print_json(session.current_ranking(), session.graph().len(), Some(next));
    } else {
        match session.current_ranking() {
            Some(ranking) => output::print_table(ranking, session.graph().len()),
            None => println!("No ranking yet: the comparisons do not connect every item."),
        }
    }
}

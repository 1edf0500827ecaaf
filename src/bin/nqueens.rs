use std::time::{Duration, Instant};

use clap::Parser;
use log::info;

use nqueens_bdd::board::RenderStyle;
use nqueens_bdd::config::SolverConfig;
use nqueens_bdd::queens::{count_solutions, solutions, BoardSize, QueensModel};

#[derive(Debug, Parser)]
#[command(author, version, about = "Solve the N-Queens puzzle with a BDD-based constraint solver")]
struct Cli {
    /// Number of queens (board dimension).
    #[arg(value_name = "INT", default_value = "8", allow_negative_numbers = true)]
    n: i64,

    /// Unique table size (in bits, so the actual size is `2^size` nodes).
    #[arg(long, value_name = "INT", default_value = "20")]
    storage_bits: usize,

    /// Computed table size (in bits).
    #[arg(long, value_name = "INT", default_value = "16")]
    cache_bits: usize,

    /// Give up after this many milliseconds and report `unknown`.
    #[arg(long, value_name = "MS")]
    timeout: Option<u64>,

    /// Print every solution, separated by blank lines.
    #[arg(long, conflicts_with = "count")]
    all: bool,

    /// Print the number of solutions.
    #[arg(long)]
    count: bool,

    /// Marker for a queen.
    #[arg(long, value_name = "CHAR", default_value = "Q")]
    queen: char,

    /// Marker for an empty cell.
    #[arg(long, value_name = "CHAR", default_value = "_")]
    empty: char,

    /// Log level.
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: simplelog::LevelFilter,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    simplelog::TermLogger::init(
        args.log_level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = Instant::now();
    info!("args = {:?}", args);

    let size = BoardSize::try_from(args.n)?;
    let config = SolverConfig::default()
        .with_storage_bits(args.storage_bits)?
        .with_cache_bits(args.cache_bits)?
        .with_timeout(args.timeout.map(Duration::from_millis));
    let style = RenderStyle {
        queen: args.queen,
        empty: args.empty,
    };

    if args.count {
        match count_solutions(size, &config)? {
            Some(count) => println!("{}", count),
            None => println!("unknown"),
        }
    } else if args.all {
        let mut iter = solutions(size, &config)?;
        let mut found = 0usize;
        for placement in iter.by_ref() {
            let placement = placement?;
            if found > 0 {
                println!();
            }
            println!("{}", placement.render(&style));
            found += 1;
        }
        if iter.timed_out() {
            println!("unknown");
        } else if found == 0 {
            println!("unsat");
        }
        info!("Found {} solutions", found);
    } else {
        let mut model = QueensModel::build(size, &config)?;
        let outcome = model.solve()?;
        println!("{}", outcome.render(&style));

        let stats = model.session().stats();
        info!(
            "nodes: {}, steps: {}, cache hits: {}, cache misses: {}",
            stats.nodes, stats.steps, stats.cache_hits, stats.cache_misses
        );
    }

    info!("Done in {:.3} s", time_total.elapsed().as_secs_f64());

    Ok(())
}

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use extrusion_optimizer::types::{DemandLine, OptimizationResult, StockOption};
use extrusion_optimizer::{BestLengthSearch, Solver, render, single_length_catalog};
use serde::Deserialize;

#[derive(Parser)]
#[command(
    name = "extrusion_optimizer",
    about = "Linear cutting stock optimizer for extrusions"
)]
struct Cli {
    /// Pieces as PART[/FINISH]:LENGTH:QTY (e.g. 4410/CLR:96.5:4)
    #[arg(long = "cuts", num_args = 1..)]
    cuts: Vec<String>,

    /// Stock as PART[/FINISH]:LEN1[:QTY1][,LEN2[:QTY2]] (e.g. 4410/CLR:252:10,288:5)
    #[arg(long = "stock", num_args = 1..)]
    stock: Vec<String>,

    /// JSON job file with `demand`, `stock_options` and optional `kerf`
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Blade kerf width (default: job file value, else 0)
    #[arg(long)]
    kerf: Option<f64>,

    /// Search whole stock lengths MIN..MAX and cut from the best one
    #[arg(long, value_name = "MIN..MAX", value_parser = parse_range)]
    best_length: Option<(u32, u32)>,

    /// Spread the work over all cores
    #[arg(long)]
    parallel: bool,

    /// Show an ASCII strip of each bar
    #[arg(long)]
    layout: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    #[arg(long, default_value = "warn")]
    log_level: tracing::Level,
}

#[derive(Deserialize)]
struct Job {
    demand: Vec<DemandLine>,
    #[serde(default)]
    stock_options: Vec<StockOption>,
    #[serde(default)]
    kerf: Option<f64>,
}

fn parse_range(s: &str) -> Result<(u32, u32), String> {
    let (min, max) = s
        .split_once("..")
        .ok_or_else(|| format!("invalid range '{}', expected MIN..MAX", s))?;
    let min = min
        .parse::<u32>()
        .map_err(|_| format!("invalid minimum in '{}'", s))?;
    let max = max
        .parse::<u32>()
        .map_err(|_| format!("invalid maximum in '{}'", s))?;
    if min > max {
        return Err(format!("empty range '{}'", s));
    }
    Ok((min, max))
}

fn parse_part(s: &str) -> Result<(&str, &str), String> {
    let (part, finish) = s.split_once('/').unwrap_or((s, ""));
    if part.is_empty() {
        return Err(format!("missing part number in '{}'", s));
    }
    Ok((part, finish))
}

fn parse_length(s: &str, ctx: &str) -> Result<f64, String> {
    let length = s
        .parse::<f64>()
        .map_err(|_| format!("invalid length in '{}'", ctx))?;
    if !length.is_finite() || length <= 0.0 {
        return Err(format!("length must be positive in '{}'", ctx));
    }
    Ok(length)
}

fn parse_cut(s: &str) -> Result<DemandLine, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return Err(format!("invalid cut '{}', expected PART[/FINISH]:LENGTH:QTY", s));
    }
    let (part, finish) = parse_part(parts[0])?;
    let length = parse_length(parts[1], s)?;
    let qty = parts[2]
        .parse::<u32>()
        .map_err(|_| format!("invalid quantity in '{}'", s))?;
    if qty == 0 {
        return Err(format!("quantity must be non-zero in '{}'", s));
    }
    Ok(DemandLine::new(part, finish, length, qty))
}

fn parse_stock(s: &str) -> Result<StockOption, String> {
    let (part_spec, rest) = s.split_once(':').ok_or_else(|| {
        format!("invalid stock '{}', expected PART[/FINISH]:LEN1[:QTY1][,LEN2[:QTY2]]", s)
    })?;
    let (part, finish) = parse_part(part_spec)?;

    let mut options = Vec::new();
    for candidate in rest.split(',') {
        let (length, qty) = candidate.split_once(':').unwrap_or((candidate, "1"));
        let length = parse_length(length, s)?;
        let qty = qty
            .parse::<u32>()
            .map_err(|_| format!("invalid quantity in '{}'", s))?;
        options.push((length, qty));
    }
    match options.as_slice() {
        [(l1, q1)] => Ok(StockOption::single(part, finish, *l1, *q1)),
        [first, second] => Ok(StockOption::choice(part, finish, *first, *second)),
        _ => Err(format!("at most two stock lengths per entry in '{}'", s)),
    }
}

fn load_job(path: &Path) -> anyhow::Result<Job> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("could not read job file {}", path.display()))?;
    serde_json::from_str(&text).context("incorrect job file format")
}

fn exit_with(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", msg);
    std::process::exit(1);
}

fn print_plan(result: &OptimizationResult, layout: bool) {
    for bar in &result.cut_pattern {
        println!("{}:", bar);
        for cut in &bar.cuts {
            if cut.mark.is_empty() {
                println!("  {}", cut.length);
            } else {
                println!("  {} [{}]", cut.length, cut.mark);
            }
        }
        println!("  waste {:.3}", bar.remaining);
        if layout {
            println!("  {}", render::render_bar(bar));
        }
        println!();
    }

    println!("Stock needed:");
    for sc in &result.stock_lengths_needed {
        println!("  {} {} @ {} x {}", sc.part_number, sc.finish, sc.stock_length, sc.bars);
    }

    let summary = &result.summary;
    println!(
        "Summary: {} bar{} used, {:.1}% waste",
        summary.bar_count,
        if summary.bar_count == 1 { "" } else { "s" },
        summary.waste_percent,
    );
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(cli.log_level)
        .init();

    let (mut demand, mut stock, job_kerf) = match &cli.input {
        Some(path) => {
            let job = load_job(path).unwrap_or_else(|e| exit_with(format!("{:#}", e)));
            (job.demand, job.stock_options, job.kerf)
        }
        None => (Vec::new(), Vec::new(), None),
    };

    for c in &cli.cuts {
        demand.push(parse_cut(c).unwrap_or_else(|e| exit_with(e)));
    }
    for s in &cli.stock {
        stock.push(parse_stock(s).unwrap_or_else(|e| exit_with(e)));
    }
    if demand.is_empty() {
        exit_with("no cuts given, use --cuts or --input");
    }

    let kerf = cli.kerf.or(job_kerf).unwrap_or(0.0);
    if !kerf.is_finite() || kerf < 0.0 {
        exit_with(format!("kerf must be non-negative, got {}", kerf));
    }

    if let Some((min, max)) = cli.best_length {
        let length = BestLengthSearch::new(&demand, min, max, kerf)
            .parallel(cli.parallel)
            .run()
            .unwrap_or_else(|e| exit_with(e));
        if !cli.json {
            println!("Best stock length: {}\n", length);
        }
        stock = single_length_catalog(&demand, length as f64);
    } else if stock.is_empty() {
        exit_with("no stock given, use --stock, --input or --best-length");
    }

    let result = Solver::new(&demand, &stock, kerf)
        .parallel(cli.parallel)
        .solve()
        .unwrap_or_else(|e| exit_with(e));

    if cli.json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => exit_with(e),
        }
    } else {
        print_plan(&result, cli.layout);
    }
}

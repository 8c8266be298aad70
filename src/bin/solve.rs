//! CLI front-end for the river solver.
//!
//! # Usage
//!
//! ```bash
//! # Solve the default spot with CFR+
//! cargo run --release --bin solve -- --iters 2000
//!
//! # Solve a configured spot with DCFR and dump the strategy
//! cargo run --release --bin solve -- \
//!   --config spot.json \
//!   --algo dcfr \
//!   --iters 4000 \
//!   --dump-strategy strategy.json
//! ```

use std::env;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use river_solver::cards::parse_board;
use river_solver::config::load_config;
use river_solver::strategy::{build_dump, write_dump};
use river_solver::{
    CfrTrainer, CfrVariant, DiscountParams, MccfrTrainer, RiverConfig, RiverGame, StrategySource,
    Tree, VectorEvaluator,
};

struct Options {
    config_path: Option<PathBuf>,
    algo: String,
    iters: u64,
    stack: Option<i32>,
    bet_sizes: Option<Vec<f64>>,
    include_all_in: bool,
    max_raises: Option<u32>,
    checkpoints: Vec<u64>,
    dcfr: DiscountParams,
    seed: u64,
    mccfr_linear: bool,
    eval: bool,
    eval_interval: u64,
    target_exp: Option<f64>,
    dump_strategy: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            config_path: None,
            algo: "cfr+".to_string(),
            iters: 2000,
            stack: None,
            bet_sizes: None,
            include_all_in: true,
            max_raises: None,
            checkpoints: Vec::new(),
            dcfr: DiscountParams::default(),
            seed: 7,
            mccfr_linear: false,
            eval: true,
            eval_interval: 1,
            target_exp: None,
            dump_strategy: None,
        }
    }
}

fn print_help() {
    println!(
        "Usage: solve [--config PATH] [--stack N] \
         [--algo cfr|cfr+|lcfr|dcfr|mccfr|mccfr-linear|all] [--iters N] \
         [--bet-sizes LIST] [--no-all-in] [--max-raises N] [--checkpoints LIST] \
         [--target-exp X] [--seed N] [--mccfr-linear] [--no-eval] [--eval-interval N]"
    );
    println!("  DCFR params: --dcfr-alpha A --dcfr-beta B --dcfr-gamma G");
    println!("  Bet sizes: --bet-sizes 0.5,1 (comma-separated pot fractions)");
    println!("  Checkpoints: --checkpoints 1024,2048,4096");
    println!("  Strategy dump: --dump-strategy PATH");
}

fn parse_doubles(value: &str) -> Option<Vec<f64>> {
    value
        .split(',')
        .filter(|item| !item.is_empty())
        .map(|item| item.parse::<f64>().ok())
        .collect()
}

fn parse_checkpoints(value: &str) -> Option<Vec<u64>> {
    let parsed: Option<Vec<u64>> = value
        .split(',')
        .filter(|item| !item.is_empty())
        .map(|item| item.parse::<u64>().ok())
        .collect();
    parsed.map(|list| list.into_iter().filter(|&n| n > 0).collect())
}

fn is_mccfr(value: &str) -> bool {
    matches!(value, "mccfr" | "mc" | "montecarlo" | "monte_carlo")
}

fn is_mccfr_linear(value: &str) -> bool {
    matches!(
        value,
        "mccfr-linear" | "mccfr_lin" | "mccfrlinear" | "mccfr-lin" | "mccfr_l"
    )
}

fn parse_variant(value: &str, dcfr: DiscountParams) -> CfrVariant {
    match value {
        "cfr" => CfrVariant::Cfr,
        "cfr+" | "cfrp" | "cfrplus" => CfrVariant::CfrPlus,
        "lcfr" | "linear" | "linear_cfr" => CfrVariant::LinearCfr,
        _ => CfrVariant::Discounted(dcfr),
    }
}

fn algo_label(value: &str) -> &'static str {
    match value {
        "cfr" => "CFR",
        "cfr+" | "cfrp" | "cfrplus" => "CFR+",
        "lcfr" | "linear" | "linear_cfr" => "Linear CFR",
        v if is_mccfr(v) => "Monte Carlo CFR",
        v if is_mccfr_linear(v) => "Monte Carlo CFR (linear)",
        _ => "Discounted CFR",
    }
}

fn parse_args() -> Options {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut opts = Options::default();

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        let value = |i: &mut usize| -> Option<String> {
            *i += 1;
            args.get(*i).cloned()
        };
        match arg {
            "--config" | "--subgame" => match value(&mut i) {
                Some(v) => opts.config_path = Some(PathBuf::from(v)),
                None => die_usage(arg),
            },
            "--algo" => match value(&mut i) {
                Some(v) => {
                    let algo = v.to_lowercase();
                    if is_mccfr_linear(&algo) {
                        opts.mccfr_linear = true;
                        opts.algo = "mccfr".to_string();
                    } else {
                        opts.algo = algo;
                    }
                }
                None => die_usage(arg),
            },
            "--iters" => opts.iters = parse_or_die(value(&mut i), arg),
            "--stack" => opts.stack = Some(parse_or_die(value(&mut i), arg)),
            "--bet-sizes" => {
                let raw: String = parse_or_die(value(&mut i), arg);
                match parse_doubles(&raw) {
                    Some(sizes) => opts.bet_sizes = Some(sizes),
                    None => die_usage(arg),
                }
            }
            "--no-all-in" => opts.include_all_in = false,
            "--max-raises" => opts.max_raises = Some(parse_or_die(value(&mut i), arg)),
            "--checkpoints" => {
                let raw: String = parse_or_die(value(&mut i), arg);
                match parse_checkpoints(&raw) {
                    Some(list) => opts.checkpoints = list,
                    None => die_usage(arg),
                }
            }
            "--mccfr-linear" => opts.mccfr_linear = true,
            "--no-eval" => opts.eval = false,
            "--eval-interval" => {
                opts.eval_interval = parse_or_die::<u64>(value(&mut i), arg).max(1)
            }
            "--target-exp" => opts.target_exp = Some(parse_or_die(value(&mut i), arg)),
            "--dump-strategy" => match value(&mut i) {
                Some(v) => opts.dump_strategy = Some(PathBuf::from(v)),
                None => die_usage(arg),
            },
            "--dcfr-alpha" => opts.dcfr.alpha = parse_or_die(value(&mut i), arg),
            "--dcfr-beta" => opts.dcfr.beta = parse_or_die(value(&mut i), arg),
            "--dcfr-gamma" => opts.dcfr.gamma = parse_or_die(value(&mut i), arg),
            "--seed" => opts.seed = parse_or_die(value(&mut i), arg),
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            _ => {
                println!("Unknown arg: {}", arg);
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    opts
}

fn parse_or_die<T: std::str::FromStr>(value: Option<String>, flag: &str) -> T {
    match value.and_then(|v| v.parse().ok()) {
        Some(parsed) => parsed,
        None => die_usage(flag),
    }
}

fn die_usage(flag: &str) -> ! {
    eprintln!("Invalid or missing value for {}", flag);
    print_help();
    process::exit(1);
}

/// Something `run_schedule` can advance and score.
trait Runner {
    fn advance(&mut self, iterations: u64);
    fn exploitability(&self) -> f64;
}

impl Runner for CfrTrainer<'_> {
    fn advance(&mut self, iterations: u64) {
        self.run(iterations);
    }
    fn exploitability(&self) -> f64 {
        CfrTrainer::exploitability(self)
    }
}

impl Runner for MccfrTrainer<'_> {
    fn advance(&mut self, iterations: u64) {
        self.run(iterations);
    }
    fn exploitability(&self) -> f64 {
        MccfrTrainer::exploitability(self)
    }
}

struct EvalPoint {
    step: u64,
    exploitability: f64,
    elapsed: f64,
}

fn run_schedule<R: Runner>(runner: &mut R, opts: &Options) -> Vec<EvalPoint> {
    let start = Instant::now();
    let mut points: Vec<EvalPoint> = Vec::new();
    let target_active = opts.target_exp.is_some() && opts.eval;

    let should_eval = |step: u64| {
        if !opts.eval {
            return false;
        }
        if target_active {
            return true;
        }
        opts.eval_interval <= 1 || step % opts.eval_interval == 0
    };

    let record = |runner: &R, step: u64, points: &mut Vec<EvalPoint>| -> f64 {
        let exploitability = runner.exploitability();
        points.push(EvalPoint {
            step,
            exploitability,
            elapsed: start.elapsed().as_secs_f64(),
        });
        exploitability
    };

    let reached = |exploitability: f64| {
        target_active && exploitability <= opts.target_exp.unwrap_or(0.0)
    };

    if target_active && opts.checkpoints.is_empty() {
        // Double the iteration target until the bar is met.
        let mut completed = 0u64;
        let mut target = 5u64;
        loop {
            runner.advance(target - completed);
            completed = target;
            if should_eval(completed) && reached(record(runner, completed, &mut points)) {
                break;
            }
            if target > u64::MAX / 2 {
                break;
            }
            target *= 2;
        }
    } else if !opts.checkpoints.is_empty() {
        let mut completed = 0u64;
        for &target in &opts.checkpoints {
            if target <= completed {
                continue;
            }
            runner.advance(target - completed);
            completed = target;
            if should_eval(completed) && reached(record(runner, completed, &mut points)) {
                break;
            }
        }
    } else {
        runner.advance(opts.iters);
        if should_eval(opts.iters) {
            record(runner, opts.iters, &mut points);
        }
    }

    points
}

fn print_report(label: &str, base_pot: i32, points: &[EvalPoint], total_elapsed: f64) {
    let pot = if base_pot > 0 { base_pot as f64 } else { 1.0 };
    print!("{}:", label);
    if !points.is_empty() {
        print!(" iters=");
        for (i, point) in points.iter().enumerate() {
            if i > 0 {
                print!(",");
            }
            print!("{}", point.step);
        }
        print!(" Exploitability (chips):");
        for point in points {
            print!(" {:.6}", point.exploitability);
        }
        print!(" | Exploitability (% of pot):");
        for point in points {
            print!(" {:.6}%", point.exploitability / pot * 100.0);
        }
        print!(" | Elapsed (sec):");
        for point in points {
            print!(" {:.3}", point.elapsed);
        }
        println!();
    } else {
        println!(" (time_sec={:.3})", total_elapsed);
    }
}

fn dump_if_requested<S: StrategySource>(
    opts: &Options,
    game: &RiverGame,
    tree: &Tree,
    source: &S,
) {
    if let Some(path) = &opts.dump_strategy {
        let dump = build_dump(game, tree, source);
        if let Err(err) = write_dump(path, &dump) {
            eprintln!("Warning: failed to write strategy to {}: {}", path.display(), err);
        }
    }
}

fn run_deterministic(
    label: &str,
    game: &RiverGame,
    tree: &Tree,
    evaluator: &VectorEvaluator,
    variant: CfrVariant,
    opts: &Options,
) {
    let start = Instant::now();
    let mut trainer = CfrTrainer::new(game, tree, evaluator, variant);
    let points = run_schedule(&mut trainer, opts);
    print_report(label, game.base_pot, &points, start.elapsed().as_secs_f64());
    dump_if_requested(opts, game, tree, &trainer);
}

fn run_mccfr(
    game: &RiverGame,
    tree: &Tree,
    evaluator: &VectorEvaluator,
    opts: &Options,
) {
    let label = if opts.mccfr_linear {
        "Monte Carlo CFR (linear)"
    } else {
        "Monte Carlo CFR"
    };
    let start = Instant::now();
    let mut trainer = MccfrTrainer::new(game, tree, evaluator, opts.seed, opts.mccfr_linear);
    let points = run_schedule(&mut trainer, opts);
    print_report(label, game.base_pot, &points, start.elapsed().as_secs_f64());
    dump_if_requested(opts, game, tree, &trainer);
}

fn main() {
    let opts = parse_args();

    if opts.dump_strategy.is_some() && opts.algo == "all" {
        eprintln!("--dump-strategy requires a single algorithm (not --algo all).");
        process::exit(1);
    }

    let mut config = match &opts.config_path {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Error loading config: {}", err);
                process::exit(1);
            }
        },
        None => RiverConfig::default(),
    };
    if config.board_cards.is_empty() {
        config.board_cards = parse_board("KsTh7s4d2s").expect("default board");
    }
    if let Some(stack) = opts.stack {
        config.stack = stack;
    }
    if let Some(bet_sizes) = &opts.bet_sizes {
        config.bet_sizes = bet_sizes.clone();
    }
    if !opts.include_all_in {
        config.include_all_in = false;
    }
    if let Some(max_raises) = opts.max_raises {
        config.max_raises = max_raises;
    }

    let game = match RiverGame::new(config) {
        Ok(game) => game,
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    };
    let tree = Tree::build(&game);
    println!(
        "tree_nodes: internal={} terminal={} total={}",
        tree.internal_count(),
        tree.terminal_count(),
        tree.len()
    );

    let evaluator = VectorEvaluator::new(&game.hands);

    if opts.algo == "all" {
        run_deterministic("CFR+", &game, &tree, &evaluator, CfrVariant::CfrPlus, &opts);
        run_deterministic(
            "Linear CFR",
            &game,
            &tree,
            &evaluator,
            CfrVariant::LinearCfr,
            &opts,
        );
        run_deterministic(
            "Discounted CFR",
            &game,
            &tree,
            &evaluator,
            CfrVariant::Discounted(opts.dcfr),
            &opts,
        );
        return;
    }

    if is_mccfr(&opts.algo) {
        run_mccfr(&game, &tree, &evaluator, &opts);
        return;
    }

    let variant = parse_variant(&opts.algo, opts.dcfr);
    run_deterministic(
        algo_label(&opts.algo),
        &game,
        &tree,
        &evaluator,
        variant,
        &opts,
    );
}

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Instant;

use gpa_planner::config::{self, Config};
use gpa_planner::planner::{self, Catalog, PlanError, Target};
use gpa_planner::session::{self, PlanInput};

const EXIT_SUCCESS: i32 = 0;
const EXIT_INPUT: i32 = 1;
const EXIT_SEARCH_LIMIT: i32 = 2;
const EXIT_CONFIG: i32 = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Tsv,
    Json,
}

/// Where the current scores come from: a plan file, flags, or both
#[derive(Args, Debug)]
struct InputArgs {
    /// Plan file with course, elective, scores, locked subjects and target
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Course to take subjects from
    #[arg(long)]
    course: Option<String>,

    /// Elective within the course
    #[arg(long)]
    elective: Option<String>,

    /// Current score of a subject, as NAME=SCORE (repeatable)
    #[arg(short, long = "score", value_parser = session::parse_score_arg)]
    scores: Vec<(String, u8)>,

    /// Subject whose score cannot change (repeatable)
    #[arg(short, long = "lock")]
    locked: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rank the easiest ways to reach a target average
    Plan {
        #[command(flatten)]
        input: InputArgs,

        /// Target average, e.g. 8.5
        #[arg(short, long)]
        target: Option<Target>,

        /// Number of plans to show (defaults to search.top in config)
        #[arg(long, conflicts_with = "all")]
        top: Option<usize>,

        /// Show every plan that reaches the target
        #[arg(long)]
        all: bool,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Print the weighted average of the current scores
    Average {
        #[command(flatten)]
        input: InputArgs,
    },
    /// List courses, electives and subject credits
    Catalog,
    /// Write a default catalog config
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Parser, Debug)]
#[command(name = "gpa-planner")]
#[command(about = "Find the easiest way to reach a target GPA", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/gpa-planner/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = gpa_planner::logging::init_logging(cli.verbose) {
        eprintln!("{}", e);
    }

    let config_path = cli.config.map(PathBuf::from);

    let use_colors = gpa_planner::output::should_use_colors();

    match cli.command {
        Commands::Init { force } => {
            let path = config_path.unwrap_or_else(config::get_config_path);
            if let Err(e) = config::write_default_config(&path, force) {
                eprintln!("Config error: {:#}", e);
                std::process::exit(EXIT_CONFIG);
            }
            println!("Wrote default catalog to {}", path.display());
        }
        Commands::Plan {
            input,
            target,
            top,
            all,
            format,
        } => {
            let config = load_validated_config(config_path);
            let (plan_input, catalog) = resolve_input(&config, input);

            let mut options = config.search_options();
            options.limit = if all {
                None
            } else {
                Some(top.unwrap_or_else(|| config.default_top()))
            };

            let request = match plan_input.to_request(target, options) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("Input error: {:#}", e);
                    std::process::exit(EXIT_INPUT);
                }
            };

            let start_time = Instant::now();
            let outcome = match planner::search(&request, &catalog) {
                Ok(o) => o,
                Err(e) => exit_with_plan_error(e),
            };

            match format {
                OutputFormat::Table => {
                    println!(
                        "{}",
                        gpa_planner::output::format_plan_table(
                            &outcome,
                            &catalog,
                            request.target,
                            use_colors
                        )
                    );
                }
                OutputFormat::Tsv => {
                    let tsv = gpa_planner::output::format_tsv(&outcome, &catalog);
                    if !tsv.is_empty() {
                        println!("{}", tsv);
                    }
                }
                OutputFormat::Json => match gpa_planner::output::format_json(&outcome) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Output error: {:#}", e);
                        std::process::exit(EXIT_INPUT);
                    }
                },
            }

            if cli.verbose {
                eprintln!();
                eprintln!(
                    "{} in {:?}",
                    gpa_planner::output::format_summary(&outcome),
                    start_time.elapsed()
                );
            }
        }
        Commands::Average { input } => {
            let config = load_validated_config(config_path);
            let (plan_input, catalog) = resolve_input(&config, input);
            match planner::compute_average(&plan_input.current_scores(), &catalog) {
                Ok(average) => println!(
                    "{}",
                    gpa_planner::output::format_average(average, &catalog, use_colors)
                ),
                Err(e) => exit_with_plan_error(e),
            }
        }
        Commands::Catalog => {
            let config = load_validated_config(config_path);
            println!("{}", gpa_planner::output::format_catalog(&config, use_colors));
        }
    }

    std::process::exit(EXIT_SUCCESS);
}

/// Load the catalog config, exiting with `EXIT_CONFIG` if it is missing or invalid
fn load_validated_config(config_path: Option<PathBuf>) -> Config {
    let config = match config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    if let Err(errors) = config::validate_config(&config) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    config
}

/// Merge the plan file with flags and build the catalog for the chosen course
fn resolve_input(config: &Config, args: InputArgs) -> (PlanInput, Catalog) {
    let mut plan_input = match args.input {
        Some(path) => match session::load_plan_input(&path) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Input error: {:#}", e);
                std::process::exit(EXIT_INPUT);
            }
        },
        None => PlanInput::default(),
    };
    plan_input.apply_overrides(args.course, args.elective, args.scores, args.locked);

    let catalog = match config.catalog(
        plan_input.course.as_deref(),
        plan_input.elective.as_deref(),
    ) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Input error: {:#}", e);
            std::process::exit(EXIT_INPUT);
        }
    };

    (plan_input, catalog)
}

fn exit_with_plan_error(error: PlanError) -> ! {
    match error {
        PlanError::InvalidInput { errors } => {
            eprintln!("Input errors:");
            for error in errors {
                eprintln!("  - {}", error);
            }
            std::process::exit(EXIT_INPUT);
        }
        PlanError::InvalidTarget(_) => {
            eprintln!("Input error: {}", error);
            std::process::exit(EXIT_INPUT);
        }
        PlanError::SearchSpaceExceeded { .. } => {
            eprintln!("Search refused: {}", error);
            eprintln!("Lock more subjects or raise search.max_combinations in the config.");
            std::process::exit(EXIT_SEARCH_LIMIT);
        }
    }
}

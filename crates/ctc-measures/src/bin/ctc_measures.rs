use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use ctc_measures::core::Verbosity;
use ctc_measures::{
    check_consistency_with, evaluate, Dataset, ErrorCategory, EvalError, EvaluationConfig,
    EvaluationOptions, EvaluationReport, InconsistencyPolicy, MeasureSpec, PenaltyConfig,
    SequenceLayout, DEFAULT_DIGITS,
};

#[derive(Parser, Debug)]
#[command(
    name = "ctc-measures",
    version,
    about = "Cell Tracking Challenge accuracy measures for label image sequences"
)]
struct Cli {
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Structured JSON log lines; RUST_LOG overrides -v and -q.
    #[cfg(feature = "tracing")]
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Raw AOGM with custom penalty weights.
    Aogm {
        #[command(flatten)]
        pair: PairArgs,
        /// Split, FN vertex, FP vertex, redundant edge, missing edge, wrong semantics.
        #[arg(long, value_delimiter = ',', value_name = "W,W,W,W,W,W")]
        weights: Option<Vec<f64>>,
    },
    /// Tracking accuracy, normalised AOGM with the challenge weights.
    Tra {
        #[command(flatten)]
        pair: PairArgs,
    },
    /// Detection accuracy, AOGM restricted to vertex operations.
    Det {
        #[command(flatten)]
        pair: PairArgs,
    },
    /// Segmentation accuracy, mean Jaccard index of the GT objects.
    Seg {
        #[command(flatten)]
        pair: PairArgs,
        /// Also list the RES labels of every scored frame.
        #[arg(long)]
        all_res_labels: bool,
    },
    /// Biologically inspired measures computed from the lineages.
    Bio {
        #[command(flatten)]
        pair: PairArgs,
        #[arg(long, value_enum, value_delimiter = ',', default_value = "ct,tf,bc,cca")]
        measures: Vec<BioMeasure>,
        /// Frame tolerance of BC(i).
        #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(0..=5))]
        i: u32,
    },
    /// Validate the track file of one GT or RES directory against its images.
    Check {
        dir: PathBuf,
        #[arg(long, default_value_t = DEFAULT_DIGITS)]
        digits: usize,
        /// Dataset kind; detected from the track file name when omitted.
        #[arg(long, value_enum)]
        dataset: Option<DatasetArg>,
        /// Also flag background-only images.
        #[arg(long)]
        empty: bool,
        /// Print the outcome as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run the measures listed in a JSON config file.
    Run {
        #[arg(long, value_name = "JSON")]
        config: PathBuf,
    },
}

#[derive(Args, Debug)]
struct PairArgs {
    /// Ground truth directory (holds TRA/ and SEG/).
    #[arg(long, value_name = "DIR")]
    gt: PathBuf,
    /// Result directory (holds res_track.txt and mask images).
    #[arg(long, value_name = "DIR")]
    res: PathBuf,
    /// Zero-padded width of frame indices in file names.
    #[arg(long, default_value_t = DEFAULT_DIGITS)]
    digits: usize,
    /// Frames DET and SEG are limited to, e.g. "1-9,23,25".
    #[arg(long, value_name = "LIST")]
    timepoints: Option<String>,
    /// Skip the consistency check of the track files.
    #[arg(long)]
    no_consistency: bool,
    /// Treat background-only images as violations.
    #[arg(long)]
    stop_on_empty: bool,
    /// Log violations and score anyway instead of failing.
    #[arg(long)]
    report_inconsistent: bool,
    /// Log the per-frame GT/RES matching.
    #[arg(long)]
    matching: bool,
    /// Do not log the categorized error operations.
    #[arg(long)]
    no_log_reports: bool,
    /// Write the evaluation report as JSON.
    #[arg(long, value_name = "JSON")]
    report: Option<PathBuf>,
}

impl PairArgs {
    fn into_config(self, measures: Vec<MeasureSpec>) -> Result<EvaluationConfig, EvalError> {
        let mut options = EvaluationOptions {
            consistency_check: !self.no_consistency,
            log_reports: !self.no_log_reports,
            matching_reports: self.matching,
            stop_on_empty_images: self.stop_on_empty,
            inconsistency_policy: if self.report_inconsistent {
                InconsistencyPolicy::Report
            } else {
                InconsistencyPolicy::Abort
            },
            ..EvaluationOptions::default()
        };
        if let Some(selection) = &self.timepoints {
            options = options.with_timepoints(selection)?;
        }
        let mut config = EvaluationConfig::new(self.gt, self.res);
        config.layout = SequenceLayout::new(self.digits);
        config.options = options;
        config.measures = measures;
        config.report_path = self.report;
        Ok(config)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BioMeasure {
    Ct,
    Tf,
    Bc,
    Cca,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DatasetArg {
    Gt,
    Res,
}

impl From<DatasetArg> for Dataset {
    fn from(d: DatasetArg) -> Self {
        match d {
            DatasetArg::Gt => Dataset::GroundTruth,
            DatasetArg::Res => Dataset::Result,
        }
    }
}

fn init_logging(cli: &Cli) {
    let verbosity = Verbosity::new(cli.quiet, cli.verbose);
    #[cfg(feature = "tracing")]
    {
        ctc_measures::core::init_tracing(cli.log_json, verbosity);
        // no-op when the subscriber already bridged `log`
        let _ = tracing_log::LogTracer::init();
    }
    #[cfg(not(feature = "tracing"))]
    {
        if let Err(e) = ctc_measures::core::init_with_level(verbosity) {
            eprintln!("logger setup failed: {e}");
        }
    }
}

fn exit_code(category: ErrorCategory) -> u8 {
    match category {
        ErrorCategory::InputFormat => 2,
        ErrorCategory::Consistency => 3,
        ErrorCategory::ComputationPrecondition => 4,
    }
}

fn print_report(report: &EvaluationReport) {
    for o in &report.outcomes {
        println!("{}: {:.6}", o.name, o.value);
        if let Some(c) = &o.consistency {
            eprintln!(
                "{}: scored despite {} consistency violations",
                o.name,
                c.violations.len()
            );
        }
    }
    for f in &report.failures {
        eprintln!("{}: not computed ({}): {}", f.name, f.category, f.error);
    }
}

fn run(command: Command) -> Result<ExitCode, EvalError> {
    let config = match command {
        Command::Aogm { pair, weights } => {
            let penalty = match weights {
                None => PenaltyConfig::ctc(),
                Some(w) => {
                    let Ok(w) = <[f64; 6]>::try_from(w) else {
                        Cli::command()
                            .error(
                                clap::error::ErrorKind::InvalidValue,
                                "--weights takes exactly six comma-separated values",
                            )
                            .exit()
                    };
                    PenaltyConfig::from_array(w)?
                }
            };
            let mut config = pair.into_config(vec![MeasureSpec::Aogm])?;
            config.penalty = penalty;
            config
        }
        Command::Tra { pair } => pair.into_config(vec![MeasureSpec::Tra])?,
        Command::Det { pair } => pair.into_config(vec![MeasureSpec::Det])?,
        Command::Seg {
            pair,
            all_res_labels,
        } => {
            let mut config = pair.into_config(vec![MeasureSpec::Seg])?;
            config.options.report_all_res_labels = all_res_labels;
            config
        }
        Command::Bio { pair, measures, i } => {
            let specs = measures
                .into_iter()
                .map(|m| match m {
                    BioMeasure::Ct => MeasureSpec::Ct,
                    BioMeasure::Tf => MeasureSpec::Tf,
                    BioMeasure::Bc => MeasureSpec::Bc { i },
                    BioMeasure::Cca => MeasureSpec::Cca,
                })
                .collect();
            pair.into_config(specs)?
        }
        Command::Check {
            dir,
            digits,
            dataset,
            empty,
            json,
        } => {
            let outcome = check_consistency_with(&dir, digits, dataset.map(Dataset::from), empty)?;
            if json {
                match serde_json::to_string_pretty(&outcome) {
                    Ok(text) => println!("{text}"),
                    Err(e) => eprintln!("failed to serialise the outcome: {e}"),
                }
            } else {
                for v in &outcome.violations {
                    println!("{v}");
                }
                println!(
                    "{} data in {}: {}",
                    outcome.dataset,
                    dir.display(),
                    if outcome.consistent {
                        "consistent"
                    } else {
                        "inconsistent"
                    }
                );
            }
            return Ok(if outcome.consistent {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(exit_code(ErrorCategory::Consistency))
            });
        }
        Command::Run { config } => EvaluationConfig::load_json(&config)?,
    };

    let report = evaluate(&config)?;
    print_report(&report);
    Ok(match report.failures.first() {
        None => ExitCode::SUCCESS,
        Some(f) => ExitCode::from(exit_code(f.category)),
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);
    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            if let EvalError::Inconsistent(report) = &e {
                eprint!("{report}");
            }
            eprintln!("error ({}): {e}", e.category());
            ExitCode::from(exit_code(e.category()))
        }
    }
}

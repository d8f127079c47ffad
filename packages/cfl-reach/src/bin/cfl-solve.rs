//! cfl-solve: CFL-reachability from the command line
//!
//! # Usage
//!
//! ```bash
//! # Generic grammar + labeled edge list
//! cfl-solve cfl grammar.txt graph.txt --variant focr
//!
//! # Alias analysis over a PEG, all simplifications, write the reduced graph
//! cfl-solve alias prog.peg --scc --fold --inter-dyck --write-graph prog.simple.peg
//!
//! # Value-flow analysis, YAML config, JSON statistics
//! cfl-solve vfa prog.ivfg --config run.yaml --json
//! ```
//!
//! Exit status is non-zero on any error, including a solver timeout.

use cfl_reach::config::{SolverConfig, SolverVariant};
use cfl_reach::features::cfl::application::{run_and_report, AliasAnalysis, GenericCfl, ValueFlowAnalysis};
use cfl_reach::features::cfl::infrastructure::{
    write_pairs, EdgeListReader, GrammarFile, GraphFile, ReportFormat, TerminalStatsSink,
};
use cfl_reach::features::cfl::ports::CflAnalysis;
use cfl_reach::{CflError, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cfl-solve")]
#[command(about = "All-pairs CFL-reachability with transitive-closure acceleration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    opts: RunOpts,
}

#[derive(Subcommand)]
enum Commands {
    /// Grammar file + labeled edge list
    Cfl {
        /// Grammar (tab-separated productions)
        grammar: PathBuf,
        /// Edge list (`src \t dst \t label [\t index]`)
        graph: PathBuf,
    },

    /// Alias analysis over a program expression graph
    Alias {
        /// PEG edge list (labels `a`, `d`, `f_i`)
        peg: PathBuf,
    },

    /// Value-flow analysis over an interprocedural value-flow graph
    Vfa {
        /// IVFG edge list (labels `a`, `call_i`, `ret_i`, `src` markers)
        ivfg: PathBuf,
    },
}

#[derive(Args)]
struct RunOpts {
    /// YAML configuration (schema v1); flags below override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Solver variant: standard, pocr, hpocr, focr, tr, semi-naive
    #[arg(long, global = true)]
    variant: Option<SolverVariant>,

    /// Merge SCCs over direct edges
    #[arg(long, global = true)]
    scc: bool,

    /// Fold single-entry direct chains
    #[arg(long, global = true)]
    fold: bool,

    /// Prune bracket edges that can never match
    #[arg(long, global = true)]
    inter_dyck: bool,

    /// Deadline in seconds (0 disables it)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Simplify (and optionally write) only
    #[arg(long, global = true)]
    no_solve: bool,

    /// Write the simplified graph here
    #[arg(long, global = true)]
    write_graph: Option<PathBuf>,

    /// Write the reported symbol's pairs here
    #[arg(long, global = true)]
    write_pairs: Option<PathBuf>,

    /// Symbol whose pairs are reported
    #[arg(long, global = true)]
    count_symbol: Option<String>,

    /// Labels treated as direct edges (generic instance)
    #[arg(long = "direct", global = true, value_delimiter = ',')]
    direct_labels: Vec<String>,

    /// Print statistics as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

impl RunOpts {
    fn solver_config(&self) -> Result<SolverConfig> {
        let mut config = match &self.config {
            Some(path) => SolverConfig::from_yaml_file(path)?,
            None => SolverConfig::default(),
        };
        if let Some(variant) = self.variant {
            config = config.variant(variant);
        }
        if let Some(secs) = self.timeout {
            config = config.timeout_secs(secs);
        }
        if self.count_symbol.is_some() {
            config = config.count_symbol(self.count_symbol.clone());
        }
        if !self.direct_labels.is_empty() {
            config = config.direct_labels(self.direct_labels.clone());
        }
        let simplify = config.simplify;
        config = config
            .scc(simplify.scc || self.scc)
            .fold(simplify.fold || self.fold)
            .inter_dyck(simplify.inter_dyck || self.inter_dyck);
        if self.no_solve {
            config = config.solve(false);
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(command: &Commands, config: &SolverConfig) -> Result<Box<dyn CflAnalysis>> {
    let analysis: Box<dyn CflAnalysis> = match command {
        Commands::Cfl { grammar, graph } => {
            let reader = EdgeListReader::new().with_direct_labels(config.direct_labels.iter().cloned());
            Box::new(GenericCfl::load(&GrammarFile::new(grammar.clone()), &GraphFile::new(graph.clone(), reader))?)
        }
        Commands::Alias { peg } => Box::new(AliasAnalysis::from_peg_file(peg)?),
        Commands::Vfa { ivfg } => Box::new(ValueFlowAnalysis::from_ivfg_file(ivfg)?),
    };
    Ok(analysis)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents)?;
    info!(path = %path.display(), bytes = contents.len(), "written");
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.opts.solver_config()?;
    let mut analysis = load(&cli.command, &config)?;

    let format = if cli.opts.json {
        ReportFormat::Json
    } else {
        ReportFormat::Text
    };
    let mut sink = TerminalStatsSink::new(std::io::stdout().lock(), format);
    let outcome = run_and_report(analysis.as_mut(), &config, &mut sink)?;

    if let Some(path) = &cli.opts.write_graph {
        write_file(path, &analysis.graph_text())?;
    }
    if let Some(path) = &cli.opts.write_pairs {
        if outcome.result.is_none() {
            return Err(CflError::analysis("--write-pairs needs a solve (drop --no-solve)"));
        }
        write_file(path, &write_pairs(&outcome.count_pairs()))?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.opts.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_timeout() => {
            error!(%err, "analysis aborted");
            ExitCode::from(124)
        }
        Err(err) => {
            error!(%err, "analysis failed");
            ExitCode::FAILURE
        }
    }
}

use anyhow::{Context, Result};
use clap::Parser;
use flowtag_core::config::{DEFAULT_TIMEOUT, PipelineConfig};
use flowtag_core::logging::{LogFormat, default_log_format, init_logging};
use flowtag_core::pipeline::{self, RunOptions};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "flowtag",
    version,
    about = "Tag flow log records by destination port and protocol and count them"
)]
struct Cli {
    /// Flow log to classify, one space-separated record per line
    flow_log: PathBuf,

    /// CSV lookup table: header row, then dstport,protocol,tag rows
    lookup_table: PathBuf,

    /// Where to write the report
    output: PathBuf,

    /// CSV protocol map of number,name rows (built-in table if omitted)
    protocol_map: Option<PathBuf>,

    /// Worker threads (defaults to the number of logical CPUs)
    #[arg(long)]
    workers: Option<NonZeroUsize>,

    /// Abandon the run if it takes longer than this many seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// Diagnostic log format on stderr
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

impl Cli {
    fn run_options(&self) -> RunOptions {
        let mut config =
            PipelineConfig::default().with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }

        RunOptions {
            flow_log: self.flow_log.clone(),
            lookup_table: self.lookup_table.clone(),
            output: self.output.clone(),
            protocol_map: self.protocol_map.clone(),
            config,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format.unwrap_or_else(default_log_format));

    if let Err(e) = run(&cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let opts = cli.run_options();

    pipeline::run(&opts)
        .with_context(|| format!("failed to tag {}", opts.flow_log.display()))?;

    println!("Output is written to file : {}", opts.output.display());
    Ok(())
}

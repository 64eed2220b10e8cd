//! `rampart` command line driver.
//!
//! ```ignore
//! $ rampart run --target http://127.0.0.1:31143 --stages 30s:10,30s:0 \
//!     --threshold 'http_req_duration:p(95)<500' --threshold 'http_req_success:rate>0.99'
//! $ rampart compare --baseline http://127.0.0.1:31143 --candidate http://127.0.0.1:8000
//! ```
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rampart::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
#[allow(unused)]
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Staged load harness")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ramp load against one target and check its thresholds.
    Run(RunArgs),
    /// Run the same workload against two targets, one after the other.
    Compare(CompareArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Base address of the target, e.g. `http://127.0.0.1:31143`.
    #[arg(short, long, env = "RAMPART_TARGET")]
    target: String,

    /// Label used in reports.
    #[arg(long, env = "RAMPART_NAME", default_value = "target")]
    name: String,

    #[command(flatten)]
    load: LoadArgs,
}

#[derive(Args, Debug)]
struct CompareArgs {
    #[arg(long, env = "RAMPART_BASELINE")]
    baseline: String,

    #[arg(long, env = "RAMPART_BASELINE_NAME", default_value = "baseline")]
    baseline_name: String,

    #[arg(long, env = "RAMPART_CANDIDATE")]
    candidate: String,

    #[arg(long, env = "RAMPART_CANDIDATE_NAME", default_value = "candidate")]
    candidate_name: String,

    #[command(flatten)]
    load: LoadArgs,
}

/// Workload options shared by every subcommand.
#[derive(Args, Debug)]
struct LoadArgs {
    #[arg(long, env = "RAMPART_PATH", default_value = DEFAULT_TARGET_PATH)]
    path: String,

    #[arg(short = 'X', long, env = "RAMPART_METHOD", default_value = "POST")]
    method: HttpMethod,

    /// Comma separated `DURATION:TARGET` list.
    #[arg(short, long, env = "RAMPART_STAGES", default_value = "30s:10,30s:0")]
    stages: String,

    /// `METRIC:SELECTOR<BOUND` expression; may be repeated.
    #[arg(long = "threshold", env = "RAMPART_THRESHOLDS", value_delimiter = ',')]
    thresholds: Vec<String>,

    #[arg(long, env = "RAMPART_TIMEOUT", default_value = "10s")]
    timeout: humantime::Duration,

    /// Pause between iterations of one virtual user.
    #[arg(long, env = "RAMPART_SLEEP", default_value = "1s")]
    sleep: humantime::Duration,

    #[arg(long, env = "RAMPART_TICK", default_value = "1s")]
    tick: humantime::Duration,

    #[arg(
        long = "success-status",
        env = "RAMPART_SUCCESS_STATUSES",
        value_delimiter = ',',
        default_value = "200,201"
    )]
    success_statuses: Vec<u16>,

    #[arg(long, env = "RAMPART_SEED", default_value_t = 0)]
    seed: u64,

    /// Also write the JSON report here.
    #[arg(long, env = "RAMPART_SUMMARY_EXPORT")]
    summary_export: Option<PathBuf>,
}

impl LoadArgs {
    fn config(&self, name: &str, base: &str) -> Result<RunConfig, ConfigError> {
        let target = TargetSpec::new(name, base, &self.path)?.with_method(self.method);
        let builder = RunConfig::builder(target)
            .stages(parse_stages(&self.stages)?)
            .request_timeout(self.timeout.into())
            .iteration_sleep(self.sleep.into())
            .tick_interval(self.tick.into())
            .success_statuses(self.success_statuses.iter().copied())
            .seed(self.seed);

        self.thresholds
            .iter()
            .fold(builder, |builder, t| builder.threshold(t.as_str()))
            .build()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rampart=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match execute(cli).await {
        Ok(status) => status.into(),
        Err(err) => {
            error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::from(ExitStatus::CONFIG_ERROR)
        }
    }
}

async fn execute(cli: Cli) -> anyhow::Result<ExitStatus> {
    match cli.command {
        Command::Run(args) => {
            let config = args
                .load
                .config(&args.name, &args.target)
                .context("Invalid run configuration")?;
            let target = HttpTarget::new(&config.target)?;

            let report = run(config, target).await?;
            println!("{report}");
            Ok(export(
                args.load.summary_export.as_deref(),
                || Ok(report.to_json()?),
                report.exit_status(),
            ))
        }
        Command::Compare(args) => {
            let baseline = args
                .load
                .config(&args.baseline_name, &args.baseline)
                .context("Invalid baseline configuration")?;
            let candidate = args
                .load
                .config(&args.candidate_name, &args.candidate)
                .context("Invalid candidate configuration")?;
            let baseline_target = HttpTarget::new(&baseline.target)?;
            let candidate_target = HttpTarget::new(&candidate.target)?;

            let comparison =
                compare((baseline, baseline_target), (candidate, candidate_target)).await?;
            println!("{comparison}");
            Ok(export(
                args.load.summary_export.as_deref(),
                || Ok(comparison.to_json()?),
                comparison.exit_status(),
            ))
        }
    }
}

/// Writes the JSON summary when requested.
///
/// The run already produced a verdict, so a failed export is reported but never changes the
/// exit status.
fn export(
    path: Option<&Path>,
    json: impl FnOnce() -> anyhow::Result<String>,
    status: ExitStatus,
) -> ExitStatus {
    let Some(path) = path else {
        return status;
    };
    let written = json().and_then(|json| {
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write summary to {}", path.display()))
    });
    match written {
        Ok(()) => info!("Summary written to {}", path.display()),
        Err(err) => {
            error!("{err:#}");
            eprintln!("error: {err:#}");
        }
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::time::Duration;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("rampart").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let Command::Run(args) = parse(&["run", "--target", "http://127.0.0.1:31143"]).command
        else {
            panic!("expected run");
        };
        let config = args.load.config(&args.name, &args.target).unwrap();

        assert_eq!(
            config.target.url.as_str(),
            "http://127.0.0.1:31143/api/v1/auth/load-test"
        );
        assert_eq!(config.target.method, HttpMethod::Post);
        assert_eq!(config.stages, parse_stages("30s:10,30s:0").unwrap());
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.iteration_sleep, Duration::from_secs(1));
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert!(config.thresholds.is_empty());
        assert_eq!(config.success_statuses.len(), 2);
    }

    #[test]
    fn run_with_options() {
        let Command::Run(args) = parse(&[
            "run",
            "-t",
            "http://localhost:8000",
            "-X",
            "GET",
            "--path",
            "/api/v1/data/all",
            "-s",
            "10s:5,1m:5,10s:0",
            "--threshold",
            "http_req_duration:p(95)<500",
            "--threshold",
            "http_req_success:rate>0.99,errors:count<10",
            "--timeout",
            "250ms",
            "--success-status",
            "200",
        ])
        .command
        else {
            panic!("expected run");
        };
        let config = args.load.config(&args.name, &args.target).unwrap();

        assert_eq!(config.target.method, HttpMethod::Get);
        assert_eq!(config.payload, PayloadSpec::Empty);
        assert_eq!(config.stages.len(), 3);
        assert_eq!(config.thresholds.len(), 3);
        assert_eq!(config.request_timeout, Duration::from_millis(250));
        assert_eq!(config.success_statuses.iter().copied().collect::<Vec<_>>(), vec![200]);
    }

    #[test]
    fn bad_thresholds_are_config_errors() {
        let Command::Run(args) = parse(&[
            "run",
            "-t",
            "http://localhost:8000",
            "--threshold",
            "http_req_duration:p(95)",
        ])
        .command
        else {
            panic!("expected run");
        };
        assert!(matches!(
            args.load.config(&args.name, &args.target),
            Err(ConfigError::Threshold(_))
        ));
    }

    #[test]
    fn unsupported_method_is_rejected_at_parse_time() {
        let res = Cli::try_parse_from([
            "rampart",
            "run",
            "-t",
            "http://localhost:8000",
            "-X",
            "BREW",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn export_keeps_the_verdict() {
        let path = std::env::temp_dir().join(format!("rampart-summary-{}.json", std::process::id()));
        let status = export(Some(&path), || Ok("{\"ok\":true}".to_string()), ExitStatus::Passed);
        assert_eq!(status, ExitStatus::Passed);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"ok\":true}");
        std::fs::remove_file(&path).unwrap();

        let unwritable = Path::new("/nonexistent-rampart-dir/summary.json");
        let status = export(Some(unwritable), || Ok("{}".to_string()), ExitStatus::Failed);
        assert_eq!(status, ExitStatus::Failed);

        let status = export(
            Some(&path),
            || Err(anyhow::anyhow!("not serializable")),
            ExitStatus::Inconclusive,
        );
        assert_eq!(status, ExitStatus::Inconclusive);
        assert!(!path.exists());

        assert_eq!(export(None, || unreachable!(), ExitStatus::Passed), ExitStatus::Passed);
    }

    #[test]
    fn compare_shares_the_workload() {
        let Command::Compare(args) = parse(&[
            "compare",
            "--baseline",
            "http://127.0.0.1:31143",
            "--candidate",
            "http://127.0.0.1:8000",
            "--candidate-name",
            "python",
        ])
        .command
        else {
            panic!("expected compare");
        };
        let baseline = args.load.config(&args.baseline_name, &args.baseline).unwrap();
        let candidate = args.load.config(&args.candidate_name, &args.candidate).unwrap();

        assert_eq!(baseline.target.name, "baseline");
        assert_eq!(candidate.target.name, "python");
        assert_eq!(baseline.stages, candidate.stages);
        assert_eq!(candidate.target.url.port(), Some(8000));
    }
}

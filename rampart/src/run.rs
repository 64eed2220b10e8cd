use crate::collector::MetricsCollector;
use crate::executor::{RequestExecutor, Target};
use crate::population::Population;
use crate::ramp::RampScheduler;
use crate::report::{Comparison, RunReport};
use crate::threshold::evaluate;
use crate::timer::Timer;
use crate::virtual_user::VuContext;
use rampart_core::{ConfigError, RunConfig};
use std::sync::Arc;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};

/// Runs one staged load test against `target` and evaluates its thresholds.
///
/// The configuration is validated before any request is issued. After the last stage the
/// remaining users are retired and their in-flight requests are awaited, so the summary is
/// taken only once every outcome has been recorded.
#[instrument(name = "run", skip_all, fields(target = %config.target.name))]
pub async fn run<T>(config: RunConfig, target: T) -> Result<RunReport, ConfigError>
where
    T: Target + Send + Sync + 'static,
{
    config.validate()?;
    info!("Running {} for {}", config.target, humantime::format_duration(config.total_duration()));

    let config = Arc::new(config);
    let collector = Arc::new(MetricsCollector::new());
    let executor = Arc::new(RequestExecutor::new(
        target,
        config.success_statuses.clone(),
    ));
    let scheduler = RampScheduler::new(config.stages.clone());
    let mut population = Population::new(VuContext {
        executor,
        collector: collector.clone(),
        config: config.clone(),
    });

    let mut timer = Timer::new(config.tick_interval);
    let deadline = timer.started() + scheduler.total_duration();
    debug!("Ticking every {timer}");

    // NOTE: This loop is time-sensitive. Nothing here may wait on a virtual user.
    loop {
        // The last stage may end between two ticks.
        let elapsed = tokio::select! {
            elapsed = timer.tick() => elapsed,
            _ = tokio::time::sleep_until(deadline) => break,
        };
        if elapsed >= scheduler.total_duration() {
            break;
        }

        let goal = scheduler.tick(elapsed);
        population.set_concurrency(goal);
        collector.set_live_vus(population.concurrency());
        trace!(elapsed = ?elapsed, goal, "Tick");
    }

    info!(
        "Ramp complete after {} users; draining",
        population.spawned()
    );
    population.shutdown().await;

    let summary = collector.snapshot();
    let verdict = evaluate(&summary, &config.thresholds);
    info!(
        requests = collector.recorded(),
        "Run complete: {}", verdict.verdict
    );

    let config = Arc::try_unwrap(config).unwrap_or_else(|shared| (*shared).clone());
    Ok(RunReport {
        config,
        summary,
        verdict,
    })
}

/// Runs the same workload against two targets, one after the other.
///
/// Both configurations are validated up front so a bad candidate never costs a full baseline
/// run.
pub async fn compare<A, B>(
    baseline: (RunConfig, A),
    candidate: (RunConfig, B),
) -> Result<Comparison, ConfigError>
where
    A: Target + Send + Sync + 'static,
    B: Target + Send + Sync + 'static,
{
    baseline.0.validate()?;
    candidate.0.validate()?;

    let first = run(baseline.0, baseline.1).await?;
    let second = run(candidate.0, candidate.1).await?;

    Ok(Comparison {
        reports: vec![first, second],
    })
}

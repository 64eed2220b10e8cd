mod utils;
#[allow(unused)]
use utils::*;

use mock_service::{Counters, ServiceConfig, DATA_PATH, LOAD_TEST_PATH};
use rampart::core::{MetricSummary, METRIC_ERRORS, METRIC_REQUESTS};
use rampart::prelude::*;
use std::time::Duration;

fn short_run(name: &str, base: &str, thresholds: &[&str]) -> anyhow::Result<RunConfig> {
    let target = TargetSpec::new(name, base, LOAD_TEST_PATH)?;
    let builder = RunConfig::builder(target)
        .stages(parse_stages("500ms:4,1s:4,500ms:0")?)
        .tick_interval(Duration::from_millis(100))
        .iteration_sleep(Duration::from_millis(50))
        .request_timeout(Duration::from_secs(2));

    Ok(thresholds
        .iter()
        .fold(builder, |builder, t| builder.threshold(*t))
        .build()?)
}

fn slo() -> [&'static str; 2] {
    ["http_req_duration:p(95)<500", "http_req_success:rate>0.99"]
}

fn count(report: &RunReport, metric: &str) -> u64 {
    match report.summary.metric(metric) {
        Some(MetricSummary::Counter(counter)) => counter.count,
        _ => 0,
    }
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn healthy_service_passes() -> anyhow::Result<()> {
    let (base, state) = service(ServiceConfig::default()).await?;
    let config = short_run("mock", &base, &slo())?;
    let target = HttpTarget::new(&config.target)?;

    let report = rampart::run(config, target).await?;

    assert_eq!(report.verdict.verdict, Verdict::Passed, "{report}");
    assert_eq!(report.exit_status().code(), 0);
    assert!(count(&report, METRIC_REQUESTS) > 0);
    assert_eq!(count(&report, METRIC_REQUESTS), state.requests());
    assert_eq!(state.errors(), 0);
    assert_eq!(report.summary.peak_vus, 4);
    Ok(())
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn injected_failures_fail_the_run() -> anyhow::Result<()> {
    let (base, state) = service(ServiceConfig {
        fail_every: Some(2),
        ..Default::default()
    })
    .await?;
    let config = short_run("flaky", &base, &slo())?;
    let target = HttpTarget::new(&config.target)?;

    let report = rampart::run(config, target).await?;

    assert_eq!(report.verdict.verdict, Verdict::Failed, "{report}");
    assert_eq!(report.exit_status().code(), 2);
    let failed: Vec<_> = report.verdict.failures().map(|r| r.spec.to_string()).collect();
    assert_eq!(failed, vec!["http_req_success:rate>0.99"]);

    match report.summary.metric(METRIC_ERRORS) {
        Some(MetricSummary::Counter(errors)) => {
            assert_eq!(errors.breakdown.get("status 503"), Some(&errors.count));
            assert_eq!(errors.count, state.errors());
        }
        other => panic!("unexpected {other:?}"),
    }
    Ok(())
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn slow_responses_time_out() -> anyhow::Result<()> {
    let (base, _state) = service(ServiceConfig {
        delay: Duration::from_millis(400),
        ..Default::default()
    })
    .await?;
    let target_spec = TargetSpec::new("slow", &base, LOAD_TEST_PATH)?;
    let config = RunConfig::builder(target_spec)
        .stage(Duration::from_secs(1), 2)
        .tick_interval(Duration::from_millis(100))
        .iteration_sleep(Duration::from_millis(50))
        .request_timeout(Duration::from_millis(100))
        .threshold("http_req_failed:rate<0.1")
        .threshold("http_req_ttfb:p(95)<1000")
        .build()?;
    let target = HttpTarget::new(&config.target)?;

    let report = rampart::run(config, target).await?;

    match report.summary.metric(METRIC_ERRORS) {
        Some(MetricSummary::Counter(errors)) => {
            assert!(errors.count > 0);
            assert_eq!(errors.breakdown.get("timeout"), Some(&errors.count));
        }
        other => panic!("unexpected {other:?}"),
    }
    // No response ever arrived, so nothing can be said about time to first byte.
    assert_eq!(report.verdict.verdict, Verdict::Inconclusive, "{report}");
    assert_eq!(report.verdict.failures().count(), 1);
    assert_eq!(report.exit_status().code(), 3);
    Ok(())
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn unavailable_data_endpoint() -> anyhow::Result<()> {
    let (base, _state) = service(ServiceConfig::default()).await?;
    let target_spec = TargetSpec::new("data", &base, DATA_PATH)?.with_method(HttpMethod::Get);
    let config = RunConfig::builder(target_spec)
        .stage(Duration::from_millis(500), 1)
        .tick_interval(Duration::from_millis(100))
        .iteration_sleep(Duration::from_millis(50))
        .threshold("http_req_success:rate>0.99")
        .build()?;
    assert_eq!(config.payload, PayloadSpec::Empty);
    let target = HttpTarget::new(&config.target)?;

    let report = rampart::run(config, target).await?;

    assert_eq!(report.verdict.verdict, Verdict::Failed, "{report}");
    match report.summary.metric(METRIC_ERRORS) {
        Some(MetricSummary::Counter(errors)) => {
            assert!(errors.breakdown.contains_key("status 503"));
        }
        other => panic!("unexpected {other:?}"),
    }
    Ok(())
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn compare_fast_and_slow_services() -> anyhow::Result<()> {
    let (fast, _) = service(ServiceConfig::default()).await?;
    let (slow, _) = service(ServiceConfig {
        delay: Duration::from_millis(150),
        ..Default::default()
    })
    .await?;
    let thresholds = ["http_req_duration:p(95)<100"];
    let fast = short_run("fast", &fast, &thresholds)?;
    let slow = short_run("slow", &slow, &thresholds)?;
    let fast_target = HttpTarget::new(&fast.target)?;
    let slow_target = HttpTarget::new(&slow.target)?;

    let comparison = rampart::compare((fast, fast_target), (slow, slow_target)).await?;

    let verdicts: Vec<_> = comparison.reports.iter().map(|r| r.verdict.verdict).collect();
    assert_eq!(verdicts, vec![Verdict::Passed, Verdict::Failed]);
    assert_eq!(comparison.exit_status(), ExitStatus::Failed);
    assert!(comparison.to_string().contains("slow"));
    Ok(())
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn service_rejects_malformed_bodies() -> anyhow::Result<()> {
    let (base, state) = service(ServiceConfig::default()).await?;
    let client = reqwest::Client::new();
    let url = format!("{base}{LOAD_TEST_PATH}");

    let res = client
        .post(&url)
        .json(&serde_json::json!({"items": [], "iterations": 1, "multiplier": 1}))
        .send()
        .await?;
    assert_eq!(res.status(), 400);

    let res = client.post(&url).body("not json").send().await?;
    assert_eq!(res.status(), 400);

    let res = client
        .post(&url)
        .json(&serde_json::json!({"items": [1, 2, 3], "iterations": 2, "multiplier": 3}))
        .send()
        .await?;
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = res.json().await?;
    assert_eq!(body["ok"], true);
    assert_eq!(body["count"], 3);

    let counters: Counters = client.get(format!("{base}/metrics")).send().await?.json().await?;
    assert_eq!(counters, Counters { requests: 3, errors: 2 });
    assert_eq!(state.errors(), 2);

    let health: serde_json::Value = client.get(format!("{base}/health")).send().await?.json().await?;
    assert_eq!(health["ok"], true);
    Ok(())
}

#[cfg(feature = "integration")]
mod soak {
    use super::*;

    #[tokio::test]
    #[ntest::timeout(120_000)]
    async fn full_ramp_against_noisy_service() -> anyhow::Result<()> {
        let (base, state) = service(ServiceConfig {
            delay: Duration::from_millis(10),
            jitter: Some(Duration::from_millis(5)),
            fail_every: None,
        })
        .await?;
        let target_spec = TargetSpec::new("noisy", &base, LOAD_TEST_PATH)?;
        let config = RunConfig::builder(target_spec)
            .stages(parse_stages("30s:10,30s:0")?)
            .threshold("http_req_duration:p(95)<500")
            .threshold("http_req_success:rate>0.99")
            .build()?;
        let target = HttpTarget::new(&config.target)?;

        let report = rampart::run(config, target).await?;

        let requests = count(&report, METRIC_REQUESTS);
        assert!((250..=330).contains(&requests), "{requests} requests");
        assert_eq!(requests, state.requests());
        assert_eq!(report.verdict.verdict, Verdict::Passed, "{report}");
        Ok(())
    }
}

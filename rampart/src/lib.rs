#![cfg_attr(docsrs, feature(doc_cfg))]
//! Staged load harness.
//!
//! A run ramps a population of virtual users through an ordered list of stages, records every
//! request outcome into a shared [`MetricsCollector`], and evaluates threshold expressions
//! against one final snapshot to produce a pass, fail, or inconclusive verdict.
//!
//! ```no_run
//! use rampart::prelude::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let target = TargetSpec::new("go", "http://127.0.0.1:31143", DEFAULT_TARGET_PATH)?;
//!     let config = RunConfig::builder(target.clone())
//!         .stage(Duration::from_secs(30), 10)
//!         .stage(Duration::from_secs(30), 0)
//!         .threshold("http_req_duration:p(95)<500")
//!         .threshold("http_req_success:rate>0.99")
//!         .build()?;
//!
//!     let report = rampart::run(config, HttpTarget::new(&target)?).await?;
//!     println!("{report}");
//!     std::process::exit(report.exit_status().code().into());
//! }
//! ```

pub mod collector;
pub mod executor;
pub mod payload;
pub mod ramp;
pub mod report;
pub mod threshold;
pub mod virtual_user;

mod population;
mod run;
mod timer;

pub use collector::MetricsCollector;
pub use executor::{HttpTarget, MockResponse, MockTarget, RequestExecutor, Target};
pub use ramp::RampScheduler;
pub use report::{Comparison, ExitStatus, RunReport};
pub use run::{compare, run};
pub use threshold::evaluate;

pub use rampart_core as core;

pub mod prelude {
    pub use crate::executor::{HttpTarget, MockResponse, MockTarget, Target};
    pub use crate::report::{Comparison, ExitStatus, RunReport};
    pub use crate::run::{compare, run};

    pub use rampart_core::{
        parse_stages, ConfigError, HttpMethod, PayloadSpec, RunConfig, RunSummary, RunVerdict,
        Stage, TargetSpec, ThresholdSpec, Verdict, DEFAULT_TARGET_PATH,
    };
}

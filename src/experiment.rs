//! End-to-end experiment driver.
//!
//! An [`Experiment`] ties the pieces together: it builds the design space,
//! runs every case through the [`Orchestrator`], ranks the results and
//! hands them to the [`Reporter`].
//!
//! Configuration problems (no axes, an empty axis, an axis the bench cannot
//! apply, a container that cannot be built) are reported by the
//! constructors, before any case executes.
//!
//! # Example
//!
//! ```
//! use hestia::config::ExperimentConfigBuilder;
//! use hestia::engine::FifoModelEngine;
//! use hestia::experiment::Experiment;
//! use std::sync::Arc;
//!
//! let config = ExperimentConfigBuilder::new()
//!     .num_transactions(10)
//!     .add_axis("latency", "l", vec![0, 1])
//!     .add_axis("capacity", "c", vec![1, 2])
//!     .build()
//!     .unwrap();
//!
//! let experiment = Experiment::from_config(&config, Arc::new(FifoModelEngine)).unwrap();
//! let report = experiment.run().unwrap();
//!
//! assert_eq!(report.selection.all.len(), 4);
//! assert_eq!(report.selection.winner.unwrap().name.as_str(), "l_0.c_1");
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::bench::{CaseBuilder, ConfiguredBench, NumberTestBench};
use crate::config::ExperimentConfig;
use crate::engine::EngineFactory;
use crate::error::{ExperimentError, ReportWriteError};
use crate::orchestrator::{ExperimentOutcome, Orchestrator, RunOptions};
use crate::registry::{create_default_registry, ComponentRegistry};
use crate::report::Reporter;
use crate::selector::Selection;
use crate::stats::{ExperimentStats, StatsCollector};
use crate::sweep::{DesignSpace, ExperimentAxis};

pub const STATS_JSON_FILE: &str = "stats.json";
pub const STATS_CSV_FILE: &str = "stats.csv";

/// Everything a finished experiment produced.
#[derive(Clone, Debug)]
pub struct ExperimentReport {
    pub outcome: ExperimentOutcome,
    pub selection: Selection,
    pub stats: ExperimentStats,
}

impl ExperimentReport {
    /// Writes the rankings, per-case results and statistics into `dir`.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, ReportWriteError> {
        let dir = dir.as_ref();
        let mut written =
            Reporter::new(dir).write(&self.selection, &self.outcome.results, &self.outcome.failures)?;

        let stats_json = dir.join(STATS_JSON_FILE);
        self.stats
            .to_json_file(&stats_json)
            .map_err(|source| ReportWriteError::Io {
                path: stats_json.clone(),
                source,
            })?;
        written.push(stats_json);

        let stats_csv = dir.join(STATS_CSV_FILE);
        self.stats
            .to_csv_file(&stats_csv)
            .map_err(|source| ReportWriteError::Io {
                path: stats_csv.clone(),
                source,
            })?;
        written.push(stats_csv);

        Ok(written)
    }
}

/// A configured design-space exploration.
#[derive(Debug)]
pub struct Experiment {
    name: String,
    space: DesignSpace,
    orchestrator: Orchestrator,
    output_dir: Option<PathBuf>,
    config_file: Option<String>,
}

impl Experiment {
    /// Creates an experiment sweeping `axes` over `bench`.
    pub fn new(
        name: impl Into<String>,
        axes: Vec<ExperimentAxis>,
        bench: Arc<dyn CaseBuilder>,
        engine: Arc<dyn EngineFactory>,
    ) -> Result<Self, ExperimentError> {
        bench.check_axes(&axes)?;
        let space = DesignSpace::new(axes)?;
        Ok(Self {
            name: name.into(),
            space,
            orchestrator: Orchestrator::new(bench, engine),
            output_dir: None,
            config_file: None,
        })
    }

    /// Creates an experiment from configuration, using the built-in
    /// component registry for declarative containers.
    pub fn from_config(config: &ExperimentConfig, engine: Arc<dyn EngineFactory>) -> Result<Self, ExperimentError> {
        Self::from_config_with_registry(config, create_default_registry(), engine)
    }

    /// Creates an experiment from configuration with a custom registry.
    pub fn from_config_with_registry(
        config: &ExperimentConfig,
        registry: ComponentRegistry,
        engine: Arc<dyn EngineFactory>,
    ) -> Result<Self, ExperimentError> {
        let bench: Arc<dyn CaseBuilder> = match &config.container {
            Some(container) => Arc::new(ConfiguredBench::new(registry, container.clone(), &config.axes)?),
            None => Arc::new(
                NumberTestBench::new()
                    .with_num_transactions(config.bench.num_transactions)
                    .with_clock_domain(config.bench.clock_domain.as_str(), config.bench.clock_period),
            ),
        };

        let mut experiment = Self::new(
            config.experiment.name.as_str(),
            config.experiment_axes(),
            bench,
            engine,
        )?
        .with_options(config.experiment.run_options())
        .with_concurrency(config.experiment.concurrency);
        experiment.output_dir = config.experiment.output_dir.as_ref().map(PathBuf::from);
        Ok(experiment)
    }

    /// Loads a YAML or JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>, engine: Arc<dyn EngineFactory>) -> Result<Self, ExperimentError> {
        let path = path.as_ref();
        let config = ExperimentConfig::from_file(path)?;
        let mut experiment = Self::from_config(&config, engine)?;
        experiment.config_file = Some(path.display().to_string());
        Ok(experiment)
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.orchestrator = self.orchestrator.with_options(options);
        self
    }

    pub fn with_concurrency(mut self, workers: usize) -> Self {
        self.orchestrator = self.orchestrator.with_concurrency(workers);
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn space(&self) -> &DesignSpace {
        &self.space
    }

    /// The orchestrator, for cancelling cases while a run is in progress.
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Directory the reports go to, if configured.
    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    /// Runs every case and ranks the results.
    ///
    /// Failed cases are part of the report; only a worker pool that cannot
    /// start is an error.
    pub fn run(&self) -> Result<ExperimentReport, ExperimentError> {
        let mut collector = StatsCollector::new();
        collector.set_name(self.name.as_str());
        if let Some(path) = &self.config_file {
            collector.set_config_file(path.as_str());
        }

        tracing::info!(experiment = %self.name, cases = self.space.len(), "experiment started");
        collector.start();
        let outcome = self.orchestrator.run_all(&self.space)?;
        collector.record(&outcome);
        collector.stop();

        let selection = Selection::from_results(&outcome.results);
        match &selection.winner {
            Some(winner) => tracing::info!(
                experiment = %self.name,
                winner = %winner.name,
                clocks = winner.clocks,
                area = winner.area,
                "experiment finished"
            ),
            None => tracing::warn!(experiment = %self.name, "experiment finished without a successful case"),
        }

        Ok(ExperimentReport {
            outcome,
            selection,
            stats: collector.into_stats(),
        })
    }

    /// Runs the experiment and writes its reports to the output directory.
    ///
    /// A report that cannot be written is logged; the returned report stays
    /// valid either way.
    pub fn run_and_report(&self) -> Result<ExperimentReport, ExperimentError> {
        let report = self.run()?;
        if let Some(dir) = &self.output_dir {
            if let Err(err) = report.write_to(dir) {
                tracing::warn!(dir = %dir.display(), "failed to write reports: {}", err);
            }
        }
        Ok(report)
    }
}

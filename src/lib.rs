/// flocast_service: adaptive streaming water-level forecast evaluation.
///
/// # Module structure
///
/// ```text
/// flocast_service
/// ├── model       — shared data types (DatasetError, StreamError, ChartError, …)
/// ├── config      — run configuration loader (forecast.toml)
/// ├── logging     — leveled logger with pipeline-stage tags
/// ├── ingest
/// │   ├── dataset — headerless CSV feature-table loading and re-emission
/// │   └── fixtures (test only) — representative CSV payloads
/// ├── stream      — Schema + record-at-a-time CsvStream over the temp CSV
/// ├── learner
/// │   ├── fimt    — incremental model tree base learner
/// │   ├── forest  — adaptive random forest ensemble (Poisson bagging,
/// │   │             feature subspaces, optional worker pool)
/// │   └── drift   — ADWIN change detection over member error
/// ├── evaluation  — prequential (test-then-train) loop, RMSE/MAE/R²
/// ├── analysis
/// │   ├── reconstruction — baseline re-addition (relative → absolute)
/// │   └── exceedance     — flood-level exceedance summary
/// ├── chart       — predicted vs. actual level charts (plotters/PNG)
/// └── report      — JSON evaluation report
/// ```

/// Public modules
pub mod analysis;
pub mod chart;
pub mod config;
pub mod evaluation;
pub mod ingest;
pub mod learner;
pub mod logging;
pub mod model;
pub mod report;
pub mod stream;

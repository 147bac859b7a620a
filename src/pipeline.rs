// src/pipeline.rs
use serde::Serialize;
use std::{fmt, sync::Arc, time::Instant};
use tracing::{error, info, instrument};

use crate::emit::{Emitter, DEFAULT_MAX_ROWS_PER_PART};
use crate::error::PipelineError;
use crate::report::{read_report, Cell};
use crate::storage::ObjectStore;
use crate::validate::{
    check_period, ensure_not_blank, locate_structure, validate_columns, Period, StructureLabels,
};

/// Stages of one run, in execution order. `Failed` can follow any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Loading,
    LocatingStructure,
    ReloadingWithHeader,
    ValidatingPeriod,
    ValidatingSchema,
    Emitting,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Loading => "loading",
            Stage::LocatingStructure => "locating_structure",
            Stage::ReloadingWithHeader => "reloading_with_header",
            Stage::ValidatingPeriod => "validating_period",
            Stage::ValidatingSchema => "validating_schema",
            Stage::Emitting => "emitting",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Observer of stage transitions.
pub trait StageReporter: Send + Sync {
    fn on_stage(&self, file_key: &str, stage: Stage);

    /// Called once when the run fails; `at` is the stage that failed.
    fn on_failure(&self, file_key: &str, at: Stage, err: &PipelineError);
}

/// Reports transitions as log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl StageReporter for TracingReporter {
    fn on_stage(&self, file_key: &str, stage: Stage) {
        info!(file_key, %stage, "stage");
    }

    fn on_failure(&self, file_key: &str, at: Stage, err: &PipelineError) {
        error!(file_key, stage = %at, kind = err.kind(), error = %err, "run failed");
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub source_key: String,
    pub source_uri: String,
    pub destination: String,
    pub period: Period,
    pub rows: usize,
    pub columns: usize,
    pub parts: Vec<String>,
    pub bytes: u64,
    pub elapsed_ms: u128,
}

/// Runs the stages for one report key against one store.
pub struct Pipeline {
    store: Arc<dyn ObjectStore>,
    labels: StructureLabels,
    max_rows_per_part: usize,
    reporter: Arc<dyn StageReporter>,
}

impl Pipeline {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            labels: StructureLabels::default(),
            max_rows_per_part: DEFAULT_MAX_ROWS_PER_PART,
            reporter: Arc::new(TracingReporter),
        }
    }

    pub fn with_labels(mut self, labels: StructureLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_max_rows_per_part(mut self, max_rows: usize) -> Self {
        self.max_rows_per_part = max_rows;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn StageReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Validate the report at `file_key` and write it under `validated/`.
    /// Nothing is written unless every validation stage passes.
    #[instrument(level = "info", skip(self))]
    pub async fn run(&self, file_key: &str) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        let mut stage = Stage::Loading;

        match self.run_stages(file_key, &mut stage, started).await {
            Ok(report) => {
                self.reporter.on_stage(file_key, Stage::Done);
                Ok(report)
            }
            Err(err) => {
                self.reporter.on_failure(file_key, stage, &err);
                self.reporter.on_stage(file_key, Stage::Failed);
                Err(err)
            }
        }
    }

    async fn run_stages(
        &self,
        file_key: &str,
        stage: &mut Stage,
        started: Instant,
    ) -> Result<RunReport, PipelineError> {
        // 1) Load the sheet without a header
        self.enter(file_key, stage, Stage::Loading);
        let bytes = self
            .store
            .get(file_key)
            .await
            .map_err(PipelineError::Storage)?;
        let raw = read_report(file_key, bytes).map_err(PipelineError::Decode)?;
        if raw.is_blank() {
            return Err(PipelineError::EmptyInput(format!(
                "{} has no non-empty cells",
                file_key
            )));
        }

        // 2) Find the metadata and header rows in the first column
        self.enter(file_key, stage, Stage::LocatingStructure);
        let location = locate_structure(raw.first_column(), &self.labels);
        let (Some(metadata_index), Some(header_index)) =
            (location.metadata_index, location.header_index)
        else {
            return Err(PipelineError::StructuralDiscovery {
                metadata_found: location.metadata_index.is_some(),
                header_found: location.header_index.is_some(),
            });
        };

        // 3) Apply the discovered header
        self.enter(file_key, stage, Stage::ReloadingWithHeader);
        let table = raw.with_header(header_index).ok_or_else(|| {
            PipelineError::EmptyInput(format!("header row {} is out of range", header_index))
        })?;
        ensure_not_blank(&table)?;

        // 4) Period in the metadata block vs. the key folders
        self.enter(file_key, stage, Stage::ValidatingPeriod);
        let metadata = raw.cell(metadata_index, 0).and_then(Cell::as_text);
        let period = check_period(metadata.as_deref(), file_key)?;

        // 5) Required columns
        self.enter(file_key, stage, Stage::ValidatingSchema);
        validate_columns(&table)?;

        // 6) Write the dataset
        self.enter(file_key, stage, Stage::Emitting);
        let emitted = Emitter::new(&*self.store, self.max_rows_per_part)
            .emit(&table, file_key)
            .await?;

        Ok(RunReport {
            source_key: file_key.to_string(),
            source_uri: self.store.uri(file_key),
            destination: emitted.uri,
            period,
            rows: emitted.rows,
            columns: table.num_columns(),
            parts: emitted.parts,
            bytes: emitted.bytes,
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    fn enter(&self, file_key: &str, current: &mut Stage, next: Stage) {
        *current = next;
        self.reporter.on_stage(file_key, next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use crate::validate::{PeriodFailure, REQUIRED_COLUMNS};
    use std::sync::{Mutex, Once};
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    static INIT: Once = Once::new();

    fn init_test_logging() {
        INIT.call_once(|| {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(EnvFilter::new("debug"))
                .with_test_writer()
                .finish();
            let _ = tracing::subscriber::set_global_default(subscriber);
        });
    }

    #[derive(Default)]
    struct RecordingReporter {
        stages: Mutex<Vec<Stage>>,
        failure: Mutex<Option<(Stage, &'static str)>>,
    }

    impl RecordingReporter {
        fn stages(&self) -> Vec<Stage> {
            self.stages.lock().unwrap().clone()
        }
    }

    impl StageReporter for RecordingReporter {
        fn on_stage(&self, _file_key: &str, stage: Stage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_failure(&self, _file_key: &str, at: Stage, err: &PipelineError) {
            *self.failure.lock().unwrap() = Some((at, err.kind()));
        }
    }

    const KEY: &str = "raw/year=2024/month=03/report.csv";
    const MARCH: &str = "Periodo: del viernes 01 mar 2024 al domingo 31 mar 2024";

    fn csv_field(s: &str) -> String {
        format!("\"{}\"", s.replace('"', "\"\""))
    }

    fn report_csv(period_line: &str, columns: &[&str], rows: usize) -> Vec<u8> {
        let mut out = String::new();
        out.push_str("Reporte generado automáticamente\n");
        out.push_str(&csv_field(&format!(
            "Mercado Pago - Reporte de ventas\n{}",
            period_line
        )));
        out.push('\n');
        out.push('\n');
        out.push_str(&columns.iter().map(|c| csv_field(c)).collect::<Vec<_>>().join(","));
        out.push('\n');
        for i in 0..rows {
            let row: Vec<String> = columns
                .iter()
                .enumerate()
                .map(|(j, _)| if j == 0 { format!("{}", 1000 + i) } else { format!("v{}", j) })
                .collect();
            out.push_str(&row.join(","));
            out.push('\n');
        }
        out.into_bytes()
    }

    async fn pipeline_with(
        bytes: Vec<u8>,
    ) -> (Arc<InMemoryStore>, Arc<RecordingReporter>, Pipeline) {
        init_test_logging();
        let store = Arc::new(InMemoryStore::new("reports"));
        store.put(KEY, bytes).await.expect("stage input");
        let reporter = Arc::new(RecordingReporter::default());
        let pipeline = Pipeline::new(store.clone()).with_reporter(reporter.clone());
        (store, reporter, pipeline)
    }

    #[tokio::test]
    async fn valid_report_runs_every_stage_in_order() {
        let (store, reporter, pipeline) =
            pipeline_with(report_csv(MARCH, &REQUIRED_COLUMNS, 3)).await;

        let report = pipeline.run(KEY).await.expect("run succeeds");
        assert_eq!(report.rows, 3);
        assert_eq!(report.columns, REQUIRED_COLUMNS.len());
        assert_eq!(report.period, Period { year: 2024, month: 3 });
        assert_eq!(
            report.destination,
            "mem://reports/validated/year=2024/month=03/report.parquet"
        );
        assert_eq!(
            reporter.stages(),
            vec![
                Stage::Loading,
                Stage::LocatingStructure,
                Stage::ReloadingWithHeader,
                Stage::ValidatingPeriod,
                Stage::ValidatingSchema,
                Stage::Emitting,
                Stage::Done,
            ]
        );
        let written = store.list("validated/").await.expect("list");
        assert_eq!(written, report.parts);
    }

    #[tokio::test]
    async fn missing_header_fails_without_reloading() {
        let (store, reporter, pipeline) =
            pipeline_with(report_csv(MARCH, &["Operación", "Estado"], 2)).await;

        let err = pipeline.run(KEY).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StructuralDiscovery {
                metadata_found: true,
                header_found: false
            }
        ));
        assert_eq!(
            reporter.stages(),
            vec![Stage::Loading, Stage::LocatingStructure, Stage::Failed]
        );
        assert_eq!(
            *reporter.failure.lock().unwrap(),
            Some((Stage::LocatingStructure, "structural_discovery"))
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn period_mismatch_writes_nothing() {
        let april = "Periodo: del lunes 01 abr 2024 al martes 30 abr 2024";
        let (store, reporter, pipeline) =
            pipeline_with(report_csv(april, &REQUIRED_COLUMNS, 2)).await;

        let err = pipeline.run(KEY).await.unwrap_err();
        match err {
            PipelineError::PeriodMismatch(PeriodFailure::Mismatch { file, .. }) => {
                assert_eq!(file, Period { year: 2024, month: 3 });
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(reporter.stages().last(), Some(&Stage::Failed));
        assert!(store.list("validated/").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn missing_columns_fail_schema_stage() {
        let columns: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| *c != "Caja")
            .collect();
        let (store, reporter, pipeline) = pipeline_with(report_csv(MARCH, &columns, 2)).await;

        let err = pipeline.run(KEY).await.unwrap_err();
        match err {
            PipelineError::SchemaMismatch { missing } => assert_eq!(missing, vec!["Caja"]),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            *reporter.failure.lock().unwrap(),
            Some((Stage::ValidatingSchema, "schema_mismatch"))
        );
        assert!(store.list("validated/").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn header_without_rows_is_empty_input() {
        let (_store, reporter, pipeline) =
            pipeline_with(report_csv(MARCH, &REQUIRED_COLUMNS, 0)).await;

        let err = pipeline.run(KEY).await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput(_)));
        assert_eq!(
            *reporter.failure.lock().unwrap(),
            Some((Stage::ReloadingWithHeader, "empty_input"))
        );
    }

    #[tokio::test]
    async fn missing_object_is_a_storage_error() {
        init_test_logging();
        let store = Arc::new(InMemoryStore::new("reports"));
        let err = Pipeline::new(store).run(KEY).await.unwrap_err();
        assert_eq!(err.kind(), "storage");
    }
}

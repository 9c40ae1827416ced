//! What a module's `run` step can reach.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::argument::ArgumentValues;
use crate::capability::{ModelHandle, ResultsHandle, ResultsStore};
use crate::error::ModuleError;
use crate::output::OutputValue;
use crate::report::is_report_file;
use crate::result::PastStepValues;
use crate::run_log::RunLog;

/// Borrowed collaborators for a single `run` call.
///
/// Nothing here outlives the invocation: the model and results store are
/// borrowed from the orchestrator for `'a`.
pub struct RunContext<'a> {
    values: &'a ArgumentValues,
    past_steps: &'a PastStepValues,
    model: &'a mut dyn ModelHandle,
    results: &'a dyn ResultsStore,
    work_dir: PathBuf,
    log: RunLog,
    reports: Vec<PathBuf>,
}

impl<'a> RunContext<'a> {
    pub(crate) fn new(
        module: &str,
        values: &'a ArgumentValues,
        past_steps: &'a PastStepValues,
        model: &'a mut dyn ModelHandle,
        results: &'a dyn ResultsStore,
        work_dir: &Path,
    ) -> Self {
        Self {
            values,
            past_steps,
            model,
            results,
            work_dir: work_dir.to_path_buf(),
            log: RunLog::new(module),
            reports: Vec::new(),
        }
    }

    pub fn values(&self) -> &'a ArgumentValues {
        self.values
    }

    /// Values registered by an earlier step of the same workflow, looked up
    /// by step name or module name.
    pub fn past_step_values(&self, name: &str) -> Option<&'a BTreeMap<String, OutputValue>> {
        self.past_steps.for_step(name)
    }

    pub fn model(&self) -> &dyn ModelHandle {
        &*self.model
    }

    pub fn model_mut(&mut self) -> &mut dyn ModelHandle {
        &mut *self.model
    }

    /// Acquire the results store. The returned handle releases it when
    /// dropped, so every exit path (including `?`) gives it back.
    pub fn open_results(&self) -> Result<ResultsHandle<'a>, ModuleError> {
        Ok(ResultsHandle::acquire(self.results)?)
    }

    pub fn log(&mut self) -> &mut RunLog {
        &mut self.log
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Write a report artifact into the working directory.
    ///
    /// `file_name` must follow the `report*.<ext>` convention so the
    /// orchestrator can collect it.
    pub async fn write_report(
        &mut self,
        file_name: &str,
        contents: impl AsRef<[u8]>,
    ) -> Result<PathBuf, ModuleError> {
        if !is_report_file(file_name) {
            return Err(ModuleError::execution(format!(
                "report artifact '{file_name}' must be a plain file name starting with 'report' and carrying an extension"
            )));
        }
        tokio::fs::create_dir_all(&self.work_dir).await?;
        let path = self.work_dir.join(file_name);
        tokio::fs::write(&path, contents.as_ref()).await?;
        tracing::debug!(path = %path.display(), "report artifact written");
        if !self.reports.contains(&path) {
            self.reports.push(path.clone());
        }
        Ok(path)
    }

    pub(crate) fn into_parts(self) -> (RunLog, Vec<PathBuf>) {
        (self.log, self.reports)
    }
}

//! Export job runner.
//!
//! Resolves the batch for a timestamp window, encodes it in the chosen
//! format, and materializes the file atomically: the encoder builds the
//! whole file in memory, the runner writes it to `<name>.tmp` and
//! renames. A failed run leaves nothing partial in the output directory.
//!
//! File headers are stamped with the window end rather than the wall
//! clock, so re-running the same window reproduces the same file
//! (Quick-Checks numbers excepted; those must never repeat).

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use payrail_core::crypto::FieldCodec;
use payrail_core::export::nacha::NachaEncoder;
use payrail_core::export::wire::WireEncoder;
use payrail_core::export::{
    resolve_batch, ExportError, QuickChecksEncoder, SequenceCounter,
};
use payrail_core::index::{IndexStore, TenantStore};
use payrail_core::rates::RateProvider;
use payrail_shared::config::ExportConfig;
use payrail_shared::AppError;

/// The three export file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// NACHA ACH direct deposit file.
    Nacha,
    /// Wire-transfer CSV.
    Wire,
    /// Quick-Checks paper check file.
    QuickChecks,
}

impl ExportFormat {
    const fn file_parts(self) -> (&'static str, &'static str) {
        match self {
            Self::Nacha => ("nacha", "ach"),
            Self::Wire => ("wires", "csv"),
            Self::QuickChecks => ("checks", "txt"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nacha" => Ok(Self::Nacha),
            "wire" => Ok(Self::Wire),
            "checks" => Ok(Self::QuickChecks),
            other => Err(format!("unknown export format {other:?}")),
        }
    }
}

/// Export runner errors.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Batch resolution or encoding failed.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// The output file could not be written.
    #[error("Cannot write export file: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RunnerError> for AppError {
    fn from(error: RunnerError) -> Self {
        match &error {
            RunnerError::Export(ExportError::LockTimeout(_)) => {
                Self::LockTimeout(error.to_string())
            }
            RunnerError::Export(ExportError::Store(_)) => Self::Database(error.to_string()),
            RunnerError::Export(ExportError::Encoding { .. }) => {
                Self::BusinessRule(error.to_string())
            }
            RunnerError::Io(_) => Self::Internal(error.to_string()),
        }
    }
}

/// Resolves, encodes, and writes one export file per run.
pub struct ExportRunner {
    tenants: Arc<dyn TenantStore>,
    index: Arc<dyn IndexStore>,
    codec: Arc<FieldCodec>,
    counter: Arc<dyn SequenceCounter>,
    rates: Option<Arc<dyn RateProvider>>,
    config: ExportConfig,
}

impl ExportRunner {
    /// Creates a runner over the given collaborators.
    #[must_use]
    pub fn new(
        tenants: Arc<dyn TenantStore>,
        index: Arc<dyn IndexStore>,
        codec: Arc<FieldCodec>,
        counter: Arc<dyn SequenceCounter>,
        rates: Option<Arc<dyn RateProvider>>,
        config: ExportConfig,
    ) -> Self {
        Self {
            tenants,
            index,
            codec,
            counter,
            rates,
            config,
        }
    }

    /// Runs one export, returning the path of the materialized file.
    pub async fn run(
        &self,
        format: ExportFormat,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PathBuf, RunnerError> {
        let batch = resolve_batch(
            self.tenants.as_ref(),
            self.index.as_ref(),
            &self.codec,
            self.rates.as_deref(),
            start,
            end,
        )
        .await?;

        let contents = match format {
            ExportFormat::Nacha => NachaEncoder::new(&self.config).encode(&batch, end)?,
            ExportFormat::Wire => WireEncoder::new().encode(&batch, end)?,
            ExportFormat::QuickChecks => {
                QuickChecksEncoder::new(&self.config.company_name)
                    .encode(&batch, self.counter.as_ref(), end)
                    .await?
            }
        };

        let path = self.write_atomic(format, start, end, &contents).await?;
        info!(
            format = ?format,
            records = batch.len(),
            path = %path.display(),
            "export materialized"
        );
        Ok(path)
    }

    async fn write_atomic(
        &self,
        format: ExportFormat,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        contents: &str,
    ) -> Result<PathBuf, RunnerError> {
        let (prefix, extension) = format.file_parts();
        let dir = PathBuf::from(&self.config.output_dir);
        tokio::fs::create_dir_all(&dir).await?;

        let name = format!(
            "{prefix}-{}-{}.{extension}",
            start.format("%Y%m%d%H%M"),
            end.format("%Y%m%d%H%M")
        );
        let path = dir.join(&name);
        let tmp = dir.join(format!("{name}.tmp"));

        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(path)
    }
}


use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use tracing::{debug, info};
use uuid::Uuid;

use crate::IngestError;

/// Extensions the converter accepts. Everything else is either already PDF
/// or unsupported.
const CONVERTIBLE_EXTENSIONS: [&str; 6] = ["doc", "docx", "xls", "xlsx", "ppt", "pptx"];

#[inline]
pub fn is_convertible_extension(ext: &str) -> bool {
    let lowered = ext.to_ascii_lowercase();
    CONVERTIBLE_EXTENSIONS.contains(&lowered.as_str())
}

/// Office-document-to-PDF conversion collaborator, driving a LibreOffice
/// binary as a subprocess. Only the boundary matters to the pipeline: bytes
/// of an office document in, PDF bytes out.
#[derive(Debug, Clone)]
pub struct OfficeConverter {
    soffice_path: PathBuf,
    work_dir: PathBuf,
}

impl Default for OfficeConverter {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl OfficeConverter {
    #[inline]
    pub fn new() -> Self {
        Self {
            soffice_path: PathBuf::from("soffice"),
            work_dir: std::env::temp_dir().join("pdf-ingest-convert"),
        }
    }

    #[inline]
    pub fn with_soffice_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.soffice_path = path.into();
        self
    }

    /// Convert one office document to PDF bytes. The input is staged in an
    /// isolated scratch directory which is removed again afterwards, success
    /// or not.
    #[inline]
    pub fn convert_to_pdf(&self, file_name: &str, content: &[u8]) -> Result<Vec<u8>> {
        let scratch_dir = self.work_dir.join(Uuid::new_v4().to_string());
        fs::create_dir_all(&scratch_dir).with_context(|| {
            format!("Failed to create scratch directory {}", scratch_dir.display())
        })?;

        let result = self.run_conversion(&scratch_dir, file_name, content);
        if let Err(e) = fs::remove_dir_all(&scratch_dir) {
            debug!("Failed to clean up scratch directory: {}", e);
        }
        result
    }

    fn run_conversion(
        &self,
        scratch_dir: &Path,
        file_name: &str,
        content: &[u8],
    ) -> Result<Vec<u8>> {
        let input_path = scratch_dir.join(file_name);
        fs::write(&input_path, content)
            .with_context(|| format!("Failed to stage input file {}", input_path.display()))?;

        info!("Converting {} to PDF", file_name);

        let output = Command::new(&self.soffice_path)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(scratch_dir)
            .arg(&input_path)
            .output()
            .with_context(|| {
                format!("Failed to run converter {}", self.soffice_path.display())
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IngestError::Conversion(format!(
                "Converter exited with {}: {}",
                output.status,
                stderr.trim()
            ))
            .into());
        }

        let output_path = input_path.with_extension("pdf");
        let pdf_bytes = fs::read(&output_path).with_context(|| {
            format!(
                "Converter produced no output at {}",
                output_path.display()
            )
        })?;

        info!(
            "Converted {} to PDF ({} bytes)",
            file_name,
            pdf_bytes.len()
        );
        Ok(pdf_bytes)
    }
}

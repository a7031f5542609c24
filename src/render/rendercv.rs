use std::path::{Path, PathBuf};

use log::{debug, info};
use tokio::process::Command;

use crate::error::{Error, Result};

/// Adapter around the external `rendercv` CLI. The toolchain is a black
/// box: any failure surfaces as `Error::Render` with the diagnostic text.
#[derive(Debug, Clone)]
pub struct RenderCv {
    bin: String,
}

impl RenderCv {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// Check the toolchain is installed and answer its version string.
    pub async fn version(&self) -> Result<String> {
        let output = Command::new(&self.bin)
            .arg("--version")
            .output()
            .await
            .map_err(|e| Error::Render(format!("{} not found in PATH: {e}", self.bin)))?;

        if !output.status.success() {
            return Err(Error::Render(format!(
                "{} --version exited with {}",
                self.bin, output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Render a resume YAML into `out_dir` and return the produced PDF path.
    pub async fn render(&self, yaml: &Path, out_dir: &Path, pdf_only: bool) -> Result<PathBuf> {
        if !yaml.exists() {
            return Err(Error::NotFound(yaml.to_path_buf()));
        }

        info!("rendering {} with {}", yaml.display(), self.bin);

        let mut command = Command::new(&self.bin);
        command
            .arg("render")
            .arg(yaml)
            .arg("--output-folder-name")
            .arg(out_dir);
        if pdf_only {
            command.args([
                "--dont-generate-html",
                "--dont-generate-markdown",
                "--dont-generate-png",
            ]);
        }

        let output = command
            .output()
            .await
            .map_err(|e| Error::Render(format!("failed to run {}: {e}", self.bin)))?;

        debug!("renderer stdout: {}", String::from_utf8_lossy(&output.stdout));

        if !output.status.success() {
            return Err(Error::Render(format!(
                "{} exited with {}: {}",
                self.bin,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        find_pdf(out_dir)
    }
}

/// The renderer names the PDF after the CV's `name` field; locate it instead
/// of guessing.
fn find_pdf(out_dir: &Path) -> Result<PathBuf> {
    let pdf = std::fs::read_dir(out_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .find(|path| path.extension().and_then(|e| e.to_str()) == Some("pdf"));

    pdf.ok_or_else(|| {
        Error::Render(format!(
            "renderer reported success but produced no PDF in {}",
            out_dir.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_a_render_error() {
        let renderer = RenderCv::new("rendercv-binary-that-does-not-exist");
        assert!(matches!(renderer.version().await, Err(Error::Render(_))));

        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("resume.yaml");
        std::fs::write(&yaml, "cv:\n  name: Test\n").unwrap();

        let err = renderer.render(&yaml, dir.path(), true).await.unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[tokio::test]
    async fn missing_yaml_is_not_found() {
        let renderer = RenderCv::new("rendercv");
        let dir = tempfile::tempdir().unwrap();

        let err = renderer
            .render(&dir.path().join("missing.yaml"), dir.path(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn finds_rendered_pdf() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_pdf(dir.path()).is_err());

        std::fs::write(dir.path().join("Ada_Lovelace_CV.pdf"), b"%PDF-").unwrap();
        let pdf = find_pdf(dir.path()).unwrap();
        assert!(pdf.ends_with("Ada_Lovelace_CV.pdf"));
    }
}

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// One vacancy posting. `company` and `role` are filled in later by an LLM
/// pass and only inform log output.
#[derive(Debug, Clone)]
pub struct JobDescription {
    pub text: String,
    pub company: Option<String>,
    pub role: Option<String>,
}

impl JobDescription {
    /// Load a plain-text job description. The file must exist and contain
    /// more than whitespace.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }

        let text = fs::read_to_string(path)?;
        if text.trim().is_empty() {
            return Err(Error::Config(format!(
                "job description {} is empty",
                path.display()
            )));
        }

        Ok(Self {
            text,
            company: None,
            role: None,
        })
    }
}

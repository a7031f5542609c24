use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{error, info, warn};
use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::llm::{AnyProvider, prompts};
use crate::render::rendercv::RenderCv;
use crate::resume::job::JobDescription;
use crate::resume::template::{
    TailoredSections, TemplateManager, merge_sections, save_yaml, section,
};

/// Files written for one job: the merged YAML always, the PDF only when
/// rendering was requested and the toolchain succeeded.
#[derive(Debug, Clone)]
pub struct TailorOutcome {
    pub yaml: PathBuf,
    pub pdf: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<TailorOutcome>,
    pub failed: Vec<(PathBuf, Error)>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Sequences one tailoring run: load -> prompt+invoke -> merge -> render.
/// Owns every document for the duration of a single invocation.
pub struct ResumeService {
    llm: AnyProvider,
    templates: TemplateManager,
    theme: String,
}

impl ResumeService {
    pub fn new(llm: AnyProvider, templates: TemplateManager, theme: String) -> Self {
        Self {
            llm,
            templates,
            theme,
        }
    }

    /// Pull company and role out of the posting, for log output. Tolerant of
    /// unparseable answers; provider failures still abort the job.
    pub async fn job_details(&self, jd_text: &str) -> Result<(Option<String>, Option<String>)> {
        #[derive(Deserialize)]
        struct Details {
            company: Option<String>,
            role: Option<String>,
        }

        let response = self.llm.complete(None, &prompts::job_details(jd_text)).await?;
        match parse_block::<Details>(&response, "job details") {
            Ok(details) => Ok((details.company, details.role)),
            Err(e) => {
                warn!("{e}; continuing without job details");
                Ok((None, None))
            }
        }
    }

    /// Tailor the base resume against one job description and write the
    /// merged document (plus, optionally, the rendered PDF) to `out_dir`.
    pub async fn generate(
        &self,
        jd: &JobDescription,
        out_dir: &Path,
        render: bool,
        renderer: &RenderCv,
    ) -> Result<TailorOutcome> {
        let static_doc = self.templates.load_static()?;
        let base_doc = self.templates.load_base()?;

        let tailored = TailoredSections {
            summary: self.tailor_summary(&jd.text, section(&base_doc, "summary")).await?,
            skills: self.tailor_skills(&jd.text, section(&base_doc, "skills")).await?,
            experience: self
                .tailor_experience(&jd.text, section(&base_doc, "experience"))
                .await?,
        };
        let keywords = self.extract_keywords(&jd.text).await?;

        let merged = merge_sections(&static_doc, &base_doc, &tailored, &keywords, &self.theme)?;

        let yaml = out_dir.join("tailored_resume.yaml");
        save_yaml(&merged, &yaml)?;

        let pdf = if render {
            self.render_non_fatal(renderer, &yaml, out_dir).await
        } else {
            None
        };

        Ok(TailorOutcome { yaml, pdf })
    }

    /// Merge and render the base resume as-is, bypassing the LLM. Used to
    /// iterate on layout and design without inference cost.
    pub async fn original(
        &self,
        out_dir: &Path,
        render: bool,
        renderer: &RenderCv,
    ) -> Result<TailorOutcome> {
        let static_doc = self.templates.load_static()?;
        let base_doc = self.templates.load_base()?;

        let merged = merge_sections(
            &static_doc,
            &base_doc,
            &TailoredSections::default(),
            &[],
            &self.theme,
        )?;

        let yaml = out_dir.join("original_resume.yaml");
        save_yaml(&merged, &yaml)?;

        let pdf = if render {
            self.render_non_fatal(renderer, &yaml, out_dir).await
        } else {
            None
        };

        Ok(TailorOutcome { yaml, pdf })
    }

    /// Run `generate` over every `*.txt` file in a directory, isolating
    /// per-job failures. Outputs land in `<out_base>/<file stem>/`.
    pub async fn batch(
        &self,
        jobs_dir: &Path,
        out_base: &Path,
        render: bool,
        renderer: &RenderCv,
    ) -> Result<BatchSummary> {
        let mut jobs: Vec<PathBuf> = std::fs::read_dir(jobs_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("txt"))
            .collect();
        jobs.sort();

        if jobs.is_empty() {
            return Err(Error::Config(format!(
                "no .txt job descriptions found in {}",
                jobs_dir.display()
            )));
        }

        info!("found {} job descriptions", jobs.len());

        let mut summary = BatchSummary::default();
        for (i, path) in jobs.iter().enumerate() {
            info!("job {}/{}: {}", i + 1, jobs.len(), path.display());

            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("job")
                .to_string();

            match self.generate_one(path, &out_base.join(stem), render, renderer).await {
                Ok(outcome) => summary.succeeded.push(outcome),
                Err(e) => {
                    error!("job {} failed: {e}", path.display());
                    summary.failed.push((path.clone(), e));
                }
            }
        }

        Ok(summary)
    }

    async fn generate_one(
        &self,
        jd_path: &Path,
        out_dir: &Path,
        render: bool,
        renderer: &RenderCv,
    ) -> Result<TailorOutcome> {
        let jd = JobDescription::from_file(jd_path)?;
        self.generate(&jd, out_dir, render, renderer).await
    }

    /// A renderer failure keeps the YAML on disk and skips the PDF; it never
    /// fails the job.
    async fn render_non_fatal(
        &self,
        renderer: &RenderCv,
        yaml: &Path,
        out_dir: &Path,
    ) -> Option<PathBuf> {
        match renderer.render(yaml, out_dir, true).await {
            Ok(pdf) => {
                info!("rendered {}", pdf.display());
                Some(pdf)
            }
            Err(e) => {
                error!("rendering failed, keeping YAML output: {e}");
                None
            }
        }
    }

    async fn extract_keywords(&self, jd_text: &str) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct Keywords {
            #[serde(default)]
            keywords: Vec<String>,
        }

        info!("extracting emphasis keywords from job description");
        let response = self.llm.complete(None, &prompts::keywords(jd_text)).await?;

        match parse_block::<Keywords>(&response, "keywords") {
            Ok(block) => {
                info!("extracted {} keywords", block.keywords.len());
                Ok(block.keywords)
            }
            Err(e) => {
                warn!("{e}; continuing without emphasis keywords");
                Ok(Vec::new())
            }
        }
    }

    async fn tailor_summary(
        &self,
        jd_text: &str,
        current: Option<&Value>,
    ) -> Result<Option<Value>> {
        #[derive(Deserialize)]
        struct Summary {
            summary: Vec<String>,
        }

        let Some(current) = current else {
            return Ok(None);
        };
        let current_text = current
            .get(0)
            .and_then(Value::as_str)
            .unwrap_or_default();
        if current_text.is_empty() {
            return Ok(None);
        }

        info!("tailoring summary");
        let response = self
            .llm
            .complete(Some(prompts::system()), &prompts::summary(jd_text, current_text))
            .await?;
        let block: Summary = parse_block(&response, "tailored summary")?;

        Ok(Some(Value::Sequence(
            block.summary.into_iter().map(Value::String).collect(),
        )))
    }

    async fn tailor_experience(
        &self,
        jd_text: &str,
        current: Option<&Value>,
    ) -> Result<Option<Value>> {
        #[derive(Deserialize)]
        struct Highlights {
            highlights: Vec<String>,
        }

        let Some(current) = current else {
            return Ok(None);
        };
        let Value::Sequence(entries) = current else {
            return Err(Error::Merge("experience section must be a sequence".into()));
        };

        info!("tailoring {} experience entries", entries.len());

        let mut tailored = Vec::with_capacity(entries.len());
        for entry in entries {
            let highlights = entry.get("highlights");
            let has_highlights = highlights
                .and_then(Value::as_sequence)
                .is_some_and(|seq| !seq.is_empty());

            // Entries without highlight bullets have nothing to rewrite.
            if !has_highlights {
                tailored.push(entry.clone());
                continue;
            }

            let mut block = Mapping::new();
            block.insert(Value::from("highlights"), highlights.cloned().unwrap_or_default());
            let highlights_yaml = serde_yaml::to_string(&block)?;

            let company = entry.get("company").and_then(Value::as_str).unwrap_or("");
            let position = entry.get("position").and_then(Value::as_str).unwrap_or("");

            let response = self
                .llm
                .complete(
                    Some(prompts::system()),
                    &prompts::highlights(jd_text, company, position, &highlights_yaml),
                )
                .await?;
            let block: Highlights = parse_block(&response, "tailored highlights")?;

            let mut entry = entry.clone();
            if let Some(mapping) = entry.as_mapping_mut() {
                mapping.insert(
                    Value::from("highlights"),
                    Value::Sequence(block.highlights.into_iter().map(Value::String).collect()),
                );
            }
            tailored.push(entry);
        }

        Ok(Some(Value::Sequence(tailored)))
    }

    async fn tailor_skills(&self, jd_text: &str, current: Option<&Value>) -> Result<Option<Value>> {
        #[derive(Deserialize, serde::Serialize)]
        struct Category {
            label: String,
            details: String,
        }
        #[derive(Deserialize)]
        struct Skills {
            skills: Vec<Category>,
        }

        let Some(current) = current else {
            return Ok(None);
        };

        let mut block = Mapping::new();
        block.insert(Value::from("skills"), current.clone());
        let skills_yaml = serde_yaml::to_string(&block)?;

        info!("tailoring skills");
        let response = self
            .llm
            .complete(Some(prompts::system()), &prompts::skills(jd_text, &skills_yaml))
            .await?;
        let block: Skills = parse_block(&response, "tailored skills")?;

        Ok(Some(serde_yaml::to_value(block.skills)?))
    }
}

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:ya?ml)?\s*(.*?)```").unwrap());

/// Strip one markdown code fence if the model wrapped its output in one.
fn strip_code_fences(response: &str) -> &str {
    match CODE_FENCE.captures(response) {
        Some(caps) => caps.get(1).map_or(response, |m| m.as_str()).trim(),
        None => response.trim(),
    }
}

fn parse_block<T: DeserializeOwned>(response: &str, what: &str) -> Result<T> {
    serde_yaml::from_str(strip_code_fences(response))
        .map_err(|e| Error::Parse(format!("{what}: {e}")))
}

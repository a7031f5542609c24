mod error;
mod llm;
mod render;
mod resume;
mod utils;

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::Colorize;
use eyre::Result;
use log::info;

use crate::llm::{AnyProvider, LlmProvider};
use crate::render::rendercv::RenderCv;
use crate::resume::job::JobDescription;
use crate::resume::service::{BatchSummary, ResumeService, TailorOutcome};
use crate::resume::template::TemplateManager;
use crate::utils::cli::{Args, Command};
use crate::utils::config::Config;
use crate::utils::log::Logger;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    Logger::init(args.verbosity);

    info!(
        "starting cv-tailor {}",
        format!("v{}", env!("CARGO_PKG_VERSION")).magenta()
    );

    let config = Config::from_env()?;

    match args.command {
        Command::Init { name } => init(&config, &name),
        Command::Generate {
            job_description,
            output,
            model,
            theme,
            no_render,
        } => generate(&config, &job_description, output, model, theme, no_render).await,
        Command::Batch {
            jobs_dir,
            output,
            model,
            no_render,
        } => batch(&config, &jobs_dir, output, model, no_render).await,
        Command::Original { output, theme } => original(&config, output, theme).await,
        Command::Info => show_info(&config).await,
    }
}

fn build_service(
    config: &Config,
    model: Option<&str>,
    theme: Option<&str>,
) -> Result<ResumeService> {
    let llm = AnyProvider::from_config(config, model)?;
    info!("initialized {} LLM provider", llm.name());

    let templates =
        TemplateManager::new(config.static_sections.clone(), config.base_resume.clone());

    Ok(ResumeService::new(
        llm,
        templates,
        theme.unwrap_or(&config.theme).to_string(),
    ))
}

async fn generate(
    config: &Config,
    jd_path: &Path,
    output: Option<PathBuf>,
    model: Option<String>,
    theme: Option<String>,
    no_render: bool,
) -> Result<()> {
    let mut jd = JobDescription::from_file(jd_path)?;
    let service = build_service(config, model.as_deref(), theme.as_deref())?;

    let (company, role) = service.job_details(&jd.text).await?;
    jd.company = company;
    jd.role = role;
    info!(
        "tailoring resume for {} at {}",
        jd.role.as_deref().unwrap_or("unknown role").cyan(),
        jd.company.as_deref().unwrap_or("unknown company").cyan()
    );

    let out_dir = output.unwrap_or_else(|| config.output_dir.join(file_stem(jd_path)));
    let renderer = RenderCv::new(&config.rendercv_bin);
    let outcome = service.generate(&jd, &out_dir, !no_render, &renderer).await?;

    print_outcome(&outcome);
    Ok(())
}

async fn batch(
    config: &Config,
    jobs_dir: &Path,
    output: Option<PathBuf>,
    model: Option<String>,
    no_render: bool,
) -> Result<()> {
    let service = build_service(config, model.as_deref(), None)?;
    let out_base = output.unwrap_or_else(|| config.output_dir.clone());
    let renderer = RenderCv::new(&config.rendercv_bin);

    let summary = service
        .batch(jobs_dir, &out_base, !no_render, &renderer)
        .await?;
    print_batch_summary(&summary);
    Ok(())
}

async fn original(config: &Config, output: Option<PathBuf>, theme: Option<String>) -> Result<()> {
    let service = build_service(config, None, theme.as_deref())?;
    let out_dir = output.unwrap_or_else(|| config.output_dir.join("original"));
    let renderer = RenderCv::new(&config.rendercv_bin);

    info!("rendering original base resume (no LLM tailoring)");
    let outcome = service.original(&out_dir, true, &renderer).await?;

    print_outcome(&outcome);
    Ok(())
}

async fn show_info(config: &Config) -> Result<()> {
    println!("{}", "cv-tailor configuration".cyan().bold());
    println!("  provider:        {}", config.provider);
    println!("  model:           {}", config.model);
    println!("  base url:        {}", config.base_url);
    println!("  temperature:     {}", config.temperature);
    println!("  static sections: {}", config.static_sections.display());
    println!("  base resume:     {}", config.base_resume.display());
    println!("  output dir:      {}", config.output_dir.display());
    println!("  theme:           {}", config.theme);

    match RenderCv::new(&config.rendercv_bin).version().await {
        Ok(version) => println!("\n{} rendercv available: {}", "✓".green(), version),
        Err(e) => println!("\n{} {}", "✗".red(), e),
    }

    Ok(())
}

fn init(config: &Config, name: &str) -> Result<()> {
    println!("{}", format!("creating starter resume for {name}").cyan());

    write_starter(&config.static_sections, &static_starter(name))?;
    write_starter(&config.base_resume, &base_starter(name))?;

    println!("\n{}", "next steps:".bold());
    println!("1. Fill in both YAML files with your information");
    println!("2. Run: {}", "cv-tailor generate job_description.txt".cyan());
    Ok(())
}

fn write_starter(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!(
            "{} {} already exists, leaving it untouched",
            "⊘".yellow(),
            path.display()
        );
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    println!("{} created {}", "✓".green(), path.display());
    Ok(())
}

fn static_starter(name: &str) -> String {
    format!(
        r#"cv:
  name: {name}
  email: you@example.com
  location: City, Country
  sections:
    education:
      - institution: Example University
        area: Computer Science
        degree: BS
        start_date: 2015-09
        end_date: 2019-06
"#
    )
}

fn base_starter(name: &str) -> String {
    format!(
        r#"cv:
  name: {name}
  sections:
    summary:
      - Software engineer with X+ years of experience.
    experience:
      - company: Example Corp
        position: Software Engineer
        start_date: 2020-01
        end_date: present
        highlights:
          - Built something with a measurable impact.
    skills:
      - label: Languages
        details: "Rust, Go, Python"
"#
    )
}

fn print_outcome(outcome: &TailorOutcome) {
    println!("\n{} {}", "✓".green().bold(), "resume generated".bold());
    println!("  YAML: {}", outcome.yaml.display());
    if let Some(pdf) = &outcome.pdf {
        println!("  PDF:  {}", pdf.display());
    }
}

fn print_batch_summary(summary: &BatchSummary) {
    println!("\n{}", "batch summary".cyan().bold());
    println!(
        "  {} of {} jobs succeeded",
        summary.succeeded.len().to_string().green(),
        summary.total()
    );

    for (path, err) in &summary.failed {
        println!("  {} {}: {err}", "✗".red(), path.display());
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("resume")
        .to_string()
}

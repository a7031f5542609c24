use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "cv-tailor")]
#[command(about = "Tailor a master resume to job postings with a local or cloud LLM", long_about = None)]
pub struct Args {
    /// Sets the logger's verbosity level
    #[arg(short, long, global = true, value_name = "VERBOSITY", default_value_t = LevelFilter::Info)]
    pub verbosity: LevelFilter,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write starter resume documents to the configured paths
    Init {
        /// Your full name
        name: String,
    },

    /// Tailor the resume to one job description
    Generate {
        /// Path to the job description text file
        job_description: PathBuf,

        /// Output directory (default: <output dir>/<job file stem>)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Override the configured LLM model
        #[arg(short, long, value_name = "MODEL")]
        model: Option<String>,

        /// Override the configured renderer theme
        #[arg(short, long, value_name = "THEME")]
        theme: Option<String>,

        /// Skip PDF rendering and only write the merged YAML
        #[arg(long)]
        no_render: bool,
    },

    /// Tailor the resume to every .txt job description in a directory
    Batch {
        /// Directory containing job description .txt files
        jobs_dir: PathBuf,

        /// Base output directory (one subdirectory per job)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Override the configured LLM model
        #[arg(short, long, value_name = "MODEL")]
        model: Option<String>,

        /// Skip PDF rendering and only write the merged YAML files
        #[arg(long)]
        no_render: bool,
    },

    /// Render the base resume as-is, without LLM tailoring
    Original {
        /// Output directory (default: <output dir>/original)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Override the configured renderer theme
        #[arg(short, long, value_name = "THEME")]
        theme: Option<String>,
    },

    /// Show the effective configuration and renderer status
    Info,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_parses_flags() {
        let args = Args::try_parse_from([
            "cv-tailor",
            "generate",
            "job.txt",
            "-o",
            "out",
            "--model",
            "llama3.1:8b",
            "--no-render",
        ])
        .unwrap();

        match args.command {
            Command::Generate {
                job_description,
                output,
                model,
                no_render,
                ..
            } => {
                assert_eq!(job_description, PathBuf::from("job.txt"));
                assert_eq!(output, Some(PathBuf::from("out")));
                assert_eq!(model.as_deref(), Some("llama3.1:8b"));
                assert!(no_render);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn verbosity_defaults_to_info() {
        let args = Args::try_parse_from(["cv-tailor", "info"]).unwrap();
        assert_eq!(args.verbosity, LevelFilter::Info);

        let args = Args::try_parse_from(["cv-tailor", "-v", "debug", "info"]).unwrap();
        assert_eq!(args.verbosity, LevelFilter::Debug);
    }

    #[test]
    fn batch_requires_jobs_dir() {
        assert!(Args::try_parse_from(["cv-tailor", "batch"]).is_err());
        assert!(Args::try_parse_from(["cv-tailor", "batch", "./jobs"]).is_ok());
    }
}

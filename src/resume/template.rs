use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::resume::emphasis::embolden;

/// The sections the LLM is allowed to rewrite. Everything else passes
/// through the merge untouched.
pub const DYNAMIC_SECTIONS: [&str; 3] = ["summary", "skills", "experience"];

/// LLM-produced replacement sections. A `None` field means "keep the base
/// resume's section".
#[derive(Debug, Clone, Default)]
pub struct TailoredSections {
    pub summary: Option<Value>,
    pub skills: Option<Value>,
    pub experience: Option<Value>,
}

impl TailoredSections {
    fn get(&self, name: &str) -> Option<&Value> {
        match name {
            "summary" => self.summary.as_ref(),
            "skills" => self.skills.as_ref(),
            "experience" => self.experience.as_ref(),
            _ => None,
        }
    }
}

/// Loads the two source documents and assembles merged resumes from them.
#[derive(Debug, Clone)]
pub struct TemplateManager {
    static_path: PathBuf,
    base_path: PathBuf,
}

impl TemplateManager {
    pub fn new(static_path: PathBuf, base_path: PathBuf) -> Self {
        Self {
            static_path,
            base_path,
        }
    }

    /// Static sections (identity, education). A missing file degrades to an
    /// empty document so a bare base resume still renders.
    pub fn load_static(&self) -> Result<Value> {
        if !self.static_path.exists() {
            warn!(
                "static sections file {} not found, using empty document",
                self.static_path.display()
            );
            return Ok(Value::Mapping(Mapping::new()));
        }

        let doc = serde_yaml::from_str(&fs::read_to_string(&self.static_path)?)?;
        info!("loaded static sections from {}", self.static_path.display());
        Ok(doc)
    }

    /// Full base resume; required.
    pub fn load_base(&self) -> Result<Value> {
        if !self.base_path.exists() {
            return Err(Error::NotFound(self.base_path.clone()));
        }

        let doc = serde_yaml::from_str(&fs::read_to_string(&self.base_path)?)?;
        info!("loaded base resume from {}", self.base_path.display());
        Ok(doc)
    }
}

/// Pull one named section out of a resume document's `cv.sections` mapping.
pub fn section<'a>(doc: &'a Value, name: &str) -> Option<&'a Value> {
    doc.get("cv")
        .and_then(|cv| cv.get("sections"))
        .and_then(|sections| sections.get(name))
}

/// Combine static sections, base resume and tailored overrides into one
/// renderable document.
///
/// Neither input document is mutated. Key order comes from the static
/// document, then the base document, so output stays deterministic. Each
/// dynamic section falls back to the base resume when the tailored override
/// is missing or empty, and the keyword emphasis pass runs over whichever
/// variant won.
pub fn merge_sections(
    static_doc: &Value,
    base_doc: &Value,
    tailored: &TailoredSections,
    keywords: &[String],
    theme: &str,
) -> Result<Value> {
    let static_cv = mapping_or_empty(static_doc.get("cv"), "cv")?;
    let base_cv = mapping_or_empty(base_doc.get("cv"), "cv")?;
    let static_sections = mapping_or_empty(static_cv.get("sections"), "cv.sections")?;
    let base_sections = mapping_or_empty(base_cv.get("sections"), "cv.sections")?;

    // Identity fields in the static document's own order.
    let mut cv = Mapping::new();
    for (key, value) in &static_cv {
        if key.as_str() != Some("sections") {
            cv.insert(key.clone(), value.clone());
        }
    }

    // Dynamic sections lead, in a fixed order; tailored content wins, the
    // base section is the fallback so nothing the base had disappears.
    let mut sections = Mapping::new();
    for name in DYNAMIC_SECTIONS {
        let tailored_value = tailored.get(name).filter(|v| !is_empty_section(v));
        let value = tailored_value.or_else(|| base_sections.get(name));

        if let Some(value) = value {
            let value = match name {
                "experience" => embolden_experience(value, keywords)?,
                "skills" => embolden_skills(value, keywords)?,
                _ => value.clone(),
            };
            sections.insert(Value::from(name), value);
        }
    }

    // Remaining static sections, then every other base section, unchanged.
    for (key, value) in &static_sections {
        if !sections.contains_key(key) {
            sections.insert(key.clone(), value.clone());
        }
    }
    for (key, value) in &base_sections {
        if !sections.contains_key(key) {
            sections.insert(key.clone(), value.clone());
        }
    }

    cv.insert(Value::from("sections"), Value::Mapping(sections));

    let mut doc = Mapping::new();
    doc.insert(Value::from("cv"), Value::Mapping(cv));

    // The design block is the renderer's business: base resume's verbatim if
    // present, otherwise just the configured theme.
    let design = match base_doc.get("design") {
        Some(design) => design.clone(),
        None => {
            let mut design = Mapping::new();
            design.insert(Value::from("theme"), Value::from(theme));
            Value::Mapping(design)
        }
    };
    doc.insert(Value::from("design"), design);

    Ok(Value::Mapping(doc))
}

/// Serialize a document to YAML on disk, creating parent directories.
pub fn save_yaml(doc: &Value, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_yaml::to_string(doc)?)?;
    info!("saved resume YAML to {}", path.display());
    Ok(())
}

fn mapping_or_empty<'a>(value: Option<&'a Value>, what: &str) -> Result<MappingRef<'a>> {
    match value {
        None | Some(Value::Null) => Ok(MappingRef::Empty),
        Some(Value::Mapping(mapping)) => Ok(MappingRef::Borrowed(mapping)),
        Some(_) => Err(Error::Merge(format!("{what} must be a mapping"))),
    }
}

/// Either a borrowed mapping or a shared empty one, so missing blocks and
/// present blocks iterate the same way.
enum MappingRef<'a> {
    Borrowed(&'a Mapping),
    Empty,
}

impl<'a> MappingRef<'a> {
    fn get(&self, key: &str) -> Option<&'a Value> {
        match self {
            Self::Borrowed(mapping) => mapping.get(key),
            Self::Empty => None,
        }
    }
}

impl<'a> IntoIterator for &MappingRef<'a> {
    type Item = (&'a Value, &'a Value);
    type IntoIter = serde_yaml::mapping::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        static EMPTY: std::sync::LazyLock<Mapping> = std::sync::LazyLock::new(Mapping::new);
        match self {
            MappingRef::Borrowed(mapping) => mapping.iter(),
            MappingRef::Empty => EMPTY.iter(),
        }
    }
}

fn is_empty_section(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Sequence(seq) => seq.is_empty(),
        Value::Mapping(mapping) => mapping.is_empty(),
        _ => false,
    }
}

/// Run the emphasis pass over every `highlights` string of every entry.
fn embolden_experience(experience: &Value, keywords: &[String]) -> Result<Value> {
    let Value::Sequence(entries) = experience else {
        return Err(Error::Merge("experience section must be a sequence".into()));
    };

    let entries = entries
        .iter()
        .map(|entry| {
            let mut entry = entry.clone();
            if let Some(highlights) = entry.get_mut("highlights") {
                *highlights = embolden_strings(highlights, keywords);
            }
            entry
        })
        .collect();

    Ok(Value::Sequence(entries))
}

/// Run the emphasis pass over every skill category's `details` string.
fn embolden_skills(skills: &Value, keywords: &[String]) -> Result<Value> {
    let Value::Sequence(entries) = skills else {
        return Err(Error::Merge("skills section must be a sequence".into()));
    };

    let entries = entries
        .iter()
        .map(|entry| {
            let mut entry = entry.clone();
            if let Some(Value::String(details)) = entry.get_mut("details") {
                *details = embolden(details, keywords);
            }
            entry
        })
        .collect();

    Ok(Value::Sequence(entries))
}

fn embolden_strings(value: &Value, keywords: &[String]) -> Value {
    match value {
        Value::Sequence(items) => Value::Sequence(
            items
                .iter()
                .map(|item| match item {
                    Value::String(text) => Value::String(embolden(text, keywords)),
                    other => other.clone(),
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn static_doc() -> Value {
        serde_yaml::from_str(
            r#"
cv:
  name: Ada Lovelace
  email: ada@example.com
  location: London, UK
  sections:
    education:
      - institution: University of London
        degree: BS
        start_date: "2010-09"
"#,
        )
        .unwrap()
    }

    fn base_doc() -> Value {
        serde_yaml::from_str(
            r#"
cv:
  name: Ada Lovelace
  sections:
    summary:
      - Engineer with 10+ years of experience.
    experience:
      - company: Analytical Engines Ltd
        position: Principal Engineer
        highlights:
          - Built a Python pipeline processing 10M events per day
          - Mentored 4 engineers
    skills:
      - label: Languages
        details: "Python, Go"
    publications:
      - title: Notes on the Analytical Engine
"#,
        )
        .unwrap()
    }

    fn tailored_skills(details: &str) -> TailoredSections {
        TailoredSections {
            skills: Some(
                serde_yaml::from_str(&format!("- label: Languages\n  details: \"{details}\"\n"))
                    .unwrap(),
            ),
            ..TailoredSections::default()
        }
    }

    #[test]
    fn tailored_sections_replace_base_sections() {
        let merged = merge_sections(
            &static_doc(),
            &base_doc(),
            &tailored_skills("Go, Rust"),
            &[],
            "engineeringresumes",
        )
        .unwrap();

        let skills = section(&merged, "skills").unwrap();
        assert_eq!(skills[0]["details"], Value::from("Go, Rust"));
        // identity and education come from the static document
        assert_eq!(merged["cv"]["name"], Value::from("Ada Lovelace"));
        assert_eq!(
            section(&merged, "education").unwrap()[0]["institution"],
            Value::from("University of London")
        );
    }

    #[test]
    fn missing_tailored_section_falls_back_to_base() {
        let merged = merge_sections(
            &static_doc(),
            &base_doc(),
            &TailoredSections::default(),
            &[],
            "engineeringresumes",
        )
        .unwrap();

        for name in ["summary", "experience", "skills"] {
            assert_eq!(
                serde_yaml::to_string(section(&merged, name).unwrap()).unwrap(),
                serde_yaml::to_string(section(&base_doc(), name).unwrap()).unwrap(),
            );
        }
    }

    #[test]
    fn empty_tailored_section_falls_back_to_base() {
        let tailored = TailoredSections {
            experience: Some(Value::Sequence(Vec::new())),
            ..TailoredSections::default()
        };
        let merged =
            merge_sections(&static_doc(), &base_doc(), &tailored, &[], "classic").unwrap();

        let experience = section(&merged, "experience").unwrap();
        assert_eq!(experience[0]["company"], Value::from("Analytical Engines Ltd"));
    }

    #[test]
    fn merge_is_idempotent() {
        let tailored = tailored_skills("Go, Rust");
        let keywords = vec!["Go".to_string(), "Rust".to_string()];

        let first =
            merge_sections(&static_doc(), &base_doc(), &tailored, &keywords, "classic").unwrap();
        let second =
            merge_sections(&static_doc(), &base_doc(), &tailored, &keywords, "classic").unwrap();
        assert_eq!(
            serde_yaml::to_string(&first).unwrap(),
            serde_yaml::to_string(&second).unwrap()
        );
    }

    #[test]
    fn inputs_are_never_mutated() {
        let static_before = serde_yaml::to_string(&static_doc()).unwrap();
        let base_before = serde_yaml::to_string(&base_doc()).unwrap();

        let static_val = static_doc();
        let base_val = base_doc();
        let keywords = vec!["Python".to_string()];
        merge_sections(&static_val, &base_val, &tailored_skills("Rust"), &keywords, "t").unwrap();

        assert_eq!(serde_yaml::to_string(&static_val).unwrap(), static_before);
        assert_eq!(serde_yaml::to_string(&base_val).unwrap(), base_before);
    }

    #[test]
    fn other_base_sections_pass_through() {
        let merged = merge_sections(
            &static_doc(),
            &base_doc(),
            &TailoredSections::default(),
            &[],
            "classic",
        )
        .unwrap();

        let publications = section(&merged, "publications").unwrap();
        assert_eq!(
            publications[0]["title"],
            Value::from("Notes on the Analytical Engine")
        );
    }

    #[test]
    fn keywords_embolden_highlights_and_details() {
        let keywords = vec!["Python".to_string()];
        let merged = merge_sections(
            &static_doc(),
            &base_doc(),
            &TailoredSections::default(),
            &keywords,
            "classic",
        )
        .unwrap();

        let experience = section(&merged, "experience").unwrap();
        let highlight = experience[0]["highlights"][0].as_str().unwrap();
        assert!(highlight.contains("**Python**"));

        let skills = section(&merged, "skills").unwrap();
        assert_eq!(skills[0]["details"], Value::from("**Python**, Go"));
    }

    #[test]
    fn design_block_passes_through_verbatim() {
        let mut base = base_doc();
        let design: Value =
            serde_yaml::from_str("theme: sb2nov\ncolors:\n  primary: '#004f90'\n").unwrap();
        base.as_mapping_mut()
            .unwrap()
            .insert(Value::from("design"), design.clone());

        let merged = merge_sections(
            &static_doc(),
            &base,
            &TailoredSections::default(),
            &[],
            "ignored-theme",
        )
        .unwrap();
        assert_eq!(merged["design"], design);
    }

    #[test]
    fn default_design_uses_configured_theme() {
        let merged = merge_sections(
            &static_doc(),
            &base_doc(),
            &TailoredSections::default(),
            &[],
            "engineeringresumes",
        )
        .unwrap();
        assert_eq!(merged["design"]["theme"], Value::from("engineeringresumes"));
    }

    #[test]
    fn static_identity_key_order_is_preserved() {
        let merged = merge_sections(
            &static_doc(),
            &base_doc(),
            &TailoredSections::default(),
            &[],
            "classic",
        )
        .unwrap();

        let keys: Vec<&str> = merged["cv"]
            .as_mapping()
            .unwrap()
            .keys()
            .map(|k| k.as_str().unwrap())
            .collect();
        assert_eq!(keys, ["name", "email", "location", "sections"]);
    }

    #[test]
    fn scalar_cv_block_is_a_merge_error() {
        let broken: Value = serde_yaml::from_str("cv: 42").unwrap();
        let err =
            merge_sections(&broken, &base_doc(), &TailoredSections::default(), &[], "t")
                .unwrap_err();
        assert!(matches!(err, Error::Merge(_)));
    }

    #[test]
    fn missing_static_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let base_path = dir.path().join("base.yaml");
        fs::write(&base_path, serde_yaml::to_string(&base_doc()).unwrap()).unwrap();

        let manager = TemplateManager::new(dir.path().join("missing.yaml"), base_path);
        assert!(manager.load_static().unwrap().as_mapping().unwrap().is_empty());
        assert!(manager.load_base().is_ok());

        let missing_base = TemplateManager::new(
            dir.path().join("missing.yaml"),
            dir.path().join("also-missing.yaml"),
        );
        assert!(matches!(missing_base.load_base(), Err(Error::NotFound(_))));
    }
}

//! Prompt construction. Every function is pure: the same inputs always
//! produce the same prompt text.

const SYSTEM: &str = include_str!("templates/system.txt");
const JOB_DETAILS: &str = include_str!("templates/job_details.txt");
const KEYWORDS: &str = include_str!("templates/keywords.txt");
const HIGHLIGHTS: &str = include_str!("templates/highlights.txt");
const SKILLS: &str = include_str!("templates/skills.txt");
const SUMMARY: &str = include_str!("templates/summary.txt");

pub fn system() -> &'static str {
    SYSTEM
}

pub fn job_details(job_description: &str) -> String {
    JOB_DETAILS.replace("{job_description}", job_description)
}

pub fn keywords(job_description: &str) -> String {
    KEYWORDS.replace("{job_description}", job_description)
}

/// Prompt for rewriting one experience entry's highlight bullets.
/// `highlights` is the entry's current `highlights:` list serialized as YAML.
pub fn highlights(job_description: &str, company: &str, position: &str, highlights: &str) -> String {
    HIGHLIGHTS
        .replace("{job_description}", job_description)
        .replace("{company}", company)
        .replace("{position}", position)
        .replace("{highlights}", highlights)
}

/// `skills` is the current `skills:` section serialized as YAML.
pub fn skills(job_description: &str, skills: &str) -> String {
    SKILLS
        .replace("{job_description}", job_description)
        .replace("{skills}", skills)
}

pub fn summary(job_description: &str, current: &str) -> String {
    SUMMARY
        .replace("{job_description}", job_description)
        .replace("{summary}", current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_are_deterministic() {
        let jd = "We need a Rust engineer.";
        assert_eq!(keywords(jd), keywords(jd));
        assert_eq!(summary(jd, "old"), summary(jd, "old"));
    }

    #[test]
    fn placeholders_are_substituted() {
        let prompt = highlights("posting text", "Acme", "Engineer", "highlights:\n  - a\n");

        assert!(prompt.contains("posting text"));
        assert!(prompt.contains("Company: Acme"));
        assert!(prompt.contains("Position: Engineer"));
        assert!(!prompt.contains("{job_description}"));
        assert!(!prompt.contains("{highlights}"));
    }

    #[test]
    fn system_prompt_forbids_markup() {
        assert!(system().contains("**text**"));
    }
}

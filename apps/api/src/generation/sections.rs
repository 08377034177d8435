//! Section parsing: turns the model's bracket-delimited reply into a `SectionPayload`.
//!
//! Expected reply shape:
//! ```text
//! [ABOUT]
//! free text
//! [SKILLS]
//! * Rust
//! [EXPERIENCE]
//! * **Role at Org (2020-Present)**
//! * bullet
//! [PROJECTS]
//! * **Title**
//! * bullet
//! ```
//! Parsing never fails: anything missing comes back empty.

use serde::{Deserialize, Serialize};

use crate::render::entries::{
    parse_experience_entries, parse_project_entries, ExperienceEntry, ProjectEntry,
};

const ABOUT_MARKER: &str = "ABOUT]";
const SKILLS_MARKER: &str = "SKILLS]";
const EXPERIENCE_MARKER: &str = "EXPERIENCE]";
const PROJECTS_MARKER: &str = "PROJECTS]";

/// Lines containing any of these (case-insensitive) are prompt echo, not content.
const NOISE_MARKERS: [&str; 3] = ["example:", "note:", "replace"];

/// The four fixed content sections. `experience` and `projects` stay as raw text here;
/// the renderer structures them into entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionPayload {
    pub about: String,
    pub skills: Vec<String>,
    pub experience: String,
    pub projects: String,
}

impl SectionPayload {
    /// Placeholder content used when generation could not produce anything.
    pub fn fallback() -> Self {
        Self {
            about: "Professional summary not available.".to_string(),
            skills: vec!["Content generation failed. Please try again later.".to_string()],
            experience: "Work experience details not available.".to_string(),
            projects: "Project information not available.".to_string(),
        }
    }

    pub fn experience_entries(&self) -> Vec<ExperienceEntry> {
        parse_experience_entries(&self.experience)
    }

    pub fn project_entries(&self) -> Vec<ProjectEntry> {
        parse_project_entries(&self.projects)
    }
}

/// Parses a raw model reply into sections.
pub fn parse_sections(content: &str) -> SectionPayload {
    let mut sections = SectionPayload::default();

    for part in content.split('[') {
        if part.trim().is_empty() {
            continue;
        }

        if let Some(rest) = part.strip_prefix(ABOUT_MARKER) {
            sections.about = rest.trim().to_string();
        } else if let Some(rest) = part.strip_prefix(SKILLS_MARKER) {
            sections.skills = parse_skill_lines(rest.trim());
        } else if let Some(rest) = part.strip_prefix(EXPERIENCE_MARKER) {
            sections.experience = rest.trim().to_string();
        } else if let Some(rest) = part.strip_prefix(PROJECTS_MARKER) {
            sections.projects = rest.trim().to_string();
        }
    }

    sections.experience = clean_lines(&sections.experience).join("\n");
    sections.projects = clean_lines(&sections.projects).join("\n");
    sections.about = clean_lines(&sections.about).join(" ");

    sections
}

fn parse_skill_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| line.trim().starts_with('*'))
        .map(strip_bullet)
        .filter(|skill| !skill.is_empty())
        .map(str::to_string)
        .collect()
}

/// Strips `*` and spaces from both ends of a bullet line.
pub(crate) fn strip_bullet(line: &str) -> &str {
    line.trim_matches(|c| c == '*' || c == ' ').trim()
}

fn clean_lines(text: &str) -> Vec<&str> {
    text.lines()
        .filter(|line| !line.trim().is_empty() && !is_noise(line))
        .collect()
}

fn is_noise(line: &str) -> bool {
    let lower = line.to_lowercase();
    NOISE_MARKERS.iter().any(|marker| lower.contains(marker))
}

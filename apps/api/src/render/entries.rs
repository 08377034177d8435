//! Entry reconstruction: splits raw experience/project text into structured entries.
//!
//! The model is asked for headers shaped like `* **Role at Org (2020-Present)**`.
//! Splitting is heuristic; a malformed entry is logged and dropped so the rest of the
//! section still renders.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::generation::sections::strip_bullet;

/// Marker that opens a bold bullet header line.
const BOLD_BULLET: &str = "* **";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub position: String,
    pub organization: Option<String>,
    pub start: String,
    pub end: String,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub title: String,
    pub bullets: Vec<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryParseError {
    #[error("entry header is empty")]
    EmptyHeader,

    #[error("no '(' date range in header: {0:?}")]
    MissingDateRange(String),

    #[error("no '-' separating start and end in date range: {0:?}")]
    MissingDateSeparator(String),
}

/// Parses every experience entry, skipping (and logging) the ones that fail.
pub fn parse_experience_entries(text: &str) -> Vec<ExperienceEntry> {
    split_entries(text, is_experience_header)
        .into_iter()
        .filter_map(|lines| match parse_experience_entry(&lines) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping experience entry: {e}");
                None
            }
        })
        .collect()
}

/// Parses every project entry, skipping (and logging) the ones that fail.
pub fn parse_project_entries(text: &str) -> Vec<ProjectEntry> {
    split_entries(text, |line| line.starts_with(BOLD_BULLET))
        .into_iter()
        .filter_map(|lines| match parse_project_entry(&lines) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping project entry: {e}");
                None
            }
        })
        .collect()
}

/// Heuristic for a `Title (start - end)` header line.
fn is_experience_header(line: &str) -> bool {
    line.starts_with(BOLD_BULLET) && line.contains('(') && line.contains(')') && line.contains('-')
}

/// Groups trimmed, non-empty lines into entries. A line accepted by `starts_entry`
/// closes the current group; lines before the first header form their own group.
fn split_entries(text: &str, starts_entry: impl Fn(&str) -> bool) -> Vec<Vec<&str>> {
    let mut entries = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if starts_entry(line) && !current.is_empty() {
            entries.push(std::mem::take(&mut current));
        }
        current.push(line);
    }

    if !current.is_empty() {
        entries.push(current);
    }

    entries
}

fn parse_experience_entry(lines: &[&str]) -> Result<ExperienceEntry, EntryParseError> {
    let (first, rest) = lines.split_first().ok_or(EntryParseError::EmptyHeader)?;
    let header = strip_bullet(first);
    if header.is_empty() {
        return Err(EntryParseError::EmptyHeader);
    }

    let (clause, dates) = header
        .split_once('(')
        .ok_or_else(|| EntryParseError::MissingDateRange(header.to_string()))?;
    let dates = dates.trim().trim_end_matches(')');
    let (start, end) = dates
        .split_once('-')
        .ok_or_else(|| EntryParseError::MissingDateSeparator(dates.to_string()))?;

    let clause = clause.trim();
    let (position, organization) = match clause.split_once(" at ") {
        Some((position, organization)) => (position.trim(), Some(organization.trim())),
        None => (clause, None),
    };

    Ok(ExperienceEntry {
        position: position.to_string(),
        organization: organization
            .filter(|org| !org.is_empty())
            .map(str::to_string),
        start: start.trim().to_string(),
        end: end.trim().to_string(),
        bullets: bullets(rest),
    })
}

fn parse_project_entry(lines: &[&str]) -> Result<ProjectEntry, EntryParseError> {
    let (first, rest) = lines.split_first().ok_or(EntryParseError::EmptyHeader)?;
    let title = strip_bullet(first);
    if title.is_empty() {
        return Err(EntryParseError::EmptyHeader);
    }

    Ok(ProjectEntry {
        title: title.to_string(),
        bullets: bullets(rest),
    })
}

fn bullets(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|l| strip_bullet(l).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_experience_entry_with_organization() {
        let entries = parse_experience_entries(
            "* **Senior Developer at Tech Corp (2020-Present)**\n* Did X\n* Did Y",
        );
        assert_eq!(
            entries,
            vec![ExperienceEntry {
                position: "Senior Developer".to_string(),
                organization: Some("Tech Corp".to_string()),
                start: "2020".to_string(),
                end: "Present".to_string(),
                bullets: vec!["Did X".to_string(), "Did Y".to_string()],
            }]
        );
    }

    #[test]
    fn test_multiple_entries_and_spaced_dates() {
        let text = "* **Engineer (2018 - 2020)**\n* Built APIs\n\n\
            * **Lead at Startup Co (Jan 2020 - Mar 2022)**\n* Hired team\n* Shipped v2";
        let entries = parse_experience_entries(text);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].position, "Engineer");
        assert_eq!(entries[0].organization, None);
        assert_eq!(entries[0].start, "2018");
        assert_eq!(entries[0].end, "2020");
        assert_eq!(entries[1].organization.as_deref(), Some("Startup Co"));
        assert_eq!(entries[1].start, "Jan 2020");
        assert_eq!(entries[1].end, "Mar 2022");
        assert_eq!(entries[1].bullets, vec!["Hired team", "Shipped v2"]);
    }

    #[test]
    fn test_entry_without_date_range_is_skipped_others_survive() {
        // The middle header has no parenthesised range, so it is not a header at all and
        // its lines fold into the first entry's bullets. A leading non-header line forms
        // its own (unparseable) entry and is dropped.
        let text = "Intro line without dates\n\
            * **Developer at Acme (2019-2021)**\n* Did A\n\
            * **Volunteer work**\n\
            * **Architect at Globex (2021-Present)**\n* Did B";
        let entries = parse_experience_entries(text);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].organization.as_deref(), Some("Acme"));
        assert_eq!(entries[0].bullets, vec!["Did A", "Volunteer work"]);
        assert_eq!(entries[1].organization.as_deref(), Some("Globex"));
    }

    #[test]
    fn test_header_with_parenthesis_but_no_separator_is_skipped() {
        let lines = ["* **Consultant (2020)**"];
        assert!(matches!(
            parse_experience_entry(&lines),
            Err(EntryParseError::MissingDateSeparator(_))
        ));

        // The hyphen in the title satisfies the split heuristic, but the range has none.
        let text = "* **Freelance - Consultant (2020)**\n* Advised\n\
            * **Engineer at Initech (2015-2018)**\n* Printed TPS reports";
        let entries = parse_experience_entries(text);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].position, "Engineer");
        assert_eq!(entries[0].bullets, vec!["Printed TPS reports"]);
    }

    #[test]
    fn test_non_experience_text_yields_no_entries() {
        assert!(parse_experience_entries("Work experience details not available.").is_empty());
        assert!(parse_experience_entries("").is_empty());
    }

    #[test]
    fn test_projects_split_on_bold_bullets() {
        let text = "* **Portfolio Generator**\n* Built with Rust\n* Deploys to Netlify\n\
            * **CLI Tool**\n* Parses logs";
        let entries = parse_project_entries(text);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Portfolio Generator");
        assert_eq!(
            entries[0].bullets,
            vec!["Built with Rust", "Deploys to Netlify"]
        );
        assert_eq!(entries[1].title, "CLI Tool");
    }

    #[test]
    fn test_project_with_empty_title_is_skipped() {
        let entries = parse_project_entries("* ****\n* orphan\n* **Real**\n* detail");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Real");
    }
}

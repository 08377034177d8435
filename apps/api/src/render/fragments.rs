//! HTML fragments emitted into repeat regions. All synthesized text is escaped.

use crate::render::entries::{ExperienceEntry, ProjectEntry};

pub fn skill_badge(skill: &str) -> String {
    format!(
        "\n            <span class=\"skill-badge\">{}</span>\n        ",
        escape_html(skill)
    )
}

pub fn experience_block(entry: &ExperienceEntry) -> String {
    let items = entry
        .bullets
        .iter()
        .map(|b| format!("<li>{}</li>", escape_html(b)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"
                    <div class="experience-item">
                        <div class="experience-header">
                            <div class="experience-company">{company}</div>
                            <div class="experience-position">{position}</div>
                            <div class="experience-duration">{start} - {end}</div>
                        </div>
                        <div class="experience-description">
                            <ul>
                                {items}
                            </ul>
                        </div>
                    </div>
                    "#,
        company = escape_html(entry.organization.as_deref().unwrap_or_default()),
        position = escape_html(&entry.position),
        start = escape_html(&entry.start),
        end = escape_html(&entry.end),
        items = items,
    )
}

pub fn project_card(entry: &ProjectEntry) -> String {
    let paragraphs: String = entry
        .bullets
        .iter()
        .map(|b| format!("<p>{}</p>", escape_html(b)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"
                    <div class="col-md-6">
                        <div class="project-card">
                            <div class="card-body">
                                <h5 class="card-title">{title}</h5>
                                <div class="card-text">{paragraphs}</div>
                            </div>
                        </div>
                    </div>
                    "#,
        title = escape_html(&entry.title),
        paragraphs = paragraphs,
    )
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

//! Page assembly: section payload + template → standalone HTML document.

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::generation::sections::SectionPayload;
use crate::models::user::Profile;
use crate::render::fragments::{escape_html, experience_block, project_card, skill_badge};
use crate::render::template::{RenderContext, Template, TemplateError};

/// Skill card animations appended to every generated page.
pub const PORTFOLIO_STYLES: &str = r#"
        <style>
            .skill-card {
                background: white;
                border-radius: 10px;
                padding: 20px;
                margin-bottom: 20px;
                box-shadow: 0 4px 6px rgba(0, 0, 0, 0.1);
                transition: transform 0.3s ease, box-shadow 0.3s ease;
            }

            .skill-card:hover {
                transform: translateY(-5px);
                box-shadow: 0 6px 12px rgba(0, 0, 0, 0.15);
            }

            .skill-badge {
                opacity: 0;
                animation: fadeInUp 0.5s ease forwards;
            }

            @keyframes fadeInUp {
                to {
                    opacity: 1;
                    transform: translateY(0);
                }
            }

            .skill-badge:nth-child(1) { animation-delay: 0.1s; }
            .skill-badge:nth-child(2) { animation-delay: 0.2s; }
            .skill-badge:nth-child(3) { animation-delay: 0.3s; }
            .skill-badge:nth-child(4) { animation-delay: 0.4s; }
            .skill-badge:nth-child(5) { animation-delay: 0.5s; }
            .skill-badge:nth-child(6) { animation-delay: 0.6s; }
        </style>
        "#;

const HEAD_CLOSE: &str = "</head>";

static SCRIPT_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>").expect("Invalid script pattern"));

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions<'a> {
    pub current_year: i32,
    /// Inserted before the first `</head>` when present.
    pub extra_style: Option<&'a str>,
}

impl RenderOptions<'static> {
    pub fn current() -> Self {
        Self {
            current_year: Utc::now().year(),
            extra_style: Some(PORTFOLIO_STYLES),
        }
    }
}

/// Renders one portfolio page. Deterministic for identical inputs.
pub fn render_portfolio(
    template: &Template,
    sections: &SectionPayload,
    profile: &Profile,
    options: &RenderOptions<'_>,
) -> Result<String, TemplateError> {
    let about = escape_html(&sections.about);

    let context = RenderContext::new()
        .slot("about.title", escape_html(profile.display_name()))
        .slot("about.subtitle", about.clone())
        .slot("about.description", about)
        .slot("current_year", options.current_year.to_string())
        .region("skills", sections.skills.iter().map(|s| skill_badge(s)))
        .region(
            "experience",
            sections.experience_entries().iter().map(experience_block),
        )
        .region("projects", sections.project_entries().iter().map(project_card));

    let mut html = template.render(&context)?;

    if let Some(style) = options.extra_style {
        if let Some(at) = html.find(HEAD_CLOSE) {
            html.insert_str(at, style);
        }
    }

    Ok(html)
}

/// Cleans HTML that did not come through the template (e.g. user edits): strips
/// `<script>` elements and wraps head-less fragments in a minimal document shell.
pub fn clean_html(html: &str) -> String {
    let stripped = SCRIPT_TAG.replace_all(html, "");

    if stripped.contains("<head>") {
        return stripped.into_owned();
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Professional Portfolio</title>
    <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css" rel="stylesheet">
    <link href="https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.0.0/css/all.min.css" rel="stylesheet">
</head>
<body>
{stripped}
<script src="https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/js/bootstrap.bundle.min.js"></script>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::sections::parse_sections;

    const TEMPLATE: &str = "<html><head><title>{{ about.title }}</title></head><body>\n\
        <p class=\"lead\">{{ about.subtitle }}</p><p>{{ about.description }}</p>\n\
        {% for skill in skills %}<span class=\"skill-badge\">{{ skill.name }}</span>{% endfor %}\n\
        {% for exp in experience %}<div>{{ exp.position }}</div>{% endfor %}\n\
        {% for project in projects %}<div>{{ project.title }}</div>{% endfor %}\n\
        <footer>&copy; {{ current_year }}</footer></body></html>";

    fn profile() -> Profile {
        Profile {
            username: "ada_l".to_string(),
            full_name: Some("Ada Lovelace".to_string()),
        }
    }

    fn sections() -> SectionPayload {
        parse_sections(
            "[ABOUT]\nI write engines & analyses.\n[SKILLS]\n* Python\n* Django\n* React\n\
             [EXPERIENCE]\n* **Senior Developer at Tech Corp (2020-Present)**\n* Did X\n* Did Y\n\
             * **Broken header without dates**\n\
             [PROJECTS]\n* **Difference Engine**\n* Gears",
        )
    }

    fn options() -> RenderOptions<'static> {
        RenderOptions {
            current_year: 2026,
            extra_style: Some("<style>.x{}</style>"),
        }
    }

    #[test]
    fn test_render_fills_every_slot_and_region() {
        let template = Template::parse(TEMPLATE).unwrap();
        let html = render_portfolio(&template, &sections(), &profile(), &options()).unwrap();

        assert!(html.contains("<title>Ada Lovelace</title>"));
        assert!(html.contains("<p>I write engines &amp; analyses.</p>"));
        assert_eq!(html.matches("class=\"skill-badge\"").count(), 3);
        assert!(html.contains("<div class=\"experience-company\">Tech Corp</div>"));
        assert!(html.contains("<div class=\"experience-duration\">2020 - Present</div>"));
        assert!(html.contains("<li>Did X</li>\n<li>Did Y</li>\n<li>Broken header without dates</li>"));
        assert!(html.contains("<h5 class=\"card-title\">Difference Engine</h5>"));
        assert!(html.contains("&copy; 2026"));
        assert!(html.contains("<style>.x{}</style></head>"));
        assert!(!html.contains("{{") && !html.contains("{%"));
    }

    #[test]
    fn test_render_is_idempotent() {
        let template = Template::parse(TEMPLATE).unwrap();
        let first = render_portfolio(&template, &sections(), &profile(), &options()).unwrap();
        let second = render_portfolio(&template, &sections(), &profile(), &options()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_title_falls_back_to_username() {
        let template = Template::parse("<h1>{{ about.title }}</h1>").unwrap();
        let anonymous = Profile {
            username: "ada_l".to_string(),
            full_name: None,
        };
        let html = render_portfolio(
            &template,
            &SectionPayload::default(),
            &anonymous,
            &RenderOptions {
                current_year: 2026,
                extra_style: None,
            },
        )
        .unwrap();
        assert_eq!(html, "<h1>ada_l</h1>");
    }

    #[test]
    fn test_unknown_slot_surfaces_as_error() {
        let template = Template::parse("<img src=\"{{ about.profile_image }}\">").unwrap();
        let result = render_portfolio(&template, &sections(), &profile(), &options());
        assert_eq!(
            result,
            Err(TemplateError::UnknownSlot("about.profile_image".to_string()))
        );
    }

    #[test]
    fn test_clean_html_strips_scripts_and_keeps_documents() {
        let doc = "<html><head><title>x</title></head><body>\
            <SCRIPT type=\"text/javascript\">\nalert(1)\n</script ><p>ok</p></body></html>";
        assert_eq!(
            clean_html(doc),
            "<html><head><title>x</title></head><body><p>ok</p></body></html>"
        );
    }

    #[test]
    fn test_clean_html_wraps_fragments_in_shell() {
        let cleaned = clean_html("<section><p>Hi</p><script>steal()</script></section>");
        assert!(cleaned.starts_with("<!DOCTYPE html>"));
        assert!(cleaned.contains("bootstrap@5.3.0/dist/css/bootstrap.min.css"));
        assert!(cleaned.contains("<section><p>Hi</p></section>"));
        assert!(!cleaned.contains("steal()"));
        assert!(cleaned.contains("bootstrap.bundle.min.js"));
    }
}

// Prompt constants for portfolio content generation.
// The bracket markers and the `* **Title (start-end)**` header shape are load-bearing:
// `generation::sections` and `render::entries` parse exactly this micro-format.

/// Portfolio content prompt. Replace `{candidate}`, `{template}` and `{resume_text}` before sending.
pub const PORTFOLIO_PROMPT_TEMPLATE: &str = r#"Analyze this resume and create portfolio website content for {candidate}, elaborate where necessary and use impactful sentences. The content will be shown using the "{template}" design.

{resume_text}

Format your response EXACTLY as follows (keep the section headers exactly as shown):

[ABOUT]
A software engineer with X years of experience specializing in... (write 2-3 impactful sentences based on the resume, in first person)

[SKILLS]
* Python
* Django
(list actual skills from resume, one per line with asterisk)

[EXPERIENCE]
* **Senior Developer at Tech Corp (2020-Present)**
* Developed feature X that achieved Y
* Led project Z with outcome W
(list real experience with actual achievements)

[PROJECTS]
* **Project Name**
* Built using actual technologies
* Implemented real features
(describe actual projects from resume)

Note: Replace the example text with real information from the resume. Keep the exact formatting with asterisks and section headers."#;

/// Fills the portfolio prompt template.
pub fn portfolio_prompt(candidate: &str, template: &str, resume_text: &str) -> String {
    PORTFOLIO_PROMPT_TEMPLATE
        .replace("{candidate}", candidate)
        .replace("{template}", template)
        .replace("{resume_text}", resume_text)
}

// Template rendering: parsed slot/region templates, escaped HTML fragments, page assembly.
// Pure and synchronous apart from template loading in `store`.

pub mod entries;
pub mod fragments;
pub mod page;
pub mod store;
pub mod template;

pub use page::{clean_html, render_portfolio, RenderOptions};
pub use store::{slugify, TemplateStore};
pub use template::TemplateError;

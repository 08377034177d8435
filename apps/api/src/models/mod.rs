pub mod resume;
pub mod site;
pub mod template;
pub mod user;

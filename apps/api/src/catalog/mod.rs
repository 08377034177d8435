// Template catalog: which portfolio designs users can pick from.

pub mod handlers;

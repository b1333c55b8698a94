pub mod loader;
pub mod vocab;

pub use loader::load_domains;
pub use vocab::CharVocab;

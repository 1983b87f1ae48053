//! Pure domain services shared by the app: fenced code block extraction,
//! regex-based syntax indexing, and the flat transcript file.

pub mod code_blocks;
pub mod syntax;
pub mod transcript;

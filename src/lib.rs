pub mod args;
pub mod error;
pub mod generate;
pub mod handle;
pub mod parse;
pub mod prompt;
pub mod server;
pub mod templates;
pub mod types;

pub mod configuration;
pub mod errors;
pub mod formats;
pub mod generate;
pub mod middleware;
pub mod models;
pub mod prompt_template;
pub mod providers;
pub mod registry;
pub mod schema;
pub mod streaming;
pub mod tool;

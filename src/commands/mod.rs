pub mod presets;
pub mod prompt;
pub mod resolve;
pub mod score;

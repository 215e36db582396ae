pub mod evaluate;
pub mod mentions;
pub mod prompt;
mod sources;
pub mod summarize;

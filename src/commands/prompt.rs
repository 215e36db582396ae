use std::io::{self, Write};

use anyhow::Result;
use tracing::info;

use crate::cli::PromptArgs;
use crate::commands::sources::load_sources;
use crate::prompt::build_prompt;

pub fn run(args: PromptArgs) -> Result<()> {
    let sources = load_sources(&args.sources)?;
    let prompt = build_prompt(
        args.mode,
        args.question.trim(),
        &sources.profile.transcript,
        &sources.plan,
        args.sources.low_grade_threshold,
    );

    info!(mode = %args.mode, chars = prompt.chars().count(), "built prompt");

    let mut output = io::BufWriter::new(io::stdout().lock());
    write!(output, "{prompt}")?;
    output.flush()?;
    Ok(())
}

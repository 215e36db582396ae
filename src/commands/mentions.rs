use std::fs;
use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::catalog::Catalog;
use crate::cli::MentionsArgs;
use crate::mention::{MentionConfig, MentionExtractor};

#[derive(Debug, Serialize)]
struct MentionsResponse {
    fuzzy_threshold: f64,
    fuzzy_scope: String,
    count: usize,
    courses: Vec<String>,
}

pub fn run(args: MentionsArgs) -> Result<()> {
    let catalog = Catalog::load(&args.catalog_path)?;
    let config = MentionConfig {
        fuzzy_threshold: args.matching.fuzzy_threshold,
        fuzzy_scope: args.matching.fuzzy_scope,
    };
    let extractor = MentionExtractor::new(&catalog, config)?;
    let config = extractor.config();

    let text = match &args.text_file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read reply text from stdin")?;
            buffer
        }
    };

    let courses = extractor.extract(&text).into_iter().collect::<Vec<String>>();
    info!(count = courses.len(), "extracted course mentions");

    let response = MentionsResponse {
        fuzzy_threshold: config.fuzzy_threshold,
        fuzzy_scope: config.fuzzy_scope.as_str().to_string(),
        count: courses.len(),
        courses,
    };

    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, &response)
        .context("failed to serialize mentions json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::catalog::Catalog;
use crate::cli::SourceArgs;
use crate::student::{CATALOG_FILE, PlanSet, StudentProfile, load_student_profile, plan_path};

/// Read-only inputs shared by every (question, mode) pair of a run.
#[derive(Debug, Clone)]
pub struct LoadedSources {
    pub profile: StudentProfile,
    pub catalog: Catalog,
    pub catalog_path: PathBuf,
    pub plan: PlanSet,
    pub plan_path: PathBuf,
}

pub fn load_sources(args: &SourceArgs) -> Result<LoadedSources> {
    let profile = load_student_profile(&args.data_dir, &args.student)?;

    let catalog_path = args
        .catalog_path
        .clone()
        .unwrap_or_else(|| args.data_dir.join(CATALOG_FILE));
    let catalog = Catalog::load(&catalog_path)?;

    let plan_path = args
        .plan_path
        .clone()
        .unwrap_or_else(|| plan_path(&args.data_dir, &profile.major));
    let plan = PlanSet::load(&plan_path)?;

    info!(
        student = %profile.username,
        major = %profile.major,
        transcript_courses = profile.transcript.len(),
        catalog_entries = catalog.len(),
        plan_courses = plan.len(),
        "loaded evaluation sources"
    );

    Ok(LoadedSources {
        profile,
        catalog,
        catalog_path,
        plan,
        plan_path,
    })
}

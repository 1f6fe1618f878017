//! Page pipeline: expand include directives in each page template.

use super::{write_output, TaskError, TaskOutcome};
use crate::build::{discover_files, BuildContext};
use crate::include::IncludeResolver;

/// Run the `pages` task.
pub fn run(ctx: &BuildContext) -> Result<TaskOutcome, TaskError> {
    let config = &ctx.config().pages;
    let root = ctx.root_dir();
    let dest = ctx.in_root(&config.dest);

    let include_paths = config.include_paths.iter().map(|p| ctx.in_root(p)).collect();
    let mut resolver = IncludeResolver::new(include_paths);

    let mut outcome = TaskOutcome::new();
    for page in discover_files(&root, &config.sources)? {
        let Some(name) = page.file_name() else {
            continue;
        };
        let html = resolver.resolve_file(&page)?;
        outcome.push(write_output(&dest.join(name), html.as_bytes())?);
    }
    for warning in resolver.take_warnings() {
        outcome.warnings.push(warning);
    }

    Ok(outcome)
}

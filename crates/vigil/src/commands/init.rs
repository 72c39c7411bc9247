use std::path::Path;

use tracing::info;

use crate::{
    commands::Init,
    config::{ProjectConfig, ProjectConfigError},
    projects::parse_networks,
};

/// Project initialization entrypoint.
pub(crate) fn init(
    Init {
        project_slug,
        build_directory,
        networks,
        force,
    }: Init,
    config_file: &Path,
) -> Result<(), ProjectConfigError> {
    let networks = parse_networks(networks.as_deref());

    ProjectConfig::write_initial(config_file, &project_slug, &build_directory, &networks, force)?;

    info!(config_file = %config_file.display(), "project configuration written");

    println!(
        "Project {project_slug} initialized. Compile and migrate your contracts, \
        then run `vigil push` to start monitoring them."
    );

    Ok(())
}

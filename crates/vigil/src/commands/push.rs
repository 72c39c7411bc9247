use std::path::{Path, PathBuf};

use derive_more::{Display, Error, From};
use indicatif::ProgressBar;
use tracing::debug;

use crate::{
    api::{CompilerPayload, RestClient},
    commands::Push,
    config::{AuthenticationConfig, AuthenticationConfigError, ProjectConfig},
    projects::{parse_networks, resolve_projects, ProjectConfigurationMap},
    upload::{push_projects, PushError, PushSettings},
};

/// `push` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum PushCommandError {
    /// Authentication configuration error.
    Authentication(AuthenticationConfigError),

    /// Unable to parse the project configuration with [`figment`].
    #[display(fmt = "failed reading project configuration: {}", _0)]
    Figment(figment::Error),

    /// Project configuration has no projects to push.
    #[display(
        fmt = "no projects configured in {}, use `vigil init` to add one",
        "_0.display()"
    )]
    NoProjects(#[error(not(source))] PathBuf),

    /// Unable to push contracts.
    #[display(fmt = "unable to push contracts: {}", _0)]
    Push(PushError),
}

/// Push flow entrypoint.
pub(crate) async fn push(
    Push { tag, networks }: Push,
    config_file: &Path,
) -> Result<(), PushCommandError> {
    let project_config = ProjectConfig::new(config_file)?;
    let projects = configured_projects(&project_config, config_file)?;

    let auth_config = AuthenticationConfig::new()?;

    let networks = parse_networks(networks.as_deref());
    let compiler = project_config.compiler.as_ref().map(CompilerPayload::from);

    let settings = PushSettings {
        build_directory: &project_config.build_directory,
        networks: &networks,
        tag: tag.as_deref().filter(|tag| !tag.is_empty()),
        compiler: compiler.as_ref(),
        default_account: project_config
            .organisation
            .as_deref()
            .unwrap_or(auth_config.username()),
        web_path: auth_config.web_path(),
    };

    let progress = ProgressBar::new_spinner();

    progress.println("Setting up your project...");

    let pushed = push_projects(
        &RestClient::from_config(&auth_config),
        &settings,
        &projects,
        &progress,
    )
    .await?;

    let contracts: usize = pushed.iter().map(|project| project.pushed).sum();

    progress.finish_with_message(format!(
        "All smart contracts successfully pushed: {contracts} deployment(s) across {} project(s).",
        pushed.len()
    ));

    Ok(())
}

/// Resolve the projects to push, failing when there are none.
fn configured_projects(
    config: &ProjectConfig,
    config_file: &Path,
) -> Result<ProjectConfigurationMap, PushCommandError> {
    let projects = resolve_projects(config.projects.as_ref(), config.project_slug.as_deref());
    debug!(projects = projects.len(), "project configuration resolved");

    if projects.is_empty() {
        return Err(PushCommandError::NoProjects(config_file.to_path_buf()));
    }

    Ok(projects)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{configured_projects, push, PushCommandError};
    use crate::{commands::Push, config::ProjectConfig};

    fn no_args() -> Push {
        Push {
            tag: None,
            networks: None,
        }
    }

    #[tokio::test]
    async fn legacy_slug_alone_is_not_pushed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Vigil.toml");
        fs::write(&path, r#"project_slug = "legacy""#).unwrap();

        let error = push(no_args(), &path).await.unwrap_err();

        assert!(matches!(error, PushCommandError::NoProjects(ref file) if file == &path));
    }

    #[tokio::test]
    async fn missing_configuration_is_not_pushed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Vigil.toml");

        let error = push(no_args(), &path).await.unwrap_err();

        assert!(matches!(error, PushCommandError::NoProjects(_)));
    }

    #[test]
    fn skipped_projects_leave_nothing_to_push() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Vigil.toml");
        fs::write(
            &path,
            r#"
            [projects.demo]
            tag = "v1"
            "#,
        )
        .unwrap();

        let config = ProjectConfig::new(&path).unwrap();

        assert!(matches!(
            configured_projects(&config, &path),
            Err(PushCommandError::NoProjects(_))
        ));
    }

    #[test]
    fn resolves_configured_projects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Vigil.toml");
        fs::write(
            &path,
            r#"
            project_slug = "legacy"

            [projects."alice/demo"]
            networks = [1]
            "#,
        )
        .unwrap();

        let config = ProjectConfig::new(&path).unwrap();
        let projects = configured_projects(&config, &path).unwrap();

        assert_eq!(
            projects.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["alice/demo", "legacy"]
        );
    }
}

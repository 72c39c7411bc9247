use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use common::config::Logging;
use derive_more::{Display, Error, From};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::projects::ProjectBlob;

/// Authentication configuration errors.
#[derive(Debug, Display, From, Error)]
pub enum AuthenticationConfigError {
    /// Unable to load the configuration using [`figment`].
    #[display(fmt = "unable to load credentials, run `vigil auth` first: {}", _0)]
    Figment(figment::Error),

    /// IO-related error.
    Io(io::Error),

    /// Unable to serialize the configuration using [`toml`] crate.
    Toml(toml::ser::Error),

    /// User's home directory cannot be determined.
    #[display(fmt = "unable to find home directory")]
    HomeDirNotFound,
}

/// Primary authentication config.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthenticationConfig {
    /// Authentication token.
    token: String,

    /// Name of the authenticated account.
    #[serde(default)]
    username: String,

    /// Custom server path specification.
    server_path: String,

    /// Custom web path specification.
    web_path: String,
}

/// Default server path for the hosted environment.
pub fn default_server_path() -> String {
    String::from("https://api.vigil.dev")
}

/// Default web UI path for the hosted environment.
pub fn default_web_path() -> String {
    String::from("https://dashboard.vigil.dev")
}

impl AuthenticationConfig {
    /// Create new authentication config using default configuration file or environment variables.
    ///
    /// See [`Env`] for more details on how to use environment variables configuration.
    ///
    /// [`Env`]: figment::providers::Env
    pub fn new() -> Result<Self, AuthenticationConfigError> {
        Ok(Figment::new()
            .merge(Toml::file(Self::config_path()?))
            .merge(Env::prefixed("VIGIL_AUTH_"))
            .extract()?)
    }

    /// Write the configuration file to the default file location.
    pub fn write_token(
        token: String,
        username: String,
        server_path: String,
        web_path: String,
    ) -> Result<(), AuthenticationConfigError> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(
            path,
            toml::to_string(&AuthenticationConfig {
                token,
                username,
                server_path,
                web_path,
            })?,
        )?;
        Ok(())
    }

    /// Get authentication token from the current configuration.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Get the authenticated account name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Get API server path from the current configuration.
    pub fn server_path(&self) -> &str {
        &self.server_path
    }

    /// Get web UI path from the current configuration.
    pub fn web_path(&self) -> &str {
        &self.web_path
    }

    /// Get authentication configuration storage path.
    ///
    /// Returns [`Err`] if home directory cannot be determined.
    fn config_path() -> Result<PathBuf, AuthenticationConfigError> {
        let mut home_dir = home::home_dir().ok_or(AuthenticationConfigError::HomeDirNotFound)?;
        home_dir.push(".vigil/auth.toml");
        Ok(home_dir)
    }
}

/// Default project configuration file name.
pub const DEFAULT_PROJECT_CONFIG: &str = "Vigil.toml";

/// Project configuration errors.
#[derive(Debug, Display, From, Error)]
pub enum ProjectConfigError {
    /// IO-related error.
    Io(io::Error),

    /// Unable to serialize the configuration using [`toml`] crate.
    Toml(toml::ser::Error),

    /// Project configuration file exists already.
    #[from(ignore)]
    #[display(
        fmt = "project is already initialized in {}, pass --force to overwrite it",
        "_0.display()"
    )]
    AlreadyInitialized(#[error(not(source))] PathBuf),
}

/// Compiler settings forwarded to the remote API alongside the contracts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CompilerConfig {
    /// Whether the optimizer was enabled.
    pub optimizer_enabled: Option<bool>,

    /// Optimizer runs count.
    pub optimizer_runs: Option<u32>,

    /// Target EVM version.
    pub evm_version: Option<String>,
}

/// Project configuration, stored next to the contracts.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Directory containing compiled contract artifacts.
    #[serde(default = "default_build_directory")]
    pub build_directory: PathBuf,

    /// Account that owns projects without an explicit `owner/` prefix.
    #[serde(default)]
    pub organisation: Option<String>,

    /// Single project slug used by older configuration files.
    #[serde(default)]
    pub project_slug: Option<String>,

    /// Per-project settings, keyed by project slug.
    #[serde(default)]
    pub projects: Option<BTreeMap<String, ProjectBlob>>,

    /// Compiler settings of the build.
    #[serde(default)]
    pub compiler: Option<CompilerConfig>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: Logging,
}

/// Default directory of compiled artifacts.
fn default_build_directory() -> PathBuf {
    PathBuf::from("build/contracts")
}

/// Project entry written by `init`.
#[derive(Serialize)]
struct InitialProject<'a> {
    /// Networks monitored by default.
    networks: &'a [String],
}

/// Project configuration file written by `init`.
#[derive(Serialize)]
struct InitialProjectConfig<'a> {
    /// Directory containing compiled contract artifacts.
    build_directory: &'a Path,

    /// Initial project entry.
    projects: BTreeMap<&'a str, InitialProject<'a>>,
}

impl ProjectConfig {
    /// Create new config using the provided configuration file.
    ///
    /// A missing file yields the default configuration.
    pub fn new(path: &Path) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    /// Load only the logging section of the configuration.
    pub fn logging(path: &Path) -> Result<Logging, figment::Error> {
        Self::figment(path).extract_inner("logging")
    }

    /// Configuration file followed by `VIGIL_`-prefixed environment variables.
    fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("VIGIL_"))
    }

    /// Write a fresh configuration file with a single project.
    pub fn write_initial(
        path: &Path,
        project_slug: &str,
        build_directory: &Path,
        networks: &[String],
        force: bool,
    ) -> Result<(), ProjectConfigError> {
        if path.exists() && !force {
            return Err(ProjectConfigError::AlreadyInitialized(path.to_path_buf()));
        }

        let config = InitialProjectConfig {
            build_directory,
            projects: BTreeMap::from([(project_slug, InitialProject { networks })]),
        };

        fs::write(path, toml::to_string(&config)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use tracing::level_filters::LevelFilter;

    use super::{CompilerConfig, ProjectConfig, ProjectConfigError};
    use crate::projects::{resolve_projects, ProjectBlob};

    const CONFIG: &str = r#"
        build_directory = "out/artifacts"
        organisation = "acme"
        project_slug = "legacy"

        [projects."alice/demo"]
        networks = [1, "4"]

        [projects.broken]
        networks = "1"

        [compiler]
        optimizer_enabled = true
        optimizer_runs = 200

        [logging]
        level = "debug"
    "#;

    #[test]
    fn loads_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Vigil.toml");
        fs::write(&path, CONFIG).unwrap();

        let config = ProjectConfig::new(&path).unwrap();

        assert_eq!(config.build_directory, PathBuf::from("out/artifacts"));
        assert_eq!(config.organisation.as_deref(), Some("acme"));
        assert_eq!(config.project_slug.as_deref(), Some("legacy"));
        assert_eq!(
            config.compiler,
            Some(CompilerConfig {
                optimizer_enabled: Some(true),
                optimizer_runs: Some(200),
                evm_version: None,
            })
        );
        assert_eq!(config.logging.level, LevelFilter::DEBUG);

        let projects = config.projects.as_ref().unwrap();
        assert!(matches!(projects["alice/demo"], ProjectBlob::Nested(_)));
        assert!(matches!(projects["broken"], ProjectBlob::Nested(_)));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Vigil.toml");

        let config = ProjectConfig::new(&path).unwrap();

        assert_eq!(config.build_directory, PathBuf::from("build/contracts"));
        assert!(config.projects.is_none());
        assert!(ProjectConfig::logging(&path).is_err());
    }

    #[test]
    fn writes_initial_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Vigil.toml");

        ProjectConfig::write_initial(
            &path,
            "alice/demo",
            &PathBuf::from("build/contracts"),
            &[String::from("1"), String::from("4")],
            false,
        )
        .unwrap();

        let config = ProjectConfig::new(&path).unwrap();
        let projects = resolve_projects(config.projects.as_ref(), None);

        assert_eq!(projects["alice/demo"].networks, vec!["1", "4"]);
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Vigil.toml");
        fs::write(&path, CONFIG).unwrap();

        let error =
            ProjectConfig::write_initial(&path, "demo", &PathBuf::from("build"), &[], false)
                .unwrap_err();
        assert!(matches!(error, ProjectConfigError::AlreadyInitialized(_)));

        ProjectConfig::write_initial(&path, "demo", &PathBuf::from("build"), &[], true).unwrap();
        let config = ProjectConfig::new(&path).unwrap();
        assert!(config.project_slug.is_none());
        assert_eq!(config.projects.unwrap().len(), 1);
    }
}

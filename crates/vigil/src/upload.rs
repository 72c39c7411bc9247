use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use common::artifacts::{read_contracts, ArtifactError, ContractRecord};
use derive_more::{Display, Error, From};
use indicatif::ProgressBar;
use itertools::Itertools;
use tracing::{debug, info};

use crate::{
    api::{
        CompilerPayload, ContractApi, PushedContract, RequestError, UploadContractsRequest,
    },
    projects::{ProjectConfiguration, ProjectConfigurationMap},
};

/// Contract deployment that the server did not acknowledge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UnpushedContract {
    /// Contract name.
    pub name: String,

    /// Network identifier, as found in the artifact.
    pub network_id: String,

    /// Contract address, as found in the artifact.
    pub address: String,
}

impl fmt::Display for UnpushedContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "• {} on network {} with address {}",
            self.name, self.network_id, self.address
        )
    }
}

/// Mismatch between the expected and acknowledged contract count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CountMismatch {
    /// Count of contracts acknowledged by the server.
    pub pushed: usize,

    /// Count of network-bound contracts.
    pub expected: usize,

    /// Deployments without a matching acknowledged entry.
    pub unpushed: Vec<UnpushedContract>,
}

impl fmt::Display for CountMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "some of the contracts haven't been pushed (got: {}, expected: {}). \
            This can happen when the contract isn't deployed to a supported network \
            or some other error might have occurred. \
            Below is the list with all the contracts that weren't pushed successfully:\n{}",
            self.pushed,
            self.expected,
            self.unpushed.iter().join("\n")
        )
    }
}

/// Contract push errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum PushError {
    /// Unable to read build artifacts.
    #[display(fmt = "couldn't read build files: {}", _0)]
    Artifacts(ArtifactError),

    /// Build directory has no contracts.
    #[from(ignore)]
    #[display(
        fmt = "no contracts detected in build directory: {}. \
        This can happen when no contracts have been compiled yet.",
        "_0.display()"
    )]
    NoContracts(#[error(not(source))] PathBuf),

    /// No contract in the build directory was deployed to any of the selected networks.
    #[from(ignore)]
    #[display(
        fmt = "no deployed contracts detected in build directory: {}. \
        This can happen when no contracts have been migrated yet.",
        "_0.display()"
    )]
    NoNetworkBoundContracts(#[error(not(source))] PathBuf),

    /// Contract owner cannot be determined.
    #[from(ignore)]
    #[display(
        fmt = "unable to determine the account of project {}, \
        run `vigil auth` or use the owner/project form",
        _0
    )]
    MissingAccount(#[error(not(source))] String),

    /// Request did not complete.
    #[display(fmt = "couldn't push contracts to the server: {}", _0)]
    Transport(RequestError),

    /// Server reported an error.
    #[from(ignore)]
    #[display(fmt = "{}", message)]
    Server {
        /// Machine-readable error identifier.
        slug: String,

        /// Human-readable error message.
        message: String,
    },

    /// Server did not acknowledge all network-bound contracts.
    #[display(fmt = "{}", _0)]
    CountMismatch(#[error(not(source))] CountMismatch),
}

/// Settings shared by all project pushes of a single run.
pub(crate) struct PushSettings<'a> {
    /// Directory containing compiled contract artifacts.
    pub build_directory: &'a Path,

    /// Networks passed on the command line.
    pub networks: &'a [String],

    /// Deployment tag.
    pub tag: Option<&'a str>,

    /// Compiler settings attached to each upload.
    pub compiler: Option<&'a CompilerPayload>,

    /// Account that owns projects without an explicit `owner/` prefix.
    pub default_account: &'a str,

    /// Web UI path used to link pushed projects.
    pub web_path: &'a str,
}

/// Successfully pushed project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PushedProject {
    /// Project owner.
    pub account: String,

    /// Project name.
    pub project: String,

    /// Count of acknowledged contract deployments.
    pub pushed: usize,
}

impl PushedProject {
    /// Dashboard page listing the project's contracts.
    pub fn dashboard_url(&self, web_path: &str) -> String {
        format!(
            "{}/{}/{}/contracts",
            web_path.trim_end_matches('/'),
            self.account,
            self.project
        )
    }
}

/// Push contracts of all projects, one after another.
///
/// The first failing project stops the run.
pub(crate) async fn push_projects<A: ContractApi + ?Sized>(
    api: &A,
    settings: &PushSettings<'_>,
    projects: &ProjectConfigurationMap,
    progress: &ProgressBar,
) -> Result<Vec<PushedProject>, PushError> {
    let mut pushed = Vec::with_capacity(projects.len());

    for configuration in projects.values() {
        progress.println(format!(
            "Pushing smart contracts for project: {}",
            configuration.slug
        ));

        let project = push_project(api, settings, configuration, progress).await?;

        progress.println(format!(
            "Successfully pushed smart contracts for project {}. You can view your contracts at {}",
            project.project,
            project.dashboard_url(settings.web_path)
        ));

        pushed.push(project);
    }

    Ok(pushed)
}

/// Push contracts of a single project and reconcile the server response.
pub(crate) async fn push_project<A: ContractApi + ?Sized>(
    api: &A,
    settings: &PushSettings<'_>,
    configuration: &ProjectConfiguration,
    progress: &ProgressBar,
) -> Result<PushedProject, PushError> {
    let (account, project) = configuration.target(settings.default_account);

    if account.is_empty() {
        return Err(PushError::MissingAccount(configuration.slug.clone()));
    }

    let networks = configuration.effective_networks(settings.networks);
    debug!(project = %configuration.slug, ?networks, "reading build files");

    let contracts = read_contracts(settings.build_directory, &networks)?;

    if contracts.is_empty() {
        return Err(PushError::NoContracts(settings.build_directory.to_path_buf()));
    }

    let expected = contracts
        .iter()
        .filter(|contract| contract.is_network_bound())
        .count();

    if expected == 0 {
        return Err(PushError::NoNetworkBoundContracts(
            settings.build_directory.to_path_buf(),
        ));
    }

    progress.println("We have detected the following smart contracts:");
    for contract in &contracts {
        if contract.is_network_bound() {
            progress.println(format!("• {}", contract.name));
        } else {
            progress.println(format!(
                "• {} (not deployed to any network, will be used as a library contract)",
                contract.name
            ));
        }
    }

    progress.enable_steady_tick(Duration::from_millis(150));
    progress.set_message("Pushing contracts...");

    let response = api
        .upload_contracts(
            account,
            project,
            &UploadContractsRequest {
                contracts: &contracts,
                config: settings.compiler,
                tag: settings.tag,
            },
        )
        .await;

    progress.disable_steady_tick();
    progress.set_message("");

    let response = response.map_err(PushError::Transport)?;

    if let Some(error) = response.error {
        return Err(PushError::Server {
            slug: error.slug,
            message: error.message,
        });
    }

    reconcile(&contracts, expected, &response.contracts)?;

    info!(project = %configuration.slug, pushed = expected, "contracts pushed");

    Ok(PushedProject {
        account: account.to_owned(),
        project: project.to_owned(),
        pushed: response.contracts.len(),
    })
}

/// Compare acknowledged deployments against the expected count.
///
/// The count is authoritative. Per-deployment matching is only performed
/// to describe a mismatch.
pub(crate) fn reconcile(
    contracts: &[ContractRecord],
    expected: usize,
    pushed: &[PushedContract],
) -> Result<(), CountMismatch> {
    if pushed.len() == expected {
        return Ok(());
    }

    Err(CountMismatch {
        pushed: pushed.len(),
        expected,
        unpushed: unpushed_contracts(contracts, pushed),
    })
}

/// Deployments of network-bound contracts without a matching acknowledged entry.
///
/// Addresses and network identifiers are compared case-insensitively.
pub(crate) fn unpushed_contracts(
    contracts: &[ContractRecord],
    pushed: &[PushedContract],
) -> Vec<UnpushedContract> {
    let pushed: Vec<(String, String)> = pushed
        .iter()
        .map(|contract| {
            (
                contract.address.to_lowercase(),
                contract.network_id.to_lowercase(),
            )
        })
        .collect();

    contracts
        .iter()
        .flat_map(|contract| {
            contract
                .networks
                .iter()
                .map(move |(network_id, deployment)| (contract, network_id, deployment))
        })
        .filter(|(_, network_id, deployment)| {
            let address = deployment.address.to_lowercase();
            let network_id = network_id.to_lowercase();

            !pushed
                .iter()
                .any(|(pushed_address, pushed_network_id)| {
                    *pushed_address == address && *pushed_network_id == network_id
                })
        })
        .map(|(contract, network_id, deployment)| UnpushedContract {
            name: contract.name.clone(),
            network_id: network_id.clone(),
            address: deployment.address.clone(),
        })
        .collect()
}

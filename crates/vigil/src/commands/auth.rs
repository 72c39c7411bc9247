use std::time::Duration;

use derive_more::{Display, Error, From};
use indicatif::ProgressBar;
use rand::{
    distributions::{Alphanumeric, DistString},
    thread_rng,
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    commands::Auth,
    config::{
        default_server_path, default_web_path, AuthenticationConfig, AuthenticationConfigError,
    },
};

/// Length of the one-time login code shared with the browser.
const LOGIN_CODE_LENGTH: usize = 64;

/// Delay between checks of the login state.
const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Checks made before giving up on the browser login, five minutes in total.
const MAX_POLL_ATTEMPTS: u32 = 100;

/// Login code sent to the server in exchange for an API token.
#[derive(Serialize)]
struct ExchangeRequest<'a> {
    /// One-time login code.
    cli_token: &'a str,
}

/// Credentials issued once the browser login completes.
#[derive(Debug, Deserialize)]
struct Credentials {
    /// API token.
    token: String,

    /// Name of the authenticated account.
    username: String,
}

/// `auth` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum AuthError {
    /// Unable to store the credentials.
    #[display(fmt = "unable to store credentials: {}", _0)]
    Authentication(AuthenticationConfigError),

    /// Login state request did not complete.
    #[display(fmt = "couldn't reach the authentication server: {}", _0)]
    Http(reqwest::Error),

    /// Server refused to exchange the login code.
    #[from(ignore)]
    #[display(fmt = "authentication server refused the login with status {}", _0)]
    Refused(#[error(not(source))] StatusCode),

    /// Browser login was not completed in time.
    #[display(fmt = "browser login was not completed in time, run `vigil auth` again")]
    TimedOut,
}

/// Authentication flow entrypoint.
pub(crate) async fn auth(
    Auth {
        server_path,
        web_path,
    }: Auth,
) -> Result<(), AuthError> {
    let server_path = server_path.unwrap_or_else(default_server_path);
    let web_path = web_path.unwrap_or_else(default_web_path);

    let login_code = Alphanumeric.sample_string(&mut thread_rng(), LOGIN_CODE_LENGTH);
    let login_url = format!("{}/login?cli_token={login_code}", web_path.trim_end_matches('/'));

    let progress = ProgressBar::new_spinner();
    progress.enable_steady_tick(Duration::from_millis(150));
    progress.println(format!("Log in using your browser: {login_url}"));

    if let Err(error) = open::that(&login_url) {
        warn!(%error, "unable to open the browser, open the login page manually");
    }

    progress.set_message("Waiting for the browser login...");

    let client = Client::new();
    let credentials = poll_credentials(&client, &server_path, &login_code).await?;

    debug!(username = %credentials.username, "credentials received");

    let message = format!("Logged in as {}.", credentials.username);

    AuthenticationConfig::write_token(
        credentials.token,
        credentials.username,
        server_path,
        web_path,
    )?;

    progress.finish_with_message(message);

    Ok(())
}

/// Check the login state until the browser login completes.
async fn poll_credentials(
    client: &Client,
    server_path: &str,
    login_code: &str,
) -> Result<Credentials, AuthError> {
    for attempt in 1..=MAX_POLL_ATTEMPTS {
        if let Some(credentials) = exchange_login_code(client, server_path, login_code).await? {
            return Ok(credentials);
        }

        debug!(attempt, "browser login is still pending");
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    Err(AuthError::TimedOut)
}

/// Exchange the login code for credentials.
///
/// Returns [`None`] while the browser login is pending.
async fn exchange_login_code(
    client: &Client,
    server_path: &str,
    login_code: &str,
) -> Result<Option<Credentials>, AuthError> {
    let response = client
        .post(format!("{}/auth/exchange", server_path.trim_end_matches('/')))
        .json(&ExchangeRequest {
            cli_token: login_code,
        })
        .send()
        .await?;

    match response.status() {
        StatusCode::NOT_FOUND => Ok(None),
        status if status.is_success() => Ok(Some(response.json().await?)),
        status => Err(AuthError::Refused(status)),
    }
}

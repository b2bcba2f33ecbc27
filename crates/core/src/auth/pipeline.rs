//! Validate → Refresh → Login authentication pipeline.
//!
//! A run executes its steps one at a time and stops at the first step that
//! leaves the identity with usable tokens. Validate and Refresh failures are
//! expected when a token is stale and are only recorded; the Login step's
//! failure is what the caller sees.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use beacon_domain::{BeaconError, Credential, IdentityKind, PlatformConfig, Result, TokenGrant};
use tracing::{debug, info, instrument, warn};

use super::classification::classify_oauth_error;
use super::grant;
use super::notifications::{AuthNotification, NotificationHub};
use super::vault::CredentialVault;
use crate::http::{HttpRequest, HttpResponse, HttpTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStep {
    Validate,
    Refresh,
    Login,
}

impl PipelineStep {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Refresh => "refresh",
            Self::Login => "login",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which steps a run starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineMode {
    /// Validate the cached token first.
    Full,
    /// The token was just refused with a 401, so validating it is pointless.
    Reauthenticate,
}

impl PipelineMode {
    pub const fn steps(self) -> &'static [PipelineStep] {
        match self {
            Self::Full => &[PipelineStep::Validate, PipelineStep::Refresh, PipelineStep::Login],
            Self::Reauthenticate => &[PipelineStep::Refresh, PipelineStep::Login],
        }
    }
}

/// State of one authentication attempt.
///
/// Holds the remaining steps, the response of the most recent exchange and
/// the short-circuit flag. Discarded once the run settles.
#[derive(Debug)]
pub struct PipelineRun {
    kind: IdentityKind,
    remaining: VecDeque<PipelineStep>,
    response: Option<HttpResponse>,
    last_error: Option<BeaconError>,
    short_circuited: bool,
}

impl PipelineRun {
    pub fn new(kind: IdentityKind, mode: PipelineMode) -> Self {
        Self {
            kind,
            remaining: mode.steps().iter().copied().collect(),
            response: None,
            last_error: None,
            short_circuited: false,
        }
    }

    pub const fn kind(&self) -> IdentityKind {
        self.kind
    }

    /// The next step to execute, or `None` once the run short-circuited or
    /// ran out of steps.
    pub fn next_step(&mut self) -> Option<PipelineStep> {
        if self.short_circuited {
            return None;
        }
        self.remaining.pop_front()
    }

    pub fn remaining(&self) -> impl Iterator<Item = PipelineStep> + '_ {
        self.remaining.iter().copied()
    }

    pub const fn last_response(&self) -> Option<&HttpResponse> {
        self.response.as_ref()
    }

    pub const fn is_short_circuited(&self) -> bool {
        self.short_circuited
    }

    fn record_response(&mut self, response: HttpResponse) {
        self.response = Some(response);
    }

    fn succeed(&mut self) {
        self.short_circuited = true;
        self.last_error = None;
    }

    fn record_failure(&mut self, error: BeaconError) {
        self.last_error = Some(error);
    }

    fn finish(self) -> Result<()> {
        if self.short_circuited {
            return Ok(());
        }
        Err(self
            .last_error
            .unwrap_or_else(|| BeaconError::Internal("pipeline ended without running a step".into())))
    }
}

/// Runs authentication attempts for any identity.
///
/// Holds no state between runs; running it again from scratch is always
/// safe.
pub struct AuthenticationPipeline {
    config: Arc<PlatformConfig>,
    transport: Arc<dyn HttpTransport>,
    vault: Arc<CredentialVault>,
    notifications: NotificationHub,
}

impl AuthenticationPipeline {
    pub fn new(
        config: Arc<PlatformConfig>,
        transport: Arc<dyn HttpTransport>,
        vault: Arc<CredentialVault>,
        notifications: NotificationHub,
    ) -> Self {
        Self { config, transport, vault, notifications }
    }

    pub fn vault(&self) -> &Arc<CredentialVault> {
        &self.vault
    }

    /// Establish a valid credential for `kind`.
    ///
    /// # Errors
    /// Returns the Login step's classified error when no step succeeded, or
    /// a storage error if the credential could not be read or written.
    #[instrument(skip(self), fields(identity = %kind))]
    pub async fn run(&self, kind: IdentityKind, mode: PipelineMode) -> Result<()> {
        let mut run = PipelineRun::new(kind, mode);

        while let Some(step) = run.next_step() {
            let credential = self.vault.get(kind).await?;
            match step {
                PipelineStep::Validate => self.validate(&credential, &mut run).await,
                PipelineStep::Refresh => self.refresh(&credential, &mut run).await?,
                PipelineStep::Login => self.login(&credential, &mut run).await?,
            }
        }

        let outcome = run.finish();
        match &outcome {
            Ok(()) => info!("Authentication pipeline succeeded"),
            Err(err) => warn!(error = %err, code = err.code(), "Authentication pipeline failed"),
        }
        outcome
    }

    async fn exchange(
        &self,
        step: PipelineStep,
        request: HttpRequest,
        run: &mut PipelineRun,
    ) -> Option<HttpResponse> {
        match self.transport.execute(request).await {
            Ok(response) => {
                debug!(%step, status = response.status, "Pipeline step answered");
                run.record_response(response.clone());
                Some(response)
            }
            Err(err) => {
                warn!(%step, error = %err, "Pipeline step could not reach the server");
                run.record_failure(err.into());
                None
            }
        }
    }

    async fn validate(&self, credential: &Credential, run: &mut PipelineRun) {
        let Some(access_token) = credential.access_token.as_deref() else {
            debug!(step = %PipelineStep::Validate, "Skipped, no access token");
            return;
        };

        let request = grant::validate_request(&self.config, access_token);
        let Some(response) = self.exchange(PipelineStep::Validate, request, run).await else {
            return;
        };

        if response.status == 200 {
            debug!("Cached access token is valid");
            run.succeed();
        } else {
            run.record_failure(failure_from_response(&response));
        }
    }

    async fn refresh(&self, credential: &Credential, run: &mut PipelineRun) -> Result<()> {
        let Some(refresh_token) = credential.refresh_token.as_deref() else {
            debug!(step = %PipelineStep::Refresh, "Skipped, no refresh token");
            return Ok(());
        };

        let request = grant::refresh_request(&self.config, refresh_token);
        let Some(response) = self.exchange(PipelineStep::Refresh, request, run).await else {
            return Ok(());
        };

        if response.status == 401 && credential.kind == IdentityKind::InteractiveUser {
            self.notifications.publish(AuthNotification::UserLoginRequired);
        }

        match granted_tokens(credential.kind, &response) {
            Ok(tokens) => {
                self.vault.apply_grant(credential.kind, &tokens).await?;
                info!("Refreshed access token");
                run.succeed();
            }
            Err(err) => run.record_failure(err),
        }
        Ok(())
    }

    async fn login(&self, credential: &Credential, run: &mut PipelineRun) -> Result<()> {
        let (request, grant_type) = grant::login_request(&self.config, credential);
        debug!(grant_type = grant_type.as_str(), "Logging in");

        let Some(response) = self.exchange(PipelineStep::Login, request, run).await else {
            return Ok(());
        };

        match granted_tokens(credential.kind, &response) {
            Ok(tokens) => {
                self.vault.apply_grant(credential.kind, &tokens).await?;
                info!(grant_type = grant_type.as_str(), "Logged in");
                run.succeed();
            }
            Err(err) => {
                if let Some(notification) = err
                    .unauthorized_reason()
                    .and_then(|reason| AuthNotification::for_login_failure(credential.kind, reason))
                {
                    self.notifications.publish(notification);
                }
                debug!(grant_type = grant_type.as_str(), status = response.status, "Login refused");
                run.record_failure(err);
            }
        }
        Ok(())
    }
}

/// Tokens from a token-endpoint response, or the classified failure.
fn granted_tokens(kind: IdentityKind, response: &HttpResponse) -> Result<TokenGrant> {
    if response.status != 200 {
        return Err(failure_from_response(response));
    }
    grant::parse_grant(kind, response)
}

fn failure_from_response(response: &HttpResponse) -> BeaconError {
    match response.status {
        401 => BeaconError::Unauthorized(classify_oauth_error(&response.body)),
        403 => BeaconError::Forbidden,
        status => BeaconError::UnhandledHttp { status, error_code: response.error_code() },
    }
}

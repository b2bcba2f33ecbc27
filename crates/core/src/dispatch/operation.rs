//! One authenticated HTTP exchange and its reauthentication state machine.

use std::fmt;
use std::sync::Arc;

use beacon_common::error::ErrorClassification;
use beacon_domain::{BeaconError, IdentityKind, PlatformConfig, Result};
use tracing::{debug, warn};

use super::descriptor::{RequestDescriptor, ResponseBody, ResponseParser};
use crate::http::{HttpResponse, HttpTransport, TransportError};

/// A call waiting to be admitted by the dispatcher.
///
/// Retrying never mutates an operation: [`retry`](Self::retry) returns a new
/// value sharing the same descriptor with one less unit of budget.
#[derive(Debug, Clone)]
pub struct PendingOperation {
    descriptor: Arc<RequestDescriptor>,
    identity: IdentityKind,
    retry_budget: u8,
    attempt: u8,
}

impl PendingOperation {
    pub fn new(identity: IdentityKind, descriptor: Arc<RequestDescriptor>, retry_budget: u8) -> Self {
        Self { descriptor, identity, retry_budget, attempt: 1 }
    }

    pub fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }

    pub const fn identity(&self) -> IdentityKind {
        self.identity
    }

    pub const fn retry_budget(&self) -> u8 {
        self.retry_budget
    }

    /// 1 for the original call, 2 for the first retry, and so on.
    pub const fn attempt(&self) -> u8 {
        self.attempt
    }

    /// The follow-up attempt, or `None` once the budget is spent.
    #[must_use]
    pub fn retry(&self) -> Option<Self> {
        let retry_budget = self.retry_budget.checked_sub(1)?;
        Some(Self {
            descriptor: Arc::clone(&self.descriptor),
            identity: self.identity,
            retry_budget,
            attempt: self.attempt.saturating_add(1),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Created,
    Executing,
    Succeeded,
    AwaitingReauth,
    FatalFailure,
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Executing => "executing",
            Self::Succeeded => "succeeded",
            Self::AwaitingReauth => "awaiting_reauth",
            Self::FatalFailure => "fatal_failure",
        };
        f.write_str(name)
    }
}

/// Classified result of one exchange.
#[derive(Debug)]
pub enum ExchangeOutcome<T> {
    Succeeded(T),
    AwaitingReauth,
    Failed(BeaconError),
}

/// Drives one [`PendingOperation`] through
/// `Created → Executing → {Succeeded, AwaitingReauth, FatalFailure}`.
#[derive(Debug)]
pub struct AuthenticatedOperation {
    pending: PendingOperation,
    state: OperationState,
}

impl AuthenticatedOperation {
    pub const fn new(pending: PendingOperation) -> Self {
        Self { pending, state: OperationState::Created }
    }

    pub const fn state(&self) -> OperationState {
        self.state
    }

    pub const fn pending(&self) -> &PendingOperation {
        &self.pending
    }

    /// Perform exactly one exchange and classify it.
    pub async fn execute<T>(
        &mut self,
        transport: &dyn HttpTransport,
        config: &PlatformConfig,
        access_token: Option<&str>,
        parser: &dyn ResponseParser<T>,
    ) -> ExchangeOutcome<T> {
        self.state = OperationState::Executing;
        let request = self.pending.descriptor.to_request(config, access_token);
        debug!(
            identity = %self.pending.identity,
            method = %request.method,
            path = request.path(),
            attempt = self.pending.attempt,
            "Executing authenticated request"
        );

        let outcome = classify(transport.execute(request).await, parser);
        self.state = match &outcome {
            ExchangeOutcome::Succeeded(_) => OperationState::Succeeded,
            ExchangeOutcome::AwaitingReauth => OperationState::AwaitingReauth,
            ExchangeOutcome::Failed(err) => {
                warn!(identity = %self.pending.identity, error = %err, "Authenticated request failed");
                OperationState::FatalFailure
            }
        };
        outcome
    }

    /// Resolve an `AwaitingReauth` operation once its pipeline settled.
    ///
    /// Returns the follow-up attempt to resubmit. The current operation is
    /// superseded by it.
    ///
    /// # Errors
    /// Returns the pipeline's error if it failed, or
    /// `BeaconError::CouldNotReauthenticate` when the retry budget is spent.
    pub fn after_reauth(&mut self, pipeline: Result<()>) -> Result<PendingOperation> {
        debug_assert_eq!(self.state, OperationState::AwaitingReauth);

        if let Err(err) = pipeline {
            self.state = OperationState::FatalFailure;
            return Err(err);
        }

        if let Some(next) = self.pending.retry() {
            debug!(
                identity = %self.pending.identity,
                remaining_budget = next.retry_budget,
                "Reauthenticated, replaying request"
            );
            Ok(next)
        } else {
            self.state = OperationState::FatalFailure;
            warn!(identity = %self.pending.identity, "Retry budget exhausted after reauthentication");
            Err(BeaconError::CouldNotReauthenticate)
        }
    }
}

fn classify<T>(
    result: std::result::Result<HttpResponse, TransportError>,
    parser: &dyn ResponseParser<T>,
) -> ExchangeOutcome<T> {
    let response = match result {
        Ok(response) => response,
        Err(err) => {
            err.log("Transport failure, reporting offline");
            return ExchangeOutcome::Failed(BeaconError::NetworkOffline);
        }
    };

    match response.status {
        401 => ExchangeOutcome::AwaitingReauth,
        403 => ExchangeOutcome::Failed(BeaconError::Forbidden),
        _ if response.is_success() => {
            let body = ResponseBody::new(response.status, response.body);
            match parser.parse(&body) {
                Ok(value) => ExchangeOutcome::Succeeded(value),
                Err(err) => ExchangeOutcome::Failed(err),
            }
        }
        status => ExchangeOutcome::Failed(BeaconError::UnhandledHttp {
            status,
            error_code: response.error_code(),
        }),
    }
}

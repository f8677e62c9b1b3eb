//! Remote Call Gateway
//!
//! Invokes named backend operations (Supabase edge functions fronting the
//! Notion workspace) and hands back a [`RemoteResult`]. A gateway never fails
//! to its caller: transport errors, non-2xx statuses and undecodable bodies
//! all come back as `success: false` with an error string.

pub mod error;
pub mod http;
pub mod normalize;


use async_trait::async_trait;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;

pub use error::{GatewayError, Result};
pub use http::HttpGateway;
pub use normalize::{normalize, RawResponse};

// ============================================================================
// Operations
// ============================================================================

/// Backend operations known to the product.
///
/// The gateway accepts any operation name; this enum only names the ones
/// the crate calls itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FetchEnvironments,
    FetchCreatures,
    FetchCampaigns,
    FetchSessions,
    GenerateEncounter,
    DiscoverNotionDatabases,
    GetNotionSchema,
    FixAlignments,
    FixCreatureTypes,
}

impl Operation {
    pub const ALL: [Operation; 9] = [
        Operation::FetchEnvironments,
        Operation::FetchCreatures,
        Operation::FetchCampaigns,
        Operation::FetchSessions,
        Operation::GenerateEncounter,
        Operation::DiscoverNotionDatabases,
        Operation::GetNotionSchema,
        Operation::FixAlignments,
        Operation::FixCreatureTypes,
    ];

    /// Function name as deployed.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::FetchEnvironments => "fetch-environments",
            Operation::FetchCreatures => "fetch-creatures",
            Operation::FetchCampaigns => "fetch-campaigns",
            Operation::FetchSessions => "fetch-sessions",
            Operation::GenerateEncounter => "generate-encounter",
            Operation::DiscoverNotionDatabases => "discover-notion-databases",
            Operation::GetNotionSchema => "get-notion-schema",
            Operation::FixAlignments => "fix-alignments",
            Operation::FixCreatureTypes => "fix-creature-types",
        }
    }

    pub fn from_name(name: &str) -> Option<Operation> {
        Operation::ALL.iter().copied().find(|op| op.as_str() == name)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Remote Result
// ============================================================================

/// Normalized outcome of a remote call.
///
/// Exactly one of data/error is present; `status` is optional metadata
/// carried in either case.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResult<T> {
    outcome: std::result::Result<T, String>,
    status: Option<u16>,
}

impl<T> RemoteResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            outcome: Ok(data),
            status: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            outcome: Err(error.into()),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn data(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&str> {
        self.outcome.as_ref().err().map(String::as_str)
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn into_result(self) -> std::result::Result<T, String> {
        self.outcome
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RemoteResult<U> {
        RemoteResult {
            outcome: self.outcome.map(f),
            status: self.status,
        }
    }

    /// Fallible conversion of the payload; a failing conversion turns the
    /// result into an error while keeping the status.
    pub fn and_then<U>(
        self,
        f: impl FnOnce(T) -> std::result::Result<U, String>,
    ) -> RemoteResult<U> {
        RemoteResult {
            outcome: self.outcome.and_then(f),
            status: self.status,
        }
    }
}

impl<T: Serialize> Serialize for RemoteResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let len = 2 + usize::from(self.status.is_some());
        let mut state = serializer.serialize_struct("RemoteResult", len)?;
        state.serialize_field("success", &self.is_success())?;
        match &self.outcome {
            Ok(data) => state.serialize_field("data", data)?,
            Err(error) => state.serialize_field("error", error)?,
        }
        if let Some(status) = self.status {
            state.serialize_field("status", &status)?;
        } else {
            state.skip_field("status")?;
        }
        state.end()
    }
}

// ============================================================================
// Gateway Trait
// ============================================================================

/// Invokes a named backend operation.
///
/// Implementations issue exactly one outbound call per invocation and never
/// retry; retrying is the caller's business.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn invoke(&self, operation: &str, payload: Option<Value>) -> RemoteResult<Value>;

    async fn call(&self, operation: Operation, payload: Option<Value>) -> RemoteResult<Value> {
        self.invoke(operation.as_str(), payload).await
    }
}

//! Artifact metadata store access for Rode.
//!
//! Occurrences are the raw material of every policy evaluation: build
//! provenance links a source revision to the artifacts it produced, and the
//! remaining records (vulnerability scans, attestations, deployments) are
//! handed to the rule engine verbatim.
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `RODE_GRAFEAS_URL` | Store base URL (default: `http://localhost:8080`) |
//! | `RODE_GRAFEAS_TIMEOUT` | Request timeout in seconds (default: 30) |

pub mod client;
pub mod error;
pub mod store;
pub mod types;

pub use client::{GrafeasClient, GRAFEAS_USER_AGENT};
pub use error::{GrafeasError, GrafeasResult};
pub use store::OccurrenceStore;
pub use types::{
    Artifact, BuildDetails, BuildProvenance, GrafeasConfig, ListOccurrencesRequest,
    ListOccurrencesResponse, NoteKind, Occurrence, Resource, MAX_PAGE_SIZE, RODE_PROJECT,
};

//! Resource identification and occurrence lineage.

pub mod resolver;
pub mod uri;

pub use resolver::{ResolvedResource, ResourceVersion, ResourceVersionResolver};
pub use uri::{distinct_resources, ResourceIdentity, ResourceType, ResourceUri, UnrecognizedResourceType};

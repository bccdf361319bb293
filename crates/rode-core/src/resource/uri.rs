//! Resource URI classification.
//!
//! Patterns are tried in a fixed order and the first match wins. The bare
//! Docker digest form has no scheme and is always tried last.

use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    Debian,
    Docker,
    Generic,
    Git,
    Maven,
    Npm,
    Nuget,
    Pip,
    Rpm,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debian => "DEBIAN",
            Self::Docker => "DOCKER",
            Self::Generic => "GENERIC",
            Self::Git => "GIT",
            Self::Maven => "MAVEN",
            Self::Npm => "NPM",
            Self::Nuget => "NUGET",
            Self::Pip => "PIP",
            Self::Rpm => "RPM",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to parse resource uri {uri}: unrecognized resource type")]
pub struct UnrecognizedResourceType {
    pub uri: String,
}

const PATTERNS: &[(ResourceType, &str)] = &[
    (
        ResourceType::Debian,
        r"^deb://(?P<dist>[^:]*):(?P<arch>[^:]*):(?P<name>[^:]+):(?P<version>.+)$",
    ),
    (ResourceType::Git, r"^git://(?P<name>[^@]+)@(?P<version>[^@]+)$"),
    (
        ResourceType::Maven,
        r"^gav://(?P<name>[^:]+:[^:]+):(?P<version>[^:]+)$",
    ),
    (ResourceType::Npm, r"^npm://(?P<name>[^:]+):(?P<version>.+)$"),
    (ResourceType::Nuget, r"^nuget://(?P<name>[^:]+):(?P<version>.+)$"),
    (ResourceType::Pip, r"^pip://(?P<name>[^:]+):(?P<version>.+)$"),
    (
        ResourceType::Rpm,
        r"^rpm://(?P<dist>[^:]*):(?P<arch>[^:]*):(?P<name>[^:]+):(?P<version>.+)$",
    ),
    (
        ResourceType::Generic,
        r"^generic://(?P<name>[^@]+)@(?P<version>.+)$",
    ),
    (
        ResourceType::Docker,
        r"^(?:https?://)?(?P<name>[^@]+)@sha256:(?P<version>[a-fA-F0-9]+)$",
    ),
];

fn patterns() -> &'static [(ResourceType, Regex)] {
    static COMPILED: OnceLock<Vec<(ResourceType, Regex)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PATTERNS
            .iter()
            .map(|(kind, pattern)| {
                (
                    *kind,
                    Regex::new(pattern).expect("resource uri patterns are valid"),
                )
            })
            .collect()
    })
}

/// A resource URI decomposed into name and version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUri {
    pub name: String,
    pub version: String,
    pub resource_type: ResourceType,
}

impl ResourceUri {
    pub fn parse(uri: &str) -> Result<Self, UnrecognizedResourceType> {
        patterns()
            .iter()
            .find_map(|(kind, pattern)| {
                let captures = pattern.captures(uri)?;
                Some(Self {
                    name: captures.name("name")?.as_str().to_string(),
                    version: captures.name("version")?.as_str().to_string(),
                    resource_type: *kind,
                })
            })
            .ok_or_else(|| UnrecognizedResourceType {
                uri: uri.to_string(),
            })
    }

    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity {
            resource_type: self.resource_type,
            name: self.name.clone(),
        }
    }
}

/// The logical artifact behind a URI, independent of its version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentity {
    pub resource_type: ResourceType,
    pub name: String,
}

impl ResourceIdentity {
    /// `TYPE:name`
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource_type, self.name)
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.name)
    }
}

/// Parse `uris`, keeping the first URI seen for each logical artifact.
/// Unrecognized URIs are skipped.
pub fn distinct_resources<'a>(uris: impl IntoIterator<Item = &'a str>) -> Vec<ResourceUri> {
    let mut seen = HashSet::new();
    uris.into_iter()
        .filter_map(|uri| ResourceUri::parse(uri).ok())
        .filter(|resource| seen.insert(resource.identity().key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(uri: &str) -> (ResourceType, String, String) {
        let parsed = ResourceUri::parse(uri).unwrap();
        (parsed.resource_type, parsed.name, parsed.version)
    }

    #[test]
    fn test_git() {
        assert_eq!(
            parse("git://github.com/a/b@deadbeef"),
            (ResourceType::Git, "github.com/a/b".into(), "deadbeef".into())
        );
    }

    #[test]
    fn test_unknown_scheme() {
        let err = ResourceUri::parse("foo://bar").unwrap_err();
        assert_eq!(err.uri, "foo://bar");
    }

    #[test]
    fn test_docker_with_and_without_scheme() {
        let digest = "a".repeat(64);
        assert_eq!(
            parse(&format!("harbor.io/rode/demo@sha256:{}", digest)),
            (ResourceType::Docker, "harbor.io/rode/demo".into(), digest.clone())
        );
        assert_eq!(
            parse(&format!("https://harbor.io/rode/demo@sha256:{}", digest)).1,
            "harbor.io/rode/demo"
        );
    }

    #[test]
    fn test_prefixed_uri_never_falls_back_to_docker() {
        assert_eq!(parse("git://repo@sha256:abc").0, ResourceType::Git);
        assert_eq!(parse("npm://@sha256:abc").0, ResourceType::Npm);
    }

    #[test]
    fn test_package_schemes() {
        assert_eq!(
            parse("deb://buster:amd64:openssl:1.1.1d-0+deb10u6"),
            (ResourceType::Debian, "openssl".into(), "1.1.1d-0+deb10u6".into())
        );
        assert_eq!(
            parse("deb://:amd64:openssl:1:1.1.1"),
            (ResourceType::Debian, "openssl".into(), "1:1.1.1".into())
        );
        assert_eq!(
            parse("gav://org.apache:commons-lang3:3.12.0"),
            (ResourceType::Maven, "org.apache:commons-lang3".into(), "3.12.0".into())
        );
        assert_eq!(
            parse("npm://@rode/client:1.2.3"),
            (ResourceType::Npm, "@rode/client".into(), "1.2.3".into())
        );
        assert_eq!(parse("nuget://Newtonsoft.Json:13.0.1").0, ResourceType::Nuget);
        assert_eq!(parse("pip://requests:2.25.1").1, "requests");
        assert_eq!(
            parse("rpm://el8:x86_64:bash:4.4.19"),
            (ResourceType::Rpm, "bash".into(), "4.4.19".into())
        );
        assert_eq!(
            parse("generic://report.pdf@v2"),
            (ResourceType::Generic, "report.pdf".into(), "v2".into())
        );
    }

    #[test]
    fn test_distinct_resources_by_identity() {
        let resources = distinct_resources([
            "git://github.com/a/b@1",
            "git://github.com/a/b@2",
            "npm://left-pad:1.0.0",
            "foo://bar",
        ]);
        let keys: Vec<String> = resources.iter().map(|r| r.identity().key()).collect();
        assert_eq!(keys, vec!["GIT:github.com/a/b", "NPM:left-pad"]);
        assert_eq!(resources[0].version, "1");
    }
}

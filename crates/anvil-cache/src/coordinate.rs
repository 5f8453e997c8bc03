use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Identifies one cached build product.
///
/// The string form is `group:artifactId:version:type[:classifier]`; the same
/// inputs always give the same coordinate.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactCoordinate {
    group: String,
    artifact_id: String,
    version: String,
    kind: String,
    classifier: Option<String>,
}

impl ArtifactCoordinate {
    pub fn new(
        group: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            kind: kind.into(),
            classifier: None,
        }
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// File extension of the artifact (`jar`, `zip`).
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    pub fn is_snapshot(&self) -> bool {
        self.version.ends_with("-SNAPSHOT")
    }

    /// `artifactId-version[-classifier].type`
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, classifier, self.kind
            ),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.kind),
        }
    }

    /// Maven-style location relative to a repository root.
    pub fn relative_path(&self) -> PathBuf {
        let mut path: PathBuf = self.group.split('.').collect();
        path.push(&self.artifact_id);
        path.push(&self.version);
        path.push(self.file_name());
        path
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.group, self.artifact_id, self.version, self.kind
        )?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        Ok(())
    }
}

impl FromStr for ArtifactCoordinate {
    type Err = CacheError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| CacheError::InvalidCoordinate {
            value: value.to_string(),
            reason,
        };
        let parts: Vec<&str> = value.split(':').collect();
        if !(4..=5).contains(&parts.len()) {
            return Err(invalid("expected group:artifactId:version:type[:classifier]"));
        }
        if parts.iter().any(|part| part.is_empty()) {
            return Err(invalid("empty component"));
        }
        if parts[0].split('.').any(|segment| segment.is_empty() || segment == "..") {
            return Err(invalid("malformed group"));
        }
        if parts[1..].iter().any(|part| part.contains(['/', '\\'])) {
            return Err(invalid("path separator in component"));
        }

        let coordinate = Self::new(parts[0], parts[1], parts[2], parts[3]);
        Ok(match parts.get(4) {
            Some(classifier) => coordinate.with_classifier(*classifier),
            None => coordinate,
        })
    }
}

impl TryFrom<String> for ArtifactCoordinate {
    type Error = CacheError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ArtifactCoordinate> for String {
    fn from(value: ArtifactCoordinate) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_and_parse_agree() {
        let coordinate = ArtifactCoordinate::new("net.minecraft", "server", "1.12.2", "jar")
            .with_classifier("vanilla");
        assert_eq!(coordinate.to_string(), "net.minecraft:server:1.12.2:jar:vanilla");
        assert_eq!(
            "net.minecraft:server:1.12.2:jar:vanilla"
                .parse::<ArtifactCoordinate>()
                .unwrap(),
            coordinate
        );
    }

    #[test]
    fn relative_path_is_maven_layout() {
        let coordinate =
            ArtifactCoordinate::new("net.minecraft", "mappings-srg", "1.12.2", "zip");
        assert_eq!(
            coordinate.relative_path(),
            PathBuf::from("net/minecraft/mappings-srg/1.12.2/mappings-srg-1.12.2.zip")
        );
    }

    #[test]
    fn snapshot_versions_are_detected() {
        let coordinate =
            ArtifactCoordinate::new("net.minecraft", "mappings-mcp", "0.0.0-SNAPSHOT", "zip");
        assert!(coordinate.is_snapshot());
    }

    #[test]
    fn malformed_coordinates_are_rejected() {
        for value in ["a:b:c", "a:b:c:d:e:f", "a::c:d", "a..b:c:d:e", "a:b/../c:d:e"] {
            assert!(
                value.parse::<ArtifactCoordinate>().is_err(),
                "{value} should not parse"
            );
        }
    }
}

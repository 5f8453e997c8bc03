use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::AccessError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Visibility {
    Public,
    Protected,
    /// No keyword.
    PackagePrivate,
    Private,
}

impl Visibility {
    /// Source keyword, `None` for package-private.
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            Self::Public => Some("public"),
            Self::Protected => Some("protected"),
            Self::PackagePrivate => None,
            Self::Private => Some("private"),
        }
    }

    pub(crate) fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "public" => Some(Self::Public),
            "protected" => Some(Self::Protected),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword().unwrap_or("package-private"))
    }
}

impl FromStr for Visibility {
    type Err = AccessError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "protected" => Ok(Self::Protected),
            "private" => Ok(Self::Private),
            "package-private" | "package_private" | "default" => Ok(Self::PackagePrivate),
            _ => Err(AccessError::InvalidVisibility {
                value: value.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Visibility {
    type Error = AccessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("PUBLIC".parse::<Visibility>().unwrap(), Visibility::Public);
        assert_eq!(
            "Package-Private".parse::<Visibility>().unwrap(),
            Visibility::PackagePrivate
        );
        assert_eq!(
            "PACKAGE_PRIVATE".parse::<Visibility>().unwrap(),
            Visibility::PackagePrivate
        );
        assert_eq!("default".parse::<Visibility>().unwrap(), Visibility::PackagePrivate);
        assert!("friend".parse::<Visibility>().is_err());
    }
}

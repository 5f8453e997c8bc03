use std::fmt;
use std::str::FromStr;

use crate::error::MappingError;

/// Side code of CSV rows that apply to both the client and the server.
pub const BOTH_SIDES_CODE: u8 = 2;

/// Build variant selecting which CSV rows apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Client,
    Server,
}

impl Side {
    pub fn code(self) -> u8 {
        match self {
            Side::Client => 0,
            Side::Server => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Client => "client",
            Side::Server => "server",
        }
    }

    /// Whether a row tagged with `code` applies to this side.
    pub fn accepts(self, code: u8) -> bool {
        code == BOTH_SIDES_CODE || code == self.code()
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = MappingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Side::Client),
            "server" => Ok(Side::Server),
            _ => Err(MappingError::UnknownSide {
                value: value.to_string(),
            }),
        }
    }
}

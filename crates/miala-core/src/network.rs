//! Nigerian mobile network detection by number prefix.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MialaError, MialaResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Network {
    #[serde(rename = "MTN")]
    Mtn,
    #[serde(rename = "Airtel")]
    Airtel,
    #[serde(rename = "Glo")]
    Glo,
    #[serde(rename = "9mobile")]
    NineMobile,
    #[serde(rename = "MTEL")]
    Mtel,
}

const PREFIXES: &[(Network, &[&str])] = &[
    (
        Network::Mtn,
        &[
            "0803", "0806", "0703", "0706", "0810", "0813", "0814", "0816", "0903", "0906",
            "0913", "0916",
        ],
    ),
    (
        Network::Airtel,
        &[
            "0802", "0808", "0708", "0701", "0812", "0901", "0902", "0904", "0907", "0912",
        ],
    ),
    (
        Network::Glo,
        &["0805", "0807", "0705", "0811", "0815", "0905", "0915"],
    ),
    (
        Network::NineMobile,
        &["0809", "0817", "0818", "0908", "0909"],
    ),
    (Network::Mtel, &["0804"]),
];

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mtn => "MTN",
            Network::Airtel => "Airtel",
            Network::Glo => "Glo",
            Network::NineMobile => "9mobile",
            Network::Mtel => "MTEL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        PREFIXES
            .iter()
            .map(|(network, _)| *network)
            .find(|network| network.as_str() == s)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the carrier of `number`: a known four-digit prefix followed by
/// at least one more digit, all digits.
pub fn detect_network(number: &str) -> MialaResult<Network> {
    let number = number.trim();
    for (network, prefixes) in PREFIXES {
        for prefix in *prefixes {
            if let Some(rest) = number.strip_prefix(prefix)
                && !rest.is_empty()
                && rest.bytes().all(|b| b.is_ascii_digit())
            {
                return Ok(*network);
            }
        }
    }
    Err(MialaError::Validation {
        message: format!("Invalid phone number: {number}"),
    })
}

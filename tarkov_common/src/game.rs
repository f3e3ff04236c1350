//! Game modes and trader currencies

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Game mode: two parallel universes with independent flea prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GameMode {
    Pvp,
    Pve,
}

impl GameMode {
    pub const ALL: [GameMode; 2] = [GameMode::Pvp, GameMode::Pve];

    /// Database / wire literal
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Pvp => "PVP",
            GameMode::Pve => "PVE",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PVP" => Ok(GameMode::Pvp),
            "PVE" => Ok(GameMode::Pve),
            other => Err(format!("unknown game mode: {}", other)),
        }
    }
}

/// Currency a trader price is denominated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "₽")]
    Rouble,
    #[serde(rename = "$")]
    Dollar,
    #[serde(rename = "€")]
    Euro,
}

impl Currency {
    /// The symbol used by tarkov-market and stored in the database
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Rouble => "₽",
            Currency::Dollar => "$",
            Currency::Euro => "€",
        }
    }

    /// Look up a currency by its symbol.
    ///
    /// Unknown or missing symbols fall back to roubles, which is what the
    /// market reports for items without a trader offer.
    pub fn from_symbol(symbol: Option<&str>) -> Self {
        match symbol.map(str::trim) {
            Some("$") => Currency::Dollar,
            Some("€") => Currency::Euro,
            Some("₽") | Some("") | None => Currency::Rouble,
            Some(other) => {
                log::debug!("Unknown trader currency '{}', assuming roubles", other);
                Currency::Rouble
            }
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

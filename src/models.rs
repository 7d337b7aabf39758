//! Feed entities.
//!
//! All of these are owned and shaped by the remote feed; they are decoded once
//! and never mutated locally. Fields the feed may omit default to empty values
//! so a sparse payload still decodes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque snapshot identifier of the feed (e.g. `"14.1.1"`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(pub String);

impl Version {
    pub fn new(v: impl Into<String>) -> Self {
        Version(v.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Version(s.to_string())
    }
}

/// Sprite/image descriptor attached to most entities.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageRef {
    pub full: String,
    pub sprite: String,
    pub group: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChampionInfo {
    pub attack: u8,
    pub defense: u8,
    pub magic: u8,
    pub difficulty: u8,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChampionSummary {
    pub id: String,
    pub key: String,
    pub name: String,
    pub title: String,
    pub blurb: String,
    pub tags: Vec<String>,
    pub info: ChampionInfo,
    pub image: ImageRef,
    pub partype: String,
}

impl ChampionSummary {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Passive {
    pub name: String,
    pub description: String,
    pub image: ImageRef,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Spell {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tooltip: String,
    pub maxrank: u8,
    pub cooldown_burn: String,
    pub cost_burn: String,
    pub range_burn: String,
    pub image: ImageRef,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Skin {
    pub id: String,
    pub num: u32,
    pub name: String,
    pub chromas: bool,
}

/// Full champion record, fetched lazily when a detail view is opened.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChampionDetail {
    #[serde(flatten)]
    pub summary: ChampionSummary,
    pub lore: String,
    pub passive: Passive,
    pub spells: Vec<Spell>,
    pub skins: Vec<Skin>,
    pub allytips: Vec<String>,
    pub enemytips: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gold {
    pub base: u32,
    pub total: u32,
    pub sell: u32,
    pub purchasable: bool,
}

/// Item catalog entry. The id is the key of the feed's item map.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    #[serde(skip_deserializing)]
    pub id: String,
    pub name: String,
    pub description: String,
    pub plaintext: String,
    pub tags: Vec<String>,
    pub gold: Gold,
    pub into: Vec<String>,
    pub from: Vec<String>,
    pub image: ImageRef,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameMap {
    #[serde(rename = "MapId")]
    pub map_id: String,
    #[serde(rename = "MapName")]
    pub map_name: String,
    pub image: ImageRef,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Rune {
    pub id: u32,
    pub key: String,
    pub icon: String,
    pub name: String,
    pub short_desc: String,
    pub long_desc: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuneSlot {
    pub runes: Vec<Rune>,
}

/// One rune path (Precision, Domination, ...).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuneTree {
    pub id: u32,
    pub key: String,
    pub icon: String,
    pub name: String,
    pub slots: Vec<RuneSlot>,
}

impl GameMap {
    /// Queue the map is played in, by well-known map id.
    pub fn game_mode(&self) -> &'static str {
        match self.map_id.as_str() {
            "8" => "The Crystal Scar (Dominion)",
            "10" => "Twisted Treeline (3v3)",
            "11" => "Summoner's Rift (5v5)",
            "12" => "Howling Abyss (ARAM)",
            "21" => "Nexus Blitz",
            "22" => "Convergence (Arena)",
            _ => "Unknown game mode",
        }
    }
}

impl RuneTree {
    /// Keystones are the runes of the first slot.
    pub fn keystones(&self) -> &[Rune] {
        self.slots.first().map(|s| s.runes.as_slice()).unwrap_or(&[])
    }
}

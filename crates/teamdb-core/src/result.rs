//! Engine result document and submission payload

use crate::error::{Error, Result};
use crate::types::{Talents, TeamMember};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Position of energy recharge in a character's raw stat vector.
pub const ENERGY_RECHARGE_INDEX: usize = 7;

/// Key of the single-target entry in `damage_by_char_by_targets`.
const SINGLE_TARGET: &str = "1";

/// Aggregate statistics of a sampled quantity
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct FloatStats {
    #[serde(default)]
    pub min: f64,
    #[serde(default)]
    pub max: f64,
    #[serde(default)]
    pub mean: f64,
    #[serde(default)]
    pub sd: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TargetDetail {
    #[serde(default)]
    pub level: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct WeaponDetail {
    pub name: String,
    #[serde(default)]
    pub refine: u32,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub max_level: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CharacterDetail {
    pub name: String,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub max_level: u32,
    #[serde(default)]
    pub cons: u32,
    pub weapon: WeaponDetail,
    #[serde(default)]
    pub stats: Vec<f64>,
    #[serde(default)]
    pub talents: Talents,
}

impl CharacterDetail {
    /// Energy recharge read from the raw stat vector.
    pub fn energy_recharge(&self) -> Result<f64> {
        self.stats
            .get(ENERGY_RECHARGE_INDEX)
            .copied()
            .ok_or_else(|| {
                Error::decode(
                    format!("char_details[{}].stats", self.name),
                    format!(
                        "expected at least {} stats, found {}",
                        ENERGY_RECHARGE_INDEX + 1,
                        self.stats.len()
                    ),
                )
            })
    }

    pub fn to_member(&self) -> Result<TeamMember> {
        Ok(TeamMember {
            name: self.name.clone(),
            con: self.cons,
            weapon: self.weapon.name.clone(),
            refine: self.weapon.refine,
            er: self.energy_recharge()?,
            talents: self.talents,
        })
    }
}

/// Raw structured output of one engine run.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ComputationResult {
    #[serde(rename = "sim_duration")]
    pub duration: FloatStats,
    pub dps: FloatStats,
    #[serde(rename = "target_details", default)]
    pub targets: Vec<TargetDetail>,
    #[serde(rename = "char_details")]
    pub characters: Vec<CharacterDetail>,
    #[serde(rename = "damage_by_char_by_targets", default)]
    pub damage_by_character: Vec<BTreeMap<String, FloatStats>>,
}

impl ComputationResult {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::decode("engine result", e.to_string()))
    }

    /// Team members built from the character details, sorted by name.
    pub fn team(&self) -> Result<Vec<TeamMember>> {
        let mut team = self
            .characters
            .iter()
            .map(CharacterDetail::to_member)
            .collect::<Result<Vec<_>>>()?;
        team.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(team)
    }

    /// The character with the largest single-target damage contribution.
    pub fn top_contributor(&self) -> Option<&CharacterDetail> {
        top_contributor(&self.characters, &self.damage_by_character)
    }

    pub fn character_names(&self) -> Vec<&str> {
        self.characters.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Decoded payload of an external submission.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SubmissionData {
    #[serde(rename = "config_file")]
    pub config: String,
    #[serde(rename = "char_details", default)]
    pub characters: Vec<CharacterDetail>,
    #[serde(default)]
    pub dps: FloatStats,
    #[serde(default)]
    pub target_count: usize,
    #[serde(rename = "damage_by_char_by_targets", default)]
    pub damage_by_character: Vec<BTreeMap<String, FloatStats>>,
}

impl SubmissionData {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::decode("submission", e.to_string()))
    }

    pub fn top_contributor(&self) -> Option<&CharacterDetail> {
        top_contributor(&self.characters, &self.damage_by_character)
    }

    pub fn character_names(&self) -> Vec<&str> {
        self.characters.iter().map(|c| c.name.as_str()).collect()
    }
}

fn top_contributor<'a>(
    characters: &'a [CharacterDetail],
    damage: &[BTreeMap<String, FloatStats>],
) -> Option<&'a CharacterDetail> {
    let mut best: Option<(usize, f64)> = None;
    for (i, by_targets) in damage.iter().enumerate() {
        let mean = by_targets.get(SINGLE_TARGET).map(|s| s.mean).unwrap_or(0.0);
        if mean > best.map(|(_, m)| m).unwrap_or(0.0) {
            best = Some((i, mean));
        }
    }
    best.and_then(|(i, _)| characters.get(i))
}

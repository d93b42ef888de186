//! Identity registry — canonical character names, storage buckets and abbreviations.
//!
//! Engine output names characters by a lowercase key ("hutao"); the catalog
//! stores teams under a bucket directory named after the canonical name
//! ("Hu Tao") and derives file names from two-letter abbreviations ("ht").

use crate::error::{Error, Result};
use std::collections::HashMap;

/// Filler entity used to pad rosters smaller than a full team.
pub const FILLER: &str = "Paimon";

/// Number of members in a full team.
pub const TEAM_SIZE: usize = 4;

/// Registry entry for one playable character.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Identity {
    /// Engine key, e.g. "tartaglia".
    pub key: &'static str,
    /// Canonical name, also the storage bucket, e.g. "Childe".
    pub bucket: &'static str,
    pub abbreviation: &'static str,
}

const fn id(key: &'static str, bucket: &'static str, abbreviation: &'static str) -> Identity {
    Identity { key, bucket, abbreviation }
}

const BUILTIN: &[Identity] = &[
    id("ayato", "Ayato", "at"),
    id("yaemiko", "Yae", "ya"),
    id("shenhe", "Shenhe", "sh"),
    id("yunjin", "Yun Jin", "yj"),
    id("itto", "Itto", "it"),
    id("gorou", "Gorou", "gr"),
    id("thoma", "Thoma", "tm"),
    id("kokomi", "Kokomi", "kk"),
    id("raiden", "Raiden", "rd"),
    id("sara", "Sara", "sr"),
    id("aloy", "Aloy", "al"),
    id("yoimiya", "Yoimiya", "ym"),
    id("sayu", "Sayu", "sy"),
    id("ayaka", "Ayaka", "ay"),
    id("kazuha", "Kazuha", "kz"),
    id("eula", "Eula", "eu"),
    id("yanfei", "Yanfei", "yf"),
    id("rosaria", "Rosaria", "rs"),
    id("hutao", "Hu Tao", "ht"),
    id("xiao", "Xiao", "xa"),
    id("ganyu", "Ganyu", "gy"),
    id("albedo", "Albedo", "ab"),
    id("zhongli", "Zhongli", "zl"),
    id("xinyan", "Xinyan", "xy"),
    id("tartaglia", "Childe", "ch"),
    id("diona", "Diona", "dn"),
    id("klee", "Klee", "kl"),
    id("venti", "Venti", "vn"),
    id("keqing", "Keqing", "kq"),
    id("mona", "Mona", "mn"),
    id("qiqi", "Qiqi", "qq"),
    id("diluc", "Diluc", "dl"),
    id("jean", "Jean", "jn"),
    id("sucrose", "Sucrose", "sc"),
    id("chongyun", "Chongyun", "cy"),
    id("noelle", "Noelle", "nl"),
    id("bennett", "Bennett", "bn"),
    id("fischl", "Fischl", "fs"),
    id("ningguang", "Ningguang", "ng"),
    id("xingqiu", "Xingqiu", "xq"),
    id("beidou", "Beidou", "bd"),
    id("xiangling", "Xiangling", "xl"),
    id("razor", "Razor", "rz"),
    id("barbara", "Barbara", "bb"),
    id("lisa", "Lisa", "ls"),
    id("kaeya", "Kaeya", "ky"),
    id("amber", "Amber", "am"),
    id("paimon", "Paimon", "pm"),
    id("travelergeo", "GMC", "gc"),
    id("travelerelectro", "EMC", "em"),
    id("yelan", "Yelan", "yl"),
];

/// Read-only lookup from engine keys and canonical names to identities.
#[derive(Clone, Debug)]
pub struct IdentityRegistry {
    by_key: HashMap<String, Identity>,
    by_bucket: HashMap<String, Identity>,
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl IdentityRegistry {
    /// Registry over the builtin character table.
    pub fn builtin() -> Self {
        Self::from_identities(BUILTIN.iter().copied())
    }

    pub fn from_identities(identities: impl IntoIterator<Item = Identity>) -> Self {
        let mut by_key = HashMap::new();
        let mut by_bucket = HashMap::new();
        for identity in identities {
            by_key.insert(identity.key.to_string(), identity);
            by_bucket.insert(identity.bucket.to_string(), identity);
        }
        Self { by_key, by_bucket }
    }

    /// Resolve an engine key (case-insensitive) or a canonical name.
    pub fn resolve(&self, name: &str) -> Result<Identity> {
        self.by_key
            .get(&name.to_lowercase())
            .or_else(|| self.by_bucket.get(name))
            .copied()
            .ok_or_else(|| Error::UnknownEntity(name.to_string()))
    }

    pub fn bucket_for(&self, name: &str) -> Result<&'static str> {
        self.resolve(name).map(|i| i.bucket)
    }

    pub fn abbreviation_for(&self, name: &str) -> Result<&'static str> {
        self.resolve(name).map(|i| i.abbreviation)
    }

    /// Derive the catalog name of a team.
    ///
    /// The roster is padded with [`FILLER`] up to [`TEAM_SIZE`], canonical
    /// names are sorted, and their abbreviations concatenated.
    pub fn team_name<S: AsRef<str>>(&self, roster: &[S]) -> Result<String> {
        let mut buckets = roster
            .iter()
            .map(|n| self.bucket_for(n.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        while buckets.len() < TEAM_SIZE {
            buckets.push(self.bucket_for(FILLER)?);
        }
        buckets.sort_unstable();

        let mut name = String::with_capacity(buckets.len() * 2);
        for bucket in buckets {
            name.push_str(self.abbreviation_for(bucket)?);
        }
        Ok(name)
    }
}

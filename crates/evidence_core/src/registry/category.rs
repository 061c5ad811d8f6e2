//! Skill categories (A best, K entry level) and gender codes used by the
//! requirement tables.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{EvidenceError, Result};

/// Skill category, A (elite) through K (entry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[cfg_attr(test, derive(strum_macros::EnumIter))]
pub enum SkillCategory {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
}

impl SkillCategory {
    pub const ALL: [SkillCategory; 11] = [
        SkillCategory::A,
        SkillCategory::B,
        SkillCategory::C,
        SkillCategory::D,
        SkillCategory::E,
        SkillCategory::F,
        SkillCategory::G,
        SkillCategory::H,
        SkillCategory::I,
        SkillCategory::J,
        SkillCategory::K,
    ];

    /// Position in target tables (A = 0)
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The category a player advances into, `None` for A
    pub fn next_up(&self) -> Option<SkillCategory> {
        self.index().checked_sub(1).map(|i| SkillCategory::ALL[i])
    }

    pub fn letter(&self) -> char {
        (b'A' + *self as u8) as char
    }
}

impl fmt::Display for SkillCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for SkillCategory {
    type Err = EvidenceError;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => SkillCategory::ALL
                .iter()
                .find(|category| category.letter() == c.to_ascii_uppercase())
                .copied()
                .ok_or_else(|| EvidenceError::InvalidCategory(s.to_string())),
            _ => Err(EvidenceError::InvalidCategory(s.to_string())),
        }
    }
}

/// Gender code as stored by the academy (`M` men, `K` women)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "K", alias = "F")]
    Female,
}

impl Gender {
    pub fn code(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "K",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Gender {
    type Err = EvidenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "M" => Ok(Gender::Male),
            "K" | "F" => Ok(Gender::Female),
            _ => Err(EvidenceError::InvalidGender(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_next_up_walks_towards_a() {
        assert_eq!(SkillCategory::D.next_up(), Some(SkillCategory::C));
        assert_eq!(SkillCategory::K.next_up(), Some(SkillCategory::J));
        assert_eq!(SkillCategory::B.next_up(), Some(SkillCategory::A));
        assert_eq!(SkillCategory::A.next_up(), None);
    }

    #[test]
    fn test_category_letters_round_trip() {
        for category in SkillCategory::iter() {
            let parsed: SkillCategory = category.to_string().parse().unwrap();
            assert_eq!(parsed, category);
            assert_eq!(SkillCategory::ALL[category.index()], category);
        }
        assert_eq!("c".parse::<SkillCategory>().unwrap(), SkillCategory::C);
        assert!("L".parse::<SkillCategory>().is_err());
        assert!("AB".parse::<SkillCategory>().is_err());
        assert!("".parse::<SkillCategory>().is_err());
    }

    #[test]
    fn test_gender_codes() {
        assert_eq!("M".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!("k".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!("F".parse::<Gender>().unwrap(), Gender::Female);
        assert!("X".parse::<Gender>().is_err());
        assert_eq!(serde_json::to_string(&Gender::Female).unwrap(), "\"K\"");
    }
}

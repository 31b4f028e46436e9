//! Ranked ladder model used to classify a [`RankUpdate`] as a promotion or
//! a demotion.
//!
//! Ranks are written `"<TIER> <DIVISION>"`, e.g. `"GOLD II"` or `"gold 2"`.
//! Apex tiers (`MASTER`, `GRANDMASTER`, `CHALLENGER`) have no division.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use strum_macros::Display;

use super::types::response::RankUpdate;
use crate::error::Error;

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Tier {
    Iron,
    Bronze,
    Silver,
    Gold,
    Platinum,
    Emerald,
    Diamond,
    Master,
    Grandmaster,
    Challenger,
}

impl Tier {
    /// Apex tiers are a single ladder without divisions.
    #[must_use]
    pub const fn is_apex(self) -> bool {
        matches!(self, Self::Master | Self::Grandmaster | Self::Challenger)
    }
}

impl FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tier = match s.to_ascii_uppercase().as_str() {
            "IRON" => Self::Iron,
            "BRONZE" => Self::Bronze,
            "SILVER" => Self::Silver,
            "GOLD" => Self::Gold,
            "PLATINUM" => Self::Platinum,
            "EMERALD" => Self::Emerald,
            "DIAMOND" => Self::Diamond,
            "MASTER" => Self::Master,
            "GRANDMASTER" => Self::Grandmaster,
            "CHALLENGER" => Self::Challenger,
            _ => return Err(Error::validation(format!("unknown tier {s}"))),
        };
        Ok(tier)
    }
}

/// Division within a tier, written in roman numerals; `IV` is the lowest.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum Division {
    #[strum(serialize = "IV")]
    Four,
    #[strum(serialize = "III")]
    Three,
    #[strum(serialize = "II")]
    Two,
    #[strum(serialize = "I")]
    One,
}

impl FromStr for Division {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let division = match s.to_ascii_uppercase().as_str() {
            "IV" | "4" => Self::Four,
            "III" | "3" => Self::Three,
            "II" | "2" => Self::Two,
            "I" | "1" => Self::One,
            _ => return Err(Error::validation(format!("unknown division {s}"))),
        };
        Ok(division)
    }
}

/// A position on the ranked ladder.
///
/// Ordered by tier, then division.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rank {
    pub tier: Tier,
    /// `None` for apex tiers
    pub division: Option<Division>,
}

impl FromStr for Rank {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let tier: Tier = parts
            .next()
            .ok_or_else(|| Error::validation("empty rank"))?
            .parse()?;
        let division = parts.next().map(str::parse::<Division>).transpose()?;

        if parts.next().is_some() {
            return Err(Error::validation(format!("unexpected text in rank {s}")));
        }

        match (tier.is_apex(), division) {
            (true, Some(_)) => Err(Error::validation(format!("{tier} has no divisions"))),
            (false, None) => Err(Error::validation(format!("{tier} needs a division"))),
            _ => Ok(Self { tier, division }),
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.division {
            Some(division) => write!(f, "{} {division}", self.tier),
            None => write!(f, "{}", self.tier),
        }
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Direction {
    Promotion,
    Demotion,
}

/// A rank update that moved the player up or down the ladder.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankChange {
    pub direction: Direction,
    pub old: Rank,
    pub new: Rank,
    pub queue: Option<String>,
}

impl RankChange {
    /// One-line human readable description, e.g. `Promoted from GOLD II to GOLD I`.
    #[must_use]
    pub fn summary(&self) -> String {
        let verb = match self.direction {
            Direction::Promotion => "Promoted",
            Direction::Demotion => "Demoted",
        };
        format!("{verb} from {} to {}", self.old, self.new)
    }
}

impl RankUpdate {
    /// Classify this update.
    ///
    /// Returns `None` when the rank did not move or when either rank is not
    /// recognised.
    #[must_use]
    pub fn change(&self) -> Option<RankChange> {
        let old: Rank = self.old_rank.parse().ok()?;
        let new: Rank = self.new_rank.parse().ok()?;

        let direction = match new.cmp(&old) {
            Ordering::Greater => Direction::Promotion,
            Ordering::Less => Direction::Demotion,
            Ordering::Equal => return None,
        };

        Some(RankChange {
            direction,
            old,
            new,
            queue: self.queue.clone(),
        })
    }
}

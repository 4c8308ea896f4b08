//! Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Regional office partitioning every HE/EXMR record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
pub enum Region {
    Kro,
    Mro,
    Bro,
    Nbro,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::Kro, Region::Mro, Region::Bro, Region::Nbro];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Kro => "KRO",
            Region::Mro => "MRO",
            Region::Bro => "BRO",
            Region::Nbro => "NBRO",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "KRO" => Ok(Region::Kro),
            "MRO" => Ok(Region::Mro),
            "BRO" => Ok(Region::Bro),
            "NBRO" => Ok(Region::Nbro),
            _ => Err(format!("unknown region '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Verified identity of the caller, injected by the JWT middleware.
///
/// Regional users always carry a region; admins never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Admin { id: Uuid },
    Regional { id: Uuid, region: Region },
}

impl Caller {
    pub fn admin(id: Uuid) -> Self {
        Caller::Admin { id }
    }

    pub fn regional(id: Uuid, region: Region) -> Self {
        Caller::Regional { id, region }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Caller::Admin { id } | Caller::Regional { id, .. } => *id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Caller::Admin { .. } => Role::Admin,
            Caller::Regional { .. } => Role::User,
        }
    }

    pub fn region(&self) -> Option<Region> {
        match self {
            Caller::Admin { .. } => None,
            Caller::Regional { region, .. } => Some(*region),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Caller::Admin { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_round_trips_through_serde() {
        let json = serde_json::to_string(&Region::Nbro).unwrap();
        assert_eq!(json, "\"NBRO\"");
        let back: Region = serde_json::from_str("\"KRO\"").unwrap();
        assert_eq!(back, Region::Kro);
    }

    #[test]
    fn region_parsing_ignores_case_but_not_typos() {
        assert_eq!("kro".parse::<Region>().unwrap(), Region::Kro);
        assert_eq!(" Nbro ".parse::<Region>().unwrap(), Region::Nbro);
        assert!("XRO".parse::<Region>().is_err());
        assert!(serde_json::from_str::<Region>("\"XRO\"").is_err());
    }

    #[test]
    fn caller_exposes_role_and_region() {
        let id = Uuid::new_v4();
        let admin = Caller::admin(id);
        assert!(admin.is_admin());
        assert_eq!(admin.region(), None);
        assert_eq!(admin.role(), Role::Admin);

        let user = Caller::regional(id, Region::Mro);
        assert!(!user.is_admin());
        assert_eq!(user.region(), Some(Region::Mro));
        assert_eq!(user.role().as_str(), "user");
    }
}

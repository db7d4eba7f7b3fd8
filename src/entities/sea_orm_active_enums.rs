//! Closed string enums persisted in the marketplace tables

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of an NFT project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "suspended")]
    Suspended,
    #[sea_orm(string_value = "sold")]
    Sold,
    #[sea_orm(string_value = "deleted")]
    Deleted,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::Active => "active",
            ProjectStatus::Suspended => "suspended",
            ProjectStatus::Sold => "sold",
            ProjectStatus::Deleted => "deleted",
        }
    }

    /// `sold` and `deleted` have no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProjectStatus::Sold | ProjectStatus::Deleted)
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ProjectStatus::Draft),
            "active" => Ok(ProjectStatus::Active),
            "suspended" => Ok(ProjectStatus::Suspended),
            "sold" => Ok(ProjectStatus::Sold),
            "deleted" => Ok(ProjectStatus::Deleted),
            _ => Err(format!("Unknown project status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum ProjectCategory {
    #[sea_orm(string_value = "Art")]
    Art,
    #[sea_orm(string_value = "PFP")]
    #[serde(rename = "PFP")]
    Pfp,
    #[sea_orm(string_value = "Game")]
    Game,
    #[sea_orm(string_value = "Music")]
    Music,
    #[sea_orm(string_value = "Utility")]
    Utility,
}

impl ProjectCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectCategory::Art => "Art",
            ProjectCategory::Pfp => "PFP",
            ProjectCategory::Game => "Game",
            ProjectCategory::Music => "Music",
            ProjectCategory::Utility => "Utility",
        }
    }
}

impl FromStr for ProjectCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Art" => Ok(ProjectCategory::Art),
            "PFP" => Ok(ProjectCategory::Pfp),
            "Game" => Ok(ProjectCategory::Game),
            "Music" => Ok(ProjectCategory::Music),
            "Utility" => Ok(ProjectCategory::Utility),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum DisclosureType {
    #[sea_orm(string_value = "financial")]
    Financial,
    #[sea_orm(string_value = "license")]
    License,
    #[sea_orm(string_value = "team")]
    Team,
    #[sea_orm(string_value = "tokenomics")]
    Tokenomics,
    #[sea_orm(string_value = "other")]
    Other,
}

impl DisclosureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisclosureType::Financial => "financial",
            DisclosureType::License => "license",
            DisclosureType::Team => "team",
            DisclosureType::Tokenomics => "tokenomics",
            DisclosureType::Other => "other",
        }
    }
}

impl FromStr for DisclosureType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "financial" => Ok(DisclosureType::Financial),
            "license" => Ok(DisclosureType::License),
            "team" => Ok(DisclosureType::Team),
            "tokenomics" => Ok(DisclosureType::Tokenomics),
            "other" => Ok(DisclosureType::Other),
            _ => Err(format!("Unknown disclosure type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    #[sea_orm(string_value = "purchase")]
    Purchase,
    #[sea_orm(string_value = "valuation_completed")]
    ValuationCompleted,
}

//! Server configuration, loaded from JSON.
//!
//! Every section is optional; missing fields take their defaults.
//!
//! ```json
//! {
//!     "claims_enabled": true,
//!     "parties_enabled": true,
//!     "claims": { "player_claim_limit": 500, "expiration_ticks": 51840000 },
//!     "protection": { "claims_only": "FIRE_SPREAD" },
//!     "maintenance": { "cache_ttl_ticks": 1200 }
//! }
//! ```

use std::path::Path;

use claims_core::{Owner, TickId};
use claims_protection::ProtectionConfig;
use claims_store::{ClaimLimits, StoreSettings};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Claim limits, ranges and expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimsConfig {
    pub player_claim_limit: u32,
    pub party_claim_limit: u32,
    /// Largest rectangle, in chunks, a region command may cover.
    pub max_region_area: u64,
    /// Largest absolute chunk coordinate that can be claimed.
    pub world_border: i32,
    /// Inactivity after which an owner's claims are removed. `None` disables
    /// expiry.
    pub expiration_ticks: Option<TickId>,
    /// Owners whose claims never expire.
    pub expiration_exempt: Vec<Owner>,
}

impl Default for ClaimsConfig {
    fn default() -> Self {
        let store = StoreSettings::default();
        Self {
            player_claim_limit: store.limits.player_claims,
            party_claim_limit: store.limits.party_claims,
            max_region_area: store.max_region_area,
            world_border: store.world_border,
            expiration_ticks: None,
            expiration_exempt: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartiesConfig {
    pub max_members: usize,
}

impl Default for PartiesConfig {
    fn default() -> Self {
        Self { max_members: 64 }
    }
}

/// Tick coordinator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub cache_capacity: usize,
    pub cache_ttl_ticks: TickId,
    /// Ticks between expiry sweeps.
    pub expiry_check_interval: TickId,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        let store = StoreSettings::default();
        Self {
            cache_capacity: store.cache_capacity,
            cache_ttl_ticks: store.cache_ttl,
            // Once a minute at 20 TPS
            expiry_check_interval: 1200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub claims_enabled: bool,
    pub parties_enabled: bool,
    pub claims: ClaimsConfig,
    pub parties: PartiesConfig,
    pub protection: ProtectionConfig,
    pub maintenance: MaintenanceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            claims_enabled: true,
            parties_enabled: true,
            claims: ClaimsConfig::default(),
            parties: PartiesConfig::default(),
            protection: ProtectionConfig::default(),
            maintenance: MaintenanceConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |field, reason| Err(ConfigError::Invalid { field, reason });

        if self.claims.world_border <= 0 {
            return invalid("claims.world_border", "must be positive");
        }
        if self.claims.max_region_area == 0 {
            return invalid("claims.max_region_area", "must be positive");
        }
        if self.claims.expiration_ticks == Some(0) {
            return invalid("claims.expiration_ticks", "must be positive or null");
        }
        if self.parties.max_members == 0 {
            return invalid("parties.max_members", "must be positive");
        }
        if self.maintenance.expiry_check_interval == 0 {
            return invalid("maintenance.expiry_check_interval", "must be positive");
        }
        Ok(())
    }

    /// Store settings derived from the claims and maintenance sections.
    #[must_use]
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            limits: ClaimLimits {
                player_claims: self.claims.player_claim_limit,
                party_claims: self.claims.party_claim_limit,
            },
            world_border: self.claims.world_border,
            max_region_area: self.claims.max_region_area,
            cache_capacity: self.maintenance.cache_capacity,
            cache_ttl: self.maintenance.cache_ttl_ticks,
        }
    }
}

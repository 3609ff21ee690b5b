use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::money::FeePolicy;

/// Fee rules applied when a customer misses or cancels an appointment.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Policies {
    #[serde(default)]
    pub no_show: FeePolicy,
    #[serde(default)]
    pub cancellation: FeePolicy,
}

impl Policies {
    pub fn validate(&self) -> Result<()> {
        self.no_show.validate()?;
        self.cancellation.validate()
    }
}

/// Evidence that the customer accepted the booking policies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyConsent {
    pub policy_hash: String,
    pub accepted_at: DateTime<Utc>,
    #[serde(default)]
    pub origin: ConsentOrigin,
}

impl PolicyConsent {
    pub fn new(policy_hash: impl Into<String>, accepted_at: DateTime<Utc>) -> Self {
        Self {
            policy_hash: policy_hash.into(),
            accepted_at,
            origin: ConsentOrigin::default(),
        }
    }

    pub fn with_origin(mut self, origin: ConsentOrigin) -> Self {
        self.origin = origin;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsentOrigin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub source: String,
}

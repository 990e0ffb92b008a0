use serde::{Deserialize, Serialize};

/// Billing plan of a tenant. The coach ceiling is the only limit the auth
/// core enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Basic,
    Professional,
    Enterprise,
}

impl Plan {
    pub fn coach_limit(self) -> Option<u32> {
        match self {
            Plan::Basic => Some(2),
            Plan::Professional | Plan::Enterprise => None,
        }
    }

    pub fn parse(s: &str) -> Option<Plan> {
        match s {
            "basic" => Some(Plan::Basic),
            "professional" => Some(Plan::Professional),
            "enterprise" => Some(Plan::Enterprise),
            _ => None,
        }
    }
}

/// Tenant configuration as persisted in the object store, one JSON document
/// per tenant keyed by subdomain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantConfig {
    pub id: String,
    pub name: String,
    pub subdomain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub max_courts: u32,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<Plan>,
}

impl TenantConfig {
    /// Defaults for a freshly provisioned club.
    pub fn provision(name: &str, subdomain: &str, plan: Option<Plan>) -> Self {
        Self {
            id: subdomain.to_string(),
            name: name.to_string(),
            subdomain: subdomain.to_string(),
            logo: None,
            max_courts: 4,
            features: vec!["booking".to_string(), "coaches".to_string()],
            plan_id: plan,
        }
    }

    pub fn plan(&self) -> Plan {
        self.plan_id.unwrap_or(Plan::Basic)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Row of the `tenants` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub subdomain: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub settings: Option<Value>,
    #[serde(default)]
    pub features: Option<TenantFeatures>,
    #[serde(default, deserialize_with = "tier_or_basic")]
    pub subscription_tier: SubscriptionTier,
    #[serde(default)]
    pub subscription_status: Option<SubscriptionStatus>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Product switches stored in `tenants.features`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantFeatures {
    #[serde(default)]
    pub novumflow_enabled: Option<bool>,
    #[serde(default)]
    pub careflow_enabled: Option<bool>,
    #[serde(default)]
    pub ai_enabled: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Trial,
    #[default]
    Basic,
    Professional,
    Enterprise,
}

impl SubscriptionTier {
    /// Parse a stored tier; null or unrecognised values count as basic
    pub fn parse_or_basic(value: Option<&str>) -> Self {
        match value {
            Some("trial") => SubscriptionTier::Trial,
            Some("professional") => SubscriptionTier::Professional,
            Some("enterprise") => SubscriptionTier::Enterprise,
            _ => SubscriptionTier::Basic,
        }
    }
}

/// Tier columns are nullable and free text in older rows
fn tier_or_basic<'de, D>(deserializer: D) -> Result<SubscriptionTier, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(SubscriptionTier::parse_or_basic(raw.as_deref()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Trial,
    Cancelled,
    Suspended,
    Expired,
    #[serde(other)]
    Unknown,
}

fn default_active() -> bool {
    true
}

impl Tenant {
    /// Names listed under `settings.disabled_features`
    pub fn disabled_features(&self) -> Vec<&str> {
        self.settings
            .as_ref()
            .and_then(|s| s.get("disabled_features"))
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Shape returned by the `get_my_tenants` procedure. Every column except the
/// id may be missing, so defaults are filled in by [`RpcTenant::into_tenant`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpcTenant {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub settings: Option<Value>,
    #[serde(default)]
    pub features: Option<TenantFeatures>,
    #[serde(default, deserialize_with = "tier_or_basic")]
    pub subscription_tier: SubscriptionTier,
    #[serde(default)]
    pub subscription_status: Option<SubscriptionStatus>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl RpcTenant {
    pub fn into_tenant(self) -> Tenant {
        Tenant {
            id: self.id,
            name: self.name.unwrap_or_else(|| "Unknown Organization".to_string()),
            subdomain: self.subdomain.unwrap_or_else(|| "unknown".to_string()),
            slug: self.slug,
            logo_url: self.logo_url,
            settings: Some(self.settings.unwrap_or_else(|| Value::Object(Map::new()))),
            features: self.features,
            subscription_tier: self.subscription_tier,
            subscription_status: self.subscription_status,
            is_active: true,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rpc_tenant_fills_missing_columns() {
        let rpc: RpcTenant = serde_json::from_value(json!({
            "id": "7d6c6b62-0c7a-4f59-9a57-0d6d1f0f3a11"
        }))
        .unwrap();
        let tenant = rpc.into_tenant();
        assert_eq!(tenant.name, "Unknown Organization");
        assert_eq!(tenant.subdomain, "unknown");
        assert_eq!(tenant.subscription_tier, SubscriptionTier::Basic);
        assert_eq!(tenant.settings, Some(json!({})));
    }

    #[test]
    fn reads_disabled_features_from_settings() {
        let tenant: Tenant = serde_json::from_value(json!({
            "id": "7d6c6b62-0c7a-4f59-9a57-0d6d1f0f3a11",
            "name": "Ringwood Care",
            "subdomain": "ringwood",
            "settings": { "disabled_features": ["telehealth", 3, "rostering"] },
            "created_at": "2024-03-01T09:00:00Z"
        }))
        .unwrap();
        assert_eq!(tenant.disabled_features(), vec!["telehealth", "rostering"]);
        assert!(tenant.is_active);
    }

    #[test]
    fn null_or_unknown_tier_reads_as_basic() {
        let tenant: Tenant = serde_json::from_value(json!({
            "id": "7d6c6b62-0c7a-4f59-9a57-0d6d1f0f3a11",
            "name": "Ringwood Care",
            "subdomain": "ringwood",
            "subscription_tier": null,
            "subscription_status": null,
            "settings": null,
            "created_at": "2024-03-01T09:00:00Z"
        }))
        .unwrap();
        assert_eq!(tenant.subscription_tier, SubscriptionTier::Basic);
        assert_eq!(tenant.subscription_status, None);

        let tenant: Tenant = serde_json::from_value(json!({
            "id": "7d6c6b62-0c7a-4f59-9a57-0d6d1f0f3a11",
            "name": "Ringwood Care",
            "subdomain": "ringwood",
            "subscription_tier": "platinum",
            "subscription_status": "paused",
            "created_at": "2024-03-01T09:00:00Z"
        }))
        .unwrap();
        assert_eq!(tenant.subscription_tier, SubscriptionTier::Basic);
        assert_eq!(tenant.subscription_status, Some(SubscriptionStatus::Unknown));

        let rpc: RpcTenant = serde_json::from_value(json!({
            "id": "7d6c6b62-0c7a-4f59-9a57-0d6d1f0f3a11",
            "subscription_tier": null
        }))
        .unwrap();
        assert_eq!(rpc.into_tenant().subscription_tier, SubscriptionTier::Basic);
    }
}

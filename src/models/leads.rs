use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct Lead {
    #[serde(skip_serializing)]
    pub seq: i64,
    pub id: String,
    pub email: String,
    pub ip_address: String,
    pub name: String,
    pub phone: String,
    pub question: String,
    pub affiliate_count: i64,
    pub daily_limit: i64,
    pub extra_limit: i64,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

// Fields a caller leaves out arrive empty and are rejected by the ledger's
// required-field validation rather than by the JSON layer.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewLead {
    pub email: String,
    pub ip_address: String,
    pub name: String,
    pub phone: String,
    pub question: String,
    pub referral_code: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RegisteredLead {
    pub lead: Lead,
    pub referral_applied: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct LeadLookup {
    pub email_exists: bool,
    pub ip_exists: bool,
    pub lead: Option<Lead>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LeadPage {
    pub page: u32,
    pub data: Vec<Lead>,
    pub total: i64,
    pub has_more: bool,
}

/// Closed set of tables the listing API may read. Dataset names arrive as
/// request parameters and are only ever mapped through this enum, never
/// interpolated from the raw string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    #[default]
    Leads,
    Archive,
}

impl Dataset {
    pub fn table(&self) -> &'static str {
        match self {
            Dataset::Leads => "leads",
            Dataset::Archive => "leads_archive",
        }
    }
}

// A referral code is the lead's IP address with the dots stripped.
pub fn referral_code_from_ip(ip_address: &str) -> String {
    ip_address.replace('.', "")
}

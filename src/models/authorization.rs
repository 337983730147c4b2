use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerDetail {
    pub partner_id: String,
    pub dff_qualifier: String,
}

impl PartnerDetail {
    pub fn new(partner_id: &str, dff_qualifier: &str) -> Self {
        Self {
            partner_id: partner_id.to_string(),
            dff_qualifier: dff_qualifier.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRecord {
    pub vehicle_id: String,

    #[serde(default)]
    pub partners: Vec<PartnerDetail>,
}

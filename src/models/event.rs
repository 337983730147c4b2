use std::{
    collections::HashMap,
    fmt::{self, Display, Formatter},
};

use serde::{Deserialize, Deserializer, Serialize};

pub type CustomExtension = HashMap<String, serde_json::Value>;

pub const CUSTOM_RESPONSE_KEY: &str = "response";
pub const FAILURE_REASON_CODE_KEY: &str = "failureReasonCode";

/// Outcome label of a vehicle operation. Labels outside the shared set
/// (RI and RCPD codes among them) are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResponseCode {
    Success,
    SuccessContinue,
    Fail,
    FailDeliveryRetrying,
    FailVehicleNotConnected,
    FailMessageDeliveryTimedOut,
    FailInvalidState,
    FailUnauthorized,
    CustomExtension,
    Other(String),
}

impl ResponseCode {
    pub fn as_str(&self) -> &str {
        match self {
            ResponseCode::Success => "SUCCESS",
            ResponseCode::SuccessContinue => "SUCCESS_CONTINUE",
            ResponseCode::Fail => "FAIL",
            ResponseCode::FailDeliveryRetrying => "FAIL_DELIVERY_RETRYING",
            ResponseCode::FailVehicleNotConnected => "FAIL_VEHICLE_NOT_CONNECTED",
            ResponseCode::FailMessageDeliveryTimedOut => "FAIL_MESSAGE_DELIVERY_TIMED_OUT",
            ResponseCode::FailInvalidState => "FAIL_INVALID_STATE",
            ResponseCode::FailUnauthorized => "FAIL_UNAUTHORIZED",
            ResponseCode::CustomExtension => "CUSTOM_EXTENSION",
            ResponseCode::Other(label) => label.as_str(),
        }
    }
}

impl From<String> for ResponseCode {
    fn from(label: String) -> Self {
        match label.as_str() {
            "SUCCESS" => ResponseCode::Success,
            "SUCCESS_CONTINUE" => ResponseCode::SuccessContinue,
            "FAIL" => ResponseCode::Fail,
            "FAIL_DELIVERY_RETRYING" => ResponseCode::FailDeliveryRetrying,
            "FAIL_VEHICLE_NOT_CONNECTED" => ResponseCode::FailVehicleNotConnected,
            "FAIL_MESSAGE_DELIVERY_TIMED_OUT" => ResponseCode::FailMessageDeliveryTimedOut,
            "FAIL_INVALID_STATE" => ResponseCode::FailInvalidState,
            "FAIL_UNAUTHORIZED" => ResponseCode::FailUnauthorized,
            "CUSTOM_EXTENSION" => ResponseCode::CustomExtension,
            _ => ResponseCode::Other(label),
        }
    }
}

impl From<ResponseCode> for String {
    fn from(code: ResponseCode) -> Self {
        match code {
            ResponseCode::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl Display for ResponseCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A decoded vehicle-operation outcome (RO, RI or RCPD) on its way to the
/// notification and forwarding stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleEvent {
    pub vehicle_id: String,
    pub event_id: String,
    pub event_type: String,
    pub state: String,
    pub response: ResponseCode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_extension: Option<CustomExtension>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecu_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub dff_qualifier: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl VehicleEvent {
    pub fn new(
        vehicle_id: impl Into<String>,
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        state: impl Into<String>,
        response: ResponseCode,
    ) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            event_id: event_id.into(),
            event_type: event_type.into(),
            state: state.into(),
            response,
            custom_extension: None,
            arch_type: None,
            ecu_type: None,
            notification_id: None,
            dff_qualifier: String::new(),
            request_id: None,
            timestamp: None,
        }
    }

    pub fn with_custom_extension(mut self, extension: CustomExtension) -> Self {
        self.custom_extension = Some(extension);
        self
    }

    pub fn with_architecture(mut self, arch_type: &str, ecu_type: &str) -> Self {
        self.arch_type = Some(arch_type.to_string());
        self.ecu_type = Some(ecu_type.to_string());
        self
    }

    pub fn with_notification_id(&self, notification_id: &str) -> Self {
        Self {
            notification_id: Some(notification_id.to_string()),
            ..self.clone()
        }
    }

    pub fn with_dff_qualifier(&self, qualifier: &str) -> Self {
        Self {
            dff_qualifier: qualifier.to_string(),
            ..self.clone()
        }
    }

    /// Response label used in identifiers. A custom extension carrying a
    /// string `response` overrides the enumerated code.
    pub fn response_label(&self) -> String {
        self.response_override()
            .map(str::to_string)
            .unwrap_or_else(|| self.response.as_str().to_string())
    }

    pub fn response_override(&self) -> Option<&str> {
        self.custom_extension
            .as_ref()?
            .get(CUSTOM_RESPONSE_KEY)?
            .as_str()
            .filter(|s| !s.is_empty())
    }

    /// Positive integer failure reason carried by the custom extension.
    pub fn failure_reason_code(&self) -> Option<u64> {
        self.custom_extension
            .as_ref()?
            .get(FAILURE_REASON_CODE_KEY)?
            .as_u64()
            .filter(|code| *code > 0)
    }
}

use serde::{Deserialize, Serialize};

use super::Channel;

/// Opaque template variables, handed to the sender untouched
pub type Variables = serde_json::Map<String, serde_json::Value>;

/// Default attempt ceiling for a request that does not set one
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Notification request - immutable submission data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    /// Delivery channel
    pub channel: Channel,

    /// Destination (phone number, address, ...)
    pub recipient: String,

    /// Template identifier understood by the sender
    pub template: String,

    /// Template variables
    #[serde(default)]
    pub variables: Variables,

    /// Maximum delivery attempts
    pub max_retries: u32,
}

impl NotificationRequest {
    /// Create a new request with the default attempt ceiling
    pub fn new(channel: Channel, recipient: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            channel,
            recipient: recipient.into(),
            template: template.into(),
            variables: Variables::new(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Set a single template variable
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Merge a set of template variables
    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables.extend(variables);
        self
    }

    /// Set the maximum delivery attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_variables() {
        let request = NotificationRequest::new(Channel::WhatsApp, "+15550100", "appointment_reminder")
            .with_variable("patient", "Ada")
            .with_variable("slot", 9)
            .with_max_retries(5);

        assert_eq!(request.max_retries, 5);
        assert_eq!(request.variables.len(), 2);
        assert_eq!(request.variables["patient"], "Ada");
    }

    #[test]
    fn deserializes_without_variables() {
        let json = r#"{"channel":"email","recipient":"a@b.c","template":"invoice","max_retries":2}"#;
        let request: NotificationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.channel, Channel::Email);
        assert!(request.variables.is_empty());
    }
}

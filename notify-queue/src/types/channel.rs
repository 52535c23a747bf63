use serde::{Deserialize, Serialize};

/// Delivery medium for a notification.
///
/// Only selects the sender; the queue treats every channel the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// WhatsApp business messaging
    #[serde(rename = "whatsapp")]
    WhatsApp,

    /// Email
    Email,

    /// SMS text message
    Sms,
}

impl Channel {
    /// All supported channels
    pub fn all() -> &'static [Channel] {
        &[Self::WhatsApp, Self::Email, Self::Sms]
    }

    /// Wire name
    pub fn name(self) -> &'static str {
        match self {
            Self::WhatsApp => "whatsapp",
            Self::Email => "email",
            Self::Sms => "sms",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "whatsapp" => Ok(Self::WhatsApp),
            "email" => Ok(Self::Email),
            "sms" => Ok(Self::Sms),
            _ => Err(format!("Invalid channel: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names_case_insensitively() {
        assert_eq!("WhatsApp".parse::<Channel>().unwrap(), Channel::WhatsApp);
        assert_eq!("sms".parse::<Channel>().unwrap(), Channel::Sms);
        assert!("pager".parse::<Channel>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Channel::WhatsApp).unwrap(), "\"whatsapp\"");
        assert_eq!(serde_json::to_string(&Channel::Email).unwrap(), "\"email\"");
        let parsed: Channel = serde_json::from_str("\"sms\"").unwrap();
        assert_eq!(parsed, Channel::Sms);
    }
}

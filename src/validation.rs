use lazy_static::lazy_static;
use regex::Regex;

pub const INVALID_IP_MESSAGE: &str = "Invalid IP address format";

lazy_static! {
    static ref IPV4_PATTERN: Regex = Regex::new(concat!(
        r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}",
        r"(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$",
    ))
    .unwrap();
    // Bare "::" is not matched by any alternation
    static ref IPV6_PATTERN: Regex = Regex::new(concat!(
        r"^(?:",
        r"(?:[0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}",
        r"|(?:[0-9a-fA-F]{1,4}:){1,7}:",
        r"|(?:[0-9a-fA-F]{1,4}:){1,6}:[0-9a-fA-F]{1,4}",
        r"|(?:[0-9a-fA-F]{1,4}:){1,5}(?::[0-9a-fA-F]{1,4}){1,2}",
        r"|(?:[0-9a-fA-F]{1,4}:){1,4}(?::[0-9a-fA-F]{1,4}){1,3}",
        r"|(?:[0-9a-fA-F]{1,4}:){1,3}(?::[0-9a-fA-F]{1,4}){1,4}",
        r"|(?:[0-9a-fA-F]{1,4}:){1,2}(?::[0-9a-fA-F]{1,4}){1,5}",
        r"|[0-9a-fA-F]{1,4}:(?::[0-9a-fA-F]{1,4}){1,6}",
        r"|:(?::[0-9a-fA-F]{1,4}){1,7}",
        r"|::(?:[fF]{4}:)?(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}",
        r"(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)",
        r")$",
    ))
    .unwrap();
}

/// True if `text` is a dotted-quad IPv4 address or a colon-hex IPv6 address.
///
/// Nothing is trimmed: surrounding whitespace makes the address invalid.
pub fn is_valid_ip(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    IPV4_PATTERN.is_match(text) || IPV6_PATTERN.is_match(text)
}

/// Validation state derived from the current contents of an input field.
///
/// "Nothing entered" is reported as empty, not as invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpValidation<'a> {
    text: &'a str,
}

impl<'a> IpValidation<'a> {
    pub fn of(text: &'a str) -> Self {
        Self { text }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn is_valid(&self) -> bool {
        self.text.is_empty() || is_valid_ip(self.text)
    }

    pub fn validation_error(&self) -> Option<&'static str> {
        if self.is_empty() || self.is_valid() {
            None
        } else {
            Some(INVALID_IP_MESSAGE)
        }
    }
}

use std::fmt;

use crate::Error;

/// Syslog Severities from RFC 5424.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[allow(non_camel_case_types)]
pub enum Severity {
    EMERG = 0,
    ALERT = 1,
    CRIT = 2,
    ERR = 3,
    WARNING = 4,
    NOTICE = 5,
    INFO = 6,
    DEBUG = 7,
}

/// Convert the low three bits of a priority value into a `Severity`.
///
/// The wire protocol only carries 0..=7 here, anything else is a malformed header.
impl TryFrom<u8> for Severity {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let severity = match value {
            0 => Severity::EMERG,
            1 => Severity::ALERT,
            2 => Severity::CRIT,
            3 => Severity::ERR,
            4 => Severity::WARNING,
            5 => Severity::NOTICE,
            6 => Severity::INFO,
            7 => Severity::DEBUG,
            _ => return Err(Error::MalformedHeader),
        };

        Ok(severity)
    }
}

impl Severity {
    /// Severity encoded in the low three bits of a priority value.
    pub(crate) fn from_priority(priority: u8) -> Self {
        // the mask keeps the value in 0..=7, so the fallback never applies
        Severity::try_from(priority & 0x7).unwrap_or(Severity::DEBUG)
    }

    /// Convert a syslog severity into a unique string representation
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::EMERG => "emerg",
            Severity::ALERT => "alert",
            Severity::CRIT => "crit",
            Severity::ERR => "err",
            Severity::WARNING => "warning",
            Severity::NOTICE => "notice",
            Severity::INFO => "info",
            Severity::DEBUG => "debug",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Severity;

    #[test]
    fn deref() {
        assert_eq!(Severity::EMERG.as_str(), "emerg");
        assert_eq!(Severity::ALERT.as_str(), "alert");
        assert_eq!(Severity::CRIT.as_str(), "crit");
        assert_eq!(Severity::ERR.as_str(), "err");
        assert_eq!(Severity::WARNING.as_str(), "warning");
        assert_eq!(Severity::NOTICE.as_str(), "notice");
        assert_eq!(Severity::INFO.as_str(), "info");
        assert_eq!(Severity::DEBUG.as_str(), "debug");
    }

    #[test]
    fn out_of_range() {
        assert!(Severity::try_from(8).is_err());
        assert_eq!(Severity::try_from(2).unwrap(), Severity::CRIT);
    }

    #[test]
    fn from_priority_bits() {
        assert_eq!(Severity::from_priority(0), Severity::EMERG);
        assert_eq!(Severity::from_priority(34), Severity::CRIT);
        assert_eq!(Severity::from_priority(165), Severity::NOTICE);
        assert_eq!(Severity::from_priority(191), Severity::DEBUG);
    }
}

//! In-memory representation of a single Syslog message.

use std::fmt::{self, Write};

use chrono::{DateTime, Utc};

use crate::facility::Facility;
use crate::procid::ProcId;
use crate::severity::Severity;
use crate::structured_data::{write_structured_data, StructuredElement};
use crate::timestamp::write_timestamp;

/// A RFC5424-protocol syslog message.
///
/// Every field owns its data, so a message outlives the buffer it was
/// parsed from. `Display` renders it back to wire text, `-` standing in
/// for every absent field.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    /// `facility * 8 + severity`, at most 191
    pub priority: u8,
    pub version: u32,
    /// Always normalized to UTC
    pub timestamp: Option<DateTime<Utc>>,
    pub hostname: Option<String>,
    pub appname: Option<String>,
    pub procid: Option<String>,
    pub msgid: Option<String>,
    // param values are unescaped, `Display` escapes them again
    pub structured_data: Vec<StructuredElement>,
    pub msg: Option<String>,
}

impl Message {
    pub fn severity(&self) -> Severity {
        Severity::from_priority(self.priority)
    }

    /// `None` only when `priority` was set above 191 by hand.
    pub fn facility(&self) -> Option<Facility> {
        Facility::try_from(self.priority >> 3).ok()
    }

    pub fn severity_code(&self) -> u8 {
        self.priority & 0x7
    }

    pub fn facility_code(&self) -> u8 {
        self.priority >> 3
    }

    pub fn proc_id(&self) -> Option<ProcId<'_>> {
        self.procid.as_deref().map(ProcId::from)
    }

    /// Looks up a structured data element by id, first match wins.
    pub fn element(&self, id: &str) -> Option<&StructuredElement> {
        self.structured_data.iter().find(|element| element.id == id)
    }
}

fn write_field(f: &mut fmt::Formatter<'_>, field: Option<&str>) -> fmt::Result {
    f.write_char(' ')?;
    match field {
        Some(value) => f.write_str(value),
        None => f.write_char('-'),
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>{} ", self.priority, self.version)?;
        match &self.timestamp {
            Some(ts) => write_timestamp(f, ts)?,
            None => f.write_char('-')?,
        }

        write_field(f, self.hostname.as_deref())?;
        write_field(f, self.appname.as_deref())?;
        write_field(f, self.procid.as_deref())?;
        write_field(f, self.msgid.as_deref())?;

        f.write_char(' ')?;
        write_structured_data(f, &self.structured_data)?;

        if let Some(msg) = &self.msg {
            f.write_char(' ')?;
            f.write_str(msg)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn empty() -> Message {
        Message {
            priority: 34,
            version: 1,
            timestamp: None,
            hostname: None,
            appname: None,
            procid: None,
            msgid: None,
            structured_data: vec![],
            msg: None,
        }
    }

    #[test]
    fn render_all_absent() {
        assert_eq!(empty().to_string(), "<34>1 - - - - - -");
    }

    #[test]
    fn priority_fields() {
        let msg = empty();
        assert_eq!(msg.severity(), Severity::CRIT);
        assert_eq!(msg.facility(), Some(Facility::AUTH));
        assert_eq!(msg.severity_code(), 2);
        assert_eq!(msg.facility_code(), 4);

        let msg = Message {
            priority: 200,
            ..empty()
        };
        assert_eq!(msg.facility(), None);
    }

    #[test]
    fn render_full() {
        let msg = Message {
            timestamp: Some(
                Utc.with_ymd_and_hms(2003, 10, 11, 22, 14, 15).unwrap()
                    + chrono::Duration::milliseconds(3),
            ),
            hostname: Some("mymachine.example.com".into()),
            appname: Some("su".into()),
            procid: Some("12345".into()),
            msgid: Some("98765".into()),
            structured_data: vec![StructuredElement::new("exampleSDID@32473")
                .with_param("iut", "3")],
            msg: Some("'su root' failed".into()),
            ..empty()
        };

        assert_eq!(
            msg.to_string(),
            r#"<34>1 2003-10-11T22:14:15.003Z mymachine.example.com su 12345 98765 [exampleSDID@32473 iut="3"] 'su root' failed"#
        );
        assert_eq!(msg.proc_id(), Some(ProcId::PID(12345)));
        assert!(msg.element("exampleSDID@32473").is_some());
        assert!(msg.element("missing").is_none());
    }
}

//! Scanner for RFC 5424 messages, in datagram and octet-counted framing.
//!
//! The scanner walks the buffer with a single `offset` cursor. Every read is
//! bounds-checked, so truncated or hostile input produces an error instead
//! of a panic, and an error always means nothing was consumed.

use std::str;

use crate::message::Message;
use crate::structured_data::StructuredElement;
use crate::timestamp::scan_timestamp;
use crate::Error;

/// Largest PRI value, `local7.debug`
const MAX_PRIORITY: u16 = 191;

/// RFC 5424 allows at most three digits for both PRIVAL and VERSION
const MAX_HEADER_DIGITS: usize = 3;

/// Ten digits already exceed any frame a socket can carry
const MAX_FRAME_LENGTH_DIGITS: usize = 10;

#[inline]
fn byte_at(buf: &[u8], pos: usize) -> Result<u8, Error> {
    buf.get(pos).copied().ok_or(Error::UnexpectedEndOfInput)
}

#[inline]
fn expect_separator(buf: &[u8], offset: &mut usize) -> Result<(), Error> {
    match buf.get(*offset) {
        Some(b' ') => {
            *offset += 1;
            Ok(())
        }
        Some(_) => Err(Error::ExpectedSeparator),
        None => Err(Error::UnexpectedEndOfInput),
    }
}

#[inline]
fn is_special(ch: u8) -> bool {
    matches!(ch, b' ' | b'=' | b']' | b'"')
}

#[inline]
fn to_string(bytes: &[u8]) -> Result<String, Error> {
    Ok(str::from_utf8(bytes)?.to_owned())
}

/// Reads a run of at most `max` ASCII digits, `MalformedHeader` if there are none or too many.
fn parse_header_number(buf: &[u8], offset: &mut usize, max: usize) -> Result<u16, Error> {
    let start = *offset;
    let mut value = 0u16;
    while let Some(ch) = buf.get(*offset).filter(|ch| ch.is_ascii_digit()) {
        if *offset - start == max {
            return Err(Error::MalformedHeader);
        }

        value = value * 10 + (ch - b'0') as u16;
        *offset += 1;
    }

    if *offset == start {
        return Err(Error::MalformedHeader);
    }

    Ok(value)
}

// HOSTNAME, APP-NAME, PROCID and MSGID all share this shape: `-` or a run
// of non-space bytes, terminated by the separator which is consumed too.
fn take_header_field(buf: &[u8], offset: &mut usize) -> Result<Option<String>, Error> {
    let rest = buf.get(*offset..).ok_or(Error::UnexpectedEndOfInput)?;
    let len = rest
        .iter()
        .position(|ch| *ch == b' ')
        .ok_or(Error::UnexpectedEndOfInput)?;

    let field = &rest[..len];
    let value = if field.is_empty() || field == b"-" {
        None
    } else {
        Some(to_string(field)?)
    };

    *offset += len + 1;
    Ok(value)
}

/// SD-NAME, used for both element ids and param keys.
#[inline]
fn take_sd_name<'a>(buf: &'a [u8], offset: &mut usize) -> Result<&'a [u8], Error> {
    let start = *offset;
    loop {
        let ch = byte_at(buf, *offset)?;
        if is_special(ch) {
            break;
        }
        *offset += 1;
    }

    if *offset == start {
        return Err(Error::InvalidStructuredData);
    }

    Ok(&buf[start..*offset])
}

/// A quoted PARAM-VALUE, still escaped. A backslash keeps the next byte
/// from closing the value.
fn take_param_value<'a>(buf: &'a [u8], offset: &mut usize) -> Result<&'a [u8], Error> {
    if byte_at(buf, *offset)? != b'"' {
        return Err(Error::InvalidStructuredData);
    }

    let start = *offset + 1;
    let mut pos = start;
    loop {
        match byte_at(buf, pos)? {
            b'\\' => pos += 2,
            b'"' => break,
            _ => pos += 1,
        }
    }

    *offset = pos + 1; // 1 for the closing quote
    Ok(&buf[start..pos])
}

/// Resolves `\"`, `\\` and `\]`. Any other backslash is kept as is.
fn unescape_param_value(raw: &[u8]) -> Result<String, Error> {
    let raw = str::from_utf8(raw)?;
    if !raw.contains('\\') {
        return Ok(raw.to_owned());
    }

    let mut value = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            value.push(ch);
            continue;
        }

        match chars.clone().next() {
            Some(next @ ('"' | '\\' | ']')) => {
                value.push(next);
                chars.next();
            }
            _ => value.push('\\'),
        }
    }

    Ok(value)
}

// example: [exampleSDID@32473 iut="3" eventSource="Application" eventID="1011"]
fn parse_structured_element(buf: &[u8], offset: &mut usize) -> Result<StructuredElement, Error> {
    if byte_at(buf, *offset)? != b'[' {
        return Err(Error::InvalidStructuredData);
    }
    *offset += 1;

    let id = to_string(take_sd_name(buf, offset)?)?;
    let mut params = Vec::new();

    loop {
        match byte_at(buf, *offset)? {
            b']' => {
                *offset += 1;
                break;
            }
            b' ' => {
                *offset += 1;
                let key = to_string(take_sd_name(buf, offset)?)?;

                if byte_at(buf, *offset)? != b'=' {
                    return Err(Error::InvalidStructuredData);
                }
                *offset += 1;

                let value = unescape_param_value(take_param_value(buf, offset)?)?;
                params.push((key, value));
            }
            _ => return Err(Error::InvalidStructuredData),
        }
    }

    Ok(StructuredElement { id, params })
}

fn parse_structured_data(buf: &[u8], offset: &mut usize) -> Result<Vec<StructuredElement>, Error> {
    match byte_at(buf, *offset)? {
        b'-' => {
            *offset += 1;
            return Ok(Vec::new());
        }
        b'[' => {}
        _ => return Err(Error::InvalidStructuredData),
    }

    // 4 is RawVec::MIN_NON_ZERO_CAP
    let mut elements = Vec::with_capacity(4);
    while buf.get(*offset) == Some(&b'[') {
        elements.push(parse_structured_element(buf, offset)?);
    }

    Ok(elements)
}

/// Parse one complete datagram into a `Message`.
///
/// The whole buffer is the message: whatever follows STRUCTURED-DATA and its
/// separator is taken verbatim as MSG.
pub fn parse_message(buf: &[u8]) -> Result<Message, Error> {
    // Parse priority
    //
    // https://datatracker.ietf.org/doc/html/rfc5424#section-6.2.1
    if buf.first() != Some(&b'<') {
        return Err(Error::MalformedHeader);
    }

    let mut offset = 1;
    let priority = parse_header_number(buf, &mut offset, MAX_HEADER_DIGITS)?;
    if buf.get(offset) != Some(&b'>') || priority > MAX_PRIORITY {
        return Err(Error::MalformedHeader);
    }
    offset += 1;

    // Parse version
    //
    // https://datatracker.ietf.org/doc/html/rfc5424#section-9.1
    let version = parse_header_number(buf, &mut offset, MAX_HEADER_DIGITS)? as u32;
    if buf.get(offset) != Some(&b' ') {
        return Err(Error::MalformedHeader);
    }
    offset += 1;

    let timestamp = if byte_at(buf, offset)? == b'-' {
        offset += 1;
        None
    } else {
        Some(scan_timestamp(buf, &mut offset)?)
    };
    expect_separator(buf, &mut offset)?;

    let hostname = take_header_field(buf, &mut offset)?;
    let appname = take_header_field(buf, &mut offset)?;
    let procid = take_header_field(buf, &mut offset)?;

    // Some senders stop right after MSGID, `<34>1 - - - - -` being the
    // degenerate case. STRUCTURED-DATA and MSG are both absent then.
    let rest = &buf[offset..];
    if !rest.is_empty() && !rest.contains(&b' ') {
        let msgid = if rest == b"-" {
            None
        } else {
            Some(to_string(rest)?)
        };

        return Ok(Message {
            priority: priority as u8,
            version,
            timestamp,
            hostname,
            appname,
            procid,
            msgid,
            structured_data: Vec::new(),
            msg: None,
        });
    }

    let msgid = take_header_field(buf, &mut offset)?;
    let structured_data = parse_structured_data(buf, &mut offset)?;

    // message
    let msg = match buf.get(offset) {
        None => None,
        Some(b' ') => {
            let rest = &buf[offset + 1..];
            if rest.is_empty() {
                None
            } else {
                Some(to_string(rest)?)
            }
        }
        Some(_) => return Err(Error::InvalidStructuredData),
    };

    Ok(Message {
        priority: priority as u8,
        version,
        timestamp,
        hostname,
        appname,
        procid,
        msgid,
        structured_data,
        msg,
    })
}

/// Splits an octet-counting frame `"<len> <message>"` off the front of `buf`.
///
/// Returns the frame body and the total bytes it spans, prefix included.
/// `IncompleteFrame` means the prefix is fine but the body has not fully
/// arrived yet.
pub fn split_frame(buf: &[u8]) -> Result<(&[u8], usize), Error> {
    let digits = buf
        .iter()
        .take(MAX_FRAME_LENGTH_DIGITS + 1)
        .position(|ch| !ch.is_ascii_digit());

    let digits = match digits {
        Some(0) => return Err(Error::InvalidFrameLength),
        Some(n) if buf[n] == b' ' => n,
        Some(_) => return Err(Error::InvalidFrameLength),
        None if buf.len() > MAX_FRAME_LENGTH_DIGITS => return Err(Error::InvalidFrameLength),
        None => {
            return Err(Error::IncompleteFrame {
                declared: 0,
                available: 0,
            })
        }
    };

    // all bytes are ascii digits, so this cannot fail
    let declared: usize = str::from_utf8(&buf[..digits])?
        .parse()
        .map_err(|_| Error::InvalidFrameLength)?;

    let start = digits + 1;
    let available = buf.len() - start;
    if available < declared {
        return Err(Error::IncompleteFrame {
            declared,
            available,
        });
    }

    Ok((&buf[start..start + declared], start + declared))
}

/// Parse the first message in `buf`, returning it with the number of bytes consumed.
///
/// A buffer starting with `<` is a single datagram and is consumed whole. A
/// buffer starting with a digit is octet-counted: only the first frame is
/// decoded and the returned length points at the next frame, so the caller
/// can call again on the remainder.
///
/// # Example
///
/// ```
/// use syslog_ingest::parse;
///
/// let raw = "<34>1 - host su - - - hello";
/// let framed = format!("{} {raw}{} {raw}", raw.len(), raw.len());
///
/// let (first, consumed) = parse(framed.as_bytes()).unwrap();
/// assert_eq!(consumed, raw.len() + 3);
/// assert_eq!(first.msg.as_deref(), Some("hello"));
///
/// let (second, _) = parse(&framed.as_bytes()[consumed..]).unwrap();
/// assert_eq!(first, second);
/// ```
pub fn parse(buf: &[u8]) -> Result<(Message, usize), Error> {
    match buf.first() {
        Some(ch) if ch.is_ascii_digit() => {
            let (frame, consumed) = split_frame(buf)?;
            let message = parse_message(frame)?;
            Ok((message, consumed))
        }
        _ => {
            let message = parse_message(buf)?;
            Ok((message, buf.len()))
        }
    }
}

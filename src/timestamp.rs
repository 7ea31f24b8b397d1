//! RFC 3339 timestamps as restricted by RFC 5424 section 6.2.3.

use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone, Timelike, Utc};

use crate::Error;

// 20 is the length of `1990-12-31T23:59:59Z`
const MIN_TIMESTAMP_LEN: usize = 20;

const MAX_FRACTION_DIGITS: usize = 9;

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Reads `count` ASCII digits starting at `start`.
#[inline]
fn read_digits(buf: &[u8], start: usize, count: usize) -> Result<u32, Error> {
    let digits = buf
        .get(start..start + count)
        .ok_or(Error::MalformedTimestamp)?;

    digits.iter().try_fold(0u32, |acc, ch| {
        if ch.is_ascii_digit() {
            Ok(acc * 10 + (ch - b'0') as u32)
        } else {
            Err(Error::MalformedTimestamp)
        }
    })
}

#[inline]
fn expect_byte(buf: &[u8], pos: usize, want: u8) -> Result<(), Error> {
    match buf.get(pos) {
        Some(ch) if *ch == want => Ok(()),
        _ => Err(Error::MalformedTimestamp),
    }
}

/// Parse the TIMESTAMP field starting at `offset`, leaving `offset` just past it.
///
/// The field must be followed by a space or the end of `buf`; anything else
/// glued to it (e.g. `...003Z07:00`) is rejected. On error `offset` is left
/// untouched.
pub(crate) fn scan_timestamp(buf: &[u8], offset: &mut usize) -> Result<DateTime<Utc>, Error> {
    let start = *offset;
    if buf.len() < start + MIN_TIMESTAMP_LEN {
        return Err(Error::MalformedTimestamp);
    }

    let year = read_digits(buf, start, 4)? as i32;
    expect_byte(buf, start + 4, b'-')?;
    let month = read_digits(buf, start + 5, 2)?;
    expect_byte(buf, start + 7, b'-')?;
    let day = read_digits(buf, start + 8, 2)?;
    expect_byte(buf, start + 10, b'T')?;
    let hour = read_digits(buf, start + 11, 2)?;
    expect_byte(buf, start + 13, b':')?;
    let minute = read_digits(buf, start + 14, 2)?;
    expect_byte(buf, start + 16, b':')?;
    let second = read_digits(buf, start + 17, 2)?;

    let mut pos = start + 19;
    let mut nanos = 0u32;
    if buf.get(pos) == Some(&b'.') {
        pos += 1;
        let mut count = 0;
        while let Some(ch) = buf.get(pos).filter(|ch| ch.is_ascii_digit()) {
            if count == MAX_FRACTION_DIGITS {
                return Err(Error::MalformedTimestamp);
            }

            nanos = nanos * 10 + (ch - b'0') as u32;
            count += 1;
            pos += 1;
        }

        if count == 0 {
            return Err(Error::MalformedTimestamp);
        }

        nanos *= 10u32.pow((MAX_FRACTION_DIGITS - count) as u32);
    }

    let offset_secs = match buf.get(pos) {
        Some(b'Z') => {
            pos += 1;
            0
        }
        Some(sign @ (b'+' | b'-')) => {
            let sign = if *sign == b'-' { -1 } else { 1 };
            let h = read_digits(buf, pos + 1, 2)? as i32;
            expect_byte(buf, pos + 3, b':')?;
            let m = read_digits(buf, pos + 4, 2)? as i32;
            if h > 23 || m > 59 {
                return Err(Error::MalformedTimestamp);
            }

            pos += 6;
            sign * (h * 60 * 60 + m * 60)
        }
        _ => return Err(Error::MalformedTimestamp),
    };

    if pos < buf.len() && buf[pos] != b' ' {
        return Err(Error::MalformedTimestamp);
    }

    let datetime = to_datetime(year, month, day, hour, minute, second, nanos, offset_secs)?;
    *offset = pos;

    Ok(datetime)
}

#[allow(clippy::too_many_arguments)]
#[inline]
fn to_datetime(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    nanos: u32,
    offset: i32,
) -> Result<DateTime<Utc>, Error> {
    let offset = FixedOffset::east_opt(offset).ok_or(Error::MalformedTimestamp)?;

    // chrono keeps a leap second as :59 with the nanos running past one second
    let (second, nanos) = if second == 60 {
        (59, nanos + NANOS_PER_SEC)
    } else {
        (second, nanos)
    };

    let naive = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_nano_opt(hour, minute, second, nanos))
        .ok_or(Error::MalformedTimestamp)?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|datetime| datetime.with_timezone(&Utc))
        .ok_or(Error::MalformedTimestamp)
}

/// Parse a standalone RFC 5424 timestamp, normalized to UTC.
///
/// ```
/// let ts = syslog_ingest::parse_timestamp(b"2003-08-24T05:14:15.000003-07:00").unwrap();
/// assert_eq!(ts.to_rfc3339(), "2003-08-24T12:14:15.000003+00:00");
/// ```
pub fn parse_timestamp(buf: &[u8]) -> Result<DateTime<Utc>, Error> {
    let mut offset = 0;
    scan_timestamp(buf, &mut offset)
}

/// Writes `ts` as RFC 3339 in UTC, fraction trimmed of trailing zeros.
pub(crate) fn write_timestamp(f: &mut fmt::Formatter<'_>, ts: &DateTime<Utc>) -> fmt::Result {
    let (second, mut nanos) = match ts.nanosecond() {
        leap @ NANOS_PER_SEC.. => (ts.second() + 1, leap - NANOS_PER_SEC),
        nanos => (ts.second(), nanos),
    };

    write!(
        f,
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        ts.year(),
        ts.month(),
        ts.day(),
        ts.hour(),
        ts.minute(),
        second
    )?;

    if nanos > 0 {
        let mut width = MAX_FRACTION_DIGITS;
        while nanos % 10 == 0 {
            nanos /= 10;
            width -= 1;
        }
        write!(f, ".{nanos:0width$}")?;
    }

    f.write_str("Z")
}

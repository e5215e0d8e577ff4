//! Minimal DER walker for pulling the validity period out of an X.509 certificate.
//!
//! Only the path Certificate -> TBSCertificate -> Validity is decoded; every
//! other field is skipped by length.

use chrono::{DateTime, NaiveDate, Utc};

const TAG_SEQUENCE: u8 = 0x30;
const TAG_INTEGER: u8 = 0x02;
const TAG_EXPLICIT_VERSION: u8 = 0xa0;
const TAG_UTC_TIME: u8 = 0x17;
const TAG_GENERALIZED_TIME: u8 = 0x18;

/// Validity period of a certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validity {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

/// Extract the notAfter timestamp from a DER-encoded certificate
pub fn parse_not_after(der: &[u8]) -> Option<DateTime<Utc>> {
    parse_validity(der).map(|v| v.not_after)
}

/// Extract the Validity sequence from a DER-encoded certificate
pub fn parse_validity(der: &[u8]) -> Option<Validity> {
    let (tag, certificate, _) = read_tlv(der)?;
    if tag != TAG_SEQUENCE {
        return None;
    }

    let (tag, tbs, _) = read_tlv(certificate)?;
    if tag != TAG_SEQUENCE {
        return None;
    }

    let mut rest = tbs;

    // version [0] EXPLICIT is absent on v1 certificates
    let (tag, _, after) = read_tlv(rest)?;
    if tag == TAG_EXPLICIT_VERSION {
        rest = after;
    }

    // serialNumber
    let (tag, _, after) = read_tlv(rest)?;
    if tag != TAG_INTEGER {
        return None;
    }
    rest = after;

    // signature AlgorithmIdentifier, then issuer Name
    for _ in 0..2 {
        let (tag, _, after) = read_tlv(rest)?;
        if tag != TAG_SEQUENCE {
            return None;
        }
        rest = after;
    }

    let (tag, validity, _) = read_tlv(rest)?;
    if tag != TAG_SEQUENCE {
        return None;
    }

    let (before_tag, before, after) = read_tlv(validity)?;
    let (after_tag, not_after, _) = read_tlv(after)?;

    Some(Validity {
        not_before: parse_time(before_tag, before)?,
        not_after: parse_time(after_tag, not_after)?,
    })
}

/// Split one tag-length-value element off the front of `input`
fn read_tlv(input: &[u8]) -> Option<(u8, &[u8], &[u8])> {
    let (&tag, input) = input.split_first()?;
    let (&first, mut input) = input.split_first()?;

    let len = if first < 0x80 {
        first as usize
    } else {
        let count = (first & 0x7f) as usize;
        // Indefinite lengths are not DER; anything past 4 bytes is not a certificate
        if count == 0 || count > 4 || input.len() < count {
            return None;
        }
        let (len_bytes, remaining) = input.split_at(count);
        input = remaining;
        len_bytes
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | b as usize)
    };

    if input.len() < len {
        return None;
    }
    let (content, rest) = input.split_at(len);
    Some((tag, content, rest))
}

fn parse_time(tag: u8, content: &[u8]) -> Option<DateTime<Utc>> {
    let s = std::str::from_utf8(content).ok()?;
    match tag {
        TAG_UTC_TIME => parse_utc_time(s),
        TAG_GENERALIZED_TIME => parse_generalized_time(s),
        _ => None,
    }
}

/// Parse UTCTime format (YYMMDDHHMMSSZ)
fn parse_utc_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.strip_suffix('Z')?;
    if s.len() != 12 {
        return None;
    }

    // RFC 5280: two-digit years 50-99 are 19xx, 00-49 are 20xx
    let year: i32 = s.get(0..2)?.parse().ok()?;
    let year = if year >= 50 { 1900 + year } else { 2000 + year };

    build_datetime(year, s.get(2..)?)
}

/// Parse GeneralizedTime format (YYYYMMDDHHMMSSZ)
fn parse_generalized_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.strip_suffix('Z')?;
    if s.len() != 14 {
        return None;
    }

    let year: i32 = s.get(0..4)?.parse().ok()?;
    build_datetime(year, s.get(4..)?)
}

/// Build a timestamp from a year and the trailing MMDDHHMMSS digits
fn build_datetime(year: i32, rest: &str) -> Option<DateTime<Utc>> {
    let month: u32 = rest.get(0..2)?.parse().ok()?;
    let day: u32 = rest.get(2..4)?.parse().ok()?;
    let hour: u32 = rest.get(4..6)?.parse().ok()?;
    let min: u32 = rest.get(6..8)?.parse().ok()?;
    let sec: u32 = rest.get(8..10)?.parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_opt(hour, min, sec)
        .map(|dt| dt.and_utc())
}

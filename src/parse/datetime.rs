//! INTERNALDATE parsing.
//!
//! `date-time = DQUOTE date-day-fixed "-" date-month "-" date-year SP
//! time SP zone DQUOTE`. Next to the RFC 3501 26-character form with an
//! SP-padded single-digit day, the 25-character variant without the
//! padding is accepted; enough servers emit it.

use abnf_core::streaming::{dquote, sp};
use chrono::{DateTime, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use nom::{
    branch::alt,
    bytes::streaming::{tag, tag_no_case, take_while_m_n},
    character::streaming::char,
    combinator::{map, value},
    sequence::{delimited, preceded, tuple},
};

use crate::parse::{ImapErrorKind, ImapParseError, ImapResult};

/// `date-time` surrounded by DQUOTE, producing the parsed instant with
/// its original zone offset preserved.
pub fn date_time(input: &[u8]) -> ImapResult<DateTime<FixedOffset>> {
    let mut parser = delimited(
        dquote,
        tuple((
            date_day_fixed,
            tag(b"-"),
            date_month,
            tag(b"-"),
            date_year,
            sp,
            time,
            sp,
            zone,
        )),
        dquote,
    );

    let (remaining, (day, _, month, _, year, _, time, _, zone)) = parser(input)?;

    let date = NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day));

    match (date, time, zone) {
        (Some(date), Some(time), Some(zone)) => {
            let local = NaiveDateTime::new(date, time);
            if let LocalResult::Single(datetime) = zone.from_local_datetime(&local) {
                Ok((remaining, datetime))
            } else {
                Err(nom::Err::Failure(ImapParseError {
                    input,
                    kind: ImapErrorKind::BadDateTime,
                }))
            }
        }
        _ => Err(nom::Err::Failure(ImapParseError {
            input,
            kind: ImapErrorKind::BadDateTime,
        })),
    }
}

/// `date-day-fixed = (SP DIGIT) / 2DIGIT / DIGIT`
///
/// The trailing single-DIGIT alternative is the tolerated 25-character
/// variant.
fn date_day_fixed(input: &[u8]) -> ImapResult<u8> {
    alt((
        map(
            preceded(sp, take_while_m_n(1, 1, is_digit)),
            |bytes: &[u8]| bytes[0] - b'0',
        ),
        digit_2,
        map(take_while_m_n(1, 1, is_digit), |bytes: &[u8]| {
            bytes[0] - b'0'
        }),
    ))(input)
}

/// `date-month = "Jan" / "Feb" / ... / "Dec"`
fn date_month(input: &[u8]) -> ImapResult<u8> {
    alt((
        value(1, tag_no_case(b"Jan")),
        value(2, tag_no_case(b"Feb")),
        value(3, tag_no_case(b"Mar")),
        value(4, tag_no_case(b"Apr")),
        value(5, tag_no_case(b"May")),
        value(6, tag_no_case(b"Jun")),
        value(7, tag_no_case(b"Jul")),
        value(8, tag_no_case(b"Aug")),
        value(9, tag_no_case(b"Sep")),
        value(10, tag_no_case(b"Oct")),
        value(11, tag_no_case(b"Nov")),
        value(12, tag_no_case(b"Dec")),
    ))(input)
}

/// `date-year = 4DIGIT`
fn date_year(input: &[u8]) -> ImapResult<u16> {
    let (remaining, bytes) = take_while_m_n(4, 4, is_digit)(input)?;
    // `unwrap` is safe, the input is four ASCII digits.
    Ok((
        remaining,
        std::str::from_utf8(bytes).unwrap().parse().unwrap(),
    ))
}

/// `time = 2DIGIT ":" 2DIGIT ":" 2DIGIT`
fn time(input: &[u8]) -> ImapResult<Option<NaiveTime>> {
    let mut parser = tuple((digit_2, tag(b":"), digit_2, tag(b":"), digit_2));

    let (remaining, (hour, _, minute, _, second)) = parser(input)?;

    Ok((
        remaining,
        NaiveTime::from_hms_opt(hour.into(), minute.into(), second.into()),
    ))
}

/// `zone = ("+" / "-") 4DIGIT`
///
/// Hours and minutes east of Greenwich; subtracting the zone from the
/// local time gives UTC, so `+0100` ends up one hour *behind* in UTC.
fn zone(input: &[u8]) -> ImapResult<Option<FixedOffset>> {
    let mut parser = tuple((alt((char('+'), char('-'))), digit_2, digit_2));

    let (remaining, (sign, hours, minutes)) = parser(input)?;

    let offset = 3600 * i32::from(hours) + 60 * i32::from(minutes);
    let zone = match sign {
        '+' => FixedOffset::east_opt(offset),
        '-' => FixedOffset::west_opt(offset),
        _ => unreachable!(),
    };

    Ok((remaining, zone))
}

fn is_digit(byte: u8) -> bool {
    byte.is_ascii_digit()
}

fn digit_2(input: &[u8]) -> ImapResult<u8> {
    let (remaining, bytes) = take_while_m_n(2, 2, is_digit)(input)?;
    Ok((remaining, (bytes[0] - b'0') * 10 + (bytes[1] - b'0')))
}

use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};

/// RFC 3339 in UTC with second precision, the wire format for `modTime`.
pub fn format_mod_time(time: SystemTime) -> String {
    let dt: DateTime<Utc> = time.into();

    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_mod_time(given: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(given) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(_) => None
    }
}

pub fn http_date(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mod_time_round_trip() {
        let epoch = SystemTime::UNIX_EPOCH;

        assert_eq!(format_mod_time(epoch), "1970-01-01T00:00:00Z");
        assert_eq!(
            parse_mod_time("1970-01-01T00:00:00Z"),
            Some(DateTime::<Utc>::from(epoch))
        );
    }

    #[test]
    fn parse_mod_time_accepts_offsets() {
        let parsed = parse_mod_time("2017-05-31T16:15:57.034+01:00")
            .expect("offset timestamp");

        assert_eq!(http_date(&parsed), "Wed, 31 May 2017 15:15:57 GMT");
    }

    #[test]
    fn parse_mod_time_rejects_garbage() {
        assert!(parse_mod_time("").is_none());
        assert!(parse_mod_time("yesterday").is_none());
    }
}

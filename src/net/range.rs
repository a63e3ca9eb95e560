use crate::net::error::{Error, Kind};

/// Sentinel for an open-ended range (`bytes=S-`).
pub const OPEN_END: u64 = u64::MAX;

/// One `bytes=S-E` range with inclusive bounds. `end == OPEN_END` runs to
/// the end of the object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRange {
    pub start: u64,
    pub end: u64,
}

impl HttpRange {
    /// How many bytes a backend should copy: 0 requests "through eof".
    pub fn copy_length(&self) -> u64 {
        if self.end == OPEN_END {
            0
        } else {
            self.end - self.start + 1
        }
    }

    /// The inclusive end against an object of `size` bytes.
    pub fn end_for(&self, size: u64) -> u64 {
        if self.end == OPEN_END {
            size.saturating_sub(1)
        } else {
            self.end
        }
    }
}

pub fn parse(header: &str) -> Result<HttpRange, Error> {
    let invalid = || Error::new()
        .kind(Kind::InvalidRequest)
        .message("Invalid Range header");

    let (unit, bounds) = header.split_once('=').ok_or_else(invalid)?;

    if unit != "bytes" {
        return Err(invalid());
    }

    let (start_str, end_str) = bounds.split_once('-').ok_or_else(invalid)?;

    if end_str.contains('-') {
        return Err(invalid());
    }

    let start = if start_str.is_empty() {
        0
    } else {
        start_str.parse().map_err(|_| invalid())?
    };

    let end = if end_str.is_empty() {
        OPEN_END
    } else {
        end_str.parse().map_err(|_| invalid())?
    };

    if end < start {
        return Err(invalid());
    }

    Ok(HttpRange {
        start,
        end,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bounded_range() {
        let range = parse("bytes=100-199").unwrap();

        assert_eq!(range, HttpRange { start: 100, end: 199 });
        assert_eq!(range.copy_length(), 100);
        assert_eq!(range.end_for(1000), 199);
    }

    #[test]
    fn open_ended_range() {
        let range = parse("bytes=100-").unwrap();

        assert_eq!(range.start, 100);
        assert_eq!(range.end, OPEN_END);
        assert_eq!(range.copy_length(), 0);
        assert_eq!(range.end_for(1000), 999);
    }

    #[test]
    fn missing_start_defaults_to_zero() {
        let range = parse("bytes=-199").unwrap();

        assert_eq!(range, HttpRange { start: 0, end: 199 });
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        for header in ["bytes", "items=0-5", "bytes=a-b", "bytes=5", "bytes=199-100", "bytes=1-2-3"] {
            assert!(parse(header).is_err(), "{header} accepted");
        }
    }
}

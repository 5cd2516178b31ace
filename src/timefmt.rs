//! epoch seconds -> wall clock for the reading tables

use chrono::DateTime;
use chrono_tz::Tz;

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Lima;

/// `HH:MM:SS`, 24h, in `tz`; `None` for timestamps chrono cannot represent
pub fn format_clock(epoch_seconds: i64, tz: Tz) -> Option<String> {
    let utc = DateTime::from_timestamp(epoch_seconds, 0)?;
    Some(utc.with_timezone(&tz).format("%H:%M:%S").to_string())
}

/// parse an IANA zone name, falling back to Lima
pub fn parse_timezone(name: &str) -> Tz {
    match name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(e) => {
            tracing::warn!("[TIME] unknown timezone '{}' ({}), using {}", name, e, DEFAULT_TIMEZONE.name());
            DEFAULT_TIMEZONE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lima_is_utc_minus_five() {
        // 2024-01-01T12:00:00Z
        assert_eq!(format_clock(1_704_110_400, DEFAULT_TIMEZONE).as_deref(), Some("07:00:00"));
    }

    #[test]
    fn twenty_four_hour_clock() {
        // 2024-01-01T22:30:15Z -> 17:30:15 in Lima
        assert_eq!(format_clock(1_704_148_215, DEFAULT_TIMEZONE).as_deref(), Some("17:30:15"));
    }

    #[test]
    fn other_zones_and_fallback() {
        assert_eq!(format_clock(0, chrono_tz::UTC).as_deref(), Some("00:00:00"));
        assert_eq!(parse_timezone("Not/AZone"), DEFAULT_TIMEZONE);
        assert_eq!(parse_timezone("Europe/Madrid"), chrono_tz::Europe::Madrid);
    }

    #[test]
    fn out_of_range_is_none() {
        assert_eq!(format_clock(i64::MAX, DEFAULT_TIMEZONE), None);
    }
}

/// WMO weather interpretation codes as reported by Open-Meteo.
///
/// See https://open-meteo.com/en/docs ("WMO Weather interpretation codes").

/// Codes at or above this value are thunderstorms.
pub const THUNDERSTORM_MIN_CODE: i64 = 95;

/// Human-readable description, `None` for codes Open-Meteo does not emit.
pub fn describe(code: i64) -> Option<&'static str> {
    let text = match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Foggy",
        48 => "Rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        71 => "Slight snow",
        73 => "Moderate snow",
        75 => "Heavy snow",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Heavy rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with hail",
        99 => "Severe thunderstorm with hail",
        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(describe(0), Some("Clear sky"));
        assert_eq!(describe(65), Some("Heavy rain"));
        assert_eq!(describe(99), Some("Severe thunderstorm with hail"));
    }

    #[test]
    fn test_unknown_codes() {
        assert_eq!(describe(4), None);
        assert_eq!(describe(-1), None);
        assert_eq!(describe(97), None);
    }
}

//! Interval rounding

/// Upper bound (inclusive, ms) and the step it rounds to
const STEPS: &[(i64, i64)] = &[
    (15, 10),                 // 10ms
    (35, 20),                 // 20ms
    (75, 50),                 // 50ms
    (150, 100),               // 100ms
    (350, 200),               // 200ms
    (750, 500),               // 500ms
    (1_500, 1_000),           // 1s
    (3_500, 2_000),           // 2s
    (7_500, 5_000),           // 5s
    (12_500, 10_000),         // 10s
    (17_500, 15_000),         // 15s
    (25_000, 20_000),         // 20s
    (45_000, 30_000),         // 30s
    (90_000, 60_000),         // 1m
    (210_000, 120_000),       // 2m
    (450_000, 300_000),       // 5m
    (750_000, 600_000),       // 10m
    (1_050_000, 900_000),     // 15m
    (1_500_000, 1_200_000),   // 20m
    (2_700_000, 1_800_000),   // 30m
    (5_400_000, 3_600_000),   // 1h
    (9_000_000, 7_200_000),   // 2h
    (16_200_000, 10_800_000), // 3h
    (32_400_000, 21_600_000), // 6h
    (86_400_000, 43_200_000), // 12h
    (604_800_000, 86_400_000),       // 1d
    (1_814_400_000, 604_800_000),    // 1w
    (3_628_800_000, 2_592_000_000),  // 30d
];

/// One year, returned for anything above the last threshold
const MAX_STEP: i64 = 31_536_000_000;

/// Round a raw interval (ms) to the nearest canonical step
///
/// Threshold values round down: `15 -> 10`, `35 -> 20`.
pub fn round_interval(millis: i64) -> i64 {
    STEPS
        .iter()
        .find(|(bound, _)| millis <= *bound)
        .map(|(_, step)| *step)
        .unwrap_or(MAX_STEP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        assert_eq!(round_interval(14), 10);
        assert_eq!(round_interval(15), 10);
        assert_eq!(round_interval(16), 20);
        assert_eq!(round_interval(34), 20);
        assert_eq!(round_interval(35), 20);
        assert_eq!(round_interval(36), 50);
    }

    #[test]
    fn test_extremes() {
        assert_eq!(round_interval(0), 10);
        assert_eq!(round_interval(-5), 10);
        assert_eq!(round_interval(3_628_800_000), 2_592_000_000);
        assert_eq!(round_interval(3_628_800_001), MAX_STEP);
        assert_eq!(round_interval(i64::MAX), MAX_STEP);
    }

    #[test]
    fn test_always_canonical() {
        let steps: Vec<i64> = STEPS
            .iter()
            .map(|(_, s)| *s)
            .chain(std::iter::once(MAX_STEP))
            .collect();
        let mut millis = 1;
        while millis < 100_000_000_000 {
            assert!(steps.contains(&round_interval(millis)), "{}", millis);
            millis = millis * 3 / 2 + 1;
        }
    }

    #[test]
    fn test_common_ranges() {
        // 6h over 1024 points
        assert_eq!(round_interval(21_600_000 / 1024), 20_000);
        // 7d over 1024 points
        assert_eq!(round_interval(604_800_000 / 1024), 600_000);
    }
}

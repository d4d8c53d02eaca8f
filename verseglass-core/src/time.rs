//! Duration conversion helpers with explicit saturation behavior.

use std::time::Duration;

/// Extension trait for safe Duration conversions.
pub trait DurationExt {
    /// Convert duration to seconds as u32, saturating at `u32::MAX`.
    ///
    /// Always sufficient for audio tracks; `u32::MAX` seconds is roughly
    /// 136 years.
    fn as_secs_u32(&self) -> u32;
}

impl DurationExt for Duration {
    fn as_secs_u32(&self) -> u32 {
        u32::try_from(self.as_secs()).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_secs_u32() {
        assert_eq!(Duration::from_secs(183).as_secs_u32(), 183);
    }

    #[test]
    fn test_as_secs_u32_saturates() {
        let duration = Duration::from_secs(u64::from(u32::MAX) + 1);
        assert_eq!(duration.as_secs_u32(), u32::MAX);
    }
}

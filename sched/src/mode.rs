use std::fmt;
use std::str::FromStr;

use crate::error::SchedError;

/// Work-distribution policy, fixed for the lifetime of a scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleMode {
    /// Contiguous equal-size chunks, one per worker
    Static,
    /// One task per claim from a shared cursor
    Dynamic,
    /// Shared cursor with geometrically shrinking chunks
    Guided,
    /// Light tasks static, medium and heavy tasks dynamic
    Heterogeneous,
}

impl ScheduleMode {
    pub const ALL: [ScheduleMode; 4] = [
        ScheduleMode::Static,
        ScheduleMode::Dynamic,
        ScheduleMode::Guided,
        ScheduleMode::Heterogeneous,
    ];

    /// Upper-case report label
    pub fn label(self) -> &'static str {
        match self {
            ScheduleMode::Static => "STATIC",
            ScheduleMode::Dynamic => "DYNAMIC",
            ScheduleMode::Guided => "GUIDED",
            ScheduleMode::Heterogeneous => "HETEROGENEOUS",
        }
    }
}

impl fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ScheduleMode {
    type Err = SchedError;

    /// Case-insensitive; `adaptive` is an alias for heterogeneous.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(ScheduleMode::Static),
            "dynamic" => Ok(ScheduleMode::Dynamic),
            "guided" => Ok(ScheduleMode::Guided),
            "heterogeneous" | "adaptive" => Ok(ScheduleMode::Heterogeneous),
            _ => Err(SchedError::UnknownMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modes() {
        assert_eq!("STATIC".parse::<ScheduleMode>().unwrap(), ScheduleMode::Static);
        assert_eq!("guided".parse::<ScheduleMode>().unwrap(), ScheduleMode::Guided);
        assert_eq!(
            "Adaptive".parse::<ScheduleMode>().unwrap(),
            ScheduleMode::Heterogeneous
        );
        assert!(matches!(
            "round-robin".parse::<ScheduleMode>(),
            Err(SchedError::UnknownMode(_))
        ));
    }

    #[test]
    fn test_label_roundtrip() {
        for mode in ScheduleMode::ALL {
            assert_eq!(mode.label().parse::<ScheduleMode>().unwrap(), mode);
        }
    }
}

use std::fmt;
use std::str::FromStr;

use chrono::Duration;

use crate::error::AppError;

/// Named recurrence intervals understood by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    Hourly,
    TwiceDaily,
    Daily,
    Weekly,
}

impl Recurrence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recurrence::Hourly => "hourly",
            Recurrence::TwiceDaily => "twicedaily",
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
        }
    }

    pub fn interval(&self) -> Duration {
        match self {
            Recurrence::Hourly => Duration::hours(1),
            Recurrence::TwiceDaily => Duration::hours(12),
            Recurrence::Daily => Duration::days(1),
            Recurrence::Weekly => Duration::weeks(1),
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recurrence {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "hourly" => Ok(Recurrence::Hourly),
            "twicedaily" => Ok(Recurrence::TwiceDaily),
            "daily" => Ok(Recurrence::Daily),
            "weekly" => Ok(Recurrence::Weekly),
            other => Err(AppError::UnknownSchedule(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_intervals() {
        assert_eq!("daily".parse::<Recurrence>().unwrap(), Recurrence::Daily);
        assert_eq!(
            "twicedaily".parse::<Recurrence>().unwrap().interval(),
            Duration::hours(12)
        );
    }

    #[test]
    fn rejects_unknown_interval() {
        let err = "fortnightly".parse::<Recurrence>().unwrap_err();
        assert!(matches!(err, AppError::UnknownSchedule(name) if name == "fortnightly"));
    }
}

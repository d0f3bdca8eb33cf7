use time::OffsetDateTime;

/// Source of "now" for time-bucket decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    /// Wall clock in UTC.
    #[default]
    System,
    /// Frozen instant, for tests and fixtures.
    Fixed(OffsetDateTime),
}

impl Clock {
    /// Current instant according to this clock.
    pub fn now(self) -> OffsetDateTime {
        match self {
            Clock::System => OffsetDateTime::now_utc(),
            Clock::Fixed(instant) => instant,
        }
    }
}

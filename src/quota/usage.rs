use time::{macros::format_description, Date, OffsetDateTime, UtcOffset};

/// Calendar day for quota accounting at the given offset.
pub fn today(offset: UtcOffset) -> Date {
    OffsetDateTime::now_utc().to_offset(offset).date()
}

/// Renders a day as `YYYY-MM-DD`.
pub fn format_day(day: Date) -> String {
    day.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| day.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// Search counted; `used` is the count after the increment.
    Consumed { used: i32 },
    /// Cap already reached for today.
    Exhausted { used: i32 },
}

/// Per-user daily search counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchUsage {
    pub count: i32,
    pub last_search_date: Option<Date>,
}

impl SearchUsage {
    pub fn new(count: i32, last_search_date: Option<Date>) -> Self {
        Self {
            count,
            last_search_date,
        }
    }

    /// A stored day later than `today` counts as today, so the date never
    /// moves backwards.
    pub fn is_stale(&self, today: Date) -> bool {
        match self.last_search_date {
            None => true,
            Some(day) => day < today,
        }
    }

    /// Resets the counter when the day has rolled over. Returns true if a
    /// reset happened.
    pub fn roll_over(&mut self, today: Date) -> bool {
        if !self.is_stale(today) {
            return false;
        }
        self.count = 0;
        self.last_search_date = Some(today);
        true
    }

    pub fn remaining(&self, cap: i32) -> i32 {
        (cap - self.count).max(0)
    }

    pub fn try_consume(&mut self, today: Date, cap: i32) -> ConsumeOutcome {
        self.roll_over(today);
        if cap - self.count <= 0 {
            return ConsumeOutcome::Exhausted { used: self.count };
        }
        self.count += 1;
        ConsumeOutcome::Consumed { used: self.count }
    }
}

//! Feed value objects
//!
//! Parameter bags for the feed composer and the active-threads query, and
//! the symbolic [`Timeframe`] they are driven by. Parsing is lenient: an
//! unrecognized string parses to `None`, which every consumer reads as
//! "no filter".

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Symbolic time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Day,
    Week,
    Month,
    Year,
    /// Effectively "all time", bounded at five years
    Infinity,
    /// No cutoff; recency-sorted with a score floor
    Latest,
}

impl Timeframe {
    pub const ALL: [Timeframe; 6] = [
        Timeframe::Day,
        Timeframe::Week,
        Timeframe::Month,
        Timeframe::Year,
        Timeframe::Infinity,
        Timeframe::Latest,
    ];

    /// Parse a timeframe; unknown values yield `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "day" => Some(Timeframe::Day),
            "week" => Some(Timeframe::Week),
            "month" => Some(Timeframe::Month),
            "year" => Some(Timeframe::Year),
            "infinity" => Some(Timeframe::Infinity),
            "latest" => Some(Timeframe::Latest),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Day => "day",
            Timeframe::Week => "week",
            Timeframe::Month => "month",
            Timeframe::Year => "year",
            Timeframe::Infinity => "infinity",
            Timeframe::Latest => "latest",
        }
    }

    /// Length of the rolling window, `None` for `latest`
    pub fn window(&self) -> Option<Duration> {
        match self {
            Timeframe::Day => Some(Duration::days(1)),
            Timeframe::Week => Some(Duration::days(7)),
            Timeframe::Month => Some(Duration::days(30)),
            Timeframe::Year => Some(Duration::days(365)),
            Timeframe::Infinity => Some(Duration::days(5 * 365)),
            Timeframe::Latest => None,
        }
    }

    /// Concrete cutoff relative to `now`, `None` for `latest`
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.window().map(|window| now - window)
    }
}

/// Which finished query the composer produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
    /// Recency-sorted with a score floor
    Latest,
    /// Score-sorted, window chosen by the timeframe
    Top,
}

impl FeedType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "latest" => Some(FeedType::Latest),
            "top" => Some(FeedType::Top),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedType::Latest => "latest",
            FeedType::Top => "top",
        }
    }
}

/// Inbound parameters for the feed composer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedParams {
    #[serde(default)]
    pub feed_type: Option<FeedType>,
    #[serde(default)]
    pub timeframe: Option<Timeframe>,
    /// Raw tag as supplied by the caller; normalized by the composer
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Score floor for the latest feed; the configured default when absent
    #[serde(default)]
    pub minimum_score: Option<i64>,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    10
}

impl Default for FeedParams {
    fn default() -> Self {
        Self {
            feed_type: None,
            timeframe: None,
            tag: None,
            page: default_page(),
            per_page: default_per_page(),
            minimum_score: None,
        }
    }
}

impl FeedParams {
    pub fn latest() -> Self {
        Self {
            feed_type: Some(FeedType::Latest),
            ..Self::default()
        }
    }

    pub fn top(timeframe: Timeframe) -> Self {
        Self {
            feed_type: Some(FeedType::Top),
            timeframe: Some(timeframe),
            ..Self::default()
        }
    }

    pub fn with_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = Some(timeframe);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_page(mut self, page: u32, per_page: u32) -> Self {
        self.page = page;
        self.per_page = per_page;
        self
    }

    pub fn with_minimum_score(mut self, minimum_score: i64) -> Self {
        self.minimum_score = Some(minimum_score);
        self
    }

    /// Whether the latest (recency) query applies
    pub fn is_latest(&self) -> bool {
        self.feed_type == Some(FeedType::Latest) || self.timeframe == Some(Timeframe::Latest)
    }
}

/// Lower bound for `time_ago` in the active-threads query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadsWindow {
    /// Most recent threads with a score floor
    Latest,
    /// Threads published at or after the instant, busiest first
    Since(DateTime<Utc>),
}

impl ThreadsWindow {
    /// Parse `"latest"` or an RFC 3339 timestamp; anything else is `None`
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("latest") {
            return Some(ThreadsWindow::Latest);
        }
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|at| ThreadsWindow::Since(at.with_timezone(&Utc)))
    }
}

/// One row of the active-threads sidebar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveThread {
    pub path: String,
    pub title: String,
    pub comments_count: i64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_parse() {
        assert_eq!(Timeframe::parse("Week"), Some(Timeframe::Week));
        assert_eq!(Timeframe::parse(" latest "), Some(Timeframe::Latest));
        assert_eq!(Timeframe::parse("fortnight"), None);
        assert_eq!(Timeframe::parse(""), None);
        for timeframe in Timeframe::ALL {
            assert_eq!(Timeframe::parse(timeframe.as_str()), Some(timeframe));
        }
    }

    #[test]
    fn test_timeframe_cutoffs() {
        let now = Utc::now();
        assert_eq!(Timeframe::Day.cutoff(now), Some(now - Duration::days(1)));
        assert_eq!(Timeframe::Week.cutoff(now), Some(now - Duration::days(7)));
        assert_eq!(Timeframe::Infinity.cutoff(now), Some(now - Duration::days(1825)));
        assert_eq!(Timeframe::Latest.cutoff(now), None);
    }

    #[test]
    fn test_windows_grow_monotonically() {
        let windows: Vec<Duration> = Timeframe::ALL.iter().filter_map(Timeframe::window).collect();
        assert!(windows.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_is_latest() {
        assert!(FeedParams::latest().is_latest());
        assert!(FeedParams::default().with_timeframe(Timeframe::Latest).is_latest());
        assert!(!FeedParams::top(Timeframe::Week).is_latest());
        assert!(!FeedParams::default().is_latest());
    }

    #[test]
    fn test_threads_window_parse() {
        assert_eq!(ThreadsWindow::parse("LATEST"), Some(ThreadsWindow::Latest));
        let parsed = ThreadsWindow::parse("2024-03-01T10:00:00Z");
        assert!(matches!(parsed, Some(ThreadsWindow::Since(_))));
        assert_eq!(ThreadsWindow::parse("yesterday"), None);
    }
}

//! Expiry notification events produced by a scan.

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Number of matching records carried in a notification for summary display.
pub const PREVIEW_LIMIT: usize = 3;

/// Horizons at or below this many days are rendered as critical.
pub const CRITICAL_HORIZON_DAYS: u32 = 7;

/// How prominently a notification should be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Normal,
    Critical,
}

/// One notification for one horizon of one scan.
///
/// Not persisted; delivered to sinks and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryNotification {
    /// The horizon (in days) this event was evaluated for.
    pub horizon_days: u32,
    /// Total number of records ending within the horizon.
    pub count: usize,
    /// The first [`PREVIEW_LIMIT`] matches, in window order.
    pub preview: Vec<Record>,
    /// Matches not included in `preview`.
    pub overflow: usize,
}

impl ExpiryNotification {
    /// Builds the event for `horizon_days` from the window query result.
    ///
    /// Returns `None` when nothing matched: empty horizons emit no event.
    #[must_use]
    pub fn from_matches(horizon_days: u32, matches: &[Record]) -> Option<Self> {
        if matches.is_empty() {
            return None;
        }
        let preview: Vec<Record> = matches.iter().take(PREVIEW_LIMIT).cloned().collect();
        Some(Self {
            horizon_days,
            count: matches.len(),
            overflow: matches.len() - preview.len(),
            preview,
        })
    }

    #[must_use]
    pub fn urgency(&self) -> Urgency {
        if self.horizon_days <= CRITICAL_HORIZON_DAYS {
            Urgency::Critical
        } else {
            Urgency::Normal
        }
    }

    #[must_use]
    pub fn title(&self) -> String {
        match self.horizon_days {
            0 => "Policies ending today".to_string(),
            1 => "Policies ending tomorrow".to_string(),
            days => format!("Policies ending within {days} days"),
        }
    }

    /// Multi-line summary: a count line, one line per previewed record, and
    /// an overflow line when more records matched than are shown.
    #[must_use]
    pub fn body(&self) -> String {
        let mut body = match self.horizon_days {
            0 => format!("{} of your policies end today.", self.count),
            1 => format!("{} of your policies end tomorrow.", self.count),
            days => format!("{} of your policies end within {days} days.", self.count),
        };
        body.push_str("\n\n");
        for record in &self.preview {
            body.push_str(&format!(
                "{} {} - {}\n",
                record.name, record.surname, record.policy_type
            ));
        }
        if self.overflow > 0 {
            body.push_str(&format!("and {} more...", self.overflow));
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;
    use crate::record::NewRecord;

    fn record(id: &str, name: &str) -> Record {
        Record::new(
            id.to_string(),
            NewRecord {
                name: name.to_string(),
                surname: "Kaya".to_string(),
                phone: "555".to_string(),
                policy_type: "Trafik".to_string(),
                policy_number: String::new(),
                company: String::new(),
                start_date: date!(2026 - 01 - 01),
                end_date: date!(2026 - 06 - 01),
                notes: String::new(),
            },
            datetime!(2026-01-01 0:00 UTC),
        )
    }

    #[test]
    fn empty_matches_produce_no_event() {
        assert!(ExpiryNotification::from_matches(7, &[]).is_none());
    }

    #[test]
    fn preview_is_capped_with_overflow() {
        let matches: Vec<Record> = (0..5).map(|i| record(&format!("r{i}"), "Can")).collect();
        let event = ExpiryNotification::from_matches(30, &matches).unwrap();

        assert_eq!(event.count, 5);
        assert_eq!(event.preview.len(), 3);
        assert_eq!(event.overflow, 2);
        assert_eq!(event.preview[0].id, "r0");
        assert_eq!(event.preview[2].id, "r2");
        assert!(event.body().ends_with("and 2 more..."));
    }

    #[test]
    fn small_result_has_no_overflow() {
        let event = ExpiryNotification::from_matches(7, &[record("a", "Elif")]).unwrap();
        assert_eq!(event.overflow, 0);
        assert!(!event.body().contains("more"));
        assert!(event.body().contains("Elif Kaya - Trafik"));
    }

    #[test]
    fn titles_and_urgency_follow_horizon() {
        let matches = [record("a", "Elif")];
        let today = ExpiryNotification::from_matches(0, &matches).unwrap();
        let tomorrow = ExpiryNotification::from_matches(1, &matches).unwrap();
        let month = ExpiryNotification::from_matches(30, &matches).unwrap();

        assert_eq!(today.title(), "Policies ending today");
        assert_eq!(tomorrow.title(), "Policies ending tomorrow");
        assert_eq!(month.title(), "Policies ending within 30 days");
        assert_eq!(today.urgency(), Urgency::Critical);
        assert_eq!(month.urgency(), Urgency::Normal);
    }
}

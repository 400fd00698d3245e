//! Policy records and the field sets used to create and patch them.
//!
//! All structs use `#[serde(rename_all = "camelCase")]` so the persisted file
//! and the command schema share the same key names (`policyType`, `endDate`,
//! `createdAt`, ...). Calendar dates travel as `YYYY-MM-DD`, instants as RFC 3339.

use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime};

time::serde::format_description!(calendar_date, Date, "[year]-[month]-[day]");

/// Widest expiry window honoured, in days. Larger horizons are clamped to it;
/// it already spans past `Date::MAX` from any representable start date.
const MAX_WINDOW_DAYS: i64 = 3_660_000;

/// One insurance policy entry.
///
/// `id` and `created_at` are assigned by the store and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Opaque unique identifier assigned at creation.
    pub id: String,
    pub name: String,
    pub surname: String,
    pub phone: String,
    pub policy_type: String,
    #[serde(default)]
    pub policy_number: String,
    #[serde(default)]
    pub company: String,
    #[serde(with = "calendar_date")]
    pub start_date: Date,
    #[serde(with = "calendar_date")]
    pub end_date: Date,
    #[serde(default)]
    pub notes: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Refreshed on every successful mutation.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Record {
    /// Builds a record from caller-supplied fields plus store-assigned identity.
    ///
    /// Presence of the required text fields is not checked here.
    #[must_use]
    pub fn new(id: String, fields: NewRecord, now: OffsetDateTime) -> Self {
        Self {
            id,
            name: fields.name,
            surname: fields.surname,
            phone: fields.phone,
            policy_type: fields.policy_type,
            policy_number: fields.policy_number,
            company: fields.company,
            start_date: fields.start_date,
            end_date: fields.end_date,
            notes: fields.notes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merges `patch` over this record and refreshes `updated_at`.
    ///
    /// `id` and `created_at` are untouched: the patch type has no slot for them,
    /// so values a caller sends for those keys are dropped during decoding.
    pub fn apply(&mut self, patch: RecordPatch, now: OffsetDateTime) {
        let RecordPatch {
            name,
            surname,
            phone,
            policy_type,
            policy_number,
            company,
            start_date,
            end_date,
            notes,
        } = patch;

        if let Some(v) = name {
            self.name = v;
        }
        if let Some(v) = surname {
            self.surname = v;
        }
        if let Some(v) = phone {
            self.phone = v;
        }
        if let Some(v) = policy_type {
            self.policy_type = v;
        }
        if let Some(v) = policy_number {
            self.policy_number = v;
        }
        if let Some(v) = company {
            self.company = v;
        }
        if let Some(v) = start_date {
            self.start_date = v;
        }
        if let Some(v) = end_date {
            self.end_date = v;
        }
        if let Some(v) = notes {
            self.notes = v;
        }
        self.updated_at = now;
    }

    /// Search predicate.
    ///
    /// Text fields match case-insensitively; `phone` is compared verbatim
    /// against the raw query. An empty query matches everything.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let needle = query.to_lowercase();
        let folded = [
            &self.name,
            &self.surname,
            &self.policy_type,
            &self.policy_number,
            &self.company,
        ];
        folded
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
            || self.phone.contains(query)
    }

    /// Whether `end_date` falls in the inclusive window `[today, today + days]`.
    ///
    /// Negative `days` never matches. A window reaching past the last
    /// representable date is clamped to it.
    #[must_use]
    pub fn ends_within(&self, today: Date, days: i64) -> bool {
        if days < 0 {
            return false;
        }
        let last = today
            .checked_add(Duration::days(days.min(MAX_WINDOW_DAYS)))
            .unwrap_or(Date::MAX);
        self.end_date >= today && self.end_date <= last
    }
}

/// Caller-supplied fields for a new record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub policy_type: String,
    #[serde(default)]
    pub policy_number: String,
    #[serde(default)]
    pub company: String,
    #[serde(with = "calendar_date")]
    pub start_date: Date,
    #[serde(with = "calendar_date")]
    pub end_date: Date,
    #[serde(default)]
    pub notes: String,
}

/// Partial update for an existing record. Absent fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(
        default,
        with = "calendar_date::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date: Option<Date>,
    #[serde(
        default,
        with = "calendar_date::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use time::macros::{date, datetime};

    use super::*;

    fn sample_fields() -> NewRecord {
        NewRecord {
            name: "Ayşe".to_string(),
            surname: "Yılmaz".to_string(),
            phone: "+90 532 000 11 22".to_string(),
            policy_type: "Kasko".to_string(),
            policy_number: "KSK-2026-001".to_string(),
            company: "Anadolu Sigorta".to_string(),
            start_date: date!(2026 - 01 - 01),
            end_date: date!(2026 - 12 - 31),
            notes: String::new(),
        }
    }

    fn sample_record() -> Record {
        Record::new(
            "rec-1".to_string(),
            sample_fields(),
            datetime!(2026-01-01 09:00 UTC),
        )
    }

    #[test]
    fn serde_camel_case_keys() {
        let json = serde_json::to_value(sample_record()).unwrap();
        for key in [
            "id",
            "policyType",
            "policyNumber",
            "startDate",
            "endDate",
            "createdAt",
            "updatedAt",
        ] {
            assert!(json.get(key).is_some(), "missing key {key} in {json}");
        }
        assert!(json.get("policy_type").is_none());
        assert_eq!(json["endDate"], "2026-12-31");
    }

    #[test]
    fn reads_timestamps_with_fractional_seconds() {
        let json = serde_json::json!({
            "id": "legacy",
            "name": "Ali",
            "surname": "Demir",
            "phone": "555",
            "policyType": "DASK",
            "startDate": "2025-05-01",
            "endDate": "2026-05-01",
            "createdAt": "2025-05-01T08:15:30.123Z",
            "updatedAt": "2025-05-01T08:15:30.123Z"
        });
        let record: Record = serde_json::from_value(json).unwrap();
        assert_eq!(record.policy_number, "");
        assert_eq!(record.company, "");
        assert_eq!(record.end_date, date!(2026 - 05 - 01));
    }

    #[test]
    fn apply_merges_present_fields_only() {
        let mut record = sample_record();
        let patch = RecordPatch {
            phone: Some("0212 555 00 00".to_string()),
            end_date: Some(date!(2027 - 01 - 15)),
            ..RecordPatch::default()
        };

        record.apply(patch, datetime!(2026-02-01 10:00 UTC));

        assert_eq!(record.phone, "0212 555 00 00");
        assert_eq!(record.end_date, date!(2027 - 01 - 15));
        assert_eq!(record.name, "Ayşe");
        assert_eq!(record.updated_at, datetime!(2026-02-01 10:00 UTC));
        assert_eq!(record.created_at, datetime!(2026-01-01 09:00 UTC));
    }

    #[test]
    fn patch_ignores_identity_keys_from_callers() {
        let patch: RecordPatch = serde_json::from_value(serde_json::json!({
            "id": "hijacked",
            "createdAt": "1999-01-01T00:00:00Z",
            "notes": "renewal called"
        }))
        .unwrap();
        let mut record = sample_record();

        record.apply(patch, datetime!(2026-02-01 10:00 UTC));

        assert_eq!(record.id, "rec-1");
        assert_eq!(record.created_at, datetime!(2026-01-01 09:00 UTC));
        assert_eq!(record.notes, "renewal called");
    }

    #[test]
    fn matches_text_fields_case_insensitively() {
        let record = sample_record();
        assert!(record.matches("kasko"));
        assert!(record.matches("ANADOLU"));
        assert!(record.matches("ksk-2026"));
        assert!(!record.matches("trafik"));
    }

    #[test]
    fn matches_phone_verbatim() {
        let mut record = sample_record();
        record.phone = "ext-ABC".to_string();
        record.name = "x".to_string();
        record.surname = "y".to_string();
        record.policy_type = "z".to_string();
        record.policy_number = String::new();
        record.company = String::new();

        assert!(record.matches("ABC"));
        assert!(!record.matches("abc"));
    }

    #[test]
    fn ends_within_window_edges() {
        let mut record = sample_record();
        let today = date!(2026 - 06 - 01);

        record.end_date = today;
        assert!(record.ends_within(today, 0));
        assert!(!record.ends_within(today, -1));

        record.end_date = date!(2026 - 06 - 08);
        assert!(record.ends_within(today, 7));
        assert!(!record.ends_within(today, 6));

        record.end_date = date!(2026 - 05 - 31);
        assert!(!record.ends_within(today, 30));
    }

    #[test]
    fn ends_within_clamps_huge_horizon() {
        let record = sample_record();
        assert!(record.ends_within(date!(2026 - 01 - 01), i64::MAX));
    }

    proptest! {
        #[test]
        fn empty_query_always_matches(name in ".*", phone in ".*") {
            let mut record = sample_record();
            record.name = name;
            record.phone = phone;
            prop_assert!(record.matches(""));
        }

        #[test]
        fn window_membership_agrees_with_day_offset(offset in -400i64..400, days in -5i64..400) {
            let today = date!(2026 - 06 - 01);
            let mut record = sample_record();
            record.end_date = today + Duration::days(offset);
            let expected = days >= 0 && offset >= 0 && offset <= days;
            prop_assert_eq!(record.ends_within(today, days), expected);
        }
    }
}

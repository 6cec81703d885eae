use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Number of tracked clock slots per day.
pub const SLOT_COUNT: usize = 24;

/// Upper bound for a single slot counter on one day.
pub const MAX_SLOT_COUNT: i32 = 10_000;

pub const RATING_MIN: i32 = 1;
pub const RATING_MAX: i32 = 5;

/// One of the 24 repeating clock times ("00:00", "01:01", ... "23:23").
///
/// Serialized as its label so slot maps read naturally in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSlot(u8);

impl TimeSlot {
    pub fn from_index(index: usize) -> Option<Self> {
        (index < SLOT_COUNT).then(|| Self(index as u8))
    }

    pub fn all() -> impl Iterator<Item = TimeSlot> {
        (0..SLOT_COUNT as u8).map(TimeSlot)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn label(self) -> String {
        format!("{:02}:{:02}", self.0, self.0)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("unknown time slot: {0}")]
pub struct UnknownTimeSlot(pub String);

impl FromStr for TimeSlot {
    type Err = UnknownTimeSlot;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownTimeSlot(s.to_string());
        let (hour, minute) = s.split_once(':').ok_or_else(unknown)?;
        if hour.len() != 2 || hour != minute {
            return Err(unknown());
        }
        let hour: usize = hour.parse().map_err(|_| unknown())?;
        Self::from_index(hour).ok_or_else(unknown)
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = UnknownTimeSlot;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeSlot> for String {
    fn from(slot: TimeSlot) -> Self {
        slot.label()
    }
}

/// A single day of tracking data. `slot_counts[i]` is the counter for
/// `TimeSlot::from_index(i)`; `event_total` caches their sum.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "record_date")]
    pub date: NaiveDate,
    pub day_of_week: String,
    pub slot_counts: Vec<i32>,
    pub event_total: i32,

    pub subjective_synchro: Option<i32>,
    pub subjective_mood: Option<i32>,
    pub productivity: Option<i32>,
    pub mental_focus: Option<i32>,
    pub mental_clarity: Option<i32>,
    pub mental_calm: Option<i32>,
    pub mental_energy: Option<i32>,
    pub mental_motivation: Option<i32>,
    pub mental_creativity: Option<i32>,
    pub stress: Option<i32>,

    pub sleep_minutes: Option<i32>,
    pub heart_rate: Option<i32>,
    pub resting_heart_rate: Option<i32>,
    pub steps: Option<i32>,
    pub weight_kg: Option<f64>,

    pub calories: Option<i32>,
    pub carbs_g: Option<f64>,
    pub protein_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub caffeine_mg: Option<f64>,
    pub alcohol_units: Option<f64>,

    pub moon_phase_deg: Option<f64>,
    pub earth_sun_distance_au: Option<f64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DailyRecord {
    /// An empty record for `date`: all slots zero, every metric absent.
    pub fn new(user_id: Uuid, date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            date,
            day_of_week: weekday_name(date.weekday()).to_string(),
            slot_counts: vec![0; SLOT_COUNT],
            event_total: 0,
            subjective_synchro: None,
            subjective_mood: None,
            productivity: None,
            mental_focus: None,
            mental_clarity: None,
            mental_calm: None,
            mental_energy: None,
            mental_motivation: None,
            mental_creativity: None,
            stress: None,
            sleep_minutes: None,
            heart_rate: None,
            resting_heart_rate: None,
            steps: None,
            weight_kg: None,
            calories: None,
            carbs_g: None,
            protein_g: None,
            fat_g: None,
            caffeine_mg: None,
            alcohol_units: None,
            moon_phase_deg: None,
            earth_sun_distance_au: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn slot(&self, slot: TimeSlot) -> i32 {
        self.slot_counts.get(slot.index()).copied().unwrap_or(0)
    }

    /// Sum of all slot counters, widened so stored values cannot overflow it.
    pub fn slot_sum(&self) -> i64 {
        self.slot_counts.iter().map(|c| i64::from(*c)).sum()
    }

    /// Overwrites every field that is present in `fields`, then restores the
    /// `event_total` invariant. Absent fields keep their current value.
    pub fn apply(&mut self, fields: &RecordFields) -> Result<(), EventTotalOverflow> {
        macro_rules! merge {
            ($($name:ident),* $(,)?) => {
                $(if let Some(v) = fields.$name { self.$name = Some(v); })*
            };
        }
        merge!(
            subjective_synchro,
            subjective_mood,
            productivity,
            mental_focus,
            mental_clarity,
            mental_calm,
            mental_energy,
            mental_motivation,
            mental_creativity,
            stress,
            sleep_minutes,
            heart_rate,
            resting_heart_rate,
            steps,
            weight_kg,
            calories,
            carbs_g,
            protein_g,
            fat_g,
            caffeine_mg,
            alcohol_units,
            moon_phase_deg,
            earth_sun_distance_au,
        );

        self.slot_counts.resize(SLOT_COUNT, 0);
        if let Some(slots) = &fields.slots {
            for (slot, count) in slots {
                self.slot_counts[slot.index()] = *count;
            }
        }
        self.recompute_event_total()
    }

    /// Leaves `event_total` untouched if the slot sum does not fit its column.
    pub fn recompute_event_total(&mut self) -> Result<(), EventTotalOverflow> {
        let total = self.slot_sum();
        self.event_total = i32::try_from(total).map_err(|_| EventTotalOverflow(total))?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("event total {0} exceeds the storable range")]
pub struct EventTotalOverflow(pub i64);

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn validate_slot_counts(slots: &BTreeMap<TimeSlot, i32>) -> Result<(), ValidationError> {
    if slots
        .values()
        .any(|count| !(0..=MAX_SLOT_COUNT).contains(count))
    {
        let mut err = ValidationError::new("slot_count");
        err.message = Some(format!("Slot counts must be between 0 and {}", MAX_SLOT_COUNT).into());
        return Err(err);
    }
    Ok(())
}

/// Writable fields shared by create and patch bodies. Every field is optional.
#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct RecordFields {
    #[validate(range(min = 1, max = 5, message = "Synchronicity must be between 1 and 5"))]
    pub subjective_synchro: Option<i32>,
    #[validate(range(min = 1, max = 5, message = "Mood must be between 1 and 5"))]
    pub subjective_mood: Option<i32>,
    #[validate(range(min = 1, max = 5, message = "Productivity must be between 1 and 5"))]
    pub productivity: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub mental_focus: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub mental_clarity: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub mental_calm: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub mental_energy: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub mental_motivation: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub mental_creativity: Option<i32>,
    #[validate(range(min = 1, max = 5, message = "Stress must be between 1 and 5"))]
    pub stress: Option<i32>,

    /// Minutes slept. Reported in hours by the analytics layer.
    #[validate(range(min = 0, max = 1440, message = "Sleep must be between 0 and 1440 minutes"))]
    pub sleep_minutes: Option<i32>,
    #[validate(range(min = 0, max = 300))]
    pub heart_rate: Option<i32>,
    #[validate(range(min = 0, max = 300))]
    pub resting_heart_rate: Option<i32>,
    #[validate(range(min = 0))]
    pub steps: Option<i32>,
    #[validate(range(min = 0.0))]
    pub weight_kg: Option<f64>,

    #[validate(range(min = 0))]
    pub calories: Option<i32>,
    #[validate(range(min = 0.0))]
    pub carbs_g: Option<f64>,
    #[validate(range(min = 0.0))]
    pub protein_g: Option<f64>,
    #[validate(range(min = 0.0))]
    pub fat_g: Option<f64>,
    #[validate(range(min = 0.0))]
    pub caffeine_mg: Option<f64>,
    #[validate(range(min = 0.0))]
    pub alcohol_units: Option<f64>,

    #[validate(range(min = 0.0, max = 360.0, message = "Moon phase must be between 0 and 360 degrees"))]
    pub moon_phase_deg: Option<f64>,
    #[validate(range(min = 0.0))]
    pub earth_sun_distance_au: Option<f64>,

    /// Slot label to count, e.g. `{"07:07": 2}`. Unlisted slots are untouched.
    #[validate(custom = "validate_slot_counts")]
    pub slots: Option<BTreeMap<TimeSlot, i32>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRecordRequest {
    pub date: NaiveDate,
    #[serde(flatten)]
    #[validate]
    pub fields: RecordFields,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Deserialize)]
pub struct RecordQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub order: SortOrder,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_time_slot_labels() {
        let labels: Vec<String> = TimeSlot::all().map(|s| s.label()).collect();
        assert_eq!(labels.len(), SLOT_COUNT);
        assert_eq!(labels[0], "00:00");
        assert_eq!(labels[7], "07:07");
        assert_eq!(labels[23], "23:23");
    }

    #[test]
    fn test_time_slot_parse() {
        assert_eq!("11:11".parse::<TimeSlot>().unwrap().index(), 11);
        assert!("11:12".parse::<TimeSlot>().is_err());
        assert!("24:24".parse::<TimeSlot>().is_err());
        assert!("7:7".parse::<TimeSlot>().is_err());
        assert!("noon".parse::<TimeSlot>().is_err());
    }

    #[test]
    fn test_new_record_derives_weekday() {
        let record = DailyRecord::new(Uuid::new_v4(), date(2024, 1, 1));
        assert_eq!(record.day_of_week, "Monday");
        assert_eq!(record.slot_counts.len(), SLOT_COUNT);
        assert_eq!(record.event_total, 0);
    }

    #[test]
    fn test_apply_recomputes_event_total() {
        let mut record = DailyRecord::new(Uuid::new_v4(), date(2024, 1, 1));
        let fields: RecordFields =
            serde_json::from_str(r#"{"slots":{"07:07":3,"11:11":2},"subjective_mood":4}"#).unwrap();
        record.apply(&fields).unwrap();
        assert_eq!(record.event_total, 5);
        assert_eq!(i64::from(record.event_total), record.slot_sum());
        assert_eq!(record.subjective_mood, Some(4));

        let patch: RecordFields = serde_json::from_str(r#"{"slots":{"07:07":1}}"#).unwrap();
        record.apply(&patch).unwrap();
        assert_eq!(record.slot("07:07".parse().unwrap()), 1);
        assert_eq!(record.event_total, 3);
        // untouched by the second patch
        assert_eq!(record.subjective_mood, Some(4));
    }

    #[test]
    fn test_apply_repairs_short_slot_vector() {
        let mut record = DailyRecord::new(Uuid::new_v4(), date(2024, 1, 1));
        record.slot_counts = vec![1, 2];
        record.apply(&RecordFields::default()).unwrap();
        assert_eq!(record.slot_counts.len(), SLOT_COUNT);
        assert_eq!(record.event_total, 3);
    }

    #[test]
    fn test_rating_out_of_range_fails_validation() {
        let fields: RecordFields = serde_json::from_str(r#"{"subjective_mood":7}"#).unwrap();
        assert!(fields.validate().is_err());
        let fields: RecordFields = serde_json::from_str(r#"{"subjective_mood":5}"#).unwrap();
        assert!(fields.validate().is_ok());
    }

    #[test]
    fn test_negative_slot_count_fails_validation() {
        let fields: RecordFields = serde_json::from_str(r#"{"slots":{"03:03":-1}}"#).unwrap();
        assert!(fields.validate().is_err());
    }

    #[test]
    fn test_slot_count_above_max_fails_validation() {
        let fields: RecordFields =
            serde_json::from_str(r#"{"slots":{"00:00":2147483647,"01:01":1}}"#).unwrap();
        assert!(fields.validate().is_err());

        let json = format!(r#"{{"slots":{{"05:05":{}}}}}"#, MAX_SLOT_COUNT + 1);
        let fields: RecordFields = serde_json::from_str(&json).unwrap();
        assert!(fields.validate().is_err());
    }

    #[test]
    fn test_event_total_at_max_slot_counts() {
        let slots: BTreeMap<TimeSlot, i32> = TimeSlot::all().map(|s| (s, MAX_SLOT_COUNT)).collect();
        let fields = RecordFields {
            slots: Some(slots),
            ..RecordFields::default()
        };
        assert!(fields.validate().is_ok());

        let mut record = DailyRecord::new(Uuid::new_v4(), date(2024, 1, 1));
        record.apply(&fields).unwrap();
        assert_eq!(i64::from(record.event_total), record.slot_sum());
        assert_eq!(record.event_total, MAX_SLOT_COUNT * SLOT_COUNT as i32);
    }

    #[test]
    fn test_apply_reports_overflowing_stored_slots() {
        let mut record = DailyRecord::new(Uuid::new_v4(), date(2024, 1, 1));
        record.slot_counts = vec![i32::MAX; SLOT_COUNT];
        let result = record.apply(&RecordFields::default());
        assert_eq!(result, Err(EventTotalOverflow(i64::from(i32::MAX) * SLOT_COUNT as i64)));
        assert_eq!(record.event_total, 0);
    }

    #[test]
    fn test_unknown_slot_label_rejected() {
        let result = serde_json::from_str::<RecordFields>(r#"{"slots":{"03:04":1}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_create_request_flattens_fields() {
        let req: CreateRecordRequest =
            serde_json::from_str(r#"{"date":"2024-01-08","subjective_synchro":3}"#).unwrap();
        assert_eq!(req.date, date(2024, 1, 8));
        assert_eq!(req.fields.subjective_synchro, Some(3));
    }

    #[test]
    fn test_create_request_rejects_malformed_date() {
        let result = serde_json::from_str::<CreateRecordRequest>(r#"{"date":"2024-13-40"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_record_query_defaults_to_descending() {
        let q: RecordQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.order, SortOrder::Desc);
    }
}

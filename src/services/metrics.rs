use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::record::DailyRecord;

const MINUTES_PER_HOUR: f64 = 60.0;

/// Statically known record fields that analytics can be computed over.
///
/// `Metric::value` is the only place record fields are read for statistics,
/// and therefore the only place sleep is converted from minutes to hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[serde(alias = "subjectivesynchro")]
    SubjectiveSynchro,
    #[serde(alias = "subjectivemood")]
    SubjectiveMood,
    Productivity,
    MentalFocus,
    MentalClarity,
    MentalCalm,
    MentalEnergy,
    MentalMotivation,
    MentalCreativity,
    Stress,
    SleepHours,
    HeartRate,
    RestingHeartRate,
    Steps,
    WeightKg,
    Calories,
    CarbsG,
    ProteinG,
    FatG,
    CaffeineMg,
    AlcoholUnits,
    MoonPhaseDeg,
    EarthSunDistanceAu,
    #[serde(alias = "synchrosum")]
    EventTotal,
}

impl Metric {
    #[cfg(test)]
    pub const ALL: [Metric; 24] = [
        Metric::SubjectiveSynchro,
        Metric::SubjectiveMood,
        Metric::Productivity,
        Metric::MentalFocus,
        Metric::MentalClarity,
        Metric::MentalCalm,
        Metric::MentalEnergy,
        Metric::MentalMotivation,
        Metric::MentalCreativity,
        Metric::Stress,
        Metric::SleepHours,
        Metric::HeartRate,
        Metric::RestingHeartRate,
        Metric::Steps,
        Metric::WeightKg,
        Metric::Calories,
        Metric::CarbsG,
        Metric::ProteinG,
        Metric::FatG,
        Metric::CaffeineMg,
        Metric::AlcoholUnits,
        Metric::MoonPhaseDeg,
        Metric::EarthSunDistanceAu,
        Metric::EventTotal,
    ];

    /// Value of this metric on `record` in reporting units, `None` if absent.
    pub fn value(self, record: &DailyRecord) -> Option<f64> {
        let int = |v: Option<i32>| v.map(f64::from);
        match self {
            Metric::SubjectiveSynchro => int(record.subjective_synchro),
            Metric::SubjectiveMood => int(record.subjective_mood),
            Metric::Productivity => int(record.productivity),
            Metric::MentalFocus => int(record.mental_focus),
            Metric::MentalClarity => int(record.mental_clarity),
            Metric::MentalCalm => int(record.mental_calm),
            Metric::MentalEnergy => int(record.mental_energy),
            Metric::MentalMotivation => int(record.mental_motivation),
            Metric::MentalCreativity => int(record.mental_creativity),
            Metric::Stress => int(record.stress),
            Metric::SleepHours => int(record.sleep_minutes).map(|m| m / MINUTES_PER_HOUR),
            Metric::HeartRate => int(record.heart_rate),
            Metric::RestingHeartRate => int(record.resting_heart_rate),
            Metric::Steps => int(record.steps),
            Metric::WeightKg => record.weight_kg,
            Metric::Calories => int(record.calories),
            Metric::CarbsG => record.carbs_g,
            Metric::ProteinG => record.protein_g,
            Metric::FatG => record.fat_g,
            Metric::CaffeineMg => record.caffeine_mg,
            Metric::AlcoholUnits => record.alcohol_units,
            Metric::MoonPhaseDeg => record.moon_phase_deg,
            Metric::EarthSunDistanceAu => record.earth_sun_distance_au,
            Metric::EventTotal => Some(f64::from(record.event_total)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Metric::SubjectiveSynchro => "subjective_synchro",
            Metric::SubjectiveMood => "subjective_mood",
            Metric::Productivity => "productivity",
            Metric::MentalFocus => "mental_focus",
            Metric::MentalClarity => "mental_clarity",
            Metric::MentalCalm => "mental_calm",
            Metric::MentalEnergy => "mental_energy",
            Metric::MentalMotivation => "mental_motivation",
            Metric::MentalCreativity => "mental_creativity",
            Metric::Stress => "stress",
            Metric::SleepHours => "sleep_hours",
            Metric::HeartRate => "heart_rate",
            Metric::RestingHeartRate => "resting_heart_rate",
            Metric::Steps => "steps",
            Metric::WeightKg => "weight_kg",
            Metric::Calories => "calories",
            Metric::CarbsG => "carbs_g",
            Metric::ProteinG => "protein_g",
            Metric::FatG => "fat_g",
            Metric::CaffeineMg => "caffeine_mg",
            Metric::AlcoholUnits => "alcohol_units",
            Metric::MoonPhaseDeg => "moon_phase_deg",
            Metric::EarthSunDistanceAu => "earth_sun_distance_au",
            Metric::EventTotal => "event_total",
        }
    }

    /// Human label used in generated insight text.
    pub fn display_name(self) -> &'static str {
        match self {
            Metric::SubjectiveSynchro => "synchronicity",
            Metric::SubjectiveMood => "mood",
            Metric::Productivity => "productivity",
            Metric::MentalFocus => "focus",
            Metric::MentalClarity => "clarity",
            Metric::MentalCalm => "calm",
            Metric::MentalEnergy => "energy",
            Metric::MentalMotivation => "motivation",
            Metric::MentalCreativity => "creativity",
            Metric::Stress => "stress",
            Metric::SleepHours => "sleep",
            Metric::HeartRate => "heart rate",
            Metric::RestingHeartRate => "resting heart rate",
            Metric::Steps => "steps",
            Metric::WeightKg => "weight",
            Metric::Calories => "calories",
            Metric::CarbsG => "carbs",
            Metric::ProteinG => "protein",
            Metric::FatG => "fat",
            Metric::CaffeineMg => "caffeine",
            Metric::AlcoholUnits => "alcohol",
            Metric::MoonPhaseDeg => "moon phase",
            Metric::EarthSunDistanceAu => "earth-sun distance",
            Metric::EventTotal => "daily event count",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("unknown metric: {0}")]
pub struct UnknownMetric(pub String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| UnknownMetric(s.to_string()))
    }
}

use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

entity_id!(UserId);
entity_id!(ExerciseId);
entity_id!(PlanId);
entity_id!(SessionId);

/// Storage identifier handed out by the image store, kept opaque here.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub String);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        }
    }

    /// Day-of-week for a calendar date, computed locally and never stored
    /// outside plan exercises.
    pub fn for_date(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scheduled exercise inside a weekly plan. `reps` keeps the plan's
/// range notation ("10" or "8-12") verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanExercise {
    pub exercise_id: ExerciseId,
    pub day_of_week: DayOfWeek,
    pub sets: i32,
    pub reps: String,
    pub weight: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetRecord {
    pub reps: i32,
    pub weight: f64,
    pub completed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExercise {
    pub exercise_id: ExerciseId,
    pub sets: Vec<SetRecord>,
}

/// Editable exercise fields; update replaces all of them at once.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExerciseFields {
    pub name: String,
    pub description: Option<String>,
    pub muscle_group: String,
    pub image_id: Option<ImageId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionInput {
    pub date: NaiveDate,
    pub duration: Option<i32>,
    pub exercises: Vec<SessionExercise>,
    pub notes: Option<String>,
}

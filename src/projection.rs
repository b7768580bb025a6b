//! Expanding a weekly plan into a draft session for one calendar date.

use chrono::NaiveDate;

use crate::model::{DayOfWeek, PlanExercise, SessionExercise, SetRecord};

/// Leading integer of a reps notation: "8-12" -> 8, "10" -> 10, anything
/// unparsable -> 0.
pub fn leading_reps(reps: &str) -> i32 {
    reps.split('-')
        .next()
        .and_then(|head| head.trim().parse().ok())
        .unwrap_or(0)
}

/// Selects the plan exercises scheduled for the date's weekday and prefills
/// one untouched set row per planned set. An empty result means nothing is
/// planned for that day, which is not an error.
pub fn draft_for_date(exercises: &[PlanExercise], date: NaiveDate) -> Vec<SessionExercise> {
    let day = DayOfWeek::for_date(date);
    exercises
        .iter()
        .filter(|exercise| exercise.day_of_week == day)
        .map(|exercise| {
            let set = SetRecord {
                reps: leading_reps(&exercise.reps),
                weight: exercise.weight.unwrap_or(0.0),
                completed: false,
            };
            SessionExercise {
                exercise_id: exercise.exercise_id,
                sets: vec![set; exercise.sets.max(0) as usize],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExerciseId;

    fn planned(exercise_id: i64, day: DayOfWeek, sets: i32, reps: &str) -> PlanExercise {
        PlanExercise {
            exercise_id: ExerciseId(exercise_id),
            day_of_week: day,
            sets,
            reps: reps.to_string(),
            weight: Some(40.0),
            notes: None,
        }
    }

    #[test]
    fn leading_reps_takes_range_start() {
        assert_eq!(leading_reps("8-12"), 8);
        assert_eq!(leading_reps("10"), 10);
        assert_eq!(leading_reps("abc"), 0);
        assert_eq!(leading_reps(""), 0);
    }

    #[test]
    fn draft_prefills_planned_sets() {
        // 2024-03-04 is a Monday.
        let date = "2024-03-04".parse::<NaiveDate>().expect("date");
        let exercises = vec![planned(3, DayOfWeek::Monday, 4, "8-12")];
        let draft = draft_for_date(&exercises, date);
        assert_eq!(draft.len(), 1);
        assert_eq!(draft[0].exercise_id, ExerciseId(3));
        assert_eq!(draft[0].sets.len(), 4);
        for set in &draft[0].sets {
            assert_eq!(set.reps, 8);
            assert_eq!(set.weight, 40.0);
            assert!(!set.completed);
        }
    }

    #[test]
    fn draft_without_plan_weight_defaults_to_zero() {
        let date = "2024-03-04".parse::<NaiveDate>().expect("date");
        let mut exercise = planned(3, DayOfWeek::Monday, 1, "10");
        exercise.weight = None;
        let draft = draft_for_date(&[exercise], date);
        assert_eq!(draft[0].sets[0].weight, 0.0);
    }

    #[test]
    fn other_days_project_nothing() {
        // 2024-03-05 is a Tuesday.
        let date = "2024-03-05".parse::<NaiveDate>().expect("date");
        let exercises = vec![
            planned(1, DayOfWeek::Monday, 3, "10"),
            planned(2, DayOfWeek::Wednesday, 3, "10"),
        ];
        assert!(draft_for_date(&exercises, date).is_empty());
    }
}

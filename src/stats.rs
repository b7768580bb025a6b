//! Derived aggregates, recomputed on every read and never persisted.

use std::collections::HashSet;

use crate::entities::{plan, session};
use crate::model::{ExerciseId, SessionExercise};

/// Training volume of one logged exercise: sum of reps x weight over its sets.
pub fn exercise_volume(exercise: &SessionExercise) -> f64 {
    exercise
        .sets
        .iter()
        .map(|set| f64::from(set.reps) * set.weight)
        .sum()
}

pub fn session_volume(exercises: &[SessionExercise]) -> f64 {
    exercises.iter().map(exercise_volume).sum()
}

pub fn total_volume(sessions: &[session::Model]) -> f64 {
    sessions
        .iter()
        .map(|session| session_volume(&session.exercises.0))
        .sum()
}

pub fn total_sets(exercises: &[SessionExercise]) -> usize {
    exercises.iter().map(|exercise| exercise.sets.len()).sum()
}

pub fn completed_sets(exercises: &[SessionExercise]) -> usize {
    exercises
        .iter()
        .flat_map(|exercise| &exercise.sets)
        .filter(|set| set.completed)
        .count()
}

/// Average duration in minutes across a history window; sessions without a
/// recorded duration count as zero, and an empty window averages to 0.
pub fn average_duration(sessions: &[session::Model]) -> f64 {
    if sessions.is_empty() {
        return 0.0;
    }
    let total: i64 = sessions
        .iter()
        .map(|session| i64::from(session.duration.unwrap_or(0)))
        .sum();
    total as f64 / sessions.len() as f64
}

/// Average weight per set across every set in the window; 0 when no sets.
pub fn average_set_weight(sessions: &[session::Model]) -> f64 {
    let mut weight_sum = 0.0;
    let mut set_count = 0usize;
    for session in sessions {
        for exercise in &session.exercises.0 {
            for set in &exercise.sets {
                weight_sum += set.weight;
                set_count += 1;
            }
        }
    }
    if set_count == 0 {
        return 0.0;
    }
    weight_sum / set_count as f64
}

pub fn plan_exercise_ids(plan: &plan::Model) -> HashSet<ExerciseId> {
    plan.exercises
        .0
        .iter()
        .map(|exercise| exercise.exercise_id)
        .collect()
}

/// Retains sessions that touch at least one exercise referenced by the plan.
pub fn filter_by_plan<'a>(
    sessions: &'a [session::Model],
    plan: &plan::Model,
) -> Vec<&'a session::Model> {
    let ids = plan_exercise_ids(plan);
    sessions
        .iter()
        .filter(|session| {
            session
                .exercises
                .0
                .iter()
                .any(|exercise| ids.contains(&exercise.exercise_id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::entities::plan::PlanExercises;
    use crate::entities::session::SessionExercises;
    use crate::model::{DayOfWeek, PlanExercise, SetRecord};

    fn set(reps: i32, weight: f64) -> SetRecord {
        SetRecord {
            reps,
            weight,
            completed: false,
        }
    }

    fn logged(exercise_id: i64, sets: Vec<SetRecord>) -> SessionExercise {
        SessionExercise {
            exercise_id: ExerciseId(exercise_id),
            sets,
        }
    }

    fn session(date: &str, duration: Option<i32>, exercises: Vec<SessionExercise>) -> session::Model {
        let now = Utc::now();
        session::Model {
            id: 1,
            user_id: 1,
            date: date.parse::<NaiveDate>().expect("date"),
            duration,
            exercises: SessionExercises(exercises),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn plan_with(ids: &[i64]) -> plan::Model {
        let now = Utc::now();
        plan::Model {
            id: 1,
            user_id: 1,
            name: "Push day".to_string(),
            exercises: PlanExercises(
                ids.iter()
                    .map(|id| PlanExercise {
                        exercise_id: ExerciseId(*id),
                        day_of_week: DayOfWeek::Monday,
                        sets: 3,
                        reps: "10".to_string(),
                        weight: None,
                        notes: None,
                    })
                    .collect(),
            ),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn volume_sums_reps_times_weight() {
        let exercises = vec![logged(7, vec![set(10, 20.0), set(8, 25.0)])];
        assert_eq!(session_volume(&exercises), 400.0);
    }

    #[test]
    fn averages_over_empty_window_are_zero() {
        assert_eq!(average_duration(&[]), 0.0);
        assert_eq!(average_set_weight(&[]), 0.0);
        // Sessions exist but carry no sets: still no division by zero.
        let sessions = vec![session("2024-03-04", None, Vec::new())];
        assert_eq!(average_set_weight(&sessions), 0.0);
    }

    #[test]
    fn average_duration_counts_missing_as_zero() {
        let sessions = vec![
            session("2024-03-04", Some(60), Vec::new()),
            session("2024-03-05", None, Vec::new()),
        ];
        assert_eq!(average_duration(&sessions), 30.0);
    }

    #[test]
    fn completed_sets_only_counts_finished_ones() {
        let mut sets = vec![set(10, 20.0), set(8, 25.0), set(6, 30.0)];
        sets[0].completed = true;
        sets[2].completed = true;
        let exercises = vec![logged(7, sets)];
        assert_eq!(total_sets(&exercises), 3);
        assert_eq!(completed_sets(&exercises), 2);
    }

    #[test]
    fn plan_filter_keeps_sessions_touching_plan_exercises() {
        let plan = plan_with(&[1, 2]);
        let sessions = vec![
            session("2024-03-04", None, vec![logged(2, vec![set(10, 20.0)])]),
            session("2024-03-05", None, vec![logged(9, vec![set(10, 20.0)])]),
            session("2024-03-06", None, Vec::new()),
        ];
        let kept = filter_by_plan(&sessions, &plan);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].date, sessions[0].date);
    }
}

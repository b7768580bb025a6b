use chrono::{DateTime, NaiveDate, Utc};

use crate::app::{ExerciseEntry, PlanDetail, SessionDetail};
use crate::entities::session;
use crate::model::SetRecord;
use crate::stats;

fn has_text(value: &Option<String>) -> bool {
    value
        .as_deref()
        .map(|text| !text.trim().is_empty())
        .unwrap_or(false)
}

pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn format_weight(weight: f64) -> String {
    if weight.fract() == 0.0 {
        format!("{}kg", weight as i64)
    } else {
        format!("{weight:.1}kg")
    }
}

pub fn format_exercise_detail(entry: &ExerciseEntry) -> String {
    let exercise = &entry.exercise;
    let mut output = String::new();
    output.push_str(&format!("Exercise ID: {}\n", exercise.id));
    output.push_str(&format!("Name: {}\n", exercise.name));
    output.push_str(&format!("Muscle group: {}\n", exercise.muscle_group));
    if has_text(&exercise.description) {
        output.push_str(&format!(
            "Description: {}\n",
            exercise.description.as_deref().unwrap_or("")
        ));
    }
    match &entry.image_url {
        Some(url) => output.push_str(&format!("Image: {url}\n")),
        None => output.push_str("Image: (none)\n"),
    }
    output.push_str(&format!("Created: {}\n", format_datetime(exercise.created_at)));
    output.push_str(&format!("Updated: {}", format_datetime(exercise.updated_at)));
    output
}

pub fn format_exercise_line(entry: &ExerciseEntry) -> String {
    let exercise = &entry.exercise;
    let image = match &entry.image_url {
        Some(url) => url.to_string(),
        None => "-".to_string(),
    };
    format!(
        "{}: {} [{}] image: {}",
        exercise.id, exercise.name, exercise.muscle_group, image
    )
}

pub fn format_plan_detail(detail: &PlanDetail) -> String {
    let mut output = String::new();
    output.push_str(&format!("Plan ID: {}\n", detail.plan.id));
    output.push_str(&format!("Name: {}\n", detail.plan.name));
    output.push_str(&format!("Created: {}\n", format_datetime(detail.plan.created_at)));
    output.push_str(&format!("Updated: {}\n", format_datetime(detail.plan.updated_at)));
    output.push('\n');
    if detail.exercises.is_empty() {
        output.push_str("Exercises: (none)");
        return output;
    }
    output.push_str("Exercises:\n");
    for entry in &detail.exercises {
        let name = entry
            .exercise
            .as_ref()
            .map(|exercise| exercise.name.as_str())
            .unwrap_or("(missing exercise)");
        let planned = &entry.planned;
        let weight = planned
            .weight
            .map(|weight| format!(" @ {}", format_weight(weight)))
            .unwrap_or_default();
        output.push_str(&format!(
            "- {}: {} x{} of {}{} (exercise id {})\n",
            planned.day_of_week, name, planned.sets, planned.reps, weight, planned.exercise_id
        ));
        if has_text(&planned.notes) {
            output.push_str(&format!(
                "  Notes: {}\n",
                planned.notes.as_deref().unwrap_or("")
            ));
        }
    }
    output.trim_end().to_string()
}

pub fn format_session_detail(detail: &SessionDetail) -> String {
    let session = &detail.session;
    let logged: Vec<_> = detail.exercises.iter().map(|e| e.logged.clone()).collect();
    let mut output = String::new();
    output.push_str(&format!("Session ID: {}\n", session.id));
    output.push_str(&format!("Date: {}\n", format_date(session.date)));
    match session.duration {
        Some(minutes) => output.push_str(&format!("Duration: {minutes} min\n")),
        None => output.push_str("Duration: (none)\n"),
    }
    if has_text(&session.notes) {
        output.push_str(&format!("Notes: {}\n", session.notes.as_deref().unwrap_or("")));
    }
    output.push_str(&format!(
        "Sets: {}/{} completed, volume {}\n",
        stats::completed_sets(&logged),
        stats::total_sets(&logged),
        format_weight(stats::session_volume(&logged))
    ));
    output.push('\n');
    if detail.exercises.is_empty() {
        output.push_str("Exercises: (none)");
        return output;
    }
    output.push_str("Exercises:\n");
    for entry in &detail.exercises {
        let name = entry
            .exercise
            .as_ref()
            .map(|exercise| exercise.name.as_str())
            .unwrap_or("(missing exercise)");
        output.push_str(&format!(
            "- {} (exercise id {}):\n",
            name, entry.logged.exercise_id
        ));
        for set in &entry.logged.sets {
            let mark = if set.completed { " [done]" } else { "" };
            output.push_str(&format!(
                "  - {} reps @ {}{mark}\n",
                set.reps,
                format_weight(set.weight)
            ));
        }
    }
    output.trim_end().to_string()
}

pub fn format_session_line(detail: &SessionDetail) -> String {
    let logged: Vec<_> = detail.exercises.iter().map(|e| e.logged.clone()).collect();
    let duration = detail
        .session
        .duration
        .map(|minutes| format!("{minutes} min"))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} (session id {}): {} exercises, {} sets, volume {}, {}",
        format_date(detail.session.date),
        detail.session.id,
        detail.exercises.len(),
        stats::total_sets(&logged),
        format_weight(stats::session_volume(&logged)),
        duration
    )
}

pub fn format_sets(sets: &[SetRecord]) -> String {
    if sets.is_empty() {
        return "(no sets)".to_string();
    }
    sets.iter()
        .map(|set| {
            let mark = if set.completed { " [done]" } else { "" };
            format!("{}x{}{mark}", set.reps, format_weight(set.weight))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_stats(sessions: &[session::Model]) -> String {
    let mut output = String::new();
    output.push_str(&format!("Workouts: {}\n", sessions.len()));
    output.push_str(&format!(
        "Total volume: {}\n",
        format_weight(stats::total_volume(sessions))
    ));
    output.push_str(&format!(
        "Average duration: {:.1} min\n",
        stats::average_duration(sessions)
    ));
    output.push_str(&format!(
        "Average set weight: {}",
        format_weight(stats::average_set_weight(sessions))
    ));
    output
}

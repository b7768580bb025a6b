mod app;
mod cli;
mod db;
mod entities;
mod error;
mod model;
mod projection;
mod stats;
mod storage;
mod util;

use std::path::PathBuf;

use clap::Parser;

use crate::app::App;
use crate::cli::{
    Cli, Command, ExerciseAdd, ExerciseCommand, PlanCommand, SessionCommand, SessionDraft,
    SessionHistory, SessionSave, UserCommand,
};
use crate::error::AppError;
use crate::model::{
    DayOfWeek, ExerciseFields, ExerciseId, ImageId, PlanExercise, PlanId, SessionExercise,
    SessionId, SessionInput, SetRecord,
};
use crate::storage::ImageStore;
use crate::util::{
    format_date, format_datetime, format_exercise_detail, format_exercise_line,
    format_plan_detail, format_session_detail, format_session_line, format_sets, format_stats,
};

const DATA_DIR_ENV: &str = "FICHAS_HOME";

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    let data_dir = resolve_data_dir(cli.data_dir)?;
    let db_path = db::resolve_db_path(&data_dir);
    db::ensure_parent_dir(&db_path)?;
    let mut lock = db::open_lock(&db_path)?;
    let _guard = lock.write()?;

    let db = db::connect(&db_path).await?;
    db::ensure_schema(&db).await?;

    let user = match cli.user.as_deref() {
        Some(name) => App::resolve_identity(&db, name).await,
        None => None,
    };
    let images = ImageStore::new(db::resolve_images_dir(&data_dir));
    let app = App::new(db, images, user);

    match cli.command {
        Command::User(command) => handle_user(&app, command).await,
        Command::Exercise(command) => handle_exercise(&app, command).await,
        Command::Plan(command) => handle_plan(&app, command).await,
        Command::Session(command) => handle_session(&app, command).await,
    }
}

fn resolve_data_dir(flag: Option<PathBuf>) -> Result<PathBuf, AppError> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Ok(home) = std::env::var(DATA_DIR_ENV) {
        if !home.trim().is_empty() {
            return Ok(PathBuf::from(home));
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        if !home.trim().is_empty() {
            return Ok(PathBuf::from(home).join(".fichas"));
        }
    }
    Err(AppError::InvalidInput(format!(
        "cannot determine data directory; pass --data-dir or set {DATA_DIR_ENV}"
    )))
}

async fn handle_user(app: &App, command: UserCommand) -> Result<(), AppError> {
    match command {
        UserCommand::Register(args) => {
            let user = app.register_user(&args.name).await?;
            println!("Registered user ID: {}: {}", user.id, user.name);
        }
        UserCommand::Current(_) => match app.current_user().await {
            Some(user) => println!(
                "User ID: {}: {} (since {})",
                user.id,
                user.name,
                format_datetime(user.created_at)
            ),
            None => println!("Not signed in."),
        },
    }
    Ok(())
}

async fn handle_exercise(app: &App, command: ExerciseCommand) -> Result<(), AppError> {
    match command {
        ExerciseCommand::Add(args) => {
            let fields = exercise_fields_from(app, args).await?;
            let exercise = app.create_exercise(fields).await?;
            println!("Created exercise ID: {}: {}", exercise.id, exercise.name);
        }
        ExerciseCommand::List(_) => {
            let entries = app.list_exercises().await?;
            if entries.is_empty() {
                println!("No exercises found.");
                return Ok(());
            }
            for entry in &entries {
                println!("{}", format_exercise_line(entry));
            }
        }
        ExerciseCommand::Show(args) => match app.get_exercise(ExerciseId(args.id)).await? {
            Some(entry) => println!("{}", format_exercise_detail(&entry)),
            None => println!("Exercise ID: {} not found.", args.id),
        },
        ExerciseCommand::Update(args) => {
            let id = ExerciseId(args.id);
            let fields = exercise_fields_from(
                app,
                ExerciseAdd {
                    name: args.name,
                    muscle_group: args.muscle_group,
                    description: args.description,
                    image: args.image,
                    image_id: args.image_id,
                },
            )
            .await?;
            let exercise = app.update_exercise(id, fields).await?;
            println!("Updated exercise ID: {}: {}", exercise.id, exercise.name);
        }
        ExerciseCommand::Remove(args) => {
            app.delete_exercise(ExerciseId(args.id)).await?;
            println!("Exercise ID: {} removed.", args.id);
        }
        ExerciseCommand::Upload(args) => {
            let image_id = app.upload_image(&args.path).await?;
            println!("Uploaded image ID: {image_id}");
        }
        ExerciseCommand::UploadUrl(_) => {
            let (image_id, url) = app.generate_upload_url().await?;
            println!("Upload target ID: {image_id}");
            println!("Upload URL: {url}");
        }
    }
    Ok(())
}

async fn exercise_fields_from(app: &App, args: ExerciseAdd) -> Result<ExerciseFields, AppError> {
    let image_id = match args.image {
        Some(path) => Some(app.upload_image(&path).await?),
        None => args.image_id.map(ImageId),
    };
    Ok(ExerciseFields {
        name: args.name,
        description: args.description,
        muscle_group: args.muscle_group,
        image_id,
    })
}

async fn handle_plan(app: &App, command: PlanCommand) -> Result<(), AppError> {
    match command {
        PlanCommand::Add(args) => {
            let exercises = parse_plan_exercise_specs(&args.args)?;
            let plan = app.create_plan(args.name, exercises).await?;
            println!(
                "Created plan ID: {}: {} ({} exercises)",
                plan.id,
                plan.name,
                plan.exercises.0.len()
            );
        }
        PlanCommand::List(_) => {
            let plans = app.list_plans().await?;
            if plans.is_empty() {
                println!("No plans found.");
                return Ok(());
            }
            for plan in &plans {
                println!(
                    "{}: {} ({} exercises)",
                    plan.id,
                    plan.name,
                    plan.exercises.0.len()
                );
            }
        }
        PlanCommand::Show(args) => match app.get_plan(PlanId(args.id)).await? {
            Some(detail) => println!("{}", format_plan_detail(&detail)),
            None => println!("Plan ID: {} not found.", args.id),
        },
        PlanCommand::Update(args) => {
            let exercises = parse_plan_exercise_specs(&args.args)?;
            let plan = app.update_plan(PlanId(args.id), args.name, exercises).await?;
            println!("Updated plan ID: {}: {}", plan.id, plan.name);
        }
        PlanCommand::Remove(args) => {
            app.delete_plan(PlanId(args.id)).await?;
            println!("Plan ID: {} removed.", args.id);
        }
    }
    Ok(())
}

async fn handle_session(app: &App, command: SessionCommand) -> Result<(), AppError> {
    match command {
        SessionCommand::Save(args) => handle_session_save(app, args).await?,
        SessionCommand::Show(args) => match app.get_session_by_date(args.date).await? {
            Some(detail) => println!("{}", format_session_detail(&detail)),
            None => println!("No session for {}.", format_date(args.date)),
        },
        SessionCommand::History(args) => handle_session_history(app, args).await?,
        SessionCommand::Stats(args) => {
            let sessions = app.recent_sessions(args.limit).await?;
            println!("{}", format_stats(&sessions));
        }
        SessionCommand::ExerciseHistory(args) => {
            let entries = app
                .get_exercise_history(ExerciseId(args.exercise_id))
                .await?;
            if entries.is_empty() {
                println!("No history for exercise ID: {}.", args.exercise_id);
                return Ok(());
            }
            for entry in &entries {
                println!("{}: {}", format_date(entry.date), format_sets(&entry.sets));
            }
        }
        SessionCommand::Draft(args) => handle_session_draft(app, args).await?,
        SessionCommand::Remove(args) => {
            app.delete_session(SessionId(args.id)).await?;
            println!("Session ID: {} removed.", args.id);
        }
    }
    Ok(())
}

async fn handle_session_save(app: &App, args: SessionSave) -> Result<(), AppError> {
    let exercises = parse_session_exercise_specs(&args.args)?;
    let input = SessionInput {
        date: args.date,
        duration: args.duration,
        exercises,
        notes: args.notes,
    };
    let date = input.date;
    let session_id = app.save_session(input).await?;
    println!("Saved session ID: {} for {}", session_id, format_date(date));
    Ok(())
}

async fn handle_session_history(app: &App, args: SessionHistory) -> Result<(), AppError> {
    let details = match args.plan {
        Some(plan_id) => {
            let Some(plan_detail) = app.get_plan(PlanId(plan_id)).await? else {
                println!("Plan ID: {plan_id} not found.");
                return Ok(());
            };
            let sessions = app.recent_sessions(args.limit).await?;
            let kept: Vec<_> = stats::filter_by_plan(&sessions, &plan_detail.plan)
                .into_iter()
                .cloned()
                .collect();
            app.with_details(kept).await?
        }
        None => app.get_history(args.limit).await?,
    };
    if details.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }
    for detail in &details {
        println!("{}", format_session_line(detail));
    }
    Ok(())
}

async fn handle_session_draft(app: &App, args: SessionDraft) -> Result<(), AppError> {
    let Some(detail) = app.get_plan(PlanId(args.plan_id)).await? else {
        println!("Plan ID: {} not found.", args.plan_id);
        return Ok(());
    };
    let draft = projection::draft_for_date(&detail.plan.exercises.0, args.date);
    if draft.is_empty() {
        println!(
            "No exercises planned for {}.",
            DayOfWeek::for_date(args.date)
        );
        return Ok(());
    }
    let names: std::collections::HashMap<i64, &str> = detail
        .exercises
        .iter()
        .filter_map(|entry| {
            entry
                .exercise
                .as_ref()
                .map(|exercise| (exercise.id, exercise.name.as_str()))
        })
        .collect();
    println!(
        "Draft for {} ({}):",
        format_date(args.date),
        DayOfWeek::for_date(args.date)
    );
    for entry in &draft {
        let name = names
            .get(&entry.exercise_id.0)
            .copied()
            .unwrap_or("(missing exercise)");
        println!(
            "- {} (exercise id {}): {}",
            name,
            entry.exercise_id,
            format_sets(&entry.sets)
        );
    }
    Ok(())
}

#[derive(Debug)]
struct PlanExerciseBuilder {
    exercise_id: ExerciseId,
    day_of_week: Option<DayOfWeek>,
    sets: Option<i32>,
    reps: Option<String>,
    weight: Option<f64>,
    notes: Option<String>,
}

impl PlanExerciseBuilder {
    fn new(exercise_id: ExerciseId) -> Self {
        Self {
            exercise_id,
            day_of_week: None,
            sets: None,
            reps: None,
            weight: None,
            notes: None,
        }
    }

    fn into_exercise(self) -> Result<PlanExercise, AppError> {
        let id = self.exercise_id;
        Ok(PlanExercise {
            exercise_id: id,
            day_of_week: self.day_of_week.ok_or_else(|| {
                AppError::InvalidInput(format!("plan exercise {id} requires --day"))
            })?,
            sets: self.sets.ok_or_else(|| {
                AppError::InvalidInput(format!("plan exercise {id} requires --sets"))
            })?,
            reps: self.reps.ok_or_else(|| {
                AppError::InvalidInput(format!("plan exercise {id} requires --reps"))
            })?,
            weight: self.weight,
            notes: self.notes,
        })
    }
}

fn parse_plan_exercise_specs(args: &[String]) -> Result<Vec<PlanExercise>, AppError> {
    let mut exercises = Vec::new();
    let mut current: Option<PlanExerciseBuilder> = None;
    let mut idx = 0;

    while idx < args.len() {
        match args[idx].as_str() {
            "--" => {
                idx += 1;
            }
            "--exercise" => {
                let value = spec_value(args, idx, "plan", "--exercise")?;
                if let Some(builder) = current.take() {
                    exercises.push(builder.into_exercise()?);
                }
                let id = parse_i64("exercise id", value)?;
                current = Some(PlanExerciseBuilder::new(ExerciseId(id)));
                idx += 2;
            }
            "--day" => {
                let value = spec_value(args, idx, "plan", "--day")?;
                let day = parse_day_arg(value)?;
                builder_for(&mut current, "plan", "--day")?.day_of_week = Some(day);
                idx += 2;
            }
            "--sets" => {
                let value = spec_value(args, idx, "plan", "--sets")?;
                let sets = parse_i64("sets", value)? as i32;
                builder_for(&mut current, "plan", "--sets")?.sets = Some(sets);
                idx += 2;
            }
            "--reps" => {
                let value = spec_value(args, idx, "plan", "--reps")?;
                builder_for(&mut current, "plan", "--reps")?.reps = Some(value.to_string());
                idx += 2;
            }
            "--weight" => {
                let value = spec_value(args, idx, "plan", "--weight")?;
                let weight = parse_f64("weight", value)?;
                builder_for(&mut current, "plan", "--weight")?.weight = Some(weight);
                idx += 2;
            }
            "--notes" => {
                let value = spec_value(args, idx, "plan", "--notes")?;
                builder_for(&mut current, "plan", "--notes")?.notes = Some(value.to_string());
                idx += 2;
            }
            unexpected => {
                return Err(AppError::InvalidInput(format!(
                    "plan exercises unexpected argument: {unexpected}"
                )));
            }
        }
    }

    if let Some(builder) = current.take() {
        exercises.push(builder.into_exercise()?);
    }
    Ok(exercises)
}

#[derive(Debug)]
struct SessionExerciseBuilder {
    exercise_id: ExerciseId,
    sets: Vec<SetRecord>,
}

fn parse_session_exercise_specs(args: &[String]) -> Result<Vec<SessionExercise>, AppError> {
    let mut exercises = Vec::new();
    let mut current: Option<SessionExerciseBuilder> = None;
    let mut idx = 0;

    while idx < args.len() {
        match args[idx].as_str() {
            "--" => {
                idx += 1;
            }
            "--exercise" => {
                let value = spec_value(args, idx, "session", "--exercise")?;
                if let Some(builder) = current.take() {
                    exercises.push(SessionExercise {
                        exercise_id: builder.exercise_id,
                        sets: builder.sets,
                    });
                }
                let id = parse_i64("exercise id", value)?;
                current = Some(SessionExerciseBuilder {
                    exercise_id: ExerciseId(id),
                    sets: Vec::new(),
                });
                idx += 2;
            }
            "--set" => {
                let value = spec_value(args, idx, "session", "--set")?;
                let set = parse_set_value(value)?;
                match current.as_mut() {
                    Some(builder) => builder.sets.push(set),
                    None => {
                        return Err(AppError::InvalidInput(
                            "session save --set must follow a --exercise".to_string(),
                        ));
                    }
                }
                idx += 2;
            }
            unexpected => {
                return Err(AppError::InvalidInput(format!(
                    "session save unexpected argument: {unexpected}"
                )));
            }
        }
    }

    if let Some(builder) = current.take() {
        exercises.push(SessionExercise {
            exercise_id: builder.exercise_id,
            sets: builder.sets,
        });
    }
    Ok(exercises)
}

fn spec_value<'a>(
    args: &'a [String],
    idx: usize,
    context: &str,
    flag: &str,
) -> Result<&'a str, AppError> {
    args.get(idx + 1)
        .map(|value| value.as_str())
        .ok_or_else(|| AppError::InvalidInput(format!("{context} {flag} requires a value")))
}

fn builder_for<'a>(
    current: &'a mut Option<PlanExerciseBuilder>,
    context: &str,
    flag: &str,
) -> Result<&'a mut PlanExerciseBuilder, AppError> {
    current.as_mut().ok_or_else(|| {
        AppError::InvalidInput(format!("{context} {flag} must follow a --exercise"))
    })
}

fn parse_day_arg(value: &str) -> Result<DayOfWeek, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "monday" => Ok(DayOfWeek::Monday),
        "tuesday" => Ok(DayOfWeek::Tuesday),
        "wednesday" => Ok(DayOfWeek::Wednesday),
        "thursday" => Ok(DayOfWeek::Thursday),
        "friday" => Ok(DayOfWeek::Friday),
        "saturday" => Ok(DayOfWeek::Saturday),
        "sunday" => Ok(DayOfWeek::Sunday),
        _ => Err(AppError::InvalidInput(format!(
            "invalid day '{value}', expected monday|tuesday|wednesday|thursday|friday|saturday|sunday"
        ))),
    }
}

/// `--set` value syntax: REPS,WEIGHT[,done].
fn parse_set_value(value: &str) -> Result<SetRecord, AppError> {
    let mut parts = value.split(',');
    let reps = parts
        .next()
        .ok_or_else(|| AppError::InvalidInput(format!("invalid set '{value}'")))?;
    let weight = parts
        .next()
        .ok_or_else(|| AppError::InvalidInput(format!("invalid set '{value}', expected REPS,WEIGHT[,done]")))?;
    let completed = match parts.next() {
        None => false,
        Some(mark) if mark.trim().eq_ignore_ascii_case("done") => true,
        Some(mark) => {
            return Err(AppError::InvalidInput(format!(
                "invalid set suffix '{mark}', expected 'done'"
            )));
        }
    };
    if parts.next().is_some() {
        return Err(AppError::InvalidInput(format!(
            "invalid set '{value}', expected REPS,WEIGHT[,done]"
        )));
    }
    Ok(SetRecord {
        reps: parse_i64("set reps", reps)? as i32,
        weight: parse_f64("set weight", weight)?,
        completed,
    })
}

fn parse_i64(field: &str, value: &str) -> Result<i64, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("invalid {field} '{value}'")))
}

fn parse_f64(field: &str, value: &str) -> Result<f64, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("invalid {field} '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn plan_specs_parse_repeated_groups() {
        let args = strings(&[
            "--exercise", "3", "--day", "monday", "--sets", "4", "--reps", "8-12", "--weight",
            "40", "--exercise", "5", "--day", "friday", "--sets", "3", "--reps", "10",
        ]);
        let exercises = parse_plan_exercise_specs(&args).expect("specs");
        assert_eq!(exercises.len(), 2);
        assert_eq!(exercises[0].exercise_id, ExerciseId(3));
        assert_eq!(exercises[0].day_of_week, DayOfWeek::Monday);
        assert_eq!(exercises[0].sets, 4);
        assert_eq!(exercises[0].weight, Some(40.0));
        assert_eq!(exercises[1].reps, "10");
        assert_eq!(exercises[1].weight, None);
    }

    #[test]
    fn plan_specs_require_day_sets_reps() {
        let args = strings(&["--exercise", "3", "--sets", "4", "--reps", "10"]);
        assert!(parse_plan_exercise_specs(&args).is_err());
    }

    #[test]
    fn plan_specs_reject_orphan_flags() {
        let args = strings(&["--day", "monday"]);
        assert!(parse_plan_exercise_specs(&args).is_err());
    }

    #[test]
    fn session_specs_parse_sets() {
        let args = strings(&[
            "--exercise", "3", "--set", "10,20", "--set", "8,25,done", "--exercise", "5",
        ]);
        let exercises = parse_session_exercise_specs(&args).expect("specs");
        assert_eq!(exercises.len(), 2);
        assert_eq!(exercises[0].sets.len(), 2);
        assert_eq!(exercises[0].sets[0].reps, 10);
        assert_eq!(exercises[0].sets[0].weight, 20.0);
        assert!(!exercises[0].sets[0].completed);
        assert!(exercises[0].sets[1].completed);
        assert!(exercises[1].sets.is_empty());
    }

    #[test]
    fn set_values_reject_garbage() {
        assert!(parse_set_value("10").is_err());
        assert!(parse_set_value("10,abc").is_err());
        assert!(parse_set_value("10,20,maybe").is_err());
        assert!(parse_set_value("10,20,done,extra").is_err());
    }

    #[test]
    fn day_arg_is_case_insensitive() {
        assert_eq!(parse_day_arg("Monday").expect("day"), DayOfWeek::Monday);
        assert!(parse_day_arg("someday").is_err());
    }
}

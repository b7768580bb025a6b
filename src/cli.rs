use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "fichas",
    version,
    about = "Track exercises, weekly workout plans and sessions with SQLite"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Data directory (defaults to $FICHAS_HOME, then ~/.fichas)"
    )]
    pub data_dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        value_name = "NAME",
        help = "Acting user profile (see 'user register')"
    )]
    pub user: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(subcommand)]
    User(UserCommand),
    #[command(subcommand)]
    Exercise(ExerciseCommand),
    #[command(subcommand)]
    Plan(PlanCommand),
    #[command(subcommand)]
    Session(SessionCommand),
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    Register(UserRegister),
    Current(UserCurrent),
}

#[derive(Subcommand, Debug)]
pub enum ExerciseCommand {
    Add(ExerciseAdd),
    List(ExerciseList),
    Show(ExerciseShow),
    Update(ExerciseUpdate),
    Remove(ExerciseRemove),
    Upload(ExerciseUpload),
    #[command(name = "upload-url")]
    UploadUrl(ExerciseUploadUrl),
}

#[derive(Subcommand, Debug)]
pub enum PlanCommand {
    Add(PlanAdd),
    List(PlanList),
    Show(PlanShow),
    Update(PlanUpdate),
    Remove(PlanRemove),
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    Save(SessionSave),
    Show(SessionShow),
    History(SessionHistory),
    Stats(SessionStats),
    #[command(name = "exercise-history")]
    ExerciseHistory(SessionExerciseHistory),
    Draft(SessionDraft),
    Remove(SessionRemove),
}

#[derive(Args, Debug)]
pub struct UserRegister {
    pub name: String,
}

#[derive(Args, Debug)]
pub struct UserCurrent {}

#[derive(Args, Debug)]
pub struct ExerciseAdd {
    pub name: String,
    #[arg(
        long,
        value_name = "GROUP",
        help = "Muscle group label (e.g. chest, back, shoulders, arms, legs, core, cardio)"
    )]
    pub muscle_group: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_name = "FILE", help = "Image file to upload and attach")]
    pub image: Option<PathBuf>,
    #[arg(long, value_name = "ID", conflicts_with = "image", help = "Already-uploaded image id")]
    pub image_id: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExerciseList {}

#[derive(Args, Debug)]
pub struct ExerciseShow {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct ExerciseUpdate {
    pub id: i64,
    pub name: String,
    #[arg(long, value_name = "GROUP")]
    pub muscle_group: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_name = "FILE", help = "Image file to upload and attach")]
    pub image: Option<PathBuf>,
    #[arg(long, value_name = "ID", conflicts_with = "image", help = "Already-uploaded image id")]
    pub image_id: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExerciseRemove {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct ExerciseUpload {
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct ExerciseUploadUrl {}

#[derive(Args, Debug)]
pub struct PlanAdd {
    pub name: String,
    #[arg(
        value_name = "ARGS",
        num_args = 0..,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        help = "Use --exercise <ID> --day <DAY> --sets <N> --reps <R> [--weight <KG>] [--notes <TEXT>] repeating per exercise"
    )]
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct PlanList {}

#[derive(Args, Debug)]
pub struct PlanShow {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct PlanUpdate {
    pub id: i64,
    pub name: String,
    #[arg(
        value_name = "ARGS",
        num_args = 0..,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        help = "Full replacement exercise list, same syntax as 'plan add'"
    )]
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct PlanRemove {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct SessionSave {
    pub date: NaiveDate,
    #[arg(long, value_name = "MIN")]
    pub duration: Option<i32>,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(
        value_name = "ARGS",
        num_args = 0..,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        help = "Use --exercise <ID> --set <REPS,WEIGHT[,done]> repeating per exercise"
    )]
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct SessionShow {
    pub date: NaiveDate,
}

#[derive(Args, Debug)]
pub struct SessionHistory {
    #[arg(long)]
    pub limit: Option<u64>,
    #[arg(long, value_name = "PLAN_ID", help = "Keep only sessions touching the plan's exercises")]
    pub plan: Option<i64>,
}

#[derive(Args, Debug)]
pub struct SessionStats {
    #[arg(long)]
    pub limit: Option<u64>,
}

#[derive(Args, Debug)]
pub struct SessionExerciseHistory {
    pub exercise_id: i64,
}

#[derive(Args, Debug)]
pub struct SessionDraft {
    pub plan_id: i64,
    pub date: NaiveDate,
}

#[derive(Args, Debug)]
pub struct SessionRemove {
    pub id: i64,
}

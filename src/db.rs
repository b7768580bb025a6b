use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use url::Url;

use crate::entities::{exercise, plan, session, user};
use crate::error::AppError;

pub fn resolve_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("fichas.db")
}

pub fn resolve_images_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("images")
}

pub fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn open_lock(path: &Path) -> Result<fd_lock::RwLock<File>, AppError> {
    let lock_path = path.with_extension("lock");
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(lock_path)?;
    Ok(fd_lock::RwLock::new(file))
}

pub async fn connect(path: &Path) -> Result<DatabaseConnection, AppError> {
    let mut url = Url::from_file_path(path)
        .map_err(|_| AppError::InvalidInput(format!("invalid sqlite path: {}", path.display())))?;
    url.set_query(Some("mode=rwc"));
    let sqlite_url = url.as_str().replacen("file://", "sqlite://", 1);
    Ok(Database::connect(&sqlite_url).await?)
}

pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), AppError> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut user_stmt = schema.create_table_from_entity(user::Entity);
    user_stmt.if_not_exists();
    db.execute(builder.build(&user_stmt)).await?;

    let mut exercise_stmt = schema.create_table_from_entity(exercise::Entity);
    exercise_stmt.if_not_exists();
    db.execute(builder.build(&exercise_stmt)).await?;

    let mut plan_stmt = schema.create_table_from_entity(plan::Entity);
    plan_stmt.if_not_exists();
    db.execute(builder.build(&plan_stmt)).await?;

    let mut session_stmt = schema.create_table_from_entity(session::Entity);
    session_stmt.if_not_exists();
    db.execute(builder.build(&session_stmt)).await?;

    let mut user_name_index = Index::create()
        .name("idx_users_name")
        .table(user::Entity)
        .col(user::Column::Name)
        .unique()
        .to_owned();
    user_name_index.if_not_exists();
    db.execute(builder.build(&user_name_index)).await?;

    let mut exercise_index = Index::create()
        .name("idx_exercises_user")
        .table(exercise::Entity)
        .col(exercise::Column::UserId)
        .to_owned();
    exercise_index.if_not_exists();
    db.execute(builder.build(&exercise_index)).await?;

    let mut plan_index = Index::create()
        .name("idx_plans_user")
        .table(plan::Entity)
        .col(plan::Column::UserId)
        .to_owned();
    plan_index.if_not_exists();
    db.execute(builder.build(&plan_index)).await?;

    // At most one session per (user, date); concurrent saves that both miss
    // the lookup collide here instead of producing duplicates.
    let mut session_index = Index::create()
        .name("idx_sessions_user_date")
        .table(session::Entity)
        .col(session::Column::UserId)
        .col(session::Column::Date)
        .unique()
        .to_owned();
    session_index.if_not_exists();
    db.execute(builder.build(&session_index)).await?;

    Ok(())
}

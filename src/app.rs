use std::collections::HashMap;
use std::path::Path;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr,
};
use url::Url;

use crate::entities::plan::PlanExercises;
use crate::entities::session::SessionExercises;
use crate::entities::{exercise, plan, session, user};
use crate::error::AppError;
use crate::model::{
    ExerciseFields, ExerciseId, ImageId, PlanExercise, PlanId, SessionExercise, SessionId,
    SessionInput, SetRecord, UserId,
};
use crate::storage::ImageStore;

const DEFAULT_HISTORY_LIMIT: u64 = 30;

/// Operation layer. The caller identity is explicit state resolved once at
/// startup; `None` means unauthenticated, which degrades queries to empty
/// results and fails mutations.
pub struct App {
    db: DatabaseConnection,
    images: ImageStore,
    user: Option<UserId>,
}

pub struct ExerciseEntry {
    pub exercise: exercise::Model,
    pub image_url: Option<Url>,
}

pub struct PlanExerciseDetail {
    pub planned: PlanExercise,
    pub exercise: Option<exercise::Model>,
}

pub struct PlanDetail {
    pub plan: plan::Model,
    pub exercises: Vec<PlanExerciseDetail>,
}

pub struct SessionExerciseDetail {
    pub logged: SessionExercise,
    pub exercise: Option<exercise::Model>,
}

pub struct SessionDetail {
    pub session: session::Model,
    pub exercises: Vec<SessionExerciseDetail>,
}

pub struct ExerciseHistoryEntry {
    pub date: NaiveDate,
    pub sets: Vec<SetRecord>,
}

impl App {
    pub fn new(db: DatabaseConnection, images: ImageStore, user: Option<UserId>) -> Self {
        Self { db, images, user }
    }

    fn require_user(&self) -> Result<i64, AppError> {
        self.user.map(|user| user.0).ok_or(AppError::Unauthenticated)
    }

    /// Maps a `--user` name to an identity. Unknown names and lookup failures
    /// both come back as unauthenticated rather than erroring.
    pub async fn resolve_identity(db: &DatabaseConnection, name: &str) -> Option<UserId> {
        let found = user::Entity::find()
            .filter(user::Column::Name.eq(name))
            .one(db)
            .await;
        match found {
            Ok(Some(model)) => Some(UserId(model.id)),
            Ok(None) | Err(_) => None,
        }
    }

    pub async fn current_user(&self) -> Option<user::Model> {
        let user_id = self.user?;
        match user::Entity::find_by_id(user_id.0).one(&self.db).await {
            Ok(found) => found,
            Err(_) => None,
        }
    }

    pub async fn register_user(&self, name: &str) -> Result<user::Model, AppError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::InvalidInput("user name cannot be empty".to_string()));
        }
        let active = user::ActiveModel {
            name: Set(trimmed.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let insert = match user::Entity::insert(active).exec(&self.db).await {
            Ok(insert) => insert,
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(AppError::InvalidInput(format!(
                    "user name '{trimmed}' is already taken"
                )));
            }
            Err(err) => return Err(err.into()),
        };
        user::Entity::find_by_id(insert.last_insert_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found after insert".to_string()))
    }

    pub async fn list_exercises(&self) -> Result<Vec<ExerciseEntry>, AppError> {
        let Some(user_id) = self.user else {
            return Ok(Vec::new());
        };
        let exercises = exercise::Entity::find()
            .filter(exercise::Column::UserId.eq(user_id.0))
            .order_by_asc(exercise::Column::Id)
            .all(&self.db)
            .await?;
        Ok(exercises
            .into_iter()
            .map(|model| {
                let image_url = model
                    .image_id
                    .as_ref()
                    .and_then(|token| self.images.resolve_url(&ImageId(token.clone())));
                ExerciseEntry {
                    exercise: model,
                    image_url,
                }
            })
            .collect())
    }

    pub async fn get_exercise(&self, id: ExerciseId) -> Result<Option<ExerciseEntry>, AppError> {
        let Some(user_id) = self.user else {
            return Ok(None);
        };
        let found = exercise::Entity::find_by_id(id.0).one(&self.db).await?;
        Ok(found
            .filter(|model| model.user_id == user_id.0)
            .map(|model| {
                let image_url = model
                    .image_id
                    .as_ref()
                    .and_then(|token| self.images.resolve_url(&ImageId(token.clone())));
                ExerciseEntry {
                    exercise: model,
                    image_url,
                }
            }))
    }

    pub async fn create_exercise(&self, fields: ExerciseFields) -> Result<exercise::Model, AppError> {
        let user_id = self.require_user()?;
        ensure_non_empty("exercise name", &fields.name)?;
        ensure_non_empty("muscle group", &fields.muscle_group)?;
        let now = Utc::now();
        let active = exercise::ActiveModel {
            user_id: Set(user_id),
            name: Set(fields.name),
            description: Set(fields.description),
            muscle_group: Set(fields.muscle_group),
            image_id: Set(fields.image_id.map(|image| image.0)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let insert = exercise::Entity::insert(active).exec(&self.db).await?;
        exercise::Entity::find_by_id(insert.last_insert_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("exercise not found after insert".to_string()))
    }

    pub async fn update_exercise(
        &self,
        id: ExerciseId,
        fields: ExerciseFields,
    ) -> Result<exercise::Model, AppError> {
        let user_id = self.require_user()?;
        ensure_non_empty("exercise name", &fields.name)?;
        ensure_non_empty("muscle group", &fields.muscle_group)?;
        self.owned_exercise(user_id, id).await?;

        let mut active = exercise::ActiveModel {
            id: Set(id.0),
            ..Default::default()
        };
        active.name = Set(fields.name);
        active.description = Set(fields.description);
        active.muscle_group = Set(fields.muscle_group);
        active.image_id = Set(fields.image_id.map(|image| image.0));
        active.updated_at = Set(Utc::now());

        match active.update(&self.db).await {
            Ok(model) => Ok(model),
            Err(sea_orm::DbErr::RecordNotFound(_)) | Err(sea_orm::DbErr::RecordNotUpdated) => {
                Err(AppError::NotFoundOrUnauthorized(format!("exercise id {id}")))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Deletion is not cascaded: plans and sessions keep their references and
    /// resolve them to an absent exercise from then on.
    pub async fn delete_exercise(&self, id: ExerciseId) -> Result<(), AppError> {
        let user_id = self.require_user()?;
        self.owned_exercise(user_id, id).await?;
        exercise::Entity::delete_by_id(id.0).exec(&self.db).await?;
        Ok(())
    }

    pub async fn generate_upload_url(&self) -> Result<(ImageId, Url), AppError> {
        self.require_user()?;
        self.images.upload_target()
    }

    pub async fn upload_image(&self, source: &Path) -> Result<ImageId, AppError> {
        self.require_user()?;
        self.images.store(source)
    }

    pub async fn list_plans(&self) -> Result<Vec<plan::Model>, AppError> {
        let Some(user_id) = self.user else {
            return Ok(Vec::new());
        };
        Ok(plan::Entity::find()
            .filter(plan::Column::UserId.eq(user_id.0))
            .order_by_asc(plan::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Single-plan fetch joins each planned exercise to its exercise row,
    /// tolerating dangling references; `list_plans` stays unjoined.
    pub async fn get_plan(&self, id: PlanId) -> Result<Option<PlanDetail>, AppError> {
        let Some(user_id) = self.user else {
            return Ok(None);
        };
        let Some(model) = plan::Entity::find_by_id(id.0).one(&self.db).await? else {
            return Ok(None);
        };
        if model.user_id != user_id.0 {
            return Ok(None);
        }

        let ids: Vec<i64> = model
            .exercises
            .0
            .iter()
            .map(|planned| planned.exercise_id.0)
            .collect();
        let by_id = self.exercises_by_id(&ids).await?;
        let exercises = model
            .exercises
            .0
            .iter()
            .map(|planned| PlanExerciseDetail {
                planned: planned.clone(),
                exercise: by_id.get(&planned.exercise_id.0).cloned(),
            })
            .collect();
        Ok(Some(PlanDetail {
            plan: model,
            exercises,
        }))
    }

    pub async fn create_plan(
        &self,
        name: String,
        exercises: Vec<PlanExercise>,
    ) -> Result<plan::Model, AppError> {
        let user_id = self.require_user()?;
        ensure_non_empty("plan name", &name)?;
        let now = Utc::now();
        let active = plan::ActiveModel {
            user_id: Set(user_id),
            name: Set(name),
            exercises: Set(PlanExercises(exercises)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let insert = plan::Entity::insert(active).exec(&self.db).await?;
        plan::Entity::find_by_id(insert.last_insert_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("plan not found after insert".to_string()))
    }

    pub async fn update_plan(
        &self,
        id: PlanId,
        name: String,
        exercises: Vec<PlanExercise>,
    ) -> Result<plan::Model, AppError> {
        let user_id = self.require_user()?;
        ensure_non_empty("plan name", &name)?;
        self.owned_plan(user_id, id).await?;

        let mut active = plan::ActiveModel {
            id: Set(id.0),
            ..Default::default()
        };
        active.name = Set(name);
        active.exercises = Set(PlanExercises(exercises));
        active.updated_at = Set(Utc::now());

        match active.update(&self.db).await {
            Ok(model) => Ok(model),
            Err(sea_orm::DbErr::RecordNotFound(_)) | Err(sea_orm::DbErr::RecordNotUpdated) => {
                Err(AppError::NotFoundOrUnauthorized(format!("plan id {id}")))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn delete_plan(&self, id: PlanId) -> Result<(), AppError> {
        let user_id = self.require_user()?;
        self.owned_plan(user_id, id).await?;
        plan::Entity::delete_by_id(id.0).exec(&self.db).await?;
        Ok(())
    }

    /// Merge-on-date save: one session per (user, date), always. An existing
    /// row gets duration/exercises/notes replaced wholesale; otherwise a new
    /// row is inserted. An insert losing the race against a concurrent save
    /// trips the unique index and is retried once as an update.
    pub async fn save_session(&self, input: SessionInput) -> Result<SessionId, AppError> {
        let user_id = self.require_user()?;

        if let Some(existing) = self.session_for_date(user_id, input.date).await? {
            let updated = self.replace_session_fields(existing.id, &input).await?;
            return Ok(SessionId(updated.id));
        }

        let now = Utc::now();
        let active = session::ActiveModel {
            user_id: Set(user_id),
            date: Set(input.date),
            duration: Set(input.duration),
            exercises: Set(SessionExercises(input.exercises.clone())),
            notes: Set(input.notes.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        match session::Entity::insert(active).exec(&self.db).await {
            Ok(insert) => Ok(SessionId(insert.last_insert_id)),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                match self.session_for_date(user_id, input.date).await? {
                    Some(existing) => {
                        let updated = self.replace_session_fields(existing.id, &input).await?;
                        Ok(SessionId(updated.id))
                    }
                    None => Err(AppError::Conflict(format!(
                        "concurrent save for {}",
                        input.date
                    ))),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get_session_by_date(
        &self,
        date: NaiveDate,
    ) -> Result<Option<SessionDetail>, AppError> {
        let Some(user_id) = self.user else {
            return Ok(None);
        };
        let Some(model) = self.session_for_date(user_id.0, date).await? else {
            return Ok(None);
        };
        let mut details = self.with_details(vec![model]).await?;
        Ok(details.pop())
    }

    /// Most recent sessions by date descending, capped at `limit` (30 by
    /// default), without exercise joins.
    pub async fn recent_sessions(
        &self,
        limit: Option<u64>,
    ) -> Result<Vec<session::Model>, AppError> {
        let Some(user_id) = self.user else {
            return Ok(Vec::new());
        };
        Ok(session::Entity::find()
            .filter(session::Column::UserId.eq(user_id.0))
            .order_by_desc(session::Column::Date)
            .limit(limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
            .all(&self.db)
            .await?)
    }

    pub async fn all_sessions_desc(&self) -> Result<Vec<session::Model>, AppError> {
        let Some(user_id) = self.user else {
            return Ok(Vec::new());
        };
        Ok(session::Entity::find()
            .filter(session::Column::UserId.eq(user_id.0))
            .order_by_desc(session::Column::Date)
            .all(&self.db)
            .await?)
    }

    pub async fn get_history(&self, limit: Option<u64>) -> Result<Vec<SessionDetail>, AppError> {
        let sessions = self.recent_sessions(limit).await?;
        self.with_details(sessions).await
    }

    /// Per-exercise time series: every session touching the exercise yields
    /// `{date, sets}`; sessions without it are dropped from the result.
    pub async fn get_exercise_history(
        &self,
        exercise_id: ExerciseId,
    ) -> Result<Vec<ExerciseHistoryEntry>, AppError> {
        let sessions = self.all_sessions_desc().await?;
        Ok(sessions
            .into_iter()
            .filter_map(|session| {
                session
                    .exercises
                    .0
                    .iter()
                    .find(|logged| logged.exercise_id == exercise_id)
                    .map(|logged| ExerciseHistoryEntry {
                        date: session.date,
                        sets: logged.sets.clone(),
                    })
            })
            .collect())
    }

    pub async fn delete_session(&self, id: SessionId) -> Result<(), AppError> {
        let user_id = self.require_user()?;
        let found = session::Entity::find_by_id(id.0).one(&self.db).await?;
        match found {
            Some(model) if model.user_id == user_id => {
                session::Entity::delete_by_id(id.0).exec(&self.db).await?;
                Ok(())
            }
            _ => Err(AppError::NotFoundOrUnauthorized(format!("session id {id}"))),
        }
    }

    pub async fn with_details(
        &self,
        sessions: Vec<session::Model>,
    ) -> Result<Vec<SessionDetail>, AppError> {
        let ids: Vec<i64> = sessions
            .iter()
            .flat_map(|session| &session.exercises.0)
            .map(|logged| logged.exercise_id.0)
            .collect();
        let by_id = self.exercises_by_id(&ids).await?;

        Ok(sessions
            .into_iter()
            .map(|session| {
                let exercises = session
                    .exercises
                    .0
                    .iter()
                    .map(|logged| SessionExerciseDetail {
                        logged: logged.clone(),
                        exercise: by_id.get(&logged.exercise_id.0).cloned(),
                    })
                    .collect();
                SessionDetail { session, exercises }
            })
            .collect())
    }

    async fn session_for_date(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Option<session::Model>, AppError> {
        Ok(session::Entity::find()
            .filter(session::Column::UserId.eq(user_id))
            .filter(session::Column::Date.eq(date))
            .one(&self.db)
            .await?)
    }

    async fn replace_session_fields(
        &self,
        id: i64,
        input: &SessionInput,
    ) -> Result<session::Model, AppError> {
        let mut active = session::ActiveModel {
            id: Set(id),
            ..Default::default()
        };
        active.duration = Set(input.duration);
        active.exercises = Set(SessionExercises(input.exercises.clone()));
        active.notes = Set(input.notes.clone());
        active.updated_at = Set(Utc::now());

        match active.update(&self.db).await {
            Ok(model) => Ok(model),
            Err(sea_orm::DbErr::RecordNotFound(_)) | Err(sea_orm::DbErr::RecordNotUpdated) => {
                Err(AppError::NotFound(format!("session id {id}")))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn exercises_by_id(
        &self,
        ids: &[i64],
    ) -> Result<HashMap<i64, exercise::Model>, AppError> {
        let mut by_id = HashMap::new();
        if ids.is_empty() {
            return Ok(by_id);
        }
        let exercises = exercise::Entity::find()
            .filter(exercise::Column::Id.is_in(ids.to_vec()))
            .all(&self.db)
            .await?;
        for model in exercises {
            by_id.insert(model.id, model);
        }
        Ok(by_id)
    }

    async fn owned_exercise(
        &self,
        user_id: i64,
        id: ExerciseId,
    ) -> Result<exercise::Model, AppError> {
        let found = exercise::Entity::find_by_id(id.0).one(&self.db).await?;
        match found {
            Some(model) if model.user_id == user_id => Ok(model),
            _ => Err(AppError::NotFoundOrUnauthorized(format!("exercise id {id}"))),
        }
    }

    async fn owned_plan(&self, user_id: i64, id: PlanId) -> Result<plan::Model, AppError> {
        let found = plan::Entity::find_by_id(id.0).one(&self.db).await?;
        match found {
            Some(model) if model.user_id == user_id => Ok(model),
            _ => Err(AppError::NotFoundOrUnauthorized(format!("plan id {id}"))),
        }
    }
}

fn ensure_non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{field} cannot be empty")));
    }
    Ok(())
}

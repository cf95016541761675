use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{AuthService, TokenResponse};
use crate::entities::{audit_log, user};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::audit::{snapshot, AuditService};

#[derive(Debug, Clone)]
pub struct RegisterUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
}

/// Account management and credential verification.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthService>,
    event_sender: EventSender,
    audit: AuditService,
}

impl UserService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        auth: Arc<AuthService>,
        event_sender: EventSender,
        audit: AuditService,
    ) -> Self {
        Self {
            db,
            auth,
            event_sender,
            audit,
        }
    }

    async fn ensure_unique_email(&self, email: &str, exclude: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = user::Entity::find().filter(user::Column::Email.eq(email));
        if let Some(id) = exclude {
            query = query.filter(user::Column::Id.ne(id));
        }
        let existing = query.one(&*self.db).await.map_err(ServiceError::Database)?;
        if existing.is_some() {
            return Err(ServiceError::Duplicate(format!("email '{}'", email)));
        }
        Ok(())
    }

    /// Self-service registration always creates an active `user`-role account.
    #[instrument(skip(self, input))]
    pub async fn register(
        &self,
        input: RegisterUserInput,
    ) -> Result<(user::Model, TokenResponse), ServiceError> {
        let created = self
            .create(
                CreateUserInput {
                    name: input.name,
                    email: input.email,
                    password: input.password,
                    role: user::ROLE_USER.to_string(),
                },
                None,
            )
            .await?;
        let token = self.auth.generate_token(&created)?;
        Ok((created, token))
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: CreateUserInput,
        actor: Option<Uuid>,
    ) -> Result<user::Model, ServiceError> {
        self.ensure_unique_email(&input.email, None).await?;

        let password_hash = self.auth.hash_password(&input.password)?;
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            email: Set(input.email),
            password_hash: Set(password_hash),
            role: Set(input.role),
            status: Set(user::STATUS_ACTIVE.to_string()),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        let created = model.insert(&*self.db).await.map_err(|e| {
            crate::errors::map_sql_err(e, "email")
        })?;

        info!(user_id = %created.id, "user created");
        self.audit
            .record(
                "users",
                created.id,
                audit_log::ACTION_CREATE,
                None,
                snapshot(&created),
                actor,
            )
            .await;
        self.event_sender.send_or_log(Event::UserRegistered(created.id));

        Ok(created)
    }

    /// Verifies credentials and issues a token. Any mismatch, unknown email
    /// or inactive account collapses into `INVALID_CREDENTIALS`.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(user::Model, TokenResponse), ServiceError> {
        let found = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .map_err(ServiceError::Database)?;

        let user = match found {
            Some(u) => u,
            None => return Err(ServiceError::InvalidCredentials),
        };

        if !self.auth.verify_password(password, &user.password_hash) {
            return Err(ServiceError::InvalidCredentials);
        }
        if !user.is_active() {
            return Err(ServiceError::InvalidCredentials);
        }

        let token = self.auth.generate_token(&user)?;
        Ok((user, token))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::Database)?
            .ok_or_else(|| ServiceError::NotFound("user".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<user::Model>, u64), ServiceError> {
        let offset = (page.max(1) - 1) * limit;
        let total = user::Entity::find()
            .count(&*self.db)
            .await
            .map_err(ServiceError::Database)?;
        let users = user::Entity::find()
            .order_by_asc(user::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(&*self.db)
            .await
            .map_err(ServiceError::Database)?;
        Ok((users, total))
    }

    async fn active_admin_count(&self) -> Result<u64, ServiceError> {
        user::Entity::find()
            .filter(user::Column::Role.eq(user::ROLE_ADMIN))
            .filter(user::Column::Status.eq(user::STATUS_ACTIVE))
            .count(&*self.db)
            .await
            .map_err(ServiceError::Database)
    }

    /// Rejects any change that would leave the system without an active admin.
    async fn guard_last_admin(
        &self,
        target: &user::Model,
        new_role: Option<&str>,
        new_status: Option<&str>,
    ) -> Result<(), ServiceError> {
        if !target.is_admin() || !target.is_active() {
            return Ok(());
        }
        let demoted = new_role.map_or(false, |r| r != user::ROLE_ADMIN);
        let deactivated = new_status.map_or(false, |s| s != user::STATUS_ACTIVE);
        if (demoted || deactivated) && self.active_admin_count().await? <= 1 {
            return Err(ServiceError::LastAdmin);
        }
        Ok(())
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateUserInput,
        actor: Option<Uuid>,
    ) -> Result<user::Model, ServiceError> {
        let existing = self.get(id).await?;

        if let Some(email) = &input.email {
            if *email != existing.email {
                self.ensure_unique_email(email, Some(id)).await?;
            }
        }
        self.guard_last_admin(&existing, input.role.as_deref(), input.status.as_deref())
            .await?;

        let before = snapshot(&existing);
        let mut model: user::ActiveModel = existing.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(email) = input.email {
            model.email = Set(email);
        }
        if let Some(role) = input.role {
            model.role = Set(role);
        }
        if let Some(status) = input.status {
            model.status = Set(status);
        }
        model.updated_at = Set(Some(Utc::now()));

        let updated = model
            .update(&*self.db)
            .await
            .map_err(|e| crate::errors::map_sql_err(e, "email"))?;

        self.audit
            .record(
                "users",
                updated.id,
                audit_log::ACTION_UPDATE,
                before,
                snapshot(&updated),
                actor,
            )
            .await;
        self.event_sender.send_or_log(Event::UserUpdated(updated.id));

        Ok(updated)
    }

    #[instrument(skip(self, current_password, new_password))]
    pub async fn change_password(
        &self,
        id: Uuid,
        current_password: Option<&str>,
        new_password: &str,
        verify_current: bool,
        actor: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let existing = self.get(id).await?;

        if verify_current {
            let current = current_password.ok_or_else(|| {
                ServiceError::Validation("current_password is required".to_string())
            })?;
            if !self.auth.verify_password(current, &existing.password_hash) {
                return Err(ServiceError::InvalidCredentials);
            }
        }

        let mut model: user::ActiveModel = existing.into();
        model.password_hash = Set(self.auth.hash_password(new_password)?);
        model.updated_at = Set(Some(Utc::now()));
        let updated = model.update(&*self.db).await.map_err(ServiceError::Database)?;

        info!(user_id = %updated.id, "password changed");
        self.audit
            .record("users", updated.id, audit_log::ACTION_UPDATE, None, None, actor)
            .await;
        Ok(())
    }

    /// Soft delete: flips status to inactive. The last active admin stays.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid, actor: Option<Uuid>) -> Result<(), ServiceError> {
        let existing = self.get(id).await?;
        self.guard_last_admin(&existing, None, Some(user::STATUS_INACTIVE))
            .await?;

        let before = snapshot(&existing);
        let mut model: user::ActiveModel = existing.into();
        model.status = Set(user::STATUS_INACTIVE.to_string());
        model.updated_at = Set(Some(Utc::now()));
        let updated = model.update(&*self.db).await.map_err(ServiceError::Database)?;

        self.audit
            .record(
                "users",
                updated.id,
                audit_log::ACTION_DELETE,
                before,
                snapshot(&updated),
                actor,
            )
            .await;
        self.event_sender
            .send_or_log(Event::UserDeactivated(updated.id));
        Ok(())
    }
}

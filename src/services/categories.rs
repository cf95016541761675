use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{audit_log, category};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::audit::{snapshot, AuditService};

#[derive(Debug, Clone)]
pub struct CreateCategoryInput {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCategoryInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    audit: AuditService,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, audit: AuditService) -> Self {
        Self {
            db,
            event_sender,
            audit,
        }
    }

    async fn ensure_unique_name(&self, name: &str, exclude: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = category::Entity::find().filter(category::Column::Name.eq(name));
        if let Some(id) = exclude {
            query = query.filter(category::Column::Id.ne(id));
        }
        if query
            .one(&*self.db)
            .await
            .map_err(ServiceError::Database)?
            .is_some()
        {
            return Err(ServiceError::Duplicate(format!("category '{}'", name)));
        }
        Ok(())
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: CreateCategoryInput,
        actor: Option<Uuid>,
    ) -> Result<category::Model, ServiceError> {
        self.ensure_unique_name(&input.name, None).await?;

        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            status: Set(category::STATUS_ACTIVE.to_string()),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        let created = model
            .insert(&*self.db)
            .await
            .map_err(|e| crate::errors::map_sql_err(e, "category name"))?;

        self.audit
            .record(
                "categories",
                created.id,
                audit_log::ACTION_CREATE,
                None,
                snapshot(&created),
                actor,
            )
            .await;
        self.event_sender
            .send_or_log(Event::CategoryCreated(created.id));
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<category::Model, ServiceError> {
        category::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::Database)?
            .ok_or_else(|| ServiceError::NotFound("category".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<category::Model>, u64), ServiceError> {
        let offset = (page.max(1) - 1) * limit;
        let total = category::Entity::find()
            .count(&*self.db)
            .await
            .map_err(ServiceError::Database)?;
        let items = category::Entity::find()
            .order_by_asc(category::Column::Name)
            .offset(offset)
            .limit(limit)
            .all(&*self.db)
            .await
            .map_err(ServiceError::Database)?;
        Ok((items, total))
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateCategoryInput,
        actor: Option<Uuid>,
    ) -> Result<category::Model, ServiceError> {
        let existing = self.get(id).await?;

        if let Some(name) = &input.name {
            if *name != existing.name {
                self.ensure_unique_name(name, Some(id)).await?;
            }
        }

        let before = snapshot(&existing);
        let mut model: category::ActiveModel = existing.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if input.description.is_some() {
            model.description = Set(input.description);
        }
        if let Some(status) = input.status {
            model.status = Set(status);
        }
        model.updated_at = Set(Some(Utc::now()));

        let updated = model
            .update(&*self.db)
            .await
            .map_err(|e| crate::errors::map_sql_err(e, "category name"))?;

        self.audit
            .record(
                "categories",
                updated.id,
                audit_log::ACTION_UPDATE,
                before,
                snapshot(&updated),
                actor,
            )
            .await;
        self.event_sender
            .send_or_log(Event::CategoryUpdated(updated.id));
        Ok(updated)
    }

    /// Soft delete: the category goes inactive, its products keep their FK.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid, actor: Option<Uuid>) -> Result<(), ServiceError> {
        let existing = self.get(id).await?;
        let before = snapshot(&existing);

        let mut model: category::ActiveModel = existing.into();
        model.status = Set(category::STATUS_INACTIVE.to_string());
        model.updated_at = Set(Some(Utc::now()));
        let updated = model.update(&*self.db).await.map_err(ServiceError::Database)?;

        self.audit
            .record(
                "categories",
                updated.id,
                audit_log::ACTION_DELETE,
                before,
                snapshot(&updated),
                actor,
            )
            .await;
        self.event_sender
            .send_or_log(Event::CategoryDeleted(updated.id));
        Ok(())
    }
}

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{audit_log, supplier};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::audit::{snapshot, AuditService};

#[derive(Debug, Clone)]
pub struct CreateSupplierInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub contact_person: Option<String>,
}

/// Partial update: `None` fields are left untouched, which makes the same
/// input type serve both PUT and PATCH handlers.
#[derive(Debug, Clone, Default)]
pub struct UpdateSupplierInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub contact_person: Option<Option<String>>,
    pub status: Option<String>,
}

#[derive(Clone)]
pub struct SupplierService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    audit: AuditService,
}

impl SupplierService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, audit: AuditService) -> Self {
        Self {
            db,
            event_sender,
            audit,
        }
    }

    async fn ensure_unique_email(&self, email: &str, exclude: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = supplier::Entity::find().filter(supplier::Column::Email.eq(email));
        if let Some(id) = exclude {
            query = query.filter(supplier::Column::Id.ne(id));
        }
        if query
            .one(&*self.db)
            .await
            .map_err(ServiceError::Database)?
            .is_some()
        {
            return Err(ServiceError::Duplicate(format!("supplier email '{}'", email)));
        }
        Ok(())
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: CreateSupplierInput,
        actor: Option<Uuid>,
    ) -> Result<supplier::Model, ServiceError> {
        self.ensure_unique_email(&input.email, None).await?;

        let model = supplier::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            email: Set(input.email),
            phone: Set(input.phone),
            address: Set(input.address),
            contact_person: Set(input.contact_person),
            status: Set(supplier::STATUS_ACTIVE.to_string()),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        let created = model
            .insert(&*self.db)
            .await
            .map_err(|e| crate::errors::map_sql_err(e, "supplier email"))?;

        self.audit
            .record(
                "suppliers",
                created.id,
                audit_log::ACTION_CREATE,
                None,
                snapshot(&created),
                actor,
            )
            .await;
        self.event_sender
            .send_or_log(Event::SupplierCreated(created.id));
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<supplier::Model, ServiceError> {
        supplier::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::Database)?
            .ok_or_else(|| ServiceError::NotFound("supplier".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: u64,
        limit: u64,
        search: Option<&str>,
    ) -> Result<(Vec<supplier::Model>, u64), ServiceError> {
        let offset = (page.max(1) - 1) * limit;

        let mut query = supplier::Entity::find();
        if let Some(term) = search {
            let pattern = format!("%{}%", term);
            query = query.filter(
                sea_orm::Condition::any()
                    .add(supplier::Column::Name.like(&pattern))
                    .add(supplier::Column::Email.like(&pattern)),
            );
        }

        let total = query
            .clone()
            .count(&*self.db)
            .await
            .map_err(ServiceError::Database)?;
        let items = query
            .order_by_asc(supplier::Column::Name)
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
        input: UpdateSupplierInput,
        actor: Option<Uuid>,
    ) -> Result<supplier::Model, ServiceError> {
        let existing = self.get(id).await?;

        if let Some(email) = &input.email {
            if *email != existing.email {
                self.ensure_unique_email(email, Some(id)).await?;
            }
        }

        let before = snapshot(&existing);
        let mut model: supplier::ActiveModel = existing.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(email) = input.email {
            model.email = Set(email);
        }
        if let Some(phone) = input.phone {
            model.phone = Set(phone);
        }
        if let Some(address) = input.address {
            model.address = Set(address);
        }
        if let Some(contact_person) = input.contact_person {
            model.contact_person = Set(contact_person);
        }
        if let Some(status) = input.status {
            model.status = Set(status);
        }
        model.updated_at = Set(Some(Utc::now()));

        let updated = model
            .update(&*self.db)
            .await
            .map_err(|e| crate::errors::map_sql_err(e, "supplier email"))?;

        self.audit
            .record(
                "suppliers",
                updated.id,
                audit_log::ACTION_UPDATE,
                before,
                snapshot(&updated),
                actor,
            )
            .await;
        self.event_sender
            .send_or_log(Event::SupplierUpdated(updated.id));
        Ok(updated)
    }

    /// Soft delete: flips status to inactive.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid, actor: Option<Uuid>) -> Result<(), ServiceError> {
        let existing = self.get(id).await?;
        let before = snapshot(&existing);

        let mut model: supplier::ActiveModel = existing.into();
        model.status = Set(supplier::STATUS_INACTIVE.to_string());
        model.updated_at = Set(Some(Utc::now()));
        let updated = model.update(&*self.db).await.map_err(ServiceError::Database)?;

        self.audit
            .record(
                "suppliers",
                updated.id,
                audit_log::ACTION_DELETE,
                before,
                snapshot(&updated),
                actor,
            )
            .await;
        self.event_sender
            .send_or_log(Event::SupplierDeleted(updated.id));
        Ok(())
    }
}

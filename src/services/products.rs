use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::{audit_log, category, product, supplier};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::audit::{snapshot, AuditService};

#[derive(Debug, Clone)]
pub struct CreateProductInput {
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub price: Decimal,
    pub quantity: i32,
    pub low_stock_threshold: i32,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<Option<String>>,
    pub category_id: Option<Option<Uuid>>,
    pub supplier_id: Option<Option<Uuid>>,
    pub price: Option<Decimal>,
    pub low_stock_threshold: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Matches name or SKU, case-preserving LIKE
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub low_stock: bool,
}

/// Product catalog. Quantity is read-only here: initial stock is set at
/// creation and every later change goes through the stock ledger.
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    audit: AuditService,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, audit: AuditService) -> Self {
        Self {
            db,
            event_sender,
            audit,
        }
    }

    async fn ensure_unique_sku(&self, sku: &str, exclude: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = product::Entity::find().filter(product::Column::Sku.eq(sku));
        if let Some(id) = exclude {
            query = query.filter(product::Column::Id.ne(id));
        }
        if query
            .one(&*self.db)
            .await
            .map_err(ServiceError::Database)?
            .is_some()
        {
            return Err(ServiceError::SkuExists(sku.to_string()));
        }
        Ok(())
    }

    /// Pre-flight FK checks so a bad reference comes back as
    /// FOREIGN_KEY_VIOLATION instead of a driver error.
    async fn ensure_references_exist(
        &self,
        category_id: Option<Uuid>,
        supplier_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        if let Some(id) = category_id {
            if category::Entity::find_by_id(id)
                .one(&*self.db)
                .await
                .map_err(ServiceError::Database)?
                .is_none()
            {
                return Err(ServiceError::ForeignKeyViolation);
            }
        }
        if let Some(id) = supplier_id {
            if supplier::Entity::find_by_id(id)
                .one(&*self.db)
                .await
                .map_err(ServiceError::Database)?
                .is_none()
            {
                return Err(ServiceError::ForeignKeyViolation);
            }
        }
        Ok(())
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: CreateProductInput,
        actor: Option<Uuid>,
    ) -> Result<product::Model, ServiceError> {
        if input.quantity < 0 {
            return Err(ServiceError::Validation(
                "initial quantity cannot be negative".to_string(),
            ));
        }
        self.ensure_unique_sku(&input.sku, None).await?;
        self.ensure_references_exist(input.category_id, input.supplier_id)
            .await?;

        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            sku: Set(input.sku),
            description: Set(input.description),
            category_id: Set(input.category_id),
            supplier_id: Set(input.supplier_id),
            price: Set(input.price),
            quantity: Set(input.quantity),
            low_stock_threshold: Set(input.low_stock_threshold),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        let created = model
            .insert(&*self.db)
            .await
            .map_err(|e| crate::errors::map_sql_err(e, "sku"))?;

        info!(product_id = %created.id, sku = %created.sku, "product created");
        self.audit
            .record(
                "products",
                created.id,
                audit_log::ACTION_CREATE,
                None,
                snapshot(&created),
                actor,
            )
            .await;
        self.event_sender
            .send_or_log(Event::ProductCreated(created.id));
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::Database)?
            .ok_or_else(|| ServiceError::NotFound("product".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: ProductFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let offset = (page.max(1) - 1) * limit;

        let mut query = product::Entity::find();
        if let Some(term) = &filter.search {
            let pattern = format!("%{}%", term);
            query = query.filter(
                Condition::any()
                    .add(product::Column::Name.like(&pattern))
                    .add(product::Column::Sku.like(&pattern)),
            );
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(supplier_id) = filter.supplier_id {
            query = query.filter(product::Column::SupplierId.eq(supplier_id));
        }
        if let Some(is_active) = filter.is_active {
            query = query.filter(product::Column::IsActive.eq(is_active));
        }
        if filter.low_stock {
            query = query.filter(
                Expr::col(product::Column::Quantity)
                    .lte(Expr::col(product::Column::LowStockThreshold)),
            );
        }

        let total = query
            .clone()
            .count(&*self.db)
            .await
            .map_err(ServiceError::Database)?;
        let items = query
            .order_by_asc(product::Column::Name)
            .offset(offset)
            .limit(limit)
            .all(&*self.db)
            .await
            .map_err(ServiceError::Database)?;
        Ok((items, total))
    }

    /// Active products at or below their low-stock threshold.
    #[instrument(skip(self))]
    pub async fn low_stock(&self) -> Result<Vec<product::Model>, ServiceError> {
        product::Entity::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(
                Expr::col(product::Column::Quantity)
                    .lte(Expr::col(product::Column::LowStockThreshold)),
            )
            .order_by_asc(product::Column::Quantity)
            .all(&*self.db)
            .await
            .map_err(ServiceError::Database)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateProductInput,
        actor: Option<Uuid>,
    ) -> Result<product::Model, ServiceError> {
        let existing = self.get(id).await?;

        if let Some(sku) = &input.sku {
            if *sku != existing.sku {
                self.ensure_unique_sku(sku, Some(id)).await?;
            }
        }
        self.ensure_references_exist(
            input.category_id.flatten(),
            input.supplier_id.flatten(),
        )
        .await?;

        let before = snapshot(&existing);
        let mut model: product::ActiveModel = existing.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(sku) = input.sku {
            model.sku = Set(sku);
        }
        if let Some(description) = input.description {
            model.description = Set(description);
        }
        if let Some(category_id) = input.category_id {
            model.category_id = Set(category_id);
        }
        if let Some(supplier_id) = input.supplier_id {
            model.supplier_id = Set(supplier_id);
        }
        if let Some(price) = input.price {
            model.price = Set(price);
        }
        if let Some(threshold) = input.low_stock_threshold {
            model.low_stock_threshold = Set(threshold);
        }
        if let Some(is_active) = input.is_active {
            model.is_active = Set(is_active);
        }

        let updated = model
            .update(&*self.db)
            .await
            .map_err(|e| crate::errors::map_sql_err(e, "sku"))?;

        self.audit
            .record(
                "products",
                updated.id,
                audit_log::ACTION_UPDATE,
                before,
                snapshot(&updated),
                actor,
            )
            .await;
        self.event_sender
            .send_or_log(Event::ProductUpdated(updated.id));
        Ok(updated)
    }

    /// Soft delete: flips `is_active`. Movement history stays intact.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid, actor: Option<Uuid>) -> Result<(), ServiceError> {
        let existing = self.get(id).await?;
        let before = snapshot(&existing);

        let mut model: product::ActiveModel = existing.into();
        model.is_active = Set(false);
        let updated = model.update(&*self.db).await.map_err(ServiceError::Database)?;

        self.audit
            .record(
                "products",
                updated.id,
                audit_log::ACTION_DELETE,
                before,
                snapshot(&updated),
                actor,
            )
            .await;
        self.event_sender
            .send_or_log(Event::ProductDeleted(updated.id));
        Ok(())
    }
}

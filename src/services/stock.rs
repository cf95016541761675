use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionError, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::stock_movement::{self, MovementType};
use crate::entities::{audit_log, product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::audit::snapshot;

#[derive(Debug, Clone)]
pub struct RecordMovementInput {
    pub product_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub reason: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateMovementInput {
    pub movement_type: Option<MovementType>,
    pub quantity: Option<i32>,
    pub reason: Option<Option<String>>,
    pub reference: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub product_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Applies a movement to a current quantity, rejecting results below zero.
///
/// This is the whole ledger invariant in one place: `products.quantity` must
/// stay non-negative through every record, edit and delete.
pub fn apply_movement(
    current: i32,
    movement_type: MovementType,
    quantity: i32,
) -> Result<i32, ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::Validation(
            "movement quantity must be positive".to_string(),
        ));
    }
    let new = current
        .checked_add(movement_type.signed(quantity))
        .ok_or_else(|| ServiceError::Validation("quantity out of range".to_string()))?;
    if new < 0 {
        return Err(ServiceError::InsufficientStock(new));
    }
    Ok(new)
}

/// Reverses a previously applied movement.
pub fn reverse_movement(current: i32, signed_change: i32) -> Result<i32, ServiceError> {
    let new = current
        .checked_sub(signed_change)
        .ok_or_else(|| ServiceError::Validation("quantity out of range".to_string()))?;
    if new < 0 {
        return Err(ServiceError::InsufficientStock(new));
    }
    Ok(new)
}

/// The stock ledger. Every mutation updates the movement row and the
/// product's cached quantity inside one database transaction.
#[derive(Clone)]
pub struct StockService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl StockService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    fn emit_stock_events(&self, movement: &stock_movement::Model, product: &product::Model) {
        self.event_sender.send_or_log(Event::StockMovementRecorded {
            movement_id: movement.id,
            product_id: product.id,
            quantity_change: movement.signed_change(),
            new_quantity: product.quantity,
        });
        if product.is_low_stock() {
            self.event_sender.send_or_log(Event::LowStockDetected {
                product_id: product.id,
                quantity: product.quantity,
                threshold: product.low_stock_threshold,
            });
        }
    }

    /// Records a movement and moves the product quantity accordingly.
    #[instrument(skip(self, input))]
    pub async fn record(
        &self,
        input: RecordMovementInput,
        actor: Option<Uuid>,
    ) -> Result<(stock_movement::Model, product::Model), ServiceError> {
        let (movement, updated) = self
            .db
            .transaction::<_, (stock_movement::Model, product::Model), ServiceError>(move |txn| {
                Box::pin(async move {
                    let product = product::Entity::find_by_id(input.product_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::Database)?
                        .ok_or_else(|| ServiceError::NotFound("product".to_string()))?;

                    let new_quantity =
                        apply_movement(product.quantity, input.movement_type, input.quantity)?;

                    let mut product_model: product::ActiveModel = product.into();
                    product_model.quantity = Set(new_quantity);
                    let updated = product_model
                        .update(txn)
                        .await
                        .map_err(ServiceError::Database)?;

                    let movement = stock_movement::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        product_id: Set(input.product_id),
                        quantity: Set(input.quantity),
                        movement_type: Set(input.movement_type.as_str().to_string()),
                        reason: Set(input.reason),
                        reference: Set(input.reference),
                        user_id: Set(actor),
                        created_at: Set(Utc::now()),
                    }
                    .insert(txn)
                    .await
                    .map_err(|e| crate::errors::map_sql_err(e, "stock movement"))?;

                    crate::services::audit::record_on(
                        txn,
                        "stock_movements",
                        movement.id,
                        audit_log::ACTION_CREATE,
                        None,
                        snapshot(&movement),
                        actor,
                    )
                    .await?;

                    Ok((movement, updated))
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(e) => ServiceError::Database(e),
                TransactionError::Transaction(e) => e,
            })?;

        info!(
            movement_id = %movement.id,
            product_id = %updated.id,
            new_quantity = updated.quantity,
            "stock movement recorded"
        );
        self.emit_stock_events(&movement, &updated);
        Ok((movement, updated))
    }

    /// Edits a movement by reversing its original effect and applying the
    /// edited one. Both the intermediate and final quantities must stay
    /// non-negative or the whole edit rolls back.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        movement_id: Uuid,
        input: UpdateMovementInput,
        actor: Option<Uuid>,
    ) -> Result<(stock_movement::Model, product::Model), ServiceError> {
        let (movement, updated) = self
            .db
            .transaction::<_, (stock_movement::Model, product::Model), ServiceError>(move |txn| {
                Box::pin(async move {
                    let movement = stock_movement::Entity::find_by_id(movement_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::Database)?
                        .ok_or_else(|| ServiceError::NotFound("stock movement".to_string()))?;

                    let product = product::Entity::find_by_id(movement.product_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::Database)?
                        .ok_or_else(|| ServiceError::NotFound("product".to_string()))?;

                    let new_type = input
                        .movement_type
                        .or_else(|| MovementType::from_str(&movement.movement_type))
                        .ok_or_else(|| {
                            ServiceError::Validation("unknown movement type".to_string())
                        })?;
                    let new_quantity_requested = input.quantity.unwrap_or(movement.quantity);

                    let intermediate = reverse_movement(product.quantity, movement.signed_change())?;
                    let final_quantity =
                        apply_movement(intermediate, new_type, new_quantity_requested)?;

                    let mut product_model: product::ActiveModel = product.into();
                    product_model.quantity = Set(final_quantity);
                    let updated_product = product_model
                        .update(txn)
                        .await
                        .map_err(ServiceError::Database)?;

                    let before = snapshot(&movement);
                    let mut movement_model: stock_movement::ActiveModel = movement.into();
                    movement_model.movement_type = Set(new_type.as_str().to_string());
                    movement_model.quantity = Set(new_quantity_requested);
                    if let Some(reason) = input.reason {
                        movement_model.reason = Set(reason);
                    }
                    if let Some(reference) = input.reference {
                        movement_model.reference = Set(reference);
                    }
                    let updated_movement = movement_model
                        .update(txn)
                        .await
                        .map_err(ServiceError::Database)?;

                    crate::services::audit::record_on(
                        txn,
                        "stock_movements",
                        updated_movement.id,
                        audit_log::ACTION_UPDATE,
                        before,
                        snapshot(&updated_movement),
                        actor,
                    )
                    .await?;

                    Ok((updated_movement, updated_product))
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(e) => ServiceError::Database(e),
                TransactionError::Transaction(e) => e,
            })?;

        self.emit_stock_events(&movement, &updated);
        Ok((movement, updated))
    }

    /// Deletes a movement, reversing its effect on the product quantity.
    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        movement_id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<product::Model, ServiceError> {
        let (movement_id, updated) = self
            .db
            .transaction::<_, (Uuid, product::Model), ServiceError>(move |txn| {
                Box::pin(async move {
                    let movement = stock_movement::Entity::find_by_id(movement_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::Database)?
                        .ok_or_else(|| ServiceError::NotFound("stock movement".to_string()))?;

                    let product = product::Entity::find_by_id(movement.product_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::Database)?
                        .ok_or_else(|| ServiceError::NotFound("product".to_string()))?;

                    let new_quantity = reverse_movement(product.quantity, movement.signed_change())?;

                    let mut product_model: product::ActiveModel = product.into();
                    product_model.quantity = Set(new_quantity);
                    let updated_product = product_model
                        .update(txn)
                        .await
                        .map_err(ServiceError::Database)?;

                    let before = snapshot(&movement);
                    let id = movement.id;
                    movement.delete(txn).await.map_err(ServiceError::Database)?;

                    crate::services::audit::record_on(
                        txn,
                        "stock_movements",
                        id,
                        audit_log::ACTION_DELETE,
                        before,
                        None,
                        actor,
                    )
                    .await?;

                    Ok((id, updated_product))
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(e) => ServiceError::Database(e),
                TransactionError::Transaction(e) => e,
            })?;

        self.event_sender.send_or_log(Event::StockMovementReversed {
            movement_id,
            product_id: updated.id,
            new_quantity: updated.quantity,
        });
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<stock_movement::Model, ServiceError> {
        stock_movement::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::Database)?
            .ok_or_else(|| ServiceError::NotFound("stock movement".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: MovementFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<stock_movement::Model>, u64), ServiceError> {
        let offset = (page.max(1) - 1) * limit;

        let mut query = stock_movement::Entity::find();
        if let Some(product_id) = filter.product_id {
            query = query.filter(stock_movement::Column::ProductId.eq(product_id));
        }
        if let Some(ty) = filter.movement_type {
            query = query.filter(stock_movement::Column::MovementType.eq(ty.as_str()));
        }
        if let Some(from) = filter.from {
            query = query.filter(stock_movement::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(stock_movement::Column::CreatedAt.lte(to));
        }

        let total = query
            .clone()
            .count(&*self.db)
            .await
            .map_err(ServiceError::Database)?;
        let items = query
            .order_by_desc(stock_movement::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(&*self.db)
            .await
            .map_err(ServiceError::Database)?;
        Ok((items, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_movement_increases_quantity() {
        assert_eq!(apply_movement(100, MovementType::In, 30).unwrap(), 130);
    }

    #[test]
    fn outbound_movement_decreases_quantity() {
        assert_eq!(apply_movement(100, MovementType::Out, 30).unwrap(), 70);
    }

    #[test]
    fn outbound_below_zero_is_rejected() {
        let err = apply_movement(70, MovementType::Out, 80).unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientStock(-10)));
    }

    #[test]
    fn outbound_to_exactly_zero_is_allowed() {
        assert_eq!(apply_movement(70, MovementType::Out, 70).unwrap(), 0);
    }

    #[test]
    fn zero_and_negative_quantities_are_invalid() {
        assert!(matches!(
            apply_movement(10, MovementType::In, 0),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            apply_movement(10, MovementType::In, -5),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn overflow_is_caught() {
        assert!(matches!(
            apply_movement(i32::MAX, MovementType::In, 1),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn reversal_restores_the_prior_quantity() {
        let after = apply_movement(100, MovementType::Out, 30).unwrap();
        assert_eq!(reverse_movement(after, MovementType::Out.signed(30)).unwrap(), 100);
    }

    #[test]
    fn reversing_an_inbound_can_fail_when_stock_was_consumed() {
        // 0 on hand, +50 in, 40 consumed elsewhere: the +50 row can no
        // longer be deleted because reversal would leave -40.
        let err = reverse_movement(10, 50).unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientStock(-40)));
    }
}

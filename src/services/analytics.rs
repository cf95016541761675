use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::stock_movement::{self, MovementType};
use crate::entities::{category, product, supplier};
use crate::errors::ServiceError;

pub const DEFAULT_TREND_DAYS: i64 = 30;
pub const MAX_TREND_DAYS: i64 = 365;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_products: u64,
    pub active_products: u64,
    pub low_stock_count: u64,
    pub out_of_stock_count: u64,
    pub total_inventory_value: Decimal,
    pub category_count: u64,
    pub supplier_count: u64,
    pub total_movements: u64,
    pub movements_in: u64,
    pub movements_out: u64,
    pub units_moved_today: i64,
    pub category_breakdown: Vec<CategoryBreakdown>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryBreakdown {
    pub category_id: Option<Uuid>,
    pub category_name: String,
    pub product_count: u64,
    pub stock_value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovementTrendPoint {
    pub date: NaiveDate,
    pub inbound: i64,
    pub outbound: i64,
    pub net: i64,
}

/// Read-only aggregates recomputed on every call; nothing is cached or
/// materialized.
#[derive(Clone)]
pub struct AnalyticsService {
    db: Arc<DatabaseConnection>,
}

impl AnalyticsService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<DashboardSummary, ServiceError> {
        let products = product::Entity::find()
            .all(&*self.db)
            .await
            .map_err(ServiceError::Database)?;

        let total_products = products.len() as u64;
        let active_products = products.iter().filter(|p| p.is_active).count() as u64;
        let low_stock_count = products
            .iter()
            .filter(|p| p.is_active && p.is_low_stock())
            .count() as u64;
        let out_of_stock_count = products
            .iter()
            .filter(|p| p.is_active && p.quantity == 0)
            .count() as u64;
        let total_inventory_value = products
            .iter()
            .filter(|p| p.is_active)
            .fold(Decimal::ZERO, |acc, p| acc + p.stock_value());

        let category_count = category::Entity::find()
            .count(&*self.db)
            .await
            .map_err(ServiceError::Database)?;
        let supplier_count = supplier::Entity::find()
            .count(&*self.db)
            .await
            .map_err(ServiceError::Database)?;

        let total_movements = stock_movement::Entity::find()
            .count(&*self.db)
            .await
            .map_err(ServiceError::Database)?;
        let movements_in = stock_movement::Entity::find()
            .filter(stock_movement::Column::MovementType.eq(MovementType::In.as_str()))
            .count(&*self.db)
            .await
            .map_err(ServiceError::Database)?;
        let movements_out = stock_movement::Entity::find()
            .filter(stock_movement::Column::MovementType.eq(MovementType::Out.as_str()))
            .count(&*self.db)
            .await
            .map_err(ServiceError::Database)?;

        let today_start = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc();
        let todays_movements = stock_movement::Entity::find()
            .filter(stock_movement::Column::CreatedAt.gte(today_start))
            .all(&*self.db)
            .await
            .map_err(ServiceError::Database)?;
        let units_moved_today = todays_movements
            .iter()
            .map(|m| i64::from(m.quantity))
            .sum();

        let category_breakdown = breakdown_by_category(
            &products,
            &category::Entity::find()
                .all(&*self.db)
                .await
                .map_err(ServiceError::Database)?,
        );

        Ok(DashboardSummary {
            total_products,
            active_products,
            low_stock_count,
            out_of_stock_count,
            total_inventory_value,
            category_count,
            supplier_count,
            total_movements,
            movements_in,
            movements_out,
            units_moved_today,
            category_breakdown,
        })
    }

    /// Per-day movement totals for the last `days` days, zero-filled so the
    /// series is contiguous. `days` is clamped to 1..=365.
    #[instrument(skip(self))]
    pub async fn movement_trend(
        &self,
        days: Option<i64>,
    ) -> Result<Vec<MovementTrendPoint>, ServiceError> {
        let days = days.unwrap_or(DEFAULT_TREND_DAYS).clamp(1, MAX_TREND_DAYS);
        let today = Utc::now().date_naive();
        let cutoff = (today - Duration::days(days - 1))
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc();

        let movements = stock_movement::Entity::find()
            .filter(stock_movement::Column::CreatedAt.gte(cutoff))
            .all(&*self.db)
            .await
            .map_err(ServiceError::Database)?;

        let mut by_day: HashMap<NaiveDate, (i64, i64)> = HashMap::new();
        for movement in &movements {
            let entry = by_day.entry(movement.created_at.date_naive()).or_default();
            match MovementType::from_str(&movement.movement_type) {
                Some(MovementType::In) => entry.0 += i64::from(movement.quantity),
                Some(MovementType::Out) => entry.1 += i64::from(movement.quantity),
                None => {}
            }
        }

        let mut trend = Vec::with_capacity(days as usize);
        for offset in 0..days {
            let date = today - Duration::days(days - 1 - offset);
            let (inbound, outbound) = by_day.get(&date).copied().unwrap_or((0, 0));
            trend.push(MovementTrendPoint {
                date,
                inbound,
                outbound,
                net: inbound - outbound,
            });
        }
        Ok(trend)
    }
}

fn breakdown_by_category(
    products: &[product::Model],
    categories: &[category::Model],
) -> Vec<CategoryBreakdown> {
    let names: HashMap<Uuid, &str> = categories
        .iter()
        .map(|c| (c.id, c.name.as_str()))
        .collect();

    let mut grouped: HashMap<Option<Uuid>, (u64, Decimal)> = HashMap::new();
    for product in products.iter().filter(|p| p.is_active) {
        let entry = grouped.entry(product.category_id).or_default();
        entry.0 += 1;
        entry.1 += product.stock_value();
    }

    let mut breakdown: Vec<CategoryBreakdown> = grouped
        .into_iter()
        .map(|(category_id, (product_count, stock_value))| CategoryBreakdown {
            category_id,
            category_name: category_id
                .and_then(|id| names.get(&id).copied())
                .unwrap_or("Uncategorized")
                .to_string(),
            product_count,
            stock_value,
        })
        .collect();
    breakdown.sort_by(|a, b| a.category_name.cmp(&b.category_name));
    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn make_product(category_id: Option<Uuid>, price: Decimal, quantity: i32) -> product::Model {
        product::Model {
            id: Uuid::new_v4(),
            name: "Widget".into(),
            sku: Uuid::new_v4().to_string(),
            description: None,
            category_id,
            supplier_id: None,
            price,
            quantity,
            low_stock_threshold: 10,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn breakdown_groups_by_category_and_values_stock() {
        let cat = category::Model {
            id: Uuid::new_v4(),
            name: "Cables".into(),
            description: None,
            status: category::STATUS_ACTIVE.into(),
            created_at: Utc::now(),
            updated_at: None,
        };
        let products = vec![
            make_product(Some(cat.id), dec!(2.50), 4),
            make_product(Some(cat.id), dec!(1.00), 10),
            make_product(None, dec!(5.00), 2),
        ];

        let breakdown = breakdown_by_category(&products, std::slice::from_ref(&cat));
        assert_eq!(breakdown.len(), 2);

        let cables = breakdown.iter().find(|b| b.category_name == "Cables").unwrap();
        assert_eq!(cables.product_count, 2);
        assert_eq!(cables.stock_value, dec!(20.00));

        let uncategorized = breakdown
            .iter()
            .find(|b| b.category_name == "Uncategorized")
            .unwrap();
        assert_eq!(uncategorized.product_count, 1);
        assert_eq!(uncategorized.stock_value, dec!(10.00));
    }

    #[test]
    fn inactive_products_are_excluded_from_breakdown() {
        let mut inactive = make_product(None, dec!(3.00), 5);
        inactive.is_active = false;
        let breakdown = breakdown_by_category(&[inactive], &[]);
        assert!(breakdown.is_empty());
    }
}

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::events::EventSender;
use crate::services::{
    AnalyticsService, AuditService, CategoryService, ProductService, StockService,
    SupplierService, UserService,
};

pub mod analytics;
pub mod auth;
pub mod categories;
pub mod common;
pub mod products;
pub mod stock;
pub mod suppliers;
pub mod users;

/// Bundle of service instances shared through `AppState`.
#[derive(Clone)]
pub struct AppServices {
    pub users: UserService,
    pub categories: CategoryService,
    pub suppliers: SupplierService,
    pub products: ProductService,
    pub stock: StockService,
    pub analytics: AnalyticsService,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        auth: Arc<AuthService>,
        event_sender: EventSender,
    ) -> Self {
        let audit = AuditService::new(db.clone());
        Self {
            users: UserService::new(db.clone(), auth, event_sender.clone(), audit.clone()),
            categories: CategoryService::new(db.clone(), event_sender.clone(), audit.clone()),
            suppliers: SupplierService::new(db.clone(), event_sender.clone(), audit.clone()),
            products: ProductService::new(db.clone(), event_sender.clone(), audit),
            stock: StockService::new(db.clone(), event_sender),
            analytics: AnalyticsService::new(db),
        }
    }
}

pub mod analytics;
pub mod audit;
pub mod categories;
pub mod products;
pub mod stock;
pub mod suppliers;
pub mod users;

pub use analytics::AnalyticsService;
pub use audit::AuditService;
pub use categories::CategoryService;
pub use products::ProductService;
pub use stock::StockService;
pub use suppliers::SupplierService;
pub use users::UserService;

/// Default page size for list operations
pub const DEFAULT_LIMIT: u64 = 20;
/// Maximum allowed page size
pub const MAX_LIMIT: u64 = 100;

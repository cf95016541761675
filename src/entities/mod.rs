pub mod audit_log;
pub mod category;
pub mod product;
pub mod stock_movement;
pub mod supplier;
pub mod user;

pub use audit_log::Entity as AuditLog;
pub use category::Entity as Category;
pub use product::Entity as Product;
pub use stock_movement::Entity as StockMovement;
pub use supplier::Entity as Supplier;
pub use user::Entity as User;

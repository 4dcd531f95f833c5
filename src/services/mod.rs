pub mod bulk_orders;

pub use bulk_orders::BulkOrderService;

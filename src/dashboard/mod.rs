pub mod inventory;
pub mod tiles;

pub use inventory::{get_inventory_rows, InventoryPage, InventoryQuery};
pub use tiles::{attach_tile_actions, BoundTile, DashboardTile, DashboardWidget, FilterChange, FilterClause, FilterTemplate};

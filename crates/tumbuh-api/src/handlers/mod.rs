pub mod areas;
pub mod health;
pub mod hyperlocal;

pub use areas::{get_area_result, get_area_status, list_area_tiles, list_areas, submit_area};
pub use health::health_check;
pub use hyperlocal::get_hyperlocal;

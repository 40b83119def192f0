pub mod order_status;
pub mod order;
pub mod menu_item;
pub mod qr_code;

pub use order_status::*;
pub use order::*;
pub use menu_item::*;
pub use qr_code::*;

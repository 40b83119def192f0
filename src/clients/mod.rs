#[macro_use]
mod macros;

pub mod menu_client;
pub mod order_client;
pub mod qr_code_client;

pub use menu_client::MenuClient;
pub use order_client::OrderClient;
pub use qr_code_client::QrCodeClient;

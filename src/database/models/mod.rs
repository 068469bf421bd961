pub mod payment;
pub mod plan_download;
pub mod user;
pub mod user_settings;
pub mod water_log;

pub use payment::*;
pub use plan_download::*;
pub use user::*;
pub use user_settings::*;
pub use water_log::*;

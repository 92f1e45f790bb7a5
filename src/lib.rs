pub mod clock;
pub mod delivery;
pub mod dispatch;
pub mod models;
pub mod settings;
pub mod storage;

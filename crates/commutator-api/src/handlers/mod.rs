pub mod consent;
pub mod csrf;
pub mod health;
pub mod order;

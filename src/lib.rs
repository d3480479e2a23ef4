pub mod clock;
pub mod config;
pub mod flag;
pub mod gateway;
pub mod rows;
pub mod tick;
pub mod validation;
pub mod view;

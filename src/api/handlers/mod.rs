pub mod files;
pub mod health;
pub mod locks;
pub mod token;

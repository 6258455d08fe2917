pub mod locks;
pub mod storage;
pub mod token;

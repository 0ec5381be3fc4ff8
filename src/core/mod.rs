pub mod fingerprint;
pub mod frames;
pub mod storage;

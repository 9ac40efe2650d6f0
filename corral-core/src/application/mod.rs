pub mod agent;
pub mod conversation;
pub mod entity;
pub mod retry;
pub mod tooling;

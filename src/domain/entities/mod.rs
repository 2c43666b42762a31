pub mod billing_event;
pub mod mind_map;
pub mod subscription;

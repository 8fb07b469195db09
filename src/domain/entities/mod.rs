pub mod month;
pub mod subscription;
pub mod subscription_filter;

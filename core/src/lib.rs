pub mod fallback;
pub mod notify;
pub mod request;
pub mod strategy;

pub use fallback::*;
pub use notify::{Notification, NotificationAction};
pub use request::*;
pub use strategy::{CacheKey, NetworkOnlyList, RoutePlan, is_cacheable, plan_route};

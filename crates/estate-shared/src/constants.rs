//! Application-wide constants

pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const MAX_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_ACTOR: &str = "system";
pub const ACTOR_HEADER: &str = "x-actor";
pub const API_V1_PREFIX: &str = "/api/v1";

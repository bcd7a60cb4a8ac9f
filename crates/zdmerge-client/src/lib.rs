//! Rate-limited Zendesk API client.
//!
//! Every call to the support system goes through a single
//! [`gateway::ZendeskGateway`], which funnels all operations through one
//! [`rate_limit::RateLimiter`] so the whole process shares one external
//! call budget: at most one request in flight, a minimum gap between
//! requests, and a replenishing per-window reservoir.

pub mod auth;
pub mod error;
pub mod gateway;
pub mod models;
pub mod rate_limit;
pub mod retry;

pub use auth::ApiCredentials;
pub use error::{ClientError, ClientResult};
pub use gateway::{GatewayConfig, ZendeskGateway};
pub use models::{Identity, SearchResult, TicketPage, ZendeskUser};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use retry::RetryPolicy;

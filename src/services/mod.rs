//! 服务模块

pub mod ai_client;
pub mod fallback;
pub mod response_validator;
pub mod search;

pub use ai_client::{AiClient, ProviderClient, create_ai_client};
pub use search::{SearchService, TravelSearchService, create_search_service};

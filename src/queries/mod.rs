pub mod identity_queries;
pub mod stats_queries;

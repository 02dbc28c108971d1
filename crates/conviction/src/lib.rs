pub mod analysis;
pub mod conviction_scoring;
pub mod feature_gate;
pub mod http;
pub mod market_data;
pub mod metrics;
pub mod position_analysis;
pub mod trust;

pub mod aggregator;
pub mod orchestrator;
pub mod timeseries;

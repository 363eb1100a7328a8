// Tier 2: Factor aggregation
//
// Combines the layer scores of one factor into a value + confidence with
// validation metrics. Runs once per factor after every layer has resolved.

pub mod factor_aggregator;

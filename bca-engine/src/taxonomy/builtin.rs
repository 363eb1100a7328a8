//! Built-in strategic taxonomy table
//!
//! 5 segments, 28 factors, 210 layers. Layers are generated from a fixed facet
//! list: 14 factors carry all 8 facets, the other 14 carry the first 7.

use super::{NodeKind, SegmentId, TaxonomyNode};

/// Layer facets, in order; factors with 7 layers skip the last one
const LAYER_FACETS: [&str; 8] = [
    "Current Level",
    "Trend Direction",
    "Volatility",
    "Evidence Depth",
    "Peer Benchmark",
    "Forward Outlook",
    "Risk Exposure",
    "Strategic Fit",
];

/// (segment, factor id, factor name, layer count)
const FACTOR_TABLE: [(SegmentId, &str, &str, usize); 28] = [
    (SegmentId::Consumer, "C1", "Demand Intensity", 8),
    (SegmentId::Consumer, "C2", "Purchase Behaviour", 8),
    (SegmentId::Consumer, "C3", "Loyalty and Retention", 8),
    (SegmentId::Consumer, "C4", "Perception and Sentiment", 7),
    (SegmentId::Consumer, "C5", "Adoption Readiness", 7),
    (SegmentId::Consumer, "C6", "Price Sensitivity", 7),
    (SegmentId::Market, "M1", "Market Size", 8),
    (SegmentId::Market, "M2", "Growth Trajectory", 8),
    (SegmentId::Market, "M3", "Competitive Rivalry", 8),
    (SegmentId::Market, "M4", "Entry Barriers", 7),
    (SegmentId::Market, "M5", "Regulatory Climate", 7),
    (SegmentId::Market, "M6", "Economic Conditions", 7),
    (SegmentId::Product, "P1", "Feature Differentiation", 8),
    (SegmentId::Product, "P2", "Quality and Reliability", 8),
    (SegmentId::Product, "P3", "Innovation Pipeline", 8),
    (SegmentId::Product, "P4", "Cost Structure", 7),
    (SegmentId::Product, "P5", "Scalability", 7),
    (SegmentId::Product, "P6", "Substitute Threat", 7),
    (SegmentId::Brand, "B1", "Brand Awareness", 8),
    (SegmentId::Brand, "B2", "Brand Equity", 8),
    (SegmentId::Brand, "B3", "Positioning Clarity", 7),
    (SegmentId::Brand, "B4", "Reputation Risk", 7),
    (SegmentId::Brand, "B5", "Channel Reach", 7),
    (SegmentId::Experience, "E1", "Onboarding", 8),
    (SegmentId::Experience, "E2", "Engagement Depth", 8),
    (SegmentId::Experience, "E3", "Support Quality", 8),
    (SegmentId::Experience, "E4", "Journey Friction", 7),
    (SegmentId::Experience, "E5", "Advocacy", 7),
];

/// Layer identifier for the n-th (1-based) layer of a factor
pub fn layer_id(factor_id: &str, n: usize) -> String {
    format!("{}_L{:02}", factor_id, n)
}

/// Flat node list for the built-in taxonomy (segments, then factors, then layers)
pub fn builtin_nodes() -> Vec<TaxonomyNode> {
    let mut nodes = Vec::with_capacity(5 + 28 + 210);

    for segment in SegmentId::ALL {
        nodes.push(TaxonomyNode {
            id: segment.as_str().to_string(),
            name: segment.display_name().to_string(),
            parent_id: None,
            kind: NodeKind::Segment,
        });
    }

    for (segment, factor_id, factor_name, _) in FACTOR_TABLE {
        nodes.push(TaxonomyNode {
            id: factor_id.to_string(),
            name: factor_name.to_string(),
            parent_id: Some(segment.as_str().to_string()),
            kind: NodeKind::Factor,
        });
    }

    for (_, factor_id, factor_name, layer_count) in FACTOR_TABLE {
        for (index, facet) in LAYER_FACETS.iter().take(layer_count).enumerate() {
            nodes.push(TaxonomyNode {
                id: layer_id(factor_id, index + 1),
                name: format!("{} - {}", factor_name, facet),
                parent_id: Some(factor_id.to_string()),
                kind: NodeKind::Layer,
            });
        }
    }

    nodes
}

// Concept: Immutable segment ↔ factor ↔ layer registry
//
// Loaded once at startup, validated, then shared read-only (Arc) across all
// scoring workers. No locking: nothing mutates after construction.

pub mod builtin;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Expected cardinalities of a complete taxonomy
pub const EXPECTED_SEGMENTS: usize = 5;
pub const EXPECTED_FACTORS: usize = 28;
pub const EXPECTED_LAYERS: usize = 210;

/// Top-tier strategic dimension
///
/// Closed set: adding a segment forces every persona/formula match to be updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SegmentId {
    Consumer,
    Market,
    Product,
    Brand,
    Experience,
}

impl SegmentId {
    /// Canonical processing order
    pub const ALL: [SegmentId; 5] = [
        SegmentId::Consumer,
        SegmentId::Market,
        SegmentId::Product,
        SegmentId::Brand,
        SegmentId::Experience,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SegmentId::Consumer => "CONSUMER",
            SegmentId::Market => "MARKET",
            SegmentId::Product => "PRODUCT",
            SegmentId::Brand => "BRAND",
            SegmentId::Experience => "EXPERIENCE",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            SegmentId::Consumer => "Consumer",
            SegmentId::Market => "Market",
            SegmentId::Product => "Product",
            SegmentId::Brand => "Brand",
            SegmentId::Experience => "Experience",
        }
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentId {
    type Err = TaxonomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SegmentId::ALL
            .into_iter()
            .find(|seg| seg.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TaxonomyError::UnknownSegment(s.to_string()))
    }
}

/// Node kind in the three-tier taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Segment,
    Factor,
    Layer,
}

/// One row of a taxonomy table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyNode {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub kind: NodeKind,
}

/// Result of `TaxonomyRegistry::validate`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub segment_count: usize,
    pub factor_count: usize,
    pub layer_count: usize,
}

impl fmt::Display for TaxonomyValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} segments, {} factors, {} layers",
            self.segment_count, self.factor_count, self.layer_count
        )?;
        if !self.errors.is_empty() {
            write!(f, "; errors: {}", self.errors.join("; "))?;
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone)]
pub enum TaxonomyError {
    /// Counts or mappings are inconsistent; the pipeline must not run
    #[error("Invalid taxonomy: {0}")]
    Invalid(TaxonomyValidation),

    #[error("Unknown segment: {0}")]
    UnknownSegment(String),
}

/// Read-only taxonomy with forward and reverse lookups
#[derive(Debug, Clone)]
pub struct TaxonomyRegistry {
    factors_by_segment: BTreeMap<SegmentId, Vec<String>>,
    layers_by_factor: HashMap<String, Vec<String>>,
    factor_to_segment: HashMap<String, SegmentId>,
    layer_to_factor: HashMap<String, String>,
    names: HashMap<String, String>,
    /// Layers in table order (segment, factor, layer)
    layer_order: Vec<String>,
    factor_order: Vec<String>,
    /// Problems found while indexing, reported by `validate`
    build_errors: Vec<String>,
    build_warnings: Vec<String>,
    segment_count: usize,
}

impl TaxonomyRegistry {
    /// Built-in 5 / 28 / 210 taxonomy
    pub fn builtin() -> Self {
        Self::from_nodes(builtin::builtin_nodes())
    }

    /// Index an arbitrary node table
    ///
    /// Never fails: inconsistencies are collected and surface through `validate()`.
    pub fn from_nodes(nodes: Vec<TaxonomyNode>) -> Self {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        let mut segments: HashSet<SegmentId> = HashSet::new();
        let mut factors_by_segment: BTreeMap<SegmentId, Vec<String>> = BTreeMap::new();
        let mut factor_to_segment = HashMap::new();
        let mut factor_order = Vec::new();
        let mut names = HashMap::new();

        let mut pending_layers = Vec::new();

        // Segments and factors first so layer parents can be resolved
        // regardless of table order
        let mut pending_factors = Vec::new();
        for node in nodes {
            if !seen.insert(node.id.clone()) {
                errors.push(format!("Duplicate id '{}'", node.id));
                continue;
            }
            match node.kind {
                NodeKind::Segment => match node.id.parse::<SegmentId>() {
                    Ok(seg) => {
                        if node.parent_id.is_some() {
                            warnings.push(format!("Segment '{}' has a parent; ignored", node.id));
                        }
                        segments.insert(seg);
                        factors_by_segment.entry(seg).or_default();
                        names.insert(node.id.clone(), node.name);
                    }
                    Err(_) => errors.push(format!("Unknown segment id '{}'", node.id)),
                },
                NodeKind::Factor => pending_factors.push(node),
                NodeKind::Layer => pending_layers.push(node),
            }
        }

        for node in pending_factors {
            let parent = node
                .parent_id
                .as_deref()
                .and_then(|p| p.parse::<SegmentId>().ok())
                .filter(|seg| segments.contains(seg));
            match parent {
                Some(seg) => {
                    factors_by_segment.entry(seg).or_default().push(node.id.clone());
                    factor_to_segment.insert(node.id.clone(), seg);
                    factor_order.push(node.id.clone());
                    names.insert(node.id, node.name);
                }
                None => errors.push(format!(
                    "Factor '{}' does not map to a known segment (parent {:?})",
                    node.id, node.parent_id
                )),
            }
        }

        let mut layers_by_factor: HashMap<String, Vec<String>> = HashMap::new();
        let mut layer_to_factor = HashMap::new();
        let mut unordered_layers = Vec::new();
        for node in pending_layers {
            match node.parent_id.as_deref() {
                Some(parent) if factor_to_segment.contains_key(parent) => {
                    layers_by_factor
                        .entry(parent.to_string())
                        .or_default()
                        .push(node.id.clone());
                    layer_to_factor.insert(node.id.clone(), parent.to_string());
                    unordered_layers.push(node.id.clone());
                    names.insert(node.id, node.name);
                }
                _ => errors.push(format!(
                    "Layer '{}' does not map to a known factor (parent {:?})",
                    node.id, node.parent_id
                )),
            }
        }

        for factor in &factor_order {
            if !layers_by_factor.contains_key(factor) {
                warnings.push(format!("Factor '{}' has no layers", factor));
            }
        }
        for (seg, factors) in &factors_by_segment {
            if factors.is_empty() {
                warnings.push(format!("Segment '{}' has no factors", seg));
            }
        }

        // Canonical layer order: segment order, then factor table order, then layer table order
        let mut layer_order = Vec::with_capacity(unordered_layers.len());
        for seg in SegmentId::ALL {
            if let Some(factors) = factors_by_segment.get(&seg) {
                for factor in factors {
                    if let Some(layers) = layers_by_factor.get(factor) {
                        layer_order.extend(layers.iter().cloned());
                    }
                }
            }
        }
        let factor_order: Vec<String> = SegmentId::ALL
            .iter()
            .filter_map(|seg| factors_by_segment.get(seg))
            .flatten()
            .cloned()
            .collect();

        Self {
            segment_count: segments.len(),
            factors_by_segment,
            layers_by_factor,
            factor_to_segment,
            layer_to_factor,
            names,
            layer_order,
            factor_order,
            build_errors: errors,
            build_warnings: warnings,
        }
    }

    /// Index and validate; an inconsistent table is a fatal configuration error
    pub fn load_validated(nodes: Vec<TaxonomyNode>) -> Result<Self, TaxonomyError> {
        let registry = Self::from_nodes(nodes);
        let report = registry.validate();
        if report.valid {
            Ok(registry)
        } else {
            Err(TaxonomyError::Invalid(report))
        }
    }

    /// Check exact cardinalities and mapping completeness
    pub fn validate(&self) -> TaxonomyValidation {
        let mut errors = self.build_errors.clone();
        let warnings = self.build_warnings.clone();

        let segment_count = self.segment_count;
        let factor_count = self.factor_to_segment.len();
        let layer_count = self.layer_to_factor.len();

        if segment_count != EXPECTED_SEGMENTS {
            errors.push(format!(
                "Expected {} segments, found {}",
                EXPECTED_SEGMENTS, segment_count
            ));
        }
        if factor_count != EXPECTED_FACTORS {
            errors.push(format!(
                "Expected {} factors, found {}",
                EXPECTED_FACTORS, factor_count
            ));
        }
        if layer_count != EXPECTED_LAYERS {
            errors.push(format!(
                "Expected {} layers, found {}",
                EXPECTED_LAYERS, layer_count
            ));
        }

        TaxonomyValidation {
            valid: errors.is_empty(),
            errors,
            warnings,
            segment_count,
            factor_count,
            layer_count,
        }
    }

    pub fn layers_of(&self, factor_id: &str) -> &[String] {
        self.layers_by_factor
            .get(factor_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn factors_of(&self, segment: SegmentId) -> &[String] {
        self.factors_by_segment
            .get(&segment)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn factor_of(&self, layer_id: &str) -> Option<&str> {
        self.layer_to_factor.get(layer_id).map(String::as_str)
    }

    pub fn segment_of_factor(&self, factor_id: &str) -> Option<SegmentId> {
        self.factor_to_segment.get(factor_id).copied()
    }

    /// Composes layer → factor → segment
    pub fn segment_of_layer(&self, layer_id: &str) -> Option<SegmentId> {
        self.factor_of(layer_id)
            .and_then(|factor| self.segment_of_factor(factor))
    }

    /// Human-readable name of any node (falls back to the id)
    pub fn name_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.names.get(id).map(String::as_str).unwrap_or(id)
    }

    /// All layers in canonical order
    pub fn all_layers(&self) -> &[String] {
        &self.layer_order
    }

    /// All factors in canonical order
    pub fn all_factors(&self) -> &[String] {
        &self.factor_order
    }
}

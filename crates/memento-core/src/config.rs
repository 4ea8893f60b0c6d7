//! Configuration defaults for the two pipelines.
//!
//! Every knob named in the design (candidate counts, fusion weights,
//! MMR bounds, per-phase limits) lives here as a literal `Default`
//! impl. Callers merge per-request overrides shallowly by constructing
//! a config and replacing individual fields — there is no file-format
//! parsing layer; that surface belongs to the proxy shell, not the
//! engine.

/// Fusion parameters shared by LAND and DISTILL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionConfig {
    /// Base weight for vector-search results before coverage adjustment.
    pub vector_weight: f32,
    /// Base weight for full-text results before coverage adjustment.
    pub fulltext_weight: f32,
    /// Result count at which a source gets full weight.
    pub min_results_for_full_weight: usize,
    /// Scores below this floor are dropped after fusion.
    pub quality_floor: f32,
    /// Target mean for distribution alignment.
    pub target_mean: f32,
    /// Target standard deviation for distribution alignment.
    pub target_std: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            vector_weight: 0.7,
            fulltext_weight: 0.3,
            min_results_for_full_weight: 20,
            quality_floor: 0.3,
            target_mean: 0.5,
            target_std: 0.2,
        }
    }
}

/// LAND phase configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandConfig {
    /// Maximum candidates requested from each of vector/full-text search.
    pub candidates: usize,
    pub fusion: FusionConfig,
}

impl Default for LandConfig {
    fn default() -> Self {
        Self {
            candidates: 100,
            fusion: FusionConfig::default(),
        }
    }
}

/// ANCHOR phase configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorConfig {
    /// Minimum co-occurrence count for an entity to survive ANCHOR.
    pub min_memories: usize,
    /// Semantic signal weight in the entity-weighting blend.
    pub semantic_weight: f64,
    /// Memory-based signal weight in the entity-weighting blend.
    pub memory_weight: f64,
    /// Structural (degree) signal weight in the entity-weighting blend.
    pub structural_weight: f64,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            min_memories: 1,
            semantic_weight: 0.5,
            memory_weight: 0.3,
            structural_weight: 0.2,
        }
    }
}

/// EXPAND phase configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpandConfig {
    /// Personalized-PageRank damping factor.
    pub damping: f64,
    /// Maximum PPR iterations.
    pub iterations: usize,
    /// Weight given to the PPR structural score in Semantic-PPR blending.
    pub alpha: f64,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            damping: 0.75,
            iterations: 25,
            alpha: 0.5,
        }
    }
}

/// DISTILL phase configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistillConfig {
    pub fusion: FusionConfig,
    /// How many memories MMR selects into the final output.
    pub top_k: usize,
    /// Lower bound for adaptive MMR lambda.
    pub lambda_min: f32,
    /// Upper bound for adaptive MMR lambda.
    pub lambda_max: f32,
}

impl Default for DistillConfig {
    fn default() -> Self {
        Self {
            fusion: FusionConfig::default(),
            top_k: 10,
            lambda_min: 0.3,
            lambda_max: 0.9,
        }
    }
}

/// Full retrieval-pipeline configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RetrievalConfig {
    pub land: LandConfig,
    pub anchor: AnchorConfig,
    pub expand: ExpandConfig,
    pub distill: DistillConfig,
}

/// Agent-runner configuration: shared by every consolidation agent
/// unless overridden per-call (the HyDE step raises temperature without
/// mutating this).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentConfig {
    pub max_retries: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            temperature: 0.2,
            max_tokens: 2048,
        }
    }
}

/// Full consolidation-pipeline configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsolidationConfig {
    pub agent: AgentConfig,
    pub retrieval: RetrievalConfig,
    /// Vector-search results per HyDE document (branch A step d).
    pub hyde_results_per_doc: usize,
    /// Truncation point for the merged branch-A context.
    pub context_top_k: usize,
    /// Temperature override for the HyDE agent call.
    pub hyde_temperature: f32,
    /// Entity/memory search fan-out (branch B step c).
    pub entity_search_k: usize,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            agent: AgentConfig::default(),
            retrieval: RetrievalConfig::default(),
            hyde_results_per_doc: 10,
            context_top_k: 15,
            hyde_temperature: 0.7,
            entity_search_k: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_design_values() {
        let land = LandConfig::default();
        assert_eq!(land.candidates, 100);
        assert_eq!(land.fusion.vector_weight, 0.7);
        assert_eq!(land.fusion.fulltext_weight, 0.3);

        let anchor = AnchorConfig::default();
        assert_eq!(anchor.min_memories, 1);
        assert!((anchor.semantic_weight + anchor.memory_weight + anchor.structural_weight - 1.0).abs() < 1e-9);

        let expand = ExpandConfig::default();
        assert_eq!(expand.damping, 0.75);
        assert_eq!(expand.iterations, 25);
        assert_eq!(expand.alpha, 0.5);

        let distill = DistillConfig::default();
        assert_eq!(distill.top_k, 10);

        let consolidation = ConsolidationConfig::default();
        assert_eq!(consolidation.hyde_results_per_doc, 10);
        assert_eq!(consolidation.context_top_k, 15);
        assert_eq!(consolidation.hyde_temperature, 0.7);
    }

    #[test]
    fn overrides_replace_individual_fields() {
        let mut cfg = RetrievalConfig::default();
        cfg.land.candidates = 50;
        assert_eq!(cfg.land.candidates, 50);
        assert_eq!(cfg.anchor.min_memories, 1, "untouched fields keep their default");
    }
}

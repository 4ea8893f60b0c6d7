//! Pure numeric kernels shared by the retrieval and consolidation
//! pipelines: cosine similarity, distribution alignment, score fusion,
//! and adaptive MMR. All failure-free — no network or storage calls,
//! no retries.

mod fusion;
mod mmr;
mod normalize;
mod similarity;

pub use fusion::{coverage_adjusted_weights, fuse_scored, reciprocal_rank_fusion, FusedScore, ScoredId};
pub use mmr::{adaptive_lambda, mmr_rerank, MmrCandidate};
pub use normalize::{align_distribution, min_max_normalize};
pub use similarity::cosine_similarity;

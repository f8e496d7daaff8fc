//! Similarity clustering of proposals
//!
//! Pipeline: tokenize each proposal's text, keep terms shared by at least two
//! proposals, weight with TF-IDF, reduce to a few latent topics, then link
//! every pair whose cosine similarity exceeds the threshold. Connected
//! components of that graph are the clusters.
//!
//! The output is advisory: it assists manual batch-group formation and is
//! never written back to the store.

mod disjoint;
mod lsa;
mod text;

pub use disjoint::DisjointSet;
pub use lsa::{cosine_similarity, reduce, shared_vocabulary, tfidf, SparseVector};
pub use text::Tokenizer;

use crate::model::{Proposal, ProposalId, TextField};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Cluster index per proposal, dense from 0
pub type ClusterAssignment = BTreeMap<ProposalId, usize>;

/// Errors from clustering
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClusterError {
    #[error("insufficient corpus: {documents} documents, {vocabulary} shared terms")]
    InsufficientCorpus { documents: usize, vocabulary: usize },

    #[error("invalid clustering parameter: {0}")]
    InvalidParameter(String),
}

/// Parameters of one clustering run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    /// Latent dimensions kept after reduction
    pub topic_count: usize,
    /// Pairs strictly above this cosine similarity are linked
    pub similarity_threshold: f64,
}

impl ClusterParams {
    pub fn new(topic_count: usize, similarity_threshold: f64) -> Self {
        Self {
            topic_count,
            similarity_threshold,
        }
    }

    fn validate(&self) -> Result<(), ClusterError> {
        if self.topic_count == 0 {
            return Err(ClusterError::InvalidParameter(
                "topic_count must be at least 1".to_string(),
            ));
        }
        if !self.similarity_threshold.is_finite() {
            return Err(ClusterError::InvalidParameter(
                "similarity_threshold must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Pairwise cosine similarity of reduced document vectors
pub fn similarity_matrix(vectors: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = vectors.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let sim = cosine_similarity(&vectors[i], &vectors[j]);
            matrix[i][j] = sim;
            matrix[j][i] = sim;
        }
    }
    matrix
}

/// Partition `proposals` into similarity clusters
///
/// Cluster indices are numbered by first appearance in `proposals`, so the
/// same input yields the same labels. The partition itself does not depend on
/// input order.
pub fn auto_group(
    proposals: &[Proposal],
    fields: &[TextField],
    tokenizer: &Tokenizer,
    params: ClusterParams,
) -> Result<ClusterAssignment, ClusterError> {
    params.validate()?;

    let docs: Vec<Vec<String>> = proposals
        .iter()
        .map(|p| tokenizer.tokenize(&p.document(fields)))
        .collect();
    let vocabulary = shared_vocabulary(&docs);

    if docs.len() < 2 || vocabulary.is_empty() {
        return Err(ClusterError::InsufficientCorpus {
            documents: docs.len(),
            vocabulary: vocabulary.len(),
        });
    }

    let weighted = tfidf(&docs, &vocabulary);
    // Terms present in every document weigh zero
    if weighted.iter().all(Vec::is_empty) {
        return Err(ClusterError::InsufficientCorpus {
            documents: docs.len(),
            vocabulary: 0,
        });
    }
    let reduced = reduce(&weighted, params.topic_count);
    let similarity = similarity_matrix(&reduced);

    let mut components = DisjointSet::new(proposals.len());
    let mut links = 0usize;
    for i in 0..proposals.len() {
        for j in (i + 1)..proposals.len() {
            if similarity[i][j] > params.similarity_threshold {
                components.union(i, j);
                links += 1;
            }
        }
    }

    let labels = components.labels();
    let clusters = labels.iter().max().map_or(0, |m| m + 1);
    debug!(
        documents = docs.len(),
        vocabulary = vocabulary.len(),
        topics = reduced.first().map_or(0, Vec::len),
        links,
        clusters,
        "proposals clustered"
    );

    Ok(proposals.iter().map(|p| p.id).zip(labels).collect())
}

/// Members of each cluster, indexed by cluster number
pub fn cluster_members(assignment: &ClusterAssignment) -> Vec<Vec<ProposalId>> {
    let count = assignment.values().max().map_or(0, |m| m + 1);
    let mut members = vec![Vec::new(); count];
    for (id, cluster) in assignment {
        members[*cluster].push(*id);
    }
    members
}

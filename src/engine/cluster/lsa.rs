//! TF-IDF weighting and latent-semantic reduction
//!
//! Documents are sparse term vectors. The reduction is a truncated SVD of the
//! document-term matrix `A`, computed from the document Gram matrix `A·Aᵀ`:
//! its top eigenvectors `u_k` with eigenvalues `λ_k` give the reduced
//! document coordinates `u_k · sqrt(λ_k)`. Eigenvectors come from power
//! iteration, re-orthogonalised against the ones already found.

use std::collections::{BTreeMap, BTreeSet};

const MAX_ITERATIONS: usize = 300;
const TOLERANCE: f64 = 1e-10;
/// Eigenvalues at or below this are treated as zero (rank exhausted)
const EPSILON: f64 = 1e-12;

/// A sparse document vector: (term index, weight), sorted by term index
pub type SparseVector = Vec<(usize, f64)>;

/// Terms that occur in at least two documents, mapped to column indices
///
/// Column order is alphabetical so the matrix does not depend on hash order.
pub fn shared_vocabulary(docs: &[Vec<String>]) -> BTreeMap<String, usize> {
    let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
    for doc in docs {
        let unique: BTreeSet<&str> = doc.iter().map(String::as_str).collect();
        for term in unique {
            *document_frequency.entry(term).or_insert(0) += 1;
        }
    }

    document_frequency
        .into_iter()
        .filter(|(_, df)| *df > 1)
        .enumerate()
        .map(|(index, (term, _))| (term.to_string(), index))
        .collect()
}

/// L2-normalised TF-IDF vectors, `tf · log2(N / df)`
///
/// Terms outside `vocabulary` are ignored. A document with no weighted terms
/// yields an empty vector.
pub fn tfidf(docs: &[Vec<String>], vocabulary: &BTreeMap<String, usize>) -> Vec<SparseVector> {
    let n = docs.len() as f64;

    let counts: Vec<BTreeMap<usize, f64>> = docs
        .iter()
        .map(|doc| {
            let mut tf = BTreeMap::new();
            for term in doc {
                if let Some(&index) = vocabulary.get(term) {
                    *tf.entry(index).or_insert(0.0) += 1.0;
                }
            }
            tf
        })
        .collect();

    let mut df = vec![0usize; vocabulary.len()];
    for tf in &counts {
        for index in tf.keys() {
            df[*index] += 1;
        }
    }

    counts
        .into_iter()
        .map(|tf| {
            let weighted: SparseVector = tf
                .into_iter()
                .map(|(index, count)| (index, count * (n / df[index] as f64).log2()))
                .filter(|(_, w)| *w > 0.0)
                .collect();
            let norm = weighted.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            if norm == 0.0 {
                return Vec::new();
            }
            weighted.into_iter().map(|(i, w)| (i, w / norm)).collect()
        })
        .collect()
}

/// Dot product of two sparse vectors sorted by index
fn sparse_dot(a: &SparseVector, b: &SparseVector) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut sum = 0.0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

fn gram_matrix(rows: &[SparseVector]) -> Vec<Vec<f64>> {
    let n = rows.len();
    let mut gram = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let dot = sparse_dot(&rows[i], &rows[j]);
            gram[i][j] = dot;
            gram[j][i] = dot;
        }
    }
    gram
}

fn mat_vec(matrix: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    matrix
        .iter()
        .map(|row| row.iter().zip(v).map(|(a, b)| a * b).sum())
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalize(v: &mut [f64]) -> f64 {
    let norm = dot(v, v).sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    norm
}

fn orthogonalize(v: &mut [f64], basis: &[Vec<f64>]) {
    for b in basis {
        let projection = dot(v, b);
        v.iter_mut().zip(b).for_each(|(x, y)| *x -= projection * y);
    }
}

/// Reduce documents to at most `dimensions` latent coordinates
///
/// Returns one dense vector per document. Fewer dimensions are produced when
/// the matrix rank is lower than requested. Deterministic for a given input.
pub fn reduce(rows: &[SparseVector], dimensions: usize) -> Vec<Vec<f64>> {
    let n = rows.len();
    let mut coordinates = vec![Vec::with_capacity(dimensions); n];
    if n == 0 {
        return coordinates;
    }

    let gram = gram_matrix(rows);
    let mut basis: Vec<Vec<f64>> = Vec::new();

    for _ in 0..dimensions.min(n) {
        // Uneven start so it is not orthogonal to the leading eigenvectors
        let mut v: Vec<f64> = (0..n)
            .map(|i| 1.0 + ((i * 7919) % 101) as f64 / 101.0)
            .collect();
        orthogonalize(&mut v, &basis);
        if normalize(&mut v) <= EPSILON {
            break;
        }

        for _ in 0..MAX_ITERATIONS {
            let mut next = mat_vec(&gram, &v);
            orthogonalize(&mut next, &basis);
            if normalize(&mut next) <= EPSILON {
                break;
            }
            let change: f64 = next.iter().zip(&v).map(|(a, b)| (a - b).abs()).sum();
            v = next;
            if change < TOLERANCE {
                break;
            }
        }

        let eigenvalue = dot(&v, &mat_vec(&gram, &v));
        if eigenvalue <= EPSILON {
            break;
        }
        let scale = eigenvalue.sqrt();
        for (doc, component) in coordinates.iter_mut().zip(&v) {
            doc.push(component * scale);
        }
        basis.push(v);
    }

    coordinates
}

/// Cosine similarity between two dense vectors; 0 when either is zero
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    // Rounding can push parallel vectors just past 1
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(texts: &[&str]) -> Vec<Vec<String>> {
        texts
            .iter()
            .map(|t| t.split_whitespace().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn vocabulary_drops_single_document_terms() {
        let vocab = shared_vocabulary(&docs(&["web django", "web flask", "numpy"]));
        assert_eq!(vocab.len(), 1);
        assert_eq!(vocab.get("web"), Some(&0));
    }

    #[test]
    fn tfidf_vectors_are_unit_length() {
        let corpus = docs(&["web web api", "web api", "data api", "data frame"]);
        let vocab = shared_vocabulary(&corpus);
        for row in tfidf(&corpus, &vocab) {
            let norm: f64 = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn term_in_every_document_carries_no_weight() {
        let corpus = docs(&["web api", "web data", "web api data"]);
        let vocab = shared_vocabulary(&corpus);
        let web = vocab["web"];
        for row in tfidf(&corpus, &vocab) {
            assert!(row.iter().all(|(i, _)| *i != web));
        }
    }

    #[test]
    fn reduction_preserves_inner_products_at_full_rank() {
        let rows: Vec<SparseVector> = vec![
            vec![(0, 0.6), (1, 0.8)],
            vec![(1, 1.0)],
            vec![(0, 1.0)],
        ];
        let reduced = reduce(&rows, 3);

        for i in 0..rows.len() {
            for j in 0..rows.len() {
                let original = sparse_dot(&rows[i], &rows[j]);
                let projected = dot(&reduced[i], &reduced[j]);
                assert!((original - projected).abs() < 1e-6, "pair ({}, {})", i, j);
            }
        }
    }

    #[test]
    fn reduction_stops_at_matrix_rank() {
        let rows: Vec<SparseVector> = vec![vec![(0, 1.0)], vec![(0, 1.0)], vec![(0, 1.0)]];
        let reduced = reduce(&rows, 5);
        assert!(reduced.iter().all(|v| v.len() == 1));
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-12);
    }
}

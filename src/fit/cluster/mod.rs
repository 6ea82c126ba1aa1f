use nalgebra::*;
use rand::rngs::StdRng;
use std::fmt;
use thiserror::Error;

/// Centroid-based (or prototype-based) clustering implementation
pub mod center;

pub use center::*;

/// Errors reported by hard clustering algorithms.
#[derive(Debug, Clone, Error)]
pub enum ClusterError {

    #[error("empty input")]
    EmptyInput,

    /// Requested cluster count is incompatible with the dataset.
    #[error("invalid cluster count: requested {requested}, but dataset has {n_items} items")]
    InvalidClusterCount {
        requested : usize,
        n_items : usize
    }

}

/// Result of a hard clustering: one center per cluster and the cluster
/// index of each observation, in the order they were supplied.
#[derive(Debug, Clone)]
pub struct Partition {
    means : Vec<DVector<f64>>,
    allocations : Vec<usize>,
    n_iter : usize
}

impl Partition {

    pub fn new(means : Vec<DVector<f64>>, allocations : Vec<usize>, n_iter : usize) -> Self {
        Self { means, allocations, n_iter }
    }

    /// Returns mean of each cluster, with order matching the indices returned by Self::allocations
    pub fn means(&self) -> &[DVector<f64>] {
        &self.means[..]
    }

    /// Return cluster of each observation, in the order they were supplied
    pub fn allocations(&self) -> &[usize] {
        &self.allocations[..]
    }

    pub fn n_cluster(&self) -> usize {
        self.means.len()
    }

    pub fn iterations(&self) -> usize {
        self.n_iter
    }

    pub fn count_allocations(&self, cluster_ix : usize) -> usize {
        self.allocations().iter().filter(|alloc| **alloc == cluster_ix ).count()
    }

}

impl fmt::Display for Partition {

    fn fmt(&self, f : &mut fmt::Formatter) -> Result<(), fmt::Error> {
        for c in 0..self.means.len() {
            let obs_ix = self.allocations.iter()
                .enumerate()
                .filter(|(_, alloc)| **alloc == c )
                .map(|(ix, _)| ix )
                .collect::<Vec<usize>>();
            writeln!(f, "Cluster {}: Mean = {}; Observations = {:?}", c, self.means[c].transpose(), obs_ix)?;
        }
        Ok(())
    }

}

/// Hard clustering collaborator. Implementors split the rows of a (n x p) data
/// matrix into self.n_cluster() groups. Randomized algorithms must draw only from the
/// informed generator, so results are reproducible for a fixed seed.
pub trait Clustering {

    fn n_cluster(&self) -> usize;

    fn cluster(&self, y : &DMatrix<f64>, rng : &mut StdRng) -> Result<Partition, ClusterError>;

}

pub(crate) fn euclidian(a : &[f64], b : &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).powf(2.) ).sum::<f64>().sqrt()
}

#[test]
fn partition_counts() {
    let p = Partition::new(
        vec![DVector::zeros(1), DVector::from_element(1, 5.)],
        vec![0, 1, 1, 0, 1],
        3
    );
    assert_eq!(p.count_allocations(1), 3);
    assert_eq!(p.n_cluster(), 2);
    assert!(format!("{}", p).contains("Observations = [1, 2, 4]"));
    assert!((euclidian(&[0., 0.], &[3., 4.]) - 5.).abs() < 1E-12);
}

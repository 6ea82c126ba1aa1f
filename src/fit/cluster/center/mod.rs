use super::*;
use nalgebra::DVector;
use rand::prelude::*;
use rand::rngs::StdRng;

/// K-means is a special case of the EM algorithm for GMMs where
/// the probabilities of class allocation are assumed constant and equal;
/// and the covariances within clusters are assumed constant and equal as well.
/// Iterations alternate between averaging the observations allocated to each
/// cluster and re-allocating each observation to its closest mean, until no
/// observation changes cluster or max_iter is reached.
#[derive(Debug, Clone)]
pub struct KMeans {
    pub n_cluster : usize,
    pub max_iter : usize,

    /// Initial allocations. When absent, allocations are seeded (see seed_allocations).
    pub allocations : Option<Vec<usize>>
}

impl KMeans {

    pub fn new(n_cluster : usize) -> Self {
        Self { n_cluster, max_iter : 100, allocations : None }
    }

    pub fn with_max_iter(mut self, max_iter : usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_allocations(mut self, allocations : Vec<usize>) -> Self {
        self.allocations = Some(allocations);
        self
    }

}

/// Recomputes each mean as the average of the observations allocated to it. Clusters
/// that lost all their observations keep their previous mean.
fn update_means(
    means : &mut [DVector<f64>],
    sample : &[DVector<f64>],
    allocations : &[usize]
) {
    assert!(allocations.len() == sample.len());

    let obs_dim = sample[0].nrows();
    let mut sums : Vec<DVector<f64>> = means.iter().map(|_| DVector::zeros(obs_dim) ).collect();
    let mut counts = vec![0usize; means.len()];

    // Accumulate each observation into sum and count
    for (obs, alloc) in sample.iter().zip(allocations.iter()) {
        sums[*alloc] += obs;
        counts[*alloc] += 1;
    }

    // Calculate averages from sum and accumulated count
    for (c, (sum, count)) in sums.drain(..).zip(counts.iter()).enumerate() {
        if *count > 0 {
            means[c] = sum.unscale(*count as f64);
        }
    }
}

fn closest<'a>(candidates : impl Iterator<Item=&'a DVector<f64>>, el : &[f64]) -> usize {
    let mut min_dist = f64::INFINITY;
    let mut min_ix = 0;
    for (cand_ix, cand) in candidates.enumerate() {
        let dist_to_cand = euclidian(el, cand.as_slice());
        if dist_to_cand < min_dist {
            min_ix = cand_ix;
            min_dist = dist_to_cand;
        }
    }
    min_ix
}

/// Update allocation vector, returning how many observations were re-allocated.
fn update_allocations(
    allocations : &mut [usize],
    means : &[DVector<f64>],
    sample : &[DVector<f64>]
) -> usize {
    assert!(allocations.len() == sample.len());
    let mut n_reallocated = 0;
    for (alloc, obs) in allocations.iter_mut().zip(sample.iter()) {
        let best_alloc = closest(means.iter(), obs.as_slice());
        if *alloc != best_alloc {
            *alloc = best_alloc;
            n_reallocated += 1;
        }
    }
    n_reallocated
}

/// Seeding (choosing a representative observation for each cluster
/// before starting the KMeans algorithm) helps with the identifiability
/// of the model, biasing the algorithm to one of the equally likely
/// cluster allocations. The first seed is a random observation; each next seed is
/// the observation with the highest average distance to all previous seeds, which
/// favours seeds that are far apart. Seeds are always distinct observations (n_cluster <= n).
fn seed_allocations(
    n_cluster : usize,
    sample : &[DVector<f64>],
    rng : &mut StdRng
) -> Vec<usize> {

    let n = sample.len();

    // At the ith index, holds the observation index of the ith seed.
    let mut seeds : Vec<usize> = Vec::with_capacity(n_cluster);

    for c in 0..n_cluster {
        let obs_ix = if c == 0 {
            rng.gen_range(0, n)
        } else {
            let mut furthest_obs : Option<(usize, f64)> = None;
            for (ix, obs) in sample.iter().enumerate() {
                if seeds.contains(&ix) {
                    continue;
                }
                let avg_dist = seeds.iter()
                    .map(|s| euclidian(obs.as_slice(), sample[*s].as_slice()) )
                    .sum::<f64>() / seeds.len() as f64;
                match furthest_obs {
                    Some((_, best)) if best >= avg_dist => { },
                    _ => furthest_obs = Some((ix, avg_dist))
                }
            }
            furthest_obs.map(|(ix, _)| ix ).unwrap_or(0)
        };
        seeds.push(obs_ix);
    }

    let seed_means : Vec<DVector<f64>> = seeds.iter().map(|s| sample[*s].clone() ).collect();
    sample.iter()
        .enumerate()
        .map(|(ix, obs)| {
            // Seeds are allocated to their own cluster; remaining observations to the closest seed.
            match seeds.iter().position(|s| *s == ix ) {
                Some(c) => c,
                None => closest(seed_means.iter(), obs.as_slice())
            }
        })
        .collect()
}

fn valid_allocations(allocations : &[usize], n_cluster : usize, n : usize) -> bool {
    allocations.len() == n && allocations.iter().all(|a| *a < n_cluster )
}

impl Clustering for KMeans {

    fn n_cluster(&self) -> usize {
        self.n_cluster
    }

    fn cluster(&self, y : &DMatrix<f64>, rng : &mut StdRng) -> Result<Partition, ClusterError> {
        let n = y.nrows();
        if n == 0 || y.ncols() == 0 {
            return Err(ClusterError::EmptyInput);
        }
        if self.n_cluster == 0 || self.n_cluster > n {
            return Err(ClusterError::InvalidClusterCount { requested : self.n_cluster, n_items : n });
        }

        let sample : Vec<DVector<f64>> = y.row_iter().map(|row| row.transpose() ).collect();

        let mut allocations = match &self.allocations {
            Some(allocs) if valid_allocations(&allocs[..], self.n_cluster, n) => allocs.clone(),
            _ => seed_allocations(self.n_cluster, &sample[..], rng)
        };

        let mut means : Vec<DVector<f64>> = (0..self.n_cluster)
            .map(|_| DVector::zeros(y.ncols()) )
            .collect();

        let mut n_iter = 0;
        for _ in 0..self.max_iter {
            n_iter += 1;
            update_means(&mut means[..], &sample[..], &allocations[..]);
            let n_reallocated = update_allocations(&mut allocations[..], &means[..], &sample[..]);
            tracing::trace!(iteration = n_iter, n_reallocated, "k-means step");
            if n_reallocated == 0 {
                break;
            }
        }

        Ok(Partition::new(means, allocations, n_iter))
    }

}

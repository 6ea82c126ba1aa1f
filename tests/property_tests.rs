use gaussmix::fit::em::{expectation_step, maximization_step};
use gaussmix::{Clustering, KMeans, MixtureParams, matrix_from_rows};
use nalgebra::{DMatrix, DVector};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

proptest! {
    #[test]
    fn prop_responsibility_rows_sum_to_one(
        data in prop::collection::vec(prop::collection::vec(-10.0f64..10.0, 2), 1..30),
        centers in prop::collection::vec(prop::collection::vec(-10.0f64..10.0, 2), 1..4),
        raw_weights in prop::collection::vec(0.1f64..1.0, 4)
    ) {
        let y = matrix_from_rows(&data[..]).unwrap();
        let k = centers.len();
        let total : f64 = raw_weights[..k].iter().sum();
        let params = MixtureParams::new(
            centers.iter().map(|c| DVector::from_column_slice(c) ).collect(),
            (0..k).map(|_| DMatrix::identity(2, 2) ).collect(),
            DVector::from_iterator(k, raw_weights[..k].iter().map(|w| w / total ))
        ).unwrap();
        let resp = expectation_step(&y, &params).unwrap();
        prop_assert_eq!(resp.shape(), (data.len(), k));
        for row in resp.row_iter() {
            prop_assert!((row.sum() - 1.0).abs() < 1E-9);
            prop_assert!(row.iter().all(|r| *r >= 0.0 && *r <= 1.0 ));
        }
    }

    #[test]
    fn prop_maximization_weights_sum_to_one(
        data in prop::collection::vec(prop::collection::vec(-10.0f64..10.0, 3), 2..30),
        raw_resp in prop::collection::vec(0.01f64..1.0, 90)
    ) {
        let y = matrix_from_rows(&data[..]).unwrap();
        let n = y.nrows();
        let mut resp = DMatrix::from_row_slice(n, 3, &raw_resp[..(3 * n)]);
        for mut row in resp.row_iter_mut() {
            let s = row.sum();
            row.unscale_mut(s);
        }
        let params = maximization_step(&y, &resp).unwrap();
        let w = params.weights();
        prop_assert!(w.iter().all(|w| *w > 0.0 ));
        prop_assert!((w.sum() - 1.0).abs() < 1E-9);
        for cov in params.covariances().iter() {
            prop_assert!((cov - cov.transpose()).abs().max() < 1E-9);
        }
    }

    #[test]
    fn prop_kmeans_all_assigned(
        data in prop::collection::vec(prop::collection::vec(-10.0f64..10.0, 2), 1..20),
        k in 1usize..5
    ) {
        if k <= data.len() {
            let y = matrix_from_rows(&data[..]).unwrap();
            let partition = KMeans::new(k).cluster(&y, &mut StdRng::seed_from_u64(42)).unwrap();
            prop_assert_eq!(partition.allocations().len(), data.len());
            prop_assert_eq!(partition.means().len(), k);
            for l in partition.allocations().iter() {
                prop_assert!(*l < k);
            }
        }
    }
}

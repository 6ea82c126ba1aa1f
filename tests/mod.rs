use nalgebra::*;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use rand_distr::StandardNormal;
use gaussmix::*;
use gaussmix::fit::{self, em};

const EPS : f64 = 1E-9;

/// n observations around each of the informed centers, with identity covariance.
fn separated_data(centers : &[[f64; 2]], n : usize, seed : u64) -> DMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::new();
    for c in centers.iter() {
        for _ in 0..n {
            let z0 : f64 = rng.sample(StandardNormal);
            let z1 : f64 = rng.sample(StandardNormal);
            rows.push(vec![c[0] + z0, c[1] + z1]);
        }
    }
    matrix_from_rows(&rows[..]).unwrap()
}

fn sorted_means(params : &MixtureParams) -> Vec<DVector<f64>> {
    let mut means = params.means().to_vec();
    means.sort_by(|a, b| a[0].partial_cmp(&b[0]).unwrap() );
    means
}

#[test]
fn recovers_separated_components() {
    let y = separated_data(&[[0., 0.], [10., 10.]], 50, 1);
    let mut gmm = GaussianMixture::new(2).with_max_iter(100).with_tol(1E-4).with_seed(42);
    let iter = gmm.fit(&y).unwrap();
    assert!(iter < 100);

    let params = gmm.params().unwrap();
    let means = sorted_means(params);
    assert!((&means[0] - DVector::from_column_slice(&[0., 0.])).abs().max() < 0.5);
    assert!((&means[1] - DVector::from_column_slice(&[10., 10.])).abs().max() < 0.5);
    for w in params.weights().iter() {
        assert!((w - 0.5).abs() < 0.05);
    }
    for cov in params.covariances().iter() {
        assert!((cov - DMatrix::<f64>::identity(2, 2)).abs().max() < 0.6);
    }
}

#[test]
fn converges_above_initial_likelihood() {
    let y = separated_data(&[[0., 0.], [10., 10.]], 50, 2);
    for init in [InitPolicy::KMeans, InitPolicy::Random].iter() {
        let mut gmm = GaussianMixture::new(2).with_init(*init);
        let iter = gmm.fit(&y).unwrap();
        assert!(iter <= 100);
        let trace = gmm.trace();
        assert!(trace.last().unwrap() >= trace.first().unwrap());
        if iter < 100 {
            assert_eq!(gmm.status(), Some(EmStatus::Converged { iteration : iter }));
            let n = trace.len();
            assert!((trace[n - 1] - trace[n - 2]).abs() < 1E-4);
        }
    }
    let mut gmm = GaussianMixture::new(2);
    assert!(gmm.fit(&y).unwrap() < 100);
}

#[test]
fn likelihood_is_monotone() {
    let y = separated_data(&[[0., 0.], [4., 1.], [1., 5.]], 30, 3);
    let mut gmm = GaussianMixture::new(3).with_init(InitPolicy::Random).with_tol(1E-8).with_max_iter(200);
    gmm.fit(&y).unwrap();
    for w in gmm.trace().windows(2) {
        assert!(w[1] >= w[0] - 1E-6, "Log-likelihood decreased: {:?}", w);
    }
}

#[test]
fn weights_form_a_distribution() {
    let y = separated_data(&[[0., 0.], [5., 5.]], 40, 4);
    for k in 1..4 {
        let mut gmm = GaussianMixture::new(k);
        gmm.fit(&y).unwrap();
        let w = gmm.params().unwrap().weights();
        assert_eq!(w.nrows(), k);
        assert!(w.iter().all(|w| *w >= 0.0 ));
        assert!((w.sum() - 1.0).abs() < EPS);
    }
}

#[test]
fn budget_is_respected() {
    let y = separated_data(&[[0., 0.], [3., 3.]], 40, 5);
    let mut gmm = GaussianMixture::new(2).with_init(InitPolicy::Random).with_max_iter(2).with_tol(0.0);
    assert_eq!(gmm.fit(&y).unwrap(), 2);
    assert_eq!(gmm.status(), Some(EmStatus::BudgetExhausted));
    assert_eq!(gmm.trace().len(), 3);
}

#[test]
fn sampled_frequencies_follow_weights() {
    let params = MixtureParams::new(
        vec![DVector::from_column_slice(&[-20., 0.]), DVector::from_column_slice(&[20., 0.])],
        vec![DMatrix::identity(2, 2), DMatrix::identity(2, 2)],
        DVector::from_column_slice(&[0.3, 0.7])
    ).unwrap();
    let y = separated_data(&[[0., 0.]], 10, 6);
    let mut gmm = GaussianMixture::new(2).with_max_iter(0);
    gmm.fit_from(&y, params).unwrap();
    let draws = gmm.sample(4000).unwrap();
    assert_eq!(draws.shape(), (4000, 2));
    let right = draws.column(0).iter().filter(|x| **x > 0.0 ).count() as f64 / 4000.;
    assert!((right - 0.7).abs() < 0.03);

    // Same seed, same draws.
    assert_eq!(gmm.sample(10).unwrap(), gmm.sample(10).unwrap());
}

#[test]
fn duplicated_points_are_degenerate() {
    let y = DMatrix::from_element(6, 2, 1.0);
    let mut gmm = GaussianMixture::new(2);
    let err = gmm.fit(&y).unwrap_err();
    assert!(err.is_degenerate(), "Unexpected error: {}", err);
    assert!(!gmm.is_fitted());
}

#[test]
fn preconditions_and_configuration() {
    let y = separated_data(&[[0., 0.]], 10, 7);
    let gmm = GaussianMixture::new(2);
    assert!(matches!(gmm.sample(5), Err(MixtureError::NotFitted)));
    assert!(matches!(gmm.log_likelihood(&y), Err(MixtureError::NotFitted)));
    assert!(matches!("em".parse::<InitPolicy>(), Err(MixtureError::UnknownInit(_))));
    assert!(matches!(GaussianMixture::new(0).fit(&y), Err(MixtureError::InvalidParameter { .. })));
    assert!(matches!(GaussianMixture::new(11).fit(&y), Err(MixtureError::InvalidParameter { .. })));
    assert!(matches!(GaussianMixture::new(1).fit(&DMatrix::zeros(0, 2)), Err(MixtureError::EmptyInput)));
}

#[test]
fn failed_fit_keeps_previous_parameters() {
    let y = separated_data(&[[0., 0.], [6., 6.]], 20, 8);
    let mut gmm = GaussianMixture::new(2);
    gmm.fit(&y).unwrap();
    let before = gmm.params().cloned();
    assert!(gmm.fit(&DMatrix::from_element(4, 2, 3.0)).is_err());
    assert_eq!(gmm.params().cloned(), before);
}

#[test]
fn random_initialization_is_reproducible() {
    let y = separated_data(&[[0., 0.], [6., 6.]], 20, 14);
    let fit_with_seed = |seed : u64| {
        let mut gmm = GaussianMixture::new(2).with_init(InitPolicy::Random).with_seed(seed);
        let iter = gmm.fit(&y).unwrap();
        (iter, gmm.params().cloned().unwrap(), gmm.trace().to_vec())
    };
    let (iter_a, params_a, trace_a) = fit_with_seed(5);
    let (iter_b, params_b, trace_b) = fit_with_seed(5);
    assert_eq!(iter_a, iter_b);
    assert_eq!(params_a, params_b);
    assert_eq!(trace_a, trace_b);

    // The same generator state yields the same starting point through fit_with_rng.
    let mut gmm = GaussianMixture::new(2).with_init(InitPolicy::Random);
    gmm.fit_with_rng(&y, &mut StdRng::seed_from_u64(5)).unwrap();
    assert_eq!(gmm.params().unwrap(), &params_a);
}

#[test]
fn random_initialization_bounds() {
    let y = separated_data(&[[0., 0.], [8., -3.]], 20, 9);
    let bounds = sample::column_bounds(&y);
    let params = fit::initialize(&y, 4, InitPolicy::Random, 100, &mut StdRng::seed_from_u64(10)).unwrap();
    for mu in params.means().iter() {
        for (v, (lo, hi)) in mu.iter().zip(bounds.iter()) {
            assert!(v >= lo && v <= hi);
        }
    }
    for cov in params.covariances().iter() {
        assert_eq!(cov, &DMatrix::<f64>::identity(2, 2));
    }
    assert!(params.weights().iter().all(|w| (*w - 0.25).abs() < EPS ));
}

#[test]
fn single_iteration_matches_steps() {
    let y = separated_data(&[[0., 0.], [6., 6.]], 20, 11);
    let init = fit::initialize(&y, 2, InitPolicy::Random, 100, &mut StdRng::seed_from_u64(12)).unwrap();
    let resp = em::expectation_step(&y, &init).unwrap();
    let next = em::maximization_step(&y, &resp).unwrap();

    let mut gmm = GaussianMixture::new(2).with_max_iter(1).with_tol(0.0);
    gmm.fit_from(&y, init).unwrap();
    assert_eq!(gmm.params().unwrap(), &next);
    assert!((gmm.log_likelihood(&y).unwrap() - log_likelihood(&y, &next).unwrap()).abs() < EPS);
}

#[test]
fn fitted_model_round_trips_json() {
    let y = separated_data(&[[0., 0.], [6., 6.]], 20, 13);
    let mut gmm = GaussianMixture::new(2);
    gmm.fit(&y).unwrap();
    let json = gmm.to_json().unwrap();
    let loaded = GaussianMixture::from_json(&json).unwrap();
    let (a, b) = (loaded.log_likelihood(&y).unwrap(), gmm.log_likelihood(&y).unwrap());
    assert!((a - b).abs() < 1E-6);
    assert_eq!(loaded.predict(&y).unwrap(), gmm.predict(&y).unwrap());
    assert!(GaussianMixture::from_json(r#"{ "settings" : { "n_cluster" : 0 }, "params" : null, "status" : null, "trace" : [] }"#).is_err());

    // Two means but a single weight: rejected while deserializing, before any evaluation.
    let short_weights = r#"{
        "settings" : { "n_cluster" : 2 },
        "params" : {
            "means" : [[[0.0], 1, null], [[5.0], 1, null]],
            "covariances" : [[[1.0], 1, 1], [[1.0], 1, 1]],
            "weights" : [[1.0], 1, null]
        },
        "status" : null,
        "trace" : []
    }"#;
    assert!(matches!(GaussianMixture::from_json(short_weights), Err(MixtureError::Serde(_))));
}

use super::*;
use windkessel::od::prelude::*;
use windkessel::utils::{is_positive_semi_definite, PSD_TOLERANCE};

#[rstest]
fn ukf_recovers_parameters(reference: SyntheticData, baseline: Baseline) {
    let ukf = UnscentedKF::new(baseline, reference.model, UnscentedConfig::default()).unwrap();
    let estimates = EstimationProcess::new(ukf, &reference.waveform, &reference.measurements)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(estimates.len(), reference.len());
    assert_recovered(&estimates[FIFTH_CYCLE_END], &reference.params, 0.2);
    assert_recovered(estimates.last().unwrap(), &reference.params, 0.2);
    assert!(estimates.iter().all(|e| !e.is_degraded()));
}

#[rstest]
fn ukf_covariances_stay_positive(reference: SyntheticData, baseline: Baseline) {
    let mut ukf = UnscentedKF::new(baseline, reference.model, UnscentedConfig::default()).unwrap();
    for (index, measurement) in reference.measurements.iter().enumerate() {
        ukf.predict(reference.waveform.flow_pair(index).unwrap())
            .unwrap();
        assert!(
            is_positive_semi_definite(ukf.covar(), PSD_TOLERANCE),
            "predicted covariance #{index}"
        );
        let estimate = ukf.update(*measurement).unwrap();
        assert!(estimate.innovation_var > 0.0);
        assert!(
            is_positive_semi_definite(ukf.covar(), PSD_TOLERANCE),
            "posterior covariance #{index}"
        );
    }
}

#[rstest]
#[case(4, 1e-2, 2.0, 0.0)]
#[case(4, 1.0, 2.0, 0.0)]
#[case(3, 0.5, 2.0, 1.0)]
#[case(1, 1e-3, 0.0, 2.0)]
#[case(6, 0.1, 2.0, -3.0)]
fn ukf_weights_are_normalized(
    #[case] n: usize,
    #[case] alpha: f64,
    #[case] beta: f64,
    #[case] kappa: f64,
) {
    let weights = SigmaWeights::new(n, alpha, beta, kappa).unwrap();
    assert_eq!(weights.len(), 2 * n + 1);
    let sum_mean = weights.mean.iter().sum::<f64>();
    let sum_covar = weights.covar.iter().sum::<f64>();
    assert!((sum_mean - 1.0).abs() < 1e-8, "mean weights sum to {sum_mean}");
    // The center covariance weight carries the additional prior-knowledge term.
    let prior_knowledge = 1.0 - alpha.powi(2) + beta;
    assert!(
        (sum_covar - prior_knowledge - 1.0).abs() < 1e-8,
        "covariance weights sum to {sum_covar}"
    );
}

#[rstest]
fn ukf_first_step_uses_zero_flow_derivative(reference: SyntheticData, baseline: Baseline) {
    let config = UnscentedConfig::builder().init_covar([1e-10; 4]).build();
    let mut ukf = UnscentedKF::new(baseline, reference.model, config).unwrap();

    let flow = reference.waveform.flow_pair(0).unwrap();
    assert_eq!(flow.prev, flow.curr);
    let prediction = ukf.predict(flow).unwrap();

    let q0 = reference.waveform.flow[0];
    let ratio = reference.model.step / (baseline.rd * baseline.c);
    let by_hand = 80_000.0 * (1.0 - ratio) + q0 * (baseline.rd + baseline.rp) * ratio;
    assert!(
        (prediction.pressure - by_hand).abs() <= 1e-9 * by_hand,
        "{} != {by_hand}",
        prediction.pressure
    );
}

#[rstest]
fn ukf_without_process_noise(reference: SyntheticData, baseline: Baseline) {
    let config = UnscentedConfig::builder().process_noise([0.0; 4]).build();
    let mut ukf = UnscentedKF::new(baseline, reference.model, config).unwrap();
    let mut previous = ukf.covar().diagonal();
    for (index, measurement) in reference.measurements.iter().enumerate() {
        let estimate = ukf
            .step(reference.waveform.flow_pair(index).unwrap(), *measurement)
            .unwrap();
        for k in 0..3 {
            let before = previous[k + 1];
            let after = estimate.theta_var[k];
            assert!(
                after <= before * (1.0 + 1e-9) + 1e-15,
                "parameter {k} variance grew at #{index}: {before:e} -> {after:e}"
            );
        }
        previous = ukf.covar().diagonal();
    }
}

#[rstest]
fn ukf_is_deterministic(reference: SyntheticData, baseline: Baseline) {
    let run = || {
        let ukf = UnscentedKF::new(baseline, reference.model, UnscentedConfig::default()).unwrap();
        EstimationProcess::new(ukf, &reference.waveform, &reference.measurements)
            .unwrap()
            .take(100)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn unscented_config_yaml() {
    let config = UnscentedConfig::builder().alpha(0.5).kappa(1.0).build();
    let serialized = serde_yaml::to_string(&config).unwrap();
    let deserd: UnscentedConfig = serde_yaml::from_str(&serialized).unwrap();
    assert_eq!(deserd, config);
    assert_eq!(deserd.beta, 2.0);
}

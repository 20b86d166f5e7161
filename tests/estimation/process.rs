use super::*;
use windkessel::od::prelude::*;

fn ukf(data: &SyntheticData, baseline: Baseline) -> UnscentedKF {
    UnscentedKF::new(baseline, data.model, UnscentedConfig::default()).unwrap()
}

#[rstest]
fn process_rejects_mismatched_lengths(reference: SyntheticData, baseline: Baseline) {
    let short = &reference.measurements[..100];
    match EstimationProcess::new(ukf(&reference, baseline), &reference.waveform, short) {
        Err(InputError::LengthMismatch {
            expected, got, ..
        }) => {
            assert_eq!(expected, reference.len());
            assert_eq!(got, 100);
        }
        Err(e) => panic!("unexpected error {e}"),
        Ok(_) => panic!("mismatched lengths were accepted"),
    }
}

#[rstest]
fn process_rejects_inconsistent_steps(reference: SyntheticData, baseline: Baseline) {
    let mut waveform = reference.waveform.clone();
    waveform.time[10] += 0.001;
    assert!(matches!(
        EstimationProcess::new(ukf(&reference, baseline), &waveform, &reference.measurements),
        Err(InputError::NonUniformStep { index: 9, .. })
    ));

    let coarse = SyntheticScenario::builder().step(0.01).build();
    let coarse_model = coarse.model().unwrap();
    let enkf = EnsembleKF::new(
        baseline,
        coarse_model,
        EnsembleConfig::builder()
            .observation_noise(ObservationNoise::Constant { sigma: 1_600.0 })
            .seed(0)
            .build(),
    )
    .unwrap();
    assert!(matches!(
        EstimationProcess::new(enkf, &reference.waveform, &reference.measurements),
        Err(InputError::StepMismatch { .. })
    ));
}

#[rstest]
fn process_is_a_finite_sequence(reference: SyntheticData, baseline: Baseline) {
    let mut process =
        EstimationProcess::new(ukf(&reference, baseline), &reference.waveform, &reference.measurements)
            .unwrap();
    assert_eq!(process.remaining(), reference.len());

    let first = process.next().unwrap().unwrap();
    assert_eq!(first.step, 0);
    assert_eq!(first.kind, FilterKind::Unscented);
    assert_eq!(process.remaining(), reference.len() - 1);

    let rest = process.run().unwrap();
    assert_eq!(rest.len(), reference.len() - 1);
    assert!(rest.iter().enumerate().all(|(k, e)| e.step == k + 1));
    assert!(process.next().is_none());
    assert_eq!(process.kf().steps_completed(), reference.len());
}

#[rstest]
fn process_resumes_from_filter(reference: SyntheticData, baseline: Baseline) {
    let mut filter = ukf(&reference, baseline);
    for index in 0..100 {
        filter
            .step(
                reference.waveform.flow_pair(index).unwrap(),
                reference.measurements[index],
            )
            .unwrap();
    }
    let resumed = EstimationProcess::new(filter, &reference.waveform, &reference.measurements)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(resumed.len(), reference.len() - 100);
    assert_eq!(resumed[0].step, 100);

    // Same as an uninterrupted run.
    let full = EstimationProcess::new(ukf(&reference, baseline), &reference.waveform, &reference.measurements)
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(&full[100..], &resumed[..]);
}

#[rstest]
fn process_stops_at_first_error(reference: SyntheticData, baseline: Baseline) {
    let mut measurements = reference.measurements.clone();
    measurements[10] = -1.0;
    let mut process =
        EstimationProcess::new(ukf(&reference, baseline), &reference.waveform, &measurements)
            .unwrap();
    for _ in 0..10 {
        assert!(process.next().unwrap().is_ok());
    }
    assert!(matches!(
        process.next(),
        Some(Err(EstimationError::Input {
            source: InputError::InvalidMeasurement { step: 10, .. }
        }))
    ));
    assert!(process.next().is_none());
    assert_eq!(process.remaining(), 0);
}

#[rstest]
fn supplied_noise_must_cover_the_run(reference: SyntheticData, baseline: Baseline) {
    let config = EnsembleConfig::builder()
        .observation_noise(ObservationNoise::Supplied {
            sigmas: vec![1_600.0; 20],
        })
        .seed(1)
        .build();
    let enkf = EnsembleKF::new(baseline, reference.model, config).unwrap();

    // Rejected before any step is run.
    match EstimationProcess::new(enkf.clone(), &reference.waveform, &reference.measurements) {
        Err(e) => assert_eq!(
            e,
            InputError::TooFewSamples {
                what: "supplied observation noise",
                need: reference.len(),
                got: 20
            }
        ),
        Ok(_) => panic!("short supplied noise was accepted"),
    }

    // A run over the covered prefix is fine.
    let covered = Waveform::new(
        reference.waveform.time[..20].to_vec(),
        reference.waveform.flow[..20].to_vec(),
    )
    .unwrap();
    let results = EstimationProcess::new(enkf.clone(), &covered, &reference.measurements[..20])
        .unwrap()
        .collect::<Vec<_>>();
    assert_eq!(results.len(), 20);
    assert!(results.iter().all(|r| r.is_ok()));

    // Stepping by hand past the supplied series still fails at that step.
    let mut manual = enkf;
    for k in 0..20 {
        let flow = FlowPair::at(&reference.waveform.flow, k).unwrap();
        manual.step(flow, reference.measurements[k]).unwrap();
    }
    let flow = FlowPair::at(&reference.waveform.flow, 20).unwrap();
    assert_eq!(
        manual.step(flow, reference.measurements[20]),
        Err(EstimationError::Input {
            source: InputError::TooFewSamples {
                what: "supplied observation noise",
                need: 21,
                got: 20
            }
        })
    );
}

#[test]
fn scenario_yaml() {
    let scenario = SyntheticScenario::builder().cycles(4).noise_sigma(800.0).build();
    let serialized = serde_yaml::to_string(&scenario).unwrap();
    let deserd: SyntheticScenario = serde_yaml::from_str(&serialized).unwrap();
    assert_eq!(deserd, scenario);
    assert_eq!(deserd.generate(Some(1)).unwrap().len(), 640);
}

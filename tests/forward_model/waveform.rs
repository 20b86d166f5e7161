use rstest::*;
use windkessel::waveform::GaussianPulse;
use windkessel::{tile_waveform, InputError};

#[fixture]
fn features() -> (Vec<f64>, Vec<f64>) {
    GaussianPulse::default().features(0.8, 0.005).unwrap()
}

#[rstest]
fn single_cycle_is_identity(features: (Vec<f64>, Vec<f64>)) {
    let (time, values) = features;
    let waveform = tile_waveform(&time, &values, 1, 0.8).unwrap();
    assert_eq!(waveform.time, time);
    assert_eq!(waveform.flow, values);
}

#[rstest]
#[case(2)]
#[case(5)]
#[case(10)]
fn tiling_preserves_first_period(features: (Vec<f64>, Vec<f64>), #[case] cycles: usize) {
    let (time, values) = features;
    let waveform = tile_waveform(&time, &values, cycles, 0.8).unwrap();
    assert_eq!(waveform.len(), cycles * values.len());
    assert_eq!(waveform.flow[..values.len()], values[..]);
    assert_eq!(waveform.time[..time.len()], time[..]);
    for (k, t) in waveform.time.iter().enumerate() {
        let n = k / time.len();
        assert_eq!(*t, n as f64 * 0.8 + time[k % time.len()]);
        assert_eq!(waveform.flow[k], values[k % values.len()]);
    }
    assert!((waveform.step().unwrap() - 0.005).abs() < 1e-12);
}

#[test]
fn mismatched_features() {
    assert_eq!(
        tile_waveform(&[0.0, 0.1], &[1.0], 3, 0.2).unwrap_err(),
        InputError::LengthMismatch {
            what: "value features",
            expected: 2,
            got: 1
        }
    );
}

use rstest::*;
use windkessel::dynamics::{Baseline, WindkesselParams};
use windkessel::od::estimate::StepEstimate;
use windkessel::od::simulator::SyntheticData;

mod enkf;
mod process;
mod ukf;

/// Index of the last measurement of the fifth cycle of the reference experiment.
const FIFTH_CYCLE_END: usize = 799;

#[fixture]
pub fn reference() -> SyntheticData {
    crate::init_logger();
    crate::reference_data()
}

/// Guesses the filters start from, away from the truth.
#[fixture]
pub fn baseline() -> Baseline {
    Baseline::builder()
        .pressure(80_000.0)
        .rp(1_000.0)
        .c(1e-5)
        .rd(12_000.0)
        .build()
}

/// Asserts that each parameter of the estimate lies within `tolerance` of the truth, relatively.
pub fn assert_recovered(estimate: &StepEstimate, truth: &WindkesselParams, tolerance: f64) {
    let params = estimate.params();
    let errors = params.relative_error(truth);
    println!("{estimate}\nrelative errors {errors}");
    for (name, err) in ["Rp", "C", "Rd"].iter().zip(errors.iter()) {
        assert!(
            err.abs() < tolerance,
            "{name} off by {:.1} % ({params} vs {truth})",
            err * 100.0
        );
    }
}

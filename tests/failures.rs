use pkmodel::*;

fn one_compartment() -> Model {
    Model::intravenous(1.0, 1.0).unwrap()
}

#[test]
fn invalid_compartment_is_rejected_without_mutation() {
    let mut model = one_compartment();
    let err = model.add_compartment(-1.0, 3.0).unwrap_err();
    assert!(matches!(err, ConfigurationError::NonPositive { .. }));
    assert!(err.to_string().contains("peripheral[0].volume"));
    assert!(model.peripherals().is_empty());
}

#[test]
fn step_budget_is_enforced() {
    let settings = SolverSettings {
        max_steps: 3,
        ..SolverSettings::default()
    };
    let err = simulate(
        &one_compartment(),
        &Protocol::bolus(100.0).unwrap(),
        &TimeGrid::uniform(100.0, 2),
        &settings,
    )
    .unwrap_err();
    assert!(
        matches!(
            err,
            PkError::Integration(IntegrationError::StepBudgetExceeded { max_steps: 3, .. })
        ),
        "unexpected error: {}",
        err
    );
}

#[test]
fn time_budget_is_enforced() {
    let settings = SolverSettings {
        max_duration: Some(1e-12),
        ..SolverSettings::default()
    };
    let err = simulate(
        &one_compartment(),
        &Protocol::bolus(100.0).unwrap(),
        &TimeGrid::uniform(100.0, 2),
        &settings,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        PkError::Integration(IntegrationError::TimeBudgetExceeded { .. })
    ));
}

#[test]
fn invalid_dose_rate_fails_the_run() {
    let protocol = Protocol::continuous(10.0, |t| if t > 0.5 { f64::NAN } else { 1.0 }).unwrap();
    let err = simulate(
        &one_compartment(),
        &protocol,
        &TimeGrid::uniform(1.0, 11),
        &SolverSettings::default(),
    )
    .unwrap_err();
    match err {
        PkError::Domain(DomainError::InvalidRate { time, .. }) => assert!(time > 0.5),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn invalid_grid_fails_before_integration() {
    let err = simulate(
        &one_compartment(),
        &Protocol::bolus(1.0).unwrap(),
        &TimeGrid::explicit(vec![0.0, 2.0, 1.0]),
        &SolverSettings::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        PkError::Configuration(ConfigurationError::InvalidTimeGrid(_))
    ));
}

#[test]
fn collapsing_step_size_is_reported() {
    // Valid parameters whose rates overflow f64
    let model = Model::intravenous(1e-300, 1e300).unwrap();
    let err = simulate(
        &model,
        &Protocol::bolus(100.0).unwrap(),
        &TimeGrid::uniform(1.0, 11),
        &SolverSettings::default(),
    )
    .unwrap_err();
    assert!(
        matches!(
            err,
            PkError::Integration(IntegrationError::StepSizeTooSmall { .. })
        ),
        "unexpected error: {}",
        err
    );
}

#[test]
fn overflowing_state_fails_the_run() {
    let protocol = Protocol::continuous(0.0, |_t| f64::MAX).unwrap();
    let err = simulate(
        &one_compartment(),
        &protocol,
        &TimeGrid::uniform(1e6, 11),
        &SolverSettings::default(),
    )
    .unwrap_err();
    assert!(
        matches!(
            err,
            PkError::Integration(
                IntegrationError::StepSizeTooSmall { .. } | IntegrationError::NonFiniteState { .. }
            )
        ),
        "unexpected error: {}",
        err
    );
}

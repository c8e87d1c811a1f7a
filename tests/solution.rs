use std::sync::Arc;

use anyhow::Result;
use pkmodel::*;

fn two_compartment() -> Result<Model> {
    Ok(Model::intravenous(1.0, 0.5)?.with_compartment(2.0, 3.0)?)
}

#[test]
fn runs_are_independent() -> Result<()> {
    let grid = TimeGrid::uniform(5.0, 51);
    let iv = Arc::new(two_compartment()?);
    let sc = Arc::new(Model::subcutaneous(1.0, 1.0, 1.5)?);
    let bolus = Arc::new(Protocol::bolus(100.0)?);
    let infusion = Arc::new(Protocol::infusion(0.0, 10.0, 1.0, 2.0)?);

    let mut solution = Solution::new().with_grid(grid.clone());
    let first = solution.add(iv.clone(), bolus.clone())?;
    let second = solution.add(sc.clone(), infusion.clone())?;
    let third = solution.add(iv.clone(), infusion.clone())?;
    assert_eq!(
        [first.index(), second.index(), third.index()],
        [0, 1, 2]
    );

    let settings = SolverSettings::default();
    let runs = solution.get_runs();
    assert_eq!(runs.len(), 3);
    assert_eq!(*runs[0], simulate(&iv, &bolus, &grid, &settings)?);
    assert_eq!(*runs[1], simulate(&sc, &infusion, &grid, &settings)?);
    assert_eq!(*runs[2], simulate(&iv, &infusion, &grid, &settings)?);
    Ok(())
}

#[test]
fn failed_add_leaves_solution_unchanged() -> Result<()> {
    let mut solution = Solution::new().with_solver(SolverSettings {
        max_steps: 2,
        ..SolverSettings::default()
    });
    let err = solution
        .add(two_compartment()?, Protocol::bolus(100.0)?)
        .unwrap_err();
    assert!(matches!(err, PkError::Integration(_)));
    assert!(solution.is_empty());
    Ok(())
}

#[test]
fn parallel_batch_keeps_submission_order() -> Result<()> {
    let protocol = Arc::new(Protocol::bolus(50.0)?);
    let models: Vec<Arc<Model>> = (1..=6)
        .map(|i| Model::intravenous(i as f64, 0.2).map(Arc::new))
        .collect::<Result<_, _>>()?;

    let mut solution = Solution::new().with_grid(TimeGrid::uniform(2.0, 11));
    solution.add(two_compartment()?, protocol.clone())?;
    let handles = solution.add_all(models.iter().map(|m| (m.clone(), protocol.clone())))?;

    assert_eq!(
        handles.iter().map(|h| h.index()).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5, 6]
    );
    for (handle, model) in handles.iter().zip(&models) {
        let run = solution.run(*handle).expect("run exists");
        assert_eq!(run.model(), model.as_ref());
    }
    Ok(())
}

#[test]
fn parallel_batch_is_all_or_nothing() -> Result<()> {
    let good = Arc::new(Protocol::bolus(50.0)?);
    let bad = Arc::new(Protocol::continuous(0.0, |t| if t > 0.1 { -1.0 } else { 0.0 })?);
    let model = Arc::new(two_compartment()?);

    let mut solution = Solution::new();
    let err = solution
        .add_all(vec![
            (model.clone(), good.clone()),
            (model.clone(), bad),
            (model.clone(), good),
        ])
        .unwrap_err();

    match err {
        PkError::Run { index, label, source } => {
            assert_eq!(index, 1);
            assert_eq!(label, "iv, 2 compartments");
            assert!(matches!(*source, PkError::Domain(DomainError::InvalidRate { .. })));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(solution.is_empty());
    Ok(())
}

#[test]
fn presentation_has_one_series_per_run() -> Result<()> {
    let mut solution = Solution::new().with_grid(TimeGrid::uniform(1.0, 5));
    solution.add(two_compartment()?, Protocol::bolus(10.0)?)?;
    solution.add(Model::subcutaneous(1.0, 1.0, 1.0)?, Protocol::bolus(10.0)?)?;

    let presentation = solution.presentation(Layout::SideBySide);
    assert_eq!(presentation.layout, Layout::SideBySide);
    assert_eq!(presentation.series.len(), 2);

    let first = &presentation.series[0];
    assert_eq!(first.label, "iv, 2 compartments");
    assert_eq!(first.time_grid, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    let names: Vec<&str> = first
        .compartment_trajectories
        .iter()
        .map(|t| t.name.as_str())
        .collect();
    assert_eq!(names, vec!["central", "peripheral 1"]);
    assert_eq!(first.compartment_trajectories[0].values[0], 10.0);

    // The absorption depot is not a compartment
    let second = &presentation.series[1];
    assert_eq!(second.label, "subcutaneous, 1 compartment");
    assert_eq!(second.compartment_trajectories.len(), 1);
    assert_eq!(second.compartment_trajectories[0].values[0], 0.0);

    let json: serde_json::Value = serde_json::from_str(&presentation.to_json()?)?;
    assert_eq!(json["layout"], "side_by_side");
    assert_eq!(json["series"][0]["time_grid"].as_array().unwrap().len(), 5);
    Ok(())
}

#[test]
fn runs_can_be_aligned_on_a_common_grid() -> Result<()> {
    let model = Arc::new(two_compartment()?);
    let protocol = Arc::new(Protocol::bolus(10.0)?);

    let mut solution = Solution::new();
    solution.add_with_grid(model.clone(), protocol.clone(), &TimeGrid::uniform(4.0, 401))?;
    solution.add_with_grid(model.clone(), protocol.clone(), &TimeGrid::uniform(2.0, 201))?;

    let aligned = solution.aligned(&TimeGrid::uniform(2.0, 5))?;
    assert_eq!(aligned.len(), 2);
    for (a, b) in aligned[0].central().iter().zip(aligned[1].central().iter()) {
        assert!((a - b).abs() < 1e-4);
    }

    let err = solution.aligned(&TimeGrid::uniform(3.0, 4)).unwrap_err();
    assert!(matches!(
        err,
        PkError::Comparison(ComparisonError::OutOfRange { run: 1, .. })
    ));

    let presentation = solution.aligned_presentation(Layout::Overlay, &TimeGrid::uniform(2.0, 3))?;
    assert!(presentation
        .series
        .iter()
        .all(|s| s.time_grid == vec![0.0, 1.0, 2.0]));
    Ok(())
}

#[test]
fn empty_solution_cannot_be_aligned() {
    let err = Solution::new().aligned(&TimeGrid::default()).unwrap_err();
    assert!(matches!(err, PkError::Comparison(ComparisonError::Empty)));
}

#[test]
fn solution_uses_settings() -> Result<()> {
    let settings = Settings::from_toml(
        r#"
        [grid]
        uniform = { horizon = 6.0, samples = 7 }
        "#,
    )?;
    let mut solution = Solution::from_settings(&settings);
    let handle = solution.add(two_compartment()?, Protocol::bolus(1.0)?)?;
    let run = solution.run(handle).expect("run exists");
    assert_eq!(run.result().times(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    Ok(())
}

#[test]
fn removing_a_run_keeps_the_others() -> Result<()> {
    let protocol = Arc::new(Protocol::bolus(10.0)?);
    let mut solution = Solution::new().with_grid(TimeGrid::uniform(1.0, 3));
    let first = solution.add(Model::intravenous(1.0, 1.0)?, protocol.clone())?;
    let middle = solution.add(two_compartment()?, protocol.clone())?;
    let last = solution.add(Model::subcutaneous(1.0, 1.0, 2.0)?, protocol.clone())?;
    let expected_last = solution.run(last).expect("run exists").result().clone();

    let removed = solution.remove(middle).expect("run exists");
    assert_eq!(removed.label(), "iv, 2 compartments");
    assert_eq!(removed.handle(), middle);
    assert!(solution.remove(middle).is_none());
    assert!(solution.run(middle).is_none());

    let labels: Vec<String> = solution.runs().iter().map(Run::label).collect();
    assert_eq!(labels, vec!["iv, 1 compartment", "subcutaneous, 1 compartment"]);
    assert_eq!(solution.get_runs().len(), 2);
    assert_eq!(solution.run(first).expect("run exists").handle(), first);
    assert_eq!(solution.run(last).expect("run exists").result(), &expected_last);

    // Handles are not reused after a removal
    let next = solution.add(Model::intravenous(2.0, 1.0)?, protocol)?;
    assert_eq!(next.index(), 3);
    assert_eq!(solution.len(), 3);
    Ok(())
}

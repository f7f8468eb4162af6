mod common;

use anyhow::Result;
use common::{write_dataset, Event, MockFactory};
use monkey_seg::{
    AnnotatedDataset, ApScore, CycleOptions, HyperParams, TrainEvalCycle, Undefined,
};
use noisy_float::prelude::*;

fn hyper(min_confidence: f64) -> HyperParams {
    HyperParams {
        learning_rate: r64(1e-3),
        image_dim: 64,
        detection_nms_threshold: r64(0.3),
        detection_min_confidence: r64(min_confidence),
    }
}

#[test]
fn empty_test_set_skips_training() -> Result<()> {
    let fixture = write_dataset(&[("a.png", vec![(1, 1, 5)]), ("b.png", vec![])])?;
    let train = AnnotatedDataset::load(&fixture.layout, &["a.png"])?;
    let test = AnnotatedDataset::load(&fixture.layout, &["b.png"])?;
    assert!(test.is_empty());

    let cycle = TrainEvalCycle::new(CycleOptions::default())?;
    let mut factory = MockFactory::new();
    let score = cycle.run(&mut factory, &train, &train, &test, &hyper(0.5))?;

    assert_eq!(score, ApScore::Undefined(Undefined::EmptyTestSet));
    assert!(factory.events().is_empty());
    Ok(())
}

#[test]
fn cycle_scores_test_images() -> Result<()> {
    let fixture = write_dataset(&[
        ("a.png", vec![(1, 1, 5)]),
        ("b.png", vec![(4, 4, 8)]),
        ("c.png", vec![(0, 6, 3)]),
    ])?;
    let train = AnnotatedDataset::load(&fixture.layout, &["a.png"])?;
    let val = AnnotatedDataset::load(&fixture.layout, &["b.png"])?;
    let test = AnnotatedDataset::load(&fixture.layout, &["b.png", "c.png"])?;

    let cycle = TrainEvalCycle::new(CycleOptions::default())?;

    let mut factory = MockFactory::new();
    let score = cycle.run(&mut factory, &train, &val, &test, &hyper(0.5))?;
    assert_eq!(score, ApScore::Defined(r64(1.0)));

    // no pretrained weights are configured
    let events = factory.events();
    assert!(matches!(events[1], Event::Train { .. }));
    let num_detects = events
        .iter()
        .filter(|event| **event == Event::Detect { size: (64, 64) })
        .count();
    assert_eq!(num_detects, 2);

    let mut factory = MockFactory::new();
    let score = cycle.run(&mut factory, &train, &val, &test, &hyper(0.95))?;
    assert_eq!(score, ApScore::Defined(r64(0.0)));
    Ok(())
}

#[test]
fn test_image_without_visible_instance_is_undefined() -> Result<()> {
    // the region lies beyond the 16x16 image
    let fixture = write_dataset(&[("a.png", vec![(1, 1, 5)]), ("b.png", vec![(40, 40, 3)])])?;
    let train = AnnotatedDataset::load(&fixture.layout, &["a.png"])?;
    let test = AnnotatedDataset::load(&fixture.layout, &["a.png", "b.png"])?;
    assert_eq!(test.len(), 2);

    let cycle = TrainEvalCycle::new(CycleOptions::default())?;
    let mut factory = MockFactory::new();
    let score = cycle.run(&mut factory, &train, &train, &test, &hyper(0.5))?;
    assert_eq!(score, ApScore::Undefined(Undefined::NoGroundTruth));
    Ok(())
}

#[test]
fn training_failure_is_an_error() -> Result<()> {
    let fixture = write_dataset(&[("a.png", vec![(1, 1, 5)])])?;
    let dataset = AnnotatedDataset::load(&fixture.layout, &["a.png"])?;

    let cycle = TrainEvalCycle::new(CycleOptions::default())?;
    let mut factory = MockFactory {
        failing_dims: vec![64],
        ..MockFactory::new()
    };
    assert!(cycle
        .run(&mut factory, &dataset, &dataset, &dataset, &hyper(0.5))
        .is_err());
    Ok(())
}

#[test]
fn invalid_cycle_options() {
    let options = CycleOptions {
        fine_tune_lr_divisor: r64(0.0),
        ..CycleOptions::default()
    };
    assert!(TrainEvalCycle::new(options).is_err());

    let options = CycleOptions {
        iou_threshold: r64(1.5),
        ..CycleOptions::default()
    };
    assert!(TrainEvalCycle::new(options).is_err());
}

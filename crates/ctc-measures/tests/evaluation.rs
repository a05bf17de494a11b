mod common;

use approx::assert_relative_eq;
use common::{dividing_frames, dividing_tracks, tracks, Sequence};
use ctc_measures::tracking::{ViolationCategory, ViolationKind};
use ctc_measures::{
    calculate, check_consistency, evaluate, Aogm, BranchingCorrectness, CompleteTracks, Dataset, Det,
    ErrorCategory, EvalError, EvaluationCache, EvaluationConfig, EvaluationOptions,
    EvaluationReport, InconsistencyPolicy, Measure, MeasureReport, MeasureSpec, PenaltyConfig, Seg,
    SequencePair, Tra,
};

fn ctc_weights() -> [f64; 6] {
    PenaltyConfig::ctc().to_array()
}

#[test]
fn identical_sequence_scores_perfectly_everywhere() {
    let seq = Sequence::identical(&dividing_frames(), &dividing_tracks());

    let calc = calculate(&seq.gt, &seq.res, 3, ctc_weights(), &EvaluationOptions::default())
        .unwrap();
    assert_eq!(calc.aogm, 0.0);
    assert_eq!(calc.tra, Some(1.0));
    assert!(calc.consistency.is_none());

    let mut config = EvaluationConfig::new(&seq.gt, &seq.res);
    config.measures = vec![
        MeasureSpec::Tra,
        MeasureSpec::Det,
        MeasureSpec::Seg,
        MeasureSpec::Ct,
        MeasureSpec::Tf,
        MeasureSpec::Bc { i: 1 },
    ];
    let report = evaluate(&config).unwrap();
    let names: Vec<&str> = report.outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, ["TRA", "DET", "SEG", "CT", "TF", "BC(1)"]);
    for o in &report.outcomes {
        assert_relative_eq!(o.value, 1.0);
    }
}

#[test]
fn missed_division_is_one_missing_edge() {
    let res_tracks = tracks(&[(1, 0, 0, 2), (2, 1, 3, 4), (3, 0, 3, 4)]);
    let seq = Sequence::write(&dividing_frames(), &dividing_tracks(), &dividing_frames(), &res_tracks);

    let calc = calculate(&seq.gt, &seq.res, 3, ctc_weights(), &EvaluationOptions::default())
        .unwrap();
    assert_relative_eq!(calc.aogm, PenaltyConfig::ctc().missing_edge);
    let report = calc.report.unwrap();
    assert!(report.contains("Edges To Be Added"), "{report}");
    assert!(report.contains("[T=2 Label=1] -> [T=3 Label=3]"), "{report}");
}

#[test]
fn empty_result_frame_stops_or_is_reported() {
    let frames = vec![vec![(0, 1)]; 3];
    let res = vec![vec![(0, 1)], Vec::new(), vec![(0, 1)]];
    let t = tracks(&[(1, 0, 0, 2)]);
    let seq = Sequence::write(&frames, &t, &res, &t);

    let mut options = EvaluationOptions {
        stop_on_empty_images: true,
        ..EvaluationOptions::default()
    };
    let err = calculate(&seq.gt, &seq.res, 3, ctc_weights(), &options).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Consistency);
    let EvalError::Inconsistent(report) = err else {
        panic!("expected a consistency error, got {err}");
    };
    let empty: Vec<_> = report
        .violations
        .iter()
        .filter(|v| v.category() == ViolationCategory::EmptyImage)
        .collect();
    assert_eq!(empty.len(), 1);
    assert_eq!(empty[0].dataset, Dataset::Result);
    assert_eq!(empty[0].kind, ViolationKind::EmptyImage { frame: 1 });

    options.inconsistency_policy = InconsistencyPolicy::Report;
    let calc = calculate(&seq.gt, &seq.res, 3, ctc_weights(), &options).unwrap();
    assert!(calc.aogm > 0.0);
    assert!(calc.consistency.is_some_and(|c| c.count(ViolationCategory::EmptyImage) == 1));

    // DET carries no track metadata but still honours the empty-image gate
    let pair = SequencePair::new(&seq.gt, &seq.res, 3).with_options(EvaluationOptions {
        stop_on_empty_images: true,
        ..EvaluationOptions::default()
    });
    let err = Det::default()
        .compute(&pair, &mut EvaluationCache::new())
        .unwrap_err();
    assert!(matches!(err, EvalError::Inconsistent(_)));
}

#[test]
fn measures_share_the_classified_frames() {
    let seq = Sequence::identical(&dividing_frames(), &dividing_tracks());
    let pair = SequencePair::new(&seq.gt, &seq.res, 3);

    let mut cache = EvaluationCache::new();
    let tra = Tra::default().compute(&pair, &mut cache).unwrap();
    assert_eq!(tra.value, 1.0);
    assert!(cache.tracking().is_some_and(|t| t.has_tracks()));
    Seg.compute(&pair, &mut cache).unwrap();
    assert_eq!(cache.segmentation().map(<[_]>::len), Some(5));

    // everything needed is cached, the images are no longer read
    seq.remove_images();
    let det = Det::default().compute(&pair, &mut cache).unwrap();
    assert_eq!(det.value, 1.0);
    let seg = Seg.compute(&pair, &mut cache).unwrap();
    assert_eq!(seg.value, 1.0);

    // other inputs invalidate the cache
    let other = SequencePair::new(&seq.gt, &seq.gt, 3);
    assert!(Det::default().compute(&other, &mut cache).is_err());
}

#[test]
fn failing_measure_leaves_the_others_in_the_report() {
    let frames = vec![vec![(0, 1)]; 3];
    let seq = Sequence::identical(&frames, &tracks(&[(1, 0, 0, 2)]));
    let mut config = EvaluationConfig::new(&seq.gt, &seq.res);
    config.measures = vec![
        MeasureSpec::Ct,
        MeasureSpec::Bc { i: 1 },
        MeasureSpec::Tf,
        MeasureSpec::Cca,
    ];

    let report = evaluate(&config).unwrap();
    assert_eq!(report.value("CT"), Some(1.0));
    assert_eq!(report.value("TF"), Some(1.0));
    assert!(!report.is_complete());
    let names: Vec<&str> = report.failures.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["BC(1)", "CCA"]);
    let bc = report.failure("BC(1)").unwrap();
    assert_eq!(bc.category, ErrorCategory::ComputationPrecondition);
    assert!(bc.error.contains("division"), "{}", bc.error);

    // a failed measure keeps the classified frames for the next one
    let pair = SequencePair::new(&seq.gt, &seq.res, 3);
    let mut cache = EvaluationCache::new();
    assert!(BranchingCorrectness::default()
        .compute(&pair, &mut cache)
        .is_err());
    assert!(cache.tracking().is_some_and(|t| t.has_tracks()));
    seq.remove_images();
    let ct = CompleteTracks.compute(&pair, &mut cache).unwrap();
    assert_eq!(ct.value, 1.0);
}

#[test]
fn timepoint_restriction_limits_det_and_seg() {
    let gt = vec![vec![(0, 1), (1, 2)]; 2];
    let res = vec![vec![(0, 1)], vec![(0, 1), (1, 2)]];
    let gt_tracks = tracks(&[(1, 0, 0, 1), (2, 0, 0, 1)]);
    let res_tracks = tracks(&[(1, 0, 0, 1), (2, 0, 1, 1)]);
    let seq = Sequence::write(&gt, &gt_tracks, &res, &res_tracks);

    let pair = SequencePair::new(&seq.gt, &seq.res, 3);
    let full = Det::default().compute(&pair, &mut EvaluationCache::new()).unwrap();
    assert_relative_eq!(full.value, 0.75);

    let restricted =
        pair.clone()
            .with_options(EvaluationOptions::default().with_timepoints("1").unwrap());
    let mut cache = EvaluationCache::new();
    let det = Det::default().compute(&restricted, &mut cache).unwrap();
    assert_eq!(det.value, 1.0);
    assert!(cache.tracking().is_none());

    let seg = Seg.compute(&restricted, &mut cache).unwrap();
    assert_eq!(seg.value, 1.0);
    let Some(MeasureReport::Seg(result)) = seg.report else {
        panic!("SEG attaches its report");
    };
    assert_eq!(result.gt_objects, 2);
    assert!(cache.segmentation().is_none());

    // TRA ignores the restriction
    let tra = Tra::default().compute(&restricted, &mut cache).unwrap();
    assert!(tra.value < 1.0);
}

#[test]
fn missing_inputs_are_precondition_errors() {
    let seq = Sequence::identical(&dividing_frames(), &dividing_tracks());
    std::fs::remove_file(seq.res.join("res_track.txt")).unwrap();
    let err = calculate(&seq.gt, &seq.res, 3, ctc_weights(), &EvaluationOptions::default())
        .unwrap_err();
    assert!(matches!(err, EvalError::MissingTrackFile(_)));
    assert_eq!(err.category(), ErrorCategory::ComputationPrecondition);

    let err = calculate(&seq.gt, &seq.res, 4, ctc_weights(), &EvaluationOptions::default())
        .unwrap_err();
    assert!(matches!(err, EvalError::NoFrames(_)));

    let mut weights = ctc_weights();
    weights[2] = -1.0;
    let err = calculate(&seq.gt, &seq.res, 3, weights, &EvaluationOptions::default()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InputFormat);
}

#[test]
fn hand_built_weights_are_validated() {
    let seq = Sequence::identical(&dividing_frames(), &dividing_tracks());
    let pair = SequencePair::new(&seq.gt, &seq.res, 3);
    let negative = PenaltyConfig {
        wrong_semantics_edge: -2.0,
        ..PenaltyConfig::ctc()
    };

    let mut cache = EvaluationCache::new();
    let err = Aogm::new(negative).compute(&pair, &mut cache).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InputFormat);
    // rejected before any frame was read
    assert!(cache.tracking().is_none());

    let det = Det {
        penalty: PenaltyConfig {
            fp_vertex: f64::NAN,
            ..PenaltyConfig::det()
        },
    };
    let err = det.compute(&pair, &mut cache).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InputFormat);
}

#[test]
fn single_directory_consistency_check() {
    let res_tracks = tracks(&[(1, 0, 0, 2), (2, 7, 3, 4), (3, 1, 3, 4)]);
    let seq = Sequence::write(&dividing_frames(), &dividing_tracks(), &dividing_frames(), &res_tracks);

    let gt = check_consistency(&seq.gt, 3).unwrap();
    assert_eq!(gt.dataset, Dataset::GroundTruth);
    assert!(gt.consistent, "{:?}", gt.violations);

    let res = check_consistency(&seq.res, 3).unwrap();
    assert_eq!(res.dataset, Dataset::Result);
    assert!(!res.consistent);
    assert!(res
        .violations
        .iter()
        .any(|v| v.kind == ViolationKind::MissingParent { parent: 7 }));
}

#[test]
fn report_is_written_and_read_back() {
    let seq = Sequence::identical(&dividing_frames(), &dividing_tracks());
    let out = tempfile::tempdir().unwrap();
    let mut config = EvaluationConfig::new(&seq.gt, &seq.res);
    config.measures = vec![MeasureSpec::Aogm, MeasureSpec::Det];
    config.report_path = Some(out.path().join("report.json"));

    let report = evaluate(&config).unwrap();
    let back = EvaluationReport::load_json(out.path().join("report.json")).unwrap();
    assert_eq!(back, report);
    assert_eq!(back.value("AOGM"), Some(0.0));
    assert!(matches!(
        back.outcomes[1].report,
        Some(MeasureReport::Det(_))
    ));
}

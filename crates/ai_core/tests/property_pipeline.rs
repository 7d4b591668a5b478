use coach_ai_core::encoders::Encoded;
use coach_ai_core::scalers::StandardScaler;
use coach_ai_core::{
    clean_text, ordinal_level, CategoricalEncoder, FeatureAssembler, PipelineConfig,
    PreprocessingArtifacts, Record,
};
use once_cell::sync::Lazy;
use proptest::prelude::*;

static ASSEMBLER: Lazy<FeatureAssembler> = Lazy::new(|| {
    let rows = [
        ("Solve the linear equation for x", "x equals three", "math", 4.0, 120.0),
        ("Solve the quadratic equation by factoring", "two real roots", "math", 4.5, 300.0),
        ("How does photosynthesis use light energy", "plants store energy", "science", 3.5, 80.0),
        ("Where does light energy come from", "the sun provides light", "science", 5.0, 40.0),
    ];
    let records: Vec<Record> = rows
        .iter()
        .map(|(q, a, s, r, v)| Record {
            question: Some(q.to_string()),
            answer: Some(a.to_string()),
            subject: Some(s.to_string()),
            rating: Some(*r),
            views: Some(*v),
            ..Default::default()
        })
        .collect();
    let artifacts = PreprocessingArtifacts::fit(&records, &PipelineConfig::default())
        .expect("fixture corpus fits");
    FeatureAssembler::from_artifacts(artifacts)
});

fn arbitrary_record() -> impl Strategy<Value = Record> {
    (
        proptest::option::of(".{0,80}"),
        proptest::option::of(".{0,80}"),
        proptest::option::of("[a-z]{0,10}"),
        proptest::option::of("[a-z]{0,10}"),
        proptest::option::of(-1.0e6f64..1.0e6),
        proptest::option::of(0.0f64..1.0e7),
    )
        .prop_map(|(question, answer, subject, source, rating, views)| Record {
            question,
            answer,
            subject,
            source,
            rating,
            views,
            ..Default::default()
        })
}

proptest! {
    #[test]
    fn assembled_vector_matches_schema_length(record in arbitrary_record()) {
        let assembled = ASSEMBLER.assemble(&record);
        prop_assert_eq!(assembled.values.len(), ASSEMBLER.schema().len());
        prop_assert!(assembled.missing.is_empty());
        prop_assert!(assembled.values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn assembly_is_deterministic(record in arbitrary_record()) {
        let first = ASSEMBLER.assemble(&record);
        let second = ASSEMBLER.assemble(&record);
        let first_bits: Vec<u64> = first.values.iter().map(|v| v.to_bits()).collect();
        let second_bits: Vec<u64> = second.values.iter().map(|v| v.to_bits()).collect();
        prop_assert_eq!(first_bits, second_bits);
    }

    #[test]
    fn scaler_is_monotonic_and_centered(
        values in prop::collection::vec(-1.0e3f64..1.0e3, 2..50),
        a in -1.0e4f64..1.0e4,
        b in -1.0e4f64..1.0e4,
    ) {
        let scaler = StandardScaler::fit(&values).unwrap();
        prop_assert!(scaler.transform(scaler.mean).abs() < 1e-9);
        if a <= b {
            prop_assert!(scaler.transform(a) <= scaler.transform(b));
        }
    }

    #[test]
    fn unseen_categories_never_reuse_codes(
        fitted in prop::collection::btree_set("[a-m]{1,6}", 1..10),
        unseen in prop::collection::vec("[n-z]{1,6}", 1..10),
        limit in 0usize..6,
    ) {
        let mut encoder = CategoricalEncoder::fit(&fitted).unwrap();
        encoder.set_extension_limit(limit);
        let mut assigned: Vec<u32> = fitted.iter().filter_map(|v| encoder.fitted_code(v)).collect();

        for value in &unseen {
            match encoder.encode(value) {
                Encoded::Extended(code) => {
                    prop_assert!(!assigned.contains(&code));
                    assigned.push(code);
                }
                Encoded::Known(code) => prop_assert!(assigned.contains(&code)),
                Encoded::Overflow(code) => {
                    prop_assert_eq!(code, encoder.overflow_code());
                    prop_assert!(!assigned.contains(&code));
                }
            }
        }
        prop_assert!(encoder.extension_count() <= limit);
    }

    #[test]
    fn normalization_is_idempotent(text in ".{0,120}") {
        let once = clean_text(Some(&text));
        prop_assert_eq!(clean_text(Some(&once)), once.clone());
    }

    #[test]
    fn ordinal_level_is_bounded(label in ".{0,20}") {
        prop_assert!(ordinal_level(&label) <= 2);
    }
}

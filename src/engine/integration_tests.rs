// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::OrderingMode;
use crate::engine::{evaluate_key, EvaluationPlan, KeyOutcome, SequentialExecutor, WorkerPoolExecutor};
use crate::errors::{EvaluationError, FailurePolicy};
use crate::io::{InMemorySource, MemorySink, SourceCatalog};
use crate::recipe::{Recipe, RecipeBuilder};
use crate::registry::{
    ArchitectureSchema, ExtensionRegistry, HyperValue, MergeContext, MergeMethodSpec, MethodOutput,
};
use crate::resolver::KeyResolver;
use crate::tensor::Tensor;
use crate::traits::KeyExecutor;

/// Integration tests driving both executors over in-memory sources
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use crate::errors::SourceError;
    use crate::traits::TensorSource;

    /// Counts every tensor fetched from the wrapped source.
    struct CountingSource {
        inner: InMemorySource,
        gets: Arc<AtomicUsize>,
    }

    impl TensorSource for CountingSource {
        fn id(&self) -> &str {
            self.inner.id()
        }

        fn list_keys(&self) -> Result<BTreeSet<String>, SourceError> {
            self.inner.list_keys()
        }

        fn get(&self, key: &str) -> Result<Option<Tensor>, SourceError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(key)
        }
    }

    fn builder_with(extra: Vec<MergeMethodSpec>) -> RecipeBuilder {
        let mut registry = ExtensionRegistry::with_builtins().unwrap();
        for spec in extra {
            registry.register_method(spec).unwrap();
        }
        registry
            .register_architecture(ArchitectureSchema::new(
                "tiny",
                ["a.weight", "b.weight", "c.weight"],
            ))
            .unwrap();
        registry
            .register_architecture(ArchitectureSchema::new(
                "blocks",
                ["model.encoder.weight", "model.decoder.weight", "model.head.bias"],
            ))
            .unwrap();
        RecipeBuilder::new(registry.freeze())
    }

    fn builder() -> RecipeBuilder {
        builder_with(Vec::new())
    }

    fn numbered_source(id: &str, count: usize, offset: f32) -> InMemorySource {
        let mut source = InMemorySource::new(id);
        for i in 0..count {
            source.insert(
                &format!("k{:03}", i),
                Tensor::from_vec(vec![i as f32 + offset, -(i as f32), offset]),
            );
        }
        source
    }

    fn two_model_catalog() -> SourceCatalog {
        SourceCatalog::new()
            .with_source(
                InMemorySource::new("base")
                    .with_tensor("a.weight", Tensor::from_vec(vec![1.0, 1.0]))
                    .with_tensor("b.weight", Tensor::from_vec(vec![2.0, 2.0]))
                    .with_tensor("c.weight", Tensor::from_vec(vec![3.0, 3.0])),
            )
            .with_source(
                InMemorySource::new("tuned")
                    .with_tensor("a.weight", Tensor::from_vec(vec![3.0, 3.0]))
                    .with_tensor("b.weight", Tensor::from_vec(vec![4.0, 4.0])),
            )
    }

    fn plan(recipe: &Recipe, catalog: &SourceCatalog) -> Arc<EvaluationPlan> {
        Arc::new(
            EvaluationPlan::build(
                recipe,
                catalog,
                &KeyResolver::default(),
                OrderingMode::Declared,
            )
            .unwrap(),
        )
    }

    fn weighted(builder: &RecipeBuilder) -> Recipe {
        let root = builder
            .merge(
                "weighted_sum",
                vec![builder.leaf("base"), builder.leaf("tuned")],
                &[("alpha", HyperValue::Float(0.5))],
            )
            .unwrap();
        builder.build(root)
    }

    #[tokio::test]
    async fn test_weighted_sum_over_two_sources() {
        let builder = builder();
        let plan = plan(&weighted(&builder), &two_model_catalog());
        let mut sink = MemorySink::new();

        let report = WorkerPoolExecutor::new(2)
            .execute(plan, &mut sink, FailurePolicy::CollectAndContinue)
            .await
            .unwrap();

        assert_eq!(sink.keys(), vec!["a.weight", "b.weight"]);
        assert_eq!(sink.get("a.weight").unwrap().data(), &[2.0, 2.0]);
        assert_eq!(sink.get("b.weight").unwrap().data(), &[3.0, 3.0]);
        assert!(sink.status().unwrap().is_complete());

        // c.weight only exists in one model
        assert_eq!(report.total_keys, 3);
        assert_eq!(report.succeeded, 2);
        let failure = report.failure("c.weight").unwrap();
        assert_eq!(failure.kind, "missing_key");
        assert!(failure.message.contains("source 'tuned'"));
    }

    #[tokio::test]
    async fn test_missing_key_does_not_affect_other_keys() {
        let builder = builder();
        let plan = plan(&weighted(&builder), &two_model_catalog());
        let mut sink = MemorySink::new();

        let report = SequentialExecutor::new()
            .execute(plan, &mut sink, FailurePolicy::CollectAndContinue)
            .await
            .unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(sink.len(), 2);
        assert!(report.status.is_complete());
    }

    #[tokio::test]
    async fn test_shared_node_evaluated_once_per_key() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let counted = MergeMethodSpec::new("counted", 1, move |ctx: &MergeContext<'_>| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(MethodOutput::Tensor(ctx.input(0)?.clone()))
        });
        let builder = builder_with(vec![counted]);

        let shared = builder
            .merge("counted", vec![builder.leaf("base")], &[])
            .unwrap();
        let root = builder
            .merge("weighted_sum", vec![shared.clone(), shared], &[])
            .unwrap();
        let recipe = builder.build(root);
        let catalog = SourceCatalog::new().with_source(numbered_source("base", 10, 0.0));
        let mut sink = MemorySink::new();

        WorkerPoolExecutor::new(3)
            .execute(plan(&recipe, &catalog), &mut sink, FailurePolicy::CollectAndContinue)
            .await
            .unwrap();

        assert_eq!(sink.len(), 10);
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_leaf_shared_by_two_parents_fetched_once_per_key() {
        let gets = Arc::new(AtomicUsize::new(0));
        let builder = builder();
        let shared = builder.leaf("base");
        let averaged = builder
            .merge("weighted_sum", vec![shared.clone(), builder.leaf("other")], &[])
            .unwrap();
        let delta = builder
            .merge("subtract", vec![shared, builder.leaf("other")], &[])
            .unwrap();
        let root = builder
            .merge(
                "add_difference",
                vec![averaged, delta],
                &[("alpha", HyperValue::Float(0.5))],
            )
            .unwrap();
        let catalog = SourceCatalog::new()
            .with_source(CountingSource {
                inner: numbered_source("base", 7, 0.0),
                gets: Arc::clone(&gets),
            })
            .with_source(numbered_source("other", 7, 1.0));
        let mut sink = MemorySink::new();

        WorkerPoolExecutor::new(3)
            .execute(
                plan(&builder.build(root), &catalog),
                &mut sink,
                FailurePolicy::CollectAndContinue,
            )
            .await
            .unwrap();

        assert_eq!(sink.len(), 7);
        assert_eq!(gets.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_root_tensor_is_moved_out_of_the_frame() {
        let produced = Arc::new(AtomicUsize::new(0));
        let recorder = Arc::clone(&produced);
        let fresh = MergeMethodSpec::new("fresh", 1, move |ctx: &MergeContext<'_>| {
            let tensor = Tensor::from_vec(ctx.input(0)?.data().to_vec());
            recorder.store(tensor.data().as_ptr() as usize, Ordering::SeqCst);
            Ok(MethodOutput::Tensor(tensor))
        });
        let builder = builder_with(vec![fresh]);
        let root = builder
            .merge("fresh", vec![builder.leaf("base")], &[])
            .unwrap();
        let catalog = SourceCatalog::new().with_source(numbered_source("base", 1, 0.0));
        let plan = plan(&builder.build(root), &catalog);

        match evaluate_key(&plan, "k000").unwrap() {
            KeyOutcome::Merged(tensor) => {
                assert_eq!(tensor.data().as_ptr() as usize, produced.load(Ordering::SeqCst));
            }
            other => panic!("expected a merged tensor, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_skipped_keys_are_not_written_or_failed() {
        let builder = builder();
        let merged = weighted(&builder).root().clone();
        let root = builder
            .merge(
                "key_filter",
                vec![merged],
                &[("prefix", HyperValue::from("a."))],
            )
            .unwrap();
        let plan = plan(&builder.build(root), &two_model_catalog());
        let mut sink = MemorySink::new();

        let report = SequentialExecutor::new()
            .execute(plan, &mut sink, FailurePolicy::CollectAndContinue)
            .await
            .unwrap();

        assert_eq!(sink.keys(), vec!["a.weight"]);
        assert_eq!(report.succeeded, 1);
        // c.weight is filtered out, so its missing input never surfaces
        assert_eq!(report.skipped, 2);
        assert!(!report.has_failures());
    }

    #[tokio::test]
    async fn test_skip_propagates_through_parent() {
        let builder = builder();
        let filtered = builder
            .merge(
                "key_filter",
                vec![builder.leaf("base")],
                &[("prefix", HyperValue::from("b."))],
            )
            .unwrap();
        let root = builder
            .merge("weighted_sum", vec![filtered, builder.leaf("base")], &[])
            .unwrap();
        let plan = plan(&builder.build(root), &two_model_catalog());
        let mut sink = MemorySink::new();

        let report = SequentialExecutor::new()
            .execute(plan, &mut sink, FailurePolicy::CollectAndContinue)
            .await
            .unwrap();

        assert_eq!(sink.keys(), vec!["b.weight"]);
        assert_eq!(report.skipped, 2);
        assert!(!report.has_failures());
    }

    #[tokio::test]
    async fn test_abort_on_first_finalizes_incomplete() {
        let builder = builder();
        let plan = plan(&weighted(&builder), &two_model_catalog());
        let mut sink = MemorySink::new();

        let error = WorkerPoolExecutor::new(1)
            .execute(plan, &mut sink, FailurePolicy::AbortOnFirst)
            .await
            .unwrap_err();

        match error {
            EvaluationError::Aborted { key, .. } => assert_eq!(key, "c.weight"),
            other => panic!("expected abort, got {other:?}"),
        }
        assert!(!sink.status().unwrap().is_complete());
        assert_eq!(sink.keys(), vec!["a.weight", "b.weight"]);
    }

    #[tokio::test]
    async fn test_abort_on_first_stops_dispatch() {
        let builder = builder();
        let root = builder
            .merge(
                "weighted_sum",
                vec![builder.leaf("big"), builder.leaf("sparse")],
                &[],
            )
            .unwrap();
        let catalog = SourceCatalog::new()
            .with_source(numbered_source("big", 100, 0.0))
            .with_source(
                InMemorySource::new("sparse").with_tensor("k050", Tensor::from_vec(vec![0.0; 3])),
            );
        let mut sink = MemorySink::new();

        let result = SequentialExecutor::new()
            .execute(plan(&builder.build(root), &catalog), &mut sink, FailurePolicy::AbortOnFirst)
            .await;

        assert!(matches!(result, Err(EvaluationError::Aborted { ref key, .. }) if key == "k000"));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_sequential_cancellation_leaves_prefix() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let canceller = MergeMethodSpec::new("cancel_after", 1, move |ctx: &MergeContext<'_>| {
            if ctx.key == "k005" {
                trigger.cancel();
            }
            Ok(MethodOutput::Tensor(ctx.input(0)?.clone()))
        });
        let builder = builder_with(vec![canceller]);
        let root = builder
            .merge("cancel_after", vec![builder.leaf("base")], &[])
            .unwrap();
        let catalog = SourceCatalog::new().with_source(numbered_source("base", 20, 0.0));
        let mut sink = MemorySink::new();

        let error = SequentialExecutor::new()
            .execute_with_cancellation(
                plan(&builder.build(root), &catalog),
                &mut sink,
                FailurePolicy::CollectAndContinue,
                cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            EvaluationError::Cancelled {
                completed: 6,
                total: 20
            }
        ));
        assert_eq!(sink.len(), 6);
        assert_eq!(sink.keys().last(), Some(&"k005"));
        assert!(!sink.status().unwrap().is_complete());
    }

    #[tokio::test]
    async fn test_worker_pool_cancellation_leaves_ordered_prefix() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let canceller = MergeMethodSpec::new("cancel_after", 1, move |ctx: &MergeContext<'_>| {
            if ctx.key == "k005" {
                trigger.cancel();
            }
            Ok(MethodOutput::Tensor(ctx.input(0)?.clone()))
        });
        let builder = builder_with(vec![canceller]);
        let root = builder
            .merge("cancel_after", vec![builder.leaf("base")], &[])
            .unwrap();
        let catalog = SourceCatalog::new().with_source(numbered_source("base", 50, 0.0));
        let plan = plan(&builder.build(root), &catalog);
        let mut sink = MemorySink::new();

        let result = WorkerPoolExecutor::new(2)
            .with_max_buffered_keys(4)
            .execute_with_cancellation(
                Arc::clone(&plan),
                &mut sink,
                FailurePolicy::CollectAndContinue,
                cancel,
            )
            .await;

        assert!(matches!(result, Err(EvaluationError::Cancelled { total: 50, .. })));
        let written = sink.keys();
        assert!(written.len() >= 6);
        assert!(written.len() < 50);
        for (written, expected) in written.iter().zip(plan.keys()) {
            assert_eq!(*written, expected.as_str());
        }
        assert!(!sink.status().unwrap().is_complete());
    }

    #[tokio::test]
    async fn test_output_identical_across_concurrency() {
        let builder = builder();
        let root = builder
            .merge(
                "add_difference",
                vec![
                    builder.leaf("a"),
                    builder
                        .merge("subtract", vec![builder.leaf("b"), builder.leaf("c")], &[])
                        .unwrap(),
                ],
                &[("alpha", HyperValue::Float(0.3))],
            )
            .unwrap();
        let recipe = builder.build(root);
        let catalog = SourceCatalog::new()
            .with_source(numbered_source("a", 64, 0.25))
            .with_source(numbered_source("b", 64, 1.5))
            .with_source(numbered_source("c", 64, -0.75));

        let mut reference = MemorySink::new();
        SequentialExecutor::new()
            .execute(plan(&recipe, &catalog), &mut reference, FailurePolicy::CollectAndContinue)
            .await
            .unwrap();
        assert_eq!(reference.len(), 64);

        for workers in [1, 2, 8] {
            let mut sink = MemorySink::new();
            WorkerPoolExecutor::new(workers)
                .execute(plan(&recipe, &catalog), &mut sink, FailurePolicy::CollectAndContinue)
                .await
                .unwrap();

            assert_eq!(sink.keys(), reference.keys());
            for ((_, expected), (_, actual)) in reference.entries().iter().zip(sink.entries()) {
                assert_eq!(expected.to_le_bytes(), actual.to_le_bytes());
            }
        }
    }

    #[tokio::test]
    async fn test_buffered_keys_stay_bounded() {
        let builder = builder();
        let root = builder
            .merge("n_average", vec![builder.leaf("x"), builder.leaf("y")], &[])
            .unwrap();
        let catalog = SourceCatalog::new()
            .with_source(numbered_source("x", 500, 0.0))
            .with_source(numbered_source("y", 500, 2.0));
        let mut sink = MemorySink::new();

        let report = WorkerPoolExecutor::new(4)
            .with_max_buffered_keys(6)
            .execute(plan(&builder.build(root), &catalog), &mut sink, FailurePolicy::CollectAndContinue)
            .await
            .unwrap();

        assert_eq!(sink.len(), 500);
        assert_eq!(report.succeeded, 500);
        assert!(report.peak_buffered_keys <= 6);
        assert_eq!(sink.keys()[0], "k000");
        assert_eq!(sink.keys()[499], "k499");
    }

    #[tokio::test]
    async fn test_fuzzy_alignment_feeds_evaluation() {
        let builder = builder();
        let root = builder
            .merge(
                "weighted_sum",
                vec![
                    builder.leaf_with_architecture("clean", "blocks").unwrap(),
                    builder.leaf_with_architecture("typo", "blocks").unwrap(),
                ],
                &[],
            )
            .unwrap();
        let catalog = SourceCatalog::new()
            .with_source(
                InMemorySource::new("clean")
                    .with_tensor("model.encoder.weight", Tensor::from_vec(vec![0.0]))
                    .with_tensor("model.decoder.weight", Tensor::from_vec(vec![0.0])),
            )
            .with_source(
                InMemorySource::new("typo")
                    .with_tensor("model.encoder.wieght", Tensor::from_vec(vec![4.0]))
                    .with_tensor("model.decoder.weight.0", Tensor::from_vec(vec![1.0]))
                    .with_tensor("model.decoder.weight.1", Tensor::from_vec(vec![2.0])),
            );
        let plan = plan(&builder.build(root), &catalog);
        assert_eq!(
            plan.keys(),
            &["model.encoder.weight", "model.decoder.weight", "model.head.bias"]
        );
        let mut sink = MemorySink::new();

        let report = SequentialExecutor::new()
            .execute(plan, &mut sink, FailurePolicy::CollectAndContinue)
            .await
            .unwrap();

        assert_eq!(sink.keys(), vec!["model.encoder.weight"]);
        assert_eq!(sink.get("model.encoder.weight").unwrap().data(), &[2.0]);
        assert_eq!(
            report.failure("model.decoder.weight").unwrap().kind,
            "ambiguous_key"
        );
        assert_eq!(report.failure("model.head.bias").unwrap().kind, "missing_key");

        let typo = report
            .alignments
            .iter()
            .find(|a| a.source_id == "typo")
            .unwrap();
        assert_eq!(typo.summary.fuzzy, 1);
        assert_eq!(typo.summary.ambiguous, 1);
        assert_eq!(typo.summary.absent, 1);
    }

    #[tokio::test]
    async fn test_lexicographic_ordering() {
        let builder = builder();
        let root = builder
            .merge(
                "weighted_sum",
                vec![
                    builder.leaf_with_architecture("base", "tiny").unwrap(),
                    builder.leaf("extra"),
                ],
                &[],
            )
            .unwrap();
        let catalog = two_model_catalog().with_source(
            InMemorySource::new("extra").with_tensor("0.first", Tensor::scalar(1.0)),
        );

        let declared = EvaluationPlan::build(
            &builder.build(root.clone()),
            &catalog,
            &KeyResolver::default(),
            OrderingMode::Declared,
        )
        .unwrap();
        assert_eq!(declared.keys()[0], "a.weight");
        assert_eq!(declared.keys()[3], "0.first");

        let sorted = EvaluationPlan::build(
            &builder.build(root),
            &catalog,
            &KeyResolver::default(),
            OrderingMode::Lexicographic,
        )
        .unwrap();
        assert_eq!(sorted.keys()[0], "0.first");
    }

    #[tokio::test]
    async fn test_unknown_source_fails_before_evaluation() {
        let builder = builder();
        let recipe = weighted(&builder);
        let catalog = SourceCatalog::new().with_source(InMemorySource::new("base"));

        let error = EvaluationPlan::build(
            &recipe,
            &catalog,
            &KeyResolver::default(),
            OrderingMode::Declared,
        )
        .unwrap_err();

        assert!(matches!(error, EvaluationError::UnknownSource(ref id) if id == "tuned"));
    }

    #[tokio::test]
    async fn test_report_serializes() {
        let builder = builder();
        let plan = plan(&weighted(&builder), &two_model_catalog());
        let mut sink = MemorySink::new();

        let report = WorkerPoolExecutor::new(2)
            .execute(plan, &mut sink, FailurePolicy::CollectAndContinue)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["strategy"], "worker_pool");
        assert_eq!(json["succeeded"], 2);
        assert_eq!(json["failed"][0]["key"], "c.weight");
        assert_eq!(json["alignments"].as_array().unwrap().len(), 2);
    }
}

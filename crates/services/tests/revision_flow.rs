use std::sync::Arc;

use chrono::Duration;
use rand::SeedableRng;
use rand::rngs::StdRng;
use revise_core::model::{Corpus, Evaluation, ScoreBand};
use revise_core::time::fixed_now;
use services::{
    Clock, CycleReset, InlineCorpusSource, NextStep, RevisionConfig, RevisionEngine,
    RevisionState, SelectionPolicyKind, load_corpus,
};
use storage::{KeyValueStore, ProgressStore, Storage};

fn corpus_json(terms: usize) -> String {
    let definitions: Vec<String> = (0..terms)
        .map(|i| format!(r#"{{"term": "Terme {i}", "definition": "Définition {i}"}}"#))
        .collect();
    format!(
        r#"{{"courses": [["microbio", {{"ue": "2.5", "title": "Microbiologie", "definitions": [{}]}}]]}}"#,
        definitions.join(",")
    )
}

async fn corpus(terms: usize) -> Corpus {
    load_corpus(&InlineCorpusSource::new(corpus_json(terms)))
        .await
        .expect("corpus loads")
}

async fn engine(
    corpus: Corpus,
    kv: Arc<dyn KeyValueStore>,
    policy: SelectionPolicyKind,
) -> RevisionEngine {
    let config = RevisionConfig::default()
        .with_policy(policy)
        .with_cooldown(Duration::zero());
    RevisionEngine::open(corpus, ProgressStore::new(kv), config)
        .await
        .expect("engine opens")
        .with_clock(Clock::fixed(fixed_now()))
        .with_rng(StdRng::seed_from_u64(2024))
}

async fn run_session(engine: &mut RevisionEngine, evaluation: Evaluation) -> usize {
    let started = engine.start_revision().await.expect("session starts");
    loop {
        engine.submit_answer("une réponse").expect("answer accepted");
        let outcome = engine.evaluate(evaluation).await.expect("evaluation applied");
        if let NextStep::Finished(_) = outcome.next {
            break;
        }
    }
    engine.start_new_session();
    started.total
}

#[tokio::test]
async fn priority_first_pads_with_mastered_terms() {
    let storage = Storage::in_memory();
    let mut engine = engine(
        corpus(12).await,
        Arc::clone(&storage.kv),
        SelectionPolicyKind::PriorityFirst,
    )
    .await;

    assert_eq!(run_session(&mut engine, Evaluation::Correct).await, 10);
    assert_eq!(engine.progress().mastered_len(), 10);

    let second = engine.start_revision().await.unwrap();
    assert_eq!(second.total, 10);
    assert_eq!(second.priority_selected, 2);
    assert_eq!(second.padding_selected, 8);
    assert_eq!(second.cycle_reset, None);
    let first_term = engine.current_term().unwrap().clone();
    assert!(!engine.is_mastered(&first_term));
}

#[tokio::test]
async fn rotation_serves_every_term_once_per_cycle() {
    let storage = Storage::in_memory();
    let mut engine = engine(
        corpus(12).await,
        Arc::clone(&storage.kv),
        SelectionPolicyKind::Rotation,
    )
    .await;

    assert_eq!(run_session(&mut engine, Evaluation::Correct).await, 10);
    assert_eq!(run_session(&mut engine, Evaluation::Wrong).await, 2);
    assert_eq!(engine.progress().used().len(), 12);

    let third = engine.start_revision().await.unwrap();
    assert_eq!(third.cycle_reset, Some(CycleReset::Rotation));
    assert_eq!(third.total, 10);
}

#[tokio::test]
async fn repeated_sessions_never_come_up_empty() {
    let storage = Storage::in_memory();
    for policy in [SelectionPolicyKind::PriorityFirst, SelectionPolicyKind::Rotation] {
        let mut engine = engine(corpus(3).await, Arc::clone(&storage.kv), policy).await;
        for _ in 0..5 {
            assert!(run_session(&mut engine, Evaluation::Correct).await > 0);
        }
    }
}

#[tokio::test]
async fn progress_is_restored_by_a_new_engine() {
    let storage = Storage::in_memory();
    let mut first = engine(
        corpus(4).await,
        Arc::clone(&storage.kv),
        SelectionPolicyKind::PriorityFirst,
    )
    .await;

    first.start_revision().await.unwrap();
    let evaluations = [
        Evaluation::Correct,
        Evaluation::Partial,
        Evaluation::Wrong,
        Evaluation::Correct,
    ];
    for evaluation in evaluations {
        first.submit_answer("réponse").unwrap();
        first.evaluate(evaluation).await.unwrap();
    }
    let score = first.score().unwrap();
    assert_eq!(score.percentage(), 63);
    assert_eq!(score.band(), ScoreBand::Fair);
    assert_eq!(first.state(), RevisionState::Finished { total: 4 });

    let second = engine(
        corpus(4).await,
        Arc::clone(&storage.kv),
        SelectionPolicyKind::PriorityFirst,
    )
    .await;
    assert_eq!(second.progress(), first.progress());

    let stats = second.stats();
    assert_eq!(stats.total_terms, 4);
    assert_eq!(stats.mastered_terms, 2);
    assert_eq!(stats.priority_terms, 2);
    assert_eq!(stats.seen_terms, 4);
    assert_eq!(stats.mastery_rate, 50);
    assert_eq!(stats.evaluations.correct, 2);
    assert_eq!(stats.evaluations.partial, 1);
    assert_eq!(stats.evaluations.wrong, 1);
}

#[tokio::test]
async fn wrong_answer_unmasters_a_term() {
    let storage = Storage::in_memory();
    let mut engine = engine(
        corpus(1).await,
        Arc::clone(&storage.kv),
        SelectionPolicyKind::PriorityFirst,
    )
    .await;

    run_session(&mut engine, Evaluation::Correct).await;
    assert_eq!(engine.stats().mastered_terms, 1);

    let started = engine.start_revision().await.unwrap();
    assert_eq!(started.cycle_reset, Some(CycleReset::Mastery));
    engine.submit_answer("oublié").unwrap();
    engine.evaluate(Evaluation::Wrong).await.unwrap();

    assert_eq!(engine.stats().mastered_terms, 0);
}

use std::sync::Arc;

use revise_core::model::{Evaluation, ProgressState, Term, TermKey};
use storage::repository::{KeyValueStore, Storage};
use storage::sqlite::SqliteRepository;
use storage::{MASTERED_KEY, PROGRESS_KEY, ProgressStore};

fn term(name: &str, ue: &str) -> Term {
    Term::new(name, "definition", ue, "Course").unwrap()
}

#[tokio::test]
async fn sqlite_kv_roundtrip_and_overwrite() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert_eq!(repo.get("missing").await.unwrap(), None);

    repo.put("alpha", "1".into()).await.unwrap();
    repo.put_many(&[("alpha", "2".into()), ("beta", "3".into())])
        .await
        .unwrap();
    assert_eq!(repo.get("alpha").await.unwrap().as_deref(), Some("2"));
    assert_eq!(repo.get("beta").await.unwrap().as_deref(), Some("3"));

    repo.remove_many(&["alpha"]).await.unwrap();
    assert_eq!(repo.get("alpha").await.unwrap(), None);
    assert_eq!(repo.get("beta").await.unwrap().as_deref(), Some("3"));
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_migrate_twice?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");

    repo.put("k", "v".into()).await.unwrap();
    assert_eq!(repo.get("k").await.unwrap().as_deref(), Some("v"));
}

#[tokio::test]
async fn progress_survives_reopening_the_store() {
    let url = "sqlite:file:memdb_progress_reopen?mode=memory&cache=shared";
    let first = Storage::sqlite(url).await.expect("open");
    let store = ProgressStore::new(Arc::clone(&first.kv));

    let mut state = ProgressState::new();
    state.set_total_terms(2);
    state.apply_evaluation(&term("Biofilm", "3.10"), Evaluation::Correct);
    state.apply_evaluation(&term("Asepsie", "2.10"), Evaluation::Wrong);
    store.save(&state).await.unwrap();

    // A second pool on the same shared in-memory database sees the committed rows.
    let second = Storage::sqlite(url).await.expect("reopen");
    let restored = ProgressStore::new(second.kv).load().await.unwrap();

    assert_eq!(restored, state);
    assert!(restored.is_mastered(&TermKey::derive(" biofilm ", "3.10")));
    drop(first);
}

#[tokio::test]
async fn corrupt_sqlite_entry_degrades_to_fresh_progress() {
    let storage = Storage::sqlite("sqlite:file:memdb_corrupt?mode=memory&cache=shared")
        .await
        .expect("open");
    storage
        .kv
        .put_many(&[(PROGRESS_KEY, "][".into()), (MASTERED_KEY, "[]".into())])
        .await
        .unwrap();

    let state = ProgressStore::new(storage.kv).load().await.unwrap();
    assert_eq!(state, ProgressState::default());
}

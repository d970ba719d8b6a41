//! End-to-end behavior of the store under concurrent readers and writers.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use folio::application::loader::PostLoader;
use folio::domain::entities::{PostDraft, PostPatch};
use folio::domain::types::{PostId, PostStatus};
use folio::infra::loader::SeedLoader;
use folio::store::{Mutation, PostStore, StoreConfig, StoreError};
use futures::future::join_all;
use time::OffsetDateTime;

fn config() -> StoreConfig {
    StoreConfig::default()
}

async fn seeded(count: usize) -> PostStore {
    let records = SeedLoader::new(count, OffsetDateTime::now_utc())
        .load_all()
        .await
        .expect("seed posts");
    let (store, _applier) = PostStore::start(config(), records).expect("valid seed");
    store
}

#[tokio::test]
async fn created_post_is_readable_after_completion() {
    let (store, _applier) = PostStore::start(config(), Vec::new()).expect("empty load");

    let completion = store
        .pipeline()
        .submit_tracked(Mutation::Create(PostDraft::new("hello", "Hello")))
        .expect("accepted");
    completion.wait().await.expect("applied");

    let post = store.queries().get_by_slug("hello").expect("visible");
    assert_eq!(post.id, 1);
    assert_eq!(post.title, "Hello");
    assert_eq!(post.status, PostStatus::Draft);
}

#[tokio::test]
async fn duplicate_slug_is_rejected_and_store_keeps_one_record() {
    let (store, _applier) = PostStore::start(config(), Vec::new()).expect("empty load");

    store
        .create(PostDraft::new("a", "First"))
        .await
        .expect("first create");
    let err = store
        .create(PostDraft::new("a", "Second"))
        .await
        .expect_err("duplicate slug");

    assert_eq!(err, StoreError::duplicate_slug("a"));
    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(
        snapshot.posts().iter().filter(|p| p.slug == "a").count(),
        1
    );
    assert_eq!(snapshot.get_by_slug("a").expect("kept").title, "First");
}

#[tokio::test]
async fn update_of_missing_post_fails_and_leaves_store_unchanged() {
    let store = seeded(5).await;
    let before = store.snapshot();

    let err = store
        .update(42, PostPatch::default().slug("new-slug"))
        .await
        .expect_err("missing id");

    assert_eq!(err, StoreError::not_found(42));
    let after = store.snapshot();
    assert_eq!(after.epoch(), before.epoch());
    assert_eq!(*after, *before);
}

#[tokio::test]
async fn second_page_matches_sequence_positions() {
    let store = seeded(1000).await;
    let snapshot = store.snapshot();

    let page = store.queries().list_recent(2, Some(10));
    assert_eq!(page.items.as_slice(), &snapshot.posts()[10..20]);
    let ids: Vec<PostId> = page.items.iter().map(|p| p.id).collect();
    assert_eq!(ids, (11..=20).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_lose_no_writes() {
    const WRITES: usize = 200;
    let store = seeded(10).await;

    let tasks = (0..WRITES).map(|i| {
        let store = store.clone();
        tokio::spawn(async move {
            store
                .create(PostDraft::new(format!("concurrent-{i}"), format!("Concurrent {i}")))
                .await
        })
    });

    let created: Vec<PostId> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task").expect("create").id)
        .collect();

    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 10 + WRITES);
    assert!(snapshot.indexes_consistent());

    let unique: HashSet<PostId> = created.iter().copied().collect();
    assert_eq!(unique.len(), WRITES);
    let all: HashSet<PostId> = snapshot.posts().iter().map(|p| p.id).collect();
    assert_eq!(all.len(), snapshot.len());
    assert!(unique.iter().all(|id| all.contains(id)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_only_observe_consistent_versions() {
    let store = seeded(100).await;

    let readers = (0..4).map(|_| {
        let store = store.clone();
        tokio::spawn(async move {
            let mut last_epoch = 0;
            for _ in 0..500 {
                let snapshot = store.snapshot();
                assert!(snapshot.indexes_consistent());
                assert!(snapshot.epoch() >= last_epoch, "epochs never go backwards");
                last_epoch = snapshot.epoch();
                tokio::task::yield_now().await;
            }
        })
    });

    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            for i in 0..50 {
                let post = store
                    .create(PostDraft::new(format!("churn-{i}"), "Churn"))
                    .await
                    .expect("create");
                if i % 2 == 0 {
                    store.delete(post.id).await.expect("delete");
                }
            }
        })
    };

    for reader in join_all(readers).await {
        reader.expect("reader task");
    }
    writer.await.expect("writer task");

    assert_eq!(store.snapshot().len(), 125);
}

#[tokio::test]
async fn versions_follow_submission_order() {
    let (store, _applier) = PostStore::start(config(), Vec::new()).expect("empty load");
    let pipeline = store.pipeline();

    let first = pipeline
        .submit_tracked(Mutation::Create(PostDraft::new("first", "First")))
        .expect("accepted");
    let second = pipeline
        .submit_tracked(Mutation::Create(PostDraft::new("second", "Second")))
        .expect("accepted");
    let third = pipeline
        .submit_tracked(Mutation::Update {
            id: 1,
            patch: PostPatch::default().title("First, edited"),
        })
        .expect("accepted");

    let first = first.wait().await.expect("applied");
    let second = second.wait().await.expect("applied");
    let third = third.wait().await.expect("applied");

    assert!(first.epoch < second.epoch);
    assert!(second.epoch < third.epoch);
    assert_eq!(first.effect.record().id, 1);
    assert_eq!(second.effect.record().id, 2);
    assert_eq!(third.effect.record().title, "First, edited");
}

#[tokio::test]
async fn held_version_is_unchanged_by_later_mutations() {
    let store = seeded(3).await;
    let held = store.snapshot();
    let copy = (*held).clone();

    store
        .update(1, PostPatch::default().title("Changed"))
        .await
        .expect("update");
    store.delete(2).await.expect("delete");
    store
        .create(PostDraft::new("fresh", "Fresh"))
        .await
        .expect("create");

    assert_eq!(*held, copy);
    assert_eq!(held.get_by_id(1).expect("still there").title, "Test post 1");
    assert!(held.get_by_id(2).is_some());
    assert!(held.get_by_slug("fresh").is_none());
    assert_ne!(*store.snapshot(), copy);
}

#[tokio::test]
async fn update_can_move_slug_but_not_onto_another_post() {
    let store = seeded(3).await;

    let err = store
        .update(1, PostPatch::default().slug("test-post-2"))
        .await
        .expect_err("collision");
    assert_eq!(err, StoreError::duplicate_slug("test-post-2"));

    let same = store
        .update(1, PostPatch::default().slug("test-post-1").status(PostStatus::Archived))
        .await
        .expect("own slug is allowed");
    assert_eq!(same.status, PostStatus::Archived);

    let moved = store
        .update(1, PostPatch::default().slug("renamed"))
        .await
        .expect("free slug");
    assert_eq!(moved.slug, "renamed");
    assert!(store.queries().get_by_slug("test-post-1").is_err());
    assert_eq!(store.queries().get_by_slug("renamed").expect("indexed").id, 1);
}

#[tokio::test]
async fn invalid_slug_is_rejected_without_stalling_the_queue() {
    let (store, _applier) = PostStore::start(config(), Vec::new()).expect("empty load");

    let err = store
        .create(PostDraft::new("   ", "Blank"))
        .await
        .expect_err("blank slug");
    assert!(matches!(err, StoreError::InvalidRequest { .. }));

    let ok = store
        .create(PostDraft::new("after", "After"))
        .await
        .expect("queue still drains");
    assert_eq!(ok.id, 1);
}

#[tokio::test]
async fn submit_with_timeout_gives_up_on_a_full_queue() {
    let capacity = StoreConfig {
        queue_capacity: 1,
        ..StoreConfig::default()
    };
    let (store, mut applier) = PostStore::load_initial(capacity, Vec::new()).expect("empty load");
    let pipeline = store.pipeline();

    pipeline
        .submit(Mutation::Create(PostDraft::new("queued", "Queued")))
        .expect("fills the queue");

    let err = pipeline
        .submit_with_timeout(
            Mutation::Create(PostDraft::new("late", "Late")),
            Duration::from_millis(20),
        )
        .await
        .expect_err("no capacity");
    assert_eq!(err, StoreError::Timeout(Duration::from_millis(20)));

    assert!(applier.try_apply_next());
    assert!(!applier.try_apply_next(), "timed-out request was never queued");
    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.get_by_slug("late").is_none());
    assert!(Arc::ptr_eq(&snapshot, &store.queries().snapshot()));
}

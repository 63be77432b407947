use quorum_access::prelude::*;
use quorum_errors::prelude::*;
use quorum_types::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

type Svc = AccessService<MemoryAccessStore, MemorySyncPublisher>;

fn fixture() -> (Arc<Svc>, MemoryAccessStore, MemorySyncPublisher) {
    let store = MemoryAccessStore::new();
    let publisher = MemorySyncPublisher::new();
    let retry = RetryPolicy {
        max_attempts: 3,
        delay_ms: 1,
    };
    let service = Arc::new(AccessService::new(store.clone(), publisher.clone(), retry));
    (service, store, publisher)
}

fn grant_request(room: &str, user: &str, role: Role, revision: &str) -> GrantRequest {
    GrantRequest {
        room_id: RoomId(room.into()),
        user_id: UserId(user.into()),
        role,
        revision: Revision(revision.into()),
    }
}

#[tokio::test]
async fn owner_grant_displaces_previous_owner() {
    let (service, _, _) = fixture();
    let room = RoomId("r1".into());

    service
        .create(&grant_request("r1", "alice", Role::Owner, "1-aa"), None)
        .await
        .expect("first owner");
    service
        .create(&grant_request("r1", "bob", Role::Owner, "2-bb"), None)
        .await
        .expect("second owner");

    let owners = service
        .list_by_room(&room, Some(Role::Owner))
        .await
        .expect("list");
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].user_id, UserId("bob".into()));

    let err = service
        .resolve(&room, &UserId("alice".into()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), codes::ACCESS_NOT_FOUND);
}

#[tokio::test]
async fn owner_recreate_keeps_own_grant() {
    let (service, _, _) = fixture();
    service
        .create(&grant_request("r1", "alice", Role::Owner, "1-aa"), None)
        .await
        .expect("create");
    service
        .create(&grant_request("r1", "alice", Role::Owner, "2-bb"), None)
        .await
        .expect("recreate");

    let grant = service
        .resolve(&RoomId("r1".into()), &UserId("alice".into()))
        .await
        .expect("resolve");
    assert_eq!(grant.role, Role::Owner);
    assert_eq!(grant.revision, Revision("2-bb".into()));
}

#[tokio::test]
async fn participant_limit_is_enforced() {
    let (service, _, _) = fixture();
    for user in ["u1", "u2"] {
        service
            .create(
                &grant_request("r1", user, Role::Participant, "1-aa"),
                Some(2),
            )
            .await
            .expect("join");
    }

    let err = service
        .create(
            &grant_request("r1", "u3", Role::Participant, "1-aa"),
            Some(2),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), codes::ACCESS_CAPACITY);
    assert_eq!(err.0.http_status, 403);

    // The limit only counts participants; other roles are never blocked.
    service
        .create(
            &grant_request("r1", "mod1", Role::Moderator, "1-aa"),
            Some(2),
        )
        .await
        .expect("moderator unaffected");
}

#[tokio::test]
async fn lookup_touches_last_access() {
    let store = MemoryAccessStore::new();
    let room = RoomId("r1".into());
    let user = UserId("u1".into());
    store
        .upsert(&room, &user, Role::Participant, &Revision("1-aa".into()), 1_000)
        .await
        .expect("upsert");

    let grant = store
        .get_and_touch(&room, &user, 5_000)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(grant.created_at_ms, 1_000);
    assert_eq!(grant.last_access_at_ms, 5_000);
}

#[tokio::test]
async fn request_sync_on_fresh_room_is_a_noop() {
    let (service, _, publisher) = fixture();
    let room = RoomId("r1".into());
    service
        .reconciler()
        .apply_sync(
            &room,
            &Revision("3-abc".into()),
            &[SyncEntry {
                user_id: UserId("u1".into()),
                role: Role::Owner,
            }],
        )
        .await
        .expect("seed snapshot");

    // Repeated fresh requests never re-trigger a sync event.
    for _ in 0..2 {
        let tracker = service
            .request_sync(&room, &Revision("2-xy".into()))
            .await
            .expect("request");
        assert_eq!(tracker.revision, Revision("3-abc".into()));
    }
    assert!(publisher.requested().is_empty());
}

#[tokio::test]
async fn request_sync_resets_tracker_and_publishes() {
    let (service, store, publisher) = fixture();
    let room = RoomId("r1".into());
    service
        .reconciler()
        .apply_sync(&room, &Revision("3-abc".into()), &[])
        .await
        .expect("seed snapshot");

    let tracker = service
        .request_sync(&room, &Revision("5-zz".into()))
        .await
        .expect("request");
    assert_eq!(tracker.revision, Revision::zero());
    assert_eq!(publisher.requested(), vec![room.clone()]);
    assert_eq!(publisher.published()[0].room_id, room);

    // The persisted tracker now marks the sync as in flight.
    let persisted = store.tracker(&room).await.expect("tracker").expect("row");
    assert_eq!(persisted.revision, Revision::zero());
}

#[tokio::test]
async fn stale_snapshot_is_dropped() {
    let (service, store, _) = fixture();
    let room = RoomId("r1".into());
    service
        .reconciler()
        .apply_sync(
            &room,
            &Revision("3-abc".into()),
            &[SyncEntry {
                user_id: UserId("u1".into()),
                role: Role::Owner,
            }],
        )
        .await
        .expect("seed snapshot");

    let outcome = service
        .reconciler()
        .apply_sync(
            &room,
            &Revision("2-old".into()),
            &[SyncEntry {
                user_id: UserId("u2".into()),
                role: Role::Participant,
            }],
        )
        .await
        .expect("apply stale");

    assert_eq!(outcome, SyncOutcome::StaleDropped);
    let tracker = store.tracker(&room).await.expect("tracker").expect("row");
    assert_eq!(tracker.revision, Revision("3-abc".into()));
    assert!(store
        .get_and_touch(&room, &UserId("u2".into()), 0)
        .await
        .expect("get")
        .is_none());
}

#[tokio::test]
async fn duplicate_snapshot_is_a_noop() {
    let (service, store, _) = fixture();
    let room = RoomId("r1".into());
    service
        .reconciler()
        .apply_sync(
            &room,
            &Revision("3-abc".into()),
            &[SyncEntry {
                user_id: UserId("u1".into()),
                role: Role::Owner,
            }],
        )
        .await
        .expect("seed snapshot");

    // Same sequence, different hash suffix: a broker redelivery.
    let outcome = service
        .reconciler()
        .apply_sync(&room, &Revision("3-zzz".into()), &[])
        .await
        .expect("apply duplicate");

    assert_eq!(outcome, SyncOutcome::Duplicate);
    let tracker = store.tracker(&room).await.expect("tracker").expect("row");
    assert_eq!(tracker.revision, Revision("3-abc".into()));
    assert!(store
        .get_and_touch(&room, &UserId("u1".into()), 0)
        .await
        .expect("get")
        .is_some());
}

#[tokio::test]
async fn snapshot_replaces_older_grants_and_keeps_newer_ones() {
    let (service, store, _) = fixture();
    let room = RoomId("r1".into());
    store
        .upsert(
            &room,
            &UserId("departed".into()),
            Role::Participant,
            &Revision("1-aa".into()),
            0,
        )
        .await
        .expect("seed old");
    store
        .upsert(
            &room,
            &UserId("late".into()),
            Role::Moderator,
            &Revision("5-ff".into()),
            0,
        )
        .await
        .expect("seed newer");

    let outcome = service
        .reconciler()
        .apply_sync(
            &room,
            &Revision("4-cc".into()),
            &[
                SyncEntry {
                    user_id: UserId("u1".into()),
                    role: Role::Owner,
                },
                SyncEntry {
                    user_id: UserId("late".into()),
                    role: Role::Participant,
                },
            ],
        )
        .await
        .expect("apply");
    assert_eq!(outcome, SyncOutcome::Applied);

    // The pre-snapshot grant is gone, the snapshot member is present.
    assert!(store
        .get_and_touch(&room, &UserId("departed".into()), 0)
        .await
        .expect("get")
        .is_none());
    let owner = store
        .get_and_touch(&room, &UserId("u1".into()), 0)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(owner.role, Role::Owner);
    assert_eq!(owner.revision, Revision("4-cc".into()));

    // A grant already written at a later revision wins over the snapshot.
    let late = store
        .get_and_touch(&room, &UserId("late".into()), 0)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(late.role, Role::Moderator);
    assert_eq!(late.revision, Revision("5-ff".into()));
}

#[tokio::test]
async fn with_retry_gives_up_after_attempt_budget() {
    let policy = RetryPolicy {
        max_attempts: 3,
        delay_ms: 1,
    };
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let result: Result<(), AccessError> = with_retry(&policy, || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AccessError::conflict("always contended"))
        }
    })
    .await;

    assert_eq!(result.unwrap_err().code(), codes::STORAGE_CONFLICT);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn with_retry_does_not_retry_permanent_errors() {
    let policy = RetryPolicy::default();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let result: Result<(), AccessError> = with_retry(&policy, || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AccessError::not_found("nothing here"))
        }
    })
    .await;

    assert_eq!(result.unwrap_err().code(), codes::ACCESS_NOT_FOUND);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn consumer_applies_snapshot_deliveries() {
    let (service, store, _) = fixture();
    let inbox = MemorySyncInbox::new();
    let consumer = SyncConsumer::new(service.clone(), inbox.clone(), QueueConfig::default());

    let event = SyncRoomAccess {
        room_id: RoomId("r1".into()),
        revision: Revision("2-bb".into()),
        entries: vec![SyncEntry {
            user_id: UserId("u1".into()),
            role: Role::Participant,
        }],
    };
    inbox
        .enqueue(
            CHANNEL_SYNC_ROOM_ACCESS,
            serde_json::to_value(&event).expect("encode"),
            0,
        )
        .await
        .expect("enqueue");

    let handled = consumer.tick(0).await.expect("tick");
    assert_eq!(handled, 1);
    let tracker = store
        .tracker(&RoomId("r1".into()))
        .await
        .expect("tracker")
        .expect("row");
    assert_eq!(tracker.revision, Revision("2-bb".into()));
}

#[tokio::test]
async fn concurrent_joins_respect_the_limit_softly() {
    let (service, _, _) = fixture();
    let room = RoomId("r1".into());

    // The limit check counts and inserts in two statements, so three
    // racing joins against limit 2 may all land; the count never exceeds
    // the number of admitted callers and rejections are capacity errors.
    let req1 = grant_request("r1", "u1", Role::Participant, "1-aa");
    let req2 = grant_request("r1", "u2", Role::Participant, "1-aa");
    let req3 = grant_request("r1", "u3", Role::Participant, "1-aa");
    let (a, b, c) = tokio::join!(
        service.create(&req1, Some(2)),
        service.create(&req2, Some(2)),
        service.create(&req3, Some(2)),
    );

    let mut admitted = 0usize;
    for result in [a, b, c] {
        match result {
            Ok(_) => admitted += 1,
            Err(err) => assert_eq!(err.code(), codes::ACCESS_CAPACITY),
        }
    }
    assert!(admitted >= 2);

    let participants = service
        .count_by_room_and_role(&room, Role::Participant)
        .await
        .expect("count");
    assert_eq!(participants, admitted);
}

#[tokio::test]
async fn foreign_channel_delivery_is_acked_and_skipped() {
    let (service, store, _) = fixture();
    let inbox = MemorySyncInbox::new();
    let consumer = SyncConsumer::new(service.clone(), inbox.clone(), QueueConfig::default());

    let request = SyncRequested {
        room_id: RoomId("r1".into()),
    };
    inbox
        .enqueue(
            CHANNEL_SYNC_REQUESTED,
            serde_json::to_value(&request).expect("encode"),
            0,
        )
        .await
        .expect("enqueue");

    // A shared-topic delivery for another consumer is dropped, not parked.
    assert_eq!(consumer.tick(0).await.expect("tick"), 0);
    assert!(inbox.dead_letters().await.expect("dlq").is_empty());
    assert!(store.tracker(&RoomId("r1".into())).await.expect("tracker").is_none());

    // And it is gone, not redelivered.
    assert_eq!(consumer.tick(1_000).await.expect("tick"), 0);
}

#[tokio::test]
async fn poison_delivery_is_dead_lettered_after_budget() {
    let (service, _, _) = fixture();
    let inbox = MemorySyncInbox::new();
    let config = QueueConfig {
        max_attempts: 2,
        retry_delay_ms: 10,
    };
    let consumer = SyncConsumer::new(service.clone(), inbox.clone(), config);

    inbox
        .enqueue(CHANNEL_SYNC_ROOM_ACCESS, serde_json::json!({"not": "a snapshot"}), 0)
        .await
        .expect("enqueue");

    // First attempt fails and is redelivered with a delay.
    assert_eq!(consumer.tick(0).await.expect("tick"), 0);
    assert!(inbox.dead_letters().await.expect("dlq").is_empty());

    // Second attempt exhausts the budget and parks the message.
    assert_eq!(consumer.tick(10).await.expect("tick"), 0);
    let dead = inbox.dead_letters().await.expect("dlq");
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].attempts, 2);
    assert!(dead[0].last_error.contains("malformed sync payload"));

    // Nothing left to deliver.
    assert_eq!(consumer.tick(1_000).await.expect("tick"), 0);
}

#[tokio::test]
async fn delete_all_for_room_removes_every_grant() {
    let (service, _, _) = fixture();
    for (user, role) in [("a", Role::Owner), ("b", Role::Participant)] {
        service
            .create(&grant_request("r1", user, role, "1-aa"), None)
            .await
            .expect("create");
    }

    let removed = service
        .delete_all_for_room(&RoomId("r1".into()))
        .await
        .expect("delete all");
    assert_eq!(removed.len(), 2);
    assert!(service
        .list_by_room(&RoomId("r1".into()), None)
        .await
        .expect("list")
        .is_empty());
}

mod common;

use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use subpub::{EngineConfig, FanoutMode, SubPub, SubPubError, Subscription};
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};

use crate::common::{assert_quiet, init_tracing, recorder, recv_n, WAIT};

const THEME: &str = "some theme";

#[tokio::test]
async fn empty_subject_is_rejected_regardless_of_state() {
    let sp: SubPub<&'static str> = SubPub::new();
    let res = sp.subscribe("", |_: &'static str| {}).await;
    assert!(matches!(res, Err(SubPubError::EmptySubject)));

    sp.close(None).await.unwrap();
    let res = sp.subscribe("", |_: &'static str| {}).await;
    assert!(matches!(res, Err(SubPubError::EmptySubject)));
}

#[tokio::test]
async fn publish_without_subscribers_fails() {
    let sp: SubPub<&'static str> = SubPub::new();
    let err = sp.publish(THEME, "message").await.unwrap_err();
    assert!(matches!(err, SubPubError::NoSubscribers));

    let sub = sp.subscribe(THEME, |_: &'static str| {}).await.unwrap();
    sub.unsubscribe().await;
    let err = sp.publish(THEME, "message").await.unwrap_err();
    assert!(matches!(err, SubPubError::NoSubscribers));
}

#[tokio::test]
async fn published_message_reaches_subscriber() {
    init_tracing();
    let sp: SubPub<&'static str> = SubPub::new();
    let (handler, mut rx) = recorder::<&'static str>();
    sp.subscribe(THEME, handler).await.unwrap();

    sp.publish(THEME, "message").await.unwrap();
    assert_eq!(recv_n(&mut rx, 1).await, vec!["message"]);
}

#[tokio::test]
async fn subjects_match_exactly() {
    let sp: SubPub<&'static str> = SubPub::new();
    let (handler, mut rx) = recorder::<&'static str>();
    sp.subscribe("Theme", handler).await.unwrap();

    assert!(matches!(
        sp.publish("theme", "lowercase").await,
        Err(SubPubError::NoSubscribers)
    ));
    assert!(matches!(
        sp.publish("Theme.sub", "nested").await,
        Err(SubPubError::NoSubscribers)
    ));
    sp.publish("Theme", "exact").await.unwrap();
    assert_eq!(recv_n(&mut rx, 1).await, vec!["exact"]);
    assert_quiet(&mut rx, Duration::from_millis(50)).await;
}

#[tokio::test]
async fn closed_engine_refuses_subscribe_and_publish() {
    let sp: SubPub<&'static str> = SubPub::new();
    sp.subscribe(THEME, |_: &'static str| {}).await.unwrap();

    sp.close(Some(Instant::now() + Duration::from_secs(1)))
        .await
        .unwrap();
    assert!(sp.is_closed().await);
    assert!(sp.subjects().await.is_empty());

    let res = sp.subscribe(THEME, |_: &'static str| {}).await;
    assert!(matches!(res, Err(SubPubError::Closed)));
    let res = sp.publish(THEME, "message").await;
    assert!(matches!(res, Err(SubPubError::Closed)));
}

#[tokio::test]
async fn close_twice_is_a_no_op() {
    let sp: SubPub<u32> = SubPub::new();
    sp.subscribe(THEME, |_: u32| {}).await.unwrap();

    sp.close(None).await.unwrap();
    sp.close(None).await.unwrap();
    assert!(sp.is_closed().await);
}

#[tokio::test]
async fn expired_deadline_leaves_engine_open() {
    let sp: SubPub<u32> = SubPub::new();
    let (handler, mut rx) = recorder::<u32>();
    sp.subscribe(THEME, handler).await.unwrap();

    let deadline = Instant::now();
    let err = sp.close(Some(deadline)).await.unwrap_err();
    assert!(matches!(err, SubPubError::DeadlineExceeded));

    assert!(!sp.is_closed().await);
    sp.publish(THEME, 1).await.unwrap();
    assert_eq!(recv_n(&mut rx, 1).await, vec![1]);
}

#[tokio::test]
async fn every_subscriber_sees_publish_order() {
    let sp: SubPub<&'static str> = SubPub::new();
    let (first, mut first_rx) = recorder::<&'static str>();
    let (second, mut second_rx) = recorder::<&'static str>();
    sp.subscribe(THEME, first).await.unwrap();
    sp.subscribe(THEME, second).await.unwrap();

    sp.publish(THEME, "m1").await.unwrap();
    sp.publish(THEME, "m2").await.unwrap();

    assert_eq!(recv_n(&mut first_rx, 2).await, vec!["m1", "m2"]);
    assert_eq!(recv_n(&mut second_rx, 2).await, vec!["m1", "m2"]);
}

#[tokio::test]
async fn unsubscribed_handler_stops_receiving() {
    let sp: SubPub<&'static str> = SubPub::new();
    let (first, mut first_rx) = recorder::<&'static str>();
    let (second, mut second_rx) = recorder::<&'static str>();
    let a = sp.subscribe(THEME, first).await.unwrap();
    sp.subscribe(THEME, second).await.unwrap();

    sp.publish(THEME, "before").await.unwrap();
    assert_eq!(recv_n(&mut first_rx, 1).await, vec!["before"]);
    assert_eq!(recv_n(&mut second_rx, 1).await, vec!["before"]);

    a.unsubscribe().await;
    assert_eq!(sp.subscriber_count(THEME).await, 1);

    sp.publish(THEME, "after").await.unwrap();
    assert_eq!(recv_n(&mut second_rx, 1).await, vec!["after"]);
    assert_quiet(&mut first_rx, Duration::from_millis(100)).await;
}

#[tokio::test]
async fn unsubscribe_is_idempotent_and_prunes_subjects() {
    let sp: SubPub<u32> = SubPub::new();
    let a = sp.subscribe(THEME, |_: u32| {}).await.unwrap();
    let b = sp.subscribe(THEME, |_: u32| {}).await.unwrap();
    assert_eq!(sp.subscriber_count(THEME).await, 2);

    a.unsubscribe().await;
    a.unsubscribe().await;
    assert_eq!(sp.subscriber_count(THEME).await, 1);

    b.unsubscribe().await;
    assert_eq!(sp.subscriber_count(THEME).await, 0);
    assert!(sp.subjects().await.is_empty());
    b.unsubscribe().await;
}

#[tokio::test]
async fn unsubscribe_after_close_or_drop_does_nothing() {
    let sp: SubPub<u32> = SubPub::new();
    let sub = sp.subscribe(THEME, |_: u32| {}).await.unwrap();
    sp.close(None).await.unwrap();
    sub.unsubscribe().await;
    assert!(sp.subjects().await.is_empty());

    let sp: SubPub<u32> = SubPub::new();
    let sub = sp.subscribe(THEME, |_: u32| {}).await.unwrap();
    drop(sp);
    sub.unsubscribe().await;
    assert_eq!(sub.subject(), THEME);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_publishers_lose_nothing() {
    const PUBLISHERS: usize = 10;
    const PER_PUBLISHER: usize = 50;

    let sp: SubPub<(usize, usize)> = SubPub::new();
    let (handler, mut rx) = recorder::<(usize, usize)>();
    sp.subscribe(THEME, handler).await.unwrap();

    let mut tasks = Vec::new();
    for publisher in 0..PUBLISHERS {
        let sp = sp.clone();
        tasks.push(tokio::spawn(async move {
            for seq in 0..PER_PUBLISHER {
                sp.publish(THEME, (publisher, seq)).await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let received = recv_n(&mut rx, PUBLISHERS * PER_PUBLISHER).await;
    assert_quiet(&mut rx, Duration::from_millis(100)).await;

    // per publisher, sequence numbers arrive in the order they were sent
    for publisher in 0..PUBLISHERS {
        let seqs: Vec<usize> = received
            .iter()
            .filter(|(p, _)| *p == publisher)
            .map(|(_, s)| *s)
            .collect();
        assert_eq!(seqs, (0..PER_PUBLISHER).collect::<Vec<_>>());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_subscriber_does_not_reorder_or_hold_back_fast_one() {
    let sp: SubPub<i32> = SubPub::new();
    let fast = Arc::new(Mutex::new(Vec::new()));
    let slow = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<&'static str>();

    let (record, done) = (Arc::clone(&fast), done_tx.clone());
    sp.subscribe(THEME, move |n: i32| {
        record.lock().unwrap().push(n);
        let _ = done.send("fast");
    })
    .await
    .unwrap();

    let (record, done) = (Arc::clone(&slow), done_tx);
    sp.subscribe(THEME, move |n: i32| {
        std::thread::sleep(Duration::from_millis(100));
        record.lock().unwrap().push(n);
        let _ = done.send("slow");
    })
    .await
    .unwrap();

    for n in 0..5 {
        sp.publish(THEME, n).await.unwrap();
    }

    let finished = recv_n(&mut done_rx, 10).await;
    // the fast subscriber is done long before the slow one
    assert_eq!(finished[..5], ["fast"; 5]);
    assert_eq!(*fast.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    assert_eq!(*slow.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn close_lets_in_flight_handler_finish() {
    let sp: SubPub<u32> = SubPub::new();
    let (started_tx, mut started_rx) = mpsc::unbounded_channel::<u32>();
    let (finished_tx, mut finished_rx) = mpsc::unbounded_channel::<u32>();
    let (release_tx, release_rx) = std_mpsc::channel::<()>();

    sp.subscribe(THEME, move |n: u32| {
        let _ = started_tx.send(n);
        let _ = release_rx.recv();
        let _ = finished_tx.send(n);
    })
    .await
    .unwrap();

    for n in 0..3 {
        sp.publish(THEME, n).await.unwrap();
    }
    assert_eq!(recv_n(&mut started_rx, 1).await, vec![0]);

    timeout(WAIT, sp.close(None))
        .await
        .expect("close blocked on a running handler")
        .unwrap();

    release_tx.send(()).unwrap();
    assert_eq!(recv_n(&mut finished_rx, 1).await, vec![0]);
    drop(release_tx);

    // queued messages are discarded once the engine is closed
    assert_quiet(&mut started_rx, Duration::from_millis(200)).await;
}

#[tokio::test]
async fn panicking_handler_keeps_its_loop_alive() {
    init_tracing();
    let sp: SubPub<u32> = SubPub::new();
    let (tx, mut rx) = mpsc::unbounded_channel::<u32>();
    sp.subscribe(THEME, move |n: u32| {
        if n == 1 {
            panic!("cannot handle {}", n);
        }
        let _ = tx.send(n);
    })
    .await
    .unwrap();

    for n in 0..3 {
        sp.publish(THEME, n).await.unwrap();
    }
    assert_eq!(recv_n(&mut rx, 2).await, vec![0, 2]);
}

/// Subscribes a handler that waits for one release token per message and
/// fills a one-slot mailbox, then starts a publish that must wait.
async fn saturate(
    fanout: FanoutMode,
) -> (
    SubPub<u32>,
    Subscription<u32>,
    std_mpsc::Sender<()>,
    mpsc::UnboundedReceiver<u32>,
    tokio::task::JoinHandle<Result<(), SubPubError>>,
) {
    let sp = SubPub::with_config(EngineConfig {
        mailbox_capacity: 1,
        fanout,
    });
    let (started_tx, mut started_rx) = mpsc::unbounded_channel::<u32>();
    let (release_tx, release_rx) = std_mpsc::channel::<()>();
    let sub = sp
        .subscribe(THEME, move |n: u32| {
            let _ = started_tx.send(n);
            let _ = release_rx.recv();
        })
        .await
        .unwrap();

    sp.publish(THEME, 1).await.unwrap();
    assert_eq!(recv_n(&mut started_rx, 1).await, vec![1]);
    // handler is busy with 1, this fills the only slot
    sp.publish(THEME, 2).await.unwrap();

    let blocked = tokio::spawn({
        let sp = sp.clone();
        async move { sp.publish(THEME, 3).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!blocked.is_finished(), "publish into a full mailbox returned early");

    (sp, sub, release_tx, started_rx, blocked)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn full_mailbox_blocks_registry_in_serialized_mode() {
    let (sp, _sub, release_tx, mut started_rx, blocked) = saturate(FanoutMode::Serialized).await;

    let stalled = timeout(Duration::from_millis(200), sp.subscriber_count(THEME)).await;
    assert!(stalled.is_err(), "registry lock should be held by the blocked publish");

    for _ in 0..3 {
        release_tx.send(()).unwrap();
    }
    timeout(WAIT, blocked).await.unwrap().unwrap().unwrap();
    assert_eq!(recv_n(&mut started_rx, 2).await, vec![2, 3]);
    assert_eq!(sp.subscriber_count(THEME).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn full_mailbox_only_delays_publisher_in_snapshot_mode() {
    let (sp, _sub, release_tx, mut started_rx, blocked) = saturate(FanoutMode::Snapshot).await;

    let count = timeout(Duration::from_millis(200), sp.subscriber_count(THEME))
        .await
        .expect("registry lock should be free while the publish waits");
    assert_eq!(count, 1);
    assert!(!blocked.is_finished());

    for _ in 0..3 {
        release_tx.send(()).unwrap();
    }
    timeout(WAIT, blocked).await.unwrap().unwrap().unwrap();
    assert_eq!(recv_n(&mut started_rx, 2).await, vec![2, 3]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn close_releases_publisher_blocked_on_full_mailbox() {
    let (sp, _sub, release_tx, _started_rx, blocked) = saturate(FanoutMode::Snapshot).await;

    let subs = sp.subjects().await;
    assert_eq!(subs, vec![THEME.to_string()]);
    // closing stops the loop, which drops the mailbox the publisher waits on
    sp.close(None).await.unwrap();
    drop(release_tx);

    timeout(WAIT, blocked)
        .await
        .expect("publisher stayed blocked after close")
        .unwrap()
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unsubscribe_releases_publisher_blocked_in_serialized_mode() {
    let (sp, sub, release_tx, mut started_rx, blocked) = saturate(FanoutMode::Serialized).await;

    let unsubscribing = tokio::spawn(async move { sub.unsubscribe().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    // finish message 1; the loop then sees the stop signal instead of delivering 2
    release_tx.send(()).unwrap();

    timeout(WAIT, blocked)
        .await
        .expect("publisher stayed blocked after unsubscribe")
        .unwrap()
        .unwrap();
    timeout(WAIT, unsubscribing)
        .await
        .expect("unsubscribe never got the registry lock")
        .unwrap();
    assert_eq!(sp.subscriber_count(THEME).await, 0);
    assert_quiet(&mut started_rx, Duration::from_millis(100)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abandoned_unsubscribe_can_be_retried() {
    let (sp, sub, release_tx, _started_rx, blocked) = saturate(FanoutMode::Serialized).await;

    // the blocked publish holds the lock, so this gives up after raising the stop signal
    let abandoned = timeout(Duration::from_millis(50), sub.unsubscribe()).await;
    assert!(abandoned.is_err());

    let _ = release_tx.send(());
    timeout(WAIT, blocked).await.unwrap().unwrap().unwrap();

    sub.unsubscribe().await;
    assert_eq!(sp.subscriber_count(THEME).await, 0);
    assert!(sp.subjects().await.is_empty());
    assert!(matches!(
        sp.publish(THEME, 4).await,
        Err(SubPubError::NoSubscribers)
    ));
}

mod common;

use common::{Probe, init_tracing};
use observa_scheduler::{Scheduler, SchedulerExt, TaskScheduler, WorkerPriority};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[test]
fn test_concurrent_producers_single_consumer() {
    init_tracing();
    let scheduler = Arc::new(TaskScheduler::new().unwrap());
    let probe = Probe::new();
    let seen: Arc<Mutex<Vec<(usize, usize)>>> = Arc::new(Mutex::new(Vec::new()));

    let producers: Vec<_> = (0..10)
        .map(|producer| {
            let scheduler = scheduler.clone();
            let probe = probe.clone();
            let seen = seen.clone();
            thread::spawn(move || {
                for seq in 0..100 {
                    let probe = probe.clone();
                    let seen = seen.clone();
                    scheduler.schedule(Box::new(move || {
                        probe.record(producer * 100 + seq);
                        seen.lock().unwrap().push((producer, seq));
                    }));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let (done_tx, done_rx) = mpsc::channel();
    scheduler.schedule(Box::new(move || done_tx.send(()).unwrap()));
    done_rx.recv_timeout(Duration::from_secs(10)).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1000);
    assert_eq!(probe.overlaps(), 0);

    let mut log = probe.log();
    log.sort_unstable();
    assert_eq!(log, (0..1000).collect::<Vec<_>>());

    let mut next_seq: HashMap<usize, usize> = HashMap::new();
    for &(producer, seq) in seen.iter() {
        let expected = next_seq.entry(producer).or_insert(0);
        assert_eq!(seq, *expected, "producer {producer} delivered out of order");
        *expected += 1;
    }
}

#[test]
fn test_release_discards_pending_actions() {
    init_tracing();
    let scheduler = TaskScheduler::new().unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    let (started_tx, started_rx) = mpsc::channel::<()>();
    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    // Each action owns a clone; the receiver disconnects once every action
    // has either run or been dropped.
    let (alive_tx, alive_rx) = mpsc::channel::<()>();

    {
        let counter = counter.clone();
        let alive = alive_tx.clone();
        scheduler.schedule(Box::new(move || {
            let _alive = alive;
            started_tx.send(()).unwrap();
            gate_rx.recv().unwrap();
            counter.fetch_add(1, Ordering::SeqCst);
        }));
    }
    for _ in 0..2 {
        let counter = counter.clone();
        let alive = alive_tx.clone();
        scheduler.schedule(Box::new(move || {
            let _alive = alive;
            counter.fetch_add(1, Ordering::SeqCst);
        }));
    }
    drop(alive_tx);

    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    drop(scheduler);
    gate_tx.send(()).unwrap();

    assert_eq!(
        alive_rx.recv_timeout(Duration::from_secs(5)),
        Err(mpsc::RecvTimeoutError::Disconnected)
    );
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_priority_does_not_change_order() {
    for priority in [
        WorkerPriority::High,
        WorkerPriority::Medium,
        WorkerPriority::Background,
    ] {
        let scheduler = TaskScheduler::with_priority(priority).unwrap();
        let probe = Probe::new();

        for id in 0..50 {
            let p = probe.clone();
            scheduler.schedule_initial(Box::new(move || p.record(id)));
        }
        let (done_tx, done_rx) = mpsc::channel();
        scheduler.schedule(Box::new(move || done_tx.send(()).unwrap()));
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        assert_eq!(probe.log(), (0..50).collect::<Vec<_>>(), "{priority}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_runtime_producers_keep_order() {
    let scheduler = Arc::new(TaskScheduler::with_priority(WorkerPriority::Utility).unwrap());
    let probe = Probe::new();

    let producers: Vec<_> = (0..4)
        .map(|producer| {
            let scheduler = scheduler.clone();
            let probe = probe.clone();
            tokio::spawn(async move {
                for seq in 0..25 {
                    let probe = probe.clone();
                    scheduler.schedule(Box::new(move || probe.record(producer * 25 + seq)));
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();
    for producer in producers {
        producer.await.unwrap();
    }

    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    scheduler.schedule(Box::new(move || {
        let _ = done_tx.send(());
    }));
    done_rx.await.unwrap();

    let log = probe.log();
    assert_eq!(log.len(), 100);
    assert_eq!(probe.overlaps(), 0);
    for producer in 0..4 {
        let own: Vec<_> = log.iter().copied().filter(|id| id / 25 == producer).collect();
        assert_eq!(own, (producer * 25..producer * 25 + 25).collect::<Vec<_>>());
    }
}

#[test]
fn test_release_from_inside_an_action() {
    let scheduler = Arc::new(Mutex::new(Some(TaskScheduler::new().unwrap())));
    let (done_tx, done_rx) = mpsc::channel();

    let slot = scheduler.clone();
    if let Some(task) = scheduler.lock().unwrap().as_ref() {
        task.schedule(Box::new(move || {
            // Dropping the last reference on the worker itself must not hang.
            drop(slot.lock().unwrap().take());
            done_tx.send(()).unwrap();
        }));
    }

    done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(scheduler.lock().unwrap().is_none());
}

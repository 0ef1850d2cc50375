/*!
 * Blocking Queue Integration Tests
 *
 * FIFO order, wake-up semantics, timeouts, and multi-producer/multi-consumer
 * integrity
 */

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serial_test::serial;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use sync_queue::{BlockingQueue, QueueError, Timeout};

#[test]
fn test_walkthrough_scenario() {
    let queue = BlockingQueue::new();
    queue.enqueue(1);
    queue.enqueue(2);
    queue.enqueue(3);

    assert_eq!(queue.snapshot(), vec![1, 2, 3]);
    assert_eq!(queue.try_dequeue(), Some(1));
    assert_eq!(queue.try_peek(), Some(2));
    assert_eq!(queue.len(), 2);

    queue.clear();
    assert_eq!(queue.len(), 0);
    assert_eq!(queue.try_dequeue(), None);
}

#[test]
#[serial]
fn test_timeout_bounds() {
    let queue = BlockingQueue::<i32>::new();
    let start = Instant::now();

    let result = queue.wait_and_dequeue(Timeout::millis(100));

    let elapsed = start.elapsed();
    assert_eq!(result, None);
    assert!(
        elapsed >= Duration::from_millis(95),
        "Expected at least 95ms, but was {:?}",
        elapsed
    );
    assert!(
        elapsed < Duration::from_millis(200),
        "Expected less than 200ms, but was {:?}",
        elapsed
    );
}

#[test]
#[serial]
fn test_wake_on_enqueue() {
    let queue = Arc::new(BlockingQueue::new());
    let queue_clone = queue.clone();

    let handle = thread::spawn(move || {
        let result = queue_clone.wait_and_dequeue(Timeout::millis(1000));
        (result, Instant::now())
    });

    // Give thread time to park
    thread::sleep(Duration::from_millis(50));
    assert_eq!(queue.waiter_count(), 1);
    let enqueued_at = Instant::now();
    queue.enqueue(42);

    let (result, woke_at) = handle.join().unwrap();
    assert_eq!(result, Some(42));
    // Latency from the enqueue itself, far below the 1s timeout
    let latency = woke_at.saturating_duration_since(enqueued_at);
    assert!(latency < Duration::from_millis(100), "woke {:?} after enqueue", latency);
}

#[test]
fn test_enqueue_before_wait_is_not_lost() {
    let queue = Arc::new(BlockingQueue::new());

    // Enqueue before anyone is waiting: the element itself is the signal
    queue.enqueue(777);

    let queue_clone = queue.clone();
    let handle = thread::spawn(move || queue_clone.wait_and_dequeue(Timeout::millis(50)));

    assert_eq!(handle.join().unwrap(), Some(777));
}

#[test]
fn test_infinite_sentinel_waits_for_item() {
    let timeout = Timeout::from_millis(Timeout::INFINITE_MILLIS).unwrap();
    assert!(timeout.is_infinite());

    let queue = Arc::new(BlockingQueue::new());
    let queue_clone = queue.clone();
    let handle = thread::spawn(move || queue_clone.wait_and_dequeue(timeout));

    thread::sleep(Duration::from_millis(150));
    assert!(!handle.is_finished());

    queue.enqueue("late");
    assert_eq!(handle.join().unwrap(), Some("late"));
}

#[test]
fn test_invalid_negative_timeout_rejected() {
    assert_eq!(Timeout::from_millis(-5), Err(QueueError::InvalidTimeout(-5)));
}

#[test]
#[serial]
fn test_broadcast_with_fewer_items_than_waiters() {
    let queue = Arc::new(BlockingQueue::<u32>::new());

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let queue_clone = queue.clone();
            thread::spawn(move || queue_clone.wait_and_dequeue(Timeout::millis(300)))
        })
        .collect();

    // Give threads time to wait
    thread::sleep(Duration::from_millis(50));
    queue.enqueue(1);

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_some()).count();

    // Exactly one waiter wins; the losers re-park and time out
    assert_eq!(winners, 1);
    assert_eq!(queue.stats().timeouts, 2);
    assert_eq!(queue.len(), 0);
}

#[test]
#[serial]
fn test_wakeups_do_not_extend_deadline() {
    let queue = Arc::new(BlockingQueue::<u32>::new());
    let stop = Arc::new(AtomicBool::new(false));

    // Keep broadcasting while stealing each element straight back
    let churn = {
        let queue = queue.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                queue.enqueue(0);
                queue.try_dequeue();
                thread::sleep(Duration::from_millis(5));
            }
        })
    };

    let start = Instant::now();
    let result = queue.wait_and_dequeue(Timeout::millis(200));
    let elapsed = start.elapsed();

    stop.store(true, Ordering::Relaxed);
    churn.join().unwrap();

    // Either the waiter won an element early, or it gave up near its deadline
    if result.is_none() {
        assert!(elapsed >= Duration::from_millis(195), "gave up after {:?}", elapsed);
    }
    assert!(elapsed < Duration::from_millis(400), "waited {:?}", elapsed);
}

#[test]
fn test_no_loss_no_duplication() {
    const PRODUCERS: usize = 4;
    const CONSUMERS: usize = 4;
    const ITEMS_PER_PRODUCER: usize = 250;
    const TOTAL: usize = PRODUCERS * ITEMS_PER_PRODUCER;

    let queue = Arc::new(BlockingQueue::new());
    let consumed = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..ITEMS_PER_PRODUCER {
                    queue.enqueue(p * ITEMS_PER_PRODUCER + i);
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|c| {
            let queue = queue.clone();
            let consumed = consumed.clone();
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(c as u64);
                let mut mine = Vec::new();
                while consumed.load(Ordering::SeqCst) < TOTAL {
                    // Mix non-blocking and timed consumption
                    let item = if rng.gen_bool(0.5) {
                        queue.try_dequeue()
                    } else {
                        queue.wait_and_dequeue(Timeout::millis(10))
                    };
                    if let Some(item) = item {
                        consumed.fetch_add(1, Ordering::SeqCst);
                        mine.push(item);
                    } else {
                        thread::yield_now();
                    }
                }
                mine
            })
        })
        .collect();

    for handle in producers {
        handle.join().unwrap();
    }
    let mut all: Vec<usize> = consumers
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    all.sort_unstable();

    assert_eq!(all, (0..TOTAL).collect::<Vec<_>>());
    assert_eq!(queue.len(), 0);

    let stats = queue.stats();
    assert_eq!(stats.enqueued, TOTAL as u64);
    assert_eq!(stats.dequeued, TOTAL as u64);
}

#[test]
fn test_per_producer_order_preserved() {
    let queue = Arc::new(BlockingQueue::new());

    let producers: Vec<_> = (0..3)
        .map(|p| {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    queue.enqueue((p, i));
                }
            })
        })
        .collect();
    for handle in producers {
        handle.join().unwrap();
    }

    // Interleaving across producers is arbitrary, but each producer's
    // elements leave in the order it enqueued them
    let mut last = [None; 3];
    while let Some((p, i)) = queue.try_dequeue() {
        if let Some(prev) = last[p] {
            assert!(i > prev, "producer {} out of order: {} after {}", p, i, prev);
        }
        last[p] = Some(i);
    }
    assert_eq!(last, [Some(99); 3]);
}

#[test]
fn test_snapshot_is_detached() {
    let queue = BlockingQueue::new();
    queue.enqueue(String::from("a"));
    queue.enqueue(String::from("b"));

    let snapshot = queue.snapshot();
    queue.enqueue(String::from("c"));
    queue.try_dequeue();

    assert_eq!(snapshot, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(queue.snapshot(), vec!["b".to_string(), "c".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_wait_wakes_on_enqueue() {
    let queue = Arc::new(BlockingQueue::new());

    let waiter = tokio::spawn(queue.clone().wait_and_dequeue_async(Timeout::millis(1000)));

    tokio::time::sleep(Duration::from_millis(50)).await;
    queue.enqueue(5u32);

    assert_eq!(waiter.await.unwrap(), Ok(Some(5)));
}

#[tokio::test]
async fn test_async_wait_times_out() {
    let queue = Arc::new(BlockingQueue::<u32>::new());
    let result = queue.clone().wait_and_dequeue_async(Timeout::millis(20)).await;
    assert_eq!(result, Ok(None));
    assert_eq!(queue.stats().timeouts, 1);
}

proptest! {
    #[test]
    fn prop_fifo_order(items in proptest::collection::vec(any::<i32>(), 0..200)) {
        let queue = BlockingQueue::new();
        for item in &items {
            queue.enqueue(*item);
        }
        prop_assert_eq!(queue.snapshot(), items.clone());

        let drained: Vec<i32> = std::iter::from_fn(|| queue.try_dequeue()).collect();
        prop_assert_eq!(drained, items);
        prop_assert!(queue.is_empty());
    }

    #[test]
    fn prop_count_tracks_operations(
        ops in proptest::collection::vec(0u8..4, 0..300)
    ) {
        let queue = BlockingQueue::new();
        let mut model = std::collections::VecDeque::new();

        for (i, op) in ops.into_iter().enumerate() {
            match op {
                0 | 1 => {
                    queue.enqueue(i);
                    model.push_back(i);
                }
                2 => prop_assert_eq!(queue.try_dequeue(), model.pop_front()),
                _ => prop_assert_eq!(queue.try_peek(), model.front().copied()),
            }
            prop_assert_eq!(queue.len(), model.len());
        }
    }
}

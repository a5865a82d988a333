//! Cross-thread behaviour: blocking calls, close wake-ups, fairness, and
//! the scenario drivers.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use mq_scenarios::{
    decode_sequence, verify_backpressure, verify_burst, verify_flood, ConsumerEngine,
    ProducerEngine, ScenarioKind, ScenarioLog, ScenarioRecord, ScenarioRunner, TransportHandle,
};
use mq_wiring::{ExchangeSpec, QueueId, QueueSpec, Style, Transport, WiringError};

use crate::support::{open_transport, send_seq, seq_message};

const WAKE_BOUND: Duration = Duration::from_secs(5);

/// 10,000 load-balanced sends over three admitting queues split evenly.
#[test]
fn load_balancing_spreads_evenly() {
    let (transport, _dir) = open_transport();
    let exchange = transport
        .create_exchange("E", ExchangeSpec::local(Style::LoadBalancing))
        .unwrap();
    let queues: Vec<QueueId> = ["A", "B", "C"]
        .iter()
        .map(|name| {
            let id = transport.create_queue(name, QueueSpec::local()).unwrap();
            transport.bind("E", name, None, None).unwrap();
            id
        })
        .collect();

    for seq in 0..10_000 {
        assert!(send_seq(&transport, exchange, seq));
    }
    let counts: Vec<u64> = queues
        .iter()
        .map(|queue| transport.queue_stats(*queue).unwrap().volume)
        .collect();
    assert_eq!(counts.iter().sum::<u64>(), 10_000);
    for count in &counts {
        assert!(
            count.abs_diff(3_333) <= 1,
            "uneven split across queues: {counts:?}"
        );
    }
}

/// A receive parked on an empty queue returns `Closed` once the transport closes.
#[test]
fn close_wakes_blocked_receive() {
    let (transport, _dir) = open_transport();
    let queue = transport.create_queue("Q", QueueSpec::local()).unwrap();

    let (tx, rx) = mpsc::channel();
    let receiver = transport.clone();
    thread::spawn(move || {
        let _ = tx.send(receiver.receive(queue, true));
    });
    thread::sleep(Duration::from_millis(50));
    transport.close();

    let outcome = rx.recv_timeout(WAKE_BOUND).expect("receiver woke up");
    assert!(matches!(outcome, Err(WiringError::Closed)));
}

/// Closing also releases senders parked on a full queue and `receive_any` callers.
#[test]
fn close_wakes_blocked_send_and_receive_any() {
    let (transport, _dir) = open_transport();
    let exchange = transport
        .create_exchange("E", ExchangeSpec::local(Style::DataDistribution))
        .unwrap();
    transport
        .create_queue("full", QueueSpec::local().watermarks(1, 0))
        .unwrap();
    transport.bind("E", "full", None, None).unwrap();
    assert!(send_seq(&transport, exchange, 0));

    let (tx, rx) = mpsc::channel();
    let sender = transport.clone();
    let send_tx = tx.clone();
    thread::spawn(move || {
        let _ = send_tx.send(sender.send(exchange, seq_message(1), true).map(|_| ()));
    });
    let waiter = transport.clone();
    thread::spawn(move || {
        let _ = tx.send(waiter.receive_any(true).map(|_| ()));
    });
    thread::sleep(Duration::from_millis(50));
    transport.close();

    for _ in 0..2 {
        let outcome = rx.recv_timeout(WAKE_BOUND).expect("blocked call woke up");
        assert!(matches!(outcome, Err(WiringError::Closed)));
    }
}

/// A blocking send on a full queue completes once receives reach the low watermark.
#[test]
fn blocking_send_resumes_after_drain() {
    let (transport, _dir) = open_transport();
    let exchange = transport
        .create_exchange("E", ExchangeSpec::local(Style::LoadBalancing))
        .unwrap();
    let queue = transport
        .create_queue("Q", QueueSpec::local().watermarks(2, 0))
        .unwrap();
    transport.bind("E", "Q", None, None).unwrap();
    assert!(send_seq(&transport, exchange, 0));
    assert!(send_seq(&transport, exchange, 1));

    let sender = {
        let transport = transport.clone();
        thread::spawn(move || transport.send(exchange, seq_message(2), true))
    };
    thread::sleep(Duration::from_millis(50));
    assert!(!sender.is_finished());

    for expected in 0..2 {
        let received = transport.receive(queue, false).unwrap().unwrap();
        assert_eq!(decode_sequence(received.message.payload()), Some(expected));
    }
    assert!(sender.join().unwrap().unwrap());
    let received = transport.receive(queue, true).unwrap().unwrap();
    assert_eq!(decode_sequence(received.message.payload()), Some(2));
}

/// With every load-balanced queue full, a blocking send completes as soon as
/// any one of them drains, even when it is not the next in rotation.
#[test]
fn blocking_balance_waits_for_any_queue() {
    let (transport, _dir) = open_transport();
    let exchange = transport
        .create_exchange("E", ExchangeSpec::local(Style::LoadBalancing))
        .unwrap();
    let queues: Vec<QueueId> = ["A", "B", "C"]
        .iter()
        .map(|name| {
            let id = transport
                .create_queue(name, QueueSpec::local().watermarks(1, 0))
                .unwrap();
            transport.bind("E", name, None, None).unwrap();
            id
        })
        .collect();
    for seq in 0..3 {
        assert!(send_seq(&transport, exchange, seq));
    }
    assert!(!send_seq(&transport, exchange, 3));

    let (tx, rx) = mpsc::channel();
    let sender = transport.clone();
    thread::spawn(move || {
        let _ = tx.send(sender.send(exchange, seq_message(4), true));
    });
    thread::sleep(Duration::from_millis(50));
    assert!(rx.try_recv().is_err(), "send returned while every queue was full");

    // Only the last queue gets a consumer.
    let received = transport.receive(queues[2], true).unwrap().unwrap();
    assert_eq!(decode_sequence(received.message.payload()), Some(2));
    let outcome = rx.recv_timeout(WAKE_BOUND).expect("sender woke up");
    assert!(outcome.unwrap());

    let received = transport.receive(queues[2], false).unwrap().unwrap();
    assert_eq!(decode_sequence(received.message.payload()), Some(4));
    for queue in &queues[..2] {
        assert_eq!(transport.queue_stats(*queue).unwrap().volume, 1);
    }
}

/// `receive_any` parks until a message arrives on any queue.
#[test]
fn receive_any_waits_for_arrival() {
    let (transport, _dir) = open_transport();
    let exchange = transport
        .create_exchange("E", ExchangeSpec::local(Style::DataDistribution))
        .unwrap();
    transport.create_queue("A", QueueSpec::local()).unwrap();
    let b = transport.create_queue("B", QueueSpec::local()).unwrap();

    let waiter = {
        let transport = transport.clone();
        thread::spawn(move || transport.receive_any(true))
    };
    thread::sleep(Duration::from_millis(50));
    transport.bind("E", "B", None, None).unwrap();
    assert!(send_seq(&transport, exchange, 7));

    let received = waiter.join().unwrap().unwrap().unwrap();
    assert_eq!(received.queue, b);
    assert_eq!(decode_sequence(received.message.payload()), Some(7));
}

/// Runs `kind` through a load-balanced exchange into one queue built from
/// `queue`, stepping producer and consumer on this thread.
fn run_scenario(
    transport: &Transport,
    queue: QueueSpec,
    kind: ScenarioKind,
) -> (ScenarioRecord, QueueId) {
    let exchange = transport
        .create_exchange("E", ExchangeSpec::local(Style::LoadBalancing))
        .unwrap();
    let queue = transport.create_queue("Q", queue).unwrap();
    transport.bind("E", "Q", None, None).unwrap();

    let log = ScenarioLog::new();
    let mut runner = ScenarioRunner::new();
    runner
        .push(ProducerEngine::new(
            TransportHandle::new(transport.clone(), exchange),
            kind,
            log.clone(),
        ))
        .push(ConsumerEngine::new(
            transport.clone(),
            queue,
            kind.total_messages(),
            log.clone(),
        ));
    let summary = runner.run();
    assert!(!summary.stalled, "{} scenario stalled: {summary:?}", kind.label());
    (log.snapshot(), queue)
}

#[test]
fn flood_scenario_delivers_in_order() {
    let (transport, _dir) = open_transport();
    let kind = ScenarioKind::Flood { messages: 1_000 };
    let (record, _) = run_scenario(&transport, QueueSpec::local(), kind);
    verify_flood(&record, kind.total_messages()).unwrap();
}

#[test]
fn burst_scenario_stays_within_depth_budget() {
    let (transport, _dir) = open_transport();
    let kind = ScenarioKind::Burst {
        bursts: 8,
        burst_size: 16,
    };
    let (record, _) = run_scenario(&transport, QueueSpec::local().watermarks(16, 4), kind);
    verify_burst(&record, kind.total_messages(), 16).unwrap();
}

#[test]
fn backpressure_scenario_retries_until_drained() {
    let (transport, _dir) = open_transport();
    let kind = ScenarioKind::Backpressure { messages: 500 };
    let (record, queue) = run_scenario(&transport, QueueSpec::local().watermarks(8, 2), kind);
    verify_backpressure(&record, kind.total_messages()).unwrap();
    assert!(record.max_depth <= 8);
    assert!(transport.queue_stats(queue).unwrap().rejected > 0);
}

/// A closed transport halts both stages instead of stalling the run.
#[test]
fn closed_transport_ends_scenario() {
    let (transport, _dir) = open_transport();
    let exchange = transport
        .create_exchange("E", ExchangeSpec::local(Style::LoadBalancing))
        .unwrap();
    let queue = transport.create_queue("Q", QueueSpec::local()).unwrap();
    transport.bind("E", "Q", None, None).unwrap();
    transport.close();

    let log = ScenarioLog::new();
    let producer = ProducerEngine::new(
        TransportHandle::new(transport.clone(), exchange),
        ScenarioKind::Flood { messages: 10 },
        log.clone(),
    );
    let consumer = ConsumerEngine::new(transport.clone(), queue, 10, log.clone());
    let mut runner = ScenarioRunner::new().idle_limit(100);
    runner.push(producer).push(consumer);
    let summary = runner.run();

    assert!(!summary.stalled);
    assert_eq!(summary.moved, 0);
    assert_eq!(log.snapshot().produced, 0);
}

/// Several producers and consumers share a swapping queue without loss or
/// per-producer reordering.
#[test]
#[ignore]
fn slow_concurrent_producers_and_consumers() {
    const PRODUCERS: u32 = 4;
    const PER_PRODUCER: u32 = 20_000;

    let (transport, _dir) = open_transport();
    let exchange = transport
        .create_exchange("E", ExchangeSpec::local(Style::DataDistribution))
        .unwrap();
    let queue = transport
        .create_queue("Q", QueueSpec::local().watermarks(64, 16).swap(4_096))
        .unwrap();
    transport.bind("E", "Q", None, None).unwrap();

    let total = (PRODUCERS * PER_PRODUCER) as usize;
    let consumers: Vec<_> = (0..2)
        .map(|_| {
            let transport = transport.clone();
            thread::spawn(move || {
                let mut seen = Vec::new();
                while let Ok(Some(received)) = transport.receive(queue, true) {
                    seen.push(decode_sequence(received.message.payload()).unwrap());
                }
                seen
            })
        })
        .collect();

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let transport = transport.clone();
            thread::spawn(move || {
                for n in 0..PER_PRODUCER {
                    let seq = producer * PER_PRODUCER + n;
                    assert!(transport.send(exchange, seq_message(seq), true).unwrap());
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    while transport.queue_stats(queue).unwrap().delivered < total as u64 {
        thread::sleep(Duration::from_millis(5));
    }
    transport.close();

    let mut all: Vec<Vec<u32>> = consumers.into_iter().map(|c| c.join().unwrap()).collect();
    assert_eq!(all.iter().map(Vec::len).sum::<usize>(), total);
    for seen in &all {
        for producer in 0..PRODUCERS {
            let range = producer * PER_PRODUCER..(producer + 1) * PER_PRODUCER;
            let mine: Vec<u32> = seen.iter().copied().filter(|s| range.contains(s)).collect();
            assert!(mine.windows(2).all(|w| w[0] < w[1]), "producer {producer} reordered");
        }
    }
    let mut merged: Vec<u32> = all.drain(..).flatten().collect();
    merged.sort_unstable();
    assert_eq!(merged, (0..total as u32).collect::<Vec<_>>());
}

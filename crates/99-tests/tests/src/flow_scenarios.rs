//! Single-threaded flow-control scenarios driven through the public transport API.

use mq_wiring::{
    ExchangeId, ExchangeSpec, FlowState, Message, MessageMask, MessageType, QueueId, QueueSpec,
    Style, Transport,
};

use crate::support::{drain, open_transport, send_seq};

fn single_route(transport: &Transport, style: Style, queue: QueueSpec) -> (ExchangeId, QueueId) {
    let exchange = transport
        .create_exchange("E", ExchangeSpec::local(style))
        .unwrap();
    let queue = transport.create_queue("Q", queue).unwrap();
    transport.bind("E", "Q", None, None).unwrap();
    (exchange, queue)
}

/// hwm=10, lwm=2, no swap: ten sends land, the next five are refused, and
/// admission only resumes once receives drain the queue to two.
#[test]
fn watermark_scenario_refuses_until_low_watermark() {
    let (transport, _dir) = open_transport();
    let (exchange, queue) = single_route(
        &transport,
        Style::LoadBalancing,
        QueueSpec::local().watermarks(10, 2),
    );

    let outcomes: Vec<bool> = (0..15).map(|seq| send_seq(&transport, exchange, seq)).collect();
    assert_eq!(&outcomes[..10], &[true; 10]);
    assert_eq!(&outcomes[10..], &[false; 5]);
    assert_eq!(transport.queue_stats(queue).unwrap().rejected, 5);

    let mut received = Vec::new();
    for _ in 0..7 {
        received.push(transport.receive(queue, false).unwrap().unwrap());
        assert!(
            !send_seq(&transport, exchange, 100),
            "admission resumed above the low watermark"
        );
    }
    received.push(transport.receive(queue, false).unwrap().unwrap());
    let stats = transport.queue_stats(queue).unwrap();
    assert_eq!(stats.volume, 2);
    assert_eq!(stats.state, FlowState::Admitting);
    assert!(send_seq(&transport, exchange, 10));

    assert_eq!(drain(&transport, queue), vec![8, 9, 10]);
}

/// hwm=5 with 100 bytes of swap: the three overflow messages are kept in
/// swap and all eight come back in send order.
#[test]
fn swap_scenario_keeps_overflow_in_order() {
    let (transport, _dir) = open_transport();
    let (exchange, queue) = single_route(
        &transport,
        Style::DataDistribution,
        QueueSpec::local().watermarks(5, 1).swap(100),
    );

    for seq in 0..8 {
        assert!(send_seq(&transport, exchange, seq), "send {seq} refused");
    }
    let stats = transport.queue_stats(queue).unwrap();
    assert_eq!(stats.swapped, 3);
    assert_eq!(stats.volume, 8);
    assert!(stats.swapped_bytes > 0);

    assert_eq!(drain(&transport, queue), (0..8).collect::<Vec<_>>());
    assert_eq!(transport.queue_stats(queue).unwrap().swapped_bytes, 0);
}

/// Volume never exceeds what memory and swap can hold together.
#[test]
fn volume_stays_within_memory_and_swap() {
    let (transport, _dir) = open_transport();
    // Each 4-byte record takes 16 bytes of swap, so 64 bytes hold four.
    let (exchange, queue) = single_route(
        &transport,
        Style::DataDistribution,
        QueueSpec::local().watermarks(5, 0).swap(64),
    );

    let accepted = (0..20).filter(|seq| send_seq(&transport, exchange, *seq)).count();
    let stats = transport.queue_stats(queue).unwrap();
    assert_eq!(accepted, 9);
    assert_eq!(stats.volume, 9);
    assert_eq!(stats.state, FlowState::Blocked);
    assert!(stats.volume <= 5 + 64);
    assert_eq!(drain(&transport, queue), (0..9).collect::<Vec<_>>());
}

/// Dipping between the watermarks and refilling does not reopen admission.
#[test]
fn hysteresis_does_not_flap() {
    let (transport, _dir) = open_transport();
    let (exchange, queue) = single_route(
        &transport,
        Style::DataDistribution,
        QueueSpec::local().watermarks(4, 1),
    );
    for seq in 0..4 {
        assert!(send_seq(&transport, exchange, seq));
    }

    transport.receive(queue, false).unwrap().unwrap();
    transport.receive(queue, false).unwrap().unwrap();
    assert_eq!(transport.queue_stats(queue).unwrap().volume, 2);
    assert!(!send_seq(&transport, exchange, 4));

    transport.receive(queue, false).unwrap().unwrap();
    assert!(send_seq(&transport, exchange, 4));
    assert!(send_seq(&transport, exchange, 5));
    assert_eq!(drain(&transport, queue), vec![3, 4, 5]);
}

/// With the data-only mask, gaps are consumed silently and data stays in order.
#[test]
fn data_only_mask_skips_gaps() {
    let (transport, _dir) = open_transport();
    let (exchange, queue) =
        single_route(&transport, Style::DataDistribution, QueueSpec::local());
    transport.mask(MessageMask::DATA_ONLY).unwrap();

    for seq in 0..6 {
        send_seq(&transport, exchange, seq);
        if seq % 2 == 0 {
            transport.send(exchange, Message::gap(), false).unwrap();
        }
    }
    assert_eq!(drain(&transport, queue), (0..6).collect::<Vec<_>>());
    assert_eq!(transport.queue_stats(queue).unwrap().masked, 3);

    transport.mask(MessageMask::ALL).unwrap();
    transport.send(exchange, Message::gap(), false).unwrap();
    let received = transport.receive(queue, false).unwrap().unwrap();
    assert_eq!(received.message.kind(), MessageType::Gap);
}

/// Every queue bound to a distribution exchange sees the full sequence.
#[test]
fn distribution_copies_to_every_queue() {
    let (transport, _dir) = open_transport();
    let exchange = transport
        .create_exchange("E", ExchangeSpec::local(Style::DataDistribution))
        .unwrap();
    let queues: Vec<_> = ["A", "B", "C"]
        .iter()
        .map(|name| {
            let id = transport.create_queue(name, QueueSpec::local()).unwrap();
            transport.bind("E", name, None, None).unwrap();
            id
        })
        .collect();

    for seq in 0..50 {
        assert!(send_seq(&transport, exchange, seq));
    }
    for queue in queues {
        assert_eq!(drain(&transport, queue), (0..50).collect::<Vec<_>>());
        assert_eq!(transport.sources(queue).unwrap(), vec![exchange]);
    }
}

/// A queue fed by two exchanges keeps each exchange's messages in order.
#[test]
fn fan_in_preserves_per_source_order() {
    let (transport, _dir) = open_transport();
    let left = transport
        .create_exchange("L", ExchangeSpec::local(Style::DataDistribution))
        .unwrap();
    let right = transport
        .create_exchange("R", ExchangeSpec::local(Style::LoadBalancing))
        .unwrap();
    let queue = transport.create_queue("Q", QueueSpec::local()).unwrap();
    transport.bind("L", "Q", None, None).unwrap();
    transport.bind("R", "Q", None, None).unwrap();

    for seq in 0..20 {
        let exchange = if seq % 3 == 0 { right } else { left };
        assert!(send_seq(&transport, exchange, seq));
    }

    let mut from_left = Vec::new();
    let mut from_right = Vec::new();
    while let Some(received) = transport.receive(queue, false).unwrap() {
        let seq = mq_scenarios::decode_sequence(received.message.payload()).unwrap();
        if received.exchange == left {
            from_left.push(seq);
        } else {
            assert_eq!(received.exchange, right);
            from_right.push(seq);
        }
    }
    assert_eq!(from_right, (0..20).filter(|s| s % 3 == 0).collect::<Vec<_>>());
    assert_eq!(from_left, (0..20).filter(|s| s % 3 != 0).collect::<Vec<_>>());
}

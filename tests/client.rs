//! End-to-end tests against a scripted in-process broker.

mod common;

use common::BrokerConn;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use warren::proto::{self, Method};
use warren::{
    AmqpProperties, ConnectionOptions, ConsumerOptions, Error, ExchangeDeclareOptions,
    ExchangeType, FieldTable, QueueDeclareOptions, QueueDeleteOptions,
};

fn expect_publish(broker: &mut BrokerConn, channel_id: u16) -> (proto::BasicPublish, Vec<u8>) {
    match broker.expect_method() {
        (ch, Method::BasicPublish(publish)) => {
            assert_eq!(ch, channel_id);
            let (_, body, _) = broker.read_content(channel_id);
            (publish, body)
        }
        other => panic!("broker expected basic.publish, got {:?}", other),
    }
}

#[test]
fn declare_publish_get() {
    let (mut connection, broker) = common::start(|mut broker| {
        broker.handshake();
        let ch = broker.expect_channel_open();

        match broker.expect_method() {
            (_, Method::QueueDeclare(declare)) => {
                assert_eq!(declare.queue, "");
                // server-named queues are forced exclusive transients
                assert!(!declare.durable);
                assert!(declare.exclusive);
                assert!(declare.auto_delete);
                broker.send_method(
                    ch,
                    Method::QueueDeclareOk(proto::QueueDeclareOk {
                        queue: "amq.gen-test".to_string(),
                        message_count: 0,
                        consumer_count: 0,
                    }),
                );
            }
            other => panic!("broker expected queue.declare, got {:?}", other),
        }

        let (publish, body) = expect_publish(&mut broker, ch);
        assert_eq!(publish.exchange, "");
        assert_eq!(publish.routing_key, "amq.gen-test");
        assert_eq!(body, b"hello");

        match broker.expect_method() {
            (_, Method::BasicGet(get)) => {
                assert_eq!(get.queue, "amq.gen-test");
                assert!(get.no_ack);
                broker.send_content(
                    ch,
                    Method::BasicGetOk(proto::BasicGetOk {
                        delivery_tag: 1,
                        redelivered: false,
                        exchange: String::new(),
                        routing_key: "amq.gen-test".to_string(),
                        message_count: 0,
                    }),
                    &AmqpProperties::default(),
                    b"hello",
                    131_072,
                );
            }
            other => panic!("broker expected basic.get, got {:?}", other),
        }

        broker.expect_close();
    });

    let channel = connection.open_channel(None).unwrap();
    let queue = channel
        .queue_declare("", QueueDeclareOptions::default())
        .unwrap();
    assert_eq!(queue.name(), "amq.gen-test");
    assert_eq!(queue.declared_message_count(), Some(0));
    assert_eq!(queue.declared_consumer_count(), Some(0));

    channel
        .basic_publish("hello", "", queue.name(), false, &AmqpProperties::default())
        .unwrap();

    let get = channel.basic_get(queue.name(), true).unwrap().unwrap();
    assert_eq!(get.delivery.content, b"hello");
    assert_eq!(get.delivery.exchange, "");
    assert_eq!(get.delivery.routing_key, "amq.gen-test");
    assert!(!get.delivery.redelivered);
    assert_eq!(get.message_count, 0);

    drop(queue);
    connection.close().unwrap();
    broker.join().unwrap();
}

#[test]
fn large_body_chunks_at_negotiated_frame_max() {
    let content: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    let expected = content.clone();

    let (mut connection, broker) = common::start(move |mut broker| {
        broker.handshake_with(2047, 4096, 0);
        let ch = broker.expect_channel_open();

        match broker.expect_method() {
            (_, Method::BasicPublish(_)) => {
                let (header, body, frame_sizes) = broker.read_content(ch);
                assert_eq!(header.body_size, 10_000);
                assert_eq!(frame_sizes, vec![4088, 4088, 1824]);
                assert_eq!(body, expected);

                match broker.expect_method() {
                    (_, Method::BasicGet(_)) => broker.send_content(
                        ch,
                        Method::BasicGetOk(proto::BasicGetOk {
                            delivery_tag: 1,
                            redelivered: false,
                            exchange: String::new(),
                            routing_key: "big".to_string(),
                            message_count: 0,
                        }),
                        &AmqpProperties::default(),
                        &body,
                        4096,
                    ),
                    other => panic!("broker expected basic.get, got {:?}", other),
                }
            }
            other => panic!("broker expected basic.publish, got {:?}", other),
        }

        broker.expect_close();
    });

    assert_eq!(connection.frame_max(), 4096);
    let channel = connection.open_channel(None).unwrap();
    channel
        .basic_publish(&content, "", "big", false, &AmqpProperties::default())
        .unwrap();
    let get = channel.basic_get("big", true).unwrap().unwrap();
    assert_eq!(get.delivery.content, content);

    connection.close().unwrap();
    broker.join().unwrap();
}

#[test]
fn confirm_multiple_ack_drains_and_wakes_waiter() {
    let (mut connection, broker) = common::start(|mut broker| {
        broker.handshake();
        let ch = broker.expect_channel_open();

        match broker.expect_method() {
            (_, Method::ConfirmSelect(select)) => {
                assert!(!select.nowait);
                broker.send_method(ch, Method::ConfirmSelectOk);
            }
            other => panic!("broker expected confirm.select, got {:?}", other),
        }
        for _ in 0..3 {
            expect_publish(&mut broker, ch);
        }
        broker.send_method(
            ch,
            Method::BasicAck(proto::BasicAck {
                delivery_tag: 3,
                multiple: true,
            }),
        );
        broker.expect_close();
    });

    let channel = connection.open_channel(None).unwrap();
    channel.confirm_select(false).unwrap();
    for body in ["a", "b", "c"] {
        channel
            .basic_publish(body, "", "q", false, &AmqpProperties::default())
            .unwrap();
    }
    assert!(channel.wait_for_confirms().unwrap());
    // nothing outstanding: returns immediately
    assert!(channel.wait_for_confirms().unwrap());

    connection.close().unwrap();
    broker.join().unwrap();
}

#[test]
fn nack_in_drain_window_returns_false_then_resets() {
    let (mut connection, broker) = common::start(|mut broker| {
        broker.handshake();
        let ch = broker.expect_channel_open();

        match broker.expect_method() {
            (_, Method::ConfirmSelect(_)) => broker.send_method(ch, Method::ConfirmSelectOk),
            other => panic!("broker expected confirm.select, got {:?}", other),
        }
        for _ in 0..2 {
            expect_publish(&mut broker, ch);
        }
        broker.send_method(
            ch,
            Method::BasicNack(proto::BasicNack {
                delivery_tag: 1,
                multiple: false,
                requeue: false,
            }),
        );
        // give the client time to block in wait_for_confirms before the
        // drain-completing ack
        thread::sleep(Duration::from_millis(500));
        broker.send_method(
            ch,
            Method::BasicAck(proto::BasicAck {
                delivery_tag: 2,
                multiple: false,
            }),
        );

        expect_publish(&mut broker, ch);
        broker.send_method(
            ch,
            Method::BasicAck(proto::BasicAck {
                delivery_tag: 3,
                multiple: false,
            }),
        );
        broker.expect_close();
    });

    let channel = connection.open_channel(None).unwrap();
    channel.confirm_select(false).unwrap();
    for body in ["a", "b"] {
        channel
            .basic_publish(body, "", "q", false, &AmqpProperties::default())
            .unwrap();
    }
    assert!(!channel.wait_for_confirms().unwrap());

    // the nack verdict does not leak into the next drain window
    assert!(channel
        .basic_publish_confirm("c", "", "q", false, &AmqpProperties::default())
        .unwrap());

    connection.close().unwrap();
    broker.join().unwrap();
}

#[test]
fn channel_close_while_waiting_for_confirms() {
    let (mut connection, broker) = common::start(|mut broker| {
        broker.handshake();
        let ch = broker.expect_channel_open();

        match broker.expect_method() {
            (_, Method::ConfirmSelect(_)) => broker.send_method(ch, Method::ConfirmSelectOk),
            other => panic!("broker expected confirm.select, got {:?}", other),
        }
        for _ in 0..3 {
            let (publish, _) = expect_publish(&mut broker, ch);
            assert_eq!(publish.exchange, "missing");
            assert!(publish.mandatory);
        }
        broker.send_method(
            ch,
            Method::ChannelClose(proto::ChannelClose {
                reply_code: 404,
                reply_text: "NOT_FOUND - no exchange 'missing'".to_string(),
                class_id: proto::CLASS_BASIC,
                method_id: 40,
            }),
        );
        // the reader acknowledges the close on the caller's behalf
        match broker.expect_method() {
            (c, Method::ChannelCloseOk) => assert_eq!(c, ch),
            other => panic!("broker expected channel.close-ok, got {:?}", other),
        }
        broker.expect_close();
    });

    let channel = connection.open_channel(None).unwrap();
    channel.confirm_select(false).unwrap();
    for _ in 0..3 {
        channel
            .basic_publish("payload", "missing", "rk", true, &AmqpProperties::default())
            .unwrap();
    }
    match channel.wait_for_confirms() {
        Err(Error::ServerClosedChannel { code: 404, .. }) => (),
        other => panic!("unexpected result {:?}", other),
    }

    connection.close().unwrap();
    broker.join().unwrap();
}

#[test]
fn server_channel_close_fails_pending_declare() {
    let (mut connection, broker) = common::start(|mut broker| {
        broker.handshake();
        let ch = broker.expect_channel_open();

        match broker.expect_method() {
            (_, Method::QueueDeclare(_)) => broker.send_method(
                ch,
                Method::ChannelClose(proto::ChannelClose {
                    reply_code: proto::PRECONDITION_FAILED,
                    reply_text: "PRECONDITION_FAILED - durable mismatch".to_string(),
                    class_id: 50,
                    method_id: 10,
                }),
            ),
            other => panic!("broker expected queue.declare, got {:?}", other),
        }
        match broker.expect_method() {
            (c, Method::ChannelCloseOk) => assert_eq!(c, ch),
            other => panic!("broker expected channel.close-ok, got {:?}", other),
        }
        broker.expect_close();
    });

    let channel = connection.open_channel(None).unwrap();
    let options = QueueDeclareOptions {
        durable: true,
        ..QueueDeclareOptions::default()
    };
    match channel.queue_declare("q", options) {
        Err(Error::ServerClosedChannel { code: 406, .. }) => (),
        other => panic!("unexpected result {:?}", other),
    }
    // the channel is closed; later operations fail with the recorded reason
    match channel.queue_purge("q") {
        Err(Error::ServerClosedChannel { code: 406, .. }) => (),
        other => panic!("unexpected result {:?}", other),
    }

    connection.close().unwrap();
    broker.join().unwrap();
}

#[test]
fn unexpected_reply_raises_and_closes_channel() {
    let (mut connection, broker) = common::start(|mut broker| {
        broker.handshake();
        let ch = broker.expect_channel_open();

        match broker.expect_method() {
            // reply to exchange.declare with a queue.declare-ok
            (_, Method::ExchangeDeclare(_)) => broker.send_method(
                ch,
                Method::QueueDeclareOk(proto::QueueDeclareOk {
                    queue: "bogus".to_string(),
                    message_count: 0,
                    consumer_count: 0,
                }),
            ),
            other => panic!("broker expected exchange.declare, got {:?}", other),
        }
        match broker.expect_method() {
            (c, Method::ChannelClose(close)) => {
                assert_eq!(c, ch);
                assert_eq!(close.reply_code, proto::UNEXPECTED_FRAME);
                broker.send_method(ch, Method::ChannelCloseOk);
            }
            other => panic!("broker expected channel.close, got {:?}", other),
        }
        broker.expect_close();
    });

    let channel = connection.open_channel(None).unwrap();
    match channel.exchange_declare(
        ExchangeType::Fanout,
        "logs",
        ExchangeDeclareOptions::default(),
    ) {
        Err(Error::FrameUnexpected { .. }) => (),
        other => panic!("unexpected result {:?}", other.map(|_| ())),
    }
    // the protocol violation closed the channel
    match channel.queue_purge("q") {
        Err(Error::FrameUnexpected { .. }) => (),
        other => panic!("unexpected result {:?}", other),
    }

    connection.close().unwrap();
    broker.join().unwrap();
}

#[test]
fn consume_ack_cancel_with_two_workers() {
    let (mut connection, broker) = common::start(|mut broker| {
        broker.handshake();
        let ch = broker.expect_channel_open();

        match broker.expect_method() {
            (_, Method::QueueDeclare(_)) => broker.send_method(
                ch,
                Method::QueueDeclareOk(proto::QueueDeclareOk {
                    queue: "q".to_string(),
                    message_count: 0,
                    consumer_count: 0,
                }),
            ),
            other => panic!("broker expected queue.declare, got {:?}", other),
        }
        for _ in 0..5 {
            expect_publish(&mut broker, ch);
        }
        match broker.expect_method() {
            (_, Method::BasicConsume(consume)) => {
                assert_eq!(consume.queue, "q");
                assert!(!consume.no_ack);
                broker.send_method(
                    ch,
                    Method::BasicConsumeOk(proto::BasicConsumeOk {
                        consumer_tag: "ctag-1".to_string(),
                    }),
                );
            }
            other => panic!("broker expected basic.consume, got {:?}", other),
        }
        for tag in 1..=5u64 {
            broker.send_content(
                ch,
                Method::BasicDeliver(proto::BasicDeliver {
                    consumer_tag: "ctag-1".to_string(),
                    delivery_tag: tag,
                    redelivered: false,
                    exchange: String::new(),
                    routing_key: "q".to_string(),
                }),
                &AmqpProperties::default(),
                format!("m{}", tag).as_bytes(),
                131_072,
            );
        }
        let mut acked: Vec<u64> = (0..5)
            .map(|_| match broker.expect_method() {
                (_, Method::BasicAck(ack)) => ack.delivery_tag,
                other => panic!("broker expected basic.ack, got {:?}", other),
            })
            .collect();
        acked.sort_unstable();
        assert_eq!(acked, vec![1, 2, 3, 4, 5]);

        match broker.expect_method() {
            (_, Method::BasicCancel(cancel)) => {
                assert_eq!(cancel.consumer_tag, "ctag-1");
                broker.send_method(
                    ch,
                    Method::BasicCancelOk(proto::BasicCancelOk {
                        consumer_tag: "ctag-1".to_string(),
                    }),
                );
            }
            other => panic!("broker expected basic.cancel, got {:?}", other),
        }
        match broker.expect_method() {
            (_, Method::BasicGet(_)) => broker.send_method(ch, Method::BasicGetEmpty),
            other => panic!("broker expected basic.get, got {:?}", other),
        }
        broker.expect_close();
    });

    let channel = connection.open_channel(None).unwrap();
    channel
        .queue_declare("q", QueueDeclareOptions::default())
        .unwrap();
    for i in 1..=5 {
        channel
            .basic_publish(
                format!("m{}", i),
                "",
                "q",
                false,
                &AmqpProperties::default(),
            )
            .unwrap();
    }

    let consumer = channel
        .basic_consume("q", ConsumerOptions::default())
        .unwrap();
    assert_eq!(consumer.consumer_tag(), "ctag-1");

    let (delivered_tx, delivered_rx) = crossbeam_channel::unbounded();
    consumer.start_workers(2, move |delivery| {
        delivered_tx.send(delivery).unwrap();
    });

    // callbacks run on the workers; ack from here as deliveries arrive
    for _ in 0..5 {
        let delivery = delivered_rx.recv().unwrap();
        channel.basic_ack(&delivery, false).unwrap();
    }

    consumer.cancel().unwrap();
    consumer.join_workers();

    assert!(channel.basic_get("q", true).unwrap().is_none());

    drop(consumer);
    connection.close().unwrap();
    broker.join().unwrap();
}

#[test]
fn single_worker_observes_broker_order() {
    let (mut connection, broker) = common::start(|mut broker| {
        broker.handshake();
        let ch = broker.expect_channel_open();

        match broker.expect_method() {
            (_, Method::BasicConsume(_)) => broker.send_method(
                ch,
                Method::BasicConsumeOk(proto::BasicConsumeOk {
                    consumer_tag: "ctag-ord".to_string(),
                }),
            ),
            other => panic!("broker expected basic.consume, got {:?}", other),
        }
        for tag in 1..=20u64 {
            broker.send_content(
                ch,
                Method::BasicDeliver(proto::BasicDeliver {
                    consumer_tag: "ctag-ord".to_string(),
                    delivery_tag: tag,
                    redelivered: false,
                    exchange: String::new(),
                    routing_key: "q".to_string(),
                }),
                &AmqpProperties::default(),
                b"x",
                131_072,
            );
        }
        match broker.expect_method() {
            (_, Method::BasicCancel(_)) => broker.send_method(
                ch,
                Method::BasicCancelOk(proto::BasicCancelOk {
                    consumer_tag: "ctag-ord".to_string(),
                }),
            ),
            other => panic!("broker expected basic.cancel, got {:?}", other),
        }
        broker.expect_close();
    });

    let channel = connection.open_channel(None).unwrap();
    let options = ConsumerOptions {
        no_ack: true,
        ..ConsumerOptions::default()
    };
    let consumer = channel.basic_consume("q", options).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    consumer.start_workers(1, move |delivery| {
        let mut seen = sink.lock().unwrap();
        seen.push(delivery.delivery_tag());
        if seen.len() == 20 {
            done_tx.send(()).unwrap();
        }
    });

    done_rx.recv().unwrap();
    consumer.cancel().unwrap();
    consumer.join_workers();

    let seen = seen.lock().unwrap();
    assert_eq!(*seen, (1..=20).collect::<Vec<u64>>());
    drop(seen);

    drop(consumer);
    connection.close().unwrap();
    broker.join().unwrap();
}

#[test]
fn concurrent_publishes_never_interleave_frames() {
    const PUBLISHES_PER_CHANNEL: usize = 10;

    let (mut connection, broker) = common::start(|mut broker| {
        broker.handshake_with(2047, 4096, 0);
        let first = broker.expect_channel_open();
        let second = broker.expect_channel_open();
        assert_ne!(first, second);

        // read_content panics if any frame of a publish arrives on the wrong
        // channel, which is exactly the interleaving this test rules out
        let mut seen = vec![0usize; 2];
        for _ in 0..(2 * PUBLISHES_PER_CHANNEL) {
            let (ch, body) = match broker.expect_method() {
                (ch, Method::BasicPublish(_)) => {
                    let (header, body, _) = broker.read_content(ch);
                    assert_eq!(header.body_size, 9_000);
                    (ch, body)
                }
                other => panic!("broker expected basic.publish, got {:?}", other),
            };
            let index = if ch == first { 0 } else { 1 };
            seen[index] += 1;
            assert!(body.iter().all(|b| *b == ch as u8));
        }
        assert_eq!(seen, vec![PUBLISHES_PER_CHANNEL, PUBLISHES_PER_CHANNEL]);

        broker.expect_close();
    });

    let first = connection.open_channel(None).unwrap();
    let second = connection.open_channel(None).unwrap();

    thread::scope(|scope| {
        for channel in [&first, &second] {
            scope.spawn(move || {
                let body = vec![channel.channel_id() as u8; 9_000];
                for _ in 0..PUBLISHES_PER_CHANNEL {
                    channel
                        .basic_publish(&body, "", "q", false, &AmqpProperties::default())
                        .unwrap();
                }
            });
        }
    });

    connection.close().unwrap();
    broker.join().unwrap();
}

#[test]
fn connection_close_cascade_wakes_blocked_getter() {
    let (mut connection, broker) = common::start(|mut broker| {
        broker.handshake();
        broker.expect_channel_open();

        match broker.expect_method() {
            (_, Method::BasicGet(_)) => (),
            other => panic!("broker expected basic.get, got {:?}", other),
        }
        // instead of replying, kill the whole connection
        broker.send_method(
            0,
            Method::ConnectionClose(proto::ConnectionClose {
                reply_code: 320,
                reply_text: "CONNECTION_FORCED - shutting down".to_string(),
                class_id: 0,
                method_id: 0,
            }),
        );
        match broker.expect_method() {
            (0, Method::ConnectionCloseOk) => (),
            other => panic!("broker expected connection.close-ok, got {:?}", other),
        }
    });

    let channel = connection.open_channel(None).unwrap();
    let get_result = thread::scope(|scope| {
        scope.spawn(|| channel.basic_get("q", true)).join().unwrap()
    });
    match get_result {
        Err(Error::ServerClosedConnection { code: 320, .. }) => (),
        other => panic!("unexpected result {:?}", other),
    }

    // the terminal reason also surfaces from close()
    match connection.close() {
        Err(Error::ServerClosedConnection { code: 320, .. }) => (),
        other => panic!("unexpected result {:?}", other),
    }
    broker.join().unwrap();
}

#[test]
fn returned_message_reaches_listener() {
    let (mut connection, broker) = common::start(|mut broker| {
        broker.handshake();
        let ch = broker.expect_channel_open();

        let (publish, body) = expect_publish(&mut broker, ch);
        assert!(publish.mandatory);
        broker.send_content(
            ch,
            Method::BasicReturn(proto::BasicReturn {
                reply_code: 312,
                reply_text: "NO_ROUTE".to_string(),
                exchange: "missing".to_string(),
                routing_key: "rk".to_string(),
            }),
            &AmqpProperties::default().with_content_type("text/plain".to_string()),
            &body,
            131_072,
        );
        broker.expect_close();
    });

    let channel = connection.open_channel(None).unwrap();
    let returns = channel.listen_for_returns();
    channel
        .basic_publish(
            "undeliverable",
            "missing",
            "rk",
            true,
            &AmqpProperties::default(),
        )
        .unwrap();

    let returned = returns.recv().unwrap();
    assert_eq!(returned.reply_code, 312);
    assert_eq!(returned.reply_text, "NO_ROUTE");
    assert_eq!(returned.exchange, "missing");
    assert_eq!(returned.routing_key, "rk");
    assert_eq!(returned.content, b"undeliverable");
    assert_eq!(
        returned.properties.content_type().map(String::as_str),
        Some("text/plain")
    );

    connection.close().unwrap();
    broker.join().unwrap();
}

#[test]
fn administrative_operations_roundtrip() {
    let (mut connection, broker) = common::start(|mut broker| {
        broker.handshake();
        let ch = broker.expect_channel_open();

        loop {
            let (_, method) = broker.expect_method();
            let reply = match method {
                Method::ExchangeDeclare(declare) => {
                    assert_eq!(declare.exchange, "logs");
                    assert_eq!(declare.type_, "fanout");
                    assert!(declare.durable);
                    Method::ExchangeDeclareOk
                }
                Method::QueueDeclare(_) => Method::QueueDeclareOk(proto::QueueDeclareOk {
                    queue: "q".to_string(),
                    message_count: 0,
                    consumer_count: 0,
                }),
                Method::QueueBind(bind) => {
                    assert_eq!(bind.exchange, "logs");
                    Method::QueueBindOk
                }
                Method::ExchangeBind(_) => Method::ExchangeBindOk,
                Method::ExchangeUnbind(_) => Method::ExchangeUnbindOk,
                Method::BasicQos(qos) => {
                    assert_eq!(qos.prefetch_count, 10);
                    Method::BasicQosOk
                }
                Method::BasicRecover(recover) => {
                    assert!(recover.requeue);
                    Method::BasicRecoverOk
                }
                Method::TxSelect => Method::TxSelectOk,
                Method::TxCommit => Method::TxCommitOk,
                Method::TxRollback => Method::TxRollbackOk,
                Method::QueueUnbind(_) => Method::QueueUnbindOk,
                Method::QueuePurge(_) => {
                    Method::QueuePurgeOk(proto::QueuePurgeOk { message_count: 3 })
                }
                Method::QueueDelete(delete) => {
                    assert!(delete.if_empty);
                    Method::QueueDeleteOk(proto::QueueDeleteOk { message_count: 2 })
                }
                Method::ExchangeDelete(_) => Method::ExchangeDeleteOk,
                Method::ChannelClose(_) => {
                    broker.send_method(ch, Method::ChannelCloseOk);
                    break;
                }
                other => panic!("broker got unscripted method {:?}", other),
            };
            broker.send_method(ch, reply);
        }
        broker.expect_close();
    });

    let channel = connection.open_channel(None).unwrap();
    let options = ExchangeDeclareOptions {
        durable: true,
        ..ExchangeDeclareOptions::default()
    };
    let exchange = channel
        .exchange_declare(ExchangeType::Fanout, "logs", options)
        .unwrap();
    let queue = channel
        .queue_declare("q", QueueDeclareOptions::default())
        .unwrap();
    queue.bind(&exchange, "rk", FieldTable::new()).unwrap();
    channel
        .exchange_bind("dst", "logs", "rk", FieldTable::new())
        .unwrap();
    channel
        .exchange_unbind("dst", "logs", "rk", FieldTable::new())
        .unwrap();
    channel.basic_qos(0, 10, false).unwrap();
    channel.basic_recover(true).unwrap();
    channel.tx_select().unwrap();
    channel.tx_commit().unwrap();
    channel.tx_rollback().unwrap();
    queue.unbind(&exchange, "rk", FieldTable::new()).unwrap();
    assert_eq!(queue.purge().unwrap(), 3);
    let delete_options = QueueDeleteOptions {
        if_empty: true,
        ..QueueDeleteOptions::default()
    };
    assert_eq!(queue.delete(delete_options).unwrap(), 2);

    drop(exchange);
    channel.close().unwrap();
    connection.close().unwrap();
    broker.join().unwrap();
}

#[test]
fn heartbeats_sent_when_idle() {
    let (connection, broker) = common::start_with_options(
        ConnectionOptions::default(),
        |mut broker| {
            broker.handshake_with(2047, 131_072, 1);
            // an idle client must send a heartbeat within the negotiated
            // interval
            match broker.read_frame() {
                proto::Frame::Heartbeat(0) => (),
                frame => panic!("broker expected heartbeat, got {:?}", frame),
            }
            broker.expect_close();
        },
    );

    assert_eq!(connection.heartbeat(), 1);
    thread::sleep(Duration::from_millis(1500));
    connection.close().unwrap();
    broker.join().unwrap();
}

#[test]
fn missed_server_heartbeats_kill_the_connection() {
    let (connection, broker) = common::start_with_options(
        ConnectionOptions::default(),
        |mut broker| {
            broker.handshake_with(2047, 131_072, 1);
            // send nothing; the client should give up after two intervals
            broker.drain_until_eof();
        },
    );

    thread::sleep(Duration::from_millis(2600));
    match connection.close() {
        Err(Error::MissedServerHeartbeats) => (),
        other => panic!("unexpected result {:?}", other),
    }
    broker.join().unwrap();
}

use crate::channel::{ChannelReply, ChannelShared, GetReply};
use crate::confirm::{Confirm, ConfirmPayload};
use crate::connection::ConnectionInner;
use crate::consumer::ConsumerMessage;
use crate::content_collector::{CollectorResult, ContentCollector};
use crate::errors::*;
use crate::frame_buffer::FrameBuffer;
use crate::proto::{self, Frame, Method};
use crate::stream::StreamReadHalf;
use crossbeam_channel::Sender;
use log::{debug, error, trace, warn};
use snafu::ResultExt;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::thread::{Builder, JoinHandle};

/// Per-channel state owned by the reader side: the sending halves of the
/// caller-facing mailboxes plus the in-flight content assembly.
pub(crate) struct ChannelSlot {
    pub(crate) replies_tx: Sender<ChannelReply>,
    pub(crate) gets_tx: Sender<GetReply>,
    pub(crate) collector: ContentCollector,
    pub(crate) shared: Arc<ChannelShared>,
}

impl ChannelSlot {
    /// Tears the channel down: records the close reason and closes every
    /// mailbox. Dropping the slot drops the reply and basic-get senders,
    /// waking any blocked synchronous caller.
    pub(crate) fn teardown(self, reason: Error) {
        self.shared.teardown(reason);
    }
}

/// Spawns the connection reader thread. The thread owns the socket read half;
/// on exit (clean or otherwise) it cascades the terminal reason to every
/// channel via [`ConnectionInner::finish`].
pub(crate) fn spawn<R: StreamReadHalf>(
    stream: R,
    inner: Arc<ConnectionInner>,
) -> Result<JoinHandle<Result<()>>> {
    let reader_inner = Arc::clone(&inner);
    Builder::new()
        .name("warren-reader".to_string())
        .spawn(move || {
            let result = run(stream, &reader_inner);
            reader_inner.finish(result)
        })
        .context(ForkFailedSnafu)
}

fn run<R: StreamReadHalf>(mut stream: R, inner: &Arc<ConnectionInner>) -> Result<()> {
    let mut frame_buffer = FrameBuffer::new();
    let mut done = false;

    let result = loop {
        let n = match frame_buffer.read_from(&mut stream, |frame| {
            handle_frame(inner, frame, &mut done)
        }) {
            Ok(n) => n,
            Err(err) => break Err(err),
        };
        if n > 0 {
            inner.record_rx_activity();
        }
        if done {
            break Ok(());
        }
        if let Err(err) = inner.poll_heartbeats() {
            break Err(err);
        }
    };

    match result {
        // EOF while we are closing is the server hanging up after (or
        // instead of) close-ok; treat it as a clean close.
        Err(Error::UnexpectedSocketClose) if inner.is_client_closing() => Ok(()),
        Err(Error::ReceivedMalformed) => {
            // decoder failure is a hard protocol error
            inner.send_connection_close(proto::FRAME_ERROR, "frame error");
            Err(Error::ReceivedMalformed)
        }
        other => other,
    }
}

fn handle_frame(inner: &Arc<ConnectionInner>, frame: Frame, done: &mut bool) -> Result<()> {
    match frame {
        Frame::Heartbeat(0) => Ok(()),
        Frame::Heartbeat(channel_id) => {
            error!("received heartbeat on channel {}", channel_id);
            ReceivedMalformedSnafu.fail()
        }
        Frame::Method(0, method) => handle_connection_method(inner, method, done),
        Frame::Header(0, _) | Frame::Body(0, _) => {
            error!("received illegal content frame on channel 0");
            inner.send_connection_close(proto::NOT_ALLOWED, "content frame on channel 0");
            ClientExceptionSnafu.fail()
        }
        Frame::Method(channel_id, method) => handle_channel_method(inner, channel_id, method),
        Frame::Header(channel_id, header) => {
            with_slot(inner, channel_id, |slot| {
                let finished = slot.collector.collect_header(header)?;
                finish_content(slot, finished)
            })
        }
        Frame::Body(channel_id, body) => with_slot(inner, channel_id, |slot| {
            let finished = slot.collector.collect_body(body)?;
            finish_content(slot, finished)
        }),
    }
}

fn handle_connection_method(
    inner: &Arc<ConnectionInner>,
    method: Method,
    done: &mut bool,
) -> Result<()> {
    match method {
        Method::ConnectionClose(close) => {
            warn!(
                "server closing connection: code={} text={}",
                close.reply_code, close.reply_text
            );
            inner.send_connection_close_ok();
            ServerClosedConnectionSnafu {
                code: close.reply_code,
                message: close.reply_text,
                class_id: close.class_id,
                method_id: close.method_id,
            }
            .fail()
        }
        Method::ConnectionCloseOk => {
            if inner.is_client_closing() {
                *done = true;
                Ok(())
            } else {
                error!("received unsolicited connection.close-ok");
                ClientExceptionSnafu.fail()
            }
        }
        Method::ConnectionBlocked(blocked) => {
            warn!("connection blocked by server: {}", blocked.reason);
            inner.set_blocked(true);
            Ok(())
        }
        Method::ConnectionUnblocked => {
            debug!("connection unblocked by server");
            inner.set_blocked(false);
            Ok(())
        }
        other => {
            let text = format!("do not know how to handle connection method {}", other.name());
            error!("{} - closing connection", text);
            inner.send_connection_close(proto::NOT_IMPLEMENTED, &text);
            ClientExceptionSnafu.fail()
        }
    }
}

fn handle_channel_method(
    inner: &Arc<ConnectionInner>,
    channel_id: u16,
    method: Method,
) -> Result<()> {
    match method {
        Method::ChannelClose(close) => {
            warn!(
                "server closing channel {}: code={} text={}",
                channel_id, close.reply_code, close.reply_text
            );
            let slot = remove_slot(inner, channel_id)?;
            // reply close-ok on behalf of the caller, then cascade
            inner.write_method_best_effort(channel_id, &Method::ChannelCloseOk);
            slot.teardown(Error::ServerClosedChannel {
                channel_id,
                code: close.reply_code,
                message: close.reply_text,
                class_id: close.class_id,
                method_id: close.method_id,
            });
            Ok(())
        }
        Method::ChannelCloseOk => {
            let slot = remove_slot(inner, channel_id)?;
            // forward the close-ok so the blocked closer sees it, then drop
            // the mailboxes
            let _ = slot.replies_tx.send(ChannelReply::Method(Method::ChannelCloseOk));
            slot.teardown(Error::ClientClosedChannel { channel_id });
            Ok(())
        }
        Method::BasicConsumeOk(consume_ok) => with_slot(inner, channel_id, |slot| {
            let consumer_tag = consume_ok.consumer_tag;
            let mut consumers = slot.shared.consumers.lock().unwrap();
            match consumers.entry(consumer_tag.clone()) {
                Entry::Occupied(_) => DuplicateConsumerTagSnafu {
                    channel_id,
                    consumer_tag,
                }
                .fail(),
                Entry::Vacant(entry) => {
                    let (tx, rx) = crossbeam_channel::unbounded();
                    entry.insert(tx);
                    send_reply(
                        slot,
                        channel_id,
                        ChannelReply::ConsumeStarted(consumer_tag, rx),
                    );
                    Ok(())
                }
            }
        }),
        Method::BasicCancelOk(cancel_ok) => with_slot(inner, channel_id, |slot| {
            close_consumer(
                slot,
                &cancel_ok.consumer_tag,
                ConsumerMessage::ClientCancelled,
            );
            send_reply(
                slot,
                channel_id,
                ChannelReply::Method(Method::BasicCancelOk(cancel_ok)),
            );
            Ok(())
        }),
        Method::BasicCancel(cancel) => {
            // server-initiated cancel (e.g. the queue was deleted)
            warn!(
                "server cancelled consumer {} on channel {}",
                cancel.consumer_tag, channel_id
            );
            with_slot(inner, channel_id, |slot| {
                close_consumer(slot, &cancel.consumer_tag, ConsumerMessage::ServerCancelled);
                Ok(())
            })?;
            if !cancel.nowait {
                inner.write_method_best_effort(
                    channel_id,
                    &Method::BasicCancelOk(proto::BasicCancelOk {
                        consumer_tag: cancel.consumer_tag,
                    }),
                );
            }
            Ok(())
        }
        Method::BasicDeliver(deliver) => {
            with_slot(inner, channel_id, |slot| slot.collector.collect_deliver(deliver))
        }
        Method::BasicReturn(return_) => {
            with_slot(inner, channel_id, |slot| slot.collector.collect_return(return_))
        }
        Method::BasicGetOk(get_ok) => {
            with_slot(inner, channel_id, |slot| slot.collector.collect_get(get_ok))
        }
        Method::BasicGetEmpty => with_slot(inner, channel_id, |slot| {
            if slot.gets_tx.send(GetReply::Empty).is_err() {
                warn!("nobody waiting for basic.get-empty on channel {}", channel_id);
            }
            Ok(())
        }),
        Method::BasicAck(ack) => with_slot(inner, channel_id, |slot| {
            slot.shared.handle_confirm(Confirm::Ack(ConfirmPayload {
                delivery_tag: ack.delivery_tag,
                multiple: ack.multiple,
            }));
            Ok(())
        }),
        Method::BasicNack(nack) => with_slot(inner, channel_id, |slot| {
            slot.shared.handle_confirm(Confirm::Nack(ConfirmPayload {
                delivery_tag: nack.delivery_tag,
                multiple: nack.multiple,
            }));
            Ok(())
        }),
        // everything else is a synchronous reply for a blocked caller
        other => with_slot(inner, channel_id, |slot| {
            trace!(
                "forwarding {} to caller on channel {}",
                other.name(),
                channel_id
            );
            send_reply(slot, channel_id, ChannelReply::Method(other));
            Ok(())
        }),
    }
}

/// Routes a fully assembled piece of content.
fn finish_content(slot: &mut ChannelSlot, finished: Option<CollectorResult>) -> Result<()> {
    let finished = match finished {
        Some(finished) => finished,
        None => return Ok(()),
    };
    match finished {
        CollectorResult::Delivery((consumer_tag, delivery)) => {
            let consumers = slot.shared.consumers.lock().unwrap();
            match consumers.get(&consumer_tag) {
                Some(tx) => {
                    let _ = tx.send(ConsumerMessage::Delivery(delivery));
                }
                // cancellation race: the consumer is already gone
                None => warn!(
                    "dropping delivery for unknown consumer {} on channel {}",
                    consumer_tag, slot.shared.id
                ),
            }
            Ok(())
        }
        CollectorResult::Return(return_) => {
            let listener = slot.shared.return_listener.lock().unwrap();
            match &*listener {
                Some(tx) if tx.send(return_).is_ok() => (),
                _ => warn!(
                    "nobody listening for returned message on channel {}; dropping it",
                    slot.shared.id
                ),
            }
            Ok(())
        }
        CollectorResult::Get(get) => {
            if slot.gets_tx.send(GetReply::Get(Box::new(get))).is_err() {
                warn!(
                    "nobody waiting for basic.get-ok on channel {}",
                    slot.shared.id
                );
            }
            Ok(())
        }
    }
}

fn close_consumer(slot: &ChannelSlot, consumer_tag: &str, message: ConsumerMessage) {
    if let Some(tx) = slot.shared.consumers.lock().unwrap().remove(consumer_tag) {
        let _ = tx.send(message);
    }
}

fn send_reply(slot: &ChannelSlot, channel_id: u16, reply: ChannelReply) {
    // The receiving half lives in the caller's Channel; it cannot normally be
    // gone before the channel is closed, but a reply racing a drop is not
    // worth killing the connection over.
    if slot.replies_tx.send(reply).is_err() {
        warn!("dropping reply for channel {}: caller is gone", channel_id);
    }
}

fn with_slot<F>(inner: &Arc<ConnectionInner>, channel_id: u16, f: F) -> Result<()>
where
    F: FnOnce(&mut ChannelSlot) -> Result<()>,
{
    let mut channels = inner.channels().lock().unwrap();
    match channels.get_mut(channel_id) {
        Some(slot) => f(slot),
        None => ReceivedFrameWithBogusChannelIdSnafu { channel_id }.fail(),
    }
}

fn remove_slot(inner: &Arc<ConnectionInner>, channel_id: u16) -> Result<ChannelSlot> {
    let mut channels = inner.channels().lock().unwrap();
    channels
        .remove(channel_id)
        .ok_or(Error::ReceivedFrameWithBogusChannelId { channel_id })
}

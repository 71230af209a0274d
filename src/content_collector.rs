use crate::errors::*;
use crate::proto::{BasicDeliver, BasicGetOk, BasicReturn, ContentHeader};
use crate::{AmqpProperties, Delivery, Get, Return};

/// Assembles a content-bearing method, its header frame, and its body frames
/// into a whole message.
///
/// At most one assembly is in flight per channel; the protocol guarantees the
/// method, header, and body frames of one message arrive contiguously on
/// their channel.
pub(crate) struct ContentCollector {
    channel_id: u16,
    kind: Option<Kind>,
}

pub(crate) enum CollectorResult {
    Delivery((String, Delivery)),
    Return(Return),
    Get(Get),
}

impl ContentCollector {
    pub(crate) fn new(channel_id: u16) -> ContentCollector {
        ContentCollector {
            channel_id,
            kind: None,
        }
    }

    pub(crate) fn collect_deliver(&mut self, deliver: BasicDeliver) -> Result<()> {
        self.start(Kind::Delivery(State::Start(deliver)))
    }

    pub(crate) fn collect_return(&mut self, return_: BasicReturn) -> Result<()> {
        self.start(Kind::Return(State::Start(return_)))
    }

    pub(crate) fn collect_get(&mut self, get_ok: BasicGetOk) -> Result<()> {
        self.start(Kind::Get(State::Start(get_ok)))
    }

    fn start(&mut self, kind: Kind) -> Result<()> {
        match self.kind.take() {
            None => {
                self.kind = Some(kind);
                Ok(())
            }
            Some(_) => self.unexpected("content-bearing method"),
        }
    }

    pub(crate) fn collect_header(
        &mut self,
        header: ContentHeader,
    ) -> Result<Option<CollectorResult>> {
        match self.kind.take() {
            Some(Kind::Delivery(state)) => match state.collect_header(header)? {
                Content::Done(finish) => Ok(Some(CollectorResult::Delivery(finish))),
                Content::NeedMore(state) => {
                    self.kind = Some(Kind::Delivery(state));
                    Ok(None)
                }
            },
            Some(Kind::Return(state)) => match state.collect_header(header)? {
                Content::Done(finish) => Ok(Some(CollectorResult::Return(finish))),
                Content::NeedMore(state) => {
                    self.kind = Some(Kind::Return(state));
                    Ok(None)
                }
            },
            Some(Kind::Get(state)) => match state.collect_header(header)? {
                Content::Done(finish) => Ok(Some(CollectorResult::Get(finish))),
                Content::NeedMore(state) => {
                    self.kind = Some(Kind::Get(state));
                    Ok(None)
                }
            },
            None => self.unexpected("content header"),
        }
    }

    pub(crate) fn collect_body(&mut self, body: Vec<u8>) -> Result<Option<CollectorResult>> {
        match self.kind.take() {
            Some(Kind::Delivery(state)) => match state.collect_body(body)? {
                Content::Done(finish) => Ok(Some(CollectorResult::Delivery(finish))),
                Content::NeedMore(state) => {
                    self.kind = Some(Kind::Delivery(state));
                    Ok(None)
                }
            },
            Some(Kind::Return(state)) => match state.collect_body(body)? {
                Content::Done(finish) => Ok(Some(CollectorResult::Return(finish))),
                Content::NeedMore(state) => {
                    self.kind = Some(Kind::Return(state));
                    Ok(None)
                }
            },
            Some(Kind::Get(state)) => match state.collect_body(body)? {
                Content::Done(finish) => Ok(Some(CollectorResult::Get(finish))),
                Content::NeedMore(state) => {
                    self.kind = Some(Kind::Get(state));
                    Ok(None)
                }
            },
            None => self.unexpected("content body"),
        }
    }

    fn unexpected<T>(&self, actual: &str) -> Result<T> {
        FrameUnexpectedSnafu {
            expected: "contiguous content frames",
            actual: format!("{} on channel {}", actual, self.channel_id),
        }
        .fail()
    }
}

enum Kind {
    Delivery(State<Delivery>),
    Return(State<Return>),
    Get(State<Get>),
}

trait ContentType {
    type Start;
    type Finish;

    fn finish(start: Self::Start, buf: Vec<u8>, properties: AmqpProperties) -> Self::Finish;
}

impl ContentType for Delivery {
    type Start = BasicDeliver;
    type Finish = (String, Delivery);

    fn finish(start: Self::Start, buf: Vec<u8>, properties: AmqpProperties) -> Self::Finish {
        Delivery::new(start, buf, properties)
    }
}

impl ContentType for Return {
    type Start = BasicReturn;
    type Finish = Return;

    fn finish(start: Self::Start, buf: Vec<u8>, properties: AmqpProperties) -> Self::Finish {
        Return::new(start, buf, properties)
    }
}

impl ContentType for Get {
    type Start = BasicGetOk;
    type Finish = Get;

    fn finish(get_ok: Self::Start, buf: Vec<u8>, properties: AmqpProperties) -> Self::Finish {
        let message_count = get_ok.message_count;
        let delivery = Delivery::new_get_ok(get_ok, buf, properties);
        Get {
            delivery,
            message_count,
        }
    }
}

enum Content<T: ContentType> {
    Done(T::Finish),
    NeedMore(State<T>),
}

// Clippy warns about State::Body being much larger than the other variant,
// but we expect almost all instances of State to transition to Body.
#[allow(clippy::large_enum_variant)]
enum State<T: ContentType> {
    Start(T::Start),
    Body(T::Start, ContentHeader, Vec<u8>),
}

impl<T: ContentType> State<T> {
    fn collect_header(self, header: ContentHeader) -> Result<Content<T>> {
        match self {
            State::Start(start) => {
                if header.body_size == 0 {
                    Ok(Content::Done(T::finish(
                        start,
                        Vec::new(),
                        header.properties,
                    )))
                } else {
                    let buf = Vec::with_capacity(header.body_size as usize);
                    Ok(Content::NeedMore(State::Body(start, header, buf)))
                }
            }
            State::Body(_, _, _) => FrameUnexpectedSnafu {
                expected: "content body",
                actual: "content header".to_string(),
            }
            .fail(),
        }
    }

    fn collect_body(self, mut body: Vec<u8>) -> Result<Content<T>> {
        match self {
            State::Body(start, header, mut buf) => {
                let body_size = header.body_size as usize;
                buf.append(&mut body);
                if buf.len() == body_size {
                    Ok(Content::Done(T::finish(start, buf, header.properties)))
                } else if buf.len() < body_size {
                    Ok(Content::NeedMore(State::Body(start, header, buf)))
                } else {
                    FrameUnexpectedSnafu {
                        expected: "content body within declared size",
                        actual: format!("{} bytes for body of {}", buf.len(), body_size),
                    }
                    .fail()
                }
            }
            State::Start(_) => FrameUnexpectedSnafu {
                expected: "content header",
                actual: "content body".to_string(),
            }
            .fail(),
        }
    }
}

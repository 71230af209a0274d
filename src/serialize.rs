use crate::errors::*;
use crate::proto::codec;
use crate::proto::properties::AmqpProperties;
use crate::proto::{ChannelId, Method, FRAME_OVERHEAD};
use bytes::BytesMut;

/// Buffer of serialized frames waiting to be written to the socket.
///
/// A single buffer may hold multiple frames; the connection write lock emits
/// a whole buffer in one locked write, which is how a publish (method +
/// header + N body frames) stays atomic on the wire.
pub(crate) struct OutputBuffer(BytesMut);

impl OutputBuffer {
    pub(crate) fn empty() -> OutputBuffer {
        OutputBuffer(BytesMut::new())
    }

    pub(crate) fn with_method(channel_id: ChannelId, method: &Method) -> Result<OutputBuffer> {
        let mut buf = OutputBuffer::empty();
        buf.push_method(channel_id, method)?;
        Ok(buf)
    }

    pub(crate) fn push_method(&mut self, channel_id: ChannelId, method: &Method) -> Result<()> {
        codec::encode_method(&mut self.0, channel_id, method)
    }

    pub(crate) fn push_heartbeat(&mut self) {
        codec::encode_heartbeat(&mut self.0, 0);
    }

    /// Appends the header frame and body frames for `content`, splitting the
    /// body into frames of at most `frame_max - 8` bytes. A zero-length body
    /// emits only the header frame.
    pub(crate) fn push_content(
        &mut self,
        channel_id: ChannelId,
        class_id: u16,
        properties: &AmqpProperties,
        content: &[u8],
        frame_max: u32,
    ) -> Result<()> {
        codec::encode_header(
            &mut self.0,
            channel_id,
            class_id,
            content.len() as u64,
            properties,
        )?;
        let max_body = frame_max as usize - FRAME_OVERHEAD;
        for chunk in content.chunks(max_body) {
            codec::encode_body(&mut self.0, channel_id, chunk);
        }
        Ok(())
    }

}

impl AsRef<[u8]> for OutputBuffer {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

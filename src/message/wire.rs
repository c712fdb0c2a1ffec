//! Binary Wire Format
//!
//! Deterministic encode/decode between a [`MeshMessage`] and the byte frame
//! transmitted over the peer transport. All integers and floats are
//! little-endian.
//!
//! Frame layout:
//!
//! ```text
//! u8          sender_id
//! i32         sequence
//! u8          kind tag        (0=Connected, 1=Disconnected, 2=Gps,
//!                              3=Task, 4=Text, 5=QuickChat)
//! u8          sender name length (0-255)
//! bytes[n]    sender name (UTF-8)
//! --- variant tail ---
//! Text:       i32 len; bytes[len] message
//! Gps:        f32 longitude; f32 latitude
//! Task:       i32 len; bytes[len] title;
//!             i32 len; bytes[len] text_context;
//!             i32 len; bytes[len] file_data
//! QuickChat:  f32 longitude; f32 latitude; u8 kind tag
//! Connected / Disconnected: no tail
//! ```
//!
//! Decoding maintains a single cursor and fails with [`WireError::Truncated`]
//! as soon as any read would pass the end of the buffer (including a length
//! prefix the remaining buffer cannot satisfy). An unknown kind tag fails
//! with [`WireError::UnsupportedType`]; there is no placeholder fallback.

use thiserror::Error;

use super::message_types::{
    MeshMessage, MessageHeader, MessageKind, MessagePayload, QuickChatKind,
};

/// Errors produced by the codec. All of them are recoverable by dropping the
/// frame; none of them must ever escape into the transport callback chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// A read would pass the end of the buffer. Also covers negative or
    /// oversized length prefixes.
    #[error("frame truncated at offset {0}")]
    Truncated(usize),

    /// The kind tag (or quick-chat kind tag) does not match any known
    /// variant.
    #[error("unsupported message type tag 0x{0:02x}")]
    UnsupportedType(u8),

    /// The sender display name cannot be framed behind a single-byte length
    /// prefix.
    #[error("sender name is {len} bytes, limit is 255")]
    SenderNameTooLong { len: usize },
}

const HEADER_FIXED_LEN: usize = 1 + 4 + 1 + 1; // sender_id + sequence + tag + name length

/// Exact number of bytes [`encode`] will produce for this message.
pub fn encoded_len(message: &MeshMessage) -> usize {
    let tail = match &message.payload {
        MessagePayload::Connected | MessagePayload::Disconnected => 0,
        MessagePayload::Gps { .. } => 4 + 4,
        MessagePayload::Text { message } => 4 + message.len(),
        MessagePayload::Task {
            title,
            text_context,
            file_data,
        } => 4 + title.len() + 4 + text_context.len() + 4 + file_data.len(),
        MessagePayload::QuickChat { .. } => 4 + 4 + 1,
    };
    HEADER_FIXED_LEN + message.header.sender.len() + tail
}

/// Encode a message into a freshly allocated frame of exactly
/// [`encoded_len`] bytes.
pub fn encode(message: &MeshMessage) -> Result<Vec<u8>, WireError> {
    let name = message.header.sender.as_bytes();
    if name.len() > u8::MAX as usize {
        return Err(WireError::SenderNameTooLong { len: name.len() });
    }

    let mut frame = Vec::with_capacity(encoded_len(message));
    frame.push(message.header.sender_id);
    frame.extend_from_slice(&message.header.sequence.to_le_bytes());
    frame.push(message.kind().tag());
    frame.push(name.len() as u8);
    frame.extend_from_slice(name);

    match &message.payload {
        MessagePayload::Connected | MessagePayload::Disconnected => {}
        MessagePayload::Gps {
            longitude,
            latitude,
        } => {
            frame.extend_from_slice(&longitude.to_le_bytes());
            frame.extend_from_slice(&latitude.to_le_bytes());
        }
        MessagePayload::Text { message } => {
            put_prefixed(&mut frame, message);
        }
        MessagePayload::Task {
            title,
            text_context,
            file_data,
        } => {
            put_prefixed(&mut frame, title);
            put_prefixed(&mut frame, text_context);
            put_prefixed(&mut frame, file_data);
        }
        MessagePayload::QuickChat {
            longitude,
            latitude,
            kind,
        } => {
            frame.extend_from_slice(&longitude.to_le_bytes());
            frame.extend_from_slice(&latitude.to_le_bytes());
            frame.push(kind.tag());
        }
    }

    debug_assert_eq!(frame.len(), encoded_len(message));
    Ok(frame)
}

fn put_prefixed(frame: &mut Vec<u8>, value: &str) {
    frame.extend_from_slice(&(value.len() as i32).to_le_bytes());
    frame.extend_from_slice(value.as_bytes());
}

/// Decode one frame into a message.
pub fn decode(frame: &[u8]) -> Result<MeshMessage, WireError> {
    let mut reader = FrameReader::new(frame);

    let sender_id = reader.read_u8()?;
    let sequence = reader.read_i32()?;
    let tag = reader.read_u8()?;
    let kind = MessageKind::from_tag(tag).ok_or(WireError::UnsupportedType(tag))?;
    let name_len = reader.read_u8()? as usize;
    let sender = reader.read_str(name_len)?;

    let payload = match kind {
        MessageKind::Connected => MessagePayload::Connected,
        MessageKind::Disconnected => MessagePayload::Disconnected,
        MessageKind::Gps => MessagePayload::Gps {
            longitude: reader.read_f32()?,
            latitude: reader.read_f32()?,
        },
        MessageKind::Task => MessagePayload::Task {
            title: reader.read_prefixed_str()?,
            text_context: reader.read_prefixed_str()?,
            file_data: reader.read_prefixed_str()?,
        },
        MessageKind::Text => MessagePayload::Text {
            message: reader.read_prefixed_str()?,
        },
        MessageKind::QuickChat => {
            let longitude = reader.read_f32()?;
            let latitude = reader.read_f32()?;
            let kind_tag = reader.read_u8()?;
            let kind =
                QuickChatKind::from_tag(kind_tag).ok_or(WireError::UnsupportedType(kind_tag))?;
            MessagePayload::QuickChat {
                longitude,
                latitude,
                kind,
            }
        }
    };

    Ok(MeshMessage::new(
        MessageHeader {
            sender_id,
            sequence,
            sender,
        },
        payload,
    ))
}

/// Cursor over one inbound frame. Every read is bounds-checked; the offset
/// only advances on success.
struct FrameReader<'a> {
    frame: &'a [u8],
    offset: usize,
}

impl<'a> FrameReader<'a> {
    fn new(frame: &'a [u8]) -> Self {
        Self { frame, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        let remaining = self.frame.len() - self.offset;
        if len > remaining {
            return Err(WireError::Truncated(self.offset));
        }
        let bytes = &self.frame[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    fn read_i32(&mut self) -> Result<i32, WireError> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_f32(&mut self) -> Result<f32, WireError> {
        let bytes = self.take(4)?;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read `len` bytes as UTF-8. Invalid sequences are replaced rather than
    /// rejected, matching the decoder the original platform used.
    fn read_str(&mut self, len: usize) -> Result<String, WireError> {
        Ok(String::from_utf8_lossy(self.take(len)?).into_owned())
    }

    /// Shared primitive: read an i32 length, then that many bytes as UTF-8.
    fn read_prefixed_str(&mut self) -> Result<String, WireError> {
        let at = self.offset;
        let len = self.read_i32()?;
        let len = usize::try_from(len).map_err(|_| WireError::Truncated(at))?;
        self.read_str(len)
    }
}

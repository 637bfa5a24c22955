//! Length-delimited framing of protobuf messages.
//!
//! Every frame is a signed (zigzag) varint carrying the payload length followed by the protobuf encoding of the
//! message itself.
use bytes::{Buf, BufMut, BytesMut};
use integer_encoding::VarInt;
use prost::Message;

use crate::{Error, Result};

/// Largest payload accepted in a single frame (100 MiB)
pub const MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Maximum number of bytes a varint encoded `i64` can occupy
const MAX_VARINT_LEN: usize = 10;

/// Encodes a message into `dst` as a length-delimited frame
pub fn encode<M: Message>(message: &M, dst: &mut BytesMut) -> Result<()> {
    let len = message.encoded_len();

    if len > MAX_MESSAGE_SIZE {
        return Err(Error::Encode(format!(
            "message of {} bytes exceeds maximum frame size of {} bytes",
            len, MAX_MESSAGE_SIZE
        )));
    }

    let prefix = (len as i64).encode_var_vec();

    dst.reserve(prefix.len() + len);
    dst.put_slice(&prefix);
    message.encode(dst)?;

    Ok(())
}

/// Decodes one length-delimited frame from `src`
///
/// Returns `Ok(None)` when `src` does not yet hold a complete frame. Nothing is consumed from `src` until a whole
/// frame is available. The length prefix is validated as soon as it can be read, so an oversized or negative length
/// is reported without waiting for its payload.
pub fn decode<M: Message + Default>(src: &mut BytesMut) -> Result<Option<M>> {
    let (len, prefix_len) = match i64::decode_var(&src[..]) {
        Some(decoded) => decoded,
        None if src.len() >= MAX_VARINT_LEN => {
            return Err(Error::Decode("malformed frame length prefix".to_string()))
        }
        None => return Ok(None),
    };

    if len < 0 || len as u64 > MAX_MESSAGE_SIZE as u64 {
        return Err(Error::InvalidFrameLength { length: len });
    }

    let len = len as usize;

    if src.len() < prefix_len + len {
        return Ok(None);
    }

    src.advance(prefix_len);
    let payload = src.split_to(len);

    Ok(Some(M::decode(payload.freeze())?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::abci::{Request, Response, ResponseCheckTx};

    #[test]
    fn check_frame_layout() {
        let mut buf = BytesMut::new();
        encode(&Request::echo("hello"), &mut buf).unwrap();

        // 9 byte payload, zigzag encoded as 18
        assert_eq!(buf[0], 18);
        assert_eq!(&buf[1..], &[0x0a, 7, 0x0a, 5, b'h', b'e', b'l', b'l', b'o']);
    }

    #[test]
    fn check_decode_waits_for_complete_frame() {
        let response = Response::check_tx(ResponseCheckTx {
            code: 3,
            log: "insufficient funds".to_string(),
            gas_wanted: 10,
            ..Default::default()
        });

        let mut full = BytesMut::new();
        encode(&response, &mut full).unwrap();
        encode(&Response::flush(), &mut full).unwrap();

        let mut partial = BytesMut::from(&full[..full.len() / 2]);
        assert!(decode::<Response>(&mut partial).unwrap().is_none());
        assert_eq!(partial.len(), full.len() / 2);

        let decoded: Response = decode(&mut full).unwrap().unwrap();
        assert_eq!(decoded, response);

        let flush: Response = decode(&mut full).unwrap().unwrap();
        assert!(flush.is_flush());
        assert!(full.is_empty());
    }

    #[test]
    fn check_empty_message_frame() {
        let mut buf = BytesMut::new();
        encode(&Request::default(), &mut buf).unwrap();
        assert_eq!(&buf[..], &[0]);

        let decoded: Request = decode(&mut buf).unwrap().unwrap();
        assert!(decoded.value.is_none());
    }

    #[test]
    fn check_negative_length_is_rejected() {
        let mut buf = BytesMut::from(&(-1i64).encode_var_vec()[..]);

        assert!(matches!(
            decode::<Request>(&mut buf),
            Err(Error::InvalidFrameLength { length: -1 })
        ));
    }

    #[test]
    fn check_oversized_length_is_rejected_before_body() {
        let len = MAX_MESSAGE_SIZE as i64 + 1;
        let mut buf = BytesMut::from(&len.encode_var_vec()[..]);

        assert!(matches!(
            decode::<Request>(&mut buf),
            Err(Error::InvalidFrameLength { length }) if length == len
        ));
    }

    #[test]
    fn check_garbage_payload_is_decode_error() {
        let mut buf = BytesMut::new();
        buf.put_slice(&3i64.encode_var_vec());
        buf.put_slice(&[0xff, 0xff, 0xff]);

        assert!(matches!(
            decode::<Request>(&mut buf),
            Err(Error::Decode(_))
        ));
    }
}

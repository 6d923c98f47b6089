use bytes::{Buf, BytesMut};
use http::Request;
use tokio_util::codec::Encoder;

use crate::codec::body::PayloadEncoder;
use crate::codec::header::RequestHeadEncoder;
use crate::protocol::{Message, PayloadSize, SendError};

/// Client side request encoding: a head followed by its payload items.
#[derive(Debug, Default)]
pub struct RequestEncoder {
    header_encoder: RequestHeadEncoder,
    payload_encoder: Option<PayloadEncoder>,
}

impl RequestEncoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl<D: Buf> Encoder<Message<(Request<()>, PayloadSize), D>> for RequestEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Message<(Request<()>, PayloadSize), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header((head, payload_size)) => {
                if self.payload_encoder.is_some() {
                    return Err(SendError::invalid_body("request head written before the previous body ended"));
                }
                self.header_encoder.encode((head, payload_size), dst)?;
                if !payload_size.is_empty() {
                    self.payload_encoder = Some(PayloadEncoder::from(payload_size));
                }
                Ok(())
            }
            Message::Payload(payload_item) => {
                let Some(payload_encoder) = &mut self.payload_encoder else {
                    return if payload_item.is_eof() {
                        Ok(())
                    } else {
                        Err(SendError::invalid_body("payload written without a request head"))
                    };
                };
                let result = payload_encoder.encode(payload_item, dst);
                if payload_encoder.is_finish() {
                    self.payload_encoder = None;
                }
                result
            }
        }
    }
}

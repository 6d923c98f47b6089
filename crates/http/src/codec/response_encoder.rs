use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;
use tracing::error;

use crate::codec::body::PayloadEncoder;
use crate::codec::header::ResponseHeadEncoder;
use crate::protocol::{Message, PayloadSize, ResponseHead, SendError};

/// Server side response encoding: a head followed by its payload items.
#[derive(Debug, Default)]
pub struct ResponseEncoder {
    header_encoder: ResponseHeadEncoder,
    payload_encoder: Option<PayloadEncoder>,
    head_only: bool,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Answers to `HEAD` keep their framing headers but drop the payload.
    pub fn set_head_only(&mut self, head_only: bool) {
        self.head_only = head_only;
    }
}

impl<D: Buf> Encoder<Message<(ResponseHead, PayloadSize), D>> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Message<(ResponseHead, PayloadSize), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header((head, payload_size)) => {
                if self.payload_encoder.is_some() {
                    error!("expect payload item but receive response head");
                    return Err(SendError::invalid_body("response head written before the previous body ended"));
                }

                self.header_encoder.encode((head, payload_size), dst)?;
                if !payload_size.is_empty() && !self.head_only {
                    self.payload_encoder = Some(PayloadEncoder::from(payload_size));
                }
                Ok(())
            }

            Message::Payload(payload_item) => {
                let Some(payload_encoder) = &mut self.payload_encoder else {
                    if self.head_only || payload_item.is_eof() {
                        return Ok(());
                    }
                    error!("expect response head but receive payload item");
                    return Err(SendError::invalid_body("payload written without a response head"));
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

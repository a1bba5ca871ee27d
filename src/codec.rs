use bytes::{Buf, BytesMut};
use std::io;
use tokio_util::codec::Decoder;

/// Turns a byte stream in some legacy charset into UTF-8 chunks for the CSV reader.
pub struct Utf8Transcoder {
    decoder: encoding_rs::Decoder,
    flushed: bool,
}

impl Utf8Transcoder {
    pub fn new(encoding: &'static encoding_rs::Encoding) -> Self {
        Self {
            decoder: encoding.new_decoder(),
            flushed: false,
        }
    }

    fn transcode(&mut self, src: &mut BytesMut, last: bool) -> Option<BytesMut> {
        let capacity = self
            .decoder
            .max_utf8_buffer_length(src.len())
            .unwrap_or_else(|| src.len() * 3 + 4);
        let mut out = vec![0u8; capacity];

        // Unmappable bytes become U+FFFD; the CSV layer sees valid UTF-8 either way.
        let (_result, read, written, _had_replacements) =
            self.decoder.decode_to_utf8(src, &mut out, last);

        src.advance(read);
        if written == 0 {
            return None;
        }
        out.truncate(written);
        Some(BytesMut::from(&out[..]))
    }
}

impl Decoder for Utf8Transcoder {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        Ok(self.transcode(src, false))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // encoding_rs decoders must not be fed again after the final call.
        if self.flushed {
            buf.clear();
            return Ok(None);
        }
        self.flushed = true;
        let out = self.transcode(buf, true);
        buf.clear();
        Ok(out)
    }
}

//! Text <-> byte transcoding over [`ByteBuffer`]s
//!
//! Charsets are looked up by their WHATWG labels (`"UTF-8"`, `"GBK"`,
//! `"windows-1252"`, ...), except that the Latin-1 labels (`"ISO-8859-1"`,
//! `"latin1"`, ...) select true ISO-8859-1 rather than windows-1252. Each direction has a configurable action for input
//! it cannot handle:
//!
//! | action    | decoding malformed bytes | encoding unmappable chars |
//! |-----------|--------------------------|---------------------------|
//! | `Report`  | `Error::MalformedInput`  | `Error::UnmappableCharacter` |
//! | `Replace` | emits `U+FFFD`           | emits `?`                 |
//! | `Ignore`  | drops the bytes          | drops the character       |
//!
//! ```
//! use xchan_core::charset::{decode, encode, CodecConfig};
//!
//! let config = CodecConfig::new("UTF-8");
//! let mut bytes = encode("中国", &config)?;
//! assert_eq!(bytes.remaining(), 6);
//! assert_eq!(decode(&mut bytes, &config)?, "中国");
//! # Ok::<(), xchan_core::Error>(())
//! ```

use crate::buffer::ByteBuffer;
use crate::{Error, Result};
use encoding_rs::{DecoderResult, EncoderResult, Encoding};

/// What a coder does with input it cannot translate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CodingErrorAction {
    #[default]
    Report,
    Replace,
    Ignore,
}

/// Why a streaming coder call returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoderResult {
    /// All input was consumed; feed more or finish
    Underflow,
    /// The output buffer is full; drain it and call again with the rest
    Overflow,
}

/// Encoding name plus error actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    pub encoding: String,
    pub on_malformed_input: CodingErrorAction,
    pub on_unmappable_character: CodingErrorAction,
}

impl CodecConfig {
    pub fn new(encoding: impl Into<String>) -> Self {
        Self {
            encoding: encoding.into(),
            on_malformed_input: CodingErrorAction::Report,
            on_unmappable_character: CodingErrorAction::Report,
        }
    }

    pub fn with_malformed_input(mut self, action: CodingErrorAction) -> Self {
        self.on_malformed_input = action;
        self
    }

    pub fn with_unmappable_character(mut self, action: CodingErrorAction) -> Self {
        self.on_unmappable_character = action;
        self
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self::new("UTF-8")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Codec {
    Whatwg(&'static Encoding),
    // WHATWG folds these labels into windows-1252, which remaps 0x80..=0x9F
    Latin1,
}

const LATIN1_LABELS: &[&str] = &[
    "iso-8859-1", "iso8859-1", "iso88591", "iso_8859-1", "iso_8859_1", "8859_1", "latin1",
    "l1", "cp819", "ibm819",
];

/// A named character encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charset {
    codec: Codec,
}

impl Charset {
    /// Look up a charset by label, case-insensitively
    pub fn for_name(label: &str) -> Result<Self> {
        let trimmed = label.trim();
        if LATIN1_LABELS.iter().any(|l| l.eq_ignore_ascii_case(trimmed)) {
            return Ok(Self::latin_1());
        }
        Encoding::for_label(trimmed.as_bytes())
            .filter(|e| *e != encoding_rs::REPLACEMENT)
            .map(Self::whatwg)
            .ok_or_else(|| Error::UnsupportedCharset(label.to_string()))
    }

    fn whatwg(encoding: &'static Encoding) -> Self {
        Self {
            codec: Codec::Whatwg(encoding),
        }
    }

    pub fn utf_8() -> Self {
        Self::whatwg(encoding_rs::UTF_8)
    }

    /// ISO-8859-1: every byte is the code point of the same value
    pub fn latin_1() -> Self {
        Self {
            codec: Codec::Latin1,
        }
    }

    /// Canonical name, e.g. `"UTF-8"` or `"Shift_JIS"`
    pub fn name(&self) -> &'static str {
        match self.codec {
            Codec::Whatwg(encoding) => encoding.name(),
            Codec::Latin1 => "ISO-8859-1",
        }
    }

    pub fn new_encoder(&self) -> CharsetEncoder {
        CharsetEncoder::new(*self)
    }

    pub fn new_decoder(&self) -> CharsetDecoder {
        CharsetDecoder::new(*self)
    }

    /// One-shot encode, replacing unmappable characters
    ///
    /// The free [`encode`](crate::charset::encode) follows its [`CodecConfig`]
    /// instead, which reports by default.
    pub fn encode(&self, text: &str) -> Result<ByteBuffer> {
        self.new_encoder()
            .on_unmappable_character(CodingErrorAction::Replace)
            .encode(text)
    }

    /// One-shot decode, replacing malformed input
    ///
    /// The free [`decode`](crate::charset::decode) follows its [`CodecConfig`]
    /// instead, which reports by default.
    pub fn decode(&self, bytes: &mut ByteBuffer) -> Result<String> {
        self.new_decoder()
            .on_malformed_input(CodingErrorAction::Replace)
            .decode(bytes)
    }
}

impl std::fmt::Display for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Every supported charset, sorted by name
pub fn available_charsets() -> Vec<Charset> {
    use encoding_rs::*;

    let mut all: Vec<Charset> = [
        BIG5, EUC_JP, EUC_KR, GB18030, GBK, IBM866, ISO_2022_JP, ISO_8859_2, ISO_8859_3,
        ISO_8859_4, ISO_8859_5, ISO_8859_6, ISO_8859_7, ISO_8859_8, ISO_8859_8_I, ISO_8859_10,
        ISO_8859_13, ISO_8859_14, ISO_8859_15, ISO_8859_16, KOI8_R, KOI8_U, MACINTOSH,
        SHIFT_JIS, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_874, WINDOWS_1250, WINDOWS_1251,
        WINDOWS_1252, WINDOWS_1253, WINDOWS_1254, WINDOWS_1255, WINDOWS_1256, WINDOWS_1257,
        WINDOWS_1258, X_MAC_CYRILLIC, X_USER_DEFINED,
    ]
    .into_iter()
    .map(Charset::whatwg)
    .collect();
    all.push(Charset::latin_1());
    all.sort_by_key(|c| c.name());
    all
}

/// Encode `text` into a flipped buffer using `config`
pub fn encode(text: &str, config: &CodecConfig) -> Result<ByteBuffer> {
    Charset::for_name(&config.encoding)?
        .new_encoder()
        .on_unmappable_character(config.on_unmappable_character)
        .encode(text)
}

/// Decode the remaining bytes of `bytes` using `config`
pub fn decode(bytes: &mut ByteBuffer, config: &CodecConfig) -> Result<String> {
    Charset::for_name(&config.encoding)?
        .new_decoder()
        .on_malformed_input(config.on_malformed_input)
        .decode(bytes)
}

enum EncoderImpl {
    Whatwg(encoding_rs::Encoder),
    // WHATWG encoders emit UTF-8 for the UTF-16 labels
    Utf16 { big_endian: bool },
    Latin1,
}

/// Streaming text-to-bytes coder
///
/// Keeps stateful-encoding state and replacement bytes that did not fit the
/// last output buffer. Not meant to be shared across concurrent callers.
pub struct CharsetEncoder {
    charset: Charset,
    inner: EncoderImpl,
    on_unmappable: CodingErrorAction,
    replacement: Vec<u8>,
    pending: Vec<u8>,
}

impl CharsetEncoder {
    fn new(charset: Charset) -> Self {
        Self {
            charset,
            inner: Self::fresh(charset),
            on_unmappable: CodingErrorAction::Report,
            replacement: b"?".to_vec(),
            pending: Vec::new(),
        }
    }

    fn fresh(charset: Charset) -> EncoderImpl {
        match charset.codec {
            Codec::Latin1 => EncoderImpl::Latin1,
            Codec::Whatwg(e) if e == encoding_rs::UTF_16LE => {
                EncoderImpl::Utf16 { big_endian: false }
            }
            Codec::Whatwg(e) if e == encoding_rs::UTF_16BE => {
                EncoderImpl::Utf16 { big_endian: true }
            }
            Codec::Whatwg(e) => EncoderImpl::Whatwg(e.new_encoder()),
        }
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn on_unmappable_character(mut self, action: CodingErrorAction) -> Self {
        self.on_unmappable = action;
        self
    }

    /// Bytes written in place of an unmappable character under `Replace`
    pub fn with_replacement(mut self, replacement: &[u8]) -> Self {
        self.replacement = replacement.to_vec();
        self
    }

    /// Drop all carried state
    pub fn reset(&mut self) {
        self.inner = Self::fresh(self.charset);
        self.pending.clear();
    }

    /// Encode as much of `src` as fits into `dst`
    ///
    /// Returns why it stopped and how many bytes of `src` were consumed. Pass
    /// `last = true` with the final piece of input so stateful encodings can
    /// emit their closing sequence.
    pub fn encode_chunk(
        &mut self,
        src: &str,
        dst: &mut ByteBuffer,
        last: bool,
    ) -> Result<(CoderResult, usize)> {
        if !self.flush_pending(dst)? {
            return Ok((CoderResult::Overflow, 0));
        }
        match &mut self.inner {
            EncoderImpl::Utf16 { big_endian } => encode_utf16(src, dst, *big_endian),
            EncoderImpl::Latin1 => encode_latin1(
                src,
                dst,
                self.on_unmappable,
                &self.replacement,
                &mut self.pending,
            ),
            EncoderImpl::Whatwg(encoder) => {
                let mut read = 0;
                loop {
                    let (result, n, written) = {
                        let out = dst.remaining_slice_mut()?;
                        encoder.encode_from_utf8_without_replacement(&src[read..], out, last)
                    };
                    read += n;
                    dst.advance(written)?;

                    match result {
                        EncoderResult::InputEmpty => return Ok((CoderResult::Underflow, read)),
                        EncoderResult::OutputFull => return Ok((CoderResult::Overflow, read)),
                        EncoderResult::Unmappable(c) => match self.on_unmappable {
                            CodingErrorAction::Report => return Err(Error::UnmappableCharacter(c)),
                            CodingErrorAction::Ignore => {}
                            CodingErrorAction::Replace => {
                                self.pending.extend_from_slice(&self.replacement);
                                if !flush(&mut self.pending, dst)? {
                                    return Ok((CoderResult::Overflow, read));
                                }
                            }
                        },
                    }
                }
            }
        }
    }

    /// Encode all of `text` into a new buffer, flipped for reading
    ///
    /// Resets the encoder first.
    pub fn encode(&mut self, text: &str) -> Result<ByteBuffer> {
        self.reset();
        let mut out = ByteBuffer::allocate((text.len() + 16).next_power_of_two());
        let mut read = 0;
        loop {
            match self.encode_chunk(&text[read..], &mut out, true)? {
                (CoderResult::Underflow, n) => {
                    read += n;
                    break;
                }
                (CoderResult::Overflow, n) => {
                    read += n;
                    out = grow(out)?;
                }
            }
        }
        out.flip();
        Ok(out)
    }

    /// Write carried replacement bytes; false when `dst` filled up first
    fn flush_pending(&mut self, dst: &mut ByteBuffer) -> Result<bool> {
        flush(&mut self.pending, dst)
    }
}

fn flush(pending: &mut Vec<u8>, dst: &mut ByteBuffer) -> Result<bool> {
    let n = pending.len().min(dst.remaining());
    dst.put(&pending[..n])?;
    pending.drain(..n);
    Ok(pending.is_empty())
}

fn encode_utf16(src: &str, dst: &mut ByteBuffer, big_endian: bool) -> Result<(CoderResult, usize)> {
    let mut units = [0u16; 2];
    for (offset, c) in src.char_indices() {
        let encoded = c.encode_utf16(&mut units);
        if dst.remaining() < encoded.len() * 2 {
            return Ok((CoderResult::Overflow, offset));
        }
        for unit in encoded.iter() {
            let bytes = if big_endian {
                unit.to_be_bytes()
            } else {
                unit.to_le_bytes()
            };
            dst.put(&bytes)?;
        }
    }
    Ok((CoderResult::Underflow, src.len()))
}

fn encode_latin1(
    src: &str,
    dst: &mut ByteBuffer,
    on_unmappable: CodingErrorAction,
    replacement: &[u8],
    pending: &mut Vec<u8>,
) -> Result<(CoderResult, usize)> {
    for (offset, c) in src.char_indices() {
        match u8::try_from(c) {
            Ok(byte) => {
                if !dst.has_remaining() {
                    return Ok((CoderResult::Overflow, offset));
                }
                dst.put_u8(byte)?;
            }
            Err(_) => match on_unmappable {
                CodingErrorAction::Report => return Err(Error::UnmappableCharacter(c)),
                CodingErrorAction::Ignore => {}
                CodingErrorAction::Replace => {
                    pending.extend_from_slice(replacement);
                    if !flush(pending, dst)? {
                        return Ok((CoderResult::Overflow, offset + c.len_utf8()));
                    }
                }
            },
        }
    }
    Ok((CoderResult::Underflow, src.len()))
}

fn grow(mut out: ByteBuffer) -> Result<ByteBuffer> {
    let mut bigger = ByteBuffer::allocate(out.capacity().max(8) * 2);
    out.flip();
    bigger.put_buffer(&mut out)?;
    Ok(bigger)
}

enum DecoderImpl {
    Whatwg(encoding_rs::Decoder),
    Latin1,
}

impl DecoderImpl {
    fn fresh(charset: Charset) -> Self {
        match charset.codec {
            Codec::Whatwg(e) => DecoderImpl::Whatwg(e.new_decoder_without_bom_handling()),
            Codec::Latin1 => DecoderImpl::Latin1,
        }
    }
}

/// Streaming bytes-to-text coder
///
/// Incomplete multi-byte sequences at the end of one chunk are carried into
/// the next call. Not meant to be shared across concurrent callers.
pub struct CharsetDecoder {
    charset: Charset,
    inner: DecoderImpl,
    on_malformed: CodingErrorAction,
    replacement: String,
    consumed: usize,
}

impl CharsetDecoder {
    fn new(charset: Charset) -> Self {
        Self {
            charset,
            inner: DecoderImpl::fresh(charset),
            on_malformed: CodingErrorAction::Report,
            replacement: "\u{FFFD}".to_string(),
            consumed: 0,
        }
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn on_malformed_input(mut self, action: CodingErrorAction) -> Self {
        self.on_malformed = action;
        self
    }

    /// Text emitted in place of malformed input under `Replace`
    pub fn with_replacement(mut self, replacement: &str) -> Self {
        self.replacement = replacement.to_string();
        self
    }

    /// Drop all carried state
    pub fn reset(&mut self) {
        self.inner = DecoderImpl::fresh(self.charset);
        self.consumed = 0;
    }

    /// Decode the remaining bytes of `src`, appending to `dst`
    ///
    /// `src` is always consumed to its limit, except that a reported error
    /// leaves its position just past the malformed sequence. Pass
    /// `last = true` with the final chunk so a truncated trailing sequence is
    /// treated as malformed.
    pub fn decode_chunk(
        &mut self,
        src: &mut ByteBuffer,
        dst: &mut String,
        last: bool,
    ) -> Result<CoderResult> {
        let (read, outcome) = self.run(src.remaining_slice(), dst, last);
        src.advance(read)?;
        self.consumed += read;
        outcome.map(|_| CoderResult::Underflow)
    }

    fn run(&mut self, input: &[u8], dst: &mut String, last: bool) -> (usize, Result<()>) {
        let decoder = match &mut self.inner {
            DecoderImpl::Whatwg(decoder) => decoder,
            DecoderImpl::Latin1 => {
                dst.extend(input.iter().map(|&b| char::from(b)));
                return (input.len(), Ok(()));
            }
        };

        let mut read = 0;
        loop {
            let needed = decoder
                .max_utf8_buffer_length_without_replacement(input.len() - read)
                .unwrap_or(input.len() - read + 16);
            dst.reserve(needed.max(4));

            let (result, n) = decoder.decode_to_string_without_replacement(&input[read..], dst, last);
            read += n;

            match result {
                DecoderResult::InputEmpty => return (read, Ok(())),
                DecoderResult::OutputFull => continue,
                DecoderResult::Malformed(bad, after) => match self.on_malformed {
                    CodingErrorAction::Report => {
                        let start = (self.consumed + read)
                            .saturating_sub(after as usize + bad as usize);
                        let err = Error::MalformedInput {
                            offset: start,
                            length: bad as usize,
                        };
                        return (read, Err(err));
                    }
                    CodingErrorAction::Replace => dst.push_str(&self.replacement),
                    CodingErrorAction::Ignore => {}
                },
            }
        }
    }

    /// Decode all remaining bytes of `src` in one go
    ///
    /// Resets the decoder first.
    pub fn decode(&mut self, src: &mut ByteBuffer) -> Result<String> {
        self.reset();
        let mut out = String::with_capacity(src.remaining());
        self.decode_chunk(src, &mut out, true)?;
        Ok(out)
    }
}

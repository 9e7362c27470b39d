//! Frame encoding and decoding for the inter-controller link.
//!
//! Frame format (16-bit words):
//! - word 0: MARKER_BIT | metadata (PWM bit depth)
//! - words 1..=12: duty values for the transmitted half, in slot order
//! - word 13: wrapping sum of words 1..=12, marker bit masked off

/// Start-of-frame marker; never set in data or checksum words
pub const MARKER_BIT: u16 = 1 << 15;

/// Bits available to metadata, data and checksum words
pub const PAYLOAD_MASK: u16 = !MARKER_BIT;

/// Number of duty words per frame
pub const DATA_WORDS: usize = 12;

/// Position of the checksum word
pub const CHECKSUM_INDEX: usize = DATA_WORDS + 1;

/// Complete frame size in words
pub const FRAME_WORDS: usize = DATA_WORDS + 2;

/// Errors that can occur during frame encoding or decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Metadata does not fit below the marker bit
    MetadataOverflow,
    /// A duty value has the marker bit set
    DataOverflow,
    /// Non-marker word received before any start marker
    SpuriousWord,
    /// Accumulated sum did not match the checksum word
    ChecksumMismatch,
}

/// A decoded or constructed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    /// Metadata carried in the marker word (PWM bit depth)
    pub metadata: u16,
    /// Duty values for the receiving controller's tubes
    pub data: [u16; DATA_WORDS],
}

impl Frame {
    /// Create a frame, checking that no word collides with the marker bit
    pub fn new(metadata: u16, data: [u16; DATA_WORDS]) -> Result<Self, FrameError> {
        if metadata & MARKER_BIT != 0 {
            return Err(FrameError::MetadataOverflow);
        }
        if data.iter().any(|&word| word & MARKER_BIT != 0) {
            return Err(FrameError::DataOverflow);
        }
        Ok(Self { metadata, data })
    }

    /// Calculate the checksum word for a set of duty values
    pub fn checksum(data: &[u16]) -> u16 {
        data.iter()
            .fold(0u16, |sum, &word| sum.wrapping_add(word))
            & PAYLOAD_MASK
    }

    /// Encode this frame into its wire words
    pub fn encode(&self) -> [u16; FRAME_WORDS] {
        let mut words = [0u16; FRAME_WORDS];
        words[0] = MARKER_BIT | (self.metadata & PAYLOAD_MASK);
        words[1..CHECKSUM_INDEX].copy_from_slice(&self.data);
        words[CHECKSUM_INDEX] = Self::checksum(&self.data);
        words
    }
}

/// Streaming decoder for incoming words
///
/// Words are fed one at a time. A word with the marker bit always starts a
/// new frame, whatever state the decoder is in, so the decoder
/// resynchronises on the next marker after any corruption.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    state: DecodeState,
    /// Position of the last accepted word within the frame (0 = marker)
    index: usize,
    checksum: u16,
    metadata: u16,
    data: [u16; DATA_WORDS],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// No marker seen yet
    Searching,
    /// Accumulating words after a marker
    InFrame,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a decoder that waits for a start marker
    pub const fn new() -> Self {
        Self {
            state: DecodeState::Searching,
            index: 0,
            checksum: 0,
            metadata: 0,
            data: [0; DATA_WORDS],
        }
    }

    /// Forget any partial frame and wait for the next marker
    pub fn reset(&mut self) {
        self.state = DecodeState::Searching;
        self.index = 0;
        self.checksum = 0;
        self.metadata = 0;
    }

    /// Check whether a start marker has been seen for the current frame
    pub fn in_frame(&self) -> bool {
        self.state == DecodeState::InFrame
    }

    /// Feed a single word to the decoder
    ///
    /// Returns `Ok(Some(frame))` when a frame passes its checksum,
    /// `Ok(None)` when more words are needed, or `Err` for a word that was
    /// rejected. Errors are never fatal: decoding continues with the next
    /// word.
    pub fn feed(&mut self, word: u16) -> Result<Option<Frame>, FrameError> {
        if word & MARKER_BIT != 0 {
            self.state = DecodeState::InFrame;
            self.index = 0;
            self.checksum = 0;
            self.metadata = word & PAYLOAD_MASK;
            return Ok(None);
        }

        if self.state == DecodeState::Searching {
            return Err(FrameError::SpuriousWord);
        }

        self.index += 1;
        if self.index == CHECKSUM_INDEX {
            if word == self.checksum & PAYLOAD_MASK {
                let frame = Frame {
                    metadata: self.metadata,
                    data: self.data,
                };
                self.reset();
                return Ok(Some(frame));
            }
            // Keep the marker state: the words that follow are accumulated
            // as a fresh frame body until the next marker arrives.
            self.index = 0;
            self.checksum = 0;
            return Err(FrameError::ChecksumMismatch);
        }

        self.data[self.index - 1] = word;
        self.checksum = self.checksum.wrapping_add(word);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> [u16; DATA_WORDS] {
        [0, 1, 2, 100, 2047, 1024, 512, 256, 128, 64, 32, 16]
    }

    fn decode_all(decoder: &mut FrameDecoder, words: &[u16]) -> (Option<Frame>, u32) {
        let mut errors = 0;
        for &word in words {
            match decoder.feed(word) {
                Ok(Some(frame)) => return (Some(frame), errors),
                Ok(None) => {}
                Err(_) => errors += 1,
            }
        }
        (None, errors)
    }

    #[test]
    fn test_frame_encode_layout() {
        let frame = Frame::new(11, sample_data()).unwrap();
        let words = frame.encode();

        assert_eq!(words.len(), FRAME_WORDS);
        assert_eq!(words[0], MARKER_BIT | 11);
        assert_eq!(&words[1..13], &sample_data());
        let sum: u32 = sample_data().iter().map(|&w| w as u32).sum();
        assert_eq!(words[13], (sum as u16) & PAYLOAD_MASK);
    }

    #[test]
    fn test_checksum_masks_marker_bit() {
        // 0x4000 * 2 = 0x8000, which would collide with the marker
        let mut data = [0u16; DATA_WORDS];
        data[0] = 0x4000;
        data[1] = 0x4000;
        let frame = Frame::new(11, data).unwrap();
        assert_eq!(frame.encode()[CHECKSUM_INDEX], 0);
    }

    #[test]
    fn test_frame_rejects_marker_collisions() {
        let mut data = sample_data();
        data[3] = 0x8001;
        assert_eq!(Frame::new(11, data), Err(FrameError::DataOverflow));
        assert_eq!(
            Frame::new(0x8000, sample_data()),
            Err(FrameError::MetadataOverflow)
        );
    }

    #[test]
    fn test_decode_roundtrip() {
        let frame = Frame::new(11, sample_data()).unwrap();
        let mut decoder = FrameDecoder::new();

        let (decoded, errors) = decode_all(&mut decoder, &frame.encode());

        assert_eq!(decoded, Some(frame));
        assert_eq!(errors, 0);
        assert!(!decoder.in_frame());
    }

    #[test]
    fn test_spurious_words_before_marker_are_errors() {
        let frame = Frame::new(9, sample_data()).unwrap();
        let mut decoder = FrameDecoder::new();

        assert_eq!(decoder.feed(0x0123), Err(FrameError::SpuriousWord));
        assert_eq!(decoder.feed(0x0042), Err(FrameError::SpuriousWord));

        let (decoded, errors) = decode_all(&mut decoder, &frame.encode());
        assert_eq!(decoded, Some(frame));
        assert_eq!(errors, 0);
    }

    #[test]
    fn test_corrupted_word_counts_one_error_then_recovers() {
        let first = Frame::new(11, sample_data()).unwrap();
        let mut second_data = sample_data();
        second_data[0] = 777;
        let second = Frame::new(11, second_data).unwrap();

        let mut stream = [0u16; FRAME_WORDS * 2];
        stream[..FRAME_WORDS].copy_from_slice(&first.encode());
        stream[FRAME_WORDS..].copy_from_slice(&second.encode());
        stream[5] ^= 0x0004; // flip a data bit in the first frame

        let mut decoder = FrameDecoder::new();
        let (decoded, errors) = decode_all(&mut decoder, &stream);

        assert_eq!(errors, 1);
        assert_eq!(decoded, Some(second));
    }

    #[test]
    fn test_marker_mid_frame_restarts() {
        let frame = Frame::new(11, sample_data()).unwrap();
        let words = frame.encode();

        let mut decoder = FrameDecoder::new();
        // Half a frame, then a complete one: the second marker wins
        for &word in &words[..6] {
            assert_eq!(decoder.feed(word), Ok(None));
        }
        let (decoded, errors) = decode_all(&mut decoder, &words);
        assert_eq!(decoded, Some(frame));
        assert_eq!(errors, 0);
    }

    #[test]
    fn test_mismatch_keeps_marker_state() {
        let frame = Frame::new(11, sample_data()).unwrap();
        let mut words = frame.encode();
        words[CHECKSUM_INDEX] ^= 1;

        let mut decoder = FrameDecoder::new();
        let (decoded, errors) = decode_all(&mut decoder, &words);
        assert_eq!(decoded, None);
        assert_eq!(errors, 1);
        // Following words are accumulated, not reported as spurious
        assert!(decoder.in_frame());
        assert_eq!(decoder.feed(5), Ok(None));
    }
}

//! Inter-controller frame protocol
//!
//! This crate defines the only bit-exact wire contract of the clock: the
//! frame the primary controller streams to the secondary once per display
//! refresh. The link carries 16-bit words (16n1 serial); bit 15 of every
//! word is reserved as a start-of-frame marker.
//!
//! # Frame Layout
//!
//! ```text
//! ┌──────────────────┬──────────┬─────┬───────────┬──────────────┐
//! │ MARKER | bits    │ duty[0]  │ ... │ duty[11]  │ CHECKSUM     │
//! │ word 0           │ word 1   │     │ word 12   │ word 13      │
//! └──────────────────┴──────────┴─────┴───────────┴──────────────┘
//! ```
//!
//! The checksum is the wrapping sum of the twelve duty words with the
//! marker bit masked off. It catches dropped or flipped words on the link;
//! it is not an integrity guarantee against deliberate tampering.
//!
//! Each frame carries the full state of the transmitted half, so a lost
//! frame is simply superseded by the next one. There is no retransmission.

#![no_std]
#![deny(unsafe_code)]

pub mod frame;

pub use frame::{
    Frame, FrameDecoder, FrameError, CHECKSUM_INDEX, DATA_WORDS, FRAME_WORDS, MARKER_BIT,
    PAYLOAD_MASK,
};

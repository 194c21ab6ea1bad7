use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use pico_core::block::Block;
use pico_core::constants::MAX_FRAME_BYTES;
use pico_core::error::PicoError;
use pico_core::transaction::Transaction;

use crate::peer::Peer;

/// One gossip frame: a zlib-deflated JSON object carrying any of the known
/// top-level keys. Unknown keys are ignored on receipt; an object with no
/// known key dispatches to nothing and dies quietly.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peers: Option<Vec<Peer>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<Block>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trans: Option<Transaction>,
}

impl Envelope {
    pub fn peers(peers: Vec<Peer>) -> Self {
        Self {
            peers: Some(peers),
            ..Self::default()
        }
    }

    pub fn block(block: Block) -> Self {
        Self {
            block: Some(block),
            ..Self::default()
        }
    }

    pub fn trans(trans: Transaction) -> Self {
        Self {
            trans: Some(trans),
            ..Self::default()
        }
    }

    /// Compress for the wire.
    pub fn to_frame(&self) -> Vec<u8> {
        let json = serde_json::to_vec(self).expect("envelope serialization is infallible");
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&json)
            .expect("in-memory deflate is infallible");
        encoder.finish().expect("in-memory deflate is infallible")
    }

    /// Inflate and parse a received frame, refusing anything that inflates
    /// past the frame cap.
    pub fn from_frame(frame: &[u8]) -> Result<Self, PicoError> {
        let mut inflated = Vec::new();
        ZlibDecoder::new(frame)
            .take(MAX_FRAME_BYTES as u64 + 1)
            .read_to_end(&mut inflated)?;
        if inflated.len() > MAX_FRAME_BYTES {
            return Err(PicoError::FrameTooLarge {
                max: MAX_FRAME_BYTES,
            });
        }
        Ok(serde_json::from_slice(&inflated)?)
    }
}

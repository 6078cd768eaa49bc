//! Block header and body shapes consumed by the pool's head tracking.

use crate::transaction::SignedTransaction;
use ember_crypto::keccak256;
use ember_primitives::H256;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

/// Block header.
///
/// Only the fields the transaction pool depends on: chain linkage for the
/// reorg walk, the state root to validate against, and the gas limit used
/// as the affordability ceiling.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct BlockHeader {
    /// Hash of the parent block
    pub parent_hash: H256,
    /// Block height
    pub number: u64,
    /// State root after executing this block
    pub state_root: H256,
    /// Gas limit of this block
    pub gas_limit: u64,
    /// Unix timestamp in seconds
    pub timestamp: u64,
}

impl BlockHeader {
    /// Content hash: keccak-256 of the RLP encoding.
    pub fn hash(&self) -> H256 {
        keccak256(rlp::encode(self))
    }
}

impl Encodable for BlockHeader {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(5);
        s.append(&self.parent_hash);
        s.append(&self.number);
        s.append(&self.state_root);
        s.append(&self.gas_limit);
        s.append(&self.timestamp);
    }
}

impl Decodable for BlockHeader {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 5 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(BlockHeader {
            parent_hash: rlp.val_at(0)?,
            number: rlp.val_at(1)?,
            state_root: rlp.val_at(2)?,
            gas_limit: rlp.val_at(3)?,
            timestamp: rlp.val_at(4)?,
        })
    }
}

/// Block body: the transactions the block includes.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct BlockBody {
    /// Included transactions in execution order
    pub transactions: Vec<SignedTransaction>,
}

/// A complete block.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Block {
    /// Block header
    pub header: BlockHeader,
    /// Block body
    pub body: BlockBody,
}

impl Block {
    /// Header hash.
    pub fn hash(&self) -> H256 {
        self.header.hash()
    }

    /// Block height.
    pub fn number(&self) -> u64 {
        self.header.number
    }
}

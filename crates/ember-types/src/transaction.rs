//! Signed transfer transactions.

use crate::TypeError;
use bytes::Bytes;
use ember_crypto::{keccak256, recover, sign, PrivateKey, Signature};
use ember_primitives::{Address, H256, U256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

/// The unsigned portion of a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxMessage {
    /// Sender-sequence number
    pub nonce: u64,
    /// Price offered per unit of gas, the pool's ordering key
    pub gas_price: u128,
    /// Gas ceiling declared by the sender
    pub gas_limit: u64,
    /// Recipient; `None` creates a contract
    pub to: Option<Address>,
    /// Transferred value
    pub value: U256,
    /// Call data / init code
    pub payload: Bytes,
}

impl TxMessage {
    /// Hash the message for signing.
    pub fn sighash(&self) -> H256 {
        keccak256(rlp::encode(self))
    }

    /// Sign the message with `key`.
    pub fn sign(self, key: &PrivateKey) -> Result<SignedTransaction, TypeError> {
        let signature = sign(&self.sighash(), key)?;
        Ok(SignedTransaction {
            message: self,
            signature,
        })
    }

    /// Attach an externally produced signature.
    pub fn into_signed(self, signature: Signature) -> SignedTransaction {
        SignedTransaction {
            message: self,
            signature,
        }
    }
}

impl Default for TxMessage {
    fn default() -> Self {
        Self {
            nonce: 0,
            gas_price: 0,
            gas_limit: 21_000,
            to: None,
            value: U256::zero(),
            payload: Bytes::new(),
        }
    }
}

/// A transaction plus its recoverable signature.
///
/// Immutable once built; the pool wraps it with cached hash/sender/size
/// metadata rather than caching here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    /// The signed-over message
    pub message: TxMessage,
    /// Recoverable ECDSA signature
    pub signature: Signature,
}

impl SignedTransaction {
    /// Transaction nonce.
    pub fn nonce(&self) -> u64 {
        self.message.nonce
    }

    /// Offered gas price.
    pub fn gas_price(&self) -> u128 {
        self.message.gas_price
    }

    /// Declared gas limit.
    pub fn gas_limit(&self) -> u64 {
        self.message.gas_limit
    }

    /// Recipient, if any.
    pub fn to(&self) -> Option<&Address> {
        self.message.to.as_ref()
    }

    /// Transferred value.
    pub fn value(&self) -> U256 {
        self.message.value
    }

    /// Call data / init code.
    pub fn payload(&self) -> &Bytes {
        &self.message.payload
    }

    /// Whether this transaction creates a contract.
    pub fn is_creation(&self) -> bool {
        self.message.to.is_none()
    }

    /// Maximum balance this transaction can consume:
    /// `value + gas_price * gas_limit`.
    pub fn cost(&self) -> U256 {
        self.message.value
            + U256::from(self.message.gas_price) * U256::from(self.message.gas_limit)
    }

    /// Content hash: keccak-256 of the RLP encoding.
    pub fn hash(&self) -> H256 {
        keccak256(rlp::encode(self))
    }

    /// Serialized length in bytes, the basis for pool slot accounting.
    pub fn size(&self) -> usize {
        rlp::encode(self).len()
    }

    /// Whether a signature is present at all (non-zero `r` and `s`).
    pub fn is_signed(&self) -> bool {
        self.signature.is_present()
    }

    /// Recover the sender address from the signature.
    pub fn recover_sender(&self) -> Result<Address, TypeError> {
        if !self.is_signed() {
            return Err(TypeError::NotSigned);
        }
        Ok(recover(&self.message.sighash(), &self.signature)?)
    }
}

fn append_message_fields(s: &mut RlpStream, message: &TxMessage) {
    s.append(&message.nonce);
    s.append(&U256::from(message.gas_price));
    s.append(&message.gas_limit);
    match &message.to {
        Some(addr) => s.append(addr),
        None => s.append_empty_data(),
    };
    s.append(&message.value);
    s.append(&message.payload.to_vec());
}

fn decode_message_fields(rlp: &Rlp) -> Result<TxMessage, DecoderError> {
    let to_item = rlp.at(3)?;
    let to = if to_item.is_empty() {
        None
    } else {
        Some(to_item.as_val()?)
    };
    let gas_price: U256 = rlp.val_at(1)?;
    if gas_price > U256::from(u128::MAX) {
        return Err(DecoderError::Custom("gas price exceeds u128"));
    }
    Ok(TxMessage {
        nonce: rlp.val_at(0)?,
        gas_price: gas_price.as_u128(),
        gas_limit: rlp.val_at(2)?,
        to,
        value: rlp.val_at(4)?,
        payload: Bytes::from(rlp.val_at::<Vec<u8>>(5)?),
    })
}

impl Encodable for TxMessage {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(6);
        append_message_fields(s, self);
    }
}

impl Encodable for SignedTransaction {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(9);
        append_message_fields(s, &self.message);
        s.append(&(self.signature.v as u64));
        s.append(&H256::from_bytes(self.signature.r));
        s.append(&H256::from_bytes(self.signature.s));
    }
}

impl Decodable for SignedTransaction {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 9 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let message = decode_message_fields(rlp)?;
        let v: u64 = rlp.val_at(6)?;
        if v > u8::MAX as u64 {
            return Err(DecoderError::Custom("recovery id exceeds u8"));
        }
        let r: H256 = rlp.val_at(7)?;
        let s: H256 = rlp.val_at(8)?;
        Ok(SignedTransaction {
            message,
            signature: Signature::new(*r.as_bytes(), *s.as_bytes(), v as u8),
        })
    }
}

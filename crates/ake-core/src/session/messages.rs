//! Session message types

use crate::transport::Frame;
use crate::{Error, Result, Signature};
use num_bigint::BigUint;

/// Acknowledgement sent by the initiator once the reply verified
pub const ACK_TEXT: &str = "Signature verified, key exchange successful.";

/// Abort sent by the responder when the initiator's signature fails
pub const ABORT_INITIATOR_SIGNATURE: &str = "Signature verification failed for Alice.";

/// Abort sent by the initiator when the responder's signature fails
pub const ABORT_RESPONDER_SIGNATURE: &str = "Signature verification failed for Bob.";

/// Abort sent when the announced `b` or `N` differ from the local credential
pub const ABORT_PARAMETERS: &str = "Announced parameters do not match.";

/// Abort sent when the key confirmation tags differ
pub const ABORT_KEY_MISMATCH: &str = "Session keys do not match.";

/// Round 1 (initiator → responder): `(A, K_A, b, N)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hello {
    pub value: BigUint,
    pub signature: Signature,
    pub b: BigUint,
    pub n: BigUint,
}

/// Round 2 (responder → initiator): `(B, K_B)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub value: BigUint,
    pub signature: Signature,
}

/// Round 4 (initiator → responder): ciphertext and key confirmation tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub ciphertext: BigUint,
    pub key_tag: BigUint,
}

/// Round 5 (responder → initiator): recovered plaintext
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub plaintext: BigUint,
}

impl From<Hello> for Frame {
    fn from(msg: Hello) -> Self {
        Frame::Integers(vec![msg.value, msg.signature.0, msg.b, msg.n])
    }
}

impl TryFrom<Frame> for Hello {
    type Error = Error;

    fn try_from(frame: Frame) -> Result<Self> {
        let mut fields = frame.into_integers(4, "hello")?.into_iter();
        match (fields.next(), fields.next(), fields.next(), fields.next()) {
            (Some(value), Some(signature), Some(b), Some(n)) => Ok(Hello {
                value,
                signature: Signature(signature),
                b,
                n,
            }),
            _ => Err(Error::UnexpectedMessage("hello: missing fields".into())),
        }
    }
}

impl From<Reply> for Frame {
    fn from(msg: Reply) -> Self {
        Frame::Integers(vec![msg.value, msg.signature.0])
    }
}

impl TryFrom<Frame> for Reply {
    type Error = Error;

    fn try_from(frame: Frame) -> Result<Self> {
        let mut fields = frame.into_integers(2, "reply")?.into_iter();
        match (fields.next(), fields.next()) {
            (Some(value), Some(signature)) => Ok(Reply {
                value,
                signature: Signature(signature),
            }),
            _ => Err(Error::UnexpectedMessage("reply: missing fields".into())),
        }
    }
}

impl From<Sealed> for Frame {
    fn from(msg: Sealed) -> Self {
        Frame::Integers(vec![msg.ciphertext, msg.key_tag])
    }
}

impl TryFrom<Frame> for Sealed {
    type Error = Error;

    fn try_from(frame: Frame) -> Result<Self> {
        let mut fields = frame.into_integers(2, "ciphertext")?.into_iter();
        match (fields.next(), fields.next()) {
            (Some(ciphertext), Some(key_tag)) => Ok(Sealed {
                ciphertext,
                key_tag,
            }),
            _ => Err(Error::UnexpectedMessage("ciphertext: missing fields".into())),
        }
    }
}

impl From<Receipt> for Frame {
    fn from(msg: Receipt) -> Self {
        Frame::Integers(vec![msg.plaintext])
    }
}

impl TryFrom<Frame> for Receipt {
    type Error = Error;

    fn try_from(frame: Frame) -> Result<Self> {
        let plaintext = frame
            .into_integers(1, "receipt")?
            .pop()
            .ok_or_else(|| Error::UnexpectedMessage("receipt: missing plaintext".into()))?;
        Ok(Receipt { plaintext })
    }
}

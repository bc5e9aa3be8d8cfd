//! Call-data codec for the feeds contract endpoints
//!
//! Every argument list is a counted list: a big-endian `u32` count followed by
//! that many items.
//!
//! ```text
//! update: keys    count x (u32 len || key)
//!         datas   count x (u8 data || u32 heartbeat || u32 timestamp || u32 len || price)
//!         sigs    count x (32-byte signer || 65-byte signature)
//! reset:  keys, sigs
//! ```

use ethers::types::{H256, U256};

use crate::protocol::encoder::minimal_be_bytes;
use crate::types::{
    ChainAddress, PriceData, PriceKey, PricePayload, PriceUpdate, QuorumSubmission,
    SignatureEntry, SIGNATURE_LEN,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("truncated call data: need {needed} bytes at offset {offset}, {remaining} left")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("{0} trailing bytes after last argument")]
    TrailingBytes(usize),

    #[error("price key must be 32 bytes, got {0}")]
    BadKeyLength(usize),

    #[error("price encoding of {0} bytes exceeds 256 bits")]
    PriceTooLarge(usize),

    #[error("{keys} keys but {datas} price records")]
    LengthMismatch { keys: usize, datas: usize },

    #[error("signature {index} is {len} bytes, expected {}", SIGNATURE_LEN)]
    BadSignatureLength { index: usize, len: usize },

    #[error("submission mixes full and reset payloads")]
    MixedPayloads,

    #[error("submission carries no updates")]
    Empty,

    #[error("unknown endpoint {0:?}")]
    UnknownFunction(String),
}

/// Decoded arguments of one contract call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCall {
    Update {
        keys: Vec<PriceKey>,
        datas: Vec<PriceData>,
        signatures: Vec<SignatureEntry>,
    },
    Reset {
        keys: Vec<PriceKey>,
        signatures: Vec<SignatureEntry>,
    },
}

impl UpdateCall {
    /// Split a submission into the endpoint that carries it
    pub fn from_submission(submission: &QuorumSubmission) -> Result<Self, CodecError> {
        if submission.updates.is_empty() {
            return Err(CodecError::Empty);
        }
        // the wire frames signatures at a fixed width
        if let Some((index, s)) = submission
            .signatures
            .iter()
            .enumerate()
            .find(|(_, s)| s.signature.len() != SIGNATURE_LEN)
        {
            return Err(CodecError::BadSignatureLength {
                index,
                len: s.signature.len(),
            });
        }
        let keys: Vec<_> = submission.updates.iter().map(|u| u.key).collect();
        let signatures = submission.signatures.clone();
        if submission.updates.iter().all(|u| u.payload.is_reset()) {
            return Ok(UpdateCall::Reset { keys, signatures });
        }
        let datas = submission
            .updates
            .iter()
            .map(|u| match &u.payload {
                PricePayload::Full(d) => Ok(d.clone()),
                PricePayload::Reset => Err(CodecError::MixedPayloads),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(UpdateCall::Update {
            keys,
            datas,
            signatures,
        })
    }

    pub fn into_submission(self) -> Result<QuorumSubmission, CodecError> {
        let submission = match self {
            UpdateCall::Update {
                keys,
                datas,
                signatures,
            } => {
                if keys.len() != datas.len() {
                    return Err(CodecError::LengthMismatch {
                        keys: keys.len(),
                        datas: datas.len(),
                    });
                }
                QuorumSubmission {
                    updates: keys
                        .into_iter()
                        .zip(datas)
                        .map(|(k, d)| PriceUpdate::new(k, PricePayload::Full(d)))
                        .collect(),
                    signatures,
                }
            }
            UpdateCall::Reset { keys, signatures } => QuorumSubmission {
                updates: keys
                    .into_iter()
                    .map(|k| PriceUpdate::new(k, PricePayload::Reset))
                    .collect(),
                signatures,
            },
        };
        Ok(submission)
    }

    pub fn function_name(&self) -> &'static str {
        match self {
            UpdateCall::Update { .. } => "update",
            UpdateCall::Reset { .. } => "reset",
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            UpdateCall::Update {
                keys,
                datas,
                signatures,
            } => {
                write_keys(keys, &mut out);
                write_count(datas.len(), &mut out);
                for d in datas {
                    out.push(d.data);
                    out.extend_from_slice(&d.heartbeat.to_be_bytes());
                    out.extend_from_slice(&d.timestamp.to_be_bytes());
                    write_bytes(&minimal_be_bytes(&d.price), &mut out);
                }
                write_signatures(signatures, &mut out);
            }
            UpdateCall::Reset { keys, signatures } => {
                write_keys(keys, &mut out);
                write_signatures(signatures, &mut out);
            }
        }
        out
    }

    pub fn decode(function: &str, args: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(args);
        let call = match function {
            "update" => {
                let keys = read_keys(&mut r)?;
                let count = r.count()?;
                let mut datas = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    let data = r.u8()?;
                    let heartbeat = r.u32()?;
                    let timestamp = r.u32()?;
                    let price = r.bytes()?;
                    if price.len() > 32 {
                        return Err(CodecError::PriceTooLarge(price.len()));
                    }
                    datas.push(PriceData {
                        data,
                        heartbeat,
                        timestamp,
                        price: U256::from_big_endian(price),
                    });
                }
                let signatures = read_signatures(&mut r)?;
                UpdateCall::Update {
                    keys,
                    datas,
                    signatures,
                }
            }
            "reset" => {
                let keys = read_keys(&mut r)?;
                let signatures = read_signatures(&mut r)?;
                UpdateCall::Reset { keys, signatures }
            }
            other => return Err(CodecError::UnknownFunction(other.to_string())),
        };
        r.finish()?;
        Ok(call)
    }
}

fn write_count(n: usize, out: &mut Vec<u8>) {
    out.extend_from_slice(&(n as u32).to_be_bytes());
}

fn write_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    write_count(bytes.len(), out);
    out.extend_from_slice(bytes);
}

fn write_keys(keys: &[PriceKey], out: &mut Vec<u8>) {
    write_count(keys.len(), out);
    for k in keys {
        write_bytes(k.as_bytes(), out);
    }
}

fn write_signatures(signatures: &[SignatureEntry], out: &mut Vec<u8>) {
    write_count(signatures.len(), out);
    for s in signatures {
        out.extend_from_slice(s.signer.as_bytes());
        out.extend_from_slice(&s.signature);
    }
}

fn read_keys(r: &mut Reader<'_>) -> Result<Vec<PriceKey>, CodecError> {
    let count = r.count()?;
    let mut keys = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let raw = r.bytes()?;
        if raw.len() != 32 {
            return Err(CodecError::BadKeyLength(raw.len()));
        }
        keys.push(PriceKey(H256::from_slice(raw)));
    }
    Ok(keys)
}

fn read_signatures(r: &mut Reader<'_>) -> Result<Vec<SignatureEntry>, CodecError> {
    let count = r.count()?;
    let mut signatures = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let signer = ChainAddress(H256::from_slice(r.take(32)?));
        let signature = r.take(SIGNATURE_LEN)?.to_vec();
        signatures.push(SignatureEntry { signer, signature });
    }
    Ok(signatures)
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let remaining = self.buf.len() - self.pos;
        if n > remaining {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed: n,
                remaining,
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, CodecError> {
        let raw = self.take(4)?;
        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn count(&mut self) -> Result<usize, CodecError> {
        Ok(self.u32()? as usize)
    }

    fn bytes(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.count()?;
        self.take(len)
    }

    fn finish(self) -> Result<(), CodecError> {
        match self.buf.len() - self.pos {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}

//! Soroban `ScVal`: the native value model plus its XDR decoder/encoder.
//!
//! Only the arms that can appear in contract event topics and data are
//! modelled; ledger-key and contract-instance arms decode to
//! [`DecodeError::Unsupported`].

use num_bigint::{BigInt, BigUint, Sign};

use crate::error::{DecodeError, EncodingError};
use crate::strkey::{self, Version};
use crate::xdr::{XdrReader, XdrWriter};

/// Maximum vec/map nesting accepted by the decoder.
pub const MAX_DEPTH: usize = 64;

mod tag {
    pub const BOOL: u32 = 0;
    pub const VOID: u32 = 1;
    pub const ERROR: u32 = 2;
    pub const U32: u32 = 3;
    pub const I32: u32 = 4;
    pub const U64: u32 = 5;
    pub const I64: u32 = 6;
    pub const TIMEPOINT: u32 = 7;
    pub const DURATION: u32 = 8;
    pub const U128: u32 = 9;
    pub const I128: u32 = 10;
    pub const U256: u32 = 11;
    pub const I256: u32 = 12;
    pub const BYTES: u32 = 13;
    pub const STRING: u32 = 14;
    pub const SYMBOL: u32 = 15;
    pub const VEC: u32 = 16;
    pub const MAP: u32 = 17;
    pub const ADDRESS: u32 = 18;
    pub const CONTRACT_INSTANCE: u32 = 19;
    pub const LEDGER_KEY_CONTRACT_INSTANCE: u32 = 20;
    pub const LEDGER_KEY_NONCE: u32 = 21;
}

// ─── Address ──────────────────────────────────────────────────────────────────

/// `ScAddress`: every variant renders as a strkey.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScAddress {
    Account([u8; 32]),
    Contract([u8; 32]),
    MuxedAccount { id: u64, key: [u8; 32] },
    ClaimableBalance([u8; 32]),
    LiquidityPool([u8; 32]),
}

impl ScAddress {
    /// Canonical `G…`/`C…`/`M…`/`B…`/`L…` form.
    pub fn to_strkey(&self) -> String {
        match self {
            Self::Account(k) => strkey::encode(Version::Account, k),
            Self::Contract(h) => strkey::encode(Version::Contract, h),
            Self::MuxedAccount { id, key } => {
                let mut payload = key.to_vec();
                payload.extend_from_slice(&id.to_be_bytes());
                strkey::encode(Version::MuxedAccount, &payload)
            }
            Self::ClaimableBalance(h) => {
                // leading byte is the ClaimableBalanceIdType (V0)
                let mut payload = vec![0u8];
                payload.extend_from_slice(h);
                strkey::encode(Version::ClaimableBalance, &payload)
            }
            Self::LiquidityPool(h) => strkey::encode(Version::LiquidityPool, h),
        }
    }

    pub fn from_strkey(s: &str) -> Result<Self, EncodingError> {
        let invalid = |reason: String| EncodingError::InvalidAddress {
            address: s.to_string(),
            reason,
        };
        let (version, payload) = strkey::decode(s).map_err(|e| invalid(e.to_string()))?;
        let key32 = |bytes: &[u8]| -> Result<[u8; 32], EncodingError> {
            bytes
                .try_into()
                .map_err(|_| invalid(format!("expected 32 bytes, got {}", bytes.len())))
        };
        Ok(match version {
            Version::Account => Self::Account(key32(&payload)?),
            Version::Contract => Self::Contract(key32(&payload)?),
            Version::LiquidityPool => Self::LiquidityPool(key32(&payload)?),
            Version::MuxedAccount => {
                let (key, id) = payload.split_at(32);
                let id = u64::from_be_bytes(
                    id.try_into()
                        .map_err(|_| invalid("bad muxed id".into()))?,
                );
                Self::MuxedAccount {
                    id,
                    key: key32(key)?,
                }
            }
            Version::ClaimableBalance => {
                if payload[0] != 0 {
                    return Err(invalid(format!("unknown balance id type {}", payload[0])));
                }
                Self::ClaimableBalance(key32(&payload[1..])?)
            }
        })
    }

    fn decode(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        match r.read_i32()? {
            0 => match r.read_i32()? {
                0 => Ok(Self::Account(r.read_fixed()?)),
                v => Err(DecodeError::InvalidDiscriminant {
                    what: "PublicKeyType",
                    value: v.into(),
                }),
            },
            1 => Ok(Self::Contract(r.read_fixed()?)),
            2 => {
                let id = r.read_u64()?;
                let key = r.read_fixed()?;
                Ok(Self::MuxedAccount { id, key })
            }
            3 => match r.read_i32()? {
                0 => Ok(Self::ClaimableBalance(r.read_fixed()?)),
                v => Err(DecodeError::InvalidDiscriminant {
                    what: "ClaimableBalanceIDType",
                    value: v.into(),
                }),
            },
            4 => Ok(Self::LiquidityPool(r.read_fixed()?)),
            v => Err(DecodeError::InvalidDiscriminant {
                what: "ScAddressType",
                value: v.into(),
            }),
        }
    }

    fn encode(&self, w: &mut XdrWriter) {
        match self {
            Self::Account(k) => {
                w.write_i32(0);
                w.write_i32(0);
                w.write_fixed(k);
            }
            Self::Contract(h) => {
                w.write_i32(1);
                w.write_fixed(h);
            }
            Self::MuxedAccount { id, key } => {
                w.write_i32(2);
                w.write_u64(*id);
                w.write_fixed(key);
            }
            Self::ClaimableBalance(h) => {
                w.write_i32(3);
                w.write_i32(0);
                w.write_fixed(h);
            }
            Self::LiquidityPool(h) => {
                w.write_i32(4);
                w.write_fixed(h);
            }
        }
    }
}

// ─── Error ────────────────────────────────────────────────────────────────────

/// `ScError`: host or contract error carried as a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScError {
    pub kind: ScErrorType,
    /// Contract-defined code for `Contract`, otherwise the `ScErrorCode`.
    pub code: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScErrorType {
    Contract,
    WasmVm,
    Context,
    Storage,
    Object,
    Crypto,
    Events,
    Budget,
    Value,
    Auth,
}

impl ScErrorType {
    const ALL: [Self; 10] = [
        Self::Contract,
        Self::WasmVm,
        Self::Context,
        Self::Storage,
        Self::Object,
        Self::Crypto,
        Self::Events,
        Self::Budget,
        Self::Value,
        Self::Auth,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Contract => "contract",
            Self::WasmVm => "wasm_vm",
            Self::Context => "context",
            Self::Storage => "storage",
            Self::Object => "object",
            Self::Crypto => "crypto",
            Self::Events => "events",
            Self::Budget => "budget",
            Self::Value => "value",
            Self::Auth => "auth",
        }
    }
}

/// Number of defined `ScErrorCode` values (arith_domain … unexpected_size).
const SC_ERROR_CODES: u32 = 10;

impl ScError {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        let t = r.read_i32()?;
        let kind = usize::try_from(t)
            .ok()
            .and_then(|i| ScErrorType::ALL.get(i).copied())
            .ok_or(DecodeError::InvalidDiscriminant {
                what: "ScErrorType",
                value: t.into(),
            })?;
        let code = match kind {
            ScErrorType::Contract => r.read_u32()?,
            _ => {
                let c = r.read_i32()?;
                match u32::try_from(c) {
                    Ok(c) if c < SC_ERROR_CODES => c,
                    _ => {
                        return Err(DecodeError::InvalidDiscriminant {
                            what: "ScErrorCode",
                            value: c.into(),
                        })
                    }
                }
            }
        };
        Ok(Self { kind, code })
    }

    fn encode(&self, w: &mut XdrWriter) {
        let idx = ScErrorType::ALL
            .iter()
            .position(|k| *k == self.kind)
            .unwrap_or(0);
        w.write_i32(idx as i32);
        w.write_u32(self.code);
    }
}

// ─── ScValue ──────────────────────────────────────────────────────────────────

/// A decoded `ScVal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScValue {
    Bool(bool),
    Void,
    Error(ScError),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    Timepoint(u64),
    Duration(u64),
    U128(u128),
    I128(i128),
    U256(BigUint),
    I256(BigInt),
    Bytes(Vec<u8>),
    String(String),
    Symbol(String),
    Vec(Vec<ScValue>),
    /// Entries in wire order.
    Map(Vec<(ScValue, ScValue)>),
    Address(ScAddress),
}

impl ScValue {
    /// Decode one `ScVal` from raw XDR, rejecting trailing bytes.
    pub fn from_xdr(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut r = XdrReader::new(bytes);
        let v = Self::decode(&mut r, 0)?;
        r.finish()?;
        Ok(v)
    }

    /// Encode to raw XDR.
    pub fn to_xdr(&self) -> Result<Vec<u8>, EncodingError> {
        let mut w = XdrWriter::new();
        self.encode(&mut w)?;
        Ok(w.into_bytes())
    }

    /// Name of the `ScValType` arm, e.g. `"symbol"`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Void => "void",
            Self::Error(_) => "error",
            Self::U32(_) => "u32",
            Self::I32(_) => "i32",
            Self::U64(_) => "u64",
            Self::I64(_) => "i64",
            Self::Timepoint(_) => "timepoint",
            Self::Duration(_) => "duration",
            Self::U128(_) => "u128",
            Self::I128(_) => "i128",
            Self::U256(_) => "u256",
            Self::I256(_) => "i256",
            Self::Bytes(_) => "bytes",
            Self::String(_) => "string",
            Self::Symbol(_) => "symbol",
            Self::Vec(_) => "vec",
            Self::Map(_) => "map",
            Self::Address(_) => "address",
        }
    }

    fn decode(r: &mut XdrReader<'_>, depth: usize) -> Result<Self, DecodeError> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::DepthExceeded { limit: MAX_DEPTH });
        }
        let t = r.read_u32()?;
        Ok(match t {
            tag::BOOL => Self::Bool(r.read_bool()?),
            tag::VOID => Self::Void,
            tag::ERROR => Self::Error(ScError::decode(r)?),
            tag::U32 => Self::U32(r.read_u32()?),
            tag::I32 => Self::I32(r.read_i32()?),
            tag::U64 => Self::U64(r.read_u64()?),
            tag::I64 => Self::I64(r.read_i64()?),
            tag::TIMEPOINT => Self::Timepoint(r.read_u64()?),
            tag::DURATION => Self::Duration(r.read_u64()?),
            tag::U128 => {
                let hi = r.read_u64()? as u128;
                let lo = r.read_u64()? as u128;
                Self::U128((hi << 64) | lo)
            }
            tag::I128 => {
                let hi = r.read_i64()? as i128;
                let lo = r.read_u64()? as i128;
                Self::I128((hi << 64) | lo)
            }
            tag::U256 => Self::U256(BigUint::from_bytes_be(&r.read_fixed::<32>()?)),
            tag::I256 => Self::I256(BigInt::from_signed_bytes_be(&r.read_fixed::<32>()?)),
            tag::BYTES => Self::Bytes(r.read_var_opaque()?),
            tag::STRING => Self::String(String::from_utf8_lossy(&r.read_var_opaque()?).into_owned()),
            tag::SYMBOL => Self::Symbol(String::from_utf8_lossy(&r.read_var_opaque()?).into_owned()),
            tag::VEC => {
                let mut items = Vec::new();
                if r.read_bool()? {
                    let n = r.read_len()?;
                    for _ in 0..n {
                        items.push(Self::decode(r, depth + 1)?);
                    }
                }
                Self::Vec(items)
            }
            tag::MAP => {
                let mut entries = Vec::new();
                if r.read_bool()? {
                    let n = r.read_len()?;
                    for _ in 0..n {
                        let k = Self::decode(r, depth + 1)?;
                        let v = Self::decode(r, depth + 1)?;
                        entries.push((k, v));
                    }
                }
                Self::Map(entries)
            }
            tag::ADDRESS => Self::Address(ScAddress::decode(r)?),
            tag::CONTRACT_INSTANCE => return Err(DecodeError::Unsupported("contract_instance")),
            tag::LEDGER_KEY_CONTRACT_INSTANCE => {
                return Err(DecodeError::Unsupported("ledger_key_contract_instance"))
            }
            tag::LEDGER_KEY_NONCE => return Err(DecodeError::Unsupported("ledger_key_nonce")),
            other => {
                return Err(DecodeError::InvalidDiscriminant {
                    what: "ScValType",
                    value: other.into(),
                })
            }
        })
    }

    fn encode(&self, w: &mut XdrWriter) -> Result<(), EncodingError> {
        match self {
            Self::Bool(b) => {
                w.write_u32(tag::BOOL);
                w.write_bool(*b);
            }
            Self::Void => w.write_u32(tag::VOID),
            Self::Error(e) => {
                w.write_u32(tag::ERROR);
                e.encode(w);
            }
            Self::U32(v) => {
                w.write_u32(tag::U32);
                w.write_u32(*v);
            }
            Self::I32(v) => {
                w.write_u32(tag::I32);
                w.write_i32(*v);
            }
            Self::U64(v) => {
                w.write_u32(tag::U64);
                w.write_u64(*v);
            }
            Self::I64(v) => {
                w.write_u32(tag::I64);
                w.write_i64(*v);
            }
            Self::Timepoint(v) => {
                w.write_u32(tag::TIMEPOINT);
                w.write_u64(*v);
            }
            Self::Duration(v) => {
                w.write_u32(tag::DURATION);
                w.write_u64(*v);
            }
            Self::U128(v) => {
                w.write_u32(tag::U128);
                w.write_u64((*v >> 64) as u64);
                w.write_u64(*v as u64);
            }
            Self::I128(v) => {
                w.write_u32(tag::I128);
                w.write_i64((*v >> 64) as i64);
                w.write_u64(*v as u64);
            }
            Self::U256(v) => {
                let bytes = v.to_bytes_be();
                if bytes.len() > 32 {
                    return Err(EncodingError::Unrepresentable(format!("u256 {v}")));
                }
                let mut out = [0u8; 32];
                out[32 - bytes.len()..].copy_from_slice(&bytes);
                w.write_u32(tag::U256);
                w.write_fixed(&out);
            }
            Self::I256(v) => {
                let bytes = v.to_signed_bytes_be();
                if bytes.len() > 32 {
                    return Err(EncodingError::Unrepresentable(format!("i256 {v}")));
                }
                let fill = if v.sign() == Sign::Minus { 0xff } else { 0x00 };
                let mut out = [fill; 32];
                out[32 - bytes.len()..].copy_from_slice(&bytes);
                w.write_u32(tag::I256);
                w.write_fixed(&out);
            }
            Self::Bytes(b) => {
                w.write_u32(tag::BYTES);
                w.write_var_opaque(b);
            }
            Self::String(s) => {
                w.write_u32(tag::STRING);
                w.write_var_opaque(s.as_bytes());
            }
            Self::Symbol(s) => {
                w.write_u32(tag::SYMBOL);
                w.write_var_opaque(s.as_bytes());
            }
            Self::Vec(items) => {
                w.write_u32(tag::VEC);
                w.write_bool(true);
                w.write_u32(items.len() as u32);
                for item in items {
                    item.encode(w)?;
                }
            }
            Self::Map(entries) => {
                w.write_u32(tag::MAP);
                w.write_bool(true);
                w.write_u32(entries.len() as u32);
                for (k, v) in entries {
                    k.encode(w)?;
                    v.encode(w)?;
                }
            }
            Self::Address(a) => {
                w.write_u32(tag::ADDRESS);
                a.encode(w);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(v: ScValue) {
        let bytes = v.to_xdr().unwrap();
        assert_eq!(ScValue::from_xdr(&bytes).unwrap(), v, "{}", v.type_name());
    }

    #[test]
    fn scalar_arms_roundtrip() {
        roundtrip(ScValue::Bool(true));
        roundtrip(ScValue::Void);
        roundtrip(ScValue::I32(-7));
        roundtrip(ScValue::I64(i64::MIN));
        roundtrip(ScValue::Timepoint(1_700_000_000));
        roundtrip(ScValue::U128(u128::MAX));
        roundtrip(ScValue::I128(i128::MIN));
    }

    #[test]
    fn wide_integers_roundtrip() {
        roundtrip(ScValue::U256((BigUint::from(1u8) << 200) + BigUint::from(7u8)));
        roundtrip(ScValue::I256(BigInt::from(-1)));
        roundtrip(ScValue::I256(-(BigInt::from(1i8) << 255u32)));
    }

    #[test]
    fn u256_too_wide_rejected() {
        let v = ScValue::U256(BigUint::from(1u8) << 256);
        assert!(matches!(v.to_xdr(), Err(EncodingError::Unrepresentable(_))));
    }

    #[test]
    fn address_arms_roundtrip() {
        let key: [u8; 32] = core::array::from_fn(|i| i as u8);
        roundtrip(ScValue::Address(ScAddress::Account(key)));
        roundtrip(ScValue::Address(ScAddress::MuxedAccount { id: 9, key }));
        roundtrip(ScValue::Address(ScAddress::ClaimableBalance(key)));
        roundtrip(ScValue::Address(ScAddress::LiquidityPool(key)));
    }

    #[test]
    fn strkey_parses_back_to_address() {
        let key: [u8; 32] = core::array::from_fn(|i| i as u8);
        for addr in [
            ScAddress::Account(key),
            ScAddress::Contract(key),
            ScAddress::MuxedAccount { id: 7, key },
            ScAddress::ClaimableBalance(key),
            ScAddress::LiquidityPool(key),
        ] {
            assert_eq!(ScAddress::from_strkey(&addr.to_strkey()).unwrap(), addr);
        }
    }

    #[test]
    fn error_value_roundtrip() {
        roundtrip(ScValue::Error(ScError {
            kind: ScErrorType::Contract,
            code: 42,
        }));
        roundtrip(ScValue::Error(ScError {
            kind: ScErrorType::Budget,
            code: 5,
        }));
    }

    #[test]
    fn null_vec_decodes_empty() {
        // SCV_VEC with absent optional
        let bytes = [0, 0, 0, 16, 0, 0, 0, 0];
        assert_eq!(ScValue::from_xdr(&bytes).unwrap(), ScValue::Vec(vec![]));
    }

    #[test]
    fn unsupported_arm() {
        let bytes = [0, 0, 0, 21];
        assert_eq!(
            ScValue::from_xdr(&bytes),
            Err(DecodeError::Unsupported("ledger_key_nonce"))
        );
    }

    #[test]
    fn unknown_discriminant() {
        let bytes = [0, 0, 0, 99];
        assert!(matches!(
            ScValue::from_xdr(&bytes),
            Err(DecodeError::InvalidDiscriminant { what: "ScValType", value: 99 })
        ));
    }

    #[test]
    fn deep_nesting_rejected() {
        let mut v = ScValue::Void;
        for _ in 0..=MAX_DEPTH + 1 {
            v = ScValue::Vec(vec![v]);
        }
        let bytes = v.to_xdr().unwrap();
        assert!(matches!(
            ScValue::from_xdr(&bytes),
            Err(DecodeError::DepthExceeded { .. })
        ));
    }
}

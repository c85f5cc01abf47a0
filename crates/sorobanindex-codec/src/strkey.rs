//! Stellar strkey encoding: `base32(version || payload || crc16_le)`.
//!
//! RFC 4648 alphabet without padding; checksum is CRC16-XModem.

use crate::error::StrkeyError;

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Strkey kinds that can appear as an `ScAddress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    /// `G…` ed25519 account public key.
    Account,
    /// `C…` contract id.
    Contract,
    /// `M…` muxed account (key + 64-bit id).
    MuxedAccount,
    /// `B…` claimable balance id.
    ClaimableBalance,
    /// `L…` liquidity pool id.
    LiquidityPool,
}

impl Version {
    fn byte(self) -> u8 {
        match self {
            Self::Account => 6 << 3,
            Self::Contract => 2 << 3,
            Self::MuxedAccount => 12 << 3,
            Self::ClaimableBalance => 1 << 3,
            Self::LiquidityPool => 11 << 3,
        }
    }

    fn from_byte(b: u8) -> Result<Self, StrkeyError> {
        Ok(match b >> 3 {
            6 => Self::Account,
            2 => Self::Contract,
            12 => Self::MuxedAccount,
            1 => Self::ClaimableBalance,
            11 => Self::LiquidityPool,
            _ => return Err(StrkeyError::UnknownVersion(b)),
        })
    }

    /// Payload length in bytes.
    pub fn payload_len(self) -> usize {
        match self {
            Self::MuxedAccount => 40,
            Self::ClaimableBalance => 33,
            _ => 32,
        }
    }
}

/// CRC16-XModem (poly 0x1021, init 0).
fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8).div_ceil(5));
    let mut acc: u32 = 0;
    let mut bits = 0;
    for byte in data {
        acc = (acc << 8) | *byte as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[((acc >> bits) & 31) as usize] as char);
        }
        acc &= (1 << bits) - 1;
    }
    if bits > 0 {
        out.push(ALPHABET[((acc << (5 - bits)) & 31) as usize] as char);
    }
    out
}

fn base32_decode(s: &str) -> Result<Vec<u8>, StrkeyError> {
    let mut out = Vec::with_capacity(s.len() * 5 / 8);
    let mut acc: u32 = 0;
    let mut bits = 0;
    for c in s.chars() {
        let v = match c {
            'A'..='Z' => c as u32 - 'A' as u32,
            '2'..='7' => c as u32 - '2' as u32 + 26,
            _ => return Err(StrkeyError::InvalidCharacter(c)),
        };
        acc = (acc << 5) | v;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
        }
        acc &= (1 << bits) - 1;
    }
    // leftover bits must be zero for a canonical encoding
    if acc != 0 {
        return Err(StrkeyError::InvalidLength(s.len()));
    }
    Ok(out)
}

/// Encode `payload` under `version`.
pub fn encode(version: Version, payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + 3);
    data.push(version.byte());
    data.extend_from_slice(payload);
    let crc = crc16(&data);
    data.extend_from_slice(&crc.to_le_bytes());
    base32_encode(&data)
}

/// Decode a strkey, verifying checksum and payload length.
pub fn decode(s: &str) -> Result<(Version, Vec<u8>), StrkeyError> {
    let data = base32_decode(s)?;
    if data.len() < 3 {
        return Err(StrkeyError::InvalidLength(s.len()));
    }
    let (body, checksum) = data.split_at(data.len() - 2);
    if crc16(body).to_le_bytes() != checksum {
        return Err(StrkeyError::Checksum);
    }
    let version = Version::from_byte(body[0])?;
    let payload = &body[1..];
    if payload.len() != version.payload_len() {
        return Err(StrkeyError::InvalidLength(s.len()));
    }
    Ok((version, payload.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq_key() -> Vec<u8> {
        (0u8..32).collect()
    }

    #[test]
    fn zero_account_and_contract() {
        assert_eq!(
            encode(Version::Account, &[0u8; 32]),
            "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF"
        );
        assert_eq!(
            encode(Version::Contract, &[0u8; 32]),
            "CAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAABSC4"
        );
    }

    #[test]
    fn every_version_roundtrips() {
        let key = seq_key();
        let mut muxed = key.clone();
        muxed.extend_from_slice(&7u64.to_be_bytes());
        let mut balance = vec![0u8];
        balance.extend_from_slice(&key);

        let cases = [
            (Version::Account, key.clone(), "GAAACAQDAQCQMBYIBEFAWDANBYHRAEISCMKBKFQXDAMRUGY4DUPB7JZX"),
            (Version::Contract, key.clone(), "CAAACAQDAQCQMBYIBEFAWDANBYHRAEISCMKBKFQXDAMRUGY4DUPB6N4O"),
            (
                Version::MuxedAccount,
                muxed,
                "MAAACAQDAQCQMBYIBEFAWDANBYHRAEISCMKBKFQXDAMRUGY4DUPB6AAAAAAAAAAAA6X66",
            ),
            (
                Version::ClaimableBalance,
                balance,
                "BAAAAAICAMCAKBQHBAEQUCYMBUHA6EARCIJRIFIWC4MBSGQ3DQOR4H2TOM",
            ),
            (Version::LiquidityPool, key, "LAAACAQDAQCQMBYIBEFAWDANBYHRAEISCMKBKFQXDAMRUGY4DUPB6UWD"),
        ];
        for (version, payload, expected) in cases {
            assert_eq!(encode(version, &payload), expected);
            assert_eq!(decode(expected).unwrap(), (version, payload));
        }
    }

    #[test]
    fn checksum_detects_typo() {
        let bad = "GAAACAQDAQCQMBYIBEFAWDANBYHRAEISCMKBKFQXDAMRUGY4DUPB7JZY";
        assert!(decode(bad).is_err());
    }

    #[test]
    fn lowercase_rejected() {
        assert_eq!(
            decode("gaaa"),
            Err(StrkeyError::InvalidCharacter('g'))
        );
    }
}

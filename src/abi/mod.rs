//! Minimal ABI encoding for the `address` and `uint256` parameter types
//!
//! Call data is `selector ++ word*`, each word 32 bytes. Selectors are the
//! first four bytes of Keccak-256 over the canonical signature.

use crate::error::{DeployerError, DeployerResult};

use ethers::types::{Address, Bytes, U256};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// Hex characters in one encoded word
pub const WORD_HEX_LEN: usize = 64;

/// Supported Solidity parameter types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Address,
    Uint256,
}

impl ParamType {
    pub fn parse(ty: &str) -> DeployerResult<Self> {
        match ty.trim() {
            "address" => Ok(ParamType::Address),
            // `uint` is the Solidity alias of `uint256`
            "uint256" | "uint" => Ok(ParamType::Uint256),
            other => Err(DeployerError::UnsupportedType(other.to_string())),
        }
    }

    pub fn canonical(&self) -> &'static str {
        match self {
            ParamType::Address => "address",
            ParamType::Uint256 => "uint256",
        }
    }

    /// Parse a human-written value of this type
    pub fn parse_value(&self, raw: &str) -> DeployerResult<AbiValue> {
        match self {
            ParamType::Address => parse_address(raw).map(AbiValue::Address),
            ParamType::Uint256 => parse_uint256(raw).map(AbiValue::Uint256),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

/// A typed parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiValue {
    Address(Address),
    Uint256(U256),
}

impl AbiValue {
    pub fn param_type(&self) -> ParamType {
        match self {
            AbiValue::Address(_) => ParamType::Address,
            AbiValue::Uint256(_) => ParamType::Uint256,
        }
    }

    /// One 32-byte word as 64 lower-case hex characters
    pub fn encode(&self) -> String {
        match self {
            AbiValue::Address(address) => format!("{:0>64}", hex::encode(address.as_bytes())),
            AbiValue::Uint256(value) => encode_uint256(*value),
        }
    }

    /// Decode one word (64 hex characters, optional `0x`) as `ty`
    pub fn decode(ty: ParamType, word: &str) -> DeployerResult<Self> {
        match ty {
            ParamType::Address => decode_address(word).map(AbiValue::Address),
            ParamType::Uint256 => decode_uint256(word).map(AbiValue::Uint256),
        }
    }
}

impl From<Address> for AbiValue {
    fn from(address: Address) -> Self {
        AbiValue::Address(address)
    }
}

impl From<U256> for AbiValue {
    fn from(value: U256) -> Self {
        AbiValue::Uint256(value)
    }
}

/// `name(type,...)` with a parsed parameter list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    name: String,
    params: Vec<ParamType>,
}

impl FunctionSignature {
    pub fn parse(signature: &str) -> DeployerResult<Self> {
        let signature = signature.trim();
        let invalid = |reason: &str| {
            DeployerError::InvalidSignature(format!("{:?}: {}", signature, reason))
        };

        let open = signature.find('(').ok_or_else(|| invalid("missing '('"))?;
        if !signature.ends_with(')') {
            return Err(invalid("missing closing ')'"));
        }

        let name = signature[..open].trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid("invalid function name"));
        }

        let inner = signature[open + 1..signature.len() - 1].trim();
        let params = if inner.is_empty() {
            Vec::new()
        } else {
            inner
                .split(',')
                .map(|ty| {
                    // tolerate named parameters, e.g. "address to"
                    let ty = ty.split_whitespace().next().unwrap_or_default();
                    if ty.is_empty() {
                        Err(invalid("empty parameter type"))
                    } else {
                        ParamType::parse(ty)
                    }
                })
                .collect::<DeployerResult<Vec<_>>>()?
        };

        Ok(Self {
            name: name.to_string(),
            params,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    /// Canonical form used for selector hashing
    pub fn canonical(&self) -> String {
        let params: Vec<&str> = self.params.iter().map(ParamType::canonical).collect();
        format!("{}({})", self.name, params.join(","))
    }

    pub fn selector(&self) -> [u8; 4] {
        selector(&self.canonical())
    }

    /// Parse `values` positionally by the declared types
    pub fn parse_values(&self, values: &[&str]) -> DeployerResult<Vec<AbiValue>> {
        if values.len() != self.params.len() {
            return Err(DeployerError::invalid_value(
                "arguments",
                &values.join(","),
                format!(
                    "{} expects {} arguments, got {}",
                    self.canonical(),
                    self.params.len(),
                    values.len()
                ),
            ));
        }

        self.params
            .iter()
            .zip(values)
            .map(|(ty, raw)| ty.parse_value(raw))
            .collect()
    }

    /// Selector followed by the encoded values, checked against the declared types
    pub fn encode_call(&self, values: &[AbiValue]) -> DeployerResult<Bytes> {
        let declared: Vec<ParamType> = values.iter().map(AbiValue::param_type).collect();
        if declared != self.params {
            return Err(DeployerError::invalid_value(
                "arguments",
                &format!("{:?}", values),
                format!("do not match {}", self.canonical()),
            ));
        }

        let mut data = self.selector().to_vec();
        data.extend(decode_hex(&encode_values(values))?);
        Ok(Bytes::from(data))
    }
}

impl FromStr for FunctionSignature {
    type Err = DeployerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// First four bytes of Keccak-256 over `signature`
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash[..4]);
    selector
}

/// Left-pad an address to one word. Accepts an optional `0x` prefix and any case.
pub fn encode_address(address: &str) -> DeployerResult<String> {
    let digits = strip_hex_prefix(address.trim());
    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(DeployerError::invalid_value(
            "address",
            address,
            "expected 40 hex digits",
        ));
    }
    Ok(format!("{:0>64}", digits.to_ascii_lowercase()))
}

/// Left-pad an unsigned integer to one word
pub fn encode_uint256(value: U256) -> String {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    hex::encode(word)
}

/// Parse a decimal or `0x` hex unsigned integer, rejecting negatives and
/// anything that does not fit in 256 bits
pub fn parse_uint256(raw: &str) -> DeployerResult<U256> {
    let trimmed = raw.trim().replace('_', "");
    if trimmed.starts_with('-') {
        return Err(DeployerError::invalid_value("uint256", raw, "negative value"));
    }
    let trimmed = trimmed.strip_prefix('+').unwrap_or(&trimmed);
    if trimmed.is_empty() {
        return Err(DeployerError::invalid_value("uint256", raw, "empty value"));
    }

    if let Some(hex_digits) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        if hex_digits.is_empty() {
            return Err(DeployerError::invalid_value("uint256", raw, "empty value"));
        }
        let significant = hex_digits.trim_start_matches('0');
        if significant.len() > 64 {
            return Err(DeployerError::invalid_value("uint256", raw, "exceeds 256 bits"));
        }
        if significant.is_empty() {
            return Ok(U256::zero());
        }
        return U256::from_str_radix(significant, 16)
            .map_err(|e| DeployerError::invalid_value("uint256", raw, e.to_string()));
    }

    if !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(DeployerError::invalid_value("uint256", raw, "not a decimal integer"));
    }
    U256::from_dec_str(trimmed)
        .map_err(|_| DeployerError::invalid_value("uint256", raw, "exceeds 256 bits"))
}

pub fn parse_address(raw: &str) -> DeployerResult<Address> {
    let padded = encode_address(raw)?;
    decode_address(&padded)
}

/// Encode the parameters of `signature` from human-written values, without
/// the selector
pub fn encode_params(signature: &str, values: &[&str]) -> DeployerResult<String> {
    let signature = FunctionSignature::parse(signature)?;
    let values = signature.parse_values(values)?;
    Ok(encode_values(&values))
}

/// Full call data (selector + parameters) from human-written values
pub fn encode_call(signature: &str, values: &[&str]) -> DeployerResult<Bytes> {
    let signature = FunctionSignature::parse(signature)?;
    let values = signature.parse_values(values)?;
    signature.encode_call(&values)
}

pub fn encode_values(values: &[AbiValue]) -> String {
    values.iter().map(AbiValue::encode).collect()
}

/// Decode an address from a word; the upper 12 bytes must be zero
pub fn decode_address(word: &str) -> DeployerResult<Address> {
    let digits = word_digits(word, "address")?;
    let (padding, address) = digits.split_at(WORD_HEX_LEN - 40);
    if padding.chars().any(|c| c != '0') {
        return Err(DeployerError::invalid_value(
            "address",
            word,
            "upper 12 bytes are not zero",
        ));
    }
    let bytes = decode_hex(address)?;
    Ok(Address::from_slice(&bytes))
}

pub fn decode_uint256(word: &str) -> DeployerResult<U256> {
    let digits = word_digits(word, "uint256")?;
    U256::from_str_radix(digits, 16)
        .map_err(|e| DeployerError::invalid_value("uint256", word, e.to_string()))
}

/// Split `eth_call` return data into words and decode them as `types`
pub fn decode_output(types: &[ParamType], data: &[u8]) -> DeployerResult<Vec<AbiValue>> {
    let needed = types.len() * 32;
    if data.len() < needed {
        return Err(DeployerError::Parse(format!(
            "return data has {} bytes, expected at least {}",
            data.len(),
            needed
        )));
    }

    types
        .iter()
        .zip(data.chunks(32))
        .map(|(ty, word)| AbiValue::decode(*ty, &hex::encode(word)))
        .collect()
}

fn word_digits<'a>(word: &'a str, ty: &str) -> DeployerResult<&'a str> {
    let digits = strip_hex_prefix(word.trim());
    if digits.len() != WORD_HEX_LEN || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(DeployerError::invalid_value(
            ty,
            word,
            "expected a 64 hex digit word",
        ));
    }
    Ok(digits)
}

pub(crate) fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Decode hex with an optional `0x` prefix
pub fn decode_hex(s: &str) -> DeployerResult<Vec<u8>> {
    hex::decode(strip_hex_prefix(s.trim()))
        .map_err(|e| DeployerError::Parse(format!("invalid hex {:?}: {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "0xAbCdEf0123456789aBcDeF0123456789AbCdEf01";

    #[test]
    fn test_encode_address_pads_and_lowercases() {
        let encoded = encode_address(ADDR).unwrap();
        assert_eq!(encoded.len(), 64);
        assert!(encoded.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert!(encoded.starts_with("000000000000000000000000"));
        assert!(encoded[24..].eq_ignore_ascii_case(&ADDR[2..]));
    }

    #[test]
    fn test_encode_address_without_prefix() {
        assert_eq!(
            encode_address(&ADDR[2..]).unwrap(),
            encode_address(ADDR).unwrap()
        );
    }

    #[test]
    fn test_encode_address_rejects_garbage() {
        assert!(encode_address("0x1234").is_err());
        assert!(encode_address("0xZZcdef0123456789abcdef0123456789abcdef01").is_err());
    }

    #[test]
    fn test_uint256_round_trips_at_the_edges() {
        for value in [U256::zero(), U256::one(), U256::from(100), U256::MAX] {
            let encoded = encode_uint256(value);
            assert_eq!(encoded.len(), 64);
            assert_eq!(decode_uint256(&encoded).unwrap(), value);
        }
        assert_eq!(
            encode_uint256(U256::from(100)),
            "0000000000000000000000000000000000000000000000000000000000000064"
        );
    }

    #[test]
    fn test_parse_uint256_rejects_negative_and_oversized() {
        assert!(matches!(
            parse_uint256("-1"),
            Err(DeployerError::InvalidValue { .. })
        ));
        // 2^256
        let too_big =
            "115792089237316195423570985008687907853269984665640564039457584007913129639936";
        assert!(parse_uint256(too_big).is_err());
        assert!(parse_uint256(&format!("0x1{}", "0".repeat(64))).is_err());
        assert!(parse_uint256("12abc").is_err());
        assert!(parse_uint256("").is_err());
        for bare in ["0x", "0X", " 0x "] {
            assert!(matches!(
                parse_uint256(bare),
                Err(DeployerError::InvalidValue { ref reason, .. }) if reason == "empty value"
            ));
        }
        assert_eq!(parse_uint256("0x0").unwrap(), U256::zero());
    }

    #[test]
    fn test_parse_uint256_accepts_decimal_and_hex() {
        assert_eq!(parse_uint256("1000").unwrap(), U256::from(1000));
        assert_eq!(parse_uint256("1_000_000").unwrap(), U256::from(1_000_000));
        assert_eq!(parse_uint256("0x3e8").unwrap(), U256::from(1000));
        assert_eq!(parse_uint256("0x0").unwrap(), U256::zero());
        assert_eq!(
            parse_uint256(
                "115792089237316195423570985008687907853269984665640564039457584007913129639935"
            )
            .unwrap(),
            U256::MAX
        );
    }

    #[test]
    fn test_encode_params_transfer() {
        let encoded = encode_params("transfer(address,uint256)", &[ADDR, "100"]).unwrap();
        assert_eq!(encoded.len(), 128);
        assert_eq!(
            encoded,
            format!(
                "{}{}",
                encode_address(ADDR).unwrap(),
                encode_uint256(U256::from(100))
            )
        );
    }

    #[test]
    fn test_encode_params_unsupported_type() {
        let err = encode_params("approve(address,bool)", &[ADDR, "true"]).unwrap_err();
        assert!(matches!(err, DeployerError::UnsupportedType(ty) if ty == "bool"));
    }

    #[test]
    fn test_encode_params_arity_mismatch() {
        assert!(encode_params("transfer(address,uint256)", &[ADDR]).is_err());
    }

    #[test]
    fn test_signature_parsing() {
        let sig = FunctionSignature::parse(
            "createVestingSchedule(address beneficiary, uint256, uint256,uint256,uint)",
        )
        .unwrap();
        assert_eq!(sig.name(), "createVestingSchedule");
        assert_eq!(sig.params().len(), 5);
        assert_eq!(
            sig.canonical(),
            "createVestingSchedule(address,uint256,uint256,uint256,uint256)"
        );

        assert!(FunctionSignature::parse("owner()").unwrap().params().is_empty());
        assert!(matches!(
            FunctionSignature::parse("owner"),
            Err(DeployerError::InvalidSignature(_))
        ));
        assert!(FunctionSignature::parse("(address)").is_err());
        assert!(FunctionSignature::parse("f(address,)").is_err());
    }

    #[test]
    fn test_well_known_selectors() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
        assert_eq!(hex::encode(selector("balanceOf(address)")), "70a08231");
        assert_eq!(hex::encode(selector("owner()")), "8da5cb5b");
    }

    #[test]
    fn test_encode_call_prefixes_selector() {
        let data = encode_call("balanceOf(address)", &[ADDR]).unwrap();
        assert_eq!(data.len(), 36);
        assert_eq!(hex::encode(&data[..4]), "70a08231");
        assert_eq!(hex::encode(&data[4..]), encode_address(ADDR).unwrap());
    }

    #[test]
    fn test_encode_call_rejects_mismatched_values() {
        let sig = FunctionSignature::parse("release(address)").unwrap();
        assert!(sig.encode_call(&[AbiValue::Uint256(U256::one())]).is_err());
    }

    #[test]
    fn test_decode_address_round_trip() {
        let address = parse_address(ADDR).unwrap();
        let word = AbiValue::Address(address).encode();
        assert_eq!(word, encode_address(ADDR).unwrap());
        assert_eq!(decode_address(&word).unwrap(), address);
        assert!(decode_address(&format!("1{}", &word[1..])).is_err());
    }

    #[test]
    fn test_decode_output_words() {
        let mut data = vec![0u8; 32];
        data[31] = 7;
        let values = decode_output(&[ParamType::Uint256], &data).unwrap();
        assert_eq!(values, vec![AbiValue::Uint256(U256::from(7))]);
        assert!(decode_output(&[ParamType::Address, ParamType::Uint256], &data).is_err());
    }
}

//! Serde module for U256 as a decimal string.
//!
//! Wallet payloads carry `uint256` values as decimal strings to survive
//! JavaScript number precision; `0x`-prefixed hex is accepted on input too.

use alloy_primitives::U256;
use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	value.to_string().serialize(serializer)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
	D: Deserializer<'de>,
{
	let s = String::deserialize(deserializer)?;
	match s.strip_prefix("0x") {
		Some(hex) => U256::from_str_radix(hex, 16).map_err(D::Error::custom),
		None => U256::from_str_radix(&s, 10).map_err(D::Error::custom),
	}
}

#[cfg(test)]
mod tests {
	use alloy_primitives::U256;
	use serde::{Deserialize, Serialize};

	#[derive(Serialize, Deserialize)]
	struct Wrapper {
		#[serde(with = "crate::utils::u256_serde")]
		value: U256,
	}

	#[test]
	fn test_decimal_and_hex_input() {
		let w: Wrapper = serde_json::from_str(r#"{"value":"1000"}"#).unwrap();
		assert_eq!(w.value, U256::from(1000u64));

		let w: Wrapper = serde_json::from_str(r#"{"value":"0x3e8"}"#).unwrap();
		assert_eq!(w.value, U256::from(1000u64));

		assert_eq!(serde_json::to_string(&w).unwrap(), r#"{"value":"1000"}"#);
		assert!(serde_json::from_str::<Wrapper>(r#"{"value":"-1"}"#).is_err());
	}
}

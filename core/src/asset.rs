use bincode::{Decode, Encode};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::error::{EscrowError, ValidationError};
use crate::identity::Address;
use crate::Result;

/// The two kinds of value a deposit can lock.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub enum AssetKind {
    /// Native coin attached to the creating call (e.g., ETH).
    Native,
    /// Fungible token pulled through an allowance (e.g., ERC-20).
    Token,
}

/// An asset held in custody by a locker.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(tag = "asset_type", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode)]
pub enum Asset {
    /// Native coin of the host chain.
    Native,
    /// Contract-based fungible token.
    Token { contract: Address },
}

impl Asset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Self::Native => AssetKind::Native,
            Self::Token { .. } => AssetKind::Token,
        }
    }

    /// Token contract, or `None` for native coin.
    pub fn token(&self) -> Option<Address> {
        match self {
            Self::Native => None,
            Self::Token { contract } => Some(*contract),
        }
    }

    /// Checks if asset is a native coin.
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Token { contract } => write!(f, "token:{}", contract),
        }
    }
}

impl std::str::FromStr for Asset {
    type Err = EscrowError;

    fn from_str(s: &str) -> Result<Self> {
        let parts = s.split(':').collect::<Vec<_>>();
        match parts.as_slice() {
            ["native"] => Ok(Self::Native),
            ["token", contract] => Ok(Self::Token {
                contract: contract.parse()?,
            }),
            _ => Err(ValidationError::InvalidDeposit.into()),
        }
    }
}

/// Validates a funding request and resolves the asset and quantity to lock.
///
/// `token` is the [`Address::ZERO`] sentinel for native deposits.
/// `missing_value` is the rejection used when a native deposit carries no
/// value, which differs between front-ends.
///
/// For native deposits the locked quantity is `attached_value`; the
/// separately supplied `amount` is ignored.
pub fn validate_funding(
    kind: AssetKind,
    token: Address,
    amount: u128,
    attached_value: u128,
    missing_value: ValidationError,
) -> Result<(Asset, u128)> {
    match kind {
        AssetKind::Native => {
            if !token.is_zero() {
                return Err(ValidationError::InvalidDeposit.into());
            }
            if attached_value == 0 {
                return Err(missing_value.into());
            }
            Ok((Asset::Native, attached_value))
        }
        AssetKind::Token => {
            if attached_value > 0 || token.is_zero() {
                return Err(ValidationError::InvalidDeposit.into());
            }
            if amount == 0 {
                return Err(ValidationError::TokenAmountZero.into());
            }
            Ok((Asset::Token { contract: token }, amount))
        }
    }
}

#[cfg(test)]
mod tests {
    use core::str::FromStr as _;

    use super::*;
    use crate::utils::assert_err;

    const TOKEN: Address = Address([7u8; 20]);

    #[test]
    fn native_uses_attached_value() {
        let (asset, amount) = validate_funding(
            AssetKind::Native,
            Address::ZERO,
            100,
            1_000,
            ValidationError::NativeDepositRequired,
        )
        .unwrap();
        assert_eq!(asset, Asset::Native);
        assert_eq!(amount, 1_000);
    }

    #[test]
    fn native_without_value() {
        assert_err(
            validate_funding(
                AssetKind::Native,
                Address::ZERO,
                100,
                0,
                ValidationError::NativeDepositRequired,
            ),
            EscrowError::Validation(ValidationError::NativeDepositRequired),
        );
        assert_err(
            validate_funding(
                AssetKind::Native,
                Address::ZERO,
                100,
                0,
                ValidationError::NoNativeValueSent,
            ),
            EscrowError::Validation(ValidationError::NoNativeValueSent),
        );
    }

    #[test]
    fn token_checks() {
        let (asset, amount) = validate_funding(
            AssetKind::Token,
            TOKEN,
            500,
            0,
            ValidationError::NativeDepositRequired,
        )
        .unwrap();
        assert_eq!(asset, Asset::Token { contract: TOKEN });
        assert_eq!(amount, 500);

        // attached value is checked before amount
        assert_err(
            validate_funding(
                AssetKind::Token,
                TOKEN,
                0,
                1,
                ValidationError::NativeDepositRequired,
            ),
            EscrowError::Validation(ValidationError::InvalidDeposit),
        );
        assert_err(
            validate_funding(
                AssetKind::Token,
                TOKEN,
                0,
                0,
                ValidationError::NativeDepositRequired,
            ),
            EscrowError::Validation(ValidationError::TokenAmountZero),
        );
        assert_err(
            validate_funding(
                AssetKind::Token,
                Address::ZERO,
                500,
                0,
                ValidationError::NativeDepositRequired,
            ),
            EscrowError::Validation(ValidationError::InvalidDeposit),
        );
    }

    #[test]
    fn parse_asset() {
        assert_eq!(Asset::from_str("native").unwrap(), Asset::Native);
        let token = Asset::from_str(&format!("token:{}", TOKEN)).unwrap();
        assert_eq!(token.token(), Some(TOKEN));
        assert_eq!(token.kind(), AssetKind::Token);
        assert_eq!(Asset::from_str(&token.to_string()).unwrap(), token);
        assert!(Asset::from_str("nft:0x01").is_err());
    }
}

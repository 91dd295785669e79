//! Swap-mode detection from asset origins
//!
//! A closed mapping over `(origin(pay), origin(receive))`. `None` means
//! both assets are native to the home ledger and no bridging applies.

use crate::asset::AssetOrigin;

/// Which cross-ledger flow a pair of assets requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapMode {
    /// Pay asset enters from the foreign chain, receive settles at home
    ForeignToHome,
    /// Pay asset leaves the home ledger toward the foreign chain
    HomeToForeign,
    /// Foreign-native pay asset swapped into a foreign token
    ForeignNativeToForeignToken,
    /// Foreign token swapped into another foreign-side asset
    ForeignTokenToForeignToken,
}

/// Detect the swap mode for a pair of asset origins
pub fn swap_mode(pay: AssetOrigin, receive: AssetOrigin) -> Option<SwapMode> {
    use AssetOrigin::*;

    match (pay, receive) {
        (Home, Home) => None,
        (ForeignNative | ForeignToken, Home) => Some(SwapMode::ForeignToHome),
        (Home, ForeignNative | ForeignToken) => Some(SwapMode::HomeToForeign),
        (ForeignNative, ForeignNative | ForeignToken) => {
            Some(SwapMode::ForeignNativeToForeignToken)
        }
        (ForeignToken, ForeignNative | ForeignToken) => {
            Some(SwapMode::ForeignTokenToForeignToken)
        }
    }
}

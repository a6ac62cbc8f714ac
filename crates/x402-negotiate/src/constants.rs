/// Credential scheme carried in the `Authorization` header (`"x402 <tx hash>"`).
pub const CREDENTIAL_SCHEME: &str = "x402";

/// Length of an accepted transaction reference: `0x` + 64 hex chars.
pub const TX_REFERENCE_LEN: usize = 66;

/// Decimal places of the native unit (wei per ether).
pub const NATIVE_DECIMALS: u32 = 18;

/// Wire protocol version reported in 402 bodies.
pub const X402_VERSION: u32 = 1;

/// Sepolia, as a hex chain id.
pub const DEFAULT_CHAIN_ID: &str = "0xaa36a7";

/// Burn address used as the default payment recipient.
pub const DEFAULT_RECIPIENT: &str = "0x000000000000000000000000000000000000dEaD";

/// 0.000001 ETH in wei.
pub const DEFAULT_PRICE_WEI: &str = "1000000000000";

pub const DEFAULT_CURRENCY: &str = "ETH";

pub const DEFAULT_REASON: &str = "Unlock Premium Article";

/// Public Sepolia RPC endpoint.
pub const RPC_URL: &str = "https://ethereum-sepolia-rpc.publicnode.com";

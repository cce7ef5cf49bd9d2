//! System-wide constants for the OpenEscrow engine.

/// Width of an escrow id in raw bytes (big-endian `u64`).
pub const ESCROW_ID_BYTES: usize = 8;

/// Width of an escrow id in its textual (hex) form.
pub const ESCROW_ID_HEX_LEN: usize = ESCROW_ID_BYTES * 2;

/// Length of an account address in raw bytes.
pub const ADDRESS_LEN: usize = 20;

/// Human-readable prefix of every textual address.
pub const ADDRESS_PREFIX: &str = "esc1";

/// Maximum decimal places carried by a coin amount.
pub const AMOUNT_PRECISION: u32 = 8;

/// Minimum length of a coin denomination.
pub const MIN_DENOM_LEN: usize = 3;

/// Maximum length of a coin denomination.
pub const MAX_DENOM_LEN: usize = 128;

/// Page size used when a query does not ask for one.
pub const DEFAULT_QUERY_LIMIT: usize = 50;

/// Largest page a single query may request.
pub const MAX_QUERY_LIMIT: usize = 100;

/// Name the custody account is derived from.
pub const ESCROW_MODULE_NAME: &str = "escrow";

/// Name the fee-collection account is derived from.
pub const FEE_COLLECTOR_NAME: &str = "fee_collector";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "OpenEscrow";

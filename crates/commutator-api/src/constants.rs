//! API constants

/// API base path prefix (version-independent)
pub const API_BASE: &str = "/api";

pub const API_VERSION: &str = "v1";

/// Every route is mounted under this prefix.
pub const API_PREFIX: &str = "/api/v1";

/// Names the tenant service an order is addressed to.
pub const SERVICE_NAME_HEADER: &str = "X-Service-Name";

/// JSON allowance on top of the PDF payloads when sizing the body limit.
pub const JSON_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Upper bound on PDF payloads in one order (specification, invoice, contract, brief).
pub const MAX_PDFS_PER_ORDER: usize = 4;

/// Data acquisition from the IEM ASOS download service.
///
/// Submodules:
/// - `iem`   — URL construction and the blocking HTTP transport.
/// - `retry` — bounded-retry fetch loop used for every download.

pub mod iem;
pub mod retry;

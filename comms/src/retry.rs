use std::{env, io, time::Duration};

use log::warn;
use tokio::{net::TcpStream, time};

/// Environment flag controlling connection failure behavior.
///
/// When set to `use_caller` a failed connect is retried with backoff instead
/// of being reported immediately, which lets processes of a cluster come up
/// in any order.
pub const FAIL_FAST_ENV: &str = "RPC_FAIL_FAST";

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_millis(3200);

/// Connects to `addr`, retrying with exponential backoff when fail-fast
/// behavior is disabled through [`FAIL_FAST_ENV`].
///
/// # Arguments
/// * `addr` - The `host:port` address of a cluster peer.
///
/// # Returns
/// An established stream, or the connect error when fail-fast is active.
pub async fn connect(addr: &str) -> io::Result<TcpStream> {
    let retry = env::var(FAIL_FAST_ENV).is_ok_and(|v| v == "use_caller");
    let mut backoff = INITIAL_BACKOFF;

    loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) if retry => {
                warn!("connect to {addr} failed ({e}), retrying in {backoff:?}");
                time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
            Err(e) => return Err(e),
        }
    }
}

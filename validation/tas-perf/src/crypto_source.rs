//! Per-iteration signing material from the local helper.

use tas_protocol::endpoints;
use tas_protocol::{CryptoBundle, TasError, TasResult};

use crate::client::{tags, TasClient};
use crate::trace::IterationTrace;

/// Fetch a fresh [`CryptoBundle`].
///
/// Anything but a 200 with a well-formed bundle is a missing prerequisite:
/// nothing else in the iteration can run without it.
pub async fn fetch_crypto_bundle(
    client: &TasClient,
    trace: &mut IterationTrace,
    helper_url: &str,
) -> TasResult<CryptoBundle> {
    let url = endpoints::join(helper_url, endpoints::HELPER_GENERATE_PAYLOADS);

    let response = client
        .send(trace, tags::HELPER_GET_CRYPTO, client.get(&url))
        .await
        .map_err(|e| TasError::prerequisite(format!("crypto helper unreachable: {e}")))?;

    if response.status() != 200 {
        return Err(TasError::prerequisite(format!(
            "Failed to get crypto components from helper: {} {}",
            response.status(),
            response.text()
        )));
    }

    response
        .json()
        .map_err(|e| TasError::prerequisite(format!("malformed crypto bundle: {e}")))
}

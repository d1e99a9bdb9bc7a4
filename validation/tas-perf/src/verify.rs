//! Verify workflow: fetch a recorded entry and the TSA certificate chain.
//!
//! Both checks run on every iteration regardless of each other's outcome.
//! Nothing is reported through the error sidecar; outcomes surface only as
//! checks and iteration results.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use tas_protocol::endpoints;
use tas_protocol::{decode_entry_body, lookup_entry, Component, DecodeError, TasError};
use tracing::{debug, warn};

use crate::client::{tags, TasClient};
use crate::metrics::IterationOutcome;
use crate::pool::IdentifierPool;
use crate::runner::Workflow;
use crate::trace::IterationTrace;

/// Check names recorded by this workflow.
pub mod checks {
    pub const REKOR_GET_OK: &str = "Rekor GET returned HTTP 200";
    pub const REKOR_ENTRY_UUID: &str = "Rekor response contains the correct entry UUID";
    pub const REKOR_BODY_DECODED: &str = "Rekor entry body is valid base64-encoded JSON";
    pub const REKOR_SIGNATURE_BLOCK: &str = "Rekor entry body contains a signature block";
    pub const TSA_CERT_CHAIN_OK: &str = "TSA GET certchain returned HTTP 200";
}

/// Result of fetching and validating one log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryCheck {
    Valid,
    /// Non-200 status, or `None` on transport failure.
    Unavailable(Option<u16>),
    /// The response is not keyed by the requested identifier.
    MissingEntry,
    Decode(DecodeError),
}

/// Outcome of one verify iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub uuid: String,
    pub entry: EntryCheck,
    pub cert_chain_ok: bool,
}

impl VerifyOutcome {
    pub fn passed(&self) -> bool {
        self.entry == EntryCheck::Valid && self.cert_chain_ok
    }

    /// The failure to classify this iteration by, entry check first.
    pub fn failure(&self) -> Option<TasError> {
        match &self.entry {
            EntryCheck::Valid => {}
            EntryCheck::Unavailable(status) => {
                return Some(TasError::service(
                    Component::Rekor,
                    format!("entry {} unavailable (status {status:?})", self.uuid),
                ));
            }
            EntryCheck::MissingEntry => {
                return Some(TasError::service(
                    Component::Rekor,
                    format!("response does not contain entry {}", self.uuid),
                ));
            }
            EntryCheck::Decode(e) => return Some(TasError::Decode(e.clone())),
        }

        if !self.cert_chain_ok {
            return Some(TasError::service(
                Component::Tsa,
                "certificate chain unavailable",
            ));
        }
        None
    }
}

/// GET an entry and validate its structure and decoded body.
pub async fn fetch_and_validate_entry(
    client: &TasClient,
    trace: &mut IterationTrace,
    rekor_url: &str,
    uuid: &str,
) -> EntryCheck {
    let url = endpoints::log_entry(rekor_url, uuid);
    let response = match client.send(trace, tags::REKOR_GET_ENTRY, client.get(&url)).await {
        Ok(response) => response,
        Err(_) => {
            trace.check(checks::REKOR_GET_OK, false);
            return EntryCheck::Unavailable(None);
        }
    };

    if !trace.check(checks::REKOR_GET_OK, response.status() == 200) {
        return EntryCheck::Unavailable(Some(response.status()));
    }

    let body: Option<Value> = response.json().ok();
    let entry = body.as_ref().and_then(|body| lookup_entry(body, uuid));
    let Some(entry) = entry else {
        trace.check(checks::REKOR_ENTRY_UUID, false);
        return EntryCheck::MissingEntry;
    };
    trace.check(checks::REKOR_ENTRY_UUID, true);

    let decoded = match decode_entry_body(entry) {
        Ok(decoded) => {
            trace.check(checks::REKOR_BODY_DECODED, true);
            decoded
        }
        Err(e) => {
            trace.check(checks::REKOR_BODY_DECODED, false);
            return EntryCheck::Decode(e);
        }
    };

    match decoded.require_signature() {
        Ok(_) => {
            debug!(uuid, kind = decoded.kind().unwrap_or("unknown"), "Entry validated");
            trace.check(checks::REKOR_SIGNATURE_BLOCK, true);
            EntryCheck::Valid
        }
        Err(e) => {
            trace.check(checks::REKOR_SIGNATURE_BLOCK, false);
            EntryCheck::Decode(e)
        }
    }
}

/// GET the timestamp authority's certificate chain.
pub async fn fetch_certificate_chain(
    client: &TasClient,
    trace: &mut IterationTrace,
    tsa_url: &str,
) -> bool {
    let url = endpoints::join(tsa_url, endpoints::TSA_CERT_CHAIN);
    let status = client
        .send(trace, tags::TSA_GET_CERT_CHAIN, client.get(&url))
        .await
        .map(|response| response.status())
        .ok();
    trace.check(checks::TSA_CERT_CHAIN_OK, status == Some(200))
}

/// State shared read-only by every verify iteration.
#[derive(Debug)]
pub struct VerifyContext {
    pub client: TasClient,
    pub pool: IdentifierPool,
    pub rekor_url: String,
    pub tsa_url: String,
    /// Seeds identifier selection; iteration `n` uses `seed + n`.
    pub seed: Option<u64>,
}

impl VerifyContext {
    /// Run one iteration with identifiers drawn from `rng`.
    pub async fn run_iteration<R: Rng + ?Sized>(
        &self,
        trace: &mut IterationTrace,
        rng: &mut R,
    ) -> VerifyOutcome {
        let uuid = self.pool.choose(rng).to_string();

        let entry = fetch_and_validate_entry(&self.client, trace, &self.rekor_url, &uuid).await;
        let cert_chain_ok = fetch_certificate_chain(&self.client, trace, &self.tsa_url).await;

        VerifyOutcome {
            uuid,
            entry,
            cert_chain_ok,
        }
    }

    fn rng_for(&self, iteration: u64) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(iteration)),
            None => StdRng::from_entropy(),
        }
    }
}

#[async_trait]
impl Workflow for VerifyContext {
    fn name(&self) -> &'static str {
        "verify"
    }

    async fn iterate(&self, iteration: u64, trace: &mut IterationTrace) -> IterationOutcome {
        let mut rng = self.rng_for(iteration);
        let outcome = self.run_iteration(trace, &mut rng).await;

        match outcome.failure() {
            None => IterationOutcome::Passed,
            Some(e) => {
                warn!(uuid = %outcome.uuid, class = %e.class(), error = %e, "Verify iteration failed");
                IterationOutcome::Failed(e.class())
            }
        }
    }
}

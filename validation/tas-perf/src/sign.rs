//! Sign-and-record workflow.
//!
//! Each iteration runs, strictly in order:
//! 1. fetch signing material from the helper
//! 2. request a signing certificate from Fulcio
//! 3. append a `hashedrekord` entry to Rekor
//! 4. obtain a timestamp token for the signature from the helper
//! 5. append an `rfc3161` entry to Rekor
//!
//! A failed step ends the iteration. Failures of Fulcio or Rekor are reported
//! through the [`ErrorReporter`]; helper failures are not.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tas_protocol::endpoints;
use tas_protocol::{
    entry_uuid_from_location, Component, CryptoBundle, IssuedCertificate, ProposedEntry,
    SigningCertRequest, TasError, TasResult,
};
use tracing::{debug, warn};

use crate::client::{tags, TasClient};
use crate::credential::RunCredential;
use crate::crypto_source::fetch_crypto_bundle;
use crate::entries::EntrySink;
use crate::metrics::IterationOutcome;
use crate::report_error::ErrorReporter;
use crate::runner::Workflow;
use crate::trace::IterationTrace;

/// Check names recorded by this workflow.
pub mod checks {
    pub const FULCIO_CREATED: &str = "Fulcio returned HTTP 201";
    pub const FULCIO_CERTIFICATE: &str = "Fulcio response contains a certificate";
    pub const REKOR_HASHEDREKORD_CREATED: &str = "Rekor (hashedrekord) returned HTTP 201";
    pub const TSA_HELPER_OK: &str = "TSA Helper returned HTTP 200";
    pub const REKOR_RFC3161_CREATED: &str = "Rekor (rfc3161) returned HTTP 201";
}

/// Base URLs used by the workflow.
#[derive(Debug, Clone)]
pub struct SignEndpoints {
    pub fulcio_url: String,
    pub rekor_url: String,
    pub helper_url: String,
}

/// State shared read-only by every sign iteration.
#[derive(Debug)]
pub struct SignContext {
    pub client: TasClient,
    pub reporter: ErrorReporter,
    pub credential: RunCredential,
    pub endpoints: SignEndpoints,
    /// Present in data-generation mode.
    pub entry_sink: Option<EntrySink>,
}

/// What a successful iteration produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignOutcome {
    /// Identifier of the `hashedrekord` entry, in data-generation mode only.
    pub entry_uuid: Option<String>,
}

impl SignContext {
    /// Run one complete iteration.
    pub async fn run_iteration(&self, trace: &mut IterationTrace) -> TasResult<SignOutcome> {
        let bundle = fetch_crypto_bundle(&self.client, trace, &self.endpoints.helper_url).await?;

        let certificate = self.request_certificate(trace, &bundle).await?;
        let entry_uuid = self
            .append_hash_record(trace, &bundle, certificate.as_ref())
            .await?;

        if !bundle.has_signature() {
            warn!("Failed to get artifact signature, cannot proceed to TSA workflow");
            return Err(TasError::prerequisite("artifact signature unavailable"));
        }

        let token = self.request_timestamp(trace, &bundle).await?;
        self.append_timestamp_record(trace, &token).await?;

        Ok(SignOutcome { entry_uuid })
    }

    /// Report `component` on a detached task and build the matching error.
    fn fail(&self, component: Component, message: String) -> TasError {
        drop(self.reporter.report(component));
        TasError::service(component, message)
    }

    /// Request a certificate. `Ok(None)` means Fulcio answered 201 without one.
    async fn request_certificate(
        &self,
        trace: &mut IterationTrace,
        bundle: &CryptoBundle,
    ) -> TasResult<Option<IssuedCertificate>> {
        let url = endpoints::join(&self.endpoints.fulcio_url, endpoints::FULCIO_SIGNING_CERT);
        let body = SigningCertRequest::new(&bundle.public_key_base64, &bundle.signed_email_address);
        let request = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.credential.authorization())
            .json(&body);

        let response = match self.client.send(trace, tags::FULCIO_REQUEST_CERT, request).await {
            Ok(response) => response,
            Err(e) => {
                trace.check(checks::FULCIO_CREATED, false);
                return Err(self.fail(Component::Fulcio, format!("Fulcio request failed: {e}")));
            }
        };

        if !trace.check(checks::FULCIO_CREATED, response.status() == 201) {
            return Err(self.fail(
                Component::Fulcio,
                format!(
                    "Fulcio request failed: Status={}, Body={}",
                    response.status(),
                    response.text()
                ),
            ));
        }

        let certificate = IssuedCertificate::from_response_body(&response.text());
        trace.check(checks::FULCIO_CERTIFICATE, certificate.is_some());
        Ok(certificate)
    }

    /// Append the `hashedrekord` entry; returns its identifier in data-generation mode.
    async fn append_hash_record(
        &self,
        trace: &mut IterationTrace,
        bundle: &CryptoBundle,
        certificate: Option<&IssuedCertificate>,
    ) -> TasResult<Option<String>> {
        let Some(certificate) = certificate else {
            return Err(self.fail(
                Component::Fulcio,
                "Fulcio response did not contain a PEM certificate".to_string(),
            ));
        };

        let url = endpoints::join(&self.endpoints.rekor_url, endpoints::REKOR_LOG_ENTRIES);
        let entry = ProposedEntry::hashed_rekord(
            &bundle.artifact_signature,
            certificate,
            &bundle.artifact_hash,
        );
        let request = self.client.post(&url).json(&entry);

        let response = match self
            .client
            .send(trace, tags::REKOR_CREATE_HASHED_REKORD, request)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                trace.check(checks::REKOR_HASHEDREKORD_CREATED, false);
                return Err(self.fail(
                    Component::Rekor,
                    format!("Rekor ({}) request failed: {e}", entry.kind()),
                ));
            }
        };

        if !trace.check(checks::REKOR_HASHEDREKORD_CREATED, response.status() == 201) {
            return Err(self.fail(
                Component::Rekor,
                format!(
                    "Rekor ({}) request failed: Status={}, Body={}",
                    entry.kind(),
                    response.status(),
                    response.text()
                ),
            ));
        }

        let Some(sink) = &self.entry_sink else {
            return Ok(None);
        };
        let uuid = response
            .header("location")
            .and_then(entry_uuid_from_location)
            .map(str::to_string);
        match &uuid {
            Some(uuid) => sink.emit(uuid),
            None => debug!("Rekor response carried no usable Location header"),
        }
        Ok(uuid)
    }

    /// Obtain a timestamp token for the artifact signature from the helper.
    async fn request_timestamp(
        &self,
        trace: &mut IterationTrace,
        bundle: &CryptoBundle,
    ) -> TasResult<Bytes> {
        let signature = bundle
            .signature_bytes()
            .map_err(|e| TasError::prerequisite(format!("artifact signature is not base64: {e}")))?;

        let url = endpoints::join(&self.endpoints.helper_url, endpoints::HELPER_GET_TIMESTAMP);
        let request = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(signature);

        let response = match self
            .client
            .send(trace, tags::HELPER_GET_TIMESTAMP, request)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                trace.check(checks::TSA_HELPER_OK, false);
                return Err(TasError::prerequisite(format!(
                    "TSA helper request failed: {e}"
                )));
            }
        };

        if !trace.check(checks::TSA_HELPER_OK, response.status() == 200) {
            return Err(TasError::prerequisite(format!(
                "TSA helper request failed: Status={}, Body={}",
                response.status(),
                response.text()
            )));
        }

        let token = response.body().clone();
        if token.is_empty() {
            return Err(TasError::prerequisite(
                "Failed to get timestamp from helper, cannot proceed",
            ));
        }
        Ok(token)
    }

    async fn append_timestamp_record(
        &self,
        trace: &mut IterationTrace,
        token: &[u8],
    ) -> TasResult<()> {
        let url = endpoints::join(&self.endpoints.rekor_url, endpoints::REKOR_LOG_ENTRIES);
        let entry = ProposedEntry::rfc3161(token);
        let request = self.client.post(&url).json(&entry);

        let response = match self
            .client
            .send(trace, tags::REKOR_CREATE_RFC3161, request)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                trace.check(checks::REKOR_RFC3161_CREATED, false);
                return Err(self.fail(
                    Component::Rekor,
                    format!("Rekor ({}) request failed: {e}", entry.kind()),
                ));
            }
        };

        if !trace.check(checks::REKOR_RFC3161_CREATED, response.status() == 201) {
            return Err(self.fail(
                Component::Rekor,
                format!(
                    "Rekor ({}) request failed: Status={}, Body={}",
                    entry.kind(),
                    response.status(),
                    response.text()
                ),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Workflow for SignContext {
    fn name(&self) -> &'static str {
        "sign"
    }

    async fn iterate(&self, _iteration: u64, trace: &mut IterationTrace) -> IterationOutcome {
        let result = self.run_iteration(trace).await;
        if let Err(e) = &result {
            warn!(class = %e.class(), error = %e, "Sign iteration failed");
        }
        IterationOutcome::from_result(&result)
    }
}

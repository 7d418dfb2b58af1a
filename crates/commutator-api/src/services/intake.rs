//! Order intake pipeline.
//!
//! One order moves through `Received -> Validated -> TenantResolved -> FilesPersisted ->
//! Rendered -> Dispatched -> Logged -> Responded`. Everything up to `TenantResolved` is a
//! client error and leaves no trace. From `FilesPersisted` on, the saved PDFs are always
//! discarded before returning, whether the order succeeds or not.

use crate::state::AppState;
use commutator_core::models::NewOrderRecord;
use commutator_core::{
    negotiate_language, AppError, OrderRequest, PdfPayload, PendingUpload, TenantProfile,
    TenantRegistry,
};
use commutator_db::OrderRepository;
use commutator_services::{
    render_email, DispatchReport, Dispatcher, EmailAttachment, OrderTemplateVars, OutgoingEmail,
};
use commutator_storage::{validate_pdf, UploadStore};
use std::fmt;
use std::net::IpAddr;
use validator::Validate;

const MANDATORY_PDFS: [&str; 3] = ["specification", "invoice", "contract"];
const BRIEF_LABEL: &str = "brief";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeStage {
    Received,
    Validated,
    TenantResolved,
    FilesPersisted,
    Rendered,
    Dispatched,
    Logged,
    Responded,
}

impl fmt::Display for IntakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntakeStage::Received => "received",
            IntakeStage::Validated => "validated",
            IntakeStage::TenantResolved => "tenant_resolved",
            IntakeStage::FilesPersisted => "files_persisted",
            IntakeStage::Rendered => "rendered",
            IntakeStage::Dispatched => "dispatched",
            IntakeStage::Logged => "logged",
            IntakeStage::Responded => "responded",
        };
        f.write_str(name)
    }
}

/// A decoded order plus the request metadata the pipeline needs.
#[derive(Debug, Clone, Default)]
pub struct OrderSubmission {
    pub order: OrderRequest,
    pub service_name: Option<String>,
    pub accept_language: Option<String>,
    pub client_ip: Option<IpAddr>,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct OrderReceipt {
    pub order_id: i64,
    /// Service name exactly as the client sent it
    pub service: String,
    pub language: String,
    pub report: DispatchReport,
}

struct ValidatedPdfs {
    mandatory: Vec<(&'static str, Vec<u8>)>,
    brief: Option<Vec<u8>>,
}

pub struct OrderIntake<'a> {
    registry: &'a TenantRegistry,
    uploads: &'a dyn UploadStore,
    dispatcher: &'a Dispatcher,
    orders: &'a OrderRepository,
    max_file_size: usize,
}

impl<'a> OrderIntake<'a> {
    pub fn new(
        registry: &'a TenantRegistry,
        uploads: &'a dyn UploadStore,
        dispatcher: &'a Dispatcher,
        orders: &'a OrderRepository,
        max_file_size: usize,
    ) -> Self {
        Self {
            registry,
            uploads,
            dispatcher,
            orders,
            max_file_size,
        }
    }

    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(
            &state.delivery.registry,
            &state.delivery.uploads,
            &state.delivery.dispatcher,
            &state.db.orders,
            state.config.max_file_size_bytes(),
        )
    }

    #[tracing::instrument(skip_all, fields(service = ?submission.service_name))]
    pub async fn process(&self, submission: OrderSubmission) -> Result<OrderReceipt, AppError> {
        let mut stage = IntakeStage::Received;
        let result = self.run(&submission, &mut stage).await;
        match &result {
            Ok(receipt) => tracing::info!(
                order_id = receipt.order_id,
                language = %receipt.language,
                email = %receipt.report.email,
                chat = %receipt.report.chat,
                "Order processed"
            ),
            Err(e) => tracing::warn!(stage = %stage, error = %e, "Order stopped"),
        }
        result
    }

    async fn run(
        &self,
        submission: &OrderSubmission,
        stage: &mut IntakeStage,
    ) -> Result<OrderReceipt, AppError> {
        let order = &submission.order;
        let pdfs = self.validate(order)?;
        *stage = IntakeStage::Validated;

        let service = submission
            .service_name
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("Missing X-Service-Name".to_string()))?;
        let profile = self
            .registry
            .resolve(service)
            .ok_or_else(|| AppError::UnknownTenant(service.to_string()))?;
        let language = negotiate_language(
            &profile,
            order.language.as_deref(),
            submission.accept_language.as_deref(),
        );
        *stage = IntakeStage::TenantResolved;

        let uploads = self.persist(pdfs).await?;
        *stage = IntakeStage::FilesPersisted;

        let outcome = self
            .deliver_and_log(&profile, service, &language, submission, &uploads, stage)
            .await;
        self.discard_all(&uploads).await;

        let (order_id, report) = outcome?;
        *stage = IntakeStage::Responded;

        Ok(OrderReceipt {
            order_id,
            service: service.to_string(),
            language,
            report,
        })
    }

    async fn deliver_and_log(
        &self,
        profile: &TenantProfile,
        service: &str,
        language: &str,
        submission: &OrderSubmission,
        uploads: &[PendingUpload],
        stage: &mut IntakeStage,
    ) -> Result<(i64, DispatchReport), AppError> {
        let order = &submission.order;
        let vars = OrderTemplateVars::from_order(order, &profile.name, language);

        let (subject, body) = render_email(profile, language, &vars).await;
        let attachments = read_attachments(uploads).await;
        let email = (!attachments.is_empty()).then(|| OutgoingEmail {
            recipient: order.contact_info.clone(),
            subject,
            body,
            attachments,
        });
        *stage = IntakeStage::Rendered;

        let report = self
            .dispatcher
            .dispatch(profile, language, email.as_ref(), &vars)
            .await;
        *stage = IntakeStage::Dispatched;

        let record = NewOrderRecord {
            service_name: service.to_string(),
            full_name: order.full_name.clone(),
            company_name: order.company_name.clone(),
            country: order.country.clone(),
            address: order.address.clone(),
            contact_info: order.contact_info.clone(),
            project_link: order.project_link.clone(),
            payment_method: order.payment_method.clone(),
            start_date: order.start_date.clone(),
            language: language.to_string(),
            ip_address: submission
                .client_ip
                .map(|ip| ip.to_string())
                .unwrap_or_default(),
            user_agent: submission.user_agent.clone(),
        };
        let order_id = self.orders.insert(&record).await?;
        *stage = IntakeStage::Logged;

        Ok((order_id, report))
    }

    fn validate(&self, order: &OrderRequest) -> Result<ValidatedPdfs, AppError> {
        if let Err(errors) = order.validate() {
            tracing::debug!(errors = %errors, "Order failed field validation");
            return Err(AppError::InvalidInput("Missing required fields".to_string()));
        }

        let mut mandatory = Vec::with_capacity(MANDATORY_PDFS.len());
        for (label, payload) in MANDATORY_PDFS.into_iter().zip([
            &order.specification_pdf,
            &order.invoice_pdf,
            &order.contract_pdf,
        ]) {
            mandatory.push((label, self.checked_pdf(label, payload)?));
        }

        let brief = match order.brief_file.as_ref().filter(|p| !p.is_empty()) {
            Some(payload) => match payload.decode() {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring undecodable brief file");
                    None
                }
            },
            None => None,
        };

        Ok(ValidatedPdfs { mandatory, brief })
    }

    fn checked_pdf(&self, label: &str, payload: &PdfPayload) -> Result<Vec<u8>, AppError> {
        let bytes = payload.decode().map_err(|e| {
            tracing::debug!(label, error = %e, "PDF payload is not valid base64");
            AppError::InvalidInput("Invalid PDF files".to_string())
        })?;

        if bytes.len() > self.max_file_size {
            return Err(AppError::InvalidInput(format!(
                "{} PDF exceeds the {} byte limit",
                label, self.max_file_size
            )));
        }
        if !validate_pdf(&bytes) {
            tracing::debug!(label, size = bytes.len(), "PDF signature check failed");
            return Err(AppError::InvalidInput("Invalid PDF files".to_string()));
        }
        Ok(bytes)
    }

    async fn persist(&self, pdfs: ValidatedPdfs) -> Result<Vec<PendingUpload>, AppError> {
        let mut saved = Vec::with_capacity(MANDATORY_PDFS.len() + 1);

        for (label, bytes) in &pdfs.mandatory {
            match self.uploads.save(bytes, label).await {
                Ok(upload) => saved.push(upload),
                Err(e) => {
                    tracing::error!(label, error = %e, "Failed to persist order file");
                    self.discard_all(&saved).await;
                    return Err(AppError::Storage(format!("failed to save {}: {}", label, e)));
                }
            }
        }

        if let Some(brief) = &pdfs.brief {
            match self.uploads.save(brief, BRIEF_LABEL).await {
                Ok(upload) => saved.push(upload),
                Err(e) => tracing::warn!(error = %e, "Brief file not attached"),
            }
        }

        Ok(saved)
    }

    async fn discard_all(&self, uploads: &[PendingUpload]) {
        for upload in uploads {
            if let Err(e) = self.uploads.discard(upload).await {
                tracing::warn!(
                    upload_id = %upload.id,
                    path = %upload.path.display(),
                    error = %e,
                    "Failed to discard temp file; the deferred deletion will retry"
                );
            }
        }
    }
}

/// Read persisted files back for the email. Unreadable files are left out.
async fn read_attachments(uploads: &[PendingUpload]) -> Vec<EmailAttachment> {
    let mut attachments = Vec::with_capacity(uploads.len());
    for upload in uploads {
        match tokio::fs::read(&upload.path).await {
            Ok(data) => attachments.push(EmailAttachment {
                file_name: upload.file_name.clone(),
                content_type: upload.mime_type.clone(),
                data,
            }),
            Err(e) => tracing::warn!(
                path = %upload.path.display(),
                error = %e,
                "Skipping unreadable attachment"
            ),
        }
    }
    attachments
}

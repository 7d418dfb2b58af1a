//! Request bodies and PDF payloads.

use base64::Engine;
use serde_json::{json, Value};

/// Smallest document that passes PDF validation.
pub fn minimal_pdf() -> Vec<u8> {
    b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\ntrailer\n<< /Root 1 0 R >>\n%%EOF\n"
        .to_vec()
}

pub fn to_base64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// A complete order with the three mandatory documents as base64 strings.
pub fn order_body() -> Value {
    let pdf = to_base64(&minimal_pdf());
    json!({
        "fullName": "Ann Lee",
        "companyName": "Lee Labs",
        "country": "PT",
        "address": "Rua Augusta 1, Lisbon",
        "contactInfo": "ann@example.com",
        "projectLink": "https://example.com/project",
        "paymentMethod": "card",
        "startDate": "2026-11-01",
        "specificationPdf": pdf,
        "invoicePdf": pdf,
        "contractPdf": pdf,
    })
}

pub fn consent_body() -> Value {
    json!({
        "serviceName": "Acme",
        "fingerprint": "fp-7f3a",
        "userAgent": "Mozilla/5.0",
        "ipAddress": "198.51.100.4",
        "accepted": true,
        "timestamp": "2026-10-19T08:00:00Z",
        "language": "en",
    })
}

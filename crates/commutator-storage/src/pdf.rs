//! PDF signature checks

/// Leading bytes of every PDF document
pub const PDF_MAGIC: &[u8] = b"%PDF-";

pub const PDF_MIME: &str = "application/pdf";

/// Content-sniffed MIME type, `application/octet-stream` when unknown.
pub fn sniff_mime(data: &[u8]) -> &'static str {
    infer::get(data)
        .map(|kind| kind.mime_type())
        .unwrap_or("application/octet-stream")
}

/// True iff the magic prefix is present and the content sniffer agrees on PDF.
pub fn validate_pdf(data: &[u8]) -> bool {
    data.len() >= PDF_MAGIC.len() && data.starts_with(PDF_MAGIC) && infer::is_mime(data, PDF_MIME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_minimal_pdf() {
        assert!(validate_pdf(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n1 0 obj\n<<>>\nendobj\n%%EOF\n"));
    }

    #[test]
    fn rejects_wrong_magic() {
        assert!(!validate_pdf(b"%PNG-1.4\nnot a pdf"));
        assert!(!validate_pdf(b"PDF-1.4"));
    }

    #[test]
    fn rejects_short_input() {
        assert!(!validate_pdf(b""));
        assert!(!validate_pdf(b"%PDF"));
    }

    #[test]
    fn rejects_other_formats() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert!(!validate_pdf(&png));
        assert_eq!(sniff_mime(&png), "image/png");
    }

    #[test]
    fn sniffs_pdf() {
        assert_eq!(sniff_mime(b"%PDF-1.7\n"), PDF_MIME);
        assert_eq!(sniff_mime(b"plain text"), "application/octet-stream");
    }
}

//! Test fixture assembly: hand-numbered objects laid out with a computed
//! cross-reference table, so reader tests can exercise exact structures
//! the writer never produces.

/// Build a complete PDF from object bodies. Objects must be numbered
/// contiguously from 1 in slice order; `root` names the catalog object.
pub fn build_pdf(objects: &[&str], root: u32) -> Vec<u8> {
    let mut pdf = Vec::new();
    pdf.extend_from_slice(b"%PDF-1.3\n");
    pdf.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

    let mut offsets = Vec::new();
    for (idx, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", idx + 1).as_bytes());
    }

    let xref_offset = pdf.len();
    pdf.extend_from_slice(b"xref\r\n");
    pdf.extend_from_slice(format!("0 {}\r\n", objects.len() + 1).as_bytes());
    pdf.extend_from_slice(b"0000000000 65535 f\r\n");
    for offset in offsets {
        pdf.extend_from_slice(format!("{offset:010} 00000 n\r\n").as_bytes());
    }

    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root {root} 0 R >>\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    pdf.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF\n").as_bytes());
    pdf
}

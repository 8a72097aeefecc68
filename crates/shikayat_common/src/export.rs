//! Export surface: CSV dump of complaints and a single-complaint PDF
//! document for download or forwarding.

use crate::types::Complaint;
use anyhow::{Context, Result};
use chrono::Utc;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

const CSV_HEADER: &str = "tracking_id,issue_type,severity,department,description,district,\
                          location,latitude,longitude,status,email,phone,image_ref,created_at";

/// Render all complaint fields as CSV, header row first.
pub fn complaints_to_csv(complaints: &[Complaint]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for c in complaints {
        let fields = [
            c.tracking_id.clone(),
            c.issue_type.as_str().to_string(),
            c.severity.as_str().to_string(),
            c.department.clone(),
            c.description.clone(),
            c.district.clone(),
            c.location.clone(),
            c.latitude.map(|v| v.to_string()).unwrap_or_default(),
            c.longitude.map(|v| v.to_string()).unwrap_or_default(),
            c.status.as_str().to_string(),
            c.email.clone().unwrap_or_default(),
            c.phone.clone().unwrap_or_default(),
            c.image_ref.clone().unwrap_or_default(),
            c.created_at.to_rfc3339(),
        ];
        let row = fields
            .iter()
            .map(|f| csv_escape(f))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&row);
        out.push('\n');
    }
    out
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Generate a one-page PDF summarizing a complaint: tracking id, all
/// fields, and a generated-at stamp. Layout is deliberately plain.
pub fn complaint_document(complaint: &Complaint) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
            "F2" => bold_id,
        },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F2".into(), 16.into()]),
        Operation::new("Td", vec![50.into(), 790.into()]),
        Operation::new(
            "Tj",
            vec![Object::string_literal("Civic Complaint Report")],
        ),
        Operation::new("ET", vec![]),
    ];

    let lines = document_lines(complaint);
    let mut y = 760;
    for line in &lines {
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 11.into()]),
            Operation::new("Td", vec![50.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(sanitize_pdf_text(line))]),
            Operation::new("ET", vec![]),
        ]);
        y -= 18;
    }

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().context("Failed to encode PDF content")?,
    ));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buf = Vec::new();
    doc.save_to(&mut buf).context("Failed to serialize PDF")?;
    Ok(buf)
}

fn document_lines(complaint: &Complaint) -> Vec<String> {
    let mut lines = vec![
        format!("Tracking ID: {}", complaint.tracking_id),
        format!("Status: {}", complaint.status),
        format!("Issue Type: {}", complaint.issue_type),
        format!("Severity: {}", complaint.severity),
        format!("Department: {}", complaint.department),
        format!("District: {}", complaint.district),
        format!("Location: {}", complaint.location),
    ];
    if let (Some(lat), Some(lon)) = (complaint.latitude, complaint.longitude) {
        lines.push(format!("Coordinates: {:.6}, {:.6}", lat, lon));
    }
    if let Some(email) = &complaint.email {
        lines.push(format!("Contact Email: {}", email));
    }
    if let Some(phone) = &complaint.phone {
        lines.push(format!("Contact Phone: {}", phone));
    }
    lines.push(format!(
        "Submitted: {}",
        complaint.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    lines.push(String::new());
    lines.push("Description:".to_string());
    for chunk in wrap_text(&complaint.description, 90) {
        lines.push(chunk);
    }
    lines.push(String::new());
    lines.push(format!(
        "Generated at: {}",
        Utc::now().format("%Y-%m-%d %H:%M UTC")
    ));
    lines
}

/// Type1 Helvetica has no Unicode cmap; replace what it cannot encode.
fn sanitize_pdf_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect()
}

fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if !line.is_empty() && line.len() + word.len() + 1 > width {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}

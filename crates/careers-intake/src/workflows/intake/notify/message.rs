use std::fmt::Write as _;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use super::MailRouting;
use crate::workflows::intake::domain::ApplicationFields;

/// Subject line derived from the submission.
pub fn subject(fields: &ApplicationFields) -> String {
    format!(
        "{} - {} - job application",
        fields.position, fields.full_name
    )
}

/// Labels and values in the fixed order HR expects, excluding the CV row.
fn field_rows(fields: &ApplicationFields) -> [(&'static str, &str); 13] {
    [
        ("Name", fields.full_name.as_str()),
        ("Email", fields.email.as_str()),
        ("Phone", fields.phone.as_str()),
        ("Position", fields.position.as_str()),
        ("Marital status", fields.marital_status.as_str()),
        ("Nationality", fields.nationality.as_str()),
        ("National ID", fields.national_no.as_str()),
        ("Date of birth", fields.date_of_birth.as_str()),
        ("Address", fields.address.as_str()),
        ("Education", fields.education.as_str()),
        ("Student", fields.student.as_str()),
        ("Worked here before", fields.worked_before.as_str()),
        ("Notes", fields.notes.as_str()),
    ]
}

/// Render the notification body as one table row per recognized field.
/// Labels and values are escaped; the final CV cell embeds a raw anchor tag
/// around the link.
pub fn render_body(fields: &ApplicationFields, cv_link: &str) -> String {
    let mut rows = String::new();
    for (label, value) in field_rows(fields) {
        push_row(&mut rows, label, &escape_html(value));
    }
    let anchor = format!("<a href=\"{}\">Open CV</a>", escape_html(cv_link));
    push_row(&mut rows, "CV", &anchor);

    let mut html = String::new();
    writeln!(
        html,
        "<div style=\"font-family:Tahoma,Arial,sans-serif;font-size:15px;color:#222\">"
    )
    .expect("write body open");
    writeln!(
        html,
        "<h2 style=\"margin:0 0 7px;color:#9E7A47;\">New job application</h2>"
    )
    .expect("write heading");
    writeln!(
        html,
        "<table style=\"border-collapse:collapse;min-width:540px\">{rows}</table>"
    )
    .expect("write table");
    html.push_str("</div>");
    html
}

fn push_row(rows: &mut String, label: &str, value_cell: &str) {
    write!(
        rows,
        "<tr><td style=\"padding:10px;border:1px solid #eee;background:#faf7f2;\">{}</td><td style=\"padding:10px;border:1px solid #eee;\">{}</td></tr>",
        escape_html(label),
        value_cell
    )
    .expect("write row");
}

/// Assemble the raw RFC-822 message for the provider-native send path.
pub fn rfc822_message(routing: &MailRouting, subject: &str, html_body: &str) -> String {
    let mut headers = vec![
        format!("From: Careers <{}>", routing.from),
        format!("To: {}", routing.to),
    ];
    if let Some(cc) = &routing.cc {
        headers.push(format!("Cc: {cc}"));
    }
    headers.push(format!("Subject: {subject}"));
    headers.push("MIME-Version: 1.0".to_string());
    headers.push("Content-Type: text/html; charset=UTF-8".to_string());

    format!("{}\r\n\r\n{}", headers.join("\r\n"), html_body)
}

/// Base64url-encode the raw message the way the mail API expects.
pub fn encode_raw_message(message: &str) -> String {
    URL_SAFE_NO_PAD.encode(message.as_bytes())
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

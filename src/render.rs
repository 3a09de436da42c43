//! Rendering a `CvRecord` into the styled HTML artifact.
//!
//! Pure: no I/O, no clock, no randomness. Missing optional fields degrade
//! to empty sections; only an entirely absent name fails. All record text
//! comes from a generative model and is escaped before it reaches markup.

use thiserror::Error;

use crate::extract::types::{CvRecord, EducationEntry, WorkEntry};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Extracted record has no usable name")]
    MissingName,
}

/// Contact block shown at the bottom of every artifact.
#[derive(Debug, Clone, Default)]
pub struct ContactInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

const DISCLAIMER: &str = "This document was generated from candidate-provided \
material and has not been independently verified. Please confirm all details \
with the contact above.";

const CSS_STYLES: &str = r#"
    <style>
        @media print {
            div {
                break-inside: avoid;
                print-color-adjust: exact;
            }
        }
        body {
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            background-color: #f0f2f5;
            margin: 0;
            padding-top: 0;
            color: #333;
            line-height: 1.6;
        }
        .confidential-header {
            text-align: center;
            margin: 0;
            color: rgb(220, 53, 69);
            position: absolute;
            top: 0;
            width: 100%;
        }
        .cv-container {
            max-width: 800px;
            margin: 0 auto;
            margin-top: 40px;
            background-color: #ffffff;
            padding: 50px;
            box-shadow: 0 4px 15px rgba(0,0,0,0.05);
            border-top: 5px solid #2c3e50;
        }
        header {
            text-align: center;
            margin-bottom: 40px;
        }
        header h1 {
            margin: 0;
            font-size: 2.5em;
            color: #2c3e50;
            text-transform: uppercase;
            letter-spacing: 1px;
        }
        header h2 {
            margin: 10px 0 0;
            font-size: 1.2em;
            color: #7f8c8d;
            font-weight: 400;
        }
        .section {
            margin-bottom: 40px;
        }
        .section-header {
            border-bottom: 2px solid #ecf0f1;
            margin-bottom: 20px;
            padding-bottom: 10px;
        }
        .section-header h3 {
            margin: 0;
            color: #2980b9;
            text-transform: uppercase;
            font-size: 1.1em;
            letter-spacing: 1px;
        }
        .skill-tag {
            display: inline-block;
            background-color: #e8f4f8;
            color: #2980b9;
            padding: 5px 12px;
            margin: 0 5px 5px 0;
            border-radius: 15px;
            font-size: 0.9em;
            font-weight: 600;
        }
        .highlight {
            background-color: #3b82f6;
            color: white;
        }
        .entry {
            margin-bottom: 20px;
        }
        .entry-header {
            display: flex;
            justify-content: space-between;
            align-items: baseline;
            flex-wrap: wrap;
        }
        .entry-title {
            font-weight: bold;
            font-size: 1.1em;
            color: #2c3e50;
        }
        .entry-subtitle {
            font-style: italic;
            color: #7f8c8d;
        }
        .entry-date {
            font-size: 0.9em;
            color: #95a5a6;
        }
        .entry-description {
            margin-top: 8px;
        }
    </style>
"#;

/// Render the artifact HTML.
pub fn render_cv(
    record: &CvRecord,
    contact: &ContactInfo,
    extra_profile_text: Option<&str>,
) -> Result<String, RenderError> {
    let name = record.name.trim();
    if name.is_empty() {
        return Err(RenderError::MissingName);
    }

    let mut html = String::with_capacity(8 * 1024);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"UTF-8\">\n");
    html.push_str(
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    html.push_str(&format!("<title>{} - CV</title>\n", escape(name)));
    html.push_str(CSS_STYLES);
    html.push_str("</head>\n<body>\n");
    html.push_str("<h2 class=\"confidential-header\">CONFIDENTIAL</h2>\n");
    html.push_str("<div class=\"cv-container\">\n");

    // Header
    html.push_str("<header>\n");
    html.push_str(&format!("<h1>{}</h1>\n", escape(name)));
    if !record.title.trim().is_empty() {
        html.push_str(&format!("<h2>{}</h2>\n", escape(record.title.trim())));
    }
    html.push_str("</header>\n");

    // Profile
    html.push_str(&section_header("Profile"));
    html.push_str(&format!("<p>{}</p>\n", escape(&record.profile_text)));
    if let Some(extra) = extra_profile_text {
        if !extra.trim().is_empty() {
            html.push_str(&format!("<p>{}</p>\n", escape(extra.trim())));
        }
    }
    html.push_str("</div>\n");

    // Skills: highlighted tags first, remaining skills deduplicated
    // against the highlighted set.
    html.push_str(&section_header("Skills"));
    html.push_str("<div>");
    for skill in &record.highlight_skills {
        html.push_str(&format!(
            "<span class=\"skill-tag highlight\">{}</span>",
            escape(skill)
        ));
    }
    for skill in &record.skills {
        if record.highlight_skills.contains(skill) {
            continue;
        }
        html.push_str(&format!("<span class=\"skill-tag\">{}</span>", escape(skill)));
    }
    html.push_str("</div>\n</div>\n");

    // Work experience
    html.push_str(&section_header("Work Experience"));
    for job in &record.work_experience {
        html.push_str(&work_entry(job));
    }
    html.push_str("</div>\n");

    // Education: omitted entirely when empty
    if !record.education.is_empty() {
        html.push_str(&section_header("Education"));
        for entry in &record.education {
            html.push_str(&education_entry(entry));
        }
        html.push_str("</div>\n");
    }

    // Contact block with disclaimer
    html.push_str(&section_header("Contact"));
    html.push_str("<div class=\"entry\">\n");
    html.push_str(&format!(
        "<div class=\"entry-header\"><span class=\"entry-title\">{}</span></div>\n",
        escape(&contact.name)
    ));
    html.push_str(&format!(
        "<div class=\"entry-description\">{}</div>\n",
        escape(&contact.email)
    ));
    html.push_str(&format!(
        "<div class=\"entry-description\">{}</div>\n",
        escape(&contact.phone)
    ));
    html.push_str("</div>\n");
    html.push_str(&format!(
        "<div class=\"entry\"><div class=\"entry-description\">{DISCLAIMER}</div></div>\n"
    ));
    html.push_str("</div>\n");

    html.push_str("</div>\n</body>\n</html>\n");
    Ok(html)
}

/// Shorten a full name to "First L." — used when the caller asks for the
/// candidate's surname to be withheld.
pub fn shorten_name(full: &str) -> String {
    let mut words = full.split_whitespace();
    let Some(first) = words.next() else {
        return String::new();
    };
    match words.last() {
        Some(last) => {
            let initial = last.chars().next().map(|c| c.to_uppercase().to_string());
            match initial {
                Some(initial) => format!("{first} {initial}."),
                None => first.to_string(),
            }
        }
        None => first.to_string(),
    }
}

fn section_header(title: &str) -> String {
    format!(
        "<div class=\"section\">\n<div class=\"section-header\"><h3>{title}</h3></div>\n"
    )
}

fn work_entry(job: &WorkEntry) -> String {
    format!(
        "<div class=\"entry\">\n\
         <div class=\"entry-header\">\
         <span class=\"entry-title\">{}</span>\
         <span class=\"entry-date\">{}</span></div>\n\
         <div class=\"entry-subtitle\">{}</div>\n\
         <div class=\"entry-description\">{}</div>\n\
         </div>\n",
        escape(&job.title),
        escape(&job.time_period),
        escape(&job.company),
        escape(&job.description),
    )
}

fn education_entry(entry: &EducationEntry) -> String {
    format!(
        "<div class=\"entry\">\n\
         <div class=\"entry-header\">\
         <span class=\"entry-title\">{}</span>\
         <span class=\"entry-date\">{}</span></div>\n\
         <div class=\"entry-subtitle\">{}</div>\n\
         <div class=\"entry-description\">{}</div>\n\
         </div>\n",
        escape(&entry.degree),
        escape(&entry.time_period),
        escape(&entry.school),
        escape(&entry.description),
    )
}

/// Minimal HTML escaping for model-derived text.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

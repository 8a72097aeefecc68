//! Formal complaint letter composer.
//!
//! Drafts a letter suitable for forwarding to the responsible department,
//! in English or Urdu, via the LLM. The deterministic template fallback
//! means a drafting failure never blocks submission.

use crate::classify::llm::LlmClient;
use crate::types::{IssueType, Severity};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Urdu,
}

impl Language {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "urdu" | "ur" => Language::Urdu,
            _ => Language::English,
        }
    }
}

/// Inputs the composer needs; severity/department come from enrichment.
#[derive(Debug, Clone)]
pub struct LetterInput<'a> {
    pub issue_type: IssueType,
    pub severity: Severity,
    pub department: &'a str,
    pub location: &'a str,
    pub district: &'a str,
    pub description: &'a str,
}

/// Compose the formal letter, falling back to the template on any LLM
/// failure.
pub fn compose(llm: Option<&dyn LlmClient>, input: &LetterInput<'_>, language: Language) -> String {
    if let Some(llm) = llm {
        match llm.call_text(&system_prompt(language), &user_prompt(input, language)) {
            Ok(letter) if !letter.trim().is_empty() => return letter.trim().to_string(),
            Ok(_) => warn!("LLM returned empty letter, using template"),
            Err(e) => warn!("Letter drafting failed, using template: {}", e),
        }
    }
    template(input, language)
}

fn system_prompt(language: Language) -> String {
    match language {
        Language::Urdu => "You are a professional complaint writer for Pakistani civic \
                           authorities. Write formal complaints in proper Urdu with correct \
                           grammar and a respectful tone suitable for government correspondence."
            .to_string(),
        Language::English => "You are a professional complaint writer for civic authorities in \
                              Pakistan. Write formal, respectful complaints suitable for \
                              government departments. Be clear, concise, and actionable."
            .to_string(),
    }
}

fn user_prompt(input: &LetterInput<'_>, language: Language) -> String {
    let lang = match language {
        Language::English => "English",
        Language::Urdu => "Urdu",
    };
    format!(
        "Write a formal civic complaint letter in {lang} with these details:\n\
         Issue Type: {issue}\n\
         Severity: {severity}\n\
         Location: {location}, {district}\n\
         Department: {department}\n\
         Citizen Description: {description}\n\n\
         Structure it as a letter to the department with a clear subject line \
         and a request for action.",
        lang = lang,
        issue = input.issue_type,
        severity = input.severity,
        location = input.location,
        district = input.district,
        department = input.department,
        description = input.description,
    )
}

fn template(input: &LetterInput<'_>, language: Language) -> String {
    match language {
        Language::English => format!(
            "To: {department}\n\
             Subject: {issue} at {location}, {district} ({severity} severity)\n\n\
             Respected Sir/Madam,\n\n\
             I wish to report the following civic issue in {district}:\n\n\
             {description}\n\n\
             The issue is located at {location}. Kindly arrange for inspection \
             and resolution at the earliest.\n\n\
             Thank you,\nA concerned citizen",
            department = input.department,
            issue = input.issue_type,
            severity = input.severity,
            location = input.location,
            district = input.district,
            description = input.description,
        ),
        Language::Urdu => format!(
            "بخدمت: {department}\n\
             موضوع: {district} میں {issue} کی شکایت\n\n\
             جناب عالی،\n\n\
             گزارش ہے کہ {location}، {district} میں درج ذیل مسئلہ درپیش ہے:\n\n\
             {description}\n\n\
             براہ کرم جلد از جلد اس مسئلے کے حل کے لیے اقدامات فرمائیں۔\n\n\
             شکریہ",
            department = input.department,
            issue = input.issue_type,
            location = input.location,
            district = input.district,
            description = input.description,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> LetterInput<'static> {
        LetterInput {
            issue_type: IssueType::Pothole,
            severity: Severity::High,
            department: "Roads & Highways Department",
            location: "Mall Road",
            district: "Lahore",
            description: "Large pothole causing accidents",
        }
    }

    #[test]
    fn test_template_without_llm() {
        let letter = compose(None, &input(), Language::English);
        assert!(letter.contains("Roads & Highways Department"));
        assert!(letter.contains("Mall Road"));
        assert!(letter.contains("Large pothole causing accidents"));
    }

    #[test]
    fn test_urdu_template() {
        let letter = compose(None, &input(), Language::Urdu);
        assert!(letter.contains("لاہور") || letter.contains("Lahore"));
        assert!(letter.contains("Mall Road"));
    }

    #[test]
    fn test_language_parse() {
        assert_eq!(Language::parse("urdu"), Language::Urdu);
        assert_eq!(Language::parse("UR"), Language::Urdu);
        assert_eq!(Language::parse("english"), Language::English);
        assert_eq!(Language::parse(""), Language::English);
    }
}

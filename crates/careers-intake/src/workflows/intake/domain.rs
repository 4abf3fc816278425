use serde::{Deserialize, Serialize};

/// Placeholder rendered for optional fields the applicant left blank.
pub const MISSING_VALUE: &str = "-";
/// Fallback applicant name when the form omits one.
pub const DEFAULT_APPLICANT_NAME: &str = "Applicant";
/// Fallback position label when the form omits one.
pub const DEFAULT_POSITION: &str = "Unspecified position";
/// Fallback free-text notes value.
pub const DEFAULT_NOTES: &str = "None";

/// Applicant-supplied text fields, trimmed and normalized at construction.
///
/// None of these are validated for format; email and phone are free text
/// exactly as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationFields {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub position: String,
    pub marital_status: String,
    pub nationality: String,
    pub national_no: String,
    pub date_of_birth: String,
    pub address: String,
    pub education: String,
    pub student: String,
    pub worked_before: String,
    pub notes: String,
}

impl ApplicationFields {
    /// Build normalized fields from raw form parts. Unrecognized part names
    /// are ignored; recognized ones use the form's camelCase naming.
    pub fn from_form<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut full_name = None;
        let mut email = None;
        let mut phone = None;
        let mut position = None;
        let mut marital_status = None;
        let mut nationality = None;
        let mut national_no = None;
        let mut date_of_birth = None;
        let mut address = None;
        let mut education = None;
        let mut student = None;
        let mut worked_before = None;
        let mut notes = None;

        for (name, value) in parts {
            match name.as_str() {
                "fullName" => full_name = Some(value),
                "email" => email = Some(value),
                "phone" => phone = Some(value),
                "position" => position = Some(value),
                "maritalStatus" => marital_status = Some(value),
                "nationality" => nationality = Some(value),
                "nationalNo" => national_no = Some(value),
                "dob" => date_of_birth = Some(value),
                "address" => address = Some(value),
                "education" => education = Some(value),
                "student" => student = Some(value),
                "workedBefore" => worked_before = Some(value),
                "notes" => notes = Some(value),
                _ => {}
            }
        }

        Self {
            full_name: presence(full_name, DEFAULT_APPLICANT_NAME),
            email: presence(email, MISSING_VALUE),
            phone: presence(phone, MISSING_VALUE),
            position: presence(position, DEFAULT_POSITION),
            marital_status: presence(marital_status, MISSING_VALUE),
            nationality: presence(nationality, MISSING_VALUE),
            national_no: presence(national_no, MISSING_VALUE),
            date_of_birth: presence(date_of_birth, MISSING_VALUE),
            address: presence(address, MISSING_VALUE),
            education: presence(education, MISSING_VALUE),
            student: presence(student, MISSING_VALUE),
            worked_before: presence(worked_before, MISSING_VALUE),
            notes: presence(notes, DEFAULT_NOTES),
        }
    }
}

fn presence(value: Option<String>, default: &str) -> String {
    match value {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                default.to_string()
            } else {
                trimmed.to_string()
            }
        }
        None => default.to_string(),
    }
}

/// Metadata for the attached CV file; the bytes live in the spool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvMetadata {
    pub original_name: String,
    pub content_type: String,
    pub size: u64,
}

/// One incoming application: normalized fields plus the attachment metadata.
/// Constructed per request and discarded once the response is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub fields: ApplicationFields,
    pub cv: CvMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_form_trims_and_keeps_submitted_values() {
        let fields = ApplicationFields::from_form(vec![
            ("fullName".to_string(), "  Sara Ali  ".to_string()),
            ("email".to_string(), "sara@x.com".to_string()),
            ("position".to_string(), "Accountant".to_string()),
        ]);
        assert_eq!(fields.full_name, "Sara Ali");
        assert_eq!(fields.email, "sara@x.com");
        assert_eq!(fields.position, "Accountant");
    }

    #[test]
    fn from_form_substitutes_documented_defaults() {
        let fields = ApplicationFields::from_form(Vec::new());
        assert_eq!(fields.full_name, DEFAULT_APPLICANT_NAME);
        assert_eq!(fields.position, DEFAULT_POSITION);
        assert_eq!(fields.notes, DEFAULT_NOTES);
        assert_eq!(fields.email, MISSING_VALUE);
        assert_eq!(fields.phone, MISSING_VALUE);
        assert_eq!(fields.worked_before, MISSING_VALUE);
    }

    #[test]
    fn from_form_treats_blank_values_as_missing() {
        let fields = ApplicationFields::from_form(vec![
            ("email".to_string(), "   ".to_string()),
            ("notes".to_string(), "".to_string()),
        ]);
        assert_eq!(fields.email, MISSING_VALUE);
        assert_eq!(fields.notes, DEFAULT_NOTES);
    }

    #[test]
    fn from_form_ignores_unrecognized_parts() {
        let fields = ApplicationFields::from_form(vec![
            ("fullName".to_string(), "Sara Ali".to_string()),
            ("csrfToken".to_string(), "abc123".to_string()),
        ]);
        assert_eq!(fields.full_name, "Sara Ali");
    }
}

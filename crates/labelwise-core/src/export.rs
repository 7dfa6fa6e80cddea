//! JSONL export request building.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::defaults::EXPORT_FILENAME_MAX_LEN;
use crate::error::{Error, Result};
use crate::models::{LineItemStatus, ProjectDownloadRequest};

/// Extension of exported files.
pub const EXPORT_EXTENSION: &str = "jsonl";

/// Makes a project name safe for use as an export file name.
///
/// Diacritics are stripped, anything outside `[A-Za-z0-9 _-]` is dropped,
/// whitespace runs become `-`, and the result is cut to 100 characters.
///
/// ```
/// use labelwise_core::export::sanitize_export_name;
///
/// assert_eq!(sanitize_export_name("Dữ liệu  tháng 3!"), "Du-lieu-thang-3");
/// ```
pub fn sanitize_export_name(input: &str) -> String {
    let stripped: String = input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .collect();

    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join("-");
    collapsed.chars().take(EXPORT_FILENAME_MAX_LEN).collect()
}

/// Default file name offered for a project export.
pub fn default_export_name(project_id: i64, project_name: Option<&str>) -> String {
    match project_name {
        Some(name) => format!("{}_data", sanitize_export_name(name)),
        None => format!("project_{}_data", project_id),
    }
}

/// Export form: status filter, optional limit, file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub limit: Option<u64>,
    pub include_statuses: Vec<LineItemStatus>,
    pub file_name: String,
}

impl ExportOptions {
    /// All statuses, no limit, default file name.
    pub fn new(project_id: i64, project_name: Option<&str>) -> Self {
        Self {
            limit: None,
            include_statuses: LineItemStatus::ALL.to_vec(),
            file_name: default_export_name(project_id, project_name),
        }
    }

    /// Toggle one status in the filter.
    pub fn toggle_status(&mut self, status: LineItemStatus) {
        if let Some(pos) = self.include_statuses.iter().position(|s| *s == status) {
            self.include_statuses.remove(pos);
        } else {
            self.include_statuses.push(status);
        }
    }

    /// Request body with the file name sanitized.
    pub fn to_request(&self) -> Result<ProjectDownloadRequest> {
        if self.include_statuses.is_empty() {
            return Err(Error::InvalidInput(
                "Select at least one status to export".to_string(),
            ));
        }
        if self.limit == Some(0) {
            return Err(Error::InvalidInput("Export limit must be positive".to_string()));
        }
        let file_name = sanitize_export_name(&self.file_name);
        if file_name.is_empty() {
            return Err(Error::InvalidInput(
                "File name is empty after removing unsupported characters".to_string(),
            ));
        }
        Ok(ProjectDownloadRequest {
            limit: self.limit,
            include_statuses: self.include_statuses.clone(),
            file_name,
        })
    }

    /// `<file_name>.jsonl`, as saved locally.
    pub fn output_file_name(&self) -> String {
        format!("{}.{}", sanitize_export_name(&self.file_name), EXPORT_EXTENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_diacritics_and_symbols() {
        assert_eq!(sanitize_export_name("Café Déjà vu"), "Cafe-Deja-vu");
        assert_eq!(sanitize_export_name("  a / b : c  "), "a-b-c");
        assert_eq!(sanitize_export_name("keep_under-score"), "keep_under-score");
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "x".repeat(250);
        assert_eq!(sanitize_export_name(&long).len(), EXPORT_FILENAME_MAX_LEN);
    }

    #[test]
    fn test_default_names() {
        assert_eq!(default_export_name(7, None), "project_7_data");
        assert_eq!(default_export_name(7, Some("My Set")), "My-Set_data");
    }

    #[test]
    fn test_options_default_all_statuses() {
        let opts = ExportOptions::new(1, None);
        assert_eq!(opts.include_statuses.len(), 4);
        assert_eq!(opts.output_file_name(), "project_1_data.jsonl");
    }

    #[test]
    fn test_options_validation() {
        let mut opts = ExportOptions::new(1, None);
        for status in LineItemStatus::ALL {
            opts.toggle_status(status);
        }
        assert!(opts.to_request().is_err());

        opts.toggle_status(LineItemStatus::Approved);
        opts.limit = Some(0);
        assert!(opts.to_request().is_err());

        opts.limit = Some(50);
        let req = opts.to_request().unwrap();
        assert_eq!(req.include_statuses, vec![LineItemStatus::Approved]);
        assert_eq!(req.limit, Some(50));
    }

    #[test]
    fn test_options_rejects_unusable_name() {
        let mut opts = ExportOptions::new(1, None);
        opts.file_name = "!!!".to_string();
        assert!(opts.to_request().is_err());
    }
}

use std::path::Path;

pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["csv", "xls", "xlsx"];
pub const PREVIEW_LINES: usize = 6;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Unsupported file: Please upload CSV/XLSX")]
pub struct UnsupportedFile;

/// Accept spreadsheet uploads by extension (case-insensitive).
pub fn check_upload_name(name: &str) -> Result<(), UnsupportedFile> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext {
        Some(ext) if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(UnsupportedFile),
    }
}

/// First lines of a CSV upload; other spreadsheets preview as their file name.
pub fn upload_preview(name: &str, content: &[u8]) -> Vec<String> {
    if !name.to_ascii_lowercase().ends_with(".csv") {
        return vec![format!("File: {name}")];
    }
    String::from_utf8_lossy(content)
        .split('\n')
        .take(PREVIEW_LINES)
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check() {
        assert!(check_upload_name("reviews.CSV").is_ok());
        assert!(check_upload_name("book.xlsx").is_ok());
        assert!(check_upload_name("old.xls").is_ok());
        let err = check_upload_name("notes.txt").unwrap_err();
        assert_eq!(err.to_string(), "Unsupported file: Please upload CSV/XLSX");
        assert!(check_upload_name("csv").is_err());
    }

    #[test]
    fn preview_takes_six_lines() {
        let body = b"text\r\na\r\nb\nc\nd\ne\nf\ng\n";
        let lines = upload_preview("x.csv", body);
        assert_eq!(lines, vec!["text", "a", "b", "c", "d", "e"]);
        assert_eq!(upload_preview("x.xlsx", b"PK"), vec!["File: x.xlsx"]);
    }
}

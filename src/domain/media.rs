use super::errors::DomainError;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

pub const PRODUCT_FOLDER: &str = "products";
pub const PROOF_FOLDER: &str = "transaction-proofs";

/// An uploaded file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Only images up to [`MAX_UPLOAD_BYTES`] are accepted.
    pub fn ensure_image(&self) -> Result<(), DomainError> {
        if !self.content_type.starts_with("image/") {
            return Err(DomainError::validation("Only image files are allowed!"));
        }
        if self.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(DomainError::validation("File too large (max 5MB)"));
        }
        if self.bytes.is_empty() {
            return Err(DomainError::validation("Uploaded file is empty"));
        }
        Ok(())
    }

    /// Extension derived from the content type, falling back to the file name.
    pub fn extension(&self) -> &str {
        match self.content_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => self
                .file_name
                .rsplit_once('.')
                .map(|(_, ext)| ext)
                .filter(|ext| !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphanumeric()))
                .unwrap_or("bin"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(content_type: &str, len: usize) -> Upload {
        Upload {
            file_name: "proof.PNG".to_string(),
            content_type: content_type.to_string(),
            bytes: vec![1; len],
        }
    }

    #[test]
    fn accepts_images_within_limit() {
        assert!(upload("image/png", 10).ensure_image().is_ok());
        assert!(upload("image/png", MAX_UPLOAD_BYTES + 1).ensure_image().is_err());
        assert!(upload("application/pdf", 10).ensure_image().is_err());
    }

    #[test]
    fn extension_prefers_content_type() {
        assert_eq!(upload("image/jpeg", 1).extension(), "jpg");
        assert_eq!(upload("image/heic", 1).extension(), "PNG");
    }
}

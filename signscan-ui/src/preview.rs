//! Local preview generation
//!
//! Converts a selection into a `data:` URL without touching the network.
//! Reading the whole file into memory is acceptable here: previews exist
//! for the same files the client is about to upload in one piece anyway.

use crate::media::SelectedMedia;
use base64::{engine::general_purpose, Engine as _};
use signscan_common::types::PreviewReference;
use signscan_common::Result;

/// Read the selection's bytes and produce a renderable data URL
///
/// Suspends until the file is fully read. Never fails for a readable
/// file; the only error source is the underlying I/O.
pub async fn generate_preview(media: &SelectedMedia) -> Result<PreviewReference> {
    let bytes = tokio::fs::read(&media.path).await?;

    let encoded = general_purpose::STANDARD.encode(&bytes);
    let data_url = format!("data:{};base64,{}", media.mime_type, encoded);

    tracing::debug!(
        file_name = %media.file_name,
        byte_size = bytes.len(),
        "Generated preview"
    );

    Ok(PreviewReference {
        mime_type: media.mime_type.clone(),
        data_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn preview_is_a_data_url_over_the_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sign.png");
        std::fs::write(&path, b"png bytes").unwrap();

        let media = SelectedMedia::from_path(&path).await.unwrap();
        let preview = generate_preview(&media).await.unwrap();

        assert_eq!(preview.mime_type, "image/png");
        let expected = format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(b"png bytes")
        );
        assert_eq!(preview.data_url, expected);
    }

    #[tokio::test]
    async fn preview_fails_only_on_unreadable_files() {
        let media = SelectedMedia {
            path: PathBuf::from("/no/such/file.png"),
            file_name: "file.png".to_string(),
            mime_type: "image/png".to_string(),
            byte_size: 0,
        };
        assert!(generate_preview(&media).await.is_err());
    }
}

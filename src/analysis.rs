//! The two model calls: image analysis and ELI5 simplification.

use base64::{engine::general_purpose, Engine as _};
use tracing::info;

use crate::error::Result;
use crate::gemini::{GenerativeModel, Part};
use crate::prompts::{eli5_prompt, ANALYSIS_FAILED, ANALYSIS_PROMPT, EXPLANATION_FAILED};
use crate::staging::StagedImage;

pub fn encode_image(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Analyze a staged image. The handle is consumed: the file is deleted right
/// after it has been read, or on whichever error path comes first.
pub async fn analyze_image(model: &dyn GenerativeModel, staged: StagedImage) -> Result<String> {
    let bytes = staged.read().await?;
    let mime_type = staged.kind().mime_type();
    info!(
        file = staged.original_name(),
        size = bytes.len(),
        mime_type,
        "Analyzing image"
    );
    staged.release();

    let parts = vec![
        Part::text(ANALYSIS_PROMPT),
        Part::inline_data(mime_type, encode_image(&bytes)),
    ];

    let text = model.generate(parts).await?;
    Ok(text.unwrap_or_else(|| ANALYSIS_FAILED.to_string()))
}

pub async fn simplify(model: &dyn GenerativeModel, text: &str) -> Result<String> {
    info!(chars = text.len(), "Simplifying analysis");
    let result = model.generate(vec![Part::text(eli5_prompt(text))]).await?;
    Ok(result.unwrap_or_else(|| EXPLANATION_FAILED.to_string()))
}


#[cfg(test)]
mod tests {
    use super::testing::{MockModel, Reply};
    use super::*;
    use crate::gemini::InlineData;
    use crate::prompts::DISCLAIMER;

    fn stage(dir: &std::path::Path, name: &str, bytes: &[u8]) -> StagedImage {
        StagedImage::stage(dir, name, bytes).unwrap()
    }

    #[tokio::test]
    async fn test_analyze_sends_prompt_and_image() {
        let dir = tempfile::tempdir().unwrap();
        let model = MockModel::with([Reply::Echo]);

        let staged = stage(dir.path(), "photo.png", b"0123456789");
        let path = staged.path().to_path_buf();
        let result = analyze_image(&model, staged).await.unwrap();

        assert!(result.contains(DISCLAIMER));
        assert!(!path.exists());

        let parts = model.last_request();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], Part::text(ANALYSIS_PROMPT));
        assert_eq!(
            parts[1],
            Part::InlineData {
                inline_data: InlineData {
                    mime_type: "image/png".to_string(),
                    data: encode_image(b"0123456789"),
                }
            }
        );
    }

    #[tokio::test]
    async fn test_jpeg_is_tagged_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let model = MockModel::with([Reply::Text("ok")]);
        analyze_image(&model, stage(dir.path(), "scan.JPEG", b"x"))
            .await
            .unwrap();

        match &model.last_request()[1] {
            Part::InlineData { inline_data } => assert_eq!(inline_data.mime_type, "image/jpeg"),
            other => panic!("expected inline data, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_responses_map_to_sentinels() {
        let dir = tempfile::tempdir().unwrap();
        let model = MockModel::with([Reply::Empty, Reply::Empty]);

        let analysis = analyze_image(&model, stage(dir.path(), "a.jpg", b"a"))
            .await
            .unwrap();
        assert_eq!(analysis, "Analysis failed.");

        let explanation = simplify(&model, "anything").await.unwrap();
        assert_eq!(explanation, "Explanation failed.");
    }

    #[tokio::test]
    async fn test_failed_call_still_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let model = MockModel::with([Reply::Fail]);

        let staged = stage(dir.path(), "a.png", b"a");
        let path = staged.path().to_path_buf();
        assert!(analyze_image(&model, staged).await.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_simplify_prompt_is_exact() {
        let model = MockModel::with([Reply::Text("Looks all good!")]);
        let result = simplify(&model, "X").await.unwrap();

        assert_eq!(result, "Looks all good!");
        assert_eq!(
            model.last_request(),
            vec![Part::text(
                "Explain the following information to a five-year-old:\nX"
            )]
        );
    }
}

//! Gemini `generateContent` request/response bodies.

use crate::error::{RetouchError, Result};
use crate::image::encoder::strip_data_url_prefix;
use crate::image::{TransformationRequest, TransformedImage};
use serde::{Deserialize, Serialize};

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub(crate) contents: Vec<Content>,
    pub(crate) generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Content {
    pub(crate) parts: Vec<RequestPart>,
}

/// A part in a request: inline image data or text.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub(crate) enum RequestPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    #[serde(default)]
    pub(crate) mime_type: String,
    #[serde(default)]
    pub(crate) data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    pub(crate) response_modalities: Vec<String>,
}

impl GenerateContentRequest {
    /// Builds the two-part body: the image first, then the instruction.
    pub(crate) fn from_transformation_request(req: &TransformationRequest) -> Self {
        let parts = vec![
            RequestPart::InlineData {
                inline_data: InlineData {
                    mime_type: req.image.mime_type().to_string(),
                    data: strip_data_url_prefix(req.image.data()).to_string(),
                },
            },
            RequestPart::Text {
                text: req.prompt.clone(),
            },
        ];

        Self {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                // TEXT lets the model explain a refusal instead of returning nothing.
                response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
            },
        }
    }
}

/// Response body of `generateContent`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub(crate) candidates: Vec<Candidate>,
    #[serde(default)]
    pub(crate) prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    #[serde(default)]
    pub(crate) content: Option<CandidateContent>,
    #[serde(default)]
    pub(crate) finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CandidateContent {
    #[serde(default)]
    pub(crate) parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResponsePart {
    #[serde(default)]
    pub(crate) inline_data: Option<InlineData>,
    #[serde(default)]
    pub(crate) text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    #[serde(default)]
    pub(crate) block_reason: Option<String>,
}

const NO_CONTENT: &str = "No content generated from the model.";
const NO_IMAGE: &str = "No image data found in response.";

impl GenerateContentResponse {
    /// Extracts the transformed image from the first candidate.
    ///
    /// The first part with inline data wins. Without one, the first text
    /// part becomes a [`RetouchError::ModelRefused`].
    pub(crate) fn into_image(self) -> Result<TransformedImage> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            let message = match self.prompt_feedback.and_then(|f| f.block_reason) {
                Some(reason) => format!("{NO_CONTENT} Prompt blocked: {reason}"),
                None => NO_CONTENT.to_string(),
            };
            return Err(RetouchError::EmptyResponse(message));
        };

        // An empty parts list counts as present and falls through to NO_IMAGE.
        let parts = match candidate.content.and_then(|c| c.parts) {
            Some(parts) => parts,
            None => {
                let message = match candidate.finish_reason {
                    Some(reason) => format!("{NO_CONTENT} Finish reason: {reason}"),
                    None => NO_CONTENT.to_string(),
                };
                return Err(RetouchError::EmptyResponse(message));
            }
        };

        if let Some(inline) = parts
            .iter()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|d| !d.data.is_empty())
        {
            return Ok(TransformedImage::from_png_base64(&inline.data));
        }

        match parts
            .into_iter()
            .filter_map(|p| p.text)
            .find(|t| !t.is_empty())
        {
            Some(text) => Err(RetouchError::ModelRefused(text)),
            None => Err(RetouchError::EmptyResponse(NO_IMAGE.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::image::EncodedImage;

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_request_serialization_shape() {
        let image = EncodedImage::from_base64("iVBORw0KGgo=", "image/png").unwrap();
        let req = TransformationRequest::new(image, "Make it snow");
        let body = GenerateContentRequest::from_transformation_request(&req);
        let json = serde_json::to_value(&body).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts.as_array().unwrap().len(), 2);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "iVBORw0KGgo=");
        assert_eq!(parts[1]["text"], "Make it snow");
        assert_eq!(
            json["generationConfig"]["responseModalities"],
            serde_json::json!(["TEXT", "IMAGE"])
        );
        assert!(json.get("generation_config").is_none());
    }

    #[test]
    fn test_image_part_becomes_png_data_url() {
        let resp = parse(
            r#"{
            "candidates": [{
                "content": {
                    "parts": [{
                        "inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}
                    }]
                },
                "finishReason": "STOP"
            }]
        }"#,
        );
        let image = resp.into_image().unwrap();
        assert_eq!(image.data_url(), "data:image/png;base64,iVBORw0KGgo=");
    }

    #[test]
    fn test_first_image_part_wins() {
        let resp = parse(
            r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here you go"},
                        {"inlineData": {"mimeType": "image/jpeg", "data": "Zmlyc3Q="}},
                        {"inlineData": {"mimeType": "image/png", "data": "c2Vjb25k"}}
                    ]
                }
            }]
        }"#,
        );
        // Labelled PNG regardless of the declared type.
        assert_eq!(
            resp.into_image().unwrap().data_url(),
            "data:image/png;base64,Zmlyc3Q="
        );
    }

    #[test]
    fn test_text_only_is_refusal() {
        let resp = parse(
            r#"{"candidates": [{"content": {"parts": [{"text": "cannot comply"}]}}]}"#,
        );
        match resp.into_image() {
            Err(RetouchError::ModelRefused(text)) => assert_eq!(text, "cannot comply"),
            other => panic!("expected refusal, got {other:?}"),
        }
    }

    #[test]
    fn test_only_first_candidate_consulted() {
        let resp = parse(
            r#"{"candidates": [
                {"content": {"parts": [{"text": "no"}]}},
                {"content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}]}}
            ]}"#,
        );
        assert_eq!(resp.into_image().unwrap_err().kind(), ErrorKind::ModelRefused);
    }

    #[test]
    fn test_empty_candidates() {
        let err = parse(r#"{"candidates": []}"#).into_image().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResponse);

        let err = parse("{}").into_image().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResponse);
        assert_eq!(err.to_string(), NO_CONTENT);
    }

    #[test]
    fn test_block_reason_in_empty_message() {
        let err = parse(r#"{"candidates": [], "promptFeedback": {"blockReason": "SAFETY"}}"#)
            .into_image()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResponse);
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_candidate_without_content() {
        let err = parse(r#"{"candidates": [{"finishReason": "IMAGE_SAFETY"}]}"#)
            .into_image()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResponse);
        assert!(err.to_string().contains("IMAGE_SAFETY"));
    }

    #[test]
    fn test_empty_parts_list_means_no_image() {
        let err = parse(r#"{"candidates": [{"content": {"parts": []}}]}"#)
            .into_image()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResponse);
        assert_eq!(err.to_string(), NO_IMAGE);

        let err = parse(r#"{"candidates": [{"content": {"role": "model"}}]}"#)
            .into_image()
            .unwrap_err();
        assert_eq!(err.to_string(), NO_CONTENT);
    }

    #[test]
    fn test_parts_without_image_or_text() {
        let err = parse(r#"{"candidates": [{"content": {"parts": [{}, {"text": ""}]}}]}"#)
            .into_image()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResponse);
        assert_eq!(err.to_string(), NO_IMAGE);
    }
}

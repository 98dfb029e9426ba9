//! Pipeline tests through the public API with a mocked LLM backend.

mod common;

use common::{processor_with, test_config, MockBackend, CONTACT_ANALYSIS, CONTACT_JSON};
use docproc::pipeline::decode::encode_base64;
use docproc::pipeline::pdf::bind_pdfium;
use docproc::{DocumentData, DocumentProcessor, DocumentType, ProcessRequest};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::json;
use std::io::Cursor;
use std::path::PathBuf;

fn png_payload(width: u32, height: u32) -> String {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 10, 10])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    format!("data:image/png;base64,{}", encode_base64(&buf))
}

#[tokio::test]
async fn json_document_end_to_end() {
    let backend = MockBackend::answering(CONTACT_ANALYSIS);
    let processor = processor_with(backend.clone());

    let response = processor
        .process(
            ProcessRequest::new(CONTACT_JSON, "Extract contact information.")
                .with_type(DocumentType::Json),
        )
        .await;

    assert!(response.success, "{:?}", response.error_message);
    assert!(response.error_message.is_none());
    let result = response.result.expect("success carries a result");
    assert_eq!(result.document_type, DocumentType::Json);
    assert_eq!(result.text_annotations.len(), 2);
    assert_eq!(result.entity_annotations.len(), 3);
    assert_eq!(result.entity_annotations[2].normalized_value, Some(json!(35)));
    assert_eq!(
        result.summary.as_ref().map(|s| s.summary.as_str()),
        Some("Contact record for John Doe.")
    );
    assert_eq!(result.metadata["size"], 3);
    assert!(result.raw_llm_response.is_some());

    let call = backend.last_call();
    assert!(call.user_prompt.contains("# Document Analysis Task"));
    assert!(call
        .user_prompt
        .contains("## Instructions\nExtract contact information."));
    assert!(call.user_prompt.contains("## Document Type\njson"));
    assert!(call.user_prompt.contains("John Doe"));
}

#[tokio::test]
async fn json_is_detected_without_declared_type() {
    let backend = MockBackend::answering("{}");
    let processor = processor_with(backend.clone());

    let response = processor
        .process(ProcessRequest::new(CONTACT_JSON, "Summarise."))
        .await;

    assert!(response.success, "{:?}", response.error_message);
    assert!(backend.last_call().user_prompt.contains("JSON content:"));
}

#[tokio::test]
async fn invalid_json_fails_without_calling_the_model() {
    let backend = MockBackend::answering(CONTACT_ANALYSIS);
    let processor = processor_with(backend.clone());

    let response = processor
        .process(ProcessRequest::new("invalid-json", "Summarise.").with_type(DocumentType::Json))
        .await;

    assert!(!response.success);
    assert!(response.result.is_none());
    assert!(response.error_message.is_some());
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn undetectable_payload_fails() {
    let processor = processor_with(MockBackend::answering("{}"));
    let response = processor
        .process(ProcessRequest::new("hello, world!", "Summarise."))
        .await;
    assert!(!response.success);
    assert!(response
        .error_message
        .unwrap()
        .starts_with("Could not determine file type"));
}

#[tokio::test]
async fn provider_override_uses_that_providers_model() {
    let backend = MockBackend::answering("{}");
    let processor = processor_with(backend.clone());

    let response = processor
        .process(ProcessRequest::new(CONTACT_JSON, "Summarise.").with_provider("anthropic"))
        .await;

    assert!(response.success, "{:?}", response.error_message);
    let call = backend.last_call();
    assert_eq!(call.selection.provider, "anthropic");
    assert_eq!(call.selection.model, "claude-3-opus-20240229");
}

#[tokio::test]
async fn default_provider_and_model() {
    let backend = MockBackend::answering("{}");
    let processor = processor_with(backend.clone());
    processor
        .process(ProcessRequest::new(CONTACT_JSON, "Summarise."))
        .await;
    let call = backend.last_call();
    assert_eq!(call.selection.provider, "openai");
    assert_eq!(call.selection.model, "gpt-4-turbo");
}

#[tokio::test]
async fn backend_failure_becomes_failure_response() {
    let processor = processor_with(MockBackend::failing("upstream returned 503"));
    let response = processor
        .process(ProcessRequest::new(CONTACT_JSON, "Summarise."))
        .await;
    assert!(!response.success);
    assert!(response.result.is_none());
    let message = response.error_message.unwrap();
    assert!(message.contains("upstream returned 503"), "got: {message}");
}

#[tokio::test]
async fn malformed_model_output_fails() {
    let processor = processor_with(MockBackend::answering(
        r#"{"entity_annotations": [{"entity_type": "person", "value": "x", "confidence": 7}]}"#,
    ));
    let response = processor
        .process(ProcessRequest::new(CONTACT_JSON, "Summarise."))
        .await;
    assert!(!response.success);
    assert!(response.error_message.unwrap().contains("confidence"));
}

#[tokio::test]
async fn image_document_metadata() {
    let backend = MockBackend::answering(
        r#"```json
{"text_annotations": [{"text": "red square", "relevance_score": 0.8,
  "bounding_box": {"x": 0, "y": 0, "width": 24, "height": 16}}]}
```"#,
    );
    let processor = processor_with(backend.clone());

    let response = processor
        .process(ProcessRequest::new(png_payload(24, 16), "Describe the image."))
        .await;

    assert!(response.success, "{:?}", response.error_message);
    let result = response.result.unwrap();
    assert_eq!(result.document_type, DocumentType::Image);
    assert_eq!(result.metadata["image_type"], "PNG");
    assert_eq!(result.metadata["width"], 24);
    assert_eq!(result.metadata["height"], 16);
    assert_eq!(result.metadata["mode"], "RGB");
    assert_eq!(result.text_annotations.len(), 1);

    let prompt = backend.last_call().user_prompt;
    assert!(prompt.contains("Image of type PNG with dimensions 24x16."));
    assert!(!prompt.contains("iVBORw0KGgo"));
}

#[tokio::test]
async fn pdf_document_end_to_end() {
    let lib = std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from);
    if let Err(e) = bind_pdfium(lib.as_deref()) {
        println!("SKIP — {e}");
        return;
    }
    let mut config = test_config();
    config.pdfium_lib_path = lib;
    let backend = MockBackend::answering(CONTACT_ANALYSIS);
    let processor = DocumentProcessor::new(config, backend.clone());

    let bytes = std::fs::read(
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/two_pages.pdf"),
    )
    .unwrap();
    let response = processor
        .process(ProcessRequest::new(encode_base64(&bytes), "Summarise the report."))
        .await;

    assert!(response.success, "{:?}", response.error_message);
    let result = response.result.unwrap();
    assert_eq!(result.document_type, DocumentType::Pdf);
    assert_eq!(result.metadata["page_count"], 2);
    assert_eq!(result.metadata["metadata"]["author"], "Jane Roe");

    let prompt = backend.last_call().user_prompt;
    let first = prompt.find("Page 1:\n").expect("page 1 in prompt");
    let second = prompt.find("Page 2:\n").expect("page 2 in prompt");
    assert!(first < second);
    assert!(prompt.contains("Quarterly report page one"));
    assert!(prompt.contains("Revenue grew on page two"));
}

#[tokio::test]
async fn structured_and_byte_inputs() {
    let processor = processor_with(MockBackend::answering("{}"));

    let response = processor
        .process_data(
            DocumentData::Structured(json!([1, 2, 3])),
            None,
            None,
            "Summarise.",
        )
        .await;
    let result = response.result.unwrap();
    assert_eq!(result.metadata["length"], 3);
    assert_eq!(result.metadata["type"], "array");

    let response = processor
        .process_data(
            DocumentData::Bytes(b"%PDF-1.7 truncated".to_vec()),
            None,
            None,
            "Summarise.",
        )
        .await;
    assert!(!response.success);
    assert!(response
        .error_message
        .unwrap()
        .starts_with("Failed to parse PDF"));
}

#[tokio::test]
async fn success_and_failure_are_mutually_exclusive() {
    let processor = processor_with(MockBackend::answering(CONTACT_ANALYSIS));
    for request in [
        ProcessRequest::new(CONTACT_JSON, "Summarise."),
        ProcessRequest::new("invalid-json", "Summarise.").with_type(DocumentType::Json),
        ProcessRequest::new("data:image/png;base64,AAAA", "Summarise."),
    ] {
        let response = processor.process(request).await;
        assert_eq!(response.success, response.result.is_some());
        assert_eq!(response.success, response.error_message.is_none());
        assert!(!response.request_id.is_empty());
    }
}

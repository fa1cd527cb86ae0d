use super::*;

use async_trait::async_trait;
use gloo_net::http::Request;
use tellthedev_core::transport::{HttpMethod, MultipartField, RequestBody};

/// `fetch`-backed transport for both bootstrap and submission calls.
pub(super) struct FetchTransport;

#[async_trait(?Send)]
impl WidgetTransport for FetchTransport {
    async fn send(&self, request: WidgetRequest) -> Result<WidgetResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => Request::get(&request.url),
            HttpMethod::Post => Request::post(&request.url),
        };
        if let Some(token) = request.bearer.as_deref() {
            builder = builder.header("authorization", &format!("Bearer {token}"));
        }

        let prepared = match request.body {
            RequestBody::Empty => builder.build(),
            RequestBody::Json(value) => builder
                .header("content-type", "application/json")
                .body(value.to_string()),
            RequestBody::Multipart(fields) => builder.body(multipart_form(&fields)?),
        }
        .map_err(|error| TransportError::Build(error.to_string()))?;

        let response = prepared
            .send()
            .await
            .map_err(|error| TransportError::Network(error.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| TransportError::Read(error.to_string()))?;
        tracing::debug!(target: LOG_TARGET, url = %request.url, status, "request completed");
        Ok(WidgetResponse::new(status, body))
    }
}

fn multipart_form(fields: &[MultipartField]) -> Result<web_sys::FormData, TransportError> {
    let form = web_sys::FormData::new()
        .map_err(|_| TransportError::Build("failed to create form data".to_string()))?;
    for field in fields {
        let (name, appended) = match field {
            MultipartField::Text { name, value } => (name, form.append_with_str(name, value)),
            MultipartField::File { name, image } => {
                let blob = image_blob(image)?;
                (
                    name,
                    form.append_with_blob_and_filename(name, &blob, &image.file_name),
                )
            }
        };
        appended.map_err(|_| TransportError::Build(format!("failed to append form field {name}")))?;
    }
    Ok(form)
}

fn image_blob(image: &RawImage) -> Result<web_sys::Blob, TransportError> {
    let bytes = js_sys::Uint8Array::from(image.bytes.as_slice());
    let parts = js_sys::Array::of1(&bytes);
    let options = web_sys::BlobPropertyBag::new();
    options.set_type(&image.content_type);
    web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)
        .map_err(|_| TransportError::Build("failed to create image blob".to_string()))
}

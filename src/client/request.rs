use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::error::FetchError;

/// Request body kinds the backend accepts
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    /// sent as multipart/form-data, the transport sets the boundary header
    Multipart(Vec<FormPart>),
}

#[derive(Debug, Clone)]
pub enum FormPart {
    Text { name: String, value: String },
    File { name: String, file_name: String, mime: Option<String>, bytes: Vec<u8> },
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        FormPart::Text { name: name.into(), value: value.into() }
    }
}

/// Rebuild a multipart form; `Form` is consumed by every send
pub fn build_form(parts: &[FormPart]) -> Result<Form, FetchError> {
    let mut form = Form::new();
    for part in parts {
        form = match part {
            FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
            FormPart::File { name, file_name, mime, bytes } => {
                let mut file_part = Part::bytes(bytes.clone()).file_name(file_name.clone());
                if let Some(mime) = mime {
                    file_part = file_part
                        .mime_str(mime)
                        .map_err(|e| FetchError::InvalidRequest(format!("mime '{}': {}", mime, e)))?;
                }
                form.part(name.clone(), file_part)
            }
        };
    }
    Ok(form)
}

/// A backend call relative to `api.base_url` (absolute urls are used as-is)
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), headers: HeaderMap::new(), body: RequestBody::Empty }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Header from untrusted strings, e.g. CLI input
    pub fn try_header(self, name: &str, value: &str) -> Result<Self, FetchError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| FetchError::InvalidRequest(format!("header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| FetchError::InvalidRequest(format!("header '{}' value: {}", name, e)))?;
        Ok(self.header(name, value))
    }
}

use std::{collections::BTreeMap, time::Duration};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::blocking::{Client, RequestBuilder, Response};
use sha2::Sha256;
use tracing::debug;

use super::{uri_encode, ObjectStore, Result, StorageError};

type HmacSha256 = Hmac<Sha256>;

const API_VERSION: &str = "2021-08-06";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub account_name: String,
    /// Base64 account key, as shown in the storage account's access keys.
    pub account_key: String,
    pub container: String,
}

pub struct AzureBlobStore {
    config: AzureConfig,
    key: Vec<u8>,
    client: Client,
    label: String,
}

/// The parts of a Blob service request covered by a Shared Key signature.
struct Canonical<'a> {
    method: &'a str,
    content_length: usize,
    content_type: &'a str,
    ms_headers: &'a BTreeMap<&'static str, String>,
    path: &'a str,
    query: &'a [(&'static str, &'static str)],
}

impl AzureBlobStore {
    pub fn new(config: AzureConfig) -> Result<Self> {
        let key = BASE64
            .decode(config.account_key.trim())
            .map_err(|err| StorageError::Credentials(format!("account key is not base64: {err}")))?;
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let label = format!("azure://{}/{}", config.account_name, config.container);

        Ok(Self {
            config,
            key,
            client,
            label,
        })
    }

    fn container_path(&self) -> String {
        format!("/{}", uri_encode(&self.config.container, false))
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> String {
        let query: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let mut url = format!(
            "https://{}.blob.core.windows.net{path}",
            self.config.account_name
        );
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }

    fn string_to_sign(&self, request: &Canonical<'_>) -> String {
        // An empty body is signed with an empty Content-Length.
        let length = match request.content_length {
            0 => String::new(),
            n => n.to_string(),
        };

        let standard = [
            request.method,
            "", // Content-Encoding
            "", // Content-Language
            &length,
            "", // Content-MD5
            request.content_type,
            "", // Date, superseded by x-ms-date
            "", // If-Modified-Since
            "", // If-Match
            "", // If-None-Match
            "", // If-Unmodified-Since
            "", // Range
        ];

        let mut out = standard.join("\n");
        out.push('\n');

        for (name, value) in request.ms_headers {
            out.push_str(&format!("{name}:{}\n", value.trim()));
        }

        out.push_str(&format!("/{}{}", self.config.account_name, request.path));
        for (name, value) in request.query {
            out.push_str(&format!("\n{}:{value}", name.to_lowercase()));
        }

        out
    }

    fn authorization(&self, request: &Canonical<'_>) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts keys of any length");
        mac.update(self.string_to_sign(request).as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        format!("SharedKey {}:{signature}", self.config.account_name)
    }

    fn signed_put(
        &self,
        path: &str,
        query: &[(&'static str, &'static str)],
        extra: &[(&'static str, &str)],
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<Response> {
        let mut ms_headers = BTreeMap::new();
        ms_headers.insert("x-ms-date", Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string());
        ms_headers.insert("x-ms-version", API_VERSION.to_string());
        for (name, value) in extra {
            ms_headers.insert(*name, value.to_string());
        }

        let authorization = self.authorization(&Canonical {
            method: "PUT",
            content_length: body.len(),
            content_type,
            ms_headers: &ms_headers,
            path,
            query,
        });

        let url = self.url(path, query);
        debug!(%url, "signed blob request");

        let mut request: RequestBuilder = self.client.put(&url).body(body);
        if !content_type.is_empty() {
            request = request.header("content-type", content_type);
        }
        for (name, value) in &ms_headers {
            request = request.header(*name, value.as_str());
        }

        Ok(request.header("authorization", authorization).send()?)
    }
}

fn error_code(response: &Response) -> String {
    response
        .headers()
        .get("x-ms-error-code")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Create Container outcome; only `ContainerAlreadyExists` counts as existing.
fn provisioning_result(status: u16, code: String, label: &str) -> Result<()> {
    match (status, code.as_str()) {
        (200..=299, _) => Ok(()),
        (409, "ContainerAlreadyExists") => Err(StorageError::AlreadyExists {
            container: label.to_string(),
        }),
        _ => Err(StorageError::Status {
            operation: "create container",
            status,
            code,
        }),
    }
}

impl ObjectStore for AzureBlobStore {
    fn name(&self) -> &str {
        &self.label
    }

    fn create_container(&self) -> Result<()> {
        let response = self.signed_put(
            &self.container_path(),
            &[("restype", "container")],
            &[],
            "",
            Vec::new(),
        )?;
        provisioning_result(response.status().as_u16(), error_code(&response), &self.label)
    }

    fn put(&self, key: &str, body: Vec<u8>) -> Result<()> {
        let path = format!("{}/{}", self.container_path(), uri_encode(key, true));
        let response = self.signed_put(
            &path,
            &[],
            &[("x-ms-blob-type", "BlockBlob")],
            "text/csv",
            body,
        )?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        Err(StorageError::Status {
            operation: "put blob",
            status: status.as_u16(),
            code: error_code(&response),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> AzureBlobStore {
        AzureBlobStore::new(AzureConfig {
            account_name: "acct".into(),
            account_key: BASE64.encode(b"super secret key"),
            container: "ventas".into(),
        })
        .unwrap()
    }

    fn headers() -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("x-ms-blob-type", "BlockBlob".to_string()),
            ("x-ms-date", "Mon, 16 Oct 2023 10:00:00 GMT".to_string()),
            ("x-ms-version", API_VERSION.to_string()),
        ])
    }

    #[test]
    fn blob_upload_string_to_sign() {
        let headers = headers();
        let request = Canonical {
            method: "PUT",
            content_length: 11,
            content_type: "text/csv",
            ms_headers: &headers,
            path: "/ventas/ventas_por_pais.csv",
            query: &[],
        };

        assert_eq!(
            store().string_to_sign(&request),
            "PUT\n\n\n11\n\ntext/csv\n\n\n\n\n\n\n\
             x-ms-blob-type:BlockBlob\n\
             x-ms-date:Mon, 16 Oct 2023 10:00:00 GMT\n\
             x-ms-version:2021-08-06\n\
             /acct/ventas/ventas_por_pais.csv"
        );
    }

    #[test]
    fn container_creation_signs_query_and_empty_length() {
        let headers = BTreeMap::from([("x-ms-version", API_VERSION.to_string())]);
        let request = Canonical {
            method: "PUT",
            content_length: 0,
            content_type: "",
            ms_headers: &headers,
            path: "/ventas",
            query: &[("restype", "container")],
        };

        assert_eq!(
            store().string_to_sign(&request),
            "PUT\n\n\n\n\n\n\n\n\n\n\n\nx-ms-version:2021-08-06\n/acct/ventas\nrestype:container"
        );
    }

    #[test]
    fn authorization_is_a_shared_key_signature() {
        let headers = headers();
        let request = Canonical {
            method: "PUT",
            content_length: 1,
            content_type: "text/csv",
            ms_headers: &headers,
            path: "/ventas/a.csv",
            query: &[],
        };

        let store = store();
        let authorization = store.authorization(&request);
        let signature = authorization.strip_prefix("SharedKey acct:").unwrap();

        // HMAC-SHA256 is 32 bytes, 44 characters once base64 encoded.
        assert_eq!(BASE64.decode(signature).unwrap().len(), 32);
        assert_eq!(authorization, store.authorization(&request));
    }

    #[test]
    fn rejects_key_that_is_not_base64() {
        let err = AzureBlobStore::new(AzureConfig {
            account_name: "acct".into(),
            account_key: "not base64!".into(),
            container: "ventas".into(),
        })
        .err()
        .unwrap();

        assert!(matches!(err, StorageError::Credentials(_)));
    }

    #[test]
    fn builds_container_url() {
        let store = store();

        assert_eq!(
            store.url(&store.container_path(), &[("restype", "container")]),
            "https://acct.blob.core.windows.net/ventas?restype=container"
        );
    }

    #[test]
    fn existing_container_counts_as_existing() {
        let result = provisioning_result(409, "ContainerAlreadyExists".into(), "azure://acct/ventas");

        assert!(matches!(result, Err(StorageError::AlreadyExists { .. })));
        assert!(provisioning_result(201, "unknown".into(), "azure://acct/ventas").is_ok());
    }

    #[test]
    fn other_conflicts_and_denials_are_errors() {
        let being_deleted =
            provisioning_result(409, "ContainerBeingDeleted".into(), "azure://acct/ventas");
        let forbidden =
            provisioning_result(403, "AuthorizationFailure".into(), "azure://acct/ventas");

        assert!(matches!(
            being_deleted,
            Err(StorageError::Status { status: 409, code, .. }) if code == "ContainerBeingDeleted"
        ));
        assert!(matches!(
            forbidden,
            Err(StorageError::Status { operation: "create container", status: 403, .. })
        ));
    }
}

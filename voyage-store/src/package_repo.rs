use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use voyage_catalog::{PackagePayload, RawPackage};
use voyage_core::{PackageRepository, RepositoryError, RepositoryResult};

use crate::http::{ApiClient, ListEnvelope};

pub struct HttpPackageRepository {
    api: ApiClient,
}

impl HttpPackageRepository {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

fn multipart(payload: PackagePayload) -> RepositoryResult<Form> {
    let mut form = Form::new();
    for (key, value) in payload.fields {
        form = form.text(key, value);
    }

    if let Some(image) = payload.image {
        let part = Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(&image.mime_type)
            .map_err(|e| RepositoryError::Decode(format!("Invalid image type: {}", e)))?;
        form = form.part("imagen", part);
    }

    Ok(form)
}

#[async_trait]
impl PackageRepository for HttpPackageRepository {
    async fn list(&self, agency_id: &str) -> RepositoryResult<Vec<RawPackage>> {
        let request = self
            .api
            .request(Method::GET, "paquetes")
            .query(&[("usuario_id", agency_id)]);
        let envelope: ListEnvelope<RawPackage> = self.api.send_json(request).await?;
        Ok(envelope.into_items())
    }

    async fn create(&self, payload: PackagePayload) -> RepositoryResult<RawPackage> {
        let request = self
            .api
            .request(Method::POST, "paquetes")
            .multipart(multipart(payload)?);
        self.api.send_json(request).await
    }

    async fn update(&self, id: i64, payload: PackagePayload) -> RepositoryResult<RawPackage> {
        let request = self
            .api
            .request(Method::PUT, &format!("paquetes/{}", id))
            .multipart(multipart(payload)?);
        self.api.send_json(request).await
    }

    async fn delete(&self, id: i64) -> RepositoryResult<()> {
        let request = self.api.request(Method::DELETE, &format!("paquetes/{}", id));
        self.api.send_empty(request).await
    }
}

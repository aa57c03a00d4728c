use async_trait::async_trait;
use reqwest::Method;
use voyage_catalog::Departure;
use voyage_core::{DepartureRepository, RepositoryResult};

use crate::http::{ApiClient, ListEnvelope};

pub struct HttpDepartureRepository {
    api: ApiClient,
}

impl HttpDepartureRepository {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DepartureRepository for HttpDepartureRepository {
    async fn list(&self) -> RepositoryResult<Vec<Departure>> {
        let request = self.api.request(Method::GET, "salidas");
        let envelope: ListEnvelope<Departure> = self.api.send_json(request).await?;
        Ok(envelope.into_items())
    }

    async fn get(&self, id: i64) -> RepositoryResult<Departure> {
        let request = self.api.request(Method::GET, &format!("salidas/{}", id));
        self.api.send_json(request).await
    }

    async fn create(&self, departure: &Departure) -> RepositoryResult<Departure> {
        let request = self.api.request(Method::POST, "salidas").json(departure);
        self.api.send_json(request).await
    }

    async fn update(&self, id: i64, departure: &Departure) -> RepositoryResult<Departure> {
        let request = self
            .api
            .request(Method::PUT, &format!("salidas/{}", id))
            .json(departure);
        self.api.send_json(request).await
    }

    async fn delete(&self, id: i64) -> RepositoryResult<()> {
        let request = self.api.request(Method::DELETE, &format!("salidas/{}", id));
        self.api.send_empty(request).await
    }
}

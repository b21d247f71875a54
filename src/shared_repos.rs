use crate::{
    infrastructure::http::client::ApiClient,
    repositories::http_repo::{HttpImageRepo, HttpMaqueteRepo},
};

#[derive(Clone)]
pub struct SharedRepositories {
    pub maquete_repo: HttpMaqueteRepo,
    pub image_repo: HttpImageRepo,
}

impl SharedRepositories {
    pub fn new(client: ApiClient) -> Self {
        let maquete_repo = HttpMaqueteRepo::new(client.clone());
        let image_repo = HttpImageRepo::new(client);

        SharedRepositories {
            maquete_repo,
            image_repo,
        }
    }
}

use crate::infrastructure::http::client::ApiClient;

#[derive(Clone)]
pub struct HttpMaqueteRepo {
    pub client: ApiClient,
}

#[derive(Clone)]
pub struct HttpImageRepo {
    pub client: ApiClient,
}

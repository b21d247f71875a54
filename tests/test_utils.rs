#![allow(dead_code)]

use actix_multipart::Multipart;
use actix_web::{web, App, HttpResponse, HttpServer};
use futures_util::StreamExt;
use maquetes_admin::{
    entities::image::{NewImageLink, PersistedImage, SelectedFile},
    feedback::{NoticeLevel, Notifier},
    settings::{AppConfig, AppEnvironment},
    AppState,
};
use parking_lot::Mutex;
use reqwest::Client;
use serde_json::{json, Value};
use std::{
    collections::BTreeMap,
    net::TcpListener,
    sync::{
        atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

pub const CLOUD_NAME: &str = "test-cloud";
pub const UPLOAD_PRESET: &str = "test-preset";
pub const DELIVERY_HOST: &str = "https://res.test";
pub const SLOW_UPLOAD: Duration = Duration::from_millis(1500);

pub const PNG_BYTES: [u8; 16] = [
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, b'I', b'H', b'D', b'R',
];

/// In-memory stand-in for the maquetes backend and the media host.
#[derive(Default)]
pub struct FakeBackend {
    pub maquetes: Mutex<BTreeMap<i64, Value>>,
    pub images: Mutex<BTreeMap<i64, Vec<PersistedImage>>>,
    pub next_id: AtomicI64,
    pub next_image_id: AtomicI64,
    pub fail_create: AtomicBool,
    pub create_requests: AtomicUsize,
    pub link_requests: AtomicUsize,
    pub image_list_requests: AtomicUsize,
    pub image_delete_requests: AtomicUsize,
    pub uploads: AtomicUsize,
    pub last_upload: Mutex<Option<(String, usize)>>,
}

impl FakeBackend {
    pub fn insert_maquete(&self, mut fields: Value) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        fields["id"] = json!(id);
        self.maquetes.lock().insert(id, fields);
        self.images.lock().insert(id, Vec::new());
        id
    }

    pub fn insert_image(&self, maquete_id: i64, public_id: &str) -> i64 {
        let id = self.next_image_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.images.lock().entry(maquete_id).or_default().push(PersistedImage {
            id,
            public_id: public_id.to_string(),
            url: format!("https://cdn.test/{}.png", public_id),
        });
        id
    }

    pub fn image_count(&self, maquete_id: i64) -> usize {
        self.images.lock().get(&maquete_id).map_or(0, Vec::len)
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

type Backend = web::Data<FakeBackend>;

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "db": "ok" }))
}

async fn list_maquetes(state: Backend) -> HttpResponse {
    let maquetes: Vec<Value> = state.maquetes.lock().values().cloned().collect();
    HttpResponse::Ok().json(maquetes)
}

async fn create_maquete(state: Backend, body: web::Json<Value>) -> HttpResponse {
    state.create_requests.fetch_add(1, Ordering::SeqCst);
    if state.fail_create.load(Ordering::SeqCst) {
        return HttpResponse::InternalServerError().json(json!({ "error": "db down" }));
    }
    let id = state.insert_maquete(body.into_inner());
    HttpResponse::Created().json(json!({ "id": id }))
}

async fn get_maquete(state: Backend, path: web::Path<i64>) -> HttpResponse {
    match state.maquetes.lock().get(&path.into_inner()) {
        Some(m) => HttpResponse::Ok().json(m),
        None => HttpResponse::NotFound().finish(),
    }
}

async fn update_maquete(state: Backend, path: web::Path<i64>, body: web::Json<Value>) -> HttpResponse {
    let id = path.into_inner();
    let mut maquetes = state.maquetes.lock();
    if !maquetes.contains_key(&id) {
        return HttpResponse::NotFound().finish();
    }
    let mut fields = body.into_inner();
    if fields["nome"] == "erro-longo" {
        let detail = format!("a{}", "é".repeat(300));
        return HttpResponse::BadRequest().content_type("text/plain; charset=utf-8").body(detail);
    }
    fields["id"] = json!(id);
    maquetes.insert(id, fields.clone());
    HttpResponse::Ok().json(fields)
}

async fn delete_maquete(state: Backend, path: web::Path<i64>) -> HttpResponse {
    let id = path.into_inner();
    state.images.lock().remove(&id);
    match state.maquetes.lock().remove(&id) {
        Some(_) => HttpResponse::NoContent().finish(),
        None => HttpResponse::NotFound().finish(),
    }
}

async fn list_images(state: Backend, path: web::Path<i64>) -> HttpResponse {
    state.image_list_requests.fetch_add(1, Ordering::SeqCst);
    match state.images.lock().get(&path.into_inner()) {
        Some(images) => HttpResponse::Ok().json(images),
        None => HttpResponse::NotFound().finish(),
    }
}

async fn link_image(state: Backend, path: web::Path<i64>, body: web::Json<NewImageLink>) -> HttpResponse {
    state.link_requests.fetch_add(1, Ordering::SeqCst);
    let maquete_id = path.into_inner();
    if body.public_id.contains("reject") {
        return HttpResponse::InternalServerError().finish();
    }
    if !state.images.lock().contains_key(&maquete_id) {
        return HttpResponse::NotFound().finish();
    }

    let id = state.next_image_id.fetch_add(1, Ordering::SeqCst) + 1;
    let image = PersistedImage {
        id,
        public_id: body.public_id.clone(),
        url: body.url.clone(),
    };
    state.images.lock().entry(maquete_id).or_default().push(image.clone());
    HttpResponse::Created().json(image)
}

// Unknown image ids are a no-op on this backend.
async fn delete_image(state: Backend, path: web::Path<(i64, i64)>) -> HttpResponse {
    state.image_delete_requests.fetch_add(1, Ordering::SeqCst);
    let (maquete_id, image_id) = path.into_inner();
    if let Some(images) = state.images.lock().get_mut(&maquete_id) {
        images.retain(|img| img.id != image_id);
    }
    HttpResponse::NoContent().finish()
}

async fn upload(state: Backend, path: web::Path<String>, mut payload: Multipart) -> HttpResponse {
    let cloud = path.into_inner();
    let mut file_name = None;
    let mut file_size = 0;
    let mut file_mime = None;
    let mut preset = None;

    while let Some(item) = payload.next().await {
        let Ok(mut field) = item else {
            return HttpResponse::BadRequest().finish();
        };
        let name = field.name().map(str::to_string);
        let mime = field.content_type().map(|m| m.essence_str().to_string());
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            match chunk {
                Ok(bytes) => data.extend_from_slice(&bytes),
                Err(_) => return HttpResponse::BadRequest().finish(),
            }
        }

        match name.as_deref() {
            Some("file") => {
                file_name = filename;
                file_size = data.len();
                file_mime = mime;
            }
            Some("upload_preset") => preset = Some(String::from_utf8_lossy(&data).into_owned()),
            _ => {}
        }
    }

    if cloud != CLOUD_NAME || preset.as_deref() != Some(UPLOAD_PRESET) {
        return HttpResponse::BadRequest()
            .json(json!({ "error": { "message": "Upload preset not found" } }));
    }

    let Some(file_name) = file_name.filter(|_| file_size > 0) else {
        return HttpResponse::BadRequest().json(json!({ "error": { "message": "Missing file" } }));
    };
    if file_name.contains("bad") {
        return HttpResponse::BadRequest().json(json!({ "error": { "message": "Invalid image file" } }));
    }
    if file_name.contains("slow") {
        actix_web::rt::time::sleep(SLOW_UPLOAD).await;
    }

    *state.last_upload.lock() = Some((file_mime.unwrap_or_default(), file_size));
    let n = state.uploads.fetch_add(1, Ordering::SeqCst) + 1;
    let stem = file_name.split('.').next().unwrap_or("image");
    let public_id = format!("maquetes/{}-{}", stem, n);

    HttpResponse::Ok().json(json!({
        "public_id": public_id,
        "secure_url": format!("https://cdn.test/{}.png", public_id),
    }))
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<(NoticeLevel, String)>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        self.notices.lock().push((level, message.to_string()));
    }
}

impl RecordingNotifier {
    pub fn messages(&self, level: NoticeLevel) -> Vec<String> {
        self.notices
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

pub struct TestApp {
    pub address: String,
    pub backend: web::Data<FakeBackend>,
    pub notifier: Arc<RecordingNotifier>,
    pub client: Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let backend = web::Data::new(FakeBackend::default());

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let data = backend.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .route("/health", web::get().to(health))
                .route("/api/maquetes", web::get().to(list_maquetes))
                .route("/api/maquetes", web::post().to(create_maquete))
                .route("/api/maquetes/{id}", web::get().to(get_maquete))
                .route("/api/maquetes/{id}", web::put().to(update_maquete))
                .route("/api/maquetes/{id}", web::delete().to(delete_maquete))
                .route("/api/maquetes/{id}/images", web::get().to(list_images))
                .route("/api/maquetes/{id}/images", web::post().to(link_image))
                .route("/api/maquetes/{id}/images/{image_id}", web::delete().to(delete_image))
                .route("/v1_1/{cloud}/image/upload", web::post().to(upload))
        })
        .listen(listener)
        .expect("Failed to bind fake backend")
        .workers(1)
        .run();

        actix_rt::spawn(server);

        let client = Client::new();
        while client.get(format!("{}/health", address)).send().await.is_err() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        TestApp {
            address,
            backend,
            notifier: Arc::new(RecordingNotifier::default()),
            client,
        }
    }

    /// Configuration pointing both the backend and the media host at the fake server.
    pub fn config(&self) -> AppConfig {
        AppConfig {
            env: AppEnvironment::Testing,
            api_base_url: self.address.clone(),
            cloudinary_cloud_name: Some(CLOUD_NAME.to_string()),
            cloudinary_upload_preset: Some(UPLOAD_PRESET.to_string()),
            upload_host: self.address.clone(),
            delivery_host: DELIVERY_HOST.to_string(),
            upload_wait_timeout: "5s".to_string(),
        }
    }

    pub fn config_without_uploads(&self) -> AppConfig {
        AppConfig {
            cloudinary_cloud_name: None,
            cloudinary_upload_preset: None,
            ..self.config()
        }
    }

    pub fn state(&self) -> AppState {
        self.state_with(self.config())
    }

    pub fn state_with(&self, config: AppConfig) -> AppState {
        AppState::new(config, self.notifier.clone()).expect("Failed to build app state")
    }
}

pub fn png(name: &str) -> SelectedFile {
    SelectedFile::from_bytes(name, PNG_BYTES.to_vec())
}

pub fn maquete_json(nome: &str) -> Value {
    json!({ "nome": nome, "escala": "1:100", "info": "" })
}

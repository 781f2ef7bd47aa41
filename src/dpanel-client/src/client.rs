use crate::endpoints::{
    LOGIN_ENDPOINT, PROFILE_ENDPOINT, ROUTER_CREATE_ENDPOINT, SERVER_CREATE_ENDPOINT,
    SERVER_DETAIL_ENDPOINT, SERVER_SETUP_ENDPOINT, SESSION_COOKIE, SSH_KEY_CREATE_ENDPOINT,
    SSH_KEY_DETAIL_ENDPOINT, SSH_KEY_FIND_ENDPOINT,
};
use crate::error::{ApiError, ApiResult};
use crate::session::SessionStore;
use crate::settings::PanelSettings;
use crate::types::{
    ApiResponse, LoginRequest, MachineRecord, Router, RouterPayload, ServerPayload, SshKey,
    SshKeyList, SshKeyPayload, User,
};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

const OK_CODE: i64 = 200;

pub struct PanelClient {
    base_uri: String,
    client: reqwest::Client,
    settings: PanelSettings,
    session: SessionStore,
}

impl PanelClient {
    pub fn new(settings: PanelSettings, session: SessionStore) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ApiError::Configuration(e.to_string()))?;

        Ok(Self {
            base_uri: settings.api_base_url.trim_end_matches('/').to_string(),
            client,
            settings,
            session,
        })
    }

    pub fn settings(&self) -> &PanelSettings {
        &self.settings
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn get_url(&self, path: &str) -> String {
        format!("{}{}", self.base_uri, path)
    }

    pub fn check_session(&self) -> ApiResult<()> {
        self.session.cookie().map(|_| ())
    }

    /// Logs in and stores the `dcloud_sid` cookie for later calls.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
        let url = self.get_url(LOGIN_ENDPOINT);
        let response = self
            .client
            .post(&url)
            .timeout(self.settings.read_timeout())
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(|source| ApiError::Network {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(session_cookie_value);

        let body: ApiResponse<User> = response.json().await.map_err(|source| ApiError::Decode {
            url: url.clone(),
            source,
        })?;

        if let Some(message) = body.error_message() {
            return Err(ApiError::Api {
                code: body.code,
                message,
            });
        }
        if status != StatusCode::OK {
            return Err(ApiError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let cookie = cookie.ok_or(ApiError::MissingSessionCookie)?;
        self.session.save_cookie(&cookie)?;
        tracing::info!("logged in to {} as {}", self.base_uri, email);

        Ok(body.data.unwrap_or_default())
    }

    pub async fn profile(&self) -> ApiResult<User> {
        let url = self.get_url(PROFILE_ENDPOINT);
        let request = self.authorized(self.client.get(&url), self.settings.read_timeout())?;
        required_data(self.send(request, &url).await?)
    }

    pub async fn list_ssh_keys(&self) -> ApiResult<SshKeyList> {
        let url = self.get_url(SSH_KEY_FIND_ENDPOINT);
        let request = self.authorized(self.client.get(&url), self.settings.read_timeout())?;
        Ok(self.send(request, &url).await?.data.unwrap_or_default())
    }

    pub async fn create_ssh_key(&self) -> ApiResult<SshKey> {
        let url = self.get_url(SSH_KEY_CREATE_ENDPOINT);
        let payload = SshKeyPayload::generated_at(chrono::Local::now());
        let request = self.authorized(
            self.client.post(&url).json(&payload),
            self.settings.create_timeout(),
        )?;
        required_data(self.send(request, &url).await?)
    }

    pub async fn ssh_key(&self, id: u64) -> ApiResult<SshKey> {
        let url = self.get_url(&format!("{}/{}", SSH_KEY_DETAIL_ENDPOINT, id));
        let request = self.authorized(self.client.get(&url), self.settings.read_timeout())?;
        required_data(self.send(request, &url).await?)
    }

    /// The first key on the account with its details, creating one when the
    /// account has none.
    pub async fn machine_ssh_key(&self) -> ApiResult<SshKey> {
        let keys = self.list_ssh_keys().await?;
        match keys.secrets.first() {
            Some(existing) if keys.pagination.total_item > 0 => self.ssh_key(existing.id).await,
            _ => {
                tracing::info!("no SSH key on the account, generating one");
                self.create_ssh_key().await
            }
        }
    }

    pub async fn create_router(&self, payload: &RouterPayload) -> ApiResult<Router> {
        let url = self.get_url(ROUTER_CREATE_ENDPOINT);
        let request = self.authorized(
            self.client.post(&url).json(payload),
            self.settings.create_timeout(),
        )?;
        required_data(ok_code(self.send(request, &url).await?)?)
    }

    pub async fn register_server(&self, payload: &ServerPayload) -> ApiResult<MachineRecord> {
        let url = self.get_url(SERVER_CREATE_ENDPOINT);
        let request = self.authorized(
            self.client.post(&url).json(payload),
            self.settings.read_timeout(),
        )?;
        let machine: MachineRecord = required_data(self.send(request, &url).await?)?;
        self.session.save_machine(&machine)?;
        Ok(machine)
    }

    pub async fn setup_server(&self, id: u64) -> ApiResult<String> {
        let url = self.get_url(&format!("{}/{}", SERVER_SETUP_ENDPOINT, id));
        let request = self.authorized(self.client.post(&url), self.settings.read_timeout())?;
        Ok(self.send(request, &url).await?.data.unwrap_or_default())
    }

    /// True when `machine.json` names a server the panel still knows about.
    pub async fn is_registered(&self) -> bool {
        let Some(machine) = self.session.machine() else {
            return false;
        };

        let url = self.get_url(&format!("{}/{}", SERVER_DETAIL_ENDPOINT, machine.id));
        let Ok(request) = self.authorized(self.client.get(&url), self.settings.read_timeout())
        else {
            return false;
        };

        match self.send::<MachineRecord>(request, &url).await.and_then(ok_code) {
            Ok(response) => response.data.is_some_and(|server| server.id != 0),
            Err(e) => {
                tracing::debug!("machine {} is not registered: {}", machine.id, e);
                false
            }
        }
    }

    fn authorized(&self, request: RequestBuilder, timeout: Duration) -> ApiResult<RequestBuilder> {
        let cookie = self.session.cookie()?;
        Ok(request
            .timeout(timeout)
            .header(COOKIE, format!("{}={}", SESSION_COOKIE, cookie)))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> ApiResult<ApiResponse<T>> {
        let response = request.send().await.map_err(|source| ApiError::Network {
            url: url.to_string(),
            source,
        })?;

        if response.status() != StatusCode::OK {
            return Err(ApiError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body: ApiResponse<T> = response.json().await.map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })?;

        if let Some(message) = body.error_message() {
            return Err(ApiError::Api {
                code: body.code,
                message,
            });
        }

        Ok(body)
    }
}

fn ok_code<T>(response: ApiResponse<T>) -> ApiResult<ApiResponse<T>> {
    if response.code != OK_CODE {
        return Err(ApiError::Api {
            code: response.code,
            message: response.status,
        });
    }
    Ok(response)
}

fn required_data<T>(response: ApiResponse<T>) -> ApiResult<T> {
    let code = response.code;
    response.data.ok_or_else(|| ApiError::Api {
        code,
        message: "response has no data".to_string(),
    })
}

/// Value of `dcloud_sid` in a `Set-Cookie` header.
fn session_cookie_value(header: &str) -> Option<String> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    (name.trim() == SESSION_COOKIE && !value.trim().is_empty()).then(|| value.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path as UrlPath;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use axum::{Json, Router as AxumRouter};
    use dpanel_common::workdir::DevetekWorkDir;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tokio::net::TcpListener;

    const SESSION: &str = "abc123";

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("cookie")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|cookie| cookie == format!("dcloud_sid={}", SESSION))
    }

    fn guarded(headers: HeaderMap, body: Value) -> Response {
        if authorized(&headers) {
            Json(body).into_response()
        } else {
            AxumStatus::UNAUTHORIZED.into_response()
        }
    }

    async fn login(Json(body): Json<Value>) -> Response {
        if body["email"] == "dev@devetek.com" && body["password"] == "secret" {
            (
                [("set-cookie", format!("dcloud_sid={}; Path=/; HttpOnly", SESSION))],
                Json(json!({ "code": 200, "status": "OK", "data": { "id": 1, "email": "dev@devetek.com" } })),
            )
                .into_response()
        } else {
            (
                AxumStatus::UNAUTHORIZED,
                Json(json!({ "code": 401, "error": "invalid email or password" })),
            )
                .into_response()
        }
    }

    async fn mock_panel(ssh_keys: usize) -> String {
        let app = AxumRouter::new()
            .route("/api/v0/user/login", post(login))
            .route(
                "/api/v1/user/profile",
                get(|headers: HeaderMap| async move {
                    guarded(headers, json!({ "code": 200, "data": { "id": 1, "username": "dev" } }))
                }),
            )
            .route(
                "/api/v1/secret/ssh-key/find",
                get(move |headers: HeaderMap| async move {
                    let secrets: Vec<Value> = (0..ssh_keys)
                        .map(|i| json!({ "id": 7 + i, "name": "existing" }))
                        .collect();
                    guarded(
                        headers,
                        json!({ "code": 200, "data": { "pagination": { "total_item": ssh_keys }, "secrets": secrets } }),
                    )
                }),
            )
            .route(
                "/api/v1/secret/ssh-key/detail/{id}",
                get(|UrlPath(id): UrlPath<u64>, headers: HeaderMap| async move {
                    guarded(
                        headers,
                        json!({ "code": 200, "data": { "id": id, "data": { "public": "ssh-rsa EXISTING" } } }),
                    )
                }),
            )
            .route(
                "/api/v1/secret/ssh-key/create",
                post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                    assert_eq!(body["key_size"], 4096);
                    guarded(
                        headers,
                        json!({ "code": 200, "data": { "id": 99, "data": { "public": "ssh-rsa GENERATED" } } }),
                    )
                }),
            )
            .route(
                "/api/v1/router/create",
                post(|headers: HeaderMap| async move {
                    guarded(headers, json!({ "code": 409, "status": "domain already exists" }))
                }),
            )
            .route(
                "/api/v1/server/create",
                post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                    guarded(
                        headers,
                        json!({ "code": 200, "data": { "id": 42, "address": body["address"] } }),
                    )
                }),
            )
            .route(
                "/api/v1/server/setup/{id}",
                post(|UrlPath(id): UrlPath<u64>, headers: HeaderMap| async move {
                    guarded(headers, json!({ "code": 200, "data": format!("setup {} queued", id) }))
                }),
            )
            .route(
                "/api/v1/server/detail/{id}",
                get(|UrlPath(id): UrlPath<u64>, headers: HeaderMap| async move {
                    let known = if id == 42 { id } else { 0 };
                    guarded(headers, json!({ "code": 200, "data": { "id": known } }))
                }),
            );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        format!("http://{}", addr)
    }

    fn client(base: &str, temp: &TempDir) -> PanelClient {
        let settings = PanelSettings {
            api_base_url: base.to_string(),
            frontend_url: "https://cloud.terpusat.com".to_string(),
            read_timeout_secs: 5,
            create_timeout_secs: 30,
        };
        let session = SessionStore::new(DevetekWorkDir::at(temp.path().join(".devetek")));
        PanelClient::new(settings, session).unwrap()
    }

    #[test]
    fn parses_session_cookie_header() {
        assert_eq!(
            session_cookie_value("dcloud_sid=abc; Path=/; HttpOnly").as_deref(),
            Some("abc")
        );
        assert_eq!(session_cookie_value("other=abc; Path=/"), None);
        assert_eq!(session_cookie_value("dcloud_sid=; Max-Age=0"), None);
    }

    #[tokio::test]
    async fn login_stores_the_session_used_by_later_calls() {
        let base = mock_panel(1).await;
        let temp = TempDir::new().unwrap();
        let client = client(&base, &temp);

        assert!(matches!(client.profile().await, Err(ApiError::NoSession)));

        let user = client.login("dev@devetek.com", "secret").await.unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(client.session().cookie().unwrap(), SESSION);

        let profile = client.profile().await.unwrap();
        assert_eq!(profile.username, "dev");
    }

    #[tokio::test]
    async fn failed_login_reports_the_panel_error() {
        let base = mock_panel(1).await;
        let temp = TempDir::new().unwrap();
        let client = client(&base, &temp);

        let result = client.login("dev@devetek.com", "wrong").await;

        assert!(matches!(
            result,
            Err(ApiError::Api { code: 401, ref message }) if message == "invalid email or password"
        ));
        assert!(client.check_session().is_err());
    }

    #[tokio::test]
    async fn stale_session_is_a_status_error() {
        let base = mock_panel(1).await;
        let temp = TempDir::new().unwrap();
        let client = client(&base, &temp);
        client.session().save_cookie("expired").unwrap();

        assert!(matches!(
            client.profile().await,
            Err(ApiError::Status { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn existing_ssh_key_is_fetched_with_details() {
        let base = mock_panel(2).await;
        let temp = TempDir::new().unwrap();
        let client = client(&base, &temp);
        client.session().save_cookie(SESSION).unwrap();

        let key = client.machine_ssh_key().await.unwrap();
        assert_eq!(key.id, 7);
        assert_eq!(key.public_key().as_deref(), Some("ssh-rsa EXISTING"));
    }

    #[tokio::test]
    async fn ssh_key_is_generated_when_the_account_has_none() {
        let base = mock_panel(0).await;
        let temp = TempDir::new().unwrap();
        let client = client(&base, &temp);
        client.session().save_cookie(SESSION).unwrap();

        let key = client.machine_ssh_key().await.unwrap();
        assert_eq!(key.id, 99);
        assert_eq!(key.public_key().as_deref(), Some("ssh-rsa GENERATED"));
    }

    #[tokio::test]
    async fn router_with_non_ok_code_fails() {
        let base = mock_panel(1).await;
        let temp = TempDir::new().unwrap();
        let client = client(&base, &temp);
        client.session().save_cookie(SESSION).unwrap();

        let result = client
            .create_router(&RouterPayload::proxy_pass(8080, 9000))
            .await;
        assert!(matches!(result, Err(ApiError::Api { code: 409, .. })));
    }

    #[tokio::test]
    async fn registration_is_remembered_and_verified() {
        let base = mock_panel(1).await;
        let temp = TempDir::new().unwrap();
        let client = client(&base, &temp);
        client.session().save_cookie(SESSION).unwrap();

        assert!(!client.is_registered().await);

        let machine = client
            .register_server(&ServerPayload {
                provider: "other".to_string(),
                secret_id: "7".to_string(),
                address: "203.0.113.7".to_string(),
                ssh_port: "22".to_string(),
                http_port: "9000".to_string(),
                domain: String::new(),
                ssh_user: "root".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(machine.id, 42);
        assert_eq!(machine.address, "203.0.113.7");

        assert!(client.is_registered().await);
        assert_eq!(client.setup_server(machine.id).await.unwrap(), "setup 42 queued");
    }
}

pub const LOGIN_ENDPOINT: &str = "/api/v0/user/login";
pub const PROFILE_ENDPOINT: &str = "/api/v1/user/profile";
pub const SSH_KEY_FIND_ENDPOINT: &str = "/api/v1/secret/ssh-key/find";
pub const SSH_KEY_CREATE_ENDPOINT: &str = "/api/v1/secret/ssh-key/create";
pub const SSH_KEY_DETAIL_ENDPOINT: &str = "/api/v1/secret/ssh-key/detail";
pub const ROUTER_CREATE_ENDPOINT: &str = "/api/v1/router/create";
pub const SERVER_CREATE_ENDPOINT: &str = "/api/v1/server/create";
pub const SERVER_SETUP_ENDPOINT: &str = "/api/v1/server/setup";
pub const SERVER_DETAIL_ENDPOINT: &str = "/api/v1/server/detail";

pub const SESSION_COOKIE: &str = "dcloud_sid";

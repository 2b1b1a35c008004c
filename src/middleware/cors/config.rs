use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Access-Control-Allow-Origin 값
    #[serde(default = "default_origin")]
    pub origin: String,

    /// 허용할 HTTP 메서드 목록
    #[serde(default = "default_methods")]
    pub allow_methods: Vec<String>,

    /// 허용할 헤더 목록
    #[serde(default = "default_headers")]
    pub allow_headers: Vec<String>,
}

fn default_origin() -> String {
    "same-origin".to_string()
}

fn default_methods() -> Vec<String> {
    vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_headers() -> Vec<String> {
    vec!["Content-Type", "Accept", "Accept-Language", "Accept-Encoding"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            allow_methods: default_methods(),
            allow_headers: default_headers(),
        }
    }
}
